use std::time::Duration;

use crate::compare::DEFAULT_EPSILON;
use crate::memory::ProcessTarget;
use crate::schema::EntityKind;

/// Default refresh cadence
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(40);

/// Default upper bound on a single table refresh
pub const DEFAULT_REFRESH_TIMEOUT: Duration = Duration::from_millis(500);

/// Configuration for [`MemoryEditor`](crate::editor::MemoryEditor)
#[derive(Debug, Clone, PartialEq)]
pub struct EditorConfig {
    /// Process to attach to
    pub target: ProcessTarget,
    /// Time between ticks
    pub poll_interval: Duration,
    /// A refresh that runs longer than this fails with a timeout
    pub refresh_timeout: Duration,
    /// Tolerance for float fields when diffing
    pub float_epsilon: f64,
    /// Diff live against baseline on every tick
    pub diff_on_tick: bool,
    /// Entity kinds refreshed each tick
    pub kinds: Vec<EntityKind>,
}

impl Default for EditorConfig {
    fn default() -> Self {
        Self {
            target: ProcessTarget::default(),
            poll_interval: DEFAULT_POLL_INTERVAL,
            refresh_timeout: DEFAULT_REFRESH_TIMEOUT,
            float_epsilon: DEFAULT_EPSILON,
            diff_on_tick: false,
            kinds: EntityKind::ALL.to_vec(),
        }
    }
}

impl EditorConfig {
    pub fn builder() -> EditorConfigBuilder {
        EditorConfigBuilder::default()
    }
}

/// Builder for EditorConfig
#[derive(Debug, Clone, Default)]
pub struct EditorConfigBuilder {
    target: Option<ProcessTarget>,
    poll_interval: Option<Duration>,
    refresh_timeout: Option<Duration>,
    float_epsilon: Option<f64>,
    diff_on_tick: Option<bool>,
    kinds: Option<Vec<EntityKind>>,
}

impl EditorConfigBuilder {
    pub fn target(mut self, target: ProcessTarget) -> Self {
        self.target = Some(target);
        self
    }

    /// Attach by executable name
    pub fn process_name<S: Into<String>>(self, name: S) -> Self {
        self.target(ProcessTarget::Name(name.into()))
    }

    /// Attach by process id
    pub fn pid(self, pid: u32) -> Self {
        self.target(ProcessTarget::Pid(pid))
    }

    pub fn poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = Some(interval);
        self
    }

    pub fn refresh_timeout(mut self, timeout: Duration) -> Self {
        self.refresh_timeout = Some(timeout);
        self
    }

    pub fn float_epsilon(mut self, epsilon: f64) -> Self {
        self.float_epsilon = Some(epsilon);
        self
    }

    pub fn diff_on_tick(mut self, enabled: bool) -> Self {
        self.diff_on_tick = Some(enabled);
        self
    }

    /// Restrict refreshes to these kinds; duplicates are dropped
    pub fn kinds<I: IntoIterator<Item = EntityKind>>(mut self, kinds: I) -> Self {
        let mut list: Vec<EntityKind> = Vec::new();
        for kind in kinds {
            if !list.contains(&kind) {
                list.push(kind);
            }
        }
        self.kinds = Some(list);
        self
    }

    pub fn build(self) -> EditorConfig {
        let default = EditorConfig::default();
        EditorConfig {
            target: self.target.unwrap_or(default.target),
            poll_interval: self
                .poll_interval
                .filter(|d| !d.is_zero())
                .unwrap_or(default.poll_interval),
            refresh_timeout: self
                .refresh_timeout
                .filter(|d| !d.is_zero())
                .unwrap_or(default.refresh_timeout),
            float_epsilon: self
                .float_epsilon
                .map(f64::abs)
                .unwrap_or(default.float_epsilon),
            diff_on_tick: self.diff_on_tick.unwrap_or(default.diff_on_tick),
            kinds: self.kinds.unwrap_or(default.kinds),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = EditorConfig::default();
        assert_eq!(config.poll_interval, Duration::from_millis(40));
        assert_eq!(config.target, ProcessTarget::Name("StarCraft.exe".to_string()));
        assert_eq!(config.kinds, EntityKind::ALL.to_vec());
        assert!(!config.diff_on_tick);
    }

    #[test]
    fn test_builder_overrides() {
        let config = EditorConfig::builder()
            .pid(1234)
            .poll_interval(Duration::from_millis(100))
            .float_epsilon(-0.5)
            .diff_on_tick(true)
            .kinds([EntityKind::Unit, EntityKind::Unit, EntityKind::Image])
            .build();

        assert_eq!(config.target, ProcessTarget::Pid(1234));
        assert_eq!(config.poll_interval, Duration::from_millis(100));
        assert_eq!(config.float_epsilon, 0.5);
        assert!(config.diff_on_tick);
        assert_eq!(config.kinds, vec![EntityKind::Unit, EntityKind::Image]);
        assert_eq!(config.refresh_timeout, DEFAULT_REFRESH_TIMEOUT);
    }

    #[test]
    fn test_zero_durations_fall_back_to_defaults() {
        let config = EditorConfig::builder()
            .poll_interval(Duration::ZERO)
            .refresh_timeout(Duration::ZERO)
            .build();
        assert_eq!(config.poll_interval, DEFAULT_POLL_INTERVAL);
        assert_eq!(config.refresh_timeout, DEFAULT_REFRESH_TIMEOUT);
    }
}
