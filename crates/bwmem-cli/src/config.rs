//! Settings file and command-line overrides.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use bwmem::{EditorConfig, EntityKind, ProcessTarget, SchemaSet, builtin_schema, load_schema};
use serde::Deserialize;
use tracing::debug;

use crate::cli::Cli;

/// Contents of `config.toml`; every key is optional.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FileConfig {
    pub process: Option<String>,
    pub pid: Option<u32>,
    pub poll_interval_ms: Option<u64>,
    pub refresh_timeout_ms: Option<u64>,
    pub float_epsilon: Option<f64>,
    pub diff_on_tick: Option<bool>,
    pub kinds: Option<Vec<EntityKind>>,
    pub schema: Option<PathBuf>,
}

impl FileConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        toml::from_str(&content).with_context(|| format!("Failed to parse {}", path.display()))
    }

    /// An explicit path must exist; the default location may be absent.
    pub fn resolve(explicit: Option<&Path>) -> Result<Self> {
        if let Some(path) = explicit {
            return Self::load(path);
        }
        match default_config_path() {
            Some(path) if path.exists() => {
                debug!("Using settings from {}", path.display());
                Self::load(&path)
            }
            _ => Ok(Self::default()),
        }
    }
}

pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("bwmem").join("config.toml"))
}

/// Everything a command needs, merged from file and flags
pub struct Settings {
    pub editor: EditorConfig,
    pub schema: SchemaSet,
}

impl Settings {
    pub fn resolve(cli: &Cli) -> Result<Self> {
        let file = FileConfig::resolve(cli.config.as_deref())?;
        let schema_path = cli.schema.clone().or_else(|| file.schema.clone());
        let schema = match schema_path {
            Some(path) => load_schema(&path)
                .with_context(|| format!("Failed to load schema {}", path.display()))?,
            None => builtin_schema(),
        };

        Ok(Self {
            editor: editor_config(&file, cli.process.as_deref(), cli.pid),
            schema,
        })
    }
}

/// Flags win over the file, the file wins over built-in defaults.
pub fn editor_config(file: &FileConfig, process: Option<&str>, pid: Option<u32>) -> EditorConfig {
    let mut builder = EditorConfig::builder();

    let target = match (pid, process) {
        (Some(pid), _) => Some(ProcessTarget::Pid(pid)),
        (None, Some(name)) => Some(ProcessTarget::Name(name.to_string())),
        (None, None) => file
            .pid
            .map(ProcessTarget::Pid)
            .or_else(|| file.process.clone().map(ProcessTarget::Name)),
    };
    if let Some(target) = target {
        builder = builder.target(target);
    }
    if let Some(ms) = file.poll_interval_ms {
        builder = builder.poll_interval(Duration::from_millis(ms));
    }
    if let Some(ms) = file.refresh_timeout_ms {
        builder = builder.refresh_timeout(Duration::from_millis(ms));
    }
    if let Some(epsilon) = file.float_epsilon {
        builder = builder.float_epsilon(epsilon);
    }
    if let Some(diff) = file.diff_on_tick {
        builder = builder.diff_on_tick(diff);
    }
    if let Some(kinds) = &file.kinds {
        builder = builder.kinds(kinds.iter().copied());
    }

    builder.build()
}
