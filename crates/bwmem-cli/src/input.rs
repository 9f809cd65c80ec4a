use crate::shutdown::ShutdownSignal;
use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use std::sync::Arc;
use std::sync::mpsc::Sender;
use std::thread::{self, JoinHandle};
use std::time::Duration;
use tracing::debug;

/// Keys the watch loop reacts to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyAction {
    /// Freeze the current live snapshots as baselines
    Capture,
    Quit,
}

/// Spawn a thread that turns key presses into [`KeyAction`]s.
///
/// Quit keys (Esc, q, Q, Ctrl+C) trigger `shutdown` directly; other actions are
/// sent to `actions` for the tick loop to pick up.
pub fn spawn_keyboard_monitor(
    shutdown: Arc<ShutdownSignal>,
    actions: Sender<KeyAction>,
) -> JoinHandle<()> {
    thread::spawn(move || {
        debug!("Keyboard monitor started");

        while !shutdown.is_shutdown() {
            // Poll with a timeout to keep checking the shutdown state
            if event::poll(Duration::from_millis(100)).unwrap_or(false)
                && let Ok(Event::Key(key_event)) = event::read()
                && let Some(action) = key_action(&key_event)
            {
                debug!("Key {:?} -> {:?}", key_event.code, action);
                if action == KeyAction::Quit {
                    shutdown.trigger();
                    break;
                }
                if actions.send(action).is_err() {
                    break;
                }
            }
        }

        debug!("Keyboard monitor stopped");
    })
}

fn key_action(event: &KeyEvent) -> Option<KeyAction> {
    if event.kind == KeyEventKind::Release {
        return None;
    }
    match event.code {
        KeyCode::Esc => Some(KeyAction::Quit),
        KeyCode::Char('q') | KeyCode::Char('Q') => Some(KeyAction::Quit),
        KeyCode::Char('c') if event.modifiers.contains(KeyModifiers::CONTROL) => {
            Some(KeyAction::Quit)
        }
        KeyCode::Char('c') | KeyCode::Char('C') => Some(KeyAction::Capture),
        _ => None,
    }
}
