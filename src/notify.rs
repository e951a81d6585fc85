//! User-facing notifications.
//!
//! Every failure path in the controllers degrades to "keep the previous
//! state and tell the user". The telling goes through a [`Notifier`],
//! injected into each controller, so a front-end can route notices to a
//! toast, a status line, or a test recorder.
//!
//! Notices are written to **stderr** so stdout stays parseable for scripts.

use std::io::Write;
use std::sync::Mutex;

use serde::Serialize;

/// A single notification.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "level", rename_all = "lowercase")]
pub enum Notice {
    Info { message: String },
    Warning { message: String },
    Error { action: String, message: String },
}

impl Notice {
    pub fn info(message: impl Into<String>) -> Self {
        Notice::Info {
            message: message.into(),
        }
    }

    pub fn warning(message: impl Into<String>) -> Self {
        Notice::Warning {
            message: message.into(),
        }
    }

    pub fn error(action: impl Into<String>, err: &anyhow::Error) -> Self {
        Notice::Error {
            action: action.into(),
            message: format!("{:#}", err),
        }
    }

    pub fn is_error(&self) -> bool {
        matches!(self, Notice::Error { .. })
    }
}

/// Receives notices. Implementations must not block.
pub trait Notifier: Send + Sync {
    fn notify(&self, notice: Notice);
}

/// Human-friendly notices on stderr: `error: could not load customers: ...`.
pub struct StderrNotifier;

impl Notifier for StderrNotifier {
    fn notify(&self, notice: Notice) {
        let line = match &notice {
            Notice::Info { message } => format!("{}\n", message),
            Notice::Warning { message } => format!("warning: {}\n", message),
            Notice::Error { action, message } => {
                format!("error: could not {}: {}\n", action, message)
            }
        };
        let mut err = std::io::stderr().lock();
        let _ = err.write_all(line.as_bytes());
        let _ = err.flush();
    }
}

/// Machine-readable notices: one JSON object per line on stderr.
pub struct JsonNotifier;

impl Notifier for JsonNotifier {
    fn notify(&self, notice: Notice) {
        if let Ok(line) = serde_json::to_string(&notice) {
            let mut err = std::io::stderr().lock();
            let _ = writeln!(err, "{}", line);
            let _ = err.flush();
        }
    }
}

/// Discards every notice.
pub struct SilentNotifier;

impl Notifier for SilentNotifier {
    fn notify(&self, _notice: Notice) {}
}

/// Keeps notices in memory, for tests and for front-ends that poll.
#[derive(Default)]
pub struct MemoryNotifier {
    notices: Mutex<Vec<Notice>>,
}

impl MemoryNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn notices(&self) -> Vec<Notice> {
        self.notices
            .lock()
            .map(|n| n.clone())
            .unwrap_or_default()
    }

    pub fn error_count(&self) -> usize {
        self.notices().iter().filter(|n| n.is_error()).count()
    }
}

impl Notifier for MemoryNotifier {
    fn notify(&self, notice: Notice) {
        if let Ok(mut n) = self.notices.lock() {
            n.push(notice);
        }
    }
}

/// Notification mode for the CLI: off, human (stderr), or JSON (stderr).
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum NotifyMode {
    Off,
    Human,
    Json,
}

impl NotifyMode {
    /// Default: human notices when stderr is a TTY, otherwise JSON.
    pub fn default_for_tty() -> Self {
        if atty::is(atty::Stream::Stderr) {
            NotifyMode::Human
        } else {
            NotifyMode::Json
        }
    }

    pub fn notifier(&self) -> Box<dyn Notifier> {
        match self {
            NotifyMode::Off => Box::new(SilentNotifier),
            NotifyMode::Human => Box::new(StderrNotifier),
            NotifyMode::Json => Box::new(JsonNotifier),
        }
    }
}
