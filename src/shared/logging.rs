use serde::{Deserialize, Serialize};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;

#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum DebugLevel {
    #[default]
    None,
    Info,
    Verbose,
}

impl DebugLevel {
    fn as_u8(self) -> u8 {
        match self {
            DebugLevel::None => 0,
            DebugLevel::Info => 1,
            DebugLevel::Verbose => 2,
        }
    }

    fn from_u8(raw: u8) -> Self {
        match raw {
            0 => DebugLevel::None,
            1 => DebugLevel::Info,
            _ => DebugLevel::Verbose,
        }
    }
}

impl std::fmt::Display for DebugLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DebugLevel::None => write!(f, "none"),
            DebugLevel::Info => write!(f, "info"),
            DebugLevel::Verbose => write!(f, "verbose"),
        }
    }
}

impl TryFrom<&str> for DebugLevel {
    type Error = String;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value.trim().to_ascii_lowercase().as_str() {
            "none" | "off" | "" => Ok(Self::None),
            "info" => Ok(Self::Info),
            "verbose" => Ok(Self::Verbose),
            other => Err(format!(
                "unknown debug level `{other}`; expected none, info or verbose"
            )),
        }
    }
}

/// JSON-line logger handed to each component at construction.
///
/// Clones share one level: `reconfigure` on any clone changes what every
/// holder writes from then on.
#[derive(Debug, Clone)]
pub struct Logger {
    path: Option<PathBuf>,
    level: Arc<AtomicU8>,
}

impl Logger {
    pub fn new(path: impl Into<PathBuf>, level: DebugLevel) -> Self {
        Self {
            path: Some(path.into()),
            level: Arc::new(AtomicU8::new(level.as_u8())),
        }
    }

    pub fn disabled() -> Self {
        Self {
            path: None,
            level: Arc::new(AtomicU8::new(DebugLevel::None.as_u8())),
        }
    }

    pub fn level(&self) -> DebugLevel {
        DebugLevel::from_u8(self.level.load(Ordering::SeqCst))
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn reconfigure(&self, level: DebugLevel) {
        self.level.store(level.as_u8(), Ordering::SeqCst);
    }

    pub fn enabled(&self, level: DebugLevel) -> bool {
        level != DebugLevel::None && self.path.is_some() && self.level() >= level
    }

    pub fn info(&self, event: &str, message: &str) {
        self.append(DebugLevel::Info, event, message);
    }

    pub fn verbose(&self, event: &str, message: &str) {
        self.append(DebugLevel::Verbose, event, message);
    }

    fn append(&self, level: DebugLevel, event: &str, message: &str) {
        if !self.enabled(level) {
            return;
        }
        let Some(path) = self.path.as_ref() else {
            return;
        };

        let payload = serde_json::json!({
            "timestamp": chrono::Utc::now().to_rfc3339(),
            "level": level,
            "event": event,
            "message": message,
        });
        let Ok(line) = serde_json::to_string(&payload) else {
            return;
        };

        if let Some(parent) = path.parent() {
            if fs::create_dir_all(parent).is_err() {
                return;
            }
        }
        let Ok(mut file) = fs::OpenOptions::new().create(true).append(true).open(path) else {
            return;
        };
        let _ = writeln!(file, "{line}");
    }
}
