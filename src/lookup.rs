use std::collections::HashMap;
use std::fs;
use std::io::ErrorKind;
use std::path::Path;
use tracing::{debug, warn};

/// Read-only key/value source consulted by the resolver.
pub trait Lookup {
    fn lookup(&self, key: &str) -> Option<String>;
}

/// Persisted application settings.
#[derive(Clone, Debug, Default)]
pub struct Settings(HashMap<String, String>);

impl Settings {
    /// Loads a flat JSON object of strings. A missing file is an empty map;
    /// a broken one is reported and also treated as empty.
    pub fn load(path: &Path) -> Self {
        let raw = match fs::read_to_string(path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!(path = %path.display(), "no settings file");
                return Self::default();
            }
            Err(e) => {
                warn!(path = %path.display(), error = %e, "settings file is unreadable; ignoring it");
                return Self::default();
            }
        };

        match serde_json::from_str::<HashMap<String, String>>(&raw) {
            Ok(values) => Self(values),
            Err(e) => {
                warn!(path = %path.display(), error = %e, "settings file is malformed; ignoring it");
                Self::default()
            }
        }
    }
}

impl Lookup for Settings {
    fn lookup(&self, key: &str) -> Option<String> {
        self.0.get(key).cloned()
    }
}

impl FromIterator<(String, String)> for Settings {
    fn from_iter<T: IntoIterator<Item = (String, String)>>(iter: T) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// Snapshot of the process environment.
#[derive(Clone, Debug, Default)]
pub struct Environment(HashMap<String, String>);

impl Environment {
    pub fn capture() -> Self {
        Self(std::env::vars().collect())
    }
}

impl Lookup for Environment {
    fn lookup(&self, key: &str) -> Option<String> {
        self.0.get(key).cloned()
    }
}

impl FromIterator<(String, String)> for Environment {
    fn from_iter<T: IntoIterator<Item = (String, String)>>(iter: T) -> Self {
        Self(iter.into_iter().collect())
    }
}
