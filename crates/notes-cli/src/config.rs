use notes_core::AutosaveConfig;
use std::path::PathBuf;
use std::time::Duration;

/// Store location used when `NOTES_STORE_PATH` is not set.
pub const DEFAULT_STORE_PATH: &str = "~/.minimal-notes/notes.json";

/// CLI configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    /// Path to the JSON notes file
    pub store_path: PathBuf,
    /// Autosave timings for the interactive editor
    pub autosave: AutosaveConfig,
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// All variables are optional:
    /// - `NOTES_STORE_PATH`: Path to the notes file (supports ~ for home directory)
    /// - `NOTES_DEBOUNCE_MS`: Quiet period before an autosave
    /// - `NOTES_INTERVAL_MS`: Periodic autosave cadence, 0 disables it
    /// - `NOTES_STATUS_REVERT_MS`: How long "saved" stays visible
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as `from_env`, reading variables through `lookup`.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let store_path = lookup("NOTES_STORE_PATH")
            .filter(|path| !path.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_STORE_PATH.to_string());

        let mut autosave = AutosaveConfig::default();
        if let Some(debounce) = millis(&lookup, "NOTES_DEBOUNCE_MS")? {
            autosave = autosave.with_debounce(debounce);
        }
        if let Some(interval) = millis(&lookup, "NOTES_INTERVAL_MS")? {
            autosave = autosave.with_interval(interval);
        }
        if let Some(revert) = millis(&lookup, "NOTES_STATUS_REVERT_MS")? {
            autosave = autosave.with_status_revert(revert);
        }

        Ok(Self {
            store_path: expand_tilde(store_path.trim()),
            autosave,
        })
    }
}

fn millis(
    lookup: &impl Fn(&str) -> Option<String>,
    var: &'static str,
) -> Result<Option<Duration>, ConfigError> {
    let Some(raw) = lookup(var) else {
        return Ok(None);
    };
    raw.trim()
        .parse::<u64>()
        .map(|ms| Some(Duration::from_millis(ms)))
        .map_err(|_| ConfigError::InvalidMillis { var, value: raw })
}

/// Expand ~ or ~/ prefix to the user's home directory.
pub fn expand_tilde(path: &str) -> PathBuf {
    if path == "~" {
        dirs::home_dir().unwrap_or_else(|| PathBuf::from("~"))
    } else if let Some(rest) = path.strip_prefix("~/") {
        dirs::home_dir()
            .map(|home| home.join(rest))
            .unwrap_or_else(|| PathBuf::from(path))
    } else {
        PathBuf::from(path)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{var} must be a whole number of milliseconds, got '{value}'")]
    InvalidMillis { var: &'static str, value: String },
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn test_defaults_when_unset() {
        let config = Config::from_lookup(lookup(&[])).unwrap();

        assert_eq!(config.autosave, AutosaveConfig::default());
        assert!(config.store_path.ends_with(".minimal-notes/notes.json"));
    }

    #[test]
    fn test_reads_timings() {
        let config = Config::from_lookup(lookup(&[
            ("NOTES_DEBOUNCE_MS", "500"),
            ("NOTES_INTERVAL_MS", "0"),
            ("NOTES_STATUS_REVERT_MS", " 1500 "),
        ]))
        .unwrap();

        assert_eq!(config.autosave.debounce, Duration::from_millis(500));
        assert_eq!(config.autosave.interval, Duration::ZERO);
        assert_eq!(config.autosave.status_revert, Duration::from_millis(1500));
    }

    #[test]
    fn test_rejects_bad_millis() {
        let err = Config::from_lookup(lookup(&[("NOTES_DEBOUNCE_MS", "3s")])).unwrap_err();

        assert_eq!(
            err.to_string(),
            "NOTES_DEBOUNCE_MS must be a whole number of milliseconds, got '3s'"
        );
    }

    #[test]
    fn test_explicit_store_path() {
        let config =
            Config::from_lookup(lookup(&[("NOTES_STORE_PATH", "/tmp/my-notes.json")])).unwrap();
        assert_eq!(config.store_path, PathBuf::from("/tmp/my-notes.json"));
    }

    #[test]
    fn test_expand_tilde() {
        if let Some(home) = dirs::home_dir() {
            assert_eq!(expand_tilde("~"), home);
            assert_eq!(expand_tilde("~/notes.json"), home.join("notes.json"));
        }
        assert_eq!(expand_tilde("relative/notes.json"), PathBuf::from("relative/notes.json"));
    }
}
