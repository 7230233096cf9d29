use std::env;
use std::path::PathBuf;
use std::time::Duration;
use dirs::home_dir;

const STATE_DIR: &str = ".tapline";
const DEFAULT_GEMINI: &str = "gemini";
const DEFAULT_GIT_TIMEOUT_MS: u64 = 5000;

/// Runtime settings, read once from the environment at startup.
#[derive(Debug, Clone)]
pub struct Config {
    /// Directory holding the session file. `None` when no home directory
    /// could be resolved and no override was given.
    pub state_dir: Option<PathBuf>,
    pub gemini_bin: String,
    pub git_timeout: Duration,
}

impl Config {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let state_dir = non_empty("TAPLINE_DIR")
            .map(PathBuf::from)
            .or_else(|| home_dir().map(|home| home.join(STATE_DIR)));

        let gemini_bin = non_empty("TAPLINE_GEMINI_BIN")
            .unwrap_or_else(|| DEFAULT_GEMINI.to_string());

        let git_timeout_ms = non_empty("TAPLINE_GIT_TIMEOUT_MS")
            .and_then(|v| match v.trim().parse::<u64>() {
                Ok(ms) => Some(ms),
                Err(_) => {
                    log::warn!("Ignoring invalid TAPLINE_GIT_TIMEOUT_MS: {}", v);
                    None
                }
            })
            .unwrap_or(DEFAULT_GIT_TIMEOUT_MS);

        Config {
            state_dir,
            gemini_bin,
            git_timeout: Duration::from_millis(git_timeout_ms),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config_with(vars: &[(&str, &str)]) -> Config {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn test_defaults() {
        let config = config_with(&[]);
        assert_eq!(config.gemini_bin, "gemini");
        assert_eq!(config.git_timeout, Duration::from_secs(5));
    }

    #[test]
    fn test_overrides() {
        let config = config_with(&[
            ("TAPLINE_DIR", "/tmp/tapline-test"),
            ("TAPLINE_GEMINI_BIN", "/opt/bin/gemini"),
            ("TAPLINE_GIT_TIMEOUT_MS", "250"),
        ]);
        assert_eq!(config.state_dir, Some(PathBuf::from("/tmp/tapline-test")));
        assert_eq!(config.gemini_bin, "/opt/bin/gemini");
        assert_eq!(config.git_timeout, Duration::from_millis(250));
    }

    #[test]
    fn test_invalid_timeout_falls_back() {
        let config = config_with(&[("TAPLINE_GIT_TIMEOUT_MS", "soon")]);
        assert_eq!(config.git_timeout, Duration::from_millis(DEFAULT_GIT_TIMEOUT_MS));
    }
}
