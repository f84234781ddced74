use std::path::PathBuf;
use std::time::Duration;

pub const DEFAULT_API_BASE_URL: &str = "http://localhost:8000/api/v1";
const DEFAULT_TIMEOUT_SECS: u64 = 30;

// Checked in order; the second one keeps existing frontend .env files working
const API_URL_VARS: [&str; 2] = ["WINGUPORT_API_BASE_URL", "VITE_API_BASE_URL"];

#[derive(Debug, Clone)]
pub struct Config {
    pub api_base_url: String,
    pub timeout: Duration,
    pub data_dir: PathBuf,
}

impl Config {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as `from_env` but reads variables through `lookup`.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let api_base_url = API_URL_VARS
            .iter()
            .filter_map(|key| lookup(key))
            .map(|v| v.trim().to_string())
            .find(|v| !v.is_empty())
            .unwrap_or_else(|| DEFAULT_API_BASE_URL.to_string());

        let timeout_secs = lookup("WINGUPORT_TIMEOUT_SECS")
            .and_then(|v| v.trim().parse::<u64>().ok())
            .unwrap_or(DEFAULT_TIMEOUT_SECS);

        Self {
            api_base_url: normalize_base_url(&api_base_url),
            timeout: Duration::from_secs(timeout_secs),
            data_dir: default_data_dir(),
        }
    }

    pub fn with_api_base_url(mut self, url: &str) -> Self {
        self.api_base_url = normalize_base_url(url);
        self
    }

    pub fn store_path(&self) -> PathBuf {
        self.data_dir.join("winguport.db")
    }
}

fn normalize_base_url(url: &str) -> String {
    url.trim().trim_end_matches('/').to_string()
}

fn default_data_dir() -> PathBuf {
    // Use XDG data directory or fallback
    if let Some(proj_dirs) = directories::ProjectDirs::from("", "", "winguport") {
        proj_dirs.data_dir().to_path_buf()
    } else {
        PathBuf::from(".")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults_when_unset() {
        let config = Config::from_lookup(lookup_from(&[]));
        assert_eq!(config.api_base_url, DEFAULT_API_BASE_URL);
        assert_eq!(config.timeout, Duration::from_secs(30));
    }

    #[test]
    fn test_vite_variable_is_honored() {
        let config = Config::from_lookup(lookup_from(&[("VITE_API_BASE_URL", "https://api.winguport.com/api/v1/")]));
        assert_eq!(config.api_base_url, "https://api.winguport.com/api/v1");
    }

    #[test]
    fn test_own_variable_wins_and_blank_is_skipped() {
        let config = Config::from_lookup(lookup_from(&[
            ("WINGUPORT_API_BASE_URL", "  "),
            ("VITE_API_BASE_URL", "https://staging.example.com/api/v1"),
            ("WINGUPORT_TIMEOUT_SECS", "5"),
        ]));
        assert_eq!(config.api_base_url, "https://staging.example.com/api/v1");
        assert_eq!(config.timeout, Duration::from_secs(5));

        let config = Config::from_lookup(lookup_from(&[
            ("WINGUPORT_API_BASE_URL", "http://127.0.0.1:9000/api/v1"),
            ("VITE_API_BASE_URL", "https://staging.example.com/api/v1"),
        ]));
        assert_eq!(config.api_base_url, "http://127.0.0.1:9000/api/v1");
    }

    #[test]
    fn test_flag_override() {
        let config = Config::from_lookup(lookup_from(&[])).with_api_base_url("https://x.test/api/");
        assert_eq!(config.api_base_url, "https://x.test/api");
        assert!(config.store_path().ends_with("winguport.db"));
    }
}
