use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::reddit::SortOption;

const DEFAULT_ENV_PREFIX: &str = "REDTERM";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct Config {
    #[serde(default)]
    pub reddit: RedditConfig,
    #[serde(default)]
    pub fetch: FetchConfig,
    #[serde(default)]
    pub ui: UiConfig,
    #[serde(default)]
    pub input: InputConfig,
    #[serde(default)]
    pub log: LogConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RedditConfig {
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
    #[serde(default)]
    pub base_url: Option<String>,
}

impl Default for RedditConfig {
    fn default() -> Self {
        Self {
            user_agent: default_user_agent(),
            base_url: None,
        }
    }
}

fn default_user_agent() -> String {
    format!(
        "redterm/{} (+https://github.com/redterm-dev/redterm)",
        env!("CARGO_PKG_VERSION")
    )
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FetchConfig {
    /// Subreddit opened at startup; empty means the front page.
    #[serde(default)]
    pub subreddit: String,
    #[serde(default)]
    pub sort: SortOption,
    #[serde(default = "default_limit")]
    pub limit: u32,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            subreddit: String::new(),
            sort: SortOption::default(),
            limit: default_limit(),
        }
    }
}

fn default_limit() -> u32 {
    25
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct UiConfig {
    #[serde(default = "default_indent_unit")]
    pub indent_unit: usize,
    #[serde(default = "default_base_indent")]
    pub base_indent: usize,
    #[serde(default = "default_true")]
    pub separators: bool,
    /// Whether backspace on the root page keeps it (true) or exits (false).
    #[serde(default = "default_true")]
    pub keep_root: bool,
}

impl Default for UiConfig {
    fn default() -> Self {
        Self {
            indent_unit: default_indent_unit(),
            base_indent: default_base_indent(),
            separators: true,
            keep_root: true,
        }
    }
}

fn default_indent_unit() -> usize {
    2
}

fn default_base_indent() -> usize {
    2
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct InputConfig {
    #[serde(default = "default_poll_interval", with = "humantime_serde")]
    pub poll_interval: Duration,
}

impl Default for InputConfig {
    fn default() -> Self {
        Self {
            poll_interval: default_poll_interval(),
        }
    }
}

fn default_poll_interval() -> Duration {
    Duration::from_secs(1)
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LogConfig {
    #[serde(default = "default_log_file")]
    pub file: Option<PathBuf>,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            file: default_log_file(),
        }
    }
}

fn default_log_file() -> Option<PathBuf> {
    dirs::cache_dir().map(|dir| dir.join("redterm").join("redterm.log"))
}

#[derive(Debug, Clone, Default)]
pub struct LoadOptions {
    pub config_file: Option<PathBuf>,
    pub env_prefix: Option<String>,
}

pub fn load(options: LoadOptions) -> Result<Config> {
    let mut cfg = Config::default();

    if let Some(path) = options.config_file.as_ref() {
        if path.exists() {
            cfg = read_config_file(path)?;
        }
    } else if let Some(default_path) = default_config_path() {
        if default_path.exists() {
            cfg = read_config_file(&default_path)?;
        }
    }

    let prefix = options.env_prefix.as_deref().unwrap_or(DEFAULT_ENV_PREFIX);
    apply_env(&mut cfg, prefix);

    Ok(cfg)
}

fn read_config_file(path: &Path) -> Result<Config> {
    let data = fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file at {}", path.display()))?;
    let config: Config = serde_yaml::from_str(&data)
        .with_context(|| format!("Failed to parse config file at {}", path.display()))?;
    Ok(config)
}

fn apply_env(cfg: &mut Config, prefix: &str) {
    let upper_prefix = format!("{}_", prefix.to_uppercase());

    for (key, value) in env::vars() {
        if let Some(stripped) = key.strip_prefix(&upper_prefix) {
            let normalized = stripped.to_ascii_lowercase().replace("__", ".");
            apply_env_value(cfg, &normalized, value);
        }
    }
}

fn apply_env_value(cfg: &mut Config, key: &str, value: String) {
    match key {
        "reddit.user_agent" => cfg.reddit.user_agent = value,
        "reddit.base_url" => cfg.reddit.base_url = Some(value),
        "fetch.subreddit" => cfg.fetch.subreddit = value,
        "fetch.sort" => cfg.fetch.sort = sort_from_key(&value),
        "fetch.limit" => {
            if let Ok(parsed) = value.parse::<u32>() {
                cfg.fetch.limit = parsed;
            }
        }
        "ui.indent_unit" => {
            if let Ok(parsed) = value.parse::<usize>() {
                cfg.ui.indent_unit = parsed;
            }
        }
        "ui.base_indent" => {
            if let Ok(parsed) = value.parse::<usize>() {
                cfg.ui.base_indent = parsed;
            }
        }
        "ui.separators" => cfg.ui.separators = truthy(&value),
        "ui.keep_root" => cfg.ui.keep_root = truthy(&value),
        "input.poll_interval" => {
            if let Ok(duration) = humantime::parse_duration(&value) {
                cfg.input.poll_interval = duration;
            }
        }
        "log.file" => cfg.log.file = Some(PathBuf::from(value)),
        _ => {}
    }
}

fn sort_from_key(key: &str) -> SortOption {
    match key {
        "best" => SortOption::Best,
        "new" => SortOption::New,
        "top" => SortOption::Top,
        "rising" => SortOption::Rising,
        _ => SortOption::Hot,
    }
}

fn truthy(value: &str) -> bool {
    matches!(value, "1" | "true" | "TRUE" | "True")
}

fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("redterm").join("config.yaml"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::env;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn defaults_are_sane() {
        let cfg = Config::default();
        assert_eq!(cfg.fetch.limit, 25);
        assert_eq!(cfg.ui.indent_unit, 2);
        assert!(cfg.ui.keep_root);
        assert_eq!(cfg.input.poll_interval, Duration::from_secs(1));
        assert!(cfg.reddit.user_agent.starts_with("redterm/"));
    }

    #[test]
    fn file_values_override_defaults() {
        let mut file = NamedTempFile::new().unwrap();
        write!(
            file,
            "fetch:\n  subreddit: rust\n  limit: 10\nui:\n  separators: false\ninput:\n  poll_interval: 250ms\n"
        )
        .unwrap();

        let cfg = load(LoadOptions {
            config_file: Some(file.path().to_path_buf()),
            env_prefix: Some("REDTERM_TEST_NONE".to_string()),
        })
        .unwrap();

        assert_eq!(cfg.fetch.subreddit, "rust");
        assert_eq!(cfg.fetch.limit, 10);
        assert!(!cfg.ui.separators);
        assert_eq!(cfg.input.poll_interval, Duration::from_millis(250));
        // Untouched sections keep their defaults.
        assert_eq!(cfg.ui.indent_unit, 2);
    }

    #[test]
    fn env_overrides_file() {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, "fetch:\n  subreddit: rust\n").unwrap();

        env::set_var("REDTERM_ENVTEST_FETCH__SUBREDDIT", "programming");
        env::set_var("REDTERM_ENVTEST_UI__KEEP_ROOT", "false");
        let cfg = load(LoadOptions {
            config_file: Some(file.path().to_path_buf()),
            env_prefix: Some("REDTERM_ENVTEST".to_string()),
        })
        .unwrap();
        env::remove_var("REDTERM_ENVTEST_FETCH__SUBREDDIT");
        env::remove_var("REDTERM_ENVTEST_UI__KEEP_ROOT");

        assert_eq!(cfg.fetch.subreddit, "programming");
        assert!(!cfg.ui.keep_root);
    }

    #[test]
    fn unknown_sort_keys_fall_back_to_hot() {
        assert_eq!(sort_from_key("top"), SortOption::Top);
        assert_eq!(sort_from_key("bogus"), SortOption::Hot);
    }
}
