//! Configuration types and loading
//!
//! The file path comes from `--config` or CONFIG_PATH (see `cli`).
//! The consumer secret is loaded from TWEETPOOL_CONSUMER_SECRET or
//! consumer.secret_file, never stored in the TOML directly.

use std::path::{Path, PathBuf};
use std::time::Duration;

use common::Secret;
use serde::Deserialize;
use token_pool::FamilyLimit;
use tweetpool::ClientConfig;

pub const SECRET_ENV: &str = "TWEETPOOL_CONSUMER_SECRET";

/// Root configuration
#[derive(Debug, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub api: ApiConfig,
    pub consumer: ConsumerConfig,
    pub pool: PoolConfig,
    #[serde(default)]
    pub paging: PagingConfig,
}

/// Remote API settings
#[derive(Debug, Deserialize)]
pub struct ApiConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            timeout_secs: default_timeout(),
        }
    }
}

/// Application credentials
#[derive(Debug, Deserialize)]
pub struct ConsumerConfig {
    pub key: String,
    #[serde(skip)]
    pub secret: Option<Secret<String>>,
    /// Path to a file holding the consumer secret (alternative to the env var)
    #[serde(default)]
    pub secret_file: Option<PathBuf>,
}

/// Credential pool settings
#[derive(Debug, Deserialize)]
pub struct PoolConfig {
    /// JSON array of `{"user_id", "key", "secret"}` entries
    pub access_tokens_file: PathBuf,
    #[serde(default)]
    pub wait_on_rate_limit: bool,
    /// Seconds a user-scoped call waits for that user's credential to be
    /// released by another call
    #[serde(default)]
    pub pin_wait_secs: u64,
    /// Overrides for the built-in endpoint family limits
    #[serde(default)]
    pub families: Vec<FamilyOverride>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct FamilyOverride {
    pub family: String,
    pub limit: u32,
    #[serde(default = "default_period")]
    pub period_secs: u64,
}

#[derive(Debug, Deserialize)]
pub struct PagingConfig {
    #[serde(default = "default_timeline_page_size")]
    pub timeline_page_size: usize,
    #[serde(default = "default_lookup_batch_size")]
    pub lookup_batch_size: usize,
    #[serde(default = "default_ids_page_size")]
    pub ids_page_size: usize,
}

impl Default for PagingConfig {
    fn default() -> Self {
        Self {
            timeline_page_size: default_timeline_page_size(),
            lookup_batch_size: default_lookup_batch_size(),
            ids_page_size: default_ids_page_size(),
        }
    }
}

fn default_base_url() -> String {
    "https://api.twitter.com/1.1".into()
}

fn default_timeout() -> u64 {
    30
}

fn default_period() -> u64 {
    15 * 60
}

fn default_timeline_page_size() -> usize {
    200
}

fn default_lookup_batch_size() -> usize {
    100
}

fn default_ids_page_size() -> usize {
    5000
}

impl Config {
    /// Load configuration from a TOML file, then overlay environment variables.
    ///
    /// Consumer secret resolution order:
    /// 1. TWEETPOOL_CONSUMER_SECRET env var
    /// 2. secret_file path from config
    pub fn load(path: &Path) -> common::Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let mut config: Config = toml::from_str(&contents)?;

        if !config.api.base_url.starts_with("http://") && !config.api.base_url.starts_with("https://") {
            return Err(common::Error::Config(format!(
                "base_url must start with http:// or https://, got: {}",
                config.api.base_url
            )));
        }

        if config.api.timeout_secs == 0 {
            return Err(common::Error::Config(
                "timeout_secs must be greater than 0".into(),
            ));
        }

        for (name, value) in [
            ("timeline_page_size", config.paging.timeline_page_size),
            ("lookup_batch_size", config.paging.lookup_batch_size),
            ("ids_page_size", config.paging.ids_page_size),
        ] {
            if value == 0 {
                return Err(common::Error::Config(format!("{name} must be greater than 0")));
            }
        }

        for family in &config.pool.families {
            if family.limit == 0 || family.period_secs == 0 {
                return Err(common::Error::Config(format!(
                    "family {} needs a limit and period greater than 0",
                    family.family
                )));
            }
        }

        if let Ok(secret) = std::env::var(SECRET_ENV) {
            config.consumer.secret = Some(Secret::new(secret));
        } else if let Some(ref secret_file) = config.consumer.secret_file {
            let secret = std::fs::read_to_string(secret_file).map_err(|e| {
                common::Error::Config(format!(
                    "failed to read secret_file {}: {e}",
                    secret_file.display()
                ))
            })?;
            let secret = secret.trim().to_owned();
            if !secret.is_empty() {
                config.consumer.secret = Some(Secret::new(secret));
            }
        }

        if config.consumer.secret.as_ref().is_none_or(|s| s.is_empty()) {
            return Err(common::Error::Config(format!(
                "consumer secret missing: set {SECRET_ENV} or consumer.secret_file"
            )));
        }

        Ok(config)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.api.timeout_secs)
    }

    /// Client settings: built-in family limits with the configured overrides
    /// applied on top.
    pub fn client_config(&self) -> ClientConfig {
        let mut client = ClientConfig {
            timeline_page_size: self.paging.timeline_page_size,
            lookup_batch_size: self.paging.lookup_batch_size,
            ids_page_size: self.paging.ids_page_size,
            ..ClientConfig::default()
        };
        client.tracker.wait_on_rate_limit = self.pool.wait_on_rate_limit;
        client.tracker.pin_wait = Duration::from_secs(self.pool.pin_wait_secs);
        for family in &self.pool.families {
            client.tracker.families.insert(
                family.family.clone(),
                FamilyLimit::new(family.limit, Duration::from_secs(family.period_secs)),
            );
        }
        client
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    /// Serializes tests that touch environment variables.
    static ENV_MUTEX: Mutex<()> = Mutex::new(());

    /// SAFETY: Callers must hold ENV_MUTEX to prevent concurrent env mutation.
    unsafe fn set_env(key: &str, val: &str) {
        unsafe { std::env::set_var(key, val) };
    }

    unsafe fn remove_env(key: &str) {
        unsafe { std::env::remove_var(key) };
    }

    const MINIMAL: &str = r#"
[consumer]
key = "ck"

[pool]
access_tokens_file = "/etc/tweetpool/tokens.json"
"#;

    fn write_config(dir: &tempfile::TempDir, contents: &str) -> PathBuf {
        let path = dir.path().join("tweetpool.toml");
        std::fs::write(&path, contents).unwrap();
        path
    }

    #[test]
    fn minimal_config_gets_defaults() {
        let _lock = ENV_MUTEX.lock().unwrap();
        let dir = tempfile::tempdir().unwrap();
        let path = write_config(&dir, MINIMAL);
        unsafe { set_env(SECRET_ENV, "cs-env") };

        let config = Config::load(&path).unwrap();
        unsafe { remove_env(SECRET_ENV) };

        assert_eq!(config.api.base_url, "https://api.twitter.com/1.1");
        assert_eq!(config.api.timeout_secs, 30);
        assert_eq!(config.consumer.secret.as_ref().unwrap().expose(), "cs-env");
        assert!(!config.pool.wait_on_rate_limit);
        assert_eq!(config.pool.pin_wait_secs, 0);
        assert_eq!(config.paging.timeline_page_size, 200);
        assert_eq!(config.paging.lookup_batch_size, 100);
        assert_eq!(config.paging.ids_page_size, 5000);
    }

    #[test]
    fn secret_from_file() {
        let _lock = ENV_MUTEX.lock().unwrap();
        let dir = tempfile::tempdir().unwrap();
        let secret_path = dir.path().join("consumer_secret");
        std::fs::write(&secret_path, "cs-file\n").unwrap();
        let path = write_config(
            &dir,
            &format!(
                r#"
[consumer]
key = "ck"
secret_file = "{}"

[pool]
access_tokens_file = "tokens.json"
"#,
                secret_path.display()
            ),
        );
        unsafe { remove_env(SECRET_ENV) };

        let config = Config::load(&path).unwrap();
        assert_eq!(config.consumer.secret.as_ref().unwrap().expose(), "cs-file");
    }

    #[test]
    fn env_secret_wins_over_missing_file() {
        let _lock = ENV_MUTEX.lock().unwrap();
        let dir = tempfile::tempdir().unwrap();
        let path = write_config(
            &dir,
            r#"
[consumer]
key = "ck"
secret_file = "/nonexistent/secret"

[pool]
access_tokens_file = "tokens.json"
"#,
        );
        unsafe { set_env(SECRET_ENV, "cs-env-wins") };
        let config = Config::load(&path).unwrap();
        unsafe { remove_env(SECRET_ENV) };

        assert_eq!(config.consumer.secret.as_ref().unwrap().expose(), "cs-env-wins");
    }

    #[test]
    fn missing_secret_is_rejected() {
        let _lock = ENV_MUTEX.lock().unwrap();
        let dir = tempfile::tempdir().unwrap();
        let path = write_config(&dir, MINIMAL);
        unsafe { remove_env(SECRET_ENV) };

        let err = Config::load(&path).unwrap_err().to_string();
        assert!(err.contains("consumer secret missing"), "got: {err}");
    }

    #[test]
    fn blank_secret_file_is_rejected() {
        let _lock = ENV_MUTEX.lock().unwrap();
        let dir = tempfile::tempdir().unwrap();
        let secret_path = dir.path().join("consumer_secret");
        std::fs::write(&secret_path, "  \n").unwrap();
        let path = write_config(
            &dir,
            &format!(
                "[consumer]\nkey = \"ck\"\nsecret_file = \"{}\"\n\n[pool]\naccess_tokens_file = \"t.json\"\n",
                secret_path.display()
            ),
        );
        unsafe { remove_env(SECRET_ENV) };

        assert!(Config::load(&path).is_err());
    }

    #[test]
    fn invalid_base_url_rejected() {
        let _lock = ENV_MUTEX.lock().unwrap();
        let dir = tempfile::tempdir().unwrap();
        let path = write_config(&dir, &format!("[api]\nbase_url = \"api.twitter.com\"\n{MINIMAL}"));
        unsafe { set_env(SECRET_ENV, "cs") };
        let err = Config::load(&path).unwrap_err().to_string();
        unsafe { remove_env(SECRET_ENV) };

        assert!(err.contains("base_url must start with http"), "got: {err}");
    }

    #[test]
    fn zero_timeout_rejected() {
        let _lock = ENV_MUTEX.lock().unwrap();
        let dir = tempfile::tempdir().unwrap();
        let path = write_config(&dir, &format!("[api]\ntimeout_secs = 0\n{MINIMAL}"));
        unsafe { set_env(SECRET_ENV, "cs") };
        let result = Config::load(&path);
        unsafe { remove_env(SECRET_ENV) };

        assert!(result.is_err(), "timeout_secs = 0 must be rejected");
    }

    #[test]
    fn zero_page_size_rejected() {
        let _lock = ENV_MUTEX.lock().unwrap();
        let dir = tempfile::tempdir().unwrap();
        let path = write_config(&dir, &format!("{MINIMAL}\n[paging]\nlookup_batch_size = 0\n"));
        unsafe { set_env(SECRET_ENV, "cs") };
        let err = Config::load(&path).unwrap_err().to_string();
        unsafe { remove_env(SECRET_ENV) };

        assert!(err.contains("lookup_batch_size"), "got: {err}");
    }

    #[test]
    fn family_overrides_apply_on_top_of_defaults() {
        let _lock = ENV_MUTEX.lock().unwrap();
        let dir = tempfile::tempdir().unwrap();
        let path = write_config(
            &dir,
            r#"
[consumer]
key = "ck"

[pool]
access_tokens_file = "tokens.json"
wait_on_rate_limit = true
pin_wait_secs = 10

[[pool.families]]
family = "/statuses/home_timeline"
limit = 5

[[pool.families]]
family = "/search/tweets"
limit = 180
period_secs = 60
"#,
        );
        unsafe { set_env(SECRET_ENV, "cs") };
        let config = Config::load(&path).unwrap();
        unsafe { remove_env(SECRET_ENV) };

        let client = config.client_config();
        assert!(client.tracker.wait_on_rate_limit);
        assert_eq!(client.tracker.pin_wait, Duration::from_secs(10));
        let families = &client.tracker.families;
        assert_eq!(families["/statuses/home_timeline"], FamilyLimit::per_window(5));
        assert_eq!(
            families["/search/tweets"],
            FamilyLimit::new(180, Duration::from_secs(60))
        );
        assert_eq!(families["/users/show"], FamilyLimit::per_window(900));
    }

    #[test]
    fn zero_family_limit_rejected() {
        let _lock = ENV_MUTEX.lock().unwrap();
        let dir = tempfile::tempdir().unwrap();
        let path = write_config(
            &dir,
            &format!("{MINIMAL}\n[[pool.families]]\nfamily = \"/users/show\"\nlimit = 0\n"),
        );
        unsafe { set_env(SECRET_ENV, "cs") };
        let result = Config::load(&path);
        unsafe { remove_env(SECRET_ENV) };

        assert!(result.is_err());
    }

    #[test]
    fn missing_file_is_error() {
        assert!(Config::load(Path::new("/nonexistent/tweetpool.toml")).is_err());
    }
}
