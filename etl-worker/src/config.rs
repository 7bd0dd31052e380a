use anyhow::{bail, Context, Result};
use serde::Deserialize;
use std::time::Duration;
use themepark_times::config::StoreConfig;

/// Longest accepted sync interval (one week).
pub const MAX_INTERVAL_SECS: u64 = 7 * 24 * 3600;

/// Complete worker configuration.
///
/// Loaded from the TOML file named by `ETL_CONFIG` when set, otherwise from
/// defaults; environment variables override either.
#[derive(Debug, Clone, Deserialize)]
pub struct WorkerConfig {
    /// Seconds between the end of one experiences cycle and the start of the next
    #[serde(default = "default_experiences_interval")]
    pub experiences_interval_secs: u64,
    /// Seconds between the end of one schedules cycle and the start of the next
    #[serde(default = "default_schedules_interval")]
    pub schedules_interval_secs: u64,
    /// Park data API base URL
    #[serde(default = "default_api_base_url")]
    pub api_base_url: String,
    /// Credential exchange endpoint
    #[serde(default = "default_auth_url")]
    pub auth_url: String,
    /// Public client id sent with the credential exchange
    #[serde(default = "default_client_id")]
    pub client_id: String,
    /// Per-request HTTP timeout (seconds)
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
    #[serde(default)]
    pub store: StoreConfig,
}

fn default_experiences_interval() -> u64 {
    60
}

fn default_schedules_interval() -> u64 {
    3600
}

fn default_api_base_url() -> String {
    "https://api.wdpro.disney.go.com".to_string()
}

fn default_auth_url() -> String {
    "https://authorization.go.com/token".to_string()
}

fn default_client_id() -> String {
    "WDPRO-MOBILE.MDX.WDW.ANDROID-PROD".to_string()
}

fn default_request_timeout() -> u64 {
    30
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            experiences_interval_secs: default_experiences_interval(),
            schedules_interval_secs: default_schedules_interval(),
            api_base_url: default_api_base_url(),
            auth_url: default_auth_url(),
            client_id: default_client_id(),
            request_timeout_secs: default_request_timeout(),
            store: StoreConfig::default(),
        }
    }
}

impl WorkerConfig {
    /// Builds the configuration from `ETL_CONFIG` (optional) and the environment.
    pub fn from_env() -> Result<Self> {
        let mut config = match std::env::var("ETL_CONFIG") {
            Ok(path) => load_config(&path)?,
            Err(_) => Self::default(),
        };
        config.apply_env_overrides()?;
        config.validate()?;
        Ok(config)
    }

    fn apply_env_overrides(&mut self) -> Result<()> {
        if let Some(secs) = env_u64("UPDATE_FREQ_EXPERIENCES")? {
            self.experiences_interval_secs = secs;
        }
        if let Some(secs) = env_u64("UPDATE_FREQ_SCHEDULES")? {
            self.schedules_interval_secs = secs;
        }
        if let Ok(url) = std::env::var("API_BASE_URL") {
            self.api_base_url = url;
        }
        if let Ok(url) = std::env::var("AUTH_URL") {
            self.auth_url = url;
        }
        if let Ok(path) = std::env::var("PARKS_DB") {
            self.store.db_path = path;
        }
        Ok(())
    }

    fn validate(&self) -> Result<()> {
        check_interval("experiences", self.experiences_interval_secs)?;
        check_interval("schedules", self.schedules_interval_secs)?;
        Ok(())
    }

    pub fn experiences_interval(&self) -> Duration {
        Duration::from_secs(self.experiences_interval_secs)
    }

    pub fn schedules_interval(&self) -> Duration {
        Duration::from_secs(self.schedules_interval_secs)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

fn check_interval(job: &str, secs: u64) -> Result<()> {
    if secs == 0 {
        bail!("{} interval must be greater than zero", job);
    }
    if secs > MAX_INTERVAL_SECS {
        bail!(
            "{} interval of {}s exceeds the maximum of {}s",
            job,
            secs,
            MAX_INTERVAL_SECS
        );
    }
    Ok(())
}

fn env_u64(name: &str) -> Result<Option<u64>> {
    match std::env::var(name) {
        Ok(value) => value
            .trim()
            .parse()
            .map(Some)
            .with_context(|| format!("{} must be a whole number of seconds", name)),
        Err(_) => Ok(None),
    }
}

/// Load configuration from a TOML file
pub fn load_config(path: &str) -> Result<WorkerConfig> {
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file {}", path))?;
    toml::from_str(&contents).with_context(|| format!("Failed to parse config file {}", path))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use std::sync::Mutex;

    // Serialize all env-var-mutating tests; the environment is process-wide.
    static ENV_LOCK: Mutex<()> = Mutex::new(());

    const VARS: &[&str] = &[
        "ETL_CONFIG",
        "UPDATE_FREQ_EXPERIENCES",
        "UPDATE_FREQ_SCHEDULES",
        "API_BASE_URL",
        "AUTH_URL",
        "PARKS_DB",
    ];

    fn clear_env() {
        for var in VARS {
            std::env::remove_var(var);
        }
    }

    #[test]
    fn test_defaults() {
        let _lock = ENV_LOCK.lock().unwrap();
        clear_env();

        let config = WorkerConfig::from_env().unwrap();
        assert_eq!(config.experiences_interval(), Duration::from_secs(60));
        assert_eq!(config.schedules_interval(), Duration::from_secs(3600));
        assert_eq!(config.api_base_url, "https://api.wdpro.disney.go.com");
        assert_eq!(config.auth_url, "https://authorization.go.com/token");
        assert_eq!(config.client_id, "WDPRO-MOBILE.MDX.WDW.ANDROID-PROD");
        assert_eq!(config.store.db_path, "parks.db");
    }

    #[test]
    fn test_env_overrides() {
        let _lock = ENV_LOCK.lock().unwrap();
        clear_env();
        std::env::set_var("UPDATE_FREQ_EXPERIENCES", "30");
        std::env::set_var("UPDATE_FREQ_SCHEDULES", " 7200 ");
        std::env::set_var("PARKS_DB", "/tmp/parks-test.db");

        let config = WorkerConfig::from_env().unwrap();
        assert_eq!(config.experiences_interval_secs, 30);
        assert_eq!(config.schedules_interval_secs, 7200);
        assert_eq!(config.store.db_path, "/tmp/parks-test.db");

        clear_env();
    }

    #[test]
    fn test_invalid_interval() {
        let _lock = ENV_LOCK.lock().unwrap();
        clear_env();

        std::env::set_var("UPDATE_FREQ_EXPERIENCES", "soon");
        let err = WorkerConfig::from_env().unwrap_err();
        assert!(err.to_string().contains("UPDATE_FREQ_EXPERIENCES"));

        std::env::set_var("UPDATE_FREQ_EXPERIENCES", "0");
        assert!(WorkerConfig::from_env().is_err());

        clear_env();
    }

    #[test]
    fn test_interval_upper_bound() {
        let _lock = ENV_LOCK.lock().unwrap();
        clear_env();

        std::env::set_var("UPDATE_FREQ_EXPERIENCES", u64::MAX.to_string());
        let err = WorkerConfig::from_env().unwrap_err();
        assert!(err.to_string().contains("exceeds the maximum"));

        std::env::set_var("UPDATE_FREQ_EXPERIENCES", MAX_INTERVAL_SECS.to_string());
        std::env::set_var("UPDATE_FREQ_SCHEDULES", (MAX_INTERVAL_SECS + 1).to_string());
        let err = WorkerConfig::from_env().unwrap_err();
        assert!(err.to_string().starts_with("schedules interval"));

        std::env::remove_var("UPDATE_FREQ_SCHEDULES");
        let config = WorkerConfig::from_env().unwrap();
        assert_eq!(config.experiences_interval_secs, MAX_INTERVAL_SECS);

        clear_env();
    }

    #[test]
    fn test_toml_file_then_env() {
        let _lock = ENV_LOCK.lock().unwrap();
        clear_env();

        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
            experiences_interval_secs = 120
            api_base_url = "http://localhost:8080"

            [store]
            db_path = "/data/parks.db"
            "#
        )
        .unwrap();
        std::env::set_var("ETL_CONFIG", file.path());
        std::env::set_var("UPDATE_FREQ_SCHEDULES", "600");

        let config = WorkerConfig::from_env().unwrap();
        assert_eq!(config.experiences_interval_secs, 120);
        assert_eq!(config.schedules_interval_secs, 600);
        assert_eq!(config.api_base_url, "http://localhost:8080");
        assert_eq!(config.store.db_path, "/data/parks.db");
        assert_eq!(config.store.busy_timeout_ms, 5000);

        clear_env();
    }

    #[test]
    fn test_missing_config_file() {
        let err = load_config("/nonexistent/etl.toml").unwrap_err();
        assert!(err.to_string().contains("/nonexistent/etl.toml"));
    }
}
