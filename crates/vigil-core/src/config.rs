use serde::Deserialize;
use std::collections::HashSet;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("read error: {source}")]
    Read {
        #[from]
        source: std::io::Error,
    },

    #[error("TOML parse error: {source}")]
    Parse {
        #[from]
        source: toml::de::Error,
    },
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct Config {
    pub tracking: TrackingConfig,
    pub heartbeat: HeartbeatConfig,
    pub classifier: ClassifierConfig,
    pub delivery: DeliveryConfig,
    pub storage: StorageConfig,
    pub alarms: AlarmConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct TrackingConfig {
    pub sampling_interval_seconds: u64,
    pub lookback_window_seconds: u64,
    pub recent_window_seconds: u64,
    pub min_session_millis: i64,
    pub self_package: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct HeartbeatConfig {
    pub interval_seconds: u64,
    pub interruption_threshold_seconds: u64,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ClassifierConfig {
    pub cache_ttl_seconds: u64,
    pub home_packages: HashSet<String>,
    pub application_dirs: Vec<PathBuf>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DeliveryConfig {
    pub api_base_url: String,
    pub connect_timeout_seconds: u64,
    pub read_timeout_seconds: u64,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct StorageConfig {
    pub data_dir: Option<PathBuf>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AlarmConfig {
    pub enabled: bool,
}

impl Default for TrackingConfig {
    fn default() -> Self {
        Self {
            sampling_interval_seconds: 5,
            lookback_window_seconds: 10,
            recent_window_seconds: 60,
            min_session_millis: 1000,
            self_package: "vigil".to_string(),
        }
    }
}

impl Default for HeartbeatConfig {
    fn default() -> Self {
        Self {
            interval_seconds: 60,
            interruption_threshold_seconds: 300,
        }
    }
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            cache_ttl_seconds: 3600,
            home_packages: HashSet::from([
                "gnome-shell".to_string(),
                "plasmashell".to_string(),
                "xfdesktop".to_string(),
                "desktop_window".to_string(),
                "nemo-desktop".to_string(),
            ]),
            application_dirs: default_application_dirs(),
        }
    }
}

impl Default for DeliveryConfig {
    fn default() -> Self {
        Self {
            api_base_url: "https://api.telegram.org".to_string(),
            connect_timeout_seconds: 10,
            read_timeout_seconds: 10,
        }
    }
}

impl Default for AlarmConfig {
    fn default() -> Self {
        Self { enabled: true }
    }
}

impl HeartbeatConfig {
    pub fn interruption_threshold_ms(&self) -> i64 {
        (self.interruption_threshold_seconds * 1000) as i64
    }
}

impl Config {
    pub fn load() -> Result<Self, ConfigError> {
        let path = Self::config_path();

        if !path.exists() {
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(&path)?;
        let config: Config = toml::from_str(&content)?;
        Ok(config)
    }

    pub fn config_dir() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("vigil")
    }

    pub fn config_path() -> PathBuf {
        Self::config_dir().join("config.toml")
    }

    pub fn data_dir(&self) -> PathBuf {
        self.storage.data_dir.clone().unwrap_or_else(|| {
            dirs::data_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join("vigil")
        })
    }

    pub fn reports_database_path(&self) -> PathBuf {
        self.data_dir().join("reports.db")
    }

    pub fn heartbeat_database_path(&self) -> PathBuf {
        self.data_dir().join("heartbeat.db")
    }
}

fn default_application_dirs() -> Vec<PathBuf> {
    let mut directories = Vec::new();

    if let Some(data_dir) = dirs::data_dir() {
        directories.push(data_dir.join("applications"));
    }

    let system_dirs = std::env::var("XDG_DATA_DIRS")
        .ok()
        .filter(|value| !value.is_empty())
        .unwrap_or_else(|| "/usr/local/share:/usr/share".to_string());

    for dir in system_dirs.split(':').filter(|dir| !dir.is_empty()) {
        directories.push(PathBuf::from(dir).join("applications"));
    }

    directories
}
