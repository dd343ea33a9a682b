use serde::Deserialize;

/// Root application configuration. Loaded from environment variables
/// with the prefix `BRANDORBIT__` and TOML config files.
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    #[serde(default = "default_service_name")]
    pub service_name: String,
    #[serde(default)]
    pub api: ApiConfig,
    #[serde(default)]
    pub metrics: MetricsConfig,
    #[serde(default)]
    pub privacy: PrivacyConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ApiConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_http_port")]
    pub http_port: u16,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MetricsConfig {
    #[serde(default = "default_metrics_port")]
    pub port: u16,
}

/// Knobs for the data-subject-rights pipeline and the cascade worker.
#[derive(Debug, Clone, Deserialize)]
pub struct PrivacyConfig {
    /// Delay between a deletion request being accepted and its job
    /// becoming eligible for processing. Allows reversal.
    #[serde(default = "default_grace_period_hours")]
    pub grace_period_hours: u32,
    /// How often the scheduled worker polls for due jobs.
    #[serde(default = "default_worker_interval_secs")]
    pub worker_interval_secs: u64,
    /// Maximum jobs picked up in a single worker run.
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
    /// Running jobs whose lease is older than this are reclaimed to Queued.
    #[serde(default = "default_lease_timeout_secs")]
    pub lease_timeout_secs: u64,
}

// Default functions
fn default_service_name() -> String {
    "brandorbit".to_string()
}
fn default_host() -> String {
    "0.0.0.0".to_string()
}
fn default_http_port() -> u16 {
    8080
}
fn default_metrics_port() -> u16 {
    9091
}
fn default_grace_period_hours() -> u32 {
    72
}
fn default_worker_interval_secs() -> u64 {
    60
}
fn default_batch_size() -> usize {
    10
}
fn default_lease_timeout_secs() -> u64 {
    900
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            http_port: default_http_port(),
        }
    }
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            port: default_metrics_port(),
        }
    }
}

impl Default for PrivacyConfig {
    fn default() -> Self {
        Self {
            grace_period_hours: default_grace_period_hours(),
            worker_interval_secs: default_worker_interval_secs(),
            batch_size: default_batch_size(),
            lease_timeout_secs: default_lease_timeout_secs(),
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            service_name: default_service_name(),
            api: ApiConfig::default(),
            metrics: MetricsConfig::default(),
            privacy: PrivacyConfig::default(),
        }
    }
}

impl AppConfig {
    /// Load configuration from environment variables.
    pub fn load() -> Result<Self, config::ConfigError> {
        let builder = config::Config::builder().add_source(
            config::Environment::with_prefix("BRANDORBIT")
                .separator("__")
                .try_parsing(true)
                .list_separator(","),
        );

        let config = builder.build()?;
        config.try_deserialize()
    }
}
