use config::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use tracing::{debug, info};

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct MinServiceConfig {
    pub service: ServiceConfig,
    pub worker: WorkerConfig,
    pub shutdown: ShutdownConfig,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct ServiceConfig {
    /// Name the process registers under with the host service manager
    #[serde(default = "default_service_name")]
    pub name: String,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct WorkerConfig {
    /// Pause between task iterations in milliseconds
    #[serde(default = "default_interval_ms")]
    pub interval_ms: u64,

    /// How the pause is measured
    #[serde(default)]
    pub cadence: WorkerCadence,

    /// Wake from the pause as soon as the stop signal is set
    #[serde(default = "default_wake_on_stop")]
    pub wake_on_stop: bool,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct ShutdownConfig {
    /// Wait for the worker loop to exit before reporting STOPPED
    #[serde(default = "default_join_worker")]
    pub join_worker: bool,

    /// Upper bound on the worker join in milliseconds
    #[serde(default = "default_worker_join_timeout_ms")]
    pub worker_join_timeout_ms: u64,
}

#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum WorkerCadence {
    /// Sleep the full interval after every iteration
    #[default]
    FixedDelay,
    /// Sleep whatever is left of the interval once the iteration finishes
    FixedRate,
}

impl WorkerCadence {
    fn as_str(&self) -> &'static str {
        match self {
            Self::FixedDelay => "fixed_delay",
            Self::FixedRate => "fixed_rate",
        }
    }
}

impl WorkerConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }
}

impl ShutdownConfig {
    /// Join bound, or `None` when the worker is left detached
    pub fn worker_join_timeout(&self) -> Option<Duration> {
        self.join_worker
            .then(|| Duration::from_millis(self.worker_join_timeout_ms))
    }
}

impl MinServiceConfig {
    /// Load configuration from a specific file path
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path_str = path.as_ref().to_string_lossy();
        debug!("Loading configuration from: {}", path_str);

        let settings = Config::builder()
            .set_default("service.name", default_service_name())?
            .set_default("worker.interval_ms", default_interval_ms() as i64)?
            .set_default("worker.cadence", WorkerCadence::default().as_str())?
            .set_default("worker.wake_on_stop", default_wake_on_stop())?
            .set_default("shutdown.join_worker", default_join_worker())?
            .set_default(
                "shutdown.worker_join_timeout_ms",
                default_worker_join_timeout_ms() as i64,
            )?
            // Add configuration file (optional)
            .add_source(File::with_name(&path_str).required(false))
            // MINSERVICE_WORKER__INTERVAL_MS=500 and friends
            .add_source(
                Environment::with_prefix("MINSERVICE")
                    .prefix_separator("_")
                    .separator("__"),
            )
            .build()?;

        let config: MinServiceConfig = settings.try_deserialize()?;

        info!("Configuration loaded successfully");
        debug!("Final configuration: {:#?}", config);

        Ok(config)
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.service.name.trim().is_empty() {
            return Err(ConfigError::Message(
                "Service name must not be empty".to_string(),
            ));
        }

        if self.worker.interval_ms == 0 {
            return Err(ConfigError::Message(
                "Worker interval_ms must be greater than 0".to_string(),
            ));
        }

        if self.shutdown.join_worker && self.shutdown.worker_join_timeout_ms == 0 {
            return Err(ConfigError::Message(
                "Shutdown worker_join_timeout_ms must be greater than 0 when join_worker is set"
                    .to_string(),
            ));
        }

        Ok(())
    }
}

impl Default for MinServiceConfig {
    fn default() -> Self {
        Self {
            service: ServiceConfig {
                name: default_service_name(),
            },
            worker: WorkerConfig {
                interval_ms: default_interval_ms(),
                cadence: WorkerCadence::default(),
                wake_on_stop: default_wake_on_stop(),
            },
            shutdown: ShutdownConfig {
                join_worker: default_join_worker(),
                worker_join_timeout_ms: default_worker_join_timeout_ms(),
            },
        }
    }
}

// Default value functions
fn default_service_name() -> String {
    "MinimalRustService".to_string()
}

fn default_interval_ms() -> u64 {
    3000
}
fn default_wake_on_stop() -> bool {
    true
}

fn default_join_worker() -> bool {
    true
}
fn default_worker_join_timeout_ms() -> u64 {
    5000
}
