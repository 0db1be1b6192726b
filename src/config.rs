//! Operator configuration (§6/§10): loaded entirely from environment variables, the way
//! the reference operator layers `figment::Serialized` defaults under `figment::Env`, then
//! validates immediately so a bad environment fails fast at startup instead of mid-cycle.

use figment::providers::{Env, Serialized};
use figment::Figment;
use serde::{Deserialize, Serialize};
use thiserror::Error;

fn default_mongo_port() -> u16 {
    27017
}
fn default_debug() -> String {
    "0".to_string()
}
fn default_cycle_interval_sec() -> u64 {
    30
}
fn default_election_timeout_sec() -> u64 {
    60
}
fn default_probe_timeout_sec() -> u64 {
    5
}
fn default_cycle_deadline_sec() -> u64 {
    90
}
fn default_scale_down_hysteresis_cycles() -> u32 {
    1
}
fn default_admin_max_retries() -> u32 {
    5
}
fn default_admin_backoff_base_ms() -> u64 {
    1_000
}
fn default_admin_backoff_cap_ms() -> u64 {
    30_000
}
fn default_probe_retries() -> u32 {
    3
}

/// Operator configuration, one field per environment variable in §6.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub overlay_network_name: String,
    #[serde(default)]
    pub mongo_service_name: String,
    #[serde(default)]
    pub replicaset_name: String,
    #[serde(default = "default_mongo_port")]
    pub mongo_port: u16,
    #[serde(default)]
    pub mongo_root_username: String,
    #[serde(default)]
    pub mongo_root_password: String,
    #[serde(default)]
    pub initdb_database: String,
    #[serde(default)]
    pub initdb_user: String,
    #[serde(default)]
    pub initdb_password: String,
    #[serde(default = "default_debug")]
    pub debug: String,
    #[serde(default = "default_cycle_interval_sec")]
    pub cycle_interval_sec: u64,
    #[serde(default = "default_election_timeout_sec")]
    pub election_timeout_sec: u64,
    #[serde(default = "default_probe_timeout_sec")]
    pub probe_timeout_sec: u64,
    #[serde(default = "default_cycle_deadline_sec")]
    pub cycle_deadline_sec: u64,
    #[serde(default = "default_scale_down_hysteresis_cycles")]
    pub scale_down_hysteresis_cycles: u32,
    #[serde(default = "default_admin_max_retries")]
    pub admin_max_retries: u32,
    #[serde(default = "default_admin_backoff_base_ms")]
    pub admin_backoff_base_ms: u64,
    #[serde(default = "default_admin_backoff_cap_ms")]
    pub admin_backoff_cap_ms: u64,
    #[serde(default = "default_probe_retries")]
    pub probe_retries: u32,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            overlay_network_name: String::new(),
            mongo_service_name: String::new(),
            replicaset_name: String::new(),
            mongo_port: default_mongo_port(),
            mongo_root_username: String::new(),
            mongo_root_password: String::new(),
            initdb_database: String::new(),
            initdb_user: String::new(),
            initdb_password: String::new(),
            debug: default_debug(),
            cycle_interval_sec: default_cycle_interval_sec(),
            election_timeout_sec: default_election_timeout_sec(),
            probe_timeout_sec: default_probe_timeout_sec(),
            cycle_deadline_sec: default_cycle_deadline_sec(),
            scale_down_hysteresis_cycles: default_scale_down_hysteresis_cycles(),
            admin_max_retries: default_admin_max_retries(),
            admin_backoff_base_ms: default_admin_backoff_base_ms(),
            admin_backoff_cap_ms: default_admin_backoff_cap_ms(),
            probe_retries: default_probe_retries(),
        }
    }
}

impl Config {
    pub fn is_debug(&self) -> bool {
        self.debug == "1"
    }
}

/// Configuration error kinds (§7's `ConfigError`): missing/invalid configuration, fatal
/// at startup.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required environment variable: {0}")]
    MissingRequired(&'static str),

    #[error("invalid {name}: {reason}")]
    Invalid { name: &'static str, reason: String },

    #[error("failed to extract configuration: {0}")]
    Extraction(String),
}

pub struct ConfigLoader;

impl ConfigLoader {
    /// Loads configuration from the process environment, layering defaults under the
    /// literal environment values (§10: figment `Serialized::defaults` under `Env`).
    pub fn load() -> Result<Config, ConfigError> {
        let config: Config = Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Env::raw())
            .extract()
            .map_err(|e| ConfigError::Extraction(e.to_string()))?;

        Self::validate(&config)?;
        Ok(config)
    }

    pub fn validate(config: &Config) -> Result<(), ConfigError> {
        for (name, value) in [
            ("OVERLAY_NETWORK_NAME", &config.overlay_network_name),
            ("MONGO_SERVICE_NAME", &config.mongo_service_name),
            ("REPLICASET_NAME", &config.replicaset_name),
            ("MONGO_ROOT_USERNAME", &config.mongo_root_username),
            ("MONGO_ROOT_PASSWORD", &config.mongo_root_password),
            ("INITDB_DATABASE", &config.initdb_database),
            ("INITDB_USER", &config.initdb_user),
            ("INITDB_PASSWORD", &config.initdb_password),
        ] {
            if value.is_empty() {
                return Err(ConfigError::MissingRequired(name));
            }
        }

        if config.mongo_port == 0 {
            return Err(ConfigError::Invalid {
                name: "MONGO_PORT",
                reason: "must be nonzero".to_string(),
            });
        }

        if config.cycle_interval_sec == 0 {
            return Err(ConfigError::Invalid {
                name: "CYCLE_INTERVAL_SEC",
                reason: "must be nonzero".to_string(),
            });
        }

        if config.cycle_deadline_sec < config.cycle_interval_sec {
            return Err(ConfigError::Invalid {
                name: "CYCLE_DEADLINE_SEC",
                reason: "must be at least CYCLE_INTERVAL_SEC".to_string(),
            });
        }

        if config.admin_backoff_base_ms >= config.admin_backoff_cap_ms {
            return Err(ConfigError::Invalid {
                name: "ADMIN_BACKOFF_BASE_MS",
                reason: "must be less than ADMIN_BACKOFF_CAP_MS".to_string(),
            });
        }

        if config.admin_max_retries == 0 {
            return Err(ConfigError::Invalid {
                name: "ADMIN_MAX_RETRIES",
                reason: "cannot be 0".to_string(),
            });
        }

        Ok(())
    }
}
