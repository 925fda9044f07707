use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Load environment variables from .env file with robust parsing.
/// Handles values with spaces without requiring quotes.
pub fn load_dotenv() {
    load_dotenv_from(Path::new(".env"));
}

fn load_dotenv_from(env_path: &Path) {
    if !env_path.exists() {
        return;
    }

    let content = match fs::read_to_string(env_path) {
        Ok(c) => c,
        Err(_) => return,
    };

    for (key, value) in parse_dotenv(&content) {
        // Only set if not already set (env vars take precedence)
        if std::env::var(key).is_err() {
            // SAFETY: We're single-threaded at this point (called before any async runtime)
            unsafe { std::env::set_var(key, value) };
        }
    }
}

fn parse_dotenv(content: &str) -> Vec<(&str, &str)> {
    let mut pairs = Vec::new();
    for line in content.lines() {
        let line = line.trim();

        // Skip empty lines and comments
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        if let Some((key, value)) = line.split_once('=') {
            let mut value = value.trim();

            // Remove surrounding quotes if present
            if value.len() >= 2
                && ((value.starts_with('"') && value.ends_with('"'))
                    || (value.starts_with('\'') && value.ends_with('\'')))
            {
                value = &value[1..value.len() - 1];
            }
            pairs.push((key.trim(), value));
        }
    }
    pairs
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub device: DeviceConfig,
    pub simulation: SimulationConfig,
    pub loopback: LoopbackConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeviceConfig {
    pub name: String,
    /// Component the sample capabilities register on
    pub component: String,
    pub temperature_unit: String,
    pub volume_unit: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimulationConfig {
    pub interval_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoopbackConfig {
    /// Report every send as failed, to exercise the error path
    pub fail_send: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            device: DeviceConfig {
                name: "SmartThings Sample Device".to_string(),
                component: "main".to_string(),
                temperature_unit: "C".to_string(),
                volume_unit: "%".to_string(),
            },
            simulation: SimulationConfig { interval_secs: 10 },
            loopback: LoopbackConfig { fail_send: false },
        }
    }
}

impl Config {
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(name) = std::env::var("ST_DEVICE_NAME") {
            config.device.name = name;
        }
        if let Ok(component) = std::env::var("ST_COMPONENT") {
            config.device.component = component;
        }
        if let Ok(unit) = std::env::var("ST_TEMPERATURE_UNIT") {
            config.device.temperature_unit = unit;
        }
        if let Ok(unit) = std::env::var("ST_VOLUME_UNIT") {
            config.device.volume_unit = unit;
        }
        if let Ok(interval) = std::env::var("ST_SIM_INTERVAL_SECS")
            && let Ok(i) = interval.parse()
        {
            config.simulation.interval_secs = i;
        }
        if let Ok(fail) = std::env::var("ST_LOOPBACK_FAIL_SEND") {
            config.loopback.fail_send = matches!(fail.as_str(), "1" | "true" | "yes");
        }

        config
    }
}
