use std::path::PathBuf;

use anyhow::Result;

use config::Config;

use serde::{Deserialize, Serialize};

use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

const DEFAULT_TRACKED_CRATES: &[&str] = &[
    "snapcloudd",
    "xecute",
    "apikit",
    "snapcloud_auth",
    "blockstore",
    "interface",
    "protocol",
    "tower_http",
];

#[cfg(debug_assertions)]
const NORMAL_CRATE_LEVEL: &str = "debug";

#[cfg(not(debug_assertions))]
const NORMAL_CRATE_LEVEL: &str = "info";

#[cfg(debug_assertions)]
const DETAILED_CRATE_LEVEL: &str = "trace";

#[cfg(not(debug_assertions))]
const DETAILED_CRATE_LEVEL: &str = "debug";

#[derive(Debug, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Normal,
    Detailed,
}

#[derive(Debug, Deserialize, Serialize)]
#[serde(untagged)]
pub enum LogStructure {
    Preset(LogLevel),
    Explicit(Vec<String>),
}

#[derive(Debug, Deserialize, Serialize)]
pub struct LoggingConfig {
    pub level: LogStructure,

    #[serde(default)]
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: LogStructure::Preset(LogLevel::Normal),
            json: false,
        }
    }
}

impl LoggingConfig {
    fn directives(&self) -> Vec<String> {
        let preset = |level: &str| {
            DEFAULT_TRACKED_CRATES
                .iter()
                .map(|crate_name| format!("{}={}", crate_name, level))
                .collect::<Vec<_>>()
        };

        match &self.level {
            LogStructure::Explicit(dirs) => dirs.clone(),
            LogStructure::Preset(LogLevel::Normal) => preset(NORMAL_CRATE_LEVEL),
            LogStructure::Preset(LogLevel::Detailed) => preset(DETAILED_CRATE_LEVEL),
        }
    }

    fn get_filter(&self) -> EnvFilter {
        EnvFilter::new(self.directives().join(","))
    }
}

fn get_logging_config(path: &Option<PathBuf>) -> Result<LoggingConfig> {
    let mut builder = Config::builder()
        .set_default("level", "normal")?
        .set_default("json", false)?;

    if let Some(path) = path {
        builder = builder.add_source(config::File::from(path.as_ref()));
    }

    let config: LoggingConfig = builder
        .add_source(config::Environment::with_prefix("SNAPCLOUD_LOG"))
        .build()?
        .try_deserialize()?;

    Ok(config)
}

pub fn init_logger(log_cfg_path: &Option<PathBuf>) -> Result<()> {
    let cfg = get_logging_config(log_cfg_path)?;

    let env_filter = cfg.get_filter();

    if cfg.json {
        FmtSubscriber::builder()
            .with_env_filter(env_filter)
            .json()
            .finish()
            .try_init()?;
    } else {
        FmtSubscriber::builder()
            .with_env_filter(env_filter)
            .finish()
            .try_init()?;
    }

    Ok(())
}
