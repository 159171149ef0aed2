use std::fs;
use std::path::PathBuf;
use std::time::Duration;

use config::{builder::DefaultState, Config as ConfigLoader, ConfigBuilder, Environment, File};

use anyhow::{anyhow, Result};

use blockstore::{BlockProtocol, RetryPolicy, DEFAULT_PART_SIZE, DEFAULT_READ_BLOCK_SIZE};

use serde::{Deserialize, Serialize};

const DEFAULT_HTTP_PORT: i64 = 8080;
const DEFAULT_RETRIES: i64 = 3;
const DEFAULT_BACKOFF_MS: i64 = 200;
const DEFAULT_FFMPEG_PATH: &str = "ffmpeg";
const DEFAULT_THUMBNAIL_SAMPLE_SIZE: i64 = 2 * 1024 * 1024;
const DEFAULT_MAX_CLIENT_THUMBNAIL: i64 = 1024 * 1024;

#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct HttpParameters {
    pub port: u16,
}

#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct HttpsParameters {
    pub port: u16,
    pub certificate_path: PathBuf,
    pub private_key_path: PathBuf,
}

#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(tag = "type")]
#[serde(rename_all = "lowercase")]
pub enum ServerSetting {
    Http(HttpParameters),
    Https(HttpsParameters),
}

#[derive(Clone, Deserialize, Serialize)]
pub struct NodeSetting {
    pub db_path: PathBuf,

    /// Signs user tokens. Must be exactly 32 characters.
    pub encryption_key: String,

    /// Gates token issuance.
    pub admin_password: String,
}

/// A block storage worker.
#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(tag = "type")]
#[serde(rename_all = "lowercase")]
pub enum WorkerSetting {
    Directory { path: PathBuf },

    /// Keeps blobs in memory; everything is lost on exit.
    Memory,
}

#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct BlockSetting {
    #[serde(default)]
    pub workers: Vec<WorkerSetting>,
    pub part_size: usize,
    pub read_block_size: u64,
    pub retries: u32,
    pub backoff_ms: u64,
}

impl BlockSetting {
    pub fn protocol(&self) -> Result<BlockProtocol> {
        Ok(BlockProtocol::new(self.part_size, self.read_block_size)?)
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            retries: self.retries,
            backoff: Duration::from_millis(self.backoff_ms),
        }
    }
}

#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct ThumbnailSetting {
    pub enabled: bool,
    pub ffmpeg_path: PathBuf,

    /// Bytes from the head of an upload handed to the thumbnailer.
    ///
    /// Only uploads the thumbnailer accepts keep a sample, on top of their part buffer.
    pub sample_size: usize,

    /// Largest thumbnail a client may upload alongside its file.
    pub max_client_thumbnail: usize,
}

#[derive(Clone, Deserialize, Serialize)]
pub struct Config {
    pub server: ServerSetting,
    pub node: NodeSetting,
    pub blocks: BlockSetting,
    pub thumbnail: ThumbnailSetting,
}

fn data_dir() -> Result<PathBuf> {
    Ok(dirs::data_dir()
        .ok_or_else(|| anyhow!("cannot locate data directory"))?
        .join("snapcloud"))
}

impl Config {
    fn default_loader() -> Result<ConfigBuilder<DefaultState>> {
        let loader = ConfigLoader::builder();

        let default_config_path = dirs::config_dir()
            .ok_or_else(|| anyhow!("cannot locate config directory"))?
            .join("snapcloud")
            .join("config")
            .with_extension("toml");

        let data_dir = data_dir()?;
        fs::create_dir_all(&data_dir)?;

        Ok(loader
            .set_default("server.type", "http")?
            .set_default("server.port", DEFAULT_HTTP_PORT)?
            .set_default(
                "node.db_path",
                data_dir.join("db").to_string_lossy().to_string(),
            )?
            .set_default("blocks.part_size", DEFAULT_PART_SIZE as i64)?
            .set_default("blocks.read_block_size", DEFAULT_READ_BLOCK_SIZE as i64)?
            .set_default("blocks.retries", DEFAULT_RETRIES)?
            .set_default("blocks.backoff_ms", DEFAULT_BACKOFF_MS)?
            .set_default("thumbnail.enabled", true)?
            .set_default("thumbnail.ffmpeg_path", DEFAULT_FFMPEG_PATH)?
            .set_default("thumbnail.sample_size", DEFAULT_THUMBNAIL_SAMPLE_SIZE)?
            .set_default("thumbnail.max_client_thumbnail", DEFAULT_MAX_CLIENT_THUMBNAIL)?
            .add_source(
                File::from(default_config_path)
                    .required(false)
                    .format(config::FileFormat::Toml),
            ))
    }

    fn finish(loader: ConfigBuilder<DefaultState>) -> Result<Config> {
        let mut cfg: Config = loader.build()?.try_deserialize()?;

        if cfg.blocks.workers.is_empty() {
            cfg.blocks.workers.push(WorkerSetting::Directory {
                path: data_dir()?.join("blocks"),
            });
        }

        // Fail at load time rather than on the first upload.
        cfg.blocks.protocol()?;

        Ok(cfg)
    }

    pub fn from_toml_string<S: AsRef<str>>(cfg_string: S) -> Result<Config> {
        let loader = Config::default_loader()?.add_source(
            File::from_str(cfg_string.as_ref(), config::FileFormat::Toml).required(false),
        );
        Config::finish(loader)
    }

    pub fn from_file(cfg_file: &Option<PathBuf>) -> Result<Config> {
        let mut loader = Config::default_loader()?;

        if let Some(cfg) = cfg_file {
            loader = loader.add_source(File::from(cfg.as_ref()).required(false));
        }

        loader = loader.add_source(
            Environment::with_prefix("SNAPCLOUD")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );

        Config::finish(loader)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MINIMAL: &str = r#"
        [node]
        encryption_key = "aaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaa"
        admin_password = "hunter2"
    "#;

    #[test]
    fn defaults_fill_the_gaps() -> Result<()> {
        let cfg = Config::from_toml_string(MINIMAL)?;

        assert!(matches!(cfg.server, ServerSetting::Http(HttpParameters { port: 8080 })));
        assert_eq!(cfg.blocks.part_size, DEFAULT_PART_SIZE);
        assert_eq!(cfg.blocks.retry_policy(), RetryPolicy::default());
        assert!(matches!(
            cfg.blocks.workers.as_slice(),
            [WorkerSetting::Directory { .. }]
        ));
        assert!(cfg.thumbnail.enabled);
        assert_eq!(cfg.thumbnail.sample_size, 2 * 1024 * 1024);
        Ok(())
    }

    #[test]
    fn explicit_workers() -> Result<()> {
        let cfg = Config::from_toml_string(format!(
            "{}\n[blocks]\npart_size = 4096\n\n[[blocks.workers]]\ntype = \"memory\"\n\n[[blocks.workers]]\ntype = \"directory\"\npath = \"/tmp/blocks\"\n",
            MINIMAL
        ))?;

        assert_eq!(cfg.blocks.protocol()?.part_size(), 4096);
        assert!(matches!(
            cfg.blocks.workers.as_slice(),
            [WorkerSetting::Memory, WorkerSetting::Directory { .. }]
        ));
        Ok(())
    }

    #[test]
    fn illegal_part_size_is_rejected() {
        let cfg = Config::from_toml_string(format!("{}\n[blocks]\npart_size = 1000\n", MINIMAL));
        assert!(cfg.is_err());
    }

    #[test]
    fn https_setting() -> Result<()> {
        let cfg = Config::from_toml_string(format!(
            "{}\n[server]\ntype = \"https\"\nport = 8443\ncertificate_path = \"cert.pem\"\nprivate_key_path = \"key.pem\"\n",
            MINIMAL
        ))?;
        assert!(matches!(cfg.server, ServerSetting::Https(HttpsParameters { port: 8443, .. })));
        Ok(())
    }
}
