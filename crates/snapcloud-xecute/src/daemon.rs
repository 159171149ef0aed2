use std::path::PathBuf;

use anyhow::Result;
use async_trait::async_trait;
use clap::Parser;
use tokio::runtime;
use tracing::instrument;

use crate::logging;

const MINIMUM_WORKER_THREAD_COUNT: usize = 4;

#[async_trait]
pub trait Daemon {
    type Config;

    fn load_config(&self, path_maybe: &Option<PathBuf>) -> Result<Self::Config>;

    async fn start(&mut self, cfg: Self::Config) -> Result<()>;
    async fn stop(&mut self) -> Result<()>;
}

#[derive(Debug, Parser)]
#[clap(version)]
struct DaemonArgs {
    /// Sets a config file
    #[clap(short = 'c', long = "cfg", value_name = "FILE")]
    config: Option<PathBuf>,

    /// Sets the log config file
    #[clap(short = 'l', long = "log", value_name = "FILE")]
    log_config: Option<PathBuf>,
}

fn worker_thread_count() -> usize {
    num_cpus::get().max(MINIMUM_WORKER_THREAD_COUNT)
}

#[instrument(level = "trace")]
fn init_runtime() -> Result<runtime::Runtime> {
    let threads = worker_thread_count();
    let rt = runtime::Builder::new_multi_thread()
        .enable_io()
        .enable_time()
        .worker_threads(threads)
        .build()?;
    tracing::trace!(threads = threads, "initialized tokio runtime");
    Ok(rt)
}

fn main_loop<D: Daemon>(args: DaemonArgs, mut daemon: D) -> Result<()> {
    logging::init_logger(&args.log_config)?;
    let cfg = daemon.load_config(&args.config)?;

    let rt = init_runtime()?;
    rt.block_on(async move {
        daemon.start(cfg).await?;
        tokio::signal::ctrl_c().await?;
        tracing::info!("received shutdown signal");
        daemon.stop().await?;

        Ok(())
    })
}

pub struct DaemonProcess {}

impl DaemonProcess {
    pub fn start<D: Daemon>(name: &str, about: &str, daemon: D) {
        let command = <DaemonArgs as clap::CommandFactory>::command()
            .name(name.to_string())
            .about(about);

        let args = match command
            .try_get_matches()
            .and_then(|m| <DaemonArgs as clap::FromArgMatches>::from_arg_matches(&m))
        {
            Ok(args) => args,
            Err(e) => e.exit(),
        };

        if let Err(e) = main_loop(args, daemon) {
            tracing::error!("fatal: {}", e);
            std::process::exit(1);
        }
    }
}
