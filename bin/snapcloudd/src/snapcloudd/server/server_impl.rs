use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{anyhow, Result};

use axum_server::tls_rustls::RustlsConfig;
use axum_server::Handle;

use interface::DynRelayNode;

use tokio::task::{spawn, JoinHandle};

use crate::config::{Config, ServerSetting};

use super::build_router;

const SHUTDOWN_GRACE_PERIOD: Duration = Duration::from_secs(10);

pub struct Server {
    node: DynRelayNode,
    handle: Handle,
    join_handle: JoinHandle<()>,
}

impl Server {
    /// Starts serving, and returns once the listener is bound.
    pub async fn new(cfg: Config, node: DynRelayNode) -> Result<Server> {
        let config = Arc::new(cfg);
        let router = build_router(config.clone(), node.clone());
        let handle = Handle::new();

        let mut join_handle = match &config.server {
            ServerSetting::Http(http_cfg) => {
                let addr = SocketAddr::from(([0, 0, 0, 0], http_cfg.port));
                tracing::info!("starting http layer on {}", addr);

                let srv = axum_server::bind(addr)
                    .handle(handle.clone())
                    .serve(router.into_make_service());
                spawn(async move {
                    if let Err(e) = srv.await {
                        tracing::error!("http layer error: {}", e);
                    }
                })
            }
            ServerSetting::Https(https_cfg) => {
                let addr = SocketAddr::from(([0, 0, 0, 0], https_cfg.port));
                tracing::info!("starting https layer on {}", addr);

                let tls = RustlsConfig::from_pem_file(
                    &https_cfg.certificate_path,
                    &https_cfg.private_key_path,
                )
                .await?;

                let srv = axum_server::bind_rustls(addr, tls)
                    .handle(handle.clone())
                    .serve(router.into_make_service());
                spawn(async move {
                    if let Err(e) = srv.await {
                        tracing::error!("https layer error: {}", e);
                    }
                })
            }
        };

        tokio::select! {
            _ = handle.listening() => {}
            _ = &mut join_handle => {
                return Err(anyhow!("server exited before listening"));
            }
        }

        tracing::info!("snapcloudd is up");

        Ok(Server {
            node,
            handle,
            join_handle,
        })
    }

    pub async fn stop(self) -> Result<()> {
        tracing::info!("requesting to quit");
        self.handle.graceful_shutdown(Some(SHUTDOWN_GRACE_PERIOD));
        self.join_handle.await?;
        self.node.flush().await?;
        tracing::info!("exited");

        Ok(())
    }
}
