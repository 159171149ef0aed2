mod handlers;
mod layer;
mod router;
mod server_impl;

use std::sync::Arc;

use axum::Router;

use interface::DynRelayNode;

use crate::Config;

pub use server_impl::Server;

pub fn build_router(config: Arc<Config>, node: DynRelayNode) -> Router {
    layer::wrap(router::new(), config, node)
}
