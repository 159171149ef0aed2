use std::sync::Arc;
use std::time::Duration;

use apikit::middleware::MakeRequestUuid;

use axum::http::Request;
use axum::response::Response;
use axum::{Extension, Router};

use interface::DynRelayNode;

use tower::ServiceBuilder;
use tower_http::request_id::{PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::trace::TraceLayer;

use crate::Config;

const REQUEST_ID_HEADER: &str = "x-request-id";

/// Wraps a router in a logging layer.
fn wrap_trace_layer(router: Router) -> Router {
    router.layer(
        TraceLayer::new_for_http()
            .make_span_with(|r: &Request<_>| {
                let request_id = r
                    .headers()
                    .get(REQUEST_ID_HEADER)
                    .and_then(|v| v.to_str().ok())
                    .unwrap_or("unknown")
                    .to_string();
                tracing::info_span!(
                    "request",
                    id = %request_id,
                    method = %r.method(),
                    path = %r.uri().path(),
                )
            })
            .on_request(|_r: &Request<_>, _s: &tracing::Span| {})
            .on_response(
                |response: &Response, latency: Duration, _span: &tracing::Span| {
                    tracing::info!(status = ?response.status(), elapsed = ?latency, "complete");
                },
            ),
    )
}

/// Wraps a router with our extension layers.
fn wrap_extension_layers(router: Router, config: Arc<Config>, node: DynRelayNode) -> Router {
    router
        .layer(Extension(snapcloud_auth::EncryptionKey {
            key: config.node.encryption_key.clone(),
        }))
        .layer(Extension(config))
        .layer(Extension(node))
}

pub fn wrap(mut router: Router, config: Arc<Config>, node: DynRelayNode) -> Router {
    router = wrap_trace_layer(router);
    router = wrap_extension_layers(router, config, node);

    // Generate an ID for each request, and echo it back.
    router.layer(
        ServiceBuilder::new()
            .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
            .layer(PropagateRequestIdLayer::x_request_id()),
    )
}
