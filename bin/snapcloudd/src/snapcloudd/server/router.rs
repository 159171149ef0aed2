use axum::routing::*;

use super::handlers;

fn auth() -> Router {
    Router::new().route("/token", post(handlers::auth::token))
}

pub fn new() -> Router {
    Router::new()
        // Admin Routes
        .route("/health", get(handlers::admin::health))
        .route("/version", get(handlers::admin::version))
        .route("/flush", post(handlers::admin::flush))
        // File routes
        .route("/upload", post(handlers::files::upload))
        .route("/files", get(handlers::files::list))
        .route(
            "/files/:file_id",
            get(handlers::files::get).delete(handlers::files::delete),
        )
        .route("/files/:file_id/thumbnail", get(handlers::files::thumbnail))
        .route("/stream/:file_id", get(handlers::stream::get))
        .nest("/auth", auth())
}
