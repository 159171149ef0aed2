use axum::Json;

use protocol::common::VersionResponse;

const VERSION: &str = env!("CARGO_PKG_VERSION");

pub async fn version() -> Json<VersionResponse> {
    Json(VersionResponse::new(VERSION))
}
