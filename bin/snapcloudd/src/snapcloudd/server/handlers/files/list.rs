use apikit::reject::HTTPError;

use axum::extract::Extension;
use axum::Json;

use interface::DynRelayNode;

use protocol::files::{FileInfo, ListFilesResponse};

use snapcloud_auth::UserIdentity;

use crate::server::handlers::relay_error;

#[tracing::instrument(name = "handler.files.list", skip(node))]
pub async fn list(
    user: UserIdentity,
    Extension(node): Extension<DynRelayNode>,
) -> Result<Json<ListFilesResponse>, HTTPError> {
    let files = node
        .list_files(&user.username)
        .await
        .map_err(relay_error)?;

    Ok(Json(ListFilesResponse {
        files: files.iter().map(FileInfo::from).collect(),
    }))
}
