use apikit::reject::HTTPError;

use axum::extract::{Extension, Path};
use axum::Json;

use interface::DynRelayNode;

use protocol::files::FileInfo;

use snapcloud_auth::UserIdentity;

use crate::server::handlers::relay_error;

#[tracing::instrument(name = "handler.files.get", skip(node))]
pub async fn get(
    user: UserIdentity,
    Path(file_id): Path<String>,
    Extension(node): Extension<DynRelayNode>,
) -> Result<Json<FileInfo>, HTTPError> {
    let file = node
        .get_file(&user.username, &file_id)
        .await
        .map_err(relay_error)?;

    Ok(Json(FileInfo::from(&file)))
}
