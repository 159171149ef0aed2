use apikit::reject::HTTPError;

use axum::extract::{Extension, Path};
use axum::response::Response;

use interface::DynRelayNode;

use snapcloud_auth::UserIdentity;

use crate::server::handlers::relay_error;

#[tracing::instrument(name = "handler.files.delete", skip(node))]
pub async fn delete(
    user: UserIdentity,
    Path(file_id): Path<String>,
    Extension(node): Extension<DynRelayNode>,
) -> Result<Response, HTTPError> {
    node.delete_file(&user.username, &file_id)
        .await
        .map_err(relay_error)?;

    Ok(apikit::reply::message("deleted"))
}
