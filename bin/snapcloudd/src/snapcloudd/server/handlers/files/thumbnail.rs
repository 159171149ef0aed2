use apikit::reject::HTTPError;

use axum::extract::{Extension, Path};
use axum::http::header::CONTENT_TYPE;
use axum::response::{IntoResponse, Response};

use interface::DynRelayNode;

use snapcloud_auth::UserIdentity;

use crate::server::handlers::relay_error;

#[tracing::instrument(name = "handler.files.thumbnail", skip(node))]
pub async fn thumbnail(
    user: UserIdentity,
    Path(file_id): Path<String>,
    Extension(node): Extension<DynRelayNode>,
) -> Result<Response, HTTPError> {
    let image = node
        .thumbnail(&user.username, &file_id)
        .await
        .map_err(relay_error)?;

    Ok(([(CONTENT_TYPE, "image/jpeg")], image).into_response())
}
