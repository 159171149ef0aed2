use apikit::reject::HTTPError;

use axum::extract::Extension;
use axum::response::Response;

use interface::DynRelayNode;

use snapcloud_auth::UserIdentity;

use crate::server::handlers::relay_error;

#[tracing::instrument(name = "handler.admin.flush", skip(node))]
pub async fn flush(
    user: UserIdentity,
    Extension(node): Extension<DynRelayNode>,
) -> Result<Response, HTTPError> {
    if !user.admin {
        return Err(HTTPError::Forbidden);
    }

    node.flush().await.map_err(relay_error)?;

    Ok(apikit::reply::message("OK"))
}
