use std::sync::Arc;

use apikit::reject::HTTPError;

use axum::extract::Extension;
use axum::Json;

use protocol::auth::{TokenRequest, TokenResponse};

use snapcloud_auth::UserIdentity;

use crate::Config;

/// Issues a token for any username, to whoever knows the admin password.
#[tracing::instrument(name = "handler.auth.token", skip(config, request), fields(username = %request.username))]
pub async fn token(
    Extension(config): Extension<Arc<Config>>,
    Json(request): Json<TokenRequest>,
) -> Result<Json<TokenResponse>, HTTPError> {
    if request.admin_password != config.node.admin_password {
        tracing::debug!("bad admin password");
        return Err(HTTPError::Unauthorized);
    }

    let username = request.username.trim();
    if username.is_empty() {
        return Err(HTTPError::bad_request("username cannot be empty"));
    }

    let identity = UserIdentity {
        username: username.to_string(),
        admin: request.admin,
    };
    let token = snapcloud_auth::make_token(&config.node.encryption_key, &identity)?;

    tracing::info!(admin = identity.admin, "issued token");
    Ok(Json(TokenResponse { token }))
}
