//! SnapCloud authentication library
use std::fmt::Debug;

use apikit::reject::HTTPError;

use axum::extract::{Extension, FromRequest, Query, RequestParts, TypedHeader};
use axum::headers::authorization::Bearer;
use axum::headers::Authorization;

use branca::Branca;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

pub const TOKEN_TTL_SECONDS: u32 = 60 * 60 * 6;

/// Generate a signed token from an encryption key and a serializable payload.
///
/// The generated token will be valid for six hours.
///
/// The encryption key *must* be exactly 32 characters long, else an error will be returned.
///
/// # Examples
/// ```
/// use snapcloud_auth::UserIdentity;
///
/// let encryption_key = "aaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaa"; // 32 characters.
/// let identity = UserIdentity { username: "johnsmith".into(), admin: false };
///
/// let token = snapcloud_auth::make_token(encryption_key, &identity)?;
/// # Ok::<(), anyhow::Error>(())
/// ```
pub fn make_token<K: AsRef<str>, D: Serialize>(key: K, data: D) -> anyhow::Result<String> {
    let mut token = Branca::new(key.as_ref().as_bytes())?;
    token
        .set_ttl(TOKEN_TTL_SECONDS)
        .set_timestamp(chrono::Utc::now().timestamp() as u32);

    let encoded_body = bincode::serialize(&data)?;
    Ok(token.encode(&encoded_body)?)
}

/// Decode and verify a token produced by [`make_token`].
pub fn decode_token<K: AsRef<str>, T: DeserializeOwned>(key: K, token: &str) -> anyhow::Result<T> {
    let decoder = Branca::new(key.as_ref().as_bytes())?;
    let decoded = decoder.decode(token, TOKEN_TTL_SECONDS)?;
    Ok(bincode::deserialize(&decoded)?)
}

/// The key tokens are signed with, as stored in the extension layer.
#[derive(Clone)]
pub struct EncryptionKey {
    pub key: String,
}

/// Represents a user identity.
///
/// This is the body of user tokens.
#[derive(Clone, Deserialize, Serialize, PartialEq, Eq)]
pub struct UserIdentity {
    pub username: String,
    pub admin: bool,
}

#[derive(Debug, Default, Deserialize)]
struct TokenQuery {
    token: Option<String>,
}

async fn find_token<B: Send>(req: &mut RequestParts<B>) -> Option<String> {
    if let Ok(TypedHeader(Authorization(bearer))) =
        TypedHeader::<Authorization<Bearer>>::from_request(req).await
    {
        tracing::debug!("got a bearer token from authorization header");
        return Some(bearer.token().to_string());
    }

    // Media elements can't set headers, so streams also accept the token in the query.
    match Query::<TokenQuery>::from_request(req).await {
        Ok(Query(q)) => {
            if q.token.is_some() {
                tracing::debug!("got a token from query params");
            }
            q.token
        }
        Err(_) => None,
    }
}

#[async_trait::async_trait]
impl<B: Send> FromRequest<B> for UserIdentity {
    type Rejection = HTTPError;

    async fn from_request(req: &mut RequestParts<B>) -> Result<Self, Self::Rejection> {
        let token = find_token(req).await.ok_or_else(|| {
            tracing::debug!("no token found");
            HTTPError::Unauthorized
        })?;

        let Extension(key) = Extension::<EncryptionKey>::from_request(req)
            .await
            .map_err(|e| {
                tracing::warn!("no encryption key in extension layer: {}", e);
                HTTPError::internal_server_error("authentication is misconfigured")
            })?;

        decode_token(&key.key, &token).map_err(|e| {
            tracing::debug!("rejected token: {}", e);
            HTTPError::Unauthorized
        })
    }
}

impl Debug for UserIdentity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.admin {
            write!(f, "{} (admin)", &self.username)
        } else {
            write!(f, "{}", &self.username)
        }
    }
}

#[cfg(test)]
mod test;
