use anyhow::Result;

use axum::extract::{FromRequest, RequestParts};
use axum::http::Request;

use apikit::reject::HTTPError;

use crate::{decode_token, make_token, EncryptionKey, UserIdentity};

const KEY: &str = "aaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaa";

fn alice() -> UserIdentity {
    UserIdentity {
        username: "alice".into(),
        admin: false,
    }
}

fn parts(uri: &str, bearer: Option<&str>) -> RequestParts<()> {
    let mut builder = Request::builder().uri(uri);
    if let Some(token) = bearer {
        builder = builder.header("authorization", format!("Bearer {}", token));
    }
    let mut req = builder.body(()).unwrap();
    req.extensions_mut().insert(EncryptionKey { key: KEY.into() });
    RequestParts::new(req)
}

#[test]
fn token_round_trip() -> Result<()> {
    let token = make_token(KEY, &alice())?;
    let decoded: UserIdentity = decode_token(KEY, &token)?;
    assert!(decoded == alice());
    Ok(())
}

#[test]
fn token_from_other_key_is_rejected() -> Result<()> {
    let token = make_token("bbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbb", &alice())?;
    assert!(decode_token::<_, UserIdentity>(KEY, &token).is_err());
    Ok(())
}

#[test]
fn short_key_is_rejected() {
    assert!(make_token("short", &alice()).is_err());
}

#[tokio::test]
async fn identity_from_bearer_header() -> Result<()> {
    let token = make_token(KEY, &alice())?;
    let mut req = parts("/files", Some(&token));

    let identity = UserIdentity::from_request(&mut req).await.unwrap();
    assert_eq!(identity.username, "alice");
    Ok(())
}

#[tokio::test]
async fn identity_from_query_token() -> Result<()> {
    let token = make_token(KEY, &alice())?;
    let mut req = parts(&format!("/stream/abc?token={}", token), None);

    let identity = UserIdentity::from_request(&mut req).await.unwrap();
    assert_eq!(identity.username, "alice");
    Ok(())
}

#[tokio::test]
async fn missing_token_is_unauthorized() {
    let mut req = parts("/files", None);
    let err = UserIdentity::from_request(&mut req).await.unwrap_err();
    assert!(matches!(err, HTTPError::Unauthorized));
}

#[tokio::test]
async fn garbage_token_is_unauthorized() {
    let mut req = parts("/files", Some("not-a-token"));
    let err = UserIdentity::from_request(&mut req).await.unwrap_err();
    assert!(matches!(err, HTTPError::Unauthorized));
}
