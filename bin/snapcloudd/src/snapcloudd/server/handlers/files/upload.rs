use std::io;
use std::sync::Arc;

use apikit::reject::HTTPError;

use axum::extract::multipart::Field;
use axum::extract::{Extension, Multipart, Query};
use axum::Json;

use bytes::{Bytes, BytesMut};

use futures::TryStreamExt;

use interface::{DynRelayNode, UploadBody, UploadRequest, UploadedBlob};

use protocol::files::UploadResponse;

use serde::Deserialize;

use snapcloud_auth::UserIdentity;

use crate::server::handlers::relay_error;
use crate::Config;

const FILE_FIELD: &str = "file";
const THUMBNAIL_FIELD: &str = "thumbnail";
const FALLBACK_FILE_NAME: &str = "upload";

#[derive(Debug, Default, Deserialize)]
pub struct UploadQuery {
    /// Size of the file, when the client knows it ahead of time.
    size: Option<u64>,
}

/// Keeps the last path component of a client-provided name.
fn clean_file_name(raw: Option<&str>) -> String {
    raw.and_then(|name| name.rsplit(|c| c == '/' || c == '\\').next())
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .unwrap_or(FALLBACK_FILE_NAME)
        .to_string()
}

async fn read_bounded(field: Field<'_>, limit: usize) -> Result<Bytes, HTTPError> {
    let mut field = Box::pin(field);
    let mut buffer = BytesMut::new();

    let mut oversized = false;

    // Oversized fields are drained before rejecting.
    while let Some(chunk) = field.try_next().await.map_err(HTTPError::bad_request)? {
        if oversized || buffer.len() + chunk.len() > limit {
            oversized = true;
            continue;
        }
        buffer.extend_from_slice(&chunk);
    }

    if oversized {
        return Err(HTTPError::bad_request(format!(
            "thumbnail exceeds {} bytes",
            limit
        )));
    }

    Ok(buffer.freeze())
}

struct Form {
    uploaded: Option<UploadedBlob>,
    thumbnail: Option<Bytes>,
}

async fn read_form(
    owner: &str,
    size_hint: Option<u64>,
    node: &DynRelayNode,
    config: &Config,
    multipart: &mut Multipart,
    form: &mut Form,
) -> Result<(), HTTPError> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(HTTPError::bad_request)?
    {
        let name = field.name().map(str::to_string);
        match name.as_deref() {
            Some(FILE_FIELD) => {
                if form.uploaded.is_some() {
                    return Err(HTTPError::bad_request("only one file per upload"));
                }

                let request = UploadRequest {
                    file_name: clean_file_name(field.file_name()),
                    mime_type: field.content_type().map(|m| m.to_string()),
                    size_hint,
                };

                let mut body = Box::pin(
                    field.map_err(|e| io::Error::new(io::ErrorKind::Other, e.to_string())),
                );
                let body: UploadBody<'_> = &mut body;

                let uploaded = node
                    .upload(owner, request, body)
                    .await
                    .map_err(relay_error)?;
                form.uploaded = Some(uploaded);
            }
            Some(THUMBNAIL_FIELD) => {
                let image = read_bounded(field, config.thumbnail.max_client_thumbnail).await?;
                form.thumbnail = Some(image);
            }
            name => {
                tracing::debug!(field = ?name, "ignoring form field");
            }
        }
    }

    Ok(())
}

#[tracing::instrument(name = "handler.files.upload", skip(node, config, multipart))]
pub async fn upload(
    user: UserIdentity,
    Query(query): Query<UploadQuery>,
    Extension(node): Extension<DynRelayNode>,
    Extension(config): Extension<Arc<Config>>,
    mut multipart: Multipart,
) -> Result<Json<UploadResponse>, HTTPError> {
    let mut form = Form {
        uploaded: None,
        thumbnail: None,
    };

    let result = read_form(
        &user.username,
        query.size,
        &node,
        &config,
        &mut multipart,
        &mut form,
    )
    .await;

    if let Err(e) = result {
        if let Some(uploaded) = &form.uploaded {
            node.discard(&uploaded.blob.reference).await;
        }
        return Err(e);
    }

    let uploaded = form
        .uploaded
        .ok_or_else(|| HTTPError::bad_request("missing 'file' field"))?;

    let file = node
        .commit(&user.username, uploaded, form.thumbnail)
        .await
        .map_err(relay_error)?;

    Ok(Json(UploadResponse::new(&file)))
}
