use apikit::reject::HTTPError;

use axum::body::{boxed, StreamBody};
use axum::extract::{Extension, Path, TypedHeader};
use axum::http::header::CONTENT_TYPE;
use axum::http::StatusCode;
use axum::response::Response;

use headers::{AcceptRanges, ContentLength, ContentRange, HeaderMapExt};

use interface::DynRelayNode;

use protocol::header::RangeHeader;

use snapcloud_auth::UserIdentity;

use crate::server::handlers::relay_error;

/// Streams a file, honoring single byte ranges.
///
/// Headers are only sent once the first block was fetched. Past that point a failure
/// aborts the connection, so the body never disagrees with `Content-Length`.
#[tracing::instrument(name = "handler.stream.get", skip(node, range))]
pub async fn get(
    user: UserIdentity,
    Path(file_id): Path<String>,
    range: Option<TypedHeader<RangeHeader>>,
    Extension(node): Extension<DynRelayNode>,
) -> Result<Response, HTTPError> {
    let spec = range.map(|TypedHeader(RangeHeader(spec))| spec);

    let stream = node
        .open_stream(&user.username, &file_id, spec)
        .await
        .map_err(relay_error)?;

    let status = match stream.range {
        Some(_) => StatusCode::PARTIAL_CONTENT,
        None => StatusCode::OK,
    };

    let mut response = Response::builder()
        .status(status)
        .header(CONTENT_TYPE, stream.mime_type.as_str())
        .body(boxed(StreamBody::new(stream.body)))
        .map_err(HTTPError::internal_server_error)?;

    let headers = response.headers_mut();
    headers.typed_insert(AcceptRanges::bytes());
    headers.typed_insert(ContentLength(stream.length));

    if let Some(r) = stream.range {
        let content_range = ContentRange::bytes(r.start..=r.end, stream.total_size)
            .map_err(|_| HTTPError::internal_server_error("invalid content range"))?;
        headers.typed_insert(content_range);
    }

    Ok(response)
}
