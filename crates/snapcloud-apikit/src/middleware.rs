use axum::http::{HeaderValue, Request};

use tower_http::request_id::{MakeRequestId, RequestId};

use uuid::Uuid;

/// Tags every request with a fresh UUID.
#[derive(Clone, Copy, Default)]
pub struct MakeRequestUuid;

impl MakeRequestId for MakeRequestUuid {
    fn make_request_id<B>(&mut self, _: &Request<B>) -> Option<RequestId> {
        let request_id = HeaderValue::from_str(&Uuid::new_v4().to_string()).ok()?;
        Some(RequestId::new(request_id))
    }
}
