//! Commonly used rejections.
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

use headers::{ContentRange, HeaderMapExt};

use crate::reply;

const MESSAGE_UNAUTHORIZED: &str = "unauthorized";
const MESSAGE_FORBIDDEN: &str = "forbidden";
const MESSAGE_NOT_FOUND: &str = "not found";
const MESSAGE_RANGE_NOT_SATISFIABLE: &str = "range not satisfiable";

#[derive(Debug)]
pub enum HTTPError {
    BadRequest { error: String },
    Unauthorized,
    Forbidden,
    NotFound,
    RangeNotSatisfiable { size: u64 },
    InternalServerError { error: String },
}

impl HTTPError {
    pub fn bad_request<S: ToString>(s: S) -> Self {
        Self::BadRequest {
            error: s.to_string(),
        }
    }

    pub fn internal_server_error<S: ToString>(s: S) -> Self {
        Self::InternalServerError {
            error: s.to_string(),
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            Self::BadRequest { .. } => StatusCode::BAD_REQUEST,
            Self::Unauthorized => StatusCode::UNAUTHORIZED,
            Self::Forbidden => StatusCode::FORBIDDEN,
            Self::NotFound => StatusCode::NOT_FOUND,
            Self::RangeNotSatisfiable { .. } => StatusCode::RANGE_NOT_SATISFIABLE,
            Self::InternalServerError { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<anyhow::Error> for HTTPError {
    fn from(e: anyhow::Error) -> Self {
        Self::internal_server_error(e)
    }
}

impl IntoResponse for HTTPError {
    fn into_response(self) -> Response {
        let status = self.status();

        match self {
            Self::BadRequest { error } => {
                tracing::info!("rejection: bad request: {}", error);
                reply::error(error, status)
            }
            Self::Unauthorized => reply::error(MESSAGE_UNAUTHORIZED, status),
            Self::Forbidden => reply::error(MESSAGE_FORBIDDEN, status),
            Self::NotFound => reply::error(MESSAGE_NOT_FOUND, status),
            Self::RangeNotSatisfiable { size } => {
                let mut resp = reply::error(MESSAGE_RANGE_NOT_SATISFIABLE, status);
                resp.headers_mut()
                    .typed_insert(ContentRange::unsatisfied_bytes(size));
                resp
            }
            Self::InternalServerError { error } => {
                tracing::error!("error: {}", error);
                reply::error(error, status)
            }
        }
    }
}
