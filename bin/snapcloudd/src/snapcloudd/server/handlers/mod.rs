pub mod admin;
pub mod auth;
pub mod files;
pub mod stream;

use apikit::reject::HTTPError;

use interface::RelayError;

/// Maps a relay failure onto the reply the client gets.
pub(crate) fn relay_error(e: RelayError) -> HTTPError {
    match e {
        RelayError::NotFound => HTTPError::NotFound,
        RelayError::RangeNotSatisfiable { size } => HTTPError::RangeNotSatisfiable { size },
        e if e.is_client_error() => HTTPError::bad_request(e),
        e => HTTPError::internal_server_error(e),
    }
}
