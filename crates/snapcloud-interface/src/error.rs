use std::io;

use blockstore::{BlockStoreError, UploadError};
use snafu::Snafu;

type BoxedError = Box<dyn std::error::Error + Send + Sync>;

#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum RelayError {
    #[snafu(display("file not found"))]
    NotFound,

    #[snafu(display("range not satisfiable for a file of {} bytes", size))]
    RangeNotSatisfiable { size: u64 },

    #[snafu(display("invalid request: {}", message))]
    InvalidRequest { message: String },

    #[snafu(display("upload failed: {}", source))]
    Upload { source: UploadError },

    #[snafu(display("block storage error: {}", source))]
    Remote { source: BlockStoreError },

    #[snafu(display("metadata store error: {}", source))]
    Metadata { source: BoxedError },
}

impl RelayError {
    /// Whether the caller, rather than the relay, is at fault.
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            RelayError::NotFound
                | RelayError::RangeNotSatisfiable { .. }
                | RelayError::InvalidRequest { .. }
                | RelayError::Upload {
                    source: UploadError::Body { .. }
                }
        )
    }
}

#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum ThumbnailError {
    #[snafu(display("failed to run thumbnailer: {}", source))]
    Spawn { source: io::Error },

    #[snafu(display("thumbnailer failed: {}", message))]
    Failed { message: String },

    #[snafu(display("thumbnailer produced no image"))]
    Empty,
}
