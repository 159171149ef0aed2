use blockstore::{BlobReference, BlockStream, FinalizedBlob, RangeRequest};
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

/// A file that went through a complete upload.
///
/// Never mutated after creation; only deleted.
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, Eq)]
pub struct StoredFile {
    pub id: String,
    pub owner: String,
    pub display_name: String,
    pub mime_type: String,
    pub size: u64,
    pub blob: BlobReference,
    pub thumbnail: Option<BlobReference>,

    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

/// What the client told us about a file before sending it.
#[derive(Clone, Debug, Default)]
pub struct UploadRequest {
    pub file_name: String,
    pub mime_type: Option<String>,
    pub size_hint: Option<u64>,
}

/// A blob that was finalized but is not yet tied to a record.
#[derive(Clone, Debug)]
pub struct UploadedBlob {
    pub blob: FinalizedBlob,
    pub file_name: String,
    pub mime_type: String,

    /// Head of the upload, kept for thumbnail production.
    pub sample: Bytes,
}

/// A ready-to-send body for a stored file.
pub struct FileStream {
    /// Yields exactly `length` bytes, or fails.
    pub body: BlockStream,
    pub length: u64,

    /// The served range, when the client asked for one.
    pub range: Option<RangeRequest>,
    pub total_size: u64,
    pub mime_type: String,
}
