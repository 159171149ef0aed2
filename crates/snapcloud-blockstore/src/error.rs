use std::io;

use snafu::Snafu;

use crate::{BlobReference, UploadId};

/// Errors raised by the remote block protocol, or by a store emulating it.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum BlockStoreError {
    #[snafu(display("invalid limit {} for block read at offset {}", limit, offset))]
    InvalidLimit { offset: u64, limit: u64 },

    #[snafu(display("invalid offset {}", offset))]
    InvalidOffset { offset: u64 },

    #[snafu(display("part {} has invalid size {} (part size is {})", part_index, size, part_size))]
    InvalidPartSize {
        part_index: u32,
        size: usize,
        part_size: usize,
    },

    #[snafu(display("part {} written out of order, expected part {}", got, expected))]
    PartOutOfOrder { expected: u32, got: u32 },

    #[snafu(display("part {} follows a short final part", part_index))]
    PartAfterFinal { part_index: u32 },

    #[snafu(display("unknown upload '{}'", upload))]
    UnknownUpload { upload: UploadId },

    #[snafu(display("unknown blob '{}'", reference))]
    UnknownBlob { reference: BlobReference },

    #[snafu(display("no block storage worker with index {}", worker))]
    UnknownWorker { worker: u32 },

    #[snafu(display("remote returned {} bytes for a {} byte block", got, limit))]
    OversizedBlock { limit: u64, got: usize },

    #[snafu(display("blob ended after {} bytes, {} were expected", got, expected))]
    Truncated { expected: u64, got: u64 },

    #[snafu(display("invalid block protocol: {}", message))]
    InvalidProtocol { message: String },

    #[snafu(display("transient remote failure: {}", message))]
    Transient { message: String },

    #[snafu(display("failed to connect to block storage: {}", message))]
    Connect { message: String },

    #[snafu(display("block storage i/o error: {}", source))]
    Io { source: io::Error },

    #[snafu(display("corrupt blob descriptor: {}", source))]
    Descriptor { source: serde_json::Error },
}

impl BlockStoreError {
    /// Whether retrying the same call later could succeed.
    ///
    /// Only network-level blips qualify. Protocol violations and unknown references
    /// fail the same way every time.
    pub fn is_transient(&self) -> bool {
        matches!(self, BlockStoreError::Transient { .. })
    }
}

pub type Result<T, E = BlockStoreError> = std::result::Result<T, E>;
