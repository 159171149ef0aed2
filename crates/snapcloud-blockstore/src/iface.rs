use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;

use crate::{BlobReference, BlockProtocol, FinalizedBlob, RemoteMedia, Result, UploadHandle};

/// The primitives of the remote block storage protocol.
///
/// Implementations are expected to enforce the same constraints the remote does, so a
/// caller that works against one of them works against all of them.
#[async_trait]
pub trait BlockStore {
    /// The constraints this store enforces.
    fn protocol(&self) -> &BlockProtocol;

    /// Allocates a single-use handle for a new multi-part upload.
    async fn begin_upload(&self, size_hint: Option<u64>) -> Result<UploadHandle>;

    /// Writes one part. Every part but the last must be exactly `part_size` bytes.
    async fn write_part(&self, upload: &UploadHandle, part_index: u32, bytes: Bytes)
        -> Result<()>;

    /// Commits `part_count` written parts into a durable blob.
    async fn finalize_upload(
        &self,
        upload: &UploadHandle,
        part_count: u32,
        file_name: &str,
    ) -> Result<FinalizedBlob>;

    /// Drops whatever was staged for an upload that will never be finalized.
    async fn abort_upload(&self, _upload: &UploadHandle) -> Result<()> {
        Ok(())
    }

    /// Reads up to `limit` bytes at `offset`.
    ///
    /// `offset` must be aligned and `limit` legal. Fewer than `limit` bytes are returned
    /// only at the end of the blob.
    async fn read_block(&self, reference: &BlobReference, offset: u64, limit: u64)
        -> Result<Bytes>;

    /// Best-effort lookup of what the store knows about a blob.
    async fn resolve_blob_metadata(&self, reference: &BlobReference)
        -> Result<Option<RemoteMedia>>;

    async fn delete_blob(&self, reference: &BlobReference) -> Result<()>;
}

pub type DynBlockStore = Arc<dyn BlockStore + Send + Sync>;
