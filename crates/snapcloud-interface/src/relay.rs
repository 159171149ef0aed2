use std::io;
use std::sync::Arc;

use async_trait::async_trait;
use blockstore::{BlobReference, RangeSpec};
use bytes::Bytes;
use futures::Stream;

use crate::{FileStream, RelayError, StoredFile, UploadRequest, UploadedBlob};

/// A client-provided byte stream.
pub type UploadBody<'a> = &'a mut (dyn Stream<Item = io::Result<Bytes>> + Send + Unpin);

#[async_trait]
pub trait RelayNode {
    /// Relays a body into block storage.
    ///
    /// Returns only once the blob was finalized. No record exists until [`commit`] is called.
    ///
    /// [`commit`]: Self::commit
    async fn upload(
        &self,
        owner: &str,
        request: UploadRequest,
        body: UploadBody<'_>,
    ) -> Result<UploadedBlob, RelayError>;

    /// Records an uploaded blob, producing a thumbnail unless one is given.
    async fn commit(
        &self,
        owner: &str,
        uploaded: UploadedBlob,
        thumbnail: Option<Bytes>,
    ) -> Result<StoredFile, RelayError>;

    /// Best-effort removal of a blob that will never be committed.
    async fn discard(&self, blob: &BlobReference);

    /// The files of an owner, newest first.
    async fn list_files(&self, owner: &str) -> Result<Vec<StoredFile>, RelayError>;

    /// Another owner's file is reported as missing.
    async fn get_file(&self, owner: &str, id: &str) -> Result<StoredFile, RelayError>;

    async fn delete_file(&self, owner: &str, id: &str) -> Result<(), RelayError>;

    /// Opens a file for streaming.
    ///
    /// The first block is fetched before returning so a broken blob surfaces as an error
    /// rather than a truncated response.
    async fn open_stream(
        &self,
        owner: &str,
        id: &str,
        range: Option<RangeSpec>,
    ) -> Result<FileStream, RelayError>;

    async fn thumbnail(&self, owner: &str, id: &str) -> Result<Bytes, RelayError>;

    async fn flush(&self) -> Result<(), RelayError>;
}

pub type DynRelayNode = Arc<dyn RelayNode + Send + Sync>;
