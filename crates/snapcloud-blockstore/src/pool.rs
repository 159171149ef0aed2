use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use bytes::Bytes;

use crate::error::{InvalidProtocolSnafu, UnknownWorkerSnafu};
use crate::{
    BlobReference, BlockProtocol, BlockStore, DynBlockStore, FinalizedBlob, RemoteMedia, Result,
    UploadHandle,
};

/// Spreads uploads over several storage workers.
///
/// New uploads go to the workers in turn. Every handle and reference carries the index of
/// the worker that owns it, and later calls are routed back to that worker.
pub struct BlockStorePool {
    protocol: BlockProtocol,
    workers: Vec<DynBlockStore>,
    next: AtomicUsize,
}

impl BlockStorePool {
    pub fn new(workers: Vec<DynBlockStore>) -> Result<Self> {
        let protocol = match workers.first() {
            Some(w) => *w.protocol(),
            None => {
                return InvalidProtocolSnafu {
                    message: String::from("a pool needs at least one worker"),
                }
                .fail()
            }
        };

        if workers.iter().any(|w| *w.protocol() != protocol) {
            return InvalidProtocolSnafu {
                message: String::from("all workers of a pool must share the same protocol"),
            }
            .fail();
        }

        Ok(Self {
            protocol,
            workers,
            next: AtomicUsize::new(0),
        })
    }

    pub fn len(&self) -> usize {
        self.workers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.workers.is_empty()
    }

    fn worker(&self, worker: u32) -> Result<&DynBlockStore> {
        self.workers
            .get(worker as usize)
            .ok_or_else(|| UnknownWorkerSnafu { worker }.build())
    }
}

#[async_trait]
impl BlockStore for BlockStorePool {
    fn protocol(&self) -> &BlockProtocol {
        &self.protocol
    }

    async fn begin_upload(&self, size_hint: Option<u64>) -> Result<UploadHandle> {
        let index = self.next.fetch_add(1, Ordering::SeqCst) % self.workers.len();
        let mut handle = self.workers[index].begin_upload(size_hint).await?;
        handle.worker = index as u32;
        tracing::trace!(upload = %handle.id, worker = index, "upload assigned");
        Ok(handle)
    }

    async fn write_part(
        &self,
        upload: &UploadHandle,
        part_index: u32,
        bytes: Bytes,
    ) -> Result<()> {
        self.worker(upload.worker)?
            .write_part(upload, part_index, bytes)
            .await
    }

    async fn finalize_upload(
        &self,
        upload: &UploadHandle,
        part_count: u32,
        file_name: &str,
    ) -> Result<FinalizedBlob> {
        let mut blob = self
            .worker(upload.worker)?
            .finalize_upload(upload, part_count, file_name)
            .await?;
        blob.reference.worker = upload.worker;
        Ok(blob)
    }

    async fn abort_upload(&self, upload: &UploadHandle) -> Result<()> {
        self.worker(upload.worker)?.abort_upload(upload).await
    }

    async fn read_block(
        &self,
        reference: &BlobReference,
        offset: u64,
        limit: u64,
    ) -> Result<Bytes> {
        self.worker(reference.worker)?
            .read_block(reference, offset, limit)
            .await
    }

    async fn resolve_blob_metadata(
        &self,
        reference: &BlobReference,
    ) -> Result<Option<RemoteMedia>> {
        let media = self
            .worker(reference.worker)?
            .resolve_blob_metadata(reference)
            .await?;
        Ok(media.map(|m| m.on_worker(reference.worker)))
    }

    async fn delete_blob(&self, reference: &BlobReference) -> Result<()> {
        self.worker(reference.worker)?.delete_blob(reference).await
    }
}
