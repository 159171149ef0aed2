use async_trait::async_trait;
use bytes::Bytes;
use futures::future::BoxFuture;
use tokio::sync::OnceCell;

use crate::{
    BlobReference, BlockProtocol, BlockStore, DynBlockStore, FinalizedBlob, RemoteMedia, Result,
    UploadHandle,
};

type Connector = Box<dyn Fn() -> BoxFuture<'static, Result<DynBlockStore>> + Send + Sync>;

/// A store that only connects on first use.
///
/// A failed connection is not cached: the next call tries again.
pub struct LazyBlockStore {
    protocol: BlockProtocol,
    connector: Connector,
    inner: OnceCell<DynBlockStore>,
}

impl LazyBlockStore {
    pub fn new<F>(protocol: BlockProtocol, connector: F) -> Self
    where
        F: Fn() -> BoxFuture<'static, Result<DynBlockStore>> + Send + Sync + 'static,
    {
        Self {
            protocol,
            connector: Box::new(connector),
            inner: OnceCell::new(),
        }
    }

    pub fn is_connected(&self) -> bool {
        self.inner.initialized()
    }

    async fn get(&self) -> Result<&DynBlockStore> {
        self.inner
            .get_or_try_init(move || async move {
                tracing::debug!("connecting to block storage");
                (self.connector)().await
            })
            .await
    }
}

#[async_trait]
impl BlockStore for LazyBlockStore {
    fn protocol(&self) -> &BlockProtocol {
        &self.protocol
    }

    async fn begin_upload(&self, size_hint: Option<u64>) -> Result<UploadHandle> {
        self.get().await?.begin_upload(size_hint).await
    }

    async fn write_part(
        &self,
        upload: &UploadHandle,
        part_index: u32,
        bytes: Bytes,
    ) -> Result<()> {
        self.get().await?.write_part(upload, part_index, bytes).await
    }

    async fn finalize_upload(
        &self,
        upload: &UploadHandle,
        part_count: u32,
        file_name: &str,
    ) -> Result<FinalizedBlob> {
        self.get()
            .await?
            .finalize_upload(upload, part_count, file_name)
            .await
    }

    async fn abort_upload(&self, upload: &UploadHandle) -> Result<()> {
        self.get().await?.abort_upload(upload).await
    }

    async fn read_block(
        &self,
        reference: &BlobReference,
        offset: u64,
        limit: u64,
    ) -> Result<Bytes> {
        self.get().await?.read_block(reference, offset, limit).await
    }

    async fn resolve_blob_metadata(
        &self,
        reference: &BlobReference,
    ) -> Result<Option<RemoteMedia>> {
        self.get().await?.resolve_blob_metadata(reference).await
    }

    async fn delete_blob(&self, reference: &BlobReference) -> Result<()> {
        self.get().await?.delete_blob(reference).await
    }
}
