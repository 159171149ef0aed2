use std::io;

use bytes::{Bytes, BytesMut};
use futures::{Stream, TryStreamExt};
use snafu::{ResultExt, Snafu};

use crate::{BlockStore, BlockStoreError, FinalizedBlob, UploadHandle};

#[derive(Debug, Snafu)]
pub enum UploadError {
    #[snafu(display("failed to read upload body: {}", source))]
    Body { source: io::Error },

    #[snafu(display("block storage rejected the upload: {}", source))]
    Store { source: BlockStoreError },
}

/// Splits a byte stream into fixed-size parts and writes them in order.
///
/// Memory stays bounded by one part plus one incoming chunk. Parts are written one at a
/// time, so the caller should only pull the next chunk once [`push`](Self::push) returned.
pub struct UploadAssembler<'a> {
    store: &'a (dyn BlockStore + Send + Sync),
    upload: UploadHandle,
    part_size: usize,
    part_index: u32,
    buffer: BytesMut,
    received: u64,
}

impl<'a> UploadAssembler<'a> {
    pub async fn begin(
        store: &'a (dyn BlockStore + Send + Sync),
        size_hint: Option<u64>,
    ) -> Result<UploadAssembler<'a>, BlockStoreError> {
        let upload = store.begin_upload(size_hint).await?;
        let part_size = store.protocol().part_size();

        tracing::trace!(upload = %upload.id, parts = ?upload.total_parts, "began upload");

        Ok(Self {
            store,
            upload,
            part_size,
            part_index: 0,
            buffer: BytesMut::with_capacity(part_size),
            received: 0,
        })
    }

    pub fn upload(&self) -> &UploadHandle {
        &self.upload
    }

    /// Number of bytes accepted so far.
    pub fn received(&self) -> u64 {
        self.received
    }

    pub async fn push(&mut self, chunk: Bytes) -> Result<(), BlockStoreError> {
        self.received += chunk.len() as u64;
        self.buffer.extend_from_slice(&chunk);

        while self.buffer.len() >= self.part_size {
            let part = self.buffer.split_to(self.part_size).freeze();
            self.flush_part(part).await?;
        }

        Ok(())
    }

    #[tracing::instrument(name = "assembler.flush_part", level = "trace", skip(self, part), fields(upload = %self.upload.id, part = self.part_index, size = part.len()))]
    async fn flush_part(&mut self, part: Bytes) -> Result<(), BlockStoreError> {
        self.store
            .write_part(&self.upload, self.part_index, part)
            .await?;
        tracing::trace!("part flushed");
        self.part_index += 1;
        Ok(())
    }

    /// Flushes the remainder as the last part and commits the blob.
    pub async fn finish(mut self, file_name: &str) -> Result<FinalizedBlob, BlockStoreError> {
        if !self.buffer.is_empty() {
            tracing::trace!(
                remaining = self.buffer.len(),
                "stream consumed but some data is left over, sending one last part"
            );
            let last = self.buffer.split().freeze();
            self.flush_part(last).await?;
        }

        let blob = self
            .store
            .finalize_upload(&self.upload, self.part_index, file_name)
            .await?;

        tracing::debug!(
            parts = self.part_index,
            received = self.received,
            size = blob.size,
            reference = %blob.reference,
            "upload finalized"
        );

        Ok(blob)
    }

    /// Gives up on the upload, cleaning what the store staged. Never finalizes.
    pub async fn abort(self) {
        if let Err(e) = self.store.abort_upload(&self.upload).await {
            tracing::warn!(upload = %self.upload.id, "failed to abort upload: {}", e);
        }
    }
}

/// Relays a whole body stream into the store.
///
/// Any body or store error aborts the upload; nothing gets finalized from a partial
/// sequence.
pub async fn assemble<S>(
    store: &(dyn BlockStore + Send + Sync),
    mut body: S,
    size_hint: Option<u64>,
    file_name: &str,
) -> Result<FinalizedBlob, UploadError>
where
    S: Stream<Item = Result<Bytes, io::Error>> + Unpin,
{
    let mut assembler = UploadAssembler::begin(store, size_hint)
        .await
        .context(StoreSnafu)?;

    loop {
        let chunk = match body.try_next().await {
            Ok(Some(chunk)) => chunk,
            Ok(None) => break,
            Err(e) => {
                tracing::debug!(received = assembler.received(), "upload body failed: {}", e);
                assembler.abort().await;
                return Err(UploadError::Body { source: e });
            }
        };

        if let Err(e) = assembler.push(chunk).await {
            assembler.abort().await;
            return Err(UploadError::Store { source: e });
        }
    }

    let upload = *assembler.upload();
    match assembler.finish(file_name).await {
        Ok(blob) => Ok(blob),
        Err(e) => {
            if let Err(abort_err) = store.abort_upload(&upload).await {
                tracing::warn!(upload = %upload.id, "failed to abort upload: {}", abort_err);
            }
            Err(UploadError::Store { source: e })
        }
    }
}
