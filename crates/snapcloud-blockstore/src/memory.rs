//! An in-memory block store, with switches to make it misbehave.
use std::collections::{HashMap, HashSet};

use async_trait::async_trait;
use bytes::{Bytes, BytesMut};
use parking_lot::Mutex;

use crate::error::{
    PartAfterFinalSnafu, PartOutOfOrderSnafu, TransientSnafu, UnknownBlobSnafu, UnknownUploadSnafu,
};
use crate::{
    BlobId, BlobReference, BlockProtocol, BlockStore, FinalizedBlob, PhotoSize, RemoteMedia,
    Result, UploadHandle, UploadId,
};

/// A block read as the store received it.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ReadCall {
    pub reference: BlobReference,
    pub offset: u64,
    pub limit: u64,
}

/// A part write as the store received it.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct WriteCall {
    pub upload: UploadId,
    pub part_index: u32,
    pub size: usize,
}

struct StagedUpload {
    parts: Vec<Bytes>,
    closed: bool,
}

struct StoredBlob {
    data: Bytes,
    media: RemoteMedia,
}

#[derive(Default)]
struct Faults {
    fail_part: Option<u32>,
    fail_finalize: bool,
    failing_reads: u32,
    truncated: HashMap<BlobId, u64>,
}

#[derive(Default)]
struct State {
    uploads: HashMap<UploadId, StagedUpload>,
    blobs: HashMap<BlobId, StoredBlob>,
    aborted: HashSet<UploadId>,
    reads: Vec<ReadCall>,
    writes: Vec<WriteCall>,
    finalized: u32,
    faults: Faults,
}

/// Keeps every blob in memory while enforcing the remote protocol.
///
/// Records the calls it receives so callers can check what was asked of the remote.
#[derive(Default)]
pub struct MemoryBlockStore {
    protocol: BlockProtocol,
    state: Mutex<State>,
}

impl MemoryBlockStore {
    pub fn new(protocol: BlockProtocol) -> Self {
        Self {
            protocol,
            state: Mutex::new(State::default()),
        }
    }

    /// Stores a document blob directly, skipping the upload path.
    pub fn insert_blob(&self, data: Bytes, mime_type: Option<&str>) -> BlobReference {
        let reference = BlobReference::new(BlobId::random());
        let media = RemoteMedia::Document {
            reference,
            size: data.len() as u64,
            mime_type: mime_type.map(String::from),
            file_name: None,
        };
        self.state
            .lock()
            .blobs
            .insert(reference.id, StoredBlob { data, media });
        reference
    }

    /// Stores a photo blob with the listed sizes. Reads return `data`.
    pub fn insert_photo(&self, data: Bytes, sizes: Vec<PhotoSize>) -> BlobReference {
        let reference = BlobReference::new(BlobId::random());
        let media = RemoteMedia::Photo { reference, sizes };
        self.state
            .lock()
            .blobs
            .insert(reference.id, StoredBlob { data, media });
        reference
    }

    pub fn blob_data(&self, reference: &BlobReference) -> Option<Bytes> {
        self.state
            .lock()
            .blobs
            .get(&reference.id)
            .map(|b| b.data.clone())
    }

    pub fn blob_count(&self) -> usize {
        self.state.lock().blobs.len()
    }

    /// Uploads that were begun and neither finalized nor aborted.
    pub fn pending_uploads(&self) -> usize {
        self.state.lock().uploads.len()
    }

    pub fn finalized_count(&self) -> u32 {
        self.state.lock().finalized
    }

    pub fn was_aborted(&self, upload: UploadId) -> bool {
        self.state.lock().aborted.contains(&upload)
    }

    pub fn reads(&self) -> Vec<ReadCall> {
        self.state.lock().reads.clone()
    }

    pub fn writes(&self) -> Vec<WriteCall> {
        self.state.lock().writes.clone()
    }

    pub fn clear_calls(&self) {
        let mut state = self.state.lock();
        state.reads.clear();
        state.writes.clear();
    }

    /// Makes every write of the given part fail.
    pub fn fail_part(&self, part_index: u32) {
        self.state.lock().faults.fail_part = Some(part_index);
    }

    pub fn fail_finalize(&self) {
        self.state.lock().faults.fail_finalize = true;
    }

    /// Makes the next `count` block reads fail with a transient error.
    pub fn fail_next_reads(&self, count: u32) {
        self.state.lock().faults.failing_reads = count;
    }

    /// Makes the blob look like it ends after `size` bytes when read.
    pub fn truncate_blob(&self, reference: &BlobReference, size: u64) {
        self.state.lock().faults.truncated.insert(reference.id, size);
    }
}

#[async_trait]
impl BlockStore for MemoryBlockStore {
    fn protocol(&self) -> &BlockProtocol {
        &self.protocol
    }

    async fn begin_upload(&self, size_hint: Option<u64>) -> Result<UploadHandle> {
        let handle = UploadHandle::new(size_hint, self.protocol.part_size());
        self.state.lock().uploads.insert(
            handle.id,
            StagedUpload {
                parts: Vec::new(),
                closed: false,
            },
        );
        Ok(handle)
    }

    async fn write_part(
        &self,
        upload: &UploadHandle,
        part_index: u32,
        bytes: Bytes,
    ) -> Result<()> {
        let mut state = self.state.lock();
        state.writes.push(WriteCall {
            upload: upload.id,
            part_index,
            size: bytes.len(),
        });

        self.protocol.validate_part(part_index, bytes.len())?;

        if state.faults.fail_part == Some(part_index) {
            return TransientSnafu {
                message: format!("injected failure on part {}", part_index),
            }
            .fail();
        }

        let part_size = self.protocol.part_size();
        let staged = state
            .uploads
            .get_mut(&upload.id)
            .ok_or_else(|| UnknownUploadSnafu { upload: upload.id }.build())?;

        if staged.closed {
            return PartAfterFinalSnafu { part_index }.fail();
        }
        if staged.parts.len() as u32 != part_index {
            return PartOutOfOrderSnafu {
                expected: staged.parts.len() as u32,
                got: part_index,
            }
            .fail();
        }

        staged.closed = bytes.len() < part_size;
        staged.parts.push(bytes);
        Ok(())
    }

    async fn finalize_upload(
        &self,
        upload: &UploadHandle,
        part_count: u32,
        file_name: &str,
    ) -> Result<FinalizedBlob> {
        let mut state = self.state.lock();

        if state.faults.fail_finalize {
            return TransientSnafu {
                message: String::from("injected failure on finalize"),
            }
            .fail();
        }

        let staged = state
            .uploads
            .remove(&upload.id)
            .ok_or_else(|| UnknownUploadSnafu { upload: upload.id }.build())?;

        if staged.parts.len() as u32 != part_count {
            return PartOutOfOrderSnafu {
                expected: staged.parts.len() as u32,
                got: part_count,
            }
            .fail();
        }

        let mut data = BytesMut::new();
        for part in staged.parts.iter() {
            data.extend_from_slice(part);
        }
        let data = data.freeze();
        let size = data.len() as u64;

        let reference = BlobReference::new(BlobId::random()).on_worker(upload.worker);
        let media = RemoteMedia::Document {
            reference,
            size,
            mime_type: None,
            file_name: Some(String::from(file_name)),
        };

        state
            .blobs
            .insert(reference.id, StoredBlob { data, media });
        state.finalized += 1;

        Ok(FinalizedBlob { reference, size })
    }

    async fn abort_upload(&self, upload: &UploadHandle) -> Result<()> {
        let mut state = self.state.lock();
        state.uploads.remove(&upload.id);
        state.aborted.insert(upload.id);
        Ok(())
    }

    async fn read_block(
        &self,
        reference: &BlobReference,
        offset: u64,
        limit: u64,
    ) -> Result<Bytes> {
        let mut state = self.state.lock();
        state.reads.push(ReadCall {
            reference: *reference,
            offset,
            limit,
        });

        self.protocol.validate_read(offset, limit)?;

        if state.faults.failing_reads > 0 {
            state.faults.failing_reads -= 1;
            return TransientSnafu {
                message: format!("injected failure reading at {}", offset),
            }
            .fail();
        }

        let visible = state.faults.truncated.get(&reference.id).copied();
        let blob = state.blobs.get(&reference.id).ok_or_else(|| {
            UnknownBlobSnafu {
                reference: *reference,
            }
            .build()
        })?;

        let len = visible
            .unwrap_or(u64::MAX)
            .min(blob.data.len() as u64);
        if offset >= len {
            return Ok(Bytes::new());
        }

        let end = len.min(offset + limit);
        Ok(blob.data.slice(offset as usize..end as usize))
    }

    async fn resolve_blob_metadata(
        &self,
        reference: &BlobReference,
    ) -> Result<Option<RemoteMedia>> {
        Ok(self
            .state
            .lock()
            .blobs
            .get(&reference.id)
            .map(|b| b.media.clone().on_worker(reference.worker)))
    }

    async fn delete_blob(&self, reference: &BlobReference) -> Result<()> {
        self.state.lock().blobs.remove(&reference.id);
        Ok(())
    }
}
