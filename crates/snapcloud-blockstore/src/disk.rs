use std::collections::HashMap;
use std::io::{self, SeekFrom};
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use bytes::Bytes;
use parking_lot::Mutex;
use snafu::ResultExt;
use tokio::fs::{self, File, OpenOptions};
use tokio::io::{AsyncReadExt, AsyncSeekExt, AsyncWriteExt};

use crate::error::{
    DescriptorSnafu, IoSnafu, PartAfterFinalSnafu, PartOutOfOrderSnafu, UnknownBlobSnafu,
    UnknownUploadSnafu,
};
use crate::{
    BlobId, BlobReference, BlockProtocol, BlockStore, FinalizedBlob, PhotoSize, RemoteMedia,
    Result, UploadHandle, UploadId,
};

const BLOBS_DIRECTORY: &str = "blobs";
const UPLOADS_DIRECTORY: &str = "uploads";

// Larger images are kept as documents, the way the remote treats them.
const MAX_PHOTO_SIZE: u64 = 10 * 1024 * 1024;

#[derive(Default)]
struct StagedUpload {
    next_part: u32,
    closed: bool,
}

/// A block store kept in a local directory.
///
/// Enforces every constraint of the remote protocol so it can stand in for it.
pub struct DiskBlockStore {
    root: PathBuf,
    protocol: BlockProtocol,
    uploads: Mutex<HashMap<UploadId, StagedUpload>>,
}

impl DiskBlockStore {
    #[tracing::instrument(name = "disk.connect", skip(protocol))]
    pub async fn connect<P: AsRef<Path> + std::fmt::Debug>(
        path: P,
        protocol: BlockProtocol,
    ) -> Result<Self> {
        let root = PathBuf::from(path.as_ref());
        fs::create_dir_all(root.join(BLOBS_DIRECTORY))
            .await
            .context(IoSnafu)?;

        // Anything left in the staging area belongs to uploads that died with a previous
        // process; their handles are gone.
        let uploads_dir = root.join(UPLOADS_DIRECTORY);
        if fs::metadata(&uploads_dir).await.is_ok() {
            fs::remove_dir_all(&uploads_dir).await.context(IoSnafu)?;
        }
        fs::create_dir_all(&uploads_dir).await.context(IoSnafu)?;

        tracing::debug!(root = ?root, "disk block store ready");

        Ok(Self {
            root,
            protocol,
            uploads: Mutex::new(HashMap::new()),
        })
    }

    fn blob_path(&self, id: BlobId) -> PathBuf {
        self.root
            .join(BLOBS_DIRECTORY)
            .join(id.to_string())
            .with_extension("blob")
    }

    fn descriptor_path(&self, id: BlobId) -> PathBuf {
        self.root
            .join(BLOBS_DIRECTORY)
            .join(id.to_string())
            .with_extension("json")
    }

    fn upload_dir(&self, id: UploadId) -> PathBuf {
        self.root.join(UPLOADS_DIRECTORY).join(id.to_string())
    }

    fn part_path(&self, id: UploadId, part_index: u32) -> PathBuf {
        self.upload_dir(id)
            .join(part_index.to_string())
            .with_extension("part")
    }

    /// Concatenates the staged parts into `blob` and writes its descriptor.
    async fn commit_parts(
        &self,
        upload: UploadId,
        part_count: u32,
        blob: &mut File,
        reference: BlobReference,
        file_name: &str,
    ) -> Result<u64> {
        let mut size = 0;
        for part_index in 0..part_count {
            let mut part = File::open(self.part_path(upload, part_index))
                .await
                .context(IoSnafu)?;
            size += tokio::io::copy(&mut part, blob).await.context(IoSnafu)?;
        }
        blob.sync_all().await.context(IoSnafu)?;

        let media = Self::describe(reference, size, file_name);
        let descriptor = serde_json::to_vec(&media).context(DescriptorSnafu)?;
        fs::write(self.descriptor_path(reference.id), descriptor)
            .await
            .context(IoSnafu)?;

        Ok(size)
    }

    fn describe(reference: BlobReference, size: u64, file_name: &str) -> RemoteMedia {
        let extension = Path::new(file_name)
            .extension()
            .map(|e| e.to_string_lossy().to_lowercase());

        match extension.as_deref() {
            Some("jpg") | Some("jpeg") if size <= MAX_PHOTO_SIZE => RemoteMedia::Photo {
                reference,
                sizes: vec![PhotoSize {
                    kind: String::from("original"),
                    size,
                }],
            },
            _ => RemoteMedia::Document {
                reference,
                size,
                mime_type: None,
                file_name: Some(String::from(file_name)),
            },
        }
    }

    async fn open_blob(&self, reference: &BlobReference) -> Result<File> {
        match File::open(self.blob_path(reference.id)).await {
            Ok(f) => Ok(f),
            Err(e) if e.kind() == io::ErrorKind::NotFound => UnknownBlobSnafu {
                reference: *reference,
            }
            .fail(),
            Err(e) => Err(e).context(IoSnafu),
        }
    }
}

#[async_trait]
impl BlockStore for DiskBlockStore {
    fn protocol(&self) -> &BlockProtocol {
        &self.protocol
    }

    async fn begin_upload(&self, size_hint: Option<u64>) -> Result<UploadHandle> {
        let handle = UploadHandle::new(size_hint, self.protocol.part_size());
        fs::create_dir_all(self.upload_dir(handle.id))
            .await
            .context(IoSnafu)?;
        self.uploads.lock().insert(handle.id, StagedUpload::default());
        Ok(handle)
    }

    #[tracing::instrument(name = "disk.write_part", level = "trace", skip(self, bytes), fields(upload = %upload.id, size = bytes.len()))]
    async fn write_part(
        &self,
        upload: &UploadHandle,
        part_index: u32,
        bytes: Bytes,
    ) -> Result<()> {
        self.protocol.validate_part(part_index, bytes.len())?;

        {
            let guard = self.uploads.lock();
            let staged = guard
                .get(&upload.id)
                .ok_or_else(|| UnknownUploadSnafu { upload: upload.id }.build())?;

            if staged.closed {
                return PartAfterFinalSnafu { part_index }.fail();
            }
            if staged.next_part != part_index {
                return PartOutOfOrderSnafu {
                    expected: staged.next_part,
                    got: part_index,
                }
                .fail();
            }
        }

        let mut f = File::create(self.part_path(upload.id, part_index))
            .await
            .context(IoSnafu)?;
        f.write_all(&bytes).await.context(IoSnafu)?;
        f.flush().await.context(IoSnafu)?;

        let mut guard = self.uploads.lock();
        if let Some(staged) = guard.get_mut(&upload.id) {
            staged.next_part += 1;
            staged.closed = bytes.len() < self.protocol.part_size();
        }

        Ok(())
    }

    #[tracing::instrument(name = "disk.finalize_upload", level = "debug", skip(self), fields(upload = %upload.id))]
    async fn finalize_upload(
        &self,
        upload: &UploadHandle,
        part_count: u32,
        file_name: &str,
    ) -> Result<FinalizedBlob> {
        let staged = self
            .uploads
            .lock()
            .remove(&upload.id)
            .ok_or_else(|| UnknownUploadSnafu { upload: upload.id }.build())?;

        if staged.next_part != part_count {
            let _ = fs::remove_dir_all(self.upload_dir(upload.id)).await;
            return PartOutOfOrderSnafu {
                expected: staged.next_part,
                got: part_count,
            }
            .fail();
        }

        let reference = BlobReference::new(BlobId::random()).on_worker(upload.worker);
        let blob_path = self.blob_path(reference.id);

        let mut blob = OpenOptions::new()
            .create_new(true)
            .write(true)
            .open(&blob_path)
            .await
            .context(IoSnafu)?;

        let committed = self
            .commit_parts(upload.id, part_count, &mut blob, reference, file_name)
            .await;
        drop(blob);

        let size = match committed {
            Ok(size) => size,
            Err(e) => {
                tracing::debug!(reference = %reference, "dropping partial blob: {}", e);
                let _ = fs::remove_file(&blob_path).await;
                let _ = fs::remove_file(self.descriptor_path(reference.id)).await;
                let _ = fs::remove_dir_all(self.upload_dir(upload.id)).await;
                return Err(e);
            }
        };

        fs::remove_dir_all(self.upload_dir(upload.id))
            .await
            .context(IoSnafu)?;

        tracing::debug!(reference = %reference, size = size, "blob committed");

        Ok(FinalizedBlob { reference, size })
    }

    async fn abort_upload(&self, upload: &UploadHandle) -> Result<()> {
        self.uploads.lock().remove(&upload.id);

        match fs::remove_dir_all(self.upload_dir(upload.id)).await {
            Ok(_) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e).context(IoSnafu),
        }
    }

    #[tracing::instrument(name = "disk.read_block", level = "trace", skip(self), fields(reference = %reference))]
    async fn read_block(
        &self,
        reference: &BlobReference,
        offset: u64,
        limit: u64,
    ) -> Result<Bytes> {
        self.protocol.validate_read(offset, limit)?;

        let mut f = self.open_blob(reference).await?;
        f.seek(SeekFrom::Start(offset)).await.context(IoSnafu)?;

        let mut buf = Vec::with_capacity(limit as usize);
        f.take(limit)
            .read_to_end(&mut buf)
            .await
            .context(IoSnafu)?;

        Ok(Bytes::from(buf))
    }

    async fn resolve_blob_metadata(
        &self,
        reference: &BlobReference,
    ) -> Result<Option<RemoteMedia>> {
        let descriptor = match fs::read(self.descriptor_path(reference.id)).await {
            Ok(d) => d,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e).context(IoSnafu),
        };

        let media: RemoteMedia = serde_json::from_slice(&descriptor).context(DescriptorSnafu)?;
        Ok(Some(media.on_worker(reference.worker)))
    }

    #[tracing::instrument(name = "disk.delete_blob", level = "debug", skip(self), fields(reference = %reference))]
    async fn delete_blob(&self, reference: &BlobReference) -> Result<()> {
        for path in [
            self.blob_path(reference.id),
            self.descriptor_path(reference.id),
        ] {
            match fs::remove_file(&path).await {
                Ok(_) => {}
                Err(e) if e.kind() == io::ErrorKind::NotFound => {}
                Err(e) => return Err(e).context(IoSnafu),
            }
        }
        Ok(())
    }
}
