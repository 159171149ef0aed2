use std::path::Path;

use async_trait::async_trait;

use blockstore::{
    assemble, exact_length, BlobReference, DynBlockStore, RangeProxy, RangeRequest, RangeSpec,
};

use bytes::{Bytes, BytesMut};

use futures::{stream, TryStreamExt};

use interface::{
    DynThumbnailProducer, FileStream, RelayError, RelayNode, RemoteSnafu, StoredFile,
    UploadBody, UploadRequest, UploadSnafu, UploadedBlob,
};

use snafu::ResultExt;

use time::OffsetDateTime;

use super::store::iface::DynFileStore;

const DEFAULT_MIME_TYPE: &str = "application/octet-stream";
const THUMBNAIL_MIME_TYPE: &str = "image/jpeg";

/// Read cap for a thumbnail whose size the store can't report.
const THUMBNAIL_READ_LIMIT: u64 = 4 * 1024 * 1024;

fn metadata_error(e: anyhow::Error) -> RelayError {
    RelayError::Metadata { source: e.into() }
}

fn guess_mime_type(file_name: &str) -> &'static str {
    let extension = Path::new(file_name)
        .extension()
        .map(|e| e.to_string_lossy().to_ascii_lowercase());

    match extension.as_deref() {
        Some("jpg") | Some("jpeg") => "image/jpeg",
        Some("png") => "image/png",
        Some("gif") => "image/gif",
        Some("webp") => "image/webp",
        Some("heic") => "image/heic",
        Some("mp4") | Some("m4v") => "video/mp4",
        Some("mov") => "video/quicktime",
        Some("webm") => "video/webm",
        Some("mkv") => "video/x-matroska",
        Some("mp3") => "audio/mpeg",
        Some("pdf") => "application/pdf",
        Some("txt") => "text/plain",
        _ => DEFAULT_MIME_TYPE,
    }
}

pub struct Relay {
    blocks: DynBlockStore,
    proxy: RangeProxy,
    files: DynFileStore,
    thumbnails: Option<DynThumbnailProducer>,
    sample_size: usize,
}

impl Relay {
    pub fn new(
        blocks: DynBlockStore,
        proxy: RangeProxy,
        files: DynFileStore,
        thumbnails: Option<DynThumbnailProducer>,
        sample_size: usize,
    ) -> Self {
        Self {
            blocks,
            proxy,
            files,
            thumbnails,
            sample_size,
        }
    }

    async fn produce_thumbnail(&self, uploaded: &UploadedBlob) -> Option<Bytes> {
        let producer = self.thumbnails.as_ref()?;

        if uploaded.sample.is_empty() || !producer.accepts(&uploaded.mime_type) {
            return None;
        }

        match producer.produce(uploaded.sample.clone()).await {
            Ok(image) => Some(image),
            Err(e) => {
                tracing::warn!(file = %uploaded.file_name, "thumbnail production failed: {}", e);
                None
            }
        }
    }

    async fn store_thumbnail(&self, file_name: &str, image: Bytes) -> Option<BlobReference> {
        let size = image.len() as u64;
        let body = stream::iter(vec![Ok(image)]);
        let name = format!("thumb_{}.jpg", file_name);

        match assemble(self.blocks.as_ref(), body, Some(size), &name).await {
            Ok(blob) => Some(blob.reference),
            Err(e) => {
                tracing::warn!(file = %file_name, "failed to store thumbnail: {}", e);
                None
            }
        }
    }

    /// The size the store reports, falling back on the recorded one.
    async fn blob_size(&self, reference: &BlobReference, recorded: Option<u64>) -> Option<u64> {
        match self.blocks.resolve_blob_metadata(reference).await {
            Ok(Some(media)) => media.into_location().map(|l| l.size).or(recorded),
            Ok(None) => recorded,
            Err(e) => {
                tracing::warn!(blob = %reference, "failed to resolve blob metadata: {}", e);
                recorded
            }
        }
    }

    fn owned_file(&self, owner: &str, id: &str) -> Result<StoredFile, RelayError> {
        match self.files.find_by_id(id).map_err(metadata_error)? {
            Some(file) if file.owner == owner => Ok(file),
            _ => Err(RelayError::NotFound),
        }
    }
}

#[async_trait]
impl RelayNode for Relay {
    #[tracing::instrument(name = "relay.upload", skip(self, body, request), fields(file = %request.file_name))]
    async fn upload(
        &self,
        owner: &str,
        request: UploadRequest,
        body: UploadBody<'_>,
    ) -> Result<UploadedBlob, RelayError> {
        let mime_type = request
            .mime_type
            .filter(|m| !m.is_empty() && m != DEFAULT_MIME_TYPE)
            .unwrap_or_else(|| String::from(guess_mime_type(&request.file_name)));

        // Only uploads that may get a thumbnail keep a head sample.
        let sample_size = match &self.thumbnails {
            Some(producer) if producer.accepts(&mime_type) => self.sample_size,
            _ => 0,
        };
        let mut sample = BytesMut::new();

        let tapped = body.inspect_ok(|chunk| {
            let room = sample_size.saturating_sub(sample.len());
            if room > 0 {
                sample.extend_from_slice(&chunk[..room.min(chunk.len())]);
            }
        });

        let blob = assemble(
            self.blocks.as_ref(),
            tapped,
            request.size_hint,
            &request.file_name,
        )
        .await
        .context(UploadSnafu)?;

        tracing::info!(blob = %blob.reference, size = blob.size, "upload finalized");

        Ok(UploadedBlob {
            blob,
            file_name: request.file_name,
            mime_type,
            sample: sample.freeze(),
        })
    }

    #[tracing::instrument(name = "relay.commit", skip(self, uploaded, thumbnail), fields(blob = %uploaded.blob.reference))]
    async fn commit(
        &self,
        owner: &str,
        uploaded: UploadedBlob,
        thumbnail: Option<Bytes>,
    ) -> Result<StoredFile, RelayError> {
        let image = match thumbnail {
            Some(image) if !image.is_empty() => Some(image),
            _ => self.produce_thumbnail(&uploaded).await,
        };

        let thumbnail = match image {
            Some(image) => self.store_thumbnail(&uploaded.file_name, image).await,
            None => None,
        };

        let file = StoredFile {
            id: uuid::Uuid::new_v4().to_string(),
            owner: owner.to_string(),
            display_name: uploaded.file_name,
            mime_type: uploaded.mime_type,
            size: uploaded.blob.size,
            blob: uploaded.blob.reference,
            thumbnail,
            created_at: OffsetDateTime::now_utc(),
        };

        if let Err(e) = self.files.create(&file) {
            self.discard(&file.blob).await;
            if let Some(thumbnail) = &file.thumbnail {
                self.discard(thumbnail).await;
            }
            return Err(metadata_error(e));
        }

        tracing::info!(id = %file.id, "file recorded");
        Ok(file)
    }

    async fn discard(&self, blob: &BlobReference) {
        if let Err(e) = self.blocks.delete_blob(blob).await {
            tracing::warn!(blob = %blob, "failed to discard blob: {}", e);
        }
    }

    async fn list_files(&self, owner: &str) -> Result<Vec<StoredFile>, RelayError> {
        self.files.list_by_owner(owner).map_err(metadata_error)
    }

    async fn get_file(&self, owner: &str, id: &str) -> Result<StoredFile, RelayError> {
        self.owned_file(owner, id)
    }

    #[tracing::instrument(name = "relay.delete", skip(self))]
    async fn delete_file(&self, owner: &str, id: &str) -> Result<(), RelayError> {
        let file = self.owned_file(owner, id)?;
        self.files.delete(&file.id).map_err(metadata_error)?;

        self.discard(&file.blob).await;
        if let Some(thumbnail) = &file.thumbnail {
            self.discard(thumbnail).await;
        }

        Ok(())
    }

    #[tracing::instrument(name = "relay.open_stream", skip(self))]
    async fn open_stream(
        &self,
        owner: &str,
        id: &str,
        range: Option<RangeSpec>,
    ) -> Result<FileStream, RelayError> {
        let file = self.owned_file(owner, id)?;
        let size = self
            .blob_size(&file.blob, Some(file.size))
            .await
            .unwrap_or(file.size);

        let range = match range {
            Some(spec) => Some(
                spec.resolve(size)
                    .ok_or(RelayError::RangeNotSatisfiable { size })?,
            ),
            None => None,
        };

        let request = match range.or_else(|| RangeRequest::full(size)) {
            Some(request) => request,
            None => {
                return Ok(FileStream {
                    body: Box::pin(stream::empty::<blockstore::Result<Bytes>>()),
                    length: 0,
                    range: None,
                    total_size: 0,
                    mime_type: file.mime_type,
                })
            }
        };

        tracing::debug!(start = request.start, end = request.end, size, "serving range");

        let body = self
            .proxy
            .open(file.blob, request)
            .await
            .context(RemoteSnafu)?;

        Ok(FileStream {
            body: exact_length(body, request.len()),
            length: request.len(),
            range,
            total_size: size,
            mime_type: file.mime_type,
        })
    }

    async fn thumbnail(&self, owner: &str, id: &str) -> Result<Bytes, RelayError> {
        let file = self.owned_file(owner, id)?;
        let reference = file.thumbnail.ok_or(RelayError::NotFound)?;

        let size = self
            .blob_size(&reference, None)
            .await
            .unwrap_or(THUMBNAIL_READ_LIMIT);
        let request = RangeRequest::full(size).ok_or(RelayError::NotFound)?;

        let chunks: Vec<Bytes> = self
            .proxy
            .open(reference, request)
            .await
            .context(RemoteSnafu)?
            .try_collect()
            .await
            .context(RemoteSnafu)?;

        Ok(Bytes::from(chunks.concat()))
    }

    async fn flush(&self) -> Result<(), RelayError> {
        self.files.flush().await.map_err(metadata_error)
    }
}
