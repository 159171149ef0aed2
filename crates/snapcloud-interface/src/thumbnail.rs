use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;

use crate::ThumbnailError;

/// Turns the head of a media file into a small preview image.
#[async_trait]
pub trait ThumbnailProducer {
    /// Whether it is worth trying on this kind of file.
    fn accepts(&self, mime_type: &str) -> bool;

    async fn produce(&self, sample: Bytes) -> Result<Bytes, ThumbnailError>;
}

pub type DynThumbnailProducer = Arc<dyn ThumbnailProducer + Send + Sync>;
