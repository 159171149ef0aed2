mod error;
mod file;
mod relay;
mod thumbnail;

pub use error::{RelayError, RemoteSnafu, SpawnSnafu, ThumbnailError, UploadSnafu};
pub use file::{FileStream, StoredFile, UploadRequest, UploadedBlob};
pub use relay::{DynRelayNode, RelayNode, UploadBody};
pub use thumbnail::{DynThumbnailProducer, ThumbnailProducer};
