//! Client side of the remote block storage protocol.
//!
//! The remote store only accepts uploads as a sequence of fixed-size parts and only serves
//! reads as aligned blocks whose size is drawn from a fixed ladder. This crate hides both
//! constraints: [`UploadAssembler`] turns an arbitrary byte stream into legal parts, and
//! [`RangeProxy`] turns an arbitrary byte range into legal block reads, trimming the slack
//! before handing bytes back.
mod assembler;
mod disk;
mod error;
mod iface;
mod lazy;
pub mod memory;
mod pool;
mod protocol;
mod proxy;
mod range;
mod retry;
mod types;
mod window;

pub use assembler::{assemble, UploadAssembler, UploadError};
pub use disk::DiskBlockStore;
pub use error::{BlockStoreError, Result};
pub use iface::{BlockStore, DynBlockStore};
pub use lazy::LazyBlockStore;
pub use memory::MemoryBlockStore;
pub use pool::BlockStorePool;
pub use protocol::{BlockProtocol, ALIGNMENT, DEFAULT_PART_SIZE, DEFAULT_READ_BLOCK_SIZE, MAX_BLOCK_SIZE};
pub use proxy::{exact_length, BlockStream, RangeCursor, RangeProxy};
pub use range::{RangeRequest, RangeSpec};
pub use retry::RetryPolicy;
pub use types::{
    BlobId, BlobLocation, BlobReference, FinalizedBlob, PhotoSize, RemoteMedia, UploadHandle,
    UploadId,
};
pub use window::{compute_next_block_window, BlockWindow};

#[cfg(test)]
mod test;
