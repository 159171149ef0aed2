use std::path::Path;
use std::sync::Arc;

use anyhow::Result;

use blockstore::{
    BlockProtocol, BlockStoreError, BlockStorePool, DiskBlockStore, DynBlockStore,
    LazyBlockStore, MemoryBlockStore, RangeProxy,
};

use futures::FutureExt;

use interface::DynThumbnailProducer;

use tokio::time::Instant;

mod relay;
mod store;
mod thumbnail;

pub use relay::Relay;
pub use thumbnail::FfmpegThumbnailer;

use crate::config::{Config, WorkerSetting};

use self::store::sled::SledFileStore;

#[tracing::instrument]
fn init_sled(path: &Path) -> Result<sled::Db> {
    let start = Instant::now();
    let db = sled::open(path)?;
    let load_duration = Instant::now().duration_since(start);
    tracing::debug!(time=?load_duration, "complete");
    Ok(db)
}

fn make_worker(setting: &WorkerSetting, protocol: BlockProtocol) -> DynBlockStore {
    match setting {
        WorkerSetting::Directory { path } => {
            let path = path.clone();
            Arc::new(LazyBlockStore::new(protocol, move || {
                let path = path.clone();
                async move {
                    let store: DynBlockStore =
                        Arc::new(DiskBlockStore::connect(path, protocol).await?);
                    Ok::<_, BlockStoreError>(store)
                }
                .boxed()
            }))
        }
        WorkerSetting::Memory => Arc::new(MemoryBlockStore::new(protocol)),
    }
}

#[tracing::instrument(skip(c))]
pub fn make_node(c: &Config) -> Result<Relay> {
    tracing::debug!("begin node init");
    let db = init_sled(&c.node.db_path)?;

    let protocol = c.blocks.protocol()?;
    let workers = c
        .blocks
        .workers
        .iter()
        .map(|w| make_worker(w, protocol))
        .collect::<Vec<_>>();
    tracing::debug!(workers = workers.len(), "block storage workers ready");

    let blocks: DynBlockStore = Arc::new(BlockStorePool::new(workers)?);
    let proxy = RangeProxy::new(blocks.clone(), c.blocks.retry_policy());

    let files = Box::from(SledFileStore::new(&db)?);

    let thumbnails: Option<DynThumbnailProducer> = if c.thumbnail.enabled {
        Some(Arc::new(FfmpegThumbnailer::new(&c.thumbnail.ffmpeg_path)))
    } else {
        None
    };

    let node = Relay::new(blocks, proxy, files, thumbnails, c.thumbnail.sample_size);

    tracing::debug!("node init complete");

    Ok(node)
}
