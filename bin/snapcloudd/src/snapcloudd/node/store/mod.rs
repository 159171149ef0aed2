mod file;

pub mod iface {
    use anyhow::Result;
    use async_trait::async_trait;

    #[async_trait]
    pub trait Flush {
        async fn flush(&self) -> Result<()>;
    }

    pub use super::file::FileStore;
    pub type DynFileStore = Box<dyn FileStore + Send + Sync>;
}

pub mod sled {
    pub use super::file::SledFileStore;
}
