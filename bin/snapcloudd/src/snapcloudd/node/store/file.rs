use anyhow::{bail, Result};

use async_trait::async_trait;

use interface::StoredFile;

use super::iface::Flush;

const FILES_MAP: &str = "files";
const OWNERS_MAP: &str = "files_by_owner";

pub trait FileStore: Flush {
    /// Fails if a record with the same id exists.
    fn create(&self, file: &StoredFile) -> Result<()>;
    fn find_by_id(&self, id: &str) -> Result<Option<StoredFile>>;

    /// Newest first.
    fn list_by_owner(&self, owner: &str) -> Result<Vec<StoredFile>>;
    fn delete(&self, id: &str) -> Result<Option<StoredFile>>;
}

pub struct SledFileStore {
    files: sled::Tree,
    owners: sled::Tree,
}

impl SledFileStore {
    pub fn new(db: &sled::Db) -> Result<Self> {
        let files = db.open_tree(FILES_MAP)?;
        let owners = db.open_tree(OWNERS_MAP)?;
        Ok(Self { files, owners })
    }
}

fn owner_prefix(owner: &str) -> Vec<u8> {
    let mut key = owner.as_bytes().to_vec();
    key.push(0);
    key
}

fn owner_key(owner: &str, id: &str) -> Vec<u8> {
    let mut key = owner_prefix(owner);
    key.extend_from_slice(id.as_bytes());
    key
}

#[async_trait]
impl Flush for SledFileStore {
    async fn flush(&self) -> Result<()> {
        self.files.flush_async().await?;
        self.owners.flush_async().await?;
        Ok(())
    }
}

impl FileStore for SledFileStore {
    fn create(&self, file: &StoredFile) -> Result<()> {
        let encoded = serde_json::to_vec(file)?;

        if self
            .files
            .compare_and_swap(file.id.as_bytes(), None as Option<&[u8]>, Some(encoded))?
            .is_err()
        {
            bail!("file '{}' already exists", file.id);
        }

        self.owners
            .insert(owner_key(&file.owner, &file.id), file.id.as_bytes())?;

        tracing::trace!(id = %file.id, owner = %file.owner, "inserted file record");
        Ok(())
    }

    fn find_by_id(&self, id: &str) -> Result<Option<StoredFile>> {
        match self.files.get(id.as_bytes())? {
            Some(value) => Ok(Some(serde_json::from_slice(&value)?)),
            None => Ok(None),
        }
    }

    fn list_by_owner(&self, owner: &str) -> Result<Vec<StoredFile>> {
        let mut files = Vec::new();

        for pair in self.owners.scan_prefix(owner_prefix(owner)) {
            let (_key, id) = pair?;
            let id = String::from_utf8_lossy(&id);
            match self.find_by_id(&id)? {
                Some(file) => files.push(file),
                None => tracing::warn!(id = %id, "owner index points to a missing file"),
            }
        }

        files.sort_by(|a, b| {
            b.created_at
                .cmp(&a.created_at)
                .then_with(|| a.id.cmp(&b.id))
        });
        Ok(files)
    }

    fn delete(&self, id: &str) -> Result<Option<StoredFile>> {
        let file: StoredFile = match self.files.remove(id.as_bytes())? {
            Some(value) => serde_json::from_slice(&value)?,
            None => return Ok(None),
        };

        self.owners.remove(owner_key(&file.owner, &file.id))?;
        Ok(Some(file))
    }
}
