use interface::StoredFile;
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

/// Client view of a stored file. Block storage details stay on the server.
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, Eq)]
pub struct FileInfo {
    pub id: String,
    pub display_name: String,
    pub mime_type: String,
    pub size: u64,
    pub has_thumbnail: bool,

    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

impl From<&StoredFile> for FileInfo {
    fn from(f: &StoredFile) -> Self {
        Self {
            id: f.id.clone(),
            display_name: f.display_name.clone(),
            mime_type: f.mime_type.clone(),
            size: f.size,
            has_thumbnail: f.thumbnail.is_some(),
            created_at: f.created_at,
        }
    }
}

#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct UploadResponse {
    pub ok: bool,
    pub file: FileInfo,
}

impl UploadResponse {
    pub fn new(file: &StoredFile) -> Self {
        Self {
            ok: true,
            file: FileInfo::from(file),
        }
    }
}

#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct ListFilesResponse {
    pub files: Vec<FileInfo>,
}
