use std::fmt;
use std::str::FromStr;

use serde::de::{self, Visitor};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Declares an opaque 64-bit identifier.
///
/// Identifiers are serialized as decimal strings so JSON consumers never narrow them
/// through a float.
macro_rules! wide_id {
    ($(#[$doc:meta])* $name:ident) => {
        $(#[$doc])*
        #[derive(Clone, Copy, Debug, Hash, PartialEq, Eq, PartialOrd, Ord)]
        pub struct $name(pub u64);

        impl $name {
            /// Generates a fresh random identifier.
            pub fn random() -> Self {
                Self((uuid::Uuid::new_v4().as_u128() >> 64) as u64)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl FromStr for $name {
            type Err = std::num::ParseIntError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                s.parse::<u64>().map(Self)
            }
        }

        impl Serialize for $name {
            fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
                serializer.collect_str(&self.0)
            }
        }

        impl<'de> Deserialize<'de> for $name {
            fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
                deserializer.deserialize_str(WideIdVisitor).map(Self)
            }
        }
    };
}

struct WideIdVisitor;

impl<'de> Visitor<'de> for WideIdVisitor {
    type Value = u64;

    fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
        formatter.write_str("a 64-bit identifier as a decimal string")
    }

    fn visit_str<E: de::Error>(self, v: &str) -> Result<Self::Value, E> {
        v.parse::<u64>().map_err(E::custom)
    }

    fn visit_u64<E: de::Error>(self, v: u64) -> Result<Self::Value, E> {
        Ok(v)
    }
}

wide_id!(
    /// Identifies a finalized blob on the remote store.
    BlobId
);

wide_id!(
    /// Identifies an in-flight multi-part upload. Single use.
    UploadId
);

/// Everything needed to address a finalized blob.
#[derive(Clone, Copy, Debug, Hash, PartialEq, Eq, Deserialize, Serialize)]
pub struct BlobReference {
    pub id: BlobId,

    /// Index of the storage worker holding the blob.
    #[serde(default)]
    pub worker: u32,
}

impl BlobReference {
    pub fn new(id: BlobId) -> Self {
        Self { id, worker: 0 }
    }

    #[must_use]
    pub fn on_worker(mut self, worker: u32) -> Self {
        self.worker = worker;
        self
    }
}

impl fmt::Display for BlobReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "w{}:{}", self.worker, self.id)
    }
}

/// Handle of a multi-part upload in progress.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct UploadHandle {
    pub id: UploadId,
    pub worker: u32,

    /// Expected number of parts, when the client announced its size.
    pub total_parts: Option<u32>,
}

impl UploadHandle {
    pub fn new(size_hint: Option<u64>, part_size: usize) -> Self {
        let part_size = part_size.max(1) as u64;
        let total_parts = size_hint.map(|size| {
            let parts = size / part_size + u64::from(size % part_size != 0);
            u32::try_from(parts).unwrap_or(u32::MAX)
        });

        Self {
            id: UploadId::random(),
            worker: 0,
            total_parts,
        }
    }
}

/// Result of a successful upload finalization.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FinalizedBlob {
    pub reference: BlobReference,

    /// Size of the blob as reported by the store.
    pub size: u64,
}

#[derive(Clone, Debug, PartialEq, Eq, Deserialize, Serialize)]
pub struct PhotoSize {
    pub kind: String,
    pub size: u64,
}

/// Media descriptor as the remote store reports it.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize, Serialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum RemoteMedia {
    Document {
        reference: BlobReference,
        size: u64,
        mime_type: Option<String>,
        file_name: Option<String>,
    },
    Photo {
        reference: BlobReference,
        sizes: Vec<PhotoSize>,
    },
}

impl RemoteMedia {
    pub fn reference(&self) -> &BlobReference {
        match self {
            RemoteMedia::Document { reference, .. } => reference,
            RemoteMedia::Photo { reference, .. } => reference,
        }
    }

    #[must_use]
    pub fn on_worker(mut self, worker: u32) -> Self {
        match &mut self {
            RemoteMedia::Document { reference, .. } => reference.worker = worker,
            RemoteMedia::Photo { reference, .. } => reference.worker = worker,
        }
        self
    }

    /// Normalizes the descriptor into the shape the range proxy works with.
    ///
    /// Photos resolve to their largest stored size. A photo without any size is not
    /// readable and yields `None`.
    pub fn into_location(self) -> Option<BlobLocation> {
        match self {
            RemoteMedia::Document {
                reference,
                size,
                mime_type,
                ..
            } => Some(BlobLocation {
                reference,
                size,
                mime_type: mime_type.unwrap_or_else(|| String::from("application/octet-stream")),
            }),
            RemoteMedia::Photo { reference, sizes } => {
                let largest = sizes.iter().map(|s| s.size).max()?;
                Some(BlobLocation {
                    reference,
                    size: largest,
                    mime_type: String::from("image/jpeg"),
                })
            }
        }
    }
}

/// A readable blob, independent of how the store described it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BlobLocation {
    pub reference: BlobReference,
    pub size: u64,
    pub mime_type: String,
}
