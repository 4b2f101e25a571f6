use anyhow::Result;
use bytes::Bytes;
use std::path::PathBuf;

/// Tile content paired with the identifier it will be stored under.
#[derive(Clone, Debug)]
pub struct Tile {
    pub backend: TileBackend,
    #[allow(clippy::struct_field_names)]
    pub tile_id: u64,
    pub hash: u64,
    pub len: u32,
}

/// Where the (already encoded) bytes of a tile live.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TileBackend {
    InMemory(Bytes),
    OnDisk(PathBuf),
}

impl Tile {
    /// Wraps content, hashing it so identical tiles can share storage.
    ///
    /// # Errors
    /// Fails if an on-disk tile can't be read or is larger than 4 GiB.
    pub fn new(tile_id: u64, backend: TileBackend) -> Result<Self> {
        Ok(Self {
            hash: backend.calculate_hash()?,
            len: backend.len()?,
            backend,
            tile_id,
        })
    }

    /// Reads the tile's bytes. They are returned exactly as stored.
    ///
    /// # Errors
    /// Fails if an on-disk tile can't be read.
    pub async fn read_payload(&self) -> Result<Bytes> {
        match &self.backend {
            TileBackend::InMemory(payload) => Ok(payload.clone()),
            TileBackend::OnDisk(path) => {
                let data = tokio::fs::read(path).await?;
                Ok(data.into())
            }
        }
    }
}

impl TileBackend {
    /// Calculate a hash from either the bytes or the file at the path
    fn calculate_hash(&self) -> Result<u64> {
        let mut hasher = blake3::Hasher::new();

        match self {
            Self::InMemory(data) => {
                hasher.update(data);
            }
            Self::OnDisk(path) => {
                hasher.update_mmap_rayon(path)?;
            }
        }

        // First 8 bytes of the digest are plenty to tell tiles apart
        let digest = hasher.finalize();
        Ok(u64::from_le_bytes(digest.as_bytes()[0..8].try_into()?))
    }

    fn len(&self) -> Result<u32> {
        match self {
            Self::InMemory(data) => Ok(u32::try_from(data.len())?),
            Self::OnDisk(path) => {
                let metadata = std::fs::metadata(path)?;
                Ok(u32::try_from(metadata.len())?)
            }
        }
    }
}

impl From<Bytes> for TileBackend {
    fn from(val: Bytes) -> Self {
        Self::InMemory(val)
    }
}

impl From<Vec<u8>> for TileBackend {
    fn from(val: Vec<u8>) -> Self {
        Self::InMemory(val.into())
    }
}

impl From<PathBuf> for TileBackend {
    fn from(val: PathBuf) -> Self {
        Self::OnDisk(val)
    }
}
