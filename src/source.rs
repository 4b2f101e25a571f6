use std::{
    collections::HashMap,
    path::{Path, PathBuf},
};

use ahash::RandomState;
use anyhow::{Context, Result};
use async_trait::async_trait;
use bytes::Bytes;
use tracing::{trace, warn};
use walkdir::WalkDir;

use crate::{error::ArchiveError, TileAddress, TileType};

/// Supplies encoded tile content, keyed by tile address.
///
/// The bytes are opaque: they are passed on exactly as returned.
#[async_trait]
pub trait TileSource: Send + Sync {
    /// Reads the content of the tile at `address`.
    ///
    /// # Errors
    /// Fails if the address is invalid or the tile can't be read.
    async fn read_tile(&self, address: &TileAddress) -> Result<Bytes>;
}

/// Row numbering used by a tile folder.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum TileScheme {
    /// Row 0 is the northernmost row
    #[default]
    Xyz,
    /// Row 0 is the southernmost row
    Tms,
}

impl TileScheme {
    /// Converts between this scheme's row numbering and XYZ.
    fn to_xyz(self, address: TileAddress) -> Result<TileAddress> {
        match self {
            Self::Xyz => {
                address.validate()?;
                Ok(address)
            }
            Self::Tms => Ok(address.flip_y()?),
        }
    }
}

/// Tiles stored as files, laid out as `{root}/{z}/{x}/{y}{suffix}`.
#[derive(Debug, Clone)]
pub struct FolderTileSource {
    root: PathBuf,
    tile_type: TileType,
    scheme: TileScheme,
}

impl FolderTileSource {
    /// A source over `root`, using the file suffix of `tile_type` and XYZ rows.
    pub fn new(root: impl Into<PathBuf>, tile_type: TileType) -> Self {
        Self {
            root: root.into(),
            tile_type,
            scheme: TileScheme::Xyz,
        }
    }

    #[must_use]
    pub const fn with_scheme(mut self, scheme: TileScheme) -> Self {
        self.scheme = scheme;
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub const fn tile_type(&self) -> TileType {
        self.tile_type
    }

    /// Location of the file holding `address`, which is given in XYZ rows.
    ///
    /// # Errors
    /// Fails if the address is outside the pyramid.
    pub fn path_for(&self, address: &TileAddress) -> Result<PathBuf> {
        // TMS and XYZ convert into each other with the same flip
        let on_disk = self.scheme.to_xyz(*address)?;

        Ok(self
            .root
            .join(on_disk.z.to_string())
            .join(on_disk.x.to_string())
            .join(format!("{}{}", on_disk.y, self.tile_type.file_suffix())))
    }

    /// Reads the XYZ address of a tile file from its path.
    ///
    /// # Errors
    /// [`ArchiveError::UnparsableTilePath`] if the path isn't `{z}/{x}/{y}{suffix}`,
    /// or an address error if the numbers are outside the pyramid.
    pub fn address_of(&self, path: &Path) -> Result<TileAddress> {
        let (z, x, y) = extract_zxy_from_path(path, self.tile_type)
            .ok_or_else(|| ArchiveError::UnparsableTilePath(path.to_path_buf()))?;

        self.scheme.to_xyz(TileAddress { z, x, y })
    }

    /// Lists every tile file below the root, sorted by address.
    ///
    /// Files which don't look like tiles are skipped.
    ///
    /// # Errors
    /// Fails on an unreadable directory, or a tile file whose address lies
    /// outside the pyramid.
    pub fn scan(&self) -> Result<Vec<(TileAddress, PathBuf)>> {
        let mut tiles = Vec::new();

        for entry in WalkDir::new(&self.root) {
            let entry = entry?;
            if !entry.file_type().is_file() {
                continue;
            }

            let path = entry.into_path();
            match extract_zxy_from_path(&path, self.tile_type) {
                Some((z, x, y)) => {
                    let address = self
                        .scheme
                        .to_xyz(TileAddress { z, x, y })
                        .with_context(|| format!("tile file {}", path.display()))?;
                    trace!("found tile {} at {:?}", address, path);
                    tiles.push((address, path));
                }
                None => warn!("skipping {:?}, not a tile path", path),
            }
        }

        tiles.sort();
        Ok(tiles)
    }
}

#[async_trait]
impl TileSource for FolderTileSource {
    async fn read_tile(&self, address: &TileAddress) -> Result<Bytes> {
        let path = self.path_for(address)?;
        trace!("reading tile {} from {:?}", address, path);

        let data = tokio::fs::read(&path)
            .await
            .with_context(|| format!("reading tile {address} from {}", path.display()))?;

        Ok(data.into())
    }
}

/// Given a file path, extract the z, x, and y values from the last three components,
/// `.../{z}/{x}/{y}{suffix}`.
fn extract_zxy_from_path(path: &Path, tile_type: TileType) -> Option<(u8, u64, u64)> {
    let file_name = path.file_name()?.to_str()?;
    let parent = path.parent()?;
    let x = parent.file_name()?.to_str()?;
    let z = parent.parent()?.file_name()?.to_str()?;

    let y = file_name.strip_suffix(tile_type.file_suffix())?;

    Some((z.parse().ok()?, x.parse().ok()?, y.parse().ok()?))
}

/// Tiles held in memory, mostly useful for tests and small archives.
#[derive(Debug, Default, Clone)]
pub struct MemoryTileSource {
    tiles: HashMap<TileAddress, Bytes, RandomState>,
}

impl MemoryTileSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores content for `address`, replacing anything already there.
    ///
    /// # Errors
    /// Fails if the address is outside the pyramid.
    pub fn insert(&mut self, address: TileAddress, data: impl Into<Bytes>) -> Result<()> {
        address.validate()?;
        self.tiles.insert(address, data.into());
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.tiles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tiles.is_empty()
    }

    /// All addresses held, sorted.
    pub fn addresses(&self) -> Vec<TileAddress> {
        let mut addresses: Vec<_> = self.tiles.keys().copied().collect();
        addresses.sort();
        addresses
    }
}

#[async_trait]
impl TileSource for MemoryTileSource {
    async fn read_tile(&self, address: &TileAddress) -> Result<Bytes> {
        address.validate()?;

        self.tiles
            .get(address)
            .cloned()
            .ok_or_else(|| ArchiveError::TileNotFound(*address).into())
    }
}
