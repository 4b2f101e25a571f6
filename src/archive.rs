use std::path::Path;

use anyhow::Result;
use futures_util::{stream, StreamExt};
use serde_json::{Map, Value};
use tracing::{debug, trace, warn};

use crate::{
    error::ArchiveError,
    source::{FolderTileSource, TileScheme, TileSource},
    tiles::{Tile, TileBackend},
    util::GeoBounds,
    writer::ArchiveWriter,
    Compression, Header, TileAddress, TileType,
};

/// Files hashed by one blocking task in the folder flow.
const TILES_PER_HASHING_TASK: usize = 256;

/// Hashing tasks running at once in the folder flow.
const HASHING_TASKS: usize = 8;

/// Settings shared by the archive building flows.
#[derive(Debug, Clone, PartialEq)]
pub struct ArchiveOptions {
    pub tile_type: TileType,
    pub tile_compression: Compression,
    /// Stored as `"name"` in the metadata
    pub name: String,
    /// Row numbering of tile folders
    pub scheme: TileScheme,
    /// Extra metadata keys. These win over `name`.
    pub metadata: Map<String, Value>,
}

impl Default for ArchiveOptions {
    fn default() -> Self {
        Self::new(TileType::Mvt, Compression::GZip)
    }
}

impl ArchiveOptions {
    pub fn new(tile_type: TileType, tile_compression: Compression) -> Self {
        Self {
            tile_type,
            tile_compression,
            name: env!("CARGO_PKG_NAME").to_string(),
            scheme: TileScheme::Xyz,
            metadata: Map::new(),
        }
    }

    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    #[must_use]
    pub const fn with_scheme(mut self, scheme: TileScheme) -> Self {
        self.scheme = scheme;
        self
    }

    /// The metadata record handed to the writer.
    pub fn metadata_record(&self) -> Value {
        let mut record = Map::new();
        record.insert("name".to_string(), Value::String(self.name.clone()));
        record.extend(self.metadata.clone());

        Value::Object(record)
    }
}

/// Zoom range and geographic extent of a set of tiles.
#[derive(Debug, Default, Clone, Copy)]
struct TileExtent {
    min_zoom: u8,
    max_zoom: u8,
    bounds: Option<GeoBounds>,
}

impl TileExtent {
    fn include(&mut self, address: &TileAddress) -> Result<()> {
        let tile_bounds = address.bounds()?;

        match self.bounds {
            Some(bounds) => {
                self.bounds = Some(bounds.union(&tile_bounds));
                self.min_zoom = self.min_zoom.min(address.z);
                self.max_zoom = self.max_zoom.max(address.z);
            }
            None => {
                self.bounds = Some(tile_bounds);
                self.min_zoom = address.z;
                self.max_zoom = address.z;
            }
        }

        Ok(())
    }

    fn header(&self, options: &ArchiveOptions) -> Result<Header> {
        let bounds = self.bounds.ok_or(ArchiveError::EmptyArchive)?;

        let mut header = Header::new(options.tile_type, options.tile_compression);
        header.min_zoom = self.min_zoom;
        header.max_zoom = self.max_zoom;
        header.set_bounds(&bounds);
        header.set_center(&bounds.center(self.max_zoom));

        Ok(header)
    }
}

/// Builds an archive holding the single tile at `address`.
///
/// The address is validated before anything is read or written. The header
/// spans exactly this tile, centred on it at its own zoom.
///
/// # Errors
/// Fails for an address outside the pyramid, or when the source or writer fail.
pub async fn build_single_tile_archive<S, W>(
    source: &S,
    writer: W,
    address: TileAddress,
    options: &ArchiveOptions,
) -> Result<W::Output>
where
    S: TileSource + ?Sized,
    W: ArchiveWriter,
{
    build_archive(source, writer, &[address], options).await
}

/// Builds an archive from the given tiles, read from `source`.
///
/// Every address is validated before the first tile is handed to the writer.
///
/// # Errors
/// Fails if `addresses` is empty or contains an address outside the pyramid,
/// or when the source or writer fail.
pub async fn build_archive<S, W>(
    source: &S,
    mut writer: W,
    addresses: &[TileAddress],
    options: &ArchiveOptions,
) -> Result<W::Output>
where
    S: TileSource + ?Sized,
    W: ArchiveWriter,
{
    let mut extent = TileExtent::default();
    let mut tiles = Vec::with_capacity(addresses.len());

    for address in addresses {
        extent.include(address)?;
        tiles.push((address.tile_id()?, *address));
    }

    let header = extent.header(options)?;

    for (tile_id, address) in tiles {
        let data = source.read_tile(&address).await?;
        debug!("tile {} -> id {}, {} bytes", address, tile_id, data.len());

        writer.write_tile(tile_id, data.into()).await?;
    }

    trace!("finalising with header: {:?}", header);
    writer.finalize(header, options.metadata_record()).await
}

/// Builds an archive from every tile below `root`, laid out as
/// `{z}/{x}/{y}{suffix}` with the suffix of `options.tile_type`.
///
/// Files that don't look like tiles are skipped. Tile files are hashed in
/// parallel on the blocking pool, then handed to the writer in tile id order.
/// Their content stays on disk until it's read back.
///
/// # Errors
/// Fails if the folder holds no tiles, a tile lies outside the pyramid or a
/// tile file can't be read, or when the writer fails.
pub async fn build_archive_from_folder<W>(
    root: &Path,
    mut writer: W,
    options: &ArchiveOptions,
) -> Result<W::Output>
where
    W: ArchiveWriter,
{
    let source = FolderTileSource::new(root, options.tile_type).with_scheme(options.scheme);
    let scanned = source.scan()?;

    if scanned.is_empty() {
        warn!("no tiles found below {:?}", root);
        return Err(ArchiveError::EmptyArchive.into());
    }

    let mut extent = TileExtent::default();
    for (address, _) in &scanned {
        extent.include(address)?;
    }
    let header = extent.header(options)?;

    let mut tiles = scanned
        .into_iter()
        .map(|(address, path)| -> Result<_> { Ok((address.tile_id()?, address, path)) })
        .collect::<Result<Vec<_>>>()?;
    tiles.sort_unstable_by_key(|(tile_id, _, _)| *tile_id);
    debug!("hashing {} tiles from {:?}", tiles.len(), root);

    // Hashing reads every file, so it runs on the blocking pool. Batches are
    // handed on in the order they were queued, keeping writes in id order.
    let mut batches = stream::iter(
        tiles
            .chunks(TILES_PER_HASHING_TASK)
            .map(<[_]>::to_vec)
            .collect::<Vec<_>>(),
    )
    .map(|batch| {
        tokio::task::spawn_blocking(move || {
            batch
                .into_iter()
                .map(|(tile_id, address, path)| {
                    trace!("hashing tile {} -> {}", address, tile_id);
                    Tile::new(tile_id, TileBackend::OnDisk(path))
                })
                .collect::<Result<Vec<_>>>()
        })
    })
    .buffered(HASHING_TASKS);

    let mut count: usize = 0;
    while let Some(finished_task) = batches.next().await {
        let hashed = match finished_task {
            Ok(Ok(hashed)) => hashed,
            Ok(Err(e)) => {
                warn!("Failed to hash tiles: {:?}", e);
                return Err(e);
            }
            Err(e) => {
                warn!("Join error hashing tiles: {:?}", e);
                return Err(e.into());
            }
        };

        for tile in hashed {
            writer.write_hashed_tile(tile).await?;
            count += 1;
        }
    }
    debug!("wrote {} tiles from {:?}", count, root);

    writer.finalize(header, options.metadata_record()).await
}
