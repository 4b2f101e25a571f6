use std::collections::{HashMap, HashSet};

use ahash::RandomState;
use anyhow::Result;
use async_trait::async_trait;
use bytes::{Bytes, BytesMut};
use serde_json::Value;
use tracing::{debug, trace};

use crate::{
    error::ArchiveError,
    tiles::{Tile, TileBackend},
    util::OffsetLength,
    Header, TileAddress,
};

/// Receives tiles keyed by tile identifier and lays them out as an archive.
///
/// Tiles may arrive in any order; the writer is responsible for sorting them
/// by identifier, indexing and compressing them.
#[async_trait]
pub trait ArchiveWriter: Send + Sized {
    /// What a finished archive is handed back as.
    type Output: Send;

    /// Stores `data` under `tile_id`, replacing earlier content for the same id.
    ///
    /// # Errors
    /// Implementation specific, typically I/O.
    async fn write_tile(&mut self, tile_id: u64, data: TileBackend) -> Result<()>;

    /// Stores a tile whose content was already hashed, see [`Tile::new`].
    ///
    /// Writers that don't deduplicate can ignore the hash, which is what the
    /// default does.
    ///
    /// # Errors
    /// Implementation specific, typically I/O.
    async fn write_hashed_tile(&mut self, tile: Tile) -> Result<()> {
        self.write_tile(tile.tile_id, tile.backend).await
    }

    /// Completes the archive with its header and free-form metadata.
    ///
    /// # Errors
    /// Implementation specific, typically I/O or an empty archive.
    async fn finalize(self, header: Header, metadata: Value) -> Result<Self::Output>;
}

/// One run of tiles in the finished archive.
///
/// `run_length` consecutive tile ids, starting at `tile_id`, all point at the
/// same `length` bytes at `offset` within the tile data.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Entry {
    pub tile_id: u64,
    pub offset: u64,
    pub length: u32,
    pub run_length: u32,
}

impl Entry {
    /// Whether `tile_id` falls inside this run.
    pub fn contains(&self, tile_id: u64) -> bool {
        tile_id >= self.tile_id && tile_id - self.tile_id < u64::from(self.run_length)
    }
}

/// Collects tiles in memory, deduplicating identical content.
///
/// This is a reference [`ArchiveWriter`]: it produces the ordered entry list and
/// tile data layout an archive would use, without encoding either to bytes.
#[derive(Debug, Default)]
pub struct TileCollector {
    /// Lookup by hash, and retrieve tile
    hash_to_tile: HashMap<u64, Tile, RandomState>,

    /// Lookup by tile ID, and get the hash of its content
    tile_id_to_hash: HashMap<u64, u64, RandomState>,

    /// Lookup by hash, and resolve to all tile IDs sharing it
    hash_to_tile_ids: HashMap<u64, HashSet<u64, RandomState>, RandomState>,
}

impl TileCollector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a tile.
    ///
    /// Content is stored as given, it is **not** compressed.
    ///
    /// # Errors
    /// Can error if an on-disk tile can't be read.
    pub fn add_tile(&mut self, tile_id: u64, tile_data: impl Into<TileBackend>) -> Result<()> {
        let tile = Tile::new(tile_id, tile_data.into())?;

        self.add(tile);

        Ok(())
    }

    /// Adds a tile by its address.
    ///
    /// # Errors
    /// Fails for an address outside the pyramid, or unreadable content.
    pub fn add_tile_xyz(
        &mut self,
        address: &TileAddress,
        tile_data: impl Into<TileBackend>,
    ) -> Result<()> {
        let tile_id = address.tile_id()?;
        self.add_tile(tile_id, tile_data)
    }

    pub fn add(&mut self, tile: Tile) {
        // Ensure the tile doesn't already exist
        self.remove_tile(tile.tile_id);

        // Allow the tile to be found by its ID
        self.tile_id_to_hash.insert(tile.tile_id, tile.hash);

        self.hash_to_tile_ids
            .entry(tile.hash)
            .or_default()
            .insert(tile.tile_id);

        // Allow the tile to be found by its hash
        self.hash_to_tile.insert(tile.hash, tile);
    }

    /// Removes a tile. Returns whether it was present.
    pub fn remove_tile(&mut self, tile_id: u64) -> bool {
        let Some(hash) = self.tile_id_to_hash.remove(&tile_id) else {
            return false;
        };

        // find set which includes all ids which have this hash
        let ids_with_hash = self.hash_to_tile_ids.entry(hash).or_default();
        ids_with_hash.remove(&tile_id);

        // delete data for this hash, if no other ids reference it
        if ids_with_hash.is_empty() {
            self.hash_to_tile.remove(&hash);
            self.hash_to_tile_ids.remove(&hash);
        }

        true
    }

    /// All tile ids held, in ascending order.
    pub fn get_tile_ids(&self) -> Vec<u64> {
        let mut ids: Vec<u64> = self.tile_id_to_hash.keys().copied().collect();
        ids.sort_unstable();
        ids
    }

    pub fn num_addressed_tiles(&self) -> usize {
        self.tile_id_to_hash.len()
    }

    /// Number of distinct contents held.
    pub fn num_tile_content(&self) -> usize {
        self.hash_to_tile.len()
    }

    pub fn get_tile_by_id(&self, tile_id: u64) -> Option<&Tile> {
        let hash = self.tile_id_to_hash.get(&tile_id)?;
        self.hash_to_tile.get(hash)
    }

    pub fn get_tile_by_hash(&self, hash: u64) -> Option<&Tile> {
        self.hash_to_tile.get(&hash)
    }

    /// Returns the tile at `address`, if present.
    ///
    /// # Errors
    /// Fails for an address outside the pyramid.
    pub fn get_tile(&self, address: &TileAddress) -> Result<Option<&Tile>> {
        Ok(self.get_tile_by_id(address.tile_id()?))
    }

    fn push_entry(entries: &mut Vec<Entry>, tile_id: u64, offset_length: OffsetLength) {
        if let Some(last) = entries.last_mut() {
            if tile_id == last.tile_id + u64::from(last.run_length)
                && last.offset == offset_length.offset
                && last.length == offset_length.length
            {
                last.run_length += 1;
                return;
            }
        }

        entries.push(Entry {
            tile_id,
            offset: offset_length.offset,
            length: offset_length.length,
            run_length: 1,
        });
    }

    /// Lays out the collected tiles in tile id order.
    ///
    /// Identical content is stored once; consecutive ids sharing content are
    /// merged into a single [`Entry`].
    ///
    /// # Errors
    /// Fails if no tiles were added.
    pub fn build(&self, header: Header, metadata: Value) -> Result<FinalisedArchive> {
        if self.tile_id_to_hash.is_empty() {
            return Err(ArchiveError::EmptyArchive.into());
        }

        let mut entries = Vec::<Entry>::new();
        let mut current_offset: u64 = 0;
        let mut num_addressed_tiles: u64 = 0;

        // hash => offset+length
        let mut offset_length_map = HashMap::<u64, OffsetLength, RandomState>::default();

        let mut tiles: Vec<Tile> = vec![];
        let mut tile_offsets: Vec<u64> = vec![];

        for tile_id in self.get_tile_ids() {
            let tile = self
                .get_tile_by_id(tile_id)
                .ok_or(ArchiveError::MissingTileFollowingLookup)?;

            trace!("tile_id: {:?}, tile: {:?}", tile_id, tile);

            num_addressed_tiles += 1;

            if let Some(offset_length) = offset_length_map.get(&tile.hash) {
                Self::push_entry(&mut entries, tile_id, *offset_length);
            } else {
                let offset_length = OffsetLength::new(current_offset, tile.len);

                Self::push_entry(&mut entries, tile_id, offset_length);
                offset_length_map.insert(tile.hash, offset_length);

                tiles.push(tile.clone());
                tile_offsets.push(current_offset);
                current_offset = offset_length.end();
            }
        }

        let finalised = FinalisedArchive {
            num_addressed_tiles,
            num_tile_entries: entries.len() as u64,
            num_tile_content: tiles.len() as u64,
            tile_data_length: current_offset,
            header,
            metadata,
            entries,
            tiles,
            tile_offsets,
        };

        debug!(
            "built archive: {} addressed tiles, {} entries, {} unique, {} bytes",
            finalised.num_addressed_tiles,
            finalised.num_tile_entries,
            finalised.num_tile_content,
            finalised.tile_data_length
        );

        Ok(finalised)
    }
}

#[async_trait]
impl ArchiveWriter for TileCollector {
    type Output = FinalisedArchive;

    async fn write_tile(&mut self, tile_id: u64, data: TileBackend) -> Result<()> {
        let tile = match data {
            TileBackend::InMemory(_) => Tile::new(tile_id, data)?,
            // hashing a file blocks
            TileBackend::OnDisk(_) => {
                tokio::task::spawn_blocking(move || Tile::new(tile_id, data)).await??
            }
        };

        self.add(tile);
        Ok(())
    }

    async fn write_hashed_tile(&mut self, tile: Tile) -> Result<()> {
        self.add(tile);
        Ok(())
    }

    async fn finalize(self, header: Header, metadata: Value) -> Result<FinalisedArchive> {
        self.build(header, metadata)
    }
}

/// The layout of a finished archive.
#[derive(Debug)]
pub struct FinalisedArchive {
    pub header: Header,
    pub metadata: Value,
    /// Runs of tiles, sorted by tile id
    pub entries: Vec<Entry>,
    /// Unique tile contents, in the order they're stored
    pub tiles: Vec<Tile>,
    /// Offset of each of `tiles` within the tile data, ascending
    tile_offsets: Vec<u64>,
    pub num_addressed_tiles: u64,
    pub num_tile_entries: u64,
    pub num_tile_content: u64,
    pub tile_data_length: u64,
}

impl FinalisedArchive {
    /// Finds where the content of `tile_id` is stored, by binary search over the entries.
    pub fn find_tile(&self, tile_id: u64) -> Option<OffsetLength> {
        let index = match self.entries.binary_search_by_key(&tile_id, |e| e.tile_id) {
            Ok(index) => index,
            Err(0) => return None,
            Err(index) => index - 1,
        };

        let entry = self.entries[index];
        entry
            .contains(tile_id)
            .then(|| OffsetLength::new(entry.offset, entry.length))
    }

    /// Concatenates the stored tile contents, as they'd appear in the tile data section.
    ///
    /// # Errors
    /// Fails if an on-disk tile can't be read.
    pub async fn tile_data(&self) -> Result<Bytes> {
        let mut data = BytesMut::with_capacity(usize::try_from(self.tile_data_length)?);

        for tile in &self.tiles {
            data.extend_from_slice(&tile.read_payload().await?);
        }

        Ok(data.freeze())
    }

    /// The stored content of `tile_id`, if present.
    ///
    /// # Errors
    /// Fails if an on-disk tile can't be read.
    pub async fn read_tile(&self, tile_id: u64) -> Result<Option<Bytes>> {
        let Some(offset_length) = self.find_tile(tile_id) else {
            return Ok(None);
        };

        // an empty tile shares its offset with the tile stored after it
        let first = self
            .tile_offsets
            .partition_point(|&offset| offset < offset_length.offset);
        let same_offset = self.tile_offsets[first..]
            .iter()
            .take_while(|&&offset| offset == offset_length.offset)
            .count();

        if let Some(tile) = self.tiles[first..first + same_offset]
            .iter()
            .find(|tile| tile.len == offset_length.length)
        {
            return Ok(Some(tile.read_payload().await?));
        }

        Err(ArchiveError::MissingTileFollowingLookup.into())
    }
}
