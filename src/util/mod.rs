mod geo;
mod tile_id;

pub use geo::{tile_bounds, tile_center, to_e7, GeoBounds, GeoPoint, MAX_LATITUDE};
pub use tile_id::{tile_id, tile_id_range, zoom_base_id};

/// Position of a tile's content within the tile data section.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OffsetLength {
    pub offset: u64,
    pub length: u32,
}

impl OffsetLength {
    pub const fn new(offset: u64, length: u32) -> Self {
        Self { offset, length }
    }

    /// Offset of the first byte after this span.
    pub const fn end(&self) -> u64 {
        self.offset + self.length as u64
    }
}
