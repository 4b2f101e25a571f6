use std::path::PathBuf;

use thiserror::Error;

use crate::address::{TileAddress, MAX_ZOOM};

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
/// A tile address which lies outside the addressable pyramid
#[allow(clippy::module_name_repetitions)]
pub enum TileAddressError {
    /// The zoom level is deeper than the identifier space supports
    #[error("zoom level {zoom} exceeds maximum ({})", MAX_ZOOM)]
    InvalidZoom { zoom: u8 },

    /// `x` or `y` does not fit the `2^z × 2^z` grid of its zoom level
    #[error("x/y ({x}, {y}) exceeds range for zoom {z}")]
    OutOfGridRange { z: u8, x: u64, y: u64 },
}

#[derive(Error, Debug)]
/// An error which occurred while assembling an archive
#[allow(clippy::module_name_repetitions)]
pub enum ArchiveError {
    /// A tile was not found after a lookup
    #[error("tile not found after lookup")]
    MissingTileFollowingLookup,

    /// A tile source has no content for the requested address
    #[error("no tile at {0}")]
    TileNotFound(TileAddress),

    /// Finalising requires at least one tile
    #[error("archive contains no tiles")]
    EmptyArchive,

    /// A path inside a tile folder doesn't follow `{z}/{x}/{y}.{suffix}`
    #[error("unable to read a tile address from {0:?}")]
    UnparsableTilePath(PathBuf),
}
