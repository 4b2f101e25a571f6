//! # `pmtiles-zxy`
//!
//! Tile identifiers and tile geometry for [`PMTiles`](https://github.com/protomaps/PMTiles)-style
//! archives, based around Tokio.
//!
//! Every `z/x/y` tile address maps to a single 64-bit identifier. Identifiers are
//! grouped by zoom level and follow a Hilbert curve within each level, so archives
//! sorted by identifier keep neighbouring tiles close together. Alongside, each
//! tile's geographic bounds and center are computed on the spherical Web Mercator grid.
//!
//! ## Examples
//!
//! ### Tile identifiers and bounds
//! ```rust
//! use pmtiles_zxy::{util::tile_id, TileAddress};
//!
//! fn main() -> anyhow::Result<()> {
//!     assert_eq!(tile_id(14, 8907, 5509)?, 317_919_281);
//!
//!     let address: TileAddress = "14/8907/5509".parse()?;
//!     let bounds = address.bounds()?;
//!     assert!(bounds.lon_min < bounds.lon_max);
//!
//!     Ok(())
//! }
//! ```
//!
//! ### Building a single tile archive
//! ```rust
//! use pmtiles_zxy::{
//!     build_single_tile_archive, ArchiveOptions, Compression, MemoryTileSource, TileAddress,
//!     TileCollector, TileType,
//! };
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let address = TileAddress::new(14, 8907, 5509)?;
//!
//!     let mut source = MemoryTileSource::new();
//!     source.insert(address, vec![0x1au8, 0x00])?;
//!
//!     let options = ArchiveOptions::new(TileType::Mvt, Compression::None);
//!     let archive =
//!         build_single_tile_archive(&source, TileCollector::new(), address, &options).await?;
//!
//!     assert_eq!(archive.header.min_zoom, 14);
//!     assert_eq!(archive.entries[0].tile_id, 317_919_281);
//!
//!     Ok(())
//! }
//! ```

// #![warn(missing_docs)]
#![warn(clippy::cargo)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]
#![warn(clippy::unwrap_used)]
#![warn(clippy::expect_used)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::multiple_crate_versions)]
#![allow(clippy::cargo_common_metadata)]
#![cfg_attr(docsrs, feature(doc_auto_cfg))]

/// Tile addresses and their validation
mod address;

mod header;

/// Manages tile content
mod tiles;

/// Tile identifiers, tile geometry and helpers.
pub mod util;

/// Errors for the module
pub mod error;

/// Where tile content comes from.
pub mod source;

/// Where tiles go.
pub mod writer;

/// Archive building flows.
pub mod archive;

pub use address::{grid_size, TileAddress, MAX_ZOOM};
pub use archive::{build_archive, build_archive_from_folder, build_single_tile_archive, ArchiveOptions};
pub use error::{ArchiveError, TileAddressError};
pub use header::{Compression, Header, TileType};
pub use source::{FolderTileSource, MemoryTileSource, TileScheme, TileSource};
pub use tiles::{Tile, TileBackend};
pub use writer::{ArchiveWriter, Entry, FinalisedArchive, TileCollector};
