use serde::{Deserialize, Serialize};

use crate::util::{to_e7, GeoBounds, GeoPoint};

/// Type of tiles stored in an archive
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TileType {
    #[default]
    Unknown,
    Mvt,
    Png,
    Jpeg,
    Webp,
    Avif,
}

impl TileType {
    /// File suffix (including the dot) tiles of this type carry on disk.
    pub const fn file_suffix(&self) -> &'static str {
        match self {
            Self::Unknown => "",
            Self::Mvt => ".mvt",
            Self::Png => ".png",
            Self::Jpeg => ".jpg",
            Self::Webp => ".webp",
            Self::Avif => ".avif",
        }
    }

    /// Guesses the tile type from a file extension, without the dot.
    pub fn from_extension(extension: &str) -> Self {
        match extension.to_ascii_lowercase().as_str() {
            "mvt" | "pbf" => Self::Mvt,
            "png" => Self::Png,
            "jpg" | "jpeg" => Self::Jpeg,
            "webp" => Self::Webp,
            "avif" => Self::Avif,
            _ => Self::Unknown,
        }
    }
}

/// Compression applied to tile content
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Compression {
    #[default]
    Unknown,
    None,
    GZip,
    Brotli,
    Zstd,
}

/// Header record handed to an archive writer when it is finalised.
///
/// Positions are fixed-point integers in 1e-7 degrees.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Header {
    pub min_zoom: u8,
    pub max_zoom: u8,
    pub min_lon_e7: i32,
    pub min_lat_e7: i32,
    pub max_lon_e7: i32,
    pub max_lat_e7: i32,
    pub center_zoom: u8,
    pub center_lon_e7: i32,
    pub center_lat_e7: i32,
    pub tile_type: TileType,
    pub tile_compression: Compression,
}

impl Header {
    /// An empty header, with all numeric fields set to `0`.
    pub fn new(tile_type: TileType, tile_compression: Compression) -> Self {
        Self {
            tile_type,
            tile_compression,
            ..Default::default()
        }
    }

    /// Stores `bounds` as the archive's extent.
    pub fn set_bounds(&mut self, bounds: &GeoBounds) {
        [
            self.min_lon_e7,
            self.min_lat_e7,
            self.max_lon_e7,
            self.max_lat_e7,
        ] = bounds.to_e7();
    }

    /// Stores `center` as the archive's initial view.
    pub fn set_center(&mut self, center: &GeoPoint) {
        self.center_zoom = center.z;
        self.center_lon_e7 = to_e7(center.lon);
        self.center_lat_e7 = to_e7(center.lat);
    }

    /// The extent in decimal degrees.
    pub fn bounds(&self) -> GeoBounds {
        GeoBounds {
            lon_min: from_e7(self.min_lon_e7),
            lat_min: from_e7(self.min_lat_e7),
            lon_max: from_e7(self.max_lon_e7),
            lat_max: from_e7(self.max_lat_e7),
        }
    }

    /// The initial view in decimal degrees.
    pub fn center(&self) -> GeoPoint {
        GeoPoint {
            lon: from_e7(self.center_lon_e7),
            lat: from_e7(self.center_lat_e7),
            z: self.center_zoom,
        }
    }
}

fn from_e7(value: i32) -> f64 {
    f64::from(value) / 10_000_000.0
}
