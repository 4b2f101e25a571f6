use std::f64::consts::PI;

use serde::{Deserialize, Serialize};

use crate::{address::TileAddress, error::TileAddressError};

/// Latitude of the northern edge of row 0, `atan(sinh(π))` in degrees.
pub const MAX_LATITUDE: f64 = 85.051_128_779_806_59;

/// Geographic extent of a tile in decimal degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoBounds {
    pub lon_min: f64,
    pub lat_min: f64,
    pub lon_max: f64,
    pub lat_max: f64,
}

/// A position in decimal degrees, tagged with the zoom it was derived at.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub lon: f64,
    pub lat: f64,
    pub z: u8,
}

impl GeoBounds {
    /// Arithmetic midpoint of the bounds.
    pub fn center(&self, z: u8) -> GeoPoint {
        GeoPoint {
            lon: (self.lon_min + self.lon_max) / 2.0,
            lat: (self.lat_min + self.lat_max) / 2.0,
            z,
        }
    }

    /// Smallest bounds covering both `self` and `other`.
    #[must_use]
    pub fn union(&self, other: &Self) -> Self {
        Self {
            lon_min: self.lon_min.min(other.lon_min),
            lat_min: self.lat_min.min(other.lat_min),
            lon_max: self.lon_max.max(other.lon_max),
            lat_max: self.lat_max.max(other.lat_max),
        }
    }

    /// `[lon_min, lat_min, lon_max, lat_max]` in 1e-7 degrees.
    pub fn to_e7(&self) -> [i32; 4] {
        [
            to_e7(self.lon_min),
            to_e7(self.lat_min),
            to_e7(self.lon_max),
            to_e7(self.lat_max),
        ]
    }
}

/// Scales decimal degrees to fixed-point 1e-7 degrees, rounding to the nearest step.
#[allow(clippy::cast_possible_truncation)]
pub fn to_e7(degrees: f64) -> i32 {
    (degrees * 10_000_000.0).round() as i32
}

/// `(lon, lat)` of the north-west corner of grid cell `x/y` at zoom `z`.
///
/// `x` and `y` may equal `2^z` to address the far edges of the grid.
#[allow(clippy::cast_precision_loss)]
fn corner(z: u8, x: u64, y: u64) -> (f64, f64) {
    let n = 2f64.powi(i32::from(z));

    let lon = x as f64 / n * 360.0 - 180.0;
    let lat = (PI * (1.0 - 2.0 * y as f64 / n)).sinh().atan().to_degrees();

    (lon, lat)
}

/// Geographic extent of a tile on the spherical Web Mercator grid.
///
/// Longitude is linear in `x`. Latitude follows the inverse Mercator projection,
/// so the tile's own row gives `lat_max` and the row below gives `lat_min`.
/// Tiles touching the top or bottom of the grid end at ±[`MAX_LATITUDE`].
///
/// # Errors
/// Fails for addresses outside the pyramid.
pub fn tile_bounds(address: &TileAddress) -> Result<GeoBounds, TileAddressError> {
    address.validate()?;

    let TileAddress { z, x, y } = *address;
    let (lon_min, lat_max) = corner(z, x, y);
    let (lon_max, lat_min) = corner(z, x + 1, y + 1);

    Ok(GeoBounds {
        lon_min,
        lat_min,
        lon_max,
        lat_max,
    })
}

/// Midpoint of a tile's bounds, tagged with the tile's zoom.
///
/// # Errors
/// Fails for addresses outside the pyramid.
pub fn tile_center(address: &TileAddress) -> Result<GeoPoint, TileAddressError> {
    Ok(tile_bounds(address)?.center(address.z))
}

#[cfg(test)]
mod test {
    use super::*;

    const TOLERANCE: f64 = 1e-9;

    fn assert_close(actual: f64, expected: f64) {
        assert!(
            (actual - expected).abs() < TOLERANCE,
            "expected {expected}, got {actual}"
        );
    }

    #[test]
    fn test_world_tile() -> Result<(), TileAddressError> {
        let bounds = tile_bounds(&TileAddress::new(0, 0, 0)?)?;

        assert_close(bounds.lon_min, -180.0);
        assert_close(bounds.lat_min, -MAX_LATITUDE);
        assert_close(bounds.lon_max, 180.0);
        assert_close(bounds.lat_max, MAX_LATITUDE);
        assert!((bounds.lat_max - 85.0511).abs() < 1e-4);

        Ok(())
    }

    #[test]
    fn test_world_center() -> Result<(), TileAddressError> {
        let center = tile_center(&TileAddress::new(0, 0, 0)?)?;

        assert_close(center.lon, 0.0);
        assert_close(center.lat, 0.0);
        assert_eq!(center.z, 0);

        Ok(())
    }

    #[test]
    fn test_quadrant_tile() -> Result<(), TileAddressError> {
        let bounds = tile_bounds(&TileAddress::new(1, 1, 1)?)?;

        assert_close(bounds.lon_min, 0.0);
        assert_close(bounds.lat_min, -MAX_LATITUDE);
        assert_close(bounds.lon_max, 180.0);
        assert_close(bounds.lat_max, 0.0);

        Ok(())
    }

    #[test]
    fn test_small_tile() -> Result<(), TileAddressError> {
        let bounds = tile_bounds(&TileAddress::new(5, 3, 4)?)?;

        assert_close(bounds.lon_min, -146.25);
        assert_close(bounds.lat_min, 76.840_816_414_430_98);
        assert_close(bounds.lon_max, -135.0);
        assert_close(bounds.lat_max, 79.171_334_640_819_45);

        Ok(())
    }

    #[test]
    fn test_sample_tile_center() -> Result<(), TileAddressError> {
        let address = TileAddress::new(14, 8907, 5509)?;
        let bounds = tile_bounds(&address)?;
        let center = tile_center(&address)?;

        assert_close(bounds.lon_min, 15.710_449_218_75);
        assert_close(bounds.lon_max, 15.732_421_875);
        assert!((bounds.lat_min - 50.652_943_367_257_08).abs() < 1e-9);
        assert!((bounds.lat_max - 50.666_872_321_810_7).abs() < 1e-9);

        assert_close(center.lon, 15.721_435_546_875);
        assert!((center.lat - 50.659_907_844_533_89).abs() < 1e-9);
        assert_eq!(center.z, 14);

        Ok(())
    }

    #[test]
    fn test_corner_ordering() -> Result<(), TileAddressError> {
        for z in 0..=4u8 {
            let n = 1u64 << z;
            for x in 0..n {
                for y in 0..n {
                    let bounds = tile_bounds(&TileAddress::new(z, x, y)?)?;
                    assert!(bounds.lon_max > bounds.lon_min, "{z}/{x}/{y}");
                    assert!(bounds.lat_max > bounds.lat_min, "{z}/{x}/{y}");
                }
            }
        }

        let last = (1u64 << 26) - 1;
        let bounds = tile_bounds(&TileAddress::new(26, last, last)?)?;
        assert!(bounds.lon_max > bounds.lon_min);
        assert!(bounds.lat_max > bounds.lat_min);

        Ok(())
    }

    #[test]
    fn test_adjacent_tiles_share_edges() -> Result<(), TileAddressError> {
        let upper = tile_bounds(&TileAddress::new(3, 2, 2)?)?;
        let lower = tile_bounds(&TileAddress::new(3, 2, 3)?)?;
        let right = tile_bounds(&TileAddress::new(3, 3, 2)?)?;

        assert_close(upper.lat_min, lower.lat_max);
        assert_close(upper.lon_max, right.lon_min);

        Ok(())
    }

    #[test]
    fn test_union() -> Result<(), TileAddressError> {
        let a = tile_bounds(&TileAddress::new(1, 0, 0)?)?;
        let b = tile_bounds(&TileAddress::new(1, 1, 1)?)?;
        let world = tile_bounds(&TileAddress::new(0, 0, 0)?)?;

        assert_eq!(a.union(&b), world);
        assert_eq!(b.union(&a), world);

        Ok(())
    }

    #[test]
    fn test_to_e7() -> Result<(), TileAddressError> {
        assert_eq!(to_e7(-180.0), -1_800_000_000);
        assert_eq!(to_e7(0.000_000_06), 1);
        assert_eq!(to_e7(-0.000_000_04), 0);

        let bounds = tile_bounds(&TileAddress::new(14, 8907, 5509)?)?;
        assert_eq!(
            bounds.to_e7(),
            [157_104_492, 506_529_434, 157_324_219, 506_668_723]
        );

        Ok(())
    }

    #[test]
    fn test_rejects_invalid_address() {
        assert_eq!(
            tile_bounds(&TileAddress { z: 27, x: 0, y: 0 }),
            Err(TileAddressError::InvalidZoom { zoom: 27 })
        );
        assert!(tile_center(&TileAddress { z: 3, x: 8, y: 0 }).is_err());
    }
}
