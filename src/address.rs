use std::{fmt, str::FromStr};

use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};

use crate::{
    error::TileAddressError,
    util::{tile_bounds, tile_center, tile_id, GeoBounds, GeoPoint},
};

/// Deepest zoom level with a defined tile identifier.
pub const MAX_ZOOM: u8 = 26;

/// Hierarchical address of a slippy-map tile.
///
/// Rows grow southwards (XYZ scheme). Fields are public so addresses can be
/// written as literals; every operation re-validates before computing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TileAddress {
    pub z: u8,
    pub x: u64,
    pub y: u64,
}

impl TileAddress {
    /// Creates a validated address.
    ///
    /// # Errors
    /// [`TileAddressError::InvalidZoom`] if `z > 26`,
    /// [`TileAddressError::OutOfGridRange`] if `x` or `y` is not below `2^z`.
    pub const fn new(z: u8, x: u64, y: u64) -> Result<Self, TileAddressError> {
        let address = Self { z, x, y };
        match address.validate() {
            Ok(()) => Ok(address),
            Err(e) => Err(e),
        }
    }

    /// Checks the address against the pyramid bounds.
    ///
    /// # Errors
    /// See [`TileAddress::new`].
    pub const fn validate(&self) -> Result<(), TileAddressError> {
        if self.z > MAX_ZOOM {
            return Err(TileAddressError::InvalidZoom { zoom: self.z });
        }

        let n = match grid_size(self.z) {
            Ok(n) => n,
            Err(e) => return Err(e),
        };
        if self.x >= n || self.y >= n {
            return Err(TileAddressError::OutOfGridRange {
                z: self.z,
                x: self.x,
                y: self.y,
            });
        }

        Ok(())
    }

    /// Mirrors the row between the XYZ and TMS schemes. The operation is its own inverse.
    ///
    /// # Errors
    /// Fails for addresses outside the pyramid.
    pub const fn flip_y(self) -> Result<Self, TileAddressError> {
        if let Err(e) = self.validate() {
            return Err(e);
        }

        // validated above, so the zoom has a grid
        let last = (1u64 << self.z) - 1;
        Ok(Self {
            y: last - self.y,
            ..self
        })
    }

    /// Hilbert identifier of this tile, see [`tile_id`].
    ///
    /// # Errors
    /// Fails for addresses outside the pyramid.
    pub fn tile_id(&self) -> Result<u64, TileAddressError> {
        tile_id(self.z, self.x, self.y)
    }

    /// Geographic extent of this tile, see [`tile_bounds`].
    ///
    /// # Errors
    /// Fails for addresses outside the pyramid.
    pub fn bounds(&self) -> Result<GeoBounds, TileAddressError> {
        tile_bounds(self)
    }

    /// Midpoint of this tile, see [`tile_center`].
    ///
    /// # Errors
    /// Fails for addresses outside the pyramid.
    pub fn center(&self) -> Result<GeoPoint, TileAddressError> {
        tile_center(self)
    }
}

/// Number of tiles along one edge of the grid at zoom `z`, `2^z`.
///
/// # Errors
/// [`TileAddressError::InvalidZoom`] if `z > 26`.
pub const fn grid_size(z: u8) -> Result<u64, TileAddressError> {
    if z > MAX_ZOOM {
        return Err(TileAddressError::InvalidZoom { zoom: z });
    }

    Ok(1u64 << z)
}

impl fmt::Display for TileAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}/{}", self.z, self.x, self.y)
    }
}

impl FromStr for TileAddress {
    type Err = anyhow::Error;

    /// Parses `z/x/y` and validates the result.
    fn from_str(s: &str) -> Result<Self> {
        let mut parts = s.trim().split('/');

        let (Some(z), Some(x), Some(y), None) =
            (parts.next(), parts.next(), parts.next(), parts.next())
        else {
            return Err(anyhow!("expected z/x/y, got {s:?}"));
        };

        Ok(Self::new(z.parse()?, x.parse()?, y.parse()?)?)
    }
}
