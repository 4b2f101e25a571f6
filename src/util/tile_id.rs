use std::ops::Range;

use crate::{
    address::{grid_size, TileAddress, MAX_ZOOM},
    error::TileAddressError,
};

/// Number of tiles on all zoom levels shallower than `z`, `(4^z - 1) / 3`.
///
/// This is the identifier of the first tile on zoom level `z`.
///
/// # Errors
/// Returns [`TileAddressError::InvalidZoom`] if `z > 26`.
pub const fn zoom_base_id(z: u8) -> Result<u64, TileAddressError> {
    if z > MAX_ZOOM {
        return Err(TileAddressError::InvalidZoom { zoom: z });
    }

    Ok(((1u64 << (2 * z as u32)) - 1) / 3)
}

/// The contiguous block of identifiers occupied by zoom level `z`.
///
/// # Errors
/// Returns [`TileAddressError::InvalidZoom`] if `z > 26`.
pub fn tile_id_range(z: u8) -> Result<Range<u64>, TileAddressError> {
    let start = zoom_base_id(z)?;
    let n = grid_size(z)?;

    Ok(start..start + n * n)
}

/// Computes the Hilbert tile identifier of `z/x/y`.
///
/// Identifiers are grouped by zoom level: every tile on level `z` sorts after
/// all tiles on shallower levels. Within a level tiles follow a Hilbert curve,
/// so neighbouring tiles get nearby identifiers.
///
/// # Errors
/// Fails if the zoom exceeds 26 or `x`/`y` lie outside the `2^z` grid.
pub fn tile_id(z: u8, x: u64, y: u64) -> Result<u64, TileAddressError> {
    TileAddress { z, x, y }.validate()?;

    if z == 0 {
        return Ok(0);
    }

    let mut id: u64 = 0;
    let (mut cur_x, mut cur_y) = (x, y);

    for i in (0..z).rev() {
        let level_n = 1u64 << i;
        let rx = (cur_x >> i) & 1;
        let ry = (cur_y >> i) & 1;

        id += ((rx * 3) ^ ry) * level_n * level_n;
        (cur_x, cur_y) = rotate(level_n, cur_x % level_n, cur_y % level_n, rx, ry);
    }

    Ok(zoom_base_id(z)? + id)
}

/// Reorients the remaining sub-square so the next level continues the curve.
const fn rotate(n: u64, x: u64, y: u64, rx: u64, ry: u64) -> (u64, u64) {
    if ry != 0 {
        return (x, y);
    }

    if rx == 1 {
        (n - 1 - y, n - 1 - x)
    } else {
        (y, x)
    }
}

#[cfg(test)]
mod test {
    use std::collections::HashSet;

    use super::*;

    #[test]
    fn test_zoom_zero() -> Result<(), TileAddressError> {
        assert_eq!(tile_id(0, 0, 0)?, 0);

        Ok(())
    }

    #[test]
    fn test_zoom_base_id() -> Result<(), TileAddressError> {
        assert_eq!(zoom_base_id(0)?, 0);
        assert_eq!(zoom_base_id(1)?, 1);
        assert_eq!(zoom_base_id(2)?, 5);
        assert_eq!(zoom_base_id(3)?, 21);
        assert_eq!(zoom_base_id(14)?, 89_478_485);
        assert_eq!(zoom_base_id(MAX_ZOOM)?, 1_501_199_875_790_165);

        Ok(())
    }

    #[test]
    fn test_zoom_base_id_rejects_deep_zoom() {
        for zoom in [27, 32, 40, 64, u8::MAX] {
            assert_eq!(
                zoom_base_id(zoom),
                Err(TileAddressError::InvalidZoom { zoom })
            );
        }
    }

    #[test]
    fn test_last_range_ends_at_id_space() -> Result<(), TileAddressError> {
        assert_eq!(tile_id_range(MAX_ZOOM)?.end, 6_004_799_503_160_661);

        Ok(())
    }

    #[test]
    fn test_rotate() {
        // upper half keeps orientation
        assert_eq!(rotate(4, 1, 2, 0, 1), (1, 2));
        assert_eq!(rotate(4, 1, 2, 1, 1), (1, 2));

        // lower left transposes
        assert_eq!(rotate(4, 1, 2, 0, 0), (2, 1));

        // lower right reflects, then transposes
        assert_eq!(rotate(4, 1, 2, 1, 0), (1, 2));
        assert_eq!(rotate(4, 0, 1, 1, 0), (2, 3));
    }

    #[test]
    fn test_zoom_one() -> Result<(), TileAddressError> {
        assert_eq!(tile_id(1, 0, 0)?, 1);
        assert_eq!(tile_id(1, 0, 1)?, 2);
        assert_eq!(tile_id(1, 1, 1)?, 3);
        assert_eq!(tile_id(1, 1, 0)?, 4);

        Ok(())
    }

    #[test]
    fn test_zoom_two_grid() -> Result<(), TileAddressError> {
        // rows are y, columns are x
        let expected: [[u64; 4]; 4] = [
            [5, 6, 19, 20],
            [8, 7, 18, 17],
            [9, 12, 13, 16],
            [10, 11, 14, 15],
        ];

        for (y, row) in expected.iter().enumerate() {
            for (x, id) in row.iter().enumerate() {
                assert_eq!(tile_id(2, x as u64, y as u64)?, *id, "tile 2/{x}/{y}");
            }
        }

        Ok(())
    }

    #[test]
    fn test_reference_values() -> Result<(), TileAddressError> {
        assert_eq!(tile_id(3, 0, 0)?, 21);
        assert_eq!(tile_id(12, 3423, 1763)?, 19_078_479);
        assert_eq!(tile_id(14, 8907, 5509)?, 317_919_281);
        assert_eq!(tile_id(26, 0, 0)?, 1_501_199_875_790_165);
        assert_eq!(
            tile_id(26, (1 << 26) - 1, (1 << 26) - 1)?,
            4_503_599_627_370_495
        );

        Ok(())
    }

    #[test]
    fn test_consecutive_ids_are_neighbours() -> Result<(), TileAddressError> {
        for z in 1..=5u8 {
            let n = 1u64 << z;
            let mut by_id = vec![(0, 0); usize::try_from(n * n).unwrap_or_default()];

            for x in 0..n {
                for y in 0..n {
                    let index = tile_id(z, x, y)? - zoom_base_id(z)?;
                    by_id[usize::try_from(index).unwrap_or_default()] = (x, y);
                }
            }

            for pair in by_id.windows(2) {
                let ((x0, y0), (x1, y1)) = (pair[0], pair[1]);
                assert_eq!(x0.abs_diff(x1) + y0.abs_diff(y1), 1, "zoom {z}");
            }
        }

        Ok(())
    }

    #[test]
    fn test_zoom_fills_contiguous_range() -> Result<(), TileAddressError> {
        for z in 0..=6u8 {
            let n = 1u64 << z;
            let range = tile_id_range(z)?;
            let mut seen = HashSet::new();

            for x in 0..n {
                for y in 0..n {
                    let id = tile_id(z, x, y)?;
                    assert!(range.contains(&id), "{z}/{x}/{y} -> {id}");
                    assert!(seen.insert(id), "duplicate id {id} at {z}/{x}/{y}");
                }
            }

            assert_eq!(seen.len() as u64, n * n);
            assert_eq!(range.end - range.start, n * n);
        }

        Ok(())
    }

    #[test]
    fn test_zoom_partitioning() -> Result<(), TileAddressError> {
        for z in 0..MAX_ZOOM {
            let n = 1u64 << z;
            let corners = [(0, 0), (0, n - 1), (n - 1, 0), (n - 1, n - 1)];

            let deepest_here = corners
                .iter()
                .map(|&(x, y)| tile_id(z, x, y))
                .collect::<Result<Vec<_>, _>>()?
                .into_iter()
                .max()
                .unwrap_or_default();

            assert!(deepest_here < tile_id_range(z + 1)?.start);
        }

        Ok(())
    }

    #[test]
    fn test_rejects_invalid_addresses() {
        assert_eq!(
            tile_id(27, 0, 0),
            Err(TileAddressError::InvalidZoom { zoom: 27 })
        );
        assert_eq!(
            tile_id(3, 8, 0),
            Err(TileAddressError::OutOfGridRange { z: 3, x: 8, y: 0 })
        );
        assert_eq!(
            tile_id(0, 0, 1),
            Err(TileAddressError::OutOfGridRange { z: 0, x: 0, y: 1 })
        );
        assert!(tile_id_range(27).is_err());
    }
}
