//! Web Mercator tiling and quadkey encoding.
//!
//! A quadkey names a map tile as a base-4 string, one digit per zoom
//! level, most significant level first. Crosswalk cell ids are quadkeys,
//! so point lookups start here.

pub const MIN_LATITUDE: f64 = -85.05112878;
pub const MAX_LATITUDE: f64 = 85.05112878;
pub const MIN_LONGITUDE: f64 = -180.0;
pub const MAX_LONGITUDE: f64 = 180.0;

/// Tile coordinates of a point at the given zoom level.
///
/// Returns `None` for non-finite coordinates or coordinates outside the
/// Web Mercator domain. Points exactly on the anti-meridian or the
/// latitude limits clamp into the edge tile.
pub fn tile_for(latitude: f64, longitude: f64, zoom: u8) -> Option<(u32, u32)> {
    if !latitude.is_finite() || !longitude.is_finite() {
        return None;
    }
    if !(MIN_LATITUDE..=MAX_LATITUDE).contains(&latitude)
        || !(MIN_LONGITUDE..=MAX_LONGITUDE).contains(&longitude)
    {
        return None;
    }

    let n = (1u64 << zoom) as f64;
    let x = ((longitude + 180.0) / 360.0 * n).floor();
    let lat_rad = latitude.to_radians();
    let y = ((1.0 - lat_rad.tan().asinh() / std::f64::consts::PI) / 2.0 * n).floor();

    let max = ((1u64 << zoom) - 1) as i64;
    let x = (x as i64).clamp(0, max) as u32;
    let y = (y as i64).clamp(0, max) as u32;
    Some((x, y))
}

/// Quadkey of a tile, one digit per level.
///
/// Each digit interleaves one bit of x and one bit of y, highest bit
/// first: `digit = x_bit + 2 * y_bit`.
pub fn tile_to_quadkey(x: u32, y: u32, zoom: u8) -> String {
    let mut quadkey = String::with_capacity(zoom as usize);
    for level in (1..=zoom).rev() {
        let mask = 1u32 << (level - 1);
        let mut digit = 0u8;
        if x & mask != 0 {
            digit += 1;
        }
        if y & mask != 0 {
            digit += 2;
        }
        quadkey.push((b'0' + digit) as char);
    }
    quadkey
}

/// Quadkey of a point, or `None` if the point is outside the tiling domain.
pub fn quadkey_for(latitude: f64, longitude: f64, zoom: u8) -> Option<String> {
    tile_for(latitude, longitude, zoom).map(|(x, y)| tile_to_quadkey(x, y, zoom))
}
