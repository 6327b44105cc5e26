//! Spatial index: geohash cells and great-circle distance.
//!
//! The durable store has no geo index, so posts are sharded by a coarse
//! geohash prefix. A proximity query expands the query point into its cell
//! and the 8 surrounding cells, then filters candidates by true distance.
//! A cell is a rectangle, not a disc: two points sharing a prefix can still
//! be farther apart than any given radius, so callers must always filter
//! with [`distance_km`].

/// Coarse precision used as the sharding key (~5 km cells).
pub const CELL_PREFIX_PRECISION: usize = 5;

/// Fine precision used as a stable location fingerprint.
pub const FULL_CELL_PRECISION: usize = 7;

/// Mean Earth radius in kilometres.
pub const EARTH_RADIUS_KM: f64 = 6371.0;

const BASE32: &[u8; 32] = b"0123456789bcdefghjkmnpqrstuvwxyz";

/// Geographic bounding box of a cell.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CellBounds {
    pub min_lat: f64,
    pub max_lat: f64,
    pub min_lng: f64,
    pub max_lng: f64,
}

impl CellBounds {
    pub fn center(&self) -> (f64, f64) {
        (
            (self.min_lat + self.max_lat) / 2.0,
            (self.min_lng + self.max_lng) / 2.0,
        )
    }

    pub fn lat_span(&self) -> f64 {
        self.max_lat - self.min_lat
    }

    pub fn lng_span(&self) -> f64 {
        self.max_lng - self.min_lng
    }
}

/// Encode a coordinate as a geohash of the given length.
///
/// Coordinates are clamped to the valid range first, so the function is total.
pub fn encode(lat: f64, lng: f64, precision: usize) -> String {
    let lat = lat.clamp(-90.0, 90.0);
    let lng = lng.clamp(-180.0, 180.0);

    let (mut lat_lo, mut lat_hi) = (-90.0_f64, 90.0_f64);
    let (mut lng_lo, mut lng_hi) = (-180.0_f64, 180.0_f64);

    let mut hash = String::with_capacity(precision);
    let mut even = true;
    let mut bit = 0;
    let mut idx = 0usize;

    while hash.len() < precision {
        if even {
            let mid = (lng_lo + lng_hi) / 2.0;
            if lng >= mid {
                idx = (idx << 1) | 1;
                lng_lo = mid;
            } else {
                idx <<= 1;
                lng_hi = mid;
            }
        } else {
            let mid = (lat_lo + lat_hi) / 2.0;
            if lat >= mid {
                idx = (idx << 1) | 1;
                lat_lo = mid;
            } else {
                idx <<= 1;
                lat_hi = mid;
            }
        }
        even = !even;

        bit += 1;
        if bit == 5 {
            hash.push(BASE32[idx] as char);
            bit = 0;
            idx = 0;
        }
    }

    hash
}

/// Decode a geohash into its bounding box. Returns `None` on invalid characters.
pub fn bounds(hash: &str) -> Option<CellBounds> {
    let (mut lat_lo, mut lat_hi) = (-90.0_f64, 90.0_f64);
    let (mut lng_lo, mut lng_hi) = (-180.0_f64, 180.0_f64);
    let mut even = true;

    for c in hash.bytes() {
        let idx = BASE32.iter().position(|&b| b == c.to_ascii_lowercase())?;
        for shift in (0..5).rev() {
            let on = (idx >> shift) & 1 == 1;
            if even {
                let mid = (lng_lo + lng_hi) / 2.0;
                if on {
                    lng_lo = mid;
                } else {
                    lng_hi = mid;
                }
            } else {
                let mid = (lat_lo + lat_hi) / 2.0;
                if on {
                    lat_lo = mid;
                } else {
                    lat_hi = mid;
                }
            }
            even = !even;
        }
    }

    Some(CellBounds {
        min_lat: lat_lo,
        max_lat: lat_hi,
        min_lng: lng_lo,
        max_lng: lng_hi,
    })
}

/// Coarse cell used as the partition key for the by-cell post view.
pub fn cell_prefix(lat: f64, lng: f64) -> String {
    encode(lat, lng, CELL_PREFIX_PRECISION)
}

/// Fine cell stored with each post as its location fingerprint.
pub fn full_cell(lat: f64, lng: f64) -> String {
    encode(lat, lng, FULL_CELL_PRECISION)
}

/// The coarse cell containing the point followed by its 8 neighbours.
///
/// Longitude wraps at the antimeridian. Near the poles the northern or
/// southern row collapses onto the edge cell; duplicates are removed, so
/// fewer than 9 cells can come back.
pub fn neighbors(lat: f64, lng: f64) -> Vec<String> {
    let center = cell_prefix(lat, lng);
    let Some(cell) = bounds(&center) else {
        return vec![center];
    };

    let (c_lat, c_lng) = cell.center();
    let (d_lat, d_lng) = (cell.lat_span(), cell.lng_span());

    let mut cells = Vec::with_capacity(9);
    cells.push(center);

    for (dy, dx) in [
        (1.0, 0.0),
        (-1.0, 0.0),
        (0.0, 1.0),
        (0.0, -1.0),
        (1.0, 1.0),
        (1.0, -1.0),
        (-1.0, 1.0),
        (-1.0, -1.0),
    ] {
        let n_lat = (c_lat + dy * d_lat).clamp(-90.0, 90.0);
        let n_lng = wrap_longitude(c_lng + dx * d_lng);
        let hash = cell_prefix(n_lat, n_lng);
        if !cells.contains(&hash) {
            cells.push(hash);
        }
    }

    cells
}

fn wrap_longitude(lng: f64) -> f64 {
    if (-180.0..180.0).contains(&lng) {
        lng
    } else {
        (lng + 180.0).rem_euclid(360.0) - 180.0
    }
}

/// Great-circle distance between two points using the haversine formula.
pub fn distance_km(lat1: f64, lng1: f64, lat2: f64, lng2: f64) -> f64 {
    let lat1_rad = lat1.to_radians();
    let lat2_rad = lat2.to_radians();
    let d_lat = (lat2 - lat1).to_radians();
    let d_lng = (lng2 - lng1).to_radians();

    let a = (d_lat / 2.0).sin().powi(2)
        + lat1_rad.cos() * lat2_rad.cos() * (d_lng / 2.0).sin().powi(2);
    // Rounding can push `a` just past 1 near the antipode.
    let a = a.clamp(0.0, 1.0);
    let c = 2.0 * a.sqrt().atan2((1.0 - a).sqrt());

    EARTH_RADIUS_KM * c
}
