//! Geo primitives: great-circle distance, coordinate blurring and geohash cells.
//!
//! All distances are in meters.

use std::f64::consts::{PI, TAU};

use chrono::NaiveDate;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use uuid::Uuid;

use crate::models::Coordinate;

const EARTH_RADIUS_METERS: f64 = 6_371_000.0;

/// Geohash length used for alert centers. A cell is roughly 39 km x 20 km at the equator.
pub const ALERT_CELL_PRECISION: usize = 4;

/// Above this absolute latitude a cell is narrower than the largest alert radius,
/// so the 3x3 neighbourhood no longer covers every alert in range.
pub const MAX_PREFILTER_LATITUDE: f64 = 70.0;

fn to_rad(deg: f64) -> f64 {
    deg * PI / 180.0
}

fn to_deg(rad: f64) -> f64 {
    rad * 180.0 / PI
}

/// Haversine distance between two points.
pub fn distance(a: Coordinate, b: Coordinate) -> f64 {
    let dlat = to_rad(b.latitude - a.latitude);
    let dlng = to_rad(b.longitude - a.longitude);

    let h = (dlat / 2.0).sin().powi(2)
        + to_rad(a.latitude).cos() * to_rad(b.latitude).cos() * (dlng / 2.0).sin().powi(2);

    2.0 * EARTH_RADIUS_METERS * h.sqrt().min(1.0).asin()
}

/// Point reached by travelling `meters` from `origin` along the initial `bearing` (radians).
pub fn destination(origin: Coordinate, bearing: f64, meters: f64) -> Coordinate {
    let angular = meters / EARTH_RADIUS_METERS;
    let lat1 = to_rad(origin.latitude);
    let lng1 = to_rad(origin.longitude);

    let lat2 = (lat1.sin() * angular.cos() + lat1.cos() * angular.sin() * bearing.cos()).asin();
    let lng2 = lng1
        + (bearing.sin() * angular.sin() * lat1.cos())
            .atan2(angular.cos() - lat1.sin() * lat2.sin());

    Coordinate::new(to_deg(lat2), normalize_longitude(to_deg(lng2)))
}

fn normalize_longitude(lng: f64) -> f64 {
    let wrapped = (lng + 540.0) % 360.0 - 180.0;
    if wrapped == -180.0 && lng > 0.0 {
        180.0
    } else {
        wrapped
    }
}

/// Inclusive bounds of a blur offset.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BlurRange {
    pub min_meters: f64,
    pub max_meters: f64,
}

impl Default for BlurRange {
    fn default() -> Self {
        Self {
            min_meters: 500.0,
            max_meters: 1500.0,
        }
    }
}

/// Deterministic seed for one (subject, observer, UTC day) triple.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlurSeed([u8; 32]);

impl BlurSeed {
    pub fn new(subject: Uuid, observer: Uuid, day: NaiveDate) -> Self {
        let subject = subject.to_string();
        let observer = observer.to_string();
        let day = day.format("%Y-%m-%d").to_string();
        Self(shared::crypto::derive_seed(&[&subject, &observer, &day]))
    }
}

/// Offsets `coord` by a seeded random distance within `range` at a seeded random bearing.
///
/// The same seed always produces the same point.
pub fn blur(coord: Coordinate, seed: BlurSeed, range: BlurRange) -> Coordinate {
    let mut rng = StdRng::from_seed(seed.0);
    let meters = rng.gen_range(range.min_meters..=range.max_meters);
    let bearing = rng.gen_range(0.0..TAU);
    destination(coord, bearing, meters)
}

/// Geohash cell containing `coord` at alert precision.
pub fn geohash_cell(coord: Coordinate) -> Option<String> {
    geohash::encode(
        geohash::Coord {
            x: coord.longitude,
            y: coord.latitude,
        },
        ALERT_CELL_PRECISION,
    )
    .ok()
}

/// The cell of `coord` plus its 8 neighbours.
///
/// Returns `None` when cell search cannot be trusted (polar band or encoding failure);
/// callers then fall back to a full scan.
pub fn search_cells(coord: Coordinate) -> Option<Vec<String>> {
    if coord.latitude.abs() > MAX_PREFILTER_LATITUDE {
        return None;
    }
    let cell = geohash_cell(coord)?;
    let n = geohash::neighbors(&cell).ok()?;

    let mut cells = vec![cell, n.n, n.ne, n.e, n.se, n.s, n.sw, n.w, n.nw];
    cells.sort();
    cells.dedup();
    Some(cells)
}

/// Longitude interval of a bounding box.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum LongitudeRange {
    /// Every longitude (box reaches a pole or spans the globe).
    Any,
    /// `min <= lng <= max`.
    Span { min: f64, max: f64 },
    /// Box crosses the antimeridian: `lng >= west || lng <= east`.
    Wrapped { west: f64, east: f64 },
}

impl LongitudeRange {
    pub fn contains(&self, lng: f64) -> bool {
        match *self {
            LongitudeRange::Any => true,
            LongitudeRange::Span { min, max } => lng >= min && lng <= max,
            LongitudeRange::Wrapped { west, east } => lng >= west || lng <= east,
        }
    }
}

/// Coarse rectangle enclosing a circle, used to narrow candidate queries.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingBox {
    pub min_latitude: f64,
    pub max_latitude: f64,
    pub longitude: LongitudeRange,
}

impl BoundingBox {
    pub fn contains(&self, coord: Coordinate) -> bool {
        coord.latitude >= self.min_latitude
            && coord.latitude <= self.max_latitude
            && self.longitude.contains(coord.longitude)
    }
}

/// Bounding box of the circle of `radius_meters` around `center`, padded by 1%.
pub fn bounding_box(center: Coordinate, radius_meters: f64) -> BoundingBox {
    let angular = to_deg(radius_meters * 1.01 / EARTH_RADIUS_METERS);
    let min_latitude = center.latitude - angular;
    let max_latitude = center.latitude + angular;

    if min_latitude <= -90.0 || max_latitude >= 90.0 {
        return BoundingBox {
            min_latitude: min_latitude.max(-90.0),
            max_latitude: max_latitude.min(90.0),
            longitude: LongitudeRange::Any,
        };
    }

    let widest = center.latitude.abs() + angular;
    let delta = angular / to_rad(widest).cos();
    let longitude = if delta >= 180.0 {
        LongitudeRange::Any
    } else {
        let min = center.longitude - delta;
        let max = center.longitude + delta;
        if min < -180.0 {
            LongitudeRange::Wrapped {
                west: min + 360.0,
                east: max,
            }
        } else if max > 180.0 {
            LongitudeRange::Wrapped {
                west: min,
                east: max - 360.0,
            }
        } else {
            LongitudeRange::Span { min, max }
        }
    };

    BoundingBox {
        min_latitude,
        max_latitude,
        longitude,
    }
}
