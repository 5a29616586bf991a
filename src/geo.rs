use serde::{Deserialize, Serialize};
use std::f64::consts::PI;

/// Latitude limit of the Web Mercator projection
pub const MERCATOR_MAX_LAT: f64 = 85.05112878;

/// A geographic coordinate in degrees
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coord {
    pub lat: f64,
    pub lng: f64,
}

impl Coord {
    pub const fn new(lat: f64, lng: f64) -> Self {
        Self { lat, lng }
    }

    /// Build a coordinate, rejecting NaN and out-of-range values
    pub fn validated(lat: f64, lng: f64) -> Option<Self> {
        let coord = Self::new(lat, lng);
        coord.is_valid().then_some(coord)
    }

    pub fn is_valid(&self) -> bool {
        self.lat.is_finite()
            && self.lng.is_finite()
            && (-90.0..=90.0).contains(&self.lat)
            && (-180.0..=180.0).contains(&self.lng)
    }

    /// Point `meters` due north, used to turn a metric radius into pixels
    pub fn offset_north(&self, meters: f64) -> Self {
        Self::new((self.lat + meters / METERS_PER_DEGREE_LAT).min(90.0), self.lng)
    }
}

const METERS_PER_DEGREE_LAT: f64 = 111_320.0;

/// Normalized Web Mercator x in [0, 1]
#[inline(always)]
pub fn mercator_x(lng: f64) -> f64 {
    (lng + 180.0) / 360.0
}

/// Normalized Web Mercator y in [0, 1] (0 = north edge)
#[inline(always)]
pub fn mercator_y(lat: f64) -> f64 {
    let lat_rad = lat.clamp(-MERCATOR_MAX_LAT, MERCATOR_MAX_LAT) * PI / 180.0;
    (1.0 - (lat_rad.tan() + 1.0 / lat_rad.cos()).ln() / PI) / 2.0
}

/// Inverse of [`mercator_y`]
#[inline(always)]
pub fn mercator_lat(y: f64) -> f64 {
    (PI * (1.0 - 2.0 * y)).sinh().atan() * 180.0 / PI
}

/// Axis-aligned geographic bounding box
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bounds {
    pub south: f64,
    pub west: f64,
    pub north: f64,
    pub east: f64,
}

impl Bounds {
    /// Minimal box covering every valid coordinate; `None` when there are none
    pub fn covering<'a>(coords: impl IntoIterator<Item = &'a Coord>) -> Option<Self> {
        coords
            .into_iter()
            .filter(|c| c.is_valid())
            .fold(None, |acc: Option<Bounds>, c| {
                Some(match acc {
                    None => Bounds {
                        south: c.lat,
                        west: c.lng,
                        north: c.lat,
                        east: c.lng,
                    },
                    Some(b) => Bounds {
                        south: b.south.min(c.lat),
                        west: b.west.min(c.lng),
                        north: b.north.max(c.lat),
                        east: b.east.max(c.lng),
                    },
                })
            })
    }

    #[cfg(test)]
    pub fn contains(&self, c: &Coord) -> bool {
        (self.south..=self.north).contains(&c.lat) && (self.west..=self.east).contains(&c.lng)
    }

    pub fn center(&self) -> Coord {
        let y = (mercator_y(self.north) + mercator_y(self.south)) / 2.0;
        Coord::new(mercator_lat(y), (self.west + self.east) / 2.0)
    }
}
