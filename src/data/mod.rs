//! Data access: sources, record normalization and background fetching.

mod basemap;
mod demo;
mod fetch;
mod file;
mod http;

pub use basemap::{load_basemap, india_outline};
pub use demo::DemoSource;
pub use fetch::{FetchEvent, Fetcher, RequestSeq, RequestToken};
pub use file::FileSource;
pub use http::HttpSource;

use crate::error::DataError;
use crate::geo::Coord;
use crate::model::{City, CityId, RouteInfo, RouteResult, RouteSegment, Zone};
use serde::Deserialize;

/// Supplies the city list
pub trait CitySource: Send + Sync {
    fn fetch_cities(&self, zone: Option<Zone>) -> Result<Vec<City>, DataError>;
}

/// Supplies route geometry between two named cities
pub trait RouteSource: Send + Sync {
    fn fetch_route(&self, origin: &str, destination: &str) -> Result<RouteResult, DataError>;
}

/// City as delivered by the API or a data file. Both field conventions
/// (`lat`/`latitude`, `zone`/`safety_zone`, ...) are accepted here and
/// nowhere else.
#[derive(Debug, Deserialize)]
pub(crate) struct CityRecord {
    id: CityId,
    name: String,
    #[serde(default, alias = "state")]
    region: Option<String>,
    #[serde(default, alias = "latitude")]
    lat: Option<f64>,
    #[serde(default, alias = "longitude", alias = "lon")]
    lng: Option<f64>,
    #[serde(default, alias = "safety_zone")]
    zone: Option<String>,
    #[serde(default, alias = "crime_index")]
    risk_index: Option<f64>,
    #[serde(default)]
    radius: Option<f64>,
}

impl CityRecord {
    fn into_city(self) -> Result<City, DataError> {
        let coord = match (self.lat, self.lng) {
            (Some(lat), Some(lng)) => Coord::validated(lat, lng),
            _ => None,
        };
        let Some(coord) = coord else {
            return Err(DataError::InvalidCoordinate {
                id: self.id,
                name: self.name,
            });
        };
        Ok(City {
            id: self.id,
            name: self.name.trim().to_string(),
            region: self.region.unwrap_or_default(),
            coord,
            zone: self.zone.as_deref().map(Zone::from_id).unwrap_or(Zone::Unknown),
            risk_index: self.risk_index.filter(|r| r.is_finite()),
            radius_m: self.radius,
        })
    }
}

/// Convert raw records into canonical cities, dropping (and logging) bad coordinates
pub(crate) fn normalize_cities(records: Vec<CityRecord>) -> Vec<City> {
    records
        .into_iter()
        .filter_map(|r| match r.into_city() {
            Ok(city) => Some(city),
            Err(e) => {
                tracing::warn!("{e}; skipped");
                None
            }
        })
        .collect()
}

/// Route leg as delivered by the API: path points are `[lat, lng]`
#[derive(Debug, Deserialize)]
pub(crate) struct SegmentRecord {
    path: Vec<[f64; 2]>,
    #[serde(default)]
    safe: bool,
    #[serde(default)]
    info: Option<RouteInfo>,
}

/// Body of a route response
#[derive(Debug, Deserialize)]
pub(crate) struct RouteRecord {
    #[serde(default)]
    routes: Vec<SegmentRecord>,
    #[serde(default)]
    distance: Option<String>,
    #[serde(default)]
    duration: Option<String>,
    #[serde(default)]
    safety_score: Option<f64>,
}

impl RouteRecord {
    pub(crate) fn into_result(self) -> Result<RouteResult, DataError> {
        let segments: Vec<RouteSegment> = self
            .routes
            .into_iter()
            .filter_map(|s| {
                let path: Vec<Coord> = s
                    .path
                    .iter()
                    .filter_map(|[lat, lng]| Coord::validated(*lat, *lng))
                    .collect();
                if path.len() < 2 {
                    tracing::warn!(points = s.path.len(), "dropping route leg without two valid points");
                    return None;
                }
                Some(RouteSegment {
                    path,
                    safe: s.safe,
                    info: s.info,
                })
            })
            .collect();

        if segments.is_empty() {
            return Err(DataError::unavailable("no route found between the selected cities"));
        }
        Ok(RouteResult {
            segments,
            distance: self.distance,
            duration: self.duration,
            safety_score: self.safety_score,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse_cities(json: &str) -> Vec<City> {
        let mut bytes = json.as_bytes().to_vec();
        let records: Vec<CityRecord> = simd_json::serde::from_slice(&mut bytes).unwrap();
        normalize_cities(records)
    }

    #[test]
    fn test_both_field_conventions_normalize_alike() {
        let cities = parse_cities(
            r#"[
                {"id": 1, "name": "Mumbai", "state": "Maharashtra", "latitude": 19.07, "longitude": 72.87, "safety_zone": "green", "crime_index": 41.25},
                {"id": 2, "name": "Delhi", "region": "Delhi", "lat": 28.6, "lng": 77.2, "zone": "orange"}
            ]"#,
        );
        assert_eq!(cities.len(), 2);
        assert_eq!(cities[0].region, "Maharashtra");
        assert_eq!(cities[0].coord, Coord::new(19.07, 72.87));
        assert_eq!(cities[0].zone, Zone::Safe);
        assert_eq!(cities[0].risk_index, Some(41.25));
        assert_eq!(cities[1].zone, Zone::Moderate);
        assert_eq!(cities[1].risk_index, None);
    }

    #[test]
    fn test_invalid_coordinates_are_dropped() {
        let cities = parse_cities(
            r#"[
                {"id": 1, "name": "Missing", "zone": "red"},
                {"id": 2, "name": "Off-planet", "lat": 123.0, "lng": 77.2},
                {"id": 3, "name": "Jaipur", "lat": 26.91, "lng": 75.79, "zone": "teal"}
            ]"#,
        );
        assert_eq!(cities.len(), 1);
        assert_eq!(cities[0].name, "Jaipur");
        assert_eq!(cities[0].zone, Zone::Unknown);
    }

    #[test]
    fn test_route_record_conversion() {
        let mut bytes = br#"{
            "routes": [
                {"path": [[19.07, 72.87], [23.0, 75.0], [28.6, 77.2]], "safe": false,
                 "info": {"distance": "1,420 km", "duration": "25 h"}},
                {"path": [[19.07, 72.87]], "safe": true}
            ],
            "distance": "1,420 km",
            "safety_score": 61.5
        }"#
        .to_vec();
        let record: RouteRecord = simd_json::serde::from_slice(&mut bytes).unwrap();
        let route = record.into_result().unwrap();
        assert_eq!(route.segments.len(), 1);
        assert!(!route.segments[0].safe);
        assert_eq!(route.segments[0].path.len(), 3);
        assert_eq!(route.safety_score, Some(61.5));
        assert_eq!(route.duration, None);
    }

    #[test]
    fn test_empty_route_is_unavailable() {
        let record = RouteRecord {
            routes: Vec::new(),
            distance: None,
            duration: None,
            safety_score: None,
        };
        assert!(matches!(record.into_result(), Err(DataError::Unavailable(_))));
    }
}
