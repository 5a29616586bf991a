use super::{normalize_cities, CityRecord, CitySource, RouteRecord, RouteSource};
use crate::error::DataError;
use crate::model::{City, RouteResult, Zone};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

const CITIES_FILE: &str = "cities.json";
const ROUTES_FILE: &str = "routes.json";

/// Precomputed route between two named cities
#[derive(Debug, Deserialize)]
struct RouteEntry {
    origin: String,
    destination: String,
    route: RouteRecord,
}

/// Reads `cities.json` and `routes.json` from a directory
pub struct FileSource {
    dir: PathBuf,
}

impl FileSource {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn read<T: for<'de> Deserialize<'de>>(path: &Path) -> Result<T, DataError> {
        let mut bytes = fs::read(path)?;
        Ok(simd_json::serde::from_slice(&mut bytes)?)
    }
}

impl CitySource for FileSource {
    fn fetch_cities(&self, zone: Option<Zone>) -> Result<Vec<City>, DataError> {
        let path = self.dir.join(CITIES_FILE);
        let records: Vec<CityRecord> = Self::read(&path)?;
        let cities: Vec<City> = normalize_cities(records)
            .into_iter()
            .filter(|c| zone.map_or(true, |z| c.zone == z))
            .collect();
        tracing::info!(path = %path.display(), count = cities.len(), "cities loaded");
        Ok(cities)
    }
}

impl RouteSource for FileSource {
    fn fetch_route(&self, origin: &str, destination: &str) -> Result<RouteResult, DataError> {
        let path = self.dir.join(ROUTES_FILE);
        if !path.exists() {
            return Err(DataError::unavailable(format!("no route data in {}", self.dir.display())));
        }
        let entries: Vec<RouteEntry> = Self::read(&path)?;
        let same = |a: &str, b: &str| a.trim().eq_ignore_ascii_case(b.trim());

        for entry in entries {
            if same(&entry.origin, origin) && same(&entry.destination, destination) {
                return entry.route.into_result();
            }
            if same(&entry.origin, destination) && same(&entry.destination, origin) {
                let mut result = entry.route.into_result()?;
                result.segments.reverse();
                for segment in &mut result.segments {
                    segment.path.reverse();
                }
                return Ok(result);
            }
        }
        Err(DataError::unavailable(format!("no route found from {origin} to {destination}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geo::Coord;

    fn fixture_dir(name: &str, cities: &str, routes: Option<&str>) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("safemap-{}-{}", name, std::process::id()));
        fs::create_dir_all(&dir).unwrap();
        fs::write(dir.join(CITIES_FILE), cities).unwrap();
        if let Some(routes) = routes {
            fs::write(dir.join(ROUTES_FILE), routes).unwrap();
        }
        dir
    }

    const CITIES: &str = r#"[
        {"id": 1, "name": "Mumbai", "state": "Maharashtra", "latitude": 19.07, "longitude": 72.87, "safety_zone": "green"},
        {"id": 2, "name": "Delhi", "state": "Delhi", "latitude": 28.6, "longitude": 77.2, "safety_zone": "orange"}
    ]"#;

    const ROUTES: &str = r#"[
        {"origin": "Mumbai", "destination": "Delhi",
         "route": {"routes": [{"path": [[19.07, 72.87], [28.6, 77.2]], "safe": false}], "distance": "1,420 km"}}
    ]"#;

    #[test]
    fn test_fetch_cities_with_zone_filter() {
        let source = FileSource::new(fixture_dir("zone", CITIES, None));
        assert_eq!(source.fetch_cities(None).unwrap().len(), 2);
        let green = source.fetch_cities(Some(Zone::Safe)).unwrap();
        assert_eq!(green.len(), 1);
        assert_eq!(green[0].name, "Mumbai");
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let source = FileSource::new(std::env::temp_dir().join("safemap-does-not-exist"));
        assert!(matches!(source.fetch_cities(None), Err(DataError::Io(_))));
    }

    #[test]
    fn test_route_lookup_both_directions() {
        let source = FileSource::new(fixture_dir("routes", CITIES, Some(ROUTES)));
        let forward = source.fetch_route("mumbai", "Delhi").unwrap();
        assert!(!forward.segments[0].safe);
        assert_eq!(forward.distance.as_deref(), Some("1,420 km"));

        let back = source.fetch_route("Delhi", "Mumbai").unwrap();
        assert_eq!(back.segments[0].path[0], Coord::new(28.6, 77.2));

        assert!(matches!(source.fetch_route("Delhi", "Goa"), Err(DataError::Unavailable(_))));
    }
}
