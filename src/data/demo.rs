use super::{CitySource, RouteSource};
use crate::error::DataError;
use crate::geo::Coord;
use crate::model::{City, RouteInfo, RouteResult, RouteSegment, Zone};

/// Average road speed used for demo durations, km/h
const DEMO_SPEED_KMH: f64 = 55.0;

/// Built-in city set for running without a backend. Routes are straight
/// two-point legs; a leg is unsafe when either end is a high-risk city.
#[derive(Default)]
pub struct DemoSource;

impl DemoSource {
    pub fn new() -> Self {
        Self
    }

    fn cities() -> Vec<City> {
        // (name, state, lat, lng, zone, crime index)
        const CITIES: &[(&str, &str, f64, f64, Zone, f64)] = &[
            ("Mumbai", "Maharashtra", 19.076, 72.8777, Zone::Safe, 38.5),
            ("New Delhi", "Delhi", 28.6139, 77.209, Zone::HighRisk, 71.2),
            ("Jaipur", "Rajasthan", 26.9124, 75.7873, Zone::Moderate, 52.4),
            ("Agra", "Uttar Pradesh", 27.1767, 78.0081, Zone::Moderate, 55.0),
            ("Goa", "Goa", 15.2993, 74.124, Zone::Safe, 29.8),
            ("Varanasi", "Uttar Pradesh", 25.3176, 82.9739, Zone::Moderate, 49.6),
            ("Chennai", "Tamil Nadu", 13.0827, 80.2707, Zone::Safe, 35.1),
            ("Kolkata", "West Bengal", 22.5726, 88.3639, Zone::Moderate, 47.3),
            ("Bengaluru", "Karnataka", 12.9716, 77.5946, Zone::Safe, 40.2),
            ("Hyderabad", "Telangana", 17.385, 78.4867, Zone::Safe, 36.7),
            ("Pune", "Maharashtra", 18.5204, 73.8567, Zone::Safe, 33.0),
            ("Ahmedabad", "Gujarat", 23.0225, 72.5714, Zone::Safe, 31.4),
            ("Lucknow", "Uttar Pradesh", 26.8467, 80.9462, Zone::Moderate, 58.9),
            ("Patna", "Bihar", 25.5941, 85.1376, Zone::HighRisk, 68.3),
            ("Kochi", "Kerala", 9.9312, 76.2673, Zone::Safe, 27.5),
        ];
        CITIES
            .iter()
            .zip(1..)
            .map(|(&(name, state, lat, lng, zone, crime), id)| City {
                id,
                name: name.to_string(),
                region: state.to_string(),
                coord: Coord::new(lat, lng),
                zone,
                risk_index: Some(crime),
                radius_m: None,
            })
            .collect()
    }

    fn find(name: &str) -> Option<City> {
        Self::cities()
            .into_iter()
            .find(|c| c.name.eq_ignore_ascii_case(name.trim()))
    }
}

impl CitySource for DemoSource {
    fn fetch_cities(&self, zone: Option<Zone>) -> Result<Vec<City>, DataError> {
        Ok(Self::cities()
            .into_iter()
            .filter(|c| zone.map_or(true, |z| c.zone == z))
            .collect())
    }
}

impl RouteSource for DemoSource {
    fn fetch_route(&self, origin: &str, destination: &str) -> Result<RouteResult, DataError> {
        let from = Self::find(origin).ok_or_else(|| DataError::unavailable(format!("unknown city: {origin}")))?;
        let to = Self::find(destination).ok_or_else(|| DataError::unavailable(format!("unknown city: {destination}")))?;

        let km = haversine_km(&from.coord, &to.coord);
        let hours = km / DEMO_SPEED_KMH;
        let info = RouteInfo {
            distance: format!("{km:.0} km"),
            duration: format_hours(hours),
        };
        let safe = from.zone != Zone::HighRisk && to.zone != Zone::HighRisk;
        let risk = [from.risk_index, to.risk_index].iter().flatten().sum::<f64>() / 2.0;

        Ok(RouteResult {
            segments: vec![RouteSegment {
                path: vec![from.coord, to.coord],
                safe,
                info: Some(info.clone()),
            }],
            distance: Some(info.distance),
            duration: Some(info.duration),
            safety_score: Some((100.0 - risk).clamp(0.0, 100.0)),
        })
    }
}

/// "2h 05m" style duration, rounded to the minute
fn format_hours(hours: f64) -> String {
    let minutes = (hours * 60.0).round() as u64;
    format!("{}h {:02}m", minutes / 60, minutes % 60)
}

/// Haversine distance in kilometers
fn haversine_km(a: &Coord, b: &Coord) -> f64 {
    let r = 6371.0; // Earth radius in km
    let dlat = (b.lat - a.lat).to_radians();
    let dlon = (b.lng - a.lng).to_radians();
    let lat1 = a.lat.to_radians();
    let lat2 = b.lat.to_radians();

    let h = (dlat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (dlon / 2.0).sin().powi(2);
    2.0 * r * h.sqrt().asin()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_demo_ids_unique_and_coords_valid() {
        let cities = DemoSource::new().fetch_cities(None).unwrap();
        let mut ids: Vec<_> = cities.iter().map(|c| c.id).collect();
        ids.dedup();
        assert_eq!(ids.len(), cities.len());
        assert!(cities.iter().all(|c| c.coord.is_valid()));
    }

    #[test]
    fn test_high_risk_endpoint_makes_route_unsafe() {
        let source = DemoSource::new();
        let route = source.fetch_route("Mumbai", "New Delhi").unwrap();
        assert!(!route.segments[0].safe);

        let route = source.fetch_route("mumbai", "Pune").unwrap();
        assert!(route.segments[0].safe);
        assert_eq!(route.segments[0].path.len(), 2);
        assert!(route.distance.unwrap().ends_with(" km"));
    }

    #[test]
    fn test_unknown_city_is_unavailable() {
        let err = DemoSource::new().fetch_route("Atlantis", "Pune").unwrap_err();
        assert_eq!(err.to_string(), "unknown city: Atlantis");
    }

    #[test]
    fn test_format_hours_carries_rounded_minutes() {
        assert_eq!(format_hours(2.995), "3h 00m");
        assert_eq!(format_hours(2.5), "2h 30m");
        assert_eq!(format_hours(0.0), "0h 00m");
    }

    #[test]
    fn test_haversine_mumbai_pune() {
        let km = haversine_km(&Coord::new(19.076, 72.8777), &Coord::new(18.5204, 73.8567));
        assert!((115.0..125.0).contains(&km), "{km}");
    }
}
