use crate::geo::Coord;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

pub type CityId = u64;

/// Cities are fetched once and shared read-only with the map
pub type CityRef = Arc<City>;

/// Safety classification of a city
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Zone {
    #[serde(rename = "green")]
    Safe,
    #[serde(rename = "orange")]
    Moderate,
    #[serde(rename = "red")]
    HighRisk,
    #[serde(other)]
    Unknown,
}

impl Zone {
    /// Zones a city can actually be classified into
    pub const ALL: [Zone; 3] = [Zone::Safe, Zone::Moderate, Zone::HighRisk];

    pub fn from_id(id: &str) -> Self {
        match id.trim().to_ascii_lowercase().as_str() {
            "green" | "safe" => Zone::Safe,
            "orange" | "moderate" => Zone::Moderate,
            "red" | "high-risk" | "high_risk" => Zone::HighRisk,
            _ => Zone::Unknown,
        }
    }

    /// Wire identifier used by the REST API
    pub fn id(&self) -> &'static str {
        match self {
            Zone::Safe => "green",
            Zone::Moderate => "orange",
            Zone::HighRisk => "red",
            Zone::Unknown => "unknown",
        }
    }

    /// Dense index for per-zone tables
    pub(crate) fn index(&self) -> usize {
        match self {
            Zone::Safe => 0,
            Zone::Moderate => 1,
            Zone::HighRisk => 2,
            Zone::Unknown => 3,
        }
    }
}

impl fmt::Display for Zone {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id())
    }
}

/// Zone equality filter; `All` disables it
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ZoneFilter {
    #[default]
    All,
    Only(Zone),
}

impl ZoneFilter {
    pub fn matches(&self, zone: Zone) -> bool {
        match self {
            ZoneFilter::All => true,
            ZoneFilter::Only(z) => *z == zone,
        }
    }

    /// All -> green -> orange -> red -> All
    pub fn cycle(&self) -> Self {
        match self {
            ZoneFilter::All => ZoneFilter::Only(Zone::Safe),
            ZoneFilter::Only(Zone::Safe) => ZoneFilter::Only(Zone::Moderate),
            ZoneFilter::Only(Zone::Moderate) => ZoneFilter::Only(Zone::HighRisk),
            ZoneFilter::Only(_) => ZoneFilter::All,
        }
    }

    pub fn parse(s: &str) -> Self {
        if s.eq_ignore_ascii_case("all") || s.trim().is_empty() {
            ZoneFilter::All
        } else {
            ZoneFilter::Only(Zone::from_id(s))
        }
    }
}

/// Canonical city record, normalized at the data boundary
#[derive(Debug, Clone, PartialEq)]
pub struct City {
    pub id: CityId,
    pub name: String,
    /// State / administrative region
    pub region: String,
    pub coord: Coord,
    pub zone: Zone,
    /// Unit-less crime index, higher = riskier
    pub risk_index: Option<f64>,
    /// Display radius of the zone circle in meters
    pub radius_m: Option<f64>,
}

impl City {
    /// Same city with a presentational zone tag
    pub fn restyled(&self, zone: Zone) -> City {
        City {
            zone,
            ..self.clone()
        }
    }
}

/// Distance / duration text attached to a route leg
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RouteInfo {
    pub distance: String,
    pub duration: String,
}

/// One leg of a computed path
#[derive(Debug, Clone, PartialEq)]
pub struct RouteSegment {
    /// At least two points
    pub path: Vec<Coord>,
    pub safe: bool,
    pub info: Option<RouteInfo>,
}

/// Route response for one origin/destination pair
#[derive(Debug, Clone, PartialEq, Default)]
pub struct RouteResult {
    pub segments: Vec<RouteSegment>,
    pub distance: Option<String>,
    pub duration: Option<String>,
    pub safety_score: Option<f64>,
}

impl RouteResult {
    /// True when every leg stays within acceptable zones
    pub fn is_safe(&self) -> bool {
        !self.segments.is_empty() && self.segments.iter().all(|s| s.safe)
    }
}

#[cfg(test)]
pub(crate) mod fixtures {
    use super::*;

    pub fn city(id: CityId, name: &str, region: &str, lat: f64, lng: f64, zone: Zone) -> CityRef {
        Arc::new(City {
            id,
            name: name.to_string(),
            region: region.to_string(),
            coord: Coord::new(lat, lng),
            zone,
            risk_index: None,
            radius_m: None,
        })
    }

    pub fn mumbai_delhi() -> Vec<CityRef> {
        vec![
            city(1, "Mumbai", "Maharashtra", 19.07, 72.87, Zone::Safe),
            city(2, "Delhi", "Delhi", 28.6, 77.2, Zone::Moderate),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zone_ids() {
        assert_eq!(Zone::from_id("GREEN"), Zone::Safe);
        assert_eq!(Zone::from_id("orange"), Zone::Moderate);
        assert_eq!(Zone::from_id("red"), Zone::HighRisk);
        assert_eq!(Zone::from_id("purple"), Zone::Unknown);
        for z in Zone::ALL {
            assert_eq!(Zone::from_id(z.id()), z);
        }
    }

    #[test]
    fn test_zone_filter_cycle() {
        let mut f = ZoneFilter::All;
        let mut seen = Vec::new();
        for _ in 0..4 {
            f = f.cycle();
            seen.push(f);
        }
        assert_eq!(seen.last(), Some(&ZoneFilter::All));
        assert!(ZoneFilter::parse("all").matches(Zone::HighRisk));
        assert!(!ZoneFilter::parse("green").matches(Zone::HighRisk));
    }

    #[test]
    fn test_route_safety() {
        let leg = |safe| RouteSegment {
            path: vec![Coord::new(0.0, 0.0), Coord::new(1.0, 1.0)],
            safe,
            info: None,
        };
        let mut route = RouteResult {
            segments: vec![leg(true), leg(true)],
            ..Default::default()
        };
        assert!(route.is_safe());
        route.segments.push(leg(false));
        assert!(!route.is_safe());
        assert!(!RouteResult::default().is_safe());
    }
}
