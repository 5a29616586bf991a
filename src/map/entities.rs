//! Pure derivations from city and route data to visual primitives.

use crate::geo::Coord;
use crate::map::geometry::Dash;
use crate::map::style::{ZoneIcon, ZoneStyleRegistry};
use crate::model::{CityId, CityRef, RouteInfo, RouteSegment, Zone};
use ratatui::style::Color;
use std::collections::BTreeMap;
use std::rc::Rc;

/// Zone circle radius when the city carries none, in meters
pub const DEFAULT_CIRCLE_RADIUS_M: f64 = 25_000.0;
pub const CIRCLE_FILL_OPACITY: f64 = 0.12;
pub const CIRCLE_WEIGHT: u8 = 2;
pub const ROUTE_WEIGHT: u8 = 5;
pub const ROUTE_OPACITY: f64 = 0.85;
pub const UNSAFE_DASH: Dash = Dash { on: 10, off: 10 };

/// Info popup attached to a city marker
#[derive(Debug, Clone, PartialEq)]
pub struct MarkerPopup {
    pub title: String,
    pub subtitle: String,
    pub badge_label: &'static str,
    pub badge_color: Color,
    pub risk_line: Option<String>,
}

impl MarkerPopup {
    pub fn lines(&self) -> Vec<String> {
        let mut lines = vec![self.title.clone(), self.subtitle.clone(), self.badge_label.to_string()];
        lines.extend(self.risk_line.clone());
        lines
    }
}

#[derive(Debug, Clone)]
pub struct CityMarker {
    pub city: CityRef,
    pub icon: Rc<ZoneIcon>,
    pub popup: MarkerPopup,
}

impl CityMarker {
    pub fn id(&self) -> CityId {
        self.city.id
    }

    pub fn at(&self) -> Coord {
        self.city.coord
    }

    fn same_as(&self, other: &CityMarker) -> bool {
        (Rc::ptr_eq(&self.icon, &other.icon)) && self.city == other.city
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ZoneCircle {
    pub id: CityId,
    pub center: Coord,
    pub radius_m: f64,
    pub color: Color,
    pub fill_opacity: f64,
    pub weight: u8,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RoutePolyline {
    pub index: usize,
    pub path: Vec<Coord>,
    pub color: Color,
    pub weight: u8,
    pub opacity: f64,
    pub dash: Option<Dash>,
    pub popup: Option<RouteInfo>,
}

/// Marker for a city, or `None` when its coordinate is unusable
pub fn city_marker(city: &CityRef, registry: &ZoneStyleRegistry) -> Option<CityMarker> {
    if !city.coord.is_valid() {
        tracing::warn!(id = city.id, name = %city.name, "skipping city with invalid coordinate");
        return None;
    }
    let style = registry.style(city.zone);
    Some(CityMarker {
        city: city.clone(),
        icon: style.icon,
        popup: MarkerPopup {
            title: city.name.clone(),
            subtitle: city.region.clone(),
            badge_label: style.label,
            badge_color: style.color,
            risk_line: city.risk_index.map(|r| format!("Crime Index: {r:.1}")),
        },
    })
}

pub fn zone_circle(city: &CityRef, registry: &ZoneStyleRegistry) -> Option<ZoneCircle> {
    if !city.coord.is_valid() {
        return None;
    }
    Some(ZoneCircle {
        id: city.id,
        center: city.coord,
        radius_m: city
            .radius_m
            .filter(|r| r.is_finite() && *r > 0.0)
            .unwrap_or(DEFAULT_CIRCLE_RADIUS_M),
        color: registry.color(city.zone),
        fill_opacity: CIRCLE_FILL_OPACITY,
        weight: CIRCLE_WEIGHT,
    })
}

/// Solid green for safe legs, dashed red otherwise
pub fn route_polyline(index: usize, segment: &RouteSegment, registry: &ZoneStyleRegistry) -> Option<RoutePolyline> {
    let path: Vec<Coord> = segment.path.iter().copied().filter(Coord::is_valid).collect();
    if path.len() < 2 {
        tracing::warn!(index, points = segment.path.len(), "skipping route segment without two valid points");
        return None;
    }
    let (color, dash) = if segment.safe {
        (registry.color(Zone::Safe), None)
    } else {
        (registry.color(Zone::HighRisk), Some(UNSAFE_DASH))
    };
    Some(RoutePolyline {
        index,
        path,
        color,
        weight: ROUTE_WEIGHT,
        opacity: ROUTE_OPACITY,
        dash,
        popup: segment.info.clone(),
    })
}

/// What a scene sync changed
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SceneDiff {
    pub added: usize,
    pub updated: usize,
    pub removed: usize,
}

impl SceneDiff {
    pub fn is_empty(&self) -> bool {
        self.added == 0 && self.updated == 0 && self.removed == 0
    }
}

/// Keyed visual entities currently on the map
#[derive(Debug, Default)]
pub struct Scene {
    markers: BTreeMap<CityId, CityMarker>,
    circles: BTreeMap<CityId, ZoneCircle>,
    routes: BTreeMap<usize, RoutePolyline>,
    /// Marker ids in input order, for stable draw order
    order: Vec<CityId>,
}

impl Scene {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reconcile with the given data; entities with unchanged data are kept as-is
    pub fn sync(
        &mut self,
        cities: &[CityRef],
        routes: &[RouteSegment],
        show_circles: bool,
        registry: &ZoneStyleRegistry,
    ) -> SceneDiff {
        let mut diff = SceneDiff::default();

        let mut markers = BTreeMap::new();
        let mut order = Vec::with_capacity(cities.len());
        for marker in cities.iter().filter_map(|c| city_marker(c, registry)) {
            if markers.contains_key(&marker.id()) {
                continue;
            }
            order.push(marker.id());
            markers.insert(marker.id(), marker);
        }
        reconcile(&mut self.markers, markers, CityMarker::same_as, &mut diff);
        self.order = order;

        // circles follow the record each marker kept
        let circles = if show_circles {
            self.markers
                .values()
                .filter_map(|m| zone_circle(&m.city, registry))
                .map(|c| (c.id, c))
                .collect()
        } else {
            BTreeMap::new()
        };
        reconcile(&mut self.circles, circles, |a, b| a == b, &mut diff);

        let polylines = routes
            .iter()
            .enumerate()
            .filter_map(|(i, s)| route_polyline(i, s, registry))
            .map(|p| (p.index, p))
            .collect();
        reconcile(&mut self.routes, polylines, |a, b| a == b, &mut diff);

        diff
    }

    pub fn markers(&self) -> impl Iterator<Item = &CityMarker> {
        self.order.iter().filter_map(|id| self.markers.get(id))
    }

    pub fn marker(&self, id: CityId) -> Option<&CityMarker> {
        self.markers.get(&id)
    }

    pub fn circles(&self) -> impl Iterator<Item = &ZoneCircle> {
        self.circles.values()
    }

    pub fn routes(&self) -> impl Iterator<Item = &RoutePolyline> {
        self.routes.values()
    }

    pub fn route(&self, index: usize) -> Option<&RoutePolyline> {
        self.routes.get(&index)
    }

    pub fn marker_count(&self) -> usize {
        self.markers.len()
    }

    pub fn clear(&mut self) {
        self.markers.clear();
        self.circles.clear();
        self.routes.clear();
        self.order.clear();
    }
}

fn reconcile<K: Ord + Copy, V>(
    current: &mut BTreeMap<K, V>,
    next: BTreeMap<K, V>,
    same: impl Fn(&V, &V) -> bool,
    diff: &mut SceneDiff,
) {
    let before = current.len();
    current.retain(|k, _| next.contains_key(k));
    diff.removed += before - current.len();

    for (key, value) in next {
        match current.get(&key) {
            Some(existing) if same(existing, &value) => {}
            Some(_) => {
                diff.updated += 1;
                current.insert(key, value);
            }
            None => {
                diff.added += 1;
                current.insert(key, value);
            }
        }
    }
}
