//! The composed map: loading/error/ready states over the scene, camera and raster.

use crate::geo::Coord;
use crate::map::camera::{ViewHints, ViewportController};
use crate::map::entities::{MarkerPopup, Scene, SceneDiff};
use crate::map::projection::Viewport;
use crate::map::renderer::{DisplaySettings, LineString, MapLayers, MapRenderer};
use crate::map::spatial::SpatialGrid;
use crate::map::style::ZoneStyleRegistry;
use crate::model::{CityId, CityRef, RouteInfo, RouteSegment};
use ratatui::style::Color;

/// National centroid of India
pub const DEFAULT_CENTER: Coord = Coord::new(20.5937, 78.9629);
pub const DEFAULT_ZOOM: f64 = 8.0;

/// Marker hit radius, braille pixels
const MARKER_HIT_PX: f64 = 4.0;
/// Route hit distance, braille pixels
const ROUTE_HIT_PX: f64 = 3.0;
/// Hit grid cell size, degrees
const HIT_CELL_DEG: f64 = 1.0;

/// Inputs owned by the embedding screen
#[derive(Debug, Clone, Default)]
pub struct SurfaceProps {
    pub cities: Vec<CityRef>,
    pub routes: Vec<RouteSegment>,
    pub view: ViewHints,
    pub show_zone_circles: bool,
    pub show_legend: bool,
    pub loading: bool,
    pub error: Option<String>,
}

impl SurfaceProps {
    /// Loading wins over error; the map mounts only when neither is set
    pub fn phase(&self) -> SurfacePhase {
        if self.loading {
            SurfacePhase::Loading
        } else if let Some(msg) = &self.error {
            SurfacePhase::Error(msg.clone())
        } else {
            SurfacePhase::Ready
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SurfacePhase {
    Loading,
    Error(String),
    Ready,
}

/// Popup currently open on the map
#[derive(Debug, Clone, PartialEq)]
pub enum Popup {
    City { id: CityId, at: Coord, content: MarkerPopup },
    Route { index: usize, at: Coord, info: RouteInfo },
}

impl Popup {
    pub fn anchor(&self) -> Coord {
        match self {
            Popup::City { at, .. } | Popup::Route { at, .. } => *at,
        }
    }

    pub fn lines(&self) -> Vec<String> {
        match self {
            Popup::City { content, .. } => content.lines(),
            Popup::Route { info, .. } => vec![
                format!("Distance: {}", info.distance),
                format!("Duration: {}", info.duration),
            ],
        }
    }

    pub fn accent(&self) -> Color {
        match self {
            Popup::City { content, .. } => content.badge_color,
            Popup::Route { .. } => Color::White,
        }
    }
}

/// A popup placed in character cells relative to the map area
#[derive(Debug, Clone, PartialEq)]
pub struct PopupView {
    pub col: u16,
    pub row: u16,
    pub lines: Vec<String>,
    pub accent: Color,
}

/// What the surface shows this frame
pub enum SurfaceView {
    Loading,
    Error(String),
    Map {
        layers: MapLayers,
        /// Present once the surface is ready and the legend is enabled
        legend: Option<Vec<(&'static str, Color)>>,
        popup: Option<PopupView>,
    },
}

type CityClick = Box<dyn FnMut(&CityRef)>;
type MapReady = Box<dyn FnMut()>;

pub struct MapSurface {
    registry: ZoneStyleRegistry,
    viewport: Viewport,
    controller: ViewportController,
    scene: Scene,
    renderer: MapRenderer,
    pub settings: DisplaySettings,
    hits: SpatialGrid<CityId>,
    phase: SurfacePhase,
    /// `on_map_ready` already fired for this mount
    ready: bool,
    popup: Option<Popup>,
    on_city_click: CityClick,
    on_map_ready: MapReady,
}

impl MapSurface {
    /// `width`/`height` are in braille pixels
    pub fn new(width: usize, height: usize, basemap: Vec<LineString>) -> Self {
        let mut renderer = MapRenderer::new();
        for line in basemap {
            renderer.add_outline(line);
        }
        Self {
            registry: ZoneStyleRegistry::new(),
            viewport: Viewport::new(DEFAULT_CENTER, DEFAULT_ZOOM, width, height),
            controller: ViewportController::new(),
            scene: Scene::new(),
            renderer,
            settings: DisplaySettings::default(),
            hits: SpatialGrid::new(HIT_CELL_DEG),
            phase: SurfacePhase::Loading,
            ready: false,
            popup: None,
            on_city_click: Box::new(|_| {}),
            on_map_ready: Box::new(|| {}),
        }
    }

    pub fn on_city_click(mut self, f: impl FnMut(&CityRef) + 'static) -> Self {
        self.on_city_click = Box::new(f);
        self
    }

    pub fn on_map_ready(mut self, f: impl FnMut() + 'static) -> Self {
        self.on_map_ready = Box::new(f);
        self
    }

    pub fn is_mounted(&self) -> bool {
        self.phase == SurfacePhase::Ready
    }

    pub fn viewport(&self) -> &Viewport {
        &self.viewport
    }

    pub fn scene(&self) -> &Scene {
        &self.scene
    }

    pub fn registry(&self) -> &ZoneStyleRegistry {
        &self.registry
    }

    #[cfg(test)]
    pub fn popup(&self) -> Option<&Popup> {
        self.popup.as_ref()
    }

    /// Apply new props: mount, unmount, move the camera and reconcile entities
    pub fn sync(&mut self, props: &SurfaceProps) -> SceneDiff {
        let phase = props.phase();
        if phase != SurfacePhase::Ready {
            if self.is_mounted() {
                self.unmount();
            }
            self.phase = phase;
            return SceneDiff::default();
        }

        if !self.is_mounted() {
            self.mount(&props.view);
        }

        self.settings.show_zone_circles = props.show_zone_circles;
        self.settings.show_legend = props.show_legend;
        self.controller.sync(&props.view, &mut self.viewport);

        let diff = self
            .scene
            .sync(&props.cities, &props.routes, props.show_zone_circles, &self.registry);
        if !diff.is_empty() {
            self.rebuild_hits();
            if props.cities.is_empty() {
                tracing::info!("no cities to show");
            }
            tracing::debug!(?diff, markers = self.scene.marker_count(), "scene updated");
        }
        diff
    }

    fn mount(&mut self, view: &ViewHints) {
        let center = view.center.filter(Coord::is_valid).unwrap_or(DEFAULT_CENTER);
        let zoom = view.valid_zoom().unwrap_or(DEFAULT_ZOOM);
        self.viewport.set_view(center, zoom);
        self.controller.invalidate();
        self.phase = SurfacePhase::Ready;
        self.ready = false;
        tracing::info!(?center, zoom, "map mounted");
    }

    fn unmount(&mut self) {
        self.controller.cancel();
        self.controller.invalidate();
        self.scene.clear();
        self.hits.clear();
        self.popup = None;
        self.ready = false;
        tracing::info!("map unmounted");
    }

    fn rebuild_hits(&mut self) {
        self.hits.clear();
        for marker in self.scene.markers() {
            self.hits.insert(marker.at(), marker.id());
        }
        // close a popup whose entity went away
        let stale = match &self.popup {
            Some(Popup::City { id, .. }) => self.scene.marker(*id).is_none(),
            Some(Popup::Route { index, .. }) => self.scene.route(*index).is_none(),
            None => false,
        };
        if stale {
            self.popup = None;
        }
    }

    /// Call after each drawn frame; fires `on_map_ready` once per mount
    pub fn after_draw(&mut self) {
        if self.is_mounted() && !self.ready {
            self.ready = true;
            tracing::debug!("map ready");
            (self.on_map_ready)();
        }
    }

    /// Advance camera animation; true while still moving
    pub fn tick(&mut self) -> bool {
        self.is_mounted() && self.controller.tick(&mut self.viewport)
    }

    pub fn render(&self) -> SurfaceView {
        match &self.phase {
            SurfacePhase::Loading => SurfaceView::Loading,
            SurfacePhase::Error(msg) => SurfaceView::Error(msg.clone()),
            SurfacePhase::Ready => {
                let layers = self.renderer.render(&self.scene, &self.viewport, &self.settings);
                let legend = (self.ready && self.settings.show_legend).then(|| self.registry.legend());
                let popup = self.popup.as_ref().and_then(|p| self.place_popup(p));
                SurfaceView::Map { layers, legend, popup }
            }
        }
    }

    fn place_popup(&self, popup: &Popup) -> Option<PopupView> {
        let (px, py) = self.viewport.project(&popup.anchor());
        if !self.viewport.is_visible(px, py) {
            return None;
        }
        Some(PopupView {
            col: (px.max(0) / 2) as u16,
            row: (py.max(0) / 4) as u16,
            lines: popup.lines(),
            accent: popup.accent(),
        })
    }

    /// Handle a click at a character cell of the map area. Opens the popup
    /// of whatever was hit; returns true if something was.
    pub fn click(&mut self, col: u16, row: u16) -> bool {
        if !self.is_mounted() {
            return false;
        }
        let px = col as i32 * 2 + 1;
        let py = row as i32 * 4 + 2;

        if let Some(city) = self.marker_at(px, py) {
            if let Some(marker) = self.scene.marker(city) {
                let city = marker.city.clone();
                self.popup = Some(Popup::City {
                    id: city.id,
                    at: city.coord,
                    content: marker.popup.clone(),
                });
                tracing::debug!(id = city.id, name = %city.name, "city clicked");
                (self.on_city_click)(&city);
                return true;
            }
        }

        if let Some((index, info)) = self.route_at(px, py) {
            self.popup = Some(Popup::Route {
                index,
                at: self.viewport.unproject(px, py),
                info,
            });
            return true;
        }

        self.popup = None;
        false
    }

    fn marker_at(&self, px: i32, py: i32) -> Option<CityId> {
        let at = self.viewport.unproject(px, py);
        let edge = self.viewport.unproject(px + MARKER_HIT_PX as i32 + 1, py);
        let radius_deg = (edge.lng - at.lng).abs();

        self.hits
            .query_radius(&at, radius_deg)
            .filter_map(|(coord, id)| {
                let (x, y) = self.viewport.project(coord);
                let d = (((x - px).pow(2) + (y - py).pow(2)) as f64).sqrt();
                (d <= MARKER_HIT_PX).then_some((d, *id))
            })
            .min_by(|a, b| a.0.total_cmp(&b.0).then(a.1.cmp(&b.1)))
            .map(|(_, id)| id)
    }

    fn route_at(&self, px: i32, py: i32) -> Option<(usize, RouteInfo)> {
        let p = (px as f64, py as f64);
        self.scene
            .routes()
            .filter_map(|route| {
                let info = route.popup.clone()?;
                route.path.windows(2).any(|pair| {
                    let a = self.viewport.project(&pair[0]);
                    let b = self.viewport.project(&pair[1]);
                    segment_distance(p, a, b) <= ROUTE_HIT_PX
                })
                .then_some((route.index, info))
            })
            .next()
    }

    pub fn close_popup(&mut self) {
        self.popup = None;
    }

    /// Terminal resized; the camera hints are re-applied on next sync
    pub fn resize(&mut self, width: usize, height: usize) {
        self.viewport.resize(width, height);
        self.controller.invalidate();
    }

    pub fn pan(&mut self, dx: i32, dy: i32) {
        self.controller.cancel();
        self.viewport.pan(dx, dy);
    }

    pub fn zoom_in(&mut self) {
        self.controller.cancel();
        self.viewport.zoom_in();
    }

    pub fn zoom_out(&mut self) {
        self.controller.cancel();
        self.viewport.zoom_out();
    }

    /// Zoom keeping the character cell under the cursor fixed
    pub fn zoom_in_at(&mut self, col: u16, row: u16) {
        self.controller.cancel();
        self.viewport.zoom_in_at(col as i32 * 2, row as i32 * 4);
    }

    pub fn zoom_out_at(&mut self, col: u16, row: u16) {
        self.controller.cancel();
        self.viewport.zoom_out_at(col as i32 * 2, row as i32 * 4);
    }

    /// Back to the default view
    pub fn reset_view(&mut self) {
        self.controller.cancel();
        self.viewport.set_view(DEFAULT_CENTER, DEFAULT_ZOOM);
    }
}

/// Distance from `p` to the segment `a`-`b`, in pixels
fn segment_distance(p: (f64, f64), a: (i32, i32), b: (i32, i32)) -> f64 {
    let (ax, ay) = (a.0 as f64, a.1 as f64);
    let (bx, by) = (b.0 as f64, b.1 as f64);
    let (dx, dy) = (bx - ax, by - ay);
    let len2 = dx * dx + dy * dy;
    let t = if len2 == 0.0 {
        0.0
    } else {
        (((p.0 - ax) * dx + (p.1 - ay) * dy) / len2).clamp(0.0, 1.0)
    };
    let (cx, cy) = (ax + t * dx, ay + t * dy);
    ((p.0 - cx).powi(2) + (p.1 - cy).powi(2)).sqrt()
}
