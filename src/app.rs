use crate::args::Args;
use crate::data::{CitySource, FetchEvent, Fetcher, RequestSeq, RequestToken, RouteSource};
use crate::error::DataError;
use crate::map::{LineString, MapSurface, SurfaceProps, ViewHints};
use crate::model::{CityRef, RouteResult, ZoneFilter};
use crate::query::{filter, Autocomplete, CityQuery};
use crate::session::{Endpoint, Resolution, RouteSession, ENDPOINT_ZOOM};
use crate::ui;
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers, MouseButton, MouseEvent, MouseEventKind};
use ratatui::layout::Rect;
use std::sync::mpsc::{self, Receiver};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// How long a status notification stays up
const TOAST_DURATION: Duration = Duration::from_secs(4);

/// Everything the event loop reacts to besides terminal input
#[derive(Debug)]
pub enum AppEvent {
    Fetch(FetchEvent),
    CityClicked(CityRef),
    MapReady,
}

impl From<FetchEvent> for AppEvent {
    fn from(event: FetchEvent) -> Self {
        AppEvent::Fetch(event)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    /// Browse and filter all cities
    Browse,
    /// Plan a route between two cities
    Route,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Focus {
    Map,
    Search,
    Start,
    Destination,
}

/// Transient status-bar notification
#[derive(Debug, Clone)]
pub struct Toast {
    pub text: String,
    pub is_error: bool,
    expires: Instant,
}

/// Application state
pub struct App {
    pub surface: MapSurface,
    fetcher: Fetcher<AppEvent>,
    events: Receiver<AppEvent>,
    /// Every city from the source, in source order
    pub cities: Vec<CityRef>,
    city_requests: RequestSeq,
    pub load_error: Option<String>,
    pub query: CityQuery,
    /// Highlighted row of the city list
    pub list_cursor: usize,
    /// City whose details the sidebar shows
    pub selected: Option<CityRef>,
    browse_view: ViewHints,
    pub mode: Mode,
    pub focus: Focus,
    pub session: RouteSession,
    pub start_input: Autocomplete,
    pub dest_input: Autocomplete,
    pub toast: Option<Toast>,
    /// The surface drew its first frame since it last mounted
    pub map_ready: bool,
    /// Inner map rectangle in terminal cells
    pub map_area: Rect,
    pub should_quit: bool,
    /// Last mouse position for drag tracking
    last_mouse: Option<(u16, u16)>,
    dragged: bool,
    dirty: bool,
}

impl App {
    pub fn new(
        width: u16,
        height: u16,
        args: &Args,
        cities: Arc<dyn CitySource>,
        routes: Arc<dyn RouteSource>,
        basemap: Vec<LineString>,
    ) -> Self {
        let (tx, events) = mpsc::channel();
        let map_area = ui::map_area(Rect::new(0, 0, width, height));

        let click_tx = tx.clone();
        let ready_tx = tx.clone();
        let mut surface = MapSurface::new(map_area.width as usize * 2, map_area.height as usize * 4, basemap)
            .on_city_click(move |city| {
                let _ = click_tx.send(AppEvent::CityClicked(city.clone()));
            })
            .on_map_ready(move || {
                let _ = ready_tx.send(AppEvent::MapReady);
            });
        surface.settings.show_zone_circles = args.zone_circles;
        surface.settings.show_legend = !args.no_legend;

        let mut app = Self {
            surface,
            fetcher: Fetcher::new(cities, routes, tx),
            events,
            cities: Vec::new(),
            city_requests: RequestSeq::new(),
            load_error: None,
            query: CityQuery {
                text: String::new(),
                zone: args.zone,
            },
            list_cursor: 0,
            selected: None,
            browse_view: ViewHints::default(),
            mode: Mode::Browse,
            focus: Focus::Map,
            session: RouteSession::new(),
            start_input: Autocomplete::new(),
            dest_input: Autocomplete::new(),
            toast: None,
            map_ready: false,
            map_area,
            should_quit: false,
            last_mouse: None,
            dragged: false,
            dirty: true,
        };
        app.reload_cities();
        app
    }

    /// Fetch the full city list; zone filtering happens locally
    pub fn reload_cities(&mut self) {
        let token = self.city_requests.issue();
        self.fetcher.fetch_cities(token, None);
        self.map_ready = false;
        self.dirty = true;
    }

    pub fn is_loading(&self) -> bool {
        self.city_requests.in_flight()
    }

    /// Cities passing the current search and zone filter
    pub fn visible_cities(&self) -> Vec<CityRef> {
        filter(&self.cities, &self.query)
    }

    pub fn props(&self) -> SurfaceProps {
        let settings = &self.surface.settings;
        let (cities, routes, view) = match self.mode {
            Mode::Browse => (self.visible_cities(), Vec::new(), self.browse_view.clone()),
            Mode::Route => (
                self.session.markers(),
                self.session.routes().to_vec(),
                self.session.view_hints(),
            ),
        };
        SurfaceProps {
            cities,
            routes,
            view,
            show_zone_circles: settings.show_zone_circles,
            show_legend: settings.show_legend,
            loading: self.is_loading() && self.cities.is_empty(),
            error: self.load_error.clone(),
        }
    }

    /// Per-frame housekeeping: drain background events, animate, expire toasts
    pub fn update(&mut self) {
        while let Ok(event) = self.events.try_recv() {
            self.handle_event(event);
        }
        if self.dirty {
            let props = self.props();
            self.surface.sync(&props);
            self.dirty = false;
        }
        self.surface.tick();
        if self.toast.as_ref().is_some_and(|t| Instant::now() >= t.expires) {
            self.toast = None;
        }
    }

    /// Call after each drawn frame
    pub fn after_draw(&mut self) {
        self.surface.after_draw();
    }

    fn handle_event(&mut self, event: AppEvent) {
        match event {
            AppEvent::Fetch(FetchEvent::Cities { token, result }) => {
                if !self.city_requests.settle(token) {
                    return;
                }
                match result {
                    Ok(cities) => {
                        tracing::info!(count = cities.len(), "cities loaded");
                        self.cities = cities.into_iter().map(Arc::new).collect();
                        self.load_error = None;
                        self.list_cursor = 0;
                    }
                    Err(e) => {
                        self.load_error = Some(format!("Failed to load cities: {e}"));
                        self.map_ready = false;
                    }
                }
                self.dirty = true;
            }
            AppEvent::Fetch(FetchEvent::Route { token, result }) => self.route_resolved(token, result),
            AppEvent::CityClicked(city) => self.city_clicked(city),
            AppEvent::MapReady => {
                tracing::info!("map ready");
                self.map_ready = true;
            }
        }
    }

    fn route_resolved(&mut self, token: RequestToken, result: Result<RouteResult, DataError>) {
        match self.session.resolve(token, result) {
            Resolution::Applied => {
                if let Some(route) = self.session.route() {
                    let verdict = if route.is_safe() {
                        "safe route found"
                    } else {
                        "route crosses high-risk areas"
                    };
                    self.notify(verdict, false);
                }
                self.dirty = true;
            }
            Resolution::Stale => {}
            Resolution::Failed(e) => {
                self.notify(format!("Route search failed: {e}"), true);
                self.dirty = true;
            }
        }
    }

    fn city_clicked(&mut self, clicked: CityRef) {
        // endpoint markers carry forced styling; keep the loaded record instead
        let Some(city) = self.cities.iter().find(|c| c.id == clicked.id).cloned() else {
            tracing::debug!(id = clicked.id, "click on a city that is no longer loaded");
            return;
        };
        match self.mode {
            Mode::Browse => {
                if let Some(pos) = self.visible_cities().iter().position(|c| c.id == city.id) {
                    self.list_cursor = pos;
                }
                self.selected = Some(city);
            }
            // fill whichever endpoint is still open
            Mode::Route => {
                let is_endpoint = [Endpoint::Start, Endpoint::Destination]
                    .into_iter()
                    .any(|which| self.session.endpoint(which).is_some_and(|c| c.id == city.id));
                if is_endpoint {
                    return;
                }
                if self.session.endpoint(Endpoint::Start).is_none() {
                    self.set_endpoint(Endpoint::Start, city);
                } else if self.session.endpoint(Endpoint::Destination).is_none() {
                    self.set_endpoint(Endpoint::Destination, city);
                }
            }
        }
    }

    pub fn notify(&mut self, text: impl Into<String>, is_error: bool) {
        let text = text.into();
        if is_error {
            tracing::warn!("{text}");
        }
        self.toast = Some(Toast {
            text,
            is_error,
            expires: Instant::now() + TOAST_DURATION,
        });
    }

    /// Update the map viewport size when the terminal resizes
    pub fn resize(&mut self, width: u16, height: u16) {
        self.map_area = ui::map_area(Rect::new(0, 0, width, height));
        self.surface
            .resize(self.map_area.width as usize * 2, self.map_area.height as usize * 4);
        self.dirty = true;
    }

    pub fn quit(&mut self) {
        self.should_quit = true;
    }

    pub fn toggle_mode(&mut self) {
        self.mode = match self.mode {
            Mode::Browse => Mode::Route,
            Mode::Route => Mode::Browse,
        };
        self.focus = Focus::Map;
        self.surface.close_popup();
        self.dirty = true;
    }

    pub fn input(&self, which: Endpoint) -> &Autocomplete {
        match which {
            Endpoint::Start => &self.start_input,
            Endpoint::Destination => &self.dest_input,
        }
    }

    fn input_mut(&mut self, which: Endpoint) -> &mut Autocomplete {
        match which {
            Endpoint::Start => &mut self.start_input,
            Endpoint::Destination => &mut self.dest_input,
        }
    }

    fn set_endpoint(&mut self, which: Endpoint, city: CityRef) {
        self.input_mut(which).commit(city.clone());
        self.session.select(which, Some(city));
        self.dirty = true;
    }

    /// Ask for a route between the two endpoints
    pub fn find_route(&mut self) {
        match self.session.request_route() {
            Ok(req) => {
                self.notify(format!("Finding safe route {} → {}", req.origin, req.destination), false);
                self.fetcher.fetch_route(req.token, req.origin, req.destination);
            }
            Err(e) => self.notify(e.to_string(), true),
        }
    }

    pub fn swap_endpoints(&mut self) {
        self.session.swap();
        std::mem::swap(&mut self.start_input, &mut self.dest_input);
        self.dirty = true;
    }

    pub fn clear_route(&mut self) {
        self.session.clear();
        self.start_input.clear();
        self.dest_input.clear();
        self.dirty = true;
    }

    pub fn cycle_zone(&mut self) {
        self.query.zone = self.query.zone.cycle();
        self.list_cursor = 0;
        self.dirty = true;
    }

    /// Center the map on the highlighted list entry
    fn show_highlighted(&mut self) {
        if let Some(city) = self.visible_cities().get(self.list_cursor).cloned() {
            self.browse_view = ViewHints::center(city.coord, ENDPOINT_ZOOM);
            self.selected = Some(city);
            self.dirty = true;
        }
    }

    pub fn handle_key(&mut self, key: KeyEvent) {
        if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('c') {
            self.quit();
            return;
        }
        match self.focus {
            Focus::Map => self.map_key(key.code),
            Focus::Search => self.search_key(key.code),
            Focus::Start => self.endpoint_key(Endpoint::Start, key.code),
            Focus::Destination => self.endpoint_key(Endpoint::Destination, key.code),
        }
    }

    fn map_key(&mut self, code: KeyCode) {
        match code {
            KeyCode::Char('q') => self.quit(),
            KeyCode::Esc => self.surface.close_popup(),

            // Pan with hjkl or arrow keys
            KeyCode::Left | KeyCode::Char('h') => self.surface.pan(-10, 0),
            KeyCode::Right | KeyCode::Char('l') => self.surface.pan(10, 0),
            KeyCode::Up | KeyCode::Char('k') => self.surface.pan(0, -6),
            KeyCode::Down | KeyCode::Char('j') => self.surface.pan(0, 6),

            // Zoom
            KeyCode::Char('+') | KeyCode::Char('=') => self.surface.zoom_in(),
            KeyCode::Char('-') | KeyCode::Char('_') => self.surface.zoom_out(),
            KeyCode::Char('0') => self.surface.reset_view(),

            // Layer toggles
            KeyCode::Char('c') => {
                self.surface.settings.toggle_zone_circles();
                self.dirty = true;
            }
            KeyCode::Char('g') => {
                self.surface.settings.toggle_legend();
                self.dirty = true;
            }
            KeyCode::Char('L') => self.surface.settings.toggle_labels(),
            KeyCode::Char('b') => self.surface.settings.toggle_basemap(),

            KeyCode::Char('m') => self.toggle_mode(),
            KeyCode::Char('R') => self.reload_cities(),
            KeyCode::Tab | KeyCode::Char('/') => {
                self.focus = match self.mode {
                    Mode::Browse => Focus::Search,
                    Mode::Route => Focus::Start,
                }
            }
            KeyCode::Char('z') if self.mode == Mode::Browse => self.cycle_zone(),
            KeyCode::Enter if self.mode == Mode::Route => self.find_route(),
            KeyCode::Char('f') if self.mode == Mode::Route => self.find_route(),
            KeyCode::Char('x') if self.mode == Mode::Route => self.swap_endpoints(),
            KeyCode::Delete | KeyCode::Backspace if self.mode == Mode::Route => self.clear_route(),
            _ => {}
        }
    }

    fn search_key(&mut self, code: KeyCode) {
        let count = self.visible_cities().len();
        match code {
            KeyCode::Esc | KeyCode::Tab => self.focus = Focus::Map,
            KeyCode::Up => self.list_cursor = self.list_cursor.saturating_sub(1),
            KeyCode::Down => self.list_cursor = (self.list_cursor + 1).min(count.saturating_sub(1)),
            KeyCode::Enter => self.show_highlighted(),
            KeyCode::Backspace => {
                self.query.text.pop();
                self.list_cursor = 0;
                self.dirty = true;
            }
            KeyCode::Char(ch) => {
                self.query.text.push(ch);
                self.list_cursor = 0;
                self.dirty = true;
            }
            _ => {}
        }
    }

    fn endpoint_key(&mut self, which: Endpoint, code: KeyCode) {
        let available = self.input(which).suggestions(&self.cities).len();
        let edited = match code {
            KeyCode::Esc => {
                self.focus = Focus::Map;
                false
            }
            KeyCode::Tab => {
                self.focus = match which {
                    Endpoint::Start => Focus::Destination,
                    Endpoint::Destination => Focus::Map,
                };
                false
            }
            KeyCode::Up => {
                self.input_mut(which).move_cursor(-1, available);
                false
            }
            KeyCode::Down => {
                self.input_mut(which).move_cursor(1, available);
                false
            }
            KeyCode::Enter => {
                let cities = std::mem::take(&mut self.cities);
                let accepted = self.input_mut(which).accept(&cities);
                self.cities = cities;
                match accepted {
                    Some(city) => {
                        self.set_endpoint(which, city);
                        self.focus = match which {
                            Endpoint::Start => Focus::Destination,
                            Endpoint::Destination => Focus::Map,
                        };
                        if which == Endpoint::Destination {
                            self.find_route();
                        }
                    }
                    // committed already: Enter asks for the route
                    None if self.input(which).committed().is_some() => self.find_route(),
                    None => {}
                }
                false
            }
            KeyCode::Backspace => self.input_mut(which).backspace(),
            KeyCode::Char(ch) => self.input_mut(which).push(ch),
            _ => false,
        };
        // editing a committed name un-selects the endpoint
        if edited {
            self.session.select(which, None);
            self.dirty = true;
        }
    }

    pub fn handle_mouse(&mut self, mouse: MouseEvent) {
        let area = self.map_area;
        let inside = mouse.column >= area.x
            && mouse.column < area.x + area.width
            && mouse.row >= area.y
            && mouse.row < area.y + area.height;
        let (col, row) = (mouse.column.saturating_sub(area.x), mouse.row.saturating_sub(area.y));

        match mouse.kind {
            // Scroll wheel for zooming towards mouse position
            MouseEventKind::ScrollUp if inside => self.surface.zoom_in_at(col, row),
            MouseEventKind::ScrollDown if inside => self.surface.zoom_out_at(col, row),
            // Horizontal scroll for panning (trackpad two-finger swipe)
            MouseEventKind::ScrollLeft => self.surface.pan(-15, 0),
            MouseEventKind::ScrollRight => self.surface.pan(15, 0),
            MouseEventKind::Down(MouseButton::Left) if inside => {
                self.focus = Focus::Map;
                self.last_mouse = Some((mouse.column, mouse.row));
                self.dragged = false;
            }
            MouseEventKind::Drag(MouseButton::Left) => self.handle_drag(mouse.column, mouse.row),
            MouseEventKind::Up(MouseButton::Left) => {
                // a press without movement is a click
                if self.last_mouse.is_some() && !self.dragged && inside {
                    self.surface.click(col, row);
                }
                self.last_mouse = None;
            }
            MouseEventKind::Down(MouseButton::Right) => self.surface.close_popup(),
            _ => {}
        }
    }

    fn handle_drag(&mut self, x: u16, y: u16) {
        if let Some((last_x, last_y)) = self.last_mouse {
            let dx = last_x as i32 - x as i32;
            let dy = last_y as i32 - y as i32;
            if dx != 0 || dy != 0 {
                self.dragged = true;
                // one cell is 2x4 braille pixels
                self.surface.pan(dx * 2, dy * 4);
            }
            self.last_mouse = Some((x, y));
        }
    }

    /// Zoom as a short string for the status bar
    pub fn zoom_level(&self) -> String {
        format!("{:.1}x", self.surface.viewport().zoom)
    }

    pub fn center_coords(&self) -> String {
        let c = self.surface.viewport().center;
        format!(
            "{:.2}°{}, {:.2}°{}",
            c.lat.abs(),
            if c.lat >= 0.0 { "N" } else { "S" },
            c.lng.abs(),
            if c.lng >= 0.0 { "E" } else { "W" }
        )
    }

    pub fn zone_filter_label(&self) -> &'static str {
        match self.query.zone {
            ZoneFilter::All => "All zones",
            ZoneFilter::Only(zone) => self.surface.registry().style(zone).label,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::DemoSource;
    use crate::model::Zone;
    use clap::Parser;

    fn app() -> App {
        let args = Args::try_parse_from(["safemap"]).unwrap();
        let source = Arc::new(DemoSource::new());
        App::new(120, 40, &args, source.clone(), source, Vec::new())
    }

    /// Pump until the pending fetches have landed
    fn settle(app: &mut App) {
        for _ in 0..500 {
            app.update();
            if !app.is_loading() && !app.session.is_loading() {
                app.update();
                return;
            }
            std::thread::sleep(Duration::from_millis(5));
        }
        panic!("fetch did not finish");
    }

    fn key(app: &mut App, code: KeyCode) {
        app.handle_key(KeyEvent::new(code, KeyModifiers::NONE));
    }

    fn type_text(app: &mut App, text: &str) {
        for ch in text.chars() {
            key(app, KeyCode::Char(ch));
        }
    }

    #[test]
    fn test_loading_then_cities() {
        let mut app = app();
        assert!(app.props().loading);
        settle(&mut app);
        assert_eq!(app.cities.len(), 15);
        assert!(!app.props().loading);
        assert_eq!(app.surface.scene().marker_count(), 15);
    }

    #[test]
    fn test_zone_cycle_filters_map() {
        let mut app = app();
        settle(&mut app);
        key(&mut app, KeyCode::Char('z'));
        app.update();
        let safe = app.cities.iter().filter(|c| c.zone == Zone::Safe).count();
        assert_eq!(app.surface.scene().marker_count(), safe);
        assert_eq!(app.zone_filter_label(), "Safe Zone");
    }

    #[test]
    fn test_search_narrows_list() {
        let mut app = app();
        settle(&mut app);
        key(&mut app, KeyCode::Char('/'));
        type_text(&mut app, "uttar");
        app.update();
        assert_eq!(app.visible_cities().len(), 3);
        key(&mut app, KeyCode::Enter);
        assert_eq!(app.selected.as_ref().unwrap().name, "Agra");
    }

    #[test]
    fn test_route_planning_flow() {
        let mut app = app();
        settle(&mut app);
        key(&mut app, KeyCode::Char('m'));
        key(&mut app, KeyCode::Tab);
        assert_eq!(app.focus, Focus::Start);

        type_text(&mut app, "mumb");
        key(&mut app, KeyCode::Enter);
        assert_eq!(app.focus, Focus::Destination);
        type_text(&mut app, "new d");
        key(&mut app, KeyCode::Enter);
        settle(&mut app);

        let route = app.session.route().unwrap();
        assert!(!route.is_safe());
        let line = app.surface.scene().route(0).unwrap();
        assert_eq!(line.color, app.surface.registry().color(Zone::HighRisk));
        assert!(line.dash.is_some());

        let markers: Vec<_> = app.surface.scene().markers().map(|m| m.city.zone).collect();
        assert_eq!(markers, vec![Zone::Safe, Zone::HighRisk]);
    }

    #[test]
    fn test_editing_endpoint_clears_route() {
        let mut app = app();
        settle(&mut app);
        key(&mut app, KeyCode::Char('m'));
        key(&mut app, KeyCode::Tab);
        type_text(&mut app, "pune");
        key(&mut app, KeyCode::Enter);
        type_text(&mut app, "goa");
        key(&mut app, KeyCode::Enter);
        settle(&mut app);
        assert!(app.session.route().is_some());

        app.focus = Focus::Start;
        key(&mut app, KeyCode::Backspace);
        assert!(app.session.route().is_none());
        assert!(app.session.endpoint(Endpoint::Start).is_none());
    }

    #[test]
    fn test_route_mode_click_on_endpoint_marker_is_ignored() {
        let mut app = app();
        settle(&mut app);
        key(&mut app, KeyCode::Char('m'));
        key(&mut app, KeyCode::Tab);
        type_text(&mut app, "mumb");
        key(&mut app, KeyCode::Enter);
        app.focus = Focus::Map;
        for _ in 0..20 {
            app.update();
        }

        let start = app.session.endpoint(Endpoint::Start).unwrap().clone();
        let (px, py) = app.surface.viewport().project(&start.coord);
        assert!(app.surface.click((px / 2) as u16, (py / 4) as u16));
        app.update();

        assert!(app.session.endpoint(Endpoint::Destination).is_none());
        let loaded = app.cities.iter().find(|c| c.name == "Mumbai").unwrap();
        assert_eq!(app.session.endpoint(Endpoint::Start).unwrap().zone, loaded.zone);
    }

    #[test]
    fn test_route_mode_click_stores_loaded_city() {
        let mut app = app();
        settle(&mut app);
        key(&mut app, KeyCode::Char('m'));
        let loaded = app.cities.iter().find(|c| c.name == "New Delhi").unwrap().clone();
        app.city_clicked(Arc::new(loaded.restyled(Zone::Safe)));

        let start = app.session.endpoint(Endpoint::Start).unwrap();
        assert!(Arc::ptr_eq(start, &loaded));
        assert_eq!(start.zone, Zone::HighRisk);
    }

    #[test]
    fn test_map_ready_tracks_mount() {
        let mut app = app();
        assert!(!app.map_ready);
        settle(&mut app);
        app.after_draw();
        app.update();
        assert!(app.map_ready);

        app.reload_cities();
        assert!(!app.map_ready);
    }

    #[test]
    fn test_route_without_endpoints_notifies() {
        let mut app = app();
        settle(&mut app);
        key(&mut app, KeyCode::Char('m'));
        key(&mut app, KeyCode::Char('f'));
        let toast = app.toast.as_ref().unwrap();
        assert!(toast.is_error);
    }
}
