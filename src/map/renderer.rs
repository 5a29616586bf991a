use crate::braille::BrailleCanvas;
use crate::geo::Coord;
use crate::map::entities::{CityMarker, RoutePolyline, Scene, ZoneCircle};
use crate::map::geometry::{draw_line, draw_ring, draw_stroke, stipple_disc, stroke_width};
use crate::map::projection::Viewport;
use ratatui::style::Color;

/// A geographic line (sequence of coordinates)
pub type LineString = Vec<Coord>;

const BASEMAP_INK: Color = Color::DarkGray;

/// Display settings for map layers
#[derive(Clone, Debug)]
pub struct DisplaySettings {
    pub show_basemap: bool,
    pub show_labels: bool,
    pub show_zone_circles: bool,
    pub show_legend: bool,
}

impl Default for DisplaySettings {
    fn default() -> Self {
        Self {
            show_basemap: true,
            show_labels: true,
            show_zone_circles: false,
            show_legend: true,
        }
    }
}

impl DisplaySettings {
    pub fn toggle_labels(&mut self) {
        self.show_labels = !self.show_labels;
    }

    pub fn toggle_basemap(&mut self) {
        self.show_basemap = !self.show_basemap;
    }

    pub fn toggle_zone_circles(&mut self) {
        self.show_zone_circles = !self.show_zone_circles;
    }

    pub fn toggle_legend(&mut self) {
        self.show_legend = !self.show_legend;
    }
}

/// Text drawn over the braille layer, in character cells
#[derive(Debug, Clone, PartialEq)]
pub struct Label {
    pub col: u16,
    pub row: u16,
    pub text: String,
    pub color: Color,
}

/// One rasterized frame of the map
pub struct MapLayers {
    pub canvas: BrailleCanvas,
    pub labels: Vec<Label>,
}

/// Rasterizes the basemap and scene entities onto a braille canvas
#[derive(Default)]
pub struct MapRenderer {
    pub basemap: Vec<LineString>,
}

impl MapRenderer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a basemap outline
    pub fn add_outline(&mut self, line: LineString) {
        if line.len() >= 2 {
            self.basemap.push(line);
        }
    }

    #[cfg(test)]
    pub fn has_data(&self) -> bool {
        !self.basemap.is_empty()
    }

    /// Render all layers back to front: basemap, zone circles, routes, markers
    pub fn render(&self, scene: &Scene, viewport: &Viewport, settings: &DisplaySettings) -> MapLayers {
        let cols = viewport.width.div_ceil(2);
        let rows = viewport.height.div_ceil(4);
        let mut canvas = BrailleCanvas::new(cols, rows);
        let mut labels = Vec::new();

        if settings.show_basemap {
            canvas.set_ink(BASEMAP_INK);
            for line in &self.basemap {
                draw_linestring(&mut canvas, line, viewport);
            }
        }

        if settings.show_zone_circles {
            for circle in scene.circles() {
                draw_zone_circle(&mut canvas, circle, viewport);
            }
        }

        for route in scene.routes() {
            draw_route(&mut canvas, route, viewport);
        }

        for marker in scene.markers() {
            if let Some(label) = draw_marker(&mut canvas, marker, viewport, settings.show_labels) {
                labels.push(label);
            }
        }

        MapLayers { canvas, labels }
    }
}

/// Draw a linestring with viewport culling
fn draw_linestring(canvas: &mut BrailleCanvas, line: &[Coord], viewport: &Viewport) {
    let mut prev: Option<(i32, i32)> = None;

    for c in line {
        let (px, py) = viewport.project(c);

        if let Some((prev_x, prev_y)) = prev {
            let dist = ((px - prev_x).abs() + (py - prev_y).abs()) as usize;
            if dist < viewport.width * 4 && viewport.line_might_be_visible((prev_x, prev_y), (px, py)) {
                draw_line(canvas, prev_x, prev_y, px, py);
            }
        }

        prev = Some((px, py));
    }
}

fn draw_zone_circle(canvas: &mut BrailleCanvas, circle: &ZoneCircle, viewport: &Viewport) {
    let (cx, cy) = viewport.project(&circle.center);
    let radius = viewport.meters_to_pixels(&circle.center, circle.radius_m).round() as i32;
    if !viewport.line_might_be_visible((cx - radius, cy - radius), (cx + radius, cy + radius)) {
        return;
    }
    canvas.set_ink(circle.color);
    stipple_disc(canvas, cx, cy, radius, circle.fill_opacity);
    for r in 0..(circle.weight as i32 / 2).max(1) {
        draw_ring(canvas, cx, cy, radius - r);
    }
}

fn draw_route(canvas: &mut BrailleCanvas, route: &RoutePolyline, viewport: &Viewport) {
    canvas.set_ink(route.color);
    let width = stroke_width(route.weight);
    let mut phase = 0;
    for pair in route.path.windows(2) {
        let a = viewport.project(&pair[0]);
        let b = viewport.project(&pair[1]);
        if viewport.line_might_be_visible(a, b) {
            draw_stroke(canvas, a, b, width, route.dash, &mut phase);
        }
    }
}

/// Stamp the zone icon and return the glyph/name label for it
fn draw_marker(canvas: &mut BrailleCanvas, marker: &CityMarker, viewport: &Viewport, with_name: bool) -> Option<Label> {
    let (px, py) = viewport.project(&marker.at());
    if !viewport.is_visible(px, py) {
        return None;
    }

    let icon = &marker.icon;
    canvas.set_ink(icon.border);
    for (dx, dy) in &icon.border_stamp {
        canvas.set_pixel_signed(px + dx, py + dy);
    }
    canvas.set_ink(icon.fill);
    for (dx, dy) in &icon.fill_stamp {
        canvas.set_pixel_signed(px + dx, py + dy);
    }

    if !with_name || px < 0 || py < 0 {
        return None;
    }
    // Collect label position (convert braille coords to char coords)
    let col = (px / 2) as u16;
    let row = (py / 4) as u16;
    col.checked_add(2).map(|col| Label {
        col,
        row,
        text: marker.city.name.clone(),
        color: icon.fill,
    })
}
