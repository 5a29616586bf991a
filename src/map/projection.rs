use crate::geo::{mercator_lat, mercator_x, mercator_y, Bounds, Coord, MERCATOR_MAX_LAT};

pub const MIN_ZOOM: f64 = 0.5;
pub const MAX_ZOOM: f64 = 4096.0;

/// Viewport representing the visible map area and zoom level.
/// At zoom 1 the whole world spans the canvas width once.
#[derive(Clone, Debug, PartialEq)]
pub struct Viewport {
    pub center: Coord,
    /// Zoom level (higher = more zoomed in)
    pub zoom: f64,
    /// Canvas pixel width
    pub width: usize,
    /// Canvas pixel height
    pub height: usize,
}

impl Viewport {
    pub fn new(center: Coord, zoom: f64, width: usize, height: usize) -> Self {
        Self {
            center,
            zoom: zoom.clamp(MIN_ZOOM, MAX_ZOOM),
            width,
            height,
        }
    }

    pub fn resize(&mut self, width: usize, height: usize) {
        self.width = width;
        self.height = height;
    }

    /// Pixels per normalized Mercator unit
    #[inline(always)]
    fn scale(&self) -> f64 {
        self.zoom * self.width.max(1) as f64
    }

    /// Jump to a center and zoom
    pub fn set_view(&mut self, center: Coord, zoom: f64) {
        self.center = Coord::new(center.lat.clamp(-MERCATOR_MAX_LAT, MERCATOR_MAX_LAT), wrap_lng(center.lng));
        self.zoom = zoom.clamp(MIN_ZOOM, MAX_ZOOM);
    }

    /// Choose center and zoom so `bounds` exactly fills the viewport inset by `padding` pixels
    pub fn fit_bounds(&mut self, bounds: &Bounds, padding: usize) {
        let center = bounds.center();
        if self.width == 0 || self.height == 0 {
            self.set_view(center, self.zoom);
            return;
        }

        let avail_w = self.width.saturating_sub(2 * padding).max(1) as f64;
        let avail_h = self.height.saturating_sub(2 * padding).max(1) as f64;
        let span_x = mercator_x(bounds.east) - mercator_x(bounds.west);
        let span_y = mercator_y(bounds.south) - mercator_y(bounds.north);

        let fit_x = if span_x > 0.0 { avail_w / span_x } else { f64::INFINITY };
        let fit_y = if span_y > 0.0 { avail_h / span_y } else { f64::INFINITY };
        let scale = fit_x.min(fit_y);

        let zoom = if scale.is_finite() {
            scale / self.width as f64
        } else {
            MAX_ZOOM
        };
        self.set_view(center, zoom);
    }

    /// Pan the viewport by pixel delta
    pub fn pan(&mut self, dx: i32, dy: i32) {
        let scale = self.scale();
        let x = mercator_x(self.center.lng) + dx as f64 / scale;
        let y = (mercator_y(self.center.lat) + dy as f64 / scale).clamp(0.0, 1.0);
        self.set_view(Coord::new(mercator_lat(y), x * 360.0 - 180.0), self.zoom);
    }

    /// Zoom in by a factor
    pub fn zoom_in(&mut self) {
        self.zoom = (self.zoom * 1.5).min(MAX_ZOOM);
    }

    /// Zoom out by a factor
    pub fn zoom_out(&mut self) {
        self.zoom = (self.zoom / 1.5).max(MIN_ZOOM);
    }

    /// Zoom in towards a specific pixel location
    pub fn zoom_in_at(&mut self, px: i32, py: i32) {
        self.zoom_at(px, py, 1.5);
    }

    /// Zoom out from a specific pixel location
    pub fn zoom_out_at(&mut self, px: i32, py: i32) {
        self.zoom_at(px, py, 1.0 / 1.5);
    }

    /// Zoom by factor keeping the point under (px, py) fixed
    fn zoom_at(&mut self, px: i32, py: i32, factor: f64) {
        let anchor = self.unproject(px, py);
        self.zoom = (self.zoom * factor).clamp(MIN_ZOOM, MAX_ZOOM);
        let (new_px, new_py) = self.project(&anchor);
        self.pan(new_px - px, new_py - py);
    }

    /// Unproject pixel coordinates back to a geographic coordinate
    pub fn unproject(&self, px: i32, py: i32) -> Coord {
        let scale = self.scale();
        let x = (px as f64 - self.width as f64 / 2.0) / scale + mercator_x(self.center.lng);
        let y = (py as f64 - self.height as f64 / 2.0) / scale + mercator_y(self.center.lat);
        Coord::new(mercator_lat(y), x * 360.0 - 180.0)
    }

    /// Project a geographic coordinate to pixel coordinates (Web Mercator)
    pub fn project(&self, c: &Coord) -> (i32, i32) {
        let (x, y) = self.project_f(c);
        (x.round() as i32, y.round() as i32)
    }

    fn project_f(&self, c: &Coord) -> (f64, f64) {
        let scale = self.scale();
        let px = (mercator_x(c.lng) - mercator_x(self.center.lng)) * scale + self.width as f64 / 2.0;
        let py = (mercator_y(c.lat) - mercator_y(self.center.lat)) * scale + self.height as f64 / 2.0;
        (px, py)
    }

    /// Length in pixels of `meters` measured northward from `at`
    pub fn meters_to_pixels(&self, at: &Coord, meters: f64) -> f64 {
        let (_, y0) = self.project_f(at);
        let (_, y1) = self.project_f(&at.offset_north(meters));
        (y0 - y1).abs()
    }

    /// Check if a projected point is visible in the viewport
    pub fn is_visible(&self, px: i32, py: i32) -> bool {
        px >= -10 && px < self.width as i32 + 10 && py >= -10 && py < self.height as i32 + 10
    }

    /// Check if a line segment might be visible (rough bounding box check)
    pub fn line_might_be_visible(&self, p1: (i32, i32), p2: (i32, i32)) -> bool {
        let min_x = p1.0.min(p2.0);
        let max_x = p1.0.max(p2.0);
        let min_y = p1.1.min(p2.1);
        let max_y = p1.1.max(p2.1);

        max_x >= 0 && min_x < self.width as i32 && max_y >= 0 && min_y < self.height as i32
    }
}

fn wrap_lng(lng: f64) -> f64 {
    if lng > 180.0 {
        lng - 360.0
    } else if lng < -180.0 {
        lng + 360.0
    } else {
        lng
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_project_center() {
        let vp = Viewport::new(Coord::new(0.0, 0.0), 1.0, 100, 100);
        assert_eq!(vp.project(&Coord::new(0.0, 0.0)), (50, 50));
    }

    #[test]
    fn test_unproject_inverts_project() {
        let vp = Viewport::new(Coord::new(20.59, 78.96), 8.0, 200, 120);
        let delhi = Coord::new(28.6, 77.2);
        let (px, py) = vp.project(&delhi);
        let back = vp.unproject(px, py);
        assert!((back.lat - delhi.lat).abs() < 0.2);
        assert!((back.lng - delhi.lng).abs() < 0.2);
    }

    #[test]
    fn test_pan() {
        let mut vp = Viewport::new(Coord::new(0.0, 0.0), 1.0, 100, 100);
        vp.pan(10, 0);
        assert!(vp.center.lng > 0.0);
        vp.pan(0, -10);
        assert!(vp.center.lat > 0.0);
    }

    #[test]
    fn test_fit_bounds_contains_both_points_inside_padding() {
        let mut vp = Viewport::new(Coord::new(0.0, 0.0), 1.0, 160, 96);
        let a = Coord::new(19.07, 72.87);
        let b = Coord::new(28.6, 77.2);
        let bounds = Bounds::covering(&[a, b]).unwrap();
        vp.fit_bounds(&bounds, 6);

        for p in [a, b] {
            let (x, y) = vp.project(&p);
            assert!((5..=155).contains(&x), "x={x}");
            assert!((5..=91).contains(&y), "y={y}");
        }
        // One axis is tight against the padding
        let (ax, ay) = vp.project(&a);
        let (bx, by) = vp.project(&b);
        let tight_x = (bx - ax).abs() >= 160 - 12 - 2;
        let tight_y = (ay - by).abs() >= 96 - 12 - 2;
        assert!(tight_x || tight_y);
    }

    #[test]
    fn test_fit_bounds_single_point_clamps_zoom() {
        let mut vp = Viewport::new(Coord::new(0.0, 0.0), 1.0, 100, 100);
        let p = Coord::new(10.0, 10.0);
        vp.fit_bounds(&Bounds::covering(&[p, p]).unwrap(), 6);
        assert_eq!(vp.zoom, MAX_ZOOM);
        assert_eq!(vp.project(&p), (50, 50));
    }

    #[test]
    fn test_meters_to_pixels_grows_with_zoom() {
        let at = Coord::new(19.07, 72.87);
        let near = Viewport::new(at, 64.0, 200, 100);
        let far = Viewport::new(at, 8.0, 200, 100);
        assert!(near.meters_to_pixels(&at, 25_000.0) > far.meters_to_pixels(&at, 25_000.0));
    }
}
