use crate::geo::{Bounds, Coord};
use crate::map::projection::Viewport;

/// Inset applied on every side when fitting bounds, in braille pixels
pub const FIT_PADDING_PX: usize = 6;

/// Frames a center/zoom transition takes (~200ms at 60fps)
const ANIMATION_FRAMES: u32 = 12;

/// Caller-supplied camera inputs
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ViewHints {
    pub center: Option<Coord>,
    pub zoom: Option<f64>,
    /// Takes precedence over center/zoom when it holds two or more points
    pub fit_bounds: Option<Vec<Coord>>,
}

impl ViewHints {
    pub fn center(center: Coord, zoom: f64) -> Self {
        Self {
            center: Some(center),
            zoom: Some(zoom),
            fit_bounds: None,
        }
    }

    pub fn fit(coords: Vec<Coord>) -> Self {
        Self {
            fit_bounds: Some(coords),
            ..Self::default()
        }
    }

    /// The zoom hint, if it is a usable (finite, positive) level
    pub fn valid_zoom(&self) -> Option<f64> {
        self.zoom.filter(|z| z.is_finite() && *z > 0.0)
    }
}

/// Command issued against the live viewport
#[derive(Debug, Clone, PartialEq)]
pub enum CameraCommand {
    FitBounds { bounds: Bounds, padding: usize },
    SetView { center: Coord, zoom: f64 },
}

/// In-flight center/zoom transition
#[derive(Debug, Clone)]
struct Animation {
    from: (Coord, f64),
    to: (Coord, f64),
    frame: u32,
}

/// Applies camera hints to the viewport, once per change of the
/// (center, zoom, fit_bounds) tuple
#[derive(Debug, Default)]
pub struct ViewportController {
    applied: Option<ViewHints>,
    animation: Option<Animation>,
}

impl ViewportController {
    pub fn new() -> Self {
        Self::default()
    }

    /// Apply `hints` if they differ from the last applied set
    pub fn sync(&mut self, hints: &ViewHints, viewport: &mut Viewport) -> Option<CameraCommand> {
        if self.applied.as_ref() == Some(hints) {
            return None;
        }
        self.applied = Some(hints.clone());

        let command = Self::command_for(hints, viewport)?;
        self.apply(&command, viewport);
        Some(command)
    }

    /// Resolve hints to a command without touching the viewport
    pub fn command_for(hints: &ViewHints, viewport: &Viewport) -> Option<CameraCommand> {
        if let Some(points) = hints.fit_bounds.as_ref().filter(|p| p.len() >= 2) {
            if let Some(bounds) = Bounds::covering(points) {
                return Some(CameraCommand::FitBounds {
                    bounds,
                    padding: FIT_PADDING_PX,
                });
            }
        }
        hints.center.filter(Coord::is_valid).map(|center| CameraCommand::SetView {
            center,
            zoom: hints.valid_zoom().unwrap_or(viewport.zoom),
        })
    }

    fn apply(&mut self, command: &CameraCommand, viewport: &mut Viewport) {
        match command {
            CameraCommand::FitBounds { bounds, padding } => {
                self.animation = None;
                viewport.fit_bounds(bounds, *padding);
                tracing::debug!(?bounds, zoom = viewport.zoom, "camera fit to bounds");
            }
            CameraCommand::SetView { center, zoom } => {
                tracing::debug!(?center, zoom, "camera animating to view");
                self.animation = Some(Animation {
                    from: (viewport.center, viewport.zoom),
                    to: (*center, *zoom),
                    frame: 0,
                });
            }
        }
    }

    /// Advance a pending animation by one frame; returns true while animating
    pub fn tick(&mut self, viewport: &mut Viewport) -> bool {
        let Some(anim) = self.animation.as_mut() else {
            return false;
        };
        anim.frame += 1;
        let t = (anim.frame as f64 / ANIMATION_FRAMES as f64).min(1.0);
        // ease-out cubic
        let e = 1.0 - (1.0 - t).powi(3);
        let (from_c, from_z) = anim.from;
        let (to_c, to_z) = anim.to;
        let center = Coord::new(
            from_c.lat + (to_c.lat - from_c.lat) * e,
            from_c.lng + (to_c.lng - from_c.lng) * e,
        );
        // interpolate zoom geometrically so it feels linear
        let zoom = from_z * (to_z / from_z).powf(e);
        viewport.set_view(center, zoom);

        if t >= 1.0 {
            self.animation = None;
        }
        self.animation.is_some()
    }

    #[cfg(test)]
    pub fn is_animating(&self) -> bool {
        self.animation.is_some()
    }

    /// Drop a pending animation without applying its remainder
    pub fn cancel(&mut self) {
        self.animation = None;
    }

    /// Forget the last applied hints so the next sync re-applies them
    pub fn invalidate(&mut self) {
        self.applied = None;
    }
}
