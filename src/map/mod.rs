mod camera;
mod entities;
mod geometry;
mod projection;
mod renderer;
mod spatial;
mod style;
mod surface;

pub use camera::ViewHints;
pub use renderer::{LineString, MapLayers};
pub use surface::{MapSurface, PopupView, SurfaceProps, SurfaceView};
