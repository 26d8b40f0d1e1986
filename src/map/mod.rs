mod geometry;
mod globe;
mod projection;
mod renderer;
mod spatial;

pub use geometry::{draw_dotted_hline, draw_line};
pub use globe::GlobeViewport;
pub use projection::Viewport;
pub use renderer::{IssMarker, LineString, Lod, MapLayers, MapRenderer};
