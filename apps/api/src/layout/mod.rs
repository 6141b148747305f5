// Form layout: page geometry, text measurement, and the pure pagination engine.
// Layout of a whole form is CPU-bound; handlers run it inside tokio::task::spawn_blocking.

pub mod engine;
pub mod font_metrics;
pub mod geometry;

// Re-export the public API consumed by the render module and handlers.
pub use engine::{layout_form, ImagePlacement, LayoutPage, Placement, TextPlacement, TextRole};
pub use font_metrics::{HelveticaMeasurer, TextMeasurer, TextStyle};
pub use geometry::{LayoutConfig, PageGeometry};
