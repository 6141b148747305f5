use std::sync::Arc;

use crate::config::Config;
use crate::extraction::ExtractionGateway;
use crate::layout::{HelveticaMeasurer, LayoutConfig, PageGeometry};
use crate::render::RenderOptions;
use crate::session::UserStore;

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    /// Pluggable extraction backend. Default: LlmExtractionGateway.
    pub gateway: Arc<dyn ExtractionGateway>,
    pub users: Arc<UserStore>,
    /// Page size and margins for layout and rendering. A4 portrait.
    pub geometry: PageGeometry,
    pub layout: LayoutConfig,
    /// Measures text for both layout and rendering, so wrap points agree.
    pub measurer: Arc<HelveticaMeasurer>,
    pub render_options: RenderOptions,
}
