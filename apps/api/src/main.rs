mod config;
mod documents;
mod errors;
mod extraction;
mod forms;
mod layout;
mod llm_client;
mod render;
mod routes;
mod session;
mod state;

use anyhow::{Context, Result};
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::Config;
use crate::extraction::LlmExtractionGateway;
use crate::layout::{HelveticaMeasurer, LayoutConfig, PageGeometry};
use crate::llm_client::LlmClient;
use crate::render::{RenderOptions, Rgb};
use crate::routes::build_router;
use crate::session::UserStore;
use crate::state::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration first (fails on missing required env vars)
    let config = Config::from_env()?;

    // Initialize structured logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!("{}={}", env!("CARGO_CRATE_NAME"), &config.rust_log))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting FormFill API v{}", env!("CARGO_PKG_VERSION"));

    // Initialize user store
    let users = Arc::new(
        UserStore::open(config.users_db_path.clone())
            .await
            .with_context(|| format!("Failed to open user store at {}", config.users_db_path.display()))?,
    );
    info!("User store: {}", users.path().display());

    // Initialize LLM client and extraction gateway
    let llm = LlmClient::new(
        config.anthropic_api_key.clone(),
        config.anthropic_api_url.clone(),
    )?;
    info!("LLM client initialized (model: {})", llm_client::MODEL);
    let gateway = Arc::new(LlmExtractionGateway::new(llm));

    // Layout and rendering: A4, Helvetica 12pt body text
    let layout = LayoutConfig::default();
    let measurer = Arc::new(HelveticaMeasurer::new(layout.body_font_size_pt));
    let render_options = RenderOptions {
        title_color: Rgb::from_hex(&config.title_color).context("TITLE_COLOR must be #RRGGBB")?,
        ..RenderOptions::default()
    };

    let state = AppState {
        config: config.clone(),
        gateway,
        users,
        geometry: PageGeometry::a4(),
        layout,
        measurer,
        render_options,
    };

    // Build router
    let app = build_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive()); // TODO: restrict origins once the web client has a fixed host

    let addr: SocketAddr = format!("0.0.0.0:{}", config.port).parse()?;
    info!("Listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
