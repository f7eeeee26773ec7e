mod models;
mod handlers;
mod routes;
mod docs;
mod websocket;
mod config;
mod execution;
mod utils;
mod ws;

use axum::http::{HeaderValue, Method};
use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;
use routes::create_api_routes;
use docs::ApiDoc;
use config::Config;
use execution::dispatcher::ExecutionDispatcher;
use execution::piston::PistonError;
use ws::hub::RoomHub;
use tracing::{debug, info, error, warn};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};
use std::panic;
use std::sync::Arc;

/// Shared state handed to every handler
pub struct AppState {
    pub hub: Arc<RoomHub>,
    pub dispatcher: Arc<ExecutionDispatcher>,
}

impl AppState {
    pub fn from_config(config: &Config) -> Result<Self, PistonError> {
        Ok(Self {
            hub: Arc::new(RoomHub::new()),
            dispatcher: Arc::new(ExecutionDispatcher::from_config(config)?),
        })
    }
}

fn cors_layer(config: &Config) -> CorsLayer {
    let origins: Vec<HeaderValue> = config
        .cors_origin_list()
        .into_iter()
        .filter_map(|origin| match origin.parse::<HeaderValue>() {
            Ok(value) => Some(value),
            Err(_) => {
                warn!("Ignoring invalid CORS origin: {}", origin);
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([axum::http::header::CONTENT_TYPE])
        .allow_credentials(true)
}

#[tokio::main]
async fn main() {

    // Set panic hook for better error messages
    panic::set_hook(Box::new(|info| {
        eprintln!("PANIC: {info}");
    }));

    // Load configuration before tracing so its log level can seed the filter
    let loaded = Config::load();
    let config = loaded.as_ref().cloned().unwrap_or_default();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| config.default_log_filter().into()))
        .init();

    info!("Starting server...");

    match &loaded {
        Ok(_) => info!("✅ Configuration loaded successfully"),
        Err(e) => {
            error!("Failed to load configuration: {}", e);
            warn!("Using default configuration");
        }
    }

    let state = match AppState::from_config(&config) {
        Ok(state) => Arc::new(state),
        Err(e) => {
            error!("Failed to initialize execution dispatcher: {}", e);
            std::process::exit(1);
        }
    };
    info!("Remote execution service: {}", config.piston_url);
    info!("Local runner: {} (workspaces under {})", config.cpp_compiler, config.workspace_root().display());

    if config.is_development() {
        debug!("Configuration: {:?}", config);
    }

    let mut app_routes = Router::new().merge(create_api_routes(state));
    if !config.is_production() {
        // Mount Swagger UI
        app_routes = app_routes.merge(SwaggerUi::new("/swagger").url("/api-docs/openapi.json", ApiDoc::openapi()));
        info!("📚 Swagger UI available at {}/swagger", config.public_url());
    }
    let app_routes = app_routes
        .layer(cors_layer(&config))
        // Add tracing layer
        .layer(TraceLayer::new_for_http());

    let listener = tokio::net::TcpListener::bind(config.server_address())
        .await
        .unwrap_or_else(|_| panic!("Failed to bind to {}", config.server_address()));

    info!("🚀 Server running on {}", config.public_url());
    info!("📡 WebSocket available at ws://{}/ws", config.server_address());

    if let Err(e) = axum::serve(listener, app_routes).await {
        error!("Server error: {}", e);
    }
}
