// Road Risk API v0.1
use axum::{
    routing::{get, post},
    Router,
};
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

mod config;
mod errors;
mod helpers;
mod routes;
mod services;

use config::AppConfig;
use routes::trips::AppState;
use services::trip::{TripServices, TripSettings};

/// Road Risk API OpenAPI document.
#[derive(OpenApi)]
#[openapi(
    info(
        title = "Road Risk API",
        version = "0.1.0",
        description = "Drive-day road risk planner. Fetches a driving route, samples \
            checkpoints at a fixed interval, looks up the yr.no forecast at each \
            checkpoint's estimated passage time together with elevation, place name \
            and daylight, and scores the driving risk per checkpoint.",
        license(name = "MIT"),
    ),
    tags(
        (name = "Health", description = "Service health check"),
        (name = "Trips", description = "Route risk analysis and exports"),
    ),
    paths(
        routes::health::health_check,
        routes::trips::analyze,
        routes::trips::analyze_csv,
        routes::trips::analyze_gpx,
    ),
    components(
        schemas(
            routes::health::HealthResponse,
            routes::trips::TripAnalysisResponse,
            routes::trips::CheckpointResult,
            services::trip::TripRequest,
            services::trip::MapView,
            services::trip::MapMarker,
            services::polyline::Coordinate,
            services::enrich::EnrichmentBundle,
            services::risk::RiskAssessment,
            services::risk::RiskTier,
            services::risk::RiskReason,
            services::table::TableRow,
            errors::ErrorResponse,
        )
    )
)]
struct ApiDoc;

#[tokio::main]
async fn main() {
    // Initialize tracing; LOG_FORMAT=json switches to structured output
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "road_risk_api=debug,tower_http=debug".into());
    let json_logs = std::env::var("LOG_FORMAT").is_ok_and(|f| f.eq_ignore_ascii_case("json"));
    if json_logs {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer())
            .init();
    }

    let config = match AppConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            tracing::error!("Invalid configuration: {}", e);
            std::process::exit(1);
        }
    };

    let services = match TripServices::from_config(&config) {
        Ok(services) => services,
        Err(e) => {
            tracing::error!("Failed to build HTTP clients: {}", e);
            std::process::exit(1);
        }
    };

    tracing::info!(
        "Checkpoint interval {} km, timezone {}, daylight lookup {}, charger search {}",
        config.checkpoint_interval_km,
        config.timezone,
        config.enable_daylight_lookup,
        config.enable_charger_search
    );

    let app_state = AppState {
        services: Arc::new(services),
        settings: Arc::new(TripSettings::from_config(&config)),
    };

    // CORS: GET for health/docs, POST for analyses
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([axum::http::Method::GET, axum::http::Method::POST])
        .allow_headers(Any)
        .expose_headers([axum::http::header::CONTENT_DISPOSITION]);

    let trip_routes = Router::new()
        .route("/api/v1/trips/analyze", post(routes::trips::analyze))
        .route("/api/v1/trips/analyze/csv", post(routes::trips::analyze_csv))
        .route("/api/v1/trips/analyze/gpx", post(routes::trips::analyze_gpx))
        .with_state(app_state);

    let app = Router::new()
        .route("/api/v1/health", get(routes::health::health_check))
        .merge(trip_routes)
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .layer(TraceLayer::new_for_http())
        .layer(cors);

    // Start server
    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    tracing::info!("API server listening on {}", addr);
    tracing::info!(
        "Swagger UI available at http://localhost:{}/swagger-ui/",
        config.port
    );

    let listener = match tokio::net::TcpListener::bind(addr).await {
        Ok(listener) => listener,
        Err(e) => {
            tracing::error!("Failed to bind {}: {}", addr, e);
            std::process::exit(1);
        }
    };
    if let Err(e) = axum::serve(listener, app).await {
        tracing::error!("Server terminated unexpectedly: {}", e);
        std::process::exit(1);
    }
}
