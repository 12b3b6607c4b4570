use std::io;

use actix_web::middleware::{DefaultHeaders, Logger};
use actix_web::{web, App, HttpServer};
use log::{error, info};

use agrocare_gateway::config::PredictorMode;
use agrocare_gateway::routes;
use agrocare_gateway::{AppState, GatewayConfig};

#[actix_web::main]
async fn main() -> io::Result<()> {
    let config = GatewayConfig::from_env();

    let default_level = config
        .as_ref()
        .map(GatewayConfig::default_log_level)
        .unwrap_or("info");
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level))
        .format_timestamp_millis()
        .format_module_path(false)
        .init();

    let config = config.map_err(|e| {
        error!("❌ Invalid configuration: {}", e);
        io::Error::new(io::ErrorKind::InvalidInput, e)
    })?;

    info!("🤖 AgroCare ML API starting...");

    let state = web::Data::new(AppState::from_config(&config));

    let bind_address = config.bind_address();
    info!("🌐 Server: http://{}", bind_address);
    info!("🔬 Debug mode: {}", config.debug);
    info!("👷 Workers: {}", config.workers);
    info!(
        "🧠 Predictors: {}",
        match config.predictor_mode {
            PredictorMode::Artifact => "model artifacts",
            PredictorMode::Heuristic => "built-in heuristics",
        }
    );
    info!("🔧 Endpoints:");
    for endpoint in routes::ENDPOINTS {
        info!("   {}", endpoint);
    }

    let origins = config.cors_origins.clone();
    let body_limit = config.max_body_bytes;

    HttpServer::new(move || {
        App::new()
            .wrap(Logger::default())
            .wrap(DefaultHeaders::new().add(("X-Content-Type-Options", "nosniff")))
            .wrap(routes::cors(&origins))
            .app_data(state.clone())
            .app_data(routes::json_config(body_limit))
            .configure(routes::configure)
    })
    .workers(config.workers)
    .bind(&bind_address)?
    .run()
    .await
}
