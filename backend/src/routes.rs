//! HTTP surface: route table, handlers, CORS and JSON extraction settings.

use actix_cors::Cors;
use actix_web::error::JsonPayloadError;
use actix_web::http::{header, Method};
use actix_web::{web, HttpRequest, HttpResponse, ResponseError};
use log::{error, info, warn};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{json, Map, Value};

use crate::envelope;
use crate::error::{GatewayError, CROP_MODEL_MISSING, YIELD_MODEL_MISSING};
use crate::models::{PestRequest, PestResult, RecommendRequest, YieldRequest, YieldResult};
use crate::predictor::SharedPredictor;
use crate::state::{AppState, ModelStatus};
use crate::validation::{
    require_body, validate_image_data, validate_nested, PEST_FIELDS, RECOMMEND_FIELDS,
    SOIL_FIELDS, WEATHER_FIELDS, YIELD_FIELDS,
};

pub const ENDPOINTS: &[&str] = &[
    "POST /predict/yield - Crop yield prediction",
    "POST /recommend/crop - Crop recommendation",
    "POST /identify/pest - Pest identification",
    "GET /health - Health check",
];

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::resource("/")
            .route(web::get().to(index))
            .route(web::method(Method::OPTIONS).to(preflight))
            .default_service(web::to(method_not_allowed)),
    )
    .service(
        web::resource("/health")
            .route(web::get().to(health_check))
            .route(web::head().to(health_check))
            .route(web::method(Method::OPTIONS).to(preflight))
            .default_service(web::to(method_not_allowed)),
    )
    .service(
        web::resource("/predict/yield")
            .route(web::post().to(predict_yield))
            .route(web::method(Method::OPTIONS).to(preflight))
            .default_service(web::to(method_not_allowed)),
    )
    .service(
        web::resource("/recommend/crop")
            .route(web::post().to(recommend_crop))
            .route(web::method(Method::OPTIONS).to(preflight))
            .default_service(web::to(method_not_allowed)),
    )
    .service(
        web::resource("/identify/pest")
            .route(web::post().to(identify_pest))
            .route(web::method(Method::OPTIONS).to(preflight))
            .default_service(web::to(method_not_allowed)),
    )
    .default_service(web::to(not_found));
}

/// Only origins listed in the config may call the API from a browser.
pub fn cors(origins: &[String]) -> Cors {
    origins
        .iter()
        .fold(Cors::default(), |cors, origin| match origin.as_str() {
            "*" => cors.allow_any_origin(),
            _ => cors.allowed_origin(origin),
        })
        .allowed_methods(vec!["GET", "POST", "OPTIONS"])
        .allowed_headers(vec![header::CONTENT_TYPE, header::AUTHORIZATION])
        .supports_credentials()
        .max_age(3600)
}

/// Routes extractor failures (bad JSON, wrong content type, oversize) into the envelope.
pub fn json_config(limit: usize) -> web::JsonConfig {
    web::JsonConfig::default()
        .limit(limit)
        .error_handler(move |err, req| {
            let err = json_error(err, limit);
            warn!("Rejected {} body: {}", req.path(), err);
            err.into()
        })
}

fn json_error(err: JsonPayloadError, limit: usize) -> GatewayError {
    match err {
        JsonPayloadError::ContentType => {
            GatewayError::InvalidInput("No JSON data provided".to_string())
        }
        JsonPayloadError::Deserialize(e) if e.is_eof() => {
            GatewayError::InvalidInput("No JSON data provided".to_string())
        }
        JsonPayloadError::Overflow { .. } | JsonPayloadError::OverflowKnownLength { .. } => {
            GatewayError::PayloadTooLarge { limit }
        }
        other => GatewayError::InvalidInput(format!("Invalid JSON payload: {}", other)),
    }
}

fn log_failure(endpoint: &str, err: GatewayError) -> GatewayError {
    if err.status_code().is_server_error() {
        error!("Error in {}: {}", endpoint, err);
    } else {
        warn!("Rejected {} request: {}", endpoint, err);
    }
    err
}

/// Deserializes a validated body into its typed request.
///
/// Values of the wrong type surface here rather than in validation.
fn shape<T: DeserializeOwned>(data: Map<String, Value>) -> Result<T, GatewayError> {
    serde_json::from_value(Value::Object(data)).map_err(GatewayError::prediction)
}

/// Runs the predictor on the blocking pool so slow models do not stall workers.
async fn run_predictor<I, O>(predictor: SharedPredictor<I, O>, input: I) -> Result<O, GatewayError>
where
    I: Send + 'static,
    O: Send + 'static,
{
    web::block(move || predictor.predict(&input))
        .await
        .map_err(GatewayError::prediction)?
        .map_err(GatewayError::prediction)
}

#[derive(Serialize)]
struct ServiceInfo {
    name: &'static str,
    version: &'static str,
    status: &'static str,
    endpoints: &'static [&'static str],
}

#[derive(Serialize)]
struct HealthReport {
    server: &'static str,
    port: u16,
    debug: bool,
    models: ModelStatus,
}

pub async fn index() -> HttpResponse {
    let info = ServiceInfo {
        name: "AgroCare ML API",
        version: env!("CARGO_PKG_VERSION"),
        status: "running",
        endpoints: ENDPOINTS,
    };
    HttpResponse::Ok().json(envelope::success("AgroCare ML API", Some(info)))
}

pub async fn health_check(state: web::Data<AppState>) -> HttpResponse {
    let report = HealthReport {
        server: "actix-web",
        port: state.port,
        debug: state.debug,
        models: state.model_status(),
    };
    HttpResponse::Ok().json(envelope::success(
        "AgroCare ML API is healthy and running",
        Some(report),
    ))
}

/// Bare answer to `OPTIONS` requests that are not CORS preflights.
pub async fn preflight() -> HttpResponse {
    HttpResponse::Ok().json(json!({ "status": "ok" }))
}

pub async fn not_found(req: HttpRequest) -> Result<HttpResponse, GatewayError> {
    warn!("No route for {} {}", req.method(), req.path());
    Err(GatewayError::NotFound)
}

pub async fn method_not_allowed(req: HttpRequest) -> Result<HttpResponse, GatewayError> {
    warn!("{} not allowed on {}", req.method(), req.path());
    Err(GatewayError::MethodNotAllowed)
}

pub async fn predict_yield(
    state: web::Data<AppState>,
    body: web::Json<Value>,
) -> Result<HttpResponse, GatewayError> {
    yield_prediction(&state, body.into_inner())
        .await
        .map_err(|e| log_failure("/predict/yield", e))
}

async fn yield_prediction(state: &AppState, body: Value) -> Result<HttpResponse, GatewayError> {
    let data = require_body(body, YIELD_FIELDS)?;
    validate_nested(&data, "soil_data", SOIL_FIELDS, "Soil data")?;
    validate_nested(&data, "weather_data", WEATHER_FIELDS, "Weather data")?;

    let predictor = state
        .yield_predictor
        .clone()
        .ok_or(GatewayError::ModelUnavailable(YIELD_MODEL_MISSING))?;

    let request: YieldRequest = shape(data)?;
    let area = request.area_hectares();
    if !area.is_finite() || area <= 0.0 {
        return Err(GatewayError::InvalidInput(
            "area must be a positive number".to_string(),
        ));
    }

    let estimate = run_predictor(predictor, request.features()).await?;
    let result = YieldResult::new(&request, estimate);
    if !result.total_expected_yield.is_finite() {
        return Err(GatewayError::prediction(format!(
            "total expected yield overflowed for {} hectares",
            area
        )));
    }

    info!(
        "Yield prediction completed for {}: {} tons/hectare",
        result.crop_type, result.predicted_yield
    );
    Ok(HttpResponse::Ok().json(envelope::success(
        "Crop yield prediction completed successfully",
        Some(result),
    )))
}

pub async fn recommend_crop(
    state: web::Data<AppState>,
    body: web::Json<Value>,
) -> Result<HttpResponse, GatewayError> {
    crop_recommendation(&state, body.into_inner())
        .await
        .map_err(|e| log_failure("/recommend/crop", e))
}

async fn crop_recommendation(state: &AppState, body: Value) -> Result<HttpResponse, GatewayError> {
    let data = require_body(body, RECOMMEND_FIELDS)?;
    validate_nested(&data, "soil_data", SOIL_FIELDS, "Soil data")?;

    let recommender = state
        .crop_recommender
        .clone()
        .ok_or(GatewayError::ModelUnavailable(CROP_MODEL_MISSING))?;

    let request: RecommendRequest = shape(data)?;
    let record = run_predictor(recommender, request.conditions()).await?;

    info!(
        "Crop recommendation completed: {} with score {}",
        record.name, record.calculated_score
    );
    Ok(HttpResponse::Ok().json(envelope::success(
        "Crop recommendation completed successfully",
        Some(record),
    )))
}

pub async fn identify_pest(
    state: web::Data<AppState>,
    body: web::Json<Value>,
) -> Result<HttpResponse, GatewayError> {
    pest_identification(&state, body.into_inner())
        .await
        .map_err(|e| log_failure("/identify/pest", e))
}

async fn pest_identification(state: &AppState, body: Value) -> Result<HttpResponse, GatewayError> {
    let data = require_body(body, PEST_FIELDS)?;
    validate_image_data(&data)?;

    let request: PestRequest = shape(data)?;
    let sample = request.sample();
    let plant_type = sample.plant_type.clone();
    let pest = run_predictor(state.pest_identifier.clone(), sample).await?;

    info!(
        "Pest identification completed: {} ({}% confidence)",
        pest.name, pest.confidence
    );
    Ok(HttpResponse::Ok().json(envelope::success(
        "Pest identification completed successfully",
        Some(PestResult::new(plant_type, pest)),
    )))
}
