use std::sync::Arc;

use actix_web::http::{header, StatusCode};
use actix_web::{test, web, App};
use anyhow::bail;
use chrono::DateTime;
use serde_json::{json, Value};

use agrocare_gateway::heuristics::{
    HeuristicCropRecommender, HeuristicPestIdentifier, HeuristicYieldPredictor,
};
use agrocare_gateway::models::{round2, YieldEstimate, YieldFeatures};
use agrocare_gateway::{routes, AppState, Predictor};

const BODY_LIMIT: usize = 64 * 1024;

macro_rules! gateway {
    ($state:expr) => {
        test::init_service(
            App::new()
                .app_data(web::Data::new($state))
                .app_data(routes::json_config(BODY_LIMIT))
                .configure(routes::configure),
        )
        .await
    };
}

struct FixedYield(f64);

impl Predictor for FixedYield {
    type Input = YieldFeatures;
    type Output = YieldEstimate;

    fn predict(&self, _input: &YieldFeatures) -> anyhow::Result<YieldEstimate> {
        Ok(YieldEstimate {
            predicted_yield: self.0,
            confidence: Some(88),
            factors: None,
        })
    }
}

struct BrokenYield;

impl Predictor for BrokenYield {
    type Input = YieldFeatures;
    type Output = YieldEstimate;

    fn predict(&self, _input: &YieldFeatures) -> anyhow::Result<YieldEstimate> {
        bail!("tensor shape mismatch")
    }
}

fn seeded_state() -> AppState {
    AppState::new(Arc::new(HeuristicPestIdentifier::seeded(11)))
        .with_yield_predictor(Arc::new(HeuristicYieldPredictor::seeded(11)))
        .with_crop_recommender(Arc::new(HeuristicCropRecommender))
}

/// Artifact mode after every model failed to load.
fn unloaded_state() -> AppState {
    AppState::new(Arc::new(HeuristicPestIdentifier::seeded(11)))
}

fn wheat_body() -> Value {
    json!({
        "soil_data": {"nitrogen": 45, "phosphorus": 25, "potassium": 30, "ph": 6.8},
        "weather_data": {"temperature": 25, "rainfall": 800},
        "crop_type": "wheat",
        "area": 2.5
    })
}

fn recommend_body() -> Value {
    json!({
        "soil_data": {"nitrogen": 45, "phosphorus": 25, "potassium": 30, "ph": 6.8},
        "location_data": {"state": "Punjab", "district": "Amritsar", "rainfall": 800}
    })
}

fn assert_envelope(body: &Value, success: bool) {
    assert_eq!(body["success"], success);
    let has_message = body.get("message").is_some();
    let has_error = body.get("error").is_some();
    assert!(has_message ^ has_error, "exactly one of message/error: {}", body);
    assert_eq!(has_message, success);
    if !success {
        assert!(body.get("data").is_none());
    }
    let ts = body["timestamp"].as_str().expect("timestamp must be a string");
    assert!(DateTime::parse_from_rfc3339(ts).is_ok(), "bad timestamp {}", ts);
}

#[actix_web::test]
async fn test_health_reports_model_status() {
    let app = gateway!(unloaded_state().with_server_info(5000, true));
    let req = test::TestRequest::get().uri("/health").to_request();
    let resp = test::call_service(&app, req).await;

    assert_eq!(resp.status(), StatusCode::OK);
    let body: Value = test::read_body_json(resp).await;
    assert_envelope(&body, true);
    assert_eq!(body["data"]["port"], 5000);
    assert_eq!(body["data"]["debug"], true);
    assert_eq!(body["data"]["models"]["yield_predictor"], false);
    assert_eq!(body["data"]["models"]["crop_recommender"], false);
}

#[actix_web::test]
async fn test_index_lists_endpoints() {
    let app = gateway!(seeded_state());
    let req = test::TestRequest::get().uri("/").to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;

    assert_envelope(&body, true);
    assert_eq!(body["data"]["status"], "running");
    assert_eq!(body["data"]["endpoints"].as_array().unwrap().len(), 4);
}

#[actix_web::test]
async fn test_yield_prediction_for_wheat() {
    let app = gateway!(seeded_state());
    let req = test::TestRequest::post()
        .uri("/predict/yield")
        .set_json(wheat_body())
        .to_request();
    let resp = test::call_service(&app, req).await;

    assert_eq!(resp.status(), StatusCode::OK);
    let body: Value = test::read_body_json(resp).await;
    assert_envelope(&body, true);

    let data = &body["data"];
    assert_eq!(data["crop_type"], "wheat");
    assert_eq!(data["area_hectares"], 2.5);
    let predicted = data["predicted_yield"].as_f64().unwrap();
    let total = data["total_expected_yield"].as_f64().unwrap();
    assert_eq!(total, round2(predicted * 2.5));
    assert!(data["confidence"].is_u64());
    assert!(["High", "Medium", "Low"].contains(&data["yield_category"].as_str().unwrap()));
    assert!(data["factors"].is_object());
}

#[actix_web::test]
async fn test_yield_area_defaults_to_one() {
    let app = gateway!(seeded_state().with_yield_predictor(Arc::new(FixedYield(4.0))));
    let mut payload = wheat_body();
    payload.as_object_mut().unwrap().remove("area");

    let req = test::TestRequest::post()
        .uri("/predict/yield")
        .set_json(payload)
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;

    assert_eq!(body["data"]["area_hectares"], 1.0);
    assert_eq!(body["data"]["predicted_yield"], 4.0);
    assert_eq!(body["data"]["total_expected_yield"], 4.0);
    assert_eq!(body["data"]["yield_category"], "Medium");
    assert_eq!(body["data"]["confidence"], 88);
}

#[actix_web::test]
async fn test_missing_fields_are_all_named() {
    let app = gateway!(seeded_state());
    let req = test::TestRequest::post()
        .uri("/predict/yield")
        .set_json(json!({"crop_type": "wheat", "soil_data": null}))
        .to_request();
    let resp = test::call_service(&app, req).await;

    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let body: Value = test::read_body_json(resp).await;
    assert_envelope(&body, false);
    assert_eq!(
        body["error"],
        "Missing required fields: soil_data, weather_data"
    );
}

#[actix_web::test]
async fn test_nested_soil_fields_are_validated() {
    let app = gateway!(seeded_state());
    let req = test::TestRequest::post()
        .uri("/recommend/crop")
        .set_json(json!({
            "soil_data": {"nitrogen": 45, "phosphorus": 25},
            "location_data": {"state": "Punjab"}
        }))
        .to_request();
    let resp = test::call_service(&app, req).await;

    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(
        body["error"],
        "Soil data - Missing required fields: potassium, ph"
    );
}

#[actix_web::test]
async fn test_nested_weather_fields_are_validated() {
    let app = gateway!(seeded_state());
    let mut payload = wheat_body();
    payload["weather_data"] = json!({"humidity": 65});

    let req = test::TestRequest::post()
        .uri("/predict/yield")
        .set_json(payload)
        .to_request();
    let resp = test::call_service(&app, req).await;

    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(
        body["error"],
        "Weather data - Missing required fields: temperature, rainfall"
    );
}

#[actix_web::test]
async fn test_empty_or_non_json_body_is_rejected() {
    let app = gateway!(seeded_state());

    let req = test::TestRequest::post()
        .uri("/recommend/crop")
        .set_json(json!({}))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["error"], "No JSON data provided");

    let req = test::TestRequest::post()
        .uri("/recommend/crop")
        .insert_header((header::CONTENT_TYPE, "text/plain"))
        .set_payload("soil_data=1")
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let body: Value = test::read_body_json(resp).await;
    assert_envelope(&body, false);
    assert_eq!(body["error"], "No JSON data provided");

    let req = test::TestRequest::post()
        .uri("/recommend/crop")
        .insert_header((header::CONTENT_TYPE, "application/json"))
        .set_payload("{\"soil_data\": ")
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}

#[actix_web::test]
async fn test_oversized_body_is_rejected() {
    let app = gateway!(seeded_state());
    let req = test::TestRequest::post()
        .uri("/identify/pest")
        .set_json(json!({"image_data": "a".repeat(BODY_LIMIT * 2)}))
        .to_request();
    let resp = test::call_service(&app, req).await;

    assert_eq!(resp.status(), StatusCode::PAYLOAD_TOO_LARGE);
    let body: Value = test::read_body_json(resp).await;
    assert_envelope(&body, false);
}

#[actix_web::test]
async fn test_wrong_value_types_fail_as_server_errors() {
    let app = gateway!(seeded_state());
    let mut payload = wheat_body();
    payload["soil_data"]["nitrogen"] = json!("high");

    let req = test::TestRequest::post()
        .uri("/predict/yield")
        .set_json(payload)
        .to_request();
    let resp = test::call_service(&app, req).await;

    assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let body: Value = test::read_body_json(resp).await;
    assert!(body["error"]
        .as_str()
        .unwrap()
        .starts_with("Internal server error: "));
}

#[actix_web::test]
async fn test_predictor_failure_surfaces_cause() {
    let app = gateway!(seeded_state().with_yield_predictor(Arc::new(BrokenYield)));
    let req = test::TestRequest::post()
        .uri("/predict/yield")
        .set_json(wheat_body())
        .to_request();
    let resp = test::call_service(&app, req).await;

    assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let body: Value = test::read_body_json(resp).await;
    assert_envelope(&body, false);
    assert_eq!(body["error"], "Internal server error: tensor shape mismatch");
}

#[actix_web::test]
async fn test_unloaded_models_fail_fast_while_health_stays_up() {
    let app = gateway!(unloaded_state());

    let req = test::TestRequest::post()
        .uri("/predict/yield")
        .set_json(wheat_body())
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let body: Value = test::read_body_json(resp).await;
    assert_envelope(&body, false);
    assert_eq!(body["error"], "Yield prediction model not loaded");

    let req = test::TestRequest::post()
        .uri("/recommend/crop")
        .set_json(recommend_body())
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["error"], "Crop recommendation model not loaded");

    let req = test::TestRequest::get().uri("/health").to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
}

#[actix_web::test]
async fn test_recommendation_is_repeatable() {
    let app = gateway!(seeded_state());
    let mut scores = Vec::new();

    for _ in 0..3 {
        let req = test::TestRequest::post()
            .uri("/recommend/crop")
            .set_json(recommend_body())
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::OK);
        let body: Value = test::read_body_json(resp).await;
        assert_envelope(&body, true);
        assert_eq!(body["data"]["name"], "Wheat");
        scores.push(body["data"]["calculated_score"].as_f64().unwrap());
    }

    assert!(scores.windows(2).all(|w| w[0] == w[1]));
}

#[actix_web::test]
async fn test_pest_identification_rejects_empty_image() {
    let app = gateway!(seeded_state());
    let req = test::TestRequest::post()
        .uri("/identify/pest")
        .set_json(json!({"image_data": ""}))
        .to_request();
    let resp = test::call_service(&app, req).await;

    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let body: Value = test::read_body_json(resp).await;
    assert_envelope(&body, false);
    assert!(body["error"].as_str().unwrap().contains("image_data"));
}

#[actix_web::test]
async fn test_pest_identification_returns_record() {
    let app = gateway!(seeded_state());
    let req = test::TestRequest::post()
        .uri("/identify/pest")
        .set_json(json!({"image_data": "iVBORw0KGgo".repeat(20), "plant_type": "tomato"}))
        .to_request();
    let resp = test::call_service(&app, req).await;

    assert_eq!(resp.status(), StatusCode::OK);
    let body: Value = test::read_body_json(resp).await;
    assert_envelope(&body, true);

    let data = &body["data"];
    assert_eq!(data["plant_type"], "tomato");
    for field in [
        "name",
        "confidence",
        "category",
        "severity",
        "symptoms",
        "treatment",
        "prevention",
    ] {
        assert!(data.get(field).is_some(), "missing {}", field);
    }
}

#[actix_web::test]
async fn test_pest_plant_type_defaults_to_general() {
    let app = gateway!(seeded_state());
    let req = test::TestRequest::post()
        .uri("/identify/pest")
        .set_json(json!({"image_data": "x".repeat(100)}))
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;

    assert_eq!(body["data"]["plant_type"], "general");
}

#[actix_web::test]
async fn test_unknown_route_and_wrong_method_use_envelope() {
    let app = gateway!(seeded_state());

    let req = test::TestRequest::get().uri("/predict/price").to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    let body: Value = test::read_body_json(resp).await;
    assert_envelope(&body, false);
    assert_eq!(body["error"], "Endpoint not found");

    let req = test::TestRequest::get().uri("/predict/yield").to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::METHOD_NOT_ALLOWED);
    let body: Value = test::read_body_json(resp).await;
    assert_envelope(&body, false);
    assert_eq!(body["error"], "Method not allowed");
}

#[actix_web::test]
async fn test_options_is_answered_with_bare_ok() {
    let app = gateway!(unloaded_state());
    let req = test::TestRequest::default()
        .method(actix_web::http::Method::OPTIONS)
        .uri("/predict/yield")
        .to_request();
    let resp = test::call_service(&app, req).await;

    assert_eq!(resp.status(), StatusCode::OK);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body, json!({"status": "ok"}));
}

#[actix_web::test]
async fn test_cors_allows_listed_origins_only() {
    let origins = vec!["http://localhost:5173".to_string()];
    let app = test::init_service(
        App::new()
            .wrap(routes::cors(&origins))
            .app_data(web::Data::new(seeded_state()))
            .app_data(routes::json_config(BODY_LIMIT))
            .configure(routes::configure),
    )
    .await;

    let req = test::TestRequest::get()
        .uri("/health")
        .insert_header((header::ORIGIN, "http://localhost:5173"))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(
        resp.headers()
            .get(header::ACCESS_CONTROL_ALLOW_ORIGIN)
            .and_then(|v| v.to_str().ok()),
        Some("http://localhost:5173")
    );

    let req = test::TestRequest::default()
        .method(actix_web::http::Method::OPTIONS)
        .uri("/predict/yield")
        .insert_header((header::ORIGIN, "http://localhost:5173"))
        .insert_header((header::ACCESS_CONTROL_REQUEST_METHOD, "POST"))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);

    let req = test::TestRequest::get()
        .uri("/health")
        .insert_header((header::ORIGIN, "http://evil.example"))
        .to_request();
    let resp = test::try_call_service(&app, req).await;
    let allowed = match resp {
        Ok(resp) => resp
            .headers()
            .get(header::ACCESS_CONTROL_ALLOW_ORIGIN)
            .is_some(),
        Err(_) => false,
    };
    assert!(!allowed);
}

#[actix_web::test]
async fn test_free_form_location_data_is_accepted() {
    let app = gateway!(seeded_state());

    for location in [json!("Punjab"), json!({"rainfall": "800mm", "state": 7})] {
        let req = test::TestRequest::post()
            .uri("/recommend/crop")
            .set_json(json!({
                "soil_data": {"nitrogen": 45, "phosphorus": 25, "potassium": 30, "ph": 6.8},
                "location_data": location
            }))
            .to_request();
        let resp = test::call_service(&app, req).await;

        assert_eq!(resp.status(), StatusCode::OK);
        let body: Value = test::read_body_json(resp).await;
        assert_envelope(&body, true);
        assert_eq!(body["data"]["name"], "Wheat");
    }
}

#[actix_web::test]
async fn test_non_positive_area_is_rejected() {
    let app = gateway!(seeded_state().with_yield_predictor(Arc::new(FixedYield(4.0))));

    for area in [json!(-1), json!(0)] {
        let mut payload = wheat_body();
        payload["area"] = area;
        let req = test::TestRequest::post()
            .uri("/predict/yield")
            .set_json(payload)
            .to_request();
        let resp = test::call_service(&app, req).await;

        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        let body: Value = test::read_body_json(resp).await;
        assert_envelope(&body, false);
        assert_eq!(body["error"], "area must be a positive number");
    }
}

#[actix_web::test]
async fn test_overflowing_total_is_a_server_error() {
    let app = gateway!(seeded_state().with_yield_predictor(Arc::new(FixedYield(4.0))));
    let mut payload = wheat_body();
    payload["area"] = json!(1e308);

    let req = test::TestRequest::post()
        .uri("/predict/yield")
        .set_json(payload)
        .to_request();
    let resp = test::call_service(&app, req).await;

    assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let body: Value = test::read_body_json(resp).await;
    assert_envelope(&body, false);
    assert!(body["error"]
        .as_str()
        .unwrap()
        .starts_with("Internal server error: total expected yield overflowed"));
}

#[actix_web::test]
async fn test_root_options_and_health_head_are_answered() {
    let app = gateway!(unloaded_state());

    let req = test::TestRequest::default()
        .method(actix_web::http::Method::OPTIONS)
        .uri("/")
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body, json!({"status": "ok"}));

    let req = test::TestRequest::default()
        .method(actix_web::http::Method::HEAD)
        .uri("/health")
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
}
