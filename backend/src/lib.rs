//! AgroCare inference gateway.
//!
//! Fronts crop-yield, crop-recommendation and pest-identification predictors
//! with a validated JSON API. Every response, success or failure, uses the
//! envelope from [`envelope`].

pub mod config;
pub mod envelope;
pub mod error;
pub mod heuristics;
pub mod inference;
pub mod models;
pub mod predictor;
pub mod routes;
pub mod state;
pub mod validation;

pub use config::GatewayConfig;
pub use error::GatewayError;
pub use predictor::Predictor;
pub use state::AppState;
