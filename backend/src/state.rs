use std::sync::Arc;

use log::{info, warn};
use serde::Serialize;

use crate::config::{GatewayConfig, PredictorMode};
use crate::heuristics::{HeuristicCropRecommender, HeuristicPestIdentifier, HeuristicYieldPredictor};
use crate::inference::load_artifacts;
use crate::predictor::{CropRecommender, PestIdentifier, YieldPredictor};

/// Process-wide, read-only state shared by every worker.
///
/// A `None` predictor means its artifact failed to load; the matching route
/// stays mounted and answers with a fixed 500.
#[derive(Clone)]
pub struct AppState {
    pub yield_predictor: Option<YieldPredictor>,
    pub crop_recommender: Option<CropRecommender>,
    pub pest_identifier: PestIdentifier,
    pub port: u16,
    pub debug: bool,
}

#[derive(Debug, Serialize, Clone, Copy, PartialEq, Eq)]
pub struct ModelStatus {
    pub yield_predictor: bool,
    pub crop_recommender: bool,
    pub pest_identifier: bool,
}

impl AppState {
    pub fn new(pest_identifier: PestIdentifier) -> Self {
        Self {
            yield_predictor: None,
            crop_recommender: None,
            pest_identifier,
            port: crate::config::DEFAULT_PORT,
            debug: false,
        }
    }

    pub fn with_yield_predictor(mut self, predictor: YieldPredictor) -> Self {
        self.yield_predictor = Some(predictor);
        self
    }

    pub fn with_crop_recommender(mut self, recommender: CropRecommender) -> Self {
        self.crop_recommender = Some(recommender);
        self
    }

    pub fn with_server_info(mut self, port: u16, debug: bool) -> Self {
        self.port = port;
        self.debug = debug;
        self
    }

    /// All three predictors backed by the built-in heuristics.
    pub fn heuristic() -> Self {
        Self::new(Arc::new(HeuristicPestIdentifier::new()))
            .with_yield_predictor(Arc::new(HeuristicYieldPredictor::new()))
            .with_crop_recommender(Arc::new(HeuristicCropRecommender))
    }

    /// Builds the state for `config`, loading artifacts from disk when asked to.
    pub fn from_config(config: &GatewayConfig) -> Self {
        let state = match config.predictor_mode {
            PredictorMode::Heuristic => {
                info!("Using built-in heuristic predictors");
                Self::heuristic()
            }
            PredictorMode::Artifact => {
                info!("Loading model artifacts from {}", config.model_dir.display());
                let loaded = load_artifacts(&config.model_dir);
                let mut state = Self::new(Arc::new(HeuristicPestIdentifier::new()));
                if let Some(model) = loaded.yield_predictor {
                    state = state.with_yield_predictor(Arc::new(model));
                }
                if let Some(model) = loaded.crop_recommender {
                    state = state.with_crop_recommender(Arc::new(model));
                }
                state
            }
        };

        let status = state.model_status();
        if !status.yield_predictor || !status.crop_recommender {
            warn!("Starting with missing models: {:?}", status);
        }

        state.with_server_info(config.port, config.debug)
    }

    pub fn model_status(&self) -> ModelStatus {
        ModelStatus {
            yield_predictor: self.yield_predictor.is_some(),
            crop_recommender: self.crop_recommender.is_some(),
            pest_identifier: true,
        }
    }
}
