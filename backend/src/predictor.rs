//! Capability seam between route handlers and prediction backends.
//!
//! Handlers only see `Arc<dyn Predictor>`; whether a call lands in an ONNX
//! graph or in a built-in heuristic is decided once, at startup.

use std::sync::Arc;

use crate::models::{
    CropConditions, CropRecord, PestRecord, PestSample, YieldEstimate, YieldFeatures,
};

/// A loaded model, read-only once constructed.
///
/// Implementations must be safe to call from several actix workers at once.
pub trait Predictor: Send + Sync {
    type Input;
    type Output;

    fn predict(&self, input: &Self::Input) -> anyhow::Result<Self::Output>;
}

pub type SharedPredictor<I, O> = Arc<dyn Predictor<Input = I, Output = O>>;

pub type YieldPredictor = SharedPredictor<YieldFeatures, YieldEstimate>;
pub type CropRecommender = SharedPredictor<CropConditions, CropRecord>;
pub type PestIdentifier = SharedPredictor<PestSample, PestRecord>;
