use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{anyhow, bail, Context};
use log::{error, info};
use serde::Deserialize;
use tract_onnx::prelude::*;

use crate::heuristics::find_crop;
use crate::models::{round2, CropConditions, CropRecord, YieldEstimate, YieldFeatures};
use crate::predictor::Predictor;

pub const YIELD_MODEL_FILE: &str = "yield_predictor.onnx";
pub const YIELD_TRANSFORM_FILE: &str = "yield_transform.json";
pub const CROP_MODEL_FILE: &str = "crop_recommender.onnx";
pub const CROP_LABELS_FILE: &str = "crop_labels.json";

type OnnxPlan = SimplePlan<TypedFact, Box<dyn TypedOp>, Graph<TypedFact, Box<dyn TypedOp>>>;

/// Loads an ONNX graph whose first input is a `[1, width]` f32 row.
fn load_plan(path: &Path, width: usize) -> anyhow::Result<OnnxPlan> {
    let plan = tract_onnx::onnx()
        .model_for_path(path)?
        .with_input_fact(
            0,
            InferenceFact::dt_shape(f32::datum_type(), tvec!(1, width)),
        )?
        .into_optimized()?
        .into_runnable()?;
    Ok(plan)
}

fn run_row(plan: &OnnxPlan, row: &[f32]) -> anyhow::Result<TVec<TValue>> {
    let input = Tensor::from_shape(&[1, row.len()], row)?;
    plan.run(tvec!(input.into()))
}

/// Maps the regressor's training-time target scale back to tonnes/hectare.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum InverseTransform {
    #[default]
    Identity,
    /// Target was `ln(y)`.
    Log,
    /// Target was `ln(1 + y)`.
    Log1p,
}

impl InverseTransform {
    pub fn apply(self, value: f64) -> f64 {
        match self {
            InverseTransform::Identity => value,
            InverseTransform::Log => value.exp(),
            InverseTransform::Log1p => value.exp_m1(),
        }
    }

    /// Reads the descriptor at `path`; a missing file means identity.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        if !path.exists() {
            return Ok(InverseTransform::Identity);
        }
        let raw = fs::read_to_string(path)
            .with_context(|| format!("reading {}", path.display()))?;
        serde_json::from_str(&raw).with_context(|| format!("parsing {}", path.display()))
    }
}

pub struct OnnxYieldPredictor {
    model: OnnxPlan,
    transform: InverseTransform,
}

impl OnnxYieldPredictor {
    pub fn load<P: AsRef<Path>>(model_path: P, transform: InverseTransform) -> anyhow::Result<Self> {
        let model_path = model_path.as_ref();
        let model = load_plan(model_path, 6)
            .with_context(|| format!("loading {}", model_path.display()))?;
        Ok(Self { model, transform })
    }
}

impl Predictor for OnnxYieldPredictor {
    type Input = YieldFeatures;
    type Output = YieldEstimate;

    fn predict(&self, input: &YieldFeatures) -> anyhow::Result<YieldEstimate> {
        let outputs = run_row(&self.model, &input.to_array())?;
        let raw: f32 = *outputs
            .first()
            .ok_or_else(|| anyhow!("model produced no outputs"))?
            .to_array_view::<f32>()?
            .iter()
            .next()
            .ok_or_else(|| anyhow!("model produced an empty output tensor"))?;

        let predicted_yield = self.transform.apply(f64::from(raw));
        if !predicted_yield.is_finite() {
            bail!("model produced a non-finite yield ({})", predicted_yield);
        }

        // Regressors carry no calibrated confidence.
        Ok(YieldEstimate {
            predicted_yield,
            confidence: None,
            factors: None,
        })
    }
}

pub struct OnnxCropRecommender {
    model: OnnxPlan,
    labels: Vec<String>,
}

impl OnnxCropRecommender {
    pub fn load<P: AsRef<Path>>(model_path: P, labels_path: P) -> anyhow::Result<Self> {
        let (model_path, labels_path) = (model_path.as_ref(), labels_path.as_ref());
        let raw = fs::read_to_string(labels_path)
            .with_context(|| format!("reading {}", labels_path.display()))?;
        let labels: Vec<String> = serde_json::from_str(&raw)
            .with_context(|| format!("parsing {}", labels_path.display()))?;
        if labels.is_empty() {
            bail!("{} lists no crop labels", labels_path.display());
        }

        let model = load_plan(model_path, 7)
            .with_context(|| format!("loading {}", model_path.display()))?;
        Ok(Self { model, labels })
    }

    /// First f32 output holding one score per label.
    fn class_scores(outputs: &TVec<TValue>) -> anyhow::Result<Vec<f32>> {
        outputs
            .iter()
            .find(|t| t.datum_type() == f32::datum_type())
            .ok_or_else(|| anyhow!("model produced no class scores"))?
            .to_array_view::<f32>()
            .map(|view| view.iter().copied().collect())
    }
}

impl Predictor for OnnxCropRecommender {
    type Input = CropConditions;
    type Output = CropRecord;

    fn predict(&self, input: &CropConditions) -> anyhow::Result<CropRecord> {
        let outputs = run_row(&self.model, &input.to_array())?;
        let scores = Self::class_scores(&outputs)?;
        if scores.len() != self.labels.len() {
            bail!(
                "model produced {} scores for {} crop labels",
                scores.len(),
                self.labels.len()
            );
        }

        let (index, score) = argmax(&scores).ok_or_else(|| anyhow!("no finite class score"))?;
        Ok(crop_record(&self.labels[index], score))
    }
}

fn argmax(scores: &[f32]) -> Option<(usize, f32)> {
    scores
        .iter()
        .copied()
        .enumerate()
        .filter(|(_, s)| s.is_finite())
        .fold(None, |best, (i, s)| match best {
            Some((_, top)) if top >= s => best,
            _ => Some((i, s)),
        })
}

/// Catalogue details when the label is known, bare name otherwise.
fn crop_record(label: &str, score: f32) -> CropRecord {
    let calculated_score = round2(f64::from(score) * 100.0);
    match find_crop(label) {
        Some(profile) => profile.to_record(calculated_score),
        None => CropRecord {
            name: label.to_string(),
            suitability_score: None,
            optimal_conditions: None,
            benefits: Vec::new(),
            growing_season: None,
            calculated_score,
        },
    }
}

/// Artifacts found under the model directory. `None` marks a failed load.
pub struct LoadedArtifacts {
    pub yield_predictor: Option<OnnxYieldPredictor>,
    pub crop_recommender: Option<OnnxCropRecommender>,
}

pub fn load_artifacts(model_dir: &Path) -> LoadedArtifacts {
    let path = |file: &str| -> PathBuf { model_dir.join(file) };

    let yield_predictor = InverseTransform::load(&path(YIELD_TRANSFORM_FILE))
        .and_then(|transform| OnnxYieldPredictor::load(path(YIELD_MODEL_FILE), transform));
    let yield_predictor = match yield_predictor {
        Ok(model) => {
            info!("✅ Yield predictor loaded from {}", model_dir.display());
            Some(model)
        }
        Err(e) => {
            error!("❌ Yield predictor unavailable: {:#}", e);
            None
        }
    };

    let crop_recommender =
        match OnnxCropRecommender::load(path(CROP_MODEL_FILE), path(CROP_LABELS_FILE)) {
            Ok(model) => {
                info!(
                    "✅ Crop recommender loaded with {} labels",
                    model.labels.len()
                );
                Some(model)
            }
            Err(e) => {
                error!("❌ Crop recommender unavailable: {:#}", e);
                None
            }
        };

    LoadedArtifacts {
        yield_predictor,
        crop_recommender,
    }
}
