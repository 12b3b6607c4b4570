//! Built-in predictors used when no trained artifact is configured.
//!
//! These are rule-of-thumb stand-ins with fixed catalogues, not agronomic
//! models. Randomized parts draw from a seedable `StdRng` so tests can pin
//! their output.

use std::sync::Mutex;

use anyhow::anyhow;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};

use crate::models::{
    round1, round2, CropConditions, CropRecord, OptimalConditions, PestRecord, PestSample,
    YieldEstimate, YieldFactors, YieldFeatures,
};
use crate::predictor::Predictor;

const BASE_YIELD: f64 = 4.5; // t/ha

pub struct CropProfile {
    pub name: &'static str,
    pub suitability_score: u32,
    pub nitrogen_range: (f64, f64),
    pub phosphorus_range: (f64, f64),
    pub ph_range: (f64, f64),
    pub rainfall_min: f64,
    pub benefits: &'static [&'static str],
    pub growing_season: &'static str,
}

impl CropProfile {
    /// 25 points per satisfied soil range plus a 25 point base.
    pub fn score(&self, conditions: &CropConditions) -> u32 {
        let soil = &conditions.soil;
        let within = |value: f64, (low, high): (f64, f64)| low <= value && value <= high;

        let matched = [
            within(soil.nitrogen, self.nitrogen_range),
            within(soil.phosphorus, self.phosphorus_range),
            within(soil.ph, self.ph_range),
        ]
        .iter()
        .filter(|hit| **hit)
        .count() as u32;

        25 * matched + 25
    }

    pub fn to_record(&self, calculated_score: f64) -> CropRecord {
        CropRecord {
            name: self.name.to_string(),
            suitability_score: Some(self.suitability_score),
            optimal_conditions: Some(OptimalConditions {
                nitrogen_range: [self.nitrogen_range.0, self.nitrogen_range.1],
                phosphorus_range: [self.phosphorus_range.0, self.phosphorus_range.1],
                ph_range: [self.ph_range.0, self.ph_range.1],
                rainfall_min: self.rainfall_min,
            }),
            benefits: self.benefits.iter().map(|b| b.to_string()).collect(),
            growing_season: Some(self.growing_season.to_string()),
            calculated_score,
        }
    }
}

pub static CROP_CATALOGUE: [CropProfile; 3] = [
    CropProfile {
        name: "Rice",
        suitability_score: 85,
        nitrogen_range: (40.0, 80.0),
        phosphorus_range: (30.0, 60.0),
        ph_range: (6.0, 7.5),
        rainfall_min: 700.0,
        benefits: &[
            "High yield potential",
            "Good market demand",
            "Suitable for clay soil",
        ],
        growing_season: "4-6 months",
    },
    CropProfile {
        name: "Wheat",
        suitability_score: 78,
        nitrogen_range: (30.0, 60.0),
        phosphorus_range: (20.0, 40.0),
        ph_range: (6.0, 7.8),
        rainfall_min: 400.0,
        benefits: &[
            "Lower water requirement",
            "Good storage life",
            "Multiple varieties",
        ],
        growing_season: "3-4 months",
    },
    CropProfile {
        name: "Cotton",
        suitability_score: 72,
        nitrogen_range: (25.0, 50.0),
        phosphorus_range: (15.0, 35.0),
        ph_range: (5.5, 8.0),
        rainfall_min: 500.0,
        benefits: &[
            "High economic value",
            "Drought tolerant",
            "Industrial demand",
        ],
        growing_season: "5-6 months",
    },
];

/// Case-insensitive catalogue lookup.
pub fn find_crop(name: &str) -> Option<&'static CropProfile> {
    CROP_CATALOGUE
        .iter()
        .find(|crop| crop.name.eq_ignore_ascii_case(name.trim()))
}

pub struct PestProfile {
    pub name: &'static str,
    pub confidence_range: (u8, u8),
    pub category: &'static str,
    pub severity: &'static str,
    pub description: &'static str,
    pub symptoms: &'static [&'static str],
    pub treatment: &'static [&'static str],
    pub prevention: &'static [&'static str],
}

impl PestProfile {
    fn to_record(&self, confidence: u8) -> PestRecord {
        let owned = |items: &[&str]| items.iter().map(|s| s.to_string()).collect();
        PestRecord {
            name: self.name.to_string(),
            confidence,
            category: self.category.to_string(),
            severity: self.severity.to_string(),
            description: self.description.to_string(),
            symptoms: owned(self.symptoms),
            treatment: owned(self.treatment),
            prevention: owned(self.prevention),
        }
    }
}

pub static PEST_CATALOGUE: [PestProfile; 3] = [
    PestProfile {
        name: "Aphids",
        confidence_range: (85, 95),
        category: "Insect",
        severity: "Medium",
        description: "Small, soft-bodied insects that feed on plant sap",
        symptoms: &["Curled leaves", "Sticky honeydew", "Yellowing"],
        treatment: &[
            "Spray with insecticidal soap",
            "Release ladybugs",
            "Use neem oil spray",
        ],
        prevention: &[
            "Regular inspection",
            "Companion planting",
            "Avoid over-fertilization",
        ],
    },
    PestProfile {
        name: "Powdery Mildew",
        confidence_range: (80, 93),
        category: "Fungal Disease",
        severity: "High",
        description: "Fungal disease causing white powdery coating on leaves",
        symptoms: &[
            "White powder on leaves",
            "Leaf distortion",
            "Premature leaf drop",
        ],
        treatment: &[
            "Apply sulfur-based fungicide",
            "Improve air circulation",
            "Remove affected leaves",
        ],
        prevention: &[
            "Proper spacing",
            "Avoid overhead watering",
            "Choose resistant varieties",
        ],
    },
    PestProfile {
        name: "Spider Mites",
        confidence_range: (75, 88),
        category: "Arachnid",
        severity: "Medium",
        description: "Tiny mites that cause stippling and webbing on leaves",
        symptoms: &["Fine webbing", "Yellow stippling", "Leaf bronzing"],
        treatment: &[
            "Increase humidity",
            "Use predatory mites",
            "Apply miticide if severe",
        ],
        prevention: &[
            "Maintain humidity",
            "Regular watering",
            "Avoid dusty conditions",
        ],
    },
];

fn locked(rng: &Mutex<StdRng>) -> anyhow::Result<std::sync::MutexGuard<'_, StdRng>> {
    rng.lock().map_err(|_| anyhow!("random source poisoned"))
}

/// Multiplicative soil/weather model with ±10% jitter.
pub struct HeuristicYieldPredictor {
    rng: Mutex<StdRng>,
}

impl HeuristicYieldPredictor {
    pub fn new() -> Self {
        Self {
            rng: Mutex::new(StdRng::from_entropy()),
        }
    }

    pub fn seeded(seed: u64) -> Self {
        Self {
            rng: Mutex::new(StdRng::seed_from_u64(seed)),
        }
    }
}

impl Default for HeuristicYieldPredictor {
    fn default() -> Self {
        Self::new()
    }
}

impl Predictor for HeuristicYieldPredictor {
    type Input = YieldFeatures;
    type Output = YieldEstimate;

    fn predict(&self, input: &YieldFeatures) -> anyhow::Result<YieldEstimate> {
        let soil = &input.soil;
        let weather = &input.weather;

        let nitrogen_factor = (soil.nitrogen / 50.0).min(1.2);
        let phosphorus_factor = (soil.phosphorus / 30.0).min(1.1);
        let potassium_factor = (soil.potassium / 40.0).min(1.1);
        let ph_factor = if (6.0..=7.5).contains(&soil.ph) { 1.0 } else { 0.9 };
        let rainfall_factor = (weather.rainfall / 800.0).min(1.3);
        let temperature_factor = if (20.0..=30.0).contains(&weather.temperature) {
            1.0
        } else {
            0.9
        };

        let (jitter, confidence) = {
            let mut rng = locked(&self.rng)?;
            (0.9 + rng.gen::<f64>() * 0.2, rng.gen_range(75..=95))
        };

        let predicted_yield = BASE_YIELD
            * nitrogen_factor
            * phosphorus_factor
            * potassium_factor
            * ph_factor
            * rainfall_factor
            * temperature_factor
            * jitter;

        Ok(YieldEstimate {
            predicted_yield: round2(predicted_yield),
            confidence: Some(confidence),
            factors: Some(YieldFactors {
                nitrogen_impact: round1((nitrogen_factor - 1.0) * 100.0),
                phosphorus_impact: round1((phosphorus_factor - 1.0) * 100.0),
                potassium_impact: round1((potassium_factor - 1.0) * 100.0),
                ph_impact: round1((ph_factor - 1.0) * 100.0),
            }),
        })
    }
}

/// Range-matching recommender over [`CROP_CATALOGUE`]. Deterministic.
#[derive(Debug, Default)]
pub struct HeuristicCropRecommender;

impl Predictor for HeuristicCropRecommender {
    type Input = CropConditions;
    type Output = CropRecord;

    fn predict(&self, input: &CropConditions) -> anyhow::Result<CropRecord> {
        let mut best: Option<(&CropProfile, u32)> = None;
        for crop in CROP_CATALOGUE.iter() {
            let score = crop.score(input);
            // Earlier entries win ties.
            if best.map_or(true, |(_, top)| score > top) {
                best = Some((crop, score));
            }
        }

        best.map(|(crop, score)| crop.to_record(f64::from(score)))
            .ok_or_else(|| anyhow!("crop catalogue is empty"))
    }
}

/// Picks a pest from [`PEST_CATALOGUE`] at random; the image is not inspected.
pub struct HeuristicPestIdentifier {
    rng: Mutex<StdRng>,
}

impl HeuristicPestIdentifier {
    pub fn new() -> Self {
        Self {
            rng: Mutex::new(StdRng::from_entropy()),
        }
    }

    pub fn seeded(seed: u64) -> Self {
        Self {
            rng: Mutex::new(StdRng::seed_from_u64(seed)),
        }
    }
}

impl Default for HeuristicPestIdentifier {
    fn default() -> Self {
        Self::new()
    }
}

impl Predictor for HeuristicPestIdentifier {
    type Input = PestSample;
    type Output = PestRecord;

    fn predict(&self, _input: &PestSample) -> anyhow::Result<PestRecord> {
        let mut rng = locked(&self.rng)?;
        let pest = PEST_CATALOGUE
            .choose(&mut *rng)
            .ok_or_else(|| anyhow!("pest catalogue is empty"))?;
        let (low, high) = pest.confidence_range;
        let confidence = rng.gen_range(low..=high);
        Ok(pest.to_record(confidence))
    }
}
