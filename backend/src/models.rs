use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::envelope;

pub const DEFAULT_AREA_HECTARES: f64 = 1.0;
pub const DEFAULT_PLANT_TYPE: &str = "general";

// Fallbacks when location_data does not carry a climate reading
const DEFAULT_TEMPERATURE: f64 = 25.0;
const DEFAULT_HUMIDITY: f64 = 65.0;
const DEFAULT_RAINFALL: f64 = 800.0;

/// Rounds half away from zero to two decimals.
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

pub fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct SoilData {
    pub nitrogen: f64,
    pub phosphorus: f64,
    pub potassium: f64,
    pub ph: f64,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct WeatherData {
    pub temperature: f64,
    pub rainfall: f64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct YieldRequest {
    pub soil_data: SoilData,
    pub weather_data: WeatherData,
    pub crop_type: String,
    #[serde(default)]
    pub area: Option<f64>,
}

impl YieldRequest {
    pub fn area_hectares(&self) -> f64 {
        self.area.unwrap_or(DEFAULT_AREA_HECTARES)
    }

    pub fn features(&self) -> YieldFeatures {
        YieldFeatures {
            soil: self.soil_data.clone(),
            weather: self.weather_data.clone(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct RecommendRequest {
    pub soil_data: SoilData,
    /// Free-form; only numeric climate readings are picked out of it.
    pub location_data: Value,
    #[serde(default)]
    pub preferences: Option<serde_json::Value>,
}

impl RecommendRequest {
    pub fn conditions(&self) -> CropConditions {
        CropConditions {
            soil: self.soil_data.clone(),
            location: self.location_data.clone(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct PestRequest {
    pub image_data: String,
    #[serde(default)]
    pub plant_type: Option<String>,
}

impl PestRequest {
    pub fn sample(self) -> PestSample {
        PestSample {
            image_data: self.image_data,
            plant_type: self
                .plant_type
                .unwrap_or_else(|| DEFAULT_PLANT_TYPE.to_string()),
        }
    }
}

/// Yield predictor input.
#[derive(Debug, Clone, PartialEq)]
pub struct YieldFeatures {
    pub soil: SoilData,
    pub weather: WeatherData,
}

impl YieldFeatures {
    /// Single tabular row in model column order.
    pub fn to_array(&self) -> [f32; 6] {
        [
            self.soil.nitrogen as f32,
            self.soil.phosphorus as f32,
            self.soil.potassium as f32,
            self.soil.ph as f32,
            self.weather.temperature as f32,
            self.weather.rainfall as f32,
        ]
    }
}

/// Crop recommender input.
#[derive(Debug, Clone, PartialEq)]
pub struct CropConditions {
    pub soil: SoilData,
    pub location: Value,
}

impl CropConditions {
    /// Numeric `key` from `location_data`, or `default` when absent or not a number.
    fn reading(&self, key: &str, default: f64) -> f64 {
        self.location
            .get(key)
            .and_then(Value::as_f64)
            .unwrap_or(default)
    }

    /// N, P, K, temperature, humidity, pH, rainfall.
    pub fn to_array(&self) -> [f32; 7] {
        [
            self.soil.nitrogen as f32,
            self.soil.phosphorus as f32,
            self.soil.potassium as f32,
            self.reading("temperature", DEFAULT_TEMPERATURE) as f32,
            self.reading("humidity", DEFAULT_HUMIDITY) as f32,
            self.soil.ph as f32,
            self.reading("rainfall", DEFAULT_RAINFALL) as f32,
        ]
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PestSample {
    pub image_data: String,
    pub plant_type: String,
}

/// Percent deviation of each soil factor from neutral.
#[derive(Debug, Serialize, Clone, PartialEq)]
pub struct YieldFactors {
    pub nitrogen_impact: f64,
    pub phosphorus_impact: f64,
    pub potassium_impact: f64,
    pub ph_impact: f64,
}

/// Yield predictor output in tonnes per hectare.
#[derive(Debug, Clone, PartialEq)]
pub struct YieldEstimate {
    pub predicted_yield: f64,
    pub confidence: Option<u8>,
    pub factors: Option<YieldFactors>,
}

#[derive(Debug, Serialize, Clone, Copy, PartialEq, Eq)]
pub enum YieldCategory {
    High,
    Medium,
    Low,
}

impl YieldCategory {
    pub fn from_yield(tonnes_per_hectare: f64) -> Self {
        match tonnes_per_hectare {
            y if y > 5.0 => YieldCategory::High,
            y if y > 3.5 => YieldCategory::Medium,
            _ => YieldCategory::Low,
        }
    }
}

#[derive(Debug, Serialize, Clone)]
pub struct YieldResult {
    pub crop_type: String,
    pub area_hectares: f64,
    pub total_expected_yield: f64,
    pub predicted_yield: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub confidence: Option<u8>,
    pub yield_category: YieldCategory,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub factors: Option<YieldFactors>,
}

impl YieldResult {
    /// Merges the estimate with the request context.
    ///
    /// The total is computed from the rounded per-hectare figure, so
    /// `total_expected_yield == round2(predicted_yield * area_hectares)`.
    /// The category is taken from the unrounded estimate.
    pub fn new(request: &YieldRequest, estimate: YieldEstimate) -> Self {
        let area = request.area_hectares();
        let predicted_yield = round2(estimate.predicted_yield);

        YieldResult {
            crop_type: request.crop_type.clone(),
            area_hectares: area,
            total_expected_yield: round2(predicted_yield * area),
            predicted_yield,
            confidence: estimate.confidence,
            yield_category: YieldCategory::from_yield(estimate.predicted_yield),
            factors: estimate.factors,
        }
    }
}

#[derive(Debug, Serialize, Clone, PartialEq)]
pub struct OptimalConditions {
    pub nitrogen_range: [f64; 2],
    pub phosphorus_range: [f64; 2],
    pub ph_range: [f64; 2],
    pub rainfall_min: f64,
}

/// Recommended crop as returned to the caller.
#[derive(Debug, Serialize, Clone, PartialEq)]
pub struct CropRecord {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub suitability_score: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub optimal_conditions: Option<OptimalConditions>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub benefits: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub growing_season: Option<String>,
    pub calculated_score: f64,
}

#[derive(Debug, Serialize, Clone, PartialEq)]
pub struct PestRecord {
    pub name: String,
    pub confidence: u8,
    pub category: String,
    pub severity: String,
    pub description: String,
    pub symptoms: Vec<String>,
    pub treatment: Vec<String>,
    pub prevention: Vec<String>,
}

#[derive(Debug, Serialize, Clone)]
pub struct PestResult {
    pub plant_type: String,
    pub analysis_date: String,
    #[serde(flatten)]
    pub pest: PestRecord,
}

impl PestResult {
    pub fn new(plant_type: String, pest: PestRecord) -> Self {
        PestResult {
            plant_type,
            analysis_date: envelope::timestamp(),
            pest,
        }
    }
}
