//! Core data models for food healthiness scoring

use serde::{Deserialize, Deserializer, Serialize};
use std::collections::HashMap;

/// Number of features both models were trained on
pub const NUM_FEATURES: usize = 9;

/// Stable feature labels in canonical vector order
pub const FEATURE_NAMES: [&str; NUM_FEATURES] = [
    "energy_kcal",
    "fat",
    "sugars",
    "salt",
    "fiber",
    "proteins",
    "bad_ingredient_count",
    "additive_count",
    "ingredient_count",
];

/// Human-readable feature labels in canonical vector order
pub const FEATURE_DISPLAY_NAMES: [&str; NUM_FEATURES] = [
    "Energy (kcal per 100g)",
    "Fat (g per 100g)",
    "Sugars (g per 100g)",
    "Salt (g per 100g)",
    "Fiber (g per 100g)",
    "Proteins (g per 100g)",
    "Bad Ingredient Count",
    "Additives Count",
    "Ingredients Length",
];

/// Product record as returned by OpenFoodFacts
///
/// Every field is optional. Absent values read as zero or empty.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProductRecord {
    #[serde(default)]
    pub product_name: Option<String>,
    #[serde(default)]
    pub image_url: Option<String>,
    /// Nutrient values keyed like `fat_100g`; numbers or numeric strings
    #[serde(default, deserialize_with = "null_as_default")]
    pub nutriments: HashMap<String, serde_json::Value>,
    #[serde(default)]
    pub ingredients_text: Option<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub additives_tags: Vec<String>,
}

/// Explicit `null` reads the same as a missing key
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

impl ProductRecord {
    /// Per-100g value for a nutrient
    ///
    /// Absent, non-numeric and non-finite values read as 0; negatives clamp to 0.
    pub fn nutrient_per_100g(&self, nutrient: &str) -> f32 {
        let key = format!("{}_100g", nutrient);
        let value = match self.nutriments.get(&key) {
            Some(serde_json::Value::Number(n)) => n.as_f64().map(|v| v as f32),
            Some(serde_json::Value::String(s)) => s.trim().parse::<f32>().ok(),
            _ => None,
        };
        match value {
            Some(v) if v.is_finite() => v.max(0.0),
            _ => 0.0,
        }
    }

    pub fn display_name(&self) -> &str {
        match self.product_name.as_deref() {
            Some(name) if !name.is_empty() => name,
            _ => "Unknown Product",
        }
    }

    pub fn ingredients(&self) -> &str {
        self.ingredients_text.as_deref().unwrap_or("")
    }
}

/// Feature vector for ML inference
///
/// Field order is the order both models were trained on.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FeatureVector {
    pub energy_kcal: f32,
    pub fat: f32,
    pub sugars: f32,
    pub salt: f32,
    pub fiber: f32,
    pub proteins: f32,
    pub bad_ingredient_count: f32,
    pub additive_count: f32,
    pub ingredient_count: f32,
}

impl FeatureVector {
    pub fn from_array(values: [f32; NUM_FEATURES]) -> Self {
        Self {
            energy_kcal: values[0],
            fat: values[1],
            sugars: values[2],
            salt: values[3],
            fiber: values[4],
            proteins: values[5],
            bad_ingredient_count: values[6],
            additive_count: values[7],
            ingredient_count: values[8],
        }
    }

    pub fn to_array(&self) -> [f32; NUM_FEATURES] {
        [
            self.energy_kcal,
            self.fat,
            self.sugars,
            self.salt,
            self.fiber,
            self.proteins,
            self.bad_ingredient_count,
            self.additive_count,
            self.ingredient_count,
        ]
    }

    /// Sum of the six raw nutrient values
    pub fn nutrient_sum(&self) -> f32 {
        self.to_array()[..6].iter().sum()
    }

    /// (name, value) pairs in canonical order
    pub fn named(&self) -> Vec<NamedFeature> {
        FEATURE_NAMES
            .iter()
            .zip(FEATURE_DISPLAY_NAMES.iter())
            .zip(self.to_array())
            .map(|((name, display_name), value)| NamedFeature {
                name: name.to_string(),
                display_name: display_name.to_string(),
                value,
            })
            .collect()
    }
}

/// A feature value with its labels
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NamedFeature {
    pub name: String,
    pub display_name: String,
    pub value: f32,
}

/// Output of the two models for one feature vector
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictionResult {
    pub health_label: String,
    pub nutri_score: f32,
    /// Probability of the predicted label, when the classifier exposes one
    #[serde(skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f32>,
}

/// Manual nutrition form submission
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ManualInput {
    pub energy: f32,
    pub fat: f32,
    pub sugar: f32,
    pub salt: f32,
    pub fiber: f32,
    pub protein: f32,
    pub bad_ingredients: u32,
    pub additives: u32,
    pub ingredients_len: u32,
}

impl Default for ManualInput {
    fn default() -> Self {
        Self {
            energy: 500.0,
            fat: 10.0,
            sugar: 5.0,
            salt: 0.5,
            fiber: 2.5,
            protein: 5.0,
            bad_ingredients: 1,
            additives: 1,
            ingredients_len: 10,
        }
    }
}

impl ManualInput {
    /// Check values against the form's accepted ranges
    pub fn validate(&self) -> crate::Result<()> {
        let nutrients = [
            ("energy", self.energy, 3000.0),
            ("fat", self.fat, 100.0),
            ("sugar", self.sugar, 100.0),
            ("salt", self.salt, 10.0),
            ("fiber", self.fiber, 20.0),
            ("protein", self.protein, 50.0),
        ];
        for (name, value, max) in nutrients {
            if !value.is_finite() || !(0.0..=max).contains(&value) {
                return Err(crate::ScoreError::InvalidInput(format!(
                    "{} must be between 0 and {}, got {}",
                    name, max, value
                )));
            }
        }

        let counts = [
            ("bad_ingredients", self.bad_ingredients, 10),
            ("additives", self.additives, 10),
            ("ingredients_len", self.ingredients_len, 100),
        ];
        for (name, value, max) in counts {
            if value > max {
                return Err(crate::ScoreError::InvalidInput(format!(
                    "{} must be between 0 and {}, got {}",
                    name, max, value
                )));
            }
        }
        Ok(())
    }
}

/// Where the features for a request come from
#[derive(Debug, Clone)]
pub enum InputSource {
    Product(ProductRecord),
    Manual(ManualInput),
}

/// How the ingredient count is derived from the ingredients text
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IngredientCountPolicy {
    /// Count comma-separated segments as-is, so empty text counts as 1
    #[default]
    LiteralSplit,
    /// Count only segments that are non-empty after trimming
    NonEmptySegments,
}

/// Non-fatal data quality observations
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DataWarning {
    /// All six nutrient values are zero; the prediction may be inaccurate
    MissingNutrients,
}

impl DataWarning {
    pub fn message(&self) -> &'static str {
        match self {
            DataWarning::MissingNutrients => {
                "Product has missing nutrition info. Prediction may be inaccurate."
            }
        }
    }
}

/// Features extracted from one input plus any data quality warnings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Extraction {
    pub features: FeatureVector,
    pub warnings: Vec<DataWarning>,
}

impl Extraction {
    pub fn has_missing_nutrients(&self) -> bool {
        self.warnings.contains(&DataWarning::MissingNutrients)
    }
}
