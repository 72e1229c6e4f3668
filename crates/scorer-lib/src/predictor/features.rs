//! Feature extraction for ML inference
//!
//! Turns either an OpenFoodFacts product record or a manual form submission
//! into the fixed nine-feature vector. Missing nutrients are zero-filled and
//! reported as a [`DataWarning`] instead of failing.

use crate::models::{
    DataWarning, Extraction, FeatureVector, IngredientCountPolicy, InputSource, ManualInput,
    ProductRecord,
};

/// Nutrients read from the product record, in feature order
pub const NUTRIENTS: [&str; 6] = ["energy-kcal", "fat", "sugars", "salt", "fiber", "proteins"];

/// Ingredient keywords counted towards the bad ingredient feature
pub const BAD_INGREDIENTS: [&str; 6] = [
    "sugar",
    "fructose",
    "glucose",
    "syrup",
    "palm oil",
    "maltodextrin",
];

/// Extracts features from product records and manual input
#[derive(Debug, Clone, Copy, Default)]
pub struct FeatureExtractor {
    ingredient_policy: IngredientCountPolicy,
}

impl FeatureExtractor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_policy(ingredient_policy: IngredientCountPolicy) -> Self {
        Self { ingredient_policy }
    }

    pub fn extract(&self, source: &InputSource) -> Extraction {
        let features = match source {
            InputSource::Product(product) => self.from_product(product),
            InputSource::Manual(input) => from_manual(input),
        };
        let mut warnings = Vec::new();
        if features.nutrient_sum() == 0.0 {
            warnings.push(DataWarning::MissingNutrients);
        }
        Extraction { features, warnings }
    }

    pub fn from_product(&self, product: &ProductRecord) -> FeatureVector {
        let ingredients = product.ingredients();
        let n: Vec<f32> = NUTRIENTS
            .iter()
            .map(|name| product.nutrient_per_100g(name))
            .collect();

        FeatureVector {
            energy_kcal: n[0],
            fat: n[1],
            sugars: n[2],
            salt: n[3],
            fiber: n[4],
            proteins: n[5],
            bad_ingredient_count: count_bad_ingredients(ingredients) as f32,
            additive_count: product.additives_tags.len() as f32,
            ingredient_count: count_ingredients(ingredients, self.ingredient_policy) as f32,
        }
    }
}

/// Manual values are already in canonical order and pass through as given
pub fn from_manual(input: &ManualInput) -> FeatureVector {
    FeatureVector {
        energy_kcal: input.energy,
        fat: input.fat,
        sugars: input.sugar,
        salt: input.salt,
        fiber: input.fiber,
        proteins: input.protein,
        bad_ingredient_count: input.bad_ingredients as f32,
        additive_count: input.additives as f32,
        ingredient_count: input.ingredients_len as f32,
    }
}

/// Case-insensitive keyword occurrences, each keyword counted on its own
pub fn count_bad_ingredients(text: &str) -> usize {
    let lower = text.to_lowercase();
    BAD_INGREDIENTS
        .iter()
        .map(|word| lower.matches(word).count())
        .sum()
}

pub fn count_ingredients(text: &str, policy: IngredientCountPolicy) -> usize {
    match policy {
        IngredientCountPolicy::LiteralSplit => text.split(',').count(),
        IngredientCountPolicy::NonEmptySegments => text
            .split(',')
            .filter(|segment| !segment.trim().is_empty())
            .count(),
    }
}
