//! Scoring commands

use anyhow::Result;
use clap::Args;
use tabled::Tabled;

use super::alternatives::print_alternatives;
use crate::client::{ApiClient, ManualRequest, ProductScore, ScoreReport};
use crate::output::{
    color_confidence, color_label, format_value, importance_bar, print_heading, print_info,
    print_json, print_table, print_warning, OutputFormat,
};

/// Nutrition values per 100g, defaults match the web form
#[derive(Debug, Clone, Args)]
pub struct ManualArgs {
    /// Energy (kcal per 100g), 0-3000
    #[arg(long, default_value_t = 500.0)]
    pub energy: f32,

    /// Fat (g), 0-100
    #[arg(long, default_value_t = 10.0)]
    pub fat: f32,

    /// Sugar (g), 0-100
    #[arg(long, default_value_t = 5.0)]
    pub sugar: f32,

    /// Salt (g), 0-10
    #[arg(long, default_value_t = 0.5)]
    pub salt: f32,

    /// Fiber (g), 0-20
    #[arg(long, default_value_t = 2.5)]
    pub fiber: f32,

    /// Protein (g), 0-50
    #[arg(long, default_value_t = 5.0)]
    pub protein: f32,

    /// Number of bad ingredients, 0-10
    #[arg(long, default_value_t = 1, value_parser = clap::value_parser!(u32).range(0..=10))]
    pub bad_ingredients: u32,

    /// Number of additives, 0-10
    #[arg(long, default_value_t = 1, value_parser = clap::value_parser!(u32).range(0..=10))]
    pub additives: u32,

    /// Ingredients length, 0-100
    #[arg(long, default_value_t = 10, value_parser = clap::value_parser!(u32).range(0..=100))]
    pub ingredients_len: u32,
}

impl From<ManualArgs> for ManualRequest {
    fn from(args: ManualArgs) -> Self {
        Self {
            energy: args.energy,
            fat: args.fat,
            sugar: args.sugar,
            salt: args.salt,
            fiber: args.fiber,
            protein: args.protein,
            bad_ingredients: args.bad_ingredients,
            additives: args.additives,
            ingredients_len: args.ingredients_len,
        }
    }
}

#[derive(Tabled)]
struct FeatureRow {
    #[tabled(rename = "Feature")]
    feature: String,
    #[tabled(rename = "Value")]
    value: String,
}

#[derive(Tabled)]
struct AttributionRow {
    #[tabled(rename = "Feature")]
    feature: String,
    #[tabled(rename = "Value")]
    value: String,
    #[tabled(rename = "Importance")]
    importance: String,
    #[tabled(rename = "")]
    bar: String,
}

/// Barcodes are digit strings; anything else would change the request path
pub fn parse_barcode(value: &str) -> Result<String, String> {
    let barcode = value.trim();
    if barcode.is_empty() || !barcode.bytes().all(|b| b.is_ascii_digit()) {
        return Err(format!("invalid barcode {:?}, expected digits only", value));
    }
    Ok(barcode.to_string())
}

/// Look up a product by barcode and show its score
pub async fn score_barcode(client: &ApiClient, barcode: &str, format: OutputFormat) -> Result<()> {
    let result: ProductScore = client.get(&format!("api/v1/products/{}", barcode)).await?;

    match format {
        OutputFormat::Json => print_json(&result)?,
        OutputFormat::Table => {
            print_info(&format!("{} ({})", result.product.name, result.barcode));
            if let Some(image_url) = &result.product.image_url {
                println!("  {}", image_url);
            }
            print_report(&result.report);
        }
    }

    Ok(())
}

/// Score manually entered nutrition values
pub async fn score_manual(client: &ApiClient, args: ManualArgs, format: OutputFormat) -> Result<()> {
    let request = ManualRequest::from(args);
    let report: ScoreReport = client.post("api/v1/score", &request).await?;

    match format {
        OutputFormat::Json => print_json(&report)?,
        OutputFormat::Table => print_report(&report),
    }

    Ok(())
}

fn print_report(report: &ScoreReport) {
    let prediction = &report.prediction;
    println!();
    println!("Health label: {}", color_label(&prediction.health_label));
    println!("NutriScore:   {:.2}", prediction.nutri_score);
    println!("Confidence:   {}", color_confidence(prediction.confidence));

    for warning in &report.warnings {
        print_warning(&warning.message());
    }
    if let Some(reason) = &report.low_confidence_reason {
        print_warning(reason);
    }

    print_heading("Features");
    print_table(
        report
            .features
            .rows()
            .into_iter()
            .map(|(feature, value)| FeatureRow {
                feature: feature.to_string(),
                value: format_value(value),
            })
            .collect(),
    );

    if let Some(explanation) = &report.explanation {
        print_heading(&format!(
            "What drove the {} prediction",
            explanation.health_label
        ));

        let mut attributions: Vec<_> = explanation.attributions.iter().collect();
        attributions.sort_by(|a, b| b.importance.total_cmp(&a.importance));
        let max = attributions.first().map(|a| a.importance).unwrap_or(0.0);

        print_table(
            attributions
                .into_iter()
                .map(|a| AttributionRow {
                    feature: a.display_name.clone(),
                    value: format_value(a.value),
                    importance: format!("{:.3}", a.importance),
                    bar: importance_bar(a.importance, max, 20),
                })
                .collect(),
        );
    }

    if let Some(alternatives) = &report.alternatives {
        print_heading("Healthier alternatives");
        print_alternatives(alternatives);
    }
}
