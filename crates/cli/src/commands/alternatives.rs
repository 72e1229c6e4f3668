//! Alternative suggestion commands

use anyhow::Result;
use tabled::Tabled;

use crate::client::{Alternative, AlternativesResponse, ApiClient};
use crate::output::{color_label, format_score, print_info, print_json, print_table, print_warning, OutputFormat};

/// Row for the alternatives table
#[derive(Tabled)]
pub struct AlternativeRow {
    #[tabled(rename = "Product")]
    pub product: String,
    #[tabled(rename = "NutriScore")]
    pub nutri_score: String,
    #[tabled(rename = "Label")]
    pub label: String,
}

impl From<&Alternative> for AlternativeRow {
    fn from(alternative: &Alternative) -> Self {
        Self {
            product: alternative.product_name.clone(),
            nutri_score: format_score(alternative.nutriscore_score),
            label: color_label(&alternative.health_label),
        }
    }
}

/// Print a table of alternatives, or a notice when there are none
pub fn print_alternatives(alternatives: &[Alternative]) {
    if alternatives.is_empty() {
        print_warning("No alternatives found");
        return;
    }
    print_table(alternatives.iter().map(AlternativeRow::from).collect());
}

/// Sample products with the given label from the service's dataset
pub async fn list_alternatives(
    client: &ApiClient,
    label: Option<String>,
    count: Option<usize>,
    format: OutputFormat,
) -> Result<()> {
    let mut query = Vec::new();
    if let Some(label) = label {
        query.push(("label", label));
    }
    if let Some(count) = count {
        query.push(("count", count.to_string()));
    }

    let response: AlternativesResponse = client.get_with_query("api/v1/alternatives", &query).await?;

    match format {
        OutputFormat::Json => print_json(&response)?,
        OutputFormat::Table => {
            print_info(&format!("Products labeled {}", color_label(&response.label)));
            print_alternatives(&response.alternatives);
        }
    }

    Ok(())
}
