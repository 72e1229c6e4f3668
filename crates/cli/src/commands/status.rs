//! Service status command

use anyhow::Result;
use serde::Serialize;
use tabled::Tabled;

use crate::client::{ApiClient, HealthResponse, ReadinessResponse};
use crate::output::{color_status, print_json, print_success, print_table, print_warning, OutputFormat};

#[derive(Tabled)]
struct ComponentRow {
    #[tabled(rename = "Component")]
    name: String,
    #[tabled(rename = "Status")]
    status: String,
    #[tabled(rename = "Detail")]
    detail: String,
}

#[derive(Serialize)]
struct StatusReport {
    api_url: String,
    health: HealthResponse,
    readiness: ReadinessResponse,
}

/// Show health and readiness of the scoring service
pub async fn show_status(client: &ApiClient, format: OutputFormat) -> Result<()> {
    let (_, health): (u16, HealthResponse) = client.get_probe("healthz").await?;
    let (_, readiness): (u16, ReadinessResponse) = client.get_probe("readyz").await?;

    match format {
        OutputFormat::Json => print_json(&StatusReport {
            api_url: client.base_url().to_string(),
            health,
            readiness,
        })?,
        OutputFormat::Table => {
            println!("Service: {}", client.base_url());
            println!("Status:  {}", color_status(&health.status));

            if readiness.ready {
                print_success("Ready to score");
            } else {
                print_warning(&format!(
                    "Not ready: {}",
                    readiness.reason.as_deref().unwrap_or("unknown reason")
                ));
            }

            if !health.components.is_empty() {
                let rows: Vec<ComponentRow> = health
                    .components
                    .iter()
                    .map(|(name, component)| ComponentRow {
                        name: name.clone(),
                        status: color_status(&component.status),
                        detail: component.message.clone().unwrap_or_default(),
                    })
                    .collect();
                print_table(rows);
            }
        }
    }

    Ok(())
}
