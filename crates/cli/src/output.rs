//! Output formatting utilities

use clap::ValueEnum;
use colored::Colorize;
use serde::{Deserialize, Serialize};
use tabled::{settings::Style, Table, Tabled};

/// Output format for CLI commands
#[derive(Debug, Clone, Copy, Default, ValueEnum, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Table format (default)
    #[default]
    Table,
    /// JSON format
    Json,
}

/// Print any response as pretty JSON
pub fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Print rows as a rounded table
pub fn print_table<T: Tabled>(rows: Vec<T>) {
    let table = Table::new(rows).with(Style::rounded()).to_string();
    println!("{}", table);
}

/// Print a section heading
pub fn print_heading(title: &str) {
    println!("\n{}", title.bold());
}

/// Print a success message
pub fn print_success(message: &str) {
    println!("{} {}", "✓".green().bold(), message);
}

/// Print an error message
pub fn print_error(message: &str) {
    eprintln!("{} {}", "✗".red().bold(), message);
}

/// Print a warning message
pub fn print_warning(message: &str) {
    println!("{} {}", "⚠".yellow().bold(), message);
}

/// Print an info message
pub fn print_info(message: &str) {
    println!("{} {}", "ℹ".blue().bold(), message);
}

/// Format confidence as percentage
pub fn format_confidence(confidence: Option<f32>) -> String {
    match confidence {
        Some(c) => format!("{:.0}%", c * 100.0),
        None => "-".to_string(),
    }
}

/// Format a NutriScore, "-" when the dataset has none
pub fn format_score(score: Option<f32>) -> String {
    match score {
        Some(s) => format!("{:.1}", s),
        None => "-".to_string(),
    }
}

/// Format a feature value without trailing zeros for whole numbers
pub fn format_value(value: f32) -> String {
    if value.fract() == 0.0 {
        format!("{:.0}", value)
    } else {
        format!("{:.2}", value)
    }
}

/// Color a health label
pub fn color_label(label: &str) -> String {
    match label.to_lowercase().as_str() {
        "healthy" => label.green().bold().to_string(),
        "moderate" => label.yellow().bold().to_string(),
        "unhealthy" => label.red().bold().to_string(),
        _ => label.bold().to_string(),
    }
}

/// Color a component status
pub fn color_status(status: &str) -> String {
    match status.to_lowercase().as_str() {
        "healthy" | "ready" => status.green().to_string(),
        "degraded" => status.yellow().to_string(),
        "unhealthy" | "not ready" => status.red().to_string(),
        _ => status.to_string(),
    }
}

/// Color confidence based on value
pub fn color_confidence(confidence: Option<f32>) -> String {
    let formatted = format_confidence(confidence);
    match confidence {
        Some(c) if c >= 0.8 => formatted.green().to_string(),
        Some(c) if c >= 0.6 => formatted.yellow().to_string(),
        Some(_) => formatted.red().to_string(),
        None => formatted,
    }
}

/// Proportional bar for an attribution, `width` cells at the maximum
pub fn importance_bar(importance: f32, max: f32, width: usize) -> String {
    if max <= 0.0 || importance <= 0.0 {
        return String::new();
    }
    let cells = ((importance / max) * width as f32).round() as usize;
    "█".repeat(cells.clamp(1, width))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_confidence() {
        assert_eq!(format_confidence(Some(0.82)), "82%");
        assert_eq!(format_confidence(None), "-");
    }

    #[test]
    fn test_format_score() {
        assert_eq!(format_score(Some(-5.0)), "-5.0");
        assert_eq!(format_score(None), "-");
    }

    #[test]
    fn test_format_value() {
        assert_eq!(format_value(500.0), "500");
        assert_eq!(format_value(0.5), "0.50");
    }

    #[test]
    fn test_importance_bar() {
        assert_eq!(importance_bar(0.5, 0.5, 10).chars().count(), 10);
        assert_eq!(importance_bar(0.25, 0.5, 10).chars().count(), 5);
        assert_eq!(importance_bar(0.001, 0.5, 10).chars().count(), 1);
        assert_eq!(importance_bar(0.0, 0.5, 10), "");
        assert_eq!(importance_bar(0.0, 0.0, 10), "");
    }

    #[test]
    fn test_colored_text_keeps_content() {
        colored::control::set_override(false);
        assert_eq!(color_label("Healthy"), "Healthy");
        assert_eq!(color_status("degraded"), "degraded");
        assert_eq!(color_confidence(Some(0.9)), "90%");
    }
}
