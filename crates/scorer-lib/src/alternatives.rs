//! Healthier alternative suggestions
//!
//! The alternatives dataset is a CSV of previously scored products loaded
//! once at startup and shared read-only.

use crate::error::{Result, ScoreError};
use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::io::Read;
use std::path::Path;
use tracing::info;

/// Label suggested by default
pub const DEFAULT_SUGGESTION_LABEL: &str = "Healthy";

/// Number of alternatives suggested by default
pub const DEFAULT_SUGGESTION_COUNT: usize = 3;

/// One row of the alternatives dataset
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Alternative {
    pub product_name: String,
    #[serde(deserialize_with = "csv::invalid_option")]
    pub nutriscore_score: Option<f32>,
    pub health_label: String,
}

/// Static table of labeled products
#[derive(Debug, Clone, Default)]
pub struct AlternativesDataset {
    rows: Vec<Alternative>,
}

impl AlternativesDataset {
    pub fn new(rows: Vec<Alternative>) -> Self {
        Self { rows }
    }

    /// Load from a CSV file with at least `product_name`, `nutriscore_score`
    /// and `health_label` columns; other columns are ignored
    pub fn from_path(path: &Path) -> Result<Self> {
        let file = std::fs::File::open(path)
            .map_err(|e| ScoreError::Dataset(format!("cannot open {}: {}", path.display(), e)))?;
        let dataset = Self::from_reader(file)?;
        info!(
            path = %path.display(),
            rows = dataset.len(),
            "Loaded alternatives dataset"
        );
        Ok(dataset)
    }

    pub fn from_reader<R: Read>(reader: R) -> Result<Self> {
        let mut reader = csv::Reader::from_reader(reader);

        let headers = reader
            .headers()
            .map_err(|e| ScoreError::Dataset(format!("failed to read headers: {}", e)))?
            .clone();
        for column in ["product_name", "nutriscore_score", "health_label"] {
            if !headers.iter().any(|h| h == column) {
                return Err(ScoreError::Dataset(format!("missing column {:?}", column)));
            }
        }

        let mut rows = Vec::new();
        for (line, record) in reader.deserialize::<Alternative>().enumerate() {
            let row = record
                .map_err(|e| ScoreError::Dataset(format!("row {}: {}", line + 2, e)))?;
            rows.push(row);
        }
        Ok(Self { rows })
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Rows whose label exactly equals `label`
    pub fn with_label<'a>(&'a self, label: &'a str) -> impl Iterator<Item = &'a Alternative> + 'a {
        self.rows.iter().filter(move |row| row.health_label == label)
    }
}

/// Draw `count` rows labeled `label` uniformly at random without replacement
///
/// Fails with [`ScoreError::Underflow`] when fewer than `count` rows match.
pub fn suggest<R: Rng + ?Sized>(
    dataset: &AlternativesDataset,
    label: &str,
    count: usize,
    rng: &mut R,
) -> Result<Vec<Alternative>> {
    let candidates: Vec<&Alternative> = dataset.with_label(label).collect();
    if candidates.len() < count {
        return Err(ScoreError::Underflow {
            label: label.to_string(),
            requested: count,
            available: candidates.len(),
        });
    }

    Ok(candidates
        .choose_multiple(rng, count)
        .map(|row| (*row).clone())
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use std::collections::HashSet;
    use std::io::Write;

    const CSV: &str = "\
product_name,energy_100g,nutriscore_score,health_label
Oat flakes,372,-5,Healthy
Lentils,116,-7,Healthy
Apple sauce,68,,Healthy
Cola,42,14,Unhealthy
Crackers,450,8,Moderate
Greek yogurt,97,-1,Healthy
";

    fn dataset() -> AlternativesDataset {
        AlternativesDataset::from_reader(CSV.as_bytes()).unwrap()
    }

    #[test]
    fn test_load_ignores_extra_columns() {
        let dataset = dataset();
        assert_eq!(dataset.len(), 6);
        assert_eq!(dataset.with_label("Healthy").count(), 4);
    }

    #[test]
    fn test_empty_score_reads_as_absent() {
        let dataset = dataset();
        let apple = dataset
            .with_label("Healthy")
            .find(|r| r.product_name == "Apple sauce")
            .unwrap();
        assert_eq!(apple.nutriscore_score, None);
    }

    #[test]
    fn test_missing_column_rejected() {
        let err = AlternativesDataset::from_reader("product_name,health_label\nA,Healthy\n".as_bytes())
            .unwrap_err();
        assert!(matches!(err, ScoreError::Dataset(_)));
        assert!(err.to_string().contains("nutriscore_score"));
    }

    #[test]
    fn test_from_path() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(CSV.as_bytes()).unwrap();
        let dataset = AlternativesDataset::from_path(file.path()).unwrap();
        assert_eq!(dataset.len(), 6);
    }

    #[test]
    fn test_missing_file_rejected() {
        let err = AlternativesDataset::from_path(Path::new("/nonexistent/data.csv")).unwrap_err();
        assert!(matches!(err, ScoreError::Dataset(_)));
    }

    #[test]
    fn test_suggest_draws_distinct_matching_rows() {
        let dataset = dataset();
        let mut rng = StdRng::seed_from_u64(7);
        let picked = suggest(&dataset, "Healthy", 3, &mut rng).unwrap();

        assert_eq!(picked.len(), 3);
        assert!(picked.iter().all(|r| r.health_label == "Healthy"));
        let names: HashSet<_> = picked.iter().map(|r| r.product_name.as_str()).collect();
        assert_eq!(names.len(), 3);
    }

    #[test]
    fn test_suggest_same_seed_same_rows() {
        let dataset = dataset();
        let a = suggest(&dataset, "Healthy", 3, &mut StdRng::seed_from_u64(42)).unwrap();
        let b = suggest(&dataset, "Healthy", 3, &mut StdRng::seed_from_u64(42)).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_suggest_underflow() {
        let dataset = AlternativesDataset::from_reader(
            "product_name,nutriscore_score,health_label\nA,-2,Healthy\nB,-3,Healthy\nC,12,Unhealthy\n"
                .as_bytes(),
        )
        .unwrap();
        let mut rng = StdRng::seed_from_u64(1);

        match suggest(&dataset, "Healthy", 3, &mut rng) {
            Err(ScoreError::Underflow {
                label,
                requested,
                available,
            }) => {
                assert_eq!(label, "Healthy");
                assert_eq!(requested, 3);
                assert_eq!(available, 2);
            }
            other => panic!("expected underflow, got {:?}", other),
        }
    }

    #[test]
    fn test_suggest_label_match_is_exact() {
        let dataset = dataset();
        let mut rng = StdRng::seed_from_u64(3);
        let err = suggest(&dataset, "healthy", 1, &mut rng).unwrap_err();
        assert!(matches!(err, ScoreError::Underflow { available: 0, .. }));
    }

    #[test]
    fn test_suggest_zero_count() {
        let dataset = dataset();
        let mut rng = StdRng::seed_from_u64(3);
        assert!(suggest(&dataset, "Missing", 0, &mut rng).unwrap().is_empty());
    }
}
