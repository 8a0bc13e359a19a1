//! The metric knowledge base.
//!
//! A CSV file describes the queryable metric vocabulary: name,
//! description, optional type, example usage. Malformed rows are
//! skipped, not fatal — the catalog is advisory input for prompt
//! construction, never a source of truth.

use std::io::Read;
use std::path::Path;

use serde::Deserialize;

use df_domain::error::{Error, Result};

/// One row of the catalog.
#[derive(Debug, Clone, Deserialize)]
pub struct MetricEntry {
    pub metric_name: String,
    pub description: String,
    #[serde(rename = "type")]
    pub metric_type: Option<String>,
    pub example_usage: Option<String>,
}

/// The full metric vocabulary.
#[derive(Debug, Clone)]
pub struct MetricCatalog {
    entries: Vec<MetricEntry>,
}

impl MetricCatalog {
    /// Load the catalog from a CSV file.
    pub fn load(path: &Path) -> Result<Self> {
        let file = std::fs::File::open(path)
            .map_err(|e| Error::Metrics(format!("opening {}: {e}", path.display())))?;
        let catalog = Self::from_reader(file)?;
        tracing::info!(
            metrics = catalog.len(),
            path = %path.display(),
            "metric catalog loaded"
        );
        Ok(catalog)
    }

    /// Parse catalog rows from any reader. Rows that fail to
    /// deserialize are logged and skipped.
    pub fn from_reader<R: Read>(reader: R) -> Result<Self> {
        let mut rdr = csv::ReaderBuilder::new()
            .flexible(true)
            .trim(csv::Trim::All)
            .from_reader(reader);

        let mut entries = Vec::new();
        for row in rdr.deserialize::<MetricEntry>() {
            match row {
                Ok(entry) if !entry.metric_name.is_empty() => entries.push(entry),
                Ok(_) => {}
                Err(e) => {
                    tracing::warn!(error = %e, "skipping malformed catalog row");
                }
            }
        }

        if entries.is_empty() {
            return Err(Error::Metrics("metric catalog is empty".into()));
        }

        Ok(Self { entries })
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Newline-separated metric names, for the "only use these" block.
    pub fn names_block(&self) -> String {
        self.entries
            .iter()
            .map(|e| e.metric_name.as_str())
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Per-metric descriptions and examples, for the knowledge block.
    pub fn knowledge_block(&self) -> String {
        self.entries
            .iter()
            .map(|e| {
                let mut block = format!("Metric: {}\nDescription: {}", e.metric_name, e.description);
                if let Some(ref t) = e.metric_type {
                    block.push_str(&format!("\nType: {t}"));
                }
                if let Some(ref ex) = e.example_usage {
                    block.push_str(&format!("\nExample: {ex}"));
                }
                block
            })
            .collect::<Vec<_>>()
            .join("\n\n")
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Tests
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
