//! Census block-group source.
//!
//! The published housing CSV reports block-group totals. Model features are
//! per-household averages, so rooms, bedrooms and occupancy are divided by
//! the household count, and the target is rescaled to units of $100,000.
//! Rows with an empty or non-numeric cell, or with no households, are
//! dropped and counted.

use std::io::Read;

use hpp_core::{FeatureVector, N_FEATURES};

use crate::dataset::Dataset;
use crate::error::DataError;

const SOURCE_COLUMNS: [&str; 9] = [
    "longitude",
    "latitude",
    "housing_median_age",
    "total_rooms",
    "total_bedrooms",
    "population",
    "households",
    "median_income",
    "median_house_value",
];

const TARGET_SCALE: f64 = 100_000.0;

/// Outcome of converting the census CSV.
#[derive(Debug, Clone)]
pub struct CensusImport {
    /// Rows converted to the model schema.
    pub dataset: Dataset,
    /// Rows discarded for missing or unusable values.
    pub dropped_rows: usize,
}

/// Fetch the census CSV body.
pub async fn download(url: &str) -> Result<String, DataError> {
    let wrap = |source| DataError::Download {
        url: url.to_string(),
        source,
    };
    tracing::info!(url, "downloading housing dataset");
    let response = reqwest::get(url)
        .await
        .map_err(wrap)?
        .error_for_status()
        .map_err(wrap)?;
    let body = response.text().await.map_err(wrap)?;
    tracing::info!(bytes = body.len(), "download complete");
    Ok(body)
}

/// Convert census rows to the eight-feature schema.
pub fn parse_census<R: Read>(reader: R) -> Result<CensusImport, DataError> {
    let mut rdr = csv::Reader::from_reader(reader);
    let headers = rdr.headers()?.clone();
    let mut idx = [0usize; SOURCE_COLUMNS.len()];
    for (slot, column) in idx.iter_mut().zip(SOURCE_COLUMNS) {
        *slot = headers
            .iter()
            .position(|h| h.trim() == column)
            .ok_or_else(|| DataError::MissingColumn {
                column: column.to_string(),
                source_name: "census csv".to_string(),
            })?;
    }

    let mut features = Vec::new();
    let mut targets = Vec::new();
    let mut dropped_rows = 0;
    for record in rdr.records() {
        let record = record?;
        let mut raw = [0.0; SOURCE_COLUMNS.len()];
        let complete = raw.iter_mut().zip(idx.iter()).all(|(slot, &i)| {
            match record.get(i).map(str::trim).and_then(|s| s.parse::<f64>().ok()) {
                Some(v) if v.is_finite() => {
                    *slot = v;
                    true
                }
                _ => false,
            }
        });
        match derive(&raw) {
            Some((row, target)) if complete => {
                features.push(row);
                targets.push(target);
            }
            _ => dropped_rows += 1,
        }
    }

    if dropped_rows > 0 {
        tracing::warn!(dropped_rows, "dropped census rows with missing values");
    }
    Ok(CensusImport {
        dataset: Dataset::new(features, targets)?,
        dropped_rows,
    })
}

fn derive(raw: &[f64; SOURCE_COLUMNS.len()]) -> Option<(FeatureVector, f64)> {
    let [longitude, latitude, age, rooms, bedrooms, population, households, income, value] = *raw;
    if households <= 0.0 {
        return None;
    }
    let row: [f64; N_FEATURES] = [
        income,
        age,
        rooms / households,
        bedrooms / households,
        population,
        population / households,
        latitude,
        longitude,
    ];
    Some((row, value / TARGET_SCALE))
}
