//! # hpp-data - Dataset Acquisition and Splitting
//!
//! Produces the CSV inputs every later stage reads:
//!
//! 1. Ensure `<raw_data_path>/california_housing_raw.csv` exists, downloading
//!    and converting the census CSV when it does not ([`census`]).
//! 2. Summarize the dataset and write `dataset_info.txt` ([`summary`]).
//! 3. Partition with a fixed seed ([`split`]) and write `train.csv`,
//!    `validation.csv` and `test.csv` to `processed_data_path` ([`csv_io`]).
//!
//! ## Crate Policy
//!
//! - Depends only on `hpp-core` internally.
//! - The raw file is written once; later runs reuse it, so re-running the
//!   loader with the same seed reproduces the same splits offline.

pub mod census;
pub mod csv_io;
pub mod dataset;
pub mod error;
pub mod split;
pub mod summary;

use std::fs;
use std::path::{Path, PathBuf};

use hpp_core::DataConfig;

pub use csv_io::{read_split_csv, write_split_csv};
pub use dataset::Dataset;
pub use error::DataError;
pub use split::{split_dataset, SplitKind, Splits};
pub use summary::{ColumnSummary, DataSummary};

/// File name of the converted, unsplit dataset.
pub const RAW_FILE_NAME: &str = "california_housing_raw.csv";

/// File name of the human-readable dataset description.
pub const INFO_FILE_NAME: &str = "dataset_info.txt";

/// What [`prepare`] produced.
#[derive(Debug, Clone)]
pub struct PreparedData {
    /// Statistics of the full dataset.
    pub summary: DataSummary,
    /// Row counts per partition.
    pub train_rows: usize,
    /// Validation row count.
    pub validation_rows: usize,
    /// Test row count.
    pub test_rows: usize,
    /// Paths of the written split files, in [`SplitKind::ALL`] order.
    pub files: Vec<PathBuf>,
}

/// Run the whole loading stage.
pub async fn prepare(config: &DataConfig) -> Result<PreparedData, DataError> {
    let raw_path = config.raw_data_path.join(RAW_FILE_NAME);
    let (dataset, dropped_rows) = if raw_path.exists() {
        tracing::info!(path = %raw_path.display(), "raw dataset present, skipping download");
        (read_split_csv(&raw_path)?, 0)
    } else {
        let body = census::download(&config.source_url).await?;
        let import = census::parse_census(body.as_bytes())?;
        write_split_csv(&raw_path, &import.dataset)?;
        tracing::info!(path = %raw_path.display(), rows = import.dataset.len(), "raw dataset written");
        (import.dataset, import.dropped_rows)
    };

    let summary = DataSummary::of(&dataset, dropped_rows);
    write_info(&config.raw_data_path, &summary)?;
    tracing::info!(
        rows = summary.rows,
        columns = summary.columns.len(),
        dropped_rows,
        "dataset summary computed"
    );

    let splits = split_dataset(
        &dataset,
        config.test_size,
        config.validation_size,
        config.random_state,
    )?;
    let files = save_splits(&config.processed_data_path, &splits)?;

    Ok(PreparedData {
        summary,
        train_rows: splits.train.len(),
        validation_rows: splits.validation.len(),
        test_rows: splits.test.len(),
        files,
    })
}

/// Write all three partitions under `dir`.
pub fn save_splits(dir: &Path, splits: &Splits) -> Result<Vec<PathBuf>, DataError> {
    SplitKind::ALL
        .iter()
        .map(|&kind| -> Result<PathBuf, DataError> {
            let path = dir.join(kind.file_name());
            let part = splits.get(kind);
            write_split_csv(&path, part)?;
            tracing::info!(split = kind.as_str(), rows = part.len(), path = %path.display(), "split written");
            Ok(path)
        })
        .collect()
}

/// Read one partition from `dir`.
pub fn load_split(dir: &Path, kind: SplitKind) -> Result<Dataset, DataError> {
    read_split_csv(&dir.join(kind.file_name()))
}

/// Read all three partitions from `dir`.
pub fn load_splits(dir: &Path) -> Result<Splits, DataError> {
    Ok(Splits {
        train: load_split(dir, SplitKind::Train)?,
        validation: load_split(dir, SplitKind::Validation)?,
        test: load_split(dir, SplitKind::Test)?,
    })
}

fn write_info(dir: &Path, summary: &DataSummary) -> Result<(), DataError> {
    fs::create_dir_all(dir).map_err(|e| DataError::io(dir, e))?;
    let path = dir.join(INFO_FILE_NAME);
    fs::write(&path, summary.to_string()).map_err(|e| DataError::io(&path, e))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn synthetic(n: usize) -> Dataset {
        let features = (0..n)
            .map(|i| {
                let x = i as f64;
                [1.0 + x % 10.0, 20.0, 5.0, 1.0, 500.0 + x, 3.0, 34.0, -118.0]
            })
            .collect();
        let targets = (0..n).map(|i| 1.0 + (i % 10) as f64 * 0.3).collect();
        Dataset::new(features, targets).unwrap()
    }

    fn config_in(root: &Path) -> DataConfig {
        DataConfig {
            raw_data_path: root.join("raw"),
            processed_data_path: root.join("processed"),
            source_url: "http://127.0.0.1:9/unreachable.csv".to_string(),
            ..DataConfig::default()
        }
    }

    #[tokio::test]
    async fn prepare_reuses_existing_raw_file() {
        let dir = tempfile::tempdir().unwrap();
        let config = config_in(dir.path());
        write_split_csv(&config.raw_data_path.join(RAW_FILE_NAME), &synthetic(100)).unwrap();

        let prepared = prepare(&config).await.unwrap();
        assert_eq!(prepared.summary.rows, 100);
        assert_eq!(prepared.test_rows, 20);
        assert_eq!(prepared.validation_rows, 16);
        assert_eq!(prepared.train_rows, 64);
        assert!(config.raw_data_path.join(INFO_FILE_NAME).exists());

        let splits = load_splits(&config.processed_data_path).unwrap();
        assert_eq!(splits.train.len(), 64);
    }

    #[tokio::test]
    async fn prepare_is_reproducible() {
        let dir = tempfile::tempdir().unwrap();
        let config = config_in(dir.path());
        write_split_csv(&config.raw_data_path.join(RAW_FILE_NAME), &synthetic(60)).unwrap();

        prepare(&config).await.unwrap();
        let first = load_splits(&config.processed_data_path).unwrap();
        prepare(&config).await.unwrap();
        let second = load_splits(&config.processed_data_path).unwrap();
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn prepare_surfaces_download_failure() {
        let dir = tempfile::tempdir().unwrap();
        let err = prepare(&config_in(dir.path())).await.unwrap_err();
        assert!(matches!(err, DataError::Download { .. }));
    }
}
