//! # Load-Data Subcommand
//!
//! Fetches the census CSV (unless the converted raw file is already on
//! disk), writes the dataset summary and the three split files.

use std::path::PathBuf;

use anyhow::Context;
use clap::Args;
use hpp_core::PipelineConfig;
use hpp_data::{PreparedData, RAW_FILE_NAME};

/// Arguments for the load-data subcommand.
#[derive(Args, Debug, Default)]
pub struct LoadDataArgs {
    /// Download from this URL instead of `data.source_url`.
    #[arg(long)]
    pub source_url: Option<String>,

    /// Write the splits here instead of `data.processed_data_path`.
    #[arg(long)]
    pub output_dir: Option<PathBuf>,

    /// Download again even when the raw file exists.
    #[arg(long)]
    pub force: bool,
}

impl LoadDataArgs {
    /// Fold the flags into `config`.
    pub fn apply(&self, config: &mut PipelineConfig) {
        if let Some(url) = &self.source_url {
            config.data.source_url = url.clone();
        }
        if let Some(dir) = &self.output_dir {
            config.data.processed_data_path = dir.clone();
        }
    }
}

/// Run the loading stage and print what was written.
pub fn run(args: &LoadDataArgs, config: &PipelineConfig) -> anyhow::Result<PreparedData> {
    if args.force {
        let raw = config.data.raw_data_path.join(RAW_FILE_NAME);
        if raw.exists() {
            std::fs::remove_file(&raw).with_context(|| format!("removing {}", raw.display()))?;
            tracing::info!(path = %raw.display(), "removed cached raw dataset");
        }
    }

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("starting async runtime")?;
    let prepared = runtime
        .block_on(hpp_data::prepare(&config.data))
        .context("preparing dataset")?;

    println!("{}", prepared.summary);
    println!(
        "Split: {} train / {} validation / {} test",
        prepared.train_rows, prepared.validation_rows, prepared.test_rows
    );
    for file in &prepared.files {
        println!("  wrote {}", file.display());
    }
    Ok(prepared)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flags_override_paths_and_source() {
        let mut config = PipelineConfig::default();
        let args = LoadDataArgs {
            source_url: Some("http://localhost/housing.csv".to_string()),
            output_dir: Some(PathBuf::from("/tmp/splits")),
            force: false,
        };
        args.apply(&mut config);
        assert_eq!(config.data.source_url, "http://localhost/housing.csv");
        assert_eq!(config.data.processed_data_path, PathBuf::from("/tmp/splits"));
    }

    #[test]
    fn unreachable_source_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = PipelineConfig::default();
        config.data.raw_data_path = dir.path().join("raw");
        config.data.processed_data_path = dir.path().join("processed");
        config.data.source_url = "http://127.0.0.1:9/unreachable.csv".to_string();
        let err = run(&LoadDataArgs::default(), &config).unwrap_err();
        assert!(format!("{err:#}").contains("preparing dataset"));
    }
}
