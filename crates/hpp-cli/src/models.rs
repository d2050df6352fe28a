//! # Models Subcommand
//!
//! Inspects the model registry and moves versions between stages.
//! Promoting a version to Production archives the previous one; the
//! prediction service picks it up on its next `POST /model/reload`.

use anyhow::Context;
use clap::{Args, Subcommand};
use hpp_core::PipelineConfig;
use hpp_tracking::{ModelRegistry, ModelVersion, Stage};

/// Arguments for the models subcommand.
#[derive(Args, Debug)]
pub struct ModelsArgs {
    /// Registered model name; defaults to `tracking.registered_model_name`.
    #[arg(long, global = true)]
    pub name: Option<String>,

    #[command(subcommand)]
    pub command: ModelsCommand,
}

/// Registry operations.
#[derive(Subcommand, Debug)]
pub enum ModelsCommand {
    /// List every registered version.
    List,
    /// Show the version the prediction service would load.
    Serving,
    /// Move a version to a stage.
    Promote {
        /// Version number.
        version: u32,
        /// Target stage: none, staging, production or archived.
        #[arg(long, default_value = "production")]
        stage: Stage,
    },
}

/// Dispatch a registry operation.
pub fn run(args: &ModelsArgs, config: &PipelineConfig) -> anyhow::Result<()> {
    let registry = ModelRegistry::new(&config.tracking.store_path);
    let name = args
        .name
        .as_deref()
        .unwrap_or(&config.tracking.registered_model_name);

    match &args.command {
        ModelsCommand::List => {
            let versions = registry
                .versions(name)
                .with_context(|| format!("listing versions of '{name}'"))?;
            if versions.is_empty() {
                println!("No versions registered for '{name}'.");
                return Ok(());
            }
            println!("{}", header());
            for v in &versions {
                println!("{}", row(v));
            }
        }
        ModelsCommand::Serving => {
            let v = registry
                .serving_version(name)
                .with_context(|| format!("resolving serving version of '{name}'"))?;
            println!("{}", header());
            println!("{}", row(&v));
        }
        ModelsCommand::Promote { version, stage } => {
            let v = registry
                .transition_stage(name, *version, *stage)
                .with_context(|| format!("moving '{name}' v{version} to {stage}"))?;
            println!("'{}' v{} is now {}", v.name, v.version, v.stage);
        }
    }
    Ok(())
}

fn header() -> String {
    format!(
        "{:>7}  {:<10}  {:<18}  {:>10}  {:<20}  {}",
        "version", "stage", "algorithm", "val_rmse", "registered", "digest"
    )
}

fn row(v: &ModelVersion) -> String {
    let val_rmse = v
        .metrics
        .get("val_rmse")
        .map_or_else(|| "-".to_string(), |r| format!("{r:.4}"));
    format!(
        "{:>7}  {:<10}  {:<18}  {:>10}  {:<20}  {}",
        v.version,
        v.stage.as_str(),
        v.algorithm.as_str(),
        val_rmse,
        v.created_at.format("%Y-%m-%d %H:%M:%S"),
        v.digest.get(..12).unwrap_or(&v.digest)
    )
}
