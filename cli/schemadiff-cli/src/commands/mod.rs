pub mod apply;
pub mod check;
pub mod plan;

use anyhow::{Context, Result};
use clap::{Args, ValueEnum};
use std::path::{Path, PathBuf};

use schemadiff::{CaseSensitivity, Database};
use schemadiff_config::Settings;

#[derive(Args)]
pub struct CompareArgs {
    /// Model describing the schema as it is
    #[arg(long)]
    pub current: PathBuf,
    /// Model describing the schema as it should be
    #[arg(long)]
    pub desired: PathBuf,
    /// Settings file (defaults to ./schemadiff.toml when present)
    #[arg(long)]
    pub config: Option<PathBuf>,
    /// Target engine: generic, postgres, mysql or sqlite
    #[arg(long)]
    pub platform: Option<String>,
    #[arg(long)]
    pub case_insensitive: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

/// Settings with command line flags applied on top.
pub fn settings(args: &CompareArgs) -> Result<Settings> {
    let mut settings = Settings::load(args.config.as_deref())?;
    if let Some(platform) = &args.platform {
        settings.platform = platform.clone();
    }
    if args.case_insensitive {
        settings.case_sensitive = false;
    }
    Ok(settings)
}

/// Read and validate a model file.
pub fn load_model(path: &Path, case: CaseSensitivity) -> Result<Database> {
    let database = Database::from_toml_file(path).with_context(|| format!("Failed to read model {:?}", path))?;
    database
        .validate(case)
        .with_context(|| format!("Model {:?} is inconsistent", path))?;
    Ok(database)
}

/// Load settings and both models.
pub fn prepare(args: &CompareArgs) -> Result<(Settings, Database, Database)> {
    let settings = settings(args)?;
    let case = settings.case_sensitivity();
    let current = load_model(&args.current, case)?;
    let desired = load_model(&args.desired, case)?;
    Ok((settings, current, desired))
}
