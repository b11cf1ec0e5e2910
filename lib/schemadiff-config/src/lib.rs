//! Settings for schemadiff.
//!
//! Layers, later ones winning: built-in defaults, a `schemadiff.toml` file,
//! then `.env` / environment variables (`SCHEMADIFF_PLATFORM`,
//! `SCHEMADIFF_CASE_SENSITIVE`). Command line flags are applied on top by
//! the binary.

use anyhow::{Context, Result, bail};
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

use schemadiff::{
    CapabilityPolicy, CaseSensitivity, ModelComparator, PlatformInfo, PrimaryKeyChangeStyle, type_or_size_changed,
};

pub const CONFIG_FILE: &str = "schemadiff.toml";
pub const PLATFORM_VAR: &str = "SCHEMADIFF_PLATFORM";
pub const CASE_SENSITIVE_VAR: &str = "SCHEMADIFF_CASE_SENSITIVE";

/// Which feasibility policy the comparator gets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PolicyKind {
    /// Every change is applied in place.
    PermitAll,
    /// The capability preset of the configured platform.
    #[default]
    Platform,
    /// The `[capabilities]` table.
    Custom,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Settings {
    pub platform: String,
    pub case_sensitive: bool,
    pub primary_key_changes: PrimaryKeyChangeStyle,
    pub can_drop_primary_key_columns: bool,
    pub rebuild_constraints_on_column_change: bool,
    pub policy: PolicyKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub capabilities: Option<CapabilityPolicy>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            platform: "generic".to_string(),
            case_sensitive: true,
            primary_key_changes: PrimaryKeyChangeStyle::Replace,
            can_drop_primary_key_columns: true,
            rebuild_constraints_on_column_change: false,
            policy: PolicyKind::Platform,
            capabilities: None,
        }
    }
}

pub fn retrieve_from_env(key: &str) -> Result<String> {
    dotenvy::dotenv().ok();
    env::var(key).with_context(|| format!("Missing environment variable: {}", key))
}

impl Settings {
    /// Load all layers. An explicit `path` must exist; otherwise
    /// `schemadiff.toml` in the working directory is used when present.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let file = match path {
            Some(p) => Some(p.to_path_buf()),
            None => {
                let default = PathBuf::from(CONFIG_FILE);
                default.exists().then_some(default)
            }
        };

        let mut settings = match file {
            Some(p) => Self::from_file(&p)?,
            None => Self::default(),
        };
        settings.apply_env_overrides(|key| retrieve_from_env(key).ok())?;
        Ok(settings)
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path).with_context(|| format!("Failed to read config {:?}", path))?;
        let settings = Self::from_toml_str(&text).with_context(|| format!("Invalid config {:?}", path))?;
        debug!("Loaded settings from {:?}", path);
        Ok(settings)
    }

    pub fn from_toml_str(text: &str) -> Result<Self> {
        Ok(toml::from_str(text)?)
    }

    /// Apply environment overrides read through `lookup`.
    pub fn apply_env_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<()> {
        if let Some(platform) = lookup(PLATFORM_VAR) {
            debug!("{} overrides platform with {}", PLATFORM_VAR, platform);
            self.platform = platform;
        }
        if let Some(raw) = lookup(CASE_SENSITIVE_VAR) {
            self.case_sensitive =
                parse_bool(&raw).with_context(|| format!("Invalid value for {}", CASE_SENSITIVE_VAR))?;
        }
        Ok(())
    }

    pub fn case_sensitivity(&self) -> CaseSensitivity {
        CaseSensitivity::from_flag(self.case_sensitive)
    }

    pub fn platform_info(&self) -> Result<PlatformInfo> {
        match PlatformInfo::by_name(&self.platform) {
            Some(info) => Ok(info),
            None => bail!(
                "Unknown platform '{}' (expected generic, postgres, mysql or sqlite)",
                self.platform
            ),
        }
    }

    /// Build the comparator these settings describe.
    pub fn comparator(&self) -> Result<ModelComparator> {
        let platform = self.platform_info()?;
        let case = self.case_sensitivity();

        let mut comparator = ModelComparator::new(platform.clone())
            .case_sensitivity(case)
            .primary_key_changes(self.primary_key_changes)
            .can_drop_primary_key_columns(self.can_drop_primary_key_columns);

        comparator = match self.policy {
            PolicyKind::PermitAll => comparator,
            PolicyKind::Platform => comparator.with_policy(CapabilityPolicy::for_platform(&platform)),
            PolicyKind::Custom => {
                let capabilities = self
                    .capabilities
                    .clone()
                    .context("policy = \"custom\" needs a [capabilities] table")?;
                comparator.with_policy(capabilities.with_platform(platform))
            }
        };

        if self.rebuild_constraints_on_column_change {
            comparator = comparator.rebuild_constraints_when(type_or_size_changed);
        }

        Ok(comparator)
    }
}

fn parse_bool(raw: &str) -> Result<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        other => bail!("expected a boolean, got '{}'", other),
    }
}
