//! Configuration management with layered loading
//!
//! Precedence (lowest to highest):
//! 1. Compiled defaults
//! 2. Global config: `$XDG_CONFIG_HOME/ledgertree/ledgertree.toml`
//! 3. Local config: `<dir>/.ledgertree.toml` (working directory or `-C`)
//! 4. Environment variables: `LEDGERTREE_*` prefix

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use config::{Config, ConfigError, Environment};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};

use crate::application::services::RecalcPolicy;
use crate::application::ApplicationError;
use crate::domain::{BaselineLookup, ZeroBaselinePolicy};

/// How results are rendered.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Box-drawing tree
    #[default]
    Tree,
    /// Indented Label/Value/Input/Variance table
    Table,
    Json,
    Toml,
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OutputFormat::Tree => write!(f, "tree"),
            OutputFormat::Table => write!(f, "table"),
            OutputFormat::Json => write!(f, "json"),
            OutputFormat::Toml => write!(f, "toml"),
        }
    }
}

impl FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "tree" => Ok(Self::Tree),
            "table" => Ok(Self::Table),
            "json" => Ok(Self::Json),
            "toml" => Ok(Self::Toml),
            other => Err(format!(
                "unknown format '{other}' (expected tree, table, json or toml)"
            )),
        }
    }
}

/// Display settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct DisplayConfig {
    pub format: OutputFormat,
    /// Spaces per tree level in table output
    pub indent: usize,
    /// Colour variance columns (NO_COLOR still wins)
    pub color: bool,
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            format: OutputFormat::Tree,
            indent: 2,
            color: true,
        }
    }
}

/// Raw recalc config for intermediate parsing (Option to detect "not specified").
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct RawRecalcConfig {
    pub baseline_lookup: Option<BaselineLookup>,
    pub zero_baseline: Option<ZeroBaselinePolicy>,
}

/// Raw display config for intermediate parsing.
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct RawDisplayConfig {
    pub format: Option<OutputFormat>,
    pub indent: Option<usize>,
    pub color: Option<bool>,
}

/// Raw settings for intermediate parsing.
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct RawSettings {
    pub ledger: Option<PathBuf>,
    pub recalc: RawRecalcConfig,
    pub display: RawDisplayConfig,
}

/// Unified configuration for ledgertree.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct Settings {
    /// Default ledger document when none is given on the command line
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ledger: Option<PathBuf>,
    /// Recalculation policies
    pub recalc: RecalcPolicy,
    /// Rendering
    pub display: DisplayConfig,
}

/// Get the XDG config directory for ledgertree.
pub fn global_config_dir() -> Option<PathBuf> {
    ProjectDirs::from("", "", "ledgertree").map(|dirs| dirs.config_dir().to_path_buf())
}

/// Get the path to the global config file.
pub fn global_config_path() -> Option<PathBuf> {
    global_config_dir().map(|dir| dir.join("ledgertree.toml"))
}

/// Get the path to the local config file in `dir`.
pub fn local_config_path(dir: &Path) -> PathBuf {
    dir.join(".ledgertree.toml")
}

/// Load a TOML file into RawSettings for manual merging.
fn load_raw_settings(path: &Path) -> Result<RawSettings, ApplicationError> {
    let content = std::fs::read_to_string(path).map_err(|e| ApplicationError::Config {
        message: format!("read {}: {}", path.display(), e),
    })?;
    toml::from_str(&content).map_err(|e| ApplicationError::Config {
        message: format!("parse {}: {}", path.display(), e),
    })
}

/// Expand `~`, `$VAR` and `${VAR}` in a path.
fn expand_path(path: &Path) -> PathBuf {
    let raw = path.to_string_lossy();
    shellexpand::full(raw.as_ref())
        .map(|s| PathBuf::from(s.into_owned()))
        .unwrap_or_else(|_| path.to_path_buf())
}

impl Settings {
    /// Expand shell variables and tilde in path-like fields.
    fn expand_paths(&mut self) {
        if let Some(ledger) = &self.ledger {
            self.ledger = Some(expand_path(ledger));
        }
    }

    /// Overlay config onto self: every specified field wins.
    fn merge_with(&self, overlay: &RawSettings) -> Self {
        Self {
            ledger: overlay.ledger.clone().or_else(|| self.ledger.clone()),
            recalc: RecalcPolicy {
                baseline_lookup: overlay
                    .recalc
                    .baseline_lookup
                    .unwrap_or(self.recalc.baseline_lookup),
                zero_baseline: overlay
                    .recalc
                    .zero_baseline
                    .unwrap_or(self.recalc.zero_baseline),
            },
            display: DisplayConfig {
                format: overlay.display.format.unwrap_or(self.display.format),
                indent: overlay.display.indent.unwrap_or(self.display.indent),
                color: overlay.display.color.unwrap_or(self.display.color),
            },
        }
    }

    /// Load settings with layered precedence.
    ///
    /// # Arguments
    /// * `local_dir` - Directory holding an optional `.ledgertree.toml`
    ///
    /// # Precedence (lowest to highest)
    /// 1. Compiled defaults
    /// 2. Global config: `$XDG_CONFIG_HOME/ledgertree/ledgertree.toml`
    /// 3. Local config: `<local_dir>/.ledgertree.toml`
    /// 4. Environment variables: `LEDGERTREE_*` prefix
    pub fn load(local_dir: Option<&Path>) -> Result<Self, ApplicationError> {
        let mut current = Self::default();

        if let Some(global_path) = global_config_path() {
            if global_path.exists() {
                current = current.merge_with(&load_raw_settings(&global_path)?);
            }
        }

        if let Some(dir) = local_dir {
            let local_path = local_config_path(dir);
            if local_path.exists() {
                current = current.merge_with(&load_raw_settings(&local_path)?);
            }
        }

        current = Self::apply_env_overrides(current)?;
        current.expand_paths();

        Ok(current)
    }

    /// Apply LEDGERTREE_* environment variables as explicit overrides.
    ///
    /// Nested keys use `__`, e.g. `LEDGERTREE_RECALC__ZERO_BASELINE=clamp`.
    fn apply_env_overrides(mut settings: Self) -> Result<Self, ApplicationError> {
        let config = Config::builder()
            .add_source(
                Environment::with_prefix("LEDGERTREE")
                    .prefix_separator("_")
                    .separator("__"),
            )
            .build()
            .map_err(config_err)?;

        if let Ok(val) = config.get_string("ledger") {
            settings.ledger = Some(PathBuf::from(val));
        }
        if let Ok(val) = config.get_string("recalc.baseline_lookup") {
            settings.recalc.baseline_lookup = val.parse().map_err(config_msg)?;
        }
        if let Ok(val) = config.get_string("recalc.zero_baseline") {
            settings.recalc.zero_baseline = val.parse().map_err(config_msg)?;
        }
        if let Ok(val) = config.get_string("display.format") {
            settings.display.format = val.parse().map_err(config_msg)?;
        }
        if let Ok(val) = config.get_string("display.indent") {
            settings.display.indent = val
                .parse()
                .map_err(|e| config_msg(format!("display.indent '{val}': {e}")))?;
        }
        if let Ok(val) = config.get_string("display.color") {
            settings.display.color = parse_bool(&val).ok_or_else(|| {
                config_msg(format!("display.color '{val}': expected true or false"))
            })?;
        }

        Ok(settings)
    }

    /// Show the effective configuration as TOML.
    pub fn to_toml(&self) -> Result<String, ApplicationError> {
        toml::to_string_pretty(self).map_err(|e| ApplicationError::Config {
            message: format!("serialize config: {e}"),
        })
    }

    /// Generate a template config file.
    pub fn template() -> String {
        r#"# ledgertree configuration
#
# Locations (by precedence, lowest to highest):
#   Global: ~/.config/ledgertree/ledgertree.toml
#   Local:  ./.ledgertree.toml
#   Env:    LEDGERTREE_* environment variables (e.g. LEDGERTREE_RECALC__ZERO_BASELINE)

# Ledger document used when none is given on the command line
# ledger = "~/budgets/2024.toml"

[recalc]
# Where an edit finds the original value of its target:
#   "recursive" - any depth of the baseline
#   "top-level" - top-level baseline entries only (nested targets use their current value)
# baseline_lookup = "recursive"

# Variance against a zero baseline value:
#   "sentinel"  - 0 -> 0 is 0.00%, 0 -> x is ∞%
#   "clamp"     - always 0.00%
#   "propagate" - 0 -> x is ∞%, 0 -> 0 is NaN%
# zero_baseline = "sentinel"

[display]
# Output format: tree, table, json, toml
# format = "tree"

# Spaces per level in table output
# indent = 2

# Colour variance (NO_COLOR disables regardless)
# color = true
"#
        .to_string()
    }
}

/// Boolean env values, spelled the way shells usually do.
fn parse_bool(val: &str) -> Option<bool> {
    match val.trim().to_ascii_lowercase().as_str() {
        "true" | "yes" | "on" | "1" => Some(true),
        "false" | "no" | "off" | "0" => Some(false),
        _ => None,
    }
}

fn config_err(e: ConfigError) -> ApplicationError {
    ApplicationError::Config {
        message: e.to_string(),
    }
}

fn config_msg(message: String) -> ApplicationError {
    ApplicationError::Config { message }
}
