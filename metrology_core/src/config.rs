//! Configuration file support for qty.
//!
//! Configuration is loaded from `$XDG_CONFIG_HOME/metrology/config.toml`.

use crate::catalog::{factor_from_f64, UnitCatalog, UnitSpec};
use crate::ops::DEFAULT_CONFIDENCE;
use crate::prefix::PrefixFilter;
use crate::unit::{Unit, UnitFactor};
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Application configuration
#[derive(Clone, Debug, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub comparison: ComparisonConfig,

    #[serde(default)]
    pub rounding: RoundingConfig,

    #[serde(default)]
    pub units: UnitsConfig,
}

/// Statistical comparison configuration
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ComparisonConfig {
    #[serde(default = "default_confidence")]
    pub confidence: f64,
}

impl Default for ComparisonConfig {
    fn default() -> Self {
        Self {
            confidence: default_confidence(),
        }
    }
}

/// Output rounding configuration
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RoundingConfig {
    /// Round printed results by the PDG rule
    #[serde(default = "default_pdg")]
    pub pdg: bool,
}

impl Default for RoundingConfig {
    fn default() -> Self {
        Self { pdg: default_pdg() }
    }
}

/// User-defined unit.
///
/// Without a `factor` the unit is a new base dimension; with one it is
/// `factor` times the product of `base`.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CustomUnit {
    pub name: String,
    #[serde(default)]
    pub factor: Option<f64>,
    #[serde(default)]
    pub base: Vec<UnitFactor>,
    #[serde(default)]
    pub aliases: Vec<String>,
    #[serde(default)]
    pub abbreviations: Vec<String>,
    #[serde(default)]
    pub prefixes: Option<PrefixFilter>,
    #[serde(default)]
    pub overwrite: bool,
}

impl CustomUnit {
    fn spec(&self) -> Result<UnitSpec> {
        let mut spec = UnitSpec::new(self.name.as_str())
            .aliases(self.aliases.iter().map(String::as_str))
            .abbreviations(self.abbreviations.iter().map(String::as_str))
            .overwrite(self.overwrite);

        if let Some(factor) = self.factor {
            let expansion = Unit::from_factors(self.base.iter().map(|f| (f.name.as_str(), f.power)));
            spec = spec.defined_as(factor_from_f64(factor)?, expansion);
        }
        if let Some(filter) = &self.prefixes {
            spec = spec.prefixes(filter.clone());
        }
        Ok(spec)
    }
}

/// Custom units configuration
#[derive(Clone, Debug, Serialize, Deserialize, Default)]
pub struct UnitsConfig {
    #[serde(default)]
    pub custom: Vec<CustomUnit>,
}

// Default value functions
fn default_confidence() -> f64 {
    DEFAULT_CONFIDENCE
}

fn default_pdg() -> bool {
    true
}

impl Config {
    /// Load configuration from the standard config path
    pub fn load() -> Result<Self> {
        let config_path = Self::default_config_path()?;
        if config_path.exists() {
            Self::load_from(&config_path)
        } else {
            tracing::info!(
                "No config file found at {:?}, using defaults",
                config_path
            );
            Ok(Self::default())
        }
    }

    /// Load and validate configuration from a specific path
    pub fn load_from(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&contents)?;
        config.validate()?;
        tracing::info!("Loaded config from {:?}", path);
        Ok(config)
    }

    /// Get the default config file path
    pub fn default_config_path() -> Result<PathBuf> {
        let base = match dirs::config_dir() {
            Some(dir) => dir,
            None => {
                let home = std::env::var("HOME").map_err(|_| {
                    Error::Config("Neither a config directory nor HOME is available".into())
                })?;
                PathBuf::from(home).join(".config")
            }
        };
        Ok(base.join("metrology").join("config.toml"))
    }

    /// Save the current configuration to a specific path
    pub fn save_to(&self, path: &Path) -> Result<()> {
        // Ensure parent directory exists
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let contents = toml::to_string_pretty(self)
            .map_err(|e| Error::Config(format!("Failed to serialize config: {}", e)))?;
        std::fs::write(path, contents)?;
        tracing::info!("Saved config to {:?}", path);
        Ok(())
    }

    /// Check values serde cannot
    pub fn validate(&self) -> Result<()> {
        let confidence = self.comparison.confidence;
        if !(confidence > 0.0 && confidence < 1.0) {
            return Err(Error::Config(format!(
                "comparison.confidence must lie in (0, 1), got {}",
                confidence
            )));
        }

        for unit in &self.units.custom {
            if unit.name.trim().is_empty() {
                return Err(Error::Config("Custom unit has an empty name".into()));
            }
            match unit.factor {
                Some(f) if !f.is_finite() || f == 0.0 => {
                    return Err(Error::Config(format!(
                        "Custom unit '{}' has an invalid factor {}",
                        unit.name, f
                    )));
                }
                None if !unit.base.is_empty() => {
                    return Err(Error::Config(format!(
                        "Custom unit '{}' lists base units but no factor",
                        unit.name
                    )));
                }
                _ => {}
            }
            if let Some(f) = unit.base.iter().find(|f| f.power == 0) {
                return Err(Error::Config(format!(
                    "Custom unit '{}' raises '{}' to a zero power",
                    unit.name, f.name
                )));
            }
        }
        Ok(())
    }

    /// Register the custom units, in order, with `catalog`
    pub fn apply_to(&self, catalog: &mut UnitCatalog) -> Result<()> {
        for unit in &self.units.custom {
            catalog.register_unit(unit.spec()?)?;
            tracing::debug!("Registered custom unit '{}'", unit.name);
        }
        Ok(())
    }
}
