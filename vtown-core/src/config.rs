//! Configuration loading and typed config structures.
//!
//! The simulation is configured from a YAML document whose keys mirror the
//! fields below. Every key is optional: absent keys take the defaults listed
//! on each field, and unknown keys are ignored.

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::types::{InfrastructureType, Sector};

/// Errors that can occur when loading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Failed to read the configuration file from disk.
    #[error("failed to read config file: {source}")]
    Io {
        #[from]
        source: std::io::Error,
    },

    /// Failed to parse or deserialize YAML content.
    #[error("failed to parse config YAML: {source}")]
    Yaml { source: serde_yml::Error },

    /// Overrides can only be applied to a mapping document.
    #[error("config document is not a mapping")]
    NotAMapping,
}

impl From<serde_yml::Error> for ConfigError {
    fn from(source: serde_yml::Error) -> Self {
        Self::Yaml { source }
    }
}

/// Top-level simulation configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimConfig {
    pub grid_width: i32,
    pub grid_height: i32,
    pub initial_population: usize,
    pub initial_businesses: usize,
    /// Annual policy budget, reset every cycle.
    pub policy_budget: f64,
    pub random_seed: Option<u64>,

    pub household_size_range: [u32; 2],
    pub initial_sector_distribution: SectorShares,
    pub base_wages: SectorWages,

    // Inclusion rates
    pub microfinance_membership_rate: f64,
    pub offgrid_electric_share: f64,
    pub remittance_receiving_rate: f64,
    pub cooperative_membership_rate: f64,
    pub landless_household_rate: f64,

    pub education_range: [u8; 2],
    pub health_range: [f64; 2],
    pub rural_attachment_range: [f64; 2],
    pub migration_threshold_range: [f64; 2],

    pub productivity_multipliers: ProductivityMultipliers,
    pub random_variation: RandomVariation,

    pub consumption_rate: f64,
    pub rural_urban_wage_multiplier: f64,
    pub flood_risk_probability: f64,

    pub education_cost_multiplier: f64,
    pub education_investment_probability: f64,
    pub health_investment_cost: f64,
    pub health_investment_probability: f64,
    pub health_improvement_per_investment: f64,

    pub policy_config: PolicyConfig,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            grid_width: 50,
            grid_height: 50,
            initial_population: 200,
            initial_businesses: 30,
            policy_budget: 100_000.0,
            random_seed: None,
            household_size_range: [2, 8],
            initial_sector_distribution: SectorShares::default(),
            base_wages: SectorWages::default(),
            microfinance_membership_rate: 0.3,
            offgrid_electric_share: 0.0,
            remittance_receiving_rate: 0.0,
            cooperative_membership_rate: 0.0,
            landless_household_rate: 0.0,
            education_range: [0, 12],
            health_range: [0.3, 1.0],
            rural_attachment_range: [0.2, 0.8],
            migration_threshold_range: [1.2, 2.0],
            productivity_multipliers: ProductivityMultipliers::default(),
            random_variation: RandomVariation::default(),
            consumption_rate: 0.8,
            rural_urban_wage_multiplier: 1.0,
            flood_risk_probability: 0.0,
            education_cost_multiplier: 500.0,
            education_investment_probability: 0.3,
            health_investment_cost: 200.0,
            health_investment_probability: 0.4,
            health_improvement_per_investment: 0.1,
            policy_config: PolicyConfig::default(),
        }
    }
}

impl SimConfig {
    /// Load configuration from a YAML file at the given path.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        Self::parse(&contents)
    }

    /// Parse configuration from a YAML string. An empty document yields the defaults.
    pub fn parse(yaml: &str) -> Result<Self, ConfigError> {
        if yaml.trim().is_empty() {
            return Ok(Self::default());
        }
        Ok(serde_yml::from_str(yaml)?)
    }

    /// Build configuration from an already-parsed YAML value.
    pub fn from_value(value: serde_yml::Value) -> Result<Self, ConfigError> {
        if value.is_null() {
            return Ok(Self::default());
        }
        Ok(serde_yml::from_value(value)?)
    }

    /// Base wage for a sector.
    pub fn wage(&self, sector: Sector) -> f64 {
        self.base_wages.get(sector)
    }
}

/// Replace top-level keys of a config document before deserializing it.
/// Used by parameter sweeps, which vary one key per run.
pub fn apply_overrides(
    base: &serde_yml::Value,
    overrides: &BTreeMap<String, serde_yml::Value>,
) -> Result<serde_yml::Value, ConfigError> {
    let mut doc = if base.is_null() {
        serde_yml::Value::Mapping(serde_yml::Mapping::new())
    } else {
        base.clone()
    };
    let mapping = doc.as_mapping_mut().ok_or(ConfigError::NotAMapping)?;
    for (key, value) in overrides {
        mapping.insert(serde_yml::Value::String(key.clone()), value.clone());
    }
    Ok(doc)
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SectorShares {
    pub agriculture: f64,
    pub manufacturing: f64,
    pub services: f64,
}

impl Default for SectorShares {
    fn default() -> Self {
        Self {
            agriculture: 0.6,
            manufacturing: 0.2,
            services: 0.2,
        }
    }
}

impl SectorShares {
    pub fn weighted(&self) -> [(Sector, f64); 3] {
        [
            (Sector::Agriculture, self.agriculture),
            (Sector::Manufacturing, self.manufacturing),
            (Sector::Services, self.services),
        ]
    }
}

/// Monthly base wage per sector.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SectorWages {
    pub agriculture: f64,
    pub manufacturing: f64,
    pub services: f64,
}

impl Default for SectorWages {
    fn default() -> Self {
        Self {
            agriculture: 2500.0,
            manufacturing: 4000.0,
            services: 5000.0,
        }
    }
}

impl SectorWages {
    pub fn get(&self, sector: Sector) -> f64 {
        match sector {
            Sector::Agriculture => self.agriculture,
            Sector::Manufacturing => self.manufacturing,
            Sector::Services => self.services,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProductivityMultipliers {
    pub infrastructure_road: f64,
    pub infrastructure_market: f64,
    pub infrastructure_utility: f64,
    pub education_factor: f64,
    pub health_factor: f64,
}

impl Default for ProductivityMultipliers {
    fn default() -> Self {
        Self {
            infrastructure_road: 1.2,
            infrastructure_market: 1.15,
            infrastructure_utility: 1.1,
            education_factor: 0.05,
            health_factor: 0.5,
        }
    }
}

/// Standard deviations of multiplicative noise terms.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RandomVariation {
    pub income: f64,
}

impl Default for RandomVariation {
    fn default() -> Self {
        Self { income: 0.1 }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PolicyConfig {
    pub infrastructure_weights: BTreeMap<InfrastructureType, f64>,
    pub grant_program_budget: f64,
    pub microfinance_budget: f64,
}

impl Default for PolicyConfig {
    fn default() -> Self {
        Self {
            infrastructure_weights: BTreeMap::from([
                (InfrastructureType::Road, 0.3),
                (InfrastructureType::School, 0.2),
                (InfrastructureType::Clinic, 0.2),
                (InfrastructureType::Market, 0.15),
                (InfrastructureType::Utility, 0.15),
            ]),
            grant_program_budget: 20_000.0,
            microfinance_budget: 15_000.0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_keys_fall_back_to_defaults() {
        let config = SimConfig::parse("grid_width: 30\ninitial_population: 12\n").unwrap();
        assert_eq!(config.grid_width, 30);
        assert_eq!(config.grid_height, 50);
        assert_eq!(config.initial_population, 12);
        assert_eq!(config.base_wages.services, 5000.0);
        assert_eq!(config.policy_config.grant_program_budget, 20_000.0);
    }

    #[test]
    fn test_nested_partial_override() {
        let yaml = "productivity_multipliers:\n  infrastructure_road: 1.5\nbase_wages:\n  agriculture: 3000\n";
        let config = SimConfig::parse(yaml).unwrap();
        assert_eq!(config.productivity_multipliers.infrastructure_road, 1.5);
        assert_eq!(config.productivity_multipliers.health_factor, 0.5);
        assert_eq!(config.wage(Sector::Agriculture), 3000.0);
        assert_eq!(config.wage(Sector::Manufacturing), 4000.0);
    }

    #[test]
    fn test_empty_document_is_default() {
        assert_eq!(SimConfig::parse("").unwrap(), SimConfig::default());
    }

    #[test]
    fn test_unknown_keys_ignored() {
        let config = SimConfig::parse("visualization_port: 8521\n").unwrap();
        assert_eq!(config, SimConfig::default());
    }

    #[test]
    fn test_malformed_yaml_is_error() {
        let err = SimConfig::parse("grid_width: [unclosed").unwrap_err();
        assert!(matches!(err, ConfigError::Yaml { .. }));
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let err = SimConfig::from_file(Path::new("/nonexistent/vtown.yaml")).unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
    }

    #[test]
    fn test_apply_overrides() {
        let base: serde_yml::Value = serde_yml::from_str("grid_width: 40\n").unwrap();
        let overrides = BTreeMap::from([(
            "policy_budget".to_string(),
            serde_yml::Value::from(250_000.0),
        )]);
        let merged = apply_overrides(&base, &overrides).unwrap();
        let config = SimConfig::from_value(merged).unwrap();
        assert_eq!(config.grid_width, 40);
        assert_eq!(config.policy_budget, 250_000.0);
    }
}
