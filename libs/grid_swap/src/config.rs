//! # Pair Search Configuration
//!
//! ## Purpose
//!
//! Runtime limits for the pair search: the validator's multiplication budget plus the
//! caps that keep a single search bounded regardless of pool parameters. Loaded from
//! JSON, overridden from the environment, validated before use.
//!
//! ## Integration Points
//!
//! - **Input Sources**: JSON configuration files, `GRID_SWAP_*` environment variables
//! - **Output Destinations**: [`crate::search::PairSearch`]
//! - **Validation**: `validate()` rejects budgets the exponent window cannot represent
//!
//! ## Performance Profile
//!
//! - **Loading Speed**: <1ms for parsing and validation
//! - **Memory Usage**: a handful of integers, `Copy`

use serde::{Deserialize, Serialize};

/// Largest multiplication budget; keeps the exponent window within `±2^24`
pub const MAX_MULTIPLICATION_BUDGET: u32 = 24;

/// Limits for one pair search
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    /// Maximum combined proof cost of the two exponents
    pub multiplication_budget: u32,
    /// Maximum number of exponent pairs taken off the queue
    pub max_iterations: usize,
    /// Maximum candidate amounts examined by one imperfect scan
    pub max_scan_steps: u64,
    /// Pairs whose value-equation coefficients are wider than this are infeasible
    pub max_integer_bits: Option<u64>,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            multiplication_budget: 8,
            max_iterations: 1_000_000,
            max_scan_steps: 100_000,
            max_integer_bits: None, // arbitrary precision
        }
    }
}

impl SearchConfig {
    /// Default limits with a different multiplication budget
    pub fn with_budget(multiplication_budget: u32) -> Self {
        Self {
            multiplication_budget,
            ..Self::default()
        }
    }

    /// Load configuration from a JSON file
    pub fn from_file(path: &str) -> anyhow::Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&contents)?;
        Ok(config)
    }

    /// Load configuration from environment variables with defaults
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(budget) = std::env::var("GRID_SWAP_MULTIPLICATION_BUDGET") {
            if let Ok(value) = budget.parse::<u32>() {
                config.multiplication_budget = value;
            }
        }

        if let Ok(iterations) = std::env::var("GRID_SWAP_MAX_ITERATIONS") {
            if let Ok(value) = iterations.parse::<usize>() {
                config.max_iterations = value;
            }
        }

        if let Ok(steps) = std::env::var("GRID_SWAP_MAX_SCAN_STEPS") {
            if let Ok(value) = steps.parse::<u64>() {
                config.max_scan_steps = value;
            }
        }

        if let Ok(bits) = std::env::var("GRID_SWAP_MAX_INTEGER_BITS") {
            match bits.trim() {
                "" | "none" => config.max_integer_bits = None,
                other => {
                    if let Ok(value) = other.parse::<u64>() {
                        config.max_integer_bits = Some(value);
                    }
                }
            }
        }

        config
    }

    /// Save configuration to a JSON file
    pub fn save_to_file(&self, path: &str) -> anyhow::Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        Ok(())
    }

    /// Validate configuration parameters
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.multiplication_budget > MAX_MULTIPLICATION_BUDGET {
            anyhow::bail!(
                "multiplication_budget must be <= {}",
                MAX_MULTIPLICATION_BUDGET
            );
        }

        if self.max_iterations == 0 {
            anyhow::bail!("max_iterations must be positive");
        }

        if self.max_scan_steps == 0 {
            anyhow::bail!("max_scan_steps must be positive");
        }

        if self.max_integer_bits == Some(0) {
            anyhow::bail!("max_integer_bits must be positive when set");
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_validation() {
        let config = SearchConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.multiplication_budget, 8);
    }

    #[test]
    fn test_validation_rejects_bad_limits() {
        let config = SearchConfig::with_budget(MAX_MULTIPLICATION_BUDGET + 1);
        assert!(config.validate().is_err());

        let config = SearchConfig {
            max_iterations: 0,
            ..SearchConfig::default()
        };
        assert!(config.validate().is_err());

        let config = SearchConfig {
            max_integer_bits: Some(0),
            ..SearchConfig::default()
        };
        assert!(config.validate().is_err());

        assert!(SearchConfig::with_budget(MAX_MULTIPLICATION_BUDGET)
            .validate()
            .is_ok());
    }

    #[test]
    fn test_config_file_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("search.json");
        let path = path.to_str().unwrap();

        let config = SearchConfig {
            multiplication_budget: 12,
            max_integer_bits: Some(4096),
            ..SearchConfig::default()
        };
        config.save_to_file(path).unwrap();

        assert_eq!(SearchConfig::from_file(path).unwrap(), config);
    }

    #[test]
    fn test_partial_file_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("partial.json");
        std::fs::write(&path, r#"{ "multiplication_budget": 5 }"#).unwrap();

        let config = SearchConfig::from_file(path.to_str().unwrap()).unwrap();
        assert_eq!(config.multiplication_budget, 5);
        assert_eq!(config.max_iterations, 1_000_000);
        assert_eq!(config.max_integer_bits, None);
    }

    #[test]
    fn test_missing_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("absent.json");
        assert!(SearchConfig::from_file(path.to_str().unwrap()).is_err());
    }

    #[test]
    fn test_env_override() {
        std::env::set_var("GRID_SWAP_MULTIPLICATION_BUDGET", "10");
        std::env::set_var("GRID_SWAP_MAX_SCAN_STEPS", "not-a-number");
        std::env::set_var("GRID_SWAP_MAX_INTEGER_BITS", "2048");

        let config = SearchConfig::from_env();

        assert_eq!(config.multiplication_budget, 10);
        assert_eq!(config.max_scan_steps, 100_000);
        assert_eq!(config.max_integer_bits, Some(2048));

        // Cleanup
        std::env::remove_var("GRID_SWAP_MULTIPLICATION_BUDGET");
        std::env::remove_var("GRID_SWAP_MAX_SCAN_STEPS");
        std::env::remove_var("GRID_SWAP_MAX_INTEGER_BITS");
    }
}
