//! Variation parameters for the CPPN genotype encoding.
//!
//! The defaults apply unless the experiment TOML file carries a `[mutation]`
//! section; missing keys keep their defaults:
//!
//! ```toml
//! [mutation]
//! weight_rate = 0.8
//! weight_power = 0.5
//! add_connection_prob = 0.1
//! ```

use serde::{Deserialize, Serialize};

/// Probabilities and magnitudes applied by one call to `mutate`.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct MutationConfig {
    /// Per-connection chance of a weight perturbation.
    pub weight_rate: f64,
    /// Half-width of the uniform weight perturbation.
    pub weight_power: f64,
    /// Chance that a perturbed weight is replaced instead of shifted.
    pub weight_replace_prob: f64,
    pub max_weight: f64,
    pub add_connection_prob: f64,
    pub add_node_prob: f64,
    pub toggle_enable_prob: f64,
    pub activation_change_prob: f64,
    /// Attempts at finding a new acyclic connection before giving up.
    pub add_connection_tries: usize,
}

impl Default for MutationConfig {
    fn default() -> Self {
        Self {
            weight_rate: 0.8,
            weight_power: 0.5,
            weight_replace_prob: 0.1,
            max_weight: 8.0,
            add_connection_prob: 0.15,
            add_node_prob: 0.05,
            toggle_enable_prob: 0.03,
            activation_change_prob: 0.03,
            add_connection_tries: 20,
        }
    }
}

impl MutationConfig {
    /// Validates all parameters.
    pub fn validate(&self) -> anyhow::Result<()> {
        for (name, p) in [
            ("weight_rate", self.weight_rate),
            ("weight_replace_prob", self.weight_replace_prob),
            ("add_connection_prob", self.add_connection_prob),
            ("add_node_prob", self.add_node_prob),
            ("toggle_enable_prob", self.toggle_enable_prob),
            ("activation_change_prob", self.activation_change_prob),
        ] {
            anyhow::ensure!((0.0..=1.0).contains(&p), "{name} must be in [0, 1]");
        }
        anyhow::ensure!(self.weight_power > 0.0, "weight_power must be positive");
        anyhow::ensure!(self.max_weight > 0.0, "max_weight must be positive");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_valid() {
        MutationConfig::default().validate().unwrap();
    }

    #[test]
    fn test_rejects_out_of_range_probability() {
        let config = MutationConfig {
            add_node_prob: 1.5,
            ..MutationConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_partial_config_uses_defaults() {
        let config: MutationConfig = serde_json::from_str(r#"{"weight_rate": 0.2}"#).unwrap();
        assert_eq!(config.weight_rate, 0.2);
        assert_eq!(config.add_connection_tries, 20);
    }
}
