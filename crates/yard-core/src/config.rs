//! yardgrid.toml configuration parser.

use std::path::{Path, PathBuf};

use anyhow::{bail, ensure};
use serde::{Deserialize, Serialize};

use crate::types::YardConfig;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct YardgridConfig {
    pub yard: YardConfig,
    pub placement: PlacementConfig,
    pub reoptimize: ReoptimizeConfig,
    pub learning: LearningConfig,
    pub metrics: MetricsConfig,
    pub logging: LoggingConfig,
}

/// Weights of the default placement heuristic.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlacementConfig {
    pub height_penalty: f64,
    pub support_bonus: f64,
    pub overdue_penalty: f64,
}

impl Default for PlacementConfig {
    fn default() -> Self {
        Self {
            height_penalty: 10.0,
            support_bonus: 5.0,
            overdue_penalty: 3.0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ReoptimizeConfig {
    pub interval_secs: u64,
}

impl Default for ReoptimizeConfig {
    fn default() -> Self {
        Self { interval_secs: 300 }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LearningConfig {
    pub enabled: bool,
    pub buffer_capacity: usize,
    pub batch_size: usize,
    pub train_interval_secs: u64,
    pub learning_rate: f64,
    pub epsilon_start: f64,
    pub epsilon_decay: f64,
    pub epsilon_min: f64,
    /// A prediction within this distance of the outcome counts as accurate.
    pub accuracy_tolerance: f64,
    pub seed: u64,
    pub model_path: Option<PathBuf>,
}

impl Default for LearningConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            buffer_capacity: 10_000,
            batch_size: 32,
            train_interval_secs: 60,
            learning_rate: 0.01,
            epsilon_start: 1.0,
            epsilon_decay: 0.995,
            epsilon_min: 0.01,
            accuracy_tolerance: 1.0,
            seed: 42,
            model_path: None,
        }
    }
}

/// How crane energy is derived from the moves of a pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EnergyMode {
    /// moved containers × crane_energy_consumption
    #[default]
    PerMove,
    /// total distance × energy_consumption_rate
    PerDistance,
}

/// Metrics parameters, including the fixed ratios behind the
/// baseline-comparison estimate.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MetricsConfig {
    pub energy_mode: EnergyMode,
    pub storage_rate_per_day: f64,
    pub baseline_moves_per_container: f64,
    pub optimized_move_ratio: f64,
    pub cost_per_move: f64,
    pub carbon_per_move: f64,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            energy_mode: EnergyMode::PerMove,
            storage_rate_per_day: 1.0,
            baseline_moves_per_container: 1.5,
            optimized_move_ratio: 0.8,
            cost_per_move: 10.0,
            carbon_per_move: 5.0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

impl YardgridConfig {
    pub fn from_file(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> anyhow::Result<Self> {
        let config: YardgridConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_toml_string(&self) -> anyhow::Result<String> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Reject configurations the yard cannot operate with.
    pub fn validate(&self) -> anyhow::Result<()> {
        let yard = &self.yard;
        if yard.length == 0 || yard.width == 0 || yard.height == 0 {
            bail!(
                "yard dimensions must be non-zero, got {}x{}x{}",
                yard.length,
                yard.width,
                yard.height
            );
        }
        ensure!(
            yard.max_weight_per_stack > 0.0,
            "max_weight_per_stack must be positive"
        );
        ensure!(yard.crane_speed > 0.0, "crane_speed must be positive");

        let learning = &self.learning;
        ensure!(learning.batch_size > 0, "learning.batch_size must be positive");
        ensure!(
            learning.buffer_capacity > 0,
            "learning.buffer_capacity must be positive"
        );
        for (name, value) in [
            ("epsilon_start", learning.epsilon_start),
            ("epsilon_decay", learning.epsilon_decay),
            ("epsilon_min", learning.epsilon_min),
        ] {
            ensure!(
                (0.0..=1.0).contains(&value),
                "learning.{name} must be within [0, 1], got {value}"
            );
        }
        ensure!(
            learning.epsilon_min <= learning.epsilon_start,
            "learning.epsilon_min must not exceed epsilon_start"
        );

        ensure!(
            (0.0..=1.0).contains(&self.metrics.optimized_move_ratio),
            "metrics.optimized_move_ratio must be within [0, 1]"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Position;

    #[test]
    fn test_defaults_match_reference_yard() {
        let config = YardgridConfig::default();
        assert_eq!(config.yard.length, 10);
        assert_eq!(config.yard.height, 5);
        assert_eq!(config.reoptimize.interval_secs, 300);
        assert_eq!(config.learning.batch_size, 32);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_parse_partial() {
        let toml_str = r#"
[yard]
length = 5
width = 5
height = 3
max_weight_per_stack = 5000.0

[metrics]
energy_mode = "per_distance"
"#;
        let config = YardgridConfig::from_toml_str(toml_str).unwrap();
        assert_eq!(config.yard.total_cells(), 75);
        assert_eq!(config.yard.crane_speed, 2.0);
        assert_eq!(config.metrics.energy_mode, EnergyMode::PerDistance);
        assert_eq!(config.placement, PlacementConfig::default());
        assert!(config.yard.contains(&Position::new(4, 4, 2)));
    }

    #[test]
    fn test_rejects_zero_dimension() {
        let toml_str = r#"
[yard]
height = 0
"#;
        assert!(YardgridConfig::from_toml_str(toml_str).is_err());
    }

    #[test]
    fn test_rejects_bad_epsilon_schedule() {
        let mut config = YardgridConfig::default();
        config.learning.epsilon_decay = 1.5;
        assert!(config.validate().is_err());

        let mut config = YardgridConfig::default();
        config.learning.epsilon_min = 0.5;
        config.learning.epsilon_start = 0.1;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_toml_roundtrip() {
        let config = YardgridConfig::default();
        let rendered = config.to_toml_string().unwrap();
        assert!(rendered.contains("max_weight_per_stack"));
        let parsed = YardgridConfig::from_toml_str(&rendered).unwrap();
        assert_eq!(parsed.yard, config.yard);
    }
}
