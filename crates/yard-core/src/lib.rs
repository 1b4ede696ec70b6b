pub mod config;
pub mod types;

pub use config::{
    EnergyMode, LearningConfig, LoggingConfig, MetricsConfig, PlacementConfig, ReoptimizeConfig, YardgridConfig,
};
pub use types::*;
