//! Configuration system for Vigil.
//! TOML-based, layered resolution: CLI > env > project > user > defaults.

pub mod engine_config;
pub mod scan_config;
pub mod vigil_config;

pub use engine_config::{EngineConfig, RunMode};
pub use scan_config::ScanConfig;
pub use vigil_config::{CliOverrides, VigilConfig};
