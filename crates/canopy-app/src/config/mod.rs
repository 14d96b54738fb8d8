//! Configuration file parsing for Canopy
//!
//! Supports `.canopy/config.toml` - global settings.

pub mod settings;
pub mod types;

pub use settings::{init_config_dir, load_settings, save_settings};
pub use types::*;
