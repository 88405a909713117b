pub mod adapters;
pub mod config;
pub mod core;
pub mod domain;
pub mod utils;

#[cfg(feature = "cli")]
pub use config::CliConfig;
pub use config::{cli::LocalStorage, toml_config::TomlConfig};

pub use adapters::{lighthouse_cli::LighthouseCli, pagespeed::PageSpeedApi, AnyAuditor, AuditorSettings};
pub use core::{engine::BatchEngine, engine::BatchSummary, reducer::ScoreMethod};
pub use utils::error::{BatchError, Result};
