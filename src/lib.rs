pub mod adapters;
pub mod app;
pub mod config;
pub mod core;
pub mod domain;
pub mod export;
pub mod utils;

#[cfg(feature = "cli")]
pub use config::CliConfig;
pub use config::{LocalStorage, TomlConfig};

pub use app::pipelines::ReportPipeline;
pub use core::engine::{ReportEngine, RunOutcome};
pub use utils::error::{ReportError, Result};
