// Public modules
pub mod action;
pub mod artifacts;
pub mod config;
pub mod context;
pub mod display;
pub mod error;
pub mod executor;
pub mod files;
pub mod paths;
pub mod phases;
pub mod pipeline;
pub mod runner;

// Internal modules - not part of public API
pub(crate) mod http;

// Re-export common types for convenience
pub use config::{PipelineConfig, TimeoutPolicy};
pub use context::RunContext;
pub use error::{Error, ErrorCode, Result};
pub use executor::{ActionExecutor, ActionResult, LocalExecutor};
pub use phases::{Phase, PhasePlan};
pub use runner::RunReport;
