//! CLI command handlers. Each command is in its own file.

mod config;
mod drive;
mod fetch;
mod learn;
mod plan;
mod prefetch;

pub use config::run_config;
pub use drive::CapOverrides;
pub use fetch::run_fetch;
pub use learn::run_learn;
pub use plan::run_plan;
pub use prefetch::run_prefetch;
