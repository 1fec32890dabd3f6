//! CLI command implementations.

mod config;
mod inspect;
mod run;

pub use config::ConfigCmd;
pub use inspect::InspectCmd;
pub use run::RunCmd;
