/// Command-line interface and run orchestration
pub mod cli;
/// Runtime constants and the YAML run configuration
pub mod configuration;
/// Error taxonomy and result alias
pub mod error;
/// Run document streaming and snapshot persistence
pub mod output;
/// Terminal progress display
pub mod progress;
