//! CLI entry point for the hexagonal-lattice defect simulator

use clap::Parser;
use hexkmc::io::cli::{Cli, SimulationRunner};
use tracing_subscriber::EnvFilter;

fn main() -> hexkmc::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    SimulationRunner::new(cli).run()
}
