//! Command-line interface for running configured simulations

use crate::engine::sim::KmcEngine;
use crate::io::configuration::{Config, DEFAULT_VALIDATE_EVERY, ModeConfig, ZOBRIST_SEED_SALT};
use crate::io::error::{KmcError, Result};
use crate::io::output::{RunWriter, save_snapshot};
use crate::io::progress::ProgressDisplay;
use crate::state::Lattice;
use clap::Parser;
use rand::{SeedableRng, rngs::StdRng};
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "hexkmc")]
#[command(
    author,
    version,
    about = "Kinetic Monte Carlo simulation of point defects on a hexagonal lattice"
)]
/// Command-line arguments for the simulation tool
// CLI tools commonly need multiple boolean flags for various features and user preferences
#[allow(clippy::struct_excessive_bools)]
pub struct Cli {
    /// YAML run configuration file
    #[arg(value_name = "CONFIG")]
    pub config: PathBuf,

    /// Lattice dimensions as A,Z (overrides the config)
    #[arg(short, long, value_name = "A,Z", value_delimiter = ',')]
    pub dimensions: Option<Vec<usize>>,

    /// Number of steps to attempt (overrides the config)
    #[arg(short, long)]
    pub steps: Option<u64>,

    /// Random seed for a reproducible run (overrides the config)
    #[arg(long)]
    pub seed: Option<u64>,

    /// Rebuild move caches from scratch every step
    #[arg(short, long)]
    pub full: bool,

    /// Run the expensive self-check every N steps (0 disables)
    #[arg(long, value_name = "N", default_value_t = DEFAULT_VALIDATE_EVERY)]
    pub validate_every: u64,

    /// Run document path (defaults to <config>_run.json)
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Write the final state snapshot here
    #[arg(long)]
    pub snapshot: Option<PathBuf>,

    /// Suppress progress output
    #[arg(short, long)]
    pub quiet: bool,

    /// Track the state fingerprint and record it with every step
    #[arg(long)]
    pub fingerprint: bool,
}

impl Cli {
    /// Check if progress should be displayed
    pub const fn should_show_progress(&self) -> bool {
        !self.quiet
    }
}

/// Drives one configured run end to end
pub struct SimulationRunner {
    cli: Cli,
}

impl SimulationRunner {
    /// Create a runner from parsed arguments
    pub const fn new(cli: Cli) -> Self {
        Self { cli }
    }

    /// Load the configuration, run the simulation and write the outputs
    ///
    /// Exhaustion of eligible moves ends the run cleanly before the step
    /// budget; every other error aborts it.
    ///
    /// # Errors
    ///
    /// Returns an error for invalid configuration, a failed self-check, or
    /// any file system failure.
    pub fn run(&self) -> Result<()> {
        let mut config = Config::load(&self.cli.config)?;
        self.apply_overrides(&mut config)?;

        let seed = config.seed;
        let mut state = config.build_state(&mut StdRng::seed_from_u64(seed))?;
        if self.cli.fingerprint {
            state.enable_fingerprint(seed ^ ZOBRIST_SEED_SALT);
        }

        let lattice = Lattice::new(config.lattice.dim);
        let mode = if self.cli.full {
            ModeConfig::Full.update_mode()
        } else {
            config.mode.update_mode()
        };
        let mut engine = KmcEngine::new(state, config.build_rules()?, mode, seed)?;

        let output_path = self
            .cli
            .output
            .clone()
            .unwrap_or_else(|| default_output_path(&self.cli.config));
        let mut writer = RunWriter::create(&output_path, &lattice)?;
        let progress = self.cli.should_show_progress().then(|| {
            ProgressDisplay::new(config.steps)
        });

        let mut exhausted = false;
        for _ in 0..config.steps {
            match engine.perform_random_move() {
                Ok(record) => {
                    writer.record(&record)?;
                    if let Some(ref bar) = progress {
                        bar.step();
                    }
                }
                Err(err) if err.is_exhaustion() => {
                    tracing::info!(step = engine.step(), "run ended: no eligible moves remain");
                    exhausted = true;
                    break;
                }
                Err(err) => return Err(err),
            }
            if self.cli.validate_every > 0 && engine.step() % self.cli.validate_every == 0 {
                engine.validate()?;
            }
        }
        writer.finish()?;

        if let Some(path) = &self.cli.snapshot {
            save_snapshot(path, &engine.state().snapshot())?;
        }
        if let Some(bar) = progress {
            if exhausted {
                bar.finish_exhausted();
            } else {
                bar.finish();
            }
        }
        Ok(())
    }

    fn apply_overrides(&self, config: &mut Config) -> Result<()> {
        if let Some(dims) = &self.cli.dimensions {
            let [a, z] = dims.as_slice() else {
                return Err(KmcError::Config {
                    reason: format!("--dimensions takes exactly two values, got {}", dims.len()),
                });
            };
            if *a < 1 || *z < 1 {
                return Err(KmcError::Config {
                    reason: format!("lattice dimensions must be >= 1, got [{a}, {z}]"),
                });
            }
            config.lattice.dim = [*a, *z];
        }
        if let Some(steps) = self.cli.steps {
            config.steps = steps;
        }
        if let Some(seed) = self.cli.seed {
            config.seed = seed;
        }
        Ok(())
    }
}

fn default_output_path(config_path: &Path) -> PathBuf {
    let stem = config_path.file_stem().unwrap_or_default();
    let output_name = format!("{}_run.json", stem.to_string_lossy());

    if let Some(parent) = config_path.parent() {
        parent.join(output_name)
    } else {
        PathBuf::from(output_name)
    }
}
