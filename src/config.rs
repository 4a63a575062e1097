use clap::{Parser, ValueEnum};

use crate::error::GridstarError;

/// Which map source fills the grid's connectivity masks.
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
#[value(rename_all = "kebab-case")]
pub enum InputModule {
    /// Randomly enabled neighbour bits at a fixed fill probability.
    Random,
    /// A fixed demo grid with a vertical wall.
    WallsDemo,
}

/// Which solver(s) to run.
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
#[value(rename_all = "kebab-case")]
pub enum SolverKind {
    Sequential,
    Parallel,
    Both,
}

#[derive(Parser, Debug, Clone)]
#[command(author, version, about = "Sequential and parallel A* over 8-connected grids", long_about = None)]
pub struct Config {
    #[arg(long, default_value_t = 20)]
    pub width: usize,

    #[arg(long, default_value_t = 20)]
    pub height: usize,

    #[arg(long, value_enum, default_value_t = InputModule::Random)]
    pub input_module: InputModule,

    /// Batch width K: number of open-set entries the parallel solver
    /// extracts per round.
    #[arg(long, default_value_t = 32)]
    pub batch_width: usize,

    /// Seed for deterministic map sources. Unset means an OS-seeded RNG.
    #[arg(long)]
    pub seed: Option<u64>,

    #[arg(long, value_enum, default_value_t = SolverKind::Both)]
    pub solver: SolverKind,

    #[arg(long, default_value_t = false)]
    pub quiet: bool,
}

impl Config {
    /// Validates dimensions and batch width. Missing/invalid width or
    /// height is a fatal configuration error.
    pub fn validate(&self) -> Result<(), GridstarError> {
        if self.width == 0 || self.height == 0 {
            return Err(GridstarError::Configuration(format!(
                "width and height must both be > 0, got {}x{}",
                self.width, self.height
            )));
        }
        if self.width.checked_mul(self.height).is_none() {
            return Err(GridstarError::Configuration(format!(
                "grid {}x{} overflows cell id space",
                self.width, self.height
            )));
        }
        if self.batch_width == 0 {
            return Err(GridstarError::Configuration(
                "batch-width must be >= 1".to_string(),
            ));
        }
        if self.input_module == InputModule::WallsDemo && (self.width, self.height) != (4, 4) {
            return Err(GridstarError::Configuration(format!(
                "input-module walls-demo requires a 4x4 grid, got {}x{}",
                self.width, self.height
            )));
        }
        Ok(())
    }
}
