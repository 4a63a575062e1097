use clap::Parser;

use gridstar::config::{Config, InputModule, SolverKind};
use gridstar::driver::Driver;
use gridstar::error::GridstarError;
use gridstar::grid::Grid;
use gridstar::map_source::{MapSource, RandomMapSource, WallsDemoMapSource};

/// Default neighbour-bit fill probability for `RandomMapSource`.
const RANDOM_FILL_PROBABILITY: f64 = 0.75;

fn main() {
    let config = Config::parse();

    if let Err(e) = config.validate() {
        eprintln!("{e}");
        std::process::exit(1);
    }

    if !config.quiet {
        println!("Starting pathfinding query...");
        println!("Grid size: {}x{}", config.width, config.height);
        println!("Input module: {:?}", config.input_module);
        println!("Solver: {:?}", config.solver);
        if matches!(config.solver, SolverKind::Parallel | SolverKind::Both) {
            println!("Batch width: {}", config.batch_width);
        }
        println!();
    }

    match run(&config) {
        Ok(exit_code) => std::process::exit(exit_code),
        Err(e) => {
            // Configuration/invariant errors are fatal; capacity/device
            // errors would otherwise let the driver move on to the next
            // query, but this CLI only ever runs one.
            eprintln!("{e}{}", if e.is_fatal() { " (fatal)" } else { "" });
            std::process::exit(1);
        }
    }
}

/// Builds the grid from the selected map source, runs the configured
/// solver(s), and prints the report. Returns the process exit code:
/// 0 on a completed query, non-zero on a cross-solver mismatch.
fn run(config: &Config) -> Result<i32, GridstarError> {
    let mut grid = Grid::empty(config.width, config.height);

    let (start, target) = match config.input_module {
        InputModule::Random => {
            let mut source =
                RandomMapSource::new(config.width, config.height, config.seed, RANDOM_FILL_PROBABILITY);
            source.generate(&mut grid);
            (source.start(), source.target())
        }
        InputModule::WallsDemo => {
            let mut source = WallsDemoMapSource;
            source.generate(&mut grid);
            (source.start(), source.target())
        }
    };

    if !config.quiet {
        println!("Start: ({}, {}), Target: ({}, {})", start.x, start.y, target.x, target.y);
        println!();
    }

    let driver = Driver::new(config.solver, config.batch_width);
    let report = driver.run(&grid, start, target)?;

    println!("{report}");

    Ok(if report.mismatch { 1 } else { 0 })
}
