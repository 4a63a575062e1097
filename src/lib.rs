//! Sequential and data-parallel A* over 8-connected grids.
//!
//! See the module docs on [`grid`], [`solver::sequential`], and
//! [`solver::parallel`] for the core engine; [`map_source`] and
//! [`driver`] wire it up to an external grid producer and a
//! cross-solver comparison.

pub mod config;
pub mod driver;
pub mod error;
pub mod grid;
pub mod heuristic;
pub mod map_source;
pub mod solver;
