use thiserror::Error;

/// Error kinds surfaced by the grid model, solvers, and driver.
///
/// `Configuration` and `Invariant` are fatal: the process prints the
/// diagnostic and exits. `Capacity` and `Device` propagate to the
/// `Driver`, which aborts the current query but may continue with the
/// next one.
#[derive(Debug, Error)]
pub enum GridstarError {
    #[error("configuration error: {0}")]
    Configuration(String),

    #[error("capacity exceeded: {0}")]
    Capacity(String),

    #[error("device error: {0}")]
    Device(String),

    #[error("invariant violated: {0}")]
    Invariant(String),
}

impl GridstarError {
    /// `Configuration` and `Invariant` kinds terminate the whole
    /// process; `Capacity` and `Device` are recoverable per-query.
    pub fn is_fatal(&self) -> bool {
        matches!(self, GridstarError::Configuration(_) | GridstarError::Invariant(_))
    }
}
