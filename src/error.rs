//! Errors of the optimization driver.

use evorobo_core::physics::RunnerError;
use evorobo_io::IoError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum EaError {
    /// The database does not hold a resumable run for this process.
    #[error("Incompatible database: {0}")]
    Incompatible(String),

    #[error(transparent)]
    Io(#[from] IoError),

    #[error("Simulation failed: {0}")]
    Simulation(#[from] RunnerError),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl EaError {
    #[must_use]
    pub fn incompatible<S: Into<String>>(msg: S) -> Self {
        Self::Incompatible(msg.into())
    }

    #[must_use]
    pub fn serialization<S: Into<String>>(msg: S) -> Self {
        Self::Serialization(msg.into())
    }
}

impl From<rusqlite::Error> for EaError {
    fn from(e: rusqlite::Error) -> Self {
        Self::Io(IoError::from(e))
    }
}

pub type Result<T> = std::result::Result<T, EaError>;
