use std::{io, path::PathBuf};

use pinsim_sweep::SweepError;
use thiserror::Error;

use crate::pin::PinId;

/// Errors raised while constructing a dataset-backed provider.
#[derive(Debug, Error)]
pub enum ProviderError {
    /// The sweep could not be loaded or does not hold the requested output.
    #[error(transparent)]
    Sweep(#[from] SweepError),

    /// The number of bound input pins differs from the sweep's dimensionality.
    #[error("sweep has {expected} swept dimension(s), but {actual} input pin(s) were bound")]
    Arity { expected: usize, actual: usize },
}

/// The broad category of a [`ProviderError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// The dataset location does not exist.
    NotFound,
    /// No run matches the experiment name and run id.
    NamedLookup,
    /// The bound pin count does not match the sweep's dimensionality.
    Arity,
    /// The requested output parameter was not recorded.
    Key,
    /// Any other storage or data failure.
    Storage,
}

impl ProviderError {
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Arity { .. } => ErrorKind::Arity,
            Self::Sweep(SweepError::NotFound { .. }) => ErrorKind::NotFound,
            Self::Sweep(SweepError::RunNotFound { .. }) => ErrorKind::NamedLookup,
            Self::Sweep(SweepError::UnknownOutput { .. }) => ErrorKind::Key,
            Self::Sweep(_) => ErrorKind::Storage,
        }
    }
}

/// Errors raised when wiring providers into a [`Circuit`](crate::Circuit).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CircuitError {
    /// The pin id was not issued by this circuit.
    #[error("{0} does not belong to this circuit")]
    UnknownPin(PinId),

    /// Attaching the provider would make the pin depend on itself.
    #[error("attaching a provider to {pin} would create a cycle through {through}")]
    Cycle { pin: PinId, through: PinId },
}

/// Errors raised while reading or building a [`CircuitConfig`](crate::CircuitConfig).
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read circuit config {}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("invalid circuit config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("pin `{0}` is referenced but not declared")]
    UnknownPin(String),

    #[error("pin `{0}` is declared more than once")]
    DuplicatePin(String),

    #[error("provider for pin `{pin}` could not be created")]
    Provider {
        pin: String,
        #[source]
        source: ProviderError,
    },

    #[error(transparent)]
    Circuit(#[from] CircuitError),
}
