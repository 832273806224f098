mod circuit;
mod config;
mod error;
mod pin;
mod provider;

pub use circuit::Circuit;
pub use config::{CircuitConfig, PinConfig, ProviderConfig};
pub use error::{CircuitError, ConfigError, ErrorKind, ProviderError};
pub use pin::{Pin, PinId};
pub use provider::{
    DataProvider, DatasetDataProvider, PassthroughDataProvider, StaticDataProvider,
};

pub use pinsim_sweep::{SweepCache, SweepDataset, SweepError};
