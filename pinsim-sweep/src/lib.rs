mod cache;
mod dataset;
mod error;
#[cfg(any(test, feature = "fixtures"))]
pub mod fixtures;
mod nearest;
mod store;

pub use cache::SweepCache;
pub use dataset::SweepDataset;
pub use error::SweepError;
pub use nearest::nearest_index;
pub use store::{RunInfo, SweepStore};
