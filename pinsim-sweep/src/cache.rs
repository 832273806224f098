use std::{
    collections::HashMap,
    path::{Path, PathBuf},
    rc::Rc,
};

use tracing::debug;

use crate::{dataset::SweepDataset, error::SweepError, store::SweepStore};

/// Identifies one recorded run: where it is stored and how it is named.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct SweepKey {
    path: PathBuf,
    experiment: String,
    run_id: i64,
}

/// Loads each sweep at most once and shares it between its users.
///
/// Sweeps are immutable once loaded, so every caller asking for the same
/// `(path, experiment, run_id)` receives the same [`Rc`].
/// Failed loads are not remembered.
#[derive(Debug, Default)]
pub struct SweepCache {
    sweeps: HashMap<SweepKey, Rc<SweepDataset>>,
}

impl SweepCache {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the cached sweep for this run, loading it on first use.
    ///
    /// # Errors
    ///
    /// Returns any [`SweepError`] raised by [`SweepStore::open`] or [`SweepStore::load`].
    pub fn get_or_load(
        &mut self,
        path: impl AsRef<Path>,
        experiment: &str,
        run_id: i64,
    ) -> Result<Rc<SweepDataset>, SweepError> {
        let key = SweepKey {
            path: path.as_ref().to_path_buf(),
            experiment: experiment.to_owned(),
            run_id,
        };

        if let Some(sweep) = self.sweeps.get(&key) {
            debug!(path = %key.path.display(), experiment, run_id, "sweep cache hit");
            return Ok(Rc::clone(sweep));
        }

        let sweep = Rc::new(SweepStore::open(&key.path)?.load(experiment, run_id)?);
        self.sweeps.insert(key, Rc::clone(&sweep));
        Ok(sweep)
    }

    /// Returns the number of sweeps held.
    #[must_use]
    pub fn len(&self) -> usize {
        self.sweeps.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.sweeps.is_empty()
    }
}
