use std::{path::Path, rc::Rc};

use pinsim_sweep::{SweepCache, SweepDataset, SweepStore};

use crate::{circuit::Circuit, error::ProviderError, pin::PinId};

/// Supplies a pin's value whenever it is read.
///
/// Providers are evaluated against the [`Circuit`] that owns the pin, so a
/// provider may read other pins of that circuit.
/// Nothing is cached: every read recomputes the value from the current state.
#[derive(Debug, Clone, PartialEq)]
pub enum DataProvider {
    Static(StaticDataProvider),
    Passthrough(PassthroughDataProvider),
    Dataset(DatasetDataProvider),
}

impl DataProvider {
    /// Computes the provider's current value.
    #[must_use]
    pub fn evaluate(&self, circuit: &Circuit) -> f64 {
        match self {
            Self::Static(provider) => provider.constant(),
            Self::Passthrough(provider) => circuit.value(provider.source()),
            Self::Dataset(provider) => provider.lookup(circuit),
        }
    }

    /// Returns the pins this provider reads when evaluated.
    #[must_use]
    pub fn sources(&self) -> &[PinId] {
        match self {
            Self::Static(_) => &[],
            Self::Passthrough(provider) => std::slice::from_ref(&provider.source),
            Self::Dataset(provider) => &provider.inputs,
        }
    }
}

impl From<StaticDataProvider> for DataProvider {
    fn from(provider: StaticDataProvider) -> Self {
        Self::Static(provider)
    }
}

impl From<PassthroughDataProvider> for DataProvider {
    fn from(provider: PassthroughDataProvider) -> Self {
        Self::Passthrough(provider)
    }
}

impl From<DatasetDataProvider> for DataProvider {
    fn from(provider: DatasetDataProvider) -> Self {
        Self::Dataset(provider)
    }
}

/// Always returns the same value.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StaticDataProvider {
    constant: f64,
}

impl StaticDataProvider {
    #[must_use]
    pub fn new(constant: f64) -> Self {
        Self { constant }
    }

    #[must_use]
    pub fn constant(&self) -> f64 {
        self.constant
    }
}

/// Mirrors the current value of another pin.
///
/// Writes to a pin driven by a passthrough are forwarded to the source pin,
/// see [`Circuit::set_value`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PassthroughDataProvider {
    source: PinId,
}

impl PassthroughDataProvider {
    #[must_use]
    pub fn new(source: PinId) -> Self {
        Self { source }
    }

    #[must_use]
    pub fn source(&self) -> PinId {
        self.source
    }
}

/// Looks up the recorded sample nearest to the current values of its input pins.
///
/// Input pins are bound positionally: the first pin drives the sweep's first
/// axis, and so on. The bindings and the selected output column are checked
/// once, at construction, so evaluation never fails.
#[derive(Debug, Clone, PartialEq)]
pub struct DatasetDataProvider {
    inputs: Vec<PinId>,
    sweep: Rc<SweepDataset>,
    output: usize,
}

impl DatasetDataProvider {
    /// Binds `inputs` to an already loaded sweep.
    ///
    /// When `output` is `None`, the sweep's first stored output parameter is used.
    ///
    /// # Errors
    ///
    /// - [`ProviderError::Arity`] if `inputs.len()` differs from the sweep's dimensions.
    /// - [`ProviderError::Sweep`] with [`SweepError::UnknownOutput`](pinsim_sweep::SweepError::UnknownOutput)
    ///   if `output` names a parameter the sweep did not record.
    pub fn new(
        inputs: Vec<PinId>,
        sweep: Rc<SweepDataset>,
        output: Option<&str>,
    ) -> Result<Self, ProviderError> {
        if inputs.len() != sweep.dimensions() {
            return Err(ProviderError::Arity {
                expected: sweep.dimensions(),
                actual: inputs.len(),
            });
        }

        let output = match output {
            Some(name) => sweep.output_index(name)?,
            None => sweep.default_output(),
        };

        Ok(Self {
            inputs,
            sweep,
            output,
        })
    }

    /// Loads run `run_id` of `experiment` from the store at `path` and binds `inputs` to it.
    ///
    /// # Errors
    ///
    /// Returns a [`ProviderError`] if the store or run cannot be found, if the
    /// bindings do not match the sweep, or if `output` is unknown.
    /// Use [`ProviderError::kind`] to tell these apart.
    pub fn load(
        inputs: Vec<PinId>,
        path: impl AsRef<Path>,
        experiment: &str,
        run_id: i64,
        output: Option<&str>,
    ) -> Result<Self, ProviderError> {
        let sweep = SweepStore::open(path)?.load(experiment, run_id)?;
        Self::new(inputs, Rc::new(sweep), output)
    }

    /// Like [`Self::load`], but shares the sweep through `cache`.
    ///
    /// # Errors
    ///
    /// Same as [`Self::load`].
    pub fn from_cache(
        cache: &mut SweepCache,
        inputs: Vec<PinId>,
        path: impl AsRef<Path>,
        experiment: &str,
        run_id: i64,
        output: Option<&str>,
    ) -> Result<Self, ProviderError> {
        let sweep = cache.get_or_load(path, experiment, run_id)?;
        Self::new(inputs, sweep, output)
    }

    /// Returns the bound input pins in axis order.
    #[must_use]
    pub fn inputs(&self) -> &[PinId] {
        &self.inputs
    }

    #[must_use]
    pub fn sweep(&self) -> &Rc<SweepDataset> {
        &self.sweep
    }

    /// Returns the name of the output parameter this provider reads.
    #[must_use]
    pub fn output_name(&self) -> &str {
        self.sweep.output(self.output).0
    }

    fn lookup(&self, circuit: &Circuit) -> f64 {
        let query: Vec<f64> = self.inputs.iter().map(|&pin| circuit.value(pin)).collect();
        self.sweep.value_at(self.output, &query)
    }
}
