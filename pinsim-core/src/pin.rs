use std::fmt;

use crate::provider::DataProvider;

/// A handle to a [`Pin`] owned by a [`Circuit`](crate::Circuit).
///
/// Ids are only meaningful for the circuit that issued them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PinId(pub(crate) usize);

impl PinId {
    #[must_use]
    pub fn index(self) -> usize {
        self.0
    }
}

impl fmt::Display for PinId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "pin #{}", self.0)
    }
}

/// A named numeric state cell.
///
/// A pin holds a directly assigned value and, optionally, a [`DataProvider`].
/// When a provider is attached, reads go through it and the direct value is
/// kept aside until the provider is cleared.
#[derive(Debug, Clone)]
pub struct Pin {
    name: String,
    value: f64,
    provider: Option<DataProvider>,
}

impl Pin {
    pub(crate) fn new(name: impl Into<String>, value: f64) -> Self {
        Self {
            name: name.into(),
            value,
            provider: None,
        }
    }

    /// Returns the pin's name, used for diagnostics only.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the last directly assigned value, ignoring any provider.
    #[must_use]
    pub fn direct_value(&self) -> f64 {
        self.value
    }

    #[must_use]
    pub fn data_provider(&self) -> Option<&DataProvider> {
        self.provider.as_ref()
    }

    pub(crate) fn set_direct_value(&mut self, value: f64) {
        self.value = value;
    }

    pub(crate) fn replace_provider(
        &mut self,
        provider: Option<DataProvider>,
    ) -> Option<DataProvider> {
        std::mem::replace(&mut self.provider, provider)
    }
}
