use std::{collections::HashSet, path::Path};

use pinsim_sweep::SweepCache;
use tracing::trace;

use crate::{
    error::{CircuitError, ProviderError},
    pin::{Pin, PinId},
    provider::{DataProvider, DatasetDataProvider},
};

/// Owns a set of pins and evaluates them on demand.
///
/// Pins are addressed by the [`PinId`] returned when they are added.
/// Providers refer to other pins by id, so the circuit is the single owner of
/// every pin and outlives every provider reading from it.
///
/// Reads are never cached. Reading a pin evaluates its provider, which may in
/// turn read other pins; cycles are rejected when providers are attached, so
/// every read terminates. Passthrough links are followed in a loop, so chains
/// of any length are safe to read.
///
/// # Examples
///
/// ```
/// use pinsim_core::{Circuit, PassthroughDataProvider, StaticDataProvider};
///
/// let mut circuit = Circuit::new();
/// let supply = circuit.add_pin("supply");
/// let rail = circuit.add_pin("rail");
///
/// circuit.set_data_provider(supply, StaticDataProvider::new(3.3)).unwrap();
/// circuit.set_data_provider(rail, PassthroughDataProvider::new(supply)).unwrap();
///
/// assert_eq!(circuit.value(rail), 3.3);
/// ```
#[derive(Debug, Default)]
pub struct Circuit {
    pins: Vec<Pin>,
    sweeps: SweepCache,
}

impl Circuit {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a pin with a direct value of `0.0`.
    pub fn add_pin(&mut self, name: impl Into<String>) -> PinId {
        self.add_pin_with_value(name, 0.0)
    }

    /// Adds a pin with an initial direct value.
    pub fn add_pin_with_value(&mut self, name: impl Into<String>, value: f64) -> PinId {
        self.pins.push(Pin::new(name, value));
        PinId(self.pins.len() - 1)
    }

    /// Returns the pin with this id, if it belongs to this circuit.
    #[must_use]
    pub fn get(&self, id: PinId) -> Option<&Pin> {
        self.pins.get(id.0)
    }

    /// Returns the pin with this id.
    ///
    /// # Panics
    ///
    /// Panics if `id` was not issued by this circuit.
    #[must_use]
    pub fn pin(&self, id: PinId) -> &Pin {
        &self.pins[id.0]
    }

    /// Returns the id of the first pin named `name`.
    #[must_use]
    pub fn find(&self, name: &str) -> Option<PinId> {
        self.pins.iter().position(|pin| pin.name() == name).map(PinId)
    }

    /// Iterates over all pins in the order they were added.
    pub fn pins(&self) -> impl Iterator<Item = (PinId, &Pin)> {
        self.pins.iter().enumerate().map(|(index, pin)| (PinId(index), pin))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.pins.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.pins.is_empty()
    }

    /// Returns the current value of a pin.
    ///
    /// If a provider is attached, its value is computed now; otherwise the
    /// last direct value is returned.
    ///
    /// # Panics
    ///
    /// Panics if `id` was not issued by this circuit.
    #[must_use]
    pub fn value(&self, id: PinId) -> f64 {
        let mut current = id;
        loop {
            let pin = &self.pins[current.0];
            match pin.data_provider() {
                Some(DataProvider::Passthrough(provider)) => current = provider.source(),
                Some(provider) => return provider.evaluate(self),
                None => return pin.direct_value(),
            }
        }
    }

    /// Writes a pin's direct value.
    ///
    /// The provider, if any, stays attached:
    /// - A passthrough forwards the write to its source pin, and on along any
    ///   chain of passthroughs, so the pin reads back `value`.
    /// - Any other provider keeps supplying reads. The written value becomes
    ///   visible once the provider is cleared.
    ///
    /// # Panics
    ///
    /// Panics if `id` was not issued by this circuit.
    pub fn set_value(&mut self, id: PinId, value: f64) {
        let mut current = id;
        loop {
            let pin = &mut self.pins[current.0];
            pin.set_direct_value(value);

            match pin.data_provider() {
                Some(DataProvider::Passthrough(provider)) => current = provider.source(),
                _ => break,
            }
        }
    }

    /// Attaches a provider to a pin, returning the one it replaces.
    ///
    /// # Errors
    ///
    /// - [`CircuitError::UnknownPin`] if `id` or any pin the provider reads
    ///   does not belong to this circuit.
    /// - [`CircuitError::Cycle`] if the provider would make the pin depend on
    ///   its own value.
    ///
    /// On error the pin keeps its current provider.
    pub fn set_data_provider(
        &mut self,
        id: PinId,
        provider: impl Into<DataProvider>,
    ) -> Result<Option<DataProvider>, CircuitError> {
        let provider = provider.into();

        if id.0 >= self.pins.len() {
            return Err(CircuitError::UnknownPin(id));
        }
        if let Some(&source) = provider
            .sources()
            .iter()
            .find(|source| source.0 >= self.pins.len())
        {
            return Err(CircuitError::UnknownPin(source));
        }
        if let Some(&through) = provider
            .sources()
            .iter()
            .find(|&&source| self.depends_on(source, id))
        {
            return Err(CircuitError::Cycle { pin: id, through });
        }

        trace!(
            pin = %id,
            name = self.pins[id.0].name(),
            sources = ?provider.sources(),
            "attached provider"
        );
        Ok(self.pins[id.0].replace_provider(Some(provider)))
    }

    /// Detaches a pin's provider, exposing its direct value again.
    ///
    /// # Panics
    ///
    /// Panics if `id` was not issued by this circuit.
    pub fn clear_data_provider(&mut self, id: PinId) -> Option<DataProvider> {
        self.pins[id.0].replace_provider(None)
    }

    /// Builds a dataset provider whose sweep is shared with every other
    /// provider this circuit has built for the same run.
    ///
    /// The provider is not attached; pass it to [`Self::set_data_provider`].
    ///
    /// # Errors
    ///
    /// See [`DatasetDataProvider::load`].
    pub fn dataset_provider(
        &mut self,
        inputs: Vec<PinId>,
        path: impl AsRef<Path>,
        experiment: &str,
        run_id: i64,
        output: Option<&str>,
    ) -> Result<DatasetDataProvider, ProviderError> {
        DatasetDataProvider::from_cache(&mut self.sweeps, inputs, path, experiment, run_id, output)
    }

    /// Returns the cache of sweeps loaded through [`Self::dataset_provider`].
    #[must_use]
    pub fn sweeps(&self) -> &SweepCache {
        &self.sweeps
    }

    /// Returns whether reading `from` ends up reading `target`.
    fn depends_on(&self, from: PinId, target: PinId) -> bool {
        let mut visited = HashSet::new();
        let mut pending = vec![from];

        while let Some(current) = pending.pop() {
            if current == target {
                return true;
            }
            if !visited.insert(current) {
                continue;
            }
            if let Some(provider) = self.pins[current.0].data_provider() {
                pending.extend_from_slice(provider.sources());
            }
        }

        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::{PassthroughDataProvider, StaticDataProvider};

    #[test]
    fn pins_default_to_zero_and_keep_direct_writes() {
        let mut circuit = Circuit::new();
        let pin = circuit.add_pin("p");

        assert_eq!(circuit.value(pin), 0.0);

        circuit.set_value(pin, -1.5);
        assert_eq!(circuit.value(pin), -1.5);
        assert_eq!(circuit.pin(pin).name(), "p");
    }

    #[test]
    #[allow(clippy::approx_constant)]
    fn static_provider_wins_over_direct_value() {
        let mut circuit = Circuit::new();
        let pin = circuit.add_pin_with_value("o1", 7.0);

        circuit.set_value(pin, 1.0);
        circuit
            .set_data_provider(pin, StaticDataProvider::new(3.14))
            .unwrap();
        assert_eq!(circuit.value(pin), 3.14);

        circuit.set_value(pin, 2.0);
        assert_eq!(circuit.value(pin), 3.14);
        assert_eq!(circuit.pin(pin).direct_value(), 2.0);

        let cleared = circuit.clear_data_provider(pin);
        assert!(matches!(cleared, Some(DataProvider::Static(_))));
        assert_eq!(circuit.value(pin), 2.0);
    }

    #[test]
    fn passthrough_reflects_and_forwards_writes() {
        let mut circuit = Circuit::new();
        let pin1 = circuit.add_pin("pin1");
        let pin2 = circuit.add_pin("pin2");

        circuit
            .set_data_provider(pin2, PassthroughDataProvider::new(pin1))
            .unwrap();
        assert_eq!((circuit.value(pin1), circuit.value(pin2)), (0.0, 0.0));

        circuit.set_value(pin1, 1.0);
        assert_eq!((circuit.value(pin1), circuit.value(pin2)), (1.0, 1.0));

        circuit.set_value(pin2, 2.0);
        assert_eq!((circuit.value(pin1), circuit.value(pin2)), (2.0, 2.0));
    }

    #[test]
    fn passthrough_chains_resolve_transitively() {
        let mut circuit = Circuit::new();
        let a = circuit.add_pin("a");
        let b = circuit.add_pin("b");
        let c = circuit.add_pin("c");

        circuit.set_data_provider(b, PassthroughDataProvider::new(a)).unwrap();
        circuit.set_data_provider(c, PassthroughDataProvider::new(b)).unwrap();

        circuit.set_value(a, 4.0);
        assert_eq!(circuit.value(c), 4.0);

        circuit.set_value(c, 5.0);
        assert_eq!(circuit.value(a), 5.0);
        assert_eq!(circuit.pin(b).direct_value(), 5.0);

        circuit.set_data_provider(a, StaticDataProvider::new(9.0)).unwrap();
        assert_eq!(circuit.value(c), 9.0);
    }

    #[test]
    fn long_passthrough_chains_read_without_recursing() {
        const LENGTH: usize = 100_000;

        let mut circuit = Circuit::new();
        let pins: Vec<_> = (0..LENGTH)
            .map(|index| circuit.add_pin(format!("link_{index}")))
            .collect();

        // Each link reads the next one, so the last pin drives the whole chain.
        for pair in pins.windows(2) {
            circuit
                .set_data_provider(pair[0], PassthroughDataProvider::new(pair[1]))
                .unwrap();
        }

        circuit.set_value(pins[LENGTH - 1], 1.25);
        assert_eq!(circuit.value(pins[0]), 1.25);

        circuit.set_value(pins[0], -4.0);
        assert_eq!(circuit.value(pins[0]), -4.0);
        assert_eq!(circuit.pin(pins[LENGTH - 1]).direct_value(), -4.0);
    }

    #[test]
    fn replacing_returns_previous_provider() {
        let mut circuit = Circuit::new();
        let pin = circuit.add_pin("pin");

        let first = circuit
            .set_data_provider(pin, StaticDataProvider::new(1.0))
            .unwrap();
        let second = circuit
            .set_data_provider(pin, StaticDataProvider::new(2.0))
            .unwrap();

        assert!(first.is_none());
        assert!(matches!(second, Some(DataProvider::Static(p)) if p.constant() == 1.0));
        assert_eq!(circuit.value(pin), 2.0);
    }

    #[test]
    fn cycles_are_rejected_and_leave_circuit_unchanged() {
        let mut circuit = Circuit::new();
        let a = circuit.add_pin("a");
        let b = circuit.add_pin("b");
        let c = circuit.add_pin("c");

        assert_eq!(
            circuit.set_data_provider(a, PassthroughDataProvider::new(a)),
            Err(CircuitError::Cycle { pin: a, through: a })
        );

        circuit.set_data_provider(b, PassthroughDataProvider::new(a)).unwrap();
        circuit.set_data_provider(c, PassthroughDataProvider::new(b)).unwrap();

        assert_eq!(
            circuit.set_data_provider(a, PassthroughDataProvider::new(c)),
            Err(CircuitError::Cycle { pin: a, through: c })
        );
        assert!(circuit.pin(a).data_provider().is_none());

        circuit.set_value(a, 6.0);
        assert_eq!(circuit.value(c), 6.0);
    }

    #[test]
    fn foreign_pin_ids_are_rejected() {
        let mut circuit = Circuit::new();
        let pin = circuit.add_pin("pin");

        let mut other = Circuit::new();
        other.add_pin("x");
        let foreign = other.add_pin("y");

        assert_eq!(
            circuit.set_data_provider(pin, PassthroughDataProvider::new(foreign)),
            Err(CircuitError::UnknownPin(foreign))
        );
        assert_eq!(
            circuit.set_data_provider(foreign, StaticDataProvider::new(1.0)),
            Err(CircuitError::UnknownPin(foreign))
        );
        assert!(circuit.get(foreign).is_none());
    }

    #[test]
    fn find_returns_first_match() {
        let mut circuit = Circuit::new();
        let first = circuit.add_pin("dup");
        circuit.add_pin("dup");

        assert_eq!(circuit.find("dup"), Some(first));
        assert_eq!(circuit.find("missing"), None);
        assert_eq!(circuit.len(), 2);
        assert_eq!(circuit.pins().count(), 2);
    }
}
