use std::{
    collections::HashMap,
    fs,
    path::{Path, PathBuf},
    str::FromStr,
};

use serde::Deserialize;
use tracing::debug;

use crate::{
    circuit::Circuit,
    error::ConfigError,
    pin::PinId,
    provider::{DataProvider, PassthroughDataProvider, StaticDataProvider},
};

/// A declarative description of a circuit, usually read from TOML.
///
/// # Examples
///
/// ```
/// use pinsim_core::CircuitConfig;
///
/// let config: CircuitConfig = r#"
///     [[pins]]
///     name = "supply"
///     provider = { kind = "static", value = 1.8 }
///
///     [[pins]]
///     name = "vdd"
///     provider = { kind = "passthrough", source = "supply" }
/// "#
/// .parse()
/// .unwrap();
///
/// let circuit = config.build().unwrap();
/// let vdd = circuit.find("vdd").unwrap();
/// assert_eq!(circuit.value(vdd), 1.8);
/// ```
#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CircuitConfig {
    /// Directory that relative dataset paths are resolved against.
    #[serde(default)]
    pub dataset_root: Option<PathBuf>,

    #[serde(default)]
    pub pins: Vec<PinConfig>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PinConfig {
    pub name: String,

    /// Initial direct value.
    #[serde(default)]
    pub value: f64,

    #[serde(default)]
    pub provider: Option<ProviderConfig>,
}

/// Describes one [`DataProvider`], referring to pins by name.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ProviderConfig {
    Static {
        value: f64,
    },
    Passthrough {
        source: String,
    },
    Dataset {
        inputs: Vec<String>,
        path: PathBuf,
        experiment: String,
        run_id: i64,
        #[serde(default)]
        output: Option<String>,
    },
}

impl FromStr for CircuitConfig {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(toml::from_str(s)?)
    }
}

impl CircuitConfig {
    /// Reads a config file.
    ///
    /// Relative dataset paths are resolved against `dataset_root`, which is
    /// itself relative to the file's directory; without one, the file's
    /// directory is used.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Io`] if the file cannot be read, or
    /// [`ConfigError::Parse`] if it is not a valid config.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;

        let mut config: Self = text.parse()?;
        let base = path.parent().unwrap_or_else(|| Path::new(""));
        config.dataset_root = Some(match config.dataset_root.take() {
            Some(root) => base.join(root),
            None => base.to_path_buf(),
        });

        Ok(config)
    }

    /// Creates every pin, then attaches providers in declaration order.
    ///
    /// Providers may refer to pins declared after them. Dataset providers that
    /// point at the same run share one loaded sweep.
    ///
    /// # Errors
    ///
    /// - [`ConfigError::DuplicatePin`] if two pins share a name.
    /// - [`ConfigError::UnknownPin`] if a provider names an undeclared pin.
    /// - [`ConfigError::Provider`] if a dataset provider cannot be created.
    /// - [`ConfigError::Circuit`] if the wiring forms a cycle.
    pub fn build(&self) -> Result<Circuit, ConfigError> {
        let mut circuit = Circuit::new();
        let mut ids: HashMap<&str, PinId> = HashMap::with_capacity(self.pins.len());

        for pin in &self.pins {
            if ids.contains_key(pin.name.as_str()) {
                return Err(ConfigError::DuplicatePin(pin.name.clone()));
            }
            let id = circuit.add_pin_with_value(pin.name.as_str(), pin.value);
            ids.insert(&pin.name, id);
        }

        for pin in &self.pins {
            let Some(provider) = &pin.provider else {
                continue;
            };

            let provider = self.provider(&mut circuit, &ids, &pin.name, provider)?;
            circuit.set_data_provider(ids[pin.name.as_str()], provider)?;
        }

        debug!(
            pins = circuit.len(),
            sweeps = circuit.sweeps().len(),
            "built circuit from config"
        );
        Ok(circuit)
    }

    fn provider(
        &self,
        circuit: &mut Circuit,
        ids: &HashMap<&str, PinId>,
        pin: &str,
        config: &ProviderConfig,
    ) -> Result<DataProvider, ConfigError> {
        let provider: DataProvider = match config {
            ProviderConfig::Static { value } => StaticDataProvider::new(*value).into(),
            ProviderConfig::Passthrough { source } => {
                PassthroughDataProvider::new(resolve(ids, source)?).into()
            }
            ProviderConfig::Dataset {
                inputs,
                path,
                experiment,
                run_id,
                output,
            } => {
                let inputs = inputs
                    .iter()
                    .map(|name| resolve(ids, name))
                    .collect::<Result<Vec<_>, _>>()?;
                let path = match &self.dataset_root {
                    Some(root) => root.join(path),
                    None => path.clone(),
                };

                circuit
                    .dataset_provider(inputs, path, experiment, *run_id, output.as_deref())
                    .map_err(|source| ConfigError::Provider {
                        pin: pin.to_owned(),
                        source,
                    })?
                    .into()
            }
        };

        Ok(provider)
    }
}

fn resolve(ids: &HashMap<&str, PinId>, name: &str) -> Result<PinId, ConfigError> {
    ids.get(name)
        .copied()
        .ok_or_else(|| ConfigError::UnknownPin(name.to_owned()))
}
