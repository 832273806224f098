//! Shared fixtures for the integration tests.

use std::path::{Path, PathBuf};

use pinsim_sweep::fixtures::{QcodesWriter, cartesian};
use tempfile::TempDir;
use tracing_subscriber::EnvFilter;

pub const EXPERIMENT: &str = "GB_Newtown_Dev_3_2";

/// A one-dimensional gate sweep with two recorded lock-in outputs.
pub const RUN_1D: i64 = 986;

/// A two-dimensional gate-gate sweep with one recorded output.
pub const RUN_2D: i64 = 991;

/// A tuning database written to a temporary directory.
///
/// The directory is removed when this value is dropped.
pub struct TuningDb {
    dir: TempDir,
    path: PathBuf,
}

impl TuningDb {
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    #[must_use]
    pub fn dir(&self) -> &Path {
        self.dir.path()
    }
}

/// Gate voltages from -1 V to 0 V.
#[must_use]
pub fn gate_voltages(steps: u32) -> Vec<f64> {
    (0..=steps)
        .map(|i| -1.0 + f64::from(i) / f64::from(steps))
        .collect()
}

/// A pinch-off curve: the current rises smoothly as the gate opens.
#[must_use]
pub fn pinch_off(gate: f64) -> f64 {
    1e-9 * (1.0 + (5.0 * (gate + 0.5)).tanh())
}

/// Writes the tuning database used by the integration tests.
///
/// # Panics
///
/// Panics if the temporary directory or the database cannot be created.
#[must_use]
pub fn tuning_db() -> TuningDb {
    let dir = tempfile::tempdir().expect("temporary directory");
    let path = dir.path().join("dot_tuning_sequences.db");

    let writer = QcodesWriter::create(&path).expect("create tuning database");
    let exp_id = writer
        .add_experiment(EXPERIMENT, "GB_Newtown_Dev_3")
        .expect("add experiment");

    let gates = gate_voltages(20);
    let rows: Vec<_> = cartesian(&[gates.as_slice()])
        .into_iter()
        .map(|point| vec![point[0], pinch_off(point[0]), 0.5 * pinch_off(point[0])])
        .collect();
    writer
        .add_run(
            exp_id,
            RUN_1D,
            "pinch_off",
            &["mdac_ch1_voltage"],
            &["sr860_1_R_current", "sr860_2_R_current"],
            &rows,
        )
        .expect("add 1D run");

    let gates = gate_voltages(10);
    let rows: Vec<_> = cartesian(&[gates.as_slice(), gates.as_slice()])
        .into_iter()
        .map(|point| vec![point[0], point[1], pinch_off(point[0]) * pinch_off(point[1]) * 1e9])
        .collect();
    writer
        .add_run(
            exp_id,
            RUN_2D,
            "barrier_barrier",
            &["mdac_ch1_voltage", "mdac_ch2_voltage"],
            &["sr860_1_R_current"],
            &rows,
        )
        .expect("add 2D run");

    TuningDb { dir, path }
}

/// Routes `tracing` output to the test harness, once per test binary.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("pinsim_core=debug,pinsim_sweep=debug")),
        )
        .with_test_writer()
        .try_init();
}
