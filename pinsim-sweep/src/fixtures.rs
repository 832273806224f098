//! Writers for qcodes-style sweep databases, used to build test fixtures.

use std::path::Path;

use rusqlite::{Connection, params, params_from_iter};

use crate::store::quote_identifier;

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS experiments (
    exp_id INTEGER PRIMARY KEY AUTOINCREMENT,
    name TEXT,
    sample_name TEXT,
    start_time INTEGER,
    end_time INTEGER,
    run_counter INTEGER,
    format_string TEXT
);
CREATE TABLE IF NOT EXISTS runs (
    run_id INTEGER PRIMARY KEY AUTOINCREMENT,
    exp_id INTEGER,
    name TEXT,
    result_table_name TEXT,
    result_counter INTEGER,
    run_timestamp INTEGER,
    completed_timestamp INTEGER,
    is_completed BOOL,
    parameters TEXT,
    FOREIGN KEY(exp_id) REFERENCES experiments(exp_id)
);
CREATE TABLE IF NOT EXISTS layouts (
    layout_id INTEGER PRIMARY KEY,
    run_id INTEGER,
    parameter TEXT,
    label TEXT,
    unit TEXT,
    inferred_from TEXT,
    FOREIGN KEY(run_id) REFERENCES runs(run_id)
);
CREATE TABLE IF NOT EXISTS dependencies (
    dependent INTEGER,
    independent INTEGER,
    axis_num INTEGER
);
";

/// Creates qcodes-schema databases and records runs into them.
#[derive(Debug)]
pub struct QcodesWriter {
    connection: Connection,
}

impl QcodesWriter {
    /// Creates (or reopens) a database at `path` with the qcodes tables.
    ///
    /// # Errors
    ///
    /// Returns any SQLite error raised while creating the schema.
    pub fn create(path: impl AsRef<Path>) -> rusqlite::Result<Self> {
        let connection = Connection::open(path)?;
        connection.execute_batch(SCHEMA)?;
        Ok(Self { connection })
    }

    /// Records a new experiment and returns its id.
    ///
    /// # Errors
    ///
    /// Returns any SQLite error raised by the insert.
    pub fn add_experiment(&self, name: &str, sample_name: &str) -> rusqlite::Result<i64> {
        self.connection.execute(
            "INSERT INTO experiments (name, sample_name, run_counter, format_string)
             VALUES (?1, ?2, 0, '{}-{}-{}')",
            params![name, sample_name],
        )?;
        Ok(self.connection.last_insert_rowid())
    }

    /// Records a completed run under experiment `exp_id`.
    ///
    /// Each row lists the `setpoints` values followed by the `outputs` values.
    /// Every output depends on every setpoint, in the order given.
    /// NaN values are stored as SQL `NULL`.
    ///
    /// # Errors
    ///
    /// Returns any SQLite error raised while writing, including a duplicate `run_id`.
    ///
    /// # Panics
    ///
    /// Panics if a row does not hold one value per setpoint and output.
    pub fn add_run(
        &self,
        exp_id: i64,
        run_id: i64,
        name: &str,
        setpoints: &[&str],
        outputs: &[&str],
        rows: &[Vec<f64>],
    ) -> rusqlite::Result<i64> {
        let table = format!("{name}-{exp_id}-{run_id}");

        self.connection.execute(
            "INSERT INTO runs (run_id, exp_id, name, result_table_name, result_counter, is_completed)
             VALUES (?1, ?2, ?3, ?4, ?5, 1)",
            params![run_id, exp_id, name, table, rows.len()],
        )?;
        self.connection.execute(
            "UPDATE experiments SET run_counter = run_counter + 1 WHERE exp_id = ?1",
            [exp_id],
        )?;

        let mut setpoint_ids = Vec::with_capacity(setpoints.len());
        for parameter in setpoints {
            setpoint_ids.push(self.add_layout(run_id, parameter)?);
        }
        for parameter in outputs {
            let dependent = self.add_layout(run_id, parameter)?;
            for (axis_num, independent) in setpoint_ids.iter().enumerate() {
                self.connection.execute(
                    "INSERT INTO dependencies (dependent, independent, axis_num)
                     VALUES (?1, ?2, ?3)",
                    params![dependent, independent, axis_num],
                )?;
            }
        }

        let parameters: Vec<_> = setpoints.iter().chain(outputs).copied().collect();
        let columns = parameters
            .iter()
            .map(|parameter| format!("{} REAL", quote_identifier(parameter)))
            .collect::<Vec<_>>()
            .join(", ");
        self.connection.execute(
            &format!(
                "CREATE TABLE {} (id INTEGER PRIMARY KEY AUTOINCREMENT, {columns})",
                quote_identifier(&table)
            ),
            [],
        )?;

        let insert = format!(
            "INSERT INTO {} ({}) VALUES ({})",
            quote_identifier(&table),
            parameters
                .iter()
                .map(|parameter| quote_identifier(parameter))
                .collect::<Vec<_>>()
                .join(", "),
            vec!["?"; parameters.len()].join(", "),
        );
        let mut statement = self.connection.prepare(&insert)?;
        for row in rows {
            assert_eq!(
                row.len(),
                parameters.len(),
                "each row needs one value per setpoint and output"
            );
            statement.execute(params_from_iter(
                row.iter().map(|&value| (!value.is_nan()).then_some(value)),
            ))?;
        }

        Ok(run_id)
    }

    fn add_layout(&self, run_id: i64, parameter: &str) -> rusqlite::Result<i64> {
        self.connection.execute(
            "INSERT INTO layouts (run_id, parameter, label, unit, inferred_from)
             VALUES (?1, ?2, ?2, '', '')",
            params![run_id, parameter],
        )?;
        Ok(self.connection.last_insert_rowid())
    }
}

/// Returns every point of the grid spanned by `axes`, last axis varying fastest.
///
/// # Examples
///
/// ```
/// use pinsim_sweep::fixtures::cartesian;
///
/// let points = cartesian(&[&[0.0, 1.0], &[5.0, 6.0]]);
/// assert_eq!(
///     points,
///     vec![vec![0.0, 5.0], vec![0.0, 6.0], vec![1.0, 5.0], vec![1.0, 6.0]],
/// );
/// ```
#[must_use]
pub fn cartesian(axes: &[&[f64]]) -> Vec<Vec<f64>> {
    axes.iter().fold(vec![Vec::new()], |points, axis| {
        points
            .iter()
            .flat_map(|point| {
                axis.iter().map(move |&value| {
                    let mut next = point.clone();
                    next.push(value);
                    next
                })
            })
            .collect()
    })
}
