use std::path::{Path, PathBuf};

use ndarray::{Array1, Array2};
use rusqlite::{Connection, OpenFlags, OptionalExtension, params};
use tracing::{debug, info, warn};

use crate::{dataset::SweepDataset, error::SweepError};

/// Describes one run recorded in a [`SweepStore`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunInfo {
    pub run_id: i64,
    pub experiment: String,
    pub sample: String,
    pub name: String,
    pub result_table: String,
}

/// A read-only view of a qcodes-style SQLite sweep database.
///
/// The store understands the subset of the qcodes layout needed to rebuild a
/// sweep: the `experiments` and `runs` tables, the `layouts` and
/// `dependencies` tables describing which parameters were swept, and the
/// per-run results table holding one row per recorded sample.
#[derive(Debug)]
pub struct SweepStore {
    path: PathBuf,
    connection: Connection,
}

impl SweepStore {
    /// Opens the store at `path` without write access.
    ///
    /// # Errors
    ///
    /// - [`SweepError::NotFound`] if `path` is not an existing file.
    /// - [`SweepError::Database`] if SQLite cannot open it.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, SweepError> {
        let path = path.as_ref();
        if !path.is_file() {
            return Err(SweepError::NotFound {
                path: path.to_path_buf(),
            });
        }

        let connection = Connection::open_with_flags(
            path,
            OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )?;
        debug!(path = %path.display(), "opened sweep store");

        Ok(Self {
            path: path.to_path_buf(),
            connection,
        })
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Lists every run in the store, ordered by run id.
    ///
    /// # Errors
    ///
    /// Returns [`SweepError::Database`] if the store cannot be queried.
    pub fn runs(&self) -> Result<Vec<RunInfo>, SweepError> {
        let mut statement = self.connection.prepare(
            "SELECT r.run_id, e.name, e.sample_name, r.name, r.result_table_name
             FROM runs r JOIN experiments e ON e.exp_id = r.exp_id
             ORDER BY r.run_id",
        )?;

        let runs = statement
            .query_map([], run_info)?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(runs)
    }

    /// Finds the run with `run_id` recorded under `experiment`.
    ///
    /// # Errors
    ///
    /// - [`SweepError::RunNotFound`] if the experiment is unknown or holds no such run.
    /// - [`SweepError::Database`] if the store cannot be queried.
    pub fn find_run(&self, experiment: &str, run_id: i64) -> Result<RunInfo, SweepError> {
        let run = self
            .connection
            .query_row(
                "SELECT r.run_id, e.name, e.sample_name, r.name, r.result_table_name
                 FROM runs r JOIN experiments e ON e.exp_id = r.exp_id
                 WHERE e.name = ?1 AND r.run_id = ?2",
                params![experiment, run_id],
                run_info,
            )
            .optional()?;

        let run = run.ok_or_else(|| SweepError::RunNotFound {
            experiment: experiment.to_owned(),
            run_id,
        })?;

        debug!(run_id, experiment, table = %run.result_table, "resolved run");
        Ok(run)
    }

    /// Loads the run with `run_id` recorded under `experiment` into memory.
    ///
    /// Axes are the swept (independent) parameters, ordered by their axis
    /// number and then by storage order.
    /// Outputs are the dependent parameters in storage order, so the first one
    /// becomes the sweep's default output.
    /// Rows missing any axis coordinate are skipped. A missing output value is
    /// loaded as NaN, and lookups of that output only use the rows where it was
    /// recorded, so outputs written in separate rows each resolve to their own
    /// samples.
    ///
    /// # Errors
    ///
    /// - [`SweepError::RunNotFound`] if no such run exists.
    /// - [`SweepError::Empty`] if the run recorded no outputs or no complete samples.
    /// - [`SweepError::Database`] if the store cannot be queried or holds non-numeric data.
    pub fn load(&self, experiment: &str, run_id: i64) -> Result<SweepDataset, SweepError> {
        let run = self.find_run(experiment, run_id)?;
        let name = format!("{experiment} run {run_id}");

        let axes = self.swept_parameters(run.run_id)?;
        let outputs = self.dependent_parameters(run.run_id)?;
        if outputs.is_empty() {
            return Err(SweepError::Empty {
                name,
                reason: "no output parameters recorded",
            });
        }

        let columns = axes
            .iter()
            .chain(&outputs)
            .map(|column| quote_identifier(column))
            .collect::<Vec<_>>()
            .join(", ");
        let mut statement = self.connection.prepare(&format!(
            "SELECT {columns} FROM {} ORDER BY id",
            quote_identifier(&run.result_table)
        ))?;

        let dimensions = axes.len();
        let mut coordinates: Vec<Vec<f64>> = Vec::new();
        let mut values: Vec<Vec<f64>> = vec![Vec::new(); outputs.len()];
        let mut skipped = 0_usize;

        let mut rows = statement.query([])?;
        while let Some(row) = rows.next()? {
            let sample = (0..dimensions)
                .map(|index| row.get::<_, Option<f64>>(index))
                .collect::<Result<Option<Vec<_>>, _>>()?;

            let Some(sample) = sample else {
                skipped += 1;
                continue;
            };
            coordinates.push(sample);

            for (offset, column) in values.iter_mut().enumerate() {
                let value: Option<f64> = row.get(dimensions + offset)?;
                column.push(value.unwrap_or(f64::NAN));
            }
        }

        if skipped > 0 {
            warn!(run_id, skipped, "skipped result rows without a complete set of coordinates");
        }

        let coordinates =
            Array2::from_shape_fn((coordinates.len(), dimensions), |(i, j)| coordinates[i][j]);
        let outputs = outputs
            .into_iter()
            .zip(values)
            .map(|(output, column)| (output, Array1::from(column)))
            .collect();

        let sweep = SweepDataset::new(name, axes, coordinates, outputs)?;
        info!(
            run_id,
            experiment,
            dimensions = sweep.dimensions(),
            samples = sweep.samples(),
            outputs = ?sweep.output_names().collect::<Vec<_>>(),
            "loaded sweep"
        );

        Ok(sweep)
    }

    /// Returns the independent parameters of a run, one per swept axis.
    fn swept_parameters(&self, run_id: i64) -> Result<Vec<String>, SweepError> {
        let mut statement = self.connection.prepare(
            "SELECT l.parameter
             FROM dependencies d JOIN layouts l ON l.layout_id = d.independent
             WHERE l.run_id = ?1
             ORDER BY d.axis_num, l.layout_id",
        )?;

        let mut axes: Vec<String> = Vec::new();
        for parameter in statement.query_map([run_id], |row| row.get::<_, String>(0))? {
            let parameter = parameter?;
            if !axes.contains(&parameter) {
                axes.push(parameter);
            }
        }

        Ok(axes)
    }

    /// Returns the dependent (measured) parameters of a run in storage order.
    fn dependent_parameters(&self, run_id: i64) -> Result<Vec<String>, SweepError> {
        let mut statement = self.connection.prepare(
            "SELECT parameter FROM layouts
             WHERE run_id = ?1 AND layout_id IN (SELECT dependent FROM dependencies)
             ORDER BY layout_id",
        )?;

        let outputs = statement
            .query_map([run_id], |row| row.get(0))?
            .collect::<Result<Vec<String>, _>>()?;

        Ok(outputs)
    }
}

fn run_info(row: &rusqlite::Row<'_>) -> rusqlite::Result<RunInfo> {
    Ok(RunInfo {
        run_id: row.get(0)?,
        experiment: row.get(1)?,
        sample: row.get::<_, Option<String>>(2)?.unwrap_or_default(),
        name: row.get::<_, Option<String>>(3)?.unwrap_or_default(),
        result_table: row.get(4)?,
    })
}

/// Quotes a table or column name for use in SQL.
///
/// qcodes result tables are named like `results-1-1` and parameters may hold
/// arbitrary characters, so every identifier is quoted.
pub(crate) fn quote_identifier(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}
