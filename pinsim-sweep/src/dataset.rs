use ndarray::{Array1, Array2, ArrayView1, Axis};

use crate::{
    error::SweepError,
    nearest::{nearest_row, snap},
};

/// An immutable, in-memory recording of one experimental sweep.
///
/// Samples are stored as a sparse list: row `i` of the coordinate matrix holds
/// the swept input values of sample `i`, and every output column holds exactly
/// one value per sample. A NaN output value means that output was not
/// recorded at that sample, as happens when outputs are stored in separate
/// rows.
/// The distinct coordinates seen along each axis are collected once at
/// construction and drive the nearest-sample lookup. Lookups for one output
/// only consider the samples where that output was recorded.
///
/// # Examples
///
/// ```
/// use ndarray::array;
/// use pinsim_sweep::SweepDataset;
///
/// let sweep = SweepDataset::new(
///     "gate sweep",
///     vec!["gate".into()],
///     array![[-1.0], [0.0], [1.0]],
///     vec![("current".into(), array![0.1, 0.2, 0.4])],
/// )
/// .unwrap();
///
/// assert_eq!(sweep.dimensions(), 1);
/// assert_eq!(sweep.value_at(0, &[0.8]), 0.4);
/// assert_eq!(sweep.value_at(0, &[-3.0]), 0.1);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct SweepDataset {
    name: String,
    axes: Vec<String>,
    coordinates: Array2<f64>,
    outputs: Vec<(String, Array1<f64>)>,
    grids: Vec<Vec<f64>>,
    recorded: Vec<Recorded>,
}

/// The samples at which one output holds a value.
#[derive(Debug, Clone, PartialEq)]
struct Recorded {
    coordinates: Array2<f64>,
    values: Array1<f64>,
    grids: Vec<Vec<f64>>,
}

impl Recorded {
    /// Keeps the samples where `values` is not NaN.
    ///
    /// An output never recorded keeps every sample, so lookups return NaN.
    fn new(coordinates: &Array2<f64>, values: &Array1<f64>) -> Self {
        let rows: Vec<usize> = values
            .iter()
            .enumerate()
            .filter(|(_, value)| !value.is_nan())
            .map(|(row, _)| row)
            .collect();

        let (coordinates, values) = if rows.is_empty() || rows.len() == values.len() {
            (coordinates.clone(), values.clone())
        } else {
            (
                coordinates.select(Axis(0), &rows),
                values.select(Axis(0), &rows),
            )
        };
        let grids = coordinates.columns().into_iter().map(distinct).collect();

        Self {
            coordinates,
            values,
            grids,
        }
    }
}

impl SweepDataset {
    /// Creates a sweep from axis names, per-sample coordinates and output columns.
    ///
    /// `coordinates` must have shape `(samples, axes.len())` and every output
    /// column must have `samples` entries.
    /// Outputs keep the order given, which defines the default output.
    ///
    /// # Errors
    ///
    /// - [`SweepError::AxisCount`] if the coordinate matrix has the wrong number of columns.
    /// - [`SweepError::Empty`] if there are no samples or no output columns.
    /// - [`SweepError::Shape`] if an output column has the wrong length.
    /// - [`SweepError::NanCoordinate`] if any coordinate is NaN.
    pub fn new(
        name: impl Into<String>,
        axes: Vec<String>,
        coordinates: Array2<f64>,
        outputs: Vec<(String, Array1<f64>)>,
    ) -> Result<Self, SweepError> {
        let name = name.into();

        if coordinates.ncols() != axes.len() {
            return Err(SweepError::AxisCount {
                expected: axes.len(),
                actual: coordinates.ncols(),
            });
        }

        let samples = coordinates.nrows();
        if samples == 0 {
            return Err(SweepError::Empty {
                name,
                reason: "no samples recorded",
            });
        }
        if outputs.is_empty() {
            return Err(SweepError::Empty {
                name,
                reason: "no output parameters recorded",
            });
        }

        if let Some((output, values)) = outputs.iter().find(|(_, values)| values.len() != samples)
        {
            return Err(SweepError::Shape {
                output: output.clone(),
                expected: samples,
                actual: values.len(),
            });
        }

        for (axis, column) in axes.iter().zip(coordinates.columns()) {
            if let Some(sample) = column.iter().position(|value| value.is_nan()) {
                return Err(SweepError::NanCoordinate {
                    axis: axis.clone(),
                    sample,
                });
            }
        }

        let grids = coordinates.columns().into_iter().map(distinct).collect();
        let recorded = outputs
            .iter()
            .map(|(_, values)| Recorded::new(&coordinates, values))
            .collect();

        Ok(Self {
            name,
            axes,
            coordinates,
            outputs,
            grids,
            recorded,
        })
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the axis names in binding order.
    #[must_use]
    pub fn axes(&self) -> &[String] {
        &self.axes
    }

    /// Returns the number of swept dimensions.
    #[must_use]
    pub fn dimensions(&self) -> usize {
        self.axes.len()
    }

    /// Returns the number of recorded samples, always at least one.
    #[must_use]
    pub fn samples(&self) -> usize {
        self.coordinates.nrows()
    }

    #[must_use]
    pub fn coordinates(&self) -> &Array2<f64> {
        &self.coordinates
    }

    /// Returns the sorted, distinct coordinates recorded along `axis`.
    ///
    /// # Panics
    ///
    /// Panics if `axis` is not less than [`Self::dimensions`].
    #[must_use]
    pub fn grid(&self, axis: usize) -> &[f64] {
        &self.grids[axis]
    }

    /// Returns the output parameter names in storage order.
    pub fn output_names(&self) -> impl Iterator<Item = &str> {
        self.outputs.iter().map(|(name, _)| name.as_str())
    }

    /// Resolves an output parameter name to its column index.
    ///
    /// # Errors
    ///
    /// Returns [`SweepError::UnknownOutput`] if the name was not recorded.
    pub fn output_index(&self, name: &str) -> Result<usize, SweepError> {
        self.outputs
            .iter()
            .position(|(output, _)| output == name)
            .ok_or_else(|| SweepError::UnknownOutput {
                name: name.to_owned(),
                available: self.output_names().map(str::to_owned).collect(),
            })
    }

    /// Returns the column used when no output is named: the first one stored.
    #[must_use]
    pub fn default_output(&self) -> usize {
        0
    }

    /// Returns the name and values of the output column at `index`.
    ///
    /// # Panics
    ///
    /// Panics if `index` is out of range.
    #[must_use]
    pub fn output(&self, index: usize) -> (&str, ArrayView1<'_, f64>) {
        let (name, values) = &self.outputs[index];
        (name, values.view())
    }

    /// Returns the index of the recorded sample nearest to `query`.
    ///
    /// Each query component is first snapped to the nearest coordinate on its
    /// axis (ties toward the lower coordinate), then the sample closest to the
    /// snapped point is chosen (ties toward the lower sample index).
    /// On a complete grid the snapped point is itself a sample.
    #[must_use]
    pub fn nearest_sample(&self, query: &[f64]) -> usize {
        debug_assert_eq!(
            query.len(),
            self.dimensions(),
            "query must have one component per axis"
        );

        let snapped = snap(&self.grids, query);
        nearest_row(&self.coordinates, &snapped)
    }

    /// Returns the value of output `output` at the sample nearest to `query`.
    ///
    /// Only samples where `output` was recorded take part, with the axis grids
    /// those samples span.
    ///
    /// # Panics
    ///
    /// Panics if `output` is out of range.
    #[must_use]
    pub fn value_at(&self, output: usize, query: &[f64]) -> f64 {
        debug_assert_eq!(
            query.len(),
            self.dimensions(),
            "query must have one component per axis"
        );

        let recorded = &self.recorded[output];
        let snapped = snap(&recorded.grids, query);
        recorded.values[nearest_row(&recorded.coordinates, &snapped)]
    }
}

fn distinct(column: ArrayView1<'_, f64>) -> Vec<f64> {
    let mut grid = column.to_vec();
    grid.sort_by(f64::total_cmp);
    grid.dedup();
    grid
}
