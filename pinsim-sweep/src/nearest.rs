use ndarray::Array2;

/// Returns the index of the grid coordinate nearest to `target`.
///
/// The `grid` must be sorted in ascending order and non-empty.
/// Targets outside the grid clamp to the first or last coordinate, and a
/// target exactly halfway between two coordinates resolves to the lower one.
/// A NaN target is never closer to anything, so it resolves to index `0`.
///
/// # Examples
///
/// ```
/// use pinsim_sweep::nearest_index;
///
/// let grid = [-1.0, 0.0, 1.0];
///
/// assert_eq!(nearest_index(&grid, -7.0), 0);
/// assert_eq!(nearest_index(&grid, 0.4), 1);
/// assert_eq!(nearest_index(&grid, 0.5), 1);
/// assert_eq!(nearest_index(&grid, 0.6), 2);
/// assert_eq!(nearest_index(&grid, 9.0), 2);
/// ```
#[must_use]
pub fn nearest_index(grid: &[f64], target: f64) -> usize {
    debug_assert!(!grid.is_empty(), "grid must have at least one coordinate");

    let upper = grid.partition_point(|&coordinate| coordinate < target);
    if upper == 0 {
        return 0;
    }
    if upper == grid.len() {
        return grid.len() - 1;
    }

    let lower = upper - 1;
    if target - grid[lower] <= grid[upper] - target {
        lower
    } else {
        upper
    }
}

/// Snaps each query component onto its axis grid.
pub(crate) fn snap(grids: &[Vec<f64>], query: &[f64]) -> Vec<f64> {
    grids
        .iter()
        .zip(query)
        .map(|(grid, &target)| grid[nearest_index(grid, target)])
        .collect()
}

/// Returns the row of `coordinates` closest to `point` in squared Euclidean
/// distance, preferring the lowest row index on ties.
pub(crate) fn nearest_row(coordinates: &Array2<f64>, point: &[f64]) -> usize {
    let mut best = (0, f64::INFINITY);

    for (index, row) in coordinates.rows().into_iter().enumerate() {
        let distance: f64 = row
            .iter()
            .zip(point)
            .map(|(coordinate, target)| (coordinate - target).powi(2))
            .sum();

        if distance < best.1 {
            best = (index, distance);
            if distance == 0.0 {
                break;
            }
        }
    }

    best.0
}
