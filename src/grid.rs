//! # Result grids
//!
//! The kernel writes its results as flat arrays of `N × M` cells, departure index
//! varying slowest (`k = i * M + j`). The grids handed to the renderer are indexed
//! the other way round, one row per arrival date:
//!
//! ```text
//! grid[j][i] = flat[i * M + j]      i: departure index, j: arrival index
//! ```
//!
//! Read column-major with `M` rows, the flat array is exactly that matrix, so the
//! grids are stored as [`DMatrix`] with `M` rows and `N` columns.
//! Negative cells (no solution) are kept as they are.
use nalgebra::DMatrix;
use serde::Serialize;

use crate::porkchop_errors::PorkchopError;

/// One of the three quantities computed by the kernel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CostMetric {
    /// Characteristic energy at departure, km²/s²
    C3,
    /// Departure burn, km/s
    Dv1,
    /// Departure plus arrival burns, km/s
    TotalDv,
}

/// C3, departure delta-v and total delta-v over the departure × arrival grid.
#[derive(Debug, Clone, PartialEq)]
pub struct ResultGrid {
    c3: DMatrix<f64>,
    dv1: DMatrix<f64>,
    total_dv: DMatrix<f64>,
}

/// Serialized form of a [`ResultGrid`]: nested `[arrival][departure]` arrays.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TransferCostGrids {
    pub c3: Vec<Vec<f64>>,
    pub dv1: Vec<Vec<f64>>,
    pub total_dv: Vec<Vec<f64>>,
    pub departure_count: usize,
    pub arrival_count: usize,
}

impl ResultGrid {
    /// Reshape the three flat kernel outputs.
    ///
    /// Arguments
    /// -----------------
    /// * `flat_c3`, `flat_dv1`, `flat_total_dv`: kernel outputs, `departure_count × arrival_count` values each.
    /// * `departure_count`: number of departure samples `N`.
    /// * `arrival_count`: number of arrival samples `M`.
    ///
    /// Return
    /// ----------
    /// * The grids, or [`PorkchopError::GridShape`] if a count is zero or an
    ///   array does not hold exactly `N × M` values.
    pub fn reshape(
        flat_c3: &[f64],
        flat_dv1: &[f64],
        flat_total_dv: &[f64],
        departure_count: usize,
        arrival_count: usize,
    ) -> Result<Self, PorkchopError> {
        let expected = departure_count
            .checked_mul(arrival_count)
            .filter(|&cells| cells > 0);

        for flat in [flat_c3, flat_dv1, flat_total_dv] {
            if expected != Some(flat.len()) {
                return Err(PorkchopError::GridShape {
                    departure: departure_count,
                    arrival: arrival_count,
                    expected: expected.unwrap_or(0),
                    found: flat.len(),
                });
            }
        }

        let to_grid = |flat: &[f64]| {
            DMatrix::from_fn(arrival_count, departure_count, |j, i| {
                flat[i * arrival_count + j]
            })
        };

        Ok(ResultGrid {
            c3: to_grid(flat_c3),
            dv1: to_grid(flat_dv1),
            total_dv: to_grid(flat_total_dv),
        })
    }

    pub fn departure_count(&self) -> usize {
        self.total_dv.ncols()
    }

    pub fn arrival_count(&self) -> usize {
        self.total_dv.nrows()
    }

    pub fn metric(&self, metric: CostMetric) -> &DMatrix<f64> {
        match metric {
            CostMetric::C3 => &self.c3,
            CostMetric::Dv1 => &self.dv1,
            CostMetric::TotalDv => &self.total_dv,
        }
    }

    pub fn c3(&self) -> &DMatrix<f64> {
        &self.c3
    }

    pub fn dv1(&self) -> &DMatrix<f64> {
        &self.dv1
    }

    pub fn total_dv(&self) -> &DMatrix<f64> {
        &self.total_dv
    }

    /// Value of one cell, `None` outside the grid.
    pub fn get(&self, metric: CostMetric, arrival: usize, departure: usize) -> Option<f64> {
        self.metric(metric).get((arrival, departure)).copied()
    }

    /// Rows (one per arrival date) of a metric.
    pub fn rows(&self, metric: CostMetric) -> Vec<Vec<f64>> {
        self.metric(metric)
            .row_iter()
            .map(|row| row.iter().copied().collect())
            .collect()
    }

    pub fn to_cost_grids(&self) -> TransferCostGrids {
        TransferCostGrids {
            c3: self.rows(CostMetric::C3),
            dv1: self.rows(CostMetric::Dv1),
            total_dv: self.rows(CostMetric::TotalDv),
            departure_count: self.departure_count(),
            arrival_count: self.arrival_count(),
        }
    }
}

#[cfg(test)]
mod grid_test {
    use super::*;

    #[test]
    fn test_reshape_mapping() {
        let departure = 3;
        let arrival = 2;
        let flat: Vec<f64> = (0..6).map(f64::from).collect();
        let grid = ResultGrid::reshape(&flat, &flat, &flat, departure, arrival).unwrap();

        assert_eq!(grid.departure_count(), 3);
        assert_eq!(grid.arrival_count(), 2);
        for i in 0..departure {
            for j in 0..arrival {
                assert_eq!(
                    grid.get(CostMetric::TotalDv, j, i),
                    Some(flat[i * arrival + j])
                );
            }
        }
        assert_eq!(
            grid.rows(CostMetric::C3),
            vec![vec![0.0, 2.0, 4.0], vec![1.0, 3.0, 5.0]]
        );
        // column-major reading of the flat array is the same matrix
        assert_eq!(grid.total_dv(), &DMatrix::from_column_slice(2, 3, &flat));
    }

    #[test]
    fn test_reshape_keeps_sentinels() {
        let flat = [5.0, -1.0, 3.0, -1.0];
        let grid = ResultGrid::reshape(&flat, &flat, &flat, 2, 2).unwrap();
        assert_eq!(grid.rows(CostMetric::Dv1), vec![vec![5.0, 3.0], vec![-1.0, -1.0]]);
    }

    #[test]
    fn test_reshape_shape_mismatch() {
        let flat = [1.0; 6];
        let short = [1.0; 5];
        assert!(matches!(
            ResultGrid::reshape(&flat, &short, &flat, 3, 2),
            Err(PorkchopError::GridShape {
                expected: 6,
                found: 5,
                ..
            })
        ));
        assert!(ResultGrid::reshape(&[], &[], &[], 0, 2).is_err());
        assert!(ResultGrid::reshape(&flat, &flat, &flat, 2, 2).is_err());
    }

    #[test]
    fn test_cost_grids_serialization() {
        let flat = [1.0, 2.0];
        let grid = ResultGrid::reshape(&flat, &flat, &flat, 1, 2).unwrap();
        let json = serde_json::to_value(grid.to_cost_grids()).unwrap();
        assert_eq!(json["totalDv"], serde_json::json!([[1.0], [2.0]]));
        assert_eq!(json["departureCount"], 1);
        assert_eq!(json["arrivalCount"], 2);
    }
}
