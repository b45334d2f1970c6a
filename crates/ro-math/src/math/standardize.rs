//! Per-column standardisation statistics.
//!
//! Inputs to the GP are standardised column-wise against the current
//! observation window. A small ε is added to every column stddev so that
//! constant columns standardise to zero instead of dividing by zero.

use serde::{Deserialize, Serialize};

/// ε added to each column stddev.
pub const STD_EPSILON: f64 = 1e-8;

/// Cached per-column mean and stddev (+ε) over a window of rows.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnStats {
    pub mean: Vec<f64>,
    pub std: Vec<f64>,
}

impl ColumnStats {
    /// Fit statistics over a non-empty set of equal-length rows.
    ///
    /// Uses the population stddev; ε is added afterwards so every entry of
    /// `std` is strictly positive.
    pub fn fit(rows: &[Vec<f64>]) -> Option<ColumnStats> {
        let n = rows.len();
        if n == 0 {
            return None;
        }
        let dim = rows[0].len();
        let mut mean = vec![0.0; dim];
        for row in rows {
            for (m, v) in mean.iter_mut().zip(row.iter()) {
                *m += v;
            }
        }
        for m in &mut mean {
            *m /= n as f64;
        }
        let mut std = vec![0.0; dim];
        for row in rows {
            for ((s, v), m) in std.iter_mut().zip(row.iter()).zip(mean.iter()) {
                let d = v - m;
                *s += d * d;
            }
        }
        for s in &mut std {
            *s = (*s / n as f64).sqrt() + STD_EPSILON;
        }
        Some(ColumnStats { mean, std })
    }

    /// Standardise a single row against the cached statistics.
    pub fn apply(&self, row: &[f64]) -> Vec<f64> {
        row.iter()
            .zip(self.mean.iter())
            .zip(self.std.iter())
            .map(|((v, m), s)| (v - m) / s)
            .collect()
    }

    /// Standardise a batch of rows.
    pub fn apply_all(&self, rows: &[Vec<f64>]) -> Vec<Vec<f64>> {
        rows.iter().map(|r| self.apply(r)).collect()
    }
}

/// Mean and population stddev of a scalar series; stddev falls back to 1
/// when the series is (numerically) constant.
pub fn scalar_stats(values: &[f64]) -> (f64, f64) {
    if values.is_empty() {
        return (0.0, 1.0);
    }
    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    let var = values.iter().map(|v| (v - mean) * (v - mean)).sum::<f64>() / n;
    let std = var.sqrt();
    if std < 1e-12 {
        (mean, 1.0)
    } else {
        (mean, std)
    }
}
