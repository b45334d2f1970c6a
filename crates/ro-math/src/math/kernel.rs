//! Matérn covariance kernel with smoothness ν = 3/2.
//!
//! ```text
//! k(r) = (1 + √3·r/ℓ) · exp(−√3·r/ℓ)
//! ```
//!
//! The kernel has unit signal variance, so its prior marginal stddev is 1
//! at every input. A single isotropic length-scale ℓ is the only
//! hyperparameter.

use serde::{Deserialize, Serialize};

const SQRT_3: f64 = 1.732_050_807_568_877_2;

/// Matérn ν = 3/2 kernel with a single isotropic length-scale.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Matern32 {
    pub length_scale: f64,
}

impl Matern32 {
    pub fn new(length_scale: f64) -> Self {
        Matern32 { length_scale }
    }

    /// Covariance between two input rows.
    pub fn eval(&self, a: &[f64], b: &[f64]) -> f64 {
        let r = euclidean_distance(a, b);
        let d = SQRT_3 * r / self.length_scale;
        (1.0 + d) * (-d).exp()
    }

    /// Prior marginal variance k(x, x); identically 1 for this kernel.
    pub fn diag(&self) -> f64 {
        1.0
    }

    /// Full covariance matrix over a set of rows (n×n, row-major).
    pub fn matrix(&self, xs: &[Vec<f64>]) -> Vec<f64> {
        let n = xs.len();
        let mut k = vec![0.0; n * n];
        for i in 0..n {
            k[i * n + i] = self.diag();
            for j in 0..i {
                let v = self.eval(&xs[i], &xs[j]);
                k[i * n + j] = v;
                k[j * n + i] = v;
            }
        }
        k
    }

    /// Cross-covariance matrix between test rows and training rows
    /// (len(xs)×len(ys), row-major).
    pub fn cross(&self, xs: &[Vec<f64>], ys: &[Vec<f64>]) -> Vec<f64> {
        let m = ys.len();
        let mut k = vec![0.0; xs.len() * m];
        for (i, x) in xs.iter().enumerate() {
            for (j, y) in ys.iter().enumerate() {
                k[i * m + j] = self.eval(x, y);
            }
        }
        k
    }
}

fn euclidean_distance(a: &[f64], b: &[f64]) -> f64 {
    a.iter()
        .zip(b.iter())
        .map(|(x, y)| (x - y) * (x - y))
        .sum::<f64>()
        .sqrt()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unit_variance_at_zero_distance() {
        let k = Matern32::new(1.0);
        assert_eq!(k.eval(&[0.5, 0.5], &[0.5, 0.5]), 1.0);
        assert_eq!(k.diag(), 1.0);
    }

    #[test]
    fn known_value_at_unit_distance() {
        let k = Matern32::new(1.0);
        let d = SQRT_3;
        let expected = (1.0 + d) * (-d).exp();
        assert!((k.eval(&[0.0], &[1.0]) - expected).abs() < 1e-12);
    }

    #[test]
    fn monotone_decreasing_in_distance() {
        let k = Matern32::new(1.0);
        let near = k.eval(&[0.0], &[0.1]);
        let far = k.eval(&[0.0], &[2.0]);
        assert!(near > far);
        assert!(far > 0.0);
    }

    #[test]
    fn longer_length_scale_flattens() {
        let tight = Matern32::new(0.5);
        let loose = Matern32::new(5.0);
        assert!(loose.eval(&[0.0], &[1.0]) > tight.eval(&[0.0], &[1.0]));
    }

    #[test]
    fn matrix_is_symmetric_with_unit_diag() {
        let k = Matern32::new(1.3);
        let xs = vec![vec![0.0, 0.0], vec![1.0, 0.5], vec![-0.3, 2.0]];
        let m = k.matrix(&xs);
        for i in 0..3 {
            assert_eq!(m[i * 3 + i], 1.0);
            for j in 0..3 {
                assert_eq!(m[i * 3 + j], m[j * 3 + i]);
            }
        }
    }

    #[test]
    fn cross_matches_eval() {
        let k = Matern32::new(0.8);
        let xs = vec![vec![0.0], vec![1.0]];
        let ys = vec![vec![0.5]];
        let c = k.cross(&xs, &ys);
        assert_eq!(c.len(), 2);
        assert!((c[0] - k.eval(&[0.0], &[0.5])).abs() < 1e-15);
        assert!((c[1] - k.eval(&[1.0], &[0.5])).abs() < 1e-15);
    }
}
