//! Covariance functions over mixed categorical / continuous inputs
//!
//! Categorical columns use an overlap kernel with one lengthscale per column:
//! `k_cat(x, x') = exp(-(1/|C|) Σ_j [x_j ≠ x'_j] / ℓ_j)`.
//! Continuous columns use an ARD RBF kernel:
//! `k_rbf(x, x') = exp(-½ Σ_j (x_j − x'_j)² / ℓ_j²)`.
//!
//! The two are combined depending on which column sets are populated:
//! - categorical only: `s · k_cat`
//! - continuous only: `s · k_rbf`
//! - both: `s₁ (k_rbf + k_cat) + s₂ (k_rbf · k_cat)`
//!
//! Positive parameters are stored unconstrained and mapped through softplus.

use crate::errors::{CoreError, Result};
use ndarray::{Array1, Array2, ArrayView1};
use serde::{Deserialize, Serialize};

/// `ln(1 + eˣ)` without overflow
pub fn softplus(raw: f64) -> f64 {
    if raw > 20.0 {
        raw
    } else {
        raw.exp().ln_1p()
    }
}

/// Derivative of [`softplus`]
pub fn softplus_grad(raw: f64) -> f64 {
    1.0 / (1.0 + (-raw).exp())
}

/// Inverse of [`softplus`] for positive values
pub fn inverse_softplus(value: f64) -> f64 {
    if value > 20.0 {
        value
    } else {
        value.exp_m1().ln()
    }
}

/// Two categorical values count as equal below this distance
const CATEGORY_EPS: f64 = 1e-8;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KernelStructure {
    CategoricalOnly,
    ContinuousOnly,
    Mixed,
}

/// Learned kernel, parameterized by raw (unconstrained) values
#[derive(Debug, Clone, PartialEq)]
pub struct MixedKernel {
    cat_dims: Vec<usize>,
    cont_dims: Vec<usize>,
    structure: KernelStructure,
    raw_cat_lengthscales: Vec<f64>,
    raw_cont_lengthscales: Vec<f64>,
    raw_outputscales: Vec<f64>,
}

/// Positive-space view of the kernel parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KernelHyperparameters {
    pub structure: KernelStructure,
    pub categorical_lengthscales: Vec<f64>,
    pub continuous_lengthscales: Vec<f64>,
    pub outputscales: Vec<f64>,
}

impl MixedKernel {
    /// Build a kernel routing `cat_dims` to the overlap kernel and `cont_dims`
    /// to the RBF kernel. Either set may be empty, not both.
    pub fn new(cat_dims: Vec<usize>, cont_dims: Vec<usize>) -> Result<Self> {
        let structure = match (cat_dims.is_empty(), cont_dims.is_empty()) {
            (false, true) => KernelStructure::CategoricalOnly,
            (true, false) => KernelStructure::ContinuousOnly,
            (false, false) => KernelStructure::Mixed,
            (true, true) => {
                return Err(CoreError::InvalidParameters(
                    "kernel needs at least one input dimension".into(),
                ))
            }
        };
        let outputscales = if structure == KernelStructure::Mixed { 2 } else { 1 };

        Ok(Self {
            raw_cat_lengthscales: vec![0.0; cat_dims.len()],
            raw_cont_lengthscales: vec![0.0; cont_dims.len()],
            raw_outputscales: vec![0.0; outputscales],
            cat_dims,
            cont_dims,
            structure,
        })
    }

    pub fn structure(&self) -> KernelStructure {
        self.structure
    }

    pub fn cat_dims(&self) -> &[usize] {
        &self.cat_dims
    }

    pub fn cont_dims(&self) -> &[usize] {
        &self.cont_dims
    }

    /// Highest column index referenced, plus one
    pub fn input_width(&self) -> usize {
        self.cat_dims
            .iter()
            .chain(self.cont_dims.iter())
            .max()
            .map_or(0, |m| m + 1)
    }

    pub fn num_params(&self) -> usize {
        self.raw_cat_lengthscales.len() + self.raw_cont_lengthscales.len() + self.raw_outputscales.len()
    }

    /// Raw parameters: categorical lengthscales, continuous lengthscales, outputscales
    pub fn raw_params(&self) -> Vec<f64> {
        let mut out = Vec::with_capacity(self.num_params());
        out.extend(&self.raw_cat_lengthscales);
        out.extend(&self.raw_cont_lengthscales);
        out.extend(&self.raw_outputscales);
        out
    }

    pub fn set_raw_params(&mut self, raw: &[f64]) -> Result<()> {
        if raw.len() != self.num_params() {
            return Err(CoreError::ShapeMismatch {
                expected: self.num_params(),
                actual: raw.len(),
            });
        }
        let (cat, rest) = raw.split_at(self.raw_cat_lengthscales.len());
        let (cont, scales) = rest.split_at(self.raw_cont_lengthscales.len());
        self.raw_cat_lengthscales.copy_from_slice(cat);
        self.raw_cont_lengthscales.copy_from_slice(cont);
        self.raw_outputscales.copy_from_slice(scales);
        Ok(())
    }

    pub fn hyperparameters(&self) -> KernelHyperparameters {
        KernelHyperparameters {
            structure: self.structure,
            categorical_lengthscales: self.raw_cat_lengthscales.iter().map(|&r| softplus(r)).collect(),
            continuous_lengthscales: self.raw_cont_lengthscales.iter().map(|&r| softplus(r)).collect(),
            outputscales: self.raw_outputscales.iter().map(|&r| softplus(r)).collect(),
        }
    }

    /// `k(x, x)`; both component kernels equal one on the diagonal
    pub fn diag_value(&self) -> f64 {
        let s: Vec<f64> = self.raw_outputscales.iter().map(|&r| softplus(r)).collect();
        match self.structure {
            KernelStructure::Mixed => 2.0 * s[0] + s[1],
            _ => s[0],
        }
    }

    /// Covariance between two points
    pub fn eval(&self, a: ArrayView1<f64>, b: ArrayView1<f64>) -> f64 {
        self.eval_pair(a, b, false).0
    }

    /// Covariance vector between `x` and every row of `rows`
    pub fn cross(&self, x: ArrayView1<f64>, rows: &Array2<f64>) -> Array1<f64> {
        rows.rows().into_iter().map(|row| self.eval(x, row)).collect()
    }

    /// Covariance matrix between every pair of rows
    pub fn matrix(&self, x: &Array2<f64>) -> Array2<f64> {
        let n = x.nrows();
        let mut k = Array2::zeros((n, n));
        for i in 0..n {
            for j in 0..=i {
                let v = self.eval(x.row(i), x.row(j));
                k[[i, j]] = v;
                k[[j, i]] = v;
            }
        }
        k
    }

    /// Covariance matrix plus its derivative with respect to every raw parameter
    pub fn matrix_with_grads(&self, x: &Array2<f64>) -> (Array2<f64>, Vec<Array2<f64>>) {
        let n = x.nrows();
        let p = self.num_params();
        let mut k = Array2::zeros((n, n));
        let mut grads = vec![Array2::zeros((n, n)); p];
        for i in 0..n {
            for j in 0..=i {
                let (v, g) = self.eval_pair(x.row(i), x.row(j), true);
                k[[i, j]] = v;
                k[[j, i]] = v;
                for (dk, gv) in grads.iter_mut().zip(g) {
                    dk[[i, j]] = gv;
                    dk[[j, i]] = gv;
                }
            }
        }
        (k, grads)
    }

    fn eval_pair(&self, a: ArrayView1<f64>, b: ArrayView1<f64>, with_grad: bool) -> (f64, Vec<f64>) {
        let (kc, dkc) = self.categorical(a, b, with_grad);
        let (kr, dkr) = self.rbf(a, b, with_grad);
        let scales: Vec<f64> = self.raw_outputscales.iter().map(|&r| softplus(r)).collect();

        let (value, d_cat, d_cont, d_scales): (f64, f64, f64, Vec<f64>) = match self.structure {
            KernelStructure::CategoricalOnly => (scales[0] * kc, scales[0], 0.0, vec![kc]),
            KernelStructure::ContinuousOnly => (scales[0] * kr, 0.0, scales[0], vec![kr]),
            KernelStructure::Mixed => (
                scales[0] * (kr + kc) + scales[1] * kr * kc,
                scales[0] + scales[1] * kr,
                scales[0] + scales[1] * kc,
                vec![kr + kc, kr * kc],
            ),
        };

        if !with_grad {
            return (value, Vec::new());
        }

        let mut grads = Vec::with_capacity(self.num_params());
        for (dk, &raw) in dkc.iter().zip(&self.raw_cat_lengthscales) {
            grads.push(d_cat * dk * softplus_grad(raw));
        }
        for (dk, &raw) in dkr.iter().zip(&self.raw_cont_lengthscales) {
            grads.push(d_cont * dk * softplus_grad(raw));
        }
        for (ds, &raw) in d_scales.iter().zip(&self.raw_outputscales) {
            grads.push(ds * softplus_grad(raw));
        }
        (value, grads)
    }

    /// Overlap kernel value and its derivative w.r.t. each positive lengthscale
    fn categorical(&self, a: ArrayView1<f64>, b: ArrayView1<f64>, with_grad: bool) -> (f64, Vec<f64>) {
        if self.cat_dims.is_empty() {
            return (1.0, Vec::new());
        }
        let d = self.cat_dims.len() as f64;
        let lengthscales: Vec<f64> = self.raw_cat_lengthscales.iter().map(|&r| softplus(r)).collect();
        let mismatch: Vec<f64> = self
            .cat_dims
            .iter()
            .map(|&c| if (a[c] - b[c]).abs() > CATEGORY_EPS { 1.0 } else { 0.0 })
            .collect();

        let dist: f64 = mismatch.iter().zip(&lengthscales).map(|(m, l)| m / l).sum::<f64>() / d;
        let k = (-dist).exp();
        if !with_grad {
            return (k, Vec::new());
        }
        let grads = mismatch
            .iter()
            .zip(&lengthscales)
            .map(|(m, l)| k * m / (d * l * l))
            .collect();
        (k, grads)
    }

    /// RBF kernel value and its derivative w.r.t. each positive lengthscale
    fn rbf(&self, a: ArrayView1<f64>, b: ArrayView1<f64>, with_grad: bool) -> (f64, Vec<f64>) {
        if self.cont_dims.is_empty() {
            return (1.0, Vec::new());
        }
        let lengthscales: Vec<f64> = self.raw_cont_lengthscales.iter().map(|&r| softplus(r)).collect();
        let sq: Vec<f64> = self.cont_dims.iter().map(|&c| (a[c] - b[c]).powi(2)).collect();

        let dist: f64 = sq.iter().zip(&lengthscales).map(|(s, l)| s / (l * l)).sum::<f64>();
        let k = (-0.5 * dist).exp();
        if !with_grad {
            return (k, Vec::new());
        }
        let grads = sq
            .iter()
            .zip(&lengthscales)
            .map(|(s, l)| k * s / (l * l * l))
            .collect();
        (k, grads)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_softplus_round_trip() {
        for v in [1e-3, 0.5, 1.0, 7.0, 25.0] {
            assert!((softplus(inverse_softplus(v)) - v).abs() < 1e-9);
        }
        assert!((softplus(0.0) - 2f64.ln()).abs() < 1e-12);
    }

    #[test]
    fn test_categorical_kernel_counts_mismatches() {
        let kernel = MixedKernel::new(vec![0, 1], vec![]).unwrap();
        let a = array![0.0, 1.0];
        let b = array![0.0, 2.0];
        let l = softplus(0.0);
        let s = softplus(0.0);
        assert!((kernel.eval(a.view(), a.view()) - s).abs() < 1e-12);
        let expected = s * (-(1.0 / l) / 2.0).exp();
        assert!((kernel.eval(a.view(), b.view()) - expected).abs() < 1e-12);
    }

    #[test]
    fn test_ordinal_distance_does_not_matter_to_categorical_kernel() {
        let kernel = MixedKernel::new(vec![0], vec![]).unwrap();
        let a = array![0.0];
        assert_eq!(
            kernel.eval(a.view(), array![1.0].view()),
            kernel.eval(a.view(), array![3.0].view())
        );
    }

    #[test]
    fn test_empty_dimension_sets_are_rejected() {
        assert!(MixedKernel::new(vec![], vec![]).is_err());
    }

    #[test]
    fn test_mixed_structure_has_two_outputscales() {
        let kernel = MixedKernel::new(vec![0], vec![1]).unwrap();
        assert_eq!(kernel.structure(), KernelStructure::Mixed);
        assert_eq!(kernel.num_params(), 4);
        let x = array![[0.0, 0.3]];
        let k = kernel.matrix(&x);
        assert!((k[[0, 0]] - kernel.diag_value()).abs() < 1e-12);
    }

    #[test]
    fn test_analytic_grads_match_finite_differences() {
        let mut kernel = MixedKernel::new(vec![0, 1], vec![2]).unwrap();
        kernel.set_raw_params(&[0.3, -0.4, 0.2, 0.1, -0.7]).unwrap();
        let x = array![[0.0, 1.0, 0.1], [1.0, 1.0, 0.7], [2.0, 0.0, 0.4]];
        let (_, grads) = kernel.matrix_with_grads(&x);
        let base = kernel.raw_params();
        let h = 1e-6;
        for p in 0..base.len() {
            let mut plus = base.clone();
            plus[p] += h;
            let mut minus = base.clone();
            minus[p] -= h;
            let mut kp = kernel.clone();
            kp.set_raw_params(&plus).unwrap();
            let mut km = kernel.clone();
            km.set_raw_params(&minus).unwrap();
            let fd = (kp.matrix(&x) - km.matrix(&x)) / (2.0 * h);
            for (a, b) in fd.iter().zip(grads[p].iter()) {
                assert!((a - b).abs() < 1e-6, "param {}: fd {} vs analytic {}", p, a, b);
            }
        }
    }
}
