//! Dense weight matrices and the per-weight genetic operators.

use rand::Rng;
use rand::rngs::StdRng;
use rand_distr::StandardNormal;
use serde::{Deserialize, Serialize};

/// Standard deviation of a single Gaussian weight perturbation.
const MUTATION_SIGMA: f64 = 0.25;

/// Row-major weight matrix connecting two layers. Rows correspond to the
/// destination layer, columns to the source layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeightMatrix {
    rows: usize,
    cols: usize,
    data: Vec<f64>,
}

impl WeightMatrix {
    /// Matrix with every weight drawn uniformly from [-1, 1].
    pub fn random(rows: usize, cols: usize, rng: &mut StdRng) -> Self {
        let data = (0..rows * cols)
            .map(|_| rng.gen_range(-1.0..=1.0))
            .collect();
        Self { rows, cols, data }
    }

    pub(crate) fn from_parts(rows: usize, cols: usize, data: Vec<f64>) -> Self {
        debug_assert_eq!(data.len(), rows * cols);
        Self { rows, cols, data }
    }

    /// Destination layer size.
    #[inline]
    pub fn rows(&self) -> usize {
        self.rows
    }

    /// Source layer size.
    #[inline]
    pub fn cols(&self) -> usize {
        self.cols
    }

    /// Raw weights, row-major.
    pub fn weights(&self) -> &[f64] {
        &self.data
    }

    /// Matrix-vector product. `input` length must equal `cols`.
    pub fn apply(&self, input: &[f64]) -> Vec<f64> {
        assert_eq!(input.len(), self.cols, "input length mismatch");
        (0..self.rows)
            .map(|r| {
                let row = &self.data[r * self.cols..(r + 1) * self.cols];
                row.iter().zip(input).map(|(w, x)| w * x).sum()
            })
            .collect()
    }

    /// Child matrix taking each weight from either parent with equal
    /// probability. Shapes must match.
    pub fn crossover(&self, other: &Self, rng: &mut StdRng) -> Self {
        assert_eq!(
            (self.rows, self.cols),
            (other.rows, other.cols),
            "crossover requires matching shapes"
        );
        let data = self
            .data
            .iter()
            .zip(&other.data)
            .map(|(a, b)| if rng.gen_bool(0.5) { *a } else { *b })
            .collect();
        Self {
            rows: self.rows,
            cols: self.cols,
            data,
        }
    }

    /// Perturb each weight independently with probability `rate` percent,
    /// adding Gaussian noise. The shape never changes.
    pub fn mutate(&mut self, rate: u8, rng: &mut StdRng) {
        for weight in &mut self.data {
            if rng.gen_ratio(u32::from(rate), 100) {
                let noise: f64 = rng.sample(StandardNormal);
                *weight += noise * MUTATION_SIGMA;
            }
        }
    }
}
