// SPDX-License-Identifier: AGPL-3.0-or-later
// © 2025 Ryo ∴ SpiralArchitect (kishkavsesvit@icloud.com)
// Part of SpiralTorch — Licensed under AGPL-3.0-or-later.
// Unauthorized derivative works or closed redistribution prohibited under AGPL §13.

//! Convex blend of a variant set.
//!
//! `x_mix = (1 - m) * x_0 + m * sum_i softmax(q)_i * x_i` with the mask `m`
//! stored as an `(N, 1)` tensor and the logits `q` as `(N, W)`.

use crate::error::{RobustError, RobustResult};
use crate::generator::VariantSet;
use crate::staging::ensure_device;
use st_tensor::{Tensor, TensorError};

/// Gradients of a scalar objective with respect to the blend parameters.
#[derive(Clone, Debug, PartialEq)]
pub struct CombinerGradients {
    /// `(N, 1)`.
    pub mask: Tensor,
    /// `(N, W)`.
    pub logits: Tensor,
}

const SIMPLEX_TOLERANCE: f32 = 1e-4;

#[derive(Clone, Copy, Debug, Default)]
pub struct ConvexCombiner;

impl ConvexCombiner {
    /// Row-wise softmax of the logits.
    pub fn mixture_weights(logits: &Tensor) -> Tensor {
        logits.row_softmax()
    }

    pub fn forward(variants: &VariantSet, mask: &Tensor, logits: &Tensor) -> RobustResult<Tensor> {
        Self::check_logits(variants, logits)?;
        Self::forward_with_weights(variants, mask, &Self::mixture_weights(logits))
    }

    /// Blends with explicit simplex weights instead of logits.
    pub fn forward_with_weights(
        variants: &VariantSet,
        mask: &Tensor,
        weights: &Tensor,
    ) -> RobustResult<Tensor> {
        Self::check_mask(variants, mask)?;
        Self::check_logits(variants, weights)?;
        Self::check_simplex(weights)?;
        ensure_device(weights, variants.original().device())?;
        let mixture = Self::inner_mixture(variants, weights)?;
        let original = variants.original();
        let (rows, cols) = variants.shape();
        let mut out = original.clone();
        let m = mask.data();
        for n in 0..rows {
            let keep = 1.0 - m[n];
            let blend = m[n];
            let x0 = original.row(n)?;
            let mix = mixture.row(n)?;
            let row = out.row_mut(n)?;
            for t in 0..cols {
                row[t] = keep * x0[t] + blend * mix[t];
            }
        }
        Ok(out)
    }

    /// Closed-form gradients of an objective with `d loss / d x_mix = grad_output`.
    pub fn backward(
        variants: &VariantSet,
        mask: &Tensor,
        logits: &Tensor,
        grad_output: &Tensor,
    ) -> RobustResult<CombinerGradients> {
        Self::check_mask(variants, mask)?;
        Self::check_logits(variants, logits)?;
        if grad_output.shape() != variants.shape() {
            return Err(TensorError::ShapeMismatch {
                left: grad_output.shape(),
                right: variants.shape(),
            }
            .into());
        }
        let weights = Self::mixture_weights(logits);
        let mixture = Self::inner_mixture(variants, &weights)?;

        let grad_mask = grad_output.row_dot(&mixture.sub(variants.original())?)?;

        let (rows, width) = weights.shape();
        let per_variant = variants
            .augmented()
            .iter()
            .map(|variant| grad_output.row_dot(variant))
            .collect::<Result<Vec<_>, _>>()?;
        let mut grad_logits = Tensor::zeros(rows, width)?;
        for n in 0..rows {
            let m = mask.data()[n];
            let w = weights.row(n)?;
            let a: Vec<f32> = (0..width).map(|i| m * per_variant[i][n]).collect();
            let expected: f32 = w.iter().zip(&a).map(|(wi, ai)| wi * ai).sum();
            let row = grad_logits.row_mut(n)?;
            for j in 0..width {
                row[j] = w[j] * (a[j] - expected);
            }
        }

        let mut grad_mask = Tensor::from_vec(rows, 1, grad_mask)?;
        grad_mask.set_device(mask.device());
        grad_logits.set_device(logits.device());
        Ok(CombinerGradients {
            mask: grad_mask,
            logits: grad_logits,
        })
    }

    fn inner_mixture(variants: &VariantSet, weights: &Tensor) -> RobustResult<Tensor> {
        let (rows, cols) = variants.shape();
        let mut mixture = Tensor::zeros(rows, cols)?;
        mixture.set_device(variants.original().device());
        for (i, variant) in variants.augmented().iter().enumerate() {
            let column = weights.column(i)?;
            mixture.add_scaled(&variant.scale_rows(&column)?, 1.0)?;
        }
        Ok(mixture)
    }

    fn check_mask(variants: &VariantSet, mask: &Tensor) -> RobustResult<()> {
        let expected = (variants.shape().0, 1);
        if mask.shape() != expected {
            return Err(RobustError::invalid_config(
                "mask",
                format!("expected shape {expected:?}, got {:?}", mask.shape()),
            ));
        }
        if let Some(m) = mask.data().iter().find(|m| !(0.0..=1.0).contains(*m)) {
            return Err(RobustError::invalid_config(
                "mask",
                format!("mix-in value {m} outside [0, 1]"),
            ));
        }
        ensure_device(mask, variants.original().device())
    }

    /// Every weight row must be non-negative and sum to one.
    fn check_simplex(weights: &Tensor) -> RobustResult<()> {
        for (n, row) in weights.rows_iter().enumerate() {
            let total: f32 = row.iter().sum();
            if row.iter().any(|w| !(*w >= 0.0)) || (total - 1.0).abs() > SIMPLEX_TOLERANCE {
                return Err(RobustError::invalid_config(
                    "weights",
                    format!("row {n} is not a probability vector: {row:?}"),
                ));
            }
        }
        Ok(())
    }

    fn check_logits(variants: &VariantSet, logits: &Tensor) -> RobustResult<()> {
        let expected = (variants.shape().0, variants.width());
        if logits.shape() != expected {
            return Err(RobustError::invalid_config(
                "logits",
                format!("expected shape {expected:?}, got {:?}", logits.shape()),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use st_tensor::Device;

    fn variants() -> VariantSet {
        let x0 = Tensor::from_rows(&[vec![1.0, 2.0, 3.0], vec![-1.0, 0.5, 0.0]]).unwrap();
        let x1 = x0.scale(0.5);
        let x2 = x0.map(|v| v + 1.0);
        let x3 = Tensor::from_rows(&[vec![0.0, 0.0, 1.0], vec![2.0, 2.0, 2.0]]).unwrap();
        VariantSet::new(vec![x0, x1, x2, x3]).unwrap()
    }

    fn loss(x: &Tensor, c: &Tensor) -> f32 {
        x.hadamard(c).unwrap().data().iter().sum()
    }

    #[test]
    fn weights_lie_on_the_simplex() {
        let q = Tensor::from_rows(&[vec![3.0, -2.0, 0.1], vec![-50.0, 40.0, 0.0]]).unwrap();
        let w = ConvexCombiner::mixture_weights(&q);
        for row in w.rows_iter() {
            assert!(row.iter().all(|v| *v >= 0.0));
            assert_relative_eq!(row.iter().sum::<f32>(), 1.0, epsilon = 1e-6);
        }
    }

    #[test]
    fn zero_mask_returns_the_original_exactly() {
        let set = variants();
        let m = Tensor::zeros(2, 1).unwrap();
        let q = Tensor::from_rows(&[vec![0.3, 0.1, 0.9], vec![1.0, -1.0, 0.0]]).unwrap();
        let out = ConvexCombiner::forward(&set, &m, &q).unwrap();
        assert_eq!(&out, set.original());
    }

    #[test]
    fn full_mask_with_dominant_logit_selects_that_variant() {
        let set = variants();
        let m = Tensor::full(2, 1, 1.0).unwrap();
        let q = Tensor::from_rows(&[vec![0.0, 60.0, 0.0], vec![0.0, 0.0, 60.0]]).unwrap();
        let out = ConvexCombiner::forward(&set, &m, &q).unwrap();
        for (a, b) in out.row(0).unwrap().iter().zip(set.augmented()[1].row(0).unwrap()) {
            assert_relative_eq!(*a, *b, epsilon = 1e-5);
        }
        for (a, b) in out.row(1).unwrap().iter().zip(set.augmented()[2].row(1).unwrap()) {
            assert_relative_eq!(*a, *b, epsilon = 1e-5);
        }
    }

    #[test]
    fn repeated_combination_is_bit_identical() {
        let set = variants();
        let m = Tensor::from_vec(2, 1, vec![0.25, 0.8]).unwrap();
        let q = Tensor::from_rows(&[vec![0.3, 0.1, 0.9], vec![1.0, -1.0, 0.0]]).unwrap();
        let a = ConvexCombiner::forward(&set, &m, &q).unwrap();
        let b = ConvexCombiner::forward(&set, &m, &q).unwrap();
        assert_eq!(a.data(), b.data());
    }

    #[test]
    fn analytic_gradients_match_finite_differences() {
        let set = variants();
        let c = Tensor::from_rows(&[vec![0.7, -1.2, 0.4], vec![0.2, 0.9, -0.5]]).unwrap();
        let m = Tensor::from_vec(2, 1, vec![0.4, 0.6]).unwrap();
        let q = Tensor::from_rows(&[vec![0.2, -0.3, 0.5], vec![-0.1, 0.4, 0.0]]).unwrap();
        let grads = ConvexCombiner::backward(&set, &m, &q, &c).unwrap();

        let h = 1e-2f32;
        for n in 0..2 {
            let mut plus = m.clone();
            plus.data_mut()[n] += h;
            let mut minus = m.clone();
            minus.data_mut()[n] -= h;
            let numeric = (loss(&ConvexCombiner::forward(&set, &plus, &q).unwrap(), &c)
                - loss(&ConvexCombiner::forward(&set, &minus, &q).unwrap(), &c))
                / (2.0 * h);
            assert_relative_eq!(grads.mask.data()[n], numeric, epsilon = 1e-3);
        }
        for idx in 0..6 {
            let mut plus = q.clone();
            plus.data_mut()[idx] += h;
            let mut minus = q.clone();
            minus.data_mut()[idx] -= h;
            let numeric = (loss(&ConvexCombiner::forward(&set, &m, &plus).unwrap(), &c)
                - loss(&ConvexCombiner::forward(&set, &m, &minus).unwrap(), &c))
                / (2.0 * h);
            assert_relative_eq!(grads.logits.data()[idx], numeric, epsilon = 1e-3);
        }
    }

    #[test]
    fn malformed_blend_parameters_are_rejected() {
        let set = variants();
        let m = Tensor::zeros(2, 2).unwrap();
        let q = Tensor::zeros(2, 3).unwrap();
        assert!(matches!(
            ConvexCombiner::forward(&set, &m, &q),
            Err(RobustError::InvalidConfig { field: "mask", .. })
        ));
        let m = Tensor::zeros(2, 1).unwrap();
        let q = Tensor::zeros(2, 2).unwrap();
        assert!(matches!(
            ConvexCombiner::forward(&set, &m, &q),
            Err(RobustError::InvalidConfig { field: "logits", .. })
        ));
    }

    #[test]
    fn weights_off_the_simplex_are_rejected() {
        let set = variants();
        let m = Tensor::full(2, 1, 0.5).unwrap();
        let negative = Tensor::from_rows(&[vec![1.2, -0.2, 0.0], vec![0.2, 0.3, 0.5]]).unwrap();
        assert!(matches!(
            ConvexCombiner::forward_with_weights(&set, &m, &negative),
            Err(RobustError::InvalidConfig { field: "weights", .. })
        ));
        let unnormalised = Tensor::full(2, 3, 0.5).unwrap();
        assert!(matches!(
            ConvexCombiner::forward_with_weights(&set, &m, &unnormalised),
            Err(RobustError::InvalidConfig { field: "weights", .. })
        ));
        let nan = Tensor::from_rows(&[vec![f32::NAN, 0.5, 0.5], vec![0.2, 0.3, 0.5]]).unwrap();
        assert!(ConvexCombiner::forward_with_weights(&set, &m, &nan).is_err());
        let uniform = Tensor::full(2, 3, 1.0 / 3.0).unwrap();
        assert!(ConvexCombiner::forward_with_weights(&set, &m, &uniform).is_ok());
    }

    #[test]
    fn mask_outside_unit_interval_is_rejected() {
        let set = variants();
        let q = Tensor::zeros(2, 3).unwrap();
        let m = Tensor::from_vec(2, 1, vec![0.5, 1.5]).unwrap();
        assert!(matches!(
            ConvexCombiner::forward(&set, &m, &q),
            Err(RobustError::InvalidConfig { field: "mask", .. })
        ));
    }

    #[test]
    fn blend_parameters_on_another_device_are_reported() {
        let set = variants();
        let q = Tensor::zeros(2, 3).unwrap();
        let m = Tensor::full(2, 1, 0.5).unwrap().to_device(Device::Cuda(0));
        assert!(matches!(
            ConvexCombiner::forward(&set, &m, &q),
            Err(RobustError::DeviceTransfer { found: Device::Cuda(0), .. })
        ));
        let m = Tensor::full(2, 1, 0.5).unwrap();
        let w = Tensor::full(2, 3, 1.0 / 3.0).unwrap().to_device(Device::Cuda(0));
        assert!(matches!(
            ConvexCombiner::forward_with_weights(&set, &m, &w),
            Err(RobustError::DeviceTransfer { .. })
        ));
    }
}
