// SPDX-License-Identifier: AGPL-3.0-or-later
// © 2025 Ryo ∴ SpiralArchitect (kishkavsesvit@icloud.com)
// Part of SpiralTorch — Licensed under AGPL-3.0-or-later.
// Unauthorized derivative works or closed redistribution prohibited under AGPL §13.

//! Pure Rust row-major tensors used for waveform batches and blend parameters.
//!
//! Tensors are strictly two dimensional. A batch of `N` mono waveforms of `T`
//! samples is an `(N, T)` tensor, a per-example scalar is `(N, 1)` and a
//! per-example weight vector over `W` variants is `(N, W)`. Every operator is
//! written in safe Rust without native bindings.

use crate::device::Device;
use core::fmt;
use rand::distributions::{Distribution, Uniform};
use rand::rngs::StdRng;
use spiral_config::determinism;
use std::error::Error;

/// Result alias used throughout the pure module.
pub type PureResult<T> = Result<T, TensorError>;

/// Errors emitted by tensor utilities.
#[derive(Clone, Debug, PartialEq)]
pub enum TensorError {
    /// A tensor constructor received an invalid shape.
    InvalidDimensions { rows: usize, cols: usize },
    /// Data provided to a constructor or operator does not match the tensor shape.
    DataLength { expected: usize, got: usize },
    /// An operator was asked to combine tensors of incompatible shapes.
    ShapeMismatch {
        left: (usize, usize),
        right: (usize, usize),
    },
    /// An operator was asked to combine tensors placed on different devices.
    DeviceMismatch { left: Device, right: Device },
    /// Computation received an empty input which would otherwise trigger a panic.
    EmptyInput(&'static str),
    /// Generic configuration violation.
    InvalidValue { label: &'static str },
}

impl fmt::Display for TensorError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TensorError::InvalidDimensions { rows, cols } => {
                write!(
                    f,
                    "invalid tensor dimensions ({rows} x {cols}); both axes must be non-zero"
                )
            }
            TensorError::DataLength { expected, got } => {
                write!(f, "data length mismatch: expected {expected}, got {got}")
            }
            TensorError::ShapeMismatch { left, right } => {
                write!(
                    f,
                    "shape mismatch: left={:?}, right={:?} cannot be combined",
                    left, right
                )
            }
            TensorError::DeviceMismatch { left, right } => {
                write!(f, "device mismatch: {left} and {right} cannot be combined")
            }
            TensorError::EmptyInput(label) => {
                write!(f, "{label} must not be empty for this computation")
            }
            TensorError::InvalidValue { label } => {
                write!(f, "invalid value: {label}")
            }
        }
    }
}

impl Error for TensorError {}

/// A dense row-major 2D tensor with a device placement tag.
#[derive(Clone, Debug, PartialEq)]
pub struct Tensor {
    data: Vec<f32>,
    rows: usize,
    cols: usize,
    device: Device,
}

impl Tensor {
    fn seedable_rng(seed: Option<u64>, label: &str) -> StdRng {
        determinism::rng_from_optional(seed, label)
    }

    /// Create a tensor filled with zeros.
    pub fn zeros(rows: usize, cols: usize) -> PureResult<Self> {
        Self::full(rows, cols, 0.0)
    }

    /// Create a tensor where every element equals `value`.
    pub fn full(rows: usize, cols: usize, value: f32) -> PureResult<Self> {
        if rows == 0 || cols == 0 {
            return Err(TensorError::InvalidDimensions { rows, cols });
        }
        Ok(Self {
            data: vec![value; rows * cols],
            rows,
            cols,
            device: Device::Cpu,
        })
    }

    /// Create a tensor from raw data. The provided vector must match
    /// `rows * cols` elements.
    pub fn from_vec(rows: usize, cols: usize, data: Vec<f32>) -> PureResult<Self> {
        if rows == 0 || cols == 0 {
            return Err(TensorError::InvalidDimensions { rows, cols });
        }
        let expected = rows * cols;
        if data.len() != expected {
            return Err(TensorError::DataLength {
                expected,
                got: data.len(),
            });
        }
        Ok(Self {
            data,
            rows,
            cols,
            device: Device::Cpu,
        })
    }

    /// Builds an `(rows.len(), cols)` tensor from equally sized rows.
    pub fn from_rows(rows: &[Vec<f32>]) -> PureResult<Self> {
        let Some(first) = rows.first() else {
            return Err(TensorError::EmptyInput("Tensor::from_rows"));
        };
        let cols = first.len();
        let mut data = Vec::with_capacity(rows.len() * cols);
        for row in rows {
            if row.len() != cols {
                return Err(TensorError::DataLength {
                    expected: cols,
                    got: row.len(),
                });
            }
            data.extend_from_slice(row);
        }
        Self::from_vec(rows.len(), cols, data)
    }

    /// Construct a tensor by sampling a uniform distribution in `[min, max)`.
    ///
    /// When `seed` is provided the RNG becomes deterministic which makes tests
    /// reproducible. Otherwise the labelled deterministic stream or host
    /// entropy is used.
    pub fn random_uniform(
        rows: usize,
        cols: usize,
        min: f32,
        max: f32,
        seed: Option<u64>,
    ) -> PureResult<Self> {
        let mut rng = Self::seedable_rng(seed, "st-tensor/tensor/uniform");
        Self::random_uniform_with(rows, cols, min, max, &mut rng)
    }

    /// Uniform sampling in `[min, max)` drawing from a caller-owned RNG.
    pub fn random_uniform_with<R: rand::Rng + ?Sized>(
        rows: usize,
        cols: usize,
        min: f32,
        max: f32,
        rng: &mut R,
    ) -> PureResult<Self> {
        if rows == 0 || cols == 0 {
            return Err(TensorError::InvalidDimensions { rows, cols });
        }
        if !(min < max) {
            return Err(TensorError::InvalidValue {
                label: "random_uniform_bounds",
            });
        }
        let distribution = Uniform::new(min, max);
        let data = (0..rows * cols)
            .map(|_| distribution.sample(&mut *rng))
            .collect();
        Self::from_vec(rows, cols, data)
    }

    /// Construct a tensor by applying a generator function to each coordinate.
    pub fn from_fn<F>(rows: usize, cols: usize, mut f: F) -> PureResult<Self>
    where
        F: FnMut(usize, usize) -> f32,
    {
        if rows == 0 || cols == 0 {
            return Err(TensorError::InvalidDimensions { rows, cols });
        }
        let mut data = Vec::with_capacity(rows * cols);
        for r in 0..rows {
            for c in 0..cols {
                data.push(f(r, c));
            }
        }
        Self::from_vec(rows, cols, data)
    }

    /// Returns the `(rows, cols)` pair of the tensor.
    pub fn shape(&self) -> (usize, usize) {
        (self.rows, self.cols)
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    /// Total number of elements stored in the tensor.
    #[inline]
    pub fn len(&self) -> usize {
        self.rows * self.cols
    }

    /// Always false; constructors reject empty shapes.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn data(&self) -> &[f32] {
        &self.data
    }

    pub fn data_mut(&mut self) -> &mut [f32] {
        &mut self.data
    }

    /// Consumes the tensor returning its row-major buffer.
    pub fn into_vec(self) -> Vec<f32> {
        self.data
    }

    /// Borrow a single row.
    pub fn row(&self, index: usize) -> PureResult<&[f32]> {
        if index >= self.rows {
            return Err(TensorError::InvalidValue {
                label: "row_index_out_of_bounds",
            });
        }
        let start = index * self.cols;
        Ok(&self.data[start..start + self.cols])
    }

    /// Mutably borrow a single row.
    pub fn row_mut(&mut self, index: usize) -> PureResult<&mut [f32]> {
        if index >= self.rows {
            return Err(TensorError::InvalidValue {
                label: "row_index_out_of_bounds",
            });
        }
        let start = index * self.cols;
        Ok(&mut self.data[start..start + self.cols])
    }

    /// Iterates over the rows as slices.
    pub fn rows_iter(&self) -> impl Iterator<Item = &[f32]> {
        self.data.chunks_exact(self.cols)
    }

    /// Device the tensor is tagged with.
    pub fn device(&self) -> Device {
        self.device
    }

    /// Returns a copy tagged for `device`.
    pub fn to_device(&self, device: Device) -> Tensor {
        let mut moved = self.clone();
        moved.device = device;
        moved
    }

    /// Retags the tensor in place.
    pub fn set_device(&mut self, device: Device) {
        self.device = device;
    }

    fn ensure_compatible(&self, other: &Tensor) -> PureResult<()> {
        if self.shape() != other.shape() {
            return Err(TensorError::ShapeMismatch {
                left: self.shape(),
                right: other.shape(),
            });
        }
        if self.device != other.device {
            return Err(TensorError::DeviceMismatch {
                left: self.device,
                right: other.device,
            });
        }
        Ok(())
    }

    fn zip_map<F>(&self, other: &Tensor, mut f: F) -> PureResult<Tensor>
    where
        F: FnMut(f32, f32) -> f32,
    {
        self.ensure_compatible(other)?;
        let data = self
            .data
            .iter()
            .zip(other.data.iter())
            .map(|(&a, &b)| f(a, b))
            .collect();
        Ok(Tensor {
            data,
            rows: self.rows,
            cols: self.cols,
            device: self.device,
        })
    }

    /// Applies `f` element-wise, preserving shape and placement.
    pub fn map<F>(&self, f: F) -> Tensor
    where
        F: FnMut(f32) -> f32,
    {
        Tensor {
            data: self.data.iter().copied().map(f).collect(),
            rows: self.rows,
            cols: self.cols,
            device: self.device,
        }
    }

    /// Element-wise addition.
    pub fn add(&self, other: &Tensor) -> PureResult<Tensor> {
        self.zip_map(other, |a, b| a + b)
    }

    /// Element-wise subtraction.
    pub fn sub(&self, other: &Tensor) -> PureResult<Tensor> {
        self.zip_map(other, |a, b| a - b)
    }

    /// Element-wise product (Hadamard) between two tensors of identical shape.
    pub fn hadamard(&self, other: &Tensor) -> PureResult<Tensor> {
        self.zip_map(other, |a, b| a * b)
    }

    /// Returns a new tensor where every element is scaled by `value`.
    pub fn scale(&self, value: f32) -> Tensor {
        self.map(|a| a * value)
    }

    /// Add a scaled tensor to this tensor (`self += scale * other`).
    pub fn add_scaled(&mut self, other: &Tensor, scale: f32) -> PureResult<()> {
        self.ensure_compatible(other)?;
        for (a, b) in self.data.iter_mut().zip(other.data.iter()) {
            *a += scale * b;
        }
        Ok(())
    }

    /// Multiplies every row by its own factor (`self[r, :] *= factors[r]`).
    pub fn scale_rows(&self, factors: &[f32]) -> PureResult<Tensor> {
        if factors.len() != self.rows {
            return Err(TensorError::DataLength {
                expected: self.rows,
                got: factors.len(),
            });
        }
        let mut out = self.clone();
        for (row, &factor) in out.data.chunks_exact_mut(self.cols).zip(factors) {
            for value in row {
                *value *= factor;
            }
        }
        Ok(out)
    }

    /// Per-row inner product with another tensor of identical shape.
    pub fn row_dot(&self, other: &Tensor) -> PureResult<Vec<f32>> {
        self.ensure_compatible(other)?;
        Ok(self
            .rows_iter()
            .zip(other.rows_iter())
            .map(|(a, b)| a.iter().zip(b).map(|(x, y)| x * y).sum())
            .collect())
    }

    /// Returns a single column as a vector.
    pub fn column(&self, index: usize) -> PureResult<Vec<f32>> {
        if index >= self.cols {
            return Err(TensorError::InvalidValue {
                label: "column_index_out_of_bounds",
            });
        }
        Ok(self.rows_iter().map(|row| row[index]).collect())
    }

    /// Numerically stable softmax over each row.
    pub fn row_softmax(&self) -> Tensor {
        let mut out = self.clone();
        for row in out.data.chunks_exact_mut(self.cols) {
            let max = row.iter().copied().fold(f32::NEG_INFINITY, f32::max);
            let mut total = 0.0f32;
            for value in row.iter_mut() {
                *value = (*value - max).exp();
                total += *value;
            }
            let inv = 1.0 / total;
            for value in row.iter_mut() {
                *value *= inv;
            }
        }
        out
    }

    /// Element-wise sign with `sign(0) == 0`.
    pub fn sign(&self) -> Tensor {
        self.map(|value| {
            if value > 0.0 {
                1.0
            } else if value < 0.0 {
                -1.0
            } else {
                0.0
            }
        })
    }

    /// Clamps every element into `[min, max]`.
    pub fn clamp(&self, min: f32, max: f32) -> Tensor {
        self.map(|value| value.clamp(min, max))
    }

    /// Returns the sum over columns for each row.
    pub fn sum_axis1(&self) -> Vec<f32> {
        self.rows_iter().map(|row| row.iter().sum()).collect()
    }

    /// Smallest element.
    pub fn min_value(&self) -> f32 {
        self.data.iter().copied().fold(f32::INFINITY, f32::min)
    }

    /// Largest element.
    pub fn max_value(&self) -> f32 {
        self.data.iter().copied().fold(f32::NEG_INFINITY, f32::max)
    }

    /// True when no element is NaN or infinite.
    pub fn is_finite(&self) -> bool {
        self.data.iter().all(|value| value.is_finite())
    }

    /// Concatenates tensors row-wise producing a new tensor whose row count is the sum
    /// of the inputs while preserving the shared column dimension.
    pub fn cat_rows(tensors: &[Tensor]) -> PureResult<Tensor> {
        let Some(first) = tensors.first() else {
            return Err(TensorError::EmptyInput("Tensor::cat_rows"));
        };
        let mut data = Vec::with_capacity(tensors.iter().map(Tensor::len).sum());
        let mut total_rows = 0usize;
        for tensor in tensors {
            if tensor.cols != first.cols {
                return Err(TensorError::ShapeMismatch {
                    left: tensor.shape(),
                    right: (tensor.rows, first.cols),
                });
            }
            if tensor.device != first.device {
                return Err(TensorError::DeviceMismatch {
                    left: first.device,
                    right: tensor.device,
                });
            }
            total_rows += tensor.rows;
            data.extend_from_slice(&tensor.data);
        }
        let mut out = Tensor::from_vec(total_rows, first.cols, data)?;
        out.device = first.device;
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn constructors_reject_bad_shapes() {
        assert_eq!(
            Tensor::zeros(0, 3).unwrap_err(),
            TensorError::InvalidDimensions { rows: 0, cols: 3 }
        );
        assert_eq!(
            Tensor::from_vec(2, 2, vec![1.0; 3]).unwrap_err(),
            TensorError::DataLength {
                expected: 4,
                got: 3
            }
        );
        assert!(Tensor::from_rows(&[vec![1.0, 2.0], vec![3.0]]).is_err());
    }

    #[test]
    fn row_softmax_is_a_distribution() {
        let logits = Tensor::from_vec(2, 3, vec![0.1, 2.0, -1.0, 50.0, 50.0, -50.0]).unwrap();
        let probs = logits.row_softmax();
        for row in probs.rows_iter() {
            assert!(row.iter().all(|&p| p >= 0.0));
            assert_abs_diff_eq!(row.iter().sum::<f32>(), 1.0, epsilon = 1e-6);
        }
        assert_abs_diff_eq!(probs.data()[3], 0.5, epsilon = 1e-6);
    }

    #[test]
    fn sign_and_clamp_follow_elementwise_rules() {
        let t = Tensor::from_vec(1, 4, vec![-2.0, 0.0, 0.3, 1.7]).unwrap();
        assert_eq!(t.sign().data(), &[-1.0, 0.0, 1.0, 1.0]);
        assert_eq!(t.clamp(0.0, 1.0).data(), &[0.0, 0.0, 0.3, 1.0]);
    }

    #[test]
    fn device_tags_guard_binary_ops() {
        let a = Tensor::full(1, 2, 1.0).unwrap();
        let b = a.to_device(Device::Cuda(0));
        assert_eq!(
            a.add(&b).unwrap_err(),
            TensorError::DeviceMismatch {
                left: Device::Cpu,
                right: Device::Cuda(0)
            }
        );
        let back = b.to_device(Device::Cpu);
        assert_eq!(a.add(&back).unwrap().data(), &[2.0, 2.0]);
    }

    #[test]
    fn row_helpers_broadcast_per_example() {
        let t = Tensor::from_vec(2, 2, vec![1.0, 2.0, 3.0, 4.0]).unwrap();
        let scaled = t.scale_rows(&[2.0, -1.0]).unwrap();
        assert_eq!(scaled.data(), &[2.0, 4.0, -3.0, -4.0]);
        assert_eq!(t.row_dot(&t).unwrap(), vec![5.0, 25.0]);
        assert_eq!(t.sum_axis1(), vec![3.0, 7.0]);
        assert_eq!(t.column(1).unwrap(), vec![2.0, 4.0]);
    }

    #[test]
    fn seeded_uniform_is_reproducible_and_bounded() {
        let a = Tensor::random_uniform(3, 4, 0.0, 1.0, Some(7)).unwrap();
        let b = Tensor::random_uniform(3, 4, 0.0, 1.0, Some(7)).unwrap();
        assert_eq!(a, b);
        assert!(a.min_value() >= 0.0 && a.max_value() < 1.0);
        assert!(Tensor::random_uniform(1, 1, 1.0, 1.0, Some(1)).is_err());
    }
}
