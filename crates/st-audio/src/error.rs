// SPDX-License-Identifier: AGPL-3.0-or-later
// © 2025 Ryo ∴ SpiralArchitect (kishkavsesvit@icloud.com)
// Part of SpiralTorch — Licensed under AGPL-3.0-or-later.
// Unauthorized derivative works or closed redistribution prohibited under AGPL §13.

use st_tensor::TensorError;
use thiserror::Error;

pub type AudioResult<T> = Result<T, AudioError>;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum AudioError {
    #[error("augmentation severity {severity} outside the supported range 0..={max}")]
    InvalidSeverity { severity: u32, max: u32 },
    #[error("invalid {label}: {value}")]
    InvalidParameter { label: &'static str, value: f32 },
    #[error("augmentation catalog must contain at least one operator")]
    EmptyCatalog,
    #[error("{operator} changed the batch shape from {expected:?} to {got:?}")]
    ShapeChanged {
        operator: &'static str,
        expected: (usize, usize, usize),
        got: (usize, usize, usize),
    },
    #[error("batch layout with {channels} channels is not supported here")]
    ChannelLayout { channels: usize },
    #[error(transparent)]
    Tensor(#[from] TensorError),
}
