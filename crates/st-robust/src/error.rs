// SPDX-License-Identifier: AGPL-3.0-or-later
// © 2025 Ryo ∴ SpiralArchitect (kishkavsesvit@icloud.com)
// Part of SpiralTorch — Licensed under AGPL-3.0-or-later.
// Unauthorized derivative works or closed redistribution prohibited under AGPL §13.

use spiral_config::LayeredConfigError;
use st_audio::AudioError;
use st_tensor::{Device, TensorError};
use thiserror::Error;

pub type RobustResult<T> = Result<T, RobustError>;

#[derive(Debug, Error)]
pub enum RobustError {
    #[error("invalid `{field}`: {reason}")]
    InvalidConfig { field: &'static str, reason: String },
    #[error("brain `{brain}` does not expose gradients with respect to its input signal")]
    NonDifferentiable { brain: String },
    #[error("gradient with respect to `{parameter}` is unavailable")]
    GradientUnavailable { parameter: &'static str },
    #[error("device transfer failed: expected tensor on {expected}, found {found}")]
    DeviceTransfer { expected: Device, found: Device },
    #[error("variant {index} has shape {got:?} but the original signal is {expected:?}")]
    VariantShape {
        index: usize,
        expected: (usize, usize),
        got: (usize, usize),
    },
    #[error(transparent)]
    Audio(#[from] AudioError),
    #[error(transparent)]
    Tensor(#[from] TensorError),
    #[error(transparent)]
    Config(#[from] LayeredConfigError),
}

impl RobustError {
    pub(crate) fn invalid_config(field: &'static str, reason: impl Into<String>) -> Self {
        RobustError::InvalidConfig {
            field,
            reason: reason.into(),
        }
    }
}
