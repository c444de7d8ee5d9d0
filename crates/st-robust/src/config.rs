// SPDX-License-Identifier: AGPL-3.0-or-later
// © 2025 Ryo ∴ SpiralArchitect (kishkavsesvit@icloud.com)
// Part of SpiralTorch — Licensed under AGPL-3.0-or-later.
// Unauthorized derivative works or closed redistribution prohibited under AGPL §13.

use crate::error::{RobustError, RobustResult};
use serde::{Deserialize, Serialize};
use spiral_config::LayeredConfig;
use st_audio::{MAX_SEVERITY, SAMPLE_RATE};

/// Sign-ascent step size, shared by every example or given per example.
///
/// The same value bounds the distortion and sizes each update.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Epsilon {
    Scalar(f32),
    PerExample(Vec<f32>),
}

impl Default for Epsilon {
    fn default() -> Self {
        Epsilon::Scalar(0.1)
    }
}

impl From<f32> for Epsilon {
    fn from(value: f32) -> Self {
        Epsilon::Scalar(value)
    }
}

impl Epsilon {
    fn validate(&self) -> RobustResult<()> {
        let values: &[f32] = match self {
            Epsilon::Scalar(value) => core::slice::from_ref(value),
            Epsilon::PerExample(values) => values,
        };
        if values.is_empty() {
            return Err(RobustError::invalid_config(
                "eps",
                "per-example step sizes must not be empty",
            ));
        }
        if let Some(bad) = values.iter().find(|v| !v.is_finite() || **v <= 0.0) {
            return Err(RobustError::invalid_config(
                "eps",
                format!("step size must be finite and positive, got {bad}"),
            ));
        }
        Ok(())
    }

    /// Expands to one step size per example.
    pub fn per_example(&self, batch_size: usize) -> RobustResult<Vec<f32>> {
        match self {
            Epsilon::Scalar(value) => Ok(vec![*value; batch_size]),
            Epsilon::PerExample(values) if values.len() == batch_size => Ok(values.clone()),
            Epsilon::PerExample(values) => Err(RobustError::invalid_config(
                "eps",
                format!(
                    "{} per-example step sizes for a batch of {batch_size}",
                    values.len()
                ),
            )),
        }
    }
}

fn validate_mixture(width: usize, severity: u32, sample_rate: u32) -> RobustResult<()> {
    if width == 0 {
        return Err(RobustError::invalid_config(
            "mixture_width",
            "at least one augmented variant is required",
        ));
    }
    if severity > MAX_SEVERITY {
        return Err(RobustError::invalid_config(
            "aug_severity",
            format!("{severity} exceeds the maximum of {MAX_SEVERITY}"),
        ));
    }
    if sample_rate != SAMPLE_RATE {
        return Err(RobustError::invalid_config(
            "sample_rate",
            format!("augmentation operators run at {SAMPLE_RATE} Hz, got {sample_rate}"),
        ));
    }
    Ok(())
}

/// Settings of the AugMax attack.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AugMaxConfig {
    pub eps: Epsilon,
    pub nb_iter: usize,
    pub targeted: bool,
    /// Run the brain in training mode while the attack differentiates it.
    pub train_mode_for_backward: bool,
    pub mixture_width: usize,
    /// Operators per variant; non-positive draws the depth from `{1, 2}`.
    pub mixture_depth: i32,
    pub aug_severity: u32,
    pub sample_rate: u32,
    pub seed: Option<u64>,
}

impl Default for AugMaxConfig {
    fn default() -> Self {
        Self {
            eps: Epsilon::default(),
            nb_iter: 10,
            targeted: false,
            train_mode_for_backward: true,
            mixture_width: 3,
            mixture_depth: -1,
            aug_severity: 3,
            sample_rate: SAMPLE_RATE,
            seed: None,
        }
    }
}

impl AugMaxConfig {
    pub fn validate(&self) -> RobustResult<()> {
        self.eps.validate()?;
        if self.nb_iter == 0 {
            return Err(RobustError::invalid_config(
                "nb_iter",
                "the attack needs at least one iteration",
            ));
        }
        validate_mixture(self.mixture_width, self.aug_severity, self.sample_rate)
    }

    /// Reads `robust.augmax`, falling back to defaults when absent.
    pub fn from_layered(config: &LayeredConfig) -> RobustResult<Self> {
        let parsed: Self = config.section(&["robust", "augmax"])?.unwrap_or_default();
        parsed.validate()?;
        Ok(parsed)
    }
}

/// Settings of the AugMix training augmentation.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AugMixConfig {
    pub mixture_width: usize,
    pub mixture_depth: i32,
    pub aug_severity: u32,
    pub sample_rate: u32,
    pub seed: Option<u64>,
}

impl Default for AugMixConfig {
    fn default() -> Self {
        Self {
            mixture_width: 3,
            mixture_depth: -1,
            aug_severity: 3,
            sample_rate: SAMPLE_RATE,
            seed: None,
        }
    }
}

impl AugMixConfig {
    pub fn validate(&self) -> RobustResult<()> {
        validate_mixture(self.mixture_width, self.aug_severity, self.sample_rate)
    }

    /// Reads `robust.augmix`, falling back to defaults when absent.
    pub fn from_layered(config: &LayeredConfig) -> RobustResult<Self> {
        let parsed: Self = config.section(&["robust", "augmix"])?.unwrap_or_default();
        parsed.validate()?;
        Ok(parsed)
    }
}
