// SPDX-License-Identifier: AGPL-3.0-or-later
// © 2025 Ryo ∴ SpiralArchitect (kishkavsesvit@icloud.com)
// Part of SpiralTorch — Licensed under AGPL-3.0-or-later.
// Unauthorized derivative works or closed redistribution prohibited under AGPL §13.

use crate::error::{AudioError, AudioResult};
use crate::ops::{
    AddColoredNoise, BandPassFilter, BandStopFilter, Gain, HighPassFilter, LowPassFilter,
    PeakNormalization, PitchShift, PolarityInversion,
};
use crate::transform::Transform;
use crate::MAX_SEVERITY;
use rand::rngs::StdRng;
use rand::Rng;
use serde::{Deserialize, Serialize};

/// Registered augmentation operators.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AugmentationKind {
    Gain,
    BandPassFilter,
    BandStopFilter,
    AddColoredNoise,
    HighPassFilter,
    LowPassFilter,
    PeakNormalization,
    PitchShift,
    PolarityInversion,
}

/// Operators drawn from when no explicit catalog is configured.
pub const DEFAULT_CATALOG: [AugmentationKind; 8] = [
    AugmentationKind::Gain,
    AugmentationKind::BandPassFilter,
    AugmentationKind::BandStopFilter,
    AugmentationKind::AddColoredNoise,
    AugmentationKind::HighPassFilter,
    AugmentationKind::LowPassFilter,
    AugmentationKind::PeakNormalization,
    AugmentationKind::PitchShift,
];

impl AugmentationKind {
    pub fn name(self) -> &'static str {
        match self {
            AugmentationKind::Gain => "gain",
            AugmentationKind::BandPassFilter => "band_pass_filter",
            AugmentationKind::BandStopFilter => "band_stop_filter",
            AugmentationKind::AddColoredNoise => "add_colored_noise",
            AugmentationKind::HighPassFilter => "high_pass_filter",
            AugmentationKind::LowPassFilter => "low_pass_filter",
            AugmentationKind::PeakNormalization => "peak_normalization",
            AugmentationKind::PitchShift => "pitch_shift",
            AugmentationKind::PolarityInversion => "polarity_inversion",
        }
    }

    /// Instantiates the operator. The severity is range-checked but the
    /// parameter ranges themselves are fixed per operator.
    pub fn build(self, severity: u32) -> AudioResult<Box<dyn Transform>> {
        if severity > MAX_SEVERITY {
            return Err(AudioError::InvalidSeverity {
                severity,
                max: MAX_SEVERITY,
            });
        }
        let op: Box<dyn Transform> = match self {
            AugmentationKind::Gain => Box::new(Gain::default()),
            AugmentationKind::BandPassFilter => Box::new(BandPassFilter::default()),
            AugmentationKind::BandStopFilter => Box::new(BandStopFilter::default()),
            AugmentationKind::AddColoredNoise => Box::new(AddColoredNoise::default()),
            AugmentationKind::HighPassFilter => Box::new(HighPassFilter::default()),
            AugmentationKind::LowPassFilter => Box::new(LowPassFilter::default()),
            AugmentationKind::PeakNormalization => Box::new(PeakNormalization),
            AugmentationKind::PitchShift => Box::new(PitchShift::default()),
            AugmentationKind::PolarityInversion => Box::new(PolarityInversion),
        };
        Ok(op)
    }
}

/// Non-empty set of operators sampled uniformly with replacement.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AugmentationCatalog {
    kinds: Vec<AugmentationKind>,
}

impl Default for AugmentationCatalog {
    fn default() -> Self {
        Self {
            kinds: DEFAULT_CATALOG.to_vec(),
        }
    }
}

impl AugmentationCatalog {
    pub fn new(kinds: Vec<AugmentationKind>) -> AudioResult<Self> {
        if kinds.is_empty() {
            return Err(AudioError::EmptyCatalog);
        }
        Ok(Self { kinds })
    }

    pub fn kinds(&self) -> &[AugmentationKind] {
        &self.kinds
    }

    pub fn len(&self) -> usize {
        self.kinds.len()
    }

    pub fn is_empty(&self) -> bool {
        self.kinds.is_empty()
    }

    pub fn sample(&self, rng: &mut StdRng) -> AugmentationKind {
        self.kinds[rng.gen_range(0..self.kinds.len())]
    }

    /// Draws `count` operators with replacement.
    pub fn sample_chain(&self, count: usize, rng: &mut StdRng) -> Vec<AugmentationKind> {
        (0..count).map(|_| self.sample(rng)).collect()
    }
}
