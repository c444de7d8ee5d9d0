// SPDX-License-Identifier: AGPL-3.0-or-later
// © 2025 Ryo ∴ SpiralArchitect (kishkavsesvit@icloud.com)
// Part of SpiralTorch — Licensed under AGPL-3.0-or-later.
// Unauthorized derivative works or closed redistribution prohibited under AGPL §13.

//! Concrete waveform operators.

pub mod filters;
pub mod gain;
pub mod level;
pub mod noise;
pub mod pitch;

pub use filters::{BandPassFilter, BandStopFilter, HighPassFilter, LowPassFilter};
pub use gain::Gain;
pub use level::{PeakNormalization, PolarityInversion};
pub use noise::AddColoredNoise;
pub use pitch::PitchShift;
