// SPDX-License-Identifier: AGPL-3.0-or-later
// © 2025 Ryo ∴ SpiralArchitect (kishkavsesvit@icloud.com)
// Part of SpiralTorch — Licensed under AGPL-3.0-or-later.
// Unauthorized derivative works or closed redistribution prohibited under AGPL §13.

//! Waveform augmentation operators.
//!
//! Every operator implements [`Transform`] and is registered under an
//! [`AugmentationKind`]. A kind plus a severity yields a boxed transform via
//! [`AugmentationKind::build`]; several transforms run back to back through
//! [`Compose`]. Operators draw their random parameters independently for each
//! example and always fire, so the output of a transform is a fresh random
//! variant of its input with the same `(examples, channels, samples)` shape.

pub mod catalog;
pub mod compose;
pub mod error;
pub mod ops;
pub mod transform;

pub use catalog::{AugmentationCatalog, AugmentationKind};
pub use compose::Compose;
pub use error::{AudioError, AudioResult};
pub use transform::{ChannelBatch, Transform};

/// Sample rate every catalog operator is tuned for.
pub const SAMPLE_RATE: u32 = 16_000;

/// Largest accepted augmentation severity.
pub const MAX_SEVERITY: u32 = 10;
