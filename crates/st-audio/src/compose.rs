// SPDX-License-Identifier: AGPL-3.0-or-later
// © 2025 Ryo ∴ SpiralArchitect (kishkavsesvit@icloud.com)
// Part of SpiralTorch — Licensed under AGPL-3.0-or-later.
// Unauthorized derivative works or closed redistribution prohibited under AGPL §13.

use crate::catalog::AugmentationKind;
use crate::error::{AudioError, AudioResult};
use crate::transform::{ChannelBatch, Transform};
use rand::rngs::StdRng;
use tracing::trace;

/// Runs a chain of transforms in order.
pub struct Compose {
    transforms: Vec<Box<dyn Transform>>,
}

impl Compose {
    pub fn new(transforms: Vec<Box<dyn Transform>>) -> Self {
        Self { transforms }
    }

    /// Builds every kind at the given severity.
    pub fn from_kinds(kinds: &[AugmentationKind], severity: u32) -> AudioResult<Self> {
        let transforms = kinds
            .iter()
            .map(|kind| kind.build(severity))
            .collect::<AudioResult<Vec<_>>>()?;
        Ok(Self::new(transforms))
    }

    pub fn push(&mut self, transform: Box<dyn Transform>) {
        self.transforms.push(transform);
    }

    pub fn len(&self) -> usize {
        self.transforms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.transforms.is_empty()
    }

    pub fn names(&self) -> Vec<&'static str> {
        self.transforms.iter().map(|t| t.name()).collect()
    }
}

impl std::fmt::Debug for Compose {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Compose")
            .field("transforms", &self.names())
            .finish()
    }
}

impl Transform for Compose {
    fn name(&self) -> &'static str {
        "compose"
    }

    fn apply(
        &self,
        batch: &ChannelBatch,
        sample_rate: u32,
        rng: &mut StdRng,
    ) -> AudioResult<ChannelBatch> {
        let expected = batch.shape();
        let mut current = batch.clone();
        for transform in &self.transforms {
            current = transform.apply(&current, sample_rate, rng)?;
            let got = current.shape();
            if got != expected {
                return Err(AudioError::ShapeChanged {
                    operator: transform.name(),
                    expected,
                    got,
                });
            }
            trace!(operator = transform.name(), "applied augmentation");
        }
        Ok(current)
    }
}
