// SPDX-License-Identifier: AGPL-3.0-or-later
// © 2025 Ryo ∴ SpiralArchitect (kishkavsesvit@icloud.com)
// Part of SpiralTorch — Licensed under AGPL-3.0-or-later.
// Unauthorized derivative works or closed redistribution prohibited under AGPL §13.

use crate::error::{RobustError, RobustResult};
use crate::staging::HostStaging;
use rand::rngs::StdRng;
use rand::Rng;
use st_audio::{AugmentationCatalog, ChannelBatch, Compose, Transform};
use st_tensor::Tensor;
use tracing::trace;

/// Composition depth for one variant: `depth` when positive, otherwise a
/// uniform draw from `{1, 2}`.
pub fn effective_depth(depth: i32, rng: &mut StdRng) -> usize {
    if depth > 0 {
        depth as usize
    } else {
        rng.gen_range(1..=2)
    }
}

/// `[original, augmented_1, ..., augmented_W]`, all of one shape and device.
#[derive(Clone, Debug, PartialEq)]
pub struct VariantSet {
    variants: Vec<Tensor>,
}

impl VariantSet {
    pub fn new(variants: Vec<Tensor>) -> RobustResult<Self> {
        let Some(original) = variants.first() else {
            return Err(RobustError::invalid_config(
                "variants",
                "a variant set needs at least the original signal",
            ));
        };
        let expected = original.shape();
        for (index, variant) in variants.iter().enumerate().skip(1) {
            if variant.shape() != expected {
                return Err(RobustError::VariantShape {
                    index,
                    expected,
                    got: variant.shape(),
                });
            }
            if variant.device() != original.device() {
                return Err(RobustError::DeviceTransfer {
                    expected: original.device(),
                    found: variant.device(),
                });
            }
        }
        Ok(Self { variants })
    }

    pub fn original(&self) -> &Tensor {
        &self.variants[0]
    }

    pub fn augmented(&self) -> &[Tensor] {
        &self.variants[1..]
    }

    /// Number of augmented variants (`W`).
    pub fn width(&self) -> usize {
        self.variants.len() - 1
    }

    pub fn len(&self) -> usize {
        self.variants.len()
    }

    pub fn is_empty(&self) -> bool {
        self.variants.is_empty()
    }

    /// `(N, T)` shared by every variant.
    pub fn shape(&self) -> (usize, usize) {
        self.original().shape()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Tensor> {
        self.variants.iter()
    }
}

/// Builds randomly augmented copies of a waveform batch.
#[derive(Clone, Debug)]
pub struct VariantGenerator {
    catalog: AugmentationCatalog,
    width: usize,
    depth: i32,
    severity: u32,
    sample_rate: u32,
}

impl VariantGenerator {
    /// Validates the severity against every catalog operator up front so a
    /// misconfigured generator never reaches the sampling loop.
    pub fn new(width: usize, depth: i32, severity: u32, sample_rate: u32) -> RobustResult<Self> {
        Self::with_catalog(
            AugmentationCatalog::default(),
            width,
            depth,
            severity,
            sample_rate,
        )
    }

    pub fn with_catalog(
        catalog: AugmentationCatalog,
        width: usize,
        depth: i32,
        severity: u32,
        sample_rate: u32,
    ) -> RobustResult<Self> {
        if width == 0 {
            return Err(RobustError::invalid_config(
                "mixture_width",
                "at least one augmented variant is required",
            ));
        }
        for kind in catalog.kinds() {
            kind.build(severity)?;
        }
        Ok(Self {
            catalog,
            width,
            depth,
            severity,
            sample_rate,
        })
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn depth(&self) -> i32 {
        self.depth
    }

    pub fn severity(&self) -> u32 {
        self.severity
    }

    pub fn catalog(&self) -> &AugmentationCatalog {
        &self.catalog
    }

    /// One augmented copy of a host-resident `(N, T)` batch.
    fn augment_host(&self, host: &Tensor, rng: &mut StdRng) -> RobustResult<Tensor> {
        let depth = effective_depth(self.depth, rng);
        let kinds = self.catalog.sample_chain(depth, rng);
        let chain = Compose::from_kinds(&kinds, self.severity)?;
        trace!(depth, operators = ?chain.names(), "sampled augmentation chain");
        let out = chain.apply(&ChannelBatch::mono(host.clone()), self.sample_rate, rng)?;
        Ok(out.into_mono()?)
    }

    /// The original signal followed by `width` independent augmented copies.
    pub fn generate(&self, x: &Tensor, rng: &mut StdRng) -> RobustResult<VariantSet> {
        let augmented = HostStaging::scoped(x, |host| {
            (0..self.width)
                .map(|_| self.augment_host(&host, rng))
                .collect()
        })?;
        let mut variants = Vec::with_capacity(self.width + 1);
        variants.push(x.clone());
        variants.extend(augmented);
        VariantSet::new(variants)
    }
}
