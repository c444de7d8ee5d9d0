// SPDX-License-Identifier: AGPL-3.0-or-later
// © 2025 Ryo ∴ SpiralArchitect (kishkavsesvit@icloud.com)
// Part of SpiralTorch — Licensed under AGPL-3.0-or-later.
// Unauthorized derivative works or closed redistribution prohibited under AGPL §13.

use crate::batch::AudioBatch;
use crate::brain::AsrBrain;
use crate::combiner::ConvexCombiner;
use crate::config::AugMixConfig;
use crate::error::{RobustError, RobustResult};
use crate::generator::VariantGenerator;
use crate::stage::{BrainMode, Stage};
use rand::rngs::StdRng;
use rand_distr::{Beta, Dirichlet, Distribution};
use spiral_config::rng_from_optional;
use st_tensor::{Device, Tensor};
use std::cell::RefCell;

/// Blend parameters drawn for one forward call.
#[derive(Clone, Debug, PartialEq)]
pub struct AugMixSample {
    /// `(N, 1)`, Beta(1, 1) draws.
    pub mask: Tensor,
    /// `(N, W)`, Dirichlet(1, ..., 1) draws.
    pub weights: Tensor,
}

/// Training-time augmentation mixing random variants with prior-drawn weights.
pub struct AugMixModule {
    config: AugMixConfig,
    generator: VariantGenerator,
    /// `None` for a single variant, whose weight is always 1.
    dirichlet: Option<Dirichlet<f32>>,
    beta: Beta<f32>,
    rng: RefCell<StdRng>,
}

impl core::fmt::Debug for AugMixModule {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("AugMixModule")
            .field("config", &self.config)
            .finish()
    }
}

impl AugMixModule {
    pub fn new(config: AugMixConfig) -> RobustResult<Self> {
        config.validate()?;
        let generator = VariantGenerator::new(
            config.mixture_width,
            config.mixture_depth,
            config.aug_severity,
            config.sample_rate,
        )?;
        let dirichlet = if config.mixture_width > 1 {
            Some(
                Dirichlet::new_with_size(1.0, config.mixture_width)
                    .map_err(|err| RobustError::invalid_config("mixture_width", err.to_string()))?,
            )
        } else {
            None
        };
        let beta = Beta::new(1.0, 1.0)
            .map_err(|err| RobustError::invalid_config("mix_prior", err.to_string()))?;
        let rng = rng_from_optional(config.seed, "st-robust.augmix");
        Ok(Self {
            config,
            generator,
            dirichlet,
            beta,
            rng: RefCell::new(rng),
        })
    }

    pub fn config(&self) -> &AugMixConfig {
        &self.config
    }

    /// Augments `x` with freshly drawn blend parameters.
    pub fn forward(&self, x: &Tensor) -> RobustResult<Tensor> {
        Ok(self.forward_with_sample(x)?.0)
    }

    pub fn forward_with_sample(&self, x: &Tensor) -> RobustResult<(Tensor, AugMixSample)> {
        let mut rng = self.rng.borrow_mut();
        let variants = self.generator.generate(x, &mut rng)?;
        let rows = x.rows();
        let width = self.config.mixture_width;

        let mask: Vec<f32> = (0..rows).map(|_| self.beta.sample(&mut *rng)).collect();
        let mut weights = Vec::with_capacity(rows * width);
        for _ in 0..rows {
            match &self.dirichlet {
                Some(dirichlet) => weights.extend(dirichlet.sample(&mut *rng)),
                None => weights.push(1.0),
            }
        }
        let mut sample = AugMixSample {
            mask: Tensor::from_vec(rows, 1, mask)?,
            weights: Tensor::from_vec(rows, width, weights)?,
        };
        sample.mask.set_device(x.device());
        sample.weights.set_device(x.device());

        let mixed = ConvexCombiner::forward_with_weights(&variants, &sample.mask, &sample.weights)?;
        Ok((mixed, sample))
    }

    /// Input gradient of a forward call: the variants carry no gradient, so
    /// only the `(1 - m)` share of the original contributes.
    pub fn backward(&self, sample: &AugMixSample, grad_output: &Tensor) -> RobustResult<Tensor> {
        let keep: Vec<f32> = sample.mask.data().iter().map(|m| 1.0 - m).collect();
        Ok(grad_output.scale_rows(&keep)?)
    }
}

/// Augmented batch of the latest training forward and the draws behind it.
struct LiveMix {
    sample: AugMixSample,
    batch: AudioBatch,
}

/// Wraps a brain so that training forwards see AugMix-augmented signals.
///
/// Objectives and gradients following an augmented forward are evaluated on
/// the augmented batch, not on the batch the caller passes back in.
pub struct AugMixBrain<B: AsrBrain> {
    inner: B,
    module: AugMixModule,
    enabled: bool,
    live: Option<LiveMix>,
}

impl<B: AsrBrain> AugMixBrain<B> {
    pub fn new(inner: B, module: AugMixModule) -> Self {
        Self {
            inner,
            module,
            enabled: true,
            live: None,
        }
    }

    pub fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn module(&self) -> &AugMixModule {
        &self.module
    }

    /// Blend parameters of the latest augmented forward, if any.
    pub fn last_sample(&self) -> Option<&AugMixSample> {
        self.live.as_ref().map(|live| &live.sample)
    }

    /// Batch the inner brain saw in the latest augmented forward, if any.
    pub fn last_augmented(&self) -> Option<&AudioBatch> {
        self.live.as_ref().map(|live| &live.batch)
    }

    pub fn inner(&self) -> &B {
        &self.inner
    }

    pub fn inner_mut(&mut self) -> &mut B {
        &mut self.inner
    }

    pub fn into_inner(self) -> B {
        self.inner
    }
}

impl<B: AsrBrain> AsrBrain for AugMixBrain<B> {
    type Predictions = B::Predictions;

    fn name(&self) -> &str {
        self.inner.name()
    }

    fn device(&self) -> Device {
        self.inner.device()
    }

    fn mode(&self) -> BrainMode {
        self.inner.mode()
    }

    fn set_mode(&mut self, mode: BrainMode) {
        self.inner.set_mode(mode);
    }

    fn supports_input_gradients(&self) -> bool {
        self.inner.supports_input_gradients()
    }

    fn compute_forward(
        &mut self,
        batch: &AudioBatch,
        stage: Stage,
    ) -> RobustResult<Self::Predictions> {
        self.live = None;
        if !(self.enabled && stage == Stage::Train) {
            return self.inner.compute_forward(batch, stage);
        }
        let (wavs, sample) = self.module.forward_with_sample(&batch.signal.wavs)?;
        let mut augmented = batch.clone();
        augmented.signal.wavs = wavs;
        let predictions = self.inner.compute_forward(&augmented, stage)?;
        self.live = Some(LiveMix {
            sample,
            batch: augmented,
        });
        Ok(predictions)
    }

    fn compute_objectives(
        &mut self,
        predictions: &Self::Predictions,
        batch: &AudioBatch,
        stage: Stage,
    ) -> RobustResult<f32> {
        let batch = self.live.as_ref().map_or(batch, |live| &live.batch);
        self.inner.compute_objectives(predictions, batch, stage)
    }

    fn backward_objectives(
        &mut self,
        predictions: &Self::Predictions,
        batch: &AudioBatch,
        stage: Stage,
    ) -> RobustResult<Option<Tensor>> {
        let Some(live) = &self.live else {
            return self.inner.backward_objectives(predictions, batch, stage);
        };
        match self
            .inner
            .backward_objectives(predictions, &live.batch, stage)?
        {
            Some(gradient) => Ok(Some(self.module.backward(&live.sample, &gradient)?)),
            None => Ok(None),
        }
    }
}
