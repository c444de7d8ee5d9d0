// SPDX-License-Identifier: AGPL-3.0-or-later
// © 2025 Ryo ∴ SpiralArchitect (kishkavsesvit@icloud.com)
// Part of SpiralTorch — Licensed under AGPL-3.0-or-later.
// Unauthorized derivative works or closed redistribution prohibited under AGPL §13.

//! AugMax: worst-case mixing of augmented variants.
//!
//! The attack draws `W` augmented copies of the input once, then runs
//! `nb_iter` sign-gradient ascent steps on the mix-in mask `m` and the mixture
//! logits `q` so that the blended waveform maximises the brain's objective.

use crate::batch::{AudioBatch, Signal};
use crate::brain::{AsrBrain, ModeScope};
use crate::combiner::ConvexCombiner;
use crate::config::AugMaxConfig;
use crate::error::{RobustError, RobustResult};
use crate::generator::{VariantGenerator, VariantSet};
use crate::stage::{BrainMode, Stage};
use crate::staging::ensure_device;
use core::ops::{Deref, DerefMut};
use rand::rngs::StdRng;
use spiral_config::rng_from_optional;
use st_audio::AugmentationCatalog;
use st_tensor::{Device, Tensor};
use tracing::{debug, info};

/// Produces adversarial waveforms for a batch.
pub trait Attacker {
    /// Returns the adversarial signal on the batch's original device. The
    /// batch itself is left as it was handed in.
    fn perturb(&mut self, batch: &mut AudioBatch) -> RobustResult<Tensor>;
}

/// Record of one ascent step.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct AttackStep {
    pub iteration: usize,
    /// Objective reported by the brain before the step, prior to any negation.
    pub loss: f32,
    pub mask_min: f32,
    pub mask_max: f32,
}

#[derive(Clone, Debug, PartialEq)]
pub struct AttackOutcome {
    pub adversarial: Tensor,
    /// Final mix-in mask, `(N, 1)`.
    pub mask: Tensor,
    /// Final mixture logits, `(N, W)`.
    pub logits: Tensor,
    pub steps: Vec<AttackStep>,
}

/// Restores the batch signal and device when dropped.
struct SignalScope<'a> {
    batch: &'a mut AudioBatch,
    saved: Option<Signal>,
    origin: Device,
}

impl<'a> SignalScope<'a> {
    fn enter(batch: &'a mut AudioBatch, device: Device) -> Self {
        let origin = batch.device();
        let saved = Some(batch.signal.clone());
        batch.to(device);
        Self {
            batch,
            saved,
            origin,
        }
    }
}

impl Deref for SignalScope<'_> {
    type Target = AudioBatch;

    fn deref(&self) -> &AudioBatch {
        self.batch
    }
}

impl DerefMut for SignalScope<'_> {
    fn deref_mut(&mut self) -> &mut AudioBatch {
        self.batch
    }
}

impl Drop for SignalScope<'_> {
    fn drop(&mut self) {
        if let Some(signal) = self.saved.take() {
            self.batch.signal = signal;
        }
        self.batch.to(self.origin);
    }
}

fn signal_gradient(gradient: Option<Tensor>, signal: &Tensor) -> RobustResult<Tensor> {
    let Some(gradient) = gradient else {
        return Err(RobustError::GradientUnavailable { parameter: "signal" });
    };
    ensure_device(&gradient, signal.device())?;
    if gradient.shape() != signal.shape() || !gradient.is_finite() {
        return Err(RobustError::GradientUnavailable { parameter: "signal" });
    }
    Ok(gradient)
}

/// `param += eps[n] * sign(grad)` row by row.
fn sign_step(param: &Tensor, grad: &Tensor, eps: &[f32]) -> RobustResult<Tensor> {
    let step = grad.sign().scale_rows(eps)?;
    Ok(param.add(&step)?)
}

/// Smallest and largest per-example step size.
fn step_size_bounds(eps: &[f32]) -> (f32, f32) {
    eps.iter()
        .fold((f32::INFINITY, f32::NEG_INFINITY), |(lo, hi), e| {
            (lo.min(*e), hi.max(*e))
        })
}

pub struct AugMaxAttack<B: AsrBrain> {
    brain: B,
    config: AugMaxConfig,
    generator: VariantGenerator,
    rng: StdRng,
}

impl<B: AsrBrain> AugMaxAttack<B> {
    /// Fails when the configuration is invalid or the brain cannot provide
    /// input gradients.
    pub fn new(brain: B, config: AugMaxConfig) -> RobustResult<Self> {
        config.validate()?;
        if !brain.supports_input_gradients() {
            return Err(RobustError::NonDifferentiable {
                brain: brain.name().to_string(),
            });
        }
        let generator = VariantGenerator::new(
            config.mixture_width,
            config.mixture_depth,
            config.aug_severity,
            config.sample_rate,
        )?;
        let rng = rng_from_optional(config.seed, "st-robust.augmax");
        Ok(Self {
            brain,
            config,
            generator,
            rng,
        })
    }

    /// Restricts variant generation to `catalog`.
    pub fn with_catalog(mut self, catalog: AugmentationCatalog) -> RobustResult<Self> {
        self.generator = VariantGenerator::with_catalog(
            catalog,
            self.config.mixture_width,
            self.config.mixture_depth,
            self.config.aug_severity,
            self.config.sample_rate,
        )?;
        Ok(self)
    }

    pub fn config(&self) -> &AugMaxConfig {
        &self.config
    }

    pub fn brain(&self) -> &B {
        &self.brain
    }

    pub fn brain_mut(&mut self) -> &mut B {
        &mut self.brain
    }

    pub fn into_brain(self) -> B {
        self.brain
    }

    /// Runs the attack and reports every step alongside the result.
    pub fn perturb_with_trace(&mut self, batch: &mut AudioBatch) -> RobustResult<AttackOutcome> {
        let batch_size = batch.batch_size();
        let eps = self.config.eps.per_example(batch_size)?;
        let width = self.config.mixture_width;
        let nb_iter = self.config.nb_iter;
        let targeted = self.config.targeted;
        let mode = if self.config.train_mode_for_backward {
            BrainMode::Train
        } else {
            BrainMode::Eval
        };

        let device = self.brain.device();
        let mut batch = SignalScope::enter(batch, device);
        let origin = batch.origin;
        let mut brain = ModeScope::enter(&mut self.brain, mode);

        let (eps_min, eps_max) = step_size_bounds(&eps);
        info!(
            brain = brain.name(),
            batch_size,
            width,
            nb_iter,
            targeted,
            eps_min,
            eps_max,
            "starting augmax attack"
        );
        debug!(?eps, "per-example step sizes");

        let variants: VariantSet = self.generator.generate(&batch.signal.wavs, &mut self.rng)?;
        let mut mask = Tensor::random_uniform_with(batch_size, 1, 0.0, 1.0, &mut self.rng)?;
        let mut logits = Tensor::random_uniform_with(batch_size, width, 0.0, 1.0, &mut self.rng)?;
        mask.set_device(device);
        logits.set_device(device);
        let mut mixed = ConvexCombiner::forward(&variants, &mask, &logits)?;

        let mut steps = Vec::with_capacity(nb_iter);
        for iteration in 0..nb_iter {
            batch.signal.wavs = mixed.clone();
            let predictions = brain.compute_forward(&batch, Stage::Attack)?;
            let loss = brain.compute_objectives(&predictions, &batch, Stage::Attack)?;
            let gradient = brain.backward_objectives(&predictions, &batch, Stage::Attack)?;
            let mut gradient = signal_gradient(gradient, &mixed)?;
            if targeted {
                gradient = gradient.scale(-1.0);
            }

            let grads = ConvexCombiner::backward(&variants, &mask, &logits, &gradient)?;
            if !grads.mask.is_finite() {
                return Err(RobustError::GradientUnavailable { parameter: "mask" });
            }
            if !grads.logits.is_finite() {
                return Err(RobustError::GradientUnavailable { parameter: "logits" });
            }

            mask = sign_step(&mask, &grads.mask, &eps)?.clamp(0.0, 1.0);
            logits = sign_step(&logits, &grads.logits, &eps)?;
            mixed = ConvexCombiner::forward(&variants, &mask, &logits)?;

            let step = AttackStep {
                iteration,
                loss,
                mask_min: mask.min_value(),
                mask_max: mask.max_value(),
            };
            debug!(
                iteration,
                loss,
                mask_min = step.mask_min,
                mask_max = step.mask_max,
                "augmax step"
            );
            steps.push(step);
        }

        info!(
            initial_loss = steps.first().map(|s| s.loss),
            last_loss = steps.last().map(|s| s.loss),
            "augmax attack finished"
        );

        Ok(AttackOutcome {
            adversarial: mixed.to_device(origin),
            mask: mask.to_device(origin),
            logits: logits.to_device(origin),
            steps,
        })
    }
}

impl<B: AsrBrain> Attacker for AugMaxAttack<B> {
    fn perturb(&mut self, batch: &mut AudioBatch) -> RobustResult<Tensor> {
        Ok(self.perturb_with_trace(batch)?.adversarial)
    }
}

impl<B: AsrBrain> core::fmt::Debug for AugMaxAttack<B> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("AugMaxAttack")
            .field("brain", &self.brain.name())
            .field("config", &self.config)
            .finish()
    }
}
