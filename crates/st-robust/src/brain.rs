// SPDX-License-Identifier: AGPL-3.0-or-later
// © 2025 Ryo ∴ SpiralArchitect (kishkavsesvit@icloud.com)
// Part of SpiralTorch — Licensed under AGPL-3.0-or-later.
// Unauthorized derivative works or closed redistribution prohibited under AGPL §13.

use crate::batch::AudioBatch;
use crate::error::RobustResult;
use crate::stage::{BrainMode, Stage};
use core::ops::{Deref, DerefMut};
use st_tensor::{Device, Tensor};

/// Speech recogniser driven by the robustness tooling.
///
/// The brain owns its model, feature pipeline and objective. The tooling only
/// needs a forward pass, a scalar loss, the gradient of that loss with respect
/// to the input waveforms, and the usual train/eval switch.
pub trait AsrBrain {
    type Predictions;

    fn name(&self) -> &str {
        "asr_brain"
    }

    /// Device the brain expects its inputs on.
    fn device(&self) -> Device;

    fn mode(&self) -> BrainMode;

    fn set_mode(&mut self, mode: BrainMode);

    fn module_train(&mut self) {
        self.set_mode(BrainMode::Train);
    }

    fn module_eval(&mut self) {
        self.set_mode(BrainMode::Eval);
    }

    /// Whether [`AsrBrain::backward_objectives`] can produce input gradients.
    fn supports_input_gradients(&self) -> bool;

    fn compute_forward(
        &mut self,
        batch: &AudioBatch,
        stage: Stage,
    ) -> RobustResult<Self::Predictions>;

    fn compute_objectives(
        &mut self,
        predictions: &Self::Predictions,
        batch: &AudioBatch,
        stage: Stage,
    ) -> RobustResult<f32>;

    /// Gradient of the objective with respect to `batch.signal.wavs`.
    ///
    /// Returns `Ok(None)` when the gradient could not be formed.
    fn backward_objectives(
        &mut self,
        predictions: &Self::Predictions,
        batch: &AudioBatch,
        stage: Stage,
    ) -> RobustResult<Option<Tensor>>;
}

impl<B: AsrBrain + ?Sized> AsrBrain for &mut B {
    type Predictions = B::Predictions;

    fn name(&self) -> &str {
        (**self).name()
    }

    fn device(&self) -> Device {
        (**self).device()
    }

    fn mode(&self) -> BrainMode {
        (**self).mode()
    }

    fn set_mode(&mut self, mode: BrainMode) {
        (**self).set_mode(mode)
    }

    fn supports_input_gradients(&self) -> bool {
        (**self).supports_input_gradients()
    }

    fn compute_forward(
        &mut self,
        batch: &AudioBatch,
        stage: Stage,
    ) -> RobustResult<Self::Predictions> {
        (**self).compute_forward(batch, stage)
    }

    fn compute_objectives(
        &mut self,
        predictions: &Self::Predictions,
        batch: &AudioBatch,
        stage: Stage,
    ) -> RobustResult<f32> {
        (**self).compute_objectives(predictions, batch, stage)
    }

    fn backward_objectives(
        &mut self,
        predictions: &Self::Predictions,
        batch: &AudioBatch,
        stage: Stage,
    ) -> RobustResult<Option<Tensor>> {
        (**self).backward_objectives(predictions, batch, stage)
    }
}

/// Switches a brain into a mode for the lifetime of the guard and restores the
/// previous mode on drop.
pub struct ModeScope<'a, B: AsrBrain + ?Sized> {
    brain: &'a mut B,
    previous: BrainMode,
}

impl<'a, B: AsrBrain + ?Sized> ModeScope<'a, B> {
    pub fn enter(brain: &'a mut B, mode: BrainMode) -> Self {
        let previous = brain.mode();
        brain.set_mode(mode);
        Self { brain, previous }
    }

    pub fn previous(&self) -> BrainMode {
        self.previous
    }
}

impl<B: AsrBrain + ?Sized> Deref for ModeScope<'_, B> {
    type Target = B;

    fn deref(&self) -> &B {
        self.brain
    }
}

impl<B: AsrBrain + ?Sized> DerefMut for ModeScope<'_, B> {
    fn deref_mut(&mut self) -> &mut B {
        self.brain
    }
}

impl<B: AsrBrain + ?Sized> Drop for ModeScope<'_, B> {
    fn drop(&mut self) {
        self.brain.set_mode(self.previous);
    }
}
