// SPDX-License-Identifier: AGPL-3.0-or-later
// © 2025 Ryo ∴ SpiralArchitect (kishkavsesvit@icloud.com)

#![allow(dead_code)]

use st_robust::{AsrBrain, AudioBatch, BrainMode, RobustError, RobustResult, Signal, Stage};
use st_tensor::{Device, Tensor};

/// Fixed linear scorer: `loss = mean_{n,t}(c_t * x[n, t])`.
pub struct LinearBrain {
    weights: Vec<f32>,
    pub mode: BrainMode,
    pub device: Device,
    pub differentiable: bool,
    pub drop_gradient: bool,
    pub forward_calls: usize,
    pub backward_calls: usize,
    pub stages: Vec<Stage>,
    pub modes_seen: Vec<BrainMode>,
    pub last_signal: Option<Tensor>,
}

impl LinearBrain {
    pub fn new(samples: usize, seed: u64) -> Self {
        let weights = Tensor::random_uniform(1, samples, -1.0, 1.0, Some(seed))
            .unwrap()
            .into_vec();
        Self {
            weights,
            mode: BrainMode::Eval,
            device: Device::Cpu,
            differentiable: true,
            drop_gradient: false,
            forward_calls: 0,
            backward_calls: 0,
            stages: Vec::new(),
            modes_seen: Vec::new(),
            last_signal: None,
        }
    }

    pub fn loss_of(&self, wavs: &Tensor) -> f32 {
        let total: f32 = wavs
            .rows_iter()
            .map(|row| row.iter().zip(&self.weights).map(|(x, c)| x * c).sum::<f32>())
            .sum();
        total / wavs.len() as f32
    }
}

impl AsrBrain for LinearBrain {
    type Predictions = f32;

    fn name(&self) -> &str {
        "linear"
    }

    fn device(&self) -> Device {
        self.device
    }

    fn mode(&self) -> BrainMode {
        self.mode
    }

    fn set_mode(&mut self, mode: BrainMode) {
        self.mode = mode;
    }

    fn supports_input_gradients(&self) -> bool {
        self.differentiable
    }

    fn compute_forward(&mut self, batch: &AudioBatch, stage: Stage) -> RobustResult<f32> {
        if batch.device() != self.device {
            return Err(RobustError::DeviceTransfer {
                expected: self.device,
                found: batch.device(),
            });
        }
        self.forward_calls += 1;
        self.stages.push(stage);
        self.modes_seen.push(self.mode);
        self.last_signal = Some(batch.signal.wavs.clone());
        Ok(self.loss_of(&batch.signal.wavs))
    }

    fn compute_objectives(
        &mut self,
        predictions: &f32,
        _batch: &AudioBatch,
        _stage: Stage,
    ) -> RobustResult<f32> {
        Ok(*predictions)
    }

    fn backward_objectives(
        &mut self,
        _predictions: &f32,
        batch: &AudioBatch,
        _stage: Stage,
    ) -> RobustResult<Option<Tensor>> {
        self.backward_calls += 1;
        if self.drop_gradient {
            return Ok(None);
        }
        let (rows, cols) = batch.signal.wavs.shape();
        let scale = 1.0 / (rows * cols) as f32;
        let mut grad = Tensor::from_fn(rows, cols, |_, t| self.weights[t] * scale)?;
        grad.set_device(self.device);
        Ok(Some(grad))
    }
}

/// `rows` one-second utterances of harmonic tones.
pub fn utterances(rows: usize, samples: usize) -> AudioBatch {
    let wavs = Tensor::from_fn(rows, samples, |r, t| {
        let time = t as f32 / 16_000.0;
        let f0 = 110.0 + 45.0 * r as f32;
        0.3 * (2.0 * std::f32::consts::PI * f0 * time).sin()
            + 0.1 * (2.0 * std::f32::consts::PI * 2.5 * f0 * time).sin()
    })
    .unwrap();
    let ids = (0..rows).map(|r| format!("utt-{r}")).collect();
    AudioBatch::new(ids, Signal::new(wavs))
}

/// Energy scorer: `loss = sum(x^2) / 2`, so the input gradient is `x` itself.
pub struct QuadraticBrain {
    pub mode: BrainMode,
}

impl QuadraticBrain {
    pub fn new() -> Self {
        Self {
            mode: BrainMode::Eval,
        }
    }

    pub fn energy(wavs: &Tensor) -> f32 {
        wavs.data().iter().map(|x| x * x).sum::<f32>() / 2.0
    }
}

impl AsrBrain for QuadraticBrain {
    type Predictions = ();

    fn name(&self) -> &str {
        "quadratic"
    }

    fn device(&self) -> Device {
        Device::Cpu
    }

    fn mode(&self) -> BrainMode {
        self.mode
    }

    fn set_mode(&mut self, mode: BrainMode) {
        self.mode = mode;
    }

    fn supports_input_gradients(&self) -> bool {
        true
    }

    fn compute_forward(&mut self, _batch: &AudioBatch, _stage: Stage) -> RobustResult<()> {
        Ok(())
    }

    fn compute_objectives(
        &mut self,
        _predictions: &(),
        batch: &AudioBatch,
        _stage: Stage,
    ) -> RobustResult<f32> {
        Ok(Self::energy(&batch.signal.wavs))
    }

    fn backward_objectives(
        &mut self,
        _predictions: &(),
        batch: &AudioBatch,
        _stage: Stage,
    ) -> RobustResult<Option<Tensor>> {
        Ok(Some(batch.signal.wavs.clone()))
    }
}
