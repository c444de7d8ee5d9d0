// SPDX-License-Identifier: AGPL-3.0-or-later
// © 2025 Ryo ∴ SpiralArchitect (kishkavsesvit@icloud.com)
// Part of SpiralTorch — Licensed under AGPL-3.0-or-later.
// Unauthorized derivative works or closed redistribution prohibited under AGPL §13.

use st_tensor::{Device, Tensor};

/// Padded waveforms plus their relative lengths in `(0, 1]`.
#[derive(Clone, Debug, PartialEq)]
pub struct Signal {
    pub wavs: Tensor,
    pub lens: Vec<f32>,
}

impl Signal {
    /// Full-length signal (every relative length is 1).
    pub fn new(wavs: Tensor) -> Self {
        let lens = vec![1.0; wavs.rows()];
        Self { wavs, lens }
    }

    pub fn with_lens(wavs: Tensor, lens: Vec<f32>) -> Self {
        Self { wavs, lens }
    }
}

/// Mini-batch handed to an [`crate::AsrBrain`].
#[derive(Clone, Debug, PartialEq)]
pub struct AudioBatch {
    pub ids: Vec<String>,
    pub signal: Signal,
    /// Target token sequences, one per utterance.
    pub tokens: Vec<Vec<u32>>,
    pub words: Vec<String>,
}

impl AudioBatch {
    pub fn new(ids: Vec<String>, signal: Signal) -> Self {
        Self {
            ids,
            signal,
            tokens: Vec::new(),
            words: Vec::new(),
        }
    }

    pub fn with_targets(mut self, tokens: Vec<Vec<u32>>, words: Vec<String>) -> Self {
        self.tokens = tokens;
        self.words = words;
        self
    }

    pub fn batch_size(&self) -> usize {
        self.signal.wavs.rows()
    }

    pub fn device(&self) -> Device {
        self.signal.wavs.device()
    }

    /// Moves every tensor of the batch to `device`.
    pub fn to(&mut self, device: Device) {
        self.signal.wavs.set_device(device);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn batch_moves_between_devices() {
        let wavs = Tensor::zeros(2, 4).unwrap();
        let mut batch = AudioBatch::new(vec!["a".into(), "b".into()], Signal::new(wavs));
        assert_eq!(batch.signal.lens, vec![1.0, 1.0]);
        batch.to(Device::Cuda(0));
        assert_eq!(batch.device(), Device::Cuda(0));
        batch.to(Device::Cpu);
        assert!(batch.device().is_cpu());
    }
}
