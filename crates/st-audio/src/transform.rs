// SPDX-License-Identifier: AGPL-3.0-or-later
// © 2025 Ryo ∴ SpiralArchitect (kishkavsesvit@icloud.com)
// Part of SpiralTorch — Licensed under AGPL-3.0-or-later.
// Unauthorized derivative works or closed redistribution prohibited under AGPL §13.

use crate::error::{AudioError, AudioResult};
use rand::rngs::StdRng;
use rand::Rng;
use rayon::prelude::*;
use st_tensor::Tensor;

/// Batch of waveforms with an explicit channel axis.
///
/// Stored as an `(examples * channels, samples)` tensor where the channels of
/// one example occupy consecutive rows. The augmentation stack only ever
/// builds mono batches, but operators honour multi-channel layouts by applying
/// one parameter draw to every channel of an example.
#[derive(Clone, Debug, PartialEq)]
pub struct ChannelBatch {
    samples: Tensor,
    channels: usize,
}

impl ChannelBatch {
    /// Lifts an `(N, T)` waveform tensor into an `(N, 1, T)` batch.
    pub fn mono(waveforms: Tensor) -> Self {
        Self {
            samples: waveforms,
            channels: 1,
        }
    }

    pub fn new(samples: Tensor, channels: usize) -> AudioResult<Self> {
        if channels == 0 || samples.rows() % channels != 0 {
            return Err(AudioError::ChannelLayout { channels });
        }
        Ok(Self { samples, channels })
    }

    pub fn examples(&self) -> usize {
        self.samples.rows() / self.channels
    }

    pub fn channels(&self) -> usize {
        self.channels
    }

    pub fn samples_per_channel(&self) -> usize {
        self.samples.cols()
    }

    /// `(examples, channels, samples)`.
    pub fn shape(&self) -> (usize, usize, usize) {
        (self.examples(), self.channels, self.samples_per_channel())
    }

    pub fn samples(&self) -> &Tensor {
        &self.samples
    }

    /// Drops the channel axis again. Only valid for mono batches.
    pub fn into_mono(self) -> AudioResult<Tensor> {
        if self.channels != 1 {
            return Err(AudioError::ChannelLayout {
                channels: self.channels,
            });
        }
        Ok(self.samples)
    }

    /// Copies the batch and runs `f` on every channel row of example `i` with
    /// `params[i]`. Examples are processed in parallel.
    pub(crate) fn map_examples<P, F>(&self, params: &[P], f: F) -> AudioResult<ChannelBatch>
    where
        P: Sync,
        F: Fn(&P, &mut [f32]) + Sync + Send,
    {
        if params.len() != self.examples() {
            return Err(AudioError::InvalidParameter {
                label: "per_example_parameter_count",
                value: params.len() as f32,
            });
        }
        let cols = self.samples_per_channel();
        let stride = cols * self.channels;
        let mut out = self.samples.clone();
        out.data_mut()
            .par_chunks_mut(stride)
            .zip(params.par_iter())
            .for_each(|(example, param)| {
                for channel in example.chunks_exact_mut(cols) {
                    f(param, channel);
                }
            });
        Ok(ChannelBatch {
            samples: out,
            channels: self.channels,
        })
    }

    /// Per-example slices covering every channel of that example.
    pub(crate) fn example_slices(&self) -> impl Iterator<Item = &[f32]> {
        self.samples
            .data()
            .chunks_exact(self.samples_per_channel() * self.channels)
    }
}

/// A stochastic waveform operator.
///
/// Implementations must return a batch with exactly the input shape; they draw
/// every random parameter from `rng` so a seeded generator reproduces the
/// output bit for bit.
pub trait Transform: Send + Sync {
    /// Stable operator name used in logs and audits.
    fn name(&self) -> &'static str;

    fn apply(
        &self,
        batch: &ChannelBatch,
        sample_rate: u32,
        rng: &mut StdRng,
    ) -> AudioResult<ChannelBatch>;
}

/// Closed interval a random parameter is drawn from.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ParameterRange {
    min: f32,
    max: f32,
}

impl ParameterRange {
    pub fn new(label: &'static str, min: f32, max: f32) -> AudioResult<Self> {
        if !min.is_finite() {
            return Err(AudioError::InvalidParameter { label, value: min });
        }
        if !max.is_finite() || max < min {
            return Err(AudioError::InvalidParameter { label, value: max });
        }
        Ok(Self { min, max })
    }

    /// Builds a range from bounds already known to be ordered and finite.
    pub(crate) const fn from_bounds(min: f32, max: f32) -> Self {
        Self { min, max }
    }

    pub fn min(&self) -> f32 {
        self.min
    }

    pub fn max(&self) -> f32 {
        self.max
    }

    pub fn sample(&self, rng: &mut StdRng) -> f32 {
        if self.min == self.max {
            self.min
        } else {
            rng.gen_range(self.min..=self.max)
        }
    }

    /// Draws one value per example.
    pub fn sample_n(&self, count: usize, rng: &mut StdRng) -> Vec<f32> {
        (0..count).map(|_| self.sample(rng)).collect()
    }
}

pub(crate) fn validate_sample_rate(sample_rate: u32) -> AudioResult<f32> {
    if sample_rate == 0 {
        return Err(AudioError::InvalidParameter {
            label: "sample_rate",
            value: 0.0,
        });
    }
    Ok(sample_rate as f32)
}
