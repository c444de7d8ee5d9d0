// SPDX-License-Identifier: AGPL-3.0-or-later
// © 2025 Ryo ∴ SpiralArchitect (kishkavsesvit@icloud.com)
// Part of SpiralTorch — Licensed under AGPL-3.0-or-later.
// Unauthorized derivative works or closed redistribution prohibited under AGPL §13.

use crate::error::AudioResult;
use crate::transform::{validate_sample_rate, ChannelBatch, ParameterRange, Transform};
use num_complex::Complex32;
use rand::rngs::StdRng;
use rand_distr::{Distribution, StandardNormal};
use rayon::prelude::*;
use rustfft::FftPlanner;

/// Adds noise whose power spectrum follows `f^(-decay)` at a random SNR.
///
/// A decay of 0 is white noise, 1 pink, 2 brown; negative decays tilt the
/// spectrum towards the highs (blue and violet).
#[derive(Clone, Debug)]
pub struct AddColoredNoise {
    snr_db: ParameterRange,
    frequency_decay: ParameterRange,
}

impl AddColoredNoise {
    pub fn new(snr_db: ParameterRange, frequency_decay: ParameterRange) -> Self {
        Self {
            snr_db,
            frequency_decay,
        }
    }
}

impl Default for AddColoredNoise {
    fn default() -> Self {
        Self::new(
            ParameterRange::from_bounds(3.0, 30.0),
            ParameterRange::from_bounds(-2.0, 2.0),
        )
    }
}

struct NoiseDraw {
    noise: Vec<f32>,
    snr_db: f32,
}

fn rms(samples: &[f32]) -> f32 {
    if samples.is_empty() {
        return 0.0;
    }
    (samples.iter().map(|v| v * v).sum::<f32>() / samples.len() as f32).sqrt()
}

/// `linspace(1, sqrt(sample_rate / 2), bins)`, evaluated lazily.
fn spectral_ramp(bin: usize, bins: usize, sample_rate: f32) -> f32 {
    if bins <= 1 {
        return 1.0;
    }
    let top = (sample_rate / 2.0).sqrt();
    1.0 + (top - 1.0) * bin as f32 / (bins - 1) as f32
}

/// Shapes white noise in the frequency domain and rescales it to unit RMS.
fn shape_noise(
    white: Vec<f32>,
    decay: f32,
    sample_rate: f32,
    fft: &dyn rustfft::Fft<f32>,
    ifft: &dyn rustfft::Fft<f32>,
) -> Vec<f32> {
    let len = white.len();
    let mut spectrum: Vec<Complex32> = white.into_iter().map(|v| Complex32::new(v, 0.0)).collect();
    fft.process(&mut spectrum);
    let bins = len / 2 + 1;
    for bin in 0..bins {
        let gain = spectral_ramp(bin, bins, sample_rate).powf(-decay);
        spectrum[bin] *= gain;
        let mirror = (len - bin) % len;
        if mirror != bin && mirror >= bins {
            spectrum[mirror] *= gain;
        }
    }
    ifft.process(&mut spectrum);
    let mut noise: Vec<f32> = spectrum.into_iter().map(|c| c.re).collect();
    let level = rms(&noise);
    if level > 0.0 {
        for v in noise.iter_mut() {
            *v /= level;
        }
    }
    noise
}

impl Transform for AddColoredNoise {
    fn name(&self) -> &'static str {
        "add_colored_noise"
    }

    fn apply(
        &self,
        batch: &ChannelBatch,
        sample_rate: u32,
        rng: &mut StdRng,
    ) -> AudioResult<ChannelBatch> {
        let sr = validate_sample_rate(sample_rate)?;
        let len = batch.samples_per_channel();
        let mut planner = FftPlanner::<f32>::new();
        let fft = planner.plan_fft_forward(len);
        let ifft = planner.plan_fft_inverse(len);

        let raw: Vec<(Vec<f32>, f32, f32)> = (0..batch.examples())
            .map(|_| {
                let snr_db = self.snr_db.sample(rng);
                let decay = self.frequency_decay.sample(rng);
                let white = (0..len)
                    .map(|_| StandardNormal.sample(&mut *rng))
                    .collect::<Vec<f32>>();
                (white, snr_db, decay)
            })
            .collect();
        let draws: Vec<NoiseDraw> = raw
            .into_par_iter()
            .map(|(white, snr_db, decay)| NoiseDraw {
                noise: shape_noise(white, decay, sr, fft.as_ref(), ifft.as_ref()),
                snr_db,
            })
            .collect();

        batch.map_examples(&draws, |draw, row| {
            let scale = rms(row) / 10f32.powf(draw.snr_db / 20.0);
            for (v, n) in row.iter_mut().zip(&draw.noise) {
                *v += scale * n;
            }
        })
    }
}
