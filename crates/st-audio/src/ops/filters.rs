// SPDX-License-Identifier: AGPL-3.0-or-later
// © 2025 Ryo ∴ SpiralArchitect (kishkavsesvit@icloud.com)
// Part of SpiralTorch — Licensed under AGPL-3.0-or-later.
// Unauthorized derivative works or closed redistribution prohibited under AGPL §13.

//! Second-order IIR filters with randomly drawn corner frequencies.
//!
//! Centre and cutoff frequencies are drawn uniformly on the mel scale so the
//! low end of the spectrum is visited as often as perceptually warranted.

use crate::error::AudioResult;
use crate::transform::{validate_sample_rate, ChannelBatch, ParameterRange, Transform};
use core::f32::consts::{FRAC_1_SQRT_2, PI};
use rand::rngs::StdRng;
use rand::Rng;

pub(crate) fn hz_to_mel(hz: f32) -> f32 {
    2595.0 * (1.0 + hz / 700.0).log10()
}

pub(crate) fn mel_to_hz(mel: f32) -> f32 {
    700.0 * (10f32.powf(mel / 2595.0) - 1.0)
}

fn sample_mel_uniform(range: ParameterRange, rng: &mut StdRng) -> f32 {
    let low = hz_to_mel(range.min());
    let high = hz_to_mel(range.max());
    if low == high {
        return range.min();
    }
    mel_to_hz(rng.gen_range(low..=high))
}

/// Keeps corner frequencies strictly below Nyquist.
fn clamp_to_nyquist(freq: f32, sample_rate: f32) -> f32 {
    freq.clamp(1.0, 0.499 * sample_rate)
}

/// Normalised biquad coefficients (`a0 == 1`).
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Biquad {
    b: [f32; 3],
    a: [f32; 2],
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BiquadKind {
    LowPass,
    HighPass,
    BandPass,
    Notch,
}

impl Biquad {
    pub fn design(kind: BiquadKind, freq: f32, q: f32, sample_rate: f32) -> Self {
        let w0 = 2.0 * PI * freq / sample_rate;
        let cos = w0.cos();
        let alpha = w0.sin() / (2.0 * q);
        let b = match kind {
            BiquadKind::LowPass => {
                let b0 = (1.0 - cos) / 2.0;
                [b0, 1.0 - cos, b0]
            }
            BiquadKind::HighPass => {
                let b0 = (1.0 + cos) / 2.0;
                [b0, -(1.0 + cos), b0]
            }
            BiquadKind::BandPass => [alpha, 0.0, -alpha],
            BiquadKind::Notch => [1.0, -2.0 * cos, 1.0],
        };
        let a0 = 1.0 + alpha;
        Self {
            b: [b[0] / a0, b[1] / a0, b[2] / a0],
            a: [-2.0 * cos / a0, (1.0 - alpha) / a0],
        }
    }

    /// Filters `samples` in place (transposed direct form II, zero state).
    pub fn process(&self, samples: &mut [f32]) {
        let [b0, b1, b2] = self.b;
        let [a1, a2] = self.a;
        let mut z1 = 0.0f32;
        let mut z2 = 0.0f32;
        for x in samples.iter_mut() {
            let input = *x;
            let y = b0 * input + z1;
            z1 = b1 * input - a1 * y + z2;
            z2 = b2 * input - a2 * y;
            *x = y;
        }
    }
}

fn apply_biquads(batch: &ChannelBatch, filters: &[Biquad]) -> AudioResult<ChannelBatch> {
    batch.map_examples(filters, |filter, row| filter.process(row))
}

/// Passes a band around a random centre frequency.
#[derive(Clone, Debug)]
pub struct BandPassFilter {
    center_hz: ParameterRange,
    bandwidth_fraction: ParameterRange,
}

impl BandPassFilter {
    pub fn new(center_hz: ParameterRange, bandwidth_fraction: ParameterRange) -> Self {
        Self {
            center_hz,
            bandwidth_fraction,
        }
    }
}

impl Default for BandPassFilter {
    fn default() -> Self {
        Self::new(
            ParameterRange::from_bounds(200.0, 4000.0),
            ParameterRange::from_bounds(0.5, 1.99),
        )
    }
}

/// Removes a band around a random centre frequency.
#[derive(Clone, Debug)]
pub struct BandStopFilter {
    center_hz: ParameterRange,
    bandwidth_fraction: ParameterRange,
}

impl BandStopFilter {
    pub fn new(center_hz: ParameterRange, bandwidth_fraction: ParameterRange) -> Self {
        Self {
            center_hz,
            bandwidth_fraction,
        }
    }
}

impl Default for BandStopFilter {
    fn default() -> Self {
        Self::new(
            ParameterRange::from_bounds(200.0, 4000.0),
            ParameterRange::from_bounds(0.5, 1.99),
        )
    }
}

fn band_filters(
    kind: BiquadKind,
    center_hz: ParameterRange,
    bandwidth_fraction: ParameterRange,
    examples: usize,
    sample_rate: f32,
    rng: &mut StdRng,
) -> Vec<Biquad> {
    (0..examples)
        .map(|_| {
            let center = clamp_to_nyquist(sample_mel_uniform(center_hz, rng), sample_rate);
            let fraction = bandwidth_fraction.sample(rng);
            Biquad::design(kind, center, 1.0 / fraction, sample_rate)
        })
        .collect()
}

impl Transform for BandPassFilter {
    fn name(&self) -> &'static str {
        "band_pass_filter"
    }

    fn apply(
        &self,
        batch: &ChannelBatch,
        sample_rate: u32,
        rng: &mut StdRng,
    ) -> AudioResult<ChannelBatch> {
        let sr = validate_sample_rate(sample_rate)?;
        let filters = band_filters(
            BiquadKind::BandPass,
            self.center_hz,
            self.bandwidth_fraction,
            batch.examples(),
            sr,
            rng,
        );
        apply_biquads(batch, &filters)
    }
}

impl Transform for BandStopFilter {
    fn name(&self) -> &'static str {
        "band_stop_filter"
    }

    fn apply(
        &self,
        batch: &ChannelBatch,
        sample_rate: u32,
        rng: &mut StdRng,
    ) -> AudioResult<ChannelBatch> {
        let sr = validate_sample_rate(sample_rate)?;
        let filters = band_filters(
            BiquadKind::Notch,
            self.center_hz,
            self.bandwidth_fraction,
            batch.examples(),
            sr,
            rng,
        );
        apply_biquads(batch, &filters)
    }
}

/// Attenuates content below a random cutoff.
#[derive(Clone, Debug)]
pub struct HighPassFilter {
    cutoff_hz: ParameterRange,
}

impl HighPassFilter {
    pub fn new(cutoff_hz: ParameterRange) -> Self {
        Self { cutoff_hz }
    }
}

impl Default for HighPassFilter {
    fn default() -> Self {
        Self::new(ParameterRange::from_bounds(20.0, 2400.0))
    }
}

/// Attenuates content above a random cutoff.
#[derive(Clone, Debug)]
pub struct LowPassFilter {
    cutoff_hz: ParameterRange,
}

impl LowPassFilter {
    pub fn new(cutoff_hz: ParameterRange) -> Self {
        Self { cutoff_hz }
    }
}

impl Default for LowPassFilter {
    fn default() -> Self {
        Self::new(ParameterRange::from_bounds(150.0, 7500.0))
    }
}

fn shelf_filters(
    kind: BiquadKind,
    cutoff_hz: ParameterRange,
    examples: usize,
    sample_rate: f32,
    rng: &mut StdRng,
) -> Vec<Biquad> {
    (0..examples)
        .map(|_| {
            let cutoff = clamp_to_nyquist(sample_mel_uniform(cutoff_hz, rng), sample_rate);
            Biquad::design(kind, cutoff, FRAC_1_SQRT_2, sample_rate)
        })
        .collect()
}

impl Transform for HighPassFilter {
    fn name(&self) -> &'static str {
        "high_pass_filter"
    }

    fn apply(
        &self,
        batch: &ChannelBatch,
        sample_rate: u32,
        rng: &mut StdRng,
    ) -> AudioResult<ChannelBatch> {
        let sr = validate_sample_rate(sample_rate)?;
        let filters = shelf_filters(BiquadKind::HighPass, self.cutoff_hz, batch.examples(), sr, rng);
        apply_biquads(batch, &filters)
    }
}

impl Transform for LowPassFilter {
    fn name(&self) -> &'static str {
        "low_pass_filter"
    }

    fn apply(
        &self,
        batch: &ChannelBatch,
        sample_rate: u32,
        rng: &mut StdRng,
    ) -> AudioResult<ChannelBatch> {
        let sr = validate_sample_rate(sample_rate)?;
        let filters = shelf_filters(BiquadKind::LowPass, self.cutoff_hz, batch.examples(), sr, rng);
        apply_biquads(batch, &filters)
    }
}
