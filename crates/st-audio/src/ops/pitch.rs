// SPDX-License-Identifier: AGPL-3.0-or-later
// © 2025 Ryo ∴ SpiralArchitect (kishkavsesvit@icloud.com)
// Part of SpiralTorch — Licensed under AGPL-3.0-or-later.
// Unauthorized derivative works or closed redistribution prohibited under AGPL §13.

use crate::error::AudioResult;
use crate::transform::{validate_sample_rate, ChannelBatch, ParameterRange, Transform};
use core::f32::consts::PI;
use rand::rngs::StdRng;

/// Grain length in seconds (1024 samples at 16 kHz).
const GRAIN_SECONDS: f32 = 0.064;

/// Shifts pitch by a random number of semitones without changing duration.
///
/// Uses granular overlap-add: Hann grains are resampled around their own
/// centre by the pitch ratio and laid back down at their original position,
/// so timing is preserved while the spectral content moves.
#[derive(Clone, Debug)]
pub struct PitchShift {
    semitones: ParameterRange,
}

impl PitchShift {
    pub fn new(semitones: ParameterRange) -> Self {
        Self { semitones }
    }
}

impl Default for PitchShift {
    fn default() -> Self {
        Self::new(ParameterRange::from_bounds(-4.0, 4.0))
    }
}

fn hann(len: usize) -> Vec<f32> {
    (0..len)
        .map(|j| 0.5 - 0.5 * (2.0 * PI * j as f32 / len as f32).cos())
        .collect()
}

fn interpolate(samples: &[f32], position: f32) -> f32 {
    if position < 0.0 {
        return 0.0;
    }
    let base = position.floor() as usize;
    if base + 1 >= samples.len() {
        return if base + 1 == samples.len() {
            samples[base]
        } else {
            0.0
        };
    }
    let frac = position - base as f32;
    samples[base] * (1.0 - frac) + samples[base + 1] * frac
}

pub(crate) fn shift_row(row: &mut [f32], ratio: f32, grain: usize) {
    let len = row.len();
    if len == 0 {
        return;
    }
    let grain = grain.clamp(2, len.max(2));
    let hop = (grain / 4).max(1);
    let window = hann(grain);
    let source = row.to_vec();
    let mut acc = vec![0.0f32; len];
    let mut weight = vec![0.0f32; len];
    let half = grain as f32 / 2.0;

    let mut start = -(grain as isize) + hop as isize;
    while start < len as isize {
        let centre = start as f32 + half;
        for (j, w) in window.iter().enumerate() {
            let out = start + j as isize;
            if out < 0 || out >= len as isize {
                continue;
            }
            let read = centre + (j as f32 - half) * ratio;
            acc[out as usize] += w * interpolate(&source, read);
            weight[out as usize] += w;
        }
        start += hop as isize;
    }

    for ((v, a), w) in row.iter_mut().zip(acc).zip(weight) {
        *v = if w > 1e-6 { a / w } else { 0.0 };
    }
}

impl Transform for PitchShift {
    fn name(&self) -> &'static str {
        "pitch_shift"
    }

    fn apply(
        &self,
        batch: &ChannelBatch,
        sample_rate: u32,
        rng: &mut StdRng,
    ) -> AudioResult<ChannelBatch> {
        let sr = validate_sample_rate(sample_rate)?;
        let grain = (GRAIN_SECONDS * sr).round() as usize;
        let ratios: Vec<f32> = self
            .semitones
            .sample_n(batch.examples(), rng)
            .into_iter()
            .map(|s| 2f32.powf(s / 12.0))
            .collect();
        batch.map_examples(&ratios, |ratio, row| shift_row(row, *ratio, grain))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use st_tensor::Tensor;

    fn zero_crossings(samples: &[f32]) -> usize {
        samples
            .windows(2)
            .filter(|pair| (pair[0] >= 0.0) != (pair[1] >= 0.0))
            .count()
    }

    #[test]
    fn unit_ratio_is_identity() {
        let original: Vec<f32> = (0..4000).map(|i| (i as f32 * 0.07).sin()).collect();
        let mut row = original.clone();
        shift_row(&mut row, 1.0, 1024);
        for (a, b) in row.iter().zip(&original) {
            assert!((a - b).abs() < 1e-4);
        }
    }

    #[test]
    fn octave_up_doubles_crossings() {
        let sr = 16_000.0f32;
        let original: Vec<f32> = (0..16_000)
            .map(|i| (2.0 * PI * 200.0 * i as f32 / sr).sin())
            .collect();
        let mut row = original.clone();
        shift_row(&mut row, 2.0, 1024);
        let middle = 4000..12_000;
        let before = zero_crossings(&original[middle.clone()]) as f32;
        let after = zero_crossings(&row[middle]) as f32;
        let ratio = after / before;
        assert!(ratio > 1.6 && ratio < 2.4, "crossing ratio {ratio}");
    }

    #[test]
    fn shift_keeps_duration() {
        let input = Tensor::random_uniform(2, 3000, -0.5, 0.5, Some(4)).unwrap();
        let batch = ChannelBatch::mono(input);
        let mut rng = StdRng::seed_from_u64(2);
        let out = PitchShift::default().apply(&batch, 16_000, &mut rng).unwrap();
        assert_eq!(out.shape(), (2, 1, 3000));
        assert!(out.samples().is_finite());
    }
}
