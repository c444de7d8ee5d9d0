// SPDX-License-Identifier: AGPL-3.0-or-later
// © 2025 Ryo ∴ SpiralArchitect (kishkavsesvit@icloud.com)

mod common;

use approx::assert_relative_eq;
use common::{utterances, LinearBrain, QuadraticBrain};
use st_robust::{
    AsrBrain, AugMaxAttack, AugMaxConfig, AugMixBrain, AugMixConfig, AugMixModule, Stage,
};

fn module(seed: u64) -> AugMixModule {
    AugMixModule::new(AugMixConfig {
        mixture_depth: 1,
        seed: Some(seed),
        ..AugMixConfig::default()
    })
    .unwrap()
}

#[test]
fn training_forward_sees_augmented_audio() {
    let batch = utterances(2, 4_000);
    let mut brain = AugMixBrain::new(LinearBrain::new(4_000, 1), module(3));

    brain.compute_forward(&batch, Stage::Train).unwrap();
    let seen = brain.inner().last_signal.clone().unwrap();
    assert_eq!(seen.shape(), (2, 4_000));
    assert_ne!(seen, batch.signal.wavs);
    assert!(brain.last_sample().is_some());

    brain.compute_forward(&batch, Stage::Valid).unwrap();
    assert_eq!(brain.inner().last_signal.as_ref(), Some(&batch.signal.wavs));
    assert!(brain.last_sample().is_none());
}

#[test]
fn disabled_wrapper_passes_training_batches_through() {
    let batch = utterances(1, 2_000);
    let mut brain = AugMixBrain::new(LinearBrain::new(2_000, 1), module(3));
    brain.set_enabled(false);
    brain.compute_forward(&batch, Stage::Train).unwrap();
    assert_eq!(brain.inner().last_signal.as_ref(), Some(&batch.signal.wavs));
}

#[test]
fn input_gradient_keeps_only_the_original_share() {
    let batch = utterances(2, 2_000);
    let mut brain = AugMixBrain::new(LinearBrain::new(2_000, 5), module(8));
    let predictions = brain.compute_forward(&batch, Stage::Train).unwrap();
    let sample = brain.last_sample().cloned().unwrap();
    let wrapped = brain
        .backward_objectives(&predictions, &batch, Stage::Train)
        .unwrap()
        .unwrap();
    let raw = brain
        .inner_mut()
        .backward_objectives(&predictions, &batch, Stage::Train)
        .unwrap()
        .unwrap();
    for (n, (w_row, r_row)) in wrapped.rows_iter().zip(raw.rows_iter()).enumerate() {
        let keep = 1.0 - sample.mask.data()[n];
        for (w, r) in w_row.iter().zip(r_row) {
            assert!((w - keep * r).abs() < 1e-9);
        }
    }
}

#[test]
fn objectives_follow_the_augmented_signal() {
    let batch = utterances(2, 2_000);
    let mut brain = AugMixBrain::new(QuadraticBrain::new(), module(3));
    let predictions = brain.compute_forward(&batch, Stage::Train).unwrap();
    let sample = brain.last_sample().cloned().unwrap();
    let augmented = brain.last_augmented().unwrap().signal.wavs.clone();
    assert_ne!(augmented, batch.signal.wavs);

    let loss = brain
        .compute_objectives(&predictions, &batch, Stage::Train)
        .unwrap();
    assert_relative_eq!(loss, QuadraticBrain::energy(&augmented), max_relative = 1e-6);

    let grad = brain
        .backward_objectives(&predictions, &batch, Stage::Train)
        .unwrap()
        .unwrap();
    for (n, (g_row, x_row)) in grad.rows_iter().zip(augmented.rows_iter()).enumerate() {
        let keep = 1.0 - sample.mask.data()[n];
        for (g, x) in g_row.iter().zip(x_row) {
            assert_relative_eq!(*g, keep * x, epsilon = 1e-6);
        }
    }

    brain.compute_forward(&batch, Stage::Valid).unwrap();
    assert!(brain.last_augmented().is_none());
    let clean = brain
        .compute_objectives(&(), &batch, Stage::Valid)
        .unwrap();
    assert_relative_eq!(clean, QuadraticBrain::energy(&batch.signal.wavs), max_relative = 1e-6);
}

#[test]
fn attack_stage_bypasses_augmix() {
    let mut batch = utterances(2, 2_000);
    let brain = AugMixBrain::new(LinearBrain::new(2_000, 2), module(1));
    let config = AugMaxConfig {
        nb_iter: 3,
        mixture_depth: 1,
        seed: Some(4),
        ..AugMaxConfig::default()
    };
    let mut attack = AugMaxAttack::new(brain, config).unwrap();
    let outcome = attack.perturb_with_trace(&mut batch).unwrap();
    assert_eq!(outcome.steps.len(), 3);
    let brain = attack.into_brain();
    assert!(brain.last_sample().is_none());
    assert_eq!(brain.inner().forward_calls, 3);
}
