// SPDX-License-Identifier: AGPL-3.0-or-later
// © 2025 Ryo ∴ SpiralArchitect (kishkavsesvit@icloud.com)
// Part of SpiralTorch — Licensed under AGPL-3.0-or-later.
// Unauthorized derivative works or closed redistribution prohibited under AGPL §13.

//! Runtime configuration shared by the robustness crates: deterministic seeding,
//! tracing initialisation, and layered TOML/JSON configuration files.

pub mod determinism;
pub mod layered;
pub mod tracing;

pub use determinism::{rng_from_label, rng_from_optional, DeterminismConfig};
pub use layered::{ConfigLayering, LayeredConfig, LayeredConfigError};
