// SPDX-License-Identifier: AGPL-3.0-or-later
// © 2025 Ryo ∴ SpiralArchitect (kishkavsesvit@icloud.com)
// Part of SpiralTorch — Licensed under AGPL-3.0-or-later.
// Unauthorized derivative works or closed redistribution prohibited under AGPL §13.

use core::fmt;
use serde::{Deserialize, Serialize};

/// Placement tag carried by every [`crate::Tensor`].
///
/// Storage stays host-resident in the pure stack; the tag records where the
/// owning pipeline expects the values to live so that boundaries which must
/// run on the host (audio augmentation) can prove they handed results back to
/// the right place.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Device {
    #[default]
    Cpu,
    Cuda(u32),
    Wgpu,
    Mps,
}

impl Device {
    pub fn is_cpu(self) -> bool {
        matches!(self, Device::Cpu)
    }
}

impl fmt::Display for Device {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Device::Cpu => write!(f, "cpu"),
            Device::Cuda(ordinal) => write!(f, "cuda:{ordinal}"),
            Device::Wgpu => write!(f, "wgpu"),
            Device::Mps => write!(f, "mps"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn devices_render_and_serialise() {
        assert_eq!(Device::Cuda(2).to_string(), "cuda:2");
        assert!(Device::default().is_cpu());
        let json = serde_json::to_string(&Device::Cuda(1)).unwrap();
        let back: Device = serde_json::from_str(&json).unwrap();
        assert_eq!(back, Device::Cuda(1));
    }
}
