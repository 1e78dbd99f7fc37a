// SPDX-License-Identifier: GPL-3.0-only

//! Fixed-point carry accumulator
//!
//! The reduction passes store brightness as an integer pair: green holds the
//! fraction in `0..255`, red collects every whole multiple of 255 that
//! overflowed green. A texel decodes to `red * 255 + green`. The render
//! targets are `Rgba32Uint`, so neither channel saturates at full scale.

use crate::constants::CARRY_BASE;

/// One texel of the accumulator, as bytes
///
/// `carry` is as wide as the red channel of the render target, so a
/// full-scale sum of 256 texels (carry 256) fits.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CarryTexel {
    /// Whole units carried out of green (red channel)
    pub carry: u32,
    /// Fractional part, 0..=255 (green channel)
    pub fraction: u8,
    /// Averaged coverage marker (blue channel)
    pub coverage: u8,
}

impl CarryTexel {
    /// Texel written by the luminance pass for a quantized luminance byte
    pub fn from_luminance(value: u8) -> Self {
        Self {
            carry: 0,
            fraction: value,
            coverage: u8::MAX,
        }
    }

    /// Split an accumulated sum into carry and fraction
    pub fn encode(value: u32) -> Self {
        Self {
            carry: value / CARRY_BASE,
            fraction: (value % CARRY_BASE) as u8,
            coverage: u8::MAX,
        }
    }

    /// Interpret one `Rgba32Uint` texel read back from a render target
    ///
    /// Green is folded into red should it ever hold a whole unit.
    pub fn from_rgba32(rgba: [u32; 4]) -> Self {
        Self {
            carry: rgba[0] + rgba[1] / CARRY_BASE,
            fraction: (rgba[1] % CARRY_BASE) as u8,
            coverage: rgba[2].min(u8::MAX as u32) as u8,
        }
    }

    /// Accumulated brightness held by this texel
    #[inline]
    pub fn value(&self) -> u32 {
        self.carry * CARRY_BASE + self.fraction as u32
    }

    /// Merge up to four texels the way the reduction shader does
    ///
    /// Green bytes are summed, whole multiples of 255 move into the carry,
    /// the remainder stays in green. Coverage is divided by four.
    pub fn reduce(samples: &[CarryTexel]) -> Self {
        debug_assert!(!samples.is_empty() && samples.len() <= 4);

        let mut green = 0u32;
        let mut carry = 0u32;
        let mut coverage = 0u32;
        for texel in samples {
            green += texel.fraction as u32;
            carry += texel.carry;
            coverage += texel.coverage as u32;
        }

        let overflow = green / CARRY_BASE;
        Self {
            carry: carry + overflow,
            fraction: (green - overflow * CARRY_BASE) as u8,
            coverage: ((coverage + 2) / 4) as u8,
        }
    }
}
