//! PCM Sample Representation
//!
//! Frames travel through the engine as interleaved integer PCM held in `i32`,
//! whatever the source bit depth. The bit depth decides the legal range that
//! processed samples are clipped back into.

use serde::{Deserialize, Serialize};

/// Supported integer PCM bit depths
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "u16", into = "u16")]
pub enum BitDepth {
    Sixteen,
    TwentyFour,
}

impl BitDepth {
    pub fn from_bits(bits: u16) -> Option<Self> {
        match bits {
            16 => Some(BitDepth::Sixteen),
            24 => Some(BitDepth::TwentyFour),
            _ => None,
        }
    }

    pub fn bits(self) -> u16 {
        match self {
            BitDepth::Sixteen => 16,
            BitDepth::TwentyFour => 24,
        }
    }

    pub fn bytes(self) -> usize {
        self.bits() as usize / 8
    }

    /// Smallest representable sample
    pub fn min_sample(self) -> i32 {
        -(1 << (self.bits() - 1))
    }

    /// Largest representable sample
    pub fn max_sample(self) -> i32 {
        (1 << (self.bits() - 1)) - 1
    }

    /// Magnitude of full scale, used to map integer PCM onto [-1.0, 1.0)
    pub fn full_scale(self) -> f32 {
        (1_i32 << (self.bits() - 1)) as f32
    }

    /// Round and hard-clip a processed value into this depth's range.
    ///
    /// NaN maps to silence. Never wraps.
    #[inline]
    pub fn clip(self, value: f64) -> i32 {
        if value.is_nan() {
            return 0;
        }
        value
            .round()
            .clamp(self.min_sample() as f64, self.max_sample() as f64) as i32
    }

    /// Integer sample to a normalized float for playback
    #[inline]
    pub fn to_f32(self, sample: i32) -> f32 {
        sample as f32 / self.full_scale()
    }
}

impl TryFrom<u16> for BitDepth {
    type Error = String;

    fn try_from(bits: u16) -> Result<Self, Self::Error> {
        BitDepth::from_bits(bits).ok_or_else(|| format!("unsupported bit depth: {bits}"))
    }
}

impl From<BitDepth> for u16 {
    fn from(depth: BitDepth) -> u16 {
        depth.bits()
    }
}
