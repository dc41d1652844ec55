//! Mixed-precision training utilities
//!
//! Master weights always stay in fp32. With mixed precision enabled the
//! forward activations and the backward signal leaving the loss are rounded
//! through the reduced format, and a [`GradScaler`] keeps small gradients
//! from flushing to zero.

mod scaler;

use std::fmt;

use ndarray::{ArrayBase, DataMut, Dimension};
use serde::{Deserialize, Serialize};

pub use scaler::{GradScaler, ScalerState};

/// Data type precision levels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Precision {
    /// 32-bit floating point (default)
    #[default]
    Fp32,
    /// 16-bit floating point (IEEE half precision)
    Fp16,
    /// 16-bit brain floating point (truncated mantissa)
    Bf16,
}

impl Precision {
    /// Size in bytes
    pub fn size_bytes(&self) -> usize {
        match self {
            Precision::Fp32 => 4,
            Precision::Fp16 | Precision::Bf16 => 2,
        }
    }

    /// Human-readable name
    pub fn name(&self) -> &'static str {
        match self {
            Precision::Fp32 => "fp32",
            Precision::Fp16 => "fp16",
            Precision::Bf16 => "bf16",
        }
    }

    /// Whether this is a reduced precision type
    pub fn is_reduced(&self) -> bool {
        matches!(self, Precision::Fp16 | Precision::Bf16)
    }

    /// Round a single value through this precision
    #[inline]
    pub fn round(&self, value: f32) -> f32 {
        match self {
            Precision::Fp32 => value,
            Precision::Fp16 => half::f16::from_f32(value).to_f32(),
            Precision::Bf16 => half::bf16::from_f32(value).to_f32(),
        }
    }

    /// Round every element of an array in place
    pub fn round_array<S, D>(&self, array: &mut ArrayBase<S, D>)
    where
        S: DataMut<Elem = f32>,
        D: Dimension,
    {
        if self.is_reduced() {
            array.mapv_inplace(|v| self.round(v));
        }
    }
}

impl fmt::Display for Precision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::arr1;

    #[test]
    fn test_fp32_round_is_identity() {
        assert_eq!(Precision::Fp32.round(0.1), 0.1);
    }

    #[test]
    fn test_fp16_round_loses_mantissa() {
        let x = 1.0 + 1e-4;
        assert_eq!(Precision::Fp16.round(x), 1.0);
        assert!(Precision::Fp16.round(70_000.0).is_infinite());
    }

    #[test]
    fn test_bf16_keeps_range() {
        assert!(Precision::Bf16.round(70_000.0).is_finite());
    }

    #[test]
    fn test_round_array() {
        let mut a = arr1(&[1.0001_f32, 2.0]);
        Precision::Fp16.round_array(&mut a);
        assert_eq!(a[0], 1.0);
        assert_eq!(Precision::Fp16.size_bytes(), 2);
        assert_eq!(Precision::Bf16.to_string(), "bf16");
    }
}
