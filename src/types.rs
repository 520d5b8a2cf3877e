// SPDX-License-Identifier: Apache-2.0

// types.rs for tiermath
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum KernelError {
    #[error("operand length mismatch: dst={dst}, src={src}")]
    LengthMismatch { dst: usize, src: usize },
    #[error("scratch buffer too small: required {required} lanes, got {actual}")]
    ScratchTooSmall { required: usize, actual: usize },
    #[error("{bytes} bytes is not a multiple of the {align}-byte alignment unit")]
    Misaligned { bytes: usize, align: usize },
    #[error("Invalid buffer: {0}")]
    InvalidBuffer(String),
    #[error("Unsupported operation: {0}")]
    Unsupported(String),
}

pub type Result<T> = std::result::Result<T, KernelError>;

/// Accuracy/speed tradeoff for half-precision inputs on tiers without native
/// high-accuracy instructions. Ignored everywhere else.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Precision {
    /// Widen to f32, compute, narrow rounding down. Needs scratch.
    #[default]
    High,
    /// Approximate directly on half lanes. No scratch.
    Fast,
}

impl Precision {
    #[inline]
    pub fn from_flag(is_high_precision: bool) -> Self {
        if is_high_precision {
            Precision::High
        } else {
            Precision::Fast
        }
    }

    #[inline]
    pub fn is_high(self) -> bool {
        self == Precision::High
    }
}

/// Element types a launch framework can hand to the kernels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DataType {
    Half,
    Float,
    Int32,
}

impl DataType {
    #[inline]
    pub fn size_of(self) -> usize {
        match self {
            DataType::Half => 2,
            DataType::Float | DataType::Int32 => 4,
        }
    }

    #[inline]
    pub fn is_float(self) -> bool {
        matches!(self, DataType::Half | DataType::Float)
    }
}

/// Operand pair for the unary float kernels.
///
/// Reciprocal, exponential and sigmoid may run with destination and source
/// being the same buffer; `InPlace` is that case. The conversion kernels never
/// accept this type since their source and destination must not overlap.
#[derive(Debug)]
pub enum Operands<'a, T> {
    InPlace(&'a mut [T]),
    Split { dst: &'a mut [T], src: &'a [T] },
}

impl<'a, T: Copy> Operands<'a, T> {
    #[inline]
    pub fn split(dst: &'a mut [T], src: &'a [T]) -> Self {
        Operands::Split { dst, src }
    }

    #[inline]
    pub fn len(&self) -> usize {
        match self {
            Operands::InPlace(buf) => buf.len(),
            Operands::Split { src, .. } => src.len(),
        }
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Resolves to the destination buffer holding the source values, ready for
    /// an in-place kernel.
    pub fn into_dst(self) -> Result<&'a mut [T]> {
        match self {
            Operands::InPlace(buf) => Ok(buf),
            Operands::Split { dst, src } => {
                if dst.len() != src.len() {
                    return Err(KernelError::LengthMismatch {
                        dst: dst.len(),
                        src: src.len(),
                    });
                }
                dst.copy_from_slice(src);
                Ok(dst)
            }
        }
    }
}

impl<'a, T> From<&'a mut [T]> for Operands<'a, T> {
    #[inline]
    fn from(buf: &'a mut [T]) -> Self {
        Operands::InPlace(buf)
    }
}

impl<'a, T> From<&'a mut Vec<T>> for Operands<'a, T> {
    #[inline]
    fn from(buf: &'a mut Vec<T>) -> Self {
        Operands::InPlace(buf.as_mut_slice())
    }
}
