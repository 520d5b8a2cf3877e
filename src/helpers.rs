// SPDX-License-Identifier: Apache-2.0

//! Shared helpers: ordering helpers, scratch sizing and buffer-contract checks.

use crate::constants::{ALIGN_BYTES, SEG_LANES_32};
use crate::types::{KernelError, Result};

/// Returns `a` if `a < b`, else `b`. A NaN in `a` yields `b`.
#[inline]
pub fn min_of<T: PartialOrd>(a: T, b: T) -> T {
    if a < b {
        a
    } else {
        b
    }
}

/// Returns `a` if `a > b`, else `b`. A NaN in `a` yields `b`.
#[inline]
pub fn max_of<T: PartialOrd>(a: T, b: T) -> T {
    if a > b {
        a
    } else {
        b
    }
}

/// f32 lanes of scratch a widened half computation needs for `count` elements.
#[inline]
pub fn widen_scratch_len(count: usize) -> usize {
    count
}

/// u32 lanes of mask scratch the conversion fallbacks need: one segment,
/// independent of the element count.
#[inline]
pub fn mask_scratch_len() -> usize {
    SEG_LANES_32
}

/// Checks the alignment contract of the cycle instructions.
#[inline]
pub fn check_aligned(count: usize, width: usize) -> Result<()> {
    let bytes = count * width;
    if bytes % ALIGN_BYTES != 0 {
        return Err(KernelError::Misaligned {
            bytes,
            align: ALIGN_BYTES,
        });
    }
    Ok(())
}

#[inline]
pub fn check_scratch(required: usize, actual: usize) -> Result<()> {
    if actual < required {
        return Err(KernelError::ScratchTooSmall { required, actual });
    }
    Ok(())
}

#[inline]
pub fn check_same_len(dst: usize, src: usize) -> Result<()> {
    if dst != src {
        return Err(KernelError::LengthMismatch { dst, src });
    }
    Ok(())
}

/// Takes the first `count` lanes of an optional scratch buffer, failing when
/// it is absent or short.
#[inline]
pub fn take_scratch<T>(scratch: Option<&mut [T]>, count: usize) -> Result<&mut [T]> {
    match scratch {
        Some(buf) => {
            check_scratch(count, buf.len())?;
            Ok(&mut buf[..count])
        }
        None => Err(KernelError::ScratchTooSmall {
            required: count,
            actual: 0,
        }),
    }
}
