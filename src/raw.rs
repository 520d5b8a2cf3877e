// SPDX-License-Identifier: Apache-2.0

//! Byte-buffer entry points for launch frameworks that carry the element type
//! as a runtime [`DataType`] instead of a Rust type.
//!
//! Buffers must be aligned for their element type. A non-float dtype is
//! accepted and leaves the destination untouched.

use half::f16;
use log::{debug, trace};

use crate::dispatch::{KernelTable, UnaryOp};
use crate::types::{DataType, KernelError, Operands, Precision, Result};

fn view_mut<'a, T: bytemuck::Pod>(bytes: &'a mut [u8], what: &str) -> Result<&'a mut [T]> {
    bytemuck::try_cast_slice_mut(bytes)
        .map_err(|e| KernelError::InvalidBuffer(format!("{}: {}", what, e)))
}

fn view<'a, T: bytemuck::Pod>(bytes: &'a [u8], what: &str) -> Result<&'a [T]> {
    bytemuck::try_cast_slice(bytes).map_err(|e| KernelError::InvalidBuffer(format!("{}: {}", what, e)))
}

fn run_typed<T>(
    table: &KernelTable,
    op: UnaryOp,
    dst: &mut [u8],
    src: Option<&[u8]>,
    scratch: Option<&mut [u8]>,
    precision: Precision,
) -> Result<()>
where
    T: crate::dispatch::KernelFloat + bytemuck::Pod,
{
    let dst: &mut [T] = view_mut(dst, "dst")?;
    // Scratch is only viewed when the selected kernel reads it
    let scratch: Option<&mut [f32]> = match scratch {
        Some(bytes) if table.scratch_len(op, T::DTYPE, precision, dst.len()) > 0 => {
            Some(view_mut(bytes, "scratch")?)
        }
        _ => None,
    };
    let ops = match src {
        Some(bytes) => Operands::split(dst, view(bytes, "src")?),
        None => Operands::InPlace(dst),
    };
    table.unary(op, ops, scratch, precision)
}

/// Runs `op` over byte buffers holding `dtype` elements.
///
/// `src` of `None` means in place on `dst`. Only `Half` and `Float` are
/// computed; any other dtype returns `Ok(())` without touching `dst`.
pub fn compute_unary_raw(
    table: &KernelTable,
    op: UnaryOp,
    dtype: DataType,
    dst: &mut [u8],
    src: Option<&[u8]>,
    scratch: Option<&mut [u8]>,
    precision: Precision,
) -> Result<()> {
    trace!(
        "{:?} RAW DISPATCH: dtype={:?}, dst bytes={}, in_place={}",
        op,
        dtype,
        dst.len(),
        src.is_none()
    );
    match dtype {
        DataType::Float => run_typed::<f32>(table, op, dst, src, scratch, precision),
        DataType::Half => run_typed::<f16>(table, op, dst, src, scratch, precision),
        other => {
            debug!("{:?} on {:?} buffers is not computed; destination left as is", op, other);
            Ok(())
        }
    }
}

#[inline]
pub fn compute_recip_raw(
    dtype: DataType,
    dst: &mut [u8],
    src: Option<&[u8]>,
    scratch: Option<&mut [u8]>,
    precision: Precision,
) -> Result<()> {
    compute_unary_raw(KernelTable::global(), UnaryOp::Recip, dtype, dst, src, scratch, precision)
}

#[inline]
pub fn compute_exp_raw(
    dtype: DataType,
    dst: &mut [u8],
    src: Option<&[u8]>,
    scratch: Option<&mut [u8]>,
    precision: Precision,
) -> Result<()> {
    compute_unary_raw(KernelTable::global(), UnaryOp::Exp, dtype, dst, src, scratch, precision)
}

#[inline]
pub fn compute_sigmoid_raw(
    dtype: DataType,
    dst: &mut [u8],
    src: Option<&[u8]>,
    scratch: Option<&mut [u8]>,
    precision: Precision,
) -> Result<()> {
    compute_unary_raw(KernelTable::global(), UnaryOp::Sigmoid, dtype, dst, src, scratch, precision)
}
