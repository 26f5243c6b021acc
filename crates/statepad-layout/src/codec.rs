//! Reading and writing control values in state buffers.

use statepad_bit_mask::{read_bits, write_bits, BitRangeError};
use thiserror::Error;

use crate::descriptor::ControlDescriptor;
use crate::format::FormatCode;
use crate::value::ControlValue;

#[derive(Debug, Error, PartialEq)]
pub enum CodecError {
    #[error("control \"{control}\" spans bits {offset}..{end} beyond the {len}-byte buffer")]
    OutOfBounds {
        control: String,
        offset: u32,
        end: u64,
        len: usize,
    },
    #[error("control \"{control}\" cannot be {bits} bits wide in format {format}")]
    FormatMismatch {
        control: String,
        format: &'static str,
        bits: u32,
    },
    #[error("control \"{control}\" with format {format} cannot hold {value}")]
    TypeMismatch {
        control: String,
        format: &'static str,
        value: ControlValue,
    },
}

pub type CodecResult<T> = std::result::Result<T, CodecError>;

/// Decodes a control without applying its processors.
pub fn decode_raw(buf: &[u8], desc: &ControlDescriptor) -> CodecResult<ControlValue> {
    check_width(desc)?;
    let offset = desc.bit_offset();
    let bits = desc.bit_size();
    let read = |offset: u32, size: u32| read_bits(buf, offset, size).map_err(|e| out_of_bounds(desc, &e));

    let value = match desc.format() {
        FormatCode::Bit => ControlValue::Scalar(read(offset, bits)? as f32),
        FormatCode::Byte | FormatCode::UnsignedShort => {
            ControlValue::Scalar(read(offset, bits)? as f32 / max_code(bits) as f32)
        }
        FormatCode::SignedShort => {
            let raw = sign_extend(read(offset, bits)?, bits);
            let max = max_code(bits - 1) as f32;
            ControlValue::Scalar((raw as f32 / max).clamp(-1.0, 1.0))
        }
        FormatCode::Float32 => ControlValue::Scalar(f32::from_bits(read(offset, 32)? as u32)),
        FormatCode::Vector2 => {
            let x = f32::from_bits(read(offset, 32)? as u32);
            let y = f32::from_bits(read(offset + 32, 32)? as u32);
            ControlValue::Vector2(x, y)
        }
        FormatCode::DiscreteButton(range) => {
            let v = read(offset, bits)? as u32;
            ControlValue::Scalar(if range.contains(v) { 1.0 } else { 0.0 })
        }
    };
    Ok(value)
}

/// Decodes a control and runs it through its processor chain.
pub fn decode(buf: &[u8], desc: &ControlDescriptor) -> CodecResult<ControlValue> {
    decode_raw(buf, desc).map(|v| desc.processors().apply(v))
}

/// Writes a value in the control's format domain, rounding to the nearest
/// representable code. Processors are not inverted.
pub fn encode(buf: &mut [u8], desc: &ControlDescriptor, value: ControlValue) -> CodecResult<()> {
    check_width(desc)?;
    let offset = desc.bit_offset();
    let bits = desc.bit_size();
    let format = desc.format();

    let mismatch = || CodecError::TypeMismatch {
        control: desc.name().to_string(),
        format: format.code(),
        value,
    };

    let scalar = match (format, value) {
        (FormatCode::Vector2, ControlValue::Vector2(x, y)) => {
            write(buf, desc, offset, 32, u64::from(x.to_bits()))?;
            return write(buf, desc, offset + 32, 32, u64::from(y.to_bits()));
        }
        (FormatCode::Vector2, ControlValue::Scalar(_)) | (_, ControlValue::Vector2(..)) => {
            return Err(mismatch());
        }
        (_, ControlValue::Scalar(v)) => v,
    };

    let raw = match format {
        FormatCode::Bit if bits == 1 => u64::from(scalar >= 0.5),
        FormatCode::Bit => scalar.round().clamp(0.0, max_code(bits) as f32) as u64,
        FormatCode::Byte | FormatCode::UnsignedShort => {
            (scalar.clamp(0.0, 1.0) * max_code(bits) as f32).round() as u64
        }
        FormatCode::SignedShort => {
            let max = max_code(bits - 1) as f32;
            let code = (scalar.clamp(-1.0, 1.0) * max).round() as i64;
            (code as u64) & max_code(bits)
        }
        FormatCode::Float32 => u64::from(scalar.to_bits()),
        FormatCode::DiscreteButton(range) => {
            let code = if scalar >= 0.5 {
                range.pressed_value()
            } else {
                range.null_value
            };
            u64::from(code)
        }
        FormatCode::Vector2 => return Err(mismatch()),
    };
    write(buf, desc, offset, bits, raw)
}

fn write(buf: &mut [u8], desc: &ControlDescriptor, offset: u32, size: u32, raw: u64) -> CodecResult<()> {
    write_bits(buf, offset, size, raw).map_err(|e| out_of_bounds(desc, &e))
}

fn check_width(desc: &ControlDescriptor) -> CodecResult<()> {
    if desc.format().accepts_width(desc.bit_size()) {
        Ok(())
    } else {
        Err(CodecError::FormatMismatch {
            control: desc.name().to_string(),
            format: desc.format().code(),
            bits: desc.bit_size(),
        })
    }
}

fn out_of_bounds(desc: &ControlDescriptor, e: &BitRangeError) -> CodecError {
    CodecError::OutOfBounds {
        control: desc.name().to_string(),
        offset: desc.bit_offset(),
        end: desc.bit_end(),
        len: (e.len_bits / 8) as usize,
    }
}

#[inline]
const fn max_code(bits: u32) -> u64 {
    if bits >= 64 {
        u64::MAX
    } else {
        (1u64 << bits) - 1
    }
}

#[inline]
fn sign_extend(raw: u64, bits: u32) -> i64 {
    let shift = 64 - bits;
    ((raw << shift) as i64) >> shift
}
