//! Top-level dequantization entry points: allocate an output buffer of the
//! requested representation and hand it to the right decoder.

use crate::dequant::{self, Bf16Sink, F16Sink};
use crate::error::{GgufError, Result};
use crate::tensortype::TensorType;

fn try_alloc_f32(num_weights: usize) -> Result<Vec<f32>> {
    let mut out = Vec::new();
    out.try_reserve_exact(num_weights)
        .map_err(|_| GgufError::AllocationTooLarge(num_weights))?;
    out.resize(num_weights, 0.0);
    Ok(out)
}

fn try_alloc_u16(num_weights: usize) -> Result<Vec<u16>> {
    let mut out = Vec::new();
    out.try_reserve_exact(num_weights)
        .map_err(|_| GgufError::AllocationTooLarge(num_weights))?;
    out.resize(num_weights, 0);
    Ok(out)
}

/// Decode `num_weights` elements of `tensor_type` from `src` into a fresh
/// `f32` buffer.
pub fn tensor_to_float(tensor_type: TensorType, src: &[u8], num_weights: usize) -> Result<Vec<f32>> {
    let mut out = try_alloc_f32(num_weights)?;
    dequant::decode(tensor_type, src, num_weights, &mut out[..])?;
    Ok(out)
}

/// Decode into a fresh buffer of binary16 bit patterns.
pub fn tensor_to_f16(tensor_type: TensorType, src: &[u8], num_weights: usize) -> Result<Vec<u16>> {
    let mut out = try_alloc_u16(num_weights)?;
    let mut sink = F16Sink(&mut out);
    dequant::decode(tensor_type, src, num_weights, &mut sink)?;
    Ok(out)
}

/// Decode into a fresh buffer of bfloat16 bit patterns.
pub fn tensor_to_bf16(tensor_type: TensorType, src: &[u8], num_weights: usize) -> Result<Vec<u16>> {
    let mut out = try_alloc_u16(num_weights)?;
    let mut sink = Bf16Sink(&mut out);
    dequant::decode(tensor_type, src, num_weights, &mut sink)?;
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn float_passthrough() {
        let values: [f32; 2] = [1.5, -2.25];
        let bytes: Vec<u8> = values.iter().flat_map(|v| v.to_le_bytes()).collect();
        let out = tensor_to_float(TensorType::F32, &bytes, 2).unwrap();
        assert_eq!(out, values);
    }

    #[test]
    fn f16_output_roundtrips_through_half() {
        use crate::half::half_to_f32;
        let values: [f32; 2] = [1.0, -1.0];
        let bytes: Vec<u8> = values.iter().flat_map(|v| v.to_le_bytes()).collect();
        let out = tensor_to_f16(TensorType::F32, &bytes, 2).unwrap();
        assert_eq!(half_to_f32(out[0]), 1.0);
        assert_eq!(half_to_f32(out[1]), -1.0);
    }

    #[test]
    fn unsupported_type_propagates_error() {
        let err = tensor_to_float(TensorType::Q5_1, &[0u8; 24], 1).unwrap_err();
        assert!(matches!(err, GgufError::UnsupportedDecode(_)));
    }
}
