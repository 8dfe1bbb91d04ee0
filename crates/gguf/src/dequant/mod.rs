//! Block-quantization decoders.
//!
//! Every decoder has the same shape: read fixed-size blocks out of `src`,
//! compute one `f32` weight at a time, and hand it to a [`DequantSink`]
//! rather than writing directly into a typed buffer. This lets the same
//! decoder feed an `f32` buffer, an `f16` buffer, or a `bf16` buffer without
//! three copies of the bit-unpacking logic — see `facade.rs` for the
//! dispatch that picks a decoder and a sink together.

use crate::error::{GgufError, Result};
use crate::half::{f32_to_brain, f32_to_half};
use crate::tensortype::TensorType;

mod bf16;
mod f16;
mod f32;
mod q2_k;
mod q4_0;
mod q4_1;
mod q4_k;
mod q6_k;
mod q8_0;

/// Receives decoded weights one at a time, in ascending index order.
pub trait DequantSink {
    fn store(&mut self, index: usize, value: f32);
}

impl DequantSink for [f32] {
    fn store(&mut self, index: usize, value: f32) {
        self[index] = value;
    }
}

/// Wraps an `f16`-bits buffer so decoders can write half-precision output
/// directly, without an intermediate `f32` pass.
pub struct F16Sink<'a>(pub &'a mut [u16]);

impl DequantSink for F16Sink<'_> {
    fn store(&mut self, index: usize, value: f32) {
        self.0[index] = f32_to_half(value);
    }
}

/// Wraps a `bf16`-bits buffer, analogous to [`F16Sink`].
pub struct Bf16Sink<'a>(pub &'a mut [u16]);

impl DequantSink for Bf16Sink<'_> {
    fn store(&mut self, index: usize, value: f32) {
        self.0[index] = f32_to_brain(value);
    }
}

/// Decode `count` weights of `tensor_type` from `src` into `sink`.
///
/// `src` must hold at least `tensor_type.payload_size(count)` bytes.
/// Returns `UnsupportedDecode` for any tensor type outside the decodable
/// set (`TensorType::is_decodable`).
pub fn decode(tensor_type: TensorType, src: &[u8], count: usize, sink: &mut dyn DequantSink) -> Result<()> {
    match tensor_type {
        TensorType::F32 => f32::decode(src, count, sink),
        TensorType::F16 => f16::decode(src, count, sink),
        TensorType::BF16 => bf16::decode(src, count, sink),
        TensorType::Q8_0 => q8_0::decode(src, count, sink),
        TensorType::Q4_0 => q4_0::decode(src, count, sink),
        TensorType::Q4_1 => q4_1::decode(src, count, sink),
        TensorType::Q2_K => q2_k::decode(src, count, sink),
        TensorType::Q4_K => q4_k::decode(src, count, sink),
        TensorType::Q6_K => q6_k::decode(src, count, sink),
        other => Err(GgufError::UnsupportedDecode(other.info().name)),
    }
}

/// Bounds-check a block read of `n` bytes at `offset` against `src`.
fn block_at(src: &[u8], offset: usize, n: usize) -> Result<&[u8]> {
    src.get(offset..offset + n).ok_or(GgufError::Truncated {
        offset,
        needed: n,
        available: src.len().saturating_sub(offset),
    })
}
