//! Q4_1: like Q4_0 but with an independent bias alongside the scale instead
//! of a fixed recentering. Block layout: `f16` scale, `f16` min, then 16
//! nibble-pair bytes. `weight = scale * nibble + min`.

use super::{block_at, DequantSink};
use crate::error::Result;
use crate::half::half_to_f32;

const BLOCK_SIZE: usize = 32;
const BLOCK_BYTES: usize = 20;

pub fn decode(src: &[u8], count: usize, sink: &mut dyn DequantSink) -> Result<()> {
    let n_blocks = count.div_ceil(BLOCK_SIZE);
    let mut produced = 0;
    for b in 0..n_blocks {
        let block = block_at(src, b * BLOCK_BYTES, BLOCK_BYTES)?;
        let scale = half_to_f32(u16::from_le_bytes(block[0..2].try_into().unwrap()));
        let min = half_to_f32(u16::from_le_bytes(block[2..4].try_into().unwrap()));
        let nib = &block[4..20];
        let remaining = count - produced;
        let take = remaining.min(BLOCK_SIZE);
        for i in 0..take {
            let (byte_idx, is_high) = if i < 16 { (i, false) } else { (i - 16, true) };
            let byte = nib[byte_idx];
            let q = if is_high { byte >> 4 } else { byte & 0x0f };
            let weight = scale * q as f32 + min;
            sink.store(produced + i, weight);
        }
        produced += take;
    }
    Ok(())
}
