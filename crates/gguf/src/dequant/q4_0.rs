//! Q4_0: blocks of 32 weights packed into 16 nibble-pair bytes, preceded by
//! an `f16` scale. Weights 0..16 are the low nibbles of `nib[0..16]`;
//! weights 16..32 are the high nibbles of the same 16 bytes. Each nibble is
//! treated as unsigned 0..16 and recentered by subtracting 8.

use super::{block_at, DequantSink};
use crate::error::Result;
use crate::half::half_to_f32;

const BLOCK_SIZE: usize = 32;
const BLOCK_BYTES: usize = 18;

pub fn decode(src: &[u8], count: usize, sink: &mut dyn DequantSink) -> Result<()> {
    let n_blocks = count.div_ceil(BLOCK_SIZE);
    let mut produced = 0;
    for b in 0..n_blocks {
        let block = block_at(src, b * BLOCK_BYTES, BLOCK_BYTES)?;
        let scale = half_to_f32(u16::from_le_bytes(block[0..2].try_into().unwrap()));
        let nib = &block[2..18];
        let remaining = count - produced;
        let take = remaining.min(BLOCK_SIZE);
        for i in 0..take {
            let (byte_idx, is_high) = if i < 16 { (i, false) } else { (i - 16, true) };
            let byte = nib[byte_idx];
            let q = if is_high { byte >> 4 } else { byte & 0x0f };
            let weight = scale * (q as i32 - 8) as f32;
            sink.store(produced + i, weight);
        }
        produced += take;
    }
    Ok(())
}
