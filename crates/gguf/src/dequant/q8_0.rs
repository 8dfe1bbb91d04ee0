//! Q8_0: blocks of 32 weights, each an `f16` scale followed by 32 signed
//! 8-bit quants. `weight = scale * quant`.

use super::{block_at, DequantSink};
use crate::error::Result;
use crate::half::half_to_f32;

const BLOCK_SIZE: usize = 32;
const BLOCK_BYTES: usize = 34;

pub fn decode(src: &[u8], count: usize, sink: &mut dyn DequantSink) -> Result<()> {
    let n_blocks = count.div_ceil(BLOCK_SIZE);
    let mut produced = 0;
    for b in 0..n_blocks {
        let block = block_at(src, b * BLOCK_BYTES, BLOCK_BYTES)?;
        let scale = half_to_f32(u16::from_le_bytes(block[0..2].try_into().unwrap()));
        let remaining = count - produced;
        let take = remaining.min(BLOCK_SIZE);
        for j in 0..take {
            let q = block[2 + j] as i8;
            sink.store(produced + j, scale * q as f32);
        }
        produced += take;
    }
    Ok(())
}
