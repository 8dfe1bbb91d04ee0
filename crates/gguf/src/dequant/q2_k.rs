//! Q2_K: super-blocks of 256 weights split into 16 sub-blocks of 16.
//!
//! Layout (84 bytes): 16 bytes of packed sub-block scale/min nibbles
//! (`sm`), 64 bytes of packed 2-bit quants (`q`), an `f16` scale-of-scales,
//! and an `f16` scale-of-mins.
//!
//! Sub-block `b` has `scale = scale_of_scales * (sm[b] & 0xf)` and
//! `min = scale_of_mins * (sm[b] >> 4)`. Weight `i`'s 2-bit quant lives in
//! `q[(i % 32) + (i / 128) * 32]` at bit position `2 * ((i % 128) / 32)`.
//! `weight = quant * scale - min`.

use super::{block_at, DequantSink};
use crate::error::Result;
use crate::half::half_to_f32;

const SUPERBLOCK_SIZE: usize = 256;
const SUPERBLOCK_BYTES: usize = 84;

pub fn decode(src: &[u8], count: usize, sink: &mut dyn DequantSink) -> Result<()> {
    let n_super = count.div_ceil(SUPERBLOCK_SIZE);
    let mut produced = 0;
    for s in 0..n_super {
        let block = block_at(src, s * SUPERBLOCK_BYTES, SUPERBLOCK_BYTES)?;
        let sm = &block[0..16];
        let q = &block[16..80];
        let d = half_to_f32(u16::from_le_bytes(block[80..82].try_into().unwrap()));
        let m_all = half_to_f32(u16::from_le_bytes(block[82..84].try_into().unwrap()));

        let remaining = count - produced;
        let take = remaining.min(SUPERBLOCK_SIZE);
        for i in 0..take {
            let sub = i / 16;
            let scale = d * (sm[sub] & 0x0f) as f32;
            let min = m_all * (sm[sub] >> 4) as f32;
            let byte_index = (i % 32) + (i / 128) * 32;
            let bit_pos = 2 * ((i % 128) / 32);
            let quant = (q[byte_index] >> bit_pos) & 0x3;
            let weight = quant as f32 * scale - min;
            sink.store(produced + i, weight);
        }
        produced += take;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::half::f32_to_half;

    #[test]
    fn decodes_one_superblock() {
        let mut block = vec![0u8; SUPERBLOCK_BYTES];
        // Sub-block 0: scale nibble 3, min nibble 1.
        block[0] = 0x13;
        block[80..82].copy_from_slice(&f32_to_half(1.0).to_le_bytes());
        block[82..84].copy_from_slice(&f32_to_half(1.0).to_le_bytes());
        // First byte of q carries weight 0's 2-bit quant in the low 2 bits.
        block[16] = 0b10; // quant = 2

        let mut out = [0f32; 256];
        decode(&block, 256, &mut out[..]).unwrap();
        assert_eq!(out[0], 2.0 * 3.0 - 1.0);
    }
}
