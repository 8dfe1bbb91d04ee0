//! Q6_K: super-blocks of 256 weights, split into two 128-weight clusters.
//!
//! Layout (210 bytes): 128 bytes of low nibbles (`L`), 64 bytes of high
//! 2-bit pairs (`H`), 16 signed 8-bit sub-scales (`scales`), and an `f16`
//! super-scale.
//!
//! Within cluster `c` (0 or 1), for local index `j` in `0..128`:
//! `low4 = (L[c*64 + j%64] >> ((j/64)*4)) & 0xf`
//! `high2 = (H[c*32 + j%32] >> ((j/32)*2)) & 0x3`
//! `u = low4 | (high2 << 4)` is an unsigned 6-bit quant; `q = u as i32 - 32`.
//! The sub-scale for `j` is `scales[c*8 + j/16]` (signed).
//! `weight = super_scale * subscale * q`.

use super::{block_at, DequantSink};
use crate::error::Result;
use crate::half::half_to_f32;

const SUPERBLOCK_SIZE: usize = 256;
const SUPERBLOCK_BYTES: usize = 210;
const CLUSTER_SIZE: usize = 128;

pub fn decode(src: &[u8], count: usize, sink: &mut dyn DequantSink) -> Result<()> {
    let n_super = count.div_ceil(SUPERBLOCK_SIZE);
    let mut produced = 0;
    for s in 0..n_super {
        let block = block_at(src, s * SUPERBLOCK_BYTES, SUPERBLOCK_BYTES)?;
        let l = &block[0..128];
        let h = &block[128..192];
        let scales = &block[192..208];
        let super_scale = half_to_f32(u16::from_le_bytes(block[208..210].try_into().unwrap()));

        let remaining = count - produced;
        let take = remaining.min(SUPERBLOCK_SIZE);
        for global_i in 0..take {
            let c = global_i / CLUSTER_SIZE;
            let j = global_i % CLUSTER_SIZE;
            let low4 = (l[c * 64 + j % 64] >> ((j / 64) * 4)) & 0x0f;
            let high2 = (h[c * 32 + j % 32] >> ((j / 32) * 2)) & 0x3;
            let u = low4 | (high2 << 4);
            let q = u as i32 - 32;
            let subscale = scales[c * 8 + j / 16] as i8;
            let weight = super_scale * subscale as f32 * q as f32;
            sink.store(produced + global_i, weight);
        }
        produced += take;
    }
    Ok(())
}
