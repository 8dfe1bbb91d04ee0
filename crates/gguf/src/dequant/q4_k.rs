//! Q4_K: super-blocks of 256 weights in 8 sub-blocks of 32.
//!
//! Layout (144 bytes): `f16` super-scale, `f16` super-min, 12 bytes of
//! packed 6-bit scale/min pairs (`pk`), and 128 bytes of packed 4-bit
//! quants (`q`).
//!
//! Sub-blocks are processed in pairs that share 32 bytes of `q`: pair `p`
//! (0..4) covers sub-blocks `2p` (low nibbles of `q[32p..32p+32]`) and
//! `2p+1` (high nibbles of the same bytes). For sub-block `j` (0..8):
//! `j < 4`: `d = pk[j] & 0x3f`, `m = pk[j+4] & 0x3f`.
//! `j >= 4`: `d = (pk[j+4] & 0xf) | ((pk[j-4] >> 6) << 4)`,
//!           `m = (pk[j+4] >> 4) | ((pk[j] >> 6) << 4)`.
//! `weight = (d * super_scale) * nibble - (m * super_min)`.

use super::{block_at, DequantSink};
use crate::error::Result;
use crate::half::half_to_f32;

const SUPERBLOCK_SIZE: usize = 256;
const SUPERBLOCK_BYTES: usize = 144;
const SUBBLOCK_SIZE: usize = 32;

fn scale_and_min(pk: &[u8], j: usize) -> (u8, u8) {
    if j < 4 {
        (pk[j] & 0x3f, pk[j + 4] & 0x3f)
    } else {
        let d = (pk[j + 4] & 0x0f) | ((pk[j - 4] >> 6) << 4);
        let m = (pk[j + 4] >> 4) | ((pk[j] >> 6) << 4);
        (d, m)
    }
}

pub fn decode(src: &[u8], count: usize, sink: &mut dyn DequantSink) -> Result<()> {
    let n_super = count.div_ceil(SUPERBLOCK_SIZE);
    let mut produced = 0;
    for s in 0..n_super {
        let block = block_at(src, s * SUPERBLOCK_BYTES, SUPERBLOCK_BYTES)?;
        let super_scale = half_to_f32(u16::from_le_bytes(block[0..2].try_into().unwrap()));
        let super_min = half_to_f32(u16::from_le_bytes(block[2..4].try_into().unwrap()));
        let pk = &block[4..16];
        let q = &block[16..144];

        let remaining = count - produced;
        let take = remaining.min(SUPERBLOCK_SIZE);
        for i in 0..take {
            let j = i / SUBBLOCK_SIZE;
            let k = i % SUBBLOCK_SIZE;
            let pair = j / 2;
            let high_nibble = j % 2 == 1;
            let byte = q[pair * SUBBLOCK_SIZE + k];
            let nibble = if high_nibble { byte >> 4 } else { byte & 0x0f };
            let (d, m) = scale_and_min(pk, j);
            let weight = (d as f32 * super_scale) * nibble as f32 - (m as f32 * super_min);
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
    fn first_subblock_low_nibbles() {
        let mut block = vec![0u8; SUPERBLOCK_BYTES];
        block[0..2].copy_from_slice(&f32_to_half(1.0).to_le_bytes());
        block[2..4].copy_from_slice(&f32_to_half(1.0).to_le_bytes());
        block[4] = 5; // pk[0]: d=5
        block[8] = 2; // pk[4]: m=2
        block[16] = 0x0a; // low nibble 10 for k=0

        let mut out = [0f32; 256];
        decode(&block, 256, &mut out[..]).unwrap();
        assert_eq!(out[0], (5.0 * 1.0) * 10.0 - (2.0 * 1.0));
    }
}
