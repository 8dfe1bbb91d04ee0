//! BF16 decode: one `brain_to_f32` conversion per element.

use super::{block_at, DequantSink};
use crate::error::Result;
use crate::half::brain_to_f32;

pub fn decode(src: &[u8], count: usize, sink: &mut dyn DequantSink) -> Result<()> {
    for i in 0..count {
        let bytes = block_at(src, i * 2, 2)?;
        let bits = u16::from_le_bytes(bytes.try_into().unwrap());
        sink.store(i, brain_to_f32(bits));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_brain_float() {
        let bytes = 0x3f80u16.to_le_bytes();
        let mut out = [0f32; 1];
        decode(&bytes, 1, &mut out[..]).unwrap();
        assert_eq!(out[0], 1.0);
    }
}
