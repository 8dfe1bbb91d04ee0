//! F16 decode: one `half_to_f32` conversion per element.

use super::{block_at, DequantSink};
use crate::error::Result;
use crate::half::half_to_f32;

pub fn decode(src: &[u8], count: usize, sink: &mut dyn DequantSink) -> Result<()> {
    for i in 0..count {
        let bytes = block_at(src, i * 2, 2)?;
        let bits = u16::from_le_bytes(bytes.try_into().unwrap());
        sink.store(i, half_to_f32(bits));
    }
    Ok(())
}
