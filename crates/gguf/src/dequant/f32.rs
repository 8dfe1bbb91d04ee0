//! F32 is already the target representation; decoding is a byte-order
//! conversion, one element at a time through the sink.

use super::{block_at, DequantSink};
use crate::error::Result;

pub fn decode(src: &[u8], count: usize, sink: &mut dyn DequantSink) -> Result<()> {
    for i in 0..count {
        let bytes = block_at(src, i * 4, 4)?;
        let value = f32::from_le_bytes(bytes.try_into().unwrap());
        sink.store(i, value);
    }
    Ok(())
}
