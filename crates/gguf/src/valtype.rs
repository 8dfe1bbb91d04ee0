//! The GGUF metadata value-type registry: the 13 on-disk tags plus the two
//! synthetic stream-only tags the reader uses to bracket array callbacks.

use crate::error::{GgufError, Result};

/// A metadata value-type tag, as stored on disk (`UINT8` through `FLOAT64`)
/// plus the two synthetic variants the reader emits around array elements.
/// The synthetic variants never appear in a file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ValueType {
    UInt8,
    Int8,
    UInt16,
    Int16,
    UInt32,
    Int32,
    Float32,
    Bool,
    String,
    Array,
    UInt64,
    Int64,
    Float64,
    /// Synthetic: fires once before the first element of an array.
    ArrayStart,
    /// Synthetic: fires once after the last element of an array.
    ArrayEnd,
}

impl ValueType {
    /// Decode an on-disk type tag. Unlike the tensor-type registry, an
    /// unrecognized value-type tag is a hard parse error: the reader cannot
    /// know the value's width and therefore cannot keep the cursor in sync.
    pub fn from_tag(tag: u32) -> Result<ValueType> {
        Ok(match tag {
            0 => ValueType::UInt8,
            1 => ValueType::Int8,
            2 => ValueType::UInt16,
            3 => ValueType::Int16,
            4 => ValueType::UInt32,
            5 => ValueType::Int32,
            6 => ValueType::Float32,
            7 => ValueType::Bool,
            8 => ValueType::String,
            9 => ValueType::Array,
            10 => ValueType::UInt64,
            11 => ValueType::Int64,
            12 => ValueType::Float64,
            other => return Err(GgufError::UnsupportedValueType(other)),
        })
    }

    /// The on-disk tag for this type. Panics on the two synthetic variants,
    /// which are never written.
    pub fn tag(self) -> u32 {
        match self {
            ValueType::UInt8 => 0,
            ValueType::Int8 => 1,
            ValueType::UInt16 => 2,
            ValueType::Int16 => 3,
            ValueType::UInt32 => 4,
            ValueType::Int32 => 5,
            ValueType::Float32 => 6,
            ValueType::Bool => 7,
            ValueType::String => 8,
            ValueType::Array => 9,
            ValueType::UInt64 => 10,
            ValueType::Int64 => 11,
            ValueType::Float64 => 12,
            ValueType::ArrayStart | ValueType::ArrayEnd => {
                unreachable!("synthetic value types have no on-disk tag")
            }
        }
    }

    /// Human-readable name, or `"unknown"` for an unrecognized tag — used by
    /// callers (the `show` command) that want best-effort display rather
    /// than a hard error.
    pub fn name(self) -> &'static str {
        match self {
            ValueType::UInt8 => "uint8",
            ValueType::Int8 => "int8",
            ValueType::UInt16 => "uint16",
            ValueType::Int16 => "int16",
            ValueType::UInt32 => "uint32",
            ValueType::Int32 => "int32",
            ValueType::Float32 => "float32",
            ValueType::Bool => "bool",
            ValueType::String => "string",
            ValueType::Array => "array",
            ValueType::UInt64 => "uint64",
            ValueType::Int64 => "int64",
            ValueType::Float64 => "float64",
            ValueType::ArrayStart => "array_start",
            ValueType::ArrayEnd => "array_end",
        }
    }

    /// On-disk width of a non-array value, or `None` for `Array` (whose
    /// payload the caller must consume recursively) and for the synthetic
    /// variants.
    ///
    /// `bytes` must start at the value itself (not its type tag). For
    /// `String`, the first 8 bytes are read to recover the length prefix.
    pub fn value_len(self, bytes: &[u8]) -> Result<Option<usize>> {
        Ok(match self {
            ValueType::UInt8 | ValueType::Int8 | ValueType::Bool => Some(1),
            ValueType::UInt16 | ValueType::Int16 => Some(2),
            ValueType::UInt32 | ValueType::Int32 | ValueType::Float32 => Some(4),
            ValueType::UInt64 | ValueType::Int64 | ValueType::Float64 => Some(8),
            ValueType::String => {
                if bytes.len() < 8 {
                    return Err(GgufError::Truncated {
                        offset: 0,
                        needed: 8,
                        available: bytes.len(),
                    });
                }
                let len = u64::from_le_bytes(bytes[0..8].try_into().unwrap()) as usize;
                Some(8 + len)
            }
            ValueType::Array | ValueType::ArrayStart | ValueType::ArrayEnd => None,
        })
    }
}

/// Name lookup that never fails, for display code that must tolerate
/// corrupt or forward-incompatible type ids (returns `"unknown"` rather
/// than propagating an error).
pub fn value_name_or_unknown(tag: u32) -> &'static str {
    ValueType::from_tag(tag).map(ValueType::name).unwrap_or("unknown")
}
