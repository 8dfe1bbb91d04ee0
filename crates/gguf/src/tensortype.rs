//! The GGML tensor-type registry: id -> (name, items-per-block, bytes-per-block).
//!
//! The numbering matches the on-disk GGUF convention (F32=0 .. BF16=30),
//! cross-checked against the pack's other GGUF-reading crates. Geometry for
//! the seven decodable types comes straight from spec.md §4.5; geometry for
//! the recognized-but-undecoded types comes from the reference `ggml`
//! block-struct sizes (noted per-entry below) since they are needed for
//! `show`/`compare` byte accounting even though no decoder exists for them.

use crate::error::{GgufError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[allow(non_camel_case_types)]
pub enum TensorType {
    F32,
    F16,
    Q4_0,
    Q4_1,
    Q5_0,
    Q5_1,
    Q8_0,
    Q8_1,
    Q2_K,
    Q3_K,
    Q4_K,
    Q5_K,
    Q6_K,
    Q8_K,
    IQ2_XXS,
    IQ2_XS,
    IQ3_XXS,
    IQ1_S,
    IQ4_NL,
    IQ3_S,
    IQ2_S,
    IQ4_XS,
    I8,
    I16,
    I32,
    I64,
    F64,
    IQ1_M,
    BF16,
}

/// Static geometry for a tensor type: display name, elements packed per
/// block, and bytes occupied by one block on disk.
#[derive(Debug, Clone, Copy)]
pub struct TensorTypeInfo {
    pub name: &'static str,
    pub items_per_block: usize,
    pub bytes_per_block: usize,
}

impl TensorType {
    /// Decode a GGUF tensor-type tag. IDs 4 and 5 (the deprecated Q4_2/Q4_3
    /// slots) and anything beyond BF16 are unrecognized.
    pub fn from_tag(tag: u32) -> Result<TensorType> {
        use TensorType::*;
        Ok(match tag {
            0 => F32,
            1 => F16,
            2 => Q4_0,
            3 => Q4_1,
            6 => Q5_0,
            7 => Q5_1,
            8 => Q8_0,
            9 => Q8_1,
            10 => Q2_K,
            11 => Q3_K,
            12 => Q4_K,
            13 => Q5_K,
            14 => Q6_K,
            15 => Q8_K,
            16 => IQ2_XXS,
            17 => IQ2_XS,
            18 => IQ3_XXS,
            19 => IQ1_S,
            20 => IQ4_NL,
            21 => IQ3_S,
            22 => IQ2_S,
            23 => IQ4_XS,
            24 => I8,
            25 => I16,
            26 => I32,
            27 => I64,
            28 => F64,
            29 => IQ1_M,
            30 => BF16,
            other => return Err(GgufError::UnsupportedTensorType(other)),
        })
    }

    pub fn tag(self) -> u32 {
        use TensorType::*;
        match self {
            F32 => 0,
            F16 => 1,
            Q4_0 => 2,
            Q4_1 => 3,
            Q5_0 => 6,
            Q5_1 => 7,
            Q8_0 => 8,
            Q8_1 => 9,
            Q2_K => 10,
            Q3_K => 11,
            Q4_K => 12,
            Q5_K => 13,
            Q6_K => 14,
            Q8_K => 15,
            IQ2_XXS => 16,
            IQ2_XS => 17,
            IQ3_XXS => 18,
            IQ1_S => 19,
            IQ4_NL => 20,
            IQ3_S => 21,
            IQ2_S => 22,
            IQ4_XS => 23,
            I8 => 24,
            I16 => 25,
            I32 => 26,
            I64 => 27,
            F64 => 28,
            IQ1_M => 29,
            BF16 => 30,
        }
    }

    /// Static geometry for this type. Never fails: every `TensorType` that
    /// can be constructed has a registry row.
    pub fn info(self) -> TensorTypeInfo {
        use TensorType::*;
        let (name, items_per_block, bytes_per_block) = match self {
            F32 => ("F32", 1, 4),
            F16 => ("F16", 1, 2),
            Q4_0 => ("Q4_0", 32, 18),
            Q4_1 => ("Q4_1", 32, 20),
            Q5_0 => ("Q5_0", 32, 22),
            Q5_1 => ("Q5_1", 32, 24),
            Q8_0 => ("Q8_0", 32, 34),
            Q8_1 => ("Q8_1", 32, 40),
            Q2_K => ("Q2_K", 256, 84),
            Q3_K => ("Q3_K", 256, 110),
            Q4_K => ("Q4_K", 256, 144),
            Q5_K => ("Q5_K", 256, 176),
            Q6_K => ("Q6_K", 256, 210),
            Q8_K => ("Q8_K", 256, 292),
            IQ2_XXS => ("IQ2_XXS", 256, 66),
            IQ2_XS => ("IQ2_XS", 256, 74),
            IQ3_XXS => ("IQ3_XXS", 256, 98),
            IQ1_S => ("IQ1_S", 256, 50),
            IQ4_NL => ("IQ4_NL", 32, 18),
            IQ3_S => ("IQ3_S", 256, 110),
            IQ2_S => ("IQ2_S", 256, 82),
            IQ4_XS => ("IQ4_XS", 256, 136),
            I8 => ("I8", 1, 1),
            I16 => ("I16", 1, 2),
            I32 => ("I32", 1, 4),
            I64 => ("I64", 1, 8),
            F64 => ("F64", 1, 8),
            IQ1_M => ("IQ1_M", 256, 56),
            BF16 => ("BF16", 1, 2),
        };
        TensorTypeInfo {
            name,
            items_per_block,
            bytes_per_block,
        }
    }

    /// Whether `gguf`'s dequantizers implement a decoder for this type.
    pub fn is_decodable(self) -> bool {
        use TensorType::*;
        matches!(
            self,
            F32 | F16 | BF16 | Q8_0 | Q4_0 | Q4_1 | Q2_K | Q4_K | Q6_K
        )
    }

    /// Byte size of a tensor payload with `num_weights` elements of this
    /// type: `ceil(N / items_per_block) * bytes_per_block`.
    pub fn payload_size(self, num_weights: usize) -> usize {
        let info = self.info();
        num_weights.div_ceil(info.items_per_block) * info.bytes_per_block
    }
}

/// Name lookup that never fails, mirroring `value_name_or_unknown` for
/// display code over possibly-unrecognized tags.
pub fn tensor_name_or_unknown(tag: u32) -> &'static str {
    TensorType::from_tag(tag).map(|t| t.info().name).unwrap_or("unknown")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn roundtrip_tags() {
        for tag in [0, 1, 2, 3, 6, 7, 8, 9, 10, 11, 12, 13, 14, 15, 30] {
            let t = TensorType::from_tag(tag).unwrap();
            assert_eq!(t.tag(), tag);
        }
    }

    #[test]
    fn deprecated_and_out_of_range_are_unsupported() {
        assert!(TensorType::from_tag(4).is_err());
        assert!(TensorType::from_tag(5).is_err());
        assert!(TensorType::from_tag(31).is_err());
    }

    #[test]
    fn spec_geometry() {
        assert_eq!(TensorType::F32.info().bytes_per_block, 4);
        assert_eq!(TensorType::Q8_0.info().bytes_per_block, 34);
        assert_eq!(TensorType::Q8_0.info().items_per_block, 32);
        assert_eq!(TensorType::Q4_0.info().bytes_per_block, 18);
        assert_eq!(TensorType::Q2_K.info().bytes_per_block, 84);
        assert_eq!(TensorType::Q4_K.info().bytes_per_block, 144);
        assert_eq!(TensorType::Q6_K.info().bytes_per_block, 210);
    }

    #[test]
    fn payload_size_rounds_up_partial_blocks() {
        // 33 weights at Q4_0 (32/block) needs 2 blocks.
        assert_eq!(TensorType::Q4_0.payload_size(33), 36);
        assert_eq!(TensorType::Q4_0.payload_size(32), 18);
        assert_eq!(TensorType::F32.payload_size(4), 16);
    }

    #[test]
    fn decodability_matches_spec_list() {
        assert!(TensorType::Q8_0.is_decodable());
        assert!(TensorType::Q4_K.is_decodable());
        assert!(!TensorType::Q3_K.is_decodable());
        assert!(!TensorType::Q5_0.is_decodable());
        assert!(!TensorType::IQ2_XS.is_decodable());
    }

    #[test]
    fn unknown_name_is_safe() {
        assert_eq!(tensor_name_or_unknown(4), "unknown");
    }
}
