use thiserror::Error;

/// Errors produced by the GGUF container codec and dequantizers.
#[derive(Error, Debug)]
pub enum GgufError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid GGUF magic: expected 'GGUF', got {0:?}")]
    BadMagic([u8; 4]),

    #[error("unsupported GGUF version: {0} (only version 3 is supported)")]
    UnsupportedVersion(u32),

    #[error("truncated GGUF file: needed {needed} bytes at offset {offset}, had {available}")]
    Truncated {
        offset: usize,
        needed: usize,
        available: usize,
    },

    #[error("writer called out of order: {0}")]
    Order(&'static str),

    #[error("unsupported value type id: {0}")]
    UnsupportedValueType(u32),

    #[error("unsupported tensor type id: {0}")]
    UnsupportedTensorType(u32),

    #[error("dequantization not implemented for tensor type {0}")]
    UnsupportedDecode(&'static str),

    #[error("requested output buffer of {0} elements is too large to allocate")]
    AllocationTooLarge(usize),

    #[error("array nesting exceeds the maximum supported depth ({0})")]
    RecursionLimit(u32),

    #[error("tensor dimensionality {0} out of range (must be 1..=4)")]
    BadDimensionality(u32),

    #[error("string is not valid UTF-8")]
    InvalidString,

    #[error("file already exists: {0}")]
    AlreadyExists(String),
}

pub type Result<T> = std::result::Result<T, GgufError>;
