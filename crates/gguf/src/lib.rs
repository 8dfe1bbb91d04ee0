//! GGUF container codec: header/metadata/tensor-descriptor parsing, an
//! append-only writer, and dequantizers for the common block-quantization
//! schemes.

pub mod dequant;
pub mod error;
pub mod facade;
pub mod half;
pub mod metadata;
pub mod reader;
pub mod tensortype;
pub mod valtype;
pub mod writer;

pub use error::{GgufError, Result};
pub use facade::{tensor_to_bf16, tensor_to_f16, tensor_to_float};
pub use metadata::{GgufMetadata, MetadataValue};
pub use reader::{
    align_up, GgufReader, Header, KvEntry, PrimitiveValue, TensorDescriptor, ValueEvent,
    GGUF_DEFAULT_ALIGNMENT, GGUF_MAGIC, GGUF_VERSION,
};
pub use tensortype::{tensor_name_or_unknown, TensorType, TensorTypeInfo};
pub use valtype::{value_name_or_unknown, ValueType};
pub use writer::GgufWriter;
