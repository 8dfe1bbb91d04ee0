//! An owned, indexable view over a file's metadata — built by draining a
//! [`GgufReader`] once, for callers (the `show`/`compare` commands) that
//! want random access by key rather than a single forward pass.

use std::collections::HashMap;

use crate::error::Result;
use crate::reader::{GgufReader, PrimitiveValue, ValueEvent};
use crate::valtype::ValueType;

/// One metadata value, fully materialized.
#[derive(Debug, Clone)]
pub enum MetadataValue {
    U8(u8),
    I8(i8),
    U16(u16),
    I16(i16),
    U32(u32),
    I32(i32),
    F32(f32),
    Bool(bool),
    String(String),
    U64(u64),
    I64(i64),
    F64(f64),
    Array(Vec<MetadataValue>),
}

impl MetadataValue {
    pub fn as_u64(&self) -> Option<u64> {
        match *self {
            MetadataValue::U8(v) => Some(v as u64),
            MetadataValue::U16(v) => Some(v as u64),
            MetadataValue::U32(v) => Some(v as u64),
            MetadataValue::U64(v) => Some(v),
            MetadataValue::I8(v) if v >= 0 => Some(v as u64),
            MetadataValue::I16(v) if v >= 0 => Some(v as u64),
            MetadataValue::I32(v) if v >= 0 => Some(v as u64),
            MetadataValue::I64(v) if v >= 0 => Some(v as u64),
            _ => None,
        }
    }

    pub fn as_f32(&self) -> Option<f32> {
        match *self {
            MetadataValue::F32(v) => Some(v),
            MetadataValue::F64(v) => Some(v as f32),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            MetadataValue::String(s) => Some(s.as_str()),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&[MetadataValue]> {
        match self {
            MetadataValue::Array(v) => Some(v.as_slice()),
            _ => None,
        }
    }
}

fn primitive_to_owned(value: PrimitiveValue<'_>) -> MetadataValue {
    match value {
        PrimitiveValue::U8(v) => MetadataValue::U8(v),
        PrimitiveValue::I8(v) => MetadataValue::I8(v),
        PrimitiveValue::U16(v) => MetadataValue::U16(v),
        PrimitiveValue::I16(v) => MetadataValue::I16(v),
        PrimitiveValue::U32(v) => MetadataValue::U32(v),
        PrimitiveValue::I32(v) => MetadataValue::I32(v),
        PrimitiveValue::F32(v) => MetadataValue::F32(v),
        PrimitiveValue::Bool(v) => MetadataValue::Bool(v),
        PrimitiveValue::Str(v) => MetadataValue::String(String::from_utf8_lossy(v).into_owned()),
        PrimitiveValue::U64(v) => MetadataValue::U64(v),
        PrimitiveValue::I64(v) => MetadataValue::I64(v),
        PrimitiveValue::F64(v) => MetadataValue::F64(v),
    }
}

/// A flat map from key name to fully materialized value, built by consuming
/// every entry off a reader positioned at the start of its metadata section.
pub struct GgufMetadata {
    entries: HashMap<String, MetadataValue>,
}

impl GgufMetadata {
    /// Drains every remaining key-value entry from `reader`. The reader
    /// must not have begun tensor-descriptor iteration.
    pub fn read_all(reader: &GgufReader) -> Result<GgufMetadata> {
        let mut entries = HashMap::new();
        while let Some(kv) = reader.next_key()? {
            let name = kv.name_str()?.to_owned();
            let value_type = kv.value_type;
            let value = read_one_value(reader, value_type)?;
            entries.insert(name, value);
        }
        Ok(GgufMetadata { entries })
    }

    pub fn get(&self, key: &str) -> Option<&MetadataValue> {
        self.entries.get(key)
    }

    pub fn get_string(&self, key: &str) -> Option<&str> {
        self.get(key).and_then(MetadataValue::as_str)
    }

    pub fn get_u32(&self, key: &str) -> Option<u32> {
        self.get(key).and_then(MetadataValue::as_u64).and_then(|v| u32::try_from(v).ok())
    }

    pub fn get_u64(&self, key: &str) -> Option<u64> {
        self.get(key).and_then(MetadataValue::as_u64)
    }

    pub fn get_f32(&self, key: &str) -> Option<f32> {
        self.get(key).and_then(MetadataValue::as_f32)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &MetadataValue)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Build one owned `MetadataValue` tree by driving `consume_value` and
/// stacking array frames as `ArrayStart`/`ArrayEnd` brackets arrive.
fn read_one_value(reader: &GgufReader, value_type: ValueType) -> Result<MetadataValue> {
    let mut stack: Vec<Vec<MetadataValue>> = Vec::new();
    let mut root: Option<MetadataValue> = None;

    reader.consume_value(value_type, &mut |event| match event {
        ValueEvent::ArrayStart { .. } => stack.push(Vec::new()),
        ValueEvent::ArrayEnd { .. } => {
            let finished = MetadataValue::Array(stack.pop().expect("matching ArrayStart"));
            match stack.last_mut() {
                Some(parent) => parent.push(finished),
                None => root = Some(finished),
            }
        }
        ValueEvent::Primitive { value, .. } => {
            let owned = primitive_to_owned(value);
            match stack.last_mut() {
                Some(parent) => parent.push(owned),
                None => root = Some(owned),
            }
        }
    })?;

    Ok(root.expect("consume_value always produces exactly one top-level value"))
}
