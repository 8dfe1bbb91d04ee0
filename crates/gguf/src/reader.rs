//! The memory-mapped GGUF reader: header validation, streaming key-value
//! iteration, and tensor-descriptor iteration.
//!
//! The context borrows directly into a `memmap2::Mmap`, so every name,
//! string value, and tensor payload handed back to the caller is a zero-copy
//! slice into the file. Cursor and counters live in `Cell`s: the mapping
//! itself is never mutated by the reader, so interior mutability lets
//! `next_key`/`next_tensor` take `&self` and return borrows tied to the
//! reader's own lifetime instead of requiring a self-referential struct.

use std::cell::Cell;
use std::fs::File;
use std::path::Path;

use memmap2::Mmap;

use crate::error::{GgufError, Result};
use crate::tensortype::TensorType;
use crate::valtype::ValueType;

/// Magic bytes at the start of every GGUF file: ASCII "GGUF".
pub const GGUF_MAGIC: [u8; 4] = *b"GGUF";
/// The only GGUF version this codec reads or writes.
pub const GGUF_VERSION: u32 = 3;
/// Tensor payloads are padded to a multiple of this many bytes unless
/// overridden by a `general.alignment` metadata entry.
pub const GGUF_DEFAULT_ALIGNMENT: u32 = 32;
/// Bound on array-of-arrays nesting depth, to protect against stack
/// exhaustion on malicious input (spec.md §9 Open Questions).
const MAX_ARRAY_DEPTH: u32 = 64;

const HEADER_SIZE: usize = 24;

/// Parsed fixed-size GGUF header.
#[derive(Debug, Clone, Copy)]
pub struct Header {
    pub version: u32,
    pub tensor_count: u64,
    pub metadata_kv_count: u64,
}

/// One borrowed key-value entry, positioned with its value unconsumed.
///
/// After receiving this from `next_key`, the caller must call
/// `GgufReader::consume_value` with `value_type` before advancing further —
/// the cursor is parked at the start of the value's bytes.
pub struct KvEntry<'a> {
    pub name: &'a [u8],
    pub value_type: ValueType,
}

impl<'a> KvEntry<'a> {
    /// The key as UTF-8, if it happens to be valid (GGUF keys are
    /// conventionally but not necessarily UTF-8).
    pub fn name_str(&self) -> Result<&'a str> {
        std::str::from_utf8(self.name).map_err(|_| GgufError::InvalidString)
    }
}

/// A single decoded primitive, borrowing string payloads from the mapped
/// file.
#[derive(Debug, Clone, Copy)]
pub enum PrimitiveValue<'a> {
    U8(u8),
    I8(i8),
    U16(u16),
    I16(i16),
    U32(u32),
    I32(i32),
    F32(f32),
    Bool(bool),
    Str(&'a [u8]),
    U64(u64),
    I64(i64),
    F64(f64),
}

/// One step of value consumption, in file order: a primitive, or a bracket
/// around an array's elements. `in_array` is the element's 1-based position
/// within its immediately enclosing array, or 0 for a top-level value and
/// for the `ArrayStart`/`ArrayEnd` brackets themselves.
pub enum ValueEvent<'a> {
    Primitive { in_array: u64, value: PrimitiveValue<'a> },
    ArrayStart { in_array: u64, element_type: ValueType, len: u64 },
    ArrayEnd { in_array: u64 },
}

/// A tensor descriptor, with its relative offset already translated to an
/// absolute offset into the mapped file.
pub struct TensorDescriptor<'a> {
    pub name: &'a [u8],
    pub n_dims: u32,
    /// Dimension sizes; indices `n_dims..4` are logically 1 (unused dims).
    pub dims: [u64; 4],
    pub tensor_type: TensorType,
    pub relative_offset: u64,
    pub absolute_offset: u64,
    pub num_weights: usize,
    pub payload_size: usize,
}

impl<'a> TensorDescriptor<'a> {
    pub fn name_str(&self) -> Result<&'a str> {
        std::str::from_utf8(self.name).map_err(|_| GgufError::InvalidString)
    }
}

/// A memory-mapped GGUF file, positioned for streaming reads.
pub struct GgufReader {
    mmap: Mmap,
    header: Header,
    cursor: Cell<usize>,
    left_kv: Cell<u64>,
    left_tensors: Cell<u64>,
    alignment: Cell<u32>,
    data_offset: Cell<Option<u64>>,
}

impl GgufReader {
    /// Map `path` and validate the header. The cursor is left just past the
    /// header, ready for `next_key`.
    pub fn open(path: impl AsRef<Path>) -> Result<GgufReader> {
        let file = File::open(path)?;
        let len = file.metadata()?.len() as usize;
        if len < HEADER_SIZE {
            return Err(GgufError::Truncated {
                offset: 0,
                needed: HEADER_SIZE,
                available: len,
            });
        }
        let mmap = unsafe { Mmap::map(&file)? };

        let mut magic = [0u8; 4];
        magic.copy_from_slice(&mmap[0..4]);
        if magic != GGUF_MAGIC {
            return Err(GgufError::BadMagic(magic));
        }
        let version = u32::from_le_bytes(mmap[4..8].try_into().unwrap());
        if version != GGUF_VERSION {
            return Err(GgufError::UnsupportedVersion(version));
        }
        let tensor_count = u64::from_le_bytes(mmap[8..16].try_into().unwrap());
        let metadata_kv_count = u64::from_le_bytes(mmap[16..24].try_into().unwrap());

        let header = Header {
            version,
            tensor_count,
            metadata_kv_count,
        };

        Ok(GgufReader {
            mmap,
            header,
            cursor: Cell::new(HEADER_SIZE),
            left_kv: Cell::new(metadata_kv_count),
            left_tensors: Cell::new(tensor_count),
            alignment: Cell::new(GGUF_DEFAULT_ALIGNMENT),
            data_offset: Cell::new(None),
        })
    }

    pub fn header(&self) -> Header {
        self.header
    }

    pub fn alignment(&self) -> u32 {
        self.alignment.get()
    }

    /// Absolute offset where the tensor data section begins, if it has been
    /// computed yet (lazily, on the first `next_tensor` call).
    pub fn data_offset(&self) -> Option<u64> {
        self.data_offset.get()
    }

    pub fn remaining_kv(&self) -> u64 {
        self.left_kv.get()
    }

    pub fn remaining_tensors(&self) -> u64 {
        self.left_tensors.get()
    }

    /// Reset the cursor to just past the header and re-seed the counters
    /// from the (possibly grown) header bytes. Used after a writer has
    /// appended to the file and the mapping has been refreshed, or to
    /// restart iteration from the top.
    pub fn rewind(&self) {
        let tensor_count = u64::from_le_bytes(self.mmap[8..16].try_into().unwrap());
        let metadata_kv_count = u64::from_le_bytes(self.mmap[16..24].try_into().unwrap());
        self.cursor.set(HEADER_SIZE);
        self.left_kv.set(metadata_kv_count);
        self.left_tensors.set(tensor_count);
        self.alignment.set(GGUF_DEFAULT_ALIGNMENT);
        self.data_offset.set(None);
    }

    fn take(&self, n: usize) -> Result<&[u8]> {
        let offset = self.cursor.get();
        let slice = take_at(&self.mmap, offset, n)?;
        self.cursor.set(offset + n);
        Ok(slice)
    }

    fn read_u32(&self) -> Result<u32> {
        Ok(u32::from_le_bytes(self.take(4)?.try_into().unwrap()))
    }

    fn read_u64(&self) -> Result<u64> {
        Ok(u64::from_le_bytes(self.take(8)?.try_into().unwrap()))
    }

    fn read_string(&self) -> Result<&[u8]> {
        let len = self.read_u64()? as usize;
        self.take(len)
    }

    fn peek_u32(&self, offset: usize) -> Result<u32> {
        Ok(u32::from_le_bytes(take_at(&self.mmap, offset, 4)?.try_into().unwrap()))
    }

    /// Consume one key-value entry's key header (name + type tag), leaving
    /// the cursor parked at the start of the value. Returns `None` once all
    /// metadata entries have been consumed.
    pub fn next_key(&self) -> Result<Option<KvEntry<'_>>> {
        if self.left_kv.get() == 0 {
            return Ok(None);
        }
        let name = self.read_string()?;
        let tag = self.read_u32()?;
        let value_type = ValueType::from_tag(tag)?;
        self.left_kv.set(self.left_kv.get() - 1);

        if value_type == ValueType::UInt32
            && (name == b"general.alignment" || name == b"general.alignmnet")
            && self.data_offset.get().is_none()
        {
            if let Ok(v) = self.peek_u32(self.cursor.get()) {
                if v > 0 {
                    self.alignment.set(v);
                }
            }
        }

        Ok(Some(KvEntry { name, value_type }))
    }

    fn read_primitive(&self, vtype: ValueType) -> Result<PrimitiveValue<'_>> {
        Ok(match vtype {
            ValueType::UInt8 => PrimitiveValue::U8(self.take(1)?[0]),
            ValueType::Int8 => PrimitiveValue::I8(self.take(1)?[0] as i8),
            ValueType::UInt16 => PrimitiveValue::U16(u16::from_le_bytes(self.take(2)?.try_into().unwrap())),
            ValueType::Int16 => PrimitiveValue::I16(i16::from_le_bytes(self.take(2)?.try_into().unwrap())),
            ValueType::UInt32 => PrimitiveValue::U32(self.read_u32()?),
            ValueType::Int32 => PrimitiveValue::I32(i32::from_le_bytes(self.take(4)?.try_into().unwrap())),
            ValueType::Float32 => PrimitiveValue::F32(f32::from_le_bytes(self.take(4)?.try_into().unwrap())),
            ValueType::Bool => PrimitiveValue::Bool(self.take(1)?[0] != 0),
            ValueType::String => PrimitiveValue::Str(self.read_string()?),
            ValueType::UInt64 => PrimitiveValue::U64(self.read_u64()?),
            ValueType::Int64 => PrimitiveValue::I64(i64::from_le_bytes(self.take(8)?.try_into().unwrap())),
            ValueType::Float64 => PrimitiveValue::F64(f64::from_le_bytes(self.take(8)?.try_into().unwrap())),
            ValueType::Array | ValueType::ArrayStart | ValueType::ArrayEnd => {
                unreachable!("arrays are handled by consume_value directly")
            }
        })
    }

    /// Advance the cursor past one value of type `vtype`, invoking `visit`
    /// for every primitive and array bracket encountered, in file order.
    /// Pass `&mut |_| {}` to consume silently.
    pub fn consume_value(&self, vtype: ValueType, visit: &mut dyn FnMut(ValueEvent)) -> Result<()> {
        self.consume_value_at_depth(vtype, visit, 0, 0)
    }

    fn consume_value_at_depth(
        &self,
        vtype: ValueType,
        visit: &mut dyn FnMut(ValueEvent),
        in_array: u64,
        depth: u32,
    ) -> Result<()> {
        if vtype == ValueType::Array {
            if depth >= MAX_ARRAY_DEPTH {
                return Err(GgufError::RecursionLimit(MAX_ARRAY_DEPTH));
            }
            let elem_tag = self.read_u32()?;
            let element_type = ValueType::from_tag(elem_tag)?;
            let len = self.read_u64()?;
            visit(ValueEvent::ArrayStart { in_array, element_type, len });
            for i in 1..=len {
                self.consume_value_at_depth(element_type, visit, i, depth + 1)?;
            }
            visit(ValueEvent::ArrayEnd { in_array });
            return Ok(());
        }
        let value = self.read_primitive(vtype)?;
        visit(ValueEvent::Primitive { in_array, value });
        Ok(())
    }

    /// Consume every remaining key-value entry without materializing
    /// anything — `next_key` + `consume_value(None)` in a loop.
    pub fn skip_kv(&self) -> Result<()> {
        while let Some(entry) = self.next_key()? {
            self.consume_value(entry.value_type, &mut |_| {})?;
        }
        Ok(())
    }

    /// Scan forward over all tensor descriptors (without moving the real
    /// cursor) to find the end of the tensor-info section, then round up to
    /// the current alignment. This is the one-shot computation that
    /// produces the absolute data-section base.
    fn compute_data_offset(&self) -> Result<u64> {
        let mut offset = self.cursor.get();
        for _ in 0..self.left_tensors.get() {
            let name_len = u64::from_le_bytes(take_at(&self.mmap, offset, 8)?.try_into().unwrap()) as usize;
            offset += 8 + name_len;
            let n_dims = u32::from_le_bytes(take_at(&self.mmap, offset, 4)?.try_into().unwrap());
            offset += 4;
            offset += 8 * n_dims as usize;
            offset += 4; // type tag
            let _ = take_at(&self.mmap, offset, 8)?; // relative offset, bounds-checked
            offset += 8;
        }
        let alignment = self.alignment.get() as u64;
        let base = align_up(offset as u64, alignment);
        Ok(base)
    }

    /// Consume one tensor descriptor. Precondition: all key-value entries
    /// have been consumed (`remaining_kv() == 0`). Returns `None` once
    /// tensors are exhausted, key-values remain, or the descriptor names an
    /// out-of-range tensor-type tag.
    pub fn next_tensor(&self) -> Result<Option<TensorDescriptor<'_>>> {
        if self.left_kv.get() != 0 || self.left_tensors.get() == 0 {
            return Ok(None);
        }
        if self.data_offset.get().is_none() {
            let base = self.compute_data_offset()?;
            self.data_offset.set(Some(base));
        }

        let name = self.read_string()?;
        let n_dims = self.read_u32()?;
        if !(1..=4).contains(&n_dims) {
            return Err(GgufError::BadDimensionality(n_dims));
        }
        let mut dims = [1u64; 4];
        for slot in dims.iter_mut().take(n_dims as usize) {
            *slot = self.read_u64()?;
        }
        let type_tag = self.read_u32()?;
        let tensor_type = match TensorType::from_tag(type_tag) {
            Ok(t) => t,
            Err(_) => {
                // Cursor is desynced mid-descriptor (past the type tag, before
                // the relative offset). Poison the context so every later
                // call deterministically returns `None` instead of
                // reinterpreting the unread bytes as a fresh descriptor.
                self.left_tensors.set(0);
                return Ok(None);
            }
        };
        let relative_offset = self.read_u64()?;
        let left = self.left_tensors.get() - 1;
        self.left_tensors.set(left);
        if left == 0 {
            self.cursor.set(self.data_offset.get().unwrap());
        }

        let num_weights = dims.iter().product::<u64>() as usize;
        let payload_size = tensor_type.payload_size(num_weights);
        let absolute_offset = self.data_offset.get().unwrap() + relative_offset;

        Ok(Some(TensorDescriptor {
            name,
            n_dims,
            dims,
            tensor_type,
            relative_offset,
            absolute_offset,
            num_weights,
            payload_size,
        }))
    }

    /// Raw payload bytes for a tensor descriptor previously returned by
    /// `next_tensor`.
    pub fn tensor_bytes(&self, desc: &TensorDescriptor<'_>) -> Result<&[u8]> {
        take_at(&self.mmap, desc.absolute_offset as usize, desc.payload_size)
    }
}

fn take_at(mmap: &[u8], offset: usize, n: usize) -> Result<&[u8]> {
    let end = offset
        .checked_add(n)
        .ok_or(GgufError::Truncated { offset, needed: n, available: 0 })?;
    if end > mmap.len() {
        return Err(GgufError::Truncated {
            offset,
            needed: n,
            available: mmap.len().saturating_sub(offset),
        });
    }
    Ok(&mmap[offset..end])
}

/// Round `value` up to the next multiple of `align` (`align` must be > 0).
pub fn align_up(value: u64, align: u64) -> u64 {
    if align == 0 {
        return value;
    }
    value.div_ceil(align) * align
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn align_up_rounds_correctly() {
        assert_eq!(align_up(0, 32), 0);
        assert_eq!(align_up(1, 32), 32);
        assert_eq!(align_up(32, 32), 32);
        assert_eq!(align_up(33, 32), 64);
    }

    #[test]
    fn open_rejects_short_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("short.gguf");
        std::fs::write(&path, b"GGUF").unwrap();
        let err = GgufReader::open(&path).unwrap_err();
        assert!(matches!(err, GgufError::Truncated { .. }));
    }

    #[test]
    fn open_rejects_bad_magic() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.gguf");
        std::fs::write(&path, [0u8; 24]).unwrap();
        let err = GgufReader::open(&path).unwrap_err();
        assert!(matches!(err, GgufError::BadMagic(_)));
    }

    #[test]
    fn open_rejects_unsupported_version() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("v2.gguf");
        let mut bytes = Vec::new();
        bytes.extend_from_slice(&GGUF_MAGIC);
        bytes.extend_from_slice(&2u32.to_le_bytes());
        bytes.extend_from_slice(&0u64.to_le_bytes());
        bytes.extend_from_slice(&0u64.to_le_bytes());
        std::fs::write(&path, bytes).unwrap();
        let err = GgufReader::open(&path).unwrap_err();
        assert!(matches!(err, GgufError::UnsupportedVersion(2)));
    }

    #[test]
    fn cursor_reaches_data_offset_after_full_iteration() {
        use crate::tensortype::TensorType;
        use crate::writer::GgufWriter;

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("aligned_end.gguf");
        let mut w = GgufWriter::create(&path, false).unwrap();
        // An odd-length name keeps the tensor-info section off a 32-byte
        // boundary, so this only passes if next_tensor actually snaps the
        // cursor forward rather than happening to land there already.
        w.append_tensor_info(b"w", &[1], TensorType::F32, 0).unwrap();
        w.append_tensor_data(&1.0f32.to_le_bytes()).unwrap();
        let reader = w.seal().unwrap();

        let desc = reader.next_tensor().unwrap().unwrap();
        assert_eq!(reader.remaining_tensors(), 0);
        assert_eq!(Some(reader.cursor.get() as u64), reader.data_offset());
        assert_eq!(desc.absolute_offset, reader.data_offset().unwrap());
    }

    #[test]
    fn bad_tensor_type_tag_poisons_the_context() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad_type.gguf");
        let mut bytes = Vec::new();
        bytes.extend_from_slice(&GGUF_MAGIC);
        bytes.extend_from_slice(&GGUF_VERSION.to_le_bytes());
        bytes.extend_from_slice(&1u64.to_le_bytes()); // tensor_count
        bytes.extend_from_slice(&0u64.to_le_bytes()); // metadata_kv_count
        // One tensor descriptor with an out-of-range type tag.
        let name = b"w";
        bytes.extend_from_slice(&(name.len() as u64).to_le_bytes());
        bytes.extend_from_slice(name);
        bytes.extend_from_slice(&1u32.to_le_bytes()); // n_dims
        bytes.extend_from_slice(&1u64.to_le_bytes()); // dims[0]
        bytes.extend_from_slice(&99u32.to_le_bytes()); // invalid type tag
        bytes.extend_from_slice(&0u64.to_le_bytes()); // relative_offset
        std::fs::write(&path, bytes).unwrap();

        let reader = GgufReader::open(&path).unwrap();
        assert!(reader.next_tensor().unwrap().is_none());
        assert_eq!(reader.remaining_tensors(), 0);
        // A second call must not reinterpret the unread `relative_offset`
        // bytes as a fresh descriptor.
        assert!(reader.next_tensor().unwrap().is_none());
    }

    #[test]
    fn minimal_file_has_no_kv_or_tensors() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("minimal.gguf");
        let mut bytes = Vec::new();
        bytes.extend_from_slice(&GGUF_MAGIC);
        bytes.extend_from_slice(&GGUF_VERSION.to_le_bytes());
        bytes.extend_from_slice(&0u64.to_le_bytes());
        bytes.extend_from_slice(&0u64.to_le_bytes());
        std::fs::write(&path, bytes).unwrap();

        let reader = GgufReader::open(&path).unwrap();
        assert_eq!(reader.header().version, 3);
        assert!(reader.next_key().unwrap().is_none());
        assert!(reader.next_tensor().unwrap().is_none());
    }
}
