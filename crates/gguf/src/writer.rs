//! Append-only GGUF writer.
//!
//! The on-disk section order is fixed (header, then every key-value entry,
//! then every tensor descriptor, then the padded tensor-data blob), so the
//! writer enforces that order rather than allowing random seeks: metadata
//! must be appended before the first tensor descriptor, and tensor
//! descriptors before the first data blob. Header counts are patched in
//! place after each append via a `MmapMut` that gets re-mapped whenever the
//! file has grown, so callers never have to seek back manually.

use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use memmap2::MmapMut;

use crate::error::{GgufError, Result};
use crate::reader::{align_up, GGUF_DEFAULT_ALIGNMENT, GGUF_MAGIC, GGUF_VERSION};
use crate::tensortype::TensorType;
use crate::valtype::ValueType;

#[derive(PartialEq, Eq, Clone, Copy)]
enum Phase {
    Metadata,
    TensorInfo,
    TensorData,
}

/// A GGUF file under construction.
pub struct GgufWriter {
    file: File,
    path: PathBuf,
    phase: Phase,
    n_kv: u64,
    n_tensors: u64,
    alignment: u32,
}

impl GgufWriter {
    /// Create a new GGUF file at `path` with an empty header. Fails with
    /// `AlreadyExists` if the file is present and `overwrite` is false.
    pub fn create(path: impl AsRef<Path>, overwrite: bool) -> Result<GgufWriter> {
        let path = path.as_ref().to_path_buf();
        if !overwrite && path.exists() {
            return Err(GgufError::AlreadyExists(path.display().to_string()));
        }
        let mut file = OpenOptions::new()
            .create(true)
            .truncate(true)
            .read(true)
            .write(true)
            .open(&path)?;

        let mut header = Vec::with_capacity(24);
        header.extend_from_slice(&GGUF_MAGIC);
        header.extend_from_slice(&GGUF_VERSION.to_le_bytes());
        header.extend_from_slice(&0u64.to_le_bytes()); // tensor_count
        header.extend_from_slice(&0u64.to_le_bytes()); // metadata_kv_count
        file.write_all(&header)?;
        file.flush()?;

        Ok(GgufWriter {
            file,
            path,
            phase: Phase::Metadata,
            n_kv: 0,
            n_tensors: 0,
            alignment: GGUF_DEFAULT_ALIGNMENT,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn alignment(&self) -> u32 {
        self.alignment
    }

    fn patch_header(&mut self) -> Result<()> {
        let mut mmap = unsafe { MmapMut::map_mut(&self.file)? };
        mmap[8..16].copy_from_slice(&self.n_tensors.to_le_bytes());
        mmap[16..24].copy_from_slice(&self.n_kv.to_le_bytes());
        mmap.flush()?;
        Ok(())
    }

    /// Append one key-value entry. `value_bytes` must already be in the
    /// entry's on-disk encoding (a length-prefixed UTF-8 string for
    /// `ValueType::String`, a raw little-endian scalar otherwise, or a fully
    /// encoded array body including its element-type tag and count).
    ///
    /// Errors with `Order` if any tensor descriptor has already been
    /// appended — metadata must come first.
    pub fn append_kv(&mut self, key: &[u8], value_type: ValueType, value_bytes: &[u8]) -> Result<()> {
        if self.phase != Phase::Metadata {
            return Err(GgufError::Order("append_kv called after tensor info or tensor data"));
        }

        if value_type == ValueType::UInt32
            && (key == b"general.alignment" || key == b"general.alignmnet")
            && value_bytes.len() == 4
        {
            let v = u32::from_le_bytes(value_bytes.try_into().unwrap());
            if v > 0 {
                self.alignment = v;
            }
        }

        self.file.write_all(&(key.len() as u64).to_le_bytes())?;
        self.file.write_all(key)?;
        self.file.write_all(&value_type.tag().to_le_bytes())?;
        self.file.write_all(value_bytes)?;

        self.n_kv += 1;
        self.patch_header()
    }

    /// Append one array-valued key-value entry in one call, encoding the
    /// element-type tag, element count, and each element's bytes.
    pub fn append_kv_array(&mut self, key: &[u8], element_type: ValueType, elements: &[&[u8]]) -> Result<()> {
        let mut body = Vec::new();
        body.extend_from_slice(&element_type.tag().to_le_bytes());
        body.extend_from_slice(&(elements.len() as u64).to_le_bytes());
        for e in elements {
            body.extend_from_slice(e);
        }
        self.append_kv(key, ValueType::Array, &body)
    }

    /// Append one tensor descriptor. `dims` must have 1 to 4 entries.
    /// `relative_offset` is measured from the (not-yet-known) start of the
    /// tensor-data section and must itself already be aligned by the
    /// caller if successive tensors are to pack without gaps.
    pub fn append_tensor_info(
        &mut self,
        name: &[u8],
        dims: &[u64],
        tensor_type: TensorType,
        relative_offset: u64,
    ) -> Result<()> {
        if self.phase == Phase::TensorData {
            return Err(GgufError::Order("append_tensor_info called after tensor data"));
        }
        if !(1..=4).contains(&dims.len()) {
            return Err(GgufError::BadDimensionality(dims.len() as u32));
        }
        self.phase = Phase::TensorInfo;

        self.file.write_all(&(name.len() as u64).to_le_bytes())?;
        self.file.write_all(name)?;
        self.file.write_all(&(dims.len() as u32).to_le_bytes())?;
        for d in dims {
            self.file.write_all(&d.to_le_bytes())?;
        }
        self.file.write_all(&tensor_type.tag().to_le_bytes())?;
        self.file.write_all(&relative_offset.to_le_bytes())?;

        self.n_tensors += 1;
        self.patch_header()
    }

    /// Pad the file up to the next alignment boundary, then append
    /// `bytes` as one tensor's payload. The first call pads from the end of
    /// the tensor-info section to the data-section base; later calls pad
    /// from the end of the previous tensor's payload.
    pub fn append_tensor_data(&mut self, bytes: &[u8]) -> Result<()> {
        if self.phase == Phase::Metadata {
            return Err(GgufError::Order("append_tensor_data called before any tensor info"));
        }
        self.phase = Phase::TensorData;

        let len = self.file.metadata()?.len();
        let padded = align_up(len, self.alignment as u64);
        if padded > len {
            let pad = vec![0u8; (padded - len) as usize];
            self.file.write_all(&pad)?;
        }
        self.file.write_all(bytes)?;
        self.file.flush()?;
        Ok(())
    }

    /// Close the writer and reopen the finished file as a reader.
    pub fn seal(mut self) -> Result<crate::reader::GgufReader> {
        self.file.flush()?;
        crate::reader::GgufReader::open(&self.path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reader::GgufReader;

    #[test]
    fn create_refuses_existing_without_overwrite() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a.gguf");
        GgufWriter::create(&path, false).unwrap();
        let err = GgufWriter::create(&path, false).unwrap_err();
        assert!(matches!(err, GgufError::AlreadyExists(_)));
        GgufWriter::create(&path, true).unwrap();
    }

    #[test]
    fn append_kv_after_tensor_info_is_ordering_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("b.gguf");
        let mut w = GgufWriter::create(&path, false).unwrap();
        w.append_tensor_info(b"weight", &[4], TensorType::F32, 0).unwrap();
        let err = w.append_kv(b"late", ValueType::Bool, &[1]).unwrap_err();
        assert!(matches!(err, GgufError::Order(_)));
    }

    #[test]
    fn roundtrip_minimal_tensor() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("c.gguf");
        let mut w = GgufWriter::create(&path, false).unwrap();
        w.append_kv(b"general.name", ValueType::String, &{
            let mut b = 4u64.to_le_bytes().to_vec();
            b.extend_from_slice(b"test");
            b
        })
        .unwrap();
        w.append_tensor_info(b"weight", &[4], TensorType::F32, 0).unwrap();
        let data: [f32; 4] = [1.0, 2.0, 3.0, 4.0];
        let bytes: Vec<u8> = data.iter().flat_map(|f| f.to_le_bytes()).collect();
        w.append_tensor_data(&bytes).unwrap();
        let reader = w.seal().unwrap();

        assert_eq!(reader.header().metadata_kv_count, 1);
        assert_eq!(reader.header().tensor_count, 1);

        let kv = reader.next_key().unwrap().unwrap();
        assert_eq!(kv.name, b"general.name");
        reader.consume_value(kv.value_type, &mut |_| {}).unwrap();

        let desc = reader.next_tensor().unwrap().unwrap();
        assert_eq!(desc.name, b"weight");
        assert_eq!(desc.num_weights, 4);
        let payload = reader.tensor_bytes(&desc).unwrap();
        assert_eq!(payload, &bytes[..]);
    }

    #[test]
    fn alignment_override_pads_tensor_data() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("d.gguf");
        let mut w = GgufWriter::create(&path, false).unwrap();
        w.append_kv(b"general.alignment", ValueType::UInt32, &64u32.to_le_bytes())
            .unwrap();
        assert_eq!(w.alignment(), 64);
        w.append_tensor_info(b"t", &[1], TensorType::F32, 0).unwrap();
        w.append_tensor_data(&1.0f32.to_le_bytes()).unwrap();
        let reader = w.seal().unwrap();
        let _ = reader.next_key().unwrap();
        assert_eq!(reader.alignment(), 64);
    }

    #[test]
    fn sealed_reader_opens_cleanly() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("e.gguf");
        let w = GgufWriter::create(&path, false).unwrap();
        let reader = w.seal().unwrap();
        assert!(GgufReader::open(path).is_ok());
        assert_eq!(reader.header().tensor_count, 0);
    }
}
