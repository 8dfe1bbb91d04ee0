//! End-to-end round trips through the writer and reader, covering the
//! behaviors that only show up once a real file exists on disk: ordering
//! enforcement, alignment padding, multi-tensor offset translation, and
//! array-valued metadata.

use approx::assert_relative_eq;
use gguf::{GgufError, GgufWriter, TensorType, ValueType};

fn f32_le(values: &[f32]) -> Vec<u8> {
    values.iter().flat_map(|v| v.to_le_bytes()).collect()
}

#[test]
fn header_only_file_round_trips() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("empty.gguf");
    let w = GgufWriter::create(&path, false).unwrap();
    let reader = w.seal().unwrap();
    assert_eq!(reader.header().version, gguf::GGUF_VERSION);
    assert_eq!(reader.header().tensor_count, 0);
    assert_eq!(reader.header().metadata_kv_count, 0);
    assert!(reader.next_key().unwrap().is_none());
    assert!(reader.next_tensor().unwrap().is_none());
}

#[test]
fn single_f32_tensor_round_trips() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("single.gguf");
    let mut w = GgufWriter::create(&path, false).unwrap();
    w.append_tensor_info(b"weight", &[2, 2], TensorType::F32, 0).unwrap();
    let payload = f32_le(&[1.0, 2.0, 3.0, 4.0]);
    w.append_tensor_data(&payload).unwrap();
    let reader = w.seal().unwrap();

    let desc = reader.next_tensor().unwrap().unwrap();
    assert_eq!(desc.name, b"weight");
    assert_eq!(desc.dims, [2, 2, 1, 1]);
    assert_eq!(desc.num_weights, 4);
    let bytes = reader.tensor_bytes(&desc).unwrap();
    let values = gguf::tensor_to_float(desc.tensor_type, bytes, desc.num_weights).unwrap();
    assert_eq!(values, vec![1.0, 2.0, 3.0, 4.0]);
}

#[test]
fn two_tensors_land_at_distinct_offsets() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("two.gguf");
    let mut w = GgufWriter::create(&path, false).unwrap();
    w.append_tensor_info(b"a", &[4], TensorType::F32, 0).unwrap();
    w.append_tensor_info(b"b", &[4], TensorType::F32, 16).unwrap();
    w.append_tensor_data(&f32_le(&[1.0, 2.0, 3.0, 4.0])).unwrap();
    w.append_tensor_data(&f32_le(&[5.0, 6.0, 7.0, 8.0])).unwrap();
    let reader = w.seal().unwrap();

    let a = reader.next_tensor().unwrap().unwrap();
    let b = reader.next_tensor().unwrap().unwrap();
    assert_eq!(a.relative_offset, 0);
    assert_eq!(b.relative_offset, 16);
    assert!(b.absolute_offset > a.absolute_offset);

    let a_values = gguf::tensor_to_float(a.tensor_type, reader.tensor_bytes(&a).unwrap(), a.num_weights).unwrap();
    let b_values = gguf::tensor_to_float(b.tensor_type, reader.tensor_bytes(&b).unwrap(), b.num_weights).unwrap();
    assert_eq!(a_values, vec![1.0, 2.0, 3.0, 4.0]);
    assert_eq!(b_values, vec![5.0, 6.0, 7.0, 8.0]);
}

#[test]
fn q8_0_tensor_round_trips_through_dequant() {
    use gguf::half::f32_to_half;

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("q8_0.gguf");
    let mut w = GgufWriter::create(&path, false).unwrap();
    w.append_tensor_info(b"weight", &[32], TensorType::Q8_0, 0).unwrap();

    let mut block = Vec::new();
    block.extend_from_slice(&f32_to_half(0.5).to_le_bytes());
    for q in 0..32i32 {
        block.push((q - 16) as u8);
    }
    w.append_tensor_data(&block).unwrap();
    let reader = w.seal().unwrap();

    let desc = reader.next_tensor().unwrap().unwrap();
    let bytes = reader.tensor_bytes(&desc).unwrap();
    let values = gguf::tensor_to_float(desc.tensor_type, bytes, desc.num_weights).unwrap();
    for (i, &v) in values.iter().enumerate() {
        assert_relative_eq!(v, 0.5 * (i as i32 - 16) as f32, max_relative = 1e-2);
    }
}

#[test]
fn array_metadata_preserves_element_order() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("array.gguf");
    let mut w = GgufWriter::create(&path, false).unwrap();
    w.append_kv_array(
        b"tokenizer.ggml.tokens",
        ValueType::UInt32,
        &[&1u32.to_le_bytes(), &2u32.to_le_bytes(), &3u32.to_le_bytes()],
    )
    .unwrap();
    let reader = w.seal().unwrap();

    let entry = reader.next_key().unwrap().unwrap();
    assert_eq!(entry.value_type, ValueType::Array);

    let mut seen = Vec::new();
    reader
        .consume_value(entry.value_type, &mut |event| {
            if let gguf::ValueEvent::Primitive { in_array, value } = event {
                if let gguf::PrimitiveValue::U32(v) = value {
                    seen.push((in_array, v));
                }
            }
        })
        .unwrap();
    assert_eq!(seen, vec![(1, 1), (2, 2), (3, 3)]);
}

#[test]
fn kv_after_tensor_info_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("order.gguf");
    let mut w = GgufWriter::create(&path, false).unwrap();
    w.append_tensor_info(b"a", &[1], TensorType::F32, 0).unwrap();
    let err = w.append_kv(b"late", ValueType::Bool, &[1]).unwrap_err();
    assert!(matches!(err, GgufError::Order(_)));
}

#[test]
fn custom_alignment_is_honored_on_read() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("aligned.gguf");
    let mut w = GgufWriter::create(&path, false).unwrap();
    w.append_kv(b"general.alignment", ValueType::UInt32, &16u32.to_le_bytes())
        .unwrap();
    w.append_tensor_info(b"a", &[1], TensorType::F32, 0).unwrap();
    w.append_tensor_data(&f32_le(&[1.0])).unwrap();
    let reader = w.seal().unwrap();

    let kv = reader.next_key().unwrap().unwrap();
    reader.consume_value(kv.value_type, &mut |_| {}).unwrap();
    assert_eq!(reader.alignment(), 16);

    let desc = reader.next_tensor().unwrap().unwrap();
    assert_eq!(desc.absolute_offset % 16, 0);
}

#[test]
fn bf16_tensor_round_trips() {
    use gguf::half::{brain_to_f32, f32_to_brain};

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("bf16.gguf");
    let mut w = GgufWriter::create(&path, false).unwrap();
    w.append_tensor_info(b"weight", &[3], TensorType::BF16, 0).unwrap();
    let bits = [f32_to_brain(1.0), f32_to_brain(-2.0), f32_to_brain(0.0)];
    let bytes: Vec<u8> = bits.iter().flat_map(|b| b.to_le_bytes()).collect();
    w.append_tensor_data(&bytes).unwrap();
    let reader = w.seal().unwrap();

    let desc = reader.next_tensor().unwrap().unwrap();
    let out = gguf::tensor_to_bf16(desc.tensor_type, reader.tensor_bytes(&desc).unwrap(), desc.num_weights).unwrap();
    assert_eq!(brain_to_f32(out[0]), 1.0);
    assert_eq!(brain_to_f32(out[1]), -2.0);
    assert_eq!(brain_to_f32(out[2]), 0.0);
}
