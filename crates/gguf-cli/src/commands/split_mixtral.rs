//! Collapse a Mixtral-style mixture-of-experts checkpoint down to one
//! expert per block, keeping everything that isn't a per-expert
//! feed-forward tensor untouched.

use gguf::{align_up, GgufMetadata, GgufReader, GgufWriter, MetadataValue, TensorType, ValueType};

use crate::error::{CliError, Result};

const N_BLOCKS: usize = 32;

pub fn run(args: &[String]) -> Result<()> {
    let digits_arg = args
        .first()
        .ok_or_else(|| CliError::Usage("split-mixtral <32 digits 0-7> <in.gguf> <out.gguf>".to_string()))?;
    let in_path = args
        .get(1)
        .ok_or_else(|| CliError::Usage("split-mixtral <32 digits 0-7> <in.gguf> <out.gguf>".to_string()))?;
    let out_path = args
        .get(2)
        .ok_or_else(|| CliError::Usage("split-mixtral <32 digits 0-7> <in.gguf> <out.gguf>".to_string()))?;

    let experts = parse_digits(digits_arg)?;

    let reader = GgufReader::open(in_path)?;
    let meta = GgufMetadata::read_all(&reader)?;

    let mut kept: Vec<(String, TensorType, Vec<u64>, &[u8])> = Vec::new();
    while let Some(desc) = reader.next_tensor()? {
        let bytes = reader.tensor_bytes(&desc)?;
        let name = desc.name_str().unwrap_or("").to_string();
        match parse_expert_tensor(&name) {
            Some((blk, expert_id, renamed)) if blk < N_BLOCKS => {
                if expert_id == experts[blk] {
                    kept.push((renamed, desc.tensor_type, desc.dims[..desc.n_dims as usize].to_vec(), bytes));
                }
            }
            _ => kept.push((name, desc.tensor_type, desc.dims[..desc.n_dims as usize].to_vec(), bytes)),
        }
    }

    let mut writer = GgufWriter::create(out_path, true)?;
    for (key, value) in meta.iter() {
        writer.append_kv(key.as_bytes(), value_type_of(value), &encode_raw(value))?;
    }

    let alignment = writer.alignment() as u64;
    let mut offset = 0u64;
    let mut relative_offsets = Vec::with_capacity(kept.len());
    for (_, tensor_type, dims, _) in &kept {
        let num_weights: usize = dims.iter().product::<u64>() as usize;
        let size = tensor_type.payload_size(num_weights) as u64;
        offset = align_up(offset, alignment);
        relative_offsets.push(offset);
        offset += size;
    }

    for ((name, tensor_type, dims, _), rel_offset) in kept.iter().zip(&relative_offsets) {
        writer.append_tensor_info(name.as_bytes(), dims, *tensor_type, *rel_offset)?;
    }
    for (_, _, _, bytes) in &kept {
        writer.append_tensor_data(bytes)?;
    }

    println!("wrote {} tensors to {out_path}", kept.len());
    Ok(())
}

fn parse_digits(arg: &str) -> Result<[u8; N_BLOCKS]> {
    if arg.is_empty() || arg.len() > N_BLOCKS {
        return Err(CliError::Usage(format!("expert digit string must be 1..={N_BLOCKS} chars, got {}", arg.len())));
    }
    let mut digits = [0u8; N_BLOCKS];
    let mut last = 0u8;
    for (i, slot) in digits.iter_mut().enumerate() {
        if let Some(c) = arg.as_bytes().get(i) {
            let d = c.wrapping_sub(b'0');
            if d > 7 {
                return Err(CliError::Usage(format!("expert digit '{}' out of range 0-7", *c as char)));
            }
            last = d;
        }
        *slot = last;
    }
    Ok(digits)
}

/// Recognize `blk.<i>.ffn_<kind>.<expert>.<suffix...>` and split it into the
/// block index, expert id, and the renamed (expert-stripped) tensor name.
fn parse_expert_tensor(name: &str) -> Option<(usize, u8, String)> {
    let segments: Vec<&str> = name.split('.').collect();
    if segments.len() < 5 || segments[0] != "blk" || !segments[2].starts_with("ffn_") {
        return None;
    }
    let blk: usize = segments[1].parse().ok()?;
    let expert: u8 = segments[3].parse().ok()?;
    if expert > 7 {
        return None;
    }
    let suffix = segments[4..].join(".");
    let renamed = format!("blk.{blk}.{}.{suffix}", segments[2]);
    Some((blk, expert, renamed))
}

fn value_type_of(value: &MetadataValue) -> ValueType {
    match value {
        MetadataValue::U8(_) => ValueType::UInt8,
        MetadataValue::I8(_) => ValueType::Int8,
        MetadataValue::U16(_) => ValueType::UInt16,
        MetadataValue::I16(_) => ValueType::Int16,
        MetadataValue::U32(_) => ValueType::UInt32,
        MetadataValue::I32(_) => ValueType::Int32,
        MetadataValue::F32(_) => ValueType::Float32,
        MetadataValue::Bool(_) => ValueType::Bool,
        MetadataValue::String(_) => ValueType::String,
        MetadataValue::U64(_) => ValueType::UInt64,
        MetadataValue::I64(_) => ValueType::Int64,
        MetadataValue::F64(_) => ValueType::Float64,
        MetadataValue::Array(_) => ValueType::Array,
    }
}

fn encode_raw(value: &MetadataValue) -> Vec<u8> {
    match value {
        MetadataValue::U8(x) => vec![*x],
        MetadataValue::I8(x) => vec![*x as u8],
        MetadataValue::U16(x) => x.to_le_bytes().to_vec(),
        MetadataValue::I16(x) => x.to_le_bytes().to_vec(),
        MetadataValue::U32(x) => x.to_le_bytes().to_vec(),
        MetadataValue::I32(x) => x.to_le_bytes().to_vec(),
        MetadataValue::F32(x) => x.to_le_bytes().to_vec(),
        MetadataValue::Bool(x) => vec![*x as u8],
        MetadataValue::String(s) => {
            let mut bytes = (s.len() as u64).to_le_bytes().to_vec();
            bytes.extend_from_slice(s.as_bytes());
            bytes
        }
        MetadataValue::U64(x) => x.to_le_bytes().to_vec(),
        MetadataValue::I64(x) => x.to_le_bytes().to_vec(),
        MetadataValue::F64(x) => x.to_le_bytes().to_vec(),
        MetadataValue::Array(items) => {
            let elem_type = items.first().map(value_type_of).unwrap_or(ValueType::UInt8);
            let mut bytes = elem_type.tag().to_le_bytes().to_vec();
            bytes.extend_from_slice(&(items.len() as u64).to_le_bytes());
            for item in items {
                bytes.extend_from_slice(&encode_raw(item));
            }
            bytes
        }
    }
}
