use gguf::{GgufMetadata, GgufReader, MetadataValue};

use crate::error::{CliError, Result};

const ARRAY_TRUNCATE_LEN: usize = 30;

pub fn run(args: &[String]) -> Result<()> {
    let path = args
        .first()
        .ok_or_else(|| CliError::Usage("show <file.gguf> [--verbose]".to_string()))?;
    let verbose = args.iter().any(|a| a == "--verbose");

    let reader = GgufReader::open(path)?;
    let header = reader.header();
    println!("version: {}", header.version);
    println!("metadata_kv_count: {}", header.metadata_kv_count);
    println!("tensor_count: {}", header.tensor_count);

    let meta = GgufMetadata::read_all(&reader)?;
    let mut keys: Vec<&str> = meta.iter().map(|(k, _)| k).collect();
    keys.sort_unstable();
    for key in keys {
        let value = meta.get(key).unwrap();
        println!("{key}: [{}] {}", type_name(value), format_value(value, verbose));
    }

    let mut total_weights: u128 = 0;
    let mut n_tensors = 0u64;
    while let Some(desc) = reader.next_tensor()? {
        let name = desc.name_str().unwrap_or("<invalid utf8>");
        println!(
            "{} {name} @{}, {} weights, {} bytes",
            desc.tensor_type.info().name,
            desc.absolute_offset,
            desc.num_weights,
            desc.payload_size
        );
        total_weights += desc.num_weights as u128;
        n_tensors += 1;
    }
    if n_tensors != header.tensor_count {
        eprintln!("warning: stopped after {n_tensors} of {} declared tensors (bad descriptor?)", header.tensor_count);
    }

    let billions = total_weights as f64 / 1.0e9;
    println!("total parameters: {total_weights} ({billions:.3}B)");
    Ok(())
}

fn type_name(value: &MetadataValue) -> &'static str {
    match value {
        MetadataValue::U8(_) => "uint8",
        MetadataValue::I8(_) => "int8",
        MetadataValue::U16(_) => "uint16",
        MetadataValue::I16(_) => "int16",
        MetadataValue::U32(_) => "uint32",
        MetadataValue::I32(_) => "int32",
        MetadataValue::F32(_) => "float32",
        MetadataValue::Bool(_) => "bool",
        MetadataValue::String(_) => "string",
        MetadataValue::U64(_) => "uint64",
        MetadataValue::I64(_) => "int64",
        MetadataValue::F64(_) => "float64",
        MetadataValue::Array(_) => "array",
    }
}

fn format_value(value: &MetadataValue, verbose: bool) -> String {
    match value {
        MetadataValue::String(s) => s.clone(),
        MetadataValue::Bool(b) => b.to_string(),
        MetadataValue::U8(v) => v.to_string(),
        MetadataValue::I8(v) => v.to_string(),
        MetadataValue::U16(v) => v.to_string(),
        MetadataValue::I16(v) => v.to_string(),
        MetadataValue::U32(v) => v.to_string(),
        MetadataValue::I32(v) => v.to_string(),
        MetadataValue::U64(v) => v.to_string(),
        MetadataValue::I64(v) => v.to_string(),
        MetadataValue::F32(v) => v.to_string(),
        MetadataValue::F64(v) => v.to_string(),
        MetadataValue::Array(items) => {
            let shown = if verbose { items.len() } else { items.len().min(ARRAY_TRUNCATE_LEN) };
            let rendered: Vec<String> = items[..shown].iter().map(|v| format_value(v, verbose)).collect();
            if shown < items.len() {
                format!("[{}, ... ({} more)]", rendered.join(", "), items.len() - shown)
            } else {
                format!("[{}]", rendered.join(", "))
            }
        }
    }
}
