use gguf::{GgufReader, TensorDescriptor};

use crate::error::{CliError, Result};

pub fn run(args: &[String]) -> Result<()> {
    let path_a = args
        .first()
        .ok_or_else(|| CliError::Usage("compare <a.gguf> <b.gguf>".to_string()))?;
    let path_b = args
        .get(1)
        .ok_or_else(|| CliError::Usage("compare <a.gguf> <b.gguf>".to_string()))?;

    let reader_a = GgufReader::open(path_a)?;
    let reader_b = GgufReader::open(path_b)?;
    reader_a.skip_kv()?;
    reader_b.skip_kv()?;

    let tensors_b = collect_tensors(&reader_b)?;

    let mut compared = 0;
    while let Some(desc_a) = reader_a.next_tensor()? {
        let name_a = desc_a.name_str().unwrap_or("<invalid utf8>").to_string();
        let Some(desc_b) = tensors_b.iter().find(|d| d.name_str().map(|n| n == name_a).unwrap_or(false)) else {
            continue;
        };

        if !desc_a.tensor_type.is_decodable() || !desc_b.tensor_type.is_decodable() {
            eprintln!("skipping {name_a}: unsupported tensor type for decode");
            continue;
        }
        if desc_a.num_weights != desc_b.num_weights {
            eprintln!("skipping {name_a}: shape mismatch ({} vs {} weights)", desc_a.num_weights, desc_b.num_weights);
            continue;
        }

        let bytes_a = reader_a.tensor_bytes(&desc_a)?;
        let bytes_b = reader_b.tensor_bytes(desc_b)?;
        let values_a = gguf::tensor_to_float(desc_a.tensor_type, bytes_a, desc_a.num_weights)?;
        let values_b = gguf::tensor_to_float(desc_b.tensor_type, bytes_b, desc_b.num_weights)?;

        let pct = mean_relative_difference(&values_a, &values_b);
        println!("{name_a}: {pct:.4}% mean relative difference");
        compared += 1;
    }

    if compared == 0 {
        return Err(CliError::Message("no comparable tensors found in both files".to_string()));
    }
    Ok(())
}

fn collect_tensors(reader: &GgufReader) -> Result<Vec<TensorDescriptor<'_>>> {
    let mut out = Vec::new();
    while let Some(desc) = reader.next_tensor()? {
        out.push(desc);
    }
    Ok(out)
}

/// `mean(|a - b|) / mean(|a|) * 100`.
fn mean_relative_difference(a: &[f32], b: &[f32]) -> f64 {
    let n = a.len().max(1) as f64;
    let abs_diff_sum: f64 = a.iter().zip(b).map(|(x, y)| (*x as f64 - *y as f64).abs()).sum();
    let abs_a_sum: f64 = a.iter().map(|x| (*x as f64).abs()).sum();
    if abs_a_sum == 0.0 {
        return 0.0;
    }
    (abs_diff_sum / n) / (abs_a_sum / n) * 100.0
}
