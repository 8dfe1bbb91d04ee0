use gguf::GgufReader;

use crate::error::{CliError, Result};

pub fn run(args: &[String]) -> Result<()> {
    let path = args
        .first()
        .ok_or_else(|| CliError::Usage("inspect-tensor <file.gguf> <name> [count]".to_string()))?;
    let name = args
        .get(1)
        .ok_or_else(|| CliError::Usage("inspect-tensor <file.gguf> <name> [count]".to_string()))?;
    let count_limit: Option<usize> = args.get(2).map(|s| s.parse()).transpose().map_err(|_| {
        CliError::Usage("count must be a non-negative integer".to_string())
    })?;

    let reader = GgufReader::open(path)?;
    reader.skip_kv()?;

    let mut found = None;
    while let Some(desc) = reader.next_tensor()? {
        if desc.name_str().map(|n| n == name).unwrap_or(false) {
            found = Some(desc);
            break;
        }
    }
    let desc = found.ok_or_else(|| CliError::NotFound(name.clone()))?;

    let bytes = reader.tensor_bytes(&desc)?;
    let n = count_limit.unwrap_or(desc.num_weights).min(desc.num_weights);
    let values = gguf::tensor_to_float(desc.tensor_type, bytes, n)?;

    println!("{name}: {} ({} weights total, showing {n})", desc.tensor_type.info().name, desc.num_weights);
    for chunk in values.chunks(4) {
        let row: Vec<String> = chunk.iter().map(|v| format!("{v:.6}")).collect();
        println!("{}", row.join(" "));
    }
    Ok(())
}
