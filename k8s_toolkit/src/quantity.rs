use anyhow::{Context, Result, bail};
use k8s_openapi::apimachinery::pkg::api::resource::Quantity;

/// Split a quantity like `1500m` or `16Gi` into its number and suffix
fn split_quantity(q: &str) -> (&str, &str) {
    let q = q.trim();
    let bytes = q.as_bytes();
    let mut idx = 0;
    while idx < bytes.len() {
        let c = bytes[idx];
        // `e`/`E` followed by a digit or sign is an exponent, otherwise `E` is exa
        let exponent = (c == b'e' || c == b'E')
            && bytes
                .get(idx + 1)
                .is_some_and(|n| n.is_ascii_digit() || *n == b'+' || *n == b'-');
        if c.is_ascii_alphabetic() && !exponent {
            break;
        }
        idx += 1;
    }
    (&q[..idx], &q[idx..])
}

/// Multiplier for a Kubernetes quantity suffix (binary SI, decimal SI)
fn suffix_multiplier(suffix: &str) -> Result<f64> {
    Ok(match suffix {
        "" => 1.0,
        "n" => 1e-9,
        "u" => 1e-6,
        "m" => 1e-3,
        "k" => 1e3,
        "M" => 1e6,
        "G" => 1e9,
        "T" => 1e12,
        "P" => 1e15,
        "E" => 1e18,
        "Ki" => 1024.0,
        "Mi" => 1024.0 * 1024.0,
        "Gi" => 1024.0 * 1024.0 * 1024.0,
        "Ti" => 1024.0 * 1024.0 * 1024.0 * 1024.0,
        "Pi" => 1024.0 * 1024.0 * 1024.0 * 1024.0 * 1024.0,
        "Ei" => 1024.0 * 1024.0 * 1024.0 * 1024.0 * 1024.0 * 1024.0,
        s => bail!("Unknown quantity suffix '{}'", s),
    })
}

/// Parse a quantity into its base unit value (cores, bytes)
pub fn parse_quantity(q: &Quantity) -> Result<f64> {
    let (number, suffix) = split_quantity(&q.0);
    let value: f64 = number
        .parse()
        .with_context(|| format!("Invalid quantity '{}'", q.0))?;
    Ok(value * suffix_multiplier(suffix)?)
}

/// CPU quantity in millicores, e.g. `250m` -> 250, `2` -> 2000
pub fn cpu_millis(q: &Quantity) -> Result<f64> {
    Ok((parse_quantity(q)? * 1000.0).round())
}

/// Memory quantity in bytes, e.g. `1Ki` -> 1024
pub fn memory_bytes(q: &Quantity) -> Result<f64> {
    Ok(parse_quantity(q)?.ceil())
}
