use anyhow::{Context, Result};
use std::path::Path;

/// Parse a flat floating point sample sequence from text. Lines hold
/// one or more values separated by whitespace or commas; blank lines
/// and `#` comments are skipped. Values are flattened in reading order.
pub fn parse_f64_series(text: &str) -> Result<Vec<f64>> {
    let mut out = Vec::new();
    for (idx, line) in text.lines().enumerate() {
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }
        for token in trimmed.split(|c: char| c == ',' || c.is_whitespace()) {
            if token.is_empty() {
                continue;
            }
            let val: f64 = token
                .parse()
                .with_context(|| format!("line {} is not f64: {}", idx + 1, token))?;
            out.push(val);
        }
    }
    if out.is_empty() {
        anyhow::bail!("no numeric samples found");
    }
    Ok(out)
}

/// Read a sample series from disk.
pub fn read_f64_series(path: &Path) -> Result<Vec<f64>> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    parse_f64_series(&text)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flattens_lines_and_skips_comments() {
        let parsed = parse_f64_series("# header\n1.5\n\n-2.0, 3.0\n4 5\n").unwrap();
        assert_eq!(parsed, vec![1.5, -2.0, 3.0, 4.0, 5.0]);
    }

    #[test]
    fn rejects_garbage_and_empty_input() {
        assert!(parse_f64_series("1.0\nnope\n").is_err());
        assert!(parse_f64_series("# only comments\n").is_err());
    }
}
