//! Signature sources: JSON arrays or CSV tables, from a file or stdin
//!
//! CSV needs an `r,s,z` header; `kp`, `leak_bits` and `nonce` columns are
//! optional and may be left empty per row.

use crate::signature::{SignatureInput, SignatureRecord};
use anyhow::{bail, Context, Result};
use rug::Integer;
use std::io::{self, Read};
use std::path::PathBuf;

const BOM: char = '\u{FEFF}';
const REQUIRED_COLUMNS: [&str; 3] = ["r", "s", "z"];

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Source {
    Stdin,
    File(PathBuf),
}

impl Source {
    /// `-` selects stdin, anything else is a path.
    pub fn from_arg(arg: &str) -> Self {
        match arg {
            "-" => Source::Stdin,
            path => Source::File(PathBuf::from(path)),
        }
    }

    pub fn read(&self) -> Result<String> {
        match self {
            Source::Stdin => {
                let mut buf = String::new();
                io::stdin()
                    .read_to_string(&mut buf)
                    .context("failed to read signatures from stdin")?;
                Ok(buf)
            }
            Source::File(path) => std::fs::read_to_string(path)
                .with_context(|| format!("failed to read {}", path.display())),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Format {
    Json,
    Csv,
}

impl Format {
    pub fn detect(content: &str) -> Result<Self> {
        let body = strip_bom(content).trim_start();
        if body.starts_with('[') {
            return Ok(Format::Json);
        }

        let header: Vec<String> = body
            .lines()
            .next()
            .unwrap_or_default()
            .split(',')
            .map(|c| c.trim().to_ascii_lowercase())
            .collect();
        if REQUIRED_COLUMNS
            .iter()
            .all(|col| header.iter().any(|h| h == col))
        {
            return Ok(Format::Csv);
        }

        bail!("Unable to detect input format. Use a JSON array or CSV with an r,s,z header.")
    }
}

fn strip_bom(content: &str) -> &str {
    content.strip_prefix(BOM).unwrap_or(content)
}

/// Reads `input` (`-` for stdin) and converts every row to a record.
///
/// Rows without a `leak_bits` field take `default_leak_bits`.
pub fn load_signatures(
    input: &str,
    default_leak_bits: u32,
    order: &Integer,
) -> Result<Vec<SignatureRecord>> {
    let content = Source::from_arg(input).read()?;
    parse_signatures(&content, default_leak_bits, order)
}

pub fn parse_signatures(
    content: &str,
    default_leak_bits: u32,
    order: &Integer,
) -> Result<Vec<SignatureRecord>> {
    let rows = match Format::detect(content)? {
        Format::Json => serde_json::from_str::<Vec<SignatureInput>>(strip_bom(content))
            .context("malformed JSON signature list")?,
        Format::Csv => csv_rows(strip_bom(content))?,
    };
    if rows.is_empty() {
        bail!("no signatures in input");
    }

    rows.into_iter()
        .enumerate()
        .map(|(i, row)| {
            row.into_record(default_leak_bits, order)
                .with_context(|| format!("signature {i}"))
        })
        .collect()
}

fn csv_rows(content: &str) -> Result<Vec<SignatureInput>> {
    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(content.as_bytes());
    let header: csv::StringRecord = reader
        .headers()
        .context("unreadable CSV header")?
        .iter()
        .map(str::to_ascii_lowercase)
        .collect();
    reader.set_headers(header);
    reader
        .deserialize::<SignatureInput>()
        .enumerate()
        .map(|(line, row)| row.with_context(|| format!("CSV row {}", line + 1)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::math::secp256k1_order;

    #[test]
    fn test_json_rows_carry_leak_fields() {
        let json = r#"[{"r": "123", "s": "456", "z": "789", "kp": "3", "leak_bits": 2}]"#;
        let sigs = parse_signatures(json, 8, &secp256k1_order()).unwrap();
        assert_eq!(sigs.len(), 1);
        assert_eq!(sigs[0].known_leak_bits, 2);
        assert_eq!(sigs[0].known_nonce_bits, 3);
    }

    #[test]
    fn test_csv_empty_cells_take_defaults() {
        let csv = "r,s,z,kp\n123,456,789,\n124,457,790,5";
        let sigs = parse_signatures(csv, 4, &secp256k1_order()).unwrap();
        assert_eq!(sigs.len(), 2);
        assert_eq!(sigs[0].known_nonce_bits, 0);
        assert_eq!(sigs[1].known_nonce_bits, 5);
        assert_eq!(sigs[1].known_leak_bits, 4);
    }

    #[test]
    fn test_detect() {
        assert_eq!(Format::detect(r#"  [{"r": "1"}]"#).unwrap(), Format::Json);
        assert_eq!(Format::detect("\u{FEFF}Z, S ,R\n3,2,1").unwrap(), Format::Csv);
        assert!(Format::detect("r,s\n1,2").is_err());
        assert!(Format::detect("").is_err());
    }

    #[test]
    fn test_csv_header_case_is_ignored() {
        let csv = "\u{FEFF}R, S ,Z,KP\n123,456,789,3";
        let sigs = parse_signatures(csv, 4, &secp256k1_order()).unwrap();
        assert_eq!(sigs.len(), 1);
        assert_eq!(sigs[0].r, 123);
        assert_eq!(sigs[0].s, 456);
        assert_eq!(sigs[0].message_hash, 789);
        assert_eq!(sigs[0].known_nonce_bits, 3);
    }

    #[test]
    fn test_errors_name_the_row() {
        let csv = "r,s,z\n1,2,3\n0,2,3";
        let err = parse_signatures(csv, 4, &secp256k1_order()).unwrap_err();
        assert!(format!("{err:#}").contains("signature 1"));
    }

    #[test]
    fn test_empty_list_is_an_error() {
        assert!(parse_signatures("[]", 4, &secp256k1_order()).is_err());
        assert!(parse_signatures("not json", 8, &secp256k1_order()).is_err());
    }

    #[test]
    fn test_source_from_arg() {
        assert_eq!(Source::from_arg("-"), Source::Stdin);
        assert_eq!(
            Source::from_arg("sigs.json"),
            Source::File(PathBuf::from("sigs.json"))
        );
    }
}
