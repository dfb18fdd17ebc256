//! Reading spreadsheet exports into a [`RawTable`] and opening output sinks.
//!
//! - **Delimiter resolution**: extension-based (`.tsv` → tab, otherwise comma)
//!   with manual override.
//! - **Encoding**: CSV input is decoded through `encoding_rs`, defaulting to
//!   UTF-8.
//! - **JSON input**: a `.json` file holding an array of objects keeps native
//!   numbers and booleans; CSV cells are always text.
//! - **stdin/stdout**: the `-` path reads CSV from stdin or writes to stdout.

use std::{
    fs::File,
    io::{BufReader, BufWriter, Read, Write},
    path::Path,
};

use anyhow::{Context, Result, anyhow, bail};
use encoding_rs::{Encoding, UTF_8};
use log::debug;

use crate::{data::RawValue, normalize::RawTable};

pub const DEFAULT_CSV_DELIMITER: u8 = b',';
pub const DEFAULT_TSV_DELIMITER: u8 = b'\t';

pub fn is_dash(path: &Path) -> bool {
    path == Path::new("-")
}

pub fn resolve_encoding(label: Option<&str>) -> Result<&'static Encoding> {
    if let Some(value) = label {
        Encoding::for_label(value.trim().as_bytes())
            .ok_or_else(|| anyhow!("Unknown encoding '{value}'"))
    } else {
        Ok(UTF_8)
    }
}

fn has_extension(path: &Path, wanted: &str) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case(wanted))
}

pub fn resolve_input_delimiter(path: &Path, provided: Option<u8>) -> u8 {
    provided.unwrap_or(if has_extension(path, "tsv") {
        DEFAULT_TSV_DELIMITER
    } else {
        DEFAULT_CSV_DELIMITER
    })
}

pub fn resolve_output_delimiter(path: &Path, provided: Option<u8>) -> u8 {
    resolve_input_delimiter(path, provided)
}

/// Parses a delimiter argument: a single character, or `tab`/`\t`.
pub fn parse_delimiter(value: &str) -> Result<u8, String> {
    match value {
        "tab" | "\\t" | "\t" => Ok(b'\t'),
        other if other.len() == 1 && other.is_ascii() => Ok(other.as_bytes()[0]),
        other => Err(format!(
            "Delimiter must be a single ASCII character or 'tab', got '{other}'"
        )),
    }
}

pub fn decode_bytes(bytes: &[u8], encoding: &'static Encoding) -> Result<String> {
    let (text, _, had_errors) = encoding.decode(bytes);
    if had_errors {
        Err(anyhow!(
            "Failed to decode text with encoding {}",
            encoding.name()
        ))
    } else {
        Ok(text.into_owned())
    }
}

pub fn decode_record(record: &csv::ByteRecord, encoding: &'static Encoding) -> Result<Vec<String>> {
    record
        .iter()
        .map(|field| decode_bytes(field, encoding))
        .collect()
}

fn open_input(path: &Path) -> Result<Box<dyn Read>> {
    Ok(if is_dash(path) {
        Box::new(std::io::stdin().lock())
    } else {
        Box::new(BufReader::new(
            File::open(path).with_context(|| format!("Opening input file {path:?}"))?,
        ))
    })
}

pub fn open_output(path: Option<&Path>) -> Result<Box<dyn Write>> {
    Ok(match path {
        Some(p) if !is_dash(p) => Box::new(BufWriter::new(
            File::create(p).with_context(|| format!("Creating output file {p:?}"))?,
        )),
        _ => Box::new(std::io::stdout()),
    })
}

/// Reads CSV (or JSON, by extension) into a raw table.
pub fn read_table(path: &Path, delimiter: Option<u8>, encoding: &'static Encoding) -> Result<RawTable> {
    let table = if has_extension(path, "json") {
        read_json_table(open_input(path)?)
            .with_context(|| format!("Reading JSON rows from {path:?}"))?
    } else {
        let delimiter = resolve_input_delimiter(path, delimiter);
        read_csv_table(open_input(path)?, delimiter, encoding)
            .with_context(|| format!("Reading CSV rows from {path:?}"))?
    };
    debug!(
        "Read {} row(s) with {} column(s) from {path:?}",
        table.rows.len(),
        table.headers.len()
    );
    Ok(table)
}

pub fn read_csv_table<R: Read>(
    reader: R,
    delimiter: u8,
    encoding: &'static Encoding,
) -> Result<RawTable> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .delimiter(delimiter)
        .double_quote(true)
        .flexible(true)
        .from_reader(reader);
    let headers = decode_record(reader.byte_headers()?, encoding)?
        .into_iter()
        .map(|h| h.trim().to_string())
        .collect::<Vec<_>>();
    let headers = if headers.len() == 1 && headers[0].is_empty() {
        Vec::new()
    } else {
        headers
    };

    let mut rows = Vec::new();
    for (idx, record) in reader.byte_records().enumerate() {
        let record = record.with_context(|| format!("Reading row {}", idx + 2))?;
        let cells = decode_record(&record, encoding)
            .with_context(|| format!("Decoding row {}", idx + 2))?;
        if cells.iter().all(|cell| cell.trim().is_empty()) {
            continue;
        }
        rows.push(
            cells
                .into_iter()
                .map(|cell| (!cell.trim().is_empty()).then(|| RawValue::Text(cell)))
                .collect(),
        );
    }
    Ok(RawTable::new(headers, rows)?)
}

/// Reads an array of flat JSON objects. Headers are the union of keys in
/// first-seen order; nested values are kept as their JSON text.
pub fn read_json_table<R: Read>(reader: R) -> Result<RawTable> {
    let parsed: serde_json::Value = serde_json::from_reader(reader)?;
    let serde_json::Value::Array(items) = parsed else {
        bail!("Expected a JSON array of row objects");
    };

    let mut headers: Vec<String> = Vec::new();
    let mut objects = Vec::with_capacity(items.len());
    for (idx, item) in items.into_iter().enumerate() {
        let serde_json::Value::Object(map) = item else {
            bail!("Row {} is not a JSON object", idx + 1);
        };
        for key in map.keys() {
            if !headers.contains(key) {
                headers.push(key.clone());
            }
        }
        objects.push(map);
    }

    let rows = objects
        .into_iter()
        .map(|mut map| {
            headers
                .iter()
                .map(|header| map.remove(header).and_then(json_to_raw))
                .collect()
        })
        .collect();
    Ok(RawTable::new(headers, rows)?)
}

fn json_to_raw(value: serde_json::Value) -> Option<RawValue> {
    match value {
        serde_json::Value::Null => None,
        serde_json::Value::Bool(b) => Some(RawValue::Boolean(b)),
        serde_json::Value::Number(n) => n.as_f64().map(RawValue::Number),
        serde_json::Value::String(s) => Some(RawValue::Text(s)),
        other => Some(RawValue::Text(other.to_string())),
    }
}
