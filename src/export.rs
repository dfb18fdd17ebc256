//! Flat, column-labelled records for file export.

use std::{io::Write, path::Path};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::{
    frequency::{decode_breakdown, encode_breakdown},
    industry::IndustryCategory,
    io_utils,
    role_meta::RoleMetadata,
    summary::LocationSummary,
};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LocationSummaryRecord {
    pub rank: usize,
    pub code: Option<String>,
    pub name: String,
    pub region: Option<String>,
    pub count: usize,
    pub percentage: f64,
    pub top_breakdown: String,
}

impl From<&LocationSummary> for LocationSummaryRecord {
    fn from(summary: &LocationSummary) -> Self {
        Self {
            rank: summary.rank,
            code: summary.code.clone(),
            name: summary.name.clone(),
            region: summary.region.clone(),
            count: summary.count,
            percentage: summary.percentage,
            top_breakdown: encode_breakdown(&summary.top),
        }
    }
}

impl From<LocationSummaryRecord> for LocationSummary {
    fn from(record: LocationSummaryRecord) -> Self {
        Self {
            top: decode_breakdown(&record.top_breakdown),
            rank: record.rank,
            code: record.code,
            name: record.name,
            region: record.region,
            count: record.count,
            percentage: record.percentage,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoleMetadataRecord {
    pub column: String,
    pub total: f64,
    pub percentage: f64,
    pub category: IndustryCategory,
}

impl From<&RoleMetadata> for RoleMetadataRecord {
    fn from(meta: &RoleMetadata) -> Self {
        Self {
            column: meta.column.clone(),
            total: meta.total,
            percentage: meta.percentage,
            category: meta.category,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportFormat {
    Csv,
    Json,
}

impl ExportFormat {
    /// `.json` exports JSON; anything else is delimited text.
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|ext| ext.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("json") => ExportFormat::Json,
            _ => ExportFormat::Csv,
        }
    }
}

pub fn write_records<T: Serialize, W: Write>(
    records: &[T],
    format: ExportFormat,
    delimiter: u8,
    writer: W,
) -> Result<()> {
    match format {
        ExportFormat::Json => {
            serde_json::to_writer_pretty(writer, records).context("Writing JSON export")
        }
        ExportFormat::Csv => {
            let mut csv_writer = csv::WriterBuilder::new()
                .delimiter(delimiter)
                .from_writer(writer);
            for record in records {
                csv_writer.serialize(record).context("Writing CSV record")?;
            }
            csv_writer.flush().context("Flushing CSV export")
        }
    }
}

/// Writes records to `path`, or stdout when the path is `-`.
pub fn export_to_path<T: Serialize>(records: &[T], path: &Path, delimiter: Option<u8>) -> Result<()> {
    let format = ExportFormat::from_path(path);
    let delimiter = io_utils::resolve_output_delimiter(path, delimiter);
    let writer = io_utils::open_output(Some(path))
        .with_context(|| format!("Opening export destination {path:?}"))?;
    write_records(records, format, delimiter, writer)
        .with_context(|| format!("Exporting {} record(s) to {path:?}", records.len()))
}

pub fn read_location_records(path: &Path, delimiter: Option<u8>) -> Result<Vec<LocationSummaryRecord>> {
    match ExportFormat::from_path(path) {
        ExportFormat::Json => {
            let file = std::fs::File::open(path).with_context(|| format!("Opening {path:?}"))?;
            serde_json::from_reader(std::io::BufReader::new(file))
                .with_context(|| format!("Parsing location summaries from {path:?}"))
        }
        ExportFormat::Csv => {
            let delimiter = io_utils::resolve_input_delimiter(path, delimiter);
            let mut reader = csv::ReaderBuilder::new()
                .delimiter(delimiter)
                .from_path(path)
                .with_context(|| format!("Opening {path:?}"))?;
            reader
                .deserialize()
                .enumerate()
                .map(|(idx, record)| {
                    record.with_context(|| format!("Reading location summary row {}", idx + 2))
                })
                .collect()
        }
    }
}
