//! Value normalization: raw rows plus classification plus a geography
//! profile in, typed rows with derived fields out.
//!
//! Every source column keeps its position and is coerced to its inferred
//! type; values that do not coerce become `None`. Two kinds of derived field
//! are appended after the source columns:
//!
//! - `<source>_code` for each primary location column, holding the resolved
//!   location code;
//! - `<source>_category` for each industry column, holding the industry
//!   category label.
//!
//! When the input already carries a column with a derived field's name and
//! that column holds exactly the values the derivation produces (it was
//! normalized before), the column is reused in place, so normalizing twice
//! is a no-op. Any other column with that name is source data and is kept;
//! the derived field then takes the next free name (`state_code_1`, ...).

use std::{collections::HashMap, sync::Arc};

use heck::ToSnakeCase;
use log::{debug, info};
use serde::Serialize;

use crate::{
    classify::{Column, ColumnType, classify_columns},
    data::{RawValue, Value, non_empty, parse_date, parse_number},
    error::{IngestError, UnknownColumn},
    geography::{GeographyProfile, ProfileRegistry},
    industry::classify_industry,
    roles::Role,
};

/// Parsed tabular input: named columns and rows of raw cells in column order.
#[derive(Debug, Clone, PartialEq)]
pub struct RawTable {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<Option<RawValue>>>,
}

impl RawTable {
    /// Builds a table, padding short rows with empty cells and rejecting
    /// rows that carry more fields than there are headers.
    pub fn new(
        headers: Vec<String>,
        rows: Vec<Vec<Option<RawValue>>>,
    ) -> Result<Self, IngestError> {
        let expected = headers.len();
        let mut padded = Vec::with_capacity(rows.len());
        for (idx, mut row) in rows.into_iter().enumerate() {
            if row.len() > expected {
                return Err(IngestError::RaggedRow {
                    row: idx + 1,
                    expected,
                    found: row.len(),
                });
            }
            row.resize(expected, None);
            padded.push(row);
        }
        Ok(Self {
            headers,
            rows: padded,
        })
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.headers.iter().position(|h| h == name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DerivedKind {
    LocationCode,
    IndustryCategory,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DerivedField {
    pub name: String,
    pub source: String,
    pub kind: DerivedKind,
}

pub fn derived_field_name(source: &str, kind: DerivedKind) -> String {
    let base = source.to_snake_case();
    let base = if base.is_empty() {
        "column".to_string()
    } else {
        base
    };
    match kind {
        DerivedKind::LocationCode => format!("{base}_code"),
        DerivedKind::IndustryCategory => format!("{base}_category"),
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NormalizedRow {
    values: Vec<Option<Value>>,
}

impl NormalizedRow {
    pub fn get(&self, idx: usize) -> Option<&Value> {
        self.values.get(idx).and_then(|v| v.as_ref())
    }

    pub fn values(&self) -> &[Option<Value>] {
        &self.values
    }

    pub fn number(&self, idx: usize) -> Option<f64> {
        self.get(idx).and_then(Value::as_number)
    }

    pub fn text(&self, idx: usize) -> Option<&str> {
        self.get(idx).and_then(Value::as_text)
    }
}

#[derive(Debug, Clone)]
pub struct NormalizedDataset {
    pub columns: Vec<Column>,
    pub derived: Vec<DerivedField>,
    pub profile: Arc<GeographyProfile>,
    headers: Vec<String>,
    rows: Vec<NormalizedRow>,
    index: HashMap<String, usize>,
    role_columns: Vec<String>,
}

impl NormalizedDataset {
    /// Source column names followed by any appended derived field names.
    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    pub fn rows(&self) -> &[NormalizedRow] {
        &self.rows
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn field_index(&self, name: &str) -> Option<usize> {
        self.index.get(name).copied()
    }

    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name == name)
    }

    /// Field holding the resolved code of the first primary location column.
    pub fn location_field(&self) -> Option<usize> {
        self.derived
            .iter()
            .find(|d| d.kind == DerivedKind::LocationCode)
            .and_then(|d| self.field_index(&d.name))
    }

    pub fn category_fields(&self) -> Vec<usize> {
        self.derived
            .iter()
            .filter(|d| d.kind == DerivedKind::IndustryCategory)
            .filter_map(|d| self.field_index(&d.name))
            .collect()
    }

    pub fn first_column_with_role(&self, role: Role) -> Option<&Column> {
        self.columns
            .iter()
            .find(|c| c.has_role(role) && !self.is_derived(&c.name))
    }

    pub fn first_date_column(&self) -> Option<&Column> {
        self.columns
            .iter()
            .find(|c| c.column_type == ColumnType::Date)
    }

    /// Wide-format headcount columns used for role metadata and category filters.
    pub fn role_columns(&self) -> &[String] {
        &self.role_columns
    }

    pub fn set_role_columns(&mut self, names: Vec<String>) -> Result<(), UnknownColumn> {
        if let Some(missing) = names.iter().find(|name| self.field_index(name).is_none()) {
            return Err(UnknownColumn(missing.clone()));
        }
        self.role_columns = names;
        Ok(())
    }

    /// Resolves a column name to its field index.
    pub fn require_field(&self, name: &str) -> Result<usize, UnknownColumn> {
        self.field_index(name)
            .ok_or_else(|| UnknownColumn(name.to_string()))
    }

    pub fn is_derived(&self, name: &str) -> bool {
        self.derived.iter().any(|d| d.name == name)
    }

    /// The row as a JSON object keyed by field name; nulls are kept.
    pub fn row_json(&self, row: &NormalizedRow) -> serde_json::Map<String, serde_json::Value> {
        self.headers
            .iter()
            .zip(row.values())
            .map(|(name, value)| {
                let json = value
                    .as_ref()
                    .map_or(serde_json::Value::Null, Value::to_json);
                (name.clone(), json)
            })
            .collect()
    }
}

/// Coerces every column to its type and appends derived fields.
pub fn normalize(
    table: &RawTable,
    columns: &[Column],
    profile: Arc<GeographyProfile>,
) -> NormalizedDataset {
    let mut derived = plan_derived_fields(columns);
    let derived_values = derived
        .iter()
        .map(|field| {
            let source = table.column_index(&field.source);
            table
                .rows
                .iter()
                .map(|raw_row| {
                    let raw = source.and_then(|idx| non_empty(raw_row.get(idx)?.as_ref()));
                    raw.and_then(|raw| derive_value(field.kind, raw, &profile))
                })
                .collect::<Vec<_>>()
        })
        .collect::<Vec<_>>();

    let mut headers = table.headers.clone();
    let mut targets = Vec::with_capacity(derived.len());
    for (field, values) in derived.iter_mut().zip(&derived_values) {
        let (name, target) = place_derived_field(table, &mut headers, &targets, &field.name, values);
        if name != field.name {
            debug!(
                "Column '{}' already holds source data; deriving '{}' from '{}' instead",
                field.name, name, field.source
            );
            field.name = name;
        }
        targets.push(target);
    }

    let rows = table
        .rows
        .iter()
        .enumerate()
        .map(|(row_idx, raw_row)| {
            let mut values = columns
                .iter()
                .enumerate()
                .map(|(idx, column)| {
                    coerce_value(
                        raw_row.get(idx).and_then(|cell| cell.as_ref()),
                        column.column_type,
                    )
                })
                .collect::<Vec<_>>();
            values.resize(headers.len(), None);
            for (target, column_values) in targets.iter().zip(&derived_values) {
                values[*target] = column_values[row_idx].clone();
            }
            NormalizedRow { values }
        })
        .collect::<Vec<_>>();

    let index = headers
        .iter()
        .enumerate()
        .map(|(idx, name)| (name.clone(), idx))
        .collect();
    debug!(
        "Normalized {} row(s) with {} derived field(s)",
        rows.len(),
        derived.len()
    );
    NormalizedDataset {
        columns: columns.to_vec(),
        derived,
        profile,
        headers,
        rows,
        index,
        role_columns: default_role_columns(columns),
    }
}

/// Picks the field a derived column is written to.
///
/// An input column named `base` (or `base_1`, `base_2`, ...) is reused only
/// when every cell already equals the derived value; otherwise the first
/// unused name is appended.
fn place_derived_field(
    table: &RawTable,
    headers: &mut Vec<String>,
    taken: &[usize],
    base: &str,
    values: &[Option<Value>],
) -> (String, usize) {
    let mut suffix = 0;
    loop {
        let candidate = if suffix == 0 {
            base.to_string()
        } else {
            format!("{base}_{suffix}")
        };
        match headers.iter().position(|h| *h == candidate) {
            None => {
                headers.push(candidate.clone());
                return (candidate, headers.len() - 1);
            }
            Some(existing)
                if existing < table.headers.len()
                    && !taken.contains(&existing)
                    && holds_derived_values(table, existing, values) =>
            {
                return (candidate, existing);
            }
            Some(_) => suffix += 1,
        }
    }
}

fn holds_derived_values(table: &RawTable, idx: usize, values: &[Option<Value>]) -> bool {
    table.rows.iter().zip(values).all(|(row, derived)| {
        let existing = non_empty(row.get(idx).and_then(|cell| cell.as_ref()))
            .map(|raw| raw.as_display().trim().to_string());
        existing == derived.as_ref().map(|v| v.as_display().trim().to_string())
    })
}

/// Number columns without any semantic role: the wide-format headcount columns.
pub fn default_role_columns(columns: &[Column]) -> Vec<String> {
    columns
        .iter()
        .filter(|c| c.column_type == ColumnType::Number && c.roles.is_empty())
        .map(|c| c.name.clone())
        .collect()
}

/// Derived fields for location and industry columns, skipping columns that
/// are themselves a previously derived field.
fn plan_derived_fields(columns: &[Column]) -> Vec<DerivedField> {
    let candidates = columns
        .iter()
        .flat_map(|column| {
            let mut fields = Vec::new();
            if column.has_role(Role::Location) {
                fields.push((column, DerivedKind::LocationCode));
            }
            if column.has_role(Role::Industry) {
                fields.push((column, DerivedKind::IndustryCategory));
            }
            fields
        })
        .map(|(column, kind)| DerivedField {
            name: derived_field_name(&column.name, kind),
            source: column.name.clone(),
            kind,
        })
        .collect::<Vec<_>>();
    candidates
        .iter()
        .filter(|field| {
            !candidates
                .iter()
                .any(|other| is_derived_name(&field.source, &other.name))
        })
        .cloned()
        .collect()
}

/// `name` itself or `name_<n>`, the names a derived field can be written under.
fn is_derived_name(column: &str, name: &str) -> bool {
    column == name
        || column
            .strip_prefix(name)
            .and_then(|rest| rest.strip_prefix('_'))
            .is_some_and(|n| !n.is_empty() && n.chars().all(|c| c.is_ascii_digit()))
}

fn derive_value(kind: DerivedKind, raw: &RawValue, profile: &GeographyProfile) -> Option<Value> {
    let display = raw.as_display();
    match kind {
        DerivedKind::LocationCode => profile.resolve_code(&display).map(Value::Text),
        DerivedKind::IndustryCategory => Some(Value::Text(
            classify_industry(&display).label().to_string(),
        )),
    }
}

/// Coerces one raw cell to the column type; anything that does not fit is `None`.
pub fn coerce_value(raw: Option<&RawValue>, column_type: ColumnType) -> Option<Value> {
    let raw = non_empty(raw)?;
    match column_type {
        ColumnType::Number => match raw {
            RawValue::Number(n) if n.is_finite() => Some(Value::Number(*n)),
            RawValue::Text(text) => parse_number(text).map(Value::Number),
            _ => None,
        },
        ColumnType::Date => match raw {
            RawValue::Date(d) => Some(Value::Date(*d)),
            RawValue::Text(text) => parse_date(text).map(Value::Date),
            _ => None,
        },
        ColumnType::Boolean => match raw {
            RawValue::Boolean(b) => Some(Value::Boolean(*b)),
            RawValue::Text(text) => match text.trim().to_ascii_lowercase().as_str() {
                "true" | "t" | "yes" | "y" | "1" => Some(Value::Boolean(true)),
                "false" | "f" | "no" | "n" | "0" => Some(Value::Boolean(false)),
                _ => None,
            },
            _ => None,
        },
        ColumnType::Text | ColumnType::Location => match raw {
            RawValue::Text(text) => Some(Value::Text(text.clone())),
            other => Some(Value::Text(other.as_display())),
        },
    }
}

/// Full load: classification, geography detection, then normalization.
pub fn load_dataset(
    table: &RawTable,
    registry: &ProfileRegistry,
) -> Result<NormalizedDataset, IngestError> {
    if table.headers.is_empty() {
        return Err(IngestError::NoColumns);
    }
    if table.rows.is_empty() {
        return Err(IngestError::NoRows);
    }
    let columns = classify_columns(&table.headers, &table.rows, registry)?;

    let location_values = columns
        .iter()
        .position(Column::is_location_primary)
        .map(|idx| {
            table
                .rows
                .iter()
                .filter_map(|row| non_empty(row.get(idx)?.as_ref()))
                .map(RawValue::as_display)
                .collect::<Vec<_>>()
        })
        .unwrap_or_default();
    let detection = registry.detect(&location_values);
    info!(
        "Selected geography profile '{}' (score {:.2}) for {} column(s)",
        detection.profile.id,
        detection.score,
        columns.len()
    );

    Ok(normalize(table, &columns, detection.profile))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table(headers: &[&str], rows: &[&[&str]]) -> RawTable {
        RawTable::new(
            headers.iter().map(|h| h.to_string()).collect(),
            rows.iter()
                .map(|row| {
                    row.iter()
                        .map(|v| (!v.is_empty()).then(|| RawValue::text(*v)))
                        .collect()
                })
                .collect(),
        )
        .unwrap()
    }

    fn registry() -> ProfileRegistry {
        ProfileRegistry::builtin().unwrap()
    }

    #[test]
    fn load_dataset_adds_code_and_category_fields() {
        let table = table(
            &["Company", "State", "Industry", "Budget"],
            &[
                &["Acme", "California", "Fashion stylist", "$1,250.50"],
                &["Beta", "NY", "Sound engineer", "N/A"],
                &["Gamma", "Atlantis", "Unit Production Manager", ""],
            ],
        );
        let dataset = load_dataset(&table, &registry()).unwrap();
        assert_eq!(dataset.profile.id, "us_states");
        assert_eq!(
            dataset.headers(),
            &["Company", "State", "Industry", "Budget", "state_code", "industry_category"]
        );
        let code = dataset.field_index("state_code").unwrap();
        let category = dataset.field_index("industry_category").unwrap();
        let budget = dataset.field_index("Budget").unwrap();
        let rows = dataset.rows();
        assert_eq!(rows[0].text(code), Some("CA"));
        assert_eq!(rows[1].text(code), Some("NY"));
        assert_eq!(rows[2].text(code), None);
        assert_eq!(rows[0].text(category), Some("Fashion & Apparel"));
        assert_eq!(rows[1].text(category), Some("Music & Audio"));
        assert_eq!(rows[2].text(category), Some("Film & TV"));
        assert_eq!(rows[0].number(budget), Some(1250.5));
        assert_eq!(rows[1].number(budget), None);
        assert_eq!(rows[2].number(budget), None);
    }

    #[test]
    fn load_dataset_rejects_empty_input() {
        let empty = table(&["A"], &[]);
        assert_eq!(
            load_dataset(&empty, &registry()).unwrap_err(),
            IngestError::NoRows
        );
        let no_headers = RawTable::new(Vec::new(), Vec::new()).unwrap();
        assert_eq!(
            load_dataset(&no_headers, &registry()).unwrap_err(),
            IngestError::NoColumns
        );
    }

    #[test]
    fn raw_table_rejects_long_rows_and_pads_short_ones() {
        let err = RawTable::new(
            vec!["A".into()],
            vec![vec![Some(RawValue::text("1")), Some(RawValue::text("2"))]],
        )
        .unwrap_err();
        assert!(matches!(err, IngestError::RaggedRow { row: 1, .. }));
        let table = RawTable::new(vec!["A".into(), "B".into()], vec![vec![None]]).unwrap();
        assert_eq!(table.rows[0].len(), 2);
    }

    #[test]
    fn generic_profile_keeps_unrecognised_locations() {
        let table = table(
            &["Territory", "Count"],
            &[&["Gotham", "1"], &["Metropolis", "2"], &["", "3"]],
        );
        let dataset = load_dataset(&table, &registry()).unwrap();
        assert!(dataset.profile.is_generic());
        let code = dataset.location_field().unwrap();
        assert_eq!(dataset.rows()[0].text(code), Some("Gotham"));
        assert_eq!(dataset.rows()[2].text(code), None);
    }

    #[test]
    fn renormalizing_reproduces_derived_fields() {
        let source = table(
            &["State", "Industry"],
            &[&["Texas", "Costume design"], &["OH", "Touring"], &["??", ""]],
        );
        let registry = registry();
        let first = load_dataset(&source, &registry).unwrap();

        let replay = RawTable::new(
            first.headers().to_vec(),
            first
                .rows()
                .iter()
                .map(|row| {
                    row.values()
                        .iter()
                        .map(|v| v.as_ref().map(|v| RawValue::text(v.as_display())))
                        .collect()
                })
                .collect(),
        )
        .unwrap();
        let second = load_dataset(&replay, &registry).unwrap();

        assert_eq!(first.headers(), second.headers());
        for name in ["state_code", "industry_category"] {
            let a = first.field_index(name).unwrap();
            let b = second.field_index(name).unwrap();
            for (left, right) in first.rows().iter().zip(second.rows()) {
                assert_eq!(left.get(a), right.get(b));
            }
        }
    }

    #[test]
    fn real_code_column_survives_load() {
        let source = table(
            &["State", "state_code"],
            &[&["California", "06"], &["Texas", "48"]],
        );
        let registry = registry();
        let dataset = load_dataset(&source, &registry).unwrap();
        assert_eq!(dataset.headers(), &["State", "state_code", "state_code_1"]);
        let fips = dataset.field_index("state_code").unwrap();
        let code = dataset.location_field().unwrap();
        assert_eq!(code, 2);
        assert!(!dataset.is_derived("state_code"));
        assert!(dataset.is_derived("state_code_1"));
        let rows = dataset.rows();
        assert_eq!(rows[0].number(fips), Some(6.0));
        assert_eq!(rows[1].number(fips), Some(48.0));
        assert_eq!(rows[0].text(code), Some("CA"));
        assert_eq!(rows[1].text(code), Some("TX"));

        let replay = table(
            &["State", "state_code", "state_code_1"],
            &[&["California", "06", "CA"], &["Texas", "48", "TX"]],
        );
        let again = load_dataset(&replay, &registry).unwrap();
        assert_eq!(again.headers(), dataset.headers());
        assert_eq!(again.location_field(), Some(2));
    }

    #[test]
    fn coerce_value_handles_native_and_text_inputs() {
        assert_eq!(
            coerce_value(Some(&RawValue::Number(3.0)), ColumnType::Text),
            Some(Value::Text("3".into()))
        );
        assert_eq!(
            coerce_value(Some(&RawValue::text("yes")), ColumnType::Boolean),
            Some(Value::Boolean(true))
        );
        assert_eq!(
            coerce_value(Some(&RawValue::text("soon")), ColumnType::Date),
            None
        );
        assert_eq!(coerce_value(Some(&RawValue::text("  ")), ColumnType::Text), None);
        assert_eq!(
            coerce_value(Some(&RawValue::Number(f64::NAN)), ColumnType::Number),
            None
        );
    }

    #[test]
    fn role_columns_default_to_unflagged_numbers() {
        let table = table(
            &["State", "Stylists", "Sound Engineers", "Score"],
            &[&["TX", "3", "1", "80"]],
        );
        let mut dataset = load_dataset(&table, &registry()).unwrap();
        assert_eq!(dataset.role_columns(), &["Stylists", "Sound Engineers"]);
        assert!(dataset.set_role_columns(vec!["Nope".into()]).is_err());
        dataset.set_role_columns(vec!["Stylists".into()]).unwrap();
        assert_eq!(dataset.role_columns(), &["Stylists"]);
    }

    #[test]
    fn derived_field_names_are_snake_case() {
        assert_eq!(
            derived_field_name("HQ State", DerivedKind::LocationCode),
            "hq_state_code"
        );
        assert_eq!(
            derived_field_name("Industry", DerivedKind::IndustryCategory),
            "industry_category"
        );
    }
}
