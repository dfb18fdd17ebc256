//! Column type and semantic role inference.
//!
//! [`classify`] looks at a column's name and its values and produces a
//! [`Column`]: one storage type plus a [`RoleSet`]. Types are decided on the
//! first non-empty value; roles come from keyword hits on the lower-cased
//! column name, with location additionally detected from the values
//! themselves when they look like codes of a registered geography profile.

use std::{collections::HashSet, fmt, str::FromStr};

use anyhow::anyhow;
use log::debug;
use serde::{Deserialize, Serialize};

use crate::{
    data::{RawValue, looks_like_date, non_empty, parse_number},
    error::IngestError,
    geography::{ProfileRegistry, location_sample},
    roles::{Role, RoleSet},
};

/// Number of raw values kept on each classified column.
pub const SAMPLE_VALUE_LIMIT: usize = 5;
/// Score at which values alone mark a column as a location column.
pub const LOCATION_VALUE_THRESHOLD: f64 = 0.3;

const LOCATION_KEYWORDS: &[&str] = &[
    "state",
    "province",
    "country",
    "region",
    "territory",
    "location",
    "geo",
];
const CITY_KEYWORDS: &[&str] = &["city", "town", "municipality", "metro"];
const ZIP_KEYWORDS: &[&str] = &["zip", "postal", "postcode"];
const SCORE_KEYWORDS: &[&str] = &["score", "tier", "icp", "grade", "rating"];
const COMPANY_KEYWORDS: &[&str] = &[
    "company",
    "organization",
    "organisation",
    "employer",
    "account",
    "firm",
    "brand",
];
const STATUS_KEYWORDS: &[&str] = &["status", "stage", "state", "phase", "pipeline"];
const INDUSTRY_KEYWORDS: &[&str] = &["industry", "sector", "vertical", "category"];
const SEGMENT_KEYWORDS: &[&str] = &["segment", "size", "cohort", "persona"];
const BUSINESS_MODEL_KEYWORDS: &[&str] = &[
    "business model",
    "business_model",
    "b2b",
    "b2c",
    "revenue model",
];
const LEVEL_KEYWORDS: &[&str] = &["level", "seniority"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ColumnType {
    Text,
    Number,
    Date,
    Boolean,
    Location,
}

impl ColumnType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ColumnType::Text => "text",
            ColumnType::Number => "number",
            ColumnType::Date => "date",
            ColumnType::Boolean => "boolean",
            ColumnType::Location => "location",
        }
    }
}

impl fmt::Display for ColumnType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ColumnType {
    type Err = anyhow::Error;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "text" | "string" => Ok(ColumnType::Text),
            "number" | "numeric" => Ok(ColumnType::Number),
            "date" => Ok(ColumnType::Date),
            "boolean" | "bool" => Ok(ColumnType::Boolean),
            "location" => Ok(ColumnType::Location),
            other => Err(anyhow!("Unknown column type '{other}'")),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Column {
    pub name: String,
    #[serde(rename = "type")]
    pub column_type: ColumnType,
    pub roles: RoleSet,
    pub sample_values: Vec<RawValue>,
}

impl Column {
    pub fn has_role(&self, role: Role) -> bool {
        self.roles.contains(role)
    }

    pub fn is_location_primary(&self) -> bool {
        self.roles.contains(Role::Location)
    }
}

/// Classifies a single column from its name and the values it holds, in row order.
pub fn classify(name: &str, values: &[Option<RawValue>], registry: &ProfileRegistry) -> Column {
    let sample_values = values
        .iter()
        .filter_map(|cell| non_empty(cell.as_ref()))
        .take(SAMPLE_VALUE_LIMIT)
        .cloned()
        .collect::<Vec<_>>();

    let location_values = location_sample(
        values
            .iter()
            .filter_map(|cell| match cell {
                Some(RawValue::Text(text)) => Some(text.as_str()),
                _ => None,
            }),
    );
    let value_location_score = registry.best_score(&location_values);

    let roles = infer_roles(name, value_location_score >= LOCATION_VALUE_THRESHOLD);
    let column_type = infer_type(sample_values.first(), roles);
    debug!(
        "Classified column '{name}' as {column_type} with roles [{roles}] (location score {value_location_score:.2})"
    );
    Column {
        name: name.to_string(),
        column_type,
        roles,
        sample_values,
    }
}

/// Keyword role detection on the column name.
///
/// Status is dropped when the column is already a location column, and
/// level is dropped when it is already a score column.
pub fn infer_roles(name: &str, location_by_value: bool) -> RoleSet {
    let lowered = name.to_lowercase();
    let hit = |keywords: &[&str]| keywords.iter().any(|k| lowered.contains(k));

    let location = hit(LOCATION_KEYWORDS) || location_by_value;
    let score = hit(SCORE_KEYWORDS);
    let candidates = [
        (Role::Location, location),
        (Role::City, hit(CITY_KEYWORDS)),
        (Role::Zip, hit(ZIP_KEYWORDS)),
        (Role::Score, score),
        (Role::Company, hit(COMPANY_KEYWORDS)),
        (Role::Status, !location && hit(STATUS_KEYWORDS)),
        (Role::Industry, hit(INDUSTRY_KEYWORDS)),
        (Role::Segment, hit(SEGMENT_KEYWORDS)),
        (Role::BusinessModel, hit(BUSINESS_MODEL_KEYWORDS)),
        (Role::Level, !score && hit(LEVEL_KEYWORDS)),
    ];
    // Suppression above keeps the exclusive pairs apart.
    RoleSet::try_from_roles(
        candidates
            .into_iter()
            .filter_map(|(role, active)| active.then_some(role)),
    )
    .unwrap_or_default()
}

fn infer_type(first: Option<&RawValue>, roles: RoleSet) -> ColumnType {
    match first {
        None => ColumnType::Text,
        Some(RawValue::Date(_)) => ColumnType::Date,
        Some(RawValue::Number(_)) => ColumnType::Number,
        Some(RawValue::Boolean(_)) => ColumnType::Boolean,
        Some(RawValue::Text(text)) => {
            if looks_like_date(text) {
                ColumnType::Date
            } else if parse_number(text).is_some() {
                ColumnType::Number
            } else if roles.contains(Role::Location) {
                ColumnType::Location
            } else {
                ColumnType::Text
            }
        }
    }
}

/// Classifies every column of a table, rejecting duplicate or missing headers.
pub fn classify_columns(
    headers: &[String],
    rows: &[Vec<Option<RawValue>>],
    registry: &ProfileRegistry,
) -> Result<Vec<Column>, IngestError> {
    if headers.is_empty() {
        return Err(IngestError::NoColumns);
    }
    let mut seen = HashSet::with_capacity(headers.len());
    for header in headers {
        if !seen.insert(header.as_str()) {
            return Err(IngestError::DuplicateColumn(header.clone()));
        }
    }
    Ok(headers
        .iter()
        .enumerate()
        .map(|(idx, header)| {
            let values = rows
                .iter()
                .map(|row| row.get(idx).cloned().flatten())
                .collect::<Vec<_>>();
            classify(header, &values, registry)
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn text(values: &[&str]) -> Vec<Option<RawValue>> {
        values
            .iter()
            .map(|v| {
                if v.is_empty() {
                    None
                } else {
                    Some(RawValue::text(*v))
                }
            })
            .collect()
    }

    fn registry() -> ProfileRegistry {
        ProfileRegistry::builtin().unwrap()
    }

    #[test]
    fn infers_types_from_first_non_empty_value() {
        let registry = registry();
        assert_eq!(
            classify("Budget", &text(&["", "$1,250.50", "abc"]), &registry).column_type,
            ColumnType::Number
        );
        assert_eq!(
            classify("Signed", &text(&["March 5, 2024"]), &registry).column_type,
            ColumnType::Date
        );
        assert_eq!(
            classify("Notes", &text(&["hello"]), &registry).column_type,
            ColumnType::Text
        );
        let native = vec![
            Some(RawValue::Boolean(true)),
            Some(RawValue::Number(2.0)),
        ];
        assert_eq!(
            classify("Active", &native, &registry).column_type,
            ColumnType::Boolean
        );
        let dates = vec![Some(RawValue::Date(
            NaiveDate::from_ymd_opt(2024, 1, 1)
                .unwrap()
                .and_hms_opt(0, 0, 0)
                .unwrap(),
        ))];
        assert_eq!(
            classify("When", &dates, &registry).column_type,
            ColumnType::Date
        );
    }

    #[test]
    fn empty_column_is_text_with_name_roles_only() {
        let column = classify("Company Name", &text(&["", ""]), &registry());
        assert_eq!(column.column_type, ColumnType::Text);
        assert!(column.has_role(Role::Company));
        assert_eq!(column.roles.len(), 1);
        assert!(column.sample_values.is_empty());
    }

    #[test]
    fn location_detected_from_values_without_keyword() {
        let column = classify("Where", &text(&["TX", "CA", "Ohio", "n/a"]), &registry());
        assert!(column.is_location_primary());
        assert_eq!(column.column_type, ColumnType::Location);
    }

    #[test]
    fn status_suppressed_by_location() {
        let roles = infer_roles("Deal State", false);
        assert!(roles.contains(Role::Location));
        assert!(!roles.contains(Role::Status));
        let roles = infer_roles("Pipeline Stage", false);
        assert!(roles.contains(Role::Status));
    }

    #[test]
    fn level_suppressed_by_score() {
        assert!(!infer_roles("ICP Level", false).contains(Role::Level));
        assert!(infer_roles("ICP Level", false).contains(Role::Score));
        assert!(infer_roles("Seniority Level", false).contains(Role::Level));
    }

    #[test]
    fn roles_are_independent_flags() {
        let roles = infer_roles("Company Size Segment", false);
        assert!(roles.contains(Role::Company));
        assert!(roles.contains(Role::Segment));
        assert!(infer_roles("Business Model", false).contains(Role::BusinessModel));
        assert!(infer_roles("Postal Code", false).contains(Role::Zip));
        assert!(infer_roles("City", false).contains(Role::City));
    }

    #[test]
    fn sample_values_keep_first_five_non_empty() {
        let column = classify(
            "Industry",
            &text(&["a", "", "b", "c", "d", "e", "f"]),
            &registry(),
        );
        let samples = column
            .sample_values
            .iter()
            .map(|v| v.as_display())
            .collect::<Vec<_>>();
        assert_eq!(samples, vec!["a", "b", "c", "d", "e"]);
    }

    #[test]
    fn classify_columns_rejects_duplicates_and_empty_headers() {
        let registry = registry();
        assert_eq!(
            classify_columns(&[], &[], &registry).unwrap_err(),
            IngestError::NoColumns
        );
        let headers = vec!["A".to_string(), "A".to_string()];
        assert_eq!(
            classify_columns(&headers, &[], &registry).unwrap_err(),
            IngestError::DuplicateColumn("A".to_string())
        );
    }

    #[test]
    fn classification_is_deterministic() {
        let registry = registry();
        let values = text(&["ON", "QC", "Alberta", "BC"]);
        let first = classify("Province", &values, &registry);
        let second = classify("Province", &values, &registry);
        assert_eq!(first, second);
    }
}
