//! Declarative row filter over a normalized dataset.
//!
//! A [`FilterState`] is plain data (it round-trips through JSON for the
//! insight request); [`apply_filter`] resolves it against a dataset once and
//! then evaluates the predicate row by row. Every active constraint must
//! hold. Filtering never mutates the dataset: the result is a
//! [`FilteredView`] of row indices in original row order.

use std::collections::BTreeSet;

use anyhow::{Result, anyhow};
use chrono::NaiveDate;
use log::debug;
use serde::{Deserialize, Serialize};

use crate::{
    data::parse_date,
    error::UnknownColumn,
    industry::{IndustryCategory, classify_industry},
    normalize::{NormalizedDataset, NormalizedRow},
};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CategoryMode {
    And,
    #[default]
    Or,
}

impl std::str::FromStr for CategoryMode {
    type Err = anyhow::Error;

    fn from_str(value: &str) -> Result<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "and" | "all" => Ok(CategoryMode::And),
            "or" | "any" => Ok(CategoryMode::Or),
            other => Err(anyhow!("Unknown category mode '{other}'. Use 'and' or 'or'")),
        }
    }
}

/// Inclusive calendar-date bounds.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    pub start: Option<NaiveDate>,
    pub end: Option<NaiveDate>,
    /// Date column to test; defaults to the first date column of the dataset.
    pub column: Option<String>,
}

impl DateRange {
    pub fn parse(start: Option<&str>, end: Option<&str>, column: Option<String>) -> Result<Self> {
        let bound = |raw: Option<&str>| -> Result<Option<NaiveDate>> {
            raw.map(|value| {
                parse_date(value)
                    .map(|d| d.date())
                    .ok_or_else(|| anyhow!("Failed to parse '{value}' as a date"))
            })
            .transpose()
        };
        Ok(Self {
            start: bound(start)?,
            end: bound(end)?,
            column,
        })
    }

    pub fn is_active(&self) -> bool {
        self.start.is_some() || self.end.is_some()
    }

    fn contains(&self, date: NaiveDate) -> bool {
        self.start.is_none_or(|start| date >= start) && self.end.is_none_or(|end| date <= end)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FilterState {
    pub selected_locations: BTreeSet<String>,
    pub selected_regions: BTreeSet<String>,
    pub selected_categories: BTreeSet<IndustryCategory>,
    pub selected_roles: BTreeSet<String>,
    pub category_mode: CategoryMode,
    pub search_text: Option<String>,
    pub date_range: Option<DateRange>,
}

impl FilterState {
    pub fn is_empty(&self) -> bool {
        self == &FilterState::default()
    }

    /// Rejects a date range that names a column the dataset does not have.
    pub fn validate(&self, dataset: &NormalizedDataset) -> Result<(), UnknownColumn> {
        if let Some(name) = self
            .date_range
            .as_ref()
            .filter(|range| range.is_active())
            .and_then(|range| range.column.as_deref())
        {
            dataset.require_field(name)?;
        }
        Ok(())
    }

    fn search_needle(&self) -> Option<String> {
        self.search_text
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_lowercase)
    }
}

/// The filter with column names resolved to field indices.
struct CompiledFilter<'a> {
    state: &'a FilterState,
    location_field: Option<usize>,
    locations: Vec<String>,
    category_fields: Vec<usize>,
    role_fields: Vec<(usize, IndustryCategory)>,
    selected_role_fields: Vec<usize>,
    date_field: Option<usize>,
    needle: Option<String>,
}

impl<'a> CompiledFilter<'a> {
    fn compile(dataset: &NormalizedDataset, state: &'a FilterState) -> Self {
        let role_fields = dataset
            .role_columns()
            .iter()
            .filter_map(|name| {
                dataset
                    .field_index(name)
                    .map(|idx| (idx, classify_industry(name)))
            })
            .collect();
        let selected_role_fields = state
            .selected_roles
            .iter()
            .filter_map(|name| dataset.field_index(name))
            .collect();
        let date_field = state
            .date_range
            .as_ref()
            .filter(|range| range.is_active())
            .and_then(|range| match &range.column {
                Some(name) => dataset.field_index(name),
                None => dataset
                    .first_date_column()
                    .and_then(|c| dataset.field_index(&c.name)),
            });
        let locations = state
            .selected_locations
            .iter()
            .map(|selected| {
                dataset
                    .profile
                    .resolve_code(selected)
                    .unwrap_or_else(|| selected.trim().to_string())
            })
            .collect();
        Self {
            state,
            location_field: dataset.location_field(),
            locations,
            category_fields: dataset.category_fields(),
            role_fields,
            selected_role_fields,
            date_field,
            needle: state.search_needle(),
        }
    }

    fn matches(&self, dataset: &NormalizedDataset, row: &NormalizedRow) -> bool {
        self.matches_location(dataset, row)
            && self.matches_categories(row)
            && self.matches_roles(row)
            && self.matches_search(row)
            && self.matches_dates(row)
    }

    fn matches_location(&self, dataset: &NormalizedDataset, row: &NormalizedRow) -> bool {
        let state = self.state;
        if state.selected_locations.is_empty() && state.selected_regions.is_empty() {
            return true;
        }
        let Some(code) = self.location_field.and_then(|idx| row.text(idx)) else {
            return false;
        };
        if !self.locations.is_empty()
            && !self
                .locations
                .iter()
                .any(|selected| selected.eq_ignore_ascii_case(code))
        {
            return false;
        }
        if !state.selected_regions.is_empty() {
            return dataset
                .profile
                .region_of(code)
                .is_some_and(|region| state.selected_regions.contains(region));
        }
        true
    }

    fn row_categories(&self, row: &NormalizedRow) -> BTreeSet<IndustryCategory> {
        let mut categories = self
            .category_fields
            .iter()
            .filter_map(|idx| row.text(*idx))
            .filter_map(|label| label.parse::<IndustryCategory>().ok())
            .collect::<BTreeSet<_>>();
        categories.extend(
            self.role_fields
                .iter()
                .filter(|(idx, _)| row.number(*idx).is_some_and(|n| n > 0.0))
                .map(|(_, category)| *category),
        );
        categories
    }

    fn matches_categories(&self, row: &NormalizedRow) -> bool {
        let selected = &self.state.selected_categories;
        if selected.is_empty() {
            return true;
        }
        let present = self.row_categories(row);
        match self.state.category_mode {
            CategoryMode::Or => selected.iter().any(|c| present.contains(c)),
            CategoryMode::And => selected.iter().all(|c| present.contains(c)),
        }
    }

    fn matches_roles(&self, row: &NormalizedRow) -> bool {
        if self.state.selected_roles.is_empty() {
            return true;
        }
        self.selected_role_fields
            .iter()
            .any(|idx| row.number(*idx).is_some_and(|n| n > 0.0))
    }

    fn matches_search(&self, row: &NormalizedRow) -> bool {
        let Some(needle) = &self.needle else {
            return true;
        };
        row.values()
            .iter()
            .flatten()
            .any(|value| value.as_display().to_lowercase().contains(needle.as_str()))
    }

    fn matches_dates(&self, row: &NormalizedRow) -> bool {
        let Some(range) = self.state.date_range.as_ref().filter(|r| r.is_active()) else {
            return true;
        };
        // A range on a dataset without dates constrains nothing.
        let Some(idx) = self.date_field else {
            return true;
        };
        row.get(idx)
            .and_then(|v| v.as_date())
            .is_some_and(|date| range.contains(date.date()))
    }
}

/// Rows that pass a filter, by index into the dataset, in original order.
#[derive(Debug, Clone)]
pub struct FilteredView<'a> {
    dataset: &'a NormalizedDataset,
    indices: Vec<usize>,
}

impl<'a> FilteredView<'a> {
    /// A view over every row.
    pub fn all(dataset: &'a NormalizedDataset) -> Self {
        Self {
            dataset,
            indices: (0..dataset.row_count()).collect(),
        }
    }

    pub fn dataset(&self) -> &'a NormalizedDataset {
        self.dataset
    }

    pub fn indices(&self) -> &[usize] {
        &self.indices
    }

    pub fn len(&self) -> usize {
        self.indices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }

    pub fn rows(&self) -> impl Iterator<Item = &'a NormalizedRow> + '_ {
        let rows = self.dataset.rows();
        self.indices.iter().map(move |idx| &rows[*idx])
    }
}

pub fn apply_filter<'a>(dataset: &'a NormalizedDataset, state: &FilterState) -> FilteredView<'a> {
    let compiled = CompiledFilter::compile(dataset, state);
    let indices = dataset
        .rows()
        .iter()
        .enumerate()
        .filter(|(_, row)| compiled.matches(dataset, row))
        .map(|(idx, _)| idx)
        .collect::<Vec<_>>();
    debug!(
        "Filter kept {} of {} row(s)",
        indices.len(),
        dataset.row_count()
    );
    FilteredView { dataset, indices }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        data::RawValue,
        geography::ProfileRegistry,
        normalize::{RawTable, load_dataset},
    };

    fn dataset() -> NormalizedDataset {
        let headers = ["Company", "State", "Industry", "Signed", "Stylists", "Sound Techs"];
        let rows: &[[&str; 6]] = &[
            ["Acme", "CA", "Fashion house", "2024-01-10", "4", "0"],
            ["Beta", "NY", "Record label", "2024-02-15", "0", "2"],
            ["Gamma", "Texas", "Studio", "2024-03-20", "1", "3"],
            ["Delta", "Narnia", "Boutique", "", "0", "0"],
        ];
        let table = RawTable::new(
            headers.iter().map(|h| h.to_string()).collect(),
            rows.iter()
                .map(|row| {
                    row.iter()
                        .map(|v| (!v.is_empty()).then(|| RawValue::text(*v)))
                        .collect()
                })
                .collect(),
        )
        .unwrap();
        load_dataset(&table, &ProfileRegistry::builtin().unwrap()).unwrap()
    }

    fn companies(view: &FilteredView<'_>) -> Vec<String> {
        let idx = view.dataset().field_index("Company").unwrap();
        view.rows()
            .map(|row| row.text(idx).unwrap().to_string())
            .collect()
    }

    #[test]
    fn empty_filter_keeps_every_row() {
        let dataset = dataset();
        let view = apply_filter(&dataset, &FilterState::default());
        assert_eq!(view.len(), 4);
        assert!(FilterState::default().is_empty());
    }

    #[test]
    fn location_and_region_selection() {
        let dataset = dataset();
        let mut state = FilterState::default();
        state.selected_locations.insert("CA".into());
        state.selected_locations.insert("TX".into());
        assert_eq!(companies(&apply_filter(&dataset, &state)), vec!["Acme", "Gamma"]);

        let mut state = FilterState::default();
        state.selected_regions.insert("Northeast".into());
        assert_eq!(companies(&apply_filter(&dataset, &state)), vec!["Beta"]);
    }

    #[test]
    fn location_selection_ignores_case() {
        let dataset = dataset();
        let mut state = FilterState::default();
        state.selected_locations.insert("ca".into());
        state.selected_locations.insert("texas".into());
        assert_eq!(companies(&apply_filter(&dataset, &state)), vec!["Acme", "Gamma"]);
    }

    #[test]
    fn generic_profile_locations_keep_their_spelling() {
        let table = RawTable::new(
            vec!["Territory".into(), "Deals".into()],
            ["Gotham", "Metropolis", "Gotham"]
                .iter()
                .map(|t| vec![Some(RawValue::text(*t)), Some(RawValue::text("1"))])
                .collect(),
        )
        .unwrap();
        let dataset = load_dataset(&table, &ProfileRegistry::builtin().unwrap()).unwrap();
        assert!(dataset.profile.is_generic());

        for selected in ["Gotham", "gotham", " GOTHAM "] {
            let mut state = FilterState::default();
            state.selected_locations.insert(selected.into());
            assert_eq!(apply_filter(&dataset, &state).indices(), &[0, 2]);
        }
    }

    #[test]
    fn unknown_date_column_is_rejected() {
        let dataset = dataset();
        let state = FilterState {
            date_range: Some(
                DateRange::parse(Some("2024-01-01"), None, Some("Closed".into())).unwrap(),
            ),
            ..FilterState::default()
        };
        assert_eq!(
            state.validate(&dataset).unwrap_err(),
            UnknownColumn("Closed".into())
        );

        let known = FilterState {
            date_range: Some(
                DateRange::parse(Some("2024-01-01"), None, Some("Signed".into())).unwrap(),
            ),
            ..FilterState::default()
        };
        assert!(known.validate(&dataset).is_ok());
        let inactive = FilterState {
            date_range: Some(DateRange::parse(None, None, Some("Closed".into())).unwrap()),
            ..FilterState::default()
        };
        assert!(inactive.validate(&dataset).is_ok());
    }

    #[test]
    fn category_modes_combine_industry_and_role_columns() {
        let dataset = dataset();
        let mut state = FilterState::default();
        state
            .selected_categories
            .extend([IndustryCategory::FashionApparel, IndustryCategory::MusicAudio]);
        state.category_mode = CategoryMode::Or;
        assert_eq!(
            companies(&apply_filter(&dataset, &state)),
            vec!["Acme", "Beta", "Gamma", "Delta"]
        );
        state.category_mode = CategoryMode::And;
        assert_eq!(companies(&apply_filter(&dataset, &state)), vec!["Gamma"]);
    }

    #[test]
    fn role_selection_requires_positive_headcount() {
        let dataset = dataset();
        let mut state = FilterState::default();
        state.selected_roles.insert("Sound Techs".into());
        assert_eq!(companies(&apply_filter(&dataset, &state)), vec!["Beta", "Gamma"]);
    }

    #[test]
    fn search_text_is_case_insensitive_across_fields() {
        let dataset = dataset();
        let state = FilterState {
            search_text: Some("  music ".into()),
            ..FilterState::default()
        };
        assert_eq!(companies(&apply_filter(&dataset, &state)), vec!["Beta"]);
    }

    #[test]
    fn date_range_is_inclusive_and_drops_missing_dates() {
        let dataset = dataset();
        let state = FilterState {
            date_range: Some(
                DateRange::parse(Some("2024-02-15"), Some("3/20/2024"), None).unwrap(),
            ),
            ..FilterState::default()
        };
        assert_eq!(companies(&apply_filter(&dataset, &state)), vec!["Beta", "Gamma"]);
    }

    #[test]
    fn filter_state_round_trips_through_json() {
        let mut state = FilterState::default();
        state.selected_categories.insert(IndustryCategory::MusicAudio);
        state.category_mode = CategoryMode::And;
        let json = serde_json::to_string(&state).unwrap();
        let parsed: FilterState = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, state);
    }
}
