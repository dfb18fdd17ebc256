//! Headline totals for a filtered view.

use std::collections::HashSet;

use log::debug;
use serde::{Deserialize, Serialize};

use crate::{
    error::UnknownColumn,
    filter::FilteredView,
    frequency::{FrequencyCounter, RankedCount, percentage},
    icp::IcpEvaluator,
    role_meta::compute_role_metadata,
    roles::Role,
};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KpiSet {
    pub total_rows: usize,
    pub qualified: usize,
    pub qualified_percentage: f64,
    pub distinct_locations: usize,
    pub industry_breakdown: Vec<RankedCount>,
    pub segment_column: Option<String>,
    pub segment_breakdown: Vec<RankedCount>,
    pub role_category_totals: Vec<RankedCount>,
    pub role_total: f64,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct KpiOptions<'a> {
    pub icp: Option<&'a IcpEvaluator>,
    /// Overrides the first column carrying the segment role.
    pub segment_column: Option<&'a str>,
    pub role_columns: &'a [String],
}

pub fn compute_kpis(view: &FilteredView<'_>, options: &KpiOptions<'_>) -> Result<KpiSet, UnknownColumn> {
    let dataset = view.dataset();
    let total_rows = view.len();

    let qualified = options
        .icp
        .map(|icp| view.rows().filter(|row| icp.qualifies(row)).count())
        .unwrap_or(0);

    let distinct_locations = dataset
        .location_field()
        .map(|idx| {
            view.rows()
                .filter_map(|row| row.text(idx))
                .collect::<HashSet<_>>()
                .len()
        })
        .unwrap_or(0);

    let mut industry = FrequencyCounter::new();
    if let Some(idx) = dataset.category_fields().first().copied() {
        for label in view.rows().filter_map(|row| row.text(idx)) {
            industry.increment(label);
        }
    }

    let segment_column = match options.segment_column {
        Some(name) => {
            dataset.require_field(name)?;
            Some(name.to_string())
        }
        None => dataset
            .first_column_with_role(Role::Segment)
            .map(|column| column.name.clone()),
    };
    let mut segments = FrequencyCounter::new();
    if let Some(idx) = segment_column
        .as_deref()
        .and_then(|name| dataset.field_index(name))
    {
        for value in view.rows().filter_map(|row| row.get(idx)) {
            segments.increment(&value.as_display());
        }
    }

    let mut role_categories = FrequencyCounter::new();
    for meta in compute_role_metadata(view, options.role_columns)? {
        role_categories.add(meta.category.label(), meta.total);
    }

    debug!("Computed KPIs over {total_rows} row(s)");
    Ok(KpiSet {
        total_rows,
        qualified,
        qualified_percentage: percentage(qualified as f64, total_rows as f64),
        distinct_locations,
        industry_breakdown: industry.ranked(),
        segment_column,
        segment_breakdown: segments.ranked(),
        role_total: role_categories.total(),
        role_category_totals: role_categories.ranked(),
    })
}
