//! Per-location and per-region rollups.
//!
//! Every code of the active geography profile gets an entry, observed or
//! not, plus an `Unclassified` entry for rows whose location did not
//! resolve. That keeps the percentages of a non-empty view summing to 100.

use std::collections::HashMap;

use itertools::Itertools;
use log::debug;
use serde::{Deserialize, Serialize};

use crate::{
    error::UnknownColumn,
    filter::FilteredView,
    frequency::{FrequencyCounter, RankedCount, percentage},
    normalize::NormalizedRow,
};

pub const DEFAULT_TOP_N: usize = 3;
pub const UNCLASSIFIED_LABEL: &str = "Unclassified";
pub const OTHER_REGION_LABEL: &str = "Other";

/// What the per-location top-N breakdown counts.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BreakdownSource {
    /// The first derived industry category field.
    #[default]
    Category,
    /// Role column names, weighted by their headcount on each row.
    RoleColumns,
    /// Distinct display values of a named column.
    Column(String),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LocationSummary {
    pub rank: usize,
    pub code: Option<String>,
    pub name: String,
    pub region: Option<String>,
    pub count: usize,
    pub percentage: f64,
    pub top: Vec<RankedCount>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegionSummary {
    pub rank: usize,
    pub region: String,
    pub count: usize,
    pub percentage: f64,
    pub locations: usize,
}

enum Breakdown {
    Field(usize),
    Weighted(Vec<(usize, String)>),
    Nothing,
}

impl Breakdown {
    fn resolve(
        view: &FilteredView<'_>,
        source: &BreakdownSource,
        role_columns: &[String],
    ) -> Result<Self, UnknownColumn> {
        let dataset = view.dataset();
        Ok(match source {
            BreakdownSource::Category => dataset
                .category_fields()
                .first()
                .copied()
                .map_or(Breakdown::Nothing, Breakdown::Field),
            BreakdownSource::Column(name) => Breakdown::Field(dataset.require_field(name)?),
            BreakdownSource::RoleColumns => Breakdown::Weighted(
                role_columns
                    .iter()
                    .map(|name| Ok((dataset.require_field(name)?, name.clone())))
                    .collect::<Result<Vec<_>, UnknownColumn>>()?,
            ),
        })
    }

    fn tally(&self, counter: &mut FrequencyCounter, row: &NormalizedRow) {
        match self {
            Breakdown::Field(idx) => {
                if let Some(value) = row.get(*idx) {
                    counter.increment(&value.as_display());
                }
            }
            Breakdown::Weighted(fields) => {
                for (idx, name) in fields {
                    if let Some(n) = row.number(*idx).filter(|n| *n > 0.0) {
                        counter.add(name, n);
                    }
                }
            }
            Breakdown::Nothing => {}
        }
    }
}

struct Group {
    code: Option<String>,
    count: usize,
    breakdown: FrequencyCounter,
}

/// Groups the view by resolved location code.
///
/// Entries are ranked by row count. Equal counts keep observed locations in
/// the order their first row appears, followed by unobserved profile codes
/// in profile order.
pub fn compute_location_summaries(
    view: &FilteredView<'_>,
    source: &BreakdownSource,
    role_columns: &[String],
    top_n: usize,
) -> Result<Vec<LocationSummary>, UnknownColumn> {
    let dataset = view.dataset();
    let profile = &dataset.profile;
    let breakdown = Breakdown::resolve(view, source, role_columns)?;
    let location_field = dataset.location_field();

    let mut groups: Vec<Group> = Vec::new();
    let mut positions: HashMap<Option<String>, usize> = HashMap::new();
    for row in view.rows() {
        let code = location_field
            .and_then(|idx| row.text(idx))
            .map(str::to_string);
        let position = *positions.entry(code.clone()).or_insert_with(|| {
            groups.push(Group {
                code,
                count: 0,
                breakdown: FrequencyCounter::new(),
            });
            groups.len() - 1
        });
        let group = &mut groups[position];
        group.count += 1;
        breakdown.tally(&mut group.breakdown, row);
    }
    for location in profile.locations() {
        let key = Some(location.code.clone());
        if !positions.contains_key(&key) {
            positions.insert(key.clone(), groups.len());
            groups.push(Group {
                code: key,
                count: 0,
                breakdown: FrequencyCounter::new(),
            });
        }
    }

    let total = view.len() as f64;
    let summaries = groups
        .into_iter()
        .sorted_by(|a, b| b.count.cmp(&a.count))
        .enumerate()
        .map(|(idx, group)| {
            let (name, region) = match &group.code {
                Some(code) => (
                    profile.display_name_for(code).unwrap_or(code).to_string(),
                    profile.region_of(code).map(str::to_string),
                ),
                None => (UNCLASSIFIED_LABEL.to_string(), None),
            };
            LocationSummary {
                rank: idx + 1,
                code: group.code,
                name,
                region,
                count: group.count,
                percentage: percentage(group.count as f64, total),
                top: group.breakdown.top(top_n),
            }
        })
        .collect::<Vec<_>>();
    debug!(
        "Summarized {} row(s) into {} location(s) for profile '{}'",
        view.len(),
        summaries.len(),
        profile.id
    );
    Ok(summaries)
}

/// Rolls location summaries up into the profile's regions.
///
/// Every profile region is listed. Locations outside any region, including
/// unresolved rows, are gathered under `Other`, which only appears when it
/// holds rows. Equal counts keep profile region order.
pub fn compute_region_summaries(
    view: &FilteredView<'_>,
    locations: &[LocationSummary],
) -> Vec<RegionSummary> {
    let profile = &view.dataset().profile;
    let mut order = profile
        .regions()
        .iter()
        .map(|region| region.name.clone())
        .collect::<Vec<_>>();
    let mut tallies: HashMap<String, (usize, usize)> = order
        .iter()
        .map(|name| (name.clone(), (0, 0)))
        .collect();

    for location in locations.iter().filter(|l| l.count > 0) {
        let region = location
            .region
            .clone()
            .unwrap_or_else(|| OTHER_REGION_LABEL.to_string());
        let entry = tallies.entry(region.clone()).or_insert_with(|| {
            order.push(region);
            (0, 0)
        });
        entry.0 += location.count;
        if location.code.is_some() {
            entry.1 += 1;
        }
    }

    let total = view.len() as f64;
    order
        .into_iter()
        .map(|region| {
            let (count, locations) = tallies.get(&region).copied().unwrap_or_default();
            (region, count, locations)
        })
        .sorted_by(|a, b| b.1.cmp(&a.1))
        .enumerate()
        .map(|(idx, (region, count, locations))| RegionSummary {
            rank: idx + 1,
            region,
            count,
            percentage: percentage(count as f64, total),
            locations,
        })
        .collect()
}
