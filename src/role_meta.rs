use itertools::Itertools;
use log::debug;
use serde::{Deserialize, Serialize};

use crate::{
    error::UnknownColumn,
    filter::{FilterState, FilteredView},
    frequency::percentage,
    industry::{IndustryCategory, classify_industry},
    normalize::NormalizedDataset,
};

/// Population carried by one wide-format role column across the filtered rows.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoleMetadata {
    pub column: String,
    pub total: f64,
    pub percentage: f64,
    pub category: IndustryCategory,
}

/// Role columns in play for a filter: the dataset's role columns, narrowed to
/// the selected ones when a role selection is active.
pub fn active_role_columns(dataset: &NormalizedDataset, filter: &FilterState) -> Vec<String> {
    dataset
        .role_columns()
        .iter()
        .filter(|name| filter.selected_roles.is_empty() || filter.selected_roles.contains(*name))
        .cloned()
        .collect()
}

/// Sums each role column over the view and ranks the columns by total.
///
/// Null and non-numeric cells add nothing. Percentages are shares of the
/// grand total across the given columns; equal totals keep column order.
pub fn compute_role_metadata(
    view: &FilteredView<'_>,
    role_columns: &[String],
) -> Result<Vec<RoleMetadata>, UnknownColumn> {
    let dataset = view.dataset();
    let fields = role_columns
        .iter()
        .map(|name| dataset.require_field(name))
        .collect::<Result<Vec<_>, _>>()?;

    let totals = fields
        .iter()
        .map(|idx| view.rows().filter_map(|row| row.number(*idx)).sum::<f64>())
        .collect::<Vec<_>>();
    let grand_total = totals.iter().sum::<f64>();
    debug!(
        "Role metadata over {} column(s), grand total {grand_total}",
        role_columns.len()
    );

    Ok(role_columns
        .iter()
        .zip(totals)
        .map(|(column, total)| RoleMetadata {
            column: column.clone(),
            total,
            percentage: percentage(total, grand_total),
            category: classify_industry(column),
        })
        .sorted_by(|a, b| b.total.total_cmp(&a.total))
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        data::RawValue,
        filter::apply_filter,
        geography::ProfileRegistry,
        normalize::{RawTable, load_dataset},
    };

    fn dataset() -> NormalizedDataset {
        let headers = ["State", "Stylists", "Sound Engineers", "Grips"];
        let rows: &[[&str; 4]] = &[
            ["CA", "2", "1", "1"],
            ["NY", "1", "", "2"],
            ["TX", "1", "3", "abc"],
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

    #[test]
    fn totals_rank_with_column_order_tie_break() {
        let dataset = dataset();
        let view = FilteredView::all(&dataset);
        let meta = compute_role_metadata(&view, dataset.role_columns()).unwrap();
        let order = meta.iter().map(|m| m.column.as_str()).collect::<Vec<_>>();
        assert_eq!(order, vec!["Stylists", "Sound Engineers", "Grips"]);
        assert_eq!(meta[0].total, 4.0);
        assert_eq!(meta[0].category, IndustryCategory::FashionApparel);
        assert_eq!(meta[1].category, IndustryCategory::MusicAudio);
        assert_eq!(meta[2].category, IndustryCategory::FilmTelevision);
        assert_eq!(meta[2].total, 3.0);
        let sum = meta.iter().map(|m| m.percentage).sum::<f64>();
        assert!((sum - 100.0).abs() < 1e-9);
    }

    #[test]
    fn selected_roles_narrow_the_columns() {
        let dataset = dataset();
        let mut filter = FilterState::default();
        filter.selected_roles.insert("Grips".into());
        assert_eq!(active_role_columns(&dataset, &filter), vec!["Grips"]);
        let view = apply_filter(&dataset, &filter);
        let meta = compute_role_metadata(&view, &active_role_columns(&dataset, &filter)).unwrap();
        assert_eq!(meta.len(), 1);
        assert_eq!(meta[0].percentage, 100.0);
    }

    #[test]
    fn empty_view_yields_zero_percentages() {
        let dataset = dataset();
        let filter = FilterState {
            search_text: Some("nothing matches this".into()),
            ..FilterState::default()
        };
        let view = apply_filter(&dataset, &filter);
        assert!(view.is_empty());
        let meta = compute_role_metadata(&view, dataset.role_columns()).unwrap();
        assert!(meta.iter().all(|m| m.total == 0.0 && m.percentage == 0.0));
    }

    #[test]
    fn unknown_role_column_is_reported() {
        let dataset = dataset();
        let view = FilteredView::all(&dataset);
        let err = compute_role_metadata(&view, &["Drivers".to_string()]).unwrap_err();
        assert_eq!(err, UnknownColumn("Drivers".into()));
    }
}
