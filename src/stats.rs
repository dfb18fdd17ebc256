use anyhow::Result;
use chrono::NaiveDateTime;
use log::info;
use serde::{Deserialize, Serialize};

use crate::{
    Session,
    classify::ColumnType,
    cli::{OutputFormat, StatsArgs},
    data::{Value, format_date, format_number, span_in_days},
    error::UnknownColumn,
    filter::{FilteredView, apply_filter},
    frequency::{FrequencyCounter, RankedCount},
    table,
};

pub fn execute(args: &StatsArgs) -> Result<()> {
    let session = Session::open(&args.input)?;
    let filter = args.filter.to_state()?;
    filter.validate(&session.dataset)?;
    let view = apply_filter(&session.dataset, &filter);
    let columns = args
        .columns
        .iter()
        .map(|c| c.trim())
        .filter(|c| !c.is_empty())
        .map(str::to_string)
        .collect::<Vec<_>>();
    let stats = compute_column_statistics(&view, &columns)?;
    match args.format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&stats)?);
        }
        OutputFormat::Table => {
            let headers = [
                "column", "type", "count", "min", "max", "mean", "median", "std_dev", "detail",
            ]
            .map(String::from);
            table::print_table(&headers, &render_rows(&stats));
        }
    }
    Ok(())
}

/// Length of the frequency table kept for categorical columns.
pub const CATEGORICAL_TOP: usize = 10;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnStatistics {
    pub column: String,
    #[serde(rename = "type")]
    pub column_type: ColumnType,
    #[serde(flatten)]
    pub details: StatisticsDetails,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum StatisticsDetails {
    Numeric(NumericStats),
    Categorical(CategoricalStats),
    Date(DateStats),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NumericStats {
    pub count: usize,
    pub min: Option<f64>,
    pub max: Option<f64>,
    pub sum: f64,
    pub mean: Option<f64>,
    pub median: Option<f64>,
    pub std_dev: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoricalStats {
    pub count: usize,
    pub distinct: usize,
    pub top: Vec<RankedCount>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DateStats {
    pub count: usize,
    pub earliest: Option<NaiveDateTime>,
    pub latest: Option<NaiveDateTime>,
    pub span_days: Option<i64>,
}

#[derive(Debug, Default)]
struct NumericAccumulator {
    values: Vec<f64>,
    sum: f64,
    sum_squares: f64,
    min: Option<f64>,
    max: Option<f64>,
}

impl NumericAccumulator {
    fn add(&mut self, value: f64) {
        self.sum += value;
        self.sum_squares += value * value;
        self.min = Some(self.min.map_or(value, |current| current.min(value)));
        self.max = Some(self.max.map_or(value, |current| current.max(value)));
        self.values.push(value);
    }

    fn count(&self) -> usize {
        self.values.len()
    }

    fn mean(&self) -> Option<f64> {
        (self.count() > 0).then(|| self.sum / self.count() as f64)
    }

    fn median(&self) -> Option<f64> {
        if self.values.is_empty() {
            return None;
        }
        let mut sorted = self.values.clone();
        sorted.sort_by(f64::total_cmp);
        let mid = sorted.len() / 2;
        if sorted.len().is_multiple_of(2) {
            Some((sorted[mid - 1] + sorted[mid]) / 2.0)
        } else {
            Some(sorted[mid])
        }
    }

    fn std_dev(&self) -> Option<f64> {
        let count = self.count();
        if count < 2 {
            return None;
        }
        let mean = self.mean()?;
        let variance = (self.sum_squares - count as f64 * mean * mean) / (count as f64 - 1.0);
        Some(variance.max(0.0).sqrt())
    }

    fn finish(self) -> NumericStats {
        NumericStats {
            count: self.count(),
            min: self.min,
            max: self.max,
            sum: self.sum,
            mean: self.mean(),
            median: self.median(),
            std_dev: self.std_dev(),
        }
    }
}

#[derive(Debug, Default)]
struct DateAccumulator {
    count: usize,
    earliest: Option<NaiveDateTime>,
    latest: Option<NaiveDateTime>,
}

impl DateAccumulator {
    fn add(&mut self, value: NaiveDateTime) {
        self.count += 1;
        self.earliest = Some(self.earliest.map_or(value, |current| current.min(value)));
        self.latest = Some(self.latest.map_or(value, |current| current.max(value)));
    }

    fn finish(self) -> DateStats {
        DateStats {
            count: self.count,
            earliest: self.earliest,
            latest: self.latest,
            span_days: self
                .earliest
                .zip(self.latest)
                .map(|(earliest, latest)| span_in_days(earliest, latest)),
        }
    }
}

/// Statistics for the named columns over the view; an empty list means
/// every source column. Derived fields are summarized as text.
pub fn compute_column_statistics(
    view: &FilteredView<'_>,
    columns: &[String],
) -> Result<Vec<ColumnStatistics>, UnknownColumn> {
    let dataset = view.dataset();
    let targets = if columns.is_empty() {
        dataset
            .columns
            .iter()
            .map(|column| (column.name.clone(), column.column_type))
            .collect::<Vec<_>>()
    } else {
        columns
            .iter()
            .map(|name| {
                dataset.require_field(name)?;
                let column_type = dataset
                    .column(name)
                    .map_or(ColumnType::Text, |column| column.column_type);
                Ok((name.clone(), column_type))
            })
            .collect::<Result<Vec<_>, UnknownColumn>>()?
    };

    let mut stats = Vec::with_capacity(targets.len());
    for (name, column_type) in targets {
        let idx = dataset.require_field(&name)?;
        let values = view.rows().filter_map(|row| row.get(idx));
        let details = match column_type {
            ColumnType::Number => {
                let mut acc = NumericAccumulator::default();
                values.filter_map(Value::as_number).for_each(|n| acc.add(n));
                StatisticsDetails::Numeric(acc.finish())
            }
            ColumnType::Date => {
                let mut acc = DateAccumulator::default();
                values.filter_map(Value::as_date).for_each(|d| acc.add(d));
                StatisticsDetails::Date(acc.finish())
            }
            ColumnType::Text | ColumnType::Boolean | ColumnType::Location => {
                let mut counter = FrequencyCounter::new();
                let mut count = 0;
                for value in values {
                    count += 1;
                    counter.increment(&value.as_display());
                }
                StatisticsDetails::Categorical(CategoricalStats {
                    count,
                    distinct: counter.distinct(),
                    top: counter.top(CATEGORICAL_TOP),
                })
            }
        };
        stats.push(ColumnStatistics {
            column: name,
            column_type,
            details,
        });
    }
    info!(
        "Computed statistics for {} column(s) over {} row(s)",
        stats.len(),
        view.len()
    );
    Ok(stats)
}

/// Flattens statistics into `column, type, count, min, max, mean, median,
/// std_dev, detail` table rows.
pub fn render_rows(stats: &[ColumnStatistics]) -> Vec<Vec<String>> {
    let metric = |value: Option<f64>| value.map(format_metric).unwrap_or_default();
    stats
        .iter()
        .map(|stat| {
            let mut row = vec![stat.column.clone(), stat.column_type.to_string()];
            match &stat.details {
                StatisticsDetails::Numeric(n) => row.extend([
                    n.count.to_string(),
                    metric(n.min),
                    metric(n.max),
                    metric(n.mean),
                    metric(n.median),
                    metric(n.std_dev),
                    format!("sum={}", format_metric(n.sum)),
                ]),
                StatisticsDetails::Date(d) => row.extend([
                    d.count.to_string(),
                    d.earliest.as_ref().map(format_date).unwrap_or_default(),
                    d.latest.as_ref().map(format_date).unwrap_or_default(),
                    String::new(),
                    String::new(),
                    String::new(),
                    d.span_days
                        .map(|days| format!("span={days} days"))
                        .unwrap_or_default(),
                ]),
                StatisticsDetails::Categorical(c) => row.extend([
                    c.count.to_string(),
                    String::new(),
                    String::new(),
                    String::new(),
                    String::new(),
                    String::new(),
                    format!(
                        "distinct={}; top: {}",
                        c.distinct,
                        crate::frequency::encode_breakdown(&c.top)
                    ),
                ]),
            }
            row
        })
        .collect()
}

fn format_metric(value: f64) -> String {
    if value.fract() == 0.0 {
        format_number(value)
    } else {
        format!("{value:.4}")
    }
}
