use std::{collections::BTreeSet, path::PathBuf};

use anyhow::{Context, Result, anyhow};
use clap::{Args, Parser, Subcommand, ValueEnum};

use crate::{
    filter::{CategoryMode, DateRange, FilterState},
    icp::{IcpConfig, IcpRule},
    industry::IndustryCategory,
    io_utils::parse_delimiter,
    summary::BreakdownSource,
};

#[derive(Debug, Parser)]
#[command(
    author,
    version,
    about = "Classify, normalize, and summarize spreadsheet exports",
    long_about = None
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Show inferred column types, roles, and the detected geography profile
    Classify(ClassifyArgs),
    /// Write normalized rows, including derived code and category fields
    Normalize(NormalizeArgs),
    /// KPI totals with per-location and per-region summaries
    Summary(SummaryArgs),
    /// Totals for wide-format role columns with their industry category
    Roles(RolesArgs),
    /// Per-column statistics over the filtered rows
    Stats(StatsArgs),
    /// Export location summaries or role metadata as CSV or JSON records
    Export(ExportArgs),
    /// Build the JSON request sent to the external insight service
    InsightRequest(InsightRequestArgs),
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    #[default]
    Table,
    Json,
}

#[derive(Debug, Args)]
pub struct InputArgs {
    /// Input file (.csv, .tsv, or .json; '-' reads CSV from stdin)
    #[arg(short = 'i', long = "input")]
    pub input: PathBuf,
    /// CSV delimiter character (supports ',', 'tab', ';', '|')
    #[arg(long, value_parser = parse_delimiter)]
    pub delimiter: Option<u8>,
    /// Character encoding of the input file (defaults to utf-8)
    #[arg(long = "input-encoding")]
    pub input_encoding: Option<String>,
    /// YAML analysis configuration (ICP, role columns, extra geography profiles)
    #[arg(long)]
    pub config: Option<PathBuf>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum CategoryModeArg {
    And,
    #[default]
    Or,
}

impl From<CategoryModeArg> for CategoryMode {
    fn from(value: CategoryModeArg) -> Self {
        match value {
            CategoryModeArg::And => CategoryMode::And,
            CategoryModeArg::Or => CategoryMode::Or,
        }
    }
}

#[derive(Debug, Args, Default)]
pub struct FilterArgs {
    /// Keep rows whose resolved location code is in this list
    #[arg(long = "location", value_delimiter = ',', action = clap::ArgAction::Append)]
    pub locations: Vec<String>,
    /// Keep rows whose location falls in one of these regions
    #[arg(long = "region", value_delimiter = ',', action = clap::ArgAction::Append)]
    pub regions: Vec<String>,
    /// Industry categories to match (e.g. 'Fashion & Apparel' or 'music')
    #[arg(long = "category", value_delimiter = ',', action = clap::ArgAction::Append)]
    pub categories: Vec<String>,
    /// Role columns that must carry a positive headcount
    #[arg(long = "role", value_delimiter = ',', action = clap::ArgAction::Append)]
    pub roles: Vec<String>,
    /// Whether a row needs all selected categories or any of them
    #[arg(long = "category-mode", value_enum, default_value_t = CategoryModeArg::Or)]
    pub category_mode: CategoryModeArg,
    /// Case-insensitive text that must appear in some field of the row
    #[arg(long)]
    pub search: Option<String>,
    /// Earliest date to keep (inclusive)
    #[arg(long)]
    pub from: Option<String>,
    /// Latest date to keep (inclusive)
    #[arg(long)]
    pub to: Option<String>,
    /// Date column used by --from/--to (defaults to the first date column)
    #[arg(long = "date-column")]
    pub date_column: Option<String>,
}

impl FilterArgs {
    pub fn to_state(&self) -> Result<FilterState> {
        let categories = self
            .categories
            .iter()
            .map(|raw| raw.parse::<IndustryCategory>())
            .collect::<Result<BTreeSet<_>>>()?;
        let date_range = if self.from.is_some() || self.to.is_some() {
            Some(
                DateRange::parse(
                    self.from.as_deref(),
                    self.to.as_deref(),
                    self.date_column.clone(),
                )
                .context("Parsing --from/--to")?,
            )
        } else if self.date_column.is_some() {
            return Err(anyhow!("--date-column requires --from or --to"));
        } else {
            None
        };
        Ok(FilterState {
            selected_locations: trimmed(&self.locations).map(str::to_string).collect(),
            selected_regions: trimmed(&self.regions).map(str::to_string).collect(),
            selected_categories: categories,
            selected_roles: trimmed(&self.roles).map(str::to_string).collect(),
            category_mode: self.category_mode.into(),
            search_text: self.search.clone(),
            date_range,
        })
    }
}

fn trimmed(values: &[String]) -> impl Iterator<Item = &str> {
    values.iter().map(|v| v.trim()).filter(|v| !v.is_empty())
}

#[derive(Debug, Args, Default)]
pub struct AnalysisArgs {
    /// ICP rule such as `Tier = A`, `Employees > 50`, or `State in CA,NY`; rules combine with AND
    #[arg(long = "icp-rule", action = clap::ArgAction::Append)]
    pub icp_rules: Vec<String>,
    /// Column whose truthy values mark a row as ICP-qualified
    #[arg(long = "icp-flag", conflicts_with = "icp_rules")]
    pub icp_flag: Option<String>,
    /// Segmentation column for the KPI breakdown
    #[arg(long = "segment-column")]
    pub segment_column: Option<String>,
    /// Wide-format role columns (defaults to numeric columns without a role)
    #[arg(long = "role-columns", value_delimiter = ',')]
    pub role_columns: Vec<String>,
}

impl AnalysisArgs {
    /// ICP configuration given on the command line, if any.
    pub fn icp(&self) -> Result<Option<IcpConfig>> {
        if let Some(column) = &self.icp_flag {
            return Ok(Some(IcpConfig::Flag {
                column: column.clone(),
            }));
        }
        if self.icp_rules.is_empty() {
            return Ok(None);
        }
        let rules = self
            .icp_rules
            .iter()
            .map(|raw| IcpRule::parse(raw))
            .collect::<Result<Vec<_>>>()?;
        Ok(Some(IcpConfig::Rules { rules }))
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum BreakdownArg {
    #[default]
    Category,
    Roles,
}

#[derive(Debug, Args, Default)]
pub struct BreakdownArgs {
    /// Number of entries in each location's top breakdown
    #[arg(long)]
    pub top: Option<usize>,
    /// What the per-location breakdown counts
    #[arg(long, value_enum, default_value_t = BreakdownArg::Category)]
    pub breakdown: BreakdownArg,
    /// Break locations down by the values of this column instead
    #[arg(long = "breakdown-column")]
    pub breakdown_column: Option<String>,
}

impl BreakdownArgs {
    pub fn source(&self) -> BreakdownSource {
        match (&self.breakdown_column, self.breakdown) {
            (Some(column), _) => BreakdownSource::Column(column.clone()),
            (None, BreakdownArg::Roles) => BreakdownSource::RoleColumns,
            (None, BreakdownArg::Category) => BreakdownSource::Category,
        }
    }
}

#[derive(Debug, Args)]
pub struct ClassifyArgs {
    #[command(flatten)]
    pub input: InputArgs,
    #[arg(long, value_enum, default_value_t = OutputFormat::Table)]
    pub format: OutputFormat,
}

#[derive(Debug, Args)]
pub struct NormalizeArgs {
    #[command(flatten)]
    pub input: InputArgs,
    #[command(flatten)]
    pub filter: FilterArgs,
    /// Output file (.csv, .tsv, or .json; stdout as CSV if omitted)
    #[arg(short = 'o', long = "output")]
    pub output: Option<PathBuf>,
    /// Output delimiter for CSV output
    #[arg(long = "output-delimiter", value_parser = parse_delimiter)]
    pub output_delimiter: Option<u8>,
}

#[derive(Debug, Args)]
pub struct SummaryArgs {
    #[command(flatten)]
    pub input: InputArgs,
    #[command(flatten)]
    pub filter: FilterArgs,
    #[command(flatten)]
    pub analysis: AnalysisArgs,
    #[command(flatten)]
    pub breakdown: BreakdownArgs,
    /// Leave out locations and regions without any rows
    #[arg(long = "hide-empty")]
    pub hide_empty: bool,
    #[arg(long, value_enum, default_value_t = OutputFormat::Table)]
    pub format: OutputFormat,
}

#[derive(Debug, Args)]
pub struct RolesArgs {
    #[command(flatten)]
    pub input: InputArgs,
    #[command(flatten)]
    pub filter: FilterArgs,
    #[command(flatten)]
    pub analysis: AnalysisArgs,
    #[arg(long, value_enum, default_value_t = OutputFormat::Table)]
    pub format: OutputFormat,
}

#[derive(Debug, Args)]
pub struct StatsArgs {
    #[command(flatten)]
    pub input: InputArgs,
    #[command(flatten)]
    pub filter: FilterArgs,
    /// Columns to profile (defaults to every source column)
    #[arg(short = 'C', long = "columns", value_delimiter = ',')]
    pub columns: Vec<String>,
    #[arg(long, value_enum, default_value_t = OutputFormat::Table)]
    pub format: OutputFormat,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ExportKind {
    Locations,
    Roles,
}

#[derive(Debug, Args)]
pub struct ExportArgs {
    #[command(flatten)]
    pub input: InputArgs,
    #[command(flatten)]
    pub filter: FilterArgs,
    #[command(flatten)]
    pub analysis: AnalysisArgs,
    #[command(flatten)]
    pub breakdown: BreakdownArgs,
    /// Which records to export
    #[arg(long, value_enum)]
    pub kind: ExportKind,
    /// Destination file (.csv, .tsv, or .json; '-' for stdout)
    #[arg(short = 'o', long = "output")]
    pub output: PathBuf,
    /// Output delimiter for CSV output
    #[arg(long = "output-delimiter", value_parser = parse_delimiter)]
    pub output_delimiter: Option<u8>,
}

#[derive(Debug, Args)]
pub struct InsightRequestArgs {
    #[command(flatten)]
    pub input: InputArgs,
    #[command(flatten)]
    pub filter: FilterArgs,
    #[command(flatten)]
    pub analysis: AnalysisArgs,
    /// Maximum number of rows included in the request sample
    #[arg(long = "sample-cap")]
    pub sample_cap: Option<usize>,
    /// Destination file (stdout if omitted)
    #[arg(short = 'o', long = "output")]
    pub output: Option<PathBuf>,
}
