pub mod classify;
pub mod cli;
pub mod config;
pub mod data;
pub mod error;
pub mod export;
pub mod filter;
pub mod frequency;
pub mod geography;
pub mod icp;
pub mod industry;
pub mod insight;
pub mod io_utils;
pub mod kpi;
pub mod normalize;
pub mod role_meta;
pub mod roles;
pub mod stats;
pub mod summary;
pub mod table;

use std::{env, io::Write, sync::OnceLock};

use anyhow::{Context, Result};
use clap::Parser;
use log::{LevelFilter, debug, info};
use serde::Serialize;
use serde_json::json;

use crate::{
    cli::{AnalysisArgs, Cli, Commands, InputArgs, OutputFormat},
    config::AnalysisConfig,
    export::{ExportFormat, LocationSummaryRecord, RoleMetadataRecord},
    filter::{FilterState, FilteredView, apply_filter},
    frequency::encode_breakdown,
    icp::IcpEvaluator,
    insight::InsightRequest,
    kpi::{KpiOptions, KpiSet, compute_kpis},
    normalize::{NormalizedDataset, load_dataset},
    role_meta::{active_role_columns, compute_role_metadata},
    summary::{LocationSummary, RegionSummary, compute_location_summaries, compute_region_summaries},
};

static LOGGER: OnceLock<()> = OnceLock::new();

fn init_logging() {
    LOGGER.get_or_init(|| {
        let mut builder = env_logger::Builder::from_env(env_logger::Env::default());
        if env::var("RUST_LOG").is_err() {
            builder.filter_module("sheet_insights", LevelFilter::Info);
        }
        let _ = builder.format_timestamp_millis().try_init();
    });
}

pub fn run() -> Result<()> {
    init_logging();
    let cli = Cli::parse();
    match cli.command {
        Commands::Classify(args) => handle_classify(&args),
        Commands::Normalize(args) => handle_normalize(&args),
        Commands::Summary(args) => handle_summary(&args),
        Commands::Roles(args) => handle_roles(&args),
        Commands::Stats(args) => stats::execute(&args),
        Commands::Export(args) => handle_export(&args),
        Commands::InsightRequest(args) => handle_insight_request(&args),
    }
}

/// Configuration plus the loaded dataset for one command invocation.
pub(crate) struct Session {
    pub config: AnalysisConfig,
    pub dataset: NormalizedDataset,
}

impl Session {
    pub(crate) fn open(input: &InputArgs) -> Result<Self> {
        info!(
            "Loading '{}' with delimiter '{}'",
            input.input.display(),
            printable_delimiter(io_utils::resolve_input_delimiter(&input.input, input.delimiter))
        );
        let config = AnalysisConfig::load_optional(input.config.as_deref())?;
        let registry = config.registry()?;
        let encoding = io_utils::resolve_encoding(input.input_encoding.as_deref())?;
        let table = io_utils::read_table(&input.input, input.delimiter, encoding)?;
        let mut dataset = load_dataset(&table, &registry)
            .with_context(|| format!("Loading dataset from {:?}", input.input))?;
        if let Some(columns) = &config.role_columns {
            dataset
                .set_role_columns(columns.clone())
                .context("Applying configured role columns")?;
        }
        info!(
            "Loaded {} row(s) across {} column(s) using geography profile '{}'",
            dataset.row_count(),
            dataset.columns.len(),
            dataset.profile.id
        );
        Ok(Self { config, dataset })
    }

    /// Command-line analysis options take precedence over the config file.
    pub(crate) fn apply_overrides(&mut self, args: &AnalysisArgs) -> Result<()> {
        if let Some(icp) = args.icp()? {
            self.config.icp = Some(icp);
        }
        if let Some(column) = &args.segment_column {
            self.config.segment_column = Some(column.clone());
        }
        if !args.role_columns.is_empty() {
            self.dataset
                .set_role_columns(args.role_columns.clone())
                .context("Applying --role-columns")?;
        }
        Ok(())
    }

    fn icp(&self) -> Result<Option<IcpEvaluator>> {
        self.config
            .icp
            .as_ref()
            .map(|icp| icp.compile(&self.dataset))
            .transpose()
            .context("Compiling ICP configuration")
    }

    fn kpis(&self, view: &FilteredView<'_>, filter: &FilterState) -> Result<KpiSet> {
        let icp = self.icp()?;
        let role_columns = active_role_columns(&self.dataset, filter);
        let options = KpiOptions {
            icp: icp.as_ref(),
            segment_column: self.config.segment_column.as_deref(),
            role_columns: &role_columns,
        };
        Ok(compute_kpis(view, &options)?)
    }

    fn top_n(&self, requested: Option<usize>) -> usize {
        requested.unwrap_or(self.config.top_n)
    }
}

fn handle_classify(args: &cli::ClassifyArgs) -> Result<()> {
    let session = Session::open(&args.input)?;
    let dataset = &session.dataset;
    match args.format {
        OutputFormat::Json => print_json(&json!({
            "profile": {
                "id": dataset.profile.id,
                "display_name": dataset.profile.display_name,
                "location_label": dataset.profile.location_label,
                "region_label": dataset.profile.region_label,
                "map_type": dataset.profile.map_type,
            },
            "columns": dataset.columns,
            "derived": dataset.derived,
            "role_columns": dataset.role_columns(),
        })),
        OutputFormat::Table => {
            println!(
                "Geography profile: {} ({})",
                dataset.profile.display_name, dataset.profile.id
            );
            let headers = ["column", "type", "roles", "samples"].map(String::from);
            let rows = dataset
                .columns
                .iter()
                .map(|column| {
                    vec![
                        column.name.clone(),
                        column.column_type.to_string(),
                        column.roles.to_string(),
                        column
                            .sample_values
                            .iter()
                            .map(|v| v.as_display())
                            .collect::<Vec<_>>()
                            .join(" | "),
                    ]
                })
                .collect::<Vec<_>>();
            table::print_table(&headers, &rows);
            for derived in &dataset.derived {
                println!("Derived field '{}' from '{}'", derived.name, derived.source);
            }
            Ok(())
        }
    }
}

fn handle_normalize(args: &cli::NormalizeArgs) -> Result<()> {
    let session = Session::open(&args.input)?;
    let filter = args.filter.to_state()?;
    filter.validate(&session.dataset)?;
    let view = apply_filter(&session.dataset, &filter);
    let headers = session.dataset.headers();

    let destination = args.output.as_deref();
    let format = destination.map_or(ExportFormat::Csv, ExportFormat::from_path);
    let writer = io_utils::open_output(destination)?;
    match format {
        ExportFormat::Json => {
            let rows = view
                .rows()
                .map(|row| session.dataset.row_json(row))
                .collect::<Vec<_>>();
            serde_json::to_writer_pretty(writer, &rows).context("Writing normalized JSON")?;
        }
        ExportFormat::Csv => {
            let delimiter = destination.map_or(
                args.output_delimiter.unwrap_or(io_utils::DEFAULT_CSV_DELIMITER),
                |path| io_utils::resolve_output_delimiter(path, args.output_delimiter),
            );
            let mut csv_writer = csv::WriterBuilder::new()
                .delimiter(delimiter)
                .from_writer(writer);
            csv_writer
                .write_record(headers)
                .context("Writing output headers")?;
            for (idx, row) in view.rows().enumerate() {
                let record = row
                    .values()
                    .iter()
                    .map(|value| value.as_ref().map(|v| v.as_display()).unwrap_or_default())
                    .collect::<Vec<_>>();
                csv_writer
                    .write_record(&record)
                    .with_context(|| format!("Writing output row {}", idx + 1))?;
            }
            csv_writer.flush().context("Flushing output")?;
        }
    }
    info!(
        "Wrote {} normalized row(s) with {} field(s)",
        view.len(),
        headers.len()
    );
    Ok(())
}

fn handle_summary(args: &cli::SummaryArgs) -> Result<()> {
    let mut session = Session::open(&args.input)?;
    session.apply_overrides(&args.analysis)?;
    let filter = args.filter.to_state()?;
    filter.validate(&session.dataset)?;
    let view = apply_filter(&session.dataset, &filter);
    let kpis = session.kpis(&view, &filter)?;
    let role_columns = active_role_columns(&session.dataset, &filter);
    let mut locations = compute_location_summaries(
        &view,
        &args.breakdown.source(),
        &role_columns,
        session.top_n(args.breakdown.top),
    )?;
    let mut regions = compute_region_summaries(&view, &locations);
    if args.hide_empty {
        locations.retain(|l| l.count > 0);
        regions.retain(|r| r.count > 0);
    }
    debug!(
        "Summary produced {} location(s) and {} region(s)",
        locations.len(),
        regions.len()
    );

    match args.format {
        OutputFormat::Json => print_json(&json!({
            "profile": session.dataset.profile.id,
            "kpis": kpis,
            "locations": locations,
            "regions": regions,
        })),
        OutputFormat::Table => {
            print_kpis(&kpis);
            println!();
            print_locations(&locations, &session.dataset.profile.location_label);
            if !regions.is_empty() {
                println!();
                print_regions(&regions, &session.dataset.profile.region_label);
            }
            Ok(())
        }
    }
}

fn handle_roles(args: &cli::RolesArgs) -> Result<()> {
    let mut session = Session::open(&args.input)?;
    session.apply_overrides(&args.analysis)?;
    let filter = args.filter.to_state()?;
    filter.validate(&session.dataset)?;
    let view = apply_filter(&session.dataset, &filter);
    let role_columns = active_role_columns(&session.dataset, &filter);
    let metadata = compute_role_metadata(&view, &role_columns)?;
    info!(
        "Computed role metadata for {} column(s) over {} row(s)",
        metadata.len(),
        view.len()
    );
    match args.format {
        OutputFormat::Json => print_json(&metadata),
        OutputFormat::Table => {
            let headers = ["column", "category", "total", "percent"].map(String::from);
            let rows = metadata
                .iter()
                .map(|meta| {
                    vec![
                        meta.column.clone(),
                        meta.category.to_string(),
                        data::format_number(meta.total),
                        format!("{:.2}%", meta.percentage),
                    ]
                })
                .collect::<Vec<_>>();
            table::print_table(&headers, &rows);
            Ok(())
        }
    }
}

fn handle_export(args: &cli::ExportArgs) -> Result<()> {
    let mut session = Session::open(&args.input)?;
    session.apply_overrides(&args.analysis)?;
    let filter = args.filter.to_state()?;
    filter.validate(&session.dataset)?;
    let view = apply_filter(&session.dataset, &filter);
    let role_columns = active_role_columns(&session.dataset, &filter);
    match args.kind {
        cli::ExportKind::Locations => {
            let records = compute_location_summaries(
                &view,
                &args.breakdown.source(),
                &role_columns,
                session.top_n(args.breakdown.top),
            )?
            .iter()
            .map(LocationSummaryRecord::from)
            .collect::<Vec<_>>();
            export::export_to_path(&records, &args.output, args.output_delimiter)?;
            info!(
                "Exported {} location summary record(s) to {:?}",
                records.len(),
                args.output
            );
        }
        cli::ExportKind::Roles => {
            let records = compute_role_metadata(&view, &role_columns)?
                .iter()
                .map(RoleMetadataRecord::from)
                .collect::<Vec<_>>();
            export::export_to_path(&records, &args.output, args.output_delimiter)?;
            info!(
                "Exported {} role metadata record(s) to {:?}",
                records.len(),
                args.output
            );
        }
    }
    Ok(())
}

fn handle_insight_request(args: &cli::InsightRequestArgs) -> Result<()> {
    let mut session = Session::open(&args.input)?;
    session.apply_overrides(&args.analysis)?;
    let filter = args.filter.to_state()?;
    filter.validate(&session.dataset)?;
    let view = apply_filter(&session.dataset, &filter);
    let kpis = session.kpis(&view, &filter)?;
    let cap = args.sample_cap.unwrap_or(session.config.insight_sample_cap);
    let request = InsightRequest::build(&view, &filter, kpis, cap);

    let mut writer = io_utils::open_output(args.output.as_deref())?;
    serde_json::to_writer_pretty(&mut writer, &request).context("Writing insight request")?;
    writeln!(writer).context("Writing insight request")?;
    writer.flush().context("Flushing insight request")?;
    info!(
        "Built insight request with {} sampled row(s) of {}",
        request.sample.len(),
        request.row_count
    );
    Ok(())
}

fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<()> {
    let rendered = serde_json::to_string_pretty(value).context("Serializing JSON output")?;
    println!("{rendered}");
    Ok(())
}

fn print_kpis(kpis: &KpiSet) {
    let headers = ["metric", "value"].map(String::from);
    let mut rows = vec![
        vec!["total_rows".to_string(), kpis.total_rows.to_string()],
        vec!["qualified".to_string(), kpis.qualified.to_string()],
        vec![
            "qualified_percent".to_string(),
            format!("{:.2}%", kpis.qualified_percentage),
        ],
        vec![
            "distinct_locations".to_string(),
            kpis.distinct_locations.to_string(),
        ],
        vec![
            "industry_breakdown".to_string(),
            encode_breakdown(&kpis.industry_breakdown),
        ],
    ];
    if let Some(column) = &kpis.segment_column {
        rows.push(vec![
            format!("segments ({column})"),
            encode_breakdown(&kpis.segment_breakdown),
        ]);
    }
    rows.push(vec![
        "role_total".to_string(),
        data::format_number(kpis.role_total),
    ]);
    rows.push(vec![
        "role_categories".to_string(),
        encode_breakdown(&kpis.role_category_totals),
    ]);
    table::print_table(&headers, &rows);
}

fn print_locations(locations: &[LocationSummary], label: &str) {
    let label = label.to_lowercase();
    let headers = [
        "rank",
        "code",
        label.as_str(),
        "region",
        "count",
        "percent",
        "top",
    ]
    .map(String::from);
    let rows = locations
        .iter()
        .map(|l| {
            vec![
                l.rank.to_string(),
                l.code.clone().unwrap_or_default(),
                l.name.clone(),
                l.region.clone().unwrap_or_default(),
                l.count.to_string(),
                format!("{:.2}%", l.percentage),
                encode_breakdown(&l.top),
            ]
        })
        .collect::<Vec<_>>();
    table::print_table(&headers, &rows);
}

fn print_regions(regions: &[RegionSummary], label: &str) {
    let label = label.to_lowercase();
    let headers = ["rank", label.as_str(), "count", "percent", "locations"].map(String::from);
    let rows = regions
        .iter()
        .map(|r| {
            vec![
                r.rank.to_string(),
                r.region.clone(),
                r.count.to_string(),
                format!("{:.2}%", r.percentage),
                r.locations.to_string(),
            ]
        })
        .collect::<Vec<_>>();
    table::print_table(&headers, &rows);
}

pub(crate) fn printable_delimiter(delimiter: u8) -> String {
    match delimiter {
        b',' => ",".to_string(),
        b'\t' => "\\t".to_string(),
        other => (other as char).to_string(),
    }
}
