//! Check command - reconcile documents against a reference price list.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};

use clap::Args;
use console::style;
use glob::glob;
use indicatif::{ProgressBar, ProgressStyle};
use tracing::{debug, warn};

use listino_core::models::{DocumentReport, MatchStatus, RunOutput};
use listino_core::report::to_json;
use listino_core::{HttpSummarizer, ListinoError, Pipeline};

use super::{build_renderer, load_config};

/// Arguments for the check command.
#[derive(Args)]
pub struct CheckArgs {
    /// Input files or glob patterns
    #[arg(required = true)]
    inputs: Vec<String>,

    /// Reference price list (xlsx, xls, ods or csv)
    #[arg(short, long)]
    reference: PathBuf,

    /// Output directory for reports.json, report.md and summary.csv
    #[arg(short, long)]
    output_dir: Option<PathBuf>,

    /// Format printed to stdout when no output directory is given
    #[arg(short, long, value_enum, default_value = "markdown")]
    format: CheckFormat,

    /// Also generate a summary CSV
    #[arg(long)]
    summary: bool,

    /// Number of parallel workers
    #[arg(short = 'j', long)]
    jobs: Option<usize>,

    /// Skip narrative generation and use the plain tables
    #[arg(long)]
    no_narrative: bool,
}

#[derive(Clone, Copy, Debug, clap::ValueEnum)]
pub enum CheckFormat {
    /// Structured reports as JSON
    Json,
    /// Narrative report (or plain tables) as Markdown
    Markdown,
    /// One row per compared field
    Csv,
}

pub async fn run(args: CheckArgs, config_path: Option<&str>) -> anyhow::Result<()> {
    let start = Instant::now();

    let mut config = load_config(config_path)?;
    if let Some(jobs) = args.jobs {
        config.pipeline.workers = jobs.max(1);
    }

    let files = expand_inputs(&args.inputs)?;
    if files.is_empty() {
        anyhow::bail!("No matching files found for: {}", args.inputs.join(" "));
    }

    eprintln!(
        "{} Found {} files to check",
        style("ℹ").blue(),
        files.len()
    );

    let mut pipeline = Pipeline::new(config.clone()).with_renderer(Arc::new(build_renderer(&config)));
    if !args.no_narrative {
        match HttpSummarizer::from_config(&config.narrative) {
            Ok(summarizer) => pipeline = pipeline.with_summarizer(Arc::new(summarizer)),
            Err(e) => debug!("Narrative generation disabled: {}", e),
        }
    }

    let spinner = ProgressBar::new_spinner();
    spinner.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.green} [{elapsed_precise}] {msg}")?,
    );
    spinner.set_message(format!("Reconciling {} documents...", files.len()));
    spinner.enable_steady_tick(Duration::from_millis(100));

    let output = match pipeline.run(&files, &args.reference).await {
        Ok(output) => output,
        Err(ListinoError::Validation(e)) => {
            spinner.finish_and_clear();
            anyhow::bail!("Invalid reference sheet: {}", e);
        }
        Err(e) => {
            spinner.finish_and_clear();
            return Err(e.into());
        }
    };

    spinner.finish_and_clear();

    print_overview(&output.reports);

    match &args.output_dir {
        Some(output_dir) => write_outputs(output_dir, &output, args.summary)?,
        None => {
            let content = match args.format {
                CheckFormat::Json => to_json(&output.reports)?,
                CheckFormat::Markdown => output.narrative.text().to_string(),
                CheckFormat::Csv => summary_csv(&output.reports)?,
            };
            println!("{}", content);
        }
    }

    let failed = output.reports.iter().filter(|r| r.is_failed()).count();
    eprintln!();
    eprintln!(
        "{} Checked {} files in {:?}",
        style("✓").green(),
        output.reports.len(),
        start.elapsed()
    );
    eprintln!(
        "   {} processed, {} failed",
        style(output.reports.len() - failed).green(),
        style(failed).red()
    );

    Ok(())
}

/// Expand glob patterns, keeping literal paths that match nothing so that
/// they show up as failed documents.
fn expand_inputs(inputs: &[String]) -> anyhow::Result<Vec<PathBuf>> {
    let mut files = Vec::new();

    for input in inputs {
        let matches: Vec<PathBuf> = glob(input)?
            .filter_map(|r| r.ok())
            .filter(|p| p.is_file())
            .collect();

        if matches.is_empty() {
            if Path::new(input).exists() || !is_pattern(input) {
                warn!("No file matched {}", input);
                files.push(PathBuf::from(input));
            }
        } else {
            files.extend(matches);
        }
    }

    Ok(files)
}

fn is_pattern(input: &str) -> bool {
    input.contains(['*', '?', '['])
}

fn print_overview(reports: &[DocumentReport]) {
    for report in reports {
        if let Some(error) = &report.error {
            eprintln!(
                "  {} {}: {}",
                style("✗").red(),
                report.document_name,
                error
            );
            continue;
        }

        let ok = report.count(MatchStatus::Ok);
        let different = report.count(MatchStatus::Different);
        let not_found = report.count(MatchStatus::NotFound);
        let marker = if different == 0 && not_found == 0 {
            style("✓").green()
        } else {
            style("!").yellow()
        };

        eprintln!(
            "  {} {} [{}]: {} ok, {} different, {} not found",
            marker,
            report.document_name,
            report.identifiers.listing_code.as_deref().unwrap_or("-"),
            ok,
            different,
            not_found
        );
    }
}

fn write_outputs(output_dir: &Path, output: &RunOutput, summary: bool) -> anyhow::Result<()> {
    fs::create_dir_all(output_dir)?;

    let json_path = output_dir.join("reports.json");
    fs::write(&json_path, to_json(&output.reports)?)?;
    debug!("Wrote {}", json_path.display());

    let md_path = output_dir.join("report.md");
    fs::write(&md_path, output.narrative.text())?;
    debug!("Wrote {}", md_path.display());

    if summary {
        let summary_path = output_dir.join("summary.csv");
        fs::write(&summary_path, summary_csv(&output.reports)?)?;
        eprintln!(
            "{} Summary written to {}",
            style("✓").green(),
            summary_path.display()
        );
    }

    eprintln!(
        "{} Reports written to {}",
        style("✓").green(),
        output_dir.display()
    );

    Ok(())
}

/// One CSV row per comparison row; failed documents get a single row with
/// the error.
fn summary_csv(reports: &[DocumentReport]) -> anyhow::Result<String> {
    let mut wtr = csv::Writer::from_writer(vec![]);

    wtr.write_record([
        "document",
        "listing_code",
        "product_code",
        "field",
        "extracted_value",
        "expected_value",
        "status",
        "error",
    ])?;

    for report in reports {
        let listing_code = report.identifiers.listing_code.as_deref().unwrap_or("");
        let product_code = report.identifiers.product_code.as_deref().unwrap_or("");

        if let Some(error) = &report.error {
            wtr.write_record([
                report.document_name.as_str(),
                "",
                "",
                "",
                "",
                "",
                "failed",
                error.as_str(),
            ])?;
            continue;
        }

        for row in &report.comparison_rows {
            let status = serde_json::to_value(&row.status)?;
            wtr.write_record([
                report.document_name.as_str(),
                listing_code,
                product_code,
                row.field.as_str(),
                row.extracted_value.as_deref().unwrap_or(""),
                row.expected_value.as_deref().unwrap_or(""),
                status.as_str().unwrap_or(""),
                "",
            ])?;
        }
    }

    let data = String::from_utf8(wtr.into_inner()?)?;
    Ok(data)
}
