//! Extract command - show what is read from a single document.

use std::path::PathBuf;
use std::time::Instant;

use clap::Args;
use console::style;
use indicatif::{ProgressBar, ProgressStyle};
use indexmap::IndexMap;
use serde::Serialize;
use tracing::{debug, info};

use listino_core::extraction;
use listino_core::models::{ExtractedField, Identifiers, RawDocument};
use listino_core::DocumentRenderer;

use super::{build_renderer, load_config};

/// Arguments for the extract command.
#[derive(Args)]
pub struct ExtractArgs {
    /// Input file (txt, PDF or image)
    #[arg(required = true)]
    input: PathBuf,

    /// Page of interest (1-based; defaults to the configured page)
    #[arg(short, long)]
    page: Option<u32>,

    /// Output format
    #[arg(short, long, value_enum, default_value = "text")]
    format: ExtractFormat,

    /// Also print the rendered text
    #[arg(long)]
    show_text: bool,
}

#[derive(Clone, Copy, Debug, clap::ValueEnum)]
pub enum ExtractFormat {
    /// JSON output
    Json,
    /// Plain text summary
    Text,
}

#[derive(Serialize)]
struct Extraction<'a> {
    document_name: &'a str,
    page: u32,
    identifiers: &'a Identifiers,
    extracted_fields: &'a IndexMap<String, ExtractedField>,
}

pub async fn run(args: ExtractArgs, config_path: Option<&str>) -> anyhow::Result<()> {
    let start = Instant::now();
    let config = load_config(config_path)?;

    if !args.input.exists() {
        anyhow::bail!("Input file not found: {}", args.input.display());
    }

    let page = args.page.unwrap_or(config.pdf.page);
    info!("Extracting from {} (page {})", args.input.display(), page);

    let pb = ProgressBar::new_spinner();
    pb.set_style(ProgressStyle::default_spinner().template("{spinner:.green} {msg}")?);
    pb.set_message("Rendering document...");

    let renderer = build_renderer(&config);
    let input = args.input.clone();
    let text = tokio::task::spawn_blocking(move || renderer.render(&input, page)).await??;

    pb.finish_and_clear();

    let name = args
        .input
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let document = RawDocument::from_text(&name, &text);

    let (parser, identifier_extractor) = extraction::from_config(&config.extraction)?;
    let identifiers = identifier_extractor.extract(&document.lines);
    let fields = parser.parse(&document.lines);

    match args.format {
        ExtractFormat::Json => {
            let extraction = Extraction {
                document_name: &name,
                page,
                identifiers: &identifiers,
                extracted_fields: &fields,
            };
            println!("{}", serde_json::to_string_pretty(&extraction)?);
        }
        ExtractFormat::Text => {
            println!("{}", format_text(&name, &identifiers, &fields));
        }
    }

    if args.show_text {
        println!();
        println!("{}", style("Rendered text:").blue());
        println!("{}", text);
    }

    debug!("Total extraction time: {:?}", start.elapsed());

    Ok(())
}

fn format_text(
    name: &str,
    identifiers: &Identifiers,
    fields: &IndexMap<String, ExtractedField>,
) -> String {
    let mut output = String::new();

    output.push_str(&format!("Document: {}\n", name));
    output.push_str(&format!(
        "Listing code: {}\n",
        identifiers.listing_code.as_deref().unwrap_or("-")
    ));
    output.push_str(&format!(
        "Product code: {}\n",
        identifiers.product_code.as_deref().unwrap_or("-")
    ));
    output.push('\n');

    if fields.is_empty() {
        output.push_str("No fields found.\n");
        return output;
    }

    output.push_str("Fields:\n");
    for (label, field) in fields {
        output.push_str(&format!(
            "  {}: {}\n",
            label,
            field.value.as_deref().unwrap_or("-")
        ));
    }

    output
}
