use std::error::Error;
use std::path::PathBuf;

use clap::{Parser, ValueEnum};

use tagpick::{build, CatalogFormat};

#[derive(Clone, Copy, Debug, ValueEnum)]
enum FormatArg {
    /// Single JSON object keyed by item id.
    Keyed,
    /// One JSON object per line.
    Lines,
}

impl From<FormatArg> for CatalogFormat {
    fn from(value: FormatArg) -> Self {
        match value {
            FormatArg::Keyed => CatalogFormat::KeyedObject,
            FormatArg::Lines => CatalogFormat::JsonLines,
        }
    }
}

#[derive(Debug, Parser)]
#[command(
    name = "build_index",
    disable_help_subcommand = true,
    about = "Build tag index artifacts from a raw catalog",
    long_about = "Stream a raw catalog and publish the tag index, tag vocabulary, and sorted id list artifacts."
)]
struct BuildIndexCli {
    #[arg(value_name = "CATALOG", help = "Path to the raw catalog file")]
    catalog: PathBuf,
    #[arg(
        long = "out-dir",
        value_name = "DIR",
        default_value = "data",
        help = "Directory receiving the published artifacts"
    )]
    out_dir: PathBuf,
    #[arg(
        long,
        value_enum,
        help = "Catalog encoding; inferred from the file extension when omitted"
    )]
    format: Option<FormatArg>,
}

fn main() -> Result<(), Box<dyn Error>> {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .try_init();

    let cli = BuildIndexCli::parse();
    let format = cli
        .format
        .map(CatalogFormat::from)
        .unwrap_or_else(|| CatalogFormat::detect(&cli.catalog));

    eprintln!(
        "[tagpick:build] streaming {} into {}",
        cli.catalog.display(),
        cli.out_dir.display()
    );
    let summary = build(&cli.catalog, &cli.out_dir, format)?;

    println!("Processed {} items in {} ms", summary.items, summary.elapsed_ms);
    println!("Found {} unique tags", summary.distinct_tags);
    if !summary.top_tags.is_empty() {
        println!("Most common tags:");
        for entry in &summary.top_tags {
            println!("  {}: {} items", entry.tag, entry.count);
        }
    }
    Ok(())
}
