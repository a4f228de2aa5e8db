use anyhow::Context;
use chrono::Utc;
use clap::Parser;
use starchart_view::transient::parse_timestamp;
use starchart_view::{ChartConfig, FinderChart};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "render-field")]
#[command(about = "Compute the stars, planets and lines of one finder chart")]
#[command(version)]
struct Cli {
    /// Chart configuration (JSON)
    #[arg(long)]
    config: PathBuf,

    /// Chart center right ascension (degrees, or HMS e.g. 05h35m17s, 5:35:17)
    ra: String,

    /// Chart center declination (degrees, or DMS e.g. -05d23m28s)
    #[arg(allow_hyphen_values = true)]
    dec: String,

    /// Field of view in degrees
    #[arg(long, default_value = "40.0")]
    view: f64,

    /// UTC instant, RFC 3339 or "YYYY-MM-DD HH:MM:SS" (default: now)
    #[arg(long)]
    at: Option<String>,

    /// Single-line JSON
    #[arg(long)]
    compact: bool,

    /// Enable debug logging
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_writer(std::io::stderr)
        .init();

    let config = ChartConfig::load(&cli.config)
        .with_context(|| format!("Cannot load config {:?}", cli.config))?;
    let chart = FinderChart::open(&config).context("Cannot open chart data")?;

    let ra = starchart_core::parse_ra(&cli.ra)?;
    let dec = starchart_core::parse_dec(&cli.dec)?;
    let at = match &cli.at {
        Some(text) => parse_timestamp(text)
            .ok_or_else(|| anyhow::anyhow!("Cannot parse timestamp '{}'", text))?,
        None => Utc::now(),
    };

    let field = chart.render_field(ra, dec, cli.view, at)?;
    let json = if cli.compact {
        serde_json::to_string(&field)?
    } else {
        serde_json::to_string_pretty(&field)?
    };
    println!("{}", json);
    Ok(())
}
