use anyhow::Context;
use clap::{Parser, Subcommand, ValueEnum};
use starchart_catalog::query::{cone_search, ConeSearchParams};
use starchart_catalog::{CatalogTier, StoredStar, TierCatalog};
use std::path::PathBuf;
use std::time::Instant;
use tracing_subscriber::EnvFilter;

#[derive(Clone, ValueEnum)]
enum OutputFormat {
    Table,
    Json,
    Csv,
}

#[derive(Clone, Copy, ValueEnum)]
enum TierArg {
    Bright,
    Mid,
    Full,
}

impl From<TierArg> for CatalogTier {
    fn from(arg: TierArg) -> Self {
        match arg {
            TierArg::Bright => CatalogTier::Bright,
            TierArg::Mid => CatalogTier::Mid,
            TierArg::Full => CatalogTier::Full,
        }
    }
}

#[derive(Parser)]
#[command(name = "query-catalog")]
#[command(about = "Inspect and query star catalog tier files")]
struct Cli {
    /// Directory holding hp48.cat, hp192.cat and hp768.cat
    #[arg(long)]
    catalog_dir: PathBuf,

    /// Tier to read
    #[arg(long, value_enum, default_value = "full")]
    tier: TierArg,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print tier header information
    Info,
    /// Perform a cone search
    Search {
        /// Right ascension (degrees, or HMS e.g. 18h36m56s, 18:36:56)
        ra: String,
        /// Declination (degrees, or DMS e.g. +38d47m01s, -5:22:30)
        #[arg(allow_hyphen_values = true)]
        dec: String,
        /// Search radius in degrees
        #[arg(long, default_value = "1.0")]
        radius: f64,
        /// Only stars brighter than this magnitude
        #[arg(long)]
        mag_max: Option<f64>,
        /// Maximum number of results
        #[arg(long)]
        limit: Option<usize>,
        /// Print query timing
        #[arg(long)]
        timing: bool,
        /// Output format
        #[arg(long, value_enum, default_value = "table")]
        format: OutputFormat,
    },
    /// List every star inside an RA/Dec box (RA range may cross 0h)
    Box {
        /// Lower RA bound
        ra_min: String,
        /// Upper RA bound
        ra_max: String,
        /// Lower Dec bound
        #[arg(allow_hyphen_values = true)]
        dec_min: String,
        /// Upper Dec bound
        #[arg(allow_hyphen_values = true)]
        dec_max: String,
        /// Output format
        #[arg(long, value_enum, default_value = "table")]
        format: OutputFormat,
    },
}

#[derive(serde::Serialize)]
struct JsonStar {
    catalog_id: String,
    ra_deg: f64,
    dec_deg: f64,
    mag: f32,
    cell: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    distance_deg: Option<f64>,
}

impl JsonStar {
    fn new(star: &StoredStar, distance_deg: Option<f64>) -> Self {
        Self {
            catalog_id: star.catalog_id().to_string(),
            ra_deg: star.ra,
            dec_deg: star.dec,
            mag: star.mag,
            cell: star.cell,
            distance_deg,
        }
    }
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

    let tier = CatalogTier::from(cli.tier);
    let path = cli.catalog_dir.join(tier.file_name());
    let catalog =
        TierCatalog::open(&path).with_context(|| format!("Cannot open {} tier", tier))?;

    match cli.command {
        Commands::Info => {
            let size_mb = catalog.file_size() as f64 / 1_048_576.0;
            println!("{}", catalog.header());
            println!(
                "File size: {} bytes ({:.2} MB)",
                catalog.file_size(),
                size_mb
            );
        }
        Commands::Search {
            ra,
            dec,
            radius,
            mag_max,
            limit,
            timing,
            format,
        } => {
            let params = ConeSearchParams {
                max_mag: mag_max,
                max_results: limit,
                ..ConeSearchParams::new(parse_ra(&ra)?, parse_dec(&dec)?, radius)
            };

            let start = if timing { Some(Instant::now()) } else { None };
            let results = cone_search(&catalog, &params);
            if let Some(start_time) = start {
                eprintln!(
                    "Query completed in {:.2} ms",
                    start_time.elapsed().as_secs_f64() * 1000.0
                );
            }

            let rows: Vec<JsonStar> = results
                .iter()
                .map(|r| JsonStar::new(&r.star, Some(r.distance_deg)))
                .collect();
            print_rows(&rows, &format)?;
        }
        Commands::Box {
            ra_min,
            ra_max,
            dec_min,
            dec_max,
            format,
        } => {
            let stars = catalog.stars_in_box(
                parse_ra(&ra_min)?,
                parse_ra(&ra_max)?,
                parse_dec(&dec_min)?,
                parse_dec(&dec_max)?,
            );
            let rows: Vec<JsonStar> = stars.iter().map(|s| JsonStar::new(s, None)).collect();
            print_rows(&rows, &format)?;
        }
    }

    Ok(())
}

fn print_rows(rows: &[JsonStar], format: &OutputFormat) -> anyhow::Result<()> {
    match format {
        OutputFormat::Table => print_table(rows),
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(rows)?),
        OutputFormat::Csv => print_csv(rows),
    }
    Ok(())
}

fn print_table(rows: &[JsonStar]) {
    for (i, row) in rows.iter().enumerate() {
        let distance = row
            .distance_deg
            .map(|d| format!(" Dist={:.4}°", d))
            .unwrap_or_default();
        println!(
            "{:4}: {:>12} RA={:.6}° Dec={:+.6}° Mag={:5.2} Cell={}{}",
            i + 1,
            row.catalog_id,
            row.ra_deg,
            row.dec_deg,
            row.mag,
            row.cell,
            distance
        );
    }

    if rows.is_empty() {
        println!("No stars found matching the search criteria.");
    } else {
        println!("\nTotal results: {}", rows.len());
    }
}

fn print_csv(rows: &[JsonStar]) {
    println!("catalog_id,ra_deg,dec_deg,mag,cell,distance_deg");
    for r in rows {
        println!(
            "{},{},{},{},{},{}",
            r.catalog_id,
            r.ra_deg,
            r.dec_deg,
            r.mag,
            r.cell,
            r.distance_deg.map(|d| d.to_string()).unwrap_or_default()
        );
    }
}

fn parse_ra(s: &str) -> anyhow::Result<f64> {
    starchart_core::parse_ra(s).map_err(|e| anyhow::anyhow!("Cannot parse RA '{}': {}", s, e))
}

fn parse_dec(s: &str) -> anyhow::Result<f64> {
    starchart_core::parse_dec(s).map_err(|e| anyhow::anyhow!("Cannot parse Dec '{}': {}", s, e))
}
