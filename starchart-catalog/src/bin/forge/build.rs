use crate::cli::{BuildArgs, Cli};
use anyhow::Context;
use starchart_catalog::builder::FAILED_LOG;
use starchart_catalog::{build_catalogs_with, BuildOptions, BuildReport, CatalogTier};

pub fn run(args: &BuildArgs, cli: &Cli) -> anyhow::Result<()> {
    validate_paths(args)?;
    print_plan(args, cli);

    let options = BuildOptions {
        threads: args.threads,
        show_progress: !args.quiet,
    };
    let (catalogs, report) = build_catalogs_with(&args.source, &args.target, &options)
        .with_context(|| format!("Catalog build from {:?} failed", args.source))?;

    print_stats(&report);
    for tier in CatalogTier::ALL {
        let catalog = catalogs.get(tier);
        println!(
            "{}: {} ({} bytes)",
            tier,
            catalog.path().display(),
            catalog.file_size()
        );
    }
    Ok(())
}

fn validate_paths(args: &BuildArgs) -> anyhow::Result<()> {
    if !args.source.is_dir() {
        anyhow::bail!("Source directory not found: {:?}", args.source);
    }
    if args.target.exists() && !args.target.is_dir() {
        anyhow::bail!("Target exists and is not a directory: {:?}", args.target);
    }
    Ok(())
}

fn print_plan(args: &BuildArgs, cli: &Cli) {
    println!("=== Build Star Catalog Tiers ===");
    println!("Source: {:?}", args.source);
    println!("Target: {:?}", args.target);
    for tier in CatalogTier::ALL {
        let limit = match tier.inclusion_limit() {
            Some(limit) => format!("mag < {:.1}", limit),
            None => "all stars".to_string(),
        };
        println!(
            "  {} -> {} ({} cells, {})",
            tier,
            tier.file_name(),
            tier.resolution().npix(),
            limit
        );
    }
    match args.threads {
        0 => println!("Threads: all cores"),
        n => println!("Threads: {}", n),
    }
    println!("Verbose: {}", cli.verbose);
    println!();
}

fn print_stats(report: &BuildReport) {
    println!();
    println!("=== Build Statistics ===");
    println!("Files found: {}", report.files_found);
    println!("Files processed: {}", report.files_processed);
    println!("Files failed: {}", report.files_failed);
    println!("Records read: {}", report.records_read);
    println!("Duplicates skipped: {}", report.duplicates_skipped);
    println!("Magnitude rejected: {}", report.magnitude_rejected);
    println!("Stars written: {}", report.stars_written);
    for tier in CatalogTier::ALL {
        println!("{} rows: {}", tier, report.rows(tier));
    }
    println!("Elapsed time: {:.2}s", report.elapsed_secs);
    if !report.failed.is_empty() {
        println!();
        println!("Skipped files (see {}):", FAILED_LOG);
        for (path, error) in &report.failed {
            println!("  {}: {}", path.display(), error);
        }
    }
    println!();
}
