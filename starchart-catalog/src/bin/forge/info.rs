use crate::cli::InfoArgs;
use anyhow::Context;
use starchart_catalog::{CatalogSet, CatalogTier, TierCatalog};

struct CellStats {
    empty: u64,
    min: u32,
    max: u32,
    mean: f64,
    median: u32,
}

pub fn run(args: &InfoArgs) -> anyhow::Result<()> {
    let catalogs = CatalogSet::open(&args.target)
        .with_context(|| format!("Cannot open tier files in {:?}", args.target))?;

    for tier in CatalogTier::ALL {
        let catalog = catalogs.get(tier);
        println!("=== {} ===", catalog.path().display());
        println!("{}", catalog.header());
        let stats = cell_stats(catalog);
        println!("Empty cells: {}", stats.empty);
        println!(
            "Stars per cell (non-empty): min={}, max={}, mean={:.1}, median={}",
            stats.min, stats.max, stats.mean, stats.median
        );
        println!("File size: {} bytes", catalog.file_size());
        println!();
    }
    Ok(())
}

fn cell_stats(catalog: &TierCatalog) -> CellStats {
    let counts: Vec<u32> = (0..catalog.header().npix)
        .map(|cell| catalog.stars_in_cell(cell).len() as u32)
        .filter(|&c| c > 0)
        .collect();
    let empty = catalog.header().npix - counts.len() as u64;
    let mean = if counts.is_empty() {
        0.0
    } else {
        counts.iter().map(|&c| c as f64).sum::<f64>() / counts.len() as f64
    };
    CellStats {
        empty,
        min: counts.iter().copied().min().unwrap_or(0),
        max: counts.iter().copied().max().unwrap_or(0),
        mean,
        median: compute_median(&counts),
    }
}

fn compute_median(values: &[u32]) -> u32 {
    if values.is_empty() {
        return 0;
    }
    let mut sorted = values.to_vec();
    sorted.sort();
    let mid = sorted.len() / 2;
    if sorted.len().is_multiple_of(2) {
        (sorted[mid - 1] + sorted[mid]) / 2
    } else {
        sorted[mid]
    }
}
