//! Build the three tier files from a tree of GSC region files.
//!
//! Two stages:
//!
//! 1. **Decode**: every source file is decoded in parallel into its own
//!    staging part file, written under a `.tmp` name and renamed only once
//!    the whole file decoded cleanly. A file that fails (bad header,
//!    truncated record, read error) leaves nothing behind, is logged, and
//!    the build carries on. A failure writing the staging area aborts the
//!    build with [`CatalogError::Output`].
//! 2. **Index**: the part files are read in name order, so the output does
//!    not depend on thread scheduling:
//!    - Pass 1 counts rows per cell for each tier.
//!    - Pass 2 scatters rows to their final positions in each tier file.
//!    - Pass 3 sorts each cell's rows by magnitude in place.
//!
//! Only the 768-cell id is computed per star; the coarser ids come from the
//! nested numbering.

use crate::error::{CatalogError, CatalogResult};
use crate::gsc::{is_catalog_file, open_catalog_file, DecodeStats, GscReader};
use crate::store::{
    CatalogSet, CatalogTier, StoredStar, TierHeader, CELL_ENTRY_SIZE, HEADER_SIZE, ROW_SIZE,
};
use crate::tiling::{cell_of, parent_cell, Resolution};
use indicatif::{ProgressBar, ProgressStyle};
use memmap2::MmapMut;
use rayon::prelude::*;
use serde::Serialize;
use std::fs::{self, File, OpenOptions};
use std::io::{BufWriter, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;
use std::time::Instant;
use tracing::{debug, info, warn};

const STAGING_DIR: &str = ".staging";
const PART_HEADER_SIZE: usize = 8;
pub const FAILED_LOG: &str = "failed_files.log";

#[derive(Debug, Clone, Default)]
pub struct BuildOptions {
    /// Decode threads; 0 uses every core.
    pub threads: usize,
    /// Draw a progress bar on the terminal.
    pub show_progress: bool,
}

/// Counters for one build.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct BuildReport {
    pub files_found: u64,
    pub files_processed: u64,
    pub files_failed: u64,
    pub records_read: u64,
    pub duplicates_skipped: u64,
    pub magnitude_rejected: u64,
    pub stars_written: u64,
    pub bright_rows: u64,
    pub mid_rows: u64,
    pub full_rows: u64,
    /// Skipped source files and the reason, sorted by path.
    pub failed: Vec<(PathBuf, String)>,
    pub elapsed_secs: f64,
}

impl BuildReport {
    pub fn rows(&self, tier: CatalogTier) -> u64 {
        match tier {
            CatalogTier::Bright => self.bright_rows,
            CatalogTier::Mid => self.mid_rows,
            CatalogTier::Full => self.full_rows,
        }
    }
}

#[derive(Default)]
struct Counters {
    processed: AtomicU64,
    records: AtomicU64,
    duplicates: AtomicU64,
    rejected: AtomicU64,
    written: AtomicU64,
}

impl Counters {
    fn add(&self, stats: &DecodeStats, written: u64) {
        self.processed.fetch_add(1, Ordering::Relaxed);
        self.records.fetch_add(stats.records, Ordering::Relaxed);
        self.duplicates.fetch_add(stats.duplicates, Ordering::Relaxed);
        self.rejected.fetch_add(stats.rejected, Ordering::Relaxed);
        self.written.fetch_add(written, Ordering::Relaxed);
    }
}

/// Build all three tiers with default options.
pub fn build_catalogs(source: impl AsRef<Path>, target: impl AsRef<Path>) -> CatalogResult<CatalogSet> {
    build_catalogs_with(source, target, &BuildOptions::default()).map(|(set, _)| set)
}

/// Build all three tiers, replacing any tier files already in `target`.
///
/// # Errors
/// Fails if the source tree holds no catalog files, if every source file
/// failed to decode, or with [`CatalogError::Output`] when the target or
/// its staging area cannot be written. Individual bad
/// source files are reported in [`BuildReport::failed`] and `failed_files.log`.
pub fn build_catalogs_with(
    source: impl AsRef<Path>,
    target: impl AsRef<Path>,
    options: &BuildOptions,
) -> CatalogResult<(CatalogSet, BuildReport)> {
    let source = source.as_ref();
    let target = target.as_ref();
    let start = Instant::now();

    if !source.is_dir() {
        return Err(CatalogError::invalid_build(format!(
            "Source directory does not exist: {}",
            source.display()
        )));
    }
    let files = find_source_files(source)?;
    if files.is_empty() {
        return Err(CatalogError::invalid_build(format!(
            "No .GSC files found under {}",
            source.display()
        )));
    }

    fs::create_dir_all(target).map_err(|e| CatalogError::output(target, e))?;
    let staging = target.join(STAGING_DIR);
    reset_dir(&staging)?;

    info!(files = files.len(), source = %source.display(), "decoding source catalogs");
    let counters = Counters::default();
    let failed = decode_all(&files, &staging, &counters, options)?;

    write_failed_log(target, &failed)?;
    let processed = counters.processed.load(Ordering::Relaxed);
    if processed == 0 {
        return Err(CatalogError::invalid_build(format!(
            "All {} source files failed to decode",
            files.len()
        )));
    }

    let parts = collect_part_files(&staging)?;
    let rows = write_tiers(&parts, target)?;
    fs::remove_dir_all(&staging).map_err(|e| CatalogError::output(&staging, e))?;

    let report = BuildReport {
        files_found: files.len() as u64,
        files_processed: processed,
        files_failed: failed.len() as u64,
        records_read: counters.records.load(Ordering::Relaxed),
        duplicates_skipped: counters.duplicates.load(Ordering::Relaxed),
        magnitude_rejected: counters.rejected.load(Ordering::Relaxed),
        stars_written: counters.written.load(Ordering::Relaxed),
        bright_rows: rows[0],
        mid_rows: rows[1],
        full_rows: rows[2],
        failed,
        elapsed_secs: start.elapsed().as_secs_f64(),
    };
    for tier in CatalogTier::ALL {
        info!(tier = %tier, rows = report.rows(tier), "tier written");
    }

    let set = CatalogSet::open(target)?;
    Ok((set, report))
}

/// Every catalog file under `dir`, recursively, sorted by path.
pub fn find_source_files(dir: &Path) -> CatalogResult<Vec<PathBuf>> {
    let mut files = Vec::new();
    let mut pending = vec![dir.to_path_buf()];
    while let Some(current) = pending.pop() {
        let entries = fs::read_dir(&current).map_err(|e| CatalogError::io(&current, e))?;
        for entry in entries {
            let path = entry.map_err(|e| CatalogError::io(&current, e))?.path();
            if path.is_dir() {
                pending.push(path);
            } else if is_catalog_file(&path) {
                files.push(path);
            }
        }
    }
    files.sort();
    Ok(files)
}

fn reset_dir(dir: &Path) -> CatalogResult<()> {
    if dir.exists() {
        fs::remove_dir_all(dir).map_err(|e| CatalogError::output(dir, e))?;
    }
    fs::create_dir_all(dir).map_err(|e| CatalogError::output(dir, e))
}

fn resolve_threads(threads: usize) -> usize {
    if threads == 0 {
        std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(1)
    } else {
        threads
    }
}

fn create_progress_bar(total: u64, visible: bool) -> ProgressBar {
    if !visible {
        return ProgressBar::hidden();
    }
    let pb = ProgressBar::new(total);
    if let Ok(style) =
        ProgressStyle::default_bar().template("{spinner:.green} [{bar:40.cyan/blue}] {pos}/{len} ({eta})")
    {
        pb.set_style(style.progress_chars("#>-"));
    }
    pb
}

fn decode_all(
    files: &[PathBuf],
    staging: &Path,
    counters: &Counters,
    options: &BuildOptions,
) -> CatalogResult<Vec<(PathBuf, String)>> {
    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(resolve_threads(options.threads))
        .build()
        .map_err(|e| CatalogError::invalid_build(format!("Failed to create thread pool: {}", e)))?;

    let pb = create_progress_bar(files.len() as u64, options.show_progress);
    let failed: Mutex<Vec<(PathBuf, String)>> = Mutex::new(Vec::new());

    let staged = pool.install(|| {
        files.par_iter().enumerate().try_for_each(|(index, path)| {
            match stage_file(path, staging, index) {
                Ok((stats, written)) => {
                    debug!(
                        file = %path.display(),
                        written,
                        duplicates = stats.duplicates,
                        rejected = stats.rejected,
                        "decoded"
                    );
                    counters.add(&stats, written);
                }
                Err(e) if e.is_ingestion() => {
                    warn!(file = %path.display(), error = %e, "skipping source file");
                    if let Ok(mut list) = failed.lock() {
                        list.push((path.clone(), e.to_string()));
                    }
                }
                // the target side is broken, every later file would fail too
                Err(e) => return Err(e),
            }
            pb.inc(1);
            Ok(())
        })
    });
    pb.finish_and_clear();
    staged?;

    let mut failed = failed
        .into_inner()
        .map_err(|_| CatalogError::invalid_build("Failed-file list lock poisoned"))?;
    failed.sort();
    Ok(failed)
}

fn part_path(staging: &Path, index: usize) -> PathBuf {
    staging.join(format!("part_{:06}.bin", index))
}

fn stage_file(path: &Path, staging: &Path, index: usize) -> CatalogResult<(DecodeStats, u64)> {
    let reader = open_catalog_file(path)?;
    let part = part_path(staging, index);
    let temp = part.with_extension("bin.tmp");
    match write_part_file(reader, &temp) {
        Ok(result) => {
            fs::rename(&temp, &part).map_err(|e| CatalogError::output(&part, e))?;
            Ok(result)
        }
        Err(e) => {
            let _ = fs::remove_file(&temp);
            Err(e)
        }
    }
}

fn write_part_file<R: Read>(mut reader: GscReader<R>, output: &Path) -> CatalogResult<(DecodeStats, u64)> {
    let io_err = |e: std::io::Error| CatalogError::output(output, e);
    let file = File::create(output).map_err(io_err)?;
    let mut writer = BufWriter::new(file);
    writer.write_all(&[0u8; PART_HEADER_SIZE]).map_err(io_err)?;

    let mut written = 0u64;
    for result in reader.by_ref() {
        let star = result?;
        let cell = cell_of(star.ra, star.dec, Resolution::Cells768) as u32;
        writer
            .write_all(&StoredStar::new(cell, &star).to_bytes())
            .map_err(io_err)?;
        written += 1;
    }

    writer.flush().map_err(io_err)?;
    let mut file = writer.into_inner().map_err(|e| io_err(e.into_error()))?;
    file.seek(SeekFrom::Start(0)).map_err(io_err)?;
    file.write_all(&written.to_le_bytes()).map_err(io_err)?;
    Ok((reader.stats(), written))
}

fn collect_part_files(staging: &Path) -> CatalogResult<Vec<PathBuf>> {
    let mut parts: Vec<PathBuf> = fs::read_dir(staging)
        .map_err(|e| CatalogError::output(staging, e))?
        .filter_map(|e| e.ok())
        .map(|e| e.path())
        .filter(|p| is_part_file(p))
        .collect();
    parts.sort();
    Ok(parts)
}

fn is_part_file(path: &Path) -> bool {
    path.file_name()
        .and_then(|n| n.to_str())
        .map(|n| n.starts_with("part_") && n.ends_with(".bin"))
        .unwrap_or(false)
}

fn read_part_file(path: &Path) -> CatalogResult<Vec<StoredStar>> {
    let bytes = fs::read(path).map_err(|e| CatalogError::output(path, e))?;
    let corrupt = |message: String| {
        CatalogError::output(path, std::io::Error::new(std::io::ErrorKind::InvalidData, message))
    };
    if bytes.len() < PART_HEADER_SIZE {
        return Err(corrupt(format!("part file too small: {} bytes", bytes.len())));
    }
    let mut count = [0u8; PART_HEADER_SIZE];
    count.copy_from_slice(&bytes[..PART_HEADER_SIZE]);
    let count = u64::from_le_bytes(count);
    let body = &bytes[PART_HEADER_SIZE..];
    if Some(body.len() as u64) != count.checked_mul(ROW_SIZE as u64) {
        return Err(corrupt(format!(
            "part file holds {} bytes of rows, header says {} rows",
            body.len(),
            count
        )));
    }
    Ok(body
        .chunks_exact(ROW_SIZE)
        .map(|chunk| {
            let mut row = [0u8; ROW_SIZE];
            row.copy_from_slice(chunk);
            StoredStar::from_bytes(&row)
        })
        .collect())
}

fn tier_cell(tier: CatalogTier, fine_cell: u32) -> usize {
    parent_cell(fine_cell as u64, Resolution::Cells768, tier.resolution()) as usize
}

struct TierWriter {
    tier: CatalogTier,
    counts: Vec<u32>,
    temp_path: PathBuf,
    final_path: PathBuf,
}

impl TierWriter {
    fn new(tier: CatalogTier, target: &Path) -> Self {
        let final_path = target.join(tier.file_name());
        Self {
            tier,
            counts: vec![0; tier.resolution().npix() as usize],
            temp_path: final_path.with_extension("cat.tmp"),
            final_path,
        }
    }

    fn total(&self) -> u64 {
        self.counts.iter().map(|&c| c as u64).sum()
    }

    fn rows_start(&self) -> usize {
        HEADER_SIZE + self.counts.len() * CELL_ENTRY_SIZE
    }
}

/// Returns the row count written to each tier, in [`CatalogTier::ALL`] order.
fn write_tiers(parts: &[PathBuf], target: &Path) -> CatalogResult<[u64; 3]> {
    let mut writers = CatalogTier::ALL.map(|tier| TierWriter::new(tier, target));

    info!(parts = parts.len(), "pass 1: counting rows per cell");
    for part in parts {
        for row in read_part_file(part)? {
            for w in writers.iter_mut() {
                if w.tier.includes(row.mag as f64) {
                    w.counts[tier_cell(w.tier, row.cell)] += 1;
                }
            }
        }
    }

    info!("pass 2: scattering rows");
    let mut maps = Vec::with_capacity(writers.len());
    let mut cursors = Vec::with_capacity(writers.len());
    for w in &writers {
        let size = w.rows_start() + w.total() as usize * ROW_SIZE;
        let file = create_output_file(&w.temp_path, size)?;
        let mut mmap = unsafe { MmapMut::map_mut(&file) }.map_err(|e| CatalogError::output(&w.temp_path, e))?;
        mmap[..HEADER_SIZE].copy_from_slice(&TierHeader::new(w.tier, w.total()).encode());
        cursors.push(write_offset_table(&mut mmap, &w.counts));
        maps.push(mmap);
    }

    for part in parts {
        for row in read_part_file(part)? {
            for (i, w) in writers.iter().enumerate() {
                if !w.tier.includes(row.mag as f64) {
                    continue;
                }
                let cell = tier_cell(w.tier, row.cell);
                let stored = row.with_cell(cell as u32);
                let at = w.rows_start() + cursors[i][cell] as usize;
                maps[i][at..at + ROW_SIZE].copy_from_slice(&stored.to_bytes());
                cursors[i][cell] += ROW_SIZE as u64;
            }
        }
    }

    info!("pass 3: sorting each cell by magnitude");
    let mut totals = [0u64; 3];
    for ((i, w), mut mmap) in writers.iter().enumerate().zip(maps) {
        sort_cells_in_place(&mut mmap, w.rows_start(), &w.counts);
        mmap.flush().map_err(|e| CatalogError::output(&w.temp_path, e))?;
        drop(mmap);
        fs::rename(&w.temp_path, &w.final_path).map_err(|e| CatalogError::output(&w.final_path, e))?;
        totals[i] = w.total();
    }
    Ok(totals)
}

fn create_output_file(path: &Path, size: usize) -> CatalogResult<File> {
    let file = OpenOptions::new()
        .read(true)
        .write(true)
        .create(true)
        .truncate(true)
        .open(path)
        .map_err(|e| CatalogError::output(path, e))?;
    file.set_len(size as u64).map_err(|e| CatalogError::output(path, e))?;
    Ok(file)
}

/// Writes the cell table and returns each cell's starting byte offset.
fn write_offset_table(mmap: &mut MmapMut, counts: &[u32]) -> Vec<u64> {
    let mut byte_offsets = Vec::with_capacity(counts.len());
    let mut current: u64 = 0;

    for (i, &count) in counts.iter().enumerate() {
        let at = HEADER_SIZE + i * CELL_ENTRY_SIZE;
        mmap[at..at + 8].copy_from_slice(&current.to_le_bytes());
        mmap[at + 8..at + 12].copy_from_slice(&count.to_le_bytes());
        mmap[at + 12..at + 16].copy_from_slice(&0u32.to_le_bytes());
        byte_offsets.push(current);
        current += (count as u64) * (ROW_SIZE as u64);
    }

    byte_offsets
}

fn sort_cells_in_place(mmap: &mut MmapMut, rows_start: usize, counts: &[u32]) {
    let mut offset = rows_start;
    for &count in counts {
        let count = count as usize;
        if count > 1 {
            let region = &mut mmap[offset..offset + count * ROW_SIZE];
            let rows: &mut [[u8; ROW_SIZE]] = unsafe {
                std::slice::from_raw_parts_mut(region.as_mut_ptr() as *mut [u8; ROW_SIZE], count)
            };
            // stable, so equal magnitudes keep source order
            rows.sort_by(|a, b| row_mag(a).total_cmp(&row_mag(b)));
        }
        offset += count * ROW_SIZE;
    }
}

fn row_mag(row: &[u8; ROW_SIZE]) -> f32 {
    f32::from_le_bytes([row[16], row[17], row[18], row[19]])
}

fn write_failed_log(target: &Path, failed: &[(PathBuf, String)]) -> CatalogResult<()> {
    let log_path = target.join(FAILED_LOG);
    if failed.is_empty() {
        if log_path.exists() {
            fs::remove_file(&log_path).map_err(|e| CatalogError::output(&log_path, e))?;
        }
        return Ok(());
    }
    let mut file = File::create(&log_path).map_err(|e| CatalogError::output(&log_path, e))?;
    for (path, error) in failed {
        writeln!(file, "{}\t{}", path.display(), error).map_err(|e| CatalogError::output(&log_path, e))?;
    }
    warn!(count = failed.len(), log = %log_path.display(), "some source files were skipped");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tier_cell_uses_nesting() {
        let fine = cell_of(123.4, -56.7, Resolution::Cells768) as u32;
        assert_eq!(
            tier_cell(CatalogTier::Bright, fine) as u64,
            cell_of(123.4, -56.7, Resolution::Cells48)
        );
        assert_eq!(
            tier_cell(CatalogTier::Mid, fine) as u64,
            cell_of(123.4, -56.7, Resolution::Cells192)
        );
        assert_eq!(tier_cell(CatalogTier::Full, fine), fine as usize);
    }

    #[test]
    fn test_is_part_file() {
        assert!(is_part_file(Path::new("/t/.staging/part_000001.bin")));
        assert!(!is_part_file(Path::new("/t/.staging/part_000001.bin.tmp")));
        assert!(!is_part_file(Path::new("/t/hp48.cat")));
    }

    #[test]
    fn test_read_part_file_rejects_bad_count() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("part_000000.bin");
        let mut bytes = 3u64.to_le_bytes().to_vec();
        bytes.extend_from_slice(&[0u8; ROW_SIZE]);
        fs::write(&path, bytes).unwrap();
        assert!(read_part_file(&path).is_err());
    }

    fn write_sources(dir: &Path) -> Vec<PathBuf> {
        use crate::gsc::{GscHeader, RawRecord};
        let header = GscHeader {
            region: "N0001".to_string(),
            offset_ra: 0.0,
            offset_dec: -90.0,
            offset_mag: 0.0,
            scale_ra: 10000.0,
            scale_dec: 2000.0,
            scale_mag: 100.0,
        };
        let mut good = header.encode();
        good.extend_from_slice(
            &RawRecord {
                id: 1,
                ra: 1_000_000,
                dec: 200_000,
                mag: 550,
                plate: 3,
                ..RawRecord::default()
            }
            .to_bytes(),
        );
        let good_path = dir.join("0001.GSC");
        let bad_path = dir.join("0002.GSC");
        fs::write(&good_path, good).unwrap();
        fs::write(&bad_path, b"xx").unwrap();
        vec![good_path, bad_path]
    }

    #[test]
    fn test_decode_all_skips_bad_sources() {
        let dir = tempfile::tempdir().unwrap();
        let files = write_sources(dir.path());
        let staging = dir.path().join("staging");
        fs::create_dir_all(&staging).unwrap();

        let counters = Counters::default();
        let failed = decode_all(&files, &staging, &counters, &BuildOptions::default()).unwrap();
        assert_eq!(failed.len(), 1);
        assert_eq!(failed[0].0, files[1]);
        assert_eq!(counters.processed.load(Ordering::Relaxed), 1);
        assert_eq!(collect_part_files(&staging).unwrap().len(), 1);
    }

    #[test]
    fn test_decode_all_aborts_when_staging_is_unwritable() {
        let dir = tempfile::tempdir().unwrap();
        let files = write_sources(dir.path());
        // never created, so every part file fails to open for writing
        let staging = dir.path().join("gone");

        let counters = Counters::default();
        let err = decode_all(&files, &staging, &counters, &BuildOptions::default()).unwrap_err();
        assert!(matches!(err, CatalogError::Output { .. }), "{}", err);
        assert!(!err.is_ingestion());
    }

    #[test]
    fn test_build_fails_when_staging_is_blocked() {
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("src");
        fs::create_dir_all(&source).unwrap();
        write_sources(&source);
        // a plain file where the target directory should be
        let target = dir.path().join("out");
        fs::write(&target, b"not a directory").unwrap();

        let err = build_catalogs(&source, &target).err().unwrap();
        assert!(matches!(err, CatalogError::Output { .. }), "{}", err);
        assert!(!target.join(FAILED_LOG).exists());
    }

    #[test]
    fn test_find_source_files_recursive() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("N0000").join("deeper");
        fs::create_dir_all(&nested).unwrap();
        fs::write(dir.path().join("0002.GSC"), b"").unwrap();
        fs::write(nested.join("0001.gsc.gz"), b"").unwrap();
        fs::write(nested.join("notes.txt"), b"").unwrap();

        let files = find_source_files(dir.path()).unwrap();
        assert_eq!(files.len(), 2);
        assert!(files.windows(2).all(|w| w[0] <= w[1]));
    }

    #[test]
    fn test_write_offset_table() {
        let mut file = tempfile::tempfile().unwrap();
        file.set_len((HEADER_SIZE + 3 * CELL_ENTRY_SIZE) as u64).unwrap();
        let mut mmap = unsafe { MmapMut::map_mut(&file).unwrap() };
        let offsets = write_offset_table(&mut mmap, &[2, 0, 1]);
        assert_eq!(offsets, vec![0, 80, 80]);
        let second = HEADER_SIZE + CELL_ENTRY_SIZE;
        assert_eq!(mmap[second + 8], 0);
        let third = HEADER_SIZE + 2 * CELL_ENTRY_SIZE;
        assert_eq!(mmap[third], 80);
        assert_eq!(mmap[third + 8], 1);
    }
}
