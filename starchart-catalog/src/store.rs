//! Memory-mapped tier files.
//!
//! Each tier is one file with three contiguous sections:
//!
//! 1. **Header** (64 bytes) — magic, version, tier, HEALPix parameters, row count, inclusion limit
//! 2. **Cell offset table** (`npix × 16` bytes) — byte offset and row count per cell
//! 3. **Rows** (`total_stars × 40` bytes) — [`StoredStar`] structs grouped by cell,
//!    ascending magnitude within a cell
//!
//! The offset table is the cell index; the per-cell magnitude order is the
//! magnitude index, so [`TierCatalog::query`] stops reading a cell at the
//! first row at or above the limit.
//!
//! Header layout (little-endian):
//!
//! | Bytes | Field |
//! |-------|-------|
//! | 0..4 | magic `SCAT` |
//! | 4..8 | version (u32) |
//! | 8..12 | tier code (u32: 0 bright, 1 mid, 2 full) |
//! | 12..16 | HEALPix order (u32) |
//! | 16..20 | nside (u32) |
//! | 24..32 | npix (u64) |
//! | 32..40 | row count (u64) |
//! | 40..48 | inclusion limit (f64, +inf for no limit) |

use crate::error::{CatalogError, CatalogResult};
use crate::gsc::StarRecord;
use crate::tiling::Resolution;
use memmap2::Mmap;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs::File;
use std::path::{Path, PathBuf};
use tracing::debug;

pub(crate) const CATALOG_MAGIC: &[u8; 4] = b"SCAT";
pub(crate) const CATALOG_VERSION: u32 = 1;
pub(crate) const HEADER_SIZE: usize = 64;
pub(crate) const CELL_ENTRY_SIZE: usize = 16;
pub(crate) const ROW_SIZE: usize = 40;
const CATALOG_ID_LEN: usize = 16;

/// One of the three independently built stores.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CatalogTier {
    /// 48 cells, magnitude < 6.
    Bright,
    /// 192 cells, magnitude < 9.
    Mid,
    /// 768 cells, every valid star.
    Full,
}

impl CatalogTier {
    pub const ALL: [CatalogTier; 3] = [Self::Bright, Self::Mid, Self::Full];

    pub const fn resolution(self) -> Resolution {
        match self {
            Self::Bright => Resolution::Cells48,
            Self::Mid => Resolution::Cells192,
            Self::Full => Resolution::Cells768,
        }
    }

    /// Stars must be strictly brighter (numerically smaller) than this.
    pub const fn inclusion_limit(self) -> Option<f64> {
        match self {
            Self::Bright => Some(6.0),
            Self::Mid => Some(9.0),
            Self::Full => None,
        }
    }

    pub fn includes(self, mag: f64) -> bool {
        self.inclusion_limit().is_none_or(|limit| mag < limit)
    }

    pub const fn file_name(self) -> &'static str {
        match self {
            Self::Bright => "hp48.cat",
            Self::Mid => "hp192.cat",
            Self::Full => "hp768.cat",
        }
    }

    pub(crate) const fn code(self) -> u32 {
        match self {
            Self::Bright => 0,
            Self::Mid => 1,
            Self::Full => 2,
        }
    }

    fn from_code(code: u32) -> Option<Self> {
        Self::ALL.into_iter().find(|t| t.code() == code)
    }
}

impl fmt::Display for CatalogTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Bright => "bright",
            Self::Mid => "mid",
            Self::Full => "full",
        };
        f.write_str(name)
    }
}

/// Metadata parsed from the first 64 bytes of a tier file.
#[derive(Debug, Clone, PartialEq)]
pub struct TierHeader {
    pub tier: CatalogTier,
    pub order: u32,
    pub nside: u32,
    pub npix: u64,
    pub total_stars: u64,
    /// Inclusion limit the tier was built with; `None` for the full tier.
    pub mag_limit: Option<f64>,
}

impl TierHeader {
    pub fn new(tier: CatalogTier, total_stars: u64) -> Self {
        let resolution = tier.resolution();
        Self {
            tier,
            order: resolution.order(),
            nside: resolution.nside() as u32,
            npix: resolution.npix(),
            total_stars,
            mag_limit: tier.inclusion_limit(),
        }
    }

    pub(crate) fn encode(&self) -> [u8; HEADER_SIZE] {
        let mut buf = [0u8; HEADER_SIZE];
        buf[0..4].copy_from_slice(CATALOG_MAGIC);
        buf[4..8].copy_from_slice(&CATALOG_VERSION.to_le_bytes());
        buf[8..12].copy_from_slice(&self.tier.code().to_le_bytes());
        buf[12..16].copy_from_slice(&self.order.to_le_bytes());
        buf[16..20].copy_from_slice(&self.nside.to_le_bytes());
        buf[24..32].copy_from_slice(&self.npix.to_le_bytes());
        buf[32..40].copy_from_slice(&self.total_stars.to_le_bytes());
        let limit = self.mag_limit.unwrap_or(f64::INFINITY);
        buf[40..48].copy_from_slice(&limit.to_le_bytes());
        buf
    }
}

impl fmt::Display for TierHeader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let avg = self.total_stars as f64 / self.npix as f64;
        writeln!(f, "Tier: {}", self.tier)?;
        writeln!(f, "HEALPix order: {}", self.order)?;
        writeln!(f, "nside: {}", self.nside)?;
        writeln!(f, "npix: {}", self.npix)?;
        writeln!(f, "Total stars: {}", self.total_stars)?;
        match self.mag_limit {
            Some(limit) => writeln!(f, "Magnitude limit: < {:.1}", limit)?,
            None => writeln!(f, "Magnitude limit: none")?,
        }
        write!(f, "Average stars per cell: {:.1}", avg)
    }
}

/// One star row (40 bytes, `repr(C)`), read zero-copy from the map.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StoredStar {
    pub ra: f64,
    pub dec: f64,
    pub mag: f32,
    /// Cell id at the tier's own resolution.
    pub cell: u32,
    catalog_id: [u8; CATALOG_ID_LEN],
}

const _: () = assert!(std::mem::size_of::<StoredStar>() == ROW_SIZE);

impl StoredStar {
    pub fn new(cell: u32, star: &StarRecord) -> Self {
        let mut catalog_id = [0u8; CATALOG_ID_LEN];
        let id = star.catalog_id.as_bytes();
        let n = id.len().min(CATALOG_ID_LEN);
        catalog_id[..n].copy_from_slice(&id[..n]);
        Self {
            ra: star.ra,
            dec: star.dec,
            mag: star.mag as f32,
            cell,
            catalog_id,
        }
    }

    pub fn catalog_id(&self) -> &str {
        let end = self
            .catalog_id
            .iter()
            .position(|&b| b == 0)
            .unwrap_or(CATALOG_ID_LEN);
        std::str::from_utf8(&self.catalog_id[..end]).unwrap_or("")
    }

    /// Same star, re-keyed to another cell.
    pub fn with_cell(self, cell: u32) -> Self {
        Self { cell, ..self }
    }

    pub(crate) fn to_bytes(&self) -> [u8; ROW_SIZE] {
        let mut buf = [0u8; ROW_SIZE];
        buf[0..8].copy_from_slice(&self.ra.to_le_bytes());
        buf[8..16].copy_from_slice(&self.dec.to_le_bytes());
        buf[16..20].copy_from_slice(&self.mag.to_le_bytes());
        buf[20..24].copy_from_slice(&self.cell.to_le_bytes());
        buf[24..40].copy_from_slice(&self.catalog_id);
        buf
    }

    pub(crate) fn from_bytes(buf: &[u8; ROW_SIZE]) -> Self {
        let mut catalog_id = [0u8; CATALOG_ID_LEN];
        catalog_id.copy_from_slice(&buf[24..40]);
        Self {
            ra: f64::from_le_bytes(le_array(&buf[0..8])),
            dec: f64::from_le_bytes(le_array(&buf[8..16])),
            mag: f32::from_le_bytes(le_array(&buf[16..20])),
            cell: u32::from_le_bytes(le_array(&buf[20..24])),
            catalog_id,
        }
    }
}

fn le_array<const N: usize>(bytes: &[u8]) -> [u8; N] {
    let mut out = [0u8; N];
    out.copy_from_slice(&bytes[..N]);
    out
}

/// Memory-mapped handle to one tier file.
///
/// The file stays mapped for the lifetime of this value; row slices borrow
/// from the map.
pub struct TierCatalog {
    mmap: Mmap,
    header: TierHeader,
    path: PathBuf,
}

impl TierCatalog {
    /// Open, map, and validate a tier file.
    ///
    /// # Errors
    /// [`CatalogError::CatalogUnavailable`] if the file cannot be opened, is
    /// too small, has an invalid header, or its offset table disagrees with
    /// its row count.
    pub fn open(path: impl AsRef<Path>) -> CatalogResult<Self> {
        let path = path.as_ref();
        let file = File::open(path)
            .map_err(|e| CatalogError::unavailable(path, format!("Failed to open: {}", e)))?;
        let mmap = unsafe { Mmap::map(&file) }
            .map_err(|e| CatalogError::unavailable(path, format!("Failed to memory-map: {}", e)))?;

        if mmap.len() < HEADER_SIZE {
            return Err(CatalogError::unavailable(
                path,
                format!("Catalog file too small: {} bytes", mmap.len()),
            ));
        }

        let header = parse_header(&mmap[..HEADER_SIZE]).map_err(|m| CatalogError::unavailable(path, m))?;

        let expected = expected_file_size(&header).ok_or_else(|| {
            CatalogError::unavailable(
                path,
                format!("Row count {} overflows file size", header.total_stars),
            )
        })?;
        if mmap.len() as u64 != expected {
            return Err(CatalogError::unavailable(
                path,
                format!(
                    "Catalog file size {} does not match header, expected {}",
                    mmap.len(),
                    expected
                ),
            ));
        }

        let catalog = Self {
            mmap,
            header,
            path: path.to_path_buf(),
        };
        catalog.validate_offsets()?;
        debug!(
            path = %catalog.path.display(),
            tier = %catalog.header.tier,
            stars = catalog.header.total_stars,
            "opened tier catalog"
        );
        Ok(catalog)
    }

    fn validate_offsets(&self) -> CatalogResult<()> {
        let mut next = 0u64;
        for cell in 0..self.header.npix {
            let (offset, count) = self.cell_entry(cell);
            if offset != next {
                return Err(CatalogError::unavailable(
                    &self.path,
                    format!("Cell {} starts at byte {}, expected {}", cell, offset, next),
                ));
            }
            next += count as u64 * ROW_SIZE as u64;
        }
        if Some(next) != self.header.total_stars.checked_mul(ROW_SIZE as u64) {
            return Err(CatalogError::unavailable(
                &self.path,
                format!(
                    "Offset table covers {} rows, header says {}",
                    next / ROW_SIZE as u64,
                    self.header.total_stars
                ),
            ));
        }
        Ok(())
    }

    fn cell_entry(&self, cell: u64) -> (u64, u32) {
        let at = HEADER_SIZE + cell as usize * CELL_ENTRY_SIZE;
        let entry = &self.mmap[at..at + CELL_ENTRY_SIZE];
        (
            u64::from_le_bytes(le_array(&entry[0..8])),
            u32::from_le_bytes(le_array(&entry[8..12])),
        )
    }

    pub fn header(&self) -> &TierHeader {
        &self.header
    }

    pub fn tier(&self) -> CatalogTier {
        self.header.tier
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Total size of the mapped file in bytes.
    pub fn file_size(&self) -> usize {
        self.mmap.len()
    }

    /// Zero-copy slice of the rows in one cell, brightest first.
    ///
    /// Empty if `cell` is out of range or the data is misaligned.
    pub fn stars_in_cell(&self, cell: u64) -> &[StoredStar] {
        if cell >= self.header.npix {
            return &[];
        }
        let (offset, count) = self.cell_entry(cell);
        if count == 0 {
            return &[];
        }

        let rows_start = HEADER_SIZE + self.header.npix as usize * CELL_ENTRY_SIZE;
        let start = rows_start + offset as usize;
        let size = count as usize * ROW_SIZE;
        if start + size > self.mmap.len() {
            return &[];
        }

        let ptr = self.mmap[start..start + size].as_ptr();
        if !(ptr as usize).is_multiple_of(std::mem::align_of::<StoredStar>()) {
            return &[];
        }

        unsafe { std::slice::from_raw_parts(ptr as *const StoredStar, count as usize) }
    }

    /// Rows in any of `cells` with `mag < magnitude_limit`.
    ///
    /// Duplicate cell ids are ignored. Rows come back grouped by ascending cell
    /// id; callers must not rely on any other order.
    pub fn query(&self, cells: &[u64], magnitude_limit: f64) -> Vec<StoredStar> {
        let mut cells = cells.to_vec();
        cells.sort_unstable();
        cells.dedup();

        let mut rows = Vec::new();
        for cell in cells {
            rows.extend(
                self.stars_in_cell(cell)
                    .iter()
                    .take_while(|s| (s.mag as f64) < magnitude_limit),
            );
        }
        rows
    }

    /// Every row, in cell order.
    pub fn iter(&self) -> impl Iterator<Item = &StoredStar> + '_ {
        (0..self.header.npix).flat_map(move |cell| self.stars_in_cell(cell).iter())
    }

    /// Rows inside an RA/Dec box, bounds inclusive.
    ///
    /// When `ra_min > ra_max` the box wraps through RA 0.
    pub fn stars_in_box(&self, ra_min: f64, ra_max: f64, dec_min: f64, dec_max: f64) -> Vec<StoredStar> {
        let in_ra = |ra: f64| {
            if ra_min <= ra_max {
                ra >= ra_min && ra <= ra_max
            } else {
                ra >= ra_min || ra <= ra_max
            }
        };
        self.iter()
            .filter(|s| in_ra(s.ra) && s.dec >= dec_min && s.dec <= dec_max)
            .copied()
            .collect()
    }
}

/// Header, offset table and rows; `None` if the header's counts overflow.
fn expected_file_size(header: &TierHeader) -> Option<u64> {
    let table = header.npix.checked_mul(CELL_ENTRY_SIZE as u64)?;
    let rows = header.total_stars.checked_mul(ROW_SIZE as u64)?;
    (HEADER_SIZE as u64).checked_add(table)?.checked_add(rows)
}

fn parse_header(bytes: &[u8]) -> Result<TierHeader, String> {
    let magic = &bytes[0..4];
    if magic != CATALOG_MAGIC {
        return Err(format!(
            "Invalid catalog magic: expected {:?}, got {:?}",
            CATALOG_MAGIC, magic
        ));
    }

    let version = u32::from_le_bytes(le_array(&bytes[4..8]));
    if version != CATALOG_VERSION {
        return Err(format!(
            "Unsupported catalog version: expected {}, got {}",
            CATALOG_VERSION, version
        ));
    }

    let code = u32::from_le_bytes(le_array(&bytes[8..12]));
    let tier = CatalogTier::from_code(code).ok_or_else(|| format!("Unknown tier code {}", code))?;

    let order = u32::from_le_bytes(le_array(&bytes[12..16]));
    let nside = u32::from_le_bytes(le_array(&bytes[16..20]));
    let npix = u64::from_le_bytes(le_array(&bytes[24..32]));
    let total_stars = u64::from_le_bytes(le_array(&bytes[32..40]));
    let limit = f64::from_le_bytes(le_array(&bytes[40..48]));

    if order != tier.resolution().order() {
        return Err(format!(
            "Tier {} requires HEALPix order {}, got {}",
            tier,
            tier.resolution().order(),
            order
        ));
    }

    let expected_nside = 1u32 << order;
    if nside != expected_nside {
        return Err(format!(
            "Inconsistent nside: order {} implies nside {}, got {}",
            order, expected_nside, nside
        ));
    }

    let expected_npix = 12u64 * (nside as u64) * (nside as u64);
    if npix != expected_npix {
        return Err(format!(
            "Inconsistent npix: nside {} implies npix {}, got {}",
            nside, expected_npix, npix
        ));
    }

    Ok(TierHeader {
        tier,
        order,
        nside,
        npix,
        total_stars,
        mag_limit: limit.is_finite().then_some(limit),
    })
}

/// The three tiers opened together from one directory.
pub struct CatalogSet {
    pub bright: TierCatalog,
    pub mid: TierCatalog,
    pub full: TierCatalog,
}

impl CatalogSet {
    /// Open `hp48.cat`, `hp192.cat` and `hp768.cat` from `dir`.
    pub fn open(dir: impl AsRef<Path>) -> CatalogResult<Self> {
        let dir = dir.as_ref();
        let open = |tier: CatalogTier| -> CatalogResult<TierCatalog> {
            let catalog = TierCatalog::open(dir.join(tier.file_name()))?;
            if catalog.tier() != tier {
                return Err(CatalogError::unavailable(
                    catalog.path(),
                    format!("Expected {} tier, file holds {} tier", tier, catalog.tier()),
                ));
            }
            Ok(catalog)
        };
        Ok(Self {
            bright: open(CatalogTier::Bright)?,
            mid: open(CatalogTier::Mid)?,
            full: open(CatalogTier::Full)?,
        })
    }

    pub fn get(&self, tier: CatalogTier) -> &TierCatalog {
        match tier {
            CatalogTier::Bright => &self.bright,
            CatalogTier::Mid => &self.mid,
            CatalogTier::Full => &self.full,
        }
    }
}

/// Serialize a complete tier file from rows already grouped by cell and
/// sorted by magnitude. Used for small fixtures; the builder streams instead.
pub fn encode_tier(tier: CatalogTier, cells: &[Vec<StoredStar>]) -> Vec<u8> {
    let npix = tier.resolution().npix() as usize;
    let total: usize = cells.iter().take(npix).map(Vec::len).sum();
    let header = TierHeader::new(tier, total as u64);

    let mut buf = Vec::with_capacity(HEADER_SIZE + npix * CELL_ENTRY_SIZE + total * ROW_SIZE);
    buf.extend_from_slice(&header.encode());

    let mut offset = 0u64;
    for cell in 0..npix {
        let count = cells.get(cell).map_or(0, Vec::len) as u32;
        buf.extend_from_slice(&offset.to_le_bytes());
        buf.extend_from_slice(&count.to_le_bytes());
        buf.extend_from_slice(&0u32.to_le_bytes());
        offset += count as u64 * ROW_SIZE as u64;
    }
    for rows in cells.iter().take(npix) {
        for row in rows {
            buf.extend_from_slice(&row.to_bytes());
        }
    }
    buf
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tiling::cell_of;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn star(id: &str, ra: f64, dec: f64, mag: f64) -> StarRecord {
        StarRecord {
            catalog_id: id.to_string(),
            ra,
            dec,
            mag,
        }
    }

    fn row(tier: CatalogTier, s: &StarRecord) -> StoredStar {
        StoredStar::new(cell_of(s.ra, s.dec, tier.resolution()) as u32, s)
    }

    fn write_fixture(tier: CatalogTier, stars: &[StarRecord]) -> NamedTempFile {
        let npix = tier.resolution().npix() as usize;
        let mut cells: Vec<Vec<StoredStar>> = vec![Vec::new(); npix];
        for s in stars {
            let r = row(tier, s);
            cells[r.cell as usize].push(r);
        }
        for rows in &mut cells {
            rows.sort_by(|a, b| a.mag.total_cmp(&b.mag));
        }
        write_bytes(&encode_tier(tier, &cells))
    }

    fn write_bytes(bytes: &[u8]) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(bytes).unwrap();
        file.flush().unwrap();
        file
    }

    fn open_err(bytes: &[u8]) -> String {
        let file = write_bytes(bytes);
        match TierCatalog::open(file.path()) {
            Err(e @ CatalogError::CatalogUnavailable { .. }) => e.to_string(),
            Err(e) => panic!("unexpected error kind: {}", e),
            Ok(_) => panic!("expected error"),
        }
    }

    #[test]
    fn test_row_size_and_alignment() {
        assert_eq!(std::mem::size_of::<StoredStar>(), 40);
        assert_eq!(std::mem::align_of::<StoredStar>(), 8);
    }

    #[test]
    fn test_tier_rules() {
        assert!(CatalogTier::Bright.includes(5.99));
        assert!(!CatalogTier::Bright.includes(6.0));
        assert!(CatalogTier::Mid.includes(8.9));
        assert!(!CatalogTier::Mid.includes(9.0));
        assert!(CatalogTier::Full.includes(21.0));
        assert_eq!(CatalogTier::Mid.resolution(), Resolution::Cells192);
        assert_eq!(CatalogTier::Full.file_name(), "hp768.cat");
    }

    #[test]
    fn test_catalog_id_storage() {
        let s = StoredStar::new(3, &star("000100042", 1.0, 2.0, 3.0));
        assert_eq!(s.catalog_id(), "000100042");

        let long = StoredStar::new(3, &star("0123456789abcdefXYZ", 1.0, 2.0, 3.0));
        assert_eq!(long.catalog_id(), "0123456789abcdef");
        assert_eq!(StoredStar::from_bytes(&long.to_bytes()), long);
    }

    #[test]
    fn test_open_valid_catalog() {
        let file = write_fixture(CatalogTier::Bright, &[star("1", 180.0, -45.0, 5.5)]);
        let catalog = TierCatalog::open(file.path()).unwrap();
        let hdr = catalog.header();
        assert_eq!(hdr.tier, CatalogTier::Bright);
        assert_eq!(hdr.order, 1);
        assert_eq!(hdr.nside, 2);
        assert_eq!(hdr.npix, 48);
        assert_eq!(hdr.total_stars, 1);
        assert_eq!(hdr.mag_limit, Some(6.0));
        assert_eq!(catalog.file_size(), 64 + 48 * 16 + 40);
    }

    #[test]
    fn test_full_tier_has_no_limit() {
        let file = write_fixture(CatalogTier::Full, &[]);
        let catalog = TierCatalog::open(file.path()).unwrap();
        assert_eq!(catalog.header().mag_limit, None);
        assert_eq!(catalog.header().npix, 768);
    }

    #[test]
    fn test_open_missing_file() {
        let result = TierCatalog::open("/nonexistent/hp48.cat");
        assert!(matches!(result, Err(CatalogError::CatalogUnavailable { .. })));
    }

    #[test]
    fn test_open_truncated_file() {
        let msg = open_err(&[0u8; 32]);
        assert!(msg.contains("too small"), "{}", msg);
    }

    #[test]
    fn test_open_bad_magic() {
        let mut bytes = encode_tier(CatalogTier::Bright, &[]);
        bytes[0..4].copy_from_slice(b"XXXX");
        let msg = open_err(&bytes);
        assert!(msg.contains("Invalid catalog magic"), "{}", msg);
    }

    #[test]
    fn test_open_bad_version() {
        let mut bytes = encode_tier(CatalogTier::Bright, &[]);
        bytes[4..8].copy_from_slice(&99u32.to_le_bytes());
        let msg = open_err(&bytes);
        assert!(msg.contains("Unsupported catalog version"), "{}", msg);
    }

    #[test]
    fn test_open_wrong_order_for_tier() {
        let mut bytes = encode_tier(CatalogTier::Bright, &[]);
        bytes[12..16].copy_from_slice(&2u32.to_le_bytes());
        let msg = open_err(&bytes);
        assert!(msg.contains("requires HEALPix order 1"), "{}", msg);
    }

    #[test]
    fn test_open_inconsistent_nside() {
        let mut bytes = encode_tier(CatalogTier::Bright, &[]);
        bytes[16..20].copy_from_slice(&7u32.to_le_bytes());
        let msg = open_err(&bytes);
        assert!(msg.contains("Inconsistent nside"), "{}", msg);
    }

    #[test]
    fn test_open_inconsistent_npix() {
        let mut bytes = encode_tier(CatalogTier::Bright, &[]);
        bytes[24..32].copy_from_slice(&999u64.to_le_bytes());
        let msg = open_err(&bytes);
        assert!(msg.contains("Inconsistent npix"), "{}", msg);
    }

    #[test]
    fn test_open_size_mismatch() {
        let mut bytes = encode_tier(CatalogTier::Bright, &[]);
        bytes[32..40].copy_from_slice(&5u64.to_le_bytes());
        let msg = open_err(&bytes);
        assert!(msg.contains("does not match header"), "{}", msg);
    }

    #[test]
    fn test_open_huge_row_count() {
        for total in [u64::MAX / 8, u64::MAX / ROW_SIZE as u64, u64::MAX] {
            let mut bytes = encode_tier(CatalogTier::Bright, &[]);
            bytes[32..40].copy_from_slice(&total.to_le_bytes());
            let msg = open_err(&bytes);
            assert!(
                msg.contains("overflows file size") || msg.contains("does not match header"),
                "{}",
                msg
            );
        }
    }

    #[test]
    fn test_stars_in_cell() {
        let stars = [
            star("a", 10.0, 20.0, 5.0),
            star("b", 10.1, 20.1, 3.0),
            star("c", 10.2, 20.2, 4.0),
        ];
        let file = write_fixture(CatalogTier::Bright, &stars);
        let catalog = TierCatalog::open(file.path()).unwrap();

        let cell = cell_of(10.0, 20.0, Resolution::Cells48);
        let rows = catalog.stars_in_cell(cell);
        let ids: Vec<&str> = rows.iter().map(|r| r.catalog_id()).collect();
        assert_eq!(ids, vec!["b", "c", "a"]);
        assert!(rows.iter().all(|r| r.cell as u64 == cell));

        assert!(catalog.stars_in_cell((cell + 1) % 48).is_empty());
        assert!(catalog.stars_in_cell(48).is_empty());
        assert!(catalog.stars_in_cell(u64::MAX).is_empty());
    }

    #[test]
    fn test_query_applies_limit_and_cells() {
        let stars = [
            star("near-bright", 180.0, 0.0, 2.0),
            star("near-faint", 180.2, 0.1, 5.9),
            star("far", 0.0, 60.0, 1.0),
        ];
        let file = write_fixture(CatalogTier::Bright, &stars);
        let catalog = TierCatalog::open(file.path()).unwrap();

        let near = cell_of(180.0, 0.0, Resolution::Cells48);
        let far = cell_of(0.0, 60.0, Resolution::Cells48);

        let rows = catalog.query(&[near, near], 6.0);
        let ids: Vec<&str> = rows.iter().map(|r| r.catalog_id()).collect();
        assert_eq!(ids, vec!["near-bright", "near-faint"]);

        let rows = catalog.query(&[near], 5.0);
        assert_eq!(rows.len(), 1);

        let rows = catalog.query(&[near, far], f64::INFINITY);
        assert_eq!(rows.len(), 3);

        assert!(catalog.query(&[], 6.0).is_empty());
    }

    #[test]
    fn test_iter_and_box() {
        let stars = [
            star("a", 359.5, 10.0, 1.0),
            star("b", 0.5, 10.0, 2.0),
            star("c", 90.0, 10.0, 3.0),
            star("d", 0.2, -40.0, 4.0),
        ];
        let file = write_fixture(CatalogTier::Mid, &stars);
        let catalog = TierCatalog::open(file.path()).unwrap();
        assert_eq!(catalog.iter().count(), 4);

        let mut ids: Vec<String> = catalog
            .stars_in_box(359.0, 1.0, 0.0, 20.0)
            .iter()
            .map(|r| r.catalog_id().to_string())
            .collect();
        ids.sort();
        assert_eq!(ids, vec!["a", "b"]);

        let boxed = catalog.stars_in_box(80.0, 100.0, -90.0, 90.0);
        assert_eq!(boxed.len(), 1);
        assert_eq!(boxed[0].catalog_id(), "c");
    }

    #[test]
    fn test_header_display() {
        let header = TierHeader::new(CatalogTier::Mid, 960);
        let output = format!("{}", header);
        assert!(output.contains("Tier: mid"));
        assert!(output.contains("HEALPix order: 2"));
        assert!(output.contains("npix: 192"));
        assert!(output.contains("Magnitude limit: < 9.0"));
        assert!(output.contains("Average stars per cell: 5.0"));
    }

    #[test]
    fn test_catalog_set_checks_tier() {
        let dir = tempfile::tempdir().unwrap();
        for tier in CatalogTier::ALL {
            std::fs::write(dir.path().join(tier.file_name()), encode_tier(tier, &[])).unwrap();
        }
        let set = CatalogSet::open(dir.path()).unwrap();
        assert_eq!(set.get(CatalogTier::Mid).tier(), CatalogTier::Mid);

        std::fs::write(
            dir.path().join(CatalogTier::Bright.file_name()),
            encode_tier(CatalogTier::Mid, &[]),
        )
        .unwrap();
        assert!(matches!(
            CatalogSet::open(dir.path()),
            Err(CatalogError::CatalogUnavailable { .. })
        ));
    }

    #[test]
    fn test_catalog_set_missing_tier() {
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(
            CatalogSet::open(dir.path()),
            Err(CatalogError::CatalogUnavailable { .. })
        ));
    }
}
