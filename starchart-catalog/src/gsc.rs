//! Decoder for GSC 1.2 region files.
//!
//! Each file is one sky region:
//!
//! 1. **Header length** — 3 ASCII digits giving the total header size `H`
//! 2. **Header** — `H - 3` bytes of space-separated ASCII fields
//! 3. **Records** — fixed 12-byte big-endian bit-packed star entries until EOF
//!
//! Header fields used (zero-based positions after splitting on whitespace):
//!
//! | Position | Field |
//! |----------|-------|
//! | 1 | region number |
//! | 3 | RA offset |
//! | 5 | Dec offset |
//! | 7 | magnitude offset |
//! | 8 | RA scale |
//! | 9 | Dec scale |
//! | 11 | magnitude scale |
//!
//! Record bit layout, most significant bit first:
//!
//! ```text
//! spare:1 id:14 ra:22 dec:19 pos_err:9 mag_err:7 mag:11 band:4 class:3 plate:4 multiple:1 spare:1
//! ```
//!
//! [`GscReader`] yields [`StarRecord`]s lazily. Consecutive records with the
//! same raw id are plate duplicates of one star and only the first is kept.
//! Records whose magnitude field is zero are sentinels and are dropped.

use crate::error::{CatalogError, CatalogResult};
use flate2::read::GzDecoder;
use starchart_core::wrap_degrees;
use std::fs::File;
use std::io::{BufReader, ErrorKind, Read};
use std::path::Path;

pub const RECORD_SIZE: usize = 12;
const HEADER_LENGTH_DIGITS: usize = 3;
const MIN_HEADER_FIELDS: usize = 12;

/// A decoded catalog star.
#[derive(Debug, Clone, PartialEq)]
pub struct StarRecord {
    /// `<region><5-digit id>`, kept for cross-referencing only.
    pub catalog_id: String,
    /// Right ascension in degrees, [0, 360).
    pub ra: f64,
    /// Declination in degrees.
    pub dec: f64,
    /// Magnitude, always > 0.
    pub mag: f64,
}

/// Scaling parameters from a region file header.
#[derive(Debug, Clone, PartialEq)]
pub struct GscHeader {
    pub region: String,
    pub offset_ra: f64,
    pub offset_dec: f64,
    pub offset_mag: f64,
    pub scale_ra: f64,
    pub scale_dec: f64,
    pub scale_mag: f64,
}

impl GscHeader {
    /// Parse the header text that follows the 3-digit length prefix.
    pub fn parse(text: &str, source_name: &str) -> CatalogResult<Self> {
        let fields: Vec<&str> = text.split_whitespace().collect();
        if fields.len() < MIN_HEADER_FIELDS {
            return Err(CatalogError::malformed_header(
                source_name,
                format!(
                    "expected at least {} fields, found {}",
                    MIN_HEADER_FIELDS,
                    fields.len()
                ),
            ));
        }

        let number = |index: usize, name: &str| -> CatalogResult<f64> {
            fields[index].parse::<f64>().map_err(|_| {
                CatalogError::malformed_header(
                    source_name,
                    format!("{} field '{}' is not a number", name, fields[index]),
                )
            })
        };

        let header = Self {
            region: fields[1].to_string(),
            offset_ra: number(3, "RA offset")?,
            offset_dec: number(5, "Dec offset")?,
            offset_mag: number(7, "magnitude offset")?,
            scale_ra: number(8, "RA scale")?,
            scale_dec: number(9, "Dec scale")?,
            scale_mag: number(11, "magnitude scale")?,
        };

        for (name, scale) in [
            ("RA scale", header.scale_ra),
            ("Dec scale", header.scale_dec),
            ("magnitude scale", header.scale_mag),
        ] {
            if scale == 0.0 || !scale.is_finite() {
                return Err(CatalogError::malformed_header(
                    source_name,
                    format!("{} must be finite and non-zero, got {}", name, scale),
                ));
            }
        }

        Ok(header)
    }

    /// Encode as a complete header block, length prefix included.
    ///
    /// Fields the decoder ignores are written as zeros so positions line up.
    pub fn encode(&self) -> Vec<u8> {
        let body = format!(
            " 2 {} 0 {} 0 {} 0 {} {} {} 0 {} 0 ",
            self.region,
            self.offset_ra,
            self.offset_dec,
            self.offset_mag,
            self.scale_ra,
            self.scale_dec,
            self.scale_mag
        );
        let total = body.len() + HEADER_LENGTH_DIGITS;
        format!("{:03}{}", total, body).into_bytes()
    }

    fn decode(&self, raw: &RawRecord) -> StarRecord {
        StarRecord {
            catalog_id: format!("{}{:05}", self.region, raw.id),
            ra: wrap_degrees(self.offset_ra + raw.ra as f64 / self.scale_ra),
            dec: self.offset_dec + raw.dec as f64 / self.scale_dec,
            mag: self.offset_mag + raw.mag as f64 / self.scale_mag,
        }
    }
}

/// One undecoded 12-byte record.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RawRecord {
    pub id: u16,
    pub ra: u32,
    pub dec: u32,
    pub pos_error: u16,
    pub mag_error: u8,
    pub mag: u16,
    pub band: u8,
    pub class: u8,
    pub plate: u8,
    pub multiple: bool,
}

const FIELD_WIDTHS: [u32; 12] = [1, 14, 22, 19, 9, 7, 11, 4, 3, 4, 1, 1];

impl RawRecord {
    pub fn parse(bytes: &[u8; RECORD_SIZE]) -> Self {
        let mut cursor = BitCursor::new(bytes);
        let mut fields = [0u32; FIELD_WIDTHS.len()];
        for (slot, &width) in fields.iter_mut().zip(FIELD_WIDTHS.iter()) {
            *slot = cursor.take(width);
        }
        Self {
            id: fields[1] as u16,
            ra: fields[2],
            dec: fields[3],
            pos_error: fields[4] as u16,
            mag_error: fields[5] as u8,
            mag: fields[6] as u16,
            band: fields[7] as u8,
            class: fields[8] as u8,
            plate: fields[9] as u8,
            multiple: fields[10] != 0,
        }
    }

    /// Pack back into the on-disk layout. Values wider than their field are masked.
    pub fn to_bytes(&self) -> [u8; RECORD_SIZE] {
        let values = [
            0,
            self.id as u32,
            self.ra,
            self.dec,
            self.pos_error as u32,
            self.mag_error as u32,
            self.mag as u32,
            self.band as u32,
            self.class as u32,
            self.plate as u32,
            self.multiple as u32,
            0,
        ];
        let mut bits: u128 = 0;
        for (&value, &width) in values.iter().zip(FIELD_WIDTHS.iter()) {
            bits = (bits << width) | (value as u128 & mask(width));
        }
        let wide = bits.to_be_bytes();
        let mut out = [0u8; RECORD_SIZE];
        out.copy_from_slice(&wide[16 - RECORD_SIZE..]);
        out
    }
}

fn mask(width: u32) -> u128 {
    (1u128 << width) - 1
}

struct BitCursor {
    bits: u128,
    remaining: u32,
}

impl BitCursor {
    fn new(bytes: &[u8; RECORD_SIZE]) -> Self {
        let mut wide = [0u8; 16];
        wide[16 - RECORD_SIZE..].copy_from_slice(bytes);
        Self {
            bits: u128::from_be_bytes(wide),
            remaining: (RECORD_SIZE * 8) as u32,
        }
    }

    fn take(&mut self, width: u32) -> u32 {
        self.remaining -= width;
        ((self.bits >> self.remaining) & mask(width)) as u32
    }
}

/// Per-file decode counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DecodeStats {
    /// Raw records read, including the ones skipped below.
    pub records: u64,
    pub duplicates: u64,
    /// Records with a zero or non-positive magnitude.
    pub rejected: u64,
}

/// Lazy decoder over one region file.
pub struct GscReader<R> {
    reader: R,
    header: GscHeader,
    source_name: String,
    last_id: Option<u16>,
    stats: DecodeStats,
    done: bool,
}

impl<R: Read> GscReader<R> {
    /// Read and parse the header, leaving the reader at the first record.
    pub fn new(mut reader: R, source_name: impl Into<String>) -> CatalogResult<Self> {
        let source_name = source_name.into();

        let mut prefix = [0u8; HEADER_LENGTH_DIGITS];
        reader.read_exact(&mut prefix).map_err(|e| {
            CatalogError::malformed_header(&source_name, format!("missing length prefix: {}", e))
        })?;
        let header_len = std::str::from_utf8(&prefix)
            .ok()
            .and_then(|s| s.trim().parse::<usize>().ok())
            .filter(|&len| len > HEADER_LENGTH_DIGITS)
            .ok_or_else(|| {
                CatalogError::malformed_header(
                    &source_name,
                    format!("invalid length prefix {:?}", String::from_utf8_lossy(&prefix)),
                )
            })?;

        let mut text = vec![0u8; header_len - HEADER_LENGTH_DIGITS];
        reader.read_exact(&mut text).map_err(|e| {
            CatalogError::malformed_header(
                &source_name,
                format!("header shorter than {} bytes: {}", header_len, e),
            )
        })?;
        let text = std::str::from_utf8(&text)
            .map_err(|_| CatalogError::malformed_header(&source_name, "header is not ASCII"))?;
        let header = GscHeader::parse(text, &source_name)?;

        Ok(Self {
            reader,
            header,
            source_name,
            last_id: None,
            stats: DecodeStats::default(),
            done: false,
        })
    }

    pub fn header(&self) -> &GscHeader {
        &self.header
    }

    pub fn stats(&self) -> DecodeStats {
        self.stats
    }

    /// Fill `buf` unless EOF comes first; returns the byte count read.
    fn read_record(&mut self, buf: &mut [u8; RECORD_SIZE]) -> std::io::Result<usize> {
        let mut filled = 0;
        while filled < RECORD_SIZE {
            match self.reader.read(&mut buf[filled..]) {
                Ok(0) => break,
                Ok(n) => filled += n,
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => return Err(e),
            }
        }
        Ok(filled)
    }
}

impl<R: Read> Iterator for GscReader<R> {
    type Item = CatalogResult<StarRecord>;

    fn next(&mut self) -> Option<Self::Item> {
        while !self.done {
            let mut buf = [0u8; RECORD_SIZE];
            let filled = match self.read_record(&mut buf) {
                Ok(n) => n,
                Err(e) => {
                    self.done = true;
                    return Some(Err(CatalogError::io(&self.source_name, e)));
                }
            };
            if filled == 0 {
                self.done = true;
                return None;
            }
            if filled < RECORD_SIZE {
                self.done = true;
                return Some(Err(CatalogError::truncated_record(
                    &self.source_name,
                    self.stats.records,
                    filled,
                )));
            }

            self.stats.records += 1;
            let raw = RawRecord::parse(&buf);

            if self.last_id == Some(raw.id) {
                self.stats.duplicates += 1;
                continue;
            }
            self.last_id = Some(raw.id);

            if raw.mag == 0 {
                self.stats.rejected += 1;
                continue;
            }
            let star = self.header.decode(&raw);
            if star.mag <= 0.0 || !star.mag.is_finite() {
                self.stats.rejected += 1;
                continue;
            }
            return Some(Ok(star));
        }
        None
    }
}

/// True for `*.GSC` and `*.GSC.gz`, any case.
pub fn is_catalog_file(path: &Path) -> bool {
    let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
        return false;
    };
    let name = name.to_ascii_lowercase();
    name.ends_with(".gsc") || name.ends_with(".gsc.gz")
}

fn is_gzipped(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("gz"))
}

/// Open a region file, decompressing `.gz` sources on the fly.
pub fn open_catalog_file(path: &Path) -> CatalogResult<GscReader<Box<dyn Read + Send>>> {
    let file = File::open(path).map_err(|e| CatalogError::io(path, e))?;
    let reader: Box<dyn Read + Send> = if is_gzipped(path) {
        Box::new(BufReader::new(GzDecoder::new(BufReader::new(file))))
    } else {
        Box::new(BufReader::new(file))
    };
    GscReader::new(reader, path.display().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{Cursor, Write};

    fn header() -> GscHeader {
        GscHeader {
            region: "0042".to_string(),
            offset_ra: 10.0,
            offset_dec: -20.0,
            offset_mag: 0.0,
            scale_ra: 1000.0,
            scale_dec: 1000.0,
            scale_mag: 100.0,
        }
    }

    fn record(id: u16, ra: u32, dec: u32, mag: u16) -> RawRecord {
        RawRecord {
            id,
            ra,
            dec,
            mag,
            ..RawRecord::default()
        }
    }

    fn file_bytes(header: &GscHeader, records: &[RawRecord]) -> Vec<u8> {
        let mut buf = header.encode();
        for r in records {
            buf.extend_from_slice(&r.to_bytes());
        }
        buf
    }

    fn decode_all(bytes: Vec<u8>) -> Vec<CatalogResult<StarRecord>> {
        GscReader::new(Cursor::new(bytes), "test.GSC").unwrap().collect()
    }

    #[test]
    fn test_bit_layout_matches_field_order() {
        let raw = RawRecord {
            id: 0x3FFF,
            ..RawRecord::default()
        };
        let bytes = raw.to_bytes();
        // spare bit then 14 id bits set
        assert_eq!(bytes[0], 0b0111_1111);
        assert_eq!(bytes[1], 0b1111_1110);
        assert!(bytes[2..].iter().all(|&b| b == 0));

        let raw = RawRecord {
            multiple: true,
            ..RawRecord::default()
        };
        assert_eq!(raw.to_bytes()[11], 0b0000_0010);
    }

    #[test]
    fn test_parse_inverts_to_bytes() {
        let raw = RawRecord {
            id: 12345,
            ra: 0x3F_FFFF,
            dec: 0x5_5555,
            pos_error: 511,
            mag_error: 77,
            mag: 2047,
            band: 9,
            class: 5,
            plate: 14,
            multiple: true,
        };
        assert_eq!(RawRecord::parse(&raw.to_bytes()), raw);
    }

    #[test]
    fn test_header_parse_positions() {
        let text = "2 0042 1234 10.5 11.0 -20.25 -19.0 3.5 3600.0 7200.0 10.0 100.0 2 P1 P2";
        let h = GscHeader::parse(text, "x").unwrap();
        assert_eq!(h.region, "0042");
        assert_eq!(h.offset_ra, 10.5);
        assert_eq!(h.offset_dec, -20.25);
        assert_eq!(h.offset_mag, 3.5);
        assert_eq!(h.scale_ra, 3600.0);
        assert_eq!(h.scale_dec, 7200.0);
        assert_eq!(h.scale_mag, 100.0);
    }

    #[test]
    fn test_header_encode_parse() {
        let h = header();
        let reader = GscReader::new(Cursor::new(h.encode()), "x").unwrap();
        assert_eq!(reader.header(), &h);
    }

    #[test]
    fn test_malformed_headers() {
        let short = b"010 2 0042".to_vec();
        assert!(matches!(
            GscReader::new(Cursor::new(short), "x"),
            Err(CatalogError::MalformedHeader { .. })
        ));

        let not_digits = b"abc 2 0042".to_vec();
        assert!(matches!(
            GscReader::new(Cursor::new(not_digits), "x"),
            Err(CatalogError::MalformedHeader { .. })
        ));

        let too_few = b"012 2 0042 1".to_vec();
        assert!(matches!(
            GscReader::new(Cursor::new(too_few), "x"),
            Err(CatalogError::MalformedHeader { .. })
        ));

        let zero_scale = GscHeader {
            scale_ra: 0.0,
            ..header()
        };
        assert!(matches!(
            GscReader::new(Cursor::new(zero_scale.encode()), "x"),
            Err(CatalogError::MalformedHeader { .. })
        ));
    }

    #[test]
    fn test_decode_values() {
        let bytes = file_bytes(&header(), &[record(7, 5_000, 40_000, 250)]);
        let stars: Vec<StarRecord> = decode_all(bytes).into_iter().map(|r| r.unwrap()).collect();
        assert_eq!(stars.len(), 1);
        let s = &stars[0];
        assert_eq!(s.catalog_id, "004200007");
        assert!((s.ra - 15.0).abs() < 1e-12);
        assert!((s.dec - 20.0).abs() < 1e-12);
        assert!((s.mag - 2.5).abs() < 1e-12);
    }

    #[test]
    fn test_consecutive_duplicates_keep_first() {
        let bytes = file_bytes(
            &header(),
            &[
                record(1, 1_000, 0, 500),
                record(1, 2_000, 0, 600),
                record(1, 3_000, 0, 700),
                record(2, 4_000, 0, 800),
                record(1, 5_000, 0, 900),
            ],
        );
        let mut reader = GscReader::new(Cursor::new(bytes), "x").unwrap();
        let stars: Vec<StarRecord> = reader.by_ref().map(|r| r.unwrap()).collect();
        let mags: Vec<f64> = stars.iter().map(|s| s.mag).collect();
        assert_eq!(mags, vec![5.0, 8.0, 9.0]);
        assert_eq!(reader.stats().duplicates, 2);
        assert_eq!(reader.stats().records, 5);
    }

    #[test]
    fn test_zero_magnitude_sentinel_dropped() {
        let bytes = file_bytes(
            &header(),
            &[record(1, 0, 0, 0), record(2, 0, 0, 100), record(3, 0, 0, 0)],
        );
        let mut reader = GscReader::new(Cursor::new(bytes), "x").unwrap();
        let stars: Vec<StarRecord> = reader.by_ref().map(|r| r.unwrap()).collect();
        assert_eq!(stars.len(), 1);
        assert_eq!(stars[0].catalog_id, "004200002");
        assert_eq!(reader.stats().rejected, 2);
    }

    #[test]
    fn test_dedup_tracks_rejected_records() {
        // a sentinel still counts as the previous id
        let bytes = file_bytes(&header(), &[record(4, 0, 0, 0), record(4, 0, 0, 300)]);
        let stars: Vec<_> = decode_all(bytes);
        assert!(stars.is_empty());
    }

    #[test]
    fn test_non_positive_decoded_magnitude_dropped() {
        let h = GscHeader {
            offset_mag: -5.0,
            ..header()
        };
        let bytes = file_bytes(&h, &[record(1, 0, 0, 100), record(2, 0, 0, 600)]);
        let stars: Vec<StarRecord> = decode_all(bytes).into_iter().map(|r| r.unwrap()).collect();
        assert_eq!(stars.len(), 1);
        assert!((stars[0].mag - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_ra_normalized_into_range() {
        let h = GscHeader {
            offset_ra: 359.5,
            ..header()
        };
        let bytes = file_bytes(&h, &[record(1, 0, 0, 100), record(2, 1_000, 0, 100)]);
        for star in decode_all(bytes) {
            let star = star.unwrap();
            assert!((0.0..360.0).contains(&star.ra), "ra {}", star.ra);
        }

        let h = GscHeader {
            offset_ra: -0.5,
            ..header()
        };
        let bytes = file_bytes(&h, &[record(1, 0, 0, 100)]);
        let star = decode_all(bytes).remove(0).unwrap();
        assert!((star.ra - 359.5).abs() < 1e-12);
    }

    #[test]
    fn test_truncated_trailing_record_is_error() {
        let mut bytes = file_bytes(&header(), &[record(1, 0, 0, 100), record(2, 0, 0, 100)]);
        bytes.extend_from_slice(&[0xAB; 5]);
        let results = decode_all(bytes);
        assert_eq!(results.len(), 3);
        assert!(results[0].is_ok());
        assert!(results[1].is_ok());
        match &results[2] {
            Err(CatalogError::TruncatedRecord {
                records, trailing, ..
            }) => {
                assert_eq!(*records, 2);
                assert_eq!(*trailing, 5);
            }
            other => panic!("expected truncated record, got {:?}", other),
        }
    }

    #[test]
    fn test_empty_body_yields_nothing() {
        assert!(decode_all(header().encode()).is_empty());
    }

    #[test]
    fn test_is_catalog_file() {
        assert!(is_catalog_file(Path::new("/x/N0000/0001.GSC")));
        assert!(is_catalog_file(Path::new("0001.gsc")));
        assert!(is_catalog_file(Path::new("0001.GSC.gz")));
        assert!(!is_catalog_file(Path::new("0001.GSC.txt")));
        assert!(!is_catalog_file(Path::new("README")));
    }

    #[test]
    fn test_open_gzipped_file() {
        use flate2::write::GzEncoder;
        use flate2::Compression;

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("0042.GSC.gz");
        let mut encoder = GzEncoder::new(File::create(&path).unwrap(), Compression::default());
        encoder
            .write_all(&file_bytes(&header(), &[record(9, 0, 0, 120)]))
            .unwrap();
        encoder.finish().unwrap();

        let stars: Vec<StarRecord> = open_catalog_file(&path)
            .unwrap()
            .map(|r| r.unwrap())
            .collect();
        assert_eq!(stars.len(), 1);
        assert_eq!(stars[0].catalog_id, "004200009");
    }

    #[test]
    fn test_open_missing_file() {
        let result = open_catalog_file(Path::new("/nonexistent/0001.GSC"));
        assert!(matches!(result, Err(CatalogError::Io { .. })));
    }
}
