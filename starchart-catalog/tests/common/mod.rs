#![allow(dead_code)]

use flate2::write::GzEncoder;
use flate2::Compression;
use starchart_catalog::gsc::{GscHeader, RawRecord};
use std::fs;
use std::io::Write;
use std::path::Path;

pub const SCALE_RA: f64 = 10000.0;
pub const SCALE_DEC: f64 = 2000.0;
pub const SCALE_MAG: f64 = 100.0;

pub fn header(region: &str) -> GscHeader {
    GscHeader {
        region: region.to_string(),
        offset_ra: 0.0,
        offset_dec: -90.0,
        offset_mag: 0.0,
        scale_ra: SCALE_RA,
        scale_dec: SCALE_DEC,
        scale_mag: SCALE_MAG,
    }
}

/// Raw record that decodes to (`ra`, `dec`, `mag`) under [`header`].
pub fn record(id: u16, ra: f64, dec: f64, mag: f64) -> RawRecord {
    RawRecord {
        id,
        ra: (ra * SCALE_RA).round() as u32,
        dec: ((dec + 90.0) * SCALE_DEC).round() as u32,
        mag: (mag * SCALE_MAG).round() as u16,
        plate: 3,
        ..RawRecord::default()
    }
}

pub fn encode_source(region: &str, records: &[RawRecord]) -> Vec<u8> {
    let mut bytes = header(region).encode();
    for r in records {
        bytes.extend_from_slice(&r.to_bytes());
    }
    bytes
}

pub fn write_source(path: &Path, region: &str, records: &[RawRecord]) {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    fs::write(path, encode_source(region, records)).unwrap();
}

pub fn write_gz_source(path: &Path, region: &str, records: &[RawRecord]) {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(&encode_source(region, records)).unwrap();
    fs::write(path, encoder.finish().unwrap()).unwrap();
}

/// Deterministic pseudo-random sky: (ra, dec, mag) triples.
pub fn synthetic_sky(count: usize, seed: u64) -> Vec<(f64, f64, f64)> {
    let mut state = seed;
    let mut next = move || {
        state = state
            .wrapping_mul(6364136223846793005)
            .wrapping_add(1442695040888963407);
        (state >> 11) as f64 / (1u64 << 53) as f64
    };
    (0..count)
        .map(|_| {
            let ra = (next() * 3_599_999.0).round() / SCALE_RA;
            let dec = ((next() * 2.0 - 1.0).asin().to_degrees() * SCALE_DEC).round() / SCALE_DEC;
            let mag = 1.0 + (next() * 1400.0).round() / SCALE_MAG;
            (ra, dec, mag)
        })
        .collect()
}
