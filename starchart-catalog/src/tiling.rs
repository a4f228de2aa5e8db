//! HEALPix nested tiling at the three catalog resolutions.
//!
//! | Resolution | Order | nside | Cells |
//! |------------|-------|-------|-------|
//! | [`Resolution::Cells48`] | 1 | 2 | 48 |
//! | [`Resolution::Cells192`] | 2 | 4 | 192 |
//! | [`Resolution::Cells768`] | 3 | 8 | 768 |
//!
//! The nested scheme makes the resolutions hierarchical: a cell at order `k`
//! contains the four cells `4c..4c+3` at order `k + 1`, so
//! `cell_768 >> 4 == cell_48`. The builder relies on this to compute one
//! cell per star and derive the coarser two.
//!
//! Cone queries use a precomputed table of cell centers and bounding radii.
//! A cell can only hold a point inside the cone if the distance between the
//! cone center and the cell center is at most `radius + cell_radius`, so the
//! returned set may contain extra cells but never misses one.

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use starchart_core::constants::{DEG_TO_RAD, RAD_TO_DEG};
use starchart_core::{angular_separation_deg, wrap_degrees};

/// One of the three tiling resolutions used by the catalog tiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Resolution {
    Cells48,
    Cells192,
    Cells768,
}

impl Resolution {
    pub const ALL: [Resolution; 3] = [Self::Cells48, Self::Cells192, Self::Cells768];

    /// HEALPix order (nside = 2^order).
    pub const fn order(self) -> u32 {
        match self {
            Self::Cells48 => 1,
            Self::Cells192 => 2,
            Self::Cells768 => 3,
        }
    }

    pub const fn nside(self) -> u64 {
        1 << self.order()
    }

    pub const fn npix(self) -> u64 {
        12 * self.nside() * self.nside()
    }

    pub fn from_order(order: u32) -> Option<Self> {
        Self::ALL.into_iter().find(|r| r.order() == order)
    }

    fn index(self) -> usize {
        (self.order() - 1) as usize
    }
}

/// Cell containing `(ra, dec)` at the given resolution.
pub fn cell_of(ra_deg: f64, dec_deg: f64, resolution: Resolution) -> u64 {
    ang2pix_nest(resolution.order(), ra_deg, dec_deg)
}

/// Map a cell id at a finer resolution to the enclosing cell at a coarser one.
///
/// Returns `cell` unchanged when `to` is not coarser than `from`.
pub fn parent_cell(cell: u64, from: Resolution, to: Resolution) -> u64 {
    if to.order() >= from.order() {
        return cell;
    }
    cell >> (2 * (from.order() - to.order()))
}

/// Convert (RA, Dec) in degrees to a HEALPix nested pixel index.
///
/// Follows Gorski et al. (2005): the equatorial belt `|z| <= 2/3` and the
/// polar caps use different projections onto the 12 base faces, then the
/// in-face (ix, iy) position is bit-interleaved.
pub fn ang2pix_nest(order: u32, ra_deg: f64, dec_deg: f64) -> u64 {
    let nside = 1i64 << order;
    let n = nside as f64;
    let z = libm::sin(dec_deg.clamp(-90.0, 90.0) * DEG_TO_RAD);
    let za = libm::fabs(z);
    let tt = wrap_degrees(ra_deg) / 90.0;

    let (face, ix, iy) = if za <= 2.0 / 3.0 {
        let temp1 = n * (0.5 + tt);
        let temp2 = n * z * 0.75;
        let jp = (temp1 - temp2) as i64;
        let jm = (temp1 + temp2) as i64;
        let ifp = jp >> order;
        let ifm = jm >> order;
        let face = if ifp == ifm {
            ifp | 4
        } else if ifp < ifm {
            ifp
        } else {
            ifm + 8
        };
        let ix = jm & (nside - 1);
        let iy = nside - (jp & (nside - 1)) - 1;
        (face, ix, iy)
    } else {
        let ntt = (tt as i64).min(3);
        let tp = tt - ntt as f64;
        let tmp = n * libm::sqrt(3.0 * (1.0 - za));
        let jp = ((tp * tmp) as i64).min(nside - 1);
        let jm = (((1.0 - tp) * tmp) as i64).min(nside - 1);
        if z >= 0.0 {
            (ntt, nside - jm - 1, nside - jp - 1)
        } else {
            (ntt + 8, jp, jm)
        }
    };

    ((face as u64) << (2 * order)) + xy2pix_nest(ix as u64, iy as u64, order)
}

/// Sky position of a point inside a cell, in degrees.
///
/// `fx`, `fy` are fractional offsets within the cell's face grid square
/// (0.5, 0.5 is the center; 0 and 1 are edges).
fn pix2ang_nest(order: u32, pixel: u64, fx: f64, fy: f64) -> (f64, f64) {
    const JRLL: [f64; 12] = [2.0, 2.0, 2.0, 2.0, 3.0, 3.0, 3.0, 3.0, 4.0, 4.0, 4.0, 4.0];
    const JPLL: [f64; 12] = [1.0, 3.0, 5.0, 7.0, 0.0, 2.0, 4.0, 6.0, 1.0, 3.0, 5.0, 7.0];

    let n = (1u64 << order) as f64;
    let face = (pixel >> (2 * order)) as usize;
    let (ix, iy) = pix2xy_nest(pixel & ((1u64 << (2 * order)) - 1), order);
    let x = (ix as f64 + fx) / n;
    let y = (iy as f64 + fy) / n;

    let jr = JRLL[face] - x - y;
    let (nr, z) = if jr < 1.0 {
        (jr, 1.0 - jr * jr / 3.0)
    } else if jr > 3.0 {
        let nr = 4.0 - jr;
        (nr, nr * nr / 3.0 - 1.0)
    } else {
        (1.0, (2.0 - jr) * 2.0 / 3.0)
    };

    let mut tmp = JPLL[face] * nr + x - y;
    if tmp < 0.0 {
        tmp += 8.0;
    }
    if tmp >= 8.0 {
        tmp -= 8.0;
    }
    let phi_deg = if nr < 1e-15 { 0.0 } else { 45.0 * tmp / nr };

    (
        wrap_degrees(phi_deg),
        libm::asin(z.clamp(-1.0, 1.0)) * RAD_TO_DEG,
    )
}

/// Center of a cell in degrees.
pub fn cell_center(cell: u64, resolution: Resolution) -> (f64, f64) {
    pix2ang_nest(resolution.order(), cell, 0.5, 0.5)
}

/// Convert (ix, iy) to nested pixel index within a base face using Z-order curve.
fn xy2pix_nest(ix: u64, iy: u64, order: u32) -> u64 {
    let mut result: u64 = 0;
    for i in 0..order {
        let bit_x = (ix >> i) & 1;
        let bit_y = (iy >> i) & 1;
        result |= (bit_x << (2 * i)) | (bit_y << (2 * i + 1));
    }
    result
}

fn pix2xy_nest(ipf: u64, order: u32) -> (u64, u64) {
    let mut ix = 0;
    let mut iy = 0;
    for i in 0..order {
        ix |= ((ipf >> (2 * i)) & 1) << i;
        iy |= ((ipf >> (2 * i + 1)) & 1) << i;
    }
    (ix, iy)
}

#[derive(Debug, Clone, Copy)]
struct CellBound {
    ra: f64,
    dec: f64,
    radius: f64,
}

const EDGE_SAMPLES: usize = 16;
const RADIUS_PAD: f64 = 1.05;

fn compute_bounds(resolution: Resolution) -> Vec<CellBound> {
    let order = resolution.order();
    (0..resolution.npix())
        .map(|cell| {
            let (ra, dec) = pix2ang_nest(order, cell, 0.5, 0.5);
            let mut radius: f64 = 0.0;
            for k in 0..=EDGE_SAMPLES {
                let t = k as f64 / EDGE_SAMPLES as f64;
                for (fx, fy) in [(t, 0.0), (1.0, t), (1.0 - t, 1.0), (0.0, 1.0 - t)] {
                    let (bra, bdec) = pix2ang_nest(order, cell, fx, fy);
                    radius = radius.max(angular_separation_deg(ra, dec, bra, bdec));
                }
            }
            CellBound {
                ra,
                dec,
                radius: radius * RADIUS_PAD,
            }
        })
        .collect()
}

static CELL_BOUNDS: Lazy<[Vec<CellBound>; 3]> = Lazy::new(|| {
    [
        compute_bounds(Resolution::Cells48),
        compute_bounds(Resolution::Cells192),
        compute_bounds(Resolution::Cells768),
    ]
});

/// Bounding radius of a cell in degrees: no point of the cell is farther
/// than this from [`cell_center`].
pub fn cell_radius(cell: u64, resolution: Resolution) -> f64 {
    CELL_BOUNDS[resolution.index()]
        .get(cell as usize)
        .map_or(0.0, |b| b.radius)
}

/// Every cell that may hold a point within `radius_deg` of the center,
/// in ascending id order.
///
/// # Arguments
/// * `center_ra` - Cone center right ascension in degrees
/// * `center_dec` - Cone center declination in degrees
/// * `radius_deg` - Cone radius in degrees
/// * `resolution` - Tiling to search
///
/// # Returns
/// Cell ids whose bounding circle overlaps the cone. A radius of 180° or
/// more covers the sphere and returns every cell; negative or NaN radii are
/// treated as zero.
pub fn cells_in_radius(
    center_ra: f64,
    center_dec: f64,
    radius_deg: f64,
    resolution: Resolution,
) -> Vec<u64> {
    if radius_deg >= 180.0 {
        return (0..resolution.npix()).collect();
    }
    let radius = if radius_deg > 0.0 { radius_deg } else { 0.0 };
    let ra = wrap_degrees(center_ra);
    let dec = center_dec.clamp(-90.0, 90.0);

    CELL_BOUNDS[resolution.index()]
        .iter()
        .enumerate()
        .filter(|(_, b)| angular_separation_deg(ra, dec, b.ra, b.dec) <= radius + b.radius)
        .map(|(cell, _)| cell as u64)
        .collect()
}
