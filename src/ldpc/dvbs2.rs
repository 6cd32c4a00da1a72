//! DVB-S2-style accumulator construction
//!
//! Irregular repeat-accumulate matrices in the manner of the DVB-S2
//! standard: systematic bits are placed in groups, each group row of the
//! parameter table naming the accumulator taps of its first bit; the
//! remaining bits of the group reuse the taps shifted by multiples of
//! `q = parity / group`. The parity part is the accumulator chain
//! `p_i = p_{i-1} xor (taps of check i)`, a double diagonal.
//!
//! The table below carries one parameter set per supported
//! `(length, rate)` pair, in the compact constant style code tables are
//! usually shipped in.

use crate::error::CodecError;
use crate::sparse::SparseBitMatrix;

struct FrameParameters {
    length: usize,
    rate: (usize, usize),
    group: usize,
    // Accumulator taps of the first bit of every systematic group.
    addresses: &'static [&'static [u32]],
}

static FRAME_TABLE: &[FrameParameters] = &[
    FrameParameters {
        length: 1024,
        rate: (1, 2),
        group: 32,
        addresses: &[
            &[0, 47, 89, 164, 227, 303, 391, 460],
            &[12, 73, 135, 198, 256, 341, 419, 497],
            &[29, 61, 150, 212, 288, 327, 405, 481],
            &[7, 181, 370],
            &[53, 249, 438],
            &[96, 310, 502],
            &[21, 166, 423],
            &[118, 274, 357],
            &[5, 201, 466],
            &[84, 338, 511],
            &[140, 295, 379],
            &[36, 230, 489],
            &[108, 265, 412],
            &[67, 187, 345],
            &[155, 320, 443],
            &[92, 243, 506],
        ],
    },
    FrameParameters {
        length: 2048,
        rate: (1, 2),
        group: 64,
        addresses: &[
            &[0, 95, 178, 329, 456, 611, 740, 903],
            &[24, 147, 271, 390, 514, 669, 788, 951],
            &[58, 123, 301, 442, 577, 655, 810, 987],
            &[15, 363, 741],
            &[107, 499, 876],
            &[193, 620, 1005],
            &[43, 333, 847],
            &[237, 548, 715],
            &[11, 403, 933],
            &[169, 677, 1022],
            &[281, 590, 759],
            &[73, 461, 979],
            &[217, 531, 825],
            &[135, 375, 691],
            &[311, 641, 887],
            &[185, 487, 1013],
        ],
    },
];

pub struct DvbS2;

impl DvbS2 {
    /// Build the check matrix for a supported `(length, rate)` pair.
    pub fn matrix(length: usize, rate: f64) -> Result<SparseBitMatrix, CodecError> {
        let entry = FRAME_TABLE
            .iter()
            .find(|p| {
                p.length == length
                    && (rate - p.rate.0 as f64 / p.rate.1 as f64).abs() < 1e-9
            })
            .ok_or_else(|| {
                CodecError::invalid_option(format!(
                    "no accumulator table for length {length} at rate {rate}"
                ))
            })?;

        let k = entry.length * entry.rate.0 / entry.rate.1;
        let m = entry.length - k;
        let q = m / entry.group;
        debug_assert_eq!(entry.addresses.len() * entry.group, k);
        debug_assert_eq!(q * entry.group, m);

        let mut rows: Vec<Vec<u32>> = vec![Vec::new(); m];
        for (group_index, taps) in entry.addresses.iter().enumerate() {
            for bit in 0..entry.group {
                let col = (group_index * entry.group + bit) as u32;
                for &tap in *taps {
                    let check = (tap as usize + bit * q) % m;
                    rows[check].push(col);
                }
            }
        }
        // Accumulator chain over the parity columns.
        for check in 0..m {
            rows[check].push((k + check) as u32);
            if check > 0 {
                rows[check].push((k + check - 1) as u32);
            }
        }
        Ok(SparseBitMatrix::from_rows(rows, entry.length))
    }
}
