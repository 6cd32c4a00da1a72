//! LDPC codec
//!
//! The structure owns a sparse parity-check matrix brought to approximate
//! lower-triangular form at construction time: columns are reordered to
//! `[ systematic | gap | triangular ]` and rows to `[ triangular | gap ]`,
//! so that the trailing square of the triangular rows is lower triangular
//! with a unit diagonal. The gap rows are eliminated against the triangle
//! and Gauss-reduced once; encoding is then a dense `p1 = M * s` product
//! for the gap bits followed by sparse forward substitution for the rest.
//! The parity layout of a block is `| syst | p1 | p2 |`, message first.
//!
//! Decoding is flooding belief propagation over the same (reordered)
//! matrix.

mod decode;
mod dvbs2;
mod gallager;

use bitvec::prelude::*;
use tracing::debug;

use crate::error::CodecError;
use crate::llr::DecoderAlgorithm;
use crate::permutation::Permutation;
use crate::sparse::SparseBitMatrix;

pub use dvbs2::DvbS2;
pub use gallager::Gallager;

pub(crate) use decode::Decoder;

/// Options fixed at construction.
#[derive(Debug, Clone)]
pub struct EncoderOptions {
    pub check_matrix: SparseBitMatrix,
}

impl EncoderOptions {
    pub fn new(check_matrix: SparseBitMatrix) -> Self {
        EncoderOptions { check_matrix }
    }
}

/// Options replaceable after construction.
#[derive(Debug, Clone, Copy)]
pub struct DecoderOptions {
    pub algorithm: DecoderAlgorithm,
    pub iterations: usize,
    pub gain: f64,
}

impl Default for DecoderOptions {
    fn default() -> Self {
        DecoderOptions {
            algorithm: DecoderAlgorithm::default(),
            iterations: 20,
            gain: 1.0,
        }
    }
}

impl DecoderOptions {
    pub fn algorithm(mut self, algorithm: DecoderAlgorithm) -> Self {
        self.algorithm = algorithm;
        self
    }

    pub fn iterations(mut self, iterations: usize) -> Self {
        self.iterations = iterations;
        self
    }

    pub fn gain(mut self, gain: f64) -> Self {
        self.gain = gain;
        self
    }
}

/// Puncture masks applied cyclically over the systematic and parity
/// regions of a block. Empty masks keep everything.
#[derive(Debug, Clone, Default)]
pub struct PunctureOptions {
    pub syst_mask: Vec<bool>,
    pub mask: Vec<bool>,
}

impl PunctureOptions {
    pub fn syst_mask(mut self, mask: Vec<bool>) -> Self {
        self.syst_mask = mask;
        self
    }

    pub fn mask(mut self, mask: Vec<bool>) -> Self {
        self.mask = mask;
        self
    }
}

/// LDPC code structure with its preprocessed encoder tables.
#[derive(Debug, Clone)]
pub struct Structure {
    h: SparseBitMatrix,
    msg_size: usize,
    gap: usize,
    triangular: usize,
    p1_rows: Vec<BitVec<u8, Lsb0>>,
    decoder: DecoderOptions,
}

impl Structure {
    pub fn new(encoder: EncoderOptions, decoder: DecoderOptions) -> Result<Self, CodecError> {
        let h = encoder.check_matrix;
        let m = h.row_count();
        let n = h.col_count();
        if m == 0 || n <= m {
            return Err(CodecError::invalid_option(format!(
                "check matrix of {m} x {n} leaves no message bits"
            )));
        }
        for r in 0..m {
            if h.row_weight(r) == 0 {
                return Err(CodecError::invalid_option(format!(
                    "all-zero parity check row {r}"
                )));
            }
        }
        if decoder.gain <= 0.0 {
            return Err(CodecError::invalid_option("gain must be positive"));
        }

        let (h, p1_rows, gap, triangular) = preprocess(h)?;
        debug!(
            gap,
            triangular,
            checks = m,
            variables = n,
            "ldpc encoder preprocessing complete"
        );
        Ok(Structure {
            h,
            msg_size: n - m,
            gap,
            triangular,
            p1_rows,
            decoder,
        })
    }

    pub fn with_encoder(encoder: EncoderOptions) -> Result<Self, CodecError> {
        Self::new(encoder, DecoderOptions::default())
    }

    /// The (reordered) parity-check matrix.
    pub fn checks(&self) -> &SparseBitMatrix {
        &self.h
    }

    pub fn msg_size(&self) -> usize {
        self.msg_size
    }

    pub fn parity_size(&self) -> usize {
        self.h.col_count()
    }

    /// One value per edge of the check matrix.
    pub fn extrinsic_size(&self) -> usize {
        self.h.ones()
    }

    pub fn iterations(&self) -> usize {
        self.decoder.iterations
    }

    pub fn decoder_options(&self) -> DecoderOptions {
        self.decoder
    }

    pub fn set_decoder_options(&mut self, decoder: DecoderOptions) {
        self.decoder = decoder;
    }

    pub(crate) fn encode_block<M: BitStore, P: BitStore>(
        &self,
        message: &BitSlice<M, Lsb0>,
        parity: &mut BitSlice<P, Lsb0>,
    ) {
        let k = self.msg_size;
        let g = self.gap;
        debug_assert_eq!(message.len(), k);
        debug_assert_eq!(parity.len(), self.parity_size());

        for j in 0..k {
            parity.set(j, message[j]);
        }
        for (idx, row) in self.p1_rows.iter().enumerate() {
            let mut bit = false;
            for j in row.iter_ones() {
                bit ^= message[j];
            }
            parity.set(k + idx, bit);
        }
        for i in 0..self.triangular {
            let diagonal = k + g + i;
            let mut bit = false;
            for &c in self.h.row(i) {
                let c = c as usize;
                if c != diagonal {
                    bit ^= parity[c];
                }
            }
            parity.set(diagonal, bit);
        }
        debug_assert!(self.h.check(parity), "encoded block fails its syndrome");
    }

    /// Syndrome check of a hard parity block.
    pub(crate) fn check_block<P: BitStore>(&self, parity: &BitSlice<P, Lsb0>) -> bool {
        self.h.check(parity)
    }

    /// Puncturing permutation over one parity block.
    pub fn puncturing(&self, options: &PunctureOptions) -> Result<Permutation, CodecError> {
        let k = self.msg_size;
        let n = self.parity_size();
        let keep = |mask: &Vec<bool>, index: usize| -> bool {
            mask.is_empty() || mask[index % mask.len()]
        };
        let mut indices = Vec::with_capacity(n);
        for j in 0..k {
            if keep(&options.syst_mask, j) {
                indices.push(j);
            }
        }
        for j in 0..n - k {
            if keep(&options.mask, j) {
                indices.push(k + j);
            }
        }
        Permutation::new(indices, n)
    }

    pub(crate) fn create_decoder(&self) -> Decoder {
        Decoder::new(&self.h)
    }
}

/// Bring `h` to approximate lower-triangular form.
///
/// Greedy diagonal extension from the last diagonal position backwards:
/// a residual column of degree one pairs with its only residual row; when
/// none exists, the residual row of maximum degree is moved to the gap.
/// Gap rows are then eliminated against the triangle and Gauss-reduced
/// over the remaining columns, which fixes the `p1` encoding table and the
/// final column classification.
#[allow(clippy::type_complexity)]
fn preprocess(
    h: SparseBitMatrix,
) -> Result<(SparseBitMatrix, Vec<BitVec<u8, Lsb0>>, usize, usize), CodecError> {
    let m = h.row_count();
    let n = h.col_count();
    let k = n - m;
    let cols = h.column_view();

    let mut row_removed = vec![false; m];
    let mut col_removed = vec![false; n];
    let mut row_deg: Vec<usize> = (0..m).map(|r| h.row_weight(r)).collect();
    let mut col_deg: Vec<usize> = cols.iter().map(Vec::len).collect();
    let mut diag_rev: Vec<(usize, usize)> = Vec::new();
    let mut gap_rows: Vec<usize> = Vec::new();
    let mut remaining = m;

    while remaining > 0 {
        if let Some(c) = (0..n).find(|&c| !col_removed[c] && col_deg[c] == 1) {
            let r = cols[c]
                .iter()
                .map(|&r| r as usize)
                .find(|&r| !row_removed[r])
                .expect("degree-one column without a residual row");
            diag_rev.push((r, c));
            col_removed[c] = true;
            row_removed[r] = true;
            remaining -= 1;
            for &cc in h.row(r) {
                if !col_removed[cc as usize] {
                    col_deg[cc as usize] -= 1;
                }
            }
            for &rr in &cols[c] {
                if !row_removed[rr as usize] {
                    row_deg[rr as usize] -= 1;
                }
            }
        } else if let Some(c) = (0..n).find(|&c| !col_removed[c] && col_deg[c] == 0) {
            // Exhausted column, classified later as systematic or gap.
            col_removed[c] = true;
        } else {
            let r = (0..m)
                .filter(|&r| !row_removed[r])
                .max_by_key(|&r| row_deg[r])
                .expect("rows remaining but none residual");
            gap_rows.push(r);
            row_removed[r] = true;
            remaining -= 1;
            for &cc in h.row(r) {
                if !col_removed[cc as usize] {
                    col_deg[cc as usize] -= 1;
                }
            }
        }
    }

    diag_rev.reverse();
    let diag = diag_rev;
    let d = diag.len();
    let g = m - d;
    debug_assert_eq!(gap_rows.len(), g);

    // Provisional positions: free columns first (ascending), triangle last.
    let mut col_pos = vec![usize::MAX; n];
    let mut free_cols = Vec::with_capacity(k + g);
    for (j, &(_, c)) in diag.iter().enumerate() {
        col_pos[c] = k + g + j;
    }
    for c in 0..n {
        if col_pos[c] == usize::MAX {
            col_pos[c] = free_cols.len();
            free_cols.push(c);
        }
    }
    debug_assert_eq!(free_cols.len(), k + g);

    // Eliminate the triangle out of every gap row.
    let free = k + g;
    let mut reduced: Vec<BitVec<u8, Lsb0>> = Vec::with_capacity(g);
    for &r in &gap_rows {
        let mut dense = BitVec::<u8, Lsb0>::repeat(false, n);
        for &c in h.row(r) {
            let p = col_pos[c as usize];
            let flipped = !dense[p];
            dense.set(p, flipped);
        }
        for j in (0..d).rev() {
            if dense[free + j] {
                for &c in h.row(diag[j].0) {
                    let p = col_pos[c as usize];
                    let flipped = !dense[p];
                    dense.set(p, flipped);
                }
            }
        }
        debug_assert!(!dense[free..].any());
        dense.truncate(free);
        reduced.push(dense);
    }

    // Gauss-Jordan over the free columns.
    let mut pivots: Vec<(usize, usize)> = Vec::new(); // (free position, reduced row)
    for row_idx in 0..reduced.len() {
        for &(col, prow) in &pivots {
            if reduced[row_idx][col] {
                let (dst, src) = two_rows(&mut reduced, row_idx, prow);
                xor_into(dst, src);
            }
        }
        let Some(col) = reduced[row_idx].first_one() else {
            // Redundant parity check; consistent with any message.
            continue;
        };
        for pivot_idx in 0..pivots.len() {
            let prow = pivots[pivot_idx].1;
            if reduced[prow][col] {
                let (dst, src) = two_rows(&mut reduced, prow, row_idx);
                xor_into(dst, src);
            }
        }
        pivots.push((col, row_idx));
    }
    if pivots.len() > g {
        return Err(CodecError::construction(
            "more pivots than gap rows in the reduced system",
        ));
    }

    // Gap columns: the pivots plus enough frozen columns to fill the gap.
    let mut is_gap = vec![false; free];
    for &(col, _) in &pivots {
        is_gap[col] = true;
    }
    let mut extras = g - pivots.len();
    for pos in (0..free).rev() {
        if extras == 0 {
            break;
        }
        if !is_gap[pos] {
            is_gap[pos] = true;
            extras -= 1;
        }
    }

    // Final positions: systematic, then gap, then the triangle.
    let mut final_of_free = vec![usize::MAX; free];
    let mut syst_idx = 0usize;
    let mut gap_idx = 0usize;
    for pos in 0..free {
        if is_gap[pos] {
            final_of_free[pos] = k + gap_idx;
            gap_idx += 1;
        } else {
            final_of_free[pos] = syst_idx;
            syst_idx += 1;
        }
    }
    debug_assert_eq!(syst_idx, k);
    debug_assert_eq!(gap_idx, g);

    // p1 table: one dense systematic row per gap bit, zero when frozen.
    let mut p1_rows = vec![BitVec::<u8, Lsb0>::repeat(false, k); g];
    for &(col, prow) in &pivots {
        let target = final_of_free[col] - k;
        for pos in reduced[prow].iter_ones() {
            if !is_gap[pos] {
                p1_rows[target].set(final_of_free[pos], true);
            }
        }
    }

    // Rebuild the matrix in final row and column order.
    let mut final_col = vec![0usize; n];
    for c in 0..n {
        let p = col_pos[c];
        final_col[c] = if p >= free { p } else { final_of_free[p] };
    }
    let mut new_rows: Vec<Vec<u32>> = Vec::with_capacity(m);
    for &(r, _) in &diag {
        new_rows.push(h.row(r).iter().map(|&c| final_col[c as usize] as u32).collect());
    }
    for &r in &gap_rows {
        new_rows.push(h.row(r).iter().map(|&c| final_col[c as usize] as u32).collect());
    }
    Ok((SparseBitMatrix::from_rows(new_rows, n), p1_rows, g, d))
}

/// Disjoint mutable access to two rows of the reduction workspace.
fn two_rows<'a>(
    rows: &'a mut [BitVec<u8, Lsb0>],
    a: usize,
    b: usize,
) -> (&'a mut BitVec<u8, Lsb0>, &'a BitVec<u8, Lsb0>) {
    debug_assert_ne!(a, b);
    if a < b {
        let (left, right) = rows.split_at_mut(b);
        (&mut left[a], &right[0])
    } else {
        let (left, right) = rows.split_at_mut(a);
        (&mut right[0], &left[b])
    }
}

/// `dst ^= src` over two equal-length dense rows.
fn xor_into(dst: &mut BitVec<u8, Lsb0>, src: &BitVec<u8, Lsb0>) {
    debug_assert_eq!(dst.len(), src.len());
    for pos in src.iter_ones() {
        let flipped = !dst[pos];
        dst.set(pos, flipped);
    }
}
