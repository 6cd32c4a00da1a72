//! Sparse binary matrices
//!
//! Parity-check matrices and their row-echelon reductions are stored as
//! rows of sorted column indices. A column-of-rows view is derived on
//! demand for the decoders, which walk edges in both directions.

use bitvec::prelude::*;

/// A sparse matrix over GF(2).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SparseBitMatrix {
    row_count: usize,
    col_count: usize,
    rows: Vec<Vec<u32>>,
}

impl SparseBitMatrix {
    /// Create an empty `rows x cols` matrix.
    pub fn new(rows: usize, cols: usize) -> Self {
        SparseBitMatrix {
            row_count: rows,
            col_count: cols,
            rows: vec![Vec::new(); rows],
        }
    }

    /// Create a matrix from explicit rows of column indices. Indices are
    /// sorted and deduplicated.
    pub fn from_rows(rows: Vec<Vec<u32>>, cols: usize) -> Self {
        let mut rows = rows;
        for row in &mut rows {
            row.sort_unstable();
            row.dedup();
            debug_assert!(row.last().map_or(true, |&c| (c as usize) < cols));
        }
        SparseBitMatrix {
            row_count: rows.len(),
            col_count: cols,
            rows,
        }
    }

    pub fn row_count(&self) -> usize {
        self.row_count
    }

    pub fn col_count(&self) -> usize {
        self.col_count
    }

    /// Total number of stored ones.
    pub fn ones(&self) -> usize {
        self.rows.iter().map(Vec::len).sum()
    }

    pub fn row(&self, r: usize) -> &[u32] {
        &self.rows[r]
    }

    pub fn row_weight(&self, r: usize) -> usize {
        self.rows[r].len()
    }

    pub fn at(&self, r: usize, c: usize) -> bool {
        self.rows[r].binary_search(&(c as u32)).is_ok()
    }

    /// Set a single entry to 1.
    pub fn insert(&mut self, r: usize, c: usize) {
        debug_assert!(c < self.col_count);
        let row = &mut self.rows[r];
        if let Err(pos) = row.binary_search(&(c as u32)) {
            row.insert(pos, c as u32);
        }
    }

    /// Column-of-rows view: for every column, the sorted list of rows with
    /// a 1 in that column.
    pub fn column_view(&self) -> Vec<Vec<u32>> {
        let mut cols = vec![Vec::new(); self.col_count];
        for (r, row) in self.rows.iter().enumerate() {
            for &c in row {
                cols[c as usize].push(r as u32);
            }
        }
        cols
    }

    /// Weight of every column.
    pub fn col_weights(&self) -> Vec<usize> {
        let mut weights = vec![0usize; self.col_count];
        for row in &self.rows {
            for &c in row {
                weights[c as usize] += 1;
            }
        }
        weights
    }

    pub fn swap_rows(&mut self, a: usize, b: usize) {
        self.rows.swap(a, b);
    }

    /// Swap two columns, renumbering the indices inside every row.
    pub fn swap_cols(&mut self, a: usize, b: usize) {
        if a == b {
            return;
        }
        let (a, b) = (a as u32, b as u32);
        for row in &mut self.rows {
            let has_a = row.binary_search(&a).is_ok();
            let has_b = row.binary_search(&b).is_ok();
            if has_a == has_b {
                continue;
            }
            if has_a {
                row.retain(|&c| c != a);
                let pos = row.binary_search(&b).unwrap_err();
                row.insert(pos, b);
            } else {
                row.retain(|&c| c != b);
                let pos = row.binary_search(&a).unwrap_err();
                row.insert(pos, a);
            }
        }
    }

    /// `rows[dst] ^= rows[src]` (symmetric difference of the index sets).
    pub fn xor_rows(&mut self, dst: usize, src: usize) {
        debug_assert_ne!(dst, src);
        let src_row = std::mem::take(&mut self.rows[src]);
        let dst_row = &self.rows[dst];
        let mut merged = Vec::with_capacity(dst_row.len() + src_row.len());
        let (mut i, mut j) = (0, 0);
        while i < dst_row.len() && j < src_row.len() {
            match dst_row[i].cmp(&src_row[j]) {
                std::cmp::Ordering::Less => {
                    merged.push(dst_row[i]);
                    i += 1;
                }
                std::cmp::Ordering::Greater => {
                    merged.push(src_row[j]);
                    j += 1;
                }
                std::cmp::Ordering::Equal => {
                    i += 1;
                    j += 1;
                }
            }
        }
        merged.extend_from_slice(&dst_row[i..]);
        merged.extend_from_slice(&src_row[j..]);
        self.rows[dst] = merged;
        self.rows[src] = src_row;
    }

    /// Syndrome of a hard codeword: one bit per row, `H·x` over GF(2).
    pub fn syndrome<T: BitStore>(&self, codeword: &BitSlice<T, Lsb0>) -> BitVec<u8, Lsb0> {
        debug_assert_eq!(codeword.len(), self.col_count);
        self.rows
            .iter()
            .map(|row| {
                row.iter()
                    .fold(false, |acc, &c| acc ^ codeword[c as usize])
            })
            .collect()
    }

    /// True when `H·x = 0`.
    pub fn check<T: BitStore>(&self, codeword: &BitSlice<T, Lsb0>) -> bool {
        self.rows.iter().all(|row| {
            !row.iter()
                .fold(false, |acc, &c| acc ^ codeword[c as usize])
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> SparseBitMatrix {
        // 0: 1 1 0 1 0 0
        // 1: 0 1 1 0 1 0
        // 2: 1 0 0 0 1 1
        // 3: 0 0 1 1 0 1
        SparseBitMatrix::from_rows(
            vec![vec![0, 1, 3], vec![1, 2, 4], vec![0, 4, 5], vec![2, 3, 5]],
            6,
        )
    }

    #[test]
    fn column_view_matches_rows() {
        let m = sample();
        let cols = m.column_view();
        assert_eq!(cols[0], vec![0, 2]);
        assert_eq!(cols[3], vec![0, 3]);
        assert_eq!(m.col_weights(), vec![2, 2, 2, 2, 2, 2]);
        assert_eq!(m.ones(), 12);
    }

    #[test]
    fn swap_cols_renumbers() {
        let mut m = sample();
        m.swap_cols(0, 5);
        assert!(m.at(0, 5));
        assert!(!m.at(0, 0));
        assert!(m.at(2, 0));
        assert!(m.at(2, 5));
    }

    #[test]
    fn xor_rows_is_symmetric_difference() {
        let mut m = sample();
        m.xor_rows(0, 1);
        assert_eq!(m.row(0), &[0, 2, 3, 4]);
        // Source row untouched
        assert_eq!(m.row(1), &[1, 2, 4]);
    }

    #[test]
    fn syndrome_detects_errors() {
        let m = sample();
        let mut word = bitvec![u8, Lsb0; 0; 6];
        assert!(m.check(&word));
        word.set(1, true);
        let syn = m.syndrome(&word);
        assert!(syn[0] && syn[1] && !syn[2] && !syn[3]);
        assert!(!m.check(&word));
    }
}
