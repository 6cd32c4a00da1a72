//! Index permutations
//!
//! A [`Permutation`] maps an input vector onto an output vector by index:
//! `output[i] = input[sequence[i]]`. Square permutations are the turbo
//! interleavers; non-square ones express puncturing, where the forward
//! direction gathers the transmitted subset and the reverse direction
//! scatters values back into a full-length buffer, leaving the punctured
//! positions at the erasure value (`Default`, i.e. LLR 0 or bit 0).

use once_cell::sync::OnceCell;

use crate::error::CodecError;

#[derive(Debug, Default)]
pub struct Permutation {
    sequence: Vec<usize>,
    input_size: usize,
    inverse: OnceCell<Vec<usize>>,
}

impl Clone for Permutation {
    fn clone(&self) -> Self {
        Permutation {
            sequence: self.sequence.clone(),
            input_size: self.input_size,
            inverse: OnceCell::new(),
        }
    }
}

impl Permutation {
    /// Create a permutation reading `input_size` values through `sequence`.
    ///
    /// Every index must be in range; a square sequence must additionally be
    /// a bijection.
    pub fn new(sequence: Vec<usize>, input_size: usize) -> Result<Self, CodecError> {
        if let Some(&bad) = sequence.iter().find(|&&i| i >= input_size) {
            return Err(CodecError::invalid_option(format!(
                "permutation index {bad} out of range for input size {input_size}"
            )));
        }
        if sequence.len() == input_size {
            let mut seen = vec![false; input_size];
            for &i in &sequence {
                if seen[i] {
                    return Err(CodecError::invalid_option(format!(
                        "permutation repeats index {i}"
                    )));
                }
                seen[i] = true;
            }
        }
        Ok(Permutation {
            sequence,
            input_size,
            inverse: OnceCell::new(),
        })
    }

    /// The identity permutation of the given length.
    pub fn identity(len: usize) -> Self {
        Permutation {
            sequence: (0..len).collect(),
            input_size: len,
            inverse: OnceCell::new(),
        }
    }

    pub fn input_size(&self) -> usize {
        self.input_size
    }

    pub fn output_size(&self) -> usize {
        self.sequence.len()
    }

    pub fn is_bijective(&self) -> bool {
        self.sequence.len() == self.input_size
    }

    pub fn indices(&self) -> &[usize] {
        &self.sequence
    }

    /// Gather: `output[i] = input[sequence[i]]`.
    pub fn permute<T: Copy>(&self, input: &[T], output: &mut [T]) {
        debug_assert_eq!(input.len(), self.input_size);
        debug_assert_eq!(output.len(), self.sequence.len());
        for (out, &src) in output.iter_mut().zip(&self.sequence) {
            *out = input[src];
        }
    }

    /// Scatter: `output[sequence[i]] = input[i]`; positions not covered by
    /// the sequence keep `T::default()` (the erasure value).
    pub fn depermute<T: Copy + Default>(&self, input: &[T], output: &mut [T]) {
        debug_assert_eq!(input.len(), self.sequence.len());
        debug_assert_eq!(output.len(), self.input_size);
        output.fill(T::default());
        for (&value, &dst) in input.iter().zip(&self.sequence) {
            output[dst] = value;
        }
    }

    /// Inverse index map, computed on first use and cached.
    ///
    /// Only meaningful for bijective permutations.
    pub fn inverse(&self) -> &[usize] {
        debug_assert!(self.is_bijective());
        self.inverse.get_or_init(|| {
            let mut inv = vec![0usize; self.input_size];
            for (i, &src) in self.sequence.iter().enumerate() {
                inv[src] = i;
            }
            inv
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_out_of_range_and_repeats() {
        assert!(Permutation::new(vec![0, 3], 3).is_err());
        assert!(Permutation::new(vec![0, 1, 1], 3).is_err());
        assert!(Permutation::new(vec![2, 0, 1], 3).is_ok());
    }

    #[test]
    fn permute_then_depermute_is_identity() {
        let p = Permutation::new(vec![2, 0, 3, 1], 4).unwrap();
        let input = [10, 20, 30, 40];
        let mut mid = [0; 4];
        let mut back = [0; 4];
        p.permute(&input, &mut mid);
        p.depermute(&mid, &mut back);
        assert_eq!(back, input);
    }

    #[test]
    fn inverse_undoes_the_forward_map() {
        let p = Permutation::new(vec![3, 1, 0, 2], 4).unwrap();
        let inv = p.inverse();
        for i in 0..4 {
            assert_eq!(inv[p.indices()[i]], i);
        }
    }

    #[test]
    fn puncture_scatter_leaves_erasures() {
        // Transmit positions 0 and 2 of a 4-value buffer
        let p = Permutation::new(vec![0, 2], 4).unwrap();
        let full = [1.5, -2.0, 0.5, 3.0];
        let mut sent = [0.0; 2];
        p.permute(&full, &mut sent);
        assert_eq!(sent, [1.5, 0.5]);
        let mut restored = [9.0; 4];
        p.depermute(&sent, &mut restored);
        assert_eq!(restored, [1.5, 0.0, 0.5, 0.0]);
    }
}
