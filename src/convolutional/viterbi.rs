//! Hard-decision Viterbi decoding
//!
//! Maximum-likelihood sequence search over the trellis with the LLR
//! correlation metric. Used by the convolutional codec whenever no soft
//! output and no a-priori input are involved.

use bitvec::prelude::*;

use crate::bits::write_symbol;
use crate::convolutional::Termination;
use crate::llr::{saturate, Llr};
use crate::trellis::Trellis;

#[derive(Debug, Clone)]
pub(crate) struct ViterbiDecoder {
    steps: usize,
    termination: Termination,
    metrics: Vec<Llr>,
    next_metrics: Vec<Llr>,
    output_metric: Vec<Llr>,
    // Winning incoming-edge index per (step, state).
    decisions: Vec<u8>,
}

impl ViterbiDecoder {
    pub(crate) fn new(trellis: &Trellis, steps: usize, termination: Termination) -> Self {
        let states = trellis.state_count();
        ViterbiDecoder {
            steps,
            termination,
            metrics: vec![0.0; states],
            next_metrics: vec![0.0; states],
            output_metric: vec![0.0; 1 << trellis.output_size()],
            decisions: vec![0; steps * states],
        }
    }

    pub(crate) fn decode<M: BitStore>(
        &mut self,
        trellis: &Trellis,
        block_len: usize,
        parity: &[Llr],
        message: &mut BitSlice<M, Lsb0>,
    ) {
        let states = trellis.state_count();
        let n = trellis.output_size();
        let k = trellis.input_size();
        debug_assert_eq!(parity.len(), self.steps * n);
        debug_assert_eq!(message.len(), block_len * k);

        self.metrics.fill(f64::NEG_INFINITY);
        self.metrics[0] = 0.0;
        for t in 0..self.steps {
            self.output_metric[0] = 0.0;
            for symbol in 1..self.output_metric.len() {
                let bit = symbol.trailing_zeros() as usize;
                self.output_metric[symbol] =
                    self.output_metric[symbol & (symbol - 1)] + saturate(parity[t * n + bit]);
            }
            for next in 0..states {
                let mut best = f64::NEG_INFINITY;
                let mut best_edge = 0u8;
                for (index, edge) in trellis.incoming(next).iter().enumerate() {
                    let metric = self.metrics[edge.state as usize]
                        + self.output_metric[edge.output as usize];
                    if metric > best {
                        best = metric;
                        best_edge = index as u8;
                    }
                }
                self.next_metrics[next] = best;
                self.decisions[t * states + next] = best_edge;
            }
            std::mem::swap(&mut self.metrics, &mut self.next_metrics);
        }

        let mut state = match self.termination {
            Termination::ZeroTail => 0,
            Termination::Truncation => self
                .metrics
                .iter()
                .enumerate()
                .max_by(|a, b| a.1.total_cmp(b.1))
                .map(|(s, _)| s)
                .unwrap_or(0),
        };
        for t in (0..self.steps).rev() {
            let edge = trellis.incoming(state)[self.decisions[t * states + state] as usize];
            if t < block_len {
                write_symbol(message, t * k, k, edge.input as usize);
            }
            state = edge.state as usize;
        }
    }
}
