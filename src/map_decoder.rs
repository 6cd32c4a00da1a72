//! MAP (BCJR) decoding over a trellis
//!
//! Computes a-posteriori L-values for every information bit of one block by
//! the forward/backward recursion. Branch metrics use the correlation form:
//! the metric of an edge is the sum of the channel L-values over the set
//! bits of its output symbol plus the sum of the a-priori L-values over the
//! set bits of its input symbol; per-step constants cancel in the final
//! subtraction and in the per-step normalization.
//!
//! The forward metrics are kept as a `(steps + 1) x states` matrix; the
//! backward metrics stream through two state-length buffers while the
//! output L-values are emitted from the last step to the first. All scratch
//! is owned by the decoder instance so a worker can reuse its allocations
//! across blocks.

use crate::convolutional::Termination;
use crate::llr::{saturate, DecoderAlgorithm, Llr};
use crate::trellis::Trellis;

/// Reusable BCJR decoder for a fixed trellis and block geometry.
#[derive(Debug, Clone)]
pub struct MapDecoder {
    trellis: Trellis,
    steps: usize,
    termination: Termination,
    alpha: Vec<Llr>,
    beta: Vec<Llr>,
    beta_next: Vec<Llr>,
    input_metric: Vec<Llr>,
    output_metric: Vec<Llr>,
    acc_one: Vec<Llr>,
    acc_zero: Vec<Llr>,
}

impl MapDecoder {
    /// `steps` counts every trellis section of the block, tail included.
    pub fn new(trellis: Trellis, steps: usize, termination: Termination) -> Self {
        let states = trellis.state_count();
        let input_count = trellis.input_count();
        let output_count = 1 << trellis.output_size();
        let k = trellis.input_size();
        MapDecoder {
            trellis,
            steps,
            termination,
            alpha: vec![0.0; (steps + 1) * states],
            beta: vec![0.0; states],
            beta_next: vec![0.0; states],
            input_metric: vec![0.0; input_count],
            output_metric: vec![0.0; output_count],
            acc_one: vec![0.0; k],
            acc_zero: vec![0.0; k],
        }
    }

    /// Decode one block.
    ///
    /// `parity` holds `steps * n` channel L-values. `systematic` and
    /// `apriori` hold `steps * k` L-values each when present; the two are
    /// kept separate because the extrinsic output excludes both. Outputs
    /// are written for all `steps * k` information bits, saturated to the
    /// threshold.
    pub fn decode(
        &mut self,
        algorithm: DecoderAlgorithm,
        parity: &[Llr],
        systematic: Option<&[Llr]>,
        apriori: Option<&[Llr]>,
        posterior: &mut [Llr],
        mut extrinsic: Option<&mut [Llr]>,
    ) {
        let states = self.trellis.state_count();
        let k = self.trellis.input_size();
        let n = self.trellis.output_size();
        debug_assert_eq!(parity.len(), self.steps * n);
        debug_assert_eq!(posterior.len(), self.steps * k);

        // Forward recursion.
        self.alpha[..states].fill(f64::NEG_INFINITY);
        self.alpha[0] = 0.0;
        for t in 0..self.steps {
            self.step_metrics(t, parity, systematic, apriori);
            let (done, current) = self.alpha.split_at_mut((t + 1) * states);
            let previous = &done[t * states..];
            let current = &mut current[..states];
            for (next, acc) in current.iter_mut().enumerate() {
                let mut metric = f64::NEG_INFINITY;
                for edge in self.trellis.incoming(next) {
                    let branch = self.input_metric[edge.input as usize]
                        + self.output_metric[edge.output as usize];
                    metric = algorithm.combine(metric, previous[edge.state as usize] + branch);
                }
                *acc = metric;
            }
            normalize(current);
        }

        // Backward recursion, emitting output L-values back to front.
        match self.termination {
            Termination::ZeroTail => {
                self.beta_next.fill(f64::NEG_INFINITY);
                self.beta_next[0] = 0.0;
            }
            Termination::Truncation => self.beta_next.fill(0.0),
        }
        for t in (0..self.steps).rev() {
            self.step_metrics(t, parity, systematic, apriori);
            let alpha_t = &self.alpha[t * states..(t + 1) * states];

            self.acc_one.fill(f64::NEG_INFINITY);
            self.acc_zero.fill(f64::NEG_INFINITY);
            for (state, &forward) in alpha_t.iter().enumerate() {
                if forward == f64::NEG_INFINITY {
                    continue;
                }
                for input in 0..self.trellis.input_count() {
                    let branch = self.input_metric[input]
                        + self.output_metric[self.trellis.output(state, input)];
                    let metric =
                        forward + branch + self.beta_next[self.trellis.next_state(state, input)];
                    for bit in 0..k {
                        if (input >> bit) & 1 != 0 {
                            self.acc_one[bit] = algorithm.combine(self.acc_one[bit], metric);
                        } else {
                            self.acc_zero[bit] = algorithm.combine(self.acc_zero[bit], metric);
                        }
                    }
                }
            }
            for bit in 0..k {
                let value = self.acc_one[bit] - self.acc_zero[bit];
                posterior[t * k + bit] = saturate(value);
                if let Some(out) = extrinsic.as_deref_mut() {
                    let sys = systematic.map_or(0.0, |s| saturate(s[t * k + bit]));
                    let pri = apriori.map_or(0.0, |a| saturate(a[t * k + bit]));
                    out[t * k + bit] = saturate(value - sys - pri);
                }
            }

            for state in 0..states {
                let mut metric = f64::NEG_INFINITY;
                for input in 0..self.trellis.input_count() {
                    let branch = self.input_metric[input]
                        + self.output_metric[self.trellis.output(state, input)];
                    metric = algorithm.combine(
                        metric,
                        branch + self.beta_next[self.trellis.next_state(state, input)],
                    );
                }
                self.beta[state] = metric;
            }
            normalize(&mut self.beta);
            std::mem::swap(&mut self.beta, &mut self.beta_next);
        }
    }

    /// Fill the per-symbol metric tables for step `t` by subset sums over
    /// the saturated channel and a-priori L-values.
    fn step_metrics(
        &mut self,
        t: usize,
        parity: &[Llr],
        systematic: Option<&[Llr]>,
        apriori: Option<&[Llr]>,
    ) {
        let n = self.trellis.output_size();
        let k = self.trellis.input_size();
        self.output_metric[0] = 0.0;
        for symbol in 1..self.output_metric.len() {
            let bit = symbol.trailing_zeros() as usize;
            self.output_metric[symbol] =
                self.output_metric[symbol & (symbol - 1)] + saturate(parity[t * n + bit]);
        }
        self.input_metric[0] = 0.0;
        for symbol in 1..self.input_metric.len() {
            let bit = symbol.trailing_zeros() as usize;
            let sys = systematic.map_or(0.0, |s| saturate(s[t * k + bit]));
            let pri = apriori.map_or(0.0, |a| saturate(a[t * k + bit]));
            self.input_metric[symbol] = self.input_metric[symbol & (symbol - 1)] + sys + pri;
        }
    }
}

/// Shift metrics so the best one sits at zero, keeping the recursion
/// bounded over long blocks.
fn normalize(metrics: &mut [Llr]) {
    let max = metrics.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    debug_assert!(max > f64::NEG_INFINITY);
    for m in metrics {
        *m -= max;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llr::slice;

    fn bpsk(bits: &[u8], amplitude: Llr) -> Vec<Llr> {
        bits.iter()
            .map(|&b| if b != 0 { amplitude } else { -amplitude })
            .collect()
    }

    /// Encode helper mirroring the trellis walk.
    fn encode(trellis: &Trellis, bits: &[u8], zero_tail: bool) -> (Vec<u8>, Vec<u8>) {
        let mut state = 0;
        let mut parity = Vec::new();
        let mut inputs = bits.to_vec();
        for &b in bits {
            let symbol = trellis.output(state, b as usize);
            for j in 0..trellis.output_size() {
                parity.push(((symbol >> j) & 1) as u8);
            }
            state = trellis.next_state(state, b as usize);
        }
        if zero_tail {
            for _ in 0..trellis.memory() {
                let u = trellis.tail_input(state);
                inputs.push(u as u8);
                let symbol = trellis.output(state, u);
                for j in 0..trellis.output_size() {
                    parity.push(((symbol >> j) & 1) as u8);
                }
                state = trellis.next_state(state, u);
            }
            assert_eq!(state, 0);
        }
        (parity, inputs)
    }

    #[test]
    fn recovers_a_clean_block_with_zero_tail() {
        let trellis = Trellis::feed_forward(3, &[0o5, 0o7]).unwrap();
        let message = [1u8, 0, 1, 1, 0, 0, 1, 0];
        let (parity, inputs) = encode(&trellis, &message, true);
        let steps = inputs.len();
        let mut decoder = MapDecoder::new(trellis, steps, Termination::ZeroTail);

        let channel = bpsk(&parity, 4.0);
        let mut posterior = vec![0.0; steps];
        decoder.decode(
            DecoderAlgorithm::Exact,
            &channel,
            None,
            None,
            &mut posterior,
            None,
        );
        for (t, &bit) in inputs.iter().enumerate() {
            assert_eq!(slice(posterior[t]), bit != 0, "bit {t}");
        }
    }

    #[test]
    fn recovers_a_clean_block_with_truncation() {
        let trellis = Trellis::feed_forward(3, &[0o5, 0o7]).unwrap();
        let message = [0u8, 1, 1, 0, 1, 0, 1, 1, 0, 0];
        let (parity, _) = encode(&trellis, &message, false);
        let mut decoder = MapDecoder::new(trellis, message.len(), Termination::Truncation);

        let channel = bpsk(&parity, 4.0);
        let mut posterior = vec![0.0; message.len()];
        decoder.decode(
            DecoderAlgorithm::Approximate,
            &channel,
            None,
            None,
            &mut posterior,
            None,
        );
        for (t, &bit) in message.iter().enumerate() {
            assert_eq!(slice(posterior[t]), bit != 0, "bit {t}");
        }
    }

    #[test]
    fn apriori_breaks_an_erased_channel() {
        // All parity L-values erased: the prior alone decides.
        let trellis = Trellis::recursive(4, &[0o13, 0o15], 0o13).unwrap();
        let steps = 6;
        let mut decoder = MapDecoder::new(trellis, steps, Termination::Truncation);
        let channel = vec![0.0; steps * 2];
        let apriori: Vec<Llr> = vec![3.0, -3.0, 3.0, 3.0, -3.0, -3.0];
        let mut posterior = vec![0.0; steps];
        let mut extrinsic = vec![0.0; steps];
        decoder.decode(
            DecoderAlgorithm::Exact,
            &channel,
            None,
            Some(&apriori),
            &mut posterior,
            Some(&mut extrinsic),
        );
        for t in 0..steps {
            assert_eq!(slice(posterior[t]), apriori[t] > 0.0);
        }
    }

    #[test]
    fn extrinsic_excludes_the_inputs_it_was_given() {
        let trellis = Trellis::feed_forward(3, &[0o5, 0o7]).unwrap();
        let message = [1u8, 1, 0, 1];
        let (parity, inputs) = encode(&trellis, &message, true);
        let steps = inputs.len();
        let mut decoder = MapDecoder::new(trellis, steps, Termination::ZeroTail);

        let channel = bpsk(&parity, 1.0);
        let systematic = bpsk(&inputs, 0.5);
        let mut posterior = vec![0.0; steps];
        let mut extrinsic = vec![0.0; steps];
        decoder.decode(
            DecoderAlgorithm::Exact,
            &channel,
            Some(&systematic),
            None,
            &mut posterior,
            Some(&mut extrinsic),
        );
        for t in 0..steps {
            assert!((posterior[t] - systematic[t] - extrinsic[t]).abs() < 1e-9);
        }
    }
}
