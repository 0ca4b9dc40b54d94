//! Viterbi decoding in log space.
//!
//! The forward pass ([`fill`]) computes the alpha matrix together with the backpointers,
//! and [`backtrack`] walks the backpointers from the best final state.
//! Exact ties, both between predecessors and between final states, go to the lowest state index.
use crate::alphabet::symbol_to_column;
use crate::dptable::{Backpointers, DPTable};
use crate::error::{Result, ViterbiError};
use crate::model::{state_label, HiddenMarkovModel};
use rayon::prelude::*;

/// Result of a decoding with the tables it was computed from.
#[derive(Debug, Clone, PartialEq)]
pub struct Decoded {
    /// Most probable state at each position.
    pub path: Vec<usize>,
    /// log-probability of `path` jointly with the observation.
    pub max_log_prob: f64,
    pub alpha: DPTable,
    pub backpointers: Backpointers,
}

impl Decoded {
    /// The path as state labels (S1, S2, ...).
    pub fn labels(&self) -> Vec<String> {
        self.path.iter().map(|&s| state_label(s)).collect()
    }
}

// Max and argmax in one pass. `<` keeps the first maximum on ties.
// -inf is the identity, so an all -inf input gives (0, -inf) and never NaN.
fn max_with_index<I: Iterator<Item = f64>>(xs: I) -> (usize, f64) {
    xs.enumerate()
        .fold((0, f64::NEG_INFINITY), |(arg, max), (i, x)| {
            if max < x {
                (i, x)
            } else {
                (arg, max)
            }
        })
}

fn best_predecessor(model: &HiddenMarkovModel, prev: &[f64], to: usize) -> (usize, f64) {
    let scores = prev
        .iter()
        .enumerate()
        .map(|(from, &score)| score + model.log_transition(from, to));
    max_with_index(scores)
}

fn fill_column(
    model: &HiddenMarkovModel,
    column: usize,
    prev: &[f64],
    current: &mut [f64],
    pointers: &mut [usize],
) {
    let cells = current.iter_mut().zip(pointers.iter_mut()).enumerate();
    for (state, (slot, pointer)) in cells {
        let (arg, max) = best_predecessor(model, prev, state);
        *slot = max + model.log_emission(state, column);
        *pointer = arg;
    }
}

fn fill_column_par(
    model: &HiddenMarkovModel,
    column: usize,
    prev: &[f64],
    current: &mut [f64],
    pointers: &mut [usize],
) {
    current
        .par_iter_mut()
        .zip(pointers.par_iter_mut())
        .enumerate()
        .for_each(|(state, (slot, pointer))| {
            let (arg, max) = best_predecessor(model, prev, state);
            *slot = max + model.log_emission(state, column);
            *pointer = arg;
        });
}

fn fill_with<F>(
    model: &HiddenMarkovModel,
    obs: &[u8],
    column_filler: F,
) -> Result<(DPTable, Backpointers)>
where
    F: Fn(&HiddenMarkovModel, usize, &[f64], &mut [f64], &mut [usize]),
{
    if obs.is_empty() {
        return Err(ViterbiError::EmptySequence);
    }
    let num_states = model.num_states();
    let mut alpha = DPTable::new(num_states, obs.len());
    let mut backpointers = Backpointers::new(num_states, obs.len());
    let first = symbol_to_column(obs[0], 0)?;
    for (state, slot) in alpha.column_mut(0).iter_mut().enumerate() {
        *slot = model.log_initial(state) + model.log_emission(state, first);
    }
    for (t, &x) in obs.iter().enumerate().skip(1) {
        let column = symbol_to_column(x, t)?;
        let (prev, current) = alpha.split_at_column(t);
        column_filler(model, column, prev, current, backpointers.row_mut(t));
        trace!("FILL\t{}\t{:?}", t, alpha.column(t));
    }
    Ok((alpha, backpointers))
}

/// Forward pass. Fill the alpha matrix and the backpointer table for `obs`.
/// Fails with `EmptySequence` on an empty input and with `UnknownSymbol` at the first
/// non-nucleotide byte.
pub fn fill(model: &HiddenMarkovModel, obs: &[u8]) -> Result<(DPTable, Backpointers)> {
    fill_with(model, obs, fill_column)
}

/// Same as [`fill`], but the states of each column are computed in parallel.
/// The output is bit-identical to [`fill`]. It pays off only for a large number of states.
pub fn fill_par(model: &HiddenMarkovModel, obs: &[u8]) -> Result<(DPTable, Backpointers)> {
    fill_with(model, obs, fill_column_par)
}

/// Reconstruct the best path from the tables computed by [`fill`].
/// Returns the path and its log-probability.
/// Panics if the two tables do not describe the same observation.
pub fn backtrack(alpha: &DPTable, backpointers: &Backpointers) -> (Vec<usize>, f64) {
    assert!(!alpha.is_empty());
    assert_eq!(alpha.len(), backpointers.obs_len());
    assert_eq!(alpha.num_states(), backpointers.num_states());
    let len = alpha.len();
    let (mut current, max_log_prob) = max_with_index(alpha.column(len - 1).iter().copied());
    let mut path = Vec::with_capacity(len);
    path.push(current);
    for t in (1..len).rev() {
        current = backpointers.get(t, current);
        path.push(current);
    }
    path.reverse();
    (path, max_log_prob)
}

/// Most probable state path for `obs` and its log-probability.
pub fn decode(model: &HiddenMarkovModel, obs: &[u8]) -> Result<(Vec<usize>, f64)> {
    let (alpha, backpointers) = fill(model, obs)?;
    Ok(backtrack(&alpha, &backpointers))
}

/// [`decode`], keeping the alpha matrix and the backpointers.
pub fn decode_with_tables(model: &HiddenMarkovModel, obs: &[u8]) -> Result<Decoded> {
    let (alpha, backpointers) = fill(model, obs)?;
    let (path, max_log_prob) = backtrack(&alpha, &backpointers);
    debug!("DECODE\t{}\t{:.3}", obs.len(), max_log_prob);
    Ok(Decoded {
        path,
        max_log_prob,
        alpha,
        backpointers,
    })
}

/// Joint log-probability of `obs` and a given state path.
pub fn path_log_prob(model: &HiddenMarkovModel, obs: &[u8], path: &[usize]) -> Result<f64> {
    if obs.is_empty() {
        return Err(ViterbiError::EmptySequence);
    }
    assert_eq!(obs.len(), path.len());
    let mut lk = model.log_initial(path[0]);
    for (t, (&x, &state)) in obs.iter().zip(path.iter()).enumerate() {
        if 0 < t {
            lk += model.log_transition(path[t - 1], state);
        }
        lk += model.log_emission(state, symbol_to_column(x, t)?);
    }
    Ok(lk)
}

impl HiddenMarkovModel {
    /// Shorthand for [`decode`].
    pub fn viterbi(&self, obs: &[u8]) -> Result<(Vec<usize>, f64)> {
        decode(self, obs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gen_seq::Generate;
    use crate::model::{ModelConfig, HMM};
    use rand::SeedableRng;
    use rand_xoshiro::Xoshiro256StarStar;
    const TOL: f64 = 0.000000001;
    fn reference() -> HMM {
        HMM::from_config(&ModelConfig::reference()).unwrap()
    }
    #[test]
    fn golden_aacg() {
        let model = reference();
        let decoded = decode_with_tables(&model, b"AACG").unwrap();
        eprintln!("{}", decoded.alpha);
        eprintln!("{}", decoded.backpointers);
        assert_eq!(decoded.path, vec![2, 2, 1, 1]);
        assert_eq!(decoded.labels(), vec!["S3", "S3", "S2", "S2"]);
        assert!((decoded.max_log_prob - (-7.665440980679653)).abs() < TOL);
        let last_column = [-8.764053269347762, -7.665440980679653, -8.317766166719343];
        for (x, y) in decoded.alpha.column(3).iter().zip(last_column.iter()) {
            assert!((x - y).abs() < TOL, "{}\t{}", x, y);
        }
        assert_eq!(decoded.backpointers.row(1), &[0, 2, 2]);
        assert_eq!(decoded.backpointers.row(2), &[0, 2, 2]);
        assert_eq!(decoded.backpointers.row(3), &[1, 1, 2]);
    }
    #[test]
    fn golden_longer() {
        let model = reference();
        let (path, lk) = decode(&model, b"GGCACTGAA").unwrap();
        assert_eq!(path, vec![2, 2, 2, 2, 1, 0, 0, 0, 0]);
        assert!((lk - (-18.326614234913293)).abs() < TOL);
        let (path, lk) = model.viterbi(b"acgt").unwrap();
        assert_eq!(path, vec![2, 1, 1, 0]);
        assert!((lk - (-7.888584531993863)).abs() < TOL);
    }
    #[test]
    fn single_observation() {
        let model = reference();
        for &base in b"ACGTacgt".iter() {
            let (alpha, backpointers) = fill(&model, &[base]).unwrap();
            assert!(backpointers.is_empty());
            let (path, lk) = backtrack(&alpha, &backpointers);
            let column = model.symbol_to_column(base).unwrap();
            let (best, best_lk) = (0..model.num_states())
                .map(|s| (s, model.log_initial(s) + model.log_emission(s, column)))
                .fold((0, f64::NEG_INFINITY), |acc, x| {
                    if acc.1 < x.1 {
                        x
                    } else {
                        acc
                    }
                });
            assert_eq!(path, vec![best]);
            assert_eq!(lk, best_lk);
        }
        let (path, lk) = decode(&model, b"A").unwrap();
        assert_eq!(path, vec![2]);
        assert!((lk - 0.125f64.ln()).abs() < TOL);
    }
    #[test]
    fn deterministic() {
        let model = reference();
        let mut rng: Xoshiro256StarStar = SeedableRng::seed_from_u64(4234);
        let (_, obs) = model.sample(300, &mut rng);
        let first = decode_with_tables(&model, &obs).unwrap();
        let second = decode_with_tables(&model, &obs).unwrap();
        assert_eq!(first.path, second.path);
        assert_eq!(first.max_log_prob.to_bits(), second.max_log_prob.to_bits());
        assert_eq!(first.backpointers, second.backpointers);
        for (xs, ys) in first.alpha.columns().zip(second.alpha.columns()) {
            assert!(xs.iter().zip(ys).all(|(x, y)| x.to_bits() == y.to_bits()));
        }
    }
    #[test]
    fn tie_goes_to_lowest_predecessor() {
        // State 0 is unreachable at t = 0; states 1 and 2 tie exactly into state 0.
        let model =
            HMM::build(&[0.0, 0.5, 0.5], &[[1.0, 0.0, 0.0]; 3], &[[0.25; 4]; 3]).unwrap();
        let decoded = decode_with_tables(&model, b"AC").unwrap();
        assert_eq!(decoded.backpointers.get(1, 0), 1);
        assert_eq!(decoded.path, vec![1, 0]);
        assert!((decoded.max_log_prob - (0.5f64 * 0.25 * 0.25).ln()).abs() < TOL);
    }
    #[test]
    fn tie_goes_to_lowest_state() {
        let model = HMM::build(&[0.5, 0.5], &[[0.5, 0.5]; 2], &[[0.25; 4]; 2]).unwrap();
        for _ in 0..5 {
            let decoded = decode_with_tables(&model, b"ACGTTGCA").unwrap();
            assert_eq!(decoded.path, vec![0; 8]);
            for t in 1..8 {
                assert_eq!(decoded.backpointers.row(t), &[0, 0]);
            }
        }
    }
    #[test]
    fn impossible_observation() {
        // No state can emit C; every score of the second column is -inf.
        let emission = [[1.0, 0.0, 0.0, 0.0]; 2];
        let model = HMM::build(&[0.5, 0.5], &[[0.5, 0.5]; 2], &emission).unwrap();
        let decoded = decode_with_tables(&model, b"ACA").unwrap();
        assert!(decoded.alpha.columns().flatten().all(|x| !x.is_nan()));
        assert_eq!(decoded.max_log_prob, f64::NEG_INFINITY);
        assert_eq!(decoded.path, vec![0, 0, 0]);
    }
    #[test]
    fn zero_transition_is_never_taken() {
        let model = reference();
        let mut rng: Xoshiro256StarStar = SeedableRng::seed_from_u64(10);
        for _ in 0..20 {
            let (_, obs) = model.sample(100, &mut rng);
            let (path, lk) = decode(&model, &obs).unwrap();
            assert!(lk.is_finite());
            // Pr{S1 -> S2} = 0.
            assert!(path.windows(2).all(|w| !(w[0] == 0 && w[1] == 1)));
        }
    }
    #[test]
    fn unknown_symbol() {
        let model = reference();
        for obs in [&b"ACGN"[..], &b"X"[..], &b"acgtx"[..]] {
            match decode(&model, obs) {
                Err(ViterbiError::UnknownSymbol { symbol, position }) => {
                    assert_eq!(position, obs.len() - 1);
                    assert_eq!(symbol, obs[position] as char);
                }
                other => panic!("{:?}", other),
            }
        }
    }
    #[test]
    fn empty_sequence() {
        let model = reference();
        assert!(matches!(decode(&model, b""), Err(ViterbiError::EmptySequence)));
        assert!(matches!(fill_par(&model, b""), Err(ViterbiError::EmptySequence)));
    }
    #[test]
    fn prefix_stability() {
        let model = reference();
        let mut rng: Xoshiro256StarStar = SeedableRng::seed_from_u64(89);
        let (_, obs) = model.sample(200, &mut rng);
        let (long, _) = fill(&model, &obs).unwrap();
        for len in [1, 2, 50, 199] {
            let (short, short_bp) = fill(&model, &obs[..len]).unwrap();
            for (t, column) in short.columns().enumerate() {
                assert_eq!(column, long.column(t));
            }
            assert_eq!(short_bp.obs_len(), len);
        }
    }
    #[test]
    fn parallel_fill_is_identical() {
        let model = reference();
        let mut rng: Xoshiro256StarStar = SeedableRng::seed_from_u64(3290);
        for len in [1, 2, 10, 500] {
            let (_, obs) = model.sample(len, &mut rng);
            let (alpha, bp) = fill(&model, &obs).unwrap();
            let (alpha_par, bp_par) = fill_par(&model, &obs).unwrap();
            assert_eq!(bp, bp_par);
            for (xs, ys) in alpha.columns().zip(alpha_par.columns()) {
                assert!(xs.iter().zip(ys).all(|(x, y)| x.to_bits() == y.to_bits()));
            }
        }
    }
    #[test]
    fn score_matches_path() {
        let model = reference();
        let mut rng: Xoshiro256StarStar = SeedableRng::seed_from_u64(1293890);
        for _ in 0..20 {
            let (states, obs) = model.sample(150, &mut rng);
            let (path, lk) = decode(&model, &obs).unwrap();
            let recomputed = path_log_prob(&model, &obs, &path).unwrap();
            assert!((lk - recomputed).abs() < 0.000001, "{}\t{}", lk, recomputed);
            let truth = path_log_prob(&model, &obs, &states).unwrap();
            assert!(truth <= lk + 0.000001);
        }
    }
    #[test]
    fn brute_force() {
        let model = reference();
        let num_states = model.num_states();
        let mut rng: Xoshiro256StarStar = SeedableRng::seed_from_u64(42);
        for len in 1..=6 {
            let obs = crate::gen_seq::generate_seq(&mut rng, len);
            let (path, lk) = decode(&model, &obs).unwrap();
            let total = num_states.pow(len as u32);
            let best = (0..total)
                .map(|mut code| {
                    let states: Vec<_> = (0..len)
                        .map(|_| {
                            let s = code % num_states;
                            code /= num_states;
                            s
                        })
                        .collect();
                    path_log_prob(&model, &obs, &states).unwrap()
                })
                .fold(f64::NEG_INFINITY, f64::max);
            assert!((best - lk).abs() < 0.000001, "{}\t{}", best, lk);
            assert_eq!(path.len(), len);
        }
    }
    #[test]
    fn many_states() {
        let num_states = 40;
        let initial = vec![1f64 / num_states as f64; num_states];
        let transition: Vec<Vec<f64>> = (0..num_states)
            .map(|i| {
                let mut row = vec![0.1 / (num_states - 1) as f64; num_states];
                row[i] = 0.9;
                row
            })
            .collect();
        let emission: Vec<Vec<f64>> = (0..num_states)
            .map(|i| {
                let mut row = vec![0.1; 4];
                row[i % 4] = 0.7;
                row
            })
            .collect();
        let model = HMM::build(&initial, &transition, &emission).unwrap();
        let mut rng: Xoshiro256StarStar = SeedableRng::seed_from_u64(5);
        let (_, obs) = model.sample(300, &mut rng);
        let (alpha, bp) = fill(&model, &obs).unwrap();
        let (alpha_par, bp_par) = fill_par(&model, &obs).unwrap();
        assert_eq!(alpha, alpha_par);
        assert_eq!(backtrack(&alpha, &bp), backtrack(&alpha_par, &bp_par));
    }
    #[test]
    #[should_panic]
    fn mismatched_tables() {
        let model = reference();
        let (alpha, _) = fill(&model, b"ACGT").unwrap();
        let (_, bp) = fill(&model, b"ACG").unwrap();
        backtrack(&alpha, &bp);
    }
}
