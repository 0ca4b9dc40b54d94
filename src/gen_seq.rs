//! This module is to generate some random sequence to assess the performance.
//! Usually, it would not be used in the real-applications.
use crate::alphabet::BASES;
use crate::model::HiddenMarkovModel;
use rand::seq::SliceRandom;

/// Models that can emit a random observation.
pub trait Generate {
    /// Draw a hidden state path of length `len` and the bases emitted along it.
    fn sample<R: rand::Rng>(&self, len: usize, rng: &mut R) -> (Vec<usize>, Vec<u8>);
}

impl Generate for HiddenMarkovModel {
    fn sample<R: rand::Rng>(&self, len: usize, rng: &mut R) -> (Vec<usize>, Vec<u8>) {
        let states: Vec<_> = (0..self.num_states()).collect();
        let mut path: Vec<usize> = Vec::with_capacity(len);
        let mut seq = Vec::with_capacity(len);
        for _ in 0..len {
            let current = match path.last() {
                Some(&prev) => *states
                    .choose_weighted(rng, |&to| self.log_transition(prev, to).exp())
                    .unwrap(),
                None => *states
                    .choose_weighted(rng, |&s| self.log_initial(s).exp())
                    .unwrap(),
            };
            let base = BASES
                .choose_weighted(rng, |b| self.log_emission(current, b.column()).exp())
                .unwrap();
            path.push(current);
            seq.push(base.to_byte());
        }
        (path, seq)
    }
}

pub fn generate_seq<T: rand::Rng>(rng: &mut T, len: usize) -> Vec<u8> {
    let bases = b"ACTG";
    (0..len)
        .filter_map(|_| bases.choose(rng))
        .copied()
        .collect()
}
