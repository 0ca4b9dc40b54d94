//! Tables filled by the Viterbi algorithm.
//!
//! Both tables are serialized 2-d arrays stored column by column, i.e., all the states of
//! position `t` are contiguous. A column depends only on the previous one, so appending
//! columns never touches the ones already computed.
use crate::model::state_label;

/// Alpha matrix. `get(s, t)` is the log-probability of the best path over the
/// first `t + 1` observations ending in state `s`.
#[derive(Debug, Clone, PartialEq)]
pub struct DPTable {
    mem: Vec<f64>,
    num_states: usize,
    len: usize,
}

impl DPTable {
    pub fn new(num_states: usize, len: usize) -> Self {
        Self {
            mem: vec![f64::NEG_INFINITY; num_states * len],
            num_states,
            len,
        }
    }
    pub fn num_states(&self) -> usize {
        self.num_states
    }
    /// Number of columns, i.e., the length of the observation.
    pub fn len(&self) -> usize {
        self.len
    }
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }
    pub fn get(&self, state: usize, t: usize) -> f64 {
        self.mem[t * self.num_states + state]
    }
    pub fn get_mut(&mut self, state: usize, t: usize) -> &mut f64 {
        &mut self.mem[t * self.num_states + state]
    }
    /// Scores of all the states at position `t`.
    pub fn column(&self, t: usize) -> &[f64] {
        &self.mem[t * self.num_states..(t + 1) * self.num_states]
    }
    pub fn column_mut(&mut self, t: usize) -> &mut [f64] {
        &mut self.mem[t * self.num_states..(t + 1) * self.num_states]
    }
    /// The previous column (read only) and column `t` (writable) at once.
    pub fn split_at_column(&mut self, t: usize) -> (&[f64], &mut [f64]) {
        assert!(0 < t && t < self.len);
        let n = self.num_states;
        let (prev, current) = self.mem[(t - 1) * n..(t + 1) * n].split_at_mut(n);
        (prev, current)
    }
    pub fn columns(&self) -> std::slice::ChunksExact<'_, f64> {
        self.mem.chunks_exact(self.num_states)
    }
}

impl std::fmt::Display for DPTable {
    // One row per state, as the alpha matrix is usually written.
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for state in 0..self.num_states {
            write!(f, "{}:", state_label(state))?;
            for t in 0..self.len {
                write!(f, "\t{:.3}", self.get(state, t))?;
            }
            writeln!(f)?;
        }
        Ok(())
    }
}

/// Backpointer table. `get(t, s)` (`1 <= t`) is the predecessor state at `t - 1`
/// of the best path ending in state `s` at position `t`.
/// Position zero has no predecessor, so it holds `obs_len - 1` rows.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Backpointers {
    mem: Vec<usize>,
    num_states: usize,
    obs_len: usize,
}

impl Backpointers {
    /// Table for an observation of length `obs_len` (`0 < obs_len`).
    pub fn new(num_states: usize, obs_len: usize) -> Self {
        assert!(0 < obs_len);
        Self {
            mem: vec![0; num_states * (obs_len - 1)],
            num_states,
            obs_len,
        }
    }
    pub fn num_states(&self) -> usize {
        self.num_states
    }
    /// Number of rows, `obs_len - 1`.
    pub fn num_rows(&self) -> usize {
        self.obs_len - 1
    }
    /// Length of the observation this table was made for.
    pub fn obs_len(&self) -> usize {
        self.obs_len
    }
    /// No rows at all, i.e., a single observation.
    pub fn is_empty(&self) -> bool {
        self.num_rows() == 0
    }
    pub fn get(&self, t: usize, state: usize) -> usize {
        self.mem[(t - 1) * self.num_states + state]
    }
    pub fn row(&self, t: usize) -> &[usize] {
        &self.mem[(t - 1) * self.num_states..t * self.num_states]
    }
    pub fn row_mut(&mut self, t: usize) -> &mut [usize] {
        &mut self.mem[(t - 1) * self.num_states..t * self.num_states]
    }
}

impl std::fmt::Display for Backpointers {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for t in 1..self.obs_len {
            let row: Vec<_> = self.row(t).iter().map(|&p| state_label(p)).collect();
            writeln!(f, "{}:\t{}", t, row.join("\t"))?;
        }
        Ok(())
    }
}
