//! Hidden Markov models over the nucleotide alphabet.
//!
//! A model is specified by raw probabilities ([`ModelConfig`]) and converted into log space
//! exactly once, by [`HiddenMarkovModel::build`]. The decoder never touches raw probabilities.
use crate::alphabet::ALPHABET_SIZE;
use crate::error::{Result, ViterbiError};
use serde::{Deserialize, Serialize};
use std::borrow::Borrow;

/// Acceptable deviation from 1 for the sum of a probability distribution.
pub const PROB_TOLERANCE: f64 = 0.000001;

/// Raw (not logged) parameters of a model.
/// `transition[i][j]` is Pr{j at t+1 | i at t}, `emission[i][k]` is Pr{k-th base | i}.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelConfig {
    pub initial: Vec<f64>,
    pub transition: Vec<Vec<f64>>,
    pub emission: Vec<Vec<f64>>,
}

impl ModelConfig {
    /// Three-state reference configuration. Emission columns are A, C, T, G.
    pub fn reference() -> Self {
        Self {
            initial: vec![0.3, 0.2, 0.5],
            transition: vec![
                vec![0.5, 0.0, 0.5],
                vec![0.25, 0.5, 0.25],
                vec![0.1, 0.4, 0.5],
            ],
            emission: vec![
                vec![0.3, 0.1, 0.4, 0.2],
                vec![0.1, 0.5, 0.1, 0.3],
                vec![0.25, 0.25, 0.25, 0.25],
            ],
        }
    }
    /// Read a JSON-encoded configuration.
    pub fn from_reader<R: std::io::Read>(rdr: R) -> Result<Self> {
        Ok(serde_json::from_reader(rdr)?)
    }
    pub fn from_path<P: AsRef<std::path::Path>>(path: P) -> Result<Self> {
        let rdr = std::fs::File::open(path).map(std::io::BufReader::new)?;
        Self::from_reader(rdr)
    }
}

impl std::default::Default for ModelConfig {
    fn default() -> Self {
        Self::reference()
    }
}

/// Human readable name of the `state`-th state: S1, S2, ...
pub fn state_label(state: usize) -> String {
    format!("S{}", state + 1)
}

// Probability 0 is kept as an impossible event, not clamped.
fn log(x: &f64) -> f64 {
    if *x == 0f64 {
        f64::NEG_INFINITY
    } else {
        x.ln()
    }
}

fn check_distribution(name: &str, row: &[f64]) -> Result<()> {
    if let Some(x) = row.iter().find(|&&x| !x.is_finite() || x < 0f64) {
        let message = format!("{name} has an entry {x}, not a probability");
        return Err(ViterbiError::InvalidModel(message));
    }
    let sum: f64 = row.iter().sum();
    if PROB_TOLERANCE < (sum - 1f64).abs() {
        let message = format!("{name} sums to {sum}, expected 1");
        return Err(ViterbiError::InvalidModel(message));
    }
    Ok(())
}

/// Validated hidden Markov model. All the parameters are natural logarithms.
/// Matrices are serialized row-major.
#[derive(Debug, Clone, PartialEq)]
pub struct HiddenMarkovModel {
    num_states: usize,
    log_initial: Vec<f64>,
    /// log Pr{to | from} at `from * num_states + to`.
    log_transition: Vec<f64>,
    /// log Pr{base | state} at `state * ALPHABET_SIZE + column`.
    log_emission: Vec<f64>,
}

/// Shorthand for HiddenMarkovModel.
pub type HMM = HiddenMarkovModel;

impl HiddenMarkovModel {
    /// Validate the raw probabilities and take their logarithms.
    /// The number of states is the length of `initial`.
    pub fn build<T, U>(initial: &[f64], transition: &[T], emission: &[U]) -> Result<Self>
    where
        T: Borrow<[f64]>,
        U: Borrow<[f64]>,
    {
        let num_states = initial.len();
        if num_states == 0 {
            return Err(ViterbiError::InvalidModel("no states".to_string()));
        }
        if transition.len() != num_states {
            let message = format!(
                "{} transition rows for {} states",
                transition.len(),
                num_states
            );
            return Err(ViterbiError::InvalidModel(message));
        }
        if emission.len() != num_states {
            let message = format!("{} emission rows for {} states", emission.len(), num_states);
            return Err(ViterbiError::InvalidModel(message));
        }
        check_distribution("initial distribution", initial)?;
        for (i, row) in transition.iter().enumerate() {
            let row = row.borrow();
            if row.len() != num_states {
                let message = format!("transition row {i} has {} columns", row.len());
                return Err(ViterbiError::InvalidModel(message));
            }
            check_distribution(&format!("transition row {i}"), row)?;
        }
        for (i, row) in emission.iter().enumerate() {
            let row = row.borrow();
            if row.len() != ALPHABET_SIZE {
                let message = format!("emission row {i} has {} columns", row.len());
                return Err(ViterbiError::InvalidModel(message));
            }
            check_distribution(&format!("emission row {i}"), row)?;
        }
        let log_initial: Vec<_> = initial.iter().map(log).collect();
        let log_transition: Vec<_> = transition
            .iter()
            .flat_map(|row| row.borrow().iter().map(log))
            .collect();
        let log_emission: Vec<_> = emission
            .iter()
            .flat_map(|row| row.borrow().iter().map(log))
            .collect();
        debug!("MODEL\tBuilt a model with {} states", num_states);
        Ok(Self {
            num_states,
            log_initial,
            log_transition,
            log_emission,
        })
    }
    pub fn from_config(config: &ModelConfig) -> Result<Self> {
        Self::build(&config.initial, &config.transition, &config.emission)
    }
    pub fn num_states(&self) -> usize {
        self.num_states
    }
    pub fn log_initial(&self, state: usize) -> f64 {
        self.log_initial[state]
    }
    pub fn log_transition(&self, from: usize, to: usize) -> f64 {
        self.log_transition[from * self.num_states + to]
    }
    pub fn log_emission(&self, state: usize, column: usize) -> f64 {
        self.log_emission[state * ALPHABET_SIZE + column]
    }
    /// log-initial distribution.
    pub fn initial_row(&self) -> &[f64] {
        &self.log_initial
    }
    /// log Pr{ * | from}.
    pub fn transition_row(&self, from: usize) -> &[f64] {
        let start = from * self.num_states;
        &self.log_transition[start..start + self.num_states]
    }
    /// log Pr{ * | state}.
    pub fn emission_row(&self, state: usize) -> &[f64] {
        let start = state * ALPHABET_SIZE;
        &self.log_emission[start..start + ALPHABET_SIZE]
    }
    /// Column of `symbol` in the emission matrix.
    /// The byte is seen out of any sequence, so an `UnknownSymbol` raised here always
    /// reports position 0. Use [`crate::alphabet::symbol_to_column`] to report where it came from.
    pub fn symbol_to_column(&self, symbol: u8) -> Result<usize> {
        crate::alphabet::symbol_to_column(symbol, 0)
    }
    /// Human readable name of the state: S1, S2, ...
    pub fn state_label(&self, state: usize) -> String {
        state_label(state)
    }
}

impl std::convert::TryFrom<&ModelConfig> for HiddenMarkovModel {
    type Error = ViterbiError;
    fn try_from(config: &ModelConfig) -> Result<Self> {
        Self::from_config(config)
    }
}

fn write_row(f: &mut std::fmt::Formatter<'_>, name: &str, row: &[f64]) -> std::fmt::Result {
    write!(f, "{name}:")?;
    for (i, x) in row.iter().enumerate() {
        if 0 < i {
            write!(f, "\t")?;
        }
        write!(f, "{x:.3}")?;
    }
    writeln!(f)
}

impl std::fmt::Display for HiddenMarkovModel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write_row(f, "PI", self.initial_row())?;
        for from in 0..self.num_states {
            write_row(f, &format!("TR{}", state_label(from)), self.transition_row(from))?;
        }
        for state in 0..self.num_states {
            write_row(f, &format!("EM{}", state_label(state)), self.emission_row(state))?;
        }
        Ok(())
    }
}
