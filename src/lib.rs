//! Most probable hidden state paths of nucleotide sequences under hidden Markov models.
//!
//! ```rust
//! use genepath::model::{HiddenMarkovModel, ModelConfig};
//! let model = HiddenMarkovModel::from_config(&ModelConfig::reference()).unwrap();
//! let (path, lk) = genepath::decode(&model, b"AACG").unwrap();
//! assert_eq!(path, vec![2, 2, 1, 1]);
//! assert!(lk < 0f64);
//! ```
#[macro_use]
extern crate log;
pub mod alphabet;
pub mod dptable;
pub mod error;
pub mod fasta;
pub mod gen_seq;
pub mod model;
pub mod viterbi;
pub use error::{Result, ViterbiError};
pub use model::{HiddenMarkovModel, ModelConfig, HMM};
pub use viterbi::{backtrack, decode, decode_with_tables, fill, fill_par, Decoded};
