//! Errors raised while building a model or decoding a sequence.
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ViterbiError {
    /// Malformed or non-normalized model parameters.
    #[error("invalid model: {0}")]
    InvalidModel(String),
    /// A character outside of the nucleotide alphabet.
    #[error("unknown symbol {symbol:?} at position {position}")]
    UnknownSymbol { symbol: char, position: usize },
    /// Zero-length observation sequence.
    #[error("empty observation sequence")]
    EmptySequence,
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    /// The model file could not be parsed.
    #[error("model format error: {0}")]
    ModelFormat(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, ViterbiError>;
