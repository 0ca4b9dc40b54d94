//! Very thin sequence reader. Only support batch IO.
//! Accepts FASTA or a plain text file holding a single sequence.
use std::io::{BufRead, BufReader};
pub type FASTARecord = (String, Vec<u8>);

/// Name of the record read from a plain text input.
pub const PLAIN_TEXT_ID: &str = "sequence";

fn open<P: AsRef<std::path::Path>>(file: &Option<P>) -> std::io::Result<Vec<u8>> {
    let stdin = std::io::stdin();
    let mut reader: Box<dyn BufRead> = match file {
        Some(file) => std::fs::File::open(file)
            .map(BufReader::new)
            .map(Box::new)?,
        None => {
            let lock = stdin.lock();
            Box::new(BufReader::new(lock))
        }
    };
    let mut contents = vec![];
    reader.read_to_end(&mut contents)?;
    Ok(contents)
}

/// Read file or stdin and return the sequences to be decoded.
/// Everything but ASCII letters is removed from the sequences.
/// A malformed FASTA record is skipped.
pub fn read_observations<P: AsRef<std::path::Path>>(
    file: &Option<P>,
) -> std::io::Result<Vec<FASTARecord>> {
    open(file).map(|contents| parse_observations(&contents))
}

pub fn parse_observations(contents: &[u8]) -> Vec<FASTARecord> {
    let is_fasta = contents
        .iter()
        .find(|x| !x.is_ascii_whitespace())
        .map_or(false, |&x| x == b'>');
    if is_fasta {
        parse_fasta(contents)
            .into_iter()
            .map(|(id, seq)| (id, strip_non_alphabetic(&seq)))
            .collect()
    } else {
        vec![(PLAIN_TEXT_ID.to_string(), strip_non_alphabetic(contents))]
    }
}

/// Drop digits, whitespaces, gaps and so on. Non-nucleotide letters are kept.
pub fn strip_non_alphabetic(seq: &[u8]) -> Vec<u8> {
    seq.iter()
        .filter(|x| x.is_ascii_alphabetic())
        .copied()
        .collect()
}

fn parse_fasta(contents: &[u8]) -> Vec<FASTARecord> {
    let start = contents
        .iter()
        .position(|x| !x.is_ascii_whitespace())
        .unwrap_or(contents.len());
    let contents = &contents[start..];
    let mut contents = contents.split(|&x| x == b'>');
    if let Some(first) = contents.next() {
        debug_assert!(first.is_empty())
    }
    contents
        .filter_map(|record| {
            let mut record = record.splitn(2, |&x| x == b'\n');
            let id = record.next()?.split(|x| x.is_ascii_whitespace()).next()?;
            let contents = record.next()?;
            let contents: Vec<_> = contents
                .iter()
                .filter(|&&x| x != b'\n' && x != b'\r')
                .copied()
                .collect();
            Some((String::from_utf8_lossy(id).to_string(), contents))
        })
        .collect()
}
