// Nucleotide alphabet and its mapping onto the columns of an emission matrix.
//
// The alphabet is closed: every byte either maps to exactly one `Base` or is rejected.
// Column order is A, C, T, G, the layout of the reference emission matrix.
use crate::error::{Result, ViterbiError};

/// Number of columns in an emission matrix.
pub const ALPHABET_SIZE: usize = 4;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Base {
    A,
    C,
    T,
    G,
}

pub const BASES: [Base; ALPHABET_SIZE] = [Base::A, Base::C, Base::T, Base::G];

// Sentinel for bytes outside of the alphabet.
const NULL: u8 = 0xFF;

const fn lookup_table() -> [u8; 256] {
    let mut slots = [NULL; 256];
    slots[b'A' as usize] = 0;
    slots[b'a' as usize] = 0;
    slots[b'C' as usize] = 1;
    slots[b'c' as usize] = 1;
    slots[b'T' as usize] = 2;
    slots[b't' as usize] = 2;
    slots[b'G' as usize] = 3;
    slots[b'g' as usize] = 3;
    slots
}
const LOOKUP_TABLE: [u8; 256] = lookup_table();

impl Base {
    /// Case-insensitive conversion. Returns `None` for anything but A/C/G/T.
    pub const fn from_byte(byte: u8) -> Option<Self> {
        match LOOKUP_TABLE[byte as usize] {
            0 => Some(Base::A),
            1 => Some(Base::C),
            2 => Some(Base::T),
            3 => Some(Base::G),
            _ => None,
        }
    }
    /// Column of this base in the emission matrix.
    pub const fn column(self) -> usize {
        match self {
            Base::A => 0,
            Base::C => 1,
            Base::T => 2,
            Base::G => 3,
        }
    }
    pub const fn to_byte(self) -> u8 {
        match self {
            Base::A => b'A',
            Base::C => b'C',
            Base::T => b'T',
            Base::G => b'G',
        }
    }
}

impl std::fmt::Display for Base {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        use std::fmt::Write;
        f.write_char(self.to_byte() as char)
    }
}

/// Column index of `symbol`. `position` is only used to report the error.
pub fn symbol_to_column(symbol: u8, position: usize) -> Result<usize> {
    Base::from_byte(symbol)
        .map(Base::column)
        .ok_or(ViterbiError::UnknownSymbol {
            symbol: symbol as char,
            position,
        })
}
