//! CLI command implementations.

pub mod alloc;
pub mod dump;
pub mod index;
pub mod inspect;
pub mod scan;

use notekv_core::CoreResult;
use notekv_storage::{Config, FileStore};
use std::fmt::Write as _;
use std::path::Path;
use thiserror::Error;

/// Opens an existing store; commands never create one.
pub fn open_store(path: &Path) -> CoreResult<FileStore> {
    FileStore::open(path, Config::new().create_if_missing(false))
}

/// Errors from parsing hex arguments.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum HexError {
    /// The input has an odd number of digits.
    #[error("hex input has odd length {0}")]
    OddLength(usize),

    /// The input holds a character that is not a hex digit.
    #[error("invalid hex digit {0:?}")]
    InvalidDigit(char),
}

/// Formats bytes as lowercase hex.
pub fn to_hex(bytes: &[u8]) -> String {
    let mut out = String::with_capacity(bytes.len() * 2);
    for b in bytes {
        let _ = write!(out, "{b:02x}");
    }
    out
}

/// Parses a hex string. Case-insensitive; empty input is empty output.
pub fn from_hex(s: &str) -> Result<Vec<u8>, HexError> {
    let chars: Vec<char> = s.chars().collect();
    if chars.len() % 2 != 0 {
        return Err(HexError::OddLength(chars.len()));
    }
    let digit = |c: char| c.to_digit(16).ok_or(HexError::InvalidDigit(c));
    chars
        .chunks(2)
        .map(|pair| Ok((digit(pair[0])? * 16 + digit(pair[1])?) as u8))
        .collect()
}

/// Returns true if `format` asks for JSON output.
pub fn is_json(format: &str) -> bool {
    format.eq_ignore_ascii_case("json")
}
