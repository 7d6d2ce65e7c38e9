//! Bytecode extraction from qjsc's generated C source.
//!
//! `qjsc -c` writes the compiled module as a byte array literal:
//!
//! ```c
//! const uint32_t qjsc_f_size = 3;
//!
//! const uint8_t qjsc_f[3] = {
//!  0x02, 0x04, 0x0e,
//! };
//! ```
//!
//! [`extract`] pulls the raw bytes back out of that text. The first `{` in
//! the text must open the array, and every element must be a `0x` byte
//! literal.

use thiserror::Error;

/// Why generated text could not be decoded.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ExtractError {
    #[error("no array literal found")]
    MissingArray,

    #[error("array literal is not terminated")]
    Unterminated,

    #[error("unexpected '{{' inside array literal")]
    NestedBrace,

    #[error("array literal is empty")]
    Empty,

    #[error("element {index} is empty")]
    EmptyElement { index: usize },

    #[error("element {index} ({token:?}) is missing the 0x prefix")]
    MissingPrefix { index: usize, token: String },

    #[error("element {index} ({token:?}) is not a byte")]
    InvalidByte { index: usize, token: String },

    #[error("array declares {declared} bytes but contains {actual}")]
    LengthMismatch { declared: usize, actual: usize },
}

/// Decode the first byte array literal in `text`.
pub fn extract(text: &str) -> Result<Vec<u8>, ExtractError> {
    let open = text.find('{').ok_or(ExtractError::MissingArray)?;
    let rest = &text[open + 1..];
    let close = rest.find('}').ok_or(ExtractError::Unterminated)?;
    let body = &rest[..close];

    if body.contains('{') {
        return Err(ExtractError::NestedBrace);
    }

    let mut tokens: Vec<&str> = body.split(',').map(str::trim).collect();
    // trailing comma before the closing brace
    if tokens.last().is_some_and(|t| t.is_empty()) {
        tokens.pop();
    }
    if tokens.is_empty() {
        return Err(ExtractError::Empty);
    }

    let bytes = tokens
        .iter()
        .enumerate()
        .map(|(index, token)| parse_byte(index, token))
        .collect::<Result<Vec<u8>, _>>()?;

    if let Some(declared) = declared_len(&text[..open]) {
        if declared != bytes.len() {
            return Err(ExtractError::LengthMismatch {
                declared,
                actual: bytes.len(),
            });
        }
    }

    Ok(bytes)
}

fn parse_byte(index: usize, token: &str) -> Result<u8, ExtractError> {
    if token.is_empty() {
        return Err(ExtractError::EmptyElement { index });
    }

    let digits = token
        .strip_prefix("0x")
        .or_else(|| token.strip_prefix("0X"))
        .ok_or_else(|| ExtractError::MissingPrefix {
            index,
            token: token.to_string(),
        })?;

    let invalid = || ExtractError::InvalidByte {
        index,
        token: token.to_string(),
    };

    if digits.is_empty() || digits.len() > 2 || !digits.bytes().all(|b| b.is_ascii_hexdigit()) {
        return Err(invalid());
    }

    u8::from_str_radix(digits, 16).map_err(|_| invalid())
}

/// Length from a `name[N] =` declaration directly before the literal.
fn declared_len(declaration: &str) -> Option<usize> {
    let statement = declaration.rsplit(';').next()?;
    let open = statement.rfind('[')?;
    let close = open + statement[open..].find(']')?;
    statement[open + 1..close].trim().parse().ok()
}
