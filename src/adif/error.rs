// ADIF error types
//
// Tag errors are fatal to the current stream position only; the lexer
// resumes scanning at the next '<' if the caller keeps iterating.
// Derivation errors stay attached to the record that produced them.

use thiserror::Error;

/// Malformed tag syntax
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TagParseError {
    /// A third ':' inside the data type segment
    #[error("colon in type segment of tag '{name}' at byte {offset}")]
    ColonInType { name: String, offset: u64 },

    /// Length segment that is not a decimal number
    #[error("invalid length '{text}' in tag '{name}' at byte {offset}")]
    InvalidLength {
        name: String,
        text: String,
        offset: u64,
    },

    /// Stream ended inside a tag or before the body was complete
    #[error("unterminated tag '{name}' at end of stream (byte {offset})")]
    Unterminated { name: String, offset: u64 },
}

/// A date or time substring that cannot form a timestamp
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid {field} '{value}': {reason}")]
pub struct DerivationError {
    pub field: &'static str,
    pub value: String,
    pub reason: &'static str,
}

/// Errors surfaced by the ADIF reader and writer
#[derive(Debug, Error)]
pub enum AdifError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Tag parse error: {0}")]
    Tag(#[from] TagParseError),

    /// adif_ver header field is not a decimal number
    #[error("invalid ADIF version '{0}'")]
    InvalidVersion(String),

    /// Header text would not be read back as a header
    #[error("invalid header text: {0}")]
    InvalidHeader(&'static str),
}
