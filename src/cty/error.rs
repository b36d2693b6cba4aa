//! Error types for prefix table loading and callsign lookup

use thiserror::Error;

/// Failures while loading a cty.dat table
#[derive(Debug, Error)]
pub enum TableError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Alias line before any entity line
    #[error("line {line}: alias line before any entity line")]
    OrphanContinuation { line: usize },

    /// Entity line without eight usable fields
    #[error("line {line}: malformed entity line: {reason}")]
    MalformedEntity { line: usize, reason: String },

    /// Alias token with a broken override annotation
    #[error("line {line}: malformed alias '{alias}': {reason}")]
    MalformedAlias {
        line: usize,
        alias: String,
        reason: String,
    },
}

/// Failures while resolving a callsign
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LookupError {
    /// Unparseable '/' structure or a numeric-only part
    #[error("invalid callsign: {0}")]
    InvalidCallsign(String),

    /// No alias matched, or the winning alias points at a missing entity
    #[error("no DXCC entity for {call}")]
    InvalidDxcc {
        call: String,
        /// Set when an alias matched but its main prefix is not in the table
        main_prefix: Option<String>,
    },
}
