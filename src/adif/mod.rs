// ADIF (Amateur Data Interchange Format) Reader and Writer
// Reference: https://adif.org/

pub mod datetime;
pub mod error;
pub mod lexer;
pub mod reader;
pub mod writer;

pub use error::{AdifError, DerivationError, TagParseError};
pub use lexer::{Field, Lexer};
pub use reader::{parse_adif, AdifFile, Reader, Record, Records};
pub use writer::{format_header, format_record, write_adif};
