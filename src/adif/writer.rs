// ADIF Writer
// Formats headers and records in the tagged, length-prefixed form the
// reader consumes. Derived timestamps are never written back.

use std::io::Write;

use rust_decimal::Decimal;

use super::error::AdifError;
use super::reader::Record;

/// Format a header block: free text, optional version field, `<eoh>`
///
/// The text must be non-empty and must not start with '<', otherwise a
/// reader would not recognise it as a header.
pub fn format_header(header_text: &str, adif_ver: Option<Decimal>) -> Result<String, AdifError> {
    if header_text.is_empty() {
        return Err(AdifError::InvalidHeader("header text is empty"));
    }
    if header_text.starts_with('<') {
        return Err(AdifError::InvalidHeader("header text starts with '<'"));
    }

    Ok(match adif_ver {
        Some(ver) => {
            let ver = ver.to_string();
            format!("{}<adif_ver:{}>{}<eoh>", header_text, ver.len(), ver)
        }
        None => format!("{}<eoh>", header_text),
    })
}

/// Format one record's raw fields followed by `<eor>`
pub fn format_record(record: &Record) -> String {
    let mut out = String::new();
    for (name, value) in record.fields() {
        out.push_str(&format!("<{}:{}>{}", name, value.len(), value));
    }
    out.push_str("<eor>");
    out
}

/// Write a complete ADIF document, one record per line
///
/// Returns the number of records written.
pub fn write_adif<W: Write>(
    out: &mut W,
    header_text: &str,
    adif_ver: Option<Decimal>,
    records: &[Record],
) -> Result<usize, AdifError> {
    writeln!(out, "{}", format_header(header_text, adif_ver)?)?;
    for record in records {
        writeln!(out, "{}", format_record(record))?;
    }
    out.flush()?;
    Ok(records.len())
}
