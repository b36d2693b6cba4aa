// WPX prefix derivation
// Reduces a callsign to its contest prefix: K4NNQ -> K4, W1AW/KH6 -> KH6,
// W1AW/KH6/4 -> KH4.
//
// Calls split on '/' into home, portable and suffix parts. Each shape has
// its own branch; a shape no branch covers has no prefix.

use super::error::LookupError;

/// Suffixes that say nothing about location
const LID_ADDITIONS: &[&str] = &["QRP", "LGT"];

/// Portable, mobile, maritime and aeronautical markers
const OPERATING_MARKERS: &[&str] = &["P", "M", "MM", "AM", "A"];

/// Derive the WPX prefix of a callsign
pub fn wpx_prefix(call: &str) -> Result<String, LookupError> {
    derive(call)?.ok_or_else(|| LookupError::InvalidCallsign(call.to_string()))
}

/// `Ok(None)` when the parts are well formed but fit no prefix rule
pub(crate) fn derive(call: &str) -> Result<Option<String>, LookupError> {
    let invalid = || LookupError::InvalidCallsign(call.to_string());

    let parts: Vec<&str> = call.trim().split('/').filter(|p| !p.is_empty()).collect();
    if parts
        .iter()
        .any(|p| !p.chars().all(|c| c.is_ascii_alphanumeric()))
    {
        return Err(invalid());
    }

    match parts.as_slice() {
        [home] => Ok(bare_prefix(home)),
        [home, suffix] if is_marker(suffix) => Ok(bare_prefix(home)),
        [_, designator] => {
            if is_numeric(designator) {
                return Err(invalid());
            }
            Ok(Some(as_prefix(designator)))
        }
        [home, portable, suffix] => {
            if is_numeric(home) {
                return Err(invalid());
            }
            // PFX/CALL/SUFFIX: a leading bare prefix names the location
            if home.ends_with(|c: char| c.is_ascii_digit()) {
                return Ok(Some(home.to_string()));
            }
            Ok(with_suffix(home, portable, suffix))
        }
        _ => Err(invalid()),
    }
}

/// HOME/PORTABLE/SUFFIX, decided by the suffix shape
///
/// The prefix is built from the portable part's leading run; a portable
/// part without a call area digit falls back to the home call's run.
fn with_suffix(home: &str, portable: &str, suffix: &str) -> Option<String> {
    let run = || leading_run(portable).or_else(|| leading_run(home));

    if is_numeric(suffix) && suffix.len() == 1 {
        let run = run()?;
        let b = run.as_bytes();
        // Letter-digit-digit runs take the digit as is: A45 -> A45n
        if b.len() == 3 && b[0].is_ascii_alphabetic() && b[1].is_ascii_digit() && b[2].is_ascii_digit() {
            return Some(format!("{}{}", run, suffix));
        }
        let letters = run.trim_end_matches(|c: char| c.is_ascii_digit());
        Some(format!("{}{}", letters, suffix))
    } else if is_marker(suffix) || is_numeric(suffix) {
        run().map(str::to_string)
    } else {
        Some(as_prefix(suffix))
    }
}

/// Prefix of a call with no modifiers
fn bare_prefix(call: &str) -> Option<String> {
    if call.chars().any(|c| c.is_ascii_digit()) {
        leading_run(call).map(str::to_string)
    } else {
        let head: String = call.chars().take(2).collect();
        Some(format!("{}0", head))
    }
}

/// Everything up to and including the last digit, which must not be the
/// first character
fn leading_run(part: &str) -> Option<&str> {
    match part.rfind(|c: char| c.is_ascii_digit()) {
        Some(0) | None => None,
        Some(idx) => Some(&part[..=idx]),
    }
}

/// A designator ending in a letter gets a trailing zero
fn as_prefix(designator: &str) -> String {
    if designator.ends_with(|c: char| c.is_ascii_digit()) {
        designator.to_string()
    } else {
        format!("{}0", designator)
    }
}

fn is_marker(part: &str) -> bool {
    LID_ADDITIONS.contains(&part) || OPERATING_MARKERS.contains(&part)
}

fn is_numeric(part: &str) -> bool {
    !part.is_empty() && part.chars().all(|c| c.is_ascii_digit())
}
