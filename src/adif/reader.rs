// ADIF Reader
// Header detection, record assembly and replay over a seekable stream.
//
// The header is parsed once when the reader is built. Every call to
// `records()` seeks back to the bookmark recorded after the header, so the
// same reader can be iterated any number of times.

use std::io::{BufReader, Read, Seek, SeekFrom};
use std::str::FromStr;

use chrono::NaiveDateTime;
use rust_decimal::Decimal;

use super::datetime;
use super::error::{AdifError, DerivationError};
use super::lexer::Lexer;

/// A single ADIF record (one QSO)
///
/// Field names are lowercase and unique. A repeated name keeps its first
/// position and takes the last value.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Record {
    fields: Vec<(String, String)>,
    datetime_on: Option<Result<NaiveDateTime, DerivationError>>,
    datetime_off: Option<Result<NaiveDateTime, DerivationError>>,
}

impl Record {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or overwrite a field
    pub fn insert(&mut self, name: &str, value: impl Into<String>) {
        let name = name.to_lowercase();
        let value = value.into();
        match self.fields.iter_mut().find(|(k, _)| *k == name) {
            Some(slot) => slot.1 = value,
            None => self.fields.push((name, value)),
        }
    }

    /// Get a field value (case-insensitive lookup)
    pub fn get(&self, key: &str) -> Option<&str> {
        let key = key.to_lowercase();
        self.fields
            .iter()
            .find(|(k, _)| *k == key)
            .map(|(_, v)| v.as_str())
    }

    /// Check if a field exists
    pub fn has(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    /// Raw fields in stream order
    pub fn fields(&self) -> impl Iterator<Item = (&str, &str)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn call(&self) -> Option<&str> { self.get("call") }
    pub fn band(&self) -> Option<&str> { self.get("band") }
    pub fn mode(&self) -> Option<&str> { self.get("mode") }
    pub fn qso_date(&self) -> Option<&str> { self.get("qso_date") }
    pub fn time_on(&self) -> Option<&str> { self.get("time_on") }
    pub fn time_off(&self) -> Option<&str> { self.get("time_off") }
    pub fn operator(&self) -> Option<&str> { self.get("operator") }
    pub fn gridsquare(&self) -> Option<&str> { self.get("gridsquare") }
    pub fn freq(&self) -> Option<f64> {
        self.get("freq").and_then(|s| s.trim().parse().ok())
    }

    /// Start of the contact, derived from `qso_date` + `time_on`
    ///
    /// `None` when either field is missing; an error when they are present
    /// but malformed. The raw fields are valid either way.
    pub fn datetime_on(&self) -> Option<Result<NaiveDateTime, DerivationError>> {
        self.datetime_on.clone()
    }

    /// End of the contact, derived from `qso_date` + `time_off`
    pub fn datetime_off(&self) -> Option<Result<NaiveDateTime, DerivationError>> {
        self.datetime_off.clone()
    }

    fn derive_timestamps(&mut self) {
        let date = match self.qso_date() {
            Some(d) => d,
            None => return,
        };
        let on = self
            .time_on()
            .map(|t| datetime::combine(date, "time_on", t));
        let off = self
            .time_off()
            .map(|t| datetime::combine(date, "time_off", t));
        self.datetime_on = on;
        self.datetime_off = off;
    }
}

/// ADIF reader over a seekable stream
pub struct Reader<R> {
    inner: R,
    adif_ver: Option<Decimal>,
    header_present: bool,
    bookmark: u64,
}

impl<R: Read + Seek> Reader<R> {
    /// Open a stream and consume its header, if any
    pub fn new(mut inner: R) -> Result<Self, AdifError> {
        inner.seek(SeekFrom::Start(0))?;

        let mut first = [0u8; 1];
        let peeked = inner.read(&mut first)?;
        if peeked == 1 && first[0] == b'<' {
            inner.seek(SeekFrom::Start(0))?;
            return Ok(Self {
                inner,
                adif_ver: None,
                header_present: false,
                bookmark: 0,
            });
        }

        let mut adif_ver = None;
        let consumed = {
            let mut lexer = Lexer::new(BufReader::new(&mut inner));
            for field in lexer.by_ref() {
                let field = field?;
                match field.name.as_str() {
                    "adif_ver" => {
                        let text = field.body.trim();
                        let version = Decimal::from_str(text)
                            .map_err(|_| AdifError::InvalidVersion(text.to_string()))?;
                        adif_ver = Some(version);
                    }
                    "eoh" => break,
                    _ => {}
                }
            }
            lexer.consumed()
        };

        let bookmark = peeked as u64 + consumed;
        inner.seek(SeekFrom::Start(bookmark))?;

        Ok(Self {
            inner,
            adif_ver,
            header_present: true,
            bookmark,
        })
    }

    /// Version declared in the header (`adif_ver`)
    pub fn adif_ver(&self) -> Option<Decimal> {
        self.adif_ver
    }

    pub fn header_present(&self) -> bool {
        self.header_present
    }

    /// Byte offset where record data starts
    pub fn bookmark(&self) -> u64 {
        self.bookmark
    }

    /// Iterate records from the bookmark
    pub fn records(&mut self) -> Records<'_, R> {
        let seek_error = self
            .inner
            .seek(SeekFrom::Start(self.bookmark))
            .err()
            .map(AdifError::from);
        Records {
            lexer: Lexer::new(BufReader::new(&mut self.inner)),
            current: Record::new(),
            seek_error,
        }
    }

    pub fn into_inner(self) -> R {
        self.inner
    }
}

/// Lazy record iterator returned by [`Reader::records`]
///
/// Fields after the last `eor` are dropped. A tag error discards the
/// partially assembled record and is yielded once; iteration can continue.
pub struct Records<'a, R> {
    lexer: Lexer<BufReader<&'a mut R>>,
    current: Record,
    seek_error: Option<AdifError>,
}

impl<'a, R: Read> Iterator for Records<'a, R> {
    type Item = Result<Record, AdifError>;

    fn next(&mut self) -> Option<Self::Item> {
        if let Some(err) = self.seek_error.take() {
            return Some(Err(err));
        }

        for field in self.lexer.by_ref() {
            let field = match field {
                Ok(f) => f,
                Err(e) => {
                    self.current = Record::new();
                    return Some(Err(e));
                }
            };

            if field.name == "eor" {
                let mut record = std::mem::take(&mut self.current);
                record.derive_timestamps();
                return Some(Ok(record));
            }
            self.current.insert(&field.name, field.body);
        }
        None
    }
}

/// Parsed ADIF document held in memory
#[derive(Debug, Clone, Default)]
pub struct AdifFile {
    /// Version declared in the header
    pub adif_ver: Option<Decimal>,
    /// QSO records
    pub records: Vec<Record>,
}

/// Parse an ADIF string into records
pub fn parse_adif(content: &str) -> Result<AdifFile, AdifError> {
    let mut reader = Reader::new(std::io::Cursor::new(content.as_bytes()))?;
    let records = reader.records().collect::<Result<Vec<_>, _>>()?;
    Ok(AdifFile {
        adif_ver: reader.adif_ver(),
        records,
    })
}
