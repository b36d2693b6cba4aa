// ADIF Field Tokenizer
// Byte-level state machine over a buffered stream.
//
// Tag grammar: <name>, <name:len>body, <name:len:type>body
// Lengths count bytes. Anything outside a tag is free text and skipped.

use std::io::{BufRead, Bytes};

use super::error::{AdifError, TagParseError};

/// One tagged field from an ADIF stream
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Field {
    /// Field name, lowercased
    pub name: String,
    /// Data type indicator, lowercased (empty when the tag has none)
    pub data_type: String,
    /// Body copied verbatim
    pub body: String,
}

impl Field {
    pub fn new(name: &str, data_type: &str, body: &str) -> Self {
        Self {
            name: name.to_string(),
            data_type: data_type.to_string(),
            body: body.to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Scanning,
    TagName,
    TagLen,
    TagType,
    Body,
}

/// Lazy, single-pass field iterator
///
/// Not restartable: to read again, seek the underlying stream and build a
/// new lexer. After a [`TagParseError`] the lexer is back in the scanning
/// state, so continuing to iterate resynchronises at the next tag.
pub struct Lexer<R> {
    bytes: Bytes<R>,
    state: State,
    name: Vec<u8>,
    len_text: Vec<u8>,
    data_type: Vec<u8>,
    body: Vec<u8>,
    remaining: usize,
    consumed: u64,
    done: bool,
}

impl<R: BufRead> Lexer<R> {
    pub fn new(reader: R) -> Self {
        Self {
            bytes: reader.bytes(),
            state: State::Scanning,
            name: Vec::new(),
            len_text: Vec::new(),
            data_type: Vec::new(),
            body: Vec::new(),
            remaining: 0,
            consumed: 0,
            done: false,
        }
    }

    /// Number of bytes read from the underlying stream so far
    pub fn consumed(&self) -> u64 {
        self.consumed
    }

    fn start_tag(&mut self) {
        self.name.clear();
        self.len_text.clear();
        self.data_type.clear();
        self.body.clear();
        self.remaining = 0;
        self.state = State::TagName;
    }

    fn tag_name(&self) -> String {
        String::from_utf8_lossy(&self.name).to_lowercase()
    }

    fn emit(&mut self) -> Field {
        self.state = State::Scanning;
        Field {
            name: self.tag_name(),
            data_type: String::from_utf8_lossy(&self.data_type).to_lowercase(),
            body: String::from_utf8_lossy(&self.body).into_owned(),
        }
    }

    fn fail(&mut self, err: TagParseError) -> AdifError {
        self.state = State::Scanning;
        AdifError::Tag(err)
    }

    fn parse_len(&mut self) -> Result<(), AdifError> {
        let text = String::from_utf8_lossy(&self.len_text).into_owned();
        match text.trim().parse::<usize>() {
            Ok(len) => {
                self.remaining = len;
                Ok(())
            }
            Err(_) => {
                let err = TagParseError::InvalidLength {
                    name: self.tag_name(),
                    text,
                    offset: self.consumed,
                };
                Err(self.fail(err))
            }
        }
    }

    /// Length is known: either emit an empty field or start copying the body
    fn open_body(&mut self) -> Option<Field> {
        if self.remaining == 0 {
            Some(self.emit())
        } else {
            self.state = State::Body;
            None
        }
    }
}

impl<R: BufRead> Iterator for Lexer<R> {
    type Item = Result<Field, AdifError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }

        loop {
            let byte = match self.bytes.next() {
                Some(Ok(b)) => b,
                Some(Err(e)) => {
                    self.done = true;
                    return Some(Err(AdifError::Io(e)));
                }
                None => {
                    self.done = true;
                    if self.state == State::Scanning {
                        return None;
                    }
                    let err = TagParseError::Unterminated {
                        name: self.tag_name(),
                        offset: self.consumed,
                    };
                    return Some(Err(self.fail(err)));
                }
            };
            self.consumed += 1;

            match self.state {
                State::Scanning => {
                    if byte == b'<' {
                        self.start_tag();
                    }
                }
                State::TagName => match byte {
                    b':' => self.state = State::TagLen,
                    b'>' => return Some(Ok(self.emit())),
                    _ => self.name.push(byte),
                },
                State::TagLen => match byte {
                    b':' => {
                        if let Err(e) = self.parse_len() {
                            return Some(Err(e));
                        }
                        self.state = State::TagType;
                    }
                    b'>' => {
                        if let Err(e) = self.parse_len() {
                            return Some(Err(e));
                        }
                        if let Some(field) = self.open_body() {
                            return Some(Ok(field));
                        }
                    }
                    _ => self.len_text.push(byte),
                },
                State::TagType => match byte {
                    b':' => {
                        let err = TagParseError::ColonInType {
                            name: self.tag_name(),
                            offset: self.consumed,
                        };
                        return Some(Err(self.fail(err)));
                    }
                    b'>' => {
                        if let Some(field) = self.open_body() {
                            return Some(Ok(field));
                        }
                    }
                    _ => self.data_type.push(byte),
                },
                State::Body => {
                    self.body.push(byte);
                    self.remaining -= 1;
                    if self.remaining == 0 {
                        return Some(Ok(self.emit()));
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::io::Cursor;

    fn lex(input: &str) -> Vec<Result<Field, AdifError>> {
        Lexer::new(Cursor::new(input.as_bytes())).collect()
    }

    fn lex_ok(input: &str) -> Vec<Field> {
        lex(input)
            .into_iter()
            .map(|f| f.expect("field"))
            .collect()
    }

    #[test]
    fn test_simple_record() {
        let fields = lex_ok("<call:5>AB9RN<freq:6>14.150<mode:3>SSB<eor>");
        assert_eq!(
            fields,
            vec![
                Field::new("call", "", "AB9RN"),
                Field::new("freq", "", "14.150"),
                Field::new("mode", "", "SSB"),
                Field::new("eor", "", ""),
            ]
        );
    }

    #[test]
    fn test_names_and_types_lowercased_body_verbatim() {
        let fields = lex_ok("<CALL:5:S>ab9Rn<EOR>");
        assert_eq!(fields[0], Field::new("call", "s", "ab9Rn"));
        assert_eq!(fields[1], Field::new("eor", "", ""));
    }

    #[test]
    fn test_free_text_between_tags_is_skipped() {
        let fields = lex_ok("junk before\n<rst_sent:3>59 \r\n  more junk <comment:2>08");
        assert_eq!(
            fields,
            vec![
                Field::new("rst_sent", "", "59 "),
                Field::new("comment", "", "08"),
            ]
        );
    }

    #[test]
    fn test_zero_length_emits_immediately() {
        // The byte after '>' must not be swallowed into the empty field
        let fields = lex_ok("<qsl_sent:0><call:4>K1AB");
        assert_eq!(
            fields,
            vec![
                Field::new("qsl_sent", "", ""),
                Field::new("call", "", "K1AB"),
            ]
        );

        let typed = lex_ok("<flag:0:b><eor>");
        assert_eq!(typed[0], Field::new("flag", "b", ""));
    }

    #[test]
    fn test_body_may_contain_tag_characters() {
        let fields = lex_ok("<comment:7>a<b>:c<d<eor>");
        assert_eq!(fields[0].body, "a<b>:c<");
        // The trailing 'd' is free text, then <eor>
        assert_eq!(fields[1].name, "eor");
    }

    #[test]
    fn test_colon_in_type_is_error() {
        let results = lex("<call:5:s:x>AB9RN");
        assert!(matches!(
            results[0],
            Err(AdifError::Tag(TagParseError::ColonInType { .. }))
        ));
    }

    #[test]
    fn test_resync_after_error() {
        let results = lex("<call:5:s:x>AB9RN<mode:2>CW");
        assert!(results[0].is_err());
        let last = results.last().unwrap().as_ref().unwrap();
        assert_eq!(*last, Field::new("mode", "", "CW"));
    }

    #[test]
    fn test_invalid_length_is_error() {
        let results = lex("<call:five>AB9RN");
        match &results[0] {
            Err(AdifError::Tag(TagParseError::InvalidLength { name, text, .. })) => {
                assert_eq!(name, "call");
                assert_eq!(text, "five");
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_unterminated_tag_at_end() {
        let results = lex("<call:5>AB9RN<mode:3");
        assert_eq!(results.len(), 2);
        assert!(matches!(
            results[1],
            Err(AdifError::Tag(TagParseError::Unterminated { .. }))
        ));
    }

    #[test]
    fn test_short_body_at_end_is_unterminated() {
        let results = lex("<call:10>AB9RN");
        assert_eq!(results.len(), 1);
        match &results[0] {
            Err(AdifError::Tag(TagParseError::Unterminated { name, .. })) => {
                assert_eq!(name, "call")
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_consumed_tracks_bytes() {
        let input = "<a:1>x<eoh>rest";
        let mut lexer = Lexer::new(Cursor::new(input.as_bytes()));
        assert_eq!(lexer.next().unwrap().unwrap().name, "a");
        assert_eq!(lexer.consumed(), 6);
        assert_eq!(lexer.next().unwrap().unwrap().name, "eoh");
        assert_eq!(lexer.consumed(), 11);
    }

    #[test]
    fn test_empty_input() {
        assert!(lex("").is_empty());
        assert!(lex("no tags at all").is_empty());
    }
}
