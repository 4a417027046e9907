use std::collections::VecDeque;
use std::io;

use yam_core::{Marker, Source, MIN_LOOKAHEAD};

use crate::encoding::{CharStream, StreamError};

/// Characters kept ahead of the cursor.
const LOOKAHEAD: usize = 16;

const _: () = assert!(LOOKAHEAD >= MIN_LOOKAHEAD);

/// Why a [`TrackedReader`] stopped before the end of its input.
#[derive(Debug, thiserror::Error)]
pub enum ReadFailure {
    /// The bytes are not valid in the input encoding. `offset` bytes were decoded before it.
    #[error("invalid byte sequence in input after {offset} bytes")]
    Decode { offset: usize },
    /// The underlying reader failed before character `position`.
    #[error("error reading input at character {position}: {source}")]
    Io {
        position: usize,
        #[source]
        source: io::Error,
    },
    /// A character outside the printable set at character `position`.
    #[error("{}", unacceptable(.ch, .position))]
    NonPrintable { position: usize, ch: char },
}

fn unacceptable(ch: &char, position: &usize) -> String {
    format!(
        "unacceptable code point '{}' (0x{:X}) special characters are not allowed at character {position}",
        ch.escape_default(),
        u32::from(*ch)
    )
}

impl ReadFailure {
    /// Offset of the failure: bytes for [`ReadFailure::Decode`], characters otherwise.
    #[must_use]
    pub fn position(&self) -> usize {
        match self {
            ReadFailure::Decode { offset } => *offset,
            ReadFailure::Io { position, .. } | ReadFailure::NonPrintable { position, .. } => {
                *position
            }
        }
    }

    /// Symbolic name of the failure kind.
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            ReadFailure::Decode { .. } => "malformed_input",
            ReadFailure::Io { .. } => "io_error",
            ReadFailure::NonPrintable { .. } => "unacceptable_code_point",
        }
    }
}

/// Characters YAML allows in a stream.
#[cfg_attr(not(feature = "no-inline"), inline)]
fn is_printable(ch: char) -> bool {
    matches!(ch,
        '\t' | '\n' | '\r'
        | ' '..='~'
        | '\u{85}'
        | '\u{A0}'..='\u{D7FF}'
        | '\u{E000}'..='\u{FFFD}'
        | '\u{10000}'..='\u{10FFFF}')
}

/// Decoded characters with line, column and index tracking.
///
/// A decode, I/O or printable-set failure is recorded and ends the input, so the engine sees a
/// clean end of stream. Whoever drives the engine checks [`TrackedReader::take_failure`].
pub struct TrackedReader<'a> {
    stream: CharStream<'a>,
    buffer: VecDeque<char>,
    mark: Marker,
    /// Index of the next character to enter the buffer.
    read_index: usize,
    exhausted: bool,
    failure: Option<ReadFailure>,
}

impl<'a> TrackedReader<'a> {
    pub(crate) fn new(stream: CharStream<'a>) -> TrackedReader<'a> {
        let mut reader = TrackedReader {
            stream,
            buffer: VecDeque::with_capacity(LOOKAHEAD),
            mark: Marker::default(),
            read_index: 0,
            exhausted: false,
            failure: None,
        };
        reader.fill();
        reader
    }

    fn fill(&mut self) {
        while self.buffer.len() < LOOKAHEAD && !self.exhausted {
            match self.stream.next_char() {
                Ok(Some(ch)) if is_printable(ch) => {
                    self.buffer.push_back(ch);
                    self.read_index += 1;
                }
                Ok(Some(ch)) => self.fail(ReadFailure::NonPrintable {
                    position: self.read_index,
                    ch,
                }),
                Ok(None) => self.exhausted = true,
                Err(StreamError::Decode { offset }) => self.fail(ReadFailure::Decode { offset }),
                Err(StreamError::Io(source)) => self.fail(ReadFailure::Io {
                    position: self.read_index,
                    source,
                }),
            }
        }
    }

    fn fail(&mut self, failure: ReadFailure) {
        tracing::debug!(%failure, "input stopped");
        self.failure = Some(failure);
        self.exhausted = true;
    }

    #[must_use]
    pub fn failure(&self) -> Option<&ReadFailure> {
        self.failure.as_ref()
    }

    pub fn take_failure(&mut self) -> Option<ReadFailure> {
        self.failure.take()
    }
}

impl Source for TrackedReader<'_> {
    #[cfg_attr(not(feature = "no-inline"), inline)]
    fn peek_nth(&self, n: usize) -> char {
        self.buffer.get(n).copied().unwrap_or('\0')
    }

    fn skip(&mut self) {
        if let Some(ch) = self.buffer.pop_front() {
            self.fill();
            let next = self.peek_nth(0);
            self.mark.advance(ch, next);
        }
    }

    #[cfg_attr(not(feature = "no-inline"), inline)]
    fn mark(&self) -> Marker {
        self.mark
    }

    #[cfg_attr(not(feature = "no-inline"), inline)]
    fn next_is_z(&self) -> bool {
        self.buffer.is_empty()
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::encoding::Input;

    fn reader(input: Input<'_>) -> TrackedReader<'_> {
        let decoded = input.decode().unwrap();
        TrackedReader::new(decoded.stream)
    }

    #[test]
    fn test_tracks_lines_and_columns() {
        let mut r = reader(Input::str("ab\r\ncd\re"));
        r.skip_n(2);
        assert_eq!(r.peek(), '\r');
        r.skip_n(2);
        assert_eq!(r.mark(), Marker::new(4, 1, 0));
        r.skip_n(3);
        assert_eq!(r.mark(), Marker::new(7, 2, 0));
        assert_eq!(r.peek(), 'e');
        r.skip();
        assert!(r.next_is_z());
        assert!(r.take_failure().is_none());
    }

    #[test]
    fn test_lookahead() {
        let text = "0123456789abcdefghij";
        let r = reader(Input::str(text));
        assert_eq!(r.peek_nth(15), 'f');
        assert_eq!(r.peek_nth(16), '\0');
    }

    #[test]
    fn test_non_printable_ends_input() {
        let mut r = reader(Input::str("ab\u{1}cd"));
        assert_eq!(r.peek_nth(1), 'b');
        assert_eq!(r.peek_nth(2), '\0');
        r.skip_n(2);
        assert!(r.next_is_z());
        let failure = r.take_failure().unwrap();
        assert_eq!(failure.position(), 2);
        assert_eq!(failure.name(), "unacceptable_code_point");
        assert!(failure.to_string().contains("0x1"));
    }

    #[test]
    fn test_decode_failure_recorded() {
        let mut r = reader(Input::bytes(b"ok\xFE"));
        assert_eq!(r.peek(), 'o');
        assert!(matches!(r.failure(), Some(ReadFailure::Decode { offset: 2 })));
        r.skip_n(2);
        assert!(r.next_is_z());
    }

    #[test]
    fn test_printable_set() {
        assert!(is_printable('\t'));
        assert!(is_printable('é'));
        assert!(is_printable('\u{1F600}'));
        assert!(!is_printable('\u{7F}'));
        assert!(!is_printable('\u{FFFE}'));
        assert!(!is_printable('\0'));
    }
}
