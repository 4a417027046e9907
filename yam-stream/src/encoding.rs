//! Encoding detection and transcoding of parser input.
//!
//! Every [`Input`] is turned into a [`CharStream`] of Unicode scalar values. Decoding never
//! substitutes replacement characters: the first malformed sequence ends the stream with a
//! [`StreamError::Decode`] carrying the number of bytes processed before it.

use std::borrow::Cow;
use std::fmt::{Debug, Formatter};
use std::fs::File;
use std::io::{self, Read};
use std::path::Path;

use encoding_rs::{Decoder, DecoderResult, Encoding, UTF_16BE, UTF_16LE, UTF_8};

use crate::error::EncodingError;

/// Number of bytes pulled from a reader at a time.
const CHUNK_SIZE: usize = 8 * 1024;

/// Encoding reported to [`Handler::start_stream`](crate::Handler::start_stream).
///
/// The ordinals are stable.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum EncodingKind {
    /// Detected or unspecified.
    #[default]
    Any = 0,
    Utf8 = 1,
    Utf16Le = 2,
    Utf16Be = 3,
}

impl EncodingKind {
    #[must_use]
    pub fn ordinal(self) -> u8 {
        self as u8
    }

    fn of(encoding: &'static Encoding) -> Option<EncodingKind> {
        if encoding == UTF_8 {
            Some(EncodingKind::Utf8)
        } else if encoding == UTF_16LE {
            Some(EncodingKind::Utf16Le)
        } else if encoding == UTF_16BE {
            Some(EncodingKind::Utf16Be)
        } else {
            None
        }
    }
}

impl From<u8> for EncodingKind {
    fn from(value: u8) -> Self {
        match value {
            1 => EncodingKind::Utf8,
            2 => EncodingKind::Utf16Le,
            3 => EncodingKind::Utf16Be,
            _ => EncodingKind::Any,
        }
    }
}

/// Source of a parse.
pub enum Input<'a> {
    /// Text that is already Unicode.
    Str(&'a str),
    /// In-memory bytes with an optional WHATWG encoding label.
    Bytes {
        bytes: &'a [u8],
        encoding: Option<&'a str>,
    },
    /// A byte stream, decoded lazily in chunks.
    Reader {
        reader: Box<dyn Read + 'a>,
        encoding: Option<&'a str>,
        path: Option<String>,
    },
}

impl Debug for Input<'_> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Input::Str(s) => f.debug_tuple("Str").field(s).finish(),
            Input::Bytes { bytes, encoding } => f
                .debug_struct("Bytes")
                .field("len", &bytes.len())
                .field("encoding", encoding)
                .finish(),
            Input::Reader { encoding, path, .. } => f
                .debug_struct("Reader")
                .field("encoding", encoding)
                .field("path", path)
                .finish_non_exhaustive(),
        }
    }
}

impl<'a> Input<'a> {
    pub fn str(input: &'a str) -> Input<'a> {
        Input::Str(input)
    }

    pub fn bytes(bytes: &'a [u8]) -> Input<'a> {
        Input::Bytes {
            bytes,
            encoding: None,
        }
    }

    pub fn reader<R: Read + 'a>(reader: R) -> Input<'a> {
        Input::Reader {
            reader: Box::new(reader),
            encoding: None,
            path: None,
        }
    }

    /// Declares the encoding of byte input. Has no effect on [`Input::Str`].
    #[must_use]
    pub fn with_encoding(self, label: &'a str) -> Input<'a> {
        match self {
            Input::Str(s) => Input::Str(s),
            Input::Bytes { bytes, .. } => Input::Bytes {
                bytes,
                encoding: Some(label),
            },
            Input::Reader { reader, path, .. } => Input::Reader {
                reader,
                encoding: Some(label),
                path,
            },
        }
    }

    /// Records where a reader comes from. Only readers carry a path.
    #[must_use]
    pub fn with_path(self, path: impl Into<String>) -> Input<'a> {
        match self {
            Input::Reader {
                reader, encoding, ..
            } => Input::Reader {
                reader,
                encoding,
                path: Some(path.into()),
            },
            other => other,
        }
    }

    #[must_use]
    pub fn path(&self) -> Option<&str> {
        match self {
            Input::Reader { path, .. } => path.as_deref(),
            _ => None,
        }
    }

    pub(crate) fn decode(self) -> Result<DecodedInput<'a>, EncodingError> {
        match self {
            Input::Str(s) => Ok(DecodedInput {
                stream: CharStream::text(Cow::Borrowed(s.strip_prefix('\u{FEFF}').unwrap_or(s))),
                encoding: EncodingKind::Any,
                path: None,
            }),
            Input::Bytes { bytes, encoding } => decode_bytes(bytes, encoding),
            Input::Reader {
                reader,
                encoding,
                path,
            } => {
                let (decoder, kind) = reader_decoder(encoding);
                Ok(DecodedInput {
                    stream: CharStream::Decoded(StreamDecoder::new(reader, decoder)),
                    encoding: kind,
                    path,
                })
            }
        }
    }
}

impl Input<'static> {
    /// Opens a file for parsing. Its path is used in failures unless the caller gives another.
    pub fn open<P: AsRef<Path>>(path: P) -> io::Result<Input<'static>> {
        let path = path.as_ref();
        let file = File::open(path)?;
        Ok(Input::Reader {
            reader: Box::new(file),
            encoding: None,
            path: Some(path.display().to_string()),
        })
    }
}

impl<'a> From<&'a str> for Input<'a> {
    fn from(value: &'a str) -> Self {
        Input::Str(value)
    }
}

impl<'a> From<&'a [u8]> for Input<'a> {
    fn from(value: &'a [u8]) -> Self {
        Input::bytes(value)
    }
}

pub(crate) struct DecodedInput<'a> {
    pub(crate) stream: CharStream<'a>,
    pub(crate) encoding: EncodingKind,
    pub(crate) path: Option<String>,
}

fn lookup(label: &str) -> Result<&'static Encoding, EncodingError> {
    Encoding::for_label(label.trim().as_bytes())
        .ok_or_else(|| EncodingError::UnknownLabel(label.to_string()))
}

fn bom_len(encoding: &'static Encoding, bytes: &[u8]) -> usize {
    match Encoding::for_bom(bytes) {
        Some((found, len)) if found == encoding => len,
        _ => 0,
    }
}

fn decode_bytes<'a>(
    bytes: &'a [u8],
    label: Option<&str>,
) -> Result<DecodedInput<'a>, EncodingError> {
    let (encoding, kind, skip) = match label {
        None => match Encoding::for_bom(bytes) {
            Some((encoding, len)) => (encoding, EncodingKind::Any, len),
            None => (UTF_8, EncodingKind::Any, 0),
        },
        Some(label) => {
            let encoding = lookup(label)?;
            match EncodingKind::of(encoding) {
                Some(kind) => (encoding, kind, bom_len(encoding, bytes)),
                None => {
                    tracing::debug!(encoding = encoding.name(), "transcoding input to UTF-8");
                    (encoding, EncodingKind::Utf8, 0)
                }
            }
        }
    };

    let stream = if encoding == UTF_8 {
        utf8_text(&bytes[skip..], skip)
    } else {
        let (text, failure) = decode_all(encoding, &bytes[skip..], skip);
        CharStream::Text {
            text: Cow::Owned(text),
            pos: 0,
            failure,
        }
    };

    Ok(DecodedInput {
        stream,
        encoding: kind,
        path: None,
    })
}

fn utf8_text(bytes: &[u8], base_offset: usize) -> CharStream<'_> {
    match simdutf8::compat::from_utf8(bytes) {
        Ok(text) => CharStream::text(Cow::Borrowed(text)),
        Err(err) => {
            let valid = err.valid_up_to();
            let prefix = simdutf8::basic::from_utf8(&bytes[..valid]).unwrap_or_default();
            CharStream::Text {
                text: Cow::Borrowed(prefix),
                pos: 0,
                failure: Some(base_offset + valid),
            }
        }
    }
}

fn decode_all(
    encoding: &'static Encoding,
    bytes: &[u8],
    base_offset: usize,
) -> (String, Option<usize>) {
    let mut decoder = encoding.new_decoder_without_bom_handling();
    let mut text = String::new();
    let mut consumed = 0;
    loop {
        let remaining = &bytes[consumed..];
        text.reserve(
            decoder
                .max_utf8_buffer_length_without_replacement(remaining.len())
                .unwrap_or(remaining.len()),
        );
        let (result, read) =
            decoder.decode_to_string_without_replacement(remaining, &mut text, true);
        consumed += read;
        match result {
            DecoderResult::InputEmpty => return (text, None),
            DecoderResult::OutputFull => continue,
            DecoderResult::Malformed(bad, extra) => {
                let offset = (base_offset + consumed).saturating_sub(bad as usize + extra as usize);
                return (text, Some(offset));
            }
        }
    }
}

fn reader_decoder(label: Option<&str>) -> (Decoder, EncodingKind) {
    let Some(label) = label else {
        return (UTF_8.new_decoder(), EncodingKind::Any);
    };
    let unicode = Encoding::for_label(label.trim().as_bytes())
        .and_then(|encoding| EncodingKind::of(encoding).map(|kind| (encoding, kind)));
    match unicode {
        Some((encoding, kind)) => (encoding.new_decoder_with_bom_removal(), kind),
        None => {
            tracing::warn!(
                encoding = label,
                "reader encoding is not UTF-8 or UTF-16, decoding as UTF-8"
            );
            (UTF_8.new_decoder_with_bom_removal(), EncodingKind::Utf8)
        }
    }
}

/// Failure while producing characters.
#[derive(Debug)]
pub(crate) enum StreamError {
    /// Malformed input after `offset` valid bytes.
    Decode { offset: usize },
    Io(io::Error),
}

pub(crate) enum CharStream<'a> {
    Text {
        text: Cow<'a, str>,
        pos: usize,
        /// Byte offset of a malformed sequence right after `text`.
        failure: Option<usize>,
    },
    Decoded(StreamDecoder<'a>),
}

impl<'a> CharStream<'a> {
    fn text(text: Cow<'a, str>) -> CharStream<'a> {
        CharStream::Text {
            text,
            pos: 0,
            failure: None,
        }
    }

    pub(crate) fn next_char(&mut self) -> Result<Option<char>, StreamError> {
        match self {
            CharStream::Text { text, pos, failure } => match text[*pos..].chars().next() {
                Some(ch) => {
                    *pos += ch.len_utf8();
                    Ok(Some(ch))
                }
                None => match failure.take() {
                    Some(offset) => Err(StreamError::Decode { offset }),
                    None => Ok(None),
                },
            },
            CharStream::Decoded(decoder) => decoder.next_char(),
        }
    }
}

pub(crate) struct StreamDecoder<'a> {
    reader: Box<dyn Read + 'a>,
    decoder: Decoder,
    buf: Vec<u8>,
    chars: String,
    char_pos: usize,
    /// Bytes handed to the decoder so far.
    consumed: usize,
    finished: bool,
    failure: Option<StreamError>,
}

impl<'a> StreamDecoder<'a> {
    fn new(reader: Box<dyn Read + 'a>, decoder: Decoder) -> StreamDecoder<'a> {
        StreamDecoder {
            reader,
            decoder,
            buf: vec![0; CHUNK_SIZE],
            chars: String::new(),
            char_pos: 0,
            consumed: 0,
            finished: false,
            failure: None,
        }
    }

    fn next_char(&mut self) -> Result<Option<char>, StreamError> {
        loop {
            if let Some(ch) = self.chars[self.char_pos..].chars().next() {
                self.char_pos += ch.len_utf8();
                return Ok(Some(ch));
            }
            if let Some(failure) = self.failure.take() {
                self.finished = true;
                return Err(failure);
            }
            if self.finished {
                return Ok(None);
            }
            self.fill();
        }
    }

    fn fill(&mut self) {
        self.chars.clear();
        self.char_pos = 0;

        let read = loop {
            match self.reader.read(&mut self.buf) {
                Ok(n) => break n,
                Err(err) if err.kind() == io::ErrorKind::Interrupted => continue,
                Err(err) => {
                    self.failure = Some(StreamError::Io(err));
                    return;
                }
            }
        };
        let last = read == 0;

        let mut input = &self.buf[..read];
        loop {
            self.chars.reserve(
                self.decoder
                    .max_utf8_buffer_length_without_replacement(input.len())
                    .unwrap_or(input.len()),
            );
            let (result, n) =
                self.decoder
                    .decode_to_string_without_replacement(input, &mut self.chars, last);
            self.consumed += n;
            input = &input[n..];
            match result {
                DecoderResult::InputEmpty => break,
                DecoderResult::OutputFull => continue,
                DecoderResult::Malformed(bad, extra) => {
                    let offset = self.consumed.saturating_sub(bad as usize + extra as usize);
                    self.failure = Some(StreamError::Decode { offset });
                    break;
                }
            }
        }

        if last {
            self.finished = true;
        }
    }
}
