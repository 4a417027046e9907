extern crate core;

use std::fmt::{Display, Formatter};

use thiserror::Error;

#[derive(Copy, Clone, PartialEq, Eq, Debug)]
#[non_exhaustive]
pub enum ScalarType {
    /// Unquoted string type like:
    /// ```yaml
    ///   multiline
    ///   string
    /// ```
    Plain,
    /// Folded string type like:
    /// ```yaml
    ///   >
    ///     folded
    ///     string
    /// ```
    Folded,
    /// Literal string type like:
    /// ```yaml
    ///   |
    ///     literal
    ///     string
    /// ```
    Literal,
    /// Single quote string which permits any symbol inside
    /// E.g. :
    /// ```yaml
    /// ' This is a quoted string
    ///    with ''quoted'' string within.'
    /// ```
    SingleQuote,
    /// Double quote string with escape sequences
    /// E.g. :
    /// ```yaml
    /// "This is a quoted string
    ///    with \"double quoted\" string within."
    /// ```
    DoubleQuote,
}

impl Display for ScalarType {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            ScalarType::Plain => write!(f, ":"),
            ScalarType::Folded => write!(f, ">"),
            ScalarType::Literal => write!(f, "|"),
            ScalarType::SingleQuote => write!(f, "'"),
            ScalarType::DoubleQuote => write!(f, "\""),
        }
    }
}

/// Surface syntax of a sequence or mapping.
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
#[non_exhaustive]
pub enum CollectionStyle {
    /// Indentation based.
    Block,
    /// Bracketed `[ ]` or braced `{ }`.
    Flow,
}

#[derive(Clone, PartialEq, Eq, Debug)]
pub enum TokenType {
    StreamStart,
    StreamEnd,
    DocumentStart,
    DocumentEnd,
    BlockSequenceStart,
    BlockMappingStart,
    BlockEnd,
    BlockEntry,
    FlowEntry,
    Key,
    Value,
    FlowSequenceStart,
    FlowSequenceEnd,
    FlowMappingStart,
    FlowMappingEnd,
    Alias(String),
    Anchor(String),
    VersionDirective {
        major: u32,
        minor: u32,
    },
    TagDirective {
        handle: String,
        prefix: String,
    },
    Tag(Tag),
    Scalar {
        scalar_type: ScalarType,
        value: String,
    },
}

#[derive(PartialEq, Clone, Copy, Debug)]
pub enum ChompIndicator {
    /// `-` final line break and any trailing empty lines are excluded from the scalar’s content
    Strip,
    ///  ` ` final line break character is preserved in the scalar’s content
    Clip,
    /// `+` final line break and any trailing empty lines are considered to be part of the scalar’s content
    Keep,
}

#[derive(Default, Debug, Clone, Copy, Eq, PartialEq)]
pub struct Marker {
    /// index in characters of the input.
    pub pos: usize,
    /// Column of mark. Zero indexed.
    pub col: usize,
    /// Line of mark. Zero indexed.
    pub line: usize,
}

impl Marker {
    pub fn new(pos: usize, line: usize, col: usize) -> Self {
        Marker { pos, col, line }
    }

    /// Moves the marker past `ch`. `next` is the character following it, `'\0'` at the end.
    ///
    /// A `\r\n` pair counts as a single line break, attributed to the `\n`.
    #[inline]
    pub fn advance(&mut self, ch: char, next: char) {
        self.pos += 1;
        match ch {
            '\n' => {
                self.line += 1;
                self.col = 0;
            }
            '\r' if next != '\n' => {
                self.line += 1;
                self.col = 0;
            }
            _ => self.col += 1,
        }
    }
}

#[derive(Clone, Copy, PartialEq, Debug, Eq, Default)]
pub struct Span {
    pub start: Marker,
    pub end: Marker,
}

impl Span {
    pub fn new(start: Marker, end: Marker) -> Self {
        Span { start, end }
    }

    pub fn empty(mark: Marker) -> Self {
        Span {
            start: mark,
            end: mark,
        }
    }
}

/// A specialized `Result` type where the error is hard-wired to [`YamlError`].
pub type YamlResult<T> = Result<T, YamlError>;
pub type ScanResult = Result<(), YamlError>;

#[derive(Debug, Clone, Eq, PartialEq, Error)]
pub enum YamlError {
    /// Token stream was asked for more after it ended.
    #[error("unexpected end of token stream")]
    UnexpectedEof,
    /// Structural error at a known position.
    #[error("{}{problem} at {}", context_prefix(.context), position(.mark))]
    ScannerErr {
        mark: Marker,
        problem: String,
        context: Option<String>,
    },
}

fn context_prefix(context: &Option<String>) -> String {
    match context {
        Some(context) => format!("{context}, "),
        None => String::new(),
    }
}

fn position(mark: &Marker) -> String {
    format!("line {} column {}", mark.line + 1, mark.col + 1)
}

impl YamlError {
    pub fn new_str(marker: Marker, problem: &str) -> Self {
        YamlError::ScannerErr {
            mark: marker,
            problem: problem.to_string(),
            context: None,
        }
    }

    pub fn new_ctx(marker: Marker, context: &str, problem: &str) -> Self {
        YamlError::ScannerErr {
            mark: marker,
            problem: problem.to_string(),
            context: Some(context.to_string()),
        }
    }

    pub fn mark(&self) -> Option<Marker> {
        match self {
            YamlError::ScannerErr { mark, .. } => Some(*mark),
            YamlError::UnexpectedEof => None,
        }
    }
}

/// A YAML tag.
#[derive(Clone, PartialEq, Debug, Eq, Ord, PartialOrd, Hash)]
pub struct Tag {
    /// Handle of the tag (`!` included). Empty for verbatim tags.
    pub handle: String,
    /// The suffix of the tag.
    pub suffix: String,
}

impl Display for Tag {
    fn fmt(&self, f: &mut Formatter<'_>) -> core::fmt::Result {
        if self.handle.is_empty() {
            write!(f, "!<{}>", self.suffix)
        } else {
            write!(f, "{}{}", self.handle, self.suffix)
        }
    }
}
