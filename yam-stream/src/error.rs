//! Translation of every engine, reader and decoder failure into one [`ParseFailure`] shape.

use std::error::Error;

use yam_common::YamlError;

use crate::engine::EngineError;
use crate::reader::ReadFailure;

/// A declared encoding label the registry does not know.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EncodingError {
    #[error("unknown encoding label `{0}`")]
    UnknownLabel(String),
}

/// Positioned failure of a parse.
///
/// * structural errors carry 1-based `line`/`column` and the character `offset`,
/// * reader errors carry `0`/`0`, the raw position and the failure's symbolic name as `problem`,
/// * decode errors carry `-1`/`-1` and the number of bytes decoded before the break.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error(
    "({}): {} {} at line {line} column {column}",
    .path.as_deref().unwrap_or("<unknown>"),
    text(.problem),
    text(.context)
)]
pub struct ParseFailure {
    pub path: Option<String>,
    pub line: i64,
    pub column: i64,
    pub offset: usize,
    pub problem: Option<String>,
    pub context: Option<String>,
}

fn text(part: &Option<String>) -> &str {
    part.as_deref().unwrap_or("")
}

/// Everything a parse can fail with.
#[derive(Debug, thiserror::Error)]
pub enum ParseError {
    /// Structural, reader or decode failure.
    #[error(transparent)]
    Syntax(#[from] ParseFailure),
    /// Reported before any event is dispatched.
    #[error(transparent)]
    Encoding(#[from] EncodingError),
    /// An engine failure outside the translated taxonomy, passed through untouched.
    #[error(transparent)]
    Engine(Box<dyn Error + Send + Sync>),
}

impl ParseError {
    /// The positioned failure, if this is one.
    #[must_use]
    pub fn failure(&self) -> Option<&ParseFailure> {
        match self {
            ParseError::Syntax(failure) => Some(failure),
            _ => None,
        }
    }
}

pub(crate) fn translate(error: EngineError, path: Option<&str>) -> ParseError {
    let path = path.map(str::to_string);
    let translated = match error {
        EngineError::Syntax(YamlError::ScannerErr {
            mark,
            problem,
            context,
        }) => ParseError::Syntax(ParseFailure {
            path,
            line: mark.line as i64 + 1,
            column: mark.col as i64 + 1,
            offset: mark.pos,
            problem: Some(problem),
            context,
        }),
        EngineError::Read(ReadFailure::Decode { offset }) => ParseError::Syntax(ParseFailure {
            path,
            line: -1,
            column: -1,
            offset,
            problem: None,
            context: None,
        }),
        EngineError::Read(failure) => ParseError::Syntax(ParseFailure {
            path,
            line: 0,
            column: 0,
            offset: failure.position(),
            problem: Some(failure.name().to_string()),
            context: Some(failure.to_string()),
        }),
        EngineError::Syntax(unmarked) => ParseError::Engine(Box::new(unmarked)),
        EngineError::Other(other) => ParseError::Engine(other),
        truncated @ EngineError::Truncated => ParseError::Engine(Box::new(truncated)),
    };
    tracing::debug!(error = %translated, "parse failed");
    translated
}
