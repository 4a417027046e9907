//! The seam between the dispatcher and the grammar engine producing events.

use std::error::Error;

use yam_core::{Event, Parser, Source, Span, YamlError};

use crate::reader::{ReadFailure, TrackedReader};

/// One structural event of the engine together with its source span.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Token {
    pub event: Event,
    pub span: Span,
}

/// Failures an engine reports.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// Malformed YAML at a known position.
    #[error(transparent)]
    Syntax(#[from] YamlError),
    /// The input could not be read or decoded.
    #[error(transparent)]
    Read(#[from] ReadFailure),
    /// The engine ran out of tokens before the stream end.
    #[error("token stream ended before the stream end event")]
    Truncated,
    /// Anything else. Passed to the caller untouched.
    #[error(transparent)]
    Other(Box<dyn Error + Send + Sync>),
}

/// A pull-based producer of [`Token`]s.
pub trait GrammarEngine {
    /// Returns the next token, `None` once the stream end was returned.
    ///
    /// # Errors
    /// Any failure ends the token stream.
    fn next_token(&mut self) -> Result<Option<Token>, EngineError>;

    /// The token [`GrammarEngine::next_token`] would return, without consuming it. `None` at the
    /// end of the stream or when the next pull fails.
    fn peek_token(&mut self) -> Option<&Token>;
}

/// [`GrammarEngine`] over the `yam-core` parser reading from a [`TrackedReader`].
pub struct YamEngine<'a> {
    parser: Parser<TrackedReader<'a>>,
    peeked: Option<Result<Option<Token>, EngineError>>,
}

impl<'a> YamEngine<'a> {
    pub fn new(reader: TrackedReader<'a>, implicit_documents: bool) -> YamEngine<'a> {
        YamEngine {
            parser: Parser::new(reader).implicit_documents(implicit_documents),
            peeked: None,
        }
    }

    fn pull(&mut self) -> Result<Option<Token>, EngineError> {
        let next = self.parser.next_event();
        // Once the parser ran into the cut-off end, the reader failure explains whatever it made
        // of the truncated input.
        let reader = self.parser.source_mut();
        if reader.next_is_z() {
            if let Some(failure) = reader.take_failure() {
                return Err(EngineError::Read(failure));
            }
        }
        Ok(next?.map(|(event, span)| Token { event, span }))
    }
}

impl GrammarEngine for YamEngine<'_> {
    fn next_token(&mut self) -> Result<Option<Token>, EngineError> {
        match self.peeked.take() {
            Some(result) => result,
            None => self.pull(),
        }
    }

    fn peek_token(&mut self) -> Option<&Token> {
        if self.peeked.is_none() {
            self.peeked = Some(self.pull());
        }
        match &self.peeked {
            Some(Ok(Some(token))) => Some(token),
            _ => None,
        }
    }
}
