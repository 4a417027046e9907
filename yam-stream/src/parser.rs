use crate::encoding::{EncodingKind, Input};
use crate::engine::{EngineError, GrammarEngine, YamEngine};
use crate::error::{translate, ParseError};
use crate::event::{Event, Mark};
use crate::handler::Handler;
use crate::reader::TrackedReader;

/// Knobs of a [`Parser`].
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct ParseOptions {
    /// Report `DocumentStart`/`DocumentEnd` for bare documents too, with `implicit` set.
    pub implicit_documents: bool,
}

/// Entry point for parsing an [`Input`] into [`Handler`] calls.
#[derive(Copy, Clone, Debug, Default)]
pub struct Parser {
    options: ParseOptions,
}

impl Parser {
    #[must_use]
    pub fn new() -> Parser {
        Parser::default()
    }

    #[must_use]
    pub fn with_options(options: ParseOptions) -> Parser {
        Parser { options }
    }

    #[must_use]
    pub fn options(&self) -> ParseOptions {
        self.options
    }

    /// Opens a [`Session`] over `input`.
    ///
    /// `path` names the input in failures. Without one, the path an [`Input::Reader`] was opened
    /// with is used.
    ///
    /// # Errors
    /// [`ParseError::Encoding`] when the declared encoding label is unknown.
    pub fn session<'a>(
        &self,
        input: impl Into<Input<'a>>,
        path: Option<&str>,
    ) -> Result<Session<YamEngine<'a>>, ParseError> {
        let decoded = input.into().decode()?;
        let path = path.map(str::to_string).or(decoded.path);
        tracing::debug!(encoding = ?decoded.encoding, path = ?path, "parse session opened");
        let engine = YamEngine::new(
            TrackedReader::new(decoded.stream),
            self.options.implicit_documents,
        );
        Ok(Session::with_engine(engine, decoded.encoding, path))
    }

    /// Parses the whole of `input`, calling `handler` for every event.
    ///
    /// # Errors
    /// The first failure ends the parse. Events before it were already dispatched.
    pub fn parse<'a, H: Handler + ?Sized>(
        &self,
        handler: &mut H,
        input: impl Into<Input<'a>>,
        path: Option<&str>,
    ) -> Result<(), ParseError> {
        self.session(input, path)?.run(handler)
    }
}

/// Parses `input` with default options. See [`Parser::parse`].
///
/// # Errors
/// The first failure ends the parse.
pub fn parse<'a, H: Handler + ?Sized>(
    handler: &mut H,
    input: impl Into<Input<'a>>,
    path: Option<&str>,
) -> Result<(), ParseError> {
    Parser::new().parse(handler, input, path)
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
enum SessionState {
    NotStarted,
    InStream,
    Done,
}

/// One parse in progress. Owns the engine and with it the reader.
pub struct Session<E> {
    engine: Option<E>,
    encoding: EncodingKind,
    path: Option<String>,
    state: SessionState,
    last_mark: Option<Mark>,
}

impl<E: GrammarEngine> Session<E> {
    /// Wraps an engine. `encoding` is what `start_stream` reports.
    pub fn with_engine(engine: E, encoding: EncodingKind, path: Option<String>) -> Session<E> {
        Session {
            engine: Some(engine),
            encoding,
            path,
            state: SessionState::NotStarted,
            last_mark: None,
        }
    }

    #[must_use]
    pub fn encoding(&self) -> EncodingKind {
        self.encoding
    }

    #[must_use]
    pub fn path(&self) -> Option<&str> {
        self.path.as_deref()
    }

    /// Whether the stream end was dispatched or the parse failed.
    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.state == SessionState::Done
    }

    /// Dispatches the next event to `handler`.
    ///
    /// Returns `Ok(false)` once the session is finished.
    ///
    /// # Errors
    /// The translated engine failure, or [`ParseError::Engine`] when the engine stops before the
    /// stream end. The session is finished afterwards.
    pub fn step<H: Handler + ?Sized>(&mut self, handler: &mut H) -> Result<bool, ParseError> {
        let Some(engine) = self.engine.as_mut() else {
            return Ok(false);
        };
        match engine.next_token() {
            Ok(Some(token)) => {
                let start = Mark::from(token.span.start);
                let end = Mark::from(token.span.end);
                let event = Event::translate(&token.event, self.encoding);
                tracing::trace!(?start, ?event, "dispatching event");
                handler.event_location(start, end);
                event.dispatch(handler);
                if event == Event::StreamEnd {
                    self.finish();
                } else {
                    self.state = SessionState::InStream;
                    self.last_mark = Some(start);
                }
                Ok(true)
            }
            Ok(None) => {
                self.finish();
                Err(translate(EngineError::Truncated, self.path.as_deref()))
            }
            Err(error) => {
                self.finish();
                Err(translate(error, self.path.as_deref()))
            }
        }
    }

    /// Dispatches every remaining event.
    ///
    /// # Errors
    /// See [`Session::step`].
    pub fn run<H: Handler + ?Sized>(&mut self, handler: &mut H) -> Result<(), ParseError> {
        while self.step(handler)? {}
        Ok(())
    }

    /// Start of the event the next [`Session::step`] dispatches.
    ///
    /// Falls back to the start of the last dispatched event when there is no next event, and to
    /// the zero mark once the session is finished.
    pub fn mark(&mut self) -> Mark {
        let Some(engine) = self.engine.as_mut() else {
            return Mark::default();
        };
        let next = engine.peek_token().map(|token| Mark::from(token.span.start));
        next.or(self.last_mark).unwrap_or_default()
    }

    fn finish(&mut self) {
        self.engine = None;
        self.last_mark = None;
        self.state = SessionState::Done;
    }
}
