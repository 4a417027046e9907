use crate::tokenizer::event::{CollectionStart, Event, ScalarValue};
use crate::tokenizer::scanner::{Scanner, Token};
use crate::tokenizer::source::{Source, StrSource};
use alloc::string::String;
use alloc::vec::Vec;
use hashbrown::HashMap;
use yam_common::{CollectionStyle, Marker, ScalarType, Span, Tag, TokenType, YamlError, YamlResult};

#[derive(Clone, Copy, PartialEq, Debug, Eq)]
enum State {
    StreamStart,
    ImplicitDocumentStart,
    DocumentStart,
    DocumentContent,
    DocumentEnd,
    BlockNode,
    BlockSequenceFirstEntry,
    BlockSequenceEntry,
    IndentlessSequenceEntry,
    BlockMappingFirstKey,
    BlockMappingKey,
    BlockMappingValue,
    FlowSequenceFirstEntry,
    FlowSequenceEntry,
    FlowSequenceEntryMappingKey,
    FlowSequenceEntryMappingValue,
    FlowSequenceEntryMappingEnd,
    FlowMappingFirstKey,
    FlowMappingKey,
    FlowMappingValue,
    FlowMappingEmptyValue,
    End,
}

const DEFAULT_TAGS: [(&str, &str); 2] = [("!", "!"), ("!!", "tag:yaml.org,2002:")];

/// Pull parser turning the tokens of a [`Scanner`] into [`Event`]s.
///
/// Nesting is tracked with an explicit state stack, so deeply nested input does not recurse.
pub struct Parser<S> {
    scanner: Scanner<S>,
    states: Vec<State>,
    state: State,
    token: Option<Token>,
    tags: HashMap<String, String>,
    implicit_documents: bool,
    bare_document: bool,
}

impl<'input> Parser<StrSource<'input>> {
    pub fn new_from_str(input: &'input str) -> Self {
        Parser::new(StrSource::new(input))
    }
}

impl<S: Source> Parser<S> {
    pub fn new(src: S) -> Parser<S> {
        Parser {
            scanner: Scanner::new(src),
            states: Vec::new(),
            state: State::StreamStart,
            token: None,
            tags: HashMap::new(),
            implicit_documents: false,
            bare_document: false,
        }
    }

    /// Also report documents without `---` or directives as
    /// [`Event::DocumentStart`]/[`Event::DocumentEnd`] pairs. They are skipped otherwise.
    #[must_use]
    pub fn implicit_documents(mut self, keep: bool) -> Self {
        self.implicit_documents = keep;
        self
    }

    pub fn source_mut(&mut self) -> &mut S {
        self.scanner.source_mut()
    }

    /// Returns the next event with its span, `None` once [`Event::StreamEnd`] was returned.
    ///
    /// # Errors
    /// Returns the first syntax error found. The parser is finished afterwards.
    pub fn next_event(&mut self) -> YamlResult<Option<(Event, Span)>> {
        loop {
            if self.state == State::End {
                return Ok(None);
            }
            let (event, span) = match self.state_machine() {
                Ok(ev) => ev,
                Err(err) => {
                    self.state = State::End;
                    return Err(err);
                }
            };
            match event {
                Event::DocumentStart {
                    explicit: false, ..
                } if !self.implicit_documents => {
                    self.bare_document = true;
                }
                Event::DocumentEnd { .. } if self.bare_document => {
                    self.bare_document = false;
                }
                _ => return Ok(Some((event, span))),
            }
        }
    }

    fn peek_token(&mut self) -> YamlResult<&Token> {
        if self.token.is_none() {
            self.token = Some(self.scanner.next_token()?);
        }
        self.token.as_ref().ok_or(YamlError::UnexpectedEof)
    }

    fn fetch_token(&mut self) -> YamlResult<Token> {
        match self.token.take() {
            Some(token) => Ok(token),
            None => self.scanner.next_token(),
        }
    }

    fn push_back(&mut self, span: Span, token_type: TokenType) {
        self.token = Some(Token::new(span, token_type));
    }

    fn skip(&mut self) {
        self.token = None;
    }

    fn pop_state(&mut self) {
        self.state = self.states.pop().unwrap_or(State::End);
    }

    fn push_state(&mut self, state: State) {
        self.states.push(state);
    }

    fn state_machine(&mut self) -> YamlResult<(Event, Span)> {
        match self.state {
            State::StreamStart => self.stream_start(),
            State::ImplicitDocumentStart => self.document_start(true),
            State::DocumentStart => self.document_start(false),
            State::DocumentContent => self.document_content(),
            State::DocumentEnd => self.document_end(),
            State::BlockNode => self.parse_node(true, false),
            State::BlockSequenceFirstEntry => self.block_sequence_entry(true),
            State::BlockSequenceEntry => self.block_sequence_entry(false),
            State::IndentlessSequenceEntry => self.indentless_sequence_entry(),
            State::BlockMappingFirstKey => self.block_mapping_key(true),
            State::BlockMappingKey => self.block_mapping_key(false),
            State::BlockMappingValue => self.block_mapping_value(),
            State::FlowSequenceFirstEntry => self.flow_sequence_entry(true),
            State::FlowSequenceEntry => self.flow_sequence_entry(false),
            State::FlowSequenceEntryMappingKey => self.flow_sequence_entry_mapping_key(),
            State::FlowSequenceEntryMappingValue => self.flow_sequence_entry_mapping_value(),
            State::FlowSequenceEntryMappingEnd => self.flow_sequence_entry_mapping_end(),
            State::FlowMappingFirstKey => self.flow_mapping_key(true),
            State::FlowMappingKey => self.flow_mapping_key(false),
            State::FlowMappingValue => self.flow_mapping_value(false),
            State::FlowMappingEmptyValue => self.flow_mapping_value(true),
            State::End => Err(YamlError::UnexpectedEof),
        }
    }

    fn stream_start(&mut self) -> YamlResult<(Event, Span)> {
        let token = self.fetch_token()?;
        match token.token_type {
            TokenType::StreamStart => {
                self.state = State::ImplicitDocumentStart;
                Ok((Event::StreamStart, token.span))
            }
            _ => Err(YamlError::new_str(
                token.span.start,
                "did not find expected <stream-start>",
            )),
        }
    }

    fn document_start(&mut self, implicit: bool) -> YamlResult<(Event, Span)> {
        // Extra document end indicators are ignored.
        while self.peek_token()?.token_type == TokenType::DocumentEnd {
            self.skip();
        }

        let span = self.peek_token()?.span;
        match self.peek_token()?.token_type {
            TokenType::StreamEnd => {
                self.state = State::End;
                self.skip();
                Ok((Event::StreamEnd, span))
            }
            TokenType::VersionDirective { .. }
            | TokenType::TagDirective { .. }
            | TokenType::DocumentStart => self.explicit_document_start(),
            _ if implicit => {
                self.reset_tags();
                self.push_state(State::DocumentEnd);
                self.state = State::BlockNode;
                Ok((
                    Event::DocumentStart {
                        version: None,
                        tags: Vec::new(),
                        explicit: false,
                    },
                    Span::empty(span.start),
                ))
            }
            _ => Err(YamlError::new_str(
                span.start,
                "did not find expected <document start>",
            )),
        }
    }

    fn explicit_document_start(&mut self) -> YamlResult<(Event, Span)> {
        let start = self.peek_token()?.span.start;
        let (version, tags) = self.process_directives()?;
        let token = self.fetch_token()?;
        if token.token_type != TokenType::DocumentStart {
            return Err(YamlError::new_str(
                token.span.start,
                "did not find expected <document start>",
            ));
        }
        self.push_state(State::DocumentEnd);
        self.state = State::DocumentContent;
        Ok((
            Event::DocumentStart {
                version,
                tags,
                explicit: true,
            },
            Span::new(start, token.span.end),
        ))
    }

    fn reset_tags(&mut self) {
        self.tags.clear();
        for (handle, prefix) in DEFAULT_TAGS {
            self.tags.insert(String::from(handle), String::from(prefix));
        }
    }

    #[allow(clippy::type_complexity)]
    fn process_directives(&mut self) -> YamlResult<(Option<(u32, u32)>, Vec<(String, String)>)> {
        let mut version = None;
        let mut tags: Vec<(String, String)> = Vec::new();
        self.reset_tags();

        loop {
            let token = self.fetch_token()?;
            match token.token_type {
                TokenType::VersionDirective { major, minor } => {
                    if version.is_some() {
                        return Err(YamlError::new_str(
                            token.span.start,
                            "found duplicate %YAML directive",
                        ));
                    }
                    if major != 1 {
                        return Err(YamlError::new_str(
                            token.span.start,
                            "found incompatible YAML document",
                        ));
                    }
                    version = Some((major, minor));
                }
                TokenType::TagDirective { handle, prefix } => {
                    if tags.iter().any(|(h, _)| *h == handle) {
                        return Err(YamlError::new_str(
                            token.span.start,
                            "found duplicate %TAG directive",
                        ));
                    }
                    self.tags.insert(handle.clone(), prefix.clone());
                    tags.push((handle, prefix));
                }
                other => {
                    self.push_back(token.span, other);
                    break;
                }
            }
        }
        Ok((version, tags))
    }

    fn document_content(&mut self) -> YamlResult<(Event, Span)> {
        let span = self.peek_token()?.span;
        match self.peek_token()?.token_type {
            TokenType::VersionDirective { .. }
            | TokenType::TagDirective { .. }
            | TokenType::DocumentStart
            | TokenType::DocumentEnd
            | TokenType::StreamEnd => {
                self.pop_state();
                Ok(empty_scalar(span.start))
            }
            _ => self.parse_node(true, false),
        }
    }

    fn document_end(&mut self) -> YamlResult<(Event, Span)> {
        let span = self.peek_token()?.span;
        let explicit = self.peek_token()?.token_type == TokenType::DocumentEnd;
        let end = if explicit {
            self.skip();
            // A bare document may follow an explicit end.
            self.state = State::ImplicitDocumentStart;
            span.end
        } else {
            self.state = State::DocumentStart;
            span.start
        };
        self.tags.clear();
        Ok((Event::DocumentEnd { explicit }, Span::new(span.start, end)))
    }

    fn resolve_tag(&self, tag: Tag, mark: Marker) -> YamlResult<String> {
        if tag.handle.is_empty() {
            return Ok(tag.suffix);
        }
        match self.tags.get(&tag.handle) {
            Some(prefix) => {
                let mut resolved = String::with_capacity(prefix.len() + tag.suffix.len());
                resolved.push_str(prefix);
                resolved.push_str(&tag.suffix);
                Ok(resolved)
            }
            None => Err(YamlError::new_ctx(
                mark,
                "while parsing a node",
                "found undefined tag handle",
            )),
        }
    }

    #[allow(clippy::too_many_lines)]
    fn parse_node(&mut self, block: bool, indentless_sequence: bool) -> YamlResult<(Event, Span)> {
        let mut anchor = None;
        let mut tag = None;

        let token = self.fetch_token()?;
        let mut start = token.span.start;
        let mut end = token.span.start;
        match token.token_type {
            TokenType::Alias(name) => {
                self.pop_state();
                return Ok((Event::Alias(name), token.span));
            }
            TokenType::Anchor(name) => {
                anchor = Some(name);
                end = token.span.end;
                let next = self.fetch_token()?;
                match next.token_type {
                    TokenType::Tag(t) => {
                        end = next.span.end;
                        tag = Some((t, next.span.start));
                    }
                    other => self.push_back(next.span, other),
                }
            }
            TokenType::Tag(t) => {
                tag = Some((t, token.span.start));
                end = token.span.end;
                let next = self.fetch_token()?;
                match next.token_type {
                    TokenType::Anchor(name) => {
                        end = next.span.end;
                        anchor = Some(name);
                    }
                    other => self.push_back(next.span, other),
                }
            }
            other => self.push_back(token.span, other),
        }

        let tag = match tag {
            Some((t, mark)) => Some(self.resolve_tag(t, mark)?),
            None => None,
        };
        let implicit = tag.is_none();

        let span = self.peek_token()?.span;
        if anchor.is_none() && tag.is_none() {
            start = span.start;
        }

        match self.peek_token()?.token_type {
            TokenType::BlockEntry if indentless_sequence => {
                self.state = State::IndentlessSequenceEntry;
                Ok((
                    Event::SequenceStart(CollectionStart {
                        anchor,
                        tag,
                        implicit,
                        style: CollectionStyle::Block,
                    }),
                    Span::new(start, span.end),
                ))
            }
            TokenType::Scalar { .. } => {
                let token = self.fetch_token()?;
                self.pop_state();
                let TokenType::Scalar { scalar_type, value } = token.token_type else {
                    return Err(YamlError::new_str(token.span.start, "expected a scalar"));
                };
                let plain = scalar_type == ScalarType::Plain;
                let plain_implicit = (tag.is_none() && plain) || tag.as_deref() == Some("!");
                let quoted_implicit = tag.is_none() && !plain;
                Ok((
                    Event::Scalar(ScalarValue {
                        value,
                        anchor,
                        tag,
                        plain_implicit,
                        quoted_implicit,
                        style: scalar_type,
                    }),
                    Span::new(start, token.span.end),
                ))
            }
            TokenType::FlowSequenceStart => {
                self.state = State::FlowSequenceFirstEntry;
                Ok((
                    Event::SequenceStart(CollectionStart {
                        anchor,
                        tag,
                        implicit,
                        style: CollectionStyle::Flow,
                    }),
                    Span::new(start, span.end),
                ))
            }
            TokenType::FlowMappingStart => {
                self.state = State::FlowMappingFirstKey;
                Ok((
                    Event::MappingStart(CollectionStart {
                        anchor,
                        tag,
                        implicit,
                        style: CollectionStyle::Flow,
                    }),
                    Span::new(start, span.end),
                ))
            }
            TokenType::BlockSequenceStart if block => {
                self.state = State::BlockSequenceFirstEntry;
                Ok((
                    Event::SequenceStart(CollectionStart {
                        anchor,
                        tag,
                        implicit,
                        style: CollectionStyle::Block,
                    }),
                    Span::new(start, span.end),
                ))
            }
            TokenType::BlockMappingStart if block => {
                self.state = State::BlockMappingFirstKey;
                Ok((
                    Event::MappingStart(CollectionStart {
                        anchor,
                        tag,
                        implicit,
                        style: CollectionStyle::Block,
                    }),
                    Span::new(start, span.end),
                ))
            }
            // Node properties without content stand for an empty scalar.
            _ if anchor.is_some() || tag.is_some() => {
                self.pop_state();
                Ok((
                    Event::Scalar(ScalarValue::empty(anchor, tag)),
                    Span::new(start, end),
                ))
            }
            _ => {
                let context = if block {
                    "while parsing a block node"
                } else {
                    "while parsing a flow node"
                };
                Err(YamlError::new_ctx(
                    span.start,
                    context,
                    "did not find expected node content",
                ))
            }
        }
    }

    fn block_sequence_entry(&mut self, first: bool) -> YamlResult<(Event, Span)> {
        if first {
            // Skip BlockSequenceStart.
            self.skip();
        }
        let span = self.peek_token()?.span;
        match self.peek_token()?.token_type {
            TokenType::BlockEntry => {
                self.skip();
                if matches!(
                    self.peek_token()?.token_type,
                    TokenType::BlockEntry | TokenType::BlockEnd
                ) {
                    self.state = State::BlockSequenceEntry;
                    Ok(empty_scalar(span.end))
                } else {
                    self.push_state(State::BlockSequenceEntry);
                    self.parse_node(true, false)
                }
            }
            TokenType::BlockEnd => {
                self.pop_state();
                self.skip();
                Ok((Event::SequenceEnd, span))
            }
            _ => Err(YamlError::new_ctx(
                span.start,
                "while parsing a block collection",
                "did not find expected '-' indicator",
            )),
        }
    }

    fn indentless_sequence_entry(&mut self) -> YamlResult<(Event, Span)> {
        let span = self.peek_token()?.span;
        if self.peek_token()?.token_type != TokenType::BlockEntry {
            self.pop_state();
            return Ok((Event::SequenceEnd, Span::empty(span.start)));
        }

        self.skip();
        if matches!(
            self.peek_token()?.token_type,
            TokenType::BlockEntry | TokenType::Key | TokenType::Value | TokenType::BlockEnd
        ) {
            self.state = State::IndentlessSequenceEntry;
            Ok(empty_scalar(span.end))
        } else {
            self.push_state(State::IndentlessSequenceEntry);
            self.parse_node(true, false)
        }
    }

    fn block_mapping_key(&mut self, first: bool) -> YamlResult<(Event, Span)> {
        if first {
            // Skip BlockMappingStart.
            self.skip();
        }
        let span = self.peek_token()?.span;
        match self.peek_token()?.token_type {
            TokenType::Key => {
                self.skip();
                if matches!(
                    self.peek_token()?.token_type,
                    TokenType::Key | TokenType::Value | TokenType::BlockEnd
                ) {
                    self.state = State::BlockMappingValue;
                    Ok(empty_scalar(span.end))
                } else {
                    self.push_state(State::BlockMappingValue);
                    self.parse_node(true, true)
                }
            }
            // A value without a key has an empty key.
            TokenType::Value => {
                self.state = State::BlockMappingValue;
                Ok(empty_scalar(span.start))
            }
            TokenType::BlockEnd => {
                self.pop_state();
                self.skip();
                Ok((Event::MappingEnd, span))
            }
            _ => Err(YamlError::new_ctx(
                span.start,
                "while parsing a block mapping",
                "did not find expected key",
            )),
        }
    }

    fn block_mapping_value(&mut self) -> YamlResult<(Event, Span)> {
        let span = self.peek_token()?.span;
        if self.peek_token()?.token_type != TokenType::Value {
            self.state = State::BlockMappingKey;
            return Ok(empty_scalar(span.start));
        }

        self.skip();
        if matches!(
            self.peek_token()?.token_type,
            TokenType::Key | TokenType::Value | TokenType::BlockEnd
        ) {
            self.state = State::BlockMappingKey;
            Ok(empty_scalar(span.end))
        } else {
            self.push_state(State::BlockMappingKey);
            self.parse_node(true, true)
        }
    }

    fn flow_sequence_entry(&mut self, first: bool) -> YamlResult<(Event, Span)> {
        if first {
            // Skip FlowSequenceStart.
            self.skip();
        }

        if self.peek_token()?.token_type != TokenType::FlowSequenceEnd {
            if !first {
                let span = self.peek_token()?.span;
                if self.peek_token()?.token_type == TokenType::FlowEntry {
                    self.skip();
                } else {
                    return Err(YamlError::new_ctx(
                        span.start,
                        "while parsing a flow sequence",
                        "did not find expected ',' or ']'",
                    ));
                }
            }

            let span = self.peek_token()?.span;
            match self.peek_token()?.token_type {
                TokenType::Key => {
                    self.state = State::FlowSequenceEntryMappingKey;
                    self.skip();
                    return Ok((
                        Event::MappingStart(CollectionStart {
                            anchor: None,
                            tag: None,
                            implicit: true,
                            style: CollectionStyle::Flow,
                        }),
                        span,
                    ));
                }
                TokenType::FlowSequenceEnd => {}
                _ => {
                    self.push_state(State::FlowSequenceEntry);
                    return self.parse_node(false, false);
                }
            }
        }

        let span = self.peek_token()?.span;
        self.pop_state();
        self.skip();
        Ok((Event::SequenceEnd, span))
    }

    fn flow_sequence_entry_mapping_key(&mut self) -> YamlResult<(Event, Span)> {
        let span = self.peek_token()?.span;
        if matches!(
            self.peek_token()?.token_type,
            TokenType::Value | TokenType::FlowEntry | TokenType::FlowSequenceEnd
        ) {
            self.state = State::FlowSequenceEntryMappingValue;
            Ok(empty_scalar(span.start))
        } else {
            self.push_state(State::FlowSequenceEntryMappingValue);
            self.parse_node(false, false)
        }
    }

    fn flow_sequence_entry_mapping_value(&mut self) -> YamlResult<(Event, Span)> {
        let span = self.peek_token()?.span;
        if self.peek_token()?.token_type != TokenType::Value {
            self.state = State::FlowSequenceEntryMappingEnd;
            return Ok(empty_scalar(span.start));
        }

        self.skip();
        let span = self.peek_token()?.span;
        if matches!(
            self.peek_token()?.token_type,
            TokenType::FlowEntry | TokenType::FlowSequenceEnd
        ) {
            self.state = State::FlowSequenceEntryMappingEnd;
            Ok(empty_scalar(span.start))
        } else {
            self.push_state(State::FlowSequenceEntryMappingEnd);
            self.parse_node(false, false)
        }
    }

    fn flow_sequence_entry_mapping_end(&mut self) -> YamlResult<(Event, Span)> {
        let span = self.peek_token()?.span;
        self.state = State::FlowSequenceEntry;
        Ok((Event::MappingEnd, Span::empty(span.start)))
    }

    fn flow_mapping_key(&mut self, first: bool) -> YamlResult<(Event, Span)> {
        if first {
            // Skip FlowMappingStart.
            self.skip();
        }

        if self.peek_token()?.token_type != TokenType::FlowMappingEnd {
            if !first {
                let span = self.peek_token()?.span;
                if self.peek_token()?.token_type == TokenType::FlowEntry {
                    self.skip();
                } else {
                    return Err(YamlError::new_ctx(
                        span.start,
                        "while parsing a flow mapping",
                        "did not find expected ',' or '}'",
                    ));
                }
            }

            let span = self.peek_token()?.span;
            match self.peek_token()?.token_type {
                TokenType::Key => {
                    self.skip();
                    let span = self.peek_token()?.span;
                    if matches!(
                        self.peek_token()?.token_type,
                        TokenType::Value | TokenType::FlowEntry | TokenType::FlowMappingEnd
                    ) {
                        self.state = State::FlowMappingValue;
                        return Ok(empty_scalar(span.start));
                    }
                    self.push_state(State::FlowMappingValue);
                    return self.parse_node(false, false);
                }
                TokenType::Value => {
                    self.state = State::FlowMappingValue;
                    return Ok(empty_scalar(span.start));
                }
                TokenType::FlowMappingEnd => {}
                _ => {
                    self.push_state(State::FlowMappingEmptyValue);
                    return self.parse_node(false, false);
                }
            }
        }

        let span = self.peek_token()?.span;
        self.pop_state();
        self.skip();
        Ok((Event::MappingEnd, span))
    }

    fn flow_mapping_value(&mut self, empty: bool) -> YamlResult<(Event, Span)> {
        let span = self.peek_token()?.span;
        if empty {
            self.state = State::FlowMappingKey;
            return Ok(empty_scalar(span.start));
        }

        if self.peek_token()?.token_type == TokenType::Value {
            self.skip();
            let span = self.peek_token()?.span;
            if !matches!(
                self.peek_token()?.token_type,
                TokenType::FlowEntry | TokenType::FlowMappingEnd
            ) {
                self.push_state(State::FlowMappingKey);
                return self.parse_node(false, false);
            }
            self.state = State::FlowMappingKey;
            return Ok(empty_scalar(span.start));
        }

        self.state = State::FlowMappingKey;
        Ok(empty_scalar(span.start))
    }
}

fn empty_scalar(mark: Marker) -> (Event, Span) {
    (Event::Scalar(ScalarValue::empty(None, None)), Span::empty(mark))
}

impl<S: Source> Iterator for Parser<S> {
    type Item = YamlResult<(Event, Span)>;

    fn next(&mut self) -> Option<Self::Item> {
        self.next_event().transpose()
    }
}
