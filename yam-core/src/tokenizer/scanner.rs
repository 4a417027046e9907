use crate::tokenizer::char_utils::*;
use crate::tokenizer::source::Source;
use alloc::collections::VecDeque;
use alloc::format;
use alloc::string::String;
use alloc::vec::Vec;
use yam_common::{
    ChompIndicator, Marker, ScalarType, ScanResult, Span, Tag, TokenType, YamlError, YamlResult,
};

#[derive(Clone, PartialEq, Eq, Debug)]
pub struct Token {
    pub span: Span,
    pub token_type: TokenType,
}

impl Token {
    pub fn new(span: Span, token_type: TokenType) -> Token {
        Token { span, token_type }
    }
}

/// Whitespace seen by [`Scanner::skip_ws_to_eol`].
#[derive(Copy, Clone, Eq, PartialEq, Debug, Default)]
struct Whitespace {
    any_tabs: bool,
    has_yaml_ws: bool,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
struct SimpleKey {
    possible: bool,
    required: bool,
    token_number: usize,
    mark: Marker,
}

impl SimpleKey {
    fn new(mark: Marker) -> SimpleKey {
        SimpleKey {
            possible: false,
            required: false,
            token_number: 0,
            mark,
        }
    }
}

/// Deepest flow collection nesting the scanner accepts.
pub const MAX_FLOW_LEVEL: u32 = 512;

/// Turns characters of a [`Source`] into YAML tokens.
///
/// Block structure is tracked with an indentation stack, and implicit keys with the simple key
/// table, one entry per flow level. Columns are zero based, the indentation of the stream
/// itself is `-1`.
pub struct Scanner<S> {
    src: S,
    tokens: VecDeque<Token>,

    simple_keys: Vec<SimpleKey>,
    indents: Vec<isize>,
    indent: isize,
    flow_level: u32,

    tokens_parsed: usize,
    token_available: bool,
    stream_start_produced: bool,
    stream_end_produced: bool,
    simple_key_allowed: bool,
    leading_whitespace: bool,
    adjacent_value_allowed_at: Option<usize>,

    buf_leading_break: String,
    buf_trailing_breaks: String,
    buf_whitespaces: String,
}

impl<S: Source> Scanner<S> {
    pub fn new(src: S) -> Scanner<S> {
        Scanner {
            src,
            tokens: VecDeque::new(),
            simple_keys: Vec::new(),
            indents: Vec::new(),
            indent: -1,
            flow_level: 0,
            tokens_parsed: 0,
            token_available: false,
            stream_start_produced: false,
            stream_end_produced: false,
            simple_key_allowed: true,
            leading_whitespace: true,
            adjacent_value_allowed_at: None,
            buf_leading_break: String::new(),
            buf_trailing_breaks: String::new(),
            buf_whitespaces: String::new(),
        }
    }

    pub fn source_mut(&mut self) -> &mut S {
        &mut self.src
    }

    /// Position of the next unread character.
    #[cfg_attr(not(feature = "no-inline"), inline)]
    pub fn mark(&self) -> Marker {
        self.src.mark()
    }

    pub fn stream_ended(&self) -> bool {
        self.stream_end_produced
    }

    /// Returns the next token. Asking again after [`TokenType::StreamEnd`] is an error.
    pub fn next_token(&mut self) -> YamlResult<Token> {
        if self.stream_end_produced {
            return Err(YamlError::UnexpectedEof);
        }
        if !self.token_available {
            self.fetch_more_tokens()?;
        }
        let Some(token) = self.tokens.pop_front() else {
            return Err(YamlError::UnexpectedEof);
        };
        self.token_available = false;
        self.tokens_parsed += 1;
        if token.token_type == TokenType::StreamEnd {
            self.stream_end_produced = true;
        }
        Ok(token)
    }

    fn fetch_more_tokens(&mut self) -> ScanResult {
        loop {
            let need_more = if self.tokens.is_empty() {
                true
            } else {
                self.stale_simple_keys()?;
                self.simple_keys
                    .iter()
                    .any(|sk| sk.possible && sk.token_number == self.tokens_parsed)
            };
            if !need_more {
                break;
            }
            self.fetch_next_token()?;
        }
        self.token_available = true;
        Ok(())
    }

    fn fetch_next_token(&mut self) -> ScanResult {
        if !self.stream_start_produced {
            self.fetch_stream_start();
            return Ok(());
        }
        self.skip_to_next_token()?;
        self.stale_simple_keys()?;

        let mark = self.mark();
        self.unroll_indent(mark.col as isize);

        if self.src.next_is_z() {
            return self.fetch_stream_end();
        }

        if mark.col == 0 {
            if self.src.peek() == '%' {
                return self.fetch_directive();
            }
            if self.src.next_is_document_start() {
                return self.fetch_document_indicator(TokenType::DocumentStart);
            }
            if self.src.next_is_document_end() {
                self.fetch_document_indicator(TokenType::DocumentEnd)?;
                self.skip_ws_to_eol()?;
                if !self.src.next_is_breakz() {
                    return Err(YamlError::new_str(
                        self.mark(),
                        "invalid content after document end marker",
                    ));
                }
                return Ok(());
            }
        }

        if (mark.col as isize) < self.indent {
            return Err(YamlError::new_str(mark, "invalid indentation"));
        }

        let c = self.src.peek();
        let nc = self.src.peek_n1();
        match c {
            '[' => self.fetch_flow_collection_start(TokenType::FlowSequenceStart),
            '{' => self.fetch_flow_collection_start(TokenType::FlowMappingStart),
            ']' => self.fetch_flow_collection_end(TokenType::FlowSequenceEnd),
            '}' => self.fetch_flow_collection_end(TokenType::FlowMappingEnd),
            ',' => self.fetch_flow_entry(),
            '-' if is_blank_or_breakz(nc) => self.fetch_block_entry(),
            '?' if is_blank_or_breakz(nc) => self.fetch_key(),
            ':' if is_blank_or_breakz(nc) => self.fetch_value(),
            ':' if self.flow_level > 0
                && (is_flow(nc) || self.adjacent_value_allowed_at == Some(mark.pos)) =>
            {
                self.fetch_flow_value()
            }
            '*' => self.fetch_anchor(true),
            '&' => self.fetch_anchor(false),
            '!' => self.fetch_tag(),
            '|' if self.flow_level == 0 => self.fetch_block_scalar(true),
            '>' if self.flow_level == 0 => self.fetch_block_scalar(false),
            '\'' => self.fetch_flow_scalar(true),
            '"' => self.fetch_flow_scalar(false),
            '%' | '@' | '`' | '\0' => Err(YamlError::new_ctx(
                mark,
                "while scanning for the next token",
                &format!("found character `{}' that cannot start any token", c.escape_default()),
            )),
            _ => self.fetch_plain_scalar(),
        }
    }

    fn skip_to_next_token(&mut self) -> ScanResult {
        loop {
            match self.src.peek() {
                // Tabs may not be used as indentation inside a block.
                '\t' if !self.indents.is_empty()
                    && self.leading_whitespace
                    && (self.mark().col as isize) < self.indent =>
                {
                    self.skip_ws_to_eol()?;
                    if !self.src.next_is_breakz() {
                        return Err(YamlError::new_str(
                            self.mark(),
                            "tabs disallowed within this context (block indentation)",
                        ));
                    }
                }
                ' ' | '\t' => self.skip_blank(),
                '\n' | '\r' => {
                    self.skip_linebreak();
                    if self.flow_level == 0 {
                        self.allow_simple_key();
                    }
                }
                '#' => {
                    while !self.src.next_is_breakz() {
                        self.skip_non_blank();
                    }
                }
                _ => break,
            }
        }
        Ok(())
    }

    /// Skips spaces, tabs and a trailing comment, stopping at a line break.
    fn skip_ws_to_eol(&mut self) -> YamlResult<Whitespace> {
        let mut seen = Whitespace::default();
        loop {
            match self.src.peek() {
                ' ' => {
                    seen.has_yaml_ws = true;
                    self.skip_blank();
                }
                '\t' => {
                    seen.any_tabs = true;
                    self.skip_blank();
                }
                // YAML comments must be preceded by whitespace.
                '#' if !seen.any_tabs && !seen.has_yaml_ws => {
                    return Err(YamlError::new_str(
                        self.mark(),
                        "comments must be separated from other tokens by whitespace",
                    ));
                }
                '#' => {
                    while !self.src.next_is_breakz() {
                        self.skip_non_blank();
                    }
                }
                _ => break,
            }
        }
        Ok(seen)
    }

    #[cfg_attr(not(feature = "no-inline"), inline)]
    fn skip_blank(&mut self) {
        self.src.skip();
    }

    #[cfg_attr(not(feature = "no-inline"), inline)]
    fn skip_non_blank(&mut self) {
        self.src.skip();
        self.leading_whitespace = false;
    }

    fn skip_n_non_blank(&mut self, count: usize) {
        self.src.skip_n(count);
        self.leading_whitespace = false;
    }

    fn skip_linebreak(&mut self) {
        if self.src.peek() == '\r' && self.src.peek_n1() == '\n' {
            self.src.skip_n(2);
            self.leading_whitespace = true;
        } else if self.src.next_is_break() {
            self.src.skip();
            self.leading_whitespace = true;
        }
    }

    /// Consumes a line break, normalized to `\n` in `s`.
    fn read_break(&mut self, s: &mut String) {
        if self.src.next_is_break() {
            self.skip_linebreak();
            s.push('\n');
        }
    }

    fn allow_simple_key(&mut self) {
        self.simple_key_allowed = true;
    }

    fn disallow_simple_key(&mut self) {
        self.simple_key_allowed = false;
    }

    fn stale_simple_keys(&mut self) -> ScanResult {
        let mark = self.mark();
        for sk in &mut self.simple_keys {
            if sk.possible && (sk.mark.line < mark.line || sk.mark.pos + 1024 < mark.pos) {
                if sk.required {
                    return Err(YamlError::new_ctx(
                        mark,
                        "while scanning a simple key",
                        "could not find expected ':'",
                    ));
                }
                sk.possible = false;
            }
        }
        Ok(())
    }

    fn save_simple_key(&mut self) -> ScanResult {
        if self.simple_key_allowed {
            let mark = self.mark();
            let required = self.flow_level == 0 && self.indent == mark.col as isize;
            let sk = SimpleKey {
                possible: true,
                required,
                token_number: self.tokens_parsed + self.tokens.len(),
                mark,
            };
            self.remove_simple_key()?;
            if let Some(last) = self.simple_keys.last_mut() {
                *last = sk;
            }
        }
        Ok(())
    }

    fn remove_simple_key(&mut self) -> ScanResult {
        let mark = self.mark();
        if let Some(last) = self.simple_keys.last_mut() {
            if last.possible && last.required {
                return Err(YamlError::new_ctx(
                    mark,
                    "while scanning a simple key",
                    "could not find expected ':'",
                ));
            }
            last.possible = false;
        }
        Ok(())
    }

    fn increase_flow_level(&mut self) -> ScanResult {
        if self.flow_level >= MAX_FLOW_LEVEL {
            return Err(YamlError::new_str(self.src.mark(), "recursion limit exceeded"));
        }
        self.simple_keys.push(SimpleKey::new(Marker::default()));
        self.flow_level += 1;
        Ok(())
    }

    fn decrease_flow_level(&mut self) {
        if self.flow_level > 0 {
            self.flow_level -= 1;
            self.simple_keys.pop();
        }
    }

    fn roll_indent(
        &mut self,
        col: isize,
        number: Option<usize>,
        token_type: TokenType,
        mark: Marker,
    ) {
        if self.flow_level > 0 {
            return;
        }
        if self.indent < col {
            self.indents.push(self.indent);
            self.indent = col;
            let token = Token::new(Span::empty(mark), token_type);
            match number {
                Some(n) => self.insert_token(n, token),
                None => self.tokens.push_back(token),
            }
        }
    }

    fn unroll_indent(&mut self, col: isize) {
        if self.flow_level > 0 {
            return;
        }
        while self.indent > col {
            let Some(indent) = self.indents.pop() else {
                break;
            };
            self.tokens
                .push_back(Token::new(Span::empty(self.mark()), TokenType::BlockEnd));
            self.indent = indent;
        }
    }

    /// Inserts `token` before the token with the absolute number `token_number`.
    fn insert_token(&mut self, token_number: usize, token: Token) {
        let index = token_number
            .saturating_sub(self.tokens_parsed)
            .min(self.tokens.len());
        self.tokens.insert(index, token);
    }

    fn fetch_stream_start(&mut self) {
        let mark = self.mark();
        self.indent = -1;
        self.stream_start_produced = true;
        self.allow_simple_key();
        self.tokens
            .push_back(Token::new(Span::empty(mark), TokenType::StreamStart));
        self.simple_keys.push(SimpleKey::new(Marker::default()));
    }

    fn fetch_stream_end(&mut self) -> ScanResult {
        // Force a new line.
        let mut mark = self.mark();
        if mark.col != 0 {
            mark.col = 0;
            mark.line += 1;
        }
        for sk in &mut self.simple_keys {
            if sk.required && sk.possible {
                return Err(YamlError::new_ctx(
                    mark,
                    "while scanning a simple key",
                    "could not find expected ':'",
                ));
            }
            sk.possible = false;
        }
        self.unroll_indent(-1);
        self.disallow_simple_key();
        self.tokens
            .push_back(Token::new(Span::empty(mark), TokenType::StreamEnd));
        Ok(())
    }

    fn fetch_directive(&mut self) -> ScanResult {
        self.unroll_indent(-1);
        self.remove_simple_key()?;
        self.disallow_simple_key();

        if let Some(token) = self.scan_directive()? {
            self.tokens.push_back(token);
        }
        Ok(())
    }

    fn scan_directive(&mut self) -> YamlResult<Option<Token>> {
        let start_mark = self.mark();
        self.skip_non_blank();

        let name = self.scan_directive_name()?;
        let token = match name.as_str() {
            "YAML" => Some(self.scan_version_directive_value(&start_mark)?),
            "TAG" => Some(self.scan_tag_directive_value(&start_mark)?),
            // Reserved directives are ignored.
            _ => {
                while !self.src.next_is_breakz() {
                    self.skip_non_blank();
                }
                None
            }
        };

        self.skip_ws_to_eol()?;
        if !self.src.next_is_breakz() {
            return Err(YamlError::new_ctx(
                self.mark(),
                "while scanning a directive",
                "did not find expected comment or line break",
            ));
        }
        self.skip_linebreak();
        Ok(token)
    }

    fn scan_directive_name(&mut self) -> YamlResult<String> {
        let start_mark = self.mark();
        let mut string = String::new();
        while self.src.next_is_alpha() {
            string.push(self.src.peek());
            self.skip_non_blank();
        }

        if string.is_empty() {
            return Err(YamlError::new_ctx(
                start_mark,
                "while scanning a directive",
                "could not find expected directive name",
            ));
        }

        if !self.src.next_is_blank_or_breakz() {
            return Err(YamlError::new_ctx(
                start_mark,
                "while scanning a directive",
                "found unexpected non-alphabetical character",
            ));
        }

        Ok(string)
    }

    fn scan_version_directive_value(&mut self, mark: &Marker) -> YamlResult<Token> {
        self.src.skip_while_blank();

        let major = self.scan_version_directive_number(mark)?;

        if self.src.peek() != '.' {
            return Err(YamlError::new_ctx(
                *mark,
                "while scanning a %YAML directive",
                "did not find expected digit or '.' character",
            ));
        }
        self.skip_non_blank();

        let minor = self.scan_version_directive_number(mark)?;

        Ok(Token::new(
            Span::new(*mark, self.mark()),
            TokenType::VersionDirective { major, minor },
        ))
    }

    fn scan_version_directive_number(&mut self, mark: &Marker) -> YamlResult<u32> {
        let mut val = 0u32;
        let mut length = 0usize;
        while let Some(digit) = self.src.peek().to_digit(10) {
            if length + 1 > 9 {
                return Err(YamlError::new_ctx(
                    *mark,
                    "while scanning a %YAML directive",
                    "found extremely long version number",
                ));
            }
            length += 1;
            val = val * 10 + digit;
            self.skip_non_blank();
        }

        if length == 0 {
            return Err(YamlError::new_ctx(
                *mark,
                "while scanning a %YAML directive",
                "did not find expected version number",
            ));
        }

        Ok(val)
    }

    fn scan_tag_directive_value(&mut self, mark: &Marker) -> YamlResult<Token> {
        self.src.skip_while_blank();
        let handle = self.scan_tag_handle(true, mark)?;

        if self.src.skip_while_blank() == 0 {
            return Err(YamlError::new_ctx(
                *mark,
                "while scanning a %TAG directive",
                "did not find expected whitespace",
            ));
        }

        let prefix = self.scan_tag_prefix(mark)?;

        if !self.src.next_is_blank_or_breakz() {
            return Err(YamlError::new_ctx(
                *mark,
                "while scanning a %TAG directive",
                "did not find expected whitespace or line break",
            ));
        }

        Ok(Token::new(
            Span::new(*mark, self.mark()),
            TokenType::TagDirective { handle, prefix },
        ))
    }

    fn fetch_document_indicator(&mut self, token_type: TokenType) -> ScanResult {
        self.unroll_indent(-1);
        self.remove_simple_key()?;
        self.disallow_simple_key();

        let mark = self.mark();
        self.skip_n_non_blank(3);

        self.tokens
            .push_back(Token::new(Span::new(mark, self.mark()), token_type));
        Ok(())
    }

    fn fetch_flow_collection_start(&mut self, token_type: TokenType) -> ScanResult {
        // The indicators '[' and '{' may start a simple key.
        self.save_simple_key()?;
        self.increase_flow_level()?;
        self.allow_simple_key();

        let start_mark = self.mark();
        self.skip_non_blank();
        let end_mark = self.mark();
        self.skip_ws_to_eol()?;

        self.tokens
            .push_back(Token::new(Span::new(start_mark, end_mark), token_type));
        Ok(())
    }

    fn fetch_flow_collection_end(&mut self, token_type: TokenType) -> ScanResult {
        self.remove_simple_key()?;
        self.decrease_flow_level();
        self.disallow_simple_key();

        let start_mark = self.mark();
        self.skip_non_blank();
        let end_mark = self.mark();
        self.skip_ws_to_eol()?;

        // A JSON-like node may be followed by an adjacent ':' value indicator.
        if self.flow_level > 0 {
            self.adjacent_value_allowed_at = Some(self.mark().pos);
        }

        self.tokens
            .push_back(Token::new(Span::new(start_mark, end_mark), token_type));
        Ok(())
    }

    fn fetch_flow_entry(&mut self) -> ScanResult {
        self.remove_simple_key()?;
        self.allow_simple_key();

        let start_mark = self.mark();
        self.skip_non_blank();
        let end_mark = self.mark();
        self.skip_ws_to_eol()?;

        self.tokens.push_back(Token::new(
            Span::new(start_mark, end_mark),
            TokenType::FlowEntry,
        ));
        Ok(())
    }

    fn fetch_block_entry(&mut self) -> ScanResult {
        let mark = self.mark();
        if self.flow_level > 0 {
            return Err(YamlError::new_str(
                mark,
                r#""-" is only valid inside a block"#,
            ));
        }
        if !self.simple_key_allowed {
            return Err(YamlError::new_str(
                mark,
                "block sequence entries are not allowed in this context",
            ));
        }
        self.roll_indent(
            mark.col as isize,
            None,
            TokenType::BlockSequenceStart,
            mark,
        );

        self.remove_simple_key()?;
        self.allow_simple_key();

        self.skip_non_blank();
        let end_mark = self.mark();

        let seen = self.skip_ws_to_eol()?;
        if seen.any_tabs && !seen.has_yaml_ws && self.src.peek() == '-' {
            return Err(YamlError::new_str(
                self.mark(),
                "'-' must be followed by a valid YAML whitespace",
            ));
        }

        self.tokens
            .push_back(Token::new(Span::new(mark, end_mark), TokenType::BlockEntry));
        Ok(())
    }

    fn fetch_key(&mut self) -> ScanResult {
        let start_mark = self.mark();
        if self.flow_level == 0 {
            if !self.simple_key_allowed {
                return Err(YamlError::new_str(
                    start_mark,
                    "mapping keys are not allowed in this context",
                ));
            }
            self.roll_indent(
                start_mark.col as isize,
                None,
                TokenType::BlockMappingStart,
                start_mark,
            );
        }

        self.remove_simple_key()?;
        self.simple_key_allowed = self.flow_level == 0;

        self.skip_non_blank();
        self.tokens.push_back(Token::new(
            Span::new(start_mark, self.mark()),
            TokenType::Key,
        ));
        Ok(())
    }

    /// A ':' in a flow context followed by a flow indicator or directly after a JSON-like node.
    fn fetch_flow_value(&mut self) -> ScanResult {
        let nc = self.src.peek_n1();
        if nc == '[' || nc == '{' {
            if let Some(sk) = self.simple_keys.last() {
                if !sk.possible && self.adjacent_value_allowed_at != Some(self.mark().pos) {
                    return Err(YamlError::new_str(
                        self.mark(),
                        "':' may not precede any of `[{` in flow mapping",
                    ));
                }
            }
        }
        self.fetch_value()
    }

    fn fetch_value(&mut self) -> ScanResult {
        let start_mark = self.mark();
        let sk = self.simple_keys.last().copied();

        match sk {
            Some(sk) if sk.possible => {
                // Insert the KEY token in front of the simple key.
                self.insert_token(
                    sk.token_number,
                    Token::new(Span::empty(sk.mark), TokenType::Key),
                );
                self.roll_indent(
                    sk.mark.col as isize,
                    Some(sk.token_number),
                    TokenType::BlockMappingStart,
                    sk.mark,
                );
                if let Some(last) = self.simple_keys.last_mut() {
                    last.possible = false;
                }
                self.disallow_simple_key();
            }
            _ => {
                if self.flow_level == 0 {
                    if !self.simple_key_allowed {
                        return Err(YamlError::new_str(
                            start_mark,
                            "mapping values are not allowed in this context",
                        ));
                    }
                    self.roll_indent(
                        start_mark.col as isize,
                        None,
                        TokenType::BlockMappingStart,
                        start_mark,
                    );
                }
                self.simple_key_allowed = self.flow_level == 0;
            }
        }

        self.skip_non_blank();
        self.tokens.push_back(Token::new(
            Span::new(start_mark, self.mark()),
            TokenType::Value,
        ));
        Ok(())
    }

    fn fetch_anchor(&mut self, alias: bool) -> ScanResult {
        self.save_simple_key()?;
        self.disallow_simple_key();

        let token = self.scan_anchor(alias)?;
        self.tokens.push_back(token);
        Ok(())
    }

    fn scan_anchor(&mut self, alias: bool) -> YamlResult<Token> {
        let start_mark = self.mark();
        let mut string = String::new();

        self.skip_non_blank();
        while is_anchor_char(self.src.peek()) {
            string.push(self.src.peek());
            self.skip_non_blank();
        }

        if string.is_empty() {
            let context = if alias {
                "while scanning an alias"
            } else {
                "while scanning an anchor"
            };
            return Err(YamlError::new_ctx(
                start_mark,
                context,
                "did not find expected alphabetic or numeric character",
            ));
        }

        let token_type = if alias {
            TokenType::Alias(string)
        } else {
            TokenType::Anchor(string)
        };
        Ok(Token::new(Span::new(start_mark, self.mark()), token_type))
    }

    fn fetch_tag(&mut self) -> ScanResult {
        self.save_simple_key()?;
        self.disallow_simple_key();

        let token = self.scan_tag()?;
        self.tokens.push_back(token);
        Ok(())
    }

    fn scan_tag(&mut self) -> YamlResult<Token> {
        let start_mark = self.mark();
        let mut handle;
        let suffix;

        if self.src.peek_n1() == '<' {
            handle = String::new();
            suffix = self.scan_verbatim_tag(&start_mark)?;
        } else {
            handle = self.scan_tag_handle(false, &start_mark)?;
            if handle.len() >= 2 && handle.starts_with('!') && handle.ends_with('!') {
                // `!!suffix` or `!named!suffix`.
                suffix = self.scan_tag_shorthand_suffix("", &start_mark)?;
            } else {
                // The handle was really the start of a `!suffix` tag.
                let head = handle;
                suffix = self.scan_tag_shorthand_suffix(&head, &start_mark)?;
                handle = String::from("!");
                // The non-specific tag `!`.
                if suffix.is_empty() {
                    handle = String::new();
                    return self.finish_tag(start_mark, handle, String::from("!"));
                }
            }
        }

        self.finish_tag(start_mark, handle, suffix)
    }

    fn finish_tag(&mut self, start_mark: Marker, handle: String, suffix: String) -> YamlResult<Token> {
        if self.src.next_is_blank_or_breakz() || (self.flow_level > 0 && self.src.next_is_flow())
        {
            Ok(Token::new(
                Span::new(start_mark, self.mark()),
                TokenType::Tag(Tag { handle, suffix }),
            ))
        } else {
            Err(YamlError::new_ctx(
                start_mark,
                "while scanning a tag",
                "did not find expected whitespace or line break",
            ))
        }
    }

    fn scan_tag_handle(&mut self, directive: bool, mark: &Marker) -> YamlResult<String> {
        let context = if directive {
            "while scanning a tag directive"
        } else {
            "while scanning a tag"
        };
        if self.src.peek() != '!' {
            return Err(YamlError::new_ctx(*mark, context, "did not find expected '!'"));
        }

        let mut string = String::from("!");
        self.skip_non_blank();

        while self.src.next_is_alpha() {
            string.push(self.src.peek());
            self.skip_non_blank();
        }

        if self.src.peek() == '!' {
            string.push('!');
            self.skip_non_blank();
        } else if directive && string != "!" {
            // A tag directive handle must be `!`, `!!` or `!word!`.
            return Err(YamlError::new_ctx(*mark, context, "did not find expected '!'"));
        }
        Ok(string)
    }

    /// Scans the part of a shorthand tag after its handle. `head` holds characters the handle
    /// scan already consumed, including the leading `!`.
    fn scan_tag_shorthand_suffix(
        &mut self,
        head: &str,
        mark: &Marker,
    ) -> YamlResult<String> {
        let mut length = head.len();
        let mut string = String::new();

        // Copy the head if needed. The leading '!' is not part of the suffix.
        if length > 1 {
            string.push_str(&head[1..]);
        }

        while is_tag_char(self.src.peek()) {
            if self.src.peek() == '%' {
                string.push_str(&self.scan_uri_escapes(mark)?);
            } else {
                string.push(self.src.peek());
                self.skip_non_blank();
            }
            length += 1;
        }

        if length == 0 {
            return Err(YamlError::new_ctx(
                *mark,
                "while parsing a tag",
                "did not find expected tag URI",
            ));
        }

        Ok(string)
    }

    fn scan_verbatim_tag(&mut self, mark: &Marker) -> YamlResult<String> {
        // Eat `!<`.
        self.skip_n_non_blank(2);
        let mut string = String::new();
        while is_uri_char(self.src.peek()) {
            if self.src.peek() == '%' {
                string.push_str(&self.scan_uri_escapes(mark)?);
            } else {
                string.push(self.src.peek());
                self.skip_non_blank();
            }
        }

        if self.src.peek() != '>' {
            return Err(YamlError::new_ctx(
                *mark,
                "while scanning a verbatim tag",
                "did not find the expected '>'",
            ));
        }
        self.skip_non_blank();

        if string.is_empty() {
            return Err(YamlError::new_ctx(
                *mark,
                "while scanning a verbatim tag",
                "did not find expected tag URI",
            ));
        }
        Ok(string)
    }

    fn scan_tag_prefix(&mut self, mark: &Marker) -> YamlResult<String> {
        let mut string = String::new();

        if self.src.peek() == '!' {
            // A local tag prefix.
            string.push('!');
            self.skip_non_blank();
        } else if !is_tag_char(self.src.peek()) {
            return Err(YamlError::new_ctx(
                *mark,
                "while scanning a %TAG directive",
                "invalid global tag character",
            ));
        } else if self.src.peek() == '%' {
            string.push_str(&self.scan_uri_escapes(mark)?);
        } else {
            string.push(self.src.peek());
            self.skip_non_blank();
        }

        while is_uri_char(self.src.peek()) {
            if self.src.peek() == '%' {
                string.push_str(&self.scan_uri_escapes(mark)?);
            } else {
                string.push(self.src.peek());
                self.skip_non_blank();
            }
        }

        Ok(string)
    }

    /// Decodes a run of `%xx` escapes as UTF-8.
    fn scan_uri_escapes(&mut self, mark: &Marker) -> YamlResult<String> {
        let mut raw = String::new();
        while self.src.peek() == '%' {
            let hi = self.src.peek_n1();
            let lo = self.src.peek_n2();
            if as_hex(hi).is_none() || as_hex(lo).is_none() {
                return Err(YamlError::new_ctx(
                    *mark,
                    "while parsing a tag",
                    "found an invalid escape sequence",
                ));
            }
            raw.push('%');
            raw.push(hi);
            raw.push(lo);
            self.skip_n_non_blank(3);
        }

        let bytes = urlencoding::decode_binary(raw.as_bytes()).into_owned();
        String::from_utf8(bytes).map_err(|_| {
            YamlError::new_ctx(
                *mark,
                "while parsing a tag",
                "found an incorrect UTF-8 sequence",
            )
        })
    }

    fn fetch_block_scalar(&mut self, literal: bool) -> ScanResult {
        self.remove_simple_key()?;
        self.allow_simple_key();

        let token = self.scan_block_scalar(literal)?;
        self.tokens.push_back(token);
        Ok(())
    }

    fn scan_block_scalar(&mut self, literal: bool) -> YamlResult<Token> {
        let start_mark = self.mark();
        let mut chomping = ChompIndicator::Clip;
        let mut increment: isize = 0;
        let mut indent: isize = 0;
        let mut trailing_blank: bool;
        let mut leading_blank = false;
        let style = if literal {
            ScalarType::Literal
        } else {
            ScalarType::Folded
        };

        let mut string = String::new();
        let mut leading_break = String::new();
        let mut trailing_breaks = String::new();
        let mut chomping_break = String::new();

        // Skip '|' or '>'.
        self.skip_non_blank();

        if self.src.peek() == '+' || self.src.peek() == '-' {
            chomping = if self.src.peek() == '+' {
                ChompIndicator::Keep
            } else {
                ChompIndicator::Strip
            };
            self.skip_non_blank();
            if let Some(digit) = self.src.peek().to_digit(10) {
                increment = self.block_scalar_increment(digit, &start_mark)?;
                self.skip_non_blank();
            }
        } else if let Some(digit) = self.src.peek().to_digit(10) {
            increment = self.block_scalar_increment(digit, &start_mark)?;
            self.skip_non_blank();
            if self.src.peek() == '+' || self.src.peek() == '-' {
                chomping = if self.src.peek() == '+' {
                    ChompIndicator::Keep
                } else {
                    ChompIndicator::Strip
                };
                self.skip_non_blank();
            }
        }

        self.skip_ws_to_eol()?;

        // Check if we are at the end of the line.
        if !self.src.next_is_breakz() {
            return Err(YamlError::new_ctx(
                start_mark,
                "while scanning a block scalar",
                "did not find expected comment or line break",
            ));
        }

        if self.src.next_is_break() {
            self.read_break(&mut chomping_break);
        }

        if self.src.peek() == '\t' {
            return Err(YamlError::new_ctx(
                start_mark,
                "while scanning a block scalar",
                "a block scalar content cannot start with a tab",
            ));
        }

        if increment > 0 {
            indent = if self.indent >= 0 {
                self.indent + increment
            } else {
                increment
            };
            self.skip_block_scalar_indent(indent, &mut trailing_breaks);
        } else {
            self.skip_block_scalar_first_line_indent(&mut indent, &mut trailing_breaks);
        }

        let col = self.mark().col as isize;
        if !self.src.next_is_z() && col < indent && col > self.indent {
            return Err(YamlError::new_ctx(
                self.mark(),
                "while scanning a block scalar",
                "wrongly indented line in block scalar",
            ));
        }

        while self.mark().col as isize == indent && !self.src.next_is_z() {
            if indent == 0 && self.src.next_is_document_indicator() {
                break;
            }

            // We are at the beginning of a non-empty line.
            trailing_blank = self.src.next_is_blank();
            if !literal && !leading_break.is_empty() && !leading_blank && !trailing_blank {
                string.push_str(&trailing_breaks);
                if trailing_breaks.is_empty() {
                    string.push(' ');
                }
            } else {
                string.push_str(&leading_break);
                string.push_str(&trailing_breaks);
            }
            leading_break.clear();
            trailing_breaks.clear();

            leading_blank = self.src.next_is_blank();

            while !self.src.next_is_breakz() {
                string.push(self.src.peek());
                self.src.skip();
            }

            if !self.src.next_is_break() {
                break;
            }

            self.read_break(&mut leading_break);
            self.skip_block_scalar_indent(indent, &mut trailing_breaks);
        }

        // Chomp the tail.
        if chomping != ChompIndicator::Strip {
            string.push_str(&leading_break);
        }
        if chomping == ChompIndicator::Keep {
            string.push_str(&trailing_breaks);
        }

        Ok(Token::new(
            Span::new(start_mark, self.mark()),
            TokenType::Scalar {
                scalar_type: style,
                value: string,
            },
        ))
    }

    fn block_scalar_increment(&self, digit: u32, start_mark: &Marker) -> YamlResult<isize> {
        if digit == 0 {
            return Err(YamlError::new_ctx(
                *start_mark,
                "while scanning a block scalar",
                "found an indentation indicator equal to 0",
            ));
        }
        Ok(digit as isize)
    }

    /// Skips indentation up to `indent` columns, collecting empty lines into `breaks`.
    fn skip_block_scalar_indent(&mut self, indent: isize, breaks: &mut String) {
        loop {
            while (self.mark().col as isize) < indent && self.src.peek() == ' ' {
                self.skip_blank();
            }
            if self.src.next_is_break() {
                self.read_break(breaks);
            } else {
                break;
            }
        }
    }

    /// Determines the indentation of a block scalar from its first non-empty line.
    fn skip_block_scalar_first_line_indent(&mut self, indent: &mut isize, breaks: &mut String) {
        let mut max_indent: isize = 0;
        loop {
            while self.src.peek() == ' ' {
                self.skip_blank();
            }
            max_indent = max_indent.max(self.mark().col as isize);
            if self.src.next_is_break() {
                self.read_break(breaks);
            } else {
                break;
            }
        }

        *indent = max_indent.max(self.indent + 1);
        if self.indent >= 0 {
            *indent = (*indent).max(1);
        }
    }

    fn fetch_flow_scalar(&mut self, single: bool) -> ScanResult {
        self.save_simple_key()?;
        self.disallow_simple_key();

        let token = self.scan_flow_scalar(single)?;
        if self.flow_level > 0 {
            self.adjacent_value_allowed_at = Some(self.mark().pos);
        }
        self.tokens.push_back(token);
        Ok(())
    }

    fn scan_flow_scalar(&mut self, single: bool) -> YamlResult<Token> {
        let start_mark = self.mark();

        let mut string = String::new();
        let mut leading_break = String::new();
        let mut trailing_breaks = String::new();
        let mut whitespaces = String::new();
        let mut leading_blanks;

        // Eat the left quote.
        self.skip_non_blank();

        loop {
            if self.mark().col == 0 && self.src.next_is_document_indicator() {
                return Err(YamlError::new_ctx(
                    start_mark,
                    "while scanning a quoted scalar",
                    "found unexpected document indicator",
                ));
            }

            if self.src.peek() == '\0' {
                return Err(YamlError::new_ctx(
                    start_mark,
                    "while scanning a quoted scalar",
                    "found unexpected end of stream",
                ));
            }

            if (self.mark().col as isize) < self.indent {
                return Err(YamlError::new_ctx(
                    start_mark,
                    "while scanning a quoted scalar",
                    "invalid indentation in quoted scalar",
                ));
            }

            leading_blanks = false;
            self.consume_flow_scalar_non_whitespace_chars(
                single,
                &mut string,
                &mut leading_blanks,
                &start_mark,
            )?;

            match self.src.peek() {
                '\'' if single => break,
                '"' if !single => break,
                _ => {}
            }

            // Consume blank characters.
            while self.src.next_is_blank() || self.src.next_is_break() {
                if self.src.next_is_blank() {
                    if leading_blanks {
                        if self.src.peek() == '\t' && (self.mark().col as isize) < self.indent {
                            return Err(YamlError::new_str(
                                self.mark(),
                                "tab cannot be used as indentation",
                            ));
                        }
                        self.skip_blank();
                    } else {
                        whitespaces.push(self.src.peek());
                        self.skip_blank();
                    }
                } else if leading_blanks {
                    self.read_break(&mut trailing_breaks);
                } else {
                    whitespaces.clear();
                    self.read_break(&mut leading_break);
                    leading_blanks = true;
                }
            }

            // Join the whitespaces or fold line breaks.
            if leading_blanks {
                if leading_break.is_empty() {
                    string.push_str(&trailing_breaks);
                    trailing_breaks.clear();
                } else {
                    if trailing_breaks.is_empty() {
                        string.push(' ');
                    } else {
                        string.push_str(&trailing_breaks);
                        trailing_breaks.clear();
                    }
                    leading_break.clear();
                }
            } else {
                string.push_str(&whitespaces);
                whitespaces.clear();
            }
        }

        // Eat the right quote.
        self.skip_non_blank();
        let end_mark = self.mark();

        // Ensure there is no invalid trailing content.
        self.skip_ws_to_eol()?;
        match self.src.peek() {
            // These can be encountered in flow sequences or mappings.
            ',' | '}' | ']' if self.flow_level > 0 => {}
            // An end-of-line / end-of-stream is fine. No trailing content.
            c if is_breakz(c) => {}
            // ':' can be encountered if our scalar is a key.
            // Outside of flow contexts, keys cannot span multiple lines
            ':' if self.flow_level == 0 && start_mark.line == self.mark().line => {}
            // Inside a flow context, this is allowed.
            ':' if self.flow_level > 0 => {}
            _ => {
                return Err(YamlError::new_ctx(
                    self.mark(),
                    "while scanning a quoted scalar",
                    "invalid trailing content after the closing quote",
                ));
            }
        }

        let style = if single {
            ScalarType::SingleQuote
        } else {
            ScalarType::DoubleQuote
        };
        Ok(Token::new(
            Span::new(start_mark, end_mark),
            TokenType::Scalar {
                scalar_type: style,
                value: string,
            },
        ))
    }

    fn consume_flow_scalar_non_whitespace_chars(
        &mut self,
        single: bool,
        string: &mut String,
        leading_blanks: &mut bool,
        start_mark: &Marker,
    ) -> ScanResult {
        while !self.src.next_is_blank_or_breakz() {
            match self.src.peek() {
                // Check for an escaped single quote.
                '\'' if self.src.peek_n1() == '\'' && single => {
                    string.push('\'');
                    self.skip_n_non_blank(2);
                }
                // Check for the right quote.
                '\'' if single => break,
                '"' if !single => break,
                // Check for an escaped line break.
                '\\' if !single && is_break(self.src.peek_n1()) => {
                    self.skip_non_blank();
                    self.skip_linebreak();
                    *leading_blanks = true;
                    break;
                }
                // Check for an escape sequence.
                '\\' if !single => {
                    let chr = self.resolve_flow_scalar_escape_sequence(start_mark)?;
                    string.push(chr);
                }
                c => {
                    string.push(c);
                    self.skip_non_blank();
                }
            }
        }
        Ok(())
    }

    /// Escape the sequence we encounter in a flow scalar.
    ///
    /// `self.src.peek()` must point to the `\` starting the escape sequence.
    ///
    /// # Errors
    /// Return an error if an invalid escape sequence is found.
    fn resolve_flow_scalar_escape_sequence(&mut self, start_mark: &Marker) -> YamlResult<char> {
        let mut code_length = 0usize;
        let mut ret = '\0';

        match self.src.peek_n1() {
            '0' => ret = '\0',
            'a' => ret = '\x07',
            'b' => ret = '\x08',
            't' | '\t' => ret = '\t',
            'n' => ret = '\n',
            'v' => ret = '\x0b',
            'f' => ret = '\x0c',
            'r' => ret = '\x0d',
            'e' => ret = '\x1b',
            ' ' => ret = '\x20',
            '"' => ret = '"',
            '/' => ret = '/',
            '\\' => ret = '\\',
            // Unicode next line (#x85)
            'N' => ret = '\u{85}',
            // Unicode non-breaking space (#xA0)
            '_' => ret = '\u{A0}',
            // Unicode line separator (#x2028)
            'L' => ret = '\u{2028}',
            // Unicode paragraph separator (#x2029)
            'P' => ret = '\u{2029}',
            'x' => code_length = 2,
            'u' => code_length = 4,
            'U' => code_length = 8,
            _ => {
                return Err(YamlError::new_ctx(
                    *start_mark,
                    "while parsing a quoted scalar",
                    "found unknown escape character",
                ));
            }
        }
        self.skip_n_non_blank(2);

        // Consume an arbitrary escape code.
        if code_length > 0 {
            let mut value = 0u32;
            for i in 0..code_length {
                let Some(digit) = as_hex(self.src.peek_nth(i)) else {
                    return Err(YamlError::new_ctx(
                        *start_mark,
                        "while parsing a quoted scalar",
                        "did not find expected hexadecimal number",
                    ));
                };
                value = (value << 4) + digit;
            }

            let Some(ch) = char::from_u32(value) else {
                return Err(YamlError::new_ctx(
                    *start_mark,
                    "while parsing a quoted scalar",
                    "found invalid Unicode character escape code",
                ));
            };
            ret = ch;

            self.skip_n_non_blank(code_length);
        }
        Ok(ret)
    }

    fn fetch_plain_scalar(&mut self) -> ScanResult {
        self.save_simple_key()?;
        self.disallow_simple_key();

        let token = self.scan_plain_scalar()?;
        self.tokens.push_back(token);
        Ok(())
    }

    fn scan_plain_scalar(&mut self) -> YamlResult<Token> {
        let indent = self.indent + 1;
        let start_mark = self.mark();
        let in_flow = self.flow_level > 0;

        if in_flow && (start_mark.col as isize) < indent {
            return Err(YamlError::new_str(
                start_mark,
                "invalid indentation in flow construct",
            ));
        }

        let mut string = String::new();
        self.buf_whitespaces.clear();
        self.buf_leading_break.clear();
        self.buf_trailing_breaks.clear();
        let mut end_mark = self.mark();

        loop {
            if (self.mark().col == 0 && self.src.next_is_document_indicator())
                || self.src.peek() == '#'
            {
                break;
            }

            if in_flow && self.src.peek() == '-' && is_flow(self.src.peek_n1()) {
                return Err(YamlError::new_str(
                    self.mark(),
                    "plain scalar cannot start with '-' followed by ,[]{}",
                ));
            }

            if !self.src.next_is_blank_or_breakz() && self.src.next_can_be_plain_scalar(in_flow) {
                if self.leading_whitespace {
                    if self.buf_leading_break.is_empty() {
                        string.push_str(&self.buf_trailing_breaks);
                        self.buf_trailing_breaks.clear();
                    } else {
                        if self.buf_trailing_breaks.is_empty() {
                            string.push(' ');
                        } else {
                            string.push_str(&self.buf_trailing_breaks);
                            self.buf_trailing_breaks.clear();
                        }
                        self.buf_leading_break.clear();
                    }
                    self.leading_whitespace = false;
                } else if !self.buf_whitespaces.is_empty() {
                    string.push_str(&self.buf_whitespaces);
                    self.buf_whitespaces.clear();
                }

                // The first character is always part of the scalar.
                string.push(self.src.peek());
                self.skip_non_blank();
                while !self.src.next_is_blank_or_breakz()
                    && self.src.next_can_be_plain_scalar(in_flow)
                {
                    string.push(self.src.peek());
                    self.skip_non_blank();
                }
                end_mark = self.mark();
            }

            // Is it the end?
            if !(self.src.next_is_blank() || self.src.next_is_break()) {
                break;
            }

            while self.src.next_is_blank() || self.src.next_is_break() {
                if self.src.next_is_blank() {
                    if !self.leading_whitespace {
                        self.buf_whitespaces.push(self.src.peek());
                        self.skip_blank();
                    } else if (self.mark().col as isize) < indent && self.src.peek() == '\t' {
                        // Tabs in an indentation columns are allowed if and only if the line is
                        // empty.
                        self.skip_ws_to_eol()?;
                        if !self.src.next_is_breakz() {
                            return Err(YamlError::new_ctx(
                                start_mark,
                                "while scanning a plain scalar",
                                "found a tab",
                            ));
                        }
                    } else {
                        self.skip_blank();
                    }
                } else if self.leading_whitespace {
                    let mut breaks = core::mem::take(&mut self.buf_trailing_breaks);
                    self.read_break(&mut breaks);
                    self.buf_trailing_breaks = breaks;
                } else {
                    self.buf_whitespaces.clear();
                    let mut breaks = core::mem::take(&mut self.buf_leading_break);
                    self.read_break(&mut breaks);
                    self.buf_leading_break = breaks;
                    self.leading_whitespace = true;
                }
            }

            // Check the indentation level.
            if !in_flow && (self.mark().col as isize) < indent {
                break;
            }
        }

        if self.leading_whitespace {
            self.allow_simple_key();
        }

        if string.is_empty() {
            return Err(YamlError::new_ctx(
                start_mark,
                "while scanning a plain scalar",
                "found unexpected end of plain scalar",
            ));
        }

        Ok(Token::new(
            Span::new(start_mark, end_mark),
            TokenType::Scalar {
                scalar_type: ScalarType::Plain,
                value: string,
            },
        ))
    }
}
