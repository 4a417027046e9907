#![allow(dead_code)]

use std::fmt::Write;

use pretty_assertions::assert_eq;
use yam_stream::{
    parse, CollectionStyle, EncodingKind, Handler, Input, Mark, ParseError, ParseOptions, Parser,
    ScalarStyle,
};

/// One handler call, as recorded by [`Recorder`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Call {
    StartStream(EncodingKind),
    EndStream,
    StartDocument {
        version: Option<(u32, u32)>,
        tags: Vec<(String, String)>,
        implicit: bool,
    },
    EndDocument(bool),
    Alias(String),
    Scalar {
        value: String,
        anchor: Option<String>,
        tag: Option<String>,
        plain_implicit: bool,
        quoted_implicit: bool,
        style: ScalarStyle,
    },
    StartSequence {
        anchor: Option<String>,
        tag: Option<String>,
        implicit: bool,
        style: CollectionStyle,
    },
    EndSequence,
    StartMapping {
        anchor: Option<String>,
        tag: Option<String>,
        implicit: bool,
        style: CollectionStyle,
    },
    EndMapping,
}

/// Handler keeping every call and the location reported before it.
#[derive(Default)]
pub struct Recorder {
    pub calls: Vec<Call>,
    pub locations: Vec<(Mark, Mark)>,
    /// Calls made without a preceding `event_location`.
    pub unlocated: usize,
}

impl Recorder {
    fn push(&mut self, call: Call) {
        if self.locations.len() != self.calls.len() + 1 {
            self.unlocated += 1;
        }
        self.calls.push(call);
    }

    /// The calls in the line format of the yaml-test-suite, one `\n`-prefixed line per call.
    pub fn lines(&self) -> String {
        let mut out = String::new();
        for call in &self.calls {
            out.push('\n');
            write_call(&mut out, call);
        }
        out
    }

    pub fn scalars(&self) -> Vec<&str> {
        self.calls
            .iter()
            .filter_map(|call| match call {
                Call::Scalar { value, .. } => Some(value.as_str()),
                _ => None,
            })
            .collect()
    }
}

fn owned(value: Option<&str>) -> Option<String> {
    value.map(str::to_string)
}

impl Handler for Recorder {
    fn event_location(&mut self, start: Mark, end: Mark) {
        self.locations.push((start, end));
    }

    fn start_stream(&mut self, encoding: EncodingKind) {
        self.push(Call::StartStream(encoding));
    }

    fn end_stream(&mut self) {
        self.push(Call::EndStream);
    }

    fn start_document(
        &mut self,
        version: Option<(u32, u32)>,
        tags: &[(String, String)],
        implicit: bool,
    ) {
        self.push(Call::StartDocument {
            version,
            tags: tags.to_vec(),
            implicit,
        });
    }

    fn end_document(&mut self, implicit: bool) {
        self.push(Call::EndDocument(implicit));
    }

    fn alias(&mut self, anchor: &str) {
        self.push(Call::Alias(anchor.to_string()));
    }

    fn scalar(
        &mut self,
        value: &str,
        anchor: Option<&str>,
        tag: Option<&str>,
        plain_implicit: bool,
        quoted_implicit: bool,
        style: ScalarStyle,
    ) {
        self.push(Call::Scalar {
            value: value.to_string(),
            anchor: owned(anchor),
            tag: owned(tag),
            plain_implicit,
            quoted_implicit,
            style,
        });
    }

    fn start_sequence(
        &mut self,
        anchor: Option<&str>,
        tag: Option<&str>,
        implicit: bool,
        style: CollectionStyle,
    ) {
        self.push(Call::StartSequence {
            anchor: owned(anchor),
            tag: owned(tag),
            implicit,
            style,
        });
    }

    fn end_sequence(&mut self) {
        self.push(Call::EndSequence);
    }

    fn start_mapping(
        &mut self,
        anchor: Option<&str>,
        tag: Option<&str>,
        implicit: bool,
        style: CollectionStyle,
    ) {
        self.push(Call::StartMapping {
            anchor: owned(anchor),
            tag: owned(tag),
            implicit,
            style,
        });
    }

    fn end_mapping(&mut self) {
        self.push(Call::EndMapping);
    }
}

fn write_props(out: &mut String, anchor: &Option<String>, tag: &Option<String>) {
    if let Some(anchor) = anchor {
        let _ = write!(out, " &{anchor}");
    }
    if let Some(tag) = tag {
        let _ = write!(out, " <{tag}>");
    }
}

fn write_call(out: &mut String, call: &Call) {
    match call {
        Call::StartStream(_) => out.push_str("+STR"),
        Call::EndStream => out.push_str("-STR"),
        Call::StartDocument { implicit: true, .. } => out.push_str("+DOC"),
        Call::StartDocument { implicit: false, .. } => out.push_str("+DOC ---"),
        Call::EndDocument(true) => out.push_str("-DOC"),
        Call::EndDocument(false) => out.push_str("-DOC ..."),
        Call::Alias(anchor) => {
            let _ = write!(out, "=ALI *{anchor}");
        }
        Call::Scalar {
            value,
            anchor,
            tag,
            style,
            ..
        } => {
            out.push_str("=VAL");
            write_props(out, anchor, tag);
            out.push(' ');
            out.push(match style {
                ScalarStyle::SingleQuoted => '\'',
                ScalarStyle::DoubleQuoted => '"',
                ScalarStyle::Literal => '|',
                ScalarStyle::Folded => '>',
                ScalarStyle::Plain | ScalarStyle::Any => ':',
            });
            out.push_str(&escape_event_text(value));
        }
        Call::StartSequence {
            anchor, tag, style, ..
        } => {
            out.push_str("+SEQ");
            if *style == CollectionStyle::Flow {
                out.push_str(" []");
            }
            write_props(out, anchor, tag);
        }
        Call::EndSequence => out.push_str("-SEQ"),
        Call::StartMapping {
            anchor, tag, style, ..
        } => {
            out.push_str("+MAP");
            if *style == CollectionStyle::Flow {
                out.push_str(" {}");
            }
            write_props(out, anchor, tag);
        }
        Call::EndMapping => out.push_str("-MAP"),
    }
}

/// Escapes scalar text the way yaml-test-suite event files do.
pub fn escape_event_text(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for ch in value.chars() {
        match ch {
            '\\' => out.push_str("\\\\"),
            '\0' => out.push_str("\\0"),
            '\x08' => out.push_str("\\b"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            c => out.push(c),
        }
    }
    out
}

/// Serializes `value` as a double quoted YAML scalar.
pub fn double_quoted(value: &str) -> String {
    let mut out = String::with_capacity(value.len() + 2);
    out.push('"');
    for ch in value.chars() {
        match ch {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\t' => out.push_str("\\t"),
            '\r' => out.push_str("\\r"),
            '\0' => out.push_str("\\0"),
            '\u{85}' => out.push_str("\\N"),
            '\u{A0}' => out.push_str("\\_"),
            '\u{2028}' => out.push_str("\\L"),
            '\u{2029}' => out.push_str("\\P"),
            c if c < ' ' || ('\u{7F}'..='\u{9F}').contains(&c) => {
                let _ = write!(out, "\\x{:02X}", c as u32);
            }
            '\u{FFFE}' | '\u{FFFF}' => {
                let _ = write!(out, "\\u{:04X}", ch as u32);
            }
            c => out.push(c),
        }
    }
    out.push('"');
    out
}

/// Records a whole parse, `Err` included.
pub fn record<'a>(
    input: impl Into<Input<'a>>,
    options: ParseOptions,
) -> (Recorder, Result<(), ParseError>) {
    let mut recorder = Recorder::default();
    let result = Parser::with_options(options).parse(&mut recorder, input, None);
    (recorder, result)
}

///
/// Assert that for given input, the handler receives the expected calls, rendered as lines.
/// A failed parse appends a final `ERR` line.
///
/// # Panics
///
///    Function panics if there is a difference between expected events string and one generated
///    from the input.
pub fn assert_eq_events(input: &str, events: &str) {
    let mut recorder = Recorder::default();
    let result = parse(&mut recorder, input, None);
    let mut line = recorder.lines();
    if result.is_err() {
        line.push_str("\nERR");
    }
    assert_eq!(line, events, "Error in {input:?}");
    assert_eq!(recorder.unlocated, 0);
}

pub fn assert_eq_events_with(input: &str, options: ParseOptions, events: &str) {
    let (recorder, result) = record(input, options);
    let mut line = recorder.lines();
    if result.is_err() {
        line.push_str("\nERR");
    }
    assert_eq!(line, events, "Error in {input:?}");
}

/// Checks the structural properties every successful parse has.
pub fn assert_well_formed(recorder: &Recorder) {
    assert!(matches!(recorder.calls.first(), Some(Call::StartStream(_))));
    assert_eq!(recorder.calls.last(), Some(&Call::EndStream));
    assert_eq!(recorder.locations.len(), recorder.calls.len());

    let mut open = Vec::new();
    for call in &recorder.calls {
        match call {
            Call::StartDocument { .. } => open.push("DOC"),
            Call::StartSequence { .. } => open.push("SEQ"),
            Call::StartMapping { .. } => open.push("MAP"),
            Call::EndDocument(_) => assert_eq!(open.pop(), Some("DOC")),
            Call::EndSequence => assert_eq!(open.pop(), Some("SEQ")),
            Call::EndMapping => assert_eq!(open.pop(), Some("MAP")),
            _ => {}
        }
    }
    assert!(open.is_empty(), "unclosed {open:?}");

    let starts: Vec<usize> = recorder
        .locations
        .iter()
        .map(|(start, _)| start.index)
        .collect();
    assert!(
        starts.windows(2).all(|pair| pair[0] <= pair[1]),
        "event starts go backwards: {starts:?}"
    );
    for (start, end) in &recorder.locations {
        assert!(start.index <= end.index);
    }
}
