use yam_common::{CollectionStyle as EngineCollectionStyle, Marker, ScalarType};

use crate::encoding::EncodingKind;
use crate::handler::Handler;

/// Position in the decoded character stream. All fields are 0-based, `index` counts characters.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Mark {
    pub line: usize,
    pub column: usize,
    pub index: usize,
}

impl Mark {
    #[must_use]
    pub const fn new(line: usize, column: usize, index: usize) -> Mark {
        Mark {
            line,
            column,
            index,
        }
    }
}

impl From<Marker> for Mark {
    fn from(marker: Marker) -> Self {
        Mark {
            line: marker.line,
            column: marker.col,
            index: marker.pos,
        }
    }
}

/// Presentation style of a scalar. The ordinals are stable.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum ScalarStyle {
    #[default]
    Any = 0,
    Plain = 1,
    SingleQuoted = 2,
    DoubleQuoted = 3,
    Literal = 4,
    Folded = 5,
}

impl ScalarStyle {
    #[must_use]
    pub fn ordinal(self) -> u8 {
        self as u8
    }
}

impl From<u8> for ScalarStyle {
    fn from(value: u8) -> Self {
        match value {
            1 => ScalarStyle::Plain,
            2 => ScalarStyle::SingleQuoted,
            3 => ScalarStyle::DoubleQuoted,
            4 => ScalarStyle::Literal,
            5 => ScalarStyle::Folded,
            _ => ScalarStyle::Any,
        }
    }
}

impl From<ScalarType> for ScalarStyle {
    fn from(value: ScalarType) -> Self {
        match value {
            ScalarType::Plain => ScalarStyle::Plain,
            ScalarType::SingleQuote => ScalarStyle::SingleQuoted,
            ScalarType::DoubleQuote => ScalarStyle::DoubleQuoted,
            ScalarType::Literal => ScalarStyle::Literal,
            ScalarType::Folded => ScalarStyle::Folded,
            _ => ScalarStyle::Any,
        }
    }
}

/// Presentation style of a sequence or mapping. The ordinals are stable.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum CollectionStyle {
    #[default]
    Any = 0,
    Block = 1,
    Flow = 2,
}

impl CollectionStyle {
    #[must_use]
    pub fn ordinal(self) -> u8 {
        self as u8
    }
}

impl From<u8> for CollectionStyle {
    fn from(value: u8) -> Self {
        match value {
            1 => CollectionStyle::Block,
            2 => CollectionStyle::Flow,
            _ => CollectionStyle::Any,
        }
    }
}

impl From<EngineCollectionStyle> for CollectionStyle {
    fn from(value: EngineCollectionStyle) -> Self {
        match value {
            EngineCollectionStyle::Block => CollectionStyle::Block,
            EngineCollectionStyle::Flow => CollectionStyle::Flow,
            _ => CollectionStyle::Any,
        }
    }
}

/// An engine event as the handler sees it.
///
/// Borrows from the engine token and lives for a single dispatch.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Event<'t> {
    StreamStart {
        encoding: EncodingKind,
    },
    StreamEnd,
    DocumentStart {
        version: Option<(u32, u32)>,
        tags: &'t [(String, String)],
        implicit: bool,
    },
    DocumentEnd {
        implicit: bool,
    },
    Alias {
        anchor: &'t str,
    },
    Scalar {
        value: &'t str,
        anchor: Option<&'t str>,
        tag: Option<&'t str>,
        plain_implicit: bool,
        quoted_implicit: bool,
        style: ScalarStyle,
    },
    SequenceStart {
        anchor: Option<&'t str>,
        tag: Option<&'t str>,
        implicit: bool,
        style: CollectionStyle,
    },
    SequenceEnd,
    MappingStart {
        anchor: Option<&'t str>,
        tag: Option<&'t str>,
        implicit: bool,
        style: CollectionStyle,
    },
    MappingEnd,
}

impl<'t> Event<'t> {
    /// Translates an engine event. `StreamStart` always reports `encoding`.
    pub(crate) fn translate(event: &'t yam_core::Event, encoding: EncodingKind) -> Event<'t> {
        match event {
            yam_core::Event::StreamStart => Event::StreamStart { encoding },
            yam_core::Event::StreamEnd => Event::StreamEnd,
            yam_core::Event::DocumentStart {
                version,
                tags,
                explicit,
            } => Event::DocumentStart {
                version: *version,
                tags,
                implicit: !explicit,
            },
            yam_core::Event::DocumentEnd { explicit } => Event::DocumentEnd {
                implicit: !explicit,
            },
            yam_core::Event::Alias(anchor) => Event::Alias { anchor },
            yam_core::Event::Scalar(scalar) => Event::Scalar {
                value: &scalar.value,
                anchor: scalar.anchor.as_deref(),
                tag: scalar.tag.as_deref(),
                plain_implicit: scalar.plain_implicit,
                quoted_implicit: scalar.quoted_implicit,
                style: scalar.style.into(),
            },
            yam_core::Event::SequenceStart(start) => Event::SequenceStart {
                anchor: start.anchor.as_deref(),
                tag: start.tag.as_deref(),
                implicit: start.implicit,
                style: start.style.into(),
            },
            yam_core::Event::SequenceEnd => Event::SequenceEnd,
            yam_core::Event::MappingStart(start) => Event::MappingStart {
                anchor: start.anchor.as_deref(),
                tag: start.tag.as_deref(),
                implicit: start.implicit,
                style: start.style.into(),
            },
            yam_core::Event::MappingEnd => Event::MappingEnd,
        }
    }

    /// Makes the one protocol call matching this event.
    pub fn dispatch<H: Handler + ?Sized>(&self, handler: &mut H) {
        match *self {
            Event::StreamStart { encoding } => handler.start_stream(encoding),
            Event::StreamEnd => handler.end_stream(),
            Event::DocumentStart {
                version,
                tags,
                implicit,
            } => handler.start_document(version, tags, implicit),
            Event::DocumentEnd { implicit } => handler.end_document(implicit),
            Event::Alias { anchor } => handler.alias(anchor),
            Event::Scalar {
                value,
                anchor,
                tag,
                plain_implicit,
                quoted_implicit,
                style,
            } => handler.scalar(value, anchor, tag, plain_implicit, quoted_implicit, style),
            Event::SequenceStart {
                anchor,
                tag,
                implicit,
                style,
            } => handler.start_sequence(anchor, tag, implicit, style),
            Event::SequenceEnd => handler.end_sequence(),
            Event::MappingStart {
                anchor,
                tag,
                implicit,
                style,
            } => handler.start_mapping(anchor, tag, implicit, style),
            Event::MappingEnd => handler.end_mapping(),
        }
    }
}
