use alloc::string::String;
use alloc::vec::Vec;
use core::fmt::{Display, Formatter};
use yam_common::{CollectionStyle, ScalarType};

/// A structural event produced by the [`Parser`](crate::tokenizer::Parser).
#[derive(Clone, PartialEq, Debug, Eq)]
pub enum Event {
    StreamStart,
    StreamEnd,
    DocumentStart {
        /// `%YAML` directive of the document.
        version: Option<(u32, u32)>,
        /// `%TAG` directives as `(handle, prefix)`, in the order they appear.
        tags: Vec<(String, String)>,
        /// Whether the document starts with `---`.
        explicit: bool,
    },
    DocumentEnd {
        /// Whether the document ends with `...`.
        explicit: bool,
    },
    Alias(String),
    Scalar(ScalarValue),
    SequenceStart(CollectionStart),
    SequenceEnd,
    MappingStart(CollectionStart),
    MappingEnd,
}

#[derive(Clone, PartialEq, Debug, Eq)]
pub struct ScalarValue {
    pub value: String,
    pub anchor: Option<String>,
    /// Fully resolved tag, e.g. `tag:yaml.org,2002:str`.
    pub tag: Option<String>,
    pub plain_implicit: bool,
    pub quoted_implicit: bool,
    pub style: ScalarType,
}

impl ScalarValue {
    pub(crate) fn empty(anchor: Option<String>, tag: Option<String>) -> ScalarValue {
        ScalarValue {
            value: String::new(),
            plain_implicit: tag.is_none(),
            quoted_implicit: false,
            anchor,
            tag,
            style: ScalarType::Plain,
        }
    }
}

#[derive(Clone, PartialEq, Debug, Eq)]
pub struct CollectionStart {
    pub anchor: Option<String>,
    pub tag: Option<String>,
    pub implicit: bool,
    pub style: CollectionStyle,
}

fn write_props(
    f: &mut Formatter<'_>,
    anchor: &Option<String>,
    tag: &Option<String>,
) -> core::fmt::Result {
    if let Some(anchor) = anchor {
        write!(f, " &{anchor}")?;
    }
    if let Some(tag) = tag {
        write!(f, " <{tag}>")?;
    }
    Ok(())
}

fn write_escaped(f: &mut Formatter<'_>, value: &str) -> core::fmt::Result {
    for ch in value.chars() {
        match ch {
            '\\' => f.write_str("\\\\")?,
            '\0' => f.write_str("\\0")?,
            '\x08' => f.write_str("\\b")?,
            '\n' => f.write_str("\\n")?,
            '\r' => f.write_str("\\r")?,
            '\t' => f.write_str("\\t")?,
            c => write!(f, "{c}")?,
        }
    }
    Ok(())
}

/// Renders the event in the line format of the yaml-test-suite.
impl Display for Event {
    fn fmt(&self, f: &mut Formatter<'_>) -> core::fmt::Result {
        match self {
            Event::StreamStart => write!(f, "+STR"),
            Event::StreamEnd => write!(f, "-STR"),
            Event::DocumentStart { explicit: true, .. } => write!(f, "+DOC ---"),
            Event::DocumentStart { explicit: false, .. } => write!(f, "+DOC"),
            Event::DocumentEnd { explicit: true } => write!(f, "-DOC ..."),
            Event::DocumentEnd { explicit: false } => write!(f, "-DOC"),
            Event::Alias(name) => write!(f, "=ALI *{name}"),
            Event::Scalar(scalar) => {
                write!(f, "=VAL")?;
                write_props(f, &scalar.anchor, &scalar.tag)?;
                write!(f, " {}", scalar.style)?;
                write_escaped(f, &scalar.value)
            }
            Event::SequenceStart(start) => {
                write!(f, "+SEQ")?;
                if start.style == CollectionStyle::Flow {
                    write!(f, " []")?;
                }
                write_props(f, &start.anchor, &start.tag)
            }
            Event::SequenceEnd => write!(f, "-SEQ"),
            Event::MappingStart(start) => {
                write!(f, "+MAP")?;
                if start.style == CollectionStyle::Flow {
                    write!(f, " {{}}")?;
                }
                write_props(f, &start.anchor, &start.tag)
            }
            Event::MappingEnd => write!(f, "-MAP"),
        }
    }
}
