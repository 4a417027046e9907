#![no_std]
extern crate alloc;
extern crate core;
extern crate yam_common;

pub use tokenizer::{
    CollectionStart, Event, Parser, ScalarValue, Scanner, Source, StrSource, Token, MAX_FLOW_LEVEL,
    MIN_LOOKAHEAD,
};
pub use yam_common::{CollectionStyle, Marker, ScalarType, Span, Tag, YamlError, YamlResult};

pub mod tokenizer;
