mod char_utils;
mod event;
mod parser;
mod scanner;
mod source;

pub use event::{CollectionStart, Event, ScalarValue};
pub use parser::Parser;
pub use scanner::{Scanner, Token, MAX_FLOW_LEVEL};
pub use source::{Source, StrSource, MIN_LOOKAHEAD};
