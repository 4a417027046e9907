//! Streaming YAML parsing into handler callbacks.
//!
//! The input's encoding is resolved first, then the `yam-core` engine runs over a
//! position-tracking reader and every structural event it recognizes is handed to a [`Handler`]:
//! one [`Handler::event_location`] call followed by one protocol call.
//!
//! ```
//! use yam_stream::{parse, Handler, ScalarStyle};
//!
//! #[derive(Default)]
//! struct Scalars(Vec<String>);
//!
//! impl Handler for Scalars {
//!     fn scalar(
//!         &mut self,
//!         value: &str,
//!         _anchor: Option<&str>,
//!         _tag: Option<&str>,
//!         _plain_implicit: bool,
//!         _quoted_implicit: bool,
//!         _style: ScalarStyle,
//!     ) {
//!         self.0.push(value.to_string());
//!     }
//! }
//!
//! let mut scalars = Scalars::default();
//! parse(&mut scalars, "- 1\n- two\n", None).unwrap();
//! assert_eq!(scalars.0, ["1", "two"]);
//! ```

mod encoding;
mod engine;
mod error;
mod event;
mod handler;
mod parser;
mod reader;

pub use encoding::{EncodingKind, Input};
pub use engine::{EngineError, GrammarEngine, Token, YamEngine};
pub use error::{EncodingError, ParseError, ParseFailure};
pub use event::{CollectionStyle, Event, Mark, ScalarStyle};
pub use handler::Handler;
pub use parser::{parse, ParseOptions, Parser, Session};
pub use reader::{ReadFailure, TrackedReader};
