use crate::encoding::EncodingKind;
use crate::event::{CollectionStyle, Mark, ScalarStyle};

/// Receiver of parse events.
///
/// For every event the parser first calls [`Handler::event_location`] with the event's span and
/// then exactly one of the other methods. Every method defaults to doing nothing, so a handler
/// only implements what it cares about.
///
/// Absent anchors and tags are `None`, never empty strings.
pub trait Handler {
    fn event_location(&mut self, _start: Mark, _end: Mark) {}

    fn start_stream(&mut self, _encoding: EncodingKind) {}

    fn end_stream(&mut self) {}

    /// `tags` holds the document's `%TAG` directives as `(handle, prefix)` in source order.
    fn start_document(
        &mut self,
        _version: Option<(u32, u32)>,
        _tags: &[(String, String)],
        _implicit: bool,
    ) {
    }

    fn end_document(&mut self, _implicit: bool) {}

    fn alias(&mut self, _anchor: &str) {}

    fn scalar(
        &mut self,
        _value: &str,
        _anchor: Option<&str>,
        _tag: Option<&str>,
        _plain_implicit: bool,
        _quoted_implicit: bool,
        _style: ScalarStyle,
    ) {
    }

    fn start_sequence(
        &mut self,
        _anchor: Option<&str>,
        _tag: Option<&str>,
        _implicit: bool,
        _style: CollectionStyle,
    ) {
    }

    fn end_sequence(&mut self) {}

    fn start_mapping(
        &mut self,
        _anchor: Option<&str>,
        _tag: Option<&str>,
        _implicit: bool,
        _style: CollectionStyle,
    ) {
    }

    fn end_mapping(&mut self) {}
}

impl<H: Handler + ?Sized> Handler for &mut H {
    fn event_location(&mut self, start: Mark, end: Mark) {
        (**self).event_location(start, end);
    }

    fn start_stream(&mut self, encoding: EncodingKind) {
        (**self).start_stream(encoding);
    }

    fn end_stream(&mut self) {
        (**self).end_stream();
    }

    fn start_document(
        &mut self,
        version: Option<(u32, u32)>,
        tags: &[(String, String)],
        implicit: bool,
    ) {
        (**self).start_document(version, tags, implicit);
    }

    fn end_document(&mut self, implicit: bool) {
        (**self).end_document(implicit);
    }

    fn alias(&mut self, anchor: &str) {
        (**self).alias(anchor);
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
        (**self).scalar(value, anchor, tag, plain_implicit, quoted_implicit, style);
    }

    fn start_sequence(
        &mut self,
        anchor: Option<&str>,
        tag: Option<&str>,
        implicit: bool,
        style: CollectionStyle,
    ) {
        (**self).start_sequence(anchor, tag, implicit, style);
    }

    fn end_sequence(&mut self) {
        (**self).end_sequence();
    }

    fn start_mapping(
        &mut self,
        anchor: Option<&str>,
        tag: Option<&str>,
        implicit: bool,
        style: CollectionStyle,
    ) {
        (**self).start_mapping(anchor, tag, implicit, style);
    }

    fn end_mapping(&mut self) {
        (**self).end_mapping();
    }
}
