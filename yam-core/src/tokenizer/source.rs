use crate::tokenizer::char_utils::{
    is_alpha, is_blank, is_blank_or_breakz, is_break, is_breakz, is_flow,
};
use yam_common::Marker;

/// Number of characters a [`Source`] must be able to look ahead.
///
/// The deepest peek the scanner performs is a `\UXXXXXXXX` escape sequence.
pub const MIN_LOOKAHEAD: usize = 12;

///
/// A character source for the [`Scanner`](crate::tokenizer::Scanner), with methods for
/// peeking at and skipping upcoming characters.
///
/// Implementors only provide the four primitives: [`Source::peek_nth`], [`Source::skip`],
/// [`Source::mark`] and [`Source::next_is_z`]. Everything else is derived from them.
///
/// # Peeking
/// - `peek_nth(n)` returns the character `n` positions ahead, `'\0'` past the end of input.
///   Sources must honour at least [`MIN_LOOKAHEAD`] characters.
/// - `peek()`, `peek_n1()`, `peek_n2()`, `peek_n3()` are shorthands.
///
/// # Position
/// - `mark()` is the position of the next character. The source owns position tracking, so
///   line and column always agree with what was actually consumed.
///
/// # Flow and Blank/Break Checks
/// - `next_is_flow()`, `next_is_break()`, `next_is_blank()`, `next_is_breakz()`,
///   `next_is_blank_or_breakz()` classify the next character.
pub trait Source {
    #[must_use]
    fn peek_nth(&self, n: usize) -> char;

    /// Consumes one character.
    fn skip(&mut self);

    #[must_use]
    fn mark(&self) -> Marker;

    /// Whether the input is exhausted.
    #[must_use]
    fn next_is_z(&self) -> bool;

    #[must_use]
    #[cfg_attr(not(feature = "no-inline"), inline)]
    fn peek(&self) -> char {
        self.peek_nth(0)
    }

    #[must_use]
    #[cfg_attr(not(feature = "no-inline"), inline)]
    fn peek_n1(&self) -> char {
        self.peek_nth(1)
    }

    #[must_use]
    #[cfg_attr(not(feature = "no-inline"), inline)]
    fn peek_n2(&self) -> char {
        self.peek_nth(2)
    }

    #[must_use]
    #[cfg_attr(not(feature = "no-inline"), inline)]
    fn peek_n3(&self) -> char {
        self.peek_nth(3)
    }

    fn skip_n(&mut self, count: usize) {
        for _ in 0..count {
            self.skip();
        }
    }

    fn skip_while_blank(&mut self) -> usize {
        let mut n_chars = 0;
        while is_blank(self.peek()) {
            n_chars += 1;
            self.skip();
        }
        n_chars
    }

    fn next_is_three(&self, chr: char) -> bool {
        self.peek() == chr && self.peek_n1() == chr && self.peek_n2() == chr
    }

    #[must_use]
    #[cfg_attr(not(feature = "no-inline"), inline)]
    fn next_is_flow(&self) -> bool {
        is_flow(self.peek())
    }

    #[must_use]
    #[cfg_attr(not(feature = "no-inline"), inline)]
    fn next_is_break(&self) -> bool {
        is_break(self.peek())
    }

    #[must_use]
    #[cfg_attr(not(feature = "no-inline"), inline)]
    fn next_is_blank(&self) -> bool {
        is_blank(self.peek())
    }

    #[must_use]
    #[cfg_attr(not(feature = "no-inline"), inline)]
    fn next_is_breakz(&self) -> bool {
        is_breakz(self.peek())
    }

    #[must_use]
    #[cfg_attr(not(feature = "no-inline"), inline)]
    fn next_is_blank_or_breakz(&self) -> bool {
        is_blank_or_breakz(self.peek())
    }

    fn next_can_be_plain_scalar(&self, in_flow: bool) -> bool {
        let nc = self.peek_n1();
        match self.peek() {
            // indicators can end a plain scalar, see 7.3.3. Plain Style
            ':' if is_blank_or_breakz(nc) || (in_flow && is_flow(nc)) => false,
            c if in_flow && is_flow(c) => false,
            _ => true,
        }
    }

    /// `---` or `...` followed by a blank, a break or the end of input.
    fn next_is_document_indicator(&self) -> bool {
        (self.next_is_three('-') || self.next_is_three('.')) && is_blank_or_breakz(self.peek_n3())
    }

    fn next_is_document_start(&self) -> bool {
        self.next_is_three('-') && is_blank_or_breakz(self.peek_n3())
    }

    fn next_is_document_end(&self) -> bool {
        self.next_is_three('.') && is_blank_or_breakz(self.peek_n3())
    }

    fn next_is_alpha(&self) -> bool {
        is_alpha(self.peek())
    }
}

/// A [`Source`] over an in-memory string.
pub struct StrSource<'input> {
    input: &'input str,
    pos: usize,
    mark: Marker,
}

impl StrSource<'_> {
    pub fn new(input: &str) -> StrSource<'_> {
        StrSource {
            input,
            pos: 0,
            mark: Marker::default(),
        }
    }
}

impl Source for StrSource<'_> {
    fn peek_nth(&self, n: usize) -> char {
        self.input[self.pos..].chars().nth(n).unwrap_or('\0')
    }

    fn skip(&mut self) {
        let mut chars = self.input[self.pos..].chars();
        if let Some(ch) = chars.next() {
            self.pos += ch.len_utf8();
            self.mark.advance(ch, chars.next().unwrap_or('\0'));
        }
    }

    fn mark(&self) -> Marker {
        self.mark
    }

    fn next_is_z(&self) -> bool {
        self.pos >= self.input.len()
    }
}

#[cfg(test)]
mod test {
    use crate::tokenizer::source::{Source, StrSource};
    use yam_common::Marker;

    const TEST_STR: &str = "  ab\r\n\tcé\n---\n";

    #[test]
    fn test_str_source() {
        let mut x = StrSource::new(TEST_STR);
        assert_eq!(x.skip_while_blank(), 2);
        assert!(x.next_is_alpha());
        assert_eq!(x.peek_n2(), '\r');
        x.skip_n(4);
        assert_eq!(x.mark(), Marker::new(6, 1, 0));
        assert_eq!(x.peek(), '\t');
        x.skip_n(4);
        assert_eq!(x.mark(), Marker::new(10, 2, 0));
        assert!(x.next_is_document_start());
        assert!(x.next_is_document_indicator());
        assert!(!x.next_is_document_end());
        x.skip_n(4);
        assert!(x.next_is_z());
        assert_eq!(x.peek(), '\0');
    }

    #[test]
    fn test_plain_scalar_boundaries() {
        let x = StrSource::new(": a");
        assert!(!x.next_can_be_plain_scalar(false));
        let x = StrSource::new(":a");
        assert!(x.next_can_be_plain_scalar(false));
        let x = StrSource::new(":]");
        assert!(x.next_can_be_plain_scalar(false));
        assert!(!x.next_can_be_plain_scalar(true));
        let x = StrSource::new(",");
        assert!(!x.next_can_be_plain_scalar(true));
    }
}
