#[inline]
#[must_use]
pub(crate) fn is_anchor_char(c: char) -> bool {
    is_yaml_non_space(c) && !is_flow(c) && c != '\0'
}

#[inline]
#[must_use]
pub(crate) fn is_yaml_non_space(c: char) -> bool {
    !is_blank(c) && !is_break(c)
}

#[inline]
#[must_use]
pub(crate) fn is_word_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '-'
}

#[inline]
#[must_use]
pub(crate) fn is_blank_or_breakz(c: char) -> bool {
    c == '\0' || is_blank(c) || is_break(c)
}

/// Check whether the character is a valid URI character.
#[inline]
#[must_use]
pub(crate) fn is_uri_char(c: char) -> bool {
    is_word_char(c) || "#;/?:@&=+$,_.!~*\'()[]%".contains(c)
}

#[inline]
#[must_use]
pub(crate) fn is_break(c: char) -> bool {
    c == '\r' || c == '\n'
}

#[inline]
#[must_use]
pub(crate) fn is_breakz(c: char) -> bool {
    c == '\r' || c == '\n' || c == '\0'
}

#[inline]
#[must_use]
pub(crate) fn is_blank(c: char) -> bool {
    c == ' ' || c == '\t'
}

#[inline]
#[must_use]
pub(crate) fn is_flow(c: char) -> bool {
    matches!(c, ',' | '[' | ']' | '{' | '}')
}

#[inline]
#[must_use]
pub(crate) fn is_tag_char(c: char) -> bool {
    is_uri_char(c) && !is_flow(c) && c != '!'
}

#[inline]
#[must_use]
pub fn is_alpha(c: char) -> bool {
    matches!(c, '0'..='9' | 'a'..='z' | 'A'..='Z' | '_' | '-')
}

/// Value of a hexadecimal digit, `None` for anything else.
#[inline]
#[must_use]
pub fn as_hex(c: char) -> Option<u32> {
    c.to_digit(16)
}
