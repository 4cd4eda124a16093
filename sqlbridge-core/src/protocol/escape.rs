//! String quoting for envelopes.
//!
//! A quoted string is delimited by `"`. Inside it `"` and `\` are escaped,
//! `\n \r \t \0` cover the common controls and every other control character
//! becomes `\uXXXX`, so an encoded envelope is always a single printable
//! line and any byte sequence a `&str` can hold survives the trip.

use std::fmt::Write as _;

use super::ProtocolError;

/// Appends `text` to `out` as a quoted string literal.
pub fn quote_into(out: &mut String, text: &str) {
    out.reserve(text.len() + 2);
    out.push('"');
    for c in text.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            '\0' => out.push_str("\\0"),
            c if c.is_control() => {
                let _ = write!(out, "\\u{:04x}", u32::from(c));
            }
            c => out.push(c),
        }
    }
    out.push('"');
}

/// Returns `text` as a quoted string literal.
#[must_use]
pub fn quote(text: &str) -> String {
    let mut out = String::new();
    quote_into(&mut out, text);
    out
}

/// Parses a quoted literal at the start of `input`.
///
/// Returns the unescaped text and the remainder after the closing quote.
pub fn unquote(input: &str) -> Result<(String, &str), ProtocolError> {
    let body = input
        .strip_prefix('"')
        .ok_or_else(|| ProtocolError::MalformedCall("expected string literal".to_string()))?;
    let mut out = String::new();
    let mut chars = body.char_indices();
    while let Some((i, c)) = chars.next() {
        match c {
            '"' => return Ok((out, &body[i + 1..])),
            '\\' => {
                let (_, esc) = chars.next().ok_or(ProtocolError::UnterminatedString)?;
                match esc {
                    '"' => out.push('"'),
                    '\\' => out.push('\\'),
                    'n' => out.push('\n'),
                    'r' => out.push('\r'),
                    't' => out.push('\t'),
                    '0' => out.push('\0'),
                    'u' => {
                        let mut hex = String::with_capacity(4);
                        for _ in 0..4 {
                            let (_, h) = chars.next().ok_or(ProtocolError::UnterminatedString)?;
                            hex.push(h);
                        }
                        let decoded = Some(hex.as_str())
                            .filter(|digits| digits.bytes().all(|b| b.is_ascii_hexdigit()))
                            .and_then(|digits| u32::from_str_radix(digits, 16).ok())
                            .and_then(char::from_u32)
                            .ok_or_else(|| ProtocolError::InvalidEscape(format!("\\u{hex}")))?;
                        out.push(decoded);
                    }
                    other => return Err(ProtocolError::InvalidEscape(format!("\\{other}"))),
                }
            }
            c => out.push(c),
        }
    }
    Err(ProtocolError::UnterminatedString)
}

#[cfg(test)]
mod tests {
    use test_case::test_case;

    use super::*;

    #[test_case("" ; "empty")]
    #[test_case("plain" ; "plain")]
    #[test_case("it's \"quoted\"" ; "quotes")]
    #[test_case("back\\slash\\" ; "backslashes")]
    #[test_case("line\nfeed\r\ttab" ; "whitespace controls")]
    #[test_case("nul\0inside" ; "embedded nul")]
    #[test_case("bell\u{7}esc\u{1b}del\u{7f}" ; "other controls")]
    #[test_case("naïve ☃ 🦀" ; "non ascii")]
    #[test_case("a, b) c(\"d\"" ; "envelope punctuation")]
    fn quote_then_unquote(text: &str) {
        let quoted = quote(text);
        assert!(!quoted.contains('\n'));
        let (back, rest) = unquote(&quoted).expect("unquote");
        assert_eq!(back, text);
        assert_eq!(rest, "");
    }

    #[test]
    fn control_chars_use_unicode_escape() {
        assert_eq!(quote("\u{1}"), "\"\\u0001\"");
    }

    #[test]
    fn unquote_returns_remainder() {
        let (text, rest) = unquote("\"a\\\"b\", 7)").expect("unquote");
        assert_eq!(text, "a\"b");
        assert_eq!(rest, ", 7)");
    }

    #[test]
    fn unterminated_literal_fails() {
        assert_eq!(unquote("\"abc"), Err(ProtocolError::UnterminatedString));
        assert_eq!(unquote("\"abc\\"), Err(ProtocolError::UnterminatedString));
    }

    #[test_case(r#""\u+041""# ; "leading plus")]
    #[test_case(r#""\u-041""# ; "leading minus")]
    #[test_case(r#""\u 041""# ; "leading space")]
    #[test_case(r#""\u00g1""# ; "non hex digit")]
    fn unicode_escape_requires_four_hex_digits(input: &str) {
        assert!(matches!(unquote(input), Err(ProtocolError::InvalidEscape(_))));
    }

    #[test]
    fn unknown_escape_fails() {
        assert_eq!(
            unquote("\"\\q\""),
            Err(ProtocolError::InvalidEscape("\\q".to_string()))
        );
        assert!(unquote("\"\\uzzzz\"").is_err());
    }
}
