//! Textual YEAST regression stream format (`spec.md` §6).
//!
//! One token per line: a single ASCII code letter ([`crate::token::code_letter`])
//! followed by the token's escaped payload, if it carries one. Non-printable
//! and non-ASCII bytes in the payload are escaped as `\xNN` (single byte),
//! `\uNNNN` (BMP scalar), or `\UNNNNNNNN` (astral scalar); `\\` and `\n`
//! escape themselves so the format stays line-oriented.
//!
//! Grounded in `spec.md` §6's description of the `yip_test`/`yaml-test-suite`
//! companion tool's output format; there is no retrievable reference source
//! for it in `original_source/`, so the escaping scheme below is this
//! crate's own literal reading of that section.

use crate::encoding::Encoding;
use crate::token::{code_letter, Code, Token};

/// Render one token as a single YEAST line (no trailing newline).
pub fn format_token(token: &Token, encoding: Encoding) -> String {
    let letter = code_letter(token.code);
    let mut line = String::new();
    if letter != '\0' {
        line.push(letter);
    }
    match token.code {
        Code::Bom
        | Code::Comment
        | Code::Error
        | Code::Break
        | Code::DocumentEnd
        | Code::DocumentStart
        | Code::Indent
        | Code::Indicator
        | Code::LineFeed
        | Code::LineFold
        | Code::Meta
        | Code::Text
        | Code::Unparsed
        | Code::White => {
            let text = token.text_as_str(encoding);
            escape_into(&text, &mut line);
        }
        _ => {}
    }
    line
}

/// Render a whole token stream, one line per token, newline-terminated.
pub fn format_stream<'a>(tokens: impl IntoIterator<Item = &'a Token>, encoding: Encoding) -> String {
    let mut out = String::new();
    for token in tokens {
        out.push_str(&format_token(token, encoding));
        out.push('\n');
    }
    out
}

fn escape_into(text: &str, out: &mut String) {
    for c in text.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            c if (0x20..=0x7E).contains(&(c as u32)) => out.push(c),
            c if (c as u32) <= 0xFF => out.push_str(&format!("\\x{:02x}", c as u32)),
            c if (c as u32) <= 0xFFFF => out.push_str(&format!("\\u{:04x}", c as u32)),
            c => out.push_str(&format!("\\U{:08x}", c as u32)),
        }
    }
}

/// Parse escape sequences back into the original text, the inverse of
/// [`escape_into`]. Used by regression tests that round-trip fixture files.
pub fn unescape(text: &str) -> String {
    let mut out = String::new();
    let mut chars = text.chars().peekable();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('\\') => out.push('\\'),
            Some('n') => out.push('\n'),
            Some('x') => out.push(take_hex_escape(&mut chars, 2)),
            Some('u') => out.push(take_hex_escape(&mut chars, 4)),
            Some('U') => out.push(take_hex_escape(&mut chars, 8)),
            Some(other) => out.push(other),
            None => {}
        }
    }
    out
}

fn take_hex_escape(chars: &mut std::iter::Peekable<std::str::Chars>, digits: usize) -> char {
    let mut value = 0u32;
    for _ in 0..digits {
        if let Some(d) = chars.next().and_then(|c| c.to_digit(16)) {
            value = (value << 4) | d;
        }
    }
    char::from_u32(value).unwrap_or('\u{FFFD}')
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::token::Position;

    #[test]
    fn match_token_renders_letter_and_escaped_payload() {
        let token = Token::matched(
            Code::Text,
            Position::START,
            Position::START,
            b"hello".to_vec(),
        );
        assert_eq!(format_token(&token, Encoding::Utf8), "Thello");
    }

    #[test]
    fn begin_token_renders_bare_letter() {
        let token = Token::begin(Code::BeginSequence, Position::START);
        assert_eq!(format_token(&token, Encoding::Utf8), "Q");
    }

    #[test]
    fn done_token_renders_empty_line() {
        let token = Token::fake(Code::Done, Position::START, "");
        assert_eq!(format_token(&token, Encoding::Utf8), "");
    }

    #[test]
    fn non_printable_bytes_are_escaped() {
        let token = Token::matched(
            Code::Text,
            Position::START,
            Position::START,
            vec![0x01, b'a'],
        );
        assert_eq!(format_token(&token, Encoding::Utf8), "T\\x01a");
    }

    #[test]
    fn escape_and_unescape_round_trip() {
        let mut escaped = String::new();
        escape_into("a\\b\nc\u{1F600}", &mut escaped);
        assert_eq!(unescape(&escaped), "a\\b\nc\u{1F600}");
    }
}
