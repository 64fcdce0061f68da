//! Token Accumulator data model (`spec.md` §3, §4.6).
//!
//! `Code` is a 1:1 rename of `yip.h`'s `YIP_CODE` enum into idiomatic Rust
//! variants; `code_type`/`code_pair` are direct ports of `yip_code_type`/
//! `yip_code_pair` from `yip.c`.

use std::borrow::Cow;

use crate::encoding::Encoding;

/// One of the ~45 YEAST token codes (`spec.md` §3 "code").
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Code {
    BeginAlias,
    BeginAnchor,
    BeginComment,
    BeginDirective,
    BeginDocument,
    BeginEscape,
    BeginHandle,
    BeginMapping,
    BeginNode,
    BeginPair,
    BeginProperties,
    BeginScalar,
    BeginSequence,
    BeginTag,

    EndAlias,
    EndAnchor,
    EndComment,
    EndDirective,
    EndDocument,
    EndEscape,
    EndHandle,
    EndMapping,
    EndNode,
    EndPair,
    EndProperties,
    EndScalar,
    EndSequence,
    EndTag,

    Break,
    DocumentEnd,
    DocumentStart,
    Indent,
    Indicator,
    LineFeed,
    LineFold,
    Meta,
    Text,
    Unparsed,
    White,

    Bom,
    Comment,
    Done,
    Error,
}

/// Partition of [`Code`] into the four token-type classes (`spec.md` §3).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CodeType {
    Begin,
    End,
    Match,
    Fake,
}

/// Classifies `code` into one of the four token-type classes, per
/// `yip_code_type` in `yip.c`.
pub fn code_type(code: Code) -> CodeType {
    use Code::*;
    match code {
        BeginAlias | BeginAnchor | BeginComment | BeginDirective | BeginDocument
        | BeginEscape | BeginHandle | BeginMapping | BeginNode | BeginPair
        | BeginProperties | BeginScalar | BeginSequence | BeginTag => CodeType::Begin,

        EndAlias | EndAnchor | EndComment | EndDirective | EndDocument | EndEscape
        | EndHandle | EndMapping | EndNode | EndPair | EndProperties | EndScalar
        | EndSequence | EndTag => CodeType::End,

        Break | DocumentEnd | DocumentStart | Indent | Indicator | LineFeed | LineFold
        | Meta | Text | Unparsed | White => CodeType::Match,

        Bom | Comment | Done | Error => CodeType::Fake,
    }
}

/// Returns the matching `Begin`/`End` code for a paired code, per
/// `yip_code_pair`. Panics if `code` is not a `Begin`/`End` code — callers
/// (`begin_token`/`end_token`) only ever invoke this on codes they know are
/// paired, matching `yip_code_pair`'s `assert`-guarded contract.
pub fn code_pair(code: Code) -> Code {
    use Code::*;
    match code {
        BeginAlias => EndAlias,
        BeginAnchor => EndAnchor,
        BeginComment => EndComment,
        BeginDirective => EndDirective,
        BeginDocument => EndDocument,
        BeginEscape => EndEscape,
        BeginHandle => EndHandle,
        BeginMapping => EndMapping,
        BeginNode => EndNode,
        BeginPair => EndPair,
        BeginProperties => EndProperties,
        BeginScalar => EndScalar,
        BeginSequence => EndSequence,
        BeginTag => EndTag,

        EndAlias => BeginAlias,
        EndAnchor => BeginAnchor,
        EndComment => BeginComment,
        EndDirective => BeginDirective,
        EndDocument => BeginDocument,
        EndEscape => BeginEscape,
        EndHandle => BeginHandle,
        EndMapping => BeginMapping,
        EndNode => BeginNode,
        EndPair => BeginPair,
        EndProperties => BeginProperties,
        EndScalar => BeginScalar,
        EndSequence => BeginSequence,
        EndTag => BeginTag,

        other => panic!("{other:?} is not a Begin/End code"),
    }
}

/// A single source position (`spec.md` §3 "Character"/"Position Cursor").
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Position {
    /// Absolute byte offset from the start of the source.
    pub byte_offset: u64,
    /// Absolute character (Unicode scalar) offset from the start of the
    /// source. `-1` is used transiently during construction, for the
    /// not-yet-read sentinel character that precedes the first real one
    /// (`yip.c`'s `Curr->char_offset = -1` in `yip_init`).
    pub char_offset: i64,
    /// One-based source line number, matching `yip.c`'s `YIP_TOKEN::line`.
    pub line: i64,
    /// Zero-based character offset within the current line; `-1` for the
    /// same not-yet-read sentinel as `char_offset`.
    pub line_char: i64,
}

impl Position {
    pub const START: Position = Position {
        byte_offset: 0,
        char_offset: -1,
        line: 1,
        line_char: -1,
    };
}

/// One emitted YEAST token (`spec.md` §3 "Token").
///
/// Unlike `yip.c`'s `YIP_TOKEN`, which aliases a window into the source's
/// (potentially-reallocated) buffer, a `Token` owns its bytes: they are
/// copied out when the token is finalized. `spec.md` §9's Design Note
/// documents this as the chosen resolution to the pointer-rebasing problem;
/// `Parser` never needs a zero-copy token internally, so there is no
/// performance cost to paying for ownership here.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Token {
    pub code: Code,
    /// Position where the token starts.
    pub start: Position,
    /// Position just past the token's last character.
    pub end: Position,
    /// Raw payload bytes for `Match` tokens, or the synthesized text for
    /// `Fake` tokens (e.g. an error message, or the BOM's canonical
    /// encoding name). Empty for `Begin`/`End` tokens.
    #[cfg_attr(feature = "serde", serde(skip))]
    pub text: TokenText,
}

/// Owned or synthesized token payload bytes.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum TokenText {
    #[default]
    Empty,
    Bytes(Vec<u8>),
    Fake(Cow<'static, str>),
}

impl Token {
    pub fn begin(code: Code, at: Position) -> Self {
        debug_assert_eq!(code_type(code), CodeType::Begin);
        Token {
            code,
            start: at,
            end: at,
            text: TokenText::Empty,
        }
    }

    pub fn end(code: Code, at: Position) -> Self {
        debug_assert_eq!(code_type(code), CodeType::End);
        Token {
            code,
            start: at,
            end: at,
            text: TokenText::Empty,
        }
    }

    pub fn matched(code: Code, start: Position, end: Position, bytes: Vec<u8>) -> Self {
        debug_assert_eq!(code_type(code), CodeType::Match);
        Token {
            code,
            start,
            end,
            text: TokenText::Bytes(bytes),
        }
    }

    pub fn fake(code: Code, at: Position, text: impl Into<Cow<'static, str>>) -> Self {
        debug_assert_eq!(code_type(code), CodeType::Fake);
        Token {
            code,
            start: at,
            end: at,
            text: TokenText::Fake(text.into()),
        }
    }

    /// Decode this token's payload as text, using `encoding` for `Match`
    /// tokens (`Fake` tokens are always plain Rust `str` already).
    pub fn text_as_str(&self, encoding: Encoding) -> Cow<'_, str> {
        match &self.text {
            TokenText::Empty => Cow::Borrowed(""),
            TokenText::Fake(s) => Cow::Borrowed(s.as_ref()),
            TokenText::Bytes(bytes) => {
                let (decoded, _, _) = encoding.as_encoding_rs().decode(bytes);
                Cow::Owned(decoded.into_owned())
            }
        }
    }
}

/// Single-character code used by the textual YEAST regression format
/// (`spec.md` §6), matching the ASCII values `yip.h` assigns each
/// `YIP_CODE` variant.
pub fn code_letter(code: Code) -> char {
    use Code::*;
    match code {
        BeginAlias => 'R',
        BeginAnchor => 'A',
        BeginComment => 'C',
        BeginDirective => 'D',
        BeginDocument => 'O',
        BeginEscape => 'E',
        BeginHandle => 'H',
        BeginMapping => 'M',
        BeginNode => 'N',
        BeginPair => 'X',
        BeginProperties => 'P',
        BeginScalar => 'S',
        BeginSequence => 'Q',
        BeginTag => 'G',

        EndAlias => 'r',
        EndAnchor => 'a',
        EndComment => 'c',
        EndDirective => 'd',
        EndDocument => 'o',
        EndEscape => 'e',
        EndHandle => 'h',
        EndMapping => 'm',
        EndNode => 'n',
        EndPair => 'x',
        EndProperties => 'p',
        EndScalar => 's',
        EndSequence => 'q',
        EndTag => 'g',

        Bom => 'U',
        Break => 'b',
        Comment => '#',
        DocumentEnd => 'k',
        DocumentStart => 'K',
        Done => '\0',
        Error => '!',
        Indent => 'i',
        Indicator => 'I',
        LineFeed => 'L',
        LineFold => 'l',
        Meta => 't',
        Text => 'T',
        Unparsed => '-',
        White => 'w',
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_begin_has_an_end_pair_and_vice_versa() {
        use Code::*;
        let begins = [
            BeginAlias, BeginAnchor, BeginComment, BeginDirective, BeginDocument,
            BeginEscape, BeginHandle, BeginMapping, BeginNode, BeginPair, BeginProperties,
            BeginScalar, BeginSequence, BeginTag,
        ];
        for begin in begins {
            assert_eq!(code_type(begin), CodeType::Begin);
            let end = code_pair(begin);
            assert_eq!(code_type(end), CodeType::End);
            assert_eq!(code_pair(end), begin);
        }
    }

    #[test]
    fn fake_codes_are_classified_as_fake() {
        for code in [Code::Bom, Code::Comment, Code::Done, Code::Error] {
            assert_eq!(code_type(code), CodeType::Fake);
        }
    }

    #[test]
    fn match_codes_are_classified_as_match() {
        for code in [
            Code::Break,
            Code::DocumentEnd,
            Code::DocumentStart,
            Code::Indent,
            Code::Indicator,
            Code::LineFeed,
            Code::LineFold,
            Code::Meta,
            Code::Text,
            Code::Unparsed,
            Code::White,
        ] {
            assert_eq!(code_type(code), CodeType::Match);
        }
    }

    #[test]
    #[should_panic]
    fn code_pair_panics_on_non_paired_code() {
        code_pair(Code::Done);
    }

    #[test]
    fn code_letters_match_yeast_ascii_values() {
        assert_eq!(code_letter(Code::BeginSequence), 'Q');
        assert_eq!(code_letter(Code::EndSequence), 'q');
        assert_eq!(code_letter(Code::Done), '\0');
        assert_eq!(code_letter(Code::Error), '!');
    }
}
