//! Production Table (`spec.md` §4.8) — lookup of a named, possibly
//! parameterized grammar rule to its state-machine implementation.
//!
//! `yip.c`'s `machine_by_parameters`/`machine_by_name` (`original_source/yip.c`
//! lines 1378-1405) select one of four tables by whether `n`/`t` are present,
//! then scan a `(name, machine)` list, matching `name` against
//! `"<name>-<context>"` when a context `c` is supplied. This crate's
//! supplemented scope (`SPEC_FULL.md` §9) hand-writes three representative
//! machines rather than a generated full grammar, so the lookup collapses to
//! a direct name match; the four-table split by `n`/`t` presence is kept as
//! the entry point shape so a future generated table is a drop-in
//! replacement of this function's body only.

mod block;
mod quoted;
mod stream;

use crate::runtime::{Machine, ProductionSpec};
use crate::source::ByteSource;

/// Resolve a [`ProductionSpec`] to its machine implementation, or `None` if
/// the name (optionally combined with context `c`) is not registered.
pub fn lookup<S: ByteSource>(spec: &ProductionSpec) -> Option<Machine<S>> {
    match spec.name.as_str() {
        "l-yaml-stream" => Some(stream::step),
        "c-double-quoted" => Some(quoted::step),
        "l+block-sequence" => Some(block::step),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use crate::runtime::Parser;
    use crate::source::MemorySource;
    use crate::token::{Code, Token};

    /// Drive a production to completion over an in-memory buffer, returning
    /// every token through and including `Done`.
    fn run(name: &str, input: &[u8]) -> Vec<Token> {
        let mut parser = Parser::for_production(
            MemorySource::new(input),
            crate::runtime::ProductionSpec::named(name),
        )
        .unwrap();
        let mut tokens = Vec::new();
        loop {
            let token = parser.next_token().unwrap().clone();
            let done = token.code == Code::Done;
            tokens.push(token);
            if done {
                break;
            }
        }
        tokens
    }

    fn codes(tokens: &[Token]) -> Vec<Code> {
        tokens.iter().map(|t| t.code).collect()
    }

    fn text(token: &Token) -> String {
        token.text_as_str(crate::encoding::Encoding::Utf8).into_owned()
    }

    #[test]
    fn scenario_document_start_marker() {
        let tokens = run("l-yaml-stream", b"---\n");
        assert_eq!(
            codes(&tokens),
            [Code::DocumentStart, Code::Break, Code::Done]
        );
        assert_eq!(text(&tokens[0]), "---");
    }

    #[test]
    fn scenario_bom_announcement() {
        let tokens = run("l-yaml-stream", b"\xEF\xBB\xBFa");
        assert_eq!(codes(&tokens), [Code::Bom, Code::Text, Code::Done]);
        assert_eq!(text(&tokens[0]), "UTF-8");
        assert_eq!(text(&tokens[1]), "a");
    }

    #[test]
    fn scenario_double_quoted_escape() {
        let tokens = run("c-double-quoted", b"\"\\n\"");
        assert_eq!(
            codes(&tokens),
            [
                Code::Indicator,
                Code::BeginEscape,
                Code::Meta,
                Code::Meta,
                Code::EndEscape,
                Code::Indicator,
                Code::Done,
            ]
        );
        assert_eq!(text(&tokens[2]), "\\");
        assert_eq!(text(&tokens[3]), "n");
    }

    #[test]
    fn scenario_truncated_utf8_resynchronizes() {
        let tokens = run("l-yaml-stream", b"\xC0");
        assert_eq!(codes(&tokens), [Code::Error, Code::Done]);
        assert_eq!(text(&tokens[0]), "Invalid byte sequence");
    }

    #[test]
    fn scenario_utf16le_bom_splits_text_per_character() {
        let tokens = run("l-yaml-stream", b"\xFF\xFE\x61\x00\x62\x00");
        assert_eq!(
            codes(&tokens),
            [Code::Bom, Code::Text, Code::Text, Code::Done]
        );
        assert_eq!(text(&tokens[0]), "UTF-16LE");
        assert_eq!(text(&tokens[1]), "a");
        assert_eq!(text(&tokens[2]), "b");
    }

    #[test]
    fn scenario_block_sequence_is_properly_nested_and_balances_at_done() {
        let tokens = run("l+block-sequence", b"- x\n- y\n");
        assert_eq!(
            codes(&tokens),
            [
                Code::BeginSequence,
                Code::Indicator,
                Code::White,
                Code::BeginNode,
                Code::BeginScalar,
                Code::Text,
                Code::EndScalar,
                Code::EndNode,
                Code::Break,
                Code::Indicator,
                Code::White,
                Code::BeginNode,
                Code::BeginScalar,
                Code::Text,
                Code::EndScalar,
                Code::EndNode,
                Code::Break,
                Code::EndSequence,
                Code::Done,
            ]
        );
        assert_eq!(text(&tokens[5]), "x");
        assert_eq!(text(&tokens[13]), "y");

        // Pair balance: every Begin has a matching End by the time Done is
        // reached, and nesting never goes negative.
        let mut depth = 0i32;
        for token in &tokens {
            match crate::token::code_type(token.code) {
                crate::token::CodeType::Begin => depth += 1,
                crate::token::CodeType::End => depth -= 1,
                _ => {}
            }
            assert!(depth >= 0, "nesting depth went negative");
        }
        assert_eq!(depth, 0, "stream did not end at balanced depth zero");
    }

    #[test]
    fn empty_stream_input_yields_single_done_token() {
        let tokens = run("l-yaml-stream", b"");
        assert_eq!(codes(&tokens), [Code::Done]);
    }

    #[test]
    fn dash_not_followed_by_terminator_is_a_plain_indicator() {
        // Exercises the backtracking rollback path: "-x" looks like it might
        // start a "---" document marker but doesn't, so the lone "-" falls
        // back to a generic Indicator instead of corrupting later tokens.
        let tokens = run("l-yaml-stream", b"-x");
        assert_eq!(
            codes(&tokens),
            [Code::Indicator, Code::Text, Code::Done]
        );
        assert_eq!(text(&tokens[0]), "-");
        assert_eq!(text(&tokens[1]), "x");
    }
}
