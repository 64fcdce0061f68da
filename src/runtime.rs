//! Production Runtime (`spec.md` §4.8) and Position Cursor (`spec.md` §4.4).
//!
//! `Parser` is a close port of `yip.c`'s `struct YIP` (`original_source/yip.c`
//! lines 753-766): the code/token/frame stacks are carried over 1:1 as
//! `Vec`s instead of manually-managed realloc'd arrays, and the operations
//! below (`next_char`, `begin_token`, `end_token`, `fake_token`, `unexpected`,
//! `commit`, the backtracking wrappers, and the `next_token` dispatch loop)
//! are direct ports of their namesakes in `yip.c` lines 1080-1475.
//!
//! Unlike `yip.c`'s generated grammar (whose production bodies are the ones
//! that call `less`, per `original_source/yip.h` line 371's "kept at a
//! reasonable size by calling #more and #less to slide the buffer along"),
//! this crate's hand-written productions never call `less` themselves.
//! Instead `next_char` calls [`Parser::release_consumed`] after every
//! advance, which works out the same thing the generated grammar's call
//! sites would have to re-derive per production: the lowest byte offset any
//! live frame or in-progress token can still be asked to reproduce. Bytes
//! behind that floor are handed back to the source via `ByteSource::less`,
//! so a streaming source's resident buffer tracks the longest token or
//! backtracking span currently in flight, not the whole input (`spec.md`
//! §1's streaming Non-goal).

use std::borrow::Cow;

use crate::classifier;
use crate::encoding::{self, Encoding};
use crate::error::{YipError, YipResult};
use crate::frame::{Character, CommitOutcome, FrameStack};
use crate::source::ByteSource;
use crate::token::{Code, CodeType, Position, Token, TokenText};

/// `yip.c`'s stdio-style `EOF` sentinel (distinct from the decode-failure
/// sentinel [`encoding::INVALID_CODE`]).
pub const EOF_CODE: i64 = -1;

/// `yip.c`'s `NO_CODE`: the placeholder occupying `curr`/`prev` before the
/// first call to `next_char`.
const NOT_YET_READ: i64 = -2;

/// Sentinel `n` (indentation) value meaning "not supplied", matching
/// `yip.c`'s `NO_INDENT`.
pub const NO_INDENT: i32 = -1;

/// A named YAML grammar rule, optionally parameterized, identifying which
/// state machine `Parser::for_production` should run (`spec.md` §6
/// "Production specifier").
#[derive(Debug, Clone, Default)]
pub struct ProductionSpec {
    pub name: String,
    pub n: Option<String>,
    pub c: Option<String>,
    pub t: Option<String>,
}

impl ProductionSpec {
    pub fn named(name: impl Into<String>) -> Self {
        ProductionSpec {
            name: name.into(),
            n: None,
            c: None,
            t: None,
        }
    }
}

/// Result of invoking a machine step or a token-emitting operation:
/// `yip.c`'s `RETURN_DONE`/`RETURN_TOKEN` (errors surface as `Err` instead
/// of `RETURN_ERROR`, per `spec.md` §7).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepOutcome {
    /// The machine made progress but has no new token ready for delivery.
    Continue,
    /// A token (or a short run of tokens) is ready on the token stack.
    TokenReady,
}

/// A production's state-machine implementation: one step given the current
/// parser state, matching `yip.c`'s `MACHINE` function-pointer typedef.
pub type Machine<S> = fn(&mut Parser<S>) -> YipResult<StepOutcome>;

/// Named choice points at which productions call `commit`, matching
/// `yip.c`'s `CHOICE` enum (lines 709-718). The double-quoted-scalar
/// production (`src/productions/quoted.rs`) is this crate's sole user.
#[derive(Debug, Clone, Copy)]
pub enum Choice {
    Escape,
    Escaped,
}

impl Choice {
    fn error_text(self) -> &'static str {
        match self {
            Choice::Escape => "Commit to 'escape' was made outside it",
            Choice::Escaped => "Commit to 'escaped' was made outside it",
        }
    }
}

/// Incremental tokenizing parser driving one [`ByteSource`] through one
/// production's state machine (`spec.md` §3 "Parser").
pub struct Parser<S> {
    source: S,
    encoding: Encoding,
    /// Nesting-code stack ("Codes" in `yip.c`); always has `Code::Unparsed`
    /// at the bottom.
    code_stack: Vec<Code>,
    /// Collected/working-token stack ("Tokens" in `yip.c`): index 0 is the
    /// token currently being accumulated when no backtracking is active;
    /// additional entries accumulate while a frame is pushed, and are
    /// drained to the caller via `next_token` once frames pop back to depth 1.
    token_stack: Vec<Token>,
    frame_stack: FrameStack,
    machine: Machine<S>,
    /// Index into `token_stack` of the next token to deliver, or `None` when
    /// the machine should be invoked instead (`yip.c`'s `Next_return_token`,
    /// `-1` mapped to `None`).
    next_return_token: Option<usize>,
    did_see_eof: bool,
    pub state: i32,
    pub n: i32,
    pub i: i32,
    /// Absolute byte offset, counted from the start of the whole source, of
    /// `curr`'s first byte. Never rebased; `released` tracks how much of the
    /// source window has been discarded so this can still be converted into
    /// a `source.window()` index.
    cursor: usize,
    /// Total bytes ever handed back to the source via `ByteSource::less`.
    /// `cursor - released` is the live index into `source.window()`.
    released: usize,
}

impl<S: ByteSource> Parser<S> {
    /// `yip_init` + `yip_test` (`yip.c` lines 1133-1182, 1408-1421): detect
    /// the encoding, look the production up in the table, and prime the
    /// first character.
    pub fn for_production(mut source: S, spec: ProductionSpec) -> YipResult<Self> {
        let first_four = Self::peek_first_four(&mut source)?;
        let encoding = encoding::detect_encoding(&first_four);

        let machine = crate::productions::lookup(&spec)
            .ok_or_else(|| YipError::UnknownProduction(spec.name.clone()))?;

        let n = match &spec.n {
            Some(text) => text
                .parse::<i32>()
                .map_err(|_| YipError::InvalidArgument("n must be a base-10 integer"))?,
            None => NO_INDENT,
        };

        let sentinel = Character::new(Position::START, NOT_YET_READ, classifier::START_OF_LINE, 0);
        let mut parser = Parser {
            source,
            encoding,
            code_stack: vec![Code::Unparsed],
            token_stack: vec![Token {
                code: Code::Unparsed,
                start: Position::START,
                end: Position::START,
                text: TokenText::Empty,
            }],
            frame_stack: FrameStack::new(sentinel),
            machine,
            next_return_token: None,
            did_see_eof: false,
            state: 0,
            n,
            i: 0,
            cursor: 0,
            released: 0,
        };
        parser.next_char()?;
        let curr_pos = parser.curr().position;
        parser.token_stack[0] = Token {
            code: Code::Unparsed,
            start: curr_pos,
            end: curr_pos,
            text: TokenText::Empty,
        };
        Ok(parser)
    }

    /// Bytes past the end of a short source are padded with `0xAA`, matching
    /// `yip.c`'s `detect_encoding` (`original_source/yip.c` lines 466-472) —
    /// not `0x00`, which would itself look like a UTF-16/32 lead byte.
    fn peek_first_four(source: &mut S) -> YipResult<[u8; 4]> {
        while source.window().len() < 4 {
            if source.more()? == 0 {
                break;
            }
        }
        let mut buf = [0xAAu8; 4];
        let window = source.window();
        let n = window.len().min(4);
        buf[..n].copy_from_slice(&window[..n]);
        Ok(buf)
    }

    pub fn encoding(&self) -> Encoding {
        self.encoding
    }

    fn curr(&self) -> Character {
        self.frame_stack.top().curr
    }

    fn prev(&self) -> Character {
        self.frame_stack.top().prev
    }

    /// Current character's decoded code point, or the EOF/invalid sentinel.
    pub fn curr_code(&self) -> i64 {
        self.curr().code
    }

    /// Current character's class mask (`spec.md` §4.3).
    pub fn curr_mask(&self) -> u64 {
        self.curr().mask
    }

    fn current_nesting_code(&self) -> Code {
        *self.code_stack.last().unwrap_or(&Code::Unparsed)
    }

    fn working_token_is_empty(&self) -> bool {
        let tok = self.token_stack.last().expect("token stack is never empty");
        tok.start == tok.end
    }

    fn fresh_token_at_curr(&self, code: Code) -> Token {
        let pos = self.curr().position;
        Token {
            code,
            start: pos,
            end: pos,
            text: TokenText::Empty,
        }
    }

    /// Ensure the window holds at least one full character's worth of
    /// lookahead past `cursor`, growing it via `more()` as needed
    /// (`yip.c`'s guarded `Source->more` call in `next_char`, line 1094).
    fn ensure_lookahead(&mut self) -> YipResult<()> {
        let max_len = self.encoding.max_char_len();
        let local_cursor = self.cursor - self.released;
        while !self.did_see_eof && self.source.window().len() < local_cursor + max_len {
            if self.source.more()? == 0 {
                self.did_see_eof = true;
            }
        }
        Ok(())
    }

    /// Lowest absolute byte offset still reachable by a live frame or an
    /// in-progress token — the floor `release_consumed` must not cross,
    /// since a `reset_state`/`pop_state` or a pending `materialize` can still
    /// ask for anything at or after it.
    fn release_floor(&self) -> u64 {
        let mut floor = self.frame_stack.min_live_byte_offset();
        for token in &self.token_stack {
            floor = floor.min(token.start.byte_offset);
        }
        floor
    }

    /// Hand bytes behind [`Self::release_floor`] back to the source
    /// (`ByteSource::less`), so a streaming source's buffer only ever grows
    /// to cover the longest token or backtracking span currently open.
    fn release_consumed(&mut self) -> YipResult<()> {
        let floor = self.release_floor() as usize;
        if floor > self.released {
            let amount = floor - self.released;
            self.source.less(amount)?;
            self.released = floor;
        }
        Ok(())
    }

    /// `next_char` (`yip.c` lines 1080-1112): advance to the next decoded
    /// character, propagating the start-of-line pseudo-class across an
    /// end-of-input or U+FFFF character per `spec.md` §9's Design Note.
    pub fn next_char(&mut self) -> YipResult<()> {
        if self.curr().code == EOF_CODE {
            return Ok(());
        }
        let old_curr = self.curr();
        self.frame_stack.top_mut().prev = old_curr;

        self.cursor += old_curr.len;
        let new_pos = Position {
            byte_offset: old_curr.position.byte_offset + old_curr.len as u64,
            char_offset: old_curr.position.char_offset + 1,
            line: old_curr.position.line,
            line_char: old_curr.position.line_char + 1,
        };

        self.ensure_lookahead()?;
        let local_cursor = self.cursor - self.released;
        let window = self.source.window();
        let (code, len) = if local_cursor >= window.len() {
            (EOF_CODE, 0)
        } else {
            let mut p = local_cursor;
            let code = encoding::decode_one(self.encoding, window, &mut p);
            (code, p - local_cursor)
        };

        let mut mask = classifier::class_mask(code);
        let prev = self.prev();
        if (prev.code < 0 || prev.code == 0xFFFF) && prev.mask & classifier::START_OF_LINE != 0 {
            mask |= classifier::START_OF_LINE;
        }

        self.frame_stack.top_mut().curr = Character::new(new_pos, code, mask, len);
        if let Some(tok) = self.token_stack.last_mut() {
            tok.end = new_pos;
        }
        self.release_consumed()?;
        Ok(())
    }

    /// `next_line` (`yip.c` lines 1126-1130).
    pub fn next_line(&mut self) {
        let top = self.frame_stack.top_mut();
        top.curr.mask |= classifier::START_OF_LINE;
        top.curr.position.line += 1;
        top.curr.position.line_char = 0;
    }

    /// `begin_token` (`yip.c` lines 1185-1207).
    pub fn begin_token(&mut self, code: Code) -> YipResult<StepOutcome> {
        debug_assert!(self.next_return_token.is_none());
        debug_assert!(
            code_type(code) == CodeType::Match || matches!(code, Code::Bom),
            "begin_token requires a Match code or Bom"
        );
        self.code_stack.push(code);
        if self.working_token_is_empty() {
            self.token_stack.last_mut().unwrap().code = code;
            return Ok(StepOutcome::Continue);
        }
        if self.frame_stack.depth() == 1 {
            debug_assert_eq!(self.token_stack.len(), 1);
            self.next_return_token = Some(0);
            return Ok(StepOutcome::TokenReady);
        }
        self.token_stack.push(self.fresh_token_at_curr(code));
        Ok(StepOutcome::Continue)
    }

    /// `end_token` (`yip.c` lines 1210-1239).
    pub fn end_token(&mut self, code: Code) -> YipResult<StepOutcome> {
        debug_assert!(self.next_return_token.is_none());
        if self.code_stack.len() == 1 {
            debug_assert_eq!(self.code_stack[0], Code::Unparsed);
        } else {
            self.code_stack.pop();
        }
        if self.working_token_is_empty() {
            self.token_stack.last_mut().unwrap().code = self.current_nesting_code();
            return Ok(StepOutcome::Continue);
        }
        let bytes = if code != Code::Bom {
            let tok = self.token_stack.last().unwrap();
            Some(self.materialize_span(tok.start, tok.end))
        } else {
            None
        };
        {
            let tok = self.token_stack.last_mut().unwrap();
            tok.code = code;
            if code == Code::Bom {
                tok.text = TokenText::Fake(Cow::Borrowed(self.encoding.canonical_name()));
            } else if let Some(bytes) = bytes {
                tok.text = TokenText::Bytes(bytes);
            }
        }
        if self.frame_stack.depth() == 1 {
            debug_assert_eq!(self.token_stack.len(), 1);
            self.next_return_token = Some(0);
            return Ok(StepOutcome::TokenReady);
        }
        let nesting = self.current_nesting_code();
        self.token_stack.push(self.fresh_token_at_curr(nesting));
        Ok(StepOutcome::Continue)
    }

    /// `fake_token`/`empty_token` (`yip.c` lines 1242-1274).
    pub fn fake_token(
        &mut self,
        code: Code,
        text: Option<Cow<'static, str>>,
    ) -> YipResult<StepOutcome> {
        debug_assert!(self.next_return_token.is_none());
        if !self.working_token_is_empty() {
            self.token_stack.push(self.fresh_token_at_curr(code));
        }
        {
            let tok = self.token_stack.last_mut().unwrap();
            tok.code = code;
            if let Some(text) = text {
                tok.text = TokenText::Fake(text);
            }
        }
        if self.frame_stack.depth() == 1 {
            self.next_return_token = Some(0);
            return Ok(StepOutcome::TokenReady);
        }
        let nesting = self.current_nesting_code();
        self.token_stack.push(self.fresh_token_at_curr(nesting));
        Ok(StepOutcome::Continue)
    }

    pub fn empty_token(&mut self, code: Code) -> YipResult<StepOutcome> {
        self.fake_token(code, None)
    }

    /// `unexpected` (`yip.c` lines 1276-1287).
    pub fn unexpected(&mut self) -> YipResult<StepOutcome> {
        let code = self.curr().code;
        if code == encoding::INVALID_CODE {
            return self.fake_token(Code::Error, Some(Cow::Borrowed("Invalid byte sequence")));
        }
        if code == EOF_CODE {
            return self.fake_token(Code::Error, Some(Cow::Borrowed("Unexpected end of input")));
        }
        if code == '\'' as i64 {
            return self.fake_token(Code::Error, Some(Cow::Borrowed("Unexpected \"'\"")));
        }
        let message = if (0x20..=0x7E).contains(&code) {
            format!("Unexpected '{}'", code as u8 as char)
        } else if code <= 0xFF {
            format!("Unexpected '\\x{code:02x}'")
        } else if code <= 0xFFFF {
            format!("Unexpected '\\u{code:04x}'")
        } else {
            format!("Unexpected '\\U{code:08x}'")
        };
        self.fake_token(Code::Error, Some(Cow::Owned(message)))
    }

    /// `commit` (`yip.c` lines 1290-1292).
    pub fn commit(&mut self, choice: Choice) -> YipResult<StepOutcome> {
        self.fake_token(Code::Error, Some(Cow::Borrowed(choice.error_text())))
    }

    /// The canonical "Fewer than 0 repetitions" error (`spec.md` §4.6).
    pub fn non_positive_n(&mut self) -> YipResult<StepOutcome> {
        self.fake_token(Code::Error, Some(Cow::Borrowed("Fewer than 0 repetitions")))
    }

    /// `push_state` (`yip.c` lines 1295-1305).
    pub fn push_state(&mut self) {
        self.frame_stack
            .push_state(self.code_stack.len(), self.token_stack.len());
    }

    /// `set_state` (`yip.c` lines 1308-1325).
    pub fn set_state(&mut self) -> YipResult<StepOutcome> {
        let outcome = self
            .frame_stack
            .set_state(self.code_stack.len(), self.token_stack.len());
        Ok(self.apply_commit_outcome(outcome))
    }

    /// `pop_state` (`yip.c` lines 1345-1362).
    pub fn pop_state(&mut self) -> YipResult<StepOutcome> {
        let outcome = self.frame_stack.pop_state(self.token_stack.len());
        Ok(self.apply_commit_outcome(outcome))
    }

    fn apply_commit_outcome(&mut self, outcome: CommitOutcome) -> StepOutcome {
        match outcome {
            CommitOutcome::Done => StepOutcome::Continue,
            CommitOutcome::TokenReady => {
                self.token_stack.pop();
                self.next_return_token = Some(0);
                StepOutcome::TokenReady
            }
        }
    }

    /// `reset_state` (`yip.c` lines 1328-1342): discard progress since the
    /// matching `push_state`, restoring `curr`/`prev` to that point, and
    /// reset the token at the snapshotted depth to an empty one tagged with
    /// the (now-truncated) current nesting code in place — `yip.c` overwrites
    /// the existing slot rather than appending a new one.
    pub fn reset_state(&mut self) {
        let (codes_depth, tokens_depth) = self.frame_stack.reset_state();
        self.code_stack.truncate(codes_depth);
        self.token_stack.truncate(tokens_depth);
        let pos = self.curr().position;
        let code = self.current_nesting_code();
        let last = self
            .token_stack
            .last_mut()
            .expect("token stack is never empty");
        *last = Token {
            code,
            start: pos,
            end: pos,
            text: TokenText::Empty,
        };
    }

    /// `is_same_state` (`yip.c` lines 1365-1369).
    pub fn is_same_state(&self) -> bool {
        self.frame_stack.is_same_state()
    }

    /// `next_token` (`yip.c` lines 1436-1475): alternates between draining
    /// the token stack and re-invoking the active machine.
    pub fn next_token(&mut self) -> YipResult<&Token> {
        if let Some(index) = self.next_return_token {
            if index >= self.token_stack.len() {
                self.last_token();
            } else {
                return Ok(self.deliver(index));
            }
        }
        match (self.machine)(self)? {
            StepOutcome::TokenReady => {
                let index = self.next_return_token.expect("machine promised a token");
                Ok(self.deliver(index))
            }
            StepOutcome::Continue => {
                unreachable!("a machine step must only return via next_token when a token is ready")
            }
        }
    }

    /// `next_token` helper (`yip.c` lines 1437-1446): hand back token
    /// `index` and advance the cursor unless it is `Done`.
    fn deliver(&mut self, index: usize) -> &Token {
        debug_assert_eq!(self.frame_stack.depth(), 1);
        if self.token_stack[index].code != Code::Done {
            self.next_return_token = Some(index + 1);
        }
        &self.token_stack[index]
    }

    /// `last_token` (`yip.c` lines 1449-1458): reset the token stack down to
    /// a single fresh working token once every delivered token is drained.
    fn last_token(&mut self) {
        debug_assert_eq!(self.frame_stack.depth(), 1);
        let pos = self.curr().position;
        let code = self.current_nesting_code();
        self.token_stack.truncate(1);
        self.token_stack[0] = Token {
            code,
            start: pos,
            end: pos,
            text: TokenText::Empty,
        };
        self.next_return_token = None;
    }

    /// `yip_close` (`yip.c` lines 1424-1434).
    pub fn close(mut self) -> YipResult<()> {
        self.source.close()
    }

    /// Bytes of the token's payload from the underlying source window,
    /// copied out so the returned `Token` owns its data (`spec.md` §9
    /// Design Note, resolved in favor of option (a)).
    pub fn materialize(&self, token: &Token) -> Vec<u8> {
        self.materialize_span(token.start, token.end)
    }

    #[cfg(test)]
    fn source_window_len(&self) -> usize {
        self.source.window().len()
    }

    fn materialize_span(&self, start: Position, end: Position) -> Vec<u8> {
        debug_assert!(
            start.byte_offset as usize >= self.released,
            "materialize_span requested bytes the source has already released"
        );
        let start = start.byte_offset as usize - self.released;
        let end = end.byte_offset as usize - self.released;
        self.source.window().get(start..end).unwrap_or(&[]).to_vec()
    }
}

fn code_type(code: Code) -> CodeType {
    crate::token::code_type(code)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::MemorySource;

    fn done_machine<S: ByteSource>(parser: &mut Parser<S>) -> YipResult<StepOutcome> {
        parser.fake_token(Code::Done, None)
    }

    #[test]
    fn empty_input_yields_single_done_token() {
        let mut parser = Parser::for_production(
            MemorySource::new(b""),
            ProductionSpec {
                name: "l-yaml-stream".into(),
                ..Default::default()
            },
        )
        .unwrap();
        parser.machine = done_machine;
        let token = parser.next_token().unwrap();
        assert_eq!(token.code, Code::Done);
    }

    #[test]
    fn encoding_is_detected_as_utf8_by_default() {
        let parser = Parser::for_production(
            MemorySource::new(b"key: value"),
            ProductionSpec {
                name: "l-yaml-stream".into(),
                ..Default::default()
            },
        )
        .unwrap();
        assert_eq!(parser.encoding(), Encoding::Utf8);
    }

    #[test]
    fn unknown_production_is_an_error() {
        let result = Parser::for_production(
            MemorySource::new(b""),
            ProductionSpec::named("does-not-exist"),
        );
        assert!(result.is_err());
    }

    /// A scalar long enough to force `StreamSource` to grow (reallocate) its
    /// buffer several times mid-token — and, since `release_consumed` cannot
    /// cross the open `Text` token's own start, to exercise `less` sliding
    /// the window forward once the token closes — so the materialized text
    /// still comes out byte-for-byte correct across both.
    #[test]
    fn long_scalar_survives_stream_source_buffer_growth() {
        use crate::source::StreamSource;
        use std::io::Cursor;

        let scalar: String = "a".repeat(40_000);
        let input = format!("- {scalar}\n");
        let mut parser = Parser::for_production(
            StreamSource::new(Cursor::new(input.into_bytes())),
            ProductionSpec::named("l+block-sequence"),
        )
        .unwrap();

        let mut found = false;
        loop {
            let token = parser.next_token().unwrap();
            if token.code == Code::Done {
                break;
            }
            if token.code == Code::Text {
                assert_eq!(token.text_as_str(Encoding::Utf8), scalar);
                found = true;
            }
        }
        assert!(found, "expected a Text token for the long scalar");
    }

    #[test]
    fn memory_source_round_trip_preserves_byte_offsets() {
        let mut parser = Parser::for_production(
            MemorySource::new(b"- x\n"),
            ProductionSpec::named("l+block-sequence"),
        )
        .unwrap();
        let mut last_end = 0u64;
        loop {
            let token = parser.next_token().unwrap();
            assert!(token.start.byte_offset <= token.end.byte_offset);
            assert!(token.start.byte_offset >= last_end);
            last_end = token.end.byte_offset;
            if token.code == Code::Done {
                break;
            }
        }
        assert_eq!(last_end, 4);
    }

    /// Many short entries, none individually large, but whose total exceeds
    /// `StreamSource`'s growth increment several times over — if
    /// `release_consumed` weren't actually releasing anything back to the
    /// source, the window would grow to cover the whole input.
    #[test]
    fn many_short_entries_keep_the_stream_source_window_bounded() {
        use crate::source::StreamSource;
        use std::io::Cursor;

        let mut input = String::new();
        for i in 0..4000 {
            input.push_str(&format!("- item{i}\n"));
        }
        let total_len = input.len();
        let mut parser = Parser::for_production(
            StreamSource::new(Cursor::new(input.into_bytes())),
            ProductionSpec::named("l+block-sequence"),
        )
        .unwrap();

        let mut max_window = 0;
        loop {
            let code = parser.next_token().unwrap().code;
            max_window = max_window.max(parser.source_window_len());
            if code == Code::Done {
                break;
            }
        }
        assert!(
            max_window < total_len / 2,
            "window grew to {max_window} bytes out of {total_len}, less() is not releasing consumed input"
        );
    }
}
