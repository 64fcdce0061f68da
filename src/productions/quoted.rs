//! `c-double-quoted` (`SPEC_FULL.md` §9, scenario 3): a double-quoted flow
//! scalar's escape handling. Representative rather than complete — it
//! recognizes the opening/closing `"` and a single-character escape
//! (`\n`, `\t`, ...) rather than the full escape grammar (hex/unicode
//! escapes, line folding inside the scalar) — but it is exactly the slice
//! `spec.md`'s scenario 3 exercises and demonstrates the `BeginEscape`/
//! `EndEscape` pairing pattern real hex/unicode escapes would reuse.
//!
//! Grounded in `original_source/yip.c`'s `CHOICE`/`commit` mechanism
//! (`crate::runtime::Choice`): once `BeginEscape` has been emitted, hitting
//! end-of-input before the escape completes calls `commit(Choice::Escaped)`
//! to report the broken commitment as an error rather than silently
//! resetting, matching `commit`'s "prevent further named backtracking" role.

use crate::classifier;
use crate::runtime::{Choice, Parser, StepOutcome, EOF_CODE};
use crate::source::ByteSource;
use crate::token::Code;

const OPEN_QUOTE: i32 = 0;
const CONTENT: i32 = 1;
const ESCAPE_BACKSLASH: i32 = 2;
const ESCAPE_CHAR: i32 = 3;
const ESCAPE_END: i32 = 4;
const AFTER_CLOSE: i32 = 5;

const DOUBLE_QUOTE: i64 = '"' as i64;
const BACKSLASH: i64 = '\\' as i64;

pub fn step<S: ByteSource>(p: &mut Parser<S>) -> crate::error::YipResult<StepOutcome> {
    loop {
        match p.state {
            OPEN_QUOTE => {
                if p.curr_code() != DOUBLE_QUOTE {
                    return p.unexpected();
                }
                p.begin_token(Code::Indicator)?;
                p.next_char()?;
                p.state = CONTENT;
                return p.end_token(Code::Indicator);
            }

            CONTENT => {
                let code = p.curr_code();
                if code == EOF_CODE {
                    return p.unexpected();
                }
                if code == DOUBLE_QUOTE {
                    p.begin_token(Code::Indicator)?;
                    p.next_char()?;
                    p.state = AFTER_CLOSE;
                    return p.end_token(Code::Indicator);
                }
                if code == BACKSLASH {
                    p.state = ESCAPE_BACKSLASH;
                    return p.empty_token(Code::BeginEscape);
                }
                p.begin_token(Code::Meta)?;
                p.next_char()?;
                return p.end_token(Code::Meta);
            }

            ESCAPE_BACKSLASH => {
                if p.curr_code() == EOF_CODE {
                    return p.commit(Choice::Escaped);
                }
                p.begin_token(Code::Meta)?;
                p.next_char()?;
                p.state = ESCAPE_CHAR;
                return p.end_token(Code::Meta);
            }

            ESCAPE_CHAR => {
                if p.curr_code() == EOF_CODE || p.curr_mask() & classifier::ESCAPE == 0 {
                    return p.commit(Choice::Escaped);
                }
                p.begin_token(Code::Meta)?;
                p.next_char()?;
                p.state = ESCAPE_END;
                return p.end_token(Code::Meta);
            }

            ESCAPE_END => {
                p.state = CONTENT;
                return p.empty_token(Code::EndEscape);
            }

            AFTER_CLOSE => {
                if p.curr_code() == EOF_CODE {
                    return p.empty_token(Code::Done);
                }
                return p.unexpected();
            }

            other => unreachable!("c-double-quoted has no state {other}"),
        }
    }
}
