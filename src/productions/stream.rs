//! `l-yaml-stream` (`SPEC_FULL.md` §9, scenario 1/2/4/5): the top-level
//! production driving a whole document stream. Hand-written rather than
//! generated, it covers the representative slice `spec.md`'s scenarios
//! exercise: BOM announcement, the `---` document-start marker (disambiguated
//! from a bare `-` via [`crate::frame::FrameStack`] backtracking), line
//! breaks, whitespace, decode-failure resynchronization, and a fallback
//! single-character `Text` token for anything else.
//!
//! Grounded in `original_source/yip.c`'s generated dispatch shape: each
//! `Parser::state` value names one resumption point, and a single call into
//! [`step`] loops internally (via `ensure_lookahead`/`next_char`) until a
//! token is ready, mirroring the "one call, one token" contract `yip_next_token`
//! expects from `(*Machine)(yip)`.

use crate::classifier;
use crate::encoding;
use crate::runtime::{Parser, StepOutcome, EOF_CODE};
use crate::source::ByteSource;
use crate::token::Code;

const CHECK_BOM: i32 = 0;
const MAIN: i32 = 1;
const RESYNC: i32 = 2;

const DASH: i64 = '-' as i64;

pub fn step<S: ByteSource>(p: &mut Parser<S>) -> crate::error::YipResult<StepOutcome> {
    loop {
        match p.state {
            CHECK_BOM => {
                if p.curr_mask() & classifier::BOM_CHAR != 0 {
                    p.begin_token(Code::Bom)?;
                    p.next_char()?;
                    let outcome = p.end_token(Code::Bom)?;
                    p.state = MAIN;
                    return Ok(outcome);
                }
                p.state = MAIN;
            }

            MAIN => {
                let code = p.curr_code();
                if code == EOF_CODE {
                    return p.empty_token(Code::Done);
                }
                if code == encoding::INVALID_CODE {
                    p.state = RESYNC;
                    return p.unexpected();
                }
                if code == DASH {
                    if let Some(outcome) = try_document_start(p)? {
                        return Ok(outcome);
                    }
                    // `try_document_start` rolled back on a mismatch; curr is
                    // back at the dash, fall through to the indicator case.
                }
                let mask = p.curr_mask();
                if mask & classifier::BREAK != 0 {
                    p.begin_token(Code::Break)?;
                    p.next_char()?;
                    p.next_line();
                    return p.end_token(Code::Break);
                }
                if mask & classifier::WHITE != 0 {
                    p.begin_token(Code::White)?;
                    p.next_char()?;
                    return p.end_token(Code::White);
                }
                if mask & classifier::INDICATOR != 0 {
                    p.begin_token(Code::Indicator)?;
                    p.next_char()?;
                    return p.end_token(Code::Indicator);
                }
                p.begin_token(Code::Text)?;
                p.next_char()?;
                return p.end_token(Code::Text);
            }

            RESYNC => {
                p.next_char()?;
                p.state = MAIN;
            }

            other => unreachable!("l-yaml-stream has no state {other}"),
        }
    }
}

/// Ordered-choice lookahead for the `"---"` document-start marker
/// (`spec.md` §9 scenario 1), implemented with the backtracking Frame Stack
/// rather than arbitrary-length lookahead: push a snapshot, tentatively
/// consume up to three dashes, and either commit (`pop_state`) into a single
/// `DocumentStart` token or roll back (`reset_state`) to let the caller
/// fall through to treating the lone dash as a generic `Indicator`.
///
/// Returns `Ok(None)` after a rollback (caller should keep dispatching from
/// the now-restored `curr`), `Ok(Some(outcome))` once `DocumentStart` was
/// committed and finalized.
fn try_document_start<S: ByteSource>(
    p: &mut Parser<S>,
) -> crate::error::YipResult<Option<StepOutcome>> {
    p.push_state();
    p.begin_token(Code::DocumentStart)?;
    let mut matched = true;
    for _ in 0..3 {
        if p.curr_code() != DASH {
            matched = false;
            break;
        }
        p.next_char()?;
    }
    let terminator_ok = matched && (p.curr_code() == EOF_CODE || p.curr_mask() & classifier::BREAK != 0 || p.curr_mask() & classifier::WHITE != 0);
    if terminator_ok {
        p.pop_state()?;
        Ok(Some(p.end_token(Code::DocumentStart)?))
    } else {
        // `reset_state` only rewinds the pushed frame (`yip.c` never moves
        // `Frame` there); `pop_state` is what actually ends the backtracking
        // scope, so both are needed to fully abandon a failed lookahead.
        p.reset_state();
        p.pop_state()?;
        Ok(None)
    }
}
