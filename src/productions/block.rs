//! `l+block-sequence` (`SPEC_FULL.md` §9, scenario 6): a simplified block
//! sequence of single-word scalar entries (`- word`, one per line). Real YAML
//! block sequences are indentation-parameterized (the `n` argument threading
//! through `spec.md` §4.8's production-table lookup) and their entries can
//! hold arbitrary nested nodes; this hand-written slice instead demonstrates
//! the properly-nested `Begin*`/`End*` token pairing scenario 6 checks for —
//! `BeginSequence`/`BeginNode`/`BeginScalar` opened and closed in matching
//! order around each entry's scalar content.

use crate::classifier;
use crate::runtime::{Parser, StepOutcome, EOF_CODE};
use crate::source::ByteSource;
use crate::token::Code;

const START: i32 = 0;
const ENTRY_CHECK: i32 = 1;
const ENTRY_INDICATOR: i32 = 2;
const ENTRY_SPACE: i32 = 3;
const BEGIN_NODE: i32 = 4;
const BEGIN_SCALAR: i32 = 5;
const SCALAR_TEXT: i32 = 6;
const END_SCALAR: i32 = 7;
const END_NODE: i32 = 8;
const LINE_BREAK: i32 = 9;
const END_SEQUENCE: i32 = 10;
const AFTER_END_SEQUENCE: i32 = 11;

const DASH: i64 = '-' as i64;

pub fn step<S: ByteSource>(p: &mut Parser<S>) -> crate::error::YipResult<StepOutcome> {
    loop {
        match p.state {
            START => {
                p.state = ENTRY_CHECK;
                return p.empty_token(Code::BeginSequence);
            }

            ENTRY_CHECK => {
                p.state = if p.curr_code() == DASH {
                    ENTRY_INDICATOR
                } else {
                    END_SEQUENCE
                };
            }

            ENTRY_INDICATOR => {
                p.begin_token(Code::Indicator)?;
                p.next_char()?;
                p.state = ENTRY_SPACE;
                return p.end_token(Code::Indicator);
            }

            ENTRY_SPACE => {
                if p.curr_mask() & classifier::WHITE != 0 {
                    p.begin_token(Code::White)?;
                    p.next_char()?;
                    p.state = BEGIN_NODE;
                    return p.end_token(Code::White);
                }
                p.state = BEGIN_NODE;
            }

            BEGIN_NODE => {
                p.state = BEGIN_SCALAR;
                return p.empty_token(Code::BeginNode);
            }

            BEGIN_SCALAR => {
                p.state = SCALAR_TEXT;
                return p.empty_token(Code::BeginScalar);
            }

            SCALAR_TEXT => {
                p.begin_token(Code::Text)?;
                loop {
                    let code = p.curr_code();
                    if code == EOF_CODE {
                        break;
                    }
                    let mask = p.curr_mask();
                    if mask & (classifier::BREAK | classifier::WHITE) != 0 {
                        break;
                    }
                    p.next_char()?;
                }
                p.state = END_SCALAR;
                return p.end_token(Code::Text);
            }

            END_SCALAR => {
                p.state = END_NODE;
                return p.empty_token(Code::EndScalar);
            }

            END_NODE => {
                p.state = LINE_BREAK;
                return p.empty_token(Code::EndNode);
            }

            LINE_BREAK => {
                if p.curr_mask() & classifier::BREAK != 0 {
                    p.begin_token(Code::Break)?;
                    p.next_char()?;
                    p.next_line();
                    p.state = ENTRY_CHECK;
                    return p.end_token(Code::Break);
                }
                p.state = ENTRY_CHECK;
            }

            END_SEQUENCE => {
                p.state = AFTER_END_SEQUENCE;
                return p.empty_token(Code::EndSequence);
            }

            AFTER_END_SEQUENCE => {
                if p.curr_code() == EOF_CODE {
                    return p.empty_token(Code::Done);
                }
                return p.unexpected();
            }

            other => unreachable!("l+block-sequence has no state {other}"),
        }
    }
}
