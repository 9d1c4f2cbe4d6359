//! Signature extraction heuristics over a disassembled instruction stream.
//!
//! Both matchers work on opcode shapes only; they never model the stack.

use crate::disassembler::{Disassembler, Instruction};
use crate::errors::DecodeError;
use crate::signature::{SignatureKind, SignatureSet};
use crate::utils::helpers::encode_prefixed;
use crate::utils::opcodes::Opcode;

/// Maximum instruction distance between a `PUSH32` and the `LOGn` that
/// consumes it for the topic to count as an event signature.
pub const DEFAULT_EVENT_WINDOW: usize = 25;

/// Anything that can report the selectors and topics a contract exposes.
pub trait BytecodeParser: Send + Sync {
    fn function_signatures(&self) -> SignatureSet;
    fn event_signatures(&self) -> SignatureSet;
}

/// Parser for solc-generated code.
#[derive(Debug, Clone)]
pub struct SolidityParser {
    disassembler: Disassembler,
    event_window: usize,
}

impl SolidityParser {
    pub fn new(disassembler: Disassembler) -> Self {
        Self {
            disassembler,
            event_window: DEFAULT_EVENT_WINDOW,
        }
    }

    pub fn from_bytes(code: impl Into<Vec<u8>>) -> Self {
        Self::new(Disassembler::new(code))
    }

    pub fn from_hex(source: &str) -> Result<Self, DecodeError> {
        Ok(Self::new(Disassembler::from_hex(source)?))
    }

    /// Override the `PUSH32` → `LOGn` distance.
    pub fn with_event_window(mut self, window: usize) -> Self {
        self.event_window = window;
        self
    }

    pub fn disassembler(&self) -> &Disassembler {
        &self.disassembler
    }
}

impl BytecodeParser for SolidityParser {
    fn function_signatures(&self) -> SignatureSet {
        extract_function_signatures(&self.disassembler)
    }

    fn event_signatures(&self) -> SignatureSet {
        extract_event_signatures(&self.disassembler, self.event_window)
    }
}

/// Find selectors dispatched with the solc idiom
/// `DUP1 PUSH4 <selector> EQ PUSHn <dest> JUMPI` where `<dest>` is a `JUMPDEST`.
pub fn extract_function_signatures(d: &Disassembler) -> SignatureSet {
    let mut selectors = SignatureSet::new(SignatureKind::Function);

    for window in d.instructions().windows(5) {
        if window[4].opcode != Opcode::JUMPI {
            continue;
        }
        if let Some(selector) = match_dispatch(d, &window[..4]) {
            selectors.insert(selector);
        }
    }

    selectors
}

/// `window` is the four instructions preceding a `JUMPI`.
fn match_dispatch(d: &Disassembler, window: &[Instruction]) -> Option<String> {
    let [dup, push4, eq, push_dest] = window else {
        return None;
    };

    if !push_dest.opcode.is_push() {
        return None;
    }
    let dest = push_dest.arg_value()?;

    if eq.opcode != Opcode::EQ {
        return None;
    }

    if push4.opcode != Opcode::PUSH4 {
        return None;
    }
    let selector = encode_prefixed(push4.arg_bytes()?);

    if dup.opcode != Opcode::DUP1 {
        return None;
    }

    if d.instruction_at(dest).opcode != Opcode::JUMPDEST {
        return None;
    }

    Some(selector)
}

/// Collect `PUSH32` values that are consumed by a `LOGn` at most `window`
/// instructions later.
///
/// Only the most recent `PUSH32` is tracked, and any `LOGn` clears it, in
/// range or not. This both misses topics set up far from the log and accepts
/// unrelated constants that happen to sit close to one.
pub fn extract_event_signatures(d: &Disassembler, window: usize) -> SignatureSet {
    let mut topics = SignatureSet::new(SignatureKind::Event);
    let mut pending: Option<(usize, String)> = None;

    for (i, inst) in d.instructions().iter().enumerate() {
        if inst.opcode == Opcode::PUSH32 {
            if let Some(arg) = inst.arg_bytes() {
                pending = Some((i, encode_prefixed(arg)));
            }
        }

        if inst.opcode.is_log() {
            if let Some((pushed_at, topic)) = pending.take() {
                if i - pushed_at <= window {
                    topics.insert(topic);
                }
            }
        }
    }

    topics
}
