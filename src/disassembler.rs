//! Bytecode disassembly.
//!
//! Decodes EVM bytecode into an ordered list of `(pc, opcode, arg)`
//! instructions and indexes every `JUMPDEST` by program counter.

use crate::errors::DecodeError;
use crate::utils::helpers::{decode_hex, encode_prefixed};
use crate::utils::opcodes::Opcode;
use primitive_types::U256;
use std::collections::HashMap;

/// A decoded instruction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Instruction {
    /// Byte offset of the opcode in the original code.
    pub pc: usize,
    pub opcode: Opcode,
    /// Immediate bytes of a `PUSHn`; shorter than `n` if the code ends early.
    pub arg: Option<Vec<u8>>,
}

/// Returned by [`Disassembler::instruction_at`] for offsets that are not
/// valid jump destinations.
pub static STOP_INSTRUCTION: Instruction = Instruction {
    pc: 0,
    opcode: Opcode::STOP,
    arg: None,
};

impl Instruction {
    /// The immediate argument, if present and non-empty.
    pub fn arg_bytes(&self) -> Option<&[u8]> {
        self.arg.as_deref().filter(|a| !a.is_empty())
    }

    /// The immediate argument as a big-endian unsigned integer.
    pub fn arg_value(&self) -> Option<U256> {
        self.arg_bytes().map(U256::from_big_endian)
    }

    /// Byte length of this instruction in the original code.
    pub fn size(&self) -> usize {
        1 + self.arg.as_ref().map_or(0, Vec::len)
    }
}

/// Disassembled bytecode with its jump-destination index.
#[derive(Debug, Clone)]
pub struct Disassembler {
    code: Vec<u8>,
    instructions: Vec<Instruction>,
    /// Program counter of each `JUMPDEST` → index into `instructions`.
    jump_dests: HashMap<usize, usize>,
}

impl Disassembler {
    /// Disassemble raw bytecode.
    pub fn new(code: impl Into<Vec<u8>>) -> Self {
        let code = code.into();
        let (instructions, jump_dests) = disassemble(&code);
        Self {
            code,
            instructions,
            jump_dests,
        }
    }

    /// Disassemble bytecode given as a hex string (with or without `0x`).
    ///
    /// Returns `Err(DecodeError::InvalidHex)` on malformed hex instead of
    /// producing a partial listing.
    pub fn from_hex(source: &str) -> Result<Self, DecodeError> {
        Ok(Self::new(decode_hex(source)?))
    }

    pub fn code(&self) -> &[u8] {
        &self.code
    }

    pub fn instructions(&self) -> &[Instruction] {
        &self.instructions
    }

    pub fn len(&self) -> usize {
        self.instructions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.instructions.is_empty()
    }

    /// Whether `pc` is the offset of a `JUMPDEST`.
    pub fn is_jump_dest(&self, pc: usize) -> bool {
        self.jump_dests.contains_key(&pc)
    }

    /// Sorted program counters of all `JUMPDEST`s.
    pub fn jump_dests(&self) -> Vec<usize> {
        let mut pcs: Vec<usize> = self.jump_dests.keys().copied().collect();
        pcs.sort_unstable();
        pcs
    }

    /// The instruction at `offset` if it is a valid jump destination.
    ///
    /// Anything else, including offsets past the end of the code, yields
    /// [`STOP_INSTRUCTION`].
    pub fn instruction_at(&self, offset: U256) -> &Instruction {
        if offset > U256::from(self.code.len()) {
            return &STOP_INSTRUCTION;
        }
        self.jump_dests
            .get(&offset.as_usize())
            .and_then(|&idx| self.instructions.get(idx))
            .unwrap_or(&STOP_INSTRUCTION)
    }

    /// Generate disassembly lines in ascending program-counter order.
    pub fn disasm(&self) -> Vec<String> {
        self.instructions
            .iter()
            .map(|inst| {
                let op = match inst.opcode.name() {
                    Some(name) => name.to_string(),
                    None => format!("UNKNOWN_0x{:02x}", inst.opcode.byte()),
                };
                match inst.arg_bytes() {
                    Some(arg) => format!("{:05x}: {} {}", inst.pc, op, encode_prefixed(arg)),
                    None => format!("{:05x}: {}", inst.pc, op),
                }
            })
            .collect()
    }

    /// Re-serialise the instruction stream back into bytecode.
    pub fn reassemble(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.code.len());
        for inst in &self.instructions {
            out.push(inst.opcode.byte());
            if let Some(arg) = &inst.arg {
                out.extend_from_slice(arg);
            }
        }
        out
    }
}

fn disassemble(bytes: &[u8]) -> (Vec<Instruction>, HashMap<usize, usize>) {
    let mut instructions = Vec::new();
    let mut jump_dests = HashMap::new();
    let mut offset = 0usize;

    while offset < bytes.len() {
        let opcode = Opcode(bytes[offset]);
        let pc = offset;
        offset += 1;

        let arg = if opcode.push_size() > 0 {
            let end = (offset + opcode.push_size()).min(bytes.len());
            let arg = bytes[offset..end].to_vec();
            offset = end;
            Some(arg)
        } else {
            None
        };

        if opcode == Opcode::JUMPDEST {
            jump_dests.insert(pc, instructions.len());
        }
        instructions.push(Instruction { pc, opcode, arg });
    }

    (instructions, jump_dests)
}
