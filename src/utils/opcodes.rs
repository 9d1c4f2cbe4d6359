//! EVM opcode definitions.
//!
//! Each defined opcode carries its byte value, mnemonic and, for `PUSHn`, the
//! number of immediate bytes that follow it in the code.

use std::fmt;
use std::sync::OnceLock;

/// Information about a single defined opcode.
#[derive(Debug, Clone)]
pub struct OpcodeInfo {
    pub byte: u8,
    pub name: &'static str,
    /// If this is a `PUSHn`, the number of immediate bytes.
    pub immediate_bytes: u8,
}

/// A single-byte operation code. Undefined bytes are still representable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Opcode(pub u8);

impl Opcode {
    pub const STOP: Opcode = Opcode(0x00);
    pub const ADD: Opcode = Opcode(0x01);
    pub const LT: Opcode = Opcode(0x10);
    pub const GT: Opcode = Opcode(0x11);
    pub const EQ: Opcode = Opcode(0x14);
    pub const ISZERO: Opcode = Opcode(0x15);
    pub const AND: Opcode = Opcode(0x16);
    pub const SHR: Opcode = Opcode(0x1C);
    pub const CALLVALUE: Opcode = Opcode(0x34);
    pub const CALLDATALOAD: Opcode = Opcode(0x35);
    pub const CALLDATASIZE: Opcode = Opcode(0x36);
    pub const POP: Opcode = Opcode(0x50);
    pub const MSTORE: Opcode = Opcode(0x52);
    pub const JUMP: Opcode = Opcode(0x56);
    pub const JUMPI: Opcode = Opcode(0x57);
    pub const JUMPDEST: Opcode = Opcode(0x5B);
    pub const PUSH0: Opcode = Opcode(0x5F);
    pub const PUSH1: Opcode = Opcode(0x60);
    pub const PUSH2: Opcode = Opcode(0x61);
    pub const PUSH4: Opcode = Opcode(0x63);
    pub const PUSH32: Opcode = Opcode(0x7F);
    pub const DUP1: Opcode = Opcode(0x80);
    pub const SWAP1: Opcode = Opcode(0x90);
    pub const LOG0: Opcode = Opcode(0xA0);
    pub const LOG1: Opcode = Opcode(0xA1);
    pub const LOG2: Opcode = Opcode(0xA2);
    pub const LOG3: Opcode = Opcode(0xA3);
    pub const LOG4: Opcode = Opcode(0xA4);
    pub const RETURN: Opcode = Opcode(0xF3);
    pub const REVERT: Opcode = Opcode(0xFD);
    pub const INVALID: Opcode = Opcode(0xFE);

    /// The raw byte value.
    pub fn byte(self) -> u8 {
        self.0
    }

    /// `PUSH0` through `PUSH32`.
    pub fn is_push(self) -> bool {
        (0x5F..=0x7F).contains(&self.0)
    }

    /// Number of immediate bytes that follow this opcode in the code.
    pub fn push_size(self) -> usize {
        match self.info() {
            Some(info) => info.immediate_bytes as usize,
            None => 0,
        }
    }

    /// `LOG0` through `LOG4`.
    pub fn is_log(self) -> bool {
        (0xA0..=0xA4).contains(&self.0)
    }

    /// Table entry, or `None` for bytes no hard-fork has assigned.
    pub fn info(self) -> Option<&'static OpcodeInfo> {
        opcode_table()[self.0 as usize].as_ref()
    }

    /// Upper-case mnemonic, e.g. `PUSH4`.
    pub fn name(self) -> Option<&'static str> {
        self.info().map(|info| info.name)
    }
}

impl fmt::Display for Opcode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.name() {
            Some(name) => f.write_str(name),
            None => write!(f, "opcode 0x{:02x} not defined", self.0),
        }
    }
}

impl From<u8> for Opcode {
    fn from(byte: u8) -> Self {
        Opcode(byte)
    }
}

/// The full opcode table, indexed by byte value.
pub fn opcode_table() -> &'static [Option<OpcodeInfo>; 256] {
    static TABLE: OnceLock<[Option<OpcodeInfo>; 256]> = OnceLock::new();
    TABLE.get_or_init(build_opcode_table)
}

fn build_opcode_table() -> [Option<OpcodeInfo>; 256] {
    const NONE: Option<OpcodeInfo> = None;
    let mut m = [NONE; 256];

    macro_rules! op {
        ($byte:expr, $name:expr) => {
            m[$byte as usize] = Some(OpcodeInfo {
                byte: $byte,
                name: $name,
                immediate_bytes: 0,
            });
        };
    }

    // -- Stop and Arithmetic -----------------------------------------------
    op!(0x00, "STOP");
    op!(0x01, "ADD");
    op!(0x02, "MUL");
    op!(0x03, "SUB");
    op!(0x04, "DIV");
    op!(0x05, "SDIV");
    op!(0x06, "MOD");
    op!(0x07, "SMOD");
    op!(0x08, "ADDMOD");
    op!(0x09, "MULMOD");
    op!(0x0A, "EXP");
    op!(0x0B, "SIGNEXTEND");

    // -- Comparison and Bitwise Logic --------------------------------------
    op!(0x10, "LT");
    op!(0x11, "GT");
    op!(0x12, "SLT");
    op!(0x13, "SGT");
    op!(0x14, "EQ");
    op!(0x15, "ISZERO");
    op!(0x16, "AND");
    op!(0x17, "OR");
    op!(0x18, "XOR");
    op!(0x19, "NOT");
    op!(0x1A, "BYTE");
    op!(0x1B, "SHL");
    op!(0x1C, "SHR");
    op!(0x1D, "SAR");

    op!(0x20, "KECCAK256");

    // -- Environment Information -------------------------------------------
    op!(0x30, "ADDRESS");
    op!(0x31, "BALANCE");
    op!(0x32, "ORIGIN");
    op!(0x33, "CALLER");
    op!(0x34, "CALLVALUE");
    op!(0x35, "CALLDATALOAD");
    op!(0x36, "CALLDATASIZE");
    op!(0x37, "CALLDATACOPY");
    op!(0x38, "CODESIZE");
    op!(0x39, "CODECOPY");
    op!(0x3A, "GASPRICE");
    op!(0x3B, "EXTCODESIZE");
    op!(0x3C, "EXTCODECOPY");
    op!(0x3D, "RETURNDATASIZE");
    op!(0x3E, "RETURNDATACOPY");
    op!(0x3F, "EXTCODEHASH");

    // -- Block Information -------------------------------------------------
    op!(0x40, "BLOCKHASH");
    op!(0x41, "COINBASE");
    op!(0x42, "TIMESTAMP");
    op!(0x43, "NUMBER");
    op!(0x44, "DIFFICULTY");
    op!(0x45, "GASLIMIT");
    op!(0x46, "CHAINID");
    op!(0x47, "SELFBALANCE");
    op!(0x48, "BASEFEE");
    op!(0x49, "BLOBHASH");
    op!(0x4A, "BLOBBASEFEE");

    // -- Stack, Memory, Storage and Flow -----------------------------------
    op!(0x50, "POP");
    op!(0x51, "MLOAD");
    op!(0x52, "MSTORE");
    op!(0x53, "MSTORE8");
    op!(0x54, "SLOAD");
    op!(0x55, "SSTORE");
    op!(0x56, "JUMP");
    op!(0x57, "JUMPI");
    op!(0x58, "PC");
    op!(0x59, "MSIZE");
    op!(0x5A, "GAS");
    op!(0x5B, "JUMPDEST");
    op!(0x5C, "TLOAD");
    op!(0x5D, "TSTORE");
    op!(0x5E, "MCOPY");
    op!(0x5F, "PUSH0");

    // -- PUSH1..PUSH32 -----------------------------------------------------
    for n in 1u8..=32 {
        let byte = 0x5F + n;
        // Leaked once; the table lives for the whole process.
        let name: &'static str = Box::leak(format!("PUSH{n}").into_boxed_str());
        m[byte as usize] = Some(OpcodeInfo {
            byte,
            name,
            immediate_bytes: n,
        });
    }

    // -- DUP1..DUP16 / SWAP1..SWAP16 ---------------------------------------
    for n in 1u8..=16 {
        let dup = 0x7F + n;
        let swap = 0x8F + n;
        m[dup as usize] = Some(OpcodeInfo {
            byte: dup,
            name: Box::leak(format!("DUP{n}").into_boxed_str()),
            immediate_bytes: 0,
        });
        m[swap as usize] = Some(OpcodeInfo {
            byte: swap,
            name: Box::leak(format!("SWAP{n}").into_boxed_str()),
            immediate_bytes: 0,
        });
    }

    // -- LOG0..LOG4 ---------------------------------------------------------
    for n in 0u8..=4 {
        let byte = 0xA0 + n;
        m[byte as usize] = Some(OpcodeInfo {
            byte,
            name: Box::leak(format!("LOG{n}").into_boxed_str()),
            immediate_bytes: 0,
        });
    }

    // -- System operations -------------------------------------------------
    op!(0xF0, "CREATE");
    op!(0xF1, "CALL");
    op!(0xF2, "CALLCODE");
    op!(0xF3, "RETURN");
    op!(0xF4, "DELEGATECALL");
    op!(0xF5, "CREATE2");
    op!(0xFA, "STATICCALL");
    op!(0xFD, "REVERT");
    op!(0xFE, "INVALID");
    op!(0xFF, "SELFDESTRUCT");

    m
}
