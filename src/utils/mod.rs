pub mod helpers;
pub mod opcodes;
