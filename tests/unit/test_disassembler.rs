//! Disassembler behaviour on hand-assembled bytecode.

use primitive_types::U256;
use sigscope::disassembler::{Disassembler, STOP_INSTRUCTION};
use sigscope::errors::DecodeError;
use sigscope::utils::opcodes::Opcode;

#[test]
fn test_push_variants() {
    let d = Disassembler::from_hex("60ff").unwrap();
    assert_eq!(d.len(), 1);
    assert_eq!(d.instructions()[0].arg_bytes(), Some(&[0xff][..]));

    let d = Disassembler::from_hex(&format!("7f{}", "11".repeat(32))).unwrap();
    assert_eq!(d.len(), 1);
    assert_eq!(d.instructions()[0].opcode, Opcode::PUSH32);
    assert_eq!(d.instructions()[0].size(), 33);
}

#[test]
fn test_push0_has_no_argument() {
    let d = Disassembler::from_hex("5f00").unwrap();
    assert_eq!(d.len(), 2);
    assert!(d.instructions()[0].arg_bytes().is_none());
}

#[test]
fn test_truncated_push_is_clipped() {
    // PUSH4 with only two bytes left.
    let d = Disassembler::from_hex("6001631234").unwrap();
    assert_eq!(d.len(), 2);
    let last = &d.instructions()[1];
    assert_eq!(last.pc, 2);
    assert_eq!(last.arg_bytes(), Some(&[0x12, 0x34][..]));
    assert_eq!(last.arg_value(), Some(U256::from(0x1234)));
}

#[test]
fn test_push_at_end_of_code() {
    let d = Disassembler::from_hex("0060").unwrap();
    assert_eq!(d.len(), 2);
    assert!(d.instructions()[1].arg_bytes().is_none());
}

#[test]
fn test_pcs_are_strictly_increasing() {
    let d = Disassembler::from_hex("6080604052348015600f57600080fd5b50").unwrap();
    let pcs: Vec<usize> = d.instructions().iter().map(|i| i.pc).collect();
    assert!(pcs.windows(2).all(|w| w[0] < w[1]));
    assert_eq!(pcs[0], 0);
}

#[test]
fn test_jumpdest_inside_push_data_is_ignored() {
    // PUSH1 0x5b, JUMPDEST
    let d = Disassembler::from_hex("605b5b").unwrap();
    assert!(!d.is_jump_dest(1));
    assert!(d.is_jump_dest(2));
    assert_eq!(d.jump_dests(), vec![2]);
}

#[test]
fn test_instruction_at() {
    let d = Disassembler::from_hex("6004565b00").unwrap();
    let dest = d.instruction_at(U256::from(3));
    assert_eq!(dest.opcode, Opcode::JUMPDEST);
    assert_eq!(dest.pc, 3);

    // Not a jump destination.
    assert_eq!(d.instruction_at(U256::from(2)), &STOP_INSTRUCTION);
    // Equal to and past the code length.
    assert_eq!(d.instruction_at(U256::from(5)), &STOP_INSTRUCTION);
    assert_eq!(d.instruction_at(U256::MAX), &STOP_INSTRUCTION);
}

#[test]
fn test_disasm_listing() {
    let d = Disassembler::from_hex("0x6001600201fe").unwrap();
    assert_eq!(
        d.disasm(),
        vec![
            "00000: PUSH1 0x01",
            "00002: PUSH1 0x02",
            "00004: ADD",
            "00005: INVALID",
        ]
    );
}

#[test]
fn test_disasm_unknown_opcode() {
    let d = Disassembler::from_hex("ef").unwrap();
    assert_eq!(d.disasm(), vec!["00000: UNKNOWN_0xef"]);
}

#[test]
fn test_reassemble_round_trip() {
    let hex = "6080604052348015600f57600080fd5b50603f80601d6000396000f3fe";
    let d = Disassembler::from_hex(hex).unwrap();
    assert_eq!(d.reassemble(), d.code());
}

#[test]
fn test_empty_code() {
    let d = Disassembler::from_hex("0x").unwrap();
    assert!(d.is_empty());
    assert!(d.disasm().is_empty());
    assert_eq!(d.instruction_at(U256::zero()), &STOP_INSTRUCTION);
}

#[test]
fn test_invalid_hex() {
    assert!(matches!(
        Disassembler::from_hex("0xzz"),
        Err(DecodeError::InvalidHex(_))
    ));
    assert!(Disassembler::from_hex("abc").is_err());
}
