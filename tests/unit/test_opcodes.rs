//! Opcode table coverage.

use sigscope::utils::opcodes::*;

#[test]
fn test_all_frontier_opcodes_present() {
    let frontier_ops: &[u8] = &[
        0x00, 0x01, 0x02, 0x03, 0x04, 0x05, 0x06, 0x07, 0x08, 0x09, 0x0A, 0x0B,
        0x10, 0x11, 0x12, 0x13, 0x14, 0x15, 0x16, 0x17, 0x18, 0x19, 0x1A,
        0x20,
        0x30, 0x31, 0x32, 0x33, 0x34, 0x35, 0x36, 0x37, 0x38, 0x39, 0x3A, 0x3B, 0x3C,
        0x40, 0x41, 0x42, 0x43, 0x44, 0x45,
        0x50, 0x51, 0x52, 0x53, 0x54, 0x55, 0x56, 0x57, 0x58, 0x59, 0x5A, 0x5B,
        0xF0, 0xF1, 0xF2, 0xF3, 0xFE, 0xFF,
    ];
    for &byte in frontier_ops {
        assert!(Opcode(byte).info().is_some(), "missing frontier opcode 0x{byte:02x}");
    }
}

#[test]
fn test_push_range() {
    assert_eq!(Opcode::PUSH0.push_size(), 0);
    for n in 1u8..=32 {
        let op = Opcode(0x5F + n);
        assert!(op.is_push());
        assert_eq!(op.push_size(), n as usize);
        assert_eq!(op.name(), Some(format!("PUSH{n}").as_str()));
    }
    assert!(!Opcode(0x80).is_push());
}

#[test]
fn test_log_range() {
    for (i, byte) in (0xA0u8..=0xA4).enumerate() {
        let op = Opcode(byte);
        assert!(op.is_log());
        assert_eq!(op.name(), Some(format!("LOG{i}").as_str()));
    }
    assert!(!Opcode(0xA5).is_log());
    assert!(!Opcode(0x9F).is_log());
}

#[test]
fn test_named_constants() {
    assert_eq!(Opcode::DUP1.byte(), 0x80);
    assert_eq!(Opcode::PUSH4.byte(), 0x63);
    assert_eq!(Opcode::EQ.byte(), 0x14);
    assert_eq!(Opcode::JUMPI.byte(), 0x57);
    assert_eq!(Opcode::JUMPDEST.byte(), 0x5B);
    assert_eq!(Opcode::PUSH32.byte(), 0x7F);
    assert_eq!(Opcode::JUMPDEST.name(), Some("JUMPDEST"));
}

#[test]
fn test_table_consistency() {
    let table = opcode_table();
    for (byte, entry) in table.iter().enumerate() {
        if let Some(info) = entry {
            assert_eq!(info.byte as usize, byte);
            assert_eq!(info.immediate_bytes as usize, Opcode(byte as u8).push_size());
        }
    }
}

#[test]
fn test_undefined_opcode() {
    let op = Opcode::from(0xEF);
    assert!(op.info().is_none());
    assert!(op.name().is_none());
    assert_eq!(op.to_string(), "opcode 0xef not defined");
}
