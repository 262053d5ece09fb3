// adl-core - Instruction encoding tests
// Copyright (c) 2025 Tom Waddington. MIT licensed.

use adl_core::code::{Instructions, Opcode, make, read_operands, read_u8, read_u16};
use proptest::prelude::*;

#[test]
fn make_encodes_big_endian_operands() {
    let tests: [(Opcode, &[usize], &[u8]); 4] = [
        (Opcode::Constant, &[65534], &[0, 255, 254]),
        (Opcode::Add, &[], &[1]),
        (Opcode::GetLocal, &[255], &[24, 255]),
        (Opcode::Closure, &[65534, 255], &[27, 255, 254, 255]),
    ];

    for (op, operands, expected) in tests {
        let instruction = make(op, operands);
        assert_eq!(
            instruction.0, expected,
            "wrong encoding for {:?} {:?}",
            op, operands
        );
    }
}

#[test]
fn read_operands_round_trips() {
    let tests: [(Opcode, &[usize], usize); 3] = [
        (Opcode::Constant, &[65535], 2),
        (Opcode::GetLocal, &[255], 1),
        (Opcode::Closure, &[65535, 255], 3),
    ];

    for (op, operands, bytes_read) in tests {
        let instruction = make(op, operands);
        let def = op.definition();

        let (operands_read, n) = read_operands(&def, &instruction[1..]);
        assert_eq!(n, bytes_read);
        assert_eq!(operands_read, operands);
    }
}

#[test]
fn instructions_display_as_disassembly() {
    let stream: Instructions = concat(vec![
        make(Opcode::Add, &[]),
        make(Opcode::GetLocal, &[1]),
        make(Opcode::Constant, &[2]),
        make(Opcode::Constant, &[65535]),
        make(Opcode::Closure, &[65535, 255]),
    ]);

    let expected = "0000 OpAdd
0001 OpGetLocal 1
0003 OpConstant 2
0006 OpConstant 65535
0009 OpClosure 65535 255
";

    assert_eq!(stream.to_string(), expected);
}

#[test]
fn opcode_decoding_rejects_undefined_bytes() {
    assert!(Opcode::try_from(0).is_ok());
    assert!(Opcode::try_from(29).is_ok());
    let err = Opcode::try_from(200).unwrap_err();
    assert_eq!(err.to_string(), "opcode 200 undefined");
}

#[test]
fn opcode_byte_values_are_stable() {
    // The discriminants are the wire format; a reorder would break every
    // compiled program.
    assert_eq!(Opcode::Constant as u8, 0);
    assert_eq!(Opcode::Pop as u8, 2);
    assert_eq!(Opcode::Jump as u8, 14);
    assert_eq!(Opcode::GetFree as u8, 29);
}

#[test]
fn read_helpers() {
    assert_eq!(read_u16(&[1, 2]), 258);
    assert_eq!(read_u8(&[7]), 7);
}

fn concat(instructions: Vec<Instructions>) -> Instructions {
    let mut out = Instructions::default();
    for ins in instructions {
        out.extend_from_slice(&ins);
    }
    out
}

proptest! {
    /// make/read_operands round-trip for every two-byte-operand opcode.
    #[test]
    fn u16_operand_round_trip(operand in any::<u16>()) {
        for op in [
            Opcode::Constant,
            Opcode::Jump,
            Opcode::JumpNotTruthy,
            Opcode::GetGlobal,
            Opcode::SetGlobal,
            Opcode::Array,
            Opcode::Hash,
        ] {
            let instruction = make(op, &[operand as usize]);
            let (operands, read) = read_operands(&op.definition(), &instruction[1..]);
            prop_assert_eq!(read, 2);
            prop_assert_eq!(&operands, &[operand as usize]);
        }
    }

    /// make/read_operands round-trip for every one-byte-operand opcode.
    #[test]
    fn u8_operand_round_trip(operand in any::<u8>()) {
        for op in [
            Opcode::Call,
            Opcode::GetLocal,
            Opcode::SetLocal,
            Opcode::GetBuiltin,
            Opcode::GetFree,
        ] {
            let instruction = make(op, &[operand as usize]);
            let (operands, read) = read_operands(&op.definition(), &instruction[1..]);
            prop_assert_eq!(read, 1);
            prop_assert_eq!(&operands, &[operand as usize]);
        }
    }

    /// Closure carries a u16 and a u8 operand.
    #[test]
    fn closure_operand_round_trip(const_index in any::<u16>(), num_free in any::<u8>()) {
        let instruction = make(Opcode::Closure, &[const_index as usize, num_free as usize]);
        let (operands, read) = read_operands(&Opcode::Closure.definition(), &instruction[1..]);
        prop_assert_eq!(read, 3);
        prop_assert_eq!(&operands, &[const_index as usize, num_free as usize]);
    }
}
