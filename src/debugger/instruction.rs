use crate::constants;
use crate::memory::MemSpace;
use crate::opcode::{FormatSet, OpcodeTable};

use super::{Result, SimError};

/// One decoded instruction. The opcode byte is already masked to its high
/// six bits; `disp` is the raw 12-bit field, sign-extended at execution.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Instruction {
    Format1 {
        opcode: u8,
    },
    Format2 {
        opcode: u8,
        r1: u8,
        r2: u8,
    },
    Format3 {
        opcode: u8,
        n: bool,
        i: bool,
        x: bool,
        b: bool,
        p: bool,
        disp: u16,
    },
    Format4 {
        opcode: u8,
        n: bool,
        i: bool,
        x: bool,
        addr: u32,
    },
}

impl Instruction {
    /// Fetches and decodes the instruction at `pc`. Returns the decoded
    /// variant and the address of the following instruction. The dictionary
    /// decides between the three instruction lengths; the `e` flag splits
    /// formats 3 and 4.
    pub fn decode(
        memory: &MemSpace,
        pc: u32,
        opcodes: &OpcodeTable,
    ) -> Result<(Instruction, u32)> {
        let head = memory.get(pc, constants::WORD_BYTES)?;
        let bytes = [head[0], head[1], head[2]];

        let opcode = bytes[0] & constants::OPCODE_MASK;
        let entry = opcodes
            .by_opcode(opcode)
            .ok_or(SimError::UnknownOpcode { opcode, address: pc })?;

        if entry.formats.contains(FormatSet::F1) {
            Ok((Instruction::Format1 { opcode }, pc + 1))
        } else if entry.formats.contains(FormatSet::F2) {
            Ok((
                Instruction::Format2 {
                    opcode,
                    r1: bytes[1] >> 4,
                    r2: bytes[1] & 0x0F,
                },
                pc + 2,
            ))
        } else {
            let n = bytes[0] & constants::FLAG_N != 0;
            let i = bytes[0] & constants::FLAG_I != 0;
            let x = bytes[1] & constants::FLAG_X != 0;
            let b = bytes[1] & constants::FLAG_B != 0;
            let p = bytes[1] & constants::FLAG_P != 0;
            let e = bytes[1] & constants::FLAG_E != 0;

            if e {
                let tail = memory.get(pc + 3, 1)?[0];
                let addr = u32::from(bytes[1] & 0x0F) << 16
                    | u32::from(bytes[2]) << 8
                    | u32::from(tail);
                Ok((Instruction::Format4 { opcode, n, i, x, addr }, pc + 4))
            } else {
                let disp = u16::from(bytes[1] & 0x0F) << 8 | u16::from(bytes[2]);
                Ok((
                    Instruction::Format3 {
                        opcode,
                        n,
                        i,
                        x,
                        b,
                        p,
                        disp,
                    },
                    pc + 3,
                ))
            }
        }
    }
}
