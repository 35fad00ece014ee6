use num_derive::{FromPrimitive, ToPrimitive};
use num_traits::{FromPrimitive, ToPrimitive};

use crate::constants;

/// Register ordinals as encoded in format 2 instructions. Ordinal 7 is
/// unassigned.
#[derive(Clone, Copy, Debug, Eq, PartialEq, FromPrimitive, ToPrimitive)]
pub enum RegisterId {
    A = 0,  // Accumulator; used for arithmetic operations.
    X = 1,  // Index register; used for addressing.
    L = 2,  // Linkage register; JSUB stores the return address here.
    B = 3,  // Base register; used for addressing.
    S = 4,  // General working register.
    T = 5,  // General working register.
    F = 6,  // Floating-point accumulator (48 bits, unused here).
    PC = 8, // Program counter.
    SW = 9, // Status word; holds the condition code.
}

/// Names and ordinals of the registers, in ordinal order. Consulted before
/// the user symbol table when the assembler resolves an operand.
pub const REGISTERS: [(&str, u32); 9] = [
    ("A", 0),
    ("X", 1),
    ("L", 2),
    ("B", 3),
    ("S", 4),
    ("T", 5),
    ("F", 6),
    ("PC", 8),
    ("SW", 9),
];

pub fn register_number(name: &str) -> Option<u32> {
    REGISTERS
        .iter()
        .find(|(reg, _)| *reg == name)
        .map(|&(_, number)| number)
}

pub fn is_register(name: &str) -> bool {
    register_number(name).is_some()
}

/// Condition code values stored in the low byte of SW.
pub const CC_LESS: u32 = b'<' as u32;
pub const CC_EQUAL: u32 = b'=' as u32;
pub const CC_GREATER: u32 = b'>' as u32;

/// The nine registers, each held as a 24-bit unsigned value.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct RegisterFile {
    values: [u32; constants::REGISTER_FILE_LEN],
}

impl RegisterFile {
    pub fn new() -> RegisterFile {
        RegisterFile::default()
    }

    pub fn get(&self, id: RegisterId) -> u32 {
        self.values[id.to_usize().unwrap_or(0)]
    }

    pub fn set(&mut self, id: RegisterId, value: u32) {
        self.values[id.to_usize().unwrap_or(0)] = value & constants::WORD_MASK;
    }

    pub fn get_numbered(&self, number: u8) -> Option<u32> {
        RegisterId::from_u8(number).map(|id| self.get(id))
    }

    pub fn set_numbered(&mut self, number: u8, value: u32) -> Option<()> {
        RegisterId::from_u8(number).map(|id| self.set(id, value))
    }

    pub fn zero(&mut self) {
        self.values = [0; constants::REGISTER_FILE_LEN];
    }

    /// Stores the condition code for `left` compared to `right`.
    pub fn set_condition(&mut self, left: u32, right: u32) {
        let code = if left < right {
            CC_LESS
        } else if left == right {
            CC_EQUAL
        } else {
            CC_GREATER
        };
        self.set(RegisterId::SW, code);
    }

    pub fn condition(&self) -> u32 {
        self.get(RegisterId::SW)
    }

    /// The four-line register block printed when a run stops.
    pub fn display(&self) -> String {
        use RegisterId::*;
        format!(
            "A: {:06X}   X: {:06X}\nL: {:06X}  PC: {:06X}\nB: {:06X}   S: {:06X}\nT: {:06X}\n",
            self.get(A),
            self.get(X),
            self.get(L),
            self.get(PC),
            self.get(B),
            self.get(S),
            self.get(T),
        )
    }
}
