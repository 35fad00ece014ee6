use num_derive::FromPrimitive;
use num_traits::FromPrimitive;

use crate::constants;
use crate::memory::MemSpace;
use crate::opcode::OpcodeTable;
use crate::register::{RegisterId, CC_LESS};

use super::{Debugger, Instruction, Result, SimError};

/// Opcode bytes with modeled semantics. Anything the dictionary knows but
/// this enum does not (floating point, I/O channels) decodes fine and
/// executes as a no-op.
#[derive(Clone, Copy, Debug, Eq, PartialEq, FromPrimitive)]
enum Opcode {
    LDA = 0x00,
    LDX = 0x04,
    LDL = 0x08,
    STA = 0x0C,
    STX = 0x10,
    STL = 0x14,
    ADD = 0x18,
    SUB = 0x1C,
    MUL = 0x20,
    DIV = 0x24,
    COMP = 0x28,
    TIX = 0x2C,
    JEQ = 0x30,
    JGT = 0x34,
    JLT = 0x38,
    J = 0x3C,
    AND = 0x40,
    OR = 0x44,
    JSUB = 0x48,
    RSUB = 0x4C,
    LDCH = 0x50,
    STCH = 0x54,
    LDB = 0x68,
    LDS = 0x6C,
    LDT = 0x74,
    STB = 0x78,
    STS = 0x7C,
    STT = 0x84,
    RD = 0xD8,
    TD = 0xE0,
    STSW = 0xE8,
    ADDR = 0x90,
    SUBR = 0x94,
    MULR = 0x98,
    DIVR = 0x9C,
    COMPR = 0xA0,
    RMO = 0xAC,
    CLEAR = 0xB4,
    TIXR = 0xB8,
}

/// Addressing mode given by the n and i flags.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
enum Mode {
    Simple,    // n=1 i=1
    Immediate, // n=0 i=1
    Indirect,  // n=1 i=0
    Sic,       // n=0 i=0
}

impl Mode {
    fn from_flags(n: bool, i: bool) -> Mode {
        match (n, i) {
            (true, true) => Mode::Simple,
            (false, true) => Mode::Immediate,
            (true, false) => Mode::Indirect,
            (false, false) => Mode::Sic,
        }
    }
}

/// Executes one instruction and leaves PC at the next one.
pub fn step(dbg: &mut Debugger, memory: &mut MemSpace, opcodes: &OpcodeTable) -> Result<()> {
    let pc = dbg.registers().get(RegisterId::PC);
    let (instruction, next_pc) = Instruction::decode(memory, pc, opcodes)?;
    dbg.registers_mut().set(RegisterId::PC, next_pc);

    match instruction {
        // Format 1 is all floating point and channel I/O; none of it has a
        // modeled effect.
        Instruction::Format1 { .. } => Ok(()),
        Instruction::Format2 { opcode, r1, r2 } => execute_format2(dbg, opcode, r1, r2, pc),
        Instruction::Format3 {
            opcode,
            n,
            i,
            x,
            b,
            p,
            disp,
        } => {
            let target = format3_target(dbg, next_pc, n, i, x, b, p, disp)
                .ok_or(SimError::InvalidAddressing { address: pc })?;
            execute_mem_ref(dbg, memory, opcode, Mode::from_flags(n, i), target, pc)
        }
        Instruction::Format4 { opcode, n, i, x, addr } => {
            let mut target = addr;
            if x {
                target = target.wrapping_add(dbg.registers().get(RegisterId::X));
            }
            target &= constants::ADDRESS_MAX;
            execute_mem_ref(dbg, memory, opcode, Mode::from_flags(n, i), target, pc)
        }
    }
}

/// Resolves the target address of a format 3 instruction, or `None` when
/// the b/p combination is invalid.
fn format3_target(
    dbg: &Debugger,
    next_pc: u32,
    n: bool,
    i: bool,
    x: bool,
    b: bool,
    p: bool,
    disp: u16,
) -> Option<u32> {
    let disp = u32::from(disp);

    let mut target = if !n && !i {
        // SIC compatibility: the flag bits are part of the 15-bit address.
        (u32::from(b) << 14) | (u32::from(p) << 13) | disp
    } else if !b && p {
        // PC-relative; the displacement is a signed 12-bit value.
        let offset = if disp > 2047 {
            disp as i32 - 0x1000
        } else {
            disp as i32
        };
        (next_pc as i32).wrapping_add(offset) as u32
    } else if b && !p {
        dbg.registers().get(RegisterId::B).wrapping_add(disp)
    } else if !b && !p {
        disp
    } else {
        return None;
    };

    if x {
        target = target.wrapping_add(dbg.registers().get(RegisterId::X));
    }
    Some(target & constants::ADDRESS_MAX)
}

fn execute_format2(dbg: &mut Debugger, opcode: u8, r1: u8, r2: u8, pc: u32) -> Result<()> {
    let opcode = match Opcode::from_u8(opcode) {
        Some(opcode) => opcode,
        // SHIFTL, SHIFTR and SVC are recognized but have no effect.
        None => return Ok(()),
    };

    let regs = dbg.registers_mut();
    let read = |regs: &crate::register::RegisterFile, number: u8| {
        regs.get_numbered(number)
            .ok_or(SimError::InvalidRegister { number, address: pc })
    };

    match opcode {
        // The sum lands in r1; the processor manual says r2, but the system
        // modeled here writes the first register.
        Opcode::ADDR => {
            let sum = read(regs, r1)?.wrapping_add(read(regs, r2)?);
            regs.set_numbered(r1, sum);
        }
        Opcode::CLEAR => {
            read(regs, r1)?;
            regs.set_numbered(r1, 0);
        }
        Opcode::COMPR => {
            let (v1, v2) = (read(regs, r1)?, read(regs, r2)?);
            regs.set_condition(v1, v2);
        }
        Opcode::SUBR => {
            let value = read(regs, r2)?.wrapping_sub(read(regs, r1)?);
            regs.set_numbered(r2, value);
        }
        Opcode::MULR => {
            let value = read(regs, r2)?.wrapping_mul(read(regs, r1)?);
            regs.set_numbered(r2, value);
        }
        Opcode::DIVR => {
            let divisor = read(regs, r1)?;
            if divisor == 0 {
                return Err(SimError::DivisionByZero { address: pc });
            }
            let value = read(regs, r2)? / divisor;
            regs.set_numbered(r2, value);
        }
        Opcode::RMO => {
            let value = read(regs, r1)?;
            regs.set_numbered(r2, value);
        }
        Opcode::TIXR => {
            let x = regs.get(RegisterId::X).wrapping_add(1);
            regs.set(RegisterId::X, x);
            let v1 = read(regs, r1)?;
            regs.set_condition(regs.get(RegisterId::X), v1);
        }
        _ => {}
    }
    Ok(())
}

fn execute_mem_ref(
    dbg: &mut Debugger,
    memory: &mut MemSpace,
    opcode: u8,
    mode: Mode,
    target: u32,
    pc: u32,
) -> Result<()> {
    let opcode = match Opcode::from_u8(opcode) {
        Some(opcode) => opcode,
        // Floating point, LPS, SSK, STI, WD and friends: recognized, no
        // modeled effect.
        None => return Ok(()),
    };

    // An indirect operand names the cell that holds the effective address.
    let effective = match mode {
        Mode::Indirect => memory.read_word(target)? & constants::ADDRESS_MAX,
        _ => target,
    };

    let load_word = |memory: &MemSpace| -> Result<u32> {
        match mode {
            Mode::Immediate | Mode::Sic => Ok(target),
            _ => Ok(memory.read_word(effective)?),
        }
    };
    let load_byte = |memory: &MemSpace| -> Result<u32> {
        match mode {
            Mode::Immediate | Mode::Sic => Ok(target & 0xFF),
            _ => Ok(u32::from(memory.get(effective, 1)?[0])),
        }
    };

    use RegisterId::*;
    let regs = dbg.registers_mut();

    match opcode {
        Opcode::ADD => {
            let value = load_word(memory)?;
            regs.set(A, regs.get(A).wrapping_add(value));
        }
        Opcode::SUB => {
            let value = load_word(memory)?;
            regs.set(A, regs.get(A).wrapping_sub(value));
        }
        Opcode::MUL => {
            let value = load_word(memory)?;
            regs.set(A, regs.get(A).wrapping_mul(value));
        }
        Opcode::DIV => {
            let value = load_word(memory)?;
            if value == 0 {
                return Err(SimError::DivisionByZero { address: pc });
            }
            regs.set(A, regs.get(A) / value);
        }
        Opcode::AND => {
            let value = load_word(memory)?;
            regs.set(A, regs.get(A) & value);
        }
        Opcode::OR => {
            let value = load_word(memory)?;
            regs.set(A, regs.get(A) | value);
        }
        Opcode::COMP => {
            let value = load_word(memory)?;
            regs.set_condition(regs.get(A), value);
        }
        Opcode::TIX => {
            let value = load_word(memory)?;
            let x = regs.get(X).wrapping_add(1);
            regs.set(X, x);
            regs.set_condition(regs.get(X), value);
        }
        Opcode::J => {
            regs.set(PC, effective);
        }
        Opcode::JEQ => {
            if regs.condition() == crate::register::CC_EQUAL {
                regs.set(PC, effective);
            }
        }
        Opcode::JGT => {
            if regs.condition() == crate::register::CC_GREATER {
                regs.set(PC, effective);
            }
        }
        Opcode::JLT => {
            if regs.condition() == CC_LESS {
                regs.set(PC, effective);
            }
        }
        Opcode::JSUB => {
            regs.set(L, regs.get(PC));
            regs.set(PC, effective);
        }
        Opcode::RSUB => {
            regs.set(PC, regs.get(L));
        }
        Opcode::LDA => {
            let value = load_word(memory)?;
            regs.set(A, value);
        }
        Opcode::LDB => {
            let value = load_word(memory)?;
            regs.set(B, value);
        }
        Opcode::LDL => {
            let value = load_word(memory)?;
            regs.set(L, value);
        }
        Opcode::LDS => {
            let value = load_word(memory)?;
            regs.set(S, value);
        }
        Opcode::LDT => {
            let value = load_word(memory)?;
            regs.set(T, value);
        }
        Opcode::LDX => {
            let value = load_word(memory)?;
            regs.set(X, value);
        }
        Opcode::LDCH => {
            let byte = load_byte(memory)?;
            regs.set(A, (regs.get(A) & 0xFF_FF00) | byte);
        }
        Opcode::STA => memory.write_word(effective, regs.get(A))?,
        Opcode::STB => memory.write_word(effective, regs.get(B))?,
        Opcode::STL => memory.write_word(effective, regs.get(L))?,
        Opcode::STS => memory.write_word(effective, regs.get(S))?,
        Opcode::STT => memory.write_word(effective, regs.get(T))?,
        Opcode::STX => memory.write_word(effective, regs.get(X))?,
        Opcode::STSW => memory.write_word(effective, regs.get(SW))?,
        Opcode::STCH => {
            let byte = (regs.get(A) & 0xFF) as u8;
            memory.set(effective, &[byte])?;
        }
        Opcode::RD => {
            // Device reads are stubbed: they always deliver zero.
            regs.set(A, 0);
        }
        Opcode::TD => {
            // Devices are always ready.
            regs.set(SW, CC_LESS);
        }
        _ => {}
    }
    Ok(())
}
