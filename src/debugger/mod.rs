mod core;
mod instruction;

pub use self::instruction::Instruction;

use std::collections::BTreeSet;
use std::fmt;

use crate::memory::{MemError, MemSpace};
use crate::opcode::OpcodeTable;
use crate::register::{RegisterFile, RegisterId};

#[derive(Clone, Debug, Eq, PartialEq)]
pub enum SimError {
    NoProgram,
    UnknownOpcode { opcode: u8, address: u32 },
    InvalidAddressing { address: u32 },
    InvalidRegister { number: u8, address: u32 },
    DivisionByZero { address: u32 },
    Memory(MemError),
}

impl fmt::Display for SimError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            SimError::NoProgram => write!(f, "no program is loaded"),
            SimError::UnknownOpcode { opcode, address } => {
                write!(f, "cannot find opcode '{:02X}' at {:X}", opcode, address)
            }
            SimError::InvalidAddressing { address } => {
                write!(f, "invalid addressing mode at {:X}", address)
            }
            SimError::InvalidRegister { number, address } => {
                write!(f, "invalid register '{}' at {:X}", number, address)
            }
            SimError::DivisionByZero { address } => {
                write!(f, "division by zero at {:X}", address)
            }
            SimError::Memory(ref err) => write!(f, "{}", err),
        }
    }
}

impl std::error::Error for SimError {}

impl From<MemError> for SimError {
    fn from(err: MemError) -> SimError {
        SimError::Memory(err)
    }
}

pub type Result<T> = std::result::Result<T, SimError>;

/// Why a `run` returned to the prompt.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum StopReason {
    Finished,
    Breakpoint(u32),
}

/// Snapshot handed back when a run stops; the register values are taken
/// before any post-run cleanup.
#[derive(Clone, Debug)]
pub struct RunStop {
    pub registers: RegisterFile,
    pub reason: StopReason,
}

/// Drives the fetch-decode-execute loop over the shared memory image and
/// keeps the breakpoint set and program bookkeeping between runs.
pub struct Debugger {
    registers: RegisterFile,
    breakpoints: BTreeSet<u32>,
    program_address: u32,
    program_length: u32,
}

impl Default for Debugger {
    fn default() -> Debugger {
        Debugger::new()
    }
}

impl Debugger {
    pub fn new() -> Debugger {
        Debugger {
            registers: RegisterFile::new(),
            breakpoints: BTreeSet::new(),
            program_address: 0,
            program_length: 0,
        }
    }

    /// Forgets the loaded program: registers and breakpoints are cleared and
    /// a new `loader` run is required before the next `run`.
    pub fn initialize(&mut self) {
        self.registers.zero();
        self.breakpoints.clear();
        self.program_length = 0;
        self.program_address = 0;
    }

    /// Primes the debugger after a successful load: PC holds the program
    /// address and L the total length.
    pub fn prepare_run(&mut self, program_address: u32, program_length: u32) {
        self.registers.set(RegisterId::L, program_length);
        self.registers.set(RegisterId::PC, program_address);
        self.program_address = program_address;
        self.program_length = program_length;
    }

    pub fn is_loaded(&self) -> bool {
        self.program_length > 0
    }

    pub fn registers(&self) -> &RegisterFile {
        &self.registers
    }

    pub fn registers_mut(&mut self) -> &mut RegisterFile {
        &mut self.registers
    }

    pub fn add_breakpoint(&mut self, address: u32) {
        self.breakpoints.insert(address);
    }

    pub fn clear_breakpoints(&mut self) {
        self.breakpoints.clear();
    }

    pub fn breakpoints(&self) -> impl Iterator<Item = u32> + '_ {
        self.breakpoints.iter().copied()
    }

    pub fn display_breakpoints(&self) -> String {
        let mut out = String::from("Breakpoints\n-----------\n");
        for address in &self.breakpoints {
            out.push_str(&format!("{:X}\n", address));
        }
        out
    }

    /// Executes instructions until the program runs off its end or PC lands
    /// on a breakpoint. On normal completion the debugger state is cleared;
    /// at a breakpoint it is kept so a later `run` resumes.
    pub fn run(&mut self, memory: &mut MemSpace, opcodes: &OpcodeTable) -> Result<RunStop> {
        if !self.is_loaded() {
            return Err(SimError::NoProgram);
        }

        loop {
            core::step(self, memory, opcodes)?;

            let pc = self.registers.get(RegisterId::PC);
            if pc >= self.program_address + self.program_length {
                let registers = self.registers.clone();
                self.initialize();
                return Ok(RunStop {
                    registers,
                    reason: StopReason::Finished,
                });
            }
            if self.breakpoints.contains(&pc) {
                return Ok(RunStop {
                    registers: self.registers.clone(),
                    reason: StopReason::Breakpoint(pc),
                });
            }
        }
    }
}
