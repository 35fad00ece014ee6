use sicvm::opcode::{FormatSet, OpcodeTable};
use util::{parse_dec, parse_hex};

use crate::error::{Error, ErrorKind, LineError, Result};
use crate::parser::{parse_operand, Operand};
use crate::symbol::SymbolTable;
use crate::{Content, SourceLine, Statement};

/// One record of the pass-1 hand-off: which source line, where it was
/// placed, and how many bytes of object code it occupies.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct IntermediateLine {
    pub number: u32,
    pub locctr: u32,
    pub length: u32,
    /// Index of the source line this record belongs to.
    pub index: usize,
}

pub struct PassOne {
    pub intermediate: Vec<IntermediateLine>,
    pub symbols: SymbolTable,
    pub program_name: String,
    pub program_start: u32,
    pub program_length: u32,
}

/// Builds the symbol table and assigns a location counter to every line,
/// stopping at `END`.
pub fn run(lines: &[SourceLine], opcodes: &OpcodeTable) -> Result<PassOne> {
    let mut intermediate = Vec::new();
    let mut symbols = SymbolTable::new();
    let mut program_name = String::new();
    let mut program_start = 0u32;
    let mut locctr = 0u32;
    let mut started = false;
    let mut ended = false;

    for (index, line) in lines.iter().enumerate() {
        let stmt = match &line.content {
            Content::Statement(stmt) => stmt,
            _ => continue,
        };

        if !started {
            started = true;
            if stmt.mnemonic == "START" {
                let operand = required_operand(stmt, line.number)?;
                let start = parse_hex(operand).ok().filter(|&a| a <= 0xFFFFF).ok_or_else(
                    || LineError::new(ErrorKind::InvalidOperand, line.number, operand),
                )?;
                locctr = start;
                program_start = start;
                if let Some(label) = &stmt.label {
                    program_name = label.clone();
                    symbols.insert(label, locctr);
                }
                intermediate.push(IntermediateLine {
                    number: line.number,
                    locctr,
                    length: 0,
                    index,
                });
                continue;
            }
        }

        if stmt.mnemonic == "END" {
            intermediate.push(IntermediateLine {
                number: line.number,
                locctr,
                length: 0,
                index,
            });
            ended = true;
            break;
        }

        if let Some(label) = &stmt.label {
            if !symbols.insert(label, locctr) {
                return Err(LineError::new(ErrorKind::DuplicateSymbol, line.number, label).into());
            }
        }

        let length = instruction_length(stmt, opcodes, line.number)?;
        intermediate.push(IntermediateLine {
            number: line.number,
            locctr,
            length,
            index,
        });

        locctr = locctr.checked_add(length).filter(|&l| l <= 0x100000).ok_or_else(|| {
            LineError::new(ErrorKind::InvalidOperand, line.number, &stmt.mnemonic)
        })?;
    }

    if !ended {
        return Err(Error::EndNotFound);
    }

    Ok(PassOne {
        intermediate,
        symbols,
        program_name,
        program_start,
        program_length: locctr - program_start,
    })
}

fn required_operand<'s>(stmt: &'s Statement, line: u32) -> Result<&'s str> {
    match stmt.operands.first() {
        Some(operand) => Ok(operand),
        None => {
            Err(LineError::new(ErrorKind::RequiredOneOperand, line, &stmt.mnemonic).into())
        }
    }
}

/// The number of bytes of object code (or reserved storage) a statement
/// occupies.
fn instruction_length(stmt: &Statement, opcodes: &OpcodeTable, line: u32) -> Result<u32> {
    match stmt.mnemonic.as_str() {
        "WORD" => {
            required_operand(stmt, line)?;
            Ok(3)
        }
        "RESB" | "RESW" => {
            let operand = required_operand(stmt, line)?;
            let count = parse_dec(operand).map_err(|_| {
                LineError::new(ErrorKind::InvalidOperand, line, operand)
            })?;
            if stmt.mnemonic == "RESB" {
                Ok(count)
            } else {
                Ok(count.saturating_mul(3))
            }
        }
        "BYTE" => {
            let operand = required_operand(stmt, line)?;
            match parse_operand(operand) {
                Some(Operand::Char(text)) => Ok(text.len() as u32),
                Some(Operand::Hex(digits)) => Ok((digits.len() as u32 + 1) / 2),
                _ => Err(LineError::new(ErrorKind::InvalidOperand, line, operand).into()),
            }
        }
        "BASE" | "NOBASE" => Ok(0),
        mnemonic => {
            let plain = mnemonic.trim_start_matches('+');
            let plus = plain.len() != mnemonic.len();
            let formats = match opcodes.format_of(plain) {
                Some(formats) => formats,
                None => {
                    return Err(
                        LineError::new(ErrorKind::InvalidOpcode, line, mnemonic).into()
                    )
                }
            };

            if plus {
                if formats.contains(FormatSet::F4) {
                    Ok(4)
                } else {
                    Err(LineError::new(ErrorKind::InvalidOpcode, line, mnemonic).into())
                }
            } else if formats.contains(FormatSet::F1) {
                Ok(1)
            } else if formats.contains(FormatSet::F2) {
                Ok(2)
            } else if formats.contains(FormatSet::F3) {
                Ok(3)
            } else {
                Err(LineError::new(ErrorKind::InvalidOpcode, line, mnemonic).into())
            }
        }
    }
}
