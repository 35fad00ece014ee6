use sicobj::{Record, TextRecordBuilder};
use sicvm::opcode::{FormatSet, OpcodeTable};
use sicvm::register;
use util::parse_dec;

use crate::error::{ErrorKind, LineError, Result};
use crate::parser::{parse_operand, AddrMode, Operand, Target};
use crate::pass1::{IntermediateLine, PassOne};
use crate::symbol::SymbolTable;
use crate::{Content, SourceLine, Statement};

/// Everything a successful assembly produces. The object program and the
/// listing are complete file images; the caller decides where they land.
#[derive(Debug)]
pub struct Assembly {
    pub object: String,
    pub listing: String,
    pub symbols: SymbolTable,
    pub program_name: String,
    pub program_start: u32,
    pub program_length: u32,
}

fn word_bytes(value: u32) -> [u8; 3] {
    [(value >> 16) as u8, (value >> 8) as u8, value as u8]
}

/// Walks the pass-1 records in lock-step with the source, emitting object
/// code and the listing.
pub fn run(lines: &[SourceLine], pass1: PassOne, opcodes: &OpcodeTable) -> Result<Assembly> {
    let PassOne {
        intermediate,
        symbols,
        program_name,
        program_start,
        program_length,
    } = pass1;

    let mut text_records = Vec::new();
    let mut mod_records = Vec::new();
    let mut builder = TextRecordBuilder::new();
    let mut base: Option<u32> = None;
    let mut listing = String::new();
    let mut next_listed = 0usize;

    for record in &intermediate {
        // Comment and blank lines carry no pass-1 record but still appear in
        // the listing.
        while next_listed < record.index {
            let line = &lines[next_listed];
            listing.push_str(&format!("{:3}\t   \t{}\n", line.number, line.text));
            next_listed += 1;
        }
        next_listed = record.index + 1;

        let line = &lines[record.index];
        let stmt = match &line.content {
            Content::Statement(stmt) => stmt,
            _ => continue,
        };

        let mut bytes = Vec::new();
        match stmt.mnemonic.as_str() {
            "START" | "END" => {
                if stmt.mnemonic == "END" {
                    builder.flush(&mut text_records);
                }
            }
            "RESB" | "RESW" => {
                // Reserved storage breaks the text record.
                builder.flush(&mut text_records);
            }
            "BASE" => {
                let operand = operand_or(stmt, line.number, ErrorKind::RequiredOneOperand)?;
                base = Some(resolve_base(operand, &symbols, line.number)?);
            }
            "NOBASE" => {
                base = None;
            }
            "BYTE" => {
                let operand = operand_or(stmt, line.number, ErrorKind::RequiredOneOperand)?;
                bytes = byte_constant(operand, line.number)?;
                builder.append(record.locctr, &bytes, &mut text_records);
            }
            "WORD" => {
                let operand = operand_or(stmt, line.number, ErrorKind::RequiredOneOperand)?;
                let value = parse_dec(operand).map_err(|_| {
                    LineError::new(ErrorKind::InvalidOperand, line.number, operand)
                })?;
                bytes = word_bytes(value & 0xFF_FFFF).to_vec();
                builder.append(record.locctr, &bytes, &mut text_records);
            }
            _ => {
                let encoded = encode_instruction(stmt, record, &symbols, base, opcodes, line.number)?;
                if encoded.needs_modification {
                    mod_records.push(Record::Modification {
                        address: record.locctr + 1,
                        half_bytes: 5,
                        reference: None,
                    });
                }
                bytes = encoded.bytes;
                builder.append(record.locctr, &bytes, &mut text_records);
            }
        }

        listing.push_str(&list_line(line, stmt, record, &bytes));
    }

    let mut records = Vec::with_capacity(text_records.len() + mod_records.len() + 2);
    records.push(Record::Header {
        name: program_name.clone(),
        start: program_start,
        length: program_length,
    });
    records.extend(text_records);
    records.extend(mod_records);
    records.push(Record::End {
        entry: program_start,
    });

    let mut object = String::new();
    for record in &records {
        object.push_str(&record.to_string());
        object.push('\n');
    }

    Ok(Assembly {
        object,
        listing,
        symbols,
        program_name,
        program_start,
        program_length,
    })
}

fn list_line(
    line: &SourceLine,
    stmt: &Statement,
    record: &IntermediateLine,
    bytes: &[u8],
) -> String {
    let locctr = match stmt.mnemonic.as_str() {
        "BASE" | "NOBASE" | "END" => "    ".to_owned(),
        _ => format!("{:04X}", record.locctr),
    };
    let label = stmt.label.as_deref().unwrap_or("");
    let operands = match stmt.operands.len() {
        0 => String::new(),
        1 => stmt.operands[0].clone(),
        _ => format!("{}, {}", stmt.operands[0], stmt.operands[1]),
    };
    let object_code: String = bytes.iter().map(|b| format!("{:02X}", b)).collect();

    format!(
        "{:3}\t{}\t{:<6}\t{:<6}\t{:<14}{}\n",
        line.number, locctr, label, stmt.mnemonic, operands, object_code
    )
}

fn operand_or<'s>(stmt: &'s Statement, line: u32, kind: ErrorKind) -> Result<&'s str> {
    match stmt.operands.first() {
        Some(operand) => Ok(operand),
        None => Err(LineError::new(kind, line, &stmt.mnemonic).into()),
    }
}

fn resolve_base(operand: &str, symbols: &SymbolTable, line: u32) -> Result<u32> {
    match parse_operand(operand) {
        Some(Operand::Addr {
            mode: AddrMode::Simple,
            target: Target::Number(value),
        }) => Ok(value),
        Some(Operand::Addr {
            mode: AddrMode::Simple,
            target: Target::Symbol(name),
        }) => symbols
            .get(&name)
            .ok_or_else(|| LineError::new(ErrorKind::InvalidOperand, line, &name).into()),
        _ => Err(LineError::new(ErrorKind::InvalidOperand, line, operand).into()),
    }
}

fn byte_constant(operand: &str, line: u32) -> Result<Vec<u8>> {
    match parse_operand(operand) {
        Some(Operand::Char(text)) => Ok(text.bytes().collect()),
        Some(Operand::Hex(digits)) => {
            let mut bytes = Vec::with_capacity((digits.len() + 1) / 2);
            let mut chars = digits.chars();
            loop {
                let pair: String = chars.by_ref().take(2).collect();
                if pair.is_empty() {
                    break;
                }
                let value = if pair.len() == 2 {
                    u8::from_str_radix(&pair, 16)
                } else {
                    // An odd final digit occupies the high nibble.
                    u8::from_str_radix(&pair, 16).map(|v| v << 4)
                };
                bytes.push(value.map_err(|_| {
                    LineError::new(ErrorKind::InvalidOperand, line, operand)
                })?);
            }
            Ok(bytes)
        }
        _ => Err(LineError::new(ErrorKind::InvalidOperand, line, operand).into()),
    }
}

struct Encoded {
    bytes: Vec<u8>,
    needs_modification: bool,
}

fn encode_instruction(
    stmt: &Statement,
    record: &IntermediateLine,
    symbols: &SymbolTable,
    base: Option<u32>,
    opcodes: &OpcodeTable,
    line: u32,
) -> Result<Encoded> {
    let plain = stmt.mnemonic.trim_start_matches('+');
    let plus = plain.len() != stmt.mnemonic.len();
    // Pass 1 already validated the mnemonic.
    let entry = opcodes.get(plain).expect("mnemonic validated in pass 1");

    if entry.formats.contains(FormatSet::F1) {
        return Ok(Encoded {
            bytes: vec![entry.opcode],
            needs_modification: false,
        });
    }
    if entry.formats.contains(FormatSet::F2) {
        return encode_format2(stmt, entry.opcode, line);
    }
    encode_mem_ref(stmt, record, symbols, base, entry.opcode, plus, line)
}

/// Format 2 mnemonics taking two registers; the rest take one.
const TWO_REGISTER: [&str; 8] = [
    "ADDR", "COMPR", "DIVR", "MULR", "RMO", "SUBR", "SHIFTL", "SHIFTR",
];

fn encode_format2(stmt: &Statement, opcode: u8, line: u32) -> Result<Encoded> {
    let needs_two = TWO_REGISTER.contains(&stmt.mnemonic.as_str());
    let missing = if needs_two {
        ErrorKind::RequiredTwoOperands
    } else {
        ErrorKind::RequiredOneOperand
    };

    let op0 = operand_or(stmt, line, missing)?;
    let r1 = register_value(op0)
        .ok_or_else(|| LineError::new(ErrorKind::InvalidOperand, line, op0))?;
    let r2 = match stmt.operands.get(1) {
        Some(op1) => register_value(op1)
            .ok_or_else(|| LineError::new(ErrorKind::InvalidOperand, line, op1))?,
        None if needs_two => {
            return Err(
                LineError::new(ErrorKind::RequiredTwoOperands, line, &stmt.mnemonic).into(),
            )
        }
        None => 0,
    };

    Ok(Encoded {
        bytes: vec![opcode, ((r1 << 4) | r2) as u8],
        needs_modification: false,
    })
}

/// A format 2 operand is a register name or a small number (shift counts,
/// service codes).
fn register_value(text: &str) -> Option<u32> {
    register::register_number(text).or_else(|| text.parse::<u32>().ok().filter(|&n| n < 16))
}

fn encode_mem_ref(
    stmt: &Statement,
    record: &IntermediateLine,
    symbols: &SymbolTable,
    base: Option<u32>,
    opcode: u8,
    plus: bool,
    line: u32,
) -> Result<Encoded> {
    if stmt.operands.is_empty() {
        // RSUB is the only memory-reference instruction without an operand.
        if plain_is_rsub(stmt) {
            let byte0 = opcode | 0x03;
            let bytes = if plus {
                vec![byte0, 0x10, 0x00, 0x00]
            } else {
                vec![byte0, 0x00, 0x00]
            };
            return Ok(Encoded {
                bytes,
                needs_modification: false,
            });
        }
        return Err(
            LineError::new(ErrorKind::RequiredOneOperand, line, &stmt.mnemonic).into(),
        );
    }

    let op0 = &stmt.operands[0];
    let (mode, target) = match parse_operand(op0) {
        Some(Operand::Addr { mode, target }) => (mode, target),
        _ => return Err(LineError::new(ErrorKind::InvalidOperand, line, op0).into()),
    };

    let (n, i) = match mode {
        AddrMode::Simple => (1u32, 1u32),
        AddrMode::Immediate => (0, 1),
        AddrMode::Indirect => (1, 0),
    };

    let x = match stmt.operands.get(1) {
        None => false,
        Some(index) if index == "X" => true,
        Some(other) => {
            return Err(LineError::new(ErrorKind::InvalidOperand, line, other).into())
        }
    };

    let mut needs_modification = false;
    let (b, p, field) = match target {
        Target::Number(value) => {
            let limit = if plus { 0xF_FFFF } else { 0xFFF };
            if value > limit {
                return Err(LineError::new(ErrorKind::InvalidOperand, line, op0).into());
            }
            (0u32, 0u32, value)
        }
        Target::Symbol(name) => {
            let register = register::register_number(&name);
            let address = register.or_else(|| symbols.get(&name)).ok_or_else(|| {
                LineError::new(ErrorKind::InvalidOperand, line, &name)
            })?;

            if plus {
                needs_modification = register.is_none();
                (0, 0, address)
            } else {
                let next = record.locctr + record.length;
                let disp = i64::from(address) - i64::from(next);
                if (-2048..=2047).contains(&disp) {
                    (0, 1, (disp as u32) & 0xFFF)
                } else if let Some(base_address) = base {
                    let disp = i64::from(address) - i64::from(base_address);
                    if (0..=4095).contains(&disp) {
                        (1, 0, disp as u32)
                    } else {
                        return Err(
                            LineError::new(ErrorKind::InvalidOperand, line, &name).into()
                        );
                    }
                } else {
                    return Err(LineError::new(ErrorKind::InvalidOperand, line, &name).into());
                }
            }
        }
    };

    let byte0 = opcode | ((n << 1) | i) as u8;
    let flags = (u32::from(x) << 3) | (b << 2) | (p << 1) | u32::from(plus);
    let bytes = if plus {
        vec![
            byte0,
            ((flags << 4) | ((field >> 16) & 0x0F)) as u8,
            (field >> 8) as u8,
            field as u8,
        ]
    } else {
        vec![
            byte0,
            ((flags << 4) | ((field >> 8) & 0x0F)) as u8,
            field as u8,
        ]
    };

    Ok(Encoded {
        bytes,
        needs_modification,
    })
}

fn plain_is_rsub(stmt: &Statement) -> bool {
    stmt.mnemonic.trim_start_matches('+') == "RSUB"
}
