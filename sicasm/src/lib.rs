//! Two-pass assembler for SIC/XE source programs.
//!
//! The main entry points are [`assemble`](fn.assemble.html), which turns
//! source text into an in-memory [`Assembly`](struct.Assembly.html) (object
//! program, listing and symbol table), and
//! [`assemble_file`](fn.assemble_file.html), which reads a `.asm` file and
//! writes the `.obj` and `.lst` files next to it.
//!
//! # Source format
//!
//! Line numbers count 5, 10, 15, … over the whole file. A line whose first
//! non-blank character is `.` is a comment; whitespace-only lines are
//! skipped. Any other line holds up to four fields:
//!
//! ```text
//! [label] mnemonic [operand1[, operand2]]
//! ```
//!
//! A leading field naming a known mnemonic or directive is the mnemonic;
//! otherwise it is the label. The directives are `START`, `END`, `BYTE`,
//! `WORD`, `RESB`, `RESW`, `BASE` and `NOBASE`.
//!
//! # Addressing
//!
//! Operand prefixes select the addressing mode: `#` immediate, `@`
//! indirect, none simple. A second operand of `X` sets the index bit. A `+`
//! on the mnemonic forces the four-byte format with its 20-bit address
//! field; such an instruction referencing a label also emits a
//! modification record so the loader can relocate the field. Plain
//! format 3 instructions are encoded PC-relative when the displacement fits
//! in `[-2048, 2047]`, base-relative (after `BASE`) when it fits in
//! `[0, 4095]`, and are rejected otherwise.
//!
//! Parsing is implemented with [pest]; the grammar lives in
//! `src/sicasm.pest`.
//!
//! [pest]: https://docs.rs/pest/

mod error;
mod parser;
mod pass1;
mod pass2;
mod symbol;


use std::fs;
use std::path::Path;

use sicvm::opcode::OpcodeTable;

pub use crate::error::{Error, ErrorKind, LineError, Result};
pub use crate::parser::{AddrMode, Operand, RawLine, Target};
pub use crate::pass1::{IntermediateLine, PassOne};
pub use crate::pass2::Assembly;
pub use crate::symbol::SymbolTable;

use crate::parser::tokenize;

/// Assembler directives, recognized alongside the opcode dictionary when a
/// leading field is classified.
pub const DIRECTIVES: [&str; 8] = [
    "START", "END", "BYTE", "WORD", "RESB", "RESW", "BASE", "NOBASE",
];

/// Source lines are numbered from 5 in steps of 5.
pub const LINE_STEP: u32 = 5;

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Statement {
    pub label: Option<String>,
    pub mnemonic: String,
    pub operands: Vec<String>,
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Content {
    Blank,
    Comment,
    Statement(Statement),
}

/// One source line: its assigned line number, the original text (kept for
/// the listing) and its classified content.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct SourceLine {
    pub number: u32,
    pub text: String,
    pub content: Content,
}

fn is_mnemonic(field: &str, opcodes: &OpcodeTable) -> bool {
    if DIRECTIVES.contains(&field) {
        return true;
    }
    opcodes.is_mnemonic(field.trim_start_matches('+'))
}

/// Tokenizes and classifies every source line.
pub fn parse_source(source: &str, opcodes: &OpcodeTable) -> Result<Vec<SourceLine>> {
    let mut lines = Vec::new();

    for (index, text) in source.lines().enumerate() {
        let text = text.trim_end_matches('\r');
        let number = LINE_STEP * (index as u32 + 1);
        let content = match tokenize(text) {
            RawLine::Blank => Content::Blank,
            RawLine::Comment => Content::Comment,
            RawLine::Fields(fields) => {
                Content::Statement(classify(fields, opcodes, number)?)
            }
        };
        lines.push(SourceLine {
            number,
            text: text.to_owned(),
            content,
        });
    }

    Ok(lines)
}

fn classify(fields: Vec<String>, opcodes: &OpcodeTable, number: u32) -> Result<Statement> {
    let mut fields = fields.into_iter();
    let first = fields.next().expect("tokenizer never yields empty fields");

    let (label, mnemonic) = if is_mnemonic(&first, opcodes) {
        (None, first)
    } else {
        match fields.next() {
            Some(mnemonic) => (Some(first), mnemonic),
            None => {
                return Err(LineError::new(ErrorKind::InvalidOpcode, number, &first).into())
            }
        }
    };

    let operands: Vec<String> = fields.collect();
    if operands.len() > 2 {
        return Err(
            LineError::new(ErrorKind::InvalidOperand, number, &operands[2]).into(),
        );
    }

    Ok(Statement {
        label,
        mnemonic,
        operands,
    })
}

/// Assembles source text against the opcode dictionary.
pub fn assemble(source: &str, opcodes: &OpcodeTable) -> Result<Assembly> {
    let lines = parse_source(source, opcodes)?;
    let pass1 = pass1::run(&lines, opcodes)?;
    pass2::run(&lines, pass1, opcodes)
}

/// Assembles `path` (which must end in `.asm`) and writes the `.obj` and
/// `.lst` files beside it. Partial outputs are removed when anything fails.
pub fn assemble_file<P: AsRef<Path>>(path: P, opcodes: &OpcodeTable) -> Result<Assembly> {
    let path = path.as_ref();
    let display = path.display().to_string();

    if path.extension().and_then(|e| e.to_str()) != Some("asm") {
        return Err(Error::NotAsmFile(display));
    }

    let source = fs::read_to_string(path).map_err(|_| Error::MissingSource(display))?;
    let assembly = assemble(&source, opcodes)?;

    let lst_path = path.with_extension("lst");
    let obj_path = path.with_extension("obj");

    if fs::write(&lst_path, &assembly.listing).is_err() {
        return Err(Error::CreateOutput(lst_path.display().to_string()));
    }
    if fs::write(&obj_path, &assembly.object).is_err() {
        let _ = fs::remove_file(&lst_path);
        return Err(Error::CreateOutput(obj_path.display().to_string()));
    }

    Ok(assembly)
}
