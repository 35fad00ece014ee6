//! The linking loader. Pass 1 assigns every control section its base
//! address (the first one starts at `progaddr`) and collects the exported
//! symbols; pass 2 copies text records into the memory image and applies
//! modification records through each section's reference table.
//!
//! Loading stops at the first failure and leaves whatever was already
//! placed in memory as-is; nothing is rolled back.

mod error;
mod external;

#[cfg(test)]
mod test;

use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use sicobj::{read_records, Record};
use sicvm::memory::MemSpace;
use util::Sign;

pub use crate::error::{Error, Result};
pub use crate::external::{ControlSection, ExternalSymbol, ExternalSymbolTable};

/// What a successful load hands to the debugger.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct LoadSummary {
    pub program_address: u32,
    pub program_length: u32,
}

struct ObjectProgram {
    file: String,
    records: Vec<(usize, Record)>,
}

/// Links and loads one to three object files, strictly left to right.
pub fn load<P: AsRef<Path>>(
    paths: &[P],
    memory: &mut MemSpace,
    table: &mut ExternalSymbolTable,
) -> Result<LoadSummary> {
    let mut programs = Vec::with_capacity(paths.len());
    for path in paths {
        programs.push(read_program(path.as_ref())?);
    }

    table.reset();
    let program_address = memory.progaddr();

    let bases = pass1(&programs, program_address, table)?;
    for (program, &base) in programs.iter().zip(&bases) {
        pass2(program, base, memory, table)?;
    }

    Ok(LoadSummary {
        program_address,
        program_length: table.total_length(),
    })
}

fn read_program(path: &Path) -> Result<ObjectProgram> {
    let display = path.display().to_string();
    let file = File::open(path).map_err(|_| Error::MissingFile(display.clone()))?;

    let mut records = Vec::new();
    for (line, parsed) in read_records(BufReader::new(file))? {
        let record = parsed.map_err(|source| Error::Record {
            file: display.clone(),
            line,
            source,
        })?;
        records.push((line, record));
    }

    Ok(ObjectProgram {
        file: display,
        records,
    })
}

/// Assigns section bases and fills the external-symbol table. Returns the
/// base address of each program.
fn pass1(
    programs: &[ObjectProgram],
    program_address: u32,
    table: &mut ExternalSymbolTable,
) -> Result<Vec<u32>> {
    let mut cursor = program_address;
    let mut bases = Vec::with_capacity(programs.len());

    for program in programs {
        let (name, length) = match program.records.iter().find_map(|(_, r)| match r {
            Record::Header { name, length, .. } => Some((name.clone(), *length)),
            _ => None,
        }) {
            Some(header) => header,
            None => {
                return Err(Error::MissingHeader {
                    file: program.file.clone(),
                })
            }
        };

        table
            .add_section(&name, cursor, length)
            .map_err(|name| Error::DuplicateSymbol { name })?;

        for (_, record) in &program.records {
            match record {
                Record::Define { symbols } => {
                    for (symbol, address) in symbols {
                        table
                            .add_symbol(&name, symbol, cursor + address)
                            .map_err(|name| Error::DuplicateSymbol { name })?;
                    }
                }
                Record::End { .. } => break,
                _ => {}
            }
        }

        bases.push(cursor);
        cursor += length;
    }

    Ok(bases)
}

/// Places text records and applies modification records for one program.
fn pass2(
    program: &ObjectProgram,
    base: u32,
    memory: &mut MemSpace,
    table: &ExternalSymbolTable,
) -> Result<()> {
    // Reference number 01 is the section's own base and is never listed in
    // an R record.
    let mut references: Vec<Option<u32>> = vec![None; 256];
    references[1] = Some(base);

    for (_, record) in &program.records {
        match record {
            Record::Refer { refs } => {
                for (number, symbol) in refs {
                    let address =
                        table
                            .address_of(symbol)
                            .ok_or_else(|| Error::UnresolvedSymbol {
                                name: symbol.clone(),
                            })?;
                    references[*number as usize] = Some(address);
                }
            }
            Record::Text { start, bytes } => {
                memory.set(base + start, bytes)?;
            }
            Record::Modification {
                address,
                half_bytes,
                reference,
            } => {
                let (sign, number) = (*reference).unwrap_or((Sign::Plus, 1));
                let value = references[number as usize]
                    .ok_or(Error::InvalidReference { number })?;
                memory.modify(base + address, *half_bytes, sign, value)?;
            }
            Record::End { .. } => break,
            _ => {}
        }
    }

    Ok(())
}
