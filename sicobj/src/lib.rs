//! The object-program model: typed records, fixed-column parsing and
//! canonical rendering of the H/D/R/T/M/E grammar, plus the text-record
//! buffering the assembler emits through.
//!
//! One object file holds one control section: a header record, optional
//! define/refer records, text records carrying the object code, optional
//! modification records and a closing end record. Lines end with LF.

use std::fmt;
use std::io::{self, BufRead};

use util::{parse_hex, Sign};

/// Maximum number of object bytes carried by one text record.
pub const TEXT_RECORD_CAP: usize = 30;

/// Symbols in records occupy fixed six-column fields.
pub const SYMBOL_WIDTH: usize = 6;

#[derive(Clone, Debug, Eq, PartialEq)]
pub enum RecordError {
    Empty,
    UnknownKind(char),
    Truncated { kind: char },
    BadField { kind: char, field: &'static str },
}

impl fmt::Display for RecordError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            RecordError::Empty => write!(f, "empty record"),
            RecordError::UnknownKind(kind) => write!(f, "unknown record kind '{}'", kind),
            RecordError::Truncated { kind } => write!(f, "truncated '{}' record", kind),
            RecordError::BadField { kind, field } => {
                write!(f, "malformed {} field in '{}' record", field, kind)
            }
        }
    }
}

impl std::error::Error for RecordError {}

pub type Result<T> = std::result::Result<T, RecordError>;

/// One line of an object program.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Record {
    Header {
        name: String,
        start: u32,
        length: u32,
    },
    Define {
        symbols: Vec<(String, u32)>,
    },
    Refer {
        refs: Vec<(u8, String)>,
    },
    Text {
        start: u32,
        bytes: Vec<u8>,
    },
    Modification {
        address: u32,
        half_bytes: u32,
        /// Sign and reference number; absent in assembler output, where the
        /// patch is understood as `+01` (the section's own base).
        reference: Option<(Sign, u8)>,
    },
    End {
        entry: u32,
    },
}

fn field<'l>(kind: char, line: &'l str, from: usize, len: usize) -> Result<&'l str> {
    line.get(from..from + len)
        .ok_or(RecordError::Truncated { kind })
}

fn hex_field(kind: char, line: &str, from: usize, len: usize, name: &'static str) -> Result<u32> {
    parse_hex(field(kind, line, from, len)?).map_err(|_| RecordError::BadField { kind, field: name })
}

fn dec_field(kind: char, line: &str, from: usize, len: usize, name: &'static str) -> Result<u32> {
    field(kind, line, from, len)?
        .trim()
        .parse()
        .map_err(|_| RecordError::BadField { kind, field: name })
}

impl Record {
    /// Parses one record line. Column positions are fixed; symbol fields are
    /// blank-padded to six characters, except that a trailing field may be
    /// shorter.
    pub fn parse(line: &str) -> Result<Record> {
        let line = line.trim_end_matches(['\r', '\n'].as_ref());
        let kind = line.chars().next().ok_or(RecordError::Empty)?;

        match kind {
            'H' => Ok(Record::Header {
                name: field('H', line, 1, SYMBOL_WIDTH)?.trim_end().to_owned(),
                start: hex_field('H', line, 7, 6, "start address")?,
                length: hex_field('H', line, 13, 6, "length")?,
            }),
            'D' => {
                let mut symbols = Vec::new();
                let mut at = 1;
                while at < line.len() {
                    let name = field('D', line, at, SYMBOL_WIDTH)?.trim_end().to_owned();
                    let address = hex_field('D', line, at + SYMBOL_WIDTH, 6, "address")?;
                    symbols.push((name, address));
                    at += SYMBOL_WIDTH + 6;
                }
                if symbols.is_empty() {
                    return Err(RecordError::Truncated { kind: 'D' });
                }
                Ok(Record::Define { symbols })
            }
            'R' => {
                let mut refs = Vec::new();
                let mut at = 1;
                while at < line.len() {
                    let number = dec_field('R', line, at, 2, "reference number")?;
                    // The final symbol may omit its blank padding.
                    let end = (at + 2 + SYMBOL_WIDTH).min(line.len());
                    let name = line[at + 2..end].trim_end().to_owned();
                    if name.is_empty() {
                        return Err(RecordError::BadField {
                            kind: 'R',
                            field: "symbol",
                        });
                    }
                    refs.push((number as u8, name));
                    at += 2 + SYMBOL_WIDTH;
                }
                if refs.is_empty() {
                    return Err(RecordError::Truncated { kind: 'R' });
                }
                Ok(Record::Refer { refs })
            }
            'T' => {
                let start = hex_field('T', line, 1, 6, "start address")?;
                let length = hex_field('T', line, 7, 2, "length")? as usize;
                let payload = field('T', line, 9, length * 2)?;
                let mut bytes = Vec::with_capacity(length);
                for index in 0..length {
                    let byte = payload
                        .get(index * 2..index * 2 + 2)
                        .and_then(|pair| u8::from_str_radix(pair, 16).ok())
                        .ok_or(RecordError::BadField {
                            kind: 'T',
                            field: "object code",
                        })?;
                    bytes.push(byte);
                }
                Ok(Record::Text { start, bytes })
            }
            'M' => {
                let address = hex_field('M', line, 1, 6, "address")?;
                let half_bytes = hex_field('M', line, 7, 2, "length")?;
                let reference = if line.len() > 9 {
                    let sign = line[9..].chars().next().unwrap();
                    let sign = Sign::from_char(sign).ok_or(RecordError::BadField {
                        kind: 'M',
                        field: "sign",
                    })?;
                    let number = dec_field('M', line, 10, 2, "reference number")?;
                    Some((sign, number as u8))
                } else {
                    None
                };
                Ok(Record::Modification {
                    address,
                    half_bytes,
                    reference,
                })
            }
            'E' => Ok(Record::End {
                entry: hex_field('E', line, 1, 6, "entry address")?,
            }),
            other => Err(RecordError::UnknownKind(other)),
        }
    }
}

impl fmt::Display for Record {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Record::Header {
                name,
                start,
                length,
            } => write!(f, "H{:<6}{:06X}{:06X}", name, start, length),
            Record::Define { symbols } => {
                f.write_str("D")?;
                for (name, address) in symbols {
                    write!(f, "{:<6}{:06X}", name, address)?;
                }
                Ok(())
            }
            Record::Refer { refs } => {
                f.write_str("R")?;
                for (number, name) in refs {
                    write!(f, "{:02}{:<6}", number, name)?;
                }
                Ok(())
            }
            Record::Text { start, bytes } => {
                write!(f, "T{:06X}{:02X}", start, bytes.len())?;
                for byte in bytes {
                    write!(f, "{:02X}", byte)?;
                }
                Ok(())
            }
            Record::Modification {
                address,
                half_bytes,
                reference,
            } => {
                write!(f, "M{:06X}{:02X}", address, half_bytes)?;
                if let Some((sign, number)) = reference {
                    write!(f, "{}{:02}", sign, number)?;
                }
                Ok(())
            }
            Record::End { entry } => write!(f, "E{:06X}", entry),
        }
    }
}

/// Reads every record of an object program, skipping blank lines. Returns
/// the records with the 1-based line number each came from.
pub fn read_records<R: BufRead>(reader: R) -> io::Result<Vec<(usize, Result<Record>)>> {
    let mut records = Vec::new();
    for (index, line) in reader.lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        records.push((index + 1, Record::parse(&line)));
    }
    Ok(records)
}

/// Accumulates object bytes into text records of at most thirty bytes. The
/// assembler flushes it at storage-reservation directives and at the end of
/// the program.
pub struct TextRecordBuilder {
    start: u32,
    bytes: Vec<u8>,
}

impl Default for TextRecordBuilder {
    fn default() -> TextRecordBuilder {
        TextRecordBuilder::new()
    }
}

impl TextRecordBuilder {
    pub fn new() -> TextRecordBuilder {
        TextRecordBuilder {
            start: 0,
            bytes: Vec::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Appends the object code of one source line, assembled at `locctr`.
    /// A line whose code would push the pending record past thirty bytes
    /// closes that record first; a single payload longer than one record
    /// spills across as many as it needs.
    pub fn append(&mut self, locctr: u32, bytes: &[u8], out: &mut Vec<Record>) {
        if bytes.is_empty() {
            return;
        }
        if !self.bytes.is_empty() && self.bytes.len() + bytes.len() > TEXT_RECORD_CAP {
            self.flush(out);
        }

        let mut locctr = locctr;
        let mut bytes = bytes;
        while bytes.len() > TEXT_RECORD_CAP {
            out.push(Record::Text {
                start: locctr,
                bytes: bytes[..TEXT_RECORD_CAP].to_vec(),
            });
            bytes = &bytes[TEXT_RECORD_CAP..];
            locctr += TEXT_RECORD_CAP as u32;
        }

        if self.bytes.is_empty() {
            self.start = locctr;
        }
        self.bytes.extend_from_slice(bytes);
    }

    /// Emits the pending record, if any.
    pub fn flush(&mut self, out: &mut Vec<Record>) {
        if !self.bytes.is_empty() {
            out.push(Record::Text {
                start: self.start,
                bytes: std::mem::replace(&mut self.bytes, Vec::new()),
            });
        }
    }
}
