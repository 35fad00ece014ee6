use std::collections::HashMap;
use std::fmt;
use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::path::Path;

use bitflags::bitflags;

bitflags! {
    /// The set of instruction formats a mnemonic admits. Memory-reference
    /// instructions carry `F3 | F4`; the `+` prefix selects format 4 at
    /// assembly time.
    #[derive(Clone, Copy, Debug, Eq, PartialEq)]
    pub struct FormatSet: u8 {
        const F1 = 0b0001;
        const F2 = 0b0010;
        const F3 = 0b0100;
        const F4 = 0b1000;
    }
}

impl FormatSet {
    fn from_spec(spec: &str) -> Option<FormatSet> {
        match spec {
            "1" => Some(FormatSet::F1),
            "2" => Some(FormatSet::F2),
            "3" => Some(FormatSet::F3),
            "4" => Some(FormatSet::F4),
            "3/4" => Some(FormatSet::F3 | FormatSet::F4),
            _ => None,
        }
    }
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct OpcodeEntry {
    pub mnemonic: String,
    pub opcode: u8,
    pub formats: FormatSet,
}

#[derive(Debug)]
pub enum OpcodeLoadError {
    Io(io::Error),
    BadLine { line: usize, text: String },
}

impl fmt::Display for OpcodeLoadError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            OpcodeLoadError::Io(err) => write!(f, "{}", err),
            OpcodeLoadError::BadLine { line, text } => {
                write!(f, "line {}: malformed opcode entry '{}'", line, text)
            }
        }
    }
}

impl From<io::Error> for OpcodeLoadError {
    fn from(err: io::Error) -> OpcodeLoadError {
        OpcodeLoadError::Io(err)
    }
}

/// Number of display buckets used by `opcodelist`.
const BUCKET_COUNT: usize = 20;

/// The opcode dictionary, built once at startup from `opcode.txt` and never
/// mutated afterwards.
#[derive(Debug)]
pub struct OpcodeTable {
    entries: Vec<OpcodeEntry>,
    mnemonic_index: HashMap<String, usize>,
    opcode_index: HashMap<u8, usize>,
}

impl OpcodeTable {
    pub fn empty() -> OpcodeTable {
        OpcodeTable {
            entries: Vec::new(),
            mnemonic_index: HashMap::new(),
            opcode_index: HashMap::new(),
        }
    }

    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<OpcodeTable, OpcodeLoadError> {
        OpcodeTable::from_reader(BufReader::new(File::open(path)?))
    }

    /// Reads `<hex opcode> <mnemonic> <format-spec>` triples, one per line.
    pub fn from_reader<R: BufRead>(reader: R) -> Result<OpcodeTable, OpcodeLoadError> {
        let mut table = OpcodeTable::empty();

        for (index, line) in reader.lines().enumerate() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }

            let mut fields = line.split_whitespace();
            let parsed = match (fields.next(), fields.next(), fields.next()) {
                (Some(opcode), Some(mnemonic), Some(spec)) => {
                    match (u8::from_str_radix(opcode, 16), FormatSet::from_spec(spec)) {
                        (Ok(opcode), Some(formats)) => Some(OpcodeEntry {
                            mnemonic: mnemonic.to_owned(),
                            opcode,
                            formats,
                        }),
                        _ => None,
                    }
                }
                _ => None,
            };

            match parsed {
                Some(entry) => table.insert(entry),
                None => {
                    return Err(OpcodeLoadError::BadLine {
                        line: index + 1,
                        text: line,
                    })
                }
            }
        }

        Ok(table)
    }

    fn insert(&mut self, entry: OpcodeEntry) {
        let index = self.entries.len();
        self.mnemonic_index.insert(entry.mnemonic.clone(), index);
        self.opcode_index.insert(entry.opcode, index);
        self.entries.push(entry);
    }

    pub fn get(&self, mnemonic: &str) -> Option<&OpcodeEntry> {
        self.mnemonic_index.get(mnemonic).map(|&i| &self.entries[i])
    }

    pub fn opcode_of(&self, mnemonic: &str) -> Option<u8> {
        self.get(mnemonic).map(|e| e.opcode)
    }

    pub fn format_of(&self, mnemonic: &str) -> Option<FormatSet> {
        self.get(mnemonic).map(|e| e.formats)
    }

    /// Looks an entry up by its opcode byte (already masked to the high six
    /// bits). The simulator uses this to pick the instruction format.
    pub fn by_opcode(&self, opcode: u8) -> Option<&OpcodeEntry> {
        self.opcode_index.get(&opcode).map(|&i| &self.entries[i])
    }

    pub fn is_mnemonic(&self, text: &str) -> bool {
        self.mnemonic_index.contains_key(text)
    }

    fn bucket_of(mnemonic: &str) -> usize {
        let hash = mnemonic
            .bytes()
            .fold(0u32, |h, b| h.wrapping_mul(31).wrapping_add(u32::from(b)));
        hash as usize % BUCKET_COUNT
    }

    /// Groups the entries into the display buckets used by `opcodelist`.
    /// The distribution is fixed by the mnemonic hash, so it is stable for
    /// the lifetime of the process.
    pub fn buckets(&self) -> Vec<Vec<&OpcodeEntry>> {
        let mut buckets = vec![Vec::new(); BUCKET_COUNT];
        for entry in &self.entries {
            buckets[OpcodeTable::bucket_of(&entry.mnemonic)].push(entry);
        }
        buckets
    }

    /// Renders the whole dictionary, one bucket per line.
    pub fn display_list(&self) -> String {
        let mut out = String::new();
        for (index, bucket) in self.buckets().iter().enumerate() {
            out.push_str(&format!("{} : ", index));
            let cells: Vec<String> = bucket
                .iter()
                .map(|e| format!("[{},{:02X}]", e.mnemonic, e.opcode))
                .collect();
            out.push_str(&cells.join(" -> "));
            out.push('\n');
        }
        out
    }
}
