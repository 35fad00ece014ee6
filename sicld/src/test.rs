use super::*;

use std::fs;
use std::path::PathBuf;

use sicvm::memory::MemSpace;

fn write_programs(name: &str, programs: &[(&str, &str)]) -> Vec<PathBuf> {
    let dir = std::env::temp_dir().join(format!("sicld-test-{}", name));
    fs::create_dir_all(&dir).unwrap();
    programs
        .iter()
        .map(|(file, text)| {
            let path = dir.join(file);
            fs::write(&path, text).unwrap();
            path
        })
        .collect()
}

const PROGA: &str = "\
HPROGA 000000000010
DLISTA 000006
R02LISTB
T00000009010203000000AB4F00
M00000305+02
E000000
";

const PROGB: &str = "\
HPROGB 000000000008
DLISTB 000002
T00000004AABB0000
M00000205
E000000
";

#[test]
fn two_sections_link_and_relocate() {
    let paths = write_programs("link", &[("proga.obj", PROGA), ("progb.obj", PROGB)]);

    let mut memory = MemSpace::new();
    memory.set_progaddr(0x4000);
    let mut table = ExternalSymbolTable::new();

    let summary = load(&paths, &mut memory, &mut table).unwrap();
    assert_eq!(
        summary,
        LoadSummary {
            program_address: 0x4000,
            program_length: 0x18,
        }
    );

    // Section bases stack left to right from progaddr.
    assert_eq!(table.address_of("PROGA"), Some(0x4000));
    assert_eq!(table.address_of("PROGB"), Some(0x4010));
    assert_eq!(table.address_of("LISTA"), Some(0x4006));
    assert_eq!(table.address_of("LISTB"), Some(0x4012));

    // PROGA's text record landed at its base, with the cross-section
    // modification applied: +LISTB over the field at offset 3.
    assert_eq!(memory.get(0x4000, 3).unwrap(), &[0x01, 0x02, 0x03]);
    assert_eq!(memory.get(0x4003, 3).unwrap(), &[0x00, 0x40, 0x12]);
    assert_eq!(memory.get(0x4006, 3).unwrap(), &[0xAB, 0x4F, 0x00]);

    // PROGB's modification carries no reference suffix: it relocates by the
    // section's own base.
    assert_eq!(memory.get(0x4010, 2).unwrap(), &[0xAA, 0xBB]);
    assert_eq!(memory.get(0x4012, 3).unwrap(), &[0x00, 0x40, 0x10]);
}

#[test]
fn display_lists_sections_symbols_and_total() {
    let paths = write_programs("display", &[("proga.obj", PROGA), ("progb.obj", PROGB)]);

    let mut memory = MemSpace::new();
    memory.set_progaddr(0x4000);
    let mut table = ExternalSymbolTable::new();
    load(&paths, &mut memory, &mut table).unwrap();

    let expected = "\
Control\tSymbol\tAddress\tLength
section\tname
--------------------------------
PROGA\t\t4000\t0010
\tLISTA\t4006
PROGB\t\t4010\t0008
\tLISTB\t4012
--------------------------------
\t\tTotal length 0018
";
    assert_eq!(table.display(), expected);
}

#[test]
fn unresolved_reference_fails_the_load() {
    let broken = "\
HPROGC 000000000003
R02GHOST
T00000003010203
E000000
";
    let paths = write_programs("unresolved", &[("progc.obj", broken)]);

    let mut memory = MemSpace::new();
    let mut table = ExternalSymbolTable::new();
    match load(&paths, &mut memory, &mut table).unwrap_err() {
        Error::UnresolvedSymbol { name } => assert_eq!(name, "GHOST"),
        other => panic!("unexpected error: {}", other),
    }
}

#[test]
fn unknown_reference_number_fails_the_load() {
    let broken = "\
HPROGD 000000000003
T00000003010203
M00000005+07
E000000
";
    let paths = write_programs("badref", &[("progd.obj", broken)]);

    let mut memory = MemSpace::new();
    let mut table = ExternalSymbolTable::new();
    match load(&paths, &mut memory, &mut table).unwrap_err() {
        Error::InvalidReference { number } => assert_eq!(number, 7),
        other => panic!("unexpected error: {}", other),
    }
}

#[test]
fn duplicate_external_symbols_are_rejected() {
    let other = "\
HPROGA 000000000003
T00000003010203
E000000
";
    let paths = write_programs("dup", &[("a.obj", PROGA), ("b.obj", other)]);

    let mut memory = MemSpace::new();
    let mut table = ExternalSymbolTable::new();
    match load(&paths, &mut memory, &mut table).unwrap_err() {
        Error::DuplicateSymbol { name } => assert_eq!(name, "PROGA"),
        other => panic!("unexpected error: {}", other),
    }
}

#[test]
fn missing_file_is_reported() {
    let mut memory = MemSpace::new();
    let mut table = ExternalSymbolTable::new();
    match load(&["/nonexistent/prog.obj"], &mut memory, &mut table).unwrap_err() {
        Error::MissingFile(name) => assert!(name.contains("prog.obj")),
        other => panic!("unexpected error: {}", other),
    }
}

#[test]
fn failed_load_keeps_prior_sections_in_memory() {
    let broken = "\
HPROGE 000000000003
R02GHOST
T00000003FFEEDD
E000000
";
    let paths = write_programs("partial", &[("a.obj", PROGA), ("e.obj", broken)]);

    let mut memory = MemSpace::new();
    memory.set_progaddr(0x5000);
    let mut table = ExternalSymbolTable::new();
    assert!(load(&paths, &mut memory, &mut table).is_err());

    // PROGA was placed before the failure and stays.
    assert_eq!(memory.get(0x5000, 3).unwrap(), &[0x01, 0x02, 0x03]);
}

#[test]
fn assembled_object_round_trips_through_the_loader() {
    use sicvm::opcode::OpcodeTable;

    let opcodes =
        OpcodeTable::from_file(concat!(env!("CARGO_MANIFEST_DIR"), "/../opcode.txt")).unwrap();
    let assembly = sicasm::assemble(
        "\
        START  0
        +J     THERE
        RESB   2050
THERE   RSUB
        END
",
        &opcodes,
    )
    .unwrap();

    let dir = std::env::temp_dir().join("sicld-test-roundtrip");
    fs::create_dir_all(&dir).unwrap();
    let path = dir.join("prog.obj");
    fs::write(&path, &assembly.object).unwrap();

    let mut memory = MemSpace::new();
    memory.set_progaddr(0x3000);
    let mut table = ExternalSymbolTable::new();
    let summary = load(&[&path], &mut memory, &mut table).unwrap();

    assert_eq!(summary.program_address, 0x3000);
    assert_eq!(summary.program_length, assembly.program_length);

    // The +J instruction's 20-bit address field was relocated by the load
    // address: 0x00806 became 0x03806.
    assert_eq!(
        memory.get(0x3000, 4).unwrap(),
        &[0x3F, 0x10, 0x38, 0x06]
    );
    // The subroutine body landed past the reserved block.
    assert_eq!(memory.get(0x3806, 3).unwrap(), &[0x4F, 0x00, 0x00]);
}
