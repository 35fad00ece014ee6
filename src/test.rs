use super::*;

use crate::register::{CC_EQUAL, CC_GREATER, CC_LESS};

const BASE: u32 = 0x1000;

fn test_opcodes() -> OpcodeTable {
    let text = "\
18 ADD 3/4
90 ADDR 2
B4 CLEAR 2
28 COMP 3/4
A0 COMPR 2
24 DIV 3/4
3C J 3/4
30 JEQ 3/4
38 JLT 3/4
48 JSUB 3/4
00 LDA 3/4
50 LDCH 3/4
04 LDX 3/4
D8 RD 3/4
4C RSUB 3/4
0C STA 3/4
54 STCH 3/4
E0 TD 3/4
B8 TIXR 2
";
    OpcodeTable::from_reader(text.as_bytes()).unwrap()
}

fn run_program(program: &[u8], length: u32) -> (RunStop, MemSpace) {
    run_program_with(program, length, &[])
}

fn run_program_with(program: &[u8], length: u32, extra: &[(u32, &[u8])]) -> (RunStop, MemSpace) {
    let opcodes = test_opcodes();
    let mut memory = MemSpace::new();
    memory.set(BASE, program).unwrap();
    for &(address, bytes) in extra {
        memory.set(address, bytes).unwrap();
    }

    let mut debugger = Debugger::new();
    debugger.prepare_run(BASE, length);
    let stop = debugger.run(&mut memory, &opcodes).unwrap();
    (stop, memory)
}

#[test]
fn run_without_program_is_rejected() {
    let mut debugger = Debugger::new();
    let mut memory = MemSpace::new();
    assert_eq!(
        debugger.run(&mut memory, &test_opcodes()).unwrap_err(),
        SimError::NoProgram
    );
}

#[test]
fn immediate_load_and_extended_store() {
    // LDA #42 / +STA 0x1100
    let program = [0x01, 0x00, 0x2A, 0x0F, 0x10, 0x11, 0x00];
    let (stop, memory) = run_program(&program, 7);

    assert_eq!(stop.reason, StopReason::Finished);
    assert_eq!(stop.registers.get(RegisterId::A), 42);
    assert_eq!(memory.read_word(0x1100).unwrap(), 42);
}

#[test]
fn finished_run_clears_the_debugger() {
    let program = [0x01, 0x00, 0x2A];
    let opcodes = test_opcodes();
    let mut memory = MemSpace::new();
    memory.set(BASE, &program).unwrap();

    let mut debugger = Debugger::new();
    debugger.prepare_run(BASE, 3);
    debugger.add_breakpoint(0x2000);
    let stop = debugger.run(&mut memory, &opcodes).unwrap();

    assert_eq!(stop.reason, StopReason::Finished);
    assert!(!debugger.is_loaded());
    assert_eq!(debugger.breakpoints().count(), 0);
    assert_eq!(debugger.registers().get(RegisterId::A), 0);
    assert_eq!(
        debugger.run(&mut memory, &opcodes).unwrap_err(),
        SimError::NoProgram
    );
}

#[test]
fn breakpoint_stops_then_resumes() {
    // LDA #1 / LDA #2 / LDA #3
    let program = [0x01, 0x00, 0x01, 0x01, 0x00, 0x02, 0x01, 0x00, 0x03];
    let opcodes = test_opcodes();
    let mut memory = MemSpace::new();
    memory.set(BASE, &program).unwrap();

    let mut debugger = Debugger::new();
    debugger.prepare_run(BASE, 9);
    debugger.add_breakpoint(0x1003);

    let stop = debugger.run(&mut memory, &opcodes).unwrap();
    assert_eq!(stop.reason, StopReason::Breakpoint(0x1003));
    assert_eq!(stop.registers.get(RegisterId::A), 1);
    assert!(debugger.is_loaded());

    let stop = debugger.run(&mut memory, &opcodes).unwrap();
    assert_eq!(stop.reason, StopReason::Finished);
    assert_eq!(stop.registers.get(RegisterId::A), 3);
}

#[test]
fn pc_relative_load() {
    // LDA <pc+4> / +J 0x100A, word operand placed behind the code
    let program = [
        0x03, 0x20, 0x04, // LDA, pc-relative, disp 4 -> 0x1007
        0x3F, 0x10, 0x10, 0x0A, // +J 0x100A
        0x12, 0x34, 0x56, // operand word
    ];
    let (stop, _) = run_program(&program, 10);

    assert_eq!(stop.reason, StopReason::Finished);
    assert_eq!(stop.registers.get(RegisterId::A), 0x12_3456);
}

#[test]
fn counting_loop_with_negative_displacement() {
    // LDA #0; ADD #1; COMP #3; JLT back to the ADD
    let program = [
        0x01, 0x00, 0x00, // LDA #0
        0x19, 0x00, 0x01, // ADD #1
        0x29, 0x00, 0x03, // COMP #3
        0x3B, 0x2F, 0xF7, // JLT pc-relative, disp -9
    ];
    let (stop, _) = run_program(&program, 12);

    assert_eq!(stop.reason, StopReason::Finished);
    assert_eq!(stop.registers.get(RegisterId::A), 3);
    assert_eq!(stop.registers.condition(), CC_EQUAL);
}

#[test]
fn subroutine_call_and_return() {
    let program = [
        0x4B, 0x20, 0x04, // JSUB pc-relative -> 0x1007
        0x3F, 0x10, 0x10, 0x0A, // +J 0x100A (the end)
        0x4F, 0x00, 0x00, // RSUB
    ];
    let (stop, _) = run_program(&program, 10);

    assert_eq!(stop.reason, StopReason::Finished);
    assert_eq!(stop.registers.get(RegisterId::L), 0x1003);
}

#[test]
fn indirect_jump_reads_the_target_cell() {
    // J @<pc+3>; the cell at 0x1006 holds the exit address 0x001009.
    let program = [
        0x3E, 0x20, 0x03, // J indirect, pc-relative, disp 3
        0xFF, 0xFF, 0xFF, // never executed
        0x00, 0x10, 0x09, // pointer word
    ];
    let (stop, _) = run_program(&program, 9);
    assert_eq!(stop.reason, StopReason::Finished);
}

#[test]
fn sic_compatibility_addressing() {
    // n=0 i=0: the flag bits fold into a 15-bit address field and the
    // operand value is the target itself.
    let program = [0x00, 0x00, 0x05];
    let (stop, _) = run_program(&program, 3);
    assert_eq!(stop.registers.get(RegisterId::A), 5);
}

#[test]
fn indexed_addressing_adds_x() {
    // LDX #2 / +LDA 0x1200,X loads the word at 0x1202.
    let program = [
        0x05, 0x00, 0x02, // LDX #2
        0x03, 0x90, 0x12, 0x00, // +LDA 0x1200,X
    ];
    let (stop, _) = run_program_with(&program, 7, &[(0x1202, &[0x00, 0x00, 0x2B])]);
    assert_eq!(stop.registers.get(RegisterId::A), 0x2B);
}

#[test]
fn addr_stores_sum_in_first_register() {
    // LDX #2 / LDA #3 / ADDR X,A. The manual says the sum goes to r2; the
    // system modeled here writes it to r1, so X becomes 5 and A keeps 3.
    let program = [
        0x05, 0x00, 0x02, // LDX #2
        0x01, 0x00, 0x03, // LDA #3
        0x90, 0x10, // ADDR X,A
    ];
    let (stop, _) = run_program(&program, 8);

    assert_eq!(stop.registers.get(RegisterId::X), 5);
    assert_eq!(stop.registers.get(RegisterId::A), 3);
}

#[test]
fn compr_sets_the_condition_code() {
    // LDA #1 / LDX #2 / COMPR A,X
    let program = [
        0x01, 0x00, 0x01, // LDA #1
        0x05, 0x00, 0x02, // LDX #2
        0xA0, 0x01, // COMPR A,X
    ];
    let (stop, _) = run_program(&program, 8);
    assert_eq!(stop.registers.condition(), CC_LESS);

    // LDA #9 / LDX #2 / COMPR A,X
    let program = [
        0x01, 0x00, 0x09, 0x05, 0x00, 0x02, 0xA0, 0x01,
    ];
    let (stop, _) = run_program(&program, 8);
    assert_eq!(stop.registers.condition(), CC_GREATER);
}

#[test]
fn clear_and_tixr() {
    // LDA #2 / CLEAR X / TIXR A: X becomes 1, compared against A = 2.
    let program = [
        0x01, 0x00, 0x02, // LDA #2
        0xB4, 0x10, // CLEAR X
        0xB8, 0x00, // TIXR A
    ];
    let (stop, _) = run_program(&program, 7);

    assert_eq!(stop.registers.get(RegisterId::X), 1);
    assert_eq!(stop.registers.condition(), CC_LESS);
}

#[test]
fn character_load_and_store() {
    // +LDCH 0x1200 / +STCH 0x1201
    let program = [
        0x53, 0x10, 0x12, 0x00, // +LDCH 0x1200
        0x57, 0x10, 0x12, 0x01, // +STCH 0x1201
    ];
    let (stop, memory) = run_program_with(&program, 8, &[(0x1200, &[0xAB])]);

    assert_eq!(stop.registers.get(RegisterId::A) & 0xFF, 0xAB);
    assert_eq!(memory.get(0x1201, 1).unwrap(), &[0xAB]);
}

#[test]
fn device_stubs() {
    // LDA #9 / TD #1 / RD #1: TD reports ready, RD delivers zero.
    let program = [
        0x01, 0x00, 0x09, // LDA #9
        0xE1, 0x00, 0x01, // TD #1
        0xD9, 0x00, 0x01, // RD #1
    ];
    let (stop, _) = run_program(&program, 9);

    assert_eq!(stop.registers.get(RegisterId::A), 0);
    assert_eq!(stop.registers.condition(), CC_LESS);
}

#[test]
fn division_by_zero_aborts() {
    // LDA #4 / DIV #0
    let program = [0x01, 0x00, 0x04, 0x25, 0x00, 0x00];
    let opcodes = test_opcodes();
    let mut memory = MemSpace::new();
    memory.set(BASE, &program).unwrap();

    let mut debugger = Debugger::new();
    debugger.prepare_run(BASE, 6);
    assert_eq!(
        debugger.run(&mut memory, &opcodes).unwrap_err(),
        SimError::DivisionByZero { address: 0x1003 }
    );
}

#[test]
fn both_base_and_pc_flags_is_invalid() {
    let program = [0x03, 0x60, 0x00];
    let opcodes = test_opcodes();
    let mut memory = MemSpace::new();
    memory.set(BASE, &program).unwrap();

    let mut debugger = Debugger::new();
    debugger.prepare_run(BASE, 3);
    assert_eq!(
        debugger.run(&mut memory, &opcodes).unwrap_err(),
        SimError::InvalidAddressing { address: BASE }
    );
}

#[test]
fn prepare_run_primes_l_and_pc() {
    let mut debugger = Debugger::new();
    debugger.prepare_run(0x4000, 0x66);
    assert_eq!(debugger.registers().get(RegisterId::PC), 0x4000);
    assert_eq!(debugger.registers().get(RegisterId::L), 0x66);
}

#[test]
fn breakpoints_display_in_ascending_order() {
    let mut debugger = Debugger::new();
    debugger.add_breakpoint(0x30);
    debugger.add_breakpoint(0x10);
    debugger.add_breakpoint(0x20);

    assert_eq!(
        debugger.display_breakpoints(),
        "Breakpoints\n-----------\n10\n20\n30\n"
    );

    debugger.clear_breakpoints();
    assert_eq!(debugger.display_breakpoints(), "Breakpoints\n-----------\n");
}

#[test]
fn shipped_opcode_table_loads() {
    let path = concat!(env!("CARGO_MANIFEST_DIR"), "/opcode.txt");
    let table = OpcodeTable::from_file(path).unwrap();

    assert_eq!(table.opcode_of("LDA"), Some(0x00));
    assert_eq!(table.opcode_of("RSUB"), Some(0x4C));
    assert_eq!(table.format_of("FIX"), Some(FormatSet::F1));
    assert_eq!(table.format_of("ADDR"), Some(FormatSet::F2));
    assert_eq!(table.format_of("TD"), Some(FormatSet::F3 | FormatSet::F4));
    assert_eq!(table.by_opcode(0xB8).unwrap().mnemonic, "TIXR");
}
