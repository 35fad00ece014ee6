use std::fs;
use std::io::{self, BufRead, Write};
use std::path::Path;

use sicasm::SymbolTable;
use sicld::ExternalSymbolTable;
use sicvm::debugger::{Debugger, StopReason};
use sicvm::memory::MemSpace;
use sicvm::opcode::OpcodeTable;
use util::parse_hex;

use crate::logger::History;

const ADDRESS_MAX: u32 = 0xFFFFF;
const VALUE_MAX: u32 = 0xFF;

/// The interactive front end. Owns every process-wide singleton and hands
/// parsed commands to the matching subsystem.
pub struct Shell {
    opcodes: OpcodeTable,
    memory: MemSpace,
    debugger: Debugger,
    external: ExternalSymbolTable,
    saved_symbols: SymbolTable,
    history: History,
}

/// Splits an input line into the command and up to four arguments; commas
/// and whitespace both separate arguments.
fn tokenize(input: &str) -> Option<(String, Vec<String>)> {
    let mut parts = input.split_whitespace();
    let cmd = parts.next()?.to_owned();
    let rest: String = parts.collect::<Vec<_>>().join(" ");
    let args: Vec<String> = rest
        .split(|c: char| c == ',' || c.is_whitespace())
        .filter(|s| !s.is_empty())
        .map(|s| s.to_owned())
        .collect();
    Some((cmd, args))
}

impl Shell {
    pub fn new(opcodes: OpcodeTable) -> Shell {
        Shell {
            opcodes,
            memory: MemSpace::new(),
            debugger: Debugger::new(),
            external: ExternalSymbolTable::new(),
            saved_symbols: SymbolTable::new(),
            history: History::new(),
        }
    }

    pub fn run(&mut self) {
        let stdin = io::stdin();
        let mut input = String::new();

        loop {
            print!("sicsim> ");
            let _ = io::stdout().flush();

            input.clear();
            match stdin.lock().read_line(&mut input) {
                Ok(0) | Err(_) => break,
                Ok(_) => {}
            }

            let (cmd, args) = match tokenize(&input) {
                Some(parsed) => parsed,
                None => continue,
            };
            if args.len() > 3 {
                println!("{}: too many arguments", cmd);
                continue;
            }
            if cmd == "q" || cmd == "quit" {
                break;
            }
            self.execute(&cmd, &args);
        }
    }

    fn execute(&mut self, cmd: &str, args: &[String]) {
        if cmd == "hi" || cmd == "history" {
            // The history command records itself before rendering, so it
            // shows up as its own last entry.
            if !args.is_empty() {
                println!("{}: too many arguments", cmd);
                return;
            }
            self.history.record(cmd, args);
            print!("{}", self.history.display());
            return;
        }

        let executed = match cmd {
            "h" | "help" => self.help(args),
            "d" | "dir" => self.dir(args),
            "type" => self.type_file(cmd, args),
            "du" | "dump" => self.dump(cmd, args),
            "e" | "edit" => self.edit(cmd, args),
            "f" | "fill" => self.fill(cmd, args),
            "reset" => self.reset(cmd, args),
            "progaddr" => self.progaddr(cmd, args),
            "opcode" => self.opcode(cmd, args),
            "opcodelist" => self.opcodelist(cmd, args),
            "assemble" => self.assemble(cmd, args),
            "symbol" => self.symbol(cmd, args),
            "loader" => self.loader(cmd, args),
            "bp" => self.bp(cmd, args),
            "run" => self.run_program(cmd, args),
            _ => {
                println!("{}: command not found", cmd);
                return;
            }
        };

        if executed {
            self.history.record(cmd, args);
        }
    }

    fn no_arguments(cmd: &str, args: &[String]) -> bool {
        if args.is_empty() {
            true
        } else {
            println!("{}: too many arguments", cmd);
            false
        }
    }

    fn parse_address(cmd: &str, text: &str) -> Option<u32> {
        let value = match parse_hex(text) {
            Ok(value) => value,
            Err(_) => {
                println!("{}: argument '{}' is invalid", cmd, text);
                return None;
            }
        };
        if value > ADDRESS_MAX {
            println!("{}: address '{:X}' is out of range", cmd, value);
            return None;
        }
        Some(value)
    }

    fn parse_value(cmd: &str, text: &str) -> Option<u8> {
        let value = match parse_hex(text) {
            Ok(value) => value,
            Err(_) => {
                println!("{}: argument '{}' is invalid", cmd, text);
                return None;
            }
        };
        if value > VALUE_MAX {
            println!("{}: value '{:X}' is out of range", cmd, value);
            return None;
        }
        Some(value as u8)
    }

    fn help(&self, args: &[String]) -> bool {
        if !Shell::no_arguments("help", args) {
            return false;
        }
        println!("h[elp]");
        println!("d[ir]");
        println!("q[uit]");
        println!("hi[story]");
        println!("du[mp] [start, end]");
        println!("e[dit] address, value");
        println!("f[ill] start, end, value");
        println!("reset");
        println!("opcode mnemonic");
        println!("opcodelist");
        println!("assemble filename");
        println!("type filename");
        println!("symbol");
        println!("progaddr address");
        println!("loader filename1 [filename2, filename3]");
        println!("bp [address | clear]");
        println!("run");
        true
    }

    fn dir(&self, args: &[String]) -> bool {
        if !Shell::no_arguments("dir", args) {
            return false;
        }
        let entries = match fs::read_dir(".") {
            Ok(entries) => entries,
            Err(err) => {
                println!("dir: {}", err);
                return false;
            }
        };

        let mut names: Vec<String> = entries
            .filter_map(|entry| entry.ok())
            .map(|entry| {
                let mut name = entry.file_name().to_string_lossy().into_owned();
                if entry.path().is_dir() {
                    name.push('/');
                }
                name
            })
            .collect();
        names.sort();
        for name in names {
            println!("{}", name);
        }
        true
    }

    fn type_file(&self, cmd: &str, args: &[String]) -> bool {
        if args.len() != 1 {
            println!("{}: one argument is required", cmd);
            return false;
        }
        match fs::read_to_string(&args[0]) {
            Ok(contents) => {
                print!("{}", contents);
                if !contents.ends_with('\n') {
                    println!();
                }
                true
            }
            Err(_) => {
                println!("{}: there is no such file '{}'", cmd, args[0]);
                false
            }
        }
    }

    fn dump(&mut self, cmd: &str, args: &[String]) -> bool {
        let result = match args.len() {
            0 => self.memory.dump_next(),
            1 => match Shell::parse_address(cmd, &args[0]) {
                Some(start) => self.memory.dump_window(start),
                None => return false,
            },
            2 => {
                let start = match Shell::parse_address(cmd, &args[0]) {
                    Some(start) => start,
                    None => return false,
                };
                let end = match Shell::parse_address(cmd, &args[1]) {
                    Some(end) => end,
                    None => return false,
                };
                self.memory.dump(start, end)
            }
            _ => {
                println!("{}: too many arguments", cmd);
                return false;
            }
        };

        match result {
            Ok(text) => {
                print!("{}", text);
                true
            }
            Err(err) => {
                println!("{}: {}", cmd, err);
                false
            }
        }
    }

    fn edit(&mut self, cmd: &str, args: &[String]) -> bool {
        if args.len() != 2 {
            println!("{}: two arguments are required", cmd);
            return false;
        }
        let address = match Shell::parse_address(cmd, &args[0]) {
            Some(address) => address,
            None => return false,
        };
        let value = match Shell::parse_value(cmd, &args[1]) {
            Some(value) => value,
            None => return false,
        };
        match self.memory.edit(address, value) {
            Ok(()) => true,
            Err(err) => {
                println!("{}: {}", cmd, err);
                false
            }
        }
    }

    fn fill(&mut self, cmd: &str, args: &[String]) -> bool {
        if args.len() != 3 {
            println!("{}: three arguments are required", cmd);
            return false;
        }
        let start = match Shell::parse_address(cmd, &args[0]) {
            Some(start) => start,
            None => return false,
        };
        let end = match Shell::parse_address(cmd, &args[1]) {
            Some(end) => end,
            None => return false,
        };
        let value = match Shell::parse_value(cmd, &args[2]) {
            Some(value) => value,
            None => return false,
        };
        match self.memory.fill(start, end, value) {
            Ok(()) => true,
            Err(err) => {
                println!("{}: {}", cmd, err);
                false
            }
        }
    }

    fn reset(&mut self, cmd: &str, args: &[String]) -> bool {
        if !Shell::no_arguments(cmd, args) {
            return false;
        }
        self.memory.reset();
        true
    }

    fn progaddr(&mut self, cmd: &str, args: &[String]) -> bool {
        if args.len() != 1 {
            println!("{}: one argument is required", cmd);
            return false;
        }
        match Shell::parse_address(cmd, &args[0]) {
            Some(address) => {
                self.memory.set_progaddr(address);
                true
            }
            None => false,
        }
    }

    fn opcode(&self, cmd: &str, args: &[String]) -> bool {
        if args.len() != 1 {
            println!("{}: one argument is required", cmd);
            return false;
        }
        match self.opcodes.opcode_of(&args[0]) {
            Some(opcode) => {
                println!("opcode is {:X}", opcode);
                true
            }
            None => {
                println!("{}: cannot find mnemonic {}", cmd, args[0]);
                false
            }
        }
    }

    fn opcodelist(&self, cmd: &str, args: &[String]) -> bool {
        if !Shell::no_arguments(cmd, args) {
            return false;
        }
        print!("{}", self.opcodes.display_list());
        true
    }

    fn assemble(&mut self, cmd: &str, args: &[String]) -> bool {
        if args.len() != 1 {
            println!("{}: one argument is required", cmd);
            return false;
        }
        match sicasm::assemble_file(Path::new(&args[0]), &self.opcodes) {
            Ok(assembly) => {
                // Promote the working table only on success.
                self.saved_symbols = assembly.symbols;
                true
            }
            Err(err) => {
                println!("{}: {}", cmd, err);
                false
            }
        }
    }

    fn symbol(&self, cmd: &str, args: &[String]) -> bool {
        if !Shell::no_arguments(cmd, args) {
            return false;
        }
        print!("{}", self.saved_symbols.display());
        true
    }

    fn loader(&mut self, cmd: &str, args: &[String]) -> bool {
        if args.is_empty() {
            println!("{}: at least one object file is required", cmd);
            return false;
        }
        match sicld::load(args, &mut self.memory, &mut self.external) {
            Ok(summary) => {
                self.debugger
                    .prepare_run(summary.program_address, summary.program_length);
                print!("{}", self.external.display());
                true
            }
            Err(err) => {
                println!("{}: {}", cmd, err);
                false
            }
        }
    }

    fn bp(&mut self, _cmd: &str, args: &[String]) -> bool {
        match args.len() {
            0 => {
                print!("{}", self.debugger.display_breakpoints());
                true
            }
            1 => {
                if args[0] == "clear" {
                    self.debugger.clear_breakpoints();
                    return true;
                }
                match Shell::parse_address("debugger", &args[0]) {
                    Some(address) => {
                        self.debugger.add_breakpoint(address);
                        true
                    }
                    None => false,
                }
            }
            _ => {
                println!("debugger: too many arguments");
                false
            }
        }
    }

    fn run_program(&mut self, _cmd: &str, args: &[String]) -> bool {
        if !Shell::no_arguments("debugger", args) {
            return false;
        }
        match self.debugger.run(&mut self.memory, &self.opcodes) {
            Ok(stop) => {
                print!("{}", stop.registers.display());
                match stop.reason {
                    StopReason::Finished => println!("Program finished"),
                    StopReason::Breakpoint(address) => {
                        println!("Breakpoint at {:X}", address)
                    }
                }
                true
            }
            Err(err) => {
                println!("debugger: {}", err);
                false
            }
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn tokenize_splits_command_and_arguments() {
        let (cmd, args) = tokenize("edit 10, 2A\n").unwrap();
        assert_eq!(cmd, "edit");
        assert_eq!(args, vec!["10".to_owned(), "2A".to_owned()]);

        let (cmd, args) = tokenize("  fill 1 , 2 , 3  ").unwrap();
        assert_eq!(cmd, "fill");
        assert_eq!(args.len(), 3);

        let (cmd, args) = tokenize("reset").unwrap();
        assert_eq!(cmd, "reset");
        assert!(args.is_empty());

        assert!(tokenize("   \n").is_none());
    }

    #[test]
    fn tokenize_keeps_a_fourth_argument_for_the_arity_check() {
        let (_, args) = tokenize("loader a.obj, b.obj, c.obj, d.obj").unwrap();
        assert_eq!(args.len(), 4);
    }
}
