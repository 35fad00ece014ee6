#[macro_use]
extern crate clap;

mod logger;
mod shell;

use clap::Arg;
use sicvm::opcode::{OpcodeLoadError, OpcodeTable};

fn main() {
    let matches = app_from_crate!()
        .arg(
            Arg::with_name("opcodes")
                .short("o")
                .long("opcodes")
                .takes_value(true)
                .value_name("FILE")
                .default_value("opcode.txt")
                .help("Sets the opcode table file to use"),
        )
        .get_matches();

    let path = matches.value_of("opcodes").unwrap();
    let opcodes = match OpcodeTable::from_file(path) {
        Ok(table) => table,
        Err(OpcodeLoadError::Io(_)) => {
            // The shell stays usable for memory commands even without a
            // dictionary; assembly and simulation will report lookups.
            println!("opcode: cannot find '{}' file.", path);
            OpcodeTable::empty()
        }
        Err(err) => {
            println!("opcode: '{}' file: {}", path, err);
            OpcodeTable::empty()
        }
    };

    shell::Shell::new(opcodes).run();
}
