/// One symbol exported by a control section, with its absolute address
/// after relocation.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ExternalSymbol {
    pub name: String,
    pub address: u32,
}

/// A loaded control section: where it landed and what it defines.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ControlSection {
    pub name: String,
    pub address: u32,
    pub length: u32,
    pub symbols: Vec<ExternalSymbol>,
}

/// The external-symbol table built during loader pass 1. Section names and
/// defined symbols share one global namespace; addresses are fixed once
/// computed.
#[derive(Clone, Debug, Default)]
pub struct ExternalSymbolTable {
    sections: Vec<ControlSection>,
}

impl ExternalSymbolTable {
    pub fn new() -> ExternalSymbolTable {
        ExternalSymbolTable::default()
    }

    pub fn reset(&mut self) {
        self.sections.clear();
    }

    pub fn sections(&self) -> &[ControlSection] {
        &self.sections
    }

    pub fn contains(&self, name: &str) -> bool {
        self.address_of(name).is_some()
    }

    /// Records a new control section. Fails when the name collides with an
    /// existing section or symbol.
    pub fn add_section(&mut self, name: &str, address: u32, length: u32) -> Result<(), String> {
        if self.contains(name) {
            return Err(name.to_owned());
        }
        self.sections.push(ControlSection {
            name: name.to_owned(),
            address,
            length,
            symbols: Vec::new(),
        });
        Ok(())
    }

    /// Records a symbol defined by `section` at an absolute address.
    pub fn add_symbol(&mut self, section: &str, name: &str, address: u32) -> Result<(), String> {
        if self.contains(name) {
            return Err(name.to_owned());
        }
        let section = self
            .sections
            .iter_mut()
            .find(|s| s.name == section)
            .expect("symbols are added to the section being loaded");
        section.symbols.push(ExternalSymbol {
            name: name.to_owned(),
            address,
        });
        Ok(())
    }

    /// Absolute address of a control section or a defined symbol.
    pub fn address_of(&self, name: &str) -> Option<u32> {
        for section in &self.sections {
            if section.name == name {
                return Some(section.address);
            }
            for symbol in &section.symbols {
                if symbol.name == name {
                    return Some(symbol.address);
                }
            }
        }
        None
    }

    pub fn total_length(&self) -> u32 {
        self.sections.iter().map(|s| s.length).sum()
    }

    /// The tab-delimited table printed after a successful load.
    pub fn display(&self) -> String {
        let mut out = String::from(
            "Control\tSymbol\tAddress\tLength\nsection\tname\n--------------------------------\n",
        );
        for section in &self.sections {
            out.push_str(&format!(
                "{}\t\t{:04X}\t{:04X}\n",
                section.name, section.address, section.length
            ));
            for symbol in &section.symbols {
                out.push_str(&format!("\t{}\t{:04X}\n", symbol.name, symbol.address));
            }
        }
        out.push_str(&format!(
            "--------------------------------\n\t\tTotal length {:04X}\n",
            self.total_length()
        ));
        out
    }
}
