/// The command history. Executed commands are reconstructed as
/// `cmd arg1, arg2` and kept for the lifetime of the process; failed
/// commands are never recorded.
#[derive(Default)]
pub struct History {
    entries: Vec<String>,
}

impl History {
    pub fn new() -> History {
        History::default()
    }

    pub fn record(&mut self, cmd: &str, args: &[String]) {
        let mut entry = cmd.to_owned();
        for (index, arg) in args.iter().enumerate() {
            if index == 0 {
                entry.push(' ');
            } else {
                entry.push_str(", ");
            }
            entry.push_str(arg);
        }
        self.entries.push(entry);
    }

    pub fn display(&self) -> String {
        let mut out = String::new();
        for (index, entry) in self.entries.iter().enumerate() {
            out.push_str(&format!("{}\t{}\n", index + 1, entry));
        }
        out
    }
}
