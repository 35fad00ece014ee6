use matches::debug_assert_matches;
use pest::iterators::Pair;
use pest::Parser;
use pest_derive::Parser;

#[derive(Parser)]
#[grammar = "sicasm.pest"]
pub struct AsmParser;

/// A source line reduced to its raw fields. Commas and whitespace both
/// separate fields, so deciding which field is the label happens later,
/// against the opcode dictionary.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum RawLine {
    Blank,
    Comment,
    Fields(Vec<String>),
}

pub fn tokenize(text: &str) -> RawLine {
    let mut pairs = match AsmParser::parse(Rule::line, text) {
        Ok(pairs) => pairs,
        // `field` accepts any non-separator character, so the grammar only
        // rejects pathological input; treat it as a single opaque field so
        // the caller reports it as an unknown mnemonic.
        Err(_) => return RawLine::Fields(vec![text.trim().to_owned()]),
    };

    let line = pairs.next().unwrap();
    debug_assert_matches!(line.as_rule(), Rule::line);

    for inner in line.into_inner() {
        match inner.as_rule() {
            Rule::comment => return RawLine::Comment,
            Rule::fields => {
                let fields = inner
                    .into_inner()
                    .map(|p| p.as_str().to_owned())
                    .collect();
                return RawLine::Fields(fields);
            }
            Rule::EOI => {}
            _ => unreachable!(),
        }
    }
    RawLine::Blank
}

/// Addressing prefix of a memory-reference operand.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum AddrMode {
    Simple,
    Immediate,
    Indirect,
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Target {
    Number(u32),
    Symbol(String),
}

/// One parsed operand field.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Operand {
    /// `C'...'`, upper-case letters and digits only.
    Char(String),
    /// `X'...'`, raw hex digits.
    Hex(String),
    Addr { mode: AddrMode, target: Target },
}

pub fn parse_operand(text: &str) -> Option<Operand> {
    let mut pairs = AsmParser::parse(Rule::operand, text).ok()?;
    let operand = pairs.next()?;
    debug_assert_matches!(operand.as_rule(), Rule::operand);

    let inner = operand.into_inner().next()?;
    match inner.as_rule() {
        Rule::char_literal => Some(Operand::Char(first_str(inner)?)),
        Rule::hex_literal => Some(Operand::Hex(first_str(inner)?)),
        Rule::addr_spec => {
            let mut mode = AddrMode::Simple;
            let mut target = None;
            for part in inner.into_inner() {
                match part.as_rule() {
                    Rule::mode_prefix => {
                        mode = match part.as_str() {
                            "#" => AddrMode::Immediate,
                            _ => AddrMode::Indirect,
                        };
                    }
                    Rule::number => {
                        target = Some(Target::Number(part.as_str().parse().ok()?));
                    }
                    Rule::identifier => {
                        target = Some(Target::Symbol(part.as_str().to_owned()));
                    }
                    _ => unreachable!(),
                }
            }
            Some(Operand::Addr {
                mode,
                target: target?,
            })
        }
        _ => None,
    }
}

fn first_str(pair: Pair<Rule>) -> Option<String> {
    pair.into_inner().next().map(|p| p.as_str().to_owned())
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn blank_and_comment_lines() {
        assert_eq!(tokenize(""), RawLine::Blank);
        assert_eq!(tokenize("   \t "), RawLine::Blank);
        assert_eq!(tokenize(". a comment"), RawLine::Comment);
        assert_eq!(tokenize(".SUBROUTINE TO READ RECORD"), RawLine::Comment);
    }

    #[test]
    fn fields_split_on_whitespace_and_commas() {
        assert_eq!(
            tokenize("CLOOP   JSUB   RDREC"),
            RawLine::Fields(vec![
                "CLOOP".to_owned(),
                "JSUB".to_owned(),
                "RDREC".to_owned()
            ])
        );
        assert_eq!(
            tokenize("        LDCH   BUFFER,X"),
            RawLine::Fields(vec![
                "LDCH".to_owned(),
                "BUFFER".to_owned(),
                "X".to_owned()
            ])
        );
        assert_eq!(
            tokenize("\tCOMPR\tA, S"),
            RawLine::Fields(vec!["COMPR".to_owned(), "A".to_owned(), "S".to_owned()])
        );
    }

    #[test]
    fn byte_literal_stays_one_field() {
        assert_eq!(
            tokenize("EOF     BYTE   C'EOF'"),
            RawLine::Fields(vec![
                "EOF".to_owned(),
                "BYTE".to_owned(),
                "C'EOF'".to_owned()
            ])
        );
    }

    #[test]
    fn operand_literals() {
        assert_eq!(
            parse_operand("C'EOF'"),
            Some(Operand::Char("EOF".to_owned()))
        );
        assert_eq!(parse_operand("X'F1'"), Some(Operand::Hex("F1".to_owned())));
        assert_eq!(parse_operand("C''"), None);
        assert_eq!(parse_operand("C'eof'"), None);
        assert_eq!(parse_operand("X'G1'"), None);
    }

    #[test]
    fn operand_addressing_prefixes() {
        assert_eq!(
            parse_operand("#LENGTH"),
            Some(Operand::Addr {
                mode: AddrMode::Immediate,
                target: Target::Symbol("LENGTH".to_owned()),
            })
        );
        assert_eq!(
            parse_operand("@RETADR"),
            Some(Operand::Addr {
                mode: AddrMode::Indirect,
                target: Target::Symbol("RETADR".to_owned()),
            })
        );
        assert_eq!(
            parse_operand("#4096"),
            Some(Operand::Addr {
                mode: AddrMode::Immediate,
                target: Target::Number(4096),
            })
        );
        assert_eq!(
            parse_operand("BUFFER"),
            Some(Operand::Addr {
                mode: AddrMode::Simple,
                target: Target::Symbol("BUFFER".to_owned()),
            })
        );
    }

    #[test]
    fn operand_rejects_lower_case_symbols() {
        assert_eq!(parse_operand("buffer"), None);
        assert_eq!(parse_operand(""), None);
    }
}
