//! The line-oriented on-disk form of a tile database.
//!
//! Three kinds of block, separated by blank lines, in any order:
//!
//! ```text
//! .mux <sink>
//! <source> <bitgroup>
//!
//! .config <name> <defval-bits>
//! <bitgroup for word bit 0>
//!
//! .config_enum <name> [<default-option>]
//! <option> <bitgroup>
//! ```
//!
//! where `<bitgroup>` is a space-separated list of `[!]F<frame>B<bit>`
//! tokens, or `-` for the empty group, and character `i` of `<defval-bits>`
//! belongs to word bit `i`. The writer emits sections in the fixed order
//! `.mux`, `.config`, `.config_enum`, blocks key-sorted within a section, so
//! re-saving an unmodified database is byte-identical.

use std::io::{BufRead, Write};
use std::path::Path;
use std::str::FromStr;

use bitvec::vec::BitVec;

use crate::bits::BitGroup;
use crate::error::DbError;
use crate::mux::{ArcData, MuxBits};
use crate::settings::{EnumSettingBits, WordSettingBits};
use crate::tiledb::DbState;

enum Block {
    Mux(MuxBits),
    Word(WordSettingBits),
    Enum(EnumSettingBits),
}

struct Parser<'a> {
    path: &'a Path,
    line: usize,
    state: DbState,
    block: Option<Block>,
}

fn perr(path: &Path, line: usize, reason: String) -> DbError {
    DbError::Parse {
        path: path.to_path_buf(),
        line,
        reason,
    }
}

impl Parser<'_> {
    fn err(&self, reason: impl Into<String>) -> DbError {
        perr(self.path, self.line, reason.into())
    }

    fn directive(&self, line: &str) -> Result<Block, DbError> {
        let tokens: Vec<&str> = line.split_whitespace().collect();
        Ok(match tokens[..] {
            [".mux", sink] => Block::Mux(MuxBits::new(sink)),
            [".config", name] => Block::Word(WordSettingBits {
                name: name.to_string(),
                bits: vec![],
                defval: BitVec::new(),
            }),
            [".config", name, defval] => {
                let mut value = BitVec::with_capacity(defval.len());
                for c in defval.chars() {
                    match c {
                        '0' => value.push(false),
                        '1' => value.push(true),
                        _ => return Err(self.err(format!("invalid default word `{defval}`"))),
                    }
                }
                Block::Word(WordSettingBits {
                    name: name.to_string(),
                    bits: vec![],
                    defval: value,
                })
            }
            [".config_enum", name] => Block::Enum(EnumSettingBits {
                name: name.to_string(),
                options: Default::default(),
                defval: None,
            }),
            [".config_enum", name, defval] => Block::Enum(EnumSettingBits {
                name: name.to_string(),
                options: Default::default(),
                defval: Some(defval.to_string()),
            }),
            _ => return Err(self.err(format!("invalid directive `{line}`"))),
        })
    }

    fn feed(&mut self, line: &str) -> Result<(), DbError> {
        let line = line.trim_end();
        if line.is_empty() {
            return self.flush();
        }
        if line.starts_with('.') {
            self.flush()?;
            self.block = Some(self.directive(line)?);
            return Ok(());
        }
        let (path, lineno) = (self.path, self.line);
        match self.block.as_mut() {
            None => Err(perr(
                path,
                lineno,
                format!("stray line outside of a block: `{line}`"),
            )),
            Some(Block::Mux(mux)) => {
                let (source, bits) = line.split_once(char::is_whitespace).ok_or_else(|| {
                    perr(path, lineno, format!("expected `<source> <bits>`: `{line}`"))
                })?;
                if mux.arcs.iter().any(|arc| arc.source == source) {
                    return Err(perr(
                        path,
                        lineno,
                        format!("duplicate source {source} in mux {}", mux.sink),
                    ));
                }
                let bits = BitGroup::from_str(bits)
                    .map_err(|_| perr(path, lineno, format!("invalid bit group `{bits}`")))?;
                mux.arcs.push(ArcData {
                    source: source.to_string(),
                    sink: mux.sink.clone(),
                    bits,
                });
                Ok(())
            }
            Some(Block::Word(word)) => {
                let group = BitGroup::from_str(line)
                    .map_err(|_| perr(path, lineno, format!("invalid bit group `{line}`")))?;
                word.bits.push(group);
                Ok(())
            }
            Some(Block::Enum(esb)) => {
                let (option, bits) = line.split_once(char::is_whitespace).ok_or_else(|| {
                    perr(path, lineno, format!("expected `<option> <bits>`: `{line}`"))
                })?;
                let group = BitGroup::from_str(bits)
                    .map_err(|_| perr(path, lineno, format!("invalid bit group `{bits}`")))?;
                if esb.options.insert(option.to_string(), group).is_some() {
                    return Err(perr(
                        path,
                        lineno,
                        format!("duplicate option {option} in enum {}", esb.name),
                    ));
                }
                Ok(())
            }
        }
    }

    fn flush(&mut self) -> Result<(), DbError> {
        match self.block.take() {
            None => Ok(()),
            Some(Block::Mux(mux)) => {
                if self.state.muxes.contains_key(&mux.sink) {
                    return Err(self.err(format!("duplicate mux {}", mux.sink)));
                }
                self.state.muxes.insert(mux.sink.clone(), mux);
                Ok(())
            }
            Some(Block::Word(word)) => {
                if word.bits.len() != word.defval.len() {
                    return Err(self.err(format!(
                        "word {} has {} bit groups for a {} bit default",
                        word.name,
                        word.bits.len(),
                        word.defval.len()
                    )));
                }
                if self.state.words.contains_key(&word.name) {
                    return Err(self.err(format!("duplicate word setting {}", word.name)));
                }
                self.state.words.insert(word.name.clone(), word);
                Ok(())
            }
            Some(Block::Enum(esb)) => {
                if let Some(defval) = &esb.defval {
                    if !esb.options.contains_key(defval) {
                        return Err(self.err(format!(
                            "default {defval} of enum {} is not an option",
                            esb.name
                        )));
                    }
                }
                if self.state.enums.contains_key(&esb.name) {
                    return Err(self.err(format!("duplicate enum setting {}", esb.name)));
                }
                self.state.enums.insert(esb.name.clone(), esb);
                Ok(())
            }
        }
    }
}

pub(crate) fn parse_db(path: &Path, reader: impl BufRead) -> Result<DbState, DbError> {
    let mut parser = Parser {
        path,
        line: 0,
        state: DbState::default(),
        block: None,
    };
    for line in reader.lines() {
        parser.line += 1;
        let line = line?;
        parser.feed(&line)?;
    }
    parser.line += 1;
    parser.flush()?;
    Ok(parser.state)
}

pub(crate) fn write_db(state: &DbState, mut out: impl Write) -> std::io::Result<()> {
    for mux in state.muxes.values() {
        write!(out, "{mux}")?;
        writeln!(out)?;
    }
    for word in state.words.values() {
        write!(out, "{word}")?;
        writeln!(out)?;
    }
    for esb in state.enums.values() {
        write!(out, "{esb}")?;
        writeln!(out)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;
    use crate::bits::ConfigBit;

    fn parse(text: &str) -> Result<DbState, DbError> {
        parse_db(Path::new("test.db"), text.as_bytes())
    }

    fn write(state: &DbState) -> String {
        let mut out = vec![];
        write_db(state, &mut out).unwrap();
        String::from_utf8(out).unwrap()
    }

    const SAMPLE: &str = "\
.mux SINK_A
DEFAULT -
SRC_X F0B0
SRC_Y F0B1 !F0B2

.config LUT 0110
F1B0
F1B1
!F2B0
F2B1

.config_enum IO_TYPE LVCMOS
LVCMOS -
LVDS F3B3

";

    #[test]
    fn parse_sample() {
        let state = parse(SAMPLE).unwrap();
        let mux = &state.muxes["SINK_A"];
        assert_eq!(mux.sink, "SINK_A");
        assert_eq!(mux.arcs.len(), 3);
        assert_eq!(mux.arcs[0].source, "DEFAULT");
        assert!(mux.arcs[0].bits.is_empty());
        assert_eq!(mux.arcs[0].sink, "SINK_A");
        assert_eq!(
            mux.arcs[2].bits.bits,
            vec![ConfigBit::new(0, 1, false), ConfigBit::new(0, 2, true)]
        );
        let word = &state.words["LUT"];
        assert_eq!(word.width(), 4);
        assert_eq!(
            word.defval,
            BitVec::<usize, bitvec::order::Lsb0>::from_iter([false, true, true, false])
        );
        assert_eq!(word.bits[2].bits, vec![ConfigBit::new(2, 0, true)]);
        let esb = &state.enums["IO_TYPE"];
        assert_eq!(esb.defval.as_deref(), Some("LVCMOS"));
        assert_eq!(esb.options.len(), 2);
        assert!(esb.options["LVCMOS"].is_empty());
    }

    #[test]
    fn blocks_in_any_order() {
        let scrambled = "\
.config_enum IO_TYPE LVCMOS
LVCMOS -
LVDS F3B3

.config LUT 0110
F1B0
F1B1
!F2B0
F2B1

.mux SINK_A
DEFAULT -
SRC_X F0B0
SRC_Y F0B1 !F0B2
";
        let state = parse(scrambled).unwrap();
        assert_eq!(write(&state), SAMPLE);
    }

    #[test]
    fn rewrite_is_byte_identical() {
        let state = parse(SAMPLE).unwrap();
        let first = write(&state);
        assert_eq!(first, SAMPLE);
        let second = write(&parse(&first).unwrap());
        assert_eq!(first, second);
    }

    #[test]
    fn zero_width_word() {
        let state = parse(".config NOP\n").unwrap();
        let word = &state.words["NOP"];
        assert_eq!(word.width(), 0);
        assert!(word.defval.is_empty());
        assert_eq!(write(&state), ".config NOP\n\n");
    }

    #[test]
    fn enum_without_default() {
        let state = parse(".config_enum MODE\nOFF -\nON F0B0\n").unwrap();
        assert_eq!(state.enums["MODE"].defval, None);
    }

    #[test]
    fn parse_errors_carry_line_numbers() {
        assert_matches!(
            parse(".mux A\nX F0B0\n\n.mux A\nY F1B1\n"),
            Err(DbError::Parse { line: 6, reason, .. }) if reason == "duplicate mux A"
        );
        assert_matches!(
            parse(".frob A\n"),
            Err(DbError::Parse { line: 1, reason, .. }) if reason == "invalid directive `.frob A`"
        );
        assert_matches!(
            parse("SRC F0B0\n"),
            Err(DbError::Parse { line: 1, .. })
        );
        assert_matches!(
            parse(".mux A\nX FZB0\n"),
            Err(DbError::Parse { line: 2, reason, .. }) if reason == "invalid bit group `FZB0`"
        );
        assert_matches!(
            parse(".mux A\nX\n"),
            Err(DbError::Parse { line: 2, .. })
        );
        assert_matches!(
            parse(".mux A\nX F0B0\nX F1B1\n"),
            Err(DbError::Parse { line: 3, reason, .. }) if reason == "duplicate source X in mux A"
        );
        assert_matches!(
            parse(".config W 01\nF0B0\n"),
            Err(DbError::Parse { line: 3, reason, .. })
                if reason == "word W has 1 bit groups for a 2 bit default"
        );
        assert_matches!(
            parse(".config W 0x\nF0B0\n"),
            Err(DbError::Parse { line: 1, reason, .. }) if reason == "invalid default word `0x`"
        );
        assert_matches!(
            parse(".config_enum E MISSING\nPRESENT F0B0\n"),
            Err(DbError::Parse { line: 3, reason, .. })
                if reason == "default MISSING of enum E is not an option"
        );
        assert_matches!(
            parse(".config_enum E\nOPT F0B0\nOPT F1B1\n"),
            Err(DbError::Parse { line: 3, reason, .. })
                if reason == "duplicate option OPT in enum E"
        );
    }
}
