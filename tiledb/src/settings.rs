use std::collections::BTreeMap;
use std::fmt;

use bitvec::slice::BitSlice;
use bitvec::vec::BitVec;
use serde::{Deserialize, Serialize};

use crate::bits::{BitGroup, BitSet};
use crate::cram::CramView;
use crate::error::DbError;

/// An ordered multi-bit setting such as a LUT initialisation word. Word bit
/// `i` is encoded by `bits[i]`; `defval` is the word read back from an
/// untouched tile.
#[derive(Debug, Clone, Eq, PartialEq, Serialize, Deserialize)]
pub struct WordSettingBits {
    pub name: String,
    pub bits: Vec<BitGroup>,
    pub defval: BitVec,
}

impl WordSettingBits {
    pub fn width(&self) -> usize {
        self.bits.len()
    }

    /// Decode the word, returning `None` iff it equals the default.
    /// Coverage receives every member group regardless of the outcome.
    pub fn get_value(
        &self,
        tile: &impl CramView,
        mut coverage: Option<&mut BitSet>,
    ) -> Option<BitVec> {
        let mut value = BitVec::with_capacity(self.bits.len());
        for group in &self.bits {
            if let Some(known_bits) = coverage.as_deref_mut() {
                group.add_coverage(known_bits);
            }
            value.push(group.matches(tile));
        }
        if value == self.defval { None } else { Some(value) }
    }

    /// Write the word into the tile, bit-parallel.
    pub fn set_value(&self, tile: &mut impl CramView, value: &BitSlice) -> Result<(), DbError> {
        if value.len() != self.bits.len() {
            return Err(DbError::WordSizeMismatch {
                name: self.name.clone(),
                expected: self.bits.len(),
                got: value.len(),
            });
        }
        for (group, bit) in self.bits.iter().zip(value.iter().by_vals()) {
            if bit {
                group.set_group(tile);
            } else {
                group.clear_group(tile);
            }
        }
        Ok(())
    }
}

impl fmt::Display for WordSettingBits {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, ".config {}", self.name)?;
        if !self.defval.is_empty() {
            write!(f, " ")?;
            for bit in self.defval.iter().by_vals() {
                write!(f, "{}", if bit { '1' } else { '0' })?;
            }
        }
        writeln!(f)?;
        for group in &self.bits {
            writeln!(f, "{group}")?;
        }
        Ok(())
    }
}

/// A named categorical setting such as an IO type: one bit group per option,
/// at most one of which may be set. An option with an empty group is the
/// implicit default; `defval`, if given, names the option reported as unset.
#[derive(Debug, Clone, Eq, PartialEq, Serialize, Deserialize)]
pub struct EnumSettingBits {
    pub name: String,
    pub options: BTreeMap<String, BitGroup>,
    pub defval: Option<String>,
}

impl EnumSettingBits {
    /// Decode the option set in the tile, `None` meaning unset or equal to
    /// the default. Coverage receives every option's bits.
    pub fn get_value(
        &self,
        tile: &impl CramView,
        mut coverage: Option<&mut BitSet>,
    ) -> Result<Option<&str>, DbError> {
        let mut matched: Vec<(&str, &BitGroup)> = vec![];
        for (option, group) in &self.options {
            if let Some(known_bits) = coverage.as_deref_mut() {
                group.add_coverage(known_bits);
            }
            if group.matches(tile) {
                matched.push((option.as_str(), group));
            }
        }
        let explicit: Vec<&str> = matched
            .iter()
            .filter(|(_, group)| !group.is_empty())
            .map(|(option, _)| *option)
            .collect();
        let value = match explicit[..] {
            [] => matched
                .iter()
                .find(|(_, group)| group.is_empty())
                .map(|(option, _)| *option),
            [option] => Some(option),
            _ => {
                return Err(DbError::AmbiguousEnumValue {
                    name: self.name.clone(),
                    options: explicit.iter().map(|option| option.to_string()).collect(),
                });
            }
        };
        Ok(value.filter(|&value| self.defval.as_deref() != Some(value)))
    }

    /// Set the enum to the named option, clearing every other option first.
    pub fn set_value(&self, tile: &mut impl CramView, value: &str) -> Result<(), DbError> {
        let chosen = self
            .options
            .get(value)
            .ok_or_else(|| DbError::UnknownEnumOption {
                name: self.name.clone(),
                option: value.to_string(),
            })?;
        for group in self.options.values() {
            group.clear_group(tile);
        }
        chosen.set_group(tile);
        Ok(())
    }
}

impl fmt::Display for EnumSettingBits {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, ".config_enum {}", self.name)?;
        if let Some(defval) = &self.defval {
            write!(f, " {defval}")?;
        }
        writeln!(f)?;
        for (option, group) in &self.options {
            writeln!(f, "{option} {group}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;
    use bitvec::vec::BitVec;

    use super::*;
    use crate::bits::ConfigBit;
    use crate::cram::TileCram;

    fn word(vals: [bool; 4]) -> BitVec {
        BitVec::from_iter(vals)
    }

    fn lut() -> WordSettingBits {
        WordSettingBits {
            name: "LUT".to_string(),
            bits: vec![
                BitGroup::from_bits([ConfigBit::new(0, 0, false)]),
                BitGroup::from_bits([ConfigBit::new(0, 1, false)]),
                BitGroup::from_bits([ConfigBit::new(1, 0, true)]),
                BitGroup::from_bits([ConfigBit::new(1, 1, false)]),
            ],
            defval: BitVec::repeat(false, 4),
        }
    }

    #[test]
    fn word_round_trip() {
        let ws = lut();
        let mut cram = TileCram::new(2, 2);
        ws.set_value(&mut cram, &word([true, false, true, false]))
            .unwrap();
        // the third group is inverted, so "true" leaves a raw 0
        assert!(cram.read(0, 0));
        assert!(!cram.read(0, 1));
        assert!(!cram.read(1, 0));
        assert!(!cram.read(1, 1));
        assert_eq!(
            ws.get_value(&cram, None),
            Some(word([true, false, true, false]))
        );
        ws.set_value(&mut cram, &word([false; 4])).unwrap();
        assert_eq!(ws.get_value(&cram, None), None);
    }

    #[test]
    fn word_size_mismatch() {
        let ws = lut();
        let mut cram = TileCram::new(2, 2);
        assert_matches!(
            ws.set_value(&mut cram, &BitVec::repeat(true, 3)),
            Err(DbError::WordSizeMismatch { name, expected: 4, got: 3 }) if name == "LUT"
        );
        assert_eq!(cram, TileCram::new(2, 2));
    }

    #[test]
    fn zero_width_word_is_always_default() {
        let ws = WordSettingBits {
            name: "NOP".to_string(),
            bits: vec![],
            defval: BitVec::new(),
        };
        let mut cram = TileCram::new(1, 1);
        ws.set_value(&mut cram, &BitVec::new()).unwrap();
        assert_eq!(ws.get_value(&cram, None), None);
    }

    #[test]
    fn word_coverage_ignores_outcome() {
        let ws = lut();
        let cram = TileCram::new(2, 2);
        let mut known = BitSet::new();
        assert_eq!(ws.get_value(&cram, Some(&mut known)), None);
        assert_eq!(known.len(), 4);
    }

    fn mode() -> EnumSettingBits {
        EnumSettingBits {
            name: "MODE".to_string(),
            options: BTreeMap::from([
                ("OFF".to_string(), BitGroup::new()),
                (
                    "ON".to_string(),
                    BitGroup::from_bits([ConfigBit::new(2, 3, false)]),
                ),
            ]),
            defval: Some("OFF".to_string()),
        }
    }

    #[test]
    fn enum_default_suppression() {
        let esb = mode();
        let mut cram = TileCram::new(4, 4);
        assert_eq!(esb.get_value(&cram, None).unwrap(), None);
        esb.set_value(&mut cram, "ON").unwrap();
        assert!(cram.read(2, 3));
        assert_eq!(esb.get_value(&cram, None).unwrap(), Some("ON"));
        esb.set_value(&mut cram, "OFF").unwrap();
        assert!(!cram.read(2, 3));
        assert_eq!(esb.get_value(&cram, None).unwrap(), None);
    }

    #[test]
    fn enum_without_default_reports_empty_option() {
        let mut esb = mode();
        esb.defval = None;
        let cram = TileCram::new(4, 4);
        assert_eq!(esb.get_value(&cram, None).unwrap(), Some("OFF"));
    }

    #[test]
    fn enum_inverted_bits() {
        let esb = EnumSettingBits {
            name: "SENSE".to_string(),
            options: BTreeMap::from([
                (
                    "NEG".to_string(),
                    BitGroup::from_bits([ConfigBit::new(0, 0, true)]),
                ),
                (
                    "POS".to_string(),
                    BitGroup::from_bits([ConfigBit::new(0, 0, false)]),
                ),
            ]),
            defval: None,
        };
        let mut cram = TileCram::new(1, 1);
        // inverted option matches the raw 0
        assert_eq!(esb.get_value(&cram, None).unwrap(), Some("NEG"));
        cram.write(0, 0, true);
        assert_eq!(esb.get_value(&cram, None).unwrap(), Some("POS"));
    }

    #[test]
    fn enum_ambiguity_fails() {
        let mut esb = mode();
        esb.options.insert(
            "ON2".to_string(),
            BitGroup::from_bits([ConfigBit::new(2, 3, false)]),
        );
        let mut cram = TileCram::new(4, 4);
        cram.write(2, 3, true);
        assert_matches!(
            esb.get_value(&cram, None),
            Err(DbError::AmbiguousEnumValue { name, options })
                if name == "MODE" && options == ["ON", "ON2"]
        );
    }

    #[test]
    fn enum_unknown_option() {
        let esb = mode();
        let mut cram = TileCram::new(4, 4);
        assert_matches!(
            esb.set_value(&mut cram, "HALF"),
            Err(DbError::UnknownEnumOption { name, option })
                if name == "MODE" && option == "HALF"
        );
    }

    #[test]
    fn enum_coverage_spans_all_options() {
        let esb = mode();
        let cram = TileCram::new(4, 4);
        let mut known = BitSet::new();
        esb.get_value(&cram, Some(&mut known)).unwrap();
        assert_eq!(known.len(), 1);
        assert!(known.contains(&ConfigBit::new(2, 3, false)));
    }

    #[test]
    fn display_blocks() {
        assert_eq!(lut().to_string(), ".config LUT 0000\nF0B0\nF0B1\n!F1B0\nF1B1\n");
        assert_eq!(
            mode().to_string(),
            ".config_enum MODE OFF\nOFF -\nON F2B3\n"
        );
    }
}
