use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;

use itertools::Itertools;
use serde::{Deserialize, Serialize};

use crate::cram::CramView;
use crate::error::DbError;

/// A single configuration bit inside a tile, addressed by frame and bit
/// offset. `inv` marks an active-low bit: the setting is encoded by the bit
/// reading as 0.
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Serialize, Deserialize)]
pub struct ConfigBit {
    pub frame: usize,
    pub bit: usize,
    pub inv: bool,
}

impl ConfigBit {
    pub fn new(frame: usize, bit: usize, inv: bool) -> Self {
        Self { frame, bit, inv }
    }
}

impl fmt::Display for ConfigBit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}F{}B{}",
            if self.inv { "!" } else { "" },
            self.frame,
            self.bit
        )
    }
}

impl fmt::Debug for ConfigBit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{self}")
    }
}

impl FromStr for ConfigBit {
    type Err = DbError;

    fn from_str(s: &str) -> Result<Self, DbError> {
        let bad = || DbError::BadBit(s.to_string());
        let (inv, rest) = match s.strip_prefix('!') {
            Some(rest) => (true, rest),
            None => (false, s),
        };
        let rest = rest.strip_prefix('F').ok_or_else(bad)?;
        let (frame, bit) = rest.split_once('B').ok_or_else(bad)?;
        Ok(ConfigBit {
            frame: frame.parse().map_err(|_| bad())?,
            bit: bit.parse().map_err(|_| bad())?,
            inv,
        })
    }
}

/// Coverage accumulator: the set of bits consulted by decode calls. Decodes
/// only ever add to it.
pub type BitSet = HashSet<ConfigBit>;

/// An ordered list of configuration bits that together encode one setting.
///
/// The empty group is a valid distinguished value meaning "no bits
/// required": it matches any CRAM state and set/clear are no-ops. Default
/// mux drivers and default enum options are encoded this way.
#[derive(Debug, Clone, Eq, PartialEq, Default, Serialize, Deserialize)]
pub struct BitGroup {
    pub bits: Vec<ConfigBit>,
}

impl BitGroup {
    pub fn new() -> Self {
        Self { bits: vec![] }
    }

    pub fn from_bits(bits: impl IntoIterator<Item = ConfigBit>) -> Self {
        Self {
            bits: bits.into_iter().collect(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.bits.is_empty()
    }

    /// True iff every member bit reads as its active polarity.
    pub fn matches(&self, tile: &impl CramView) -> bool {
        self.bits
            .iter()
            .all(|cb| tile.read(cb.frame, cb.bit) != cb.inv)
    }

    /// Write every member bit to the polarity that makes `matches` true.
    pub fn set_group(&self, tile: &mut impl CramView) {
        for cb in &self.bits {
            tile.write(cb.frame, cb.bit, !cb.inv);
        }
    }

    /// Write every member bit to the opposite polarity.
    pub fn clear_group(&self, tile: &mut impl CramView) {
        for cb in &self.bits {
            tile.write(cb.frame, cb.bit, cb.inv);
        }
    }

    pub fn add_coverage(&self, known_bits: &mut BitSet) {
        known_bits.extend(self.bits.iter().copied());
    }
}

impl fmt::Display for BitGroup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.bits.is_empty() {
            write!(f, "-")
        } else {
            write!(f, "{}", self.bits.iter().join(" "))
        }
    }
}

impl FromStr for BitGroup {
    type Err = DbError;

    fn from_str(s: &str) -> Result<Self, DbError> {
        if s.trim() == "-" {
            return Ok(BitGroup::new());
        }
        let bits = s
            .split_whitespace()
            .map(ConfigBit::from_str)
            .collect::<Result<_, _>>()?;
        Ok(BitGroup { bits })
    }
}
