use bitvec::vec::BitVec;
use serde::{Deserialize, Serialize};

/// One mux driver choice within a tile configuration.
#[derive(Debug, Clone, Eq, PartialEq, Serialize, Deserialize)]
pub struct ConfigArc {
    pub sink: String,
    pub source: String,
}

/// One multi-bit word value within a tile configuration.
#[derive(Debug, Clone, Eq, PartialEq, Serialize, Deserialize)]
pub struct ConfigWord {
    pub name: String,
    pub value: BitVec,
}

/// One enumerated option choice within a tile configuration.
#[derive(Debug, Clone, Eq, PartialEq, Serialize, Deserialize)]
pub struct ConfigEnum {
    pub name: String,
    pub value: String,
}

/// A decomposed tile configuration: the named mux drivers, word values and
/// enum values that differ from their defaults. This is the interface shape
/// the database translates from and to; it owns no bit knowledge itself.
#[derive(Debug, Clone, Eq, PartialEq, Default, Serialize, Deserialize)]
pub struct TileConfig {
    pub arcs: Vec<ConfigArc>,
    pub words: Vec<ConfigWord>,
    pub enums: Vec<ConfigEnum>,
}

impl TileConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_arc(&mut self, sink: impl Into<String>, source: impl Into<String>) {
        self.arcs.push(ConfigArc {
            sink: sink.into(),
            source: source.into(),
        });
    }

    pub fn add_word(&mut self, name: impl Into<String>, value: BitVec) {
        self.words.push(ConfigWord {
            name: name.into(),
            value,
        });
    }

    pub fn add_enum(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.enums.push(ConfigEnum {
            name: name.into(),
            value: value.into(),
        });
    }
}
