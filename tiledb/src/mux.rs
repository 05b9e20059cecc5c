use std::fmt;

use serde::{Deserialize, Serialize};

use crate::bits::{BitGroup, BitSet};
use crate::cram::CramView;
use crate::error::DbError;

/// One configurable source→sink connection of a mux. `sink` duplicates the
/// owning mux's sink and is kept for round-trip fidelity.
#[derive(Debug, Clone, Eq, PartialEq, Serialize, Deserialize)]
pub struct ArcData {
    pub source: String,
    pub sink: String,
    pub bits: BitGroup,
}

/// All candidate source arcs driving one sink node.
#[derive(Debug, Clone, Eq, PartialEq, Serialize, Deserialize)]
pub struct MuxBits {
    pub sink: String,
    pub arcs: Vec<ArcData>,
}

impl MuxBits {
    pub fn new(sink: impl Into<String>) -> Self {
        Self {
            sink: sink.into(),
            arcs: vec![],
        }
    }

    pub fn add_arc(&mut self, source: impl Into<String>, bits: BitGroup) {
        self.arcs.push(ArcData {
            source: source.into(),
            sink: self.sink.clone(),
            bits,
        });
    }

    pub(crate) fn matched_arc(
        &self,
        tile: &impl CramView,
        mut coverage: Option<&mut BitSet>,
    ) -> Result<Option<&ArcData>, DbError> {
        let mut matched: Vec<&ArcData> = vec![];
        for arc in &self.arcs {
            if let Some(known_bits) = coverage.as_deref_mut() {
                arc.bits.add_coverage(known_bits);
            }
            if arc.bits.matches(tile) {
                matched.push(arc);
            }
        }
        let explicit: Vec<&ArcData> = matched
            .iter()
            .copied()
            .filter(|arc| !arc.bits.is_empty())
            .collect();
        match explicit[..] {
            // an empty-group arc always matches; it is the implicit default
            // and must never shadow an explicit match
            [] => Ok(matched.into_iter().find(|arc| arc.bits.is_empty())),
            [arc] => Ok(Some(arc)),
            _ => Err(DbError::AmbiguousMuxDriver {
                sink: self.sink.clone(),
                sources: explicit.iter().map(|arc| arc.source.clone()).collect(),
            }),
        }
    }

    /// Work out which connection, if any, is made inside a tile. Coverage
    /// accumulates the bits of every arc examined, not just the winner.
    pub fn get_driver(
        &self,
        tile: &impl CramView,
        coverage: Option<&mut BitSet>,
    ) -> Result<Option<&str>, DbError> {
        Ok(self
            .matched_arc(tile, coverage)?
            .map(|arc| arc.source.as_str()))
    }

    /// Set the driver of the sink. Every arc is cleared first so no stale
    /// bits of a previously set driver remain.
    pub fn set_driver(&self, tile: &mut impl CramView, driver: &str) -> Result<(), DbError> {
        let chosen = self
            .arcs
            .iter()
            .find(|arc| arc.source == driver)
            .ok_or_else(|| DbError::UnknownMuxSource {
                sink: self.sink.clone(),
                source: driver.to_string(),
            })?;
        for arc in &self.arcs {
            arc.bits.clear_group(tile);
        }
        chosen.bits.set_group(tile);
        Ok(())
    }
}

impl fmt::Display for MuxBits {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, ".mux {}", self.sink)?;
        for arc in &self.arcs {
            writeln!(f, "{} {}", arc.source, arc.bits)?;
        }
        Ok(())
    }
}
