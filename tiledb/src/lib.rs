//! Mutable per-tile bit databases for a programmable fabric.
//!
//! A [`tiledb::TileBitDatabase`] describes what every configuration bit in
//! one tile type does: which routing mux arcs, multi-bit words and
//! enumerated settings it encodes. The database translates between decomposed
//! tile configurations and raw tile CRAM in both directions, can be mutated
//! in place while decodes run on other threads (for use during fuzzing), and
//! persists losslessly to a line-oriented text file.

pub mod bits;
pub mod config;
pub mod cram;
pub mod error;
pub mod mux;
pub mod registry;
pub mod settings;
mod textdb;
pub mod tiledb;
