use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::RwLock;
use std::sync::atomic::{AtomicBool, Ordering};

use log::debug;
use serde_json::json;

use crate::config::TileConfig;
use crate::cram::CramView;
use crate::error::DbError;
use crate::mux::MuxBits;
use crate::settings::{EnumSettingBits, WordSettingBits};
use crate::textdb;

#[derive(Debug, Default)]
pub(crate) struct DbState {
    pub(crate) muxes: BTreeMap<String, MuxBits>,
    pub(crate) words: BTreeMap<String, WordSettingBits>,
    pub(crate) enums: BTreeMap<String, EnumSettingBits>,
}

/// The bit database of one tile type: what every configuration bit does.
///
/// Unlike the static chip databases this one is mutable at runtime, for use
/// during fuzzing: one readers/writer lock guards the three maps, so decodes
/// may run from many threads while another discovers new settings. The CRAM
/// views handed to the translation calls are owned and synchronized by the
/// caller.
#[derive(Debug)]
pub struct TileBitDatabase {
    path: PathBuf,
    dirty: AtomicBool,
    state: RwLock<DbState>,
}

impl TileBitDatabase {
    /// Load a tile database from its text file.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, DbError> {
        let path = path.as_ref();
        let f = File::open(path)?;
        let state = textdb::parse_db(path, BufReader::new(f))?;
        debug!(
            "loaded tile database {} ({} muxes, {} words, {} enums)",
            path.display(),
            state.muxes.len(),
            state.words.len(),
            state.enums.len(),
        );
        Ok(Self {
            path: path.to_path_buf(),
            dirty: AtomicBool::new(false),
            state: RwLock::new(state),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Apply every entry of `cfg` to the tile CRAM. Unknown names are fatal;
    /// a failed call may leave the CRAM partially updated.
    pub fn config_to_tile_cram(
        &self,
        cfg: &TileConfig,
        tile: &mut impl CramView,
    ) -> Result<(), DbError> {
        let state = self.state.read().unwrap();
        for arc in &cfg.arcs {
            let mux = state
                .muxes
                .get(&arc.sink)
                .ok_or_else(|| DbError::UnknownMux(arc.sink.clone()))?;
            mux.set_driver(tile, &arc.source)?;
        }
        for word in &cfg.words {
            let wsb = state
                .words
                .get(&word.name)
                .ok_or_else(|| DbError::UnknownWord(word.name.clone()))?;
            wsb.set_value(tile, &word.value)?;
        }
        for cenum in &cfg.enums {
            let esb = state
                .enums
                .get(&cenum.name)
                .ok_or_else(|| DbError::UnknownEnum(cenum.name.clone()))?;
            esb.set_value(tile, &cenum.value)?;
        }
        Ok(())
    }

    /// Decode the tile CRAM back into a configuration. Entries sitting at
    /// their default (including muxes resolved to an empty default arc) are
    /// omitted; the rest come out in key-sorted order, so output is stable
    /// for diffing.
    pub fn tile_cram_to_config(&self, tile: &impl CramView) -> Result<TileConfig, DbError> {
        let state = self.state.read().unwrap();
        let mut cfg = TileConfig::new();
        for (sink, mux) in &state.muxes {
            if let Some(arc) = mux.matched_arc(tile, None)? {
                if !arc.bits.is_empty() {
                    cfg.add_arc(sink.clone(), arc.source.clone());
                }
            }
        }
        for (name, wsb) in &state.words {
            if let Some(value) = wsb.get_value(tile, None) {
                cfg.add_word(name.clone(), value);
            }
        }
        for (name, esb) in &state.enums {
            if let Some(value) = esb.get_value(tile, None)? {
                cfg.add_enum(name.clone(), value);
            }
        }
        Ok(cfg)
    }

    pub fn get_sinks(&self) -> Vec<String> {
        self.state.read().unwrap().muxes.keys().cloned().collect()
    }

    pub fn get_mux_data_for_sink(&self, sink: &str) -> Result<MuxBits, DbError> {
        self.state
            .read()
            .unwrap()
            .muxes
            .get(sink)
            .cloned()
            .ok_or_else(|| DbError::UnknownMux(sink.to_string()))
    }

    pub fn get_settings_words(&self) -> Vec<String> {
        self.state.read().unwrap().words.keys().cloned().collect()
    }

    pub fn get_data_for_setword(&self, name: &str) -> Result<WordSettingBits, DbError> {
        self.state
            .read()
            .unwrap()
            .words
            .get(name)
            .cloned()
            .ok_or_else(|| DbError::UnknownWord(name.to_string()))
    }

    pub fn get_settings_enums(&self) -> Vec<String> {
        self.state.read().unwrap().enums.keys().cloned().collect()
    }

    pub fn get_data_for_enum(&self, name: &str) -> Result<EnumSettingBits, DbError> {
        self.state
            .read()
            .unwrap()
            .enums
            .get(name)
            .cloned()
            .ok_or_else(|| DbError::UnknownEnum(name.to_string()))
    }

    /// Insert a mux, replacing any existing entry for the same sink.
    pub fn add_mux(&self, mux: MuxBits) {
        assert!(mux.arcs.iter().all(|arc| arc.sink == mux.sink));
        let mut state = self.state.write().unwrap();
        state.muxes.insert(mux.sink.clone(), mux);
        self.dirty.store(true, Ordering::Release);
    }

    /// Insert a word setting, replacing any existing entry of the same name.
    pub fn add_setting_word(&self, word: WordSettingBits) {
        assert_eq!(word.bits.len(), word.defval.len());
        let mut state = self.state.write().unwrap();
        state.words.insert(word.name.clone(), word);
        self.dirty.store(true, Ordering::Release);
    }

    /// Insert an enum setting, replacing any existing entry of the same name.
    pub fn add_setting_enum(&self, esb: EnumSettingBits) {
        if let Some(defval) = &esb.defval {
            assert!(esb.options.contains_key(defval));
        }
        let mut state = self.state.write().unwrap();
        state.enums.insert(esb.name.clone(), esb);
        self.dirty.store(true, Ordering::Release);
    }

    /// Write the database back to its file, via a sibling temporary file
    /// renamed over the target. Clean databases are left untouched.
    pub fn save(&self) -> Result<(), DbError> {
        if !self.dirty.load(Ordering::Acquire) {
            return Ok(());
        }
        let state = self.state.write().unwrap();
        let dir = self.path.parent().unwrap_or(Path::new("."));
        let mut tmp = tempfile::NamedTempFile::new_in(dir)?;
        {
            let mut out = BufWriter::new(tmp.as_file_mut());
            textdb::write_db(&state, &mut out)?;
            out.flush()?;
        }
        tmp.persist(&self.path).map_err(|e| DbError::Io(e.error))?;
        self.dirty.store(false, Ordering::Release);
        debug!("saved tile database {}", self.path.display());
        Ok(())
    }

    pub fn to_json(&self) -> serde_json::Value {
        let state = self.state.read().unwrap();
        json!({
            "muxes": serde_json::Map::from_iter(state.muxes.iter().map(|(sink, mux)| {
                (sink.clone(), serde_json::Map::from_iter(mux.arcs.iter().map(|arc| {
                    (arc.source.clone(), json!(Vec::from_iter(arc.bits.bits.iter().map(|cb| cb.to_string()))))
                })).into())
            })),
            "words": serde_json::Map::from_iter(state.words.iter().map(|(name, word)| {
                (name.clone(), json!({
                    "defval": Vec::from_iter(word.defval.iter().map(|x| *x)),
                    "bits": Vec::from_iter(word.bits.iter().map(|group| {
                        Vec::from_iter(group.bits.iter().map(|cb| cb.to_string()))
                    })),
                }))
            })),
            "enums": serde_json::Map::from_iter(state.enums.iter().map(|(name, esb)| {
                (name.clone(), json!({
                    "default": esb.defval.clone(),
                    "options": serde_json::Map::from_iter(esb.options.iter().map(|(option, group)| {
                        (option.clone(), json!(Vec::from_iter(group.bits.iter().map(|cb| cb.to_string()))))
                    })),
                }))
            })),
        })
    }
}
