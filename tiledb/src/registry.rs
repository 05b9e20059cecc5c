use std::collections::HashMap;
use std::path::Path;
use std::sync::{Arc, LazyLock, Mutex};

use log::debug;
use serde::{Deserialize, Serialize};

use crate::error::DbError;
use crate::tiledb::TileBitDatabase;

/// Identifies one tile type of one device: the key under which tile
/// databases are shared process-wide. Resolution to a database file path is
/// the caller's business.
#[derive(Debug, Clone, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub struct TileLocator {
    pub family: String,
    pub device: String,
    pub tiletype: String,
}

impl TileLocator {
    pub fn new(
        family: impl Into<String>,
        device: impl Into<String>,
        tiletype: impl Into<String>,
    ) -> Self {
        Self {
            family: family.into(),
            device: device.into(),
            tiletype: tiletype.into(),
        }
    }
}

static BITDB_STORE: LazyLock<Mutex<HashMap<TileLocator, Arc<TileBitDatabase>>>> =
    LazyLock::new(|| Mutex::new(HashMap::new()));

/// Obtain the shared database handle for a tile. The first request loads the
/// database from `path`; later requests for the same locator return the same
/// live instance and ignore `path`. Handles stay registered for the process
/// lifetime, and racing first requests are serialized, so every caller sees
/// one instance per locator.
pub fn get_tile_bitdata(
    tile: &TileLocator,
    path: impl AsRef<Path>,
) -> Result<Arc<TileBitDatabase>, DbError> {
    let mut store = BITDB_STORE.lock().unwrap();
    if let Some(db) = store.get(tile) {
        return Ok(db.clone());
    }
    debug!(
        "loading tile bit database for {}/{}/{}",
        tile.family, tile.device, tile.tiletype
    );
    let db = Arc::new(TileBitDatabase::open(path)?);
    store.insert(tile.clone(), db.clone());
    Ok(db)
}
