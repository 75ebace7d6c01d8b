//! Explicitly constructed lookup of tile matrix sets.
//!
//! There is no process-wide registry; whoever needs a tile matrix set owns a
//! registry (or an `Arc<TileMatrixSet>`) and passes it down.

use std::collections::HashMap;
use std::sync::Arc;

use crate::crs::CrsCode;
use crate::presets;
use crate::tile::TileMatrixSet;
use crate::{TilingError, TilingResult};

#[derive(Debug, Clone, Default)]
pub struct TileMatrixSetRegistry {
    by_identifier: HashMap<String, Arc<TileMatrixSet>>,
    by_crs: HashMap<CrsCode, Arc<TileMatrixSet>>,
}

impl TileMatrixSetRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry holding every preset.
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        for tms in presets::all() {
            registry.register(tms);
        }
        registry
    }

    /// Add a tile matrix set. The first set registered for a CRS stays the
    /// default for that CRS.
    pub fn register(&mut self, tms: TileMatrixSet) -> Arc<TileMatrixSet> {
        let tms = Arc::new(tms);
        self.by_crs.entry(tms.crs()).or_insert_with(|| tms.clone());
        self.by_identifier
            .insert(tms.identifier().to_lowercase(), tms.clone());
        tms
    }

    /// Look up by identifier, case-insensitive.
    pub fn get(&self, identifier: &str) -> Option<Arc<TileMatrixSet>> {
        self.by_identifier.get(&identifier.to_lowercase()).cloned()
    }

    pub fn get_by_crs(&self, crs: CrsCode) -> Option<Arc<TileMatrixSet>> {
        self.by_crs.get(&crs).cloned()
    }

    /// Resolve an identifier or a CRS reference such as "EPSG:2193".
    pub fn find(&self, name: &str) -> TilingResult<Arc<TileMatrixSet>> {
        if let Some(tms) = self.get(name) {
            return Ok(tms);
        }
        let crs = CrsCode::parse(name)?;
        self.get_by_crs(crs).ok_or_else(|| {
            TilingError::invalid_config(format!("no tile matrix set registered for {}", crs))
        })
    }

    /// Registered identifiers, sorted.
    pub fn identifiers(&self) -> Vec<String> {
        let mut ids: Vec<String> = self
            .by_identifier
            .values()
            .map(|tms| tms.identifier().to_string())
            .collect();
        ids.sort();
        ids
    }
}
