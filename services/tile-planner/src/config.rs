//! Planner settings and YAML plan files.
//!
//! Settings are layered: defaults, then `PLANNER_*` environment variables,
//! then the plan file, then command line flags.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use cutline::CutlineConfig;
use serde::{Deserialize, Serialize};
use tiling_common::Rect2D;
use tracing::debug;

/// Tunables for one planning run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlannerConfig {
    /// Zoom the walk descends to; tiles are emitted at this zoom.
    pub max_zoom: u32,

    /// Minimum covered fraction for a quadkey subtree to be generalized.
    pub fill_ratio: f64,

    /// Shortest quadkey the coverage generalization may produce.
    pub merge_min_z: usize,

    /// Longest quadkey the coverage generalization may produce.
    pub merge_max_z: usize,

    /// Cutline padding factor around each tile.
    pub padding: f64,
}

impl Default for PlannerConfig {
    fn default() -> Self {
        Self {
            max_zoom: 10,
            fill_ratio: 0.9,
            merge_min_z: 0,
            merge_max_z: 14,
            padding: 1.25,
        }
    }
}

impl PlannerConfig {
    /// Load configuration from environment variables.
    ///
    /// `CUTLINE_PADDING` seeds the padding, `PLANNER_PADDING` wins over it.
    pub fn from_env() -> Self {
        let mut config = Self {
            padding: CutlineConfig::from_env().padding,
            ..Self::default()
        };

        if let Ok(val) = std::env::var("PLANNER_MAX_ZOOM") {
            if let Ok(zoom) = val.parse() {
                config.max_zoom = zoom;
            }
        }

        if let Ok(val) = std::env::var("PLANNER_FILL_RATIO") {
            if let Ok(ratio) = val.parse() {
                config.fill_ratio = ratio;
            }
        }

        if let Ok(val) = std::env::var("PLANNER_MERGE_MIN_Z") {
            if let Ok(z) = val.parse() {
                config.merge_min_z = z;
            }
        }

        if let Ok(val) = std::env::var("PLANNER_MERGE_MAX_Z") {
            if let Ok(z) = val.parse() {
                config.merge_max_z = z;
            }
        }

        if let Ok(val) = std::env::var("PLANNER_PADDING") {
            if let Ok(padding) = val.parse() {
                config.padding = padding;
            }
        }

        config
    }

    /// Copy every setting the plan file specifies.
    pub fn apply(&mut self, overrides: &PlanOverrides) {
        if let Some(max_zoom) = overrides.max_zoom {
            self.max_zoom = max_zoom;
        }
        if let Some(fill_ratio) = overrides.fill_ratio {
            self.fill_ratio = fill_ratio;
        }
        if let Some(min_z) = overrides.merge_min_z {
            self.merge_min_z = min_z;
        }
        if let Some(max_z) = overrides.merge_max_z {
            self.merge_max_z = max_z;
        }
        if let Some(padding) = overrides.padding {
            self.padding = padding;
        }
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), String> {
        if !(0.0..=1.0).contains(&self.fill_ratio) {
            return Err("fill_ratio must be within 0-1".to_string());
        }

        if self.merge_min_z > self.merge_max_z {
            return Err("merge_min_z must be <= merge_max_z".to_string());
        }

        if !self.padding.is_finite() || self.padding < 1.0 {
            return Err("padding must be >= 1.0".to_string());
        }

        Ok(())
    }
}

/// Optional settings a plan file may carry.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PlanOverrides {
    pub max_zoom: Option<u32>,
    pub fill_ratio: Option<f64>,
    pub merge_min_z: Option<usize>,
    pub merge_max_z: Option<usize>,
    pub padding: Option<f64>,
}

/// One source raster listed in a plan.
#[derive(Debug, Clone, Deserialize)]
pub struct SourceEntry {
    pub name: String,
    /// `[min_x, min_y, max_x, max_y]` in the tile matrix set's CRS.
    pub bbox: [f64; 4],
}

impl SourceEntry {
    pub fn bounds(&self) -> Rect2D {
        Rect2D::from_bbox(self.bbox)
    }
}

/// A plan file.
#[derive(Debug, Clone, Deserialize)]
pub struct PlanFile {
    /// Tile matrix set identifier or CRS, e.g. `NZTM2000Quad` or `EPSG:3857`.
    #[serde(default = "default_tile_matrix_set")]
    pub tile_matrix_set: String,

    /// GeoJSON cutline, relative paths resolve against the plan file.
    #[serde(default)]
    pub cutline: Option<PathBuf>,

    #[serde(default)]
    pub sources: Vec<SourceEntry>,

    #[serde(flatten)]
    pub settings: PlanOverrides,
}

fn default_tile_matrix_set() -> String {
    "WebMercatorQuad".to_string()
}

impl PlanFile {
    /// Load a plan from a YAML file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read plan file: {}", path.display()))?;

        let mut plan: PlanFile = serde_yaml::from_str(&content)
            .with_context(|| format!("Failed to parse plan file: {}", path.display()))?;

        if let Some(dir) = path.parent() {
            plan.cutline = plan.cutline.map(|cutline| {
                if cutline.is_relative() {
                    dir.join(cutline)
                } else {
                    cutline
                }
            });
        }

        debug!(
            path = %path.display(),
            tile_matrix_set = %plan.tile_matrix_set,
            sources = plan.sources.len(),
            "Loaded plan file"
        );
        Ok(plan)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_utils::write_temp_file;

    #[test]
    fn test_default_config_is_valid() {
        assert!(PlannerConfig::default().validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let config = PlannerConfig {
            fill_ratio: 1.5,
            ..Default::default()
        };
        assert!(config.validate().is_err());

        let config = PlannerConfig {
            merge_min_z: 5,
            merge_max_z: 4,
            ..Default::default()
        };
        assert!(config.validate().is_err());

        let config = PlannerConfig {
            padding: 0.5,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_from_env() {
        std::env::set_var("PLANNER_MAX_ZOOM", "7");
        std::env::set_var("PLANNER_FILL_RATIO", "not a number");
        let config = PlannerConfig::from_env();
        std::env::remove_var("PLANNER_MAX_ZOOM");
        std::env::remove_var("PLANNER_FILL_RATIO");

        assert_eq!(config.max_zoom, 7);
        assert_eq!(config.fill_ratio, PlannerConfig::default().fill_ratio);
    }

    #[test]
    fn test_apply_overrides() {
        let mut config = PlannerConfig::default();
        config.apply(&PlanOverrides {
            max_zoom: Some(12),
            padding: Some(1.5),
            ..Default::default()
        });
        assert_eq!(config.max_zoom, 12);
        assert_eq!(config.padding, 1.5);
        assert_eq!(config.fill_ratio, 0.9);
    }

    #[test]
    fn test_load_plan_file() {
        let yaml = r#"
tile_matrix_set: NZTM2000Quad
cutline: auckland.geojson
max_zoom: 8
fill_ratio: 0.5
sources:
  - name: auckland.tiff
    bbox: [1750000, 5910000, 1760000, 5925000]
"#;
        let file = write_temp_file(".yaml", yaml);
        let plan = PlanFile::load(file.path()).unwrap();

        assert_eq!(plan.tile_matrix_set, "NZTM2000Quad");
        assert_eq!(plan.settings.max_zoom, Some(8));
        assert_eq!(plan.settings.fill_ratio, Some(0.5));
        assert_eq!(plan.settings.padding, None);
        assert_eq!(plan.sources.len(), 1);
        assert_eq!(plan.sources[0].bounds().width, 10_000.0);

        let cutline = plan.cutline.unwrap();
        assert!(cutline.is_absolute());
        assert!(cutline.ends_with("auckland.geojson"));
    }

    #[test]
    fn test_load_missing_plan_file() {
        let err = PlanFile::load(Path::new("/nonexistent/plan.yaml")).unwrap_err();
        assert!(err.to_string().contains("Failed to read plan file"));
    }
}
