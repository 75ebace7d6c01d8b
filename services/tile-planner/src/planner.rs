//! Depth first tile walk producing per-tile source lists.

use std::io::Write;
use std::sync::Arc;

use anyhow::{Context, Result};
use cutline::{Cutline, FilterOutcome, SourceGeometryIndex};
use quadkey_index::{QuadKeyBridge, QuadKeyTrie};
use serde::Serialize;
use tiling_common::{tile_to_name, Tile, TileMatrixSet};
use tracing::{debug, info};

use crate::config::PlannerConfig;

/// One emitted tile.
#[derive(Debug, Clone, Serialize)]
pub struct TilePlan {
    pub tile: Tile,
    pub name: String,
    pub quad_keys: Vec<String>,
    pub sources: Vec<String>,
    pub crop_count: usize,
}

/// Totals for a finished walk.
#[derive(Debug, Clone, Default, Serialize)]
pub struct PlanSummary {
    pub tile_matrix_set: String,
    pub max_zoom: u32,
    /// Tiles emitted at `max_zoom`.
    pub tiles: usize,
    /// Tiles dropped because they lie outside the cutline.
    pub outside: usize,
    /// Tiles dropped because no source overlaps them.
    pub empty: usize,
    /// Generalized quadkey coverage of the emitted tiles.
    pub coverage: QuadKeyTrie,
    /// Area fraction the generalization added.
    pub coverage_waste: f64,
}

#[derive(Serialize)]
struct SummaryLine<'a> {
    summary: &'a PlanSummary,
}

/// Plans which tiles to build and from which sources.
pub struct Planner {
    tms: Arc<TileMatrixSet>,
    bridge: QuadKeyBridge,
    index: SourceGeometryIndex,
    cutline: Cutline,
    config: PlannerConfig,
}

impl Planner {
    pub fn new(
        tms: Arc<TileMatrixSet>,
        index: SourceGeometryIndex,
        cutline: Cutline,
        config: PlannerConfig,
    ) -> Result<Self> {
        if config.max_zoom > tms.max_zoom() {
            anyhow::bail!(
                "max_zoom {} is past the last zoom {} of {}",
                config.max_zoom,
                tms.max_zoom(),
                tms.identifier()
            );
        }
        let bridge = QuadKeyBridge::new(tms.clone())
            .with_context(|| format!("{} cannot be addressed by quadkeys", tms.identifier()))?;

        Ok(Self {
            tms,
            bridge,
            index,
            cutline,
            config,
        })
    }

    /// Walk the tile matrix set and write one JSON line per emitted tile,
    /// followed by a summary line.
    pub fn run<W: Write>(&self, out: &mut W) -> Result<PlanSummary> {
        let mut summary = PlanSummary {
            tile_matrix_set: self.tms.identifier().to_string(),
            max_zoom: self.config.max_zoom,
            ..Default::default()
        };

        info!(
            tile_matrix_set = %self.tms.identifier(),
            max_zoom = self.config.max_zoom,
            sources = self.index.len(),
            "Planning tiles"
        );

        // Children are pushed in reverse so tiles pop in row major order
        let files = self.index.names();
        let roots: Vec<Tile> = self.bridge.top_level_tiles().into_iter().collect();
        let mut stack: Vec<(Tile, Cutline, Vec<String>)> = roots
            .into_iter()
            .rev()
            .map(|tile| (tile, self.cutline.clone(), files.clone()))
            .collect();

        while let Some((tile, mut cutline, mut files)) = stack.pop() {
            let outcome = cutline
                .filter_sources(&tile, &mut files, &self.index)
                .with_context(|| format!("Failed to filter sources for tile {}", tile))?;

            if outcome.is_outside() {
                summary.outside += 1;
                continue;
            }
            if files.is_empty() {
                summary.empty += 1;
                continue;
            }

            if tile.z < self.config.max_zoom {
                let children: Vec<Tile> = self.bridge.cover_tile(Some(&tile)).into_iter().collect();
                for child in children.into_iter().rev() {
                    stack.push((child, cutline.clone(), files.clone()));
                }
                continue;
            }

            let quad_keys = self.bridge.nearest_quad_keys(&tile)?;
            summary.coverage.extend_keys(&quad_keys)?;

            let crop_count = match outcome {
                FilterOutcome::Crop(count) => count,
                FilterOutcome::Outside => 0,
            };
            let plan = TilePlan {
                name: tile_to_name(&tile),
                tile,
                quad_keys,
                sources: files,
                crop_count,
            };
            serde_json::to_writer(&mut *out, &plan)?;
            writeln!(out)?;
            summary.tiles += 1;
        }

        summary.coverage_waste = summary.coverage.merge_quad_keys(
            self.config.fill_ratio,
            self.config.merge_min_z,
            self.config.merge_max_z,
        )?;

        serde_json::to_writer(&mut *out, &SummaryLine { summary: &summary })?;
        writeln!(out)?;
        out.flush()?;

        debug!(coverage = ?summary.coverage.to_list(), "Generalized coverage");
        info!(
            tiles = summary.tiles,
            outside = summary.outside,
            empty = summary.empty,
            coverage_keys = summary.coverage.len(),
            coverage_waste = summary.coverage_waste,
            "Planning complete"
        );
        Ok(summary)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cutline::CutlineConfig;
    use test_utils::box_multipolygon_geojson;
    use test_utils::fixtures::footprints;
    use tiling_common::{presets, Rect2D};

    fn rect((min_x, min_y, max_x, max_y): (f64, f64, f64, f64)) -> Rect2D {
        Rect2D::from_bbox([min_x, min_y, max_x, max_y])
    }

    fn nztm_index() -> SourceGeometryIndex {
        [
            ("auckland.tiff", rect(footprints::AUCKLAND)),
            ("wellington.tiff", rect(footprints::WELLINGTON)),
        ]
        .into_iter()
        .collect()
    }

    fn plan_lines(output: &[u8]) -> Vec<serde_json::Value> {
        std::str::from_utf8(output)
            .unwrap()
            .lines()
            .map(|line| serde_json::from_str(line).unwrap())
            .collect()
    }

    #[test]
    fn test_rejects_zoom_past_tile_matrix_set() {
        let tms = Arc::new(presets::nztm2000_quad());
        let config = PlannerConfig {
            max_zoom: 30,
            ..Default::default()
        };
        let cutline = Cutline::empty(tms.clone());
        assert!(Planner::new(tms, nztm_index(), cutline, config).is_err());
    }

    #[test]
    fn test_plan_without_cutline() {
        let tms = Arc::new(presets::nztm2000_quad());
        let config = PlannerConfig {
            max_zoom: 6,
            ..Default::default()
        };
        let planner =
            Planner::new(tms.clone(), nztm_index(), Cutline::empty(tms.clone()), config).unwrap();

        let mut output = Vec::new();
        let summary = planner.run(&mut output).unwrap();
        let lines = plan_lines(&output);

        // Padding lets both footprints reach into neighbouring tiles
        assert!(summary.tiles >= 2);
        assert_eq!(summary.outside, 0);
        assert!(summary.empty > 0);
        assert_eq!(lines.len(), summary.tiles + 1);

        let auckland = lines
            .iter()
            .find(|line| line["name"] == "6-16-14")
            .unwrap();
        assert_eq!(auckland["sources"], serde_json::json!(["auckland.tiff"]));
        assert_eq!(auckland["tile"]["z"], 6);
        assert_eq!(auckland["crop_count"], 0);
        // Zoom 6 is regular, one key of zoom plus offset digits
        assert_eq!(auckland["quad_keys"].as_array().unwrap().len(), 1);
        assert_eq!(auckland["quad_keys"][0].as_str().unwrap().len(), 8);
        assert!(lines[..summary.tiles]
            .iter()
            .any(|line| line["sources"] == serde_json::json!(["wellington.tiff"])));

        let last = lines.last().unwrap();
        assert_eq!(last["summary"]["tiles"], summary.tiles);
        assert!(!summary.coverage.is_empty());
    }

    #[test]
    fn test_plan_with_cutline_on_irregular_zoom() {
        let tms = Arc::new(presets::nztm2000_quad());
        let json = box_multipolygon_geojson(&[footprints::AUCKLAND]);
        let cutline = Cutline::from_geojson(tms.clone(), &json, CutlineConfig::default()).unwrap();
        let config = PlannerConfig {
            max_zoom: 9,
            ..Default::default()
        };
        let planner = Planner::new(tms, nztm_index(), cutline, config).unwrap();

        let mut output = Vec::new();
        let summary = planner.run(&mut output).unwrap();
        let lines = plan_lines(&output);

        assert!(summary.tiles >= 1);
        assert!(summary.outside > 0);
        for line in &lines[..lines.len() - 1] {
            assert_eq!(line["sources"], serde_json::json!(["auckland.tiff"]));
            assert_eq!(line["tile"]["z"], 9);
            // Zoom 9 is past the irregular step, keys are zoom 7 plus the offset
            for key in line["quad_keys"].as_array().unwrap() {
                assert_eq!(key.as_str().unwrap().len(), 9);
            }
            assert!(line["crop_count"].as_u64().unwrap() >= 1);
        }
        assert!(summary.coverage_waste >= 0.0);
    }
}
