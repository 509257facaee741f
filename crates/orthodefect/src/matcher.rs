//! Spatial matching of defect polygons against frame boundaries.
//!
//! Two policies exist because the system evolved between them and both
//! produced real databases. Containment assigns a defect to a frame only
//! when it lies wholly inside the frame's boundary polygon; a defect that
//! no frame fully contains is dropped (a known limitation of that policy).
//! Overlay intersects every boundary with every defect and keeps each
//! non-empty piece, so a defect straddling adjacent frames legitimately
//! yields one occurrence per frame. Overlay is the default.
//!
//! Category normalization runs after the spatial predicate so unlabeled
//! polygons still participate in matching, and a non-matching unlabeled
//! defect contributes nothing.

use std::fmt;
use std::str::FromStr;

use geo::{Area, BooleanOps, Contains};
use geo_types::{MultiPolygon, Polygon};
use tracing::debug;

use crate::catalog::FrameCatalog;
use crate::io::shapefile::DefectPolygon;
use crate::mapper::GeoExtent;

/// Sentinel stored in place of a missing category label.
pub const UNDEFINED_CATEGORY: &str = "undefined";

/// One matched (frame, simple-polygon-part) pair, before origin grouping.
#[derive(Debug, Clone, PartialEq)]
pub struct FrameMatch {
    pub frame_id: String,
    pub defect_type: String,
    /// The matched frame's extent (not the defect's own bounding box).
    pub extent: GeoExtent,
    pub geometry: Polygon<f64>,
}

/// A spatial matching policy over one segment's catalog.
///
/// Implementations must emit matches in frame catalog order first, defect
/// input order second, with no reordering or priority between qualifying
/// matches.
pub trait MatchStrategy: Send + Sync {
    fn name(&self) -> &'static str;

    fn run(&self, catalog: &FrameCatalog, defects: &[DefectPolygon]) -> Vec<FrameMatch>;
}

/// Selects which matching policy to use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StrategyKind {
    /// Whole-defect containment in the frame boundary.
    Containment,
    /// Boolean intersection with multi-part explode.
    #[default]
    Overlay,
}

impl MatchStrategy for StrategyKind {
    fn name(&self) -> &'static str {
        match self {
            StrategyKind::Containment => ContainmentStrategy.name(),
            StrategyKind::Overlay => OverlayStrategy.name(),
        }
    }

    fn run(&self, catalog: &FrameCatalog, defects: &[DefectPolygon]) -> Vec<FrameMatch> {
        match self {
            StrategyKind::Containment => ContainmentStrategy.run(catalog, defects),
            StrategyKind::Overlay => OverlayStrategy.run(catalog, defects),
        }
    }
}

impl FromStr for StrategyKind {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "overlay" | "intersection" => Ok(StrategyKind::Overlay),
            "containment" | "within" => Ok(StrategyKind::Containment),
            other => Err(format!(
                "unknown matching strategy '{other}' (expected 'overlay' or 'containment')"
            )),
        }
    }
}

impl fmt::Display for StrategyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(MatchStrategy::name(self))
    }
}

fn normalize_category(category: Option<&str>) -> String {
    match category {
        Some(label) if !label.trim().is_empty() => label.to_string(),
        _ => UNDEFINED_CATEGORY.to_string(),
    }
}

/// Assigns a defect to every frame whose boundary wholly contains it.
#[derive(Debug, Clone, Copy, Default)]
pub struct ContainmentStrategy;

impl MatchStrategy for ContainmentStrategy {
    fn name(&self) -> &'static str {
        "containment"
    }

    fn run(&self, catalog: &FrameCatalog, defects: &[DefectPolygon]) -> Vec<FrameMatch> {
        let mut matches = Vec::new();

        for frame in &catalog.frames {
            for defect in defects {
                if !frame.boundary.contains(&defect.geometry) {
                    continue;
                }

                let defect_type = normalize_category(defect.category.as_deref());
                for part in defect.geometry.iter() {
                    matches.push(FrameMatch {
                        frame_id: frame.id.clone(),
                        defect_type: defect_type.clone(),
                        extent: frame.extent,
                        geometry: part.clone(),
                    });
                }
            }
        }

        debug!(
            segment = %catalog.segment,
            count = matches.len(),
            "containment matching done"
        );
        matches
    }
}

/// Intersects every frame boundary with every defect, keeping each
/// non-empty simple polygon part of the result.
#[derive(Debug, Clone, Copy, Default)]
pub struct OverlayStrategy;

impl MatchStrategy for OverlayStrategy {
    fn name(&self) -> &'static str {
        "overlay"
    }

    fn run(&self, catalog: &FrameCatalog, defects: &[DefectPolygon]) -> Vec<FrameMatch> {
        let mut matches = Vec::new();

        for frame in &catalog.frames {
            let boundary = MultiPolygon::new(vec![frame.boundary.clone()]);

            for defect in defects {
                let parts: Vec<Polygon<f64>> = boundary
                    .intersection(&defect.geometry)
                    .into_iter()
                    .filter(|part| part.unsigned_area() > 0.0)
                    .collect();
                if parts.is_empty() {
                    continue;
                }

                // Normalize only once a real overlap exists.
                let defect_type = normalize_category(defect.category.as_deref());
                for part in parts {
                    matches.push(FrameMatch {
                        frame_id: frame.id.clone(),
                        defect_type: defect_type.clone(),
                        extent: frame.extent,
                        geometry: part,
                    });
                }
            }
        }

        debug!(
            segment = %catalog.segment,
            count = matches.len(),
            "overlay matching done"
        );
        matches
    }
}
