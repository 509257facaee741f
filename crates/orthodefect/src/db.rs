//! Consolidated defect database.
//!
//! Matching runs per segment directory; consolidation concatenates the
//! per-segment results into one uniform record set, derives each record's
//! origin group from its frame identifier and attaches provenance. All
//! inputs must share one CRS; nothing is ever reprojected.

use std::collections::BTreeMap;
use std::path::PathBuf;

use geo_types::Polygon;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::crs::CrsId;
use crate::error::{OrthodefectError, Result};
use crate::mapper::GeoExtent;
use crate::matcher::FrameMatch;

/// Derives the grouping key identifying which captured road segment a
/// frame belongs to. Filename conventions are fragile, so the derivation
/// is pluggable rather than a hard-coded split.
pub trait OriginKey: Send + Sync {
    fn origin_of(&self, frame_id: &str) -> String;
}

/// Default origin key: the part of the identifier before the first
/// delimiter, the whole identifier when none is present.
/// `"20190417_075700_LD5-003"` groups under `"20190417_075700_LD5"`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DelimiterOriginKey {
    pub delimiter: char,
}

impl Default for DelimiterOriginKey {
    fn default() -> Self {
        DelimiterOriginKey { delimiter: '-' }
    }
}

impl OriginKey for DelimiterOriginKey {
    fn origin_of(&self, frame_id: &str) -> String {
        frame_id
            .split(self.delimiter)
            .next()
            .unwrap_or(frame_id)
            .to_string()
    }
}

/// One consolidated defect record: a (frame, simple-polygon-part) match.
///
/// `extent` is always the matched frame's extent; the preview stage pairs
/// it with the defect geometry's bounding box to reconstruct pixel crops.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DefectOccurrence {
    #[serde(rename = "fn")]
    pub frame_id: String,
    pub origin: String,
    pub defect_type: String,
    pub extent: GeoExtent,
    pub geometry: Polygon<f64>,
}

/// Match results of one segment directory, ready for consolidation.
#[derive(Debug, Clone, PartialEq)]
pub struct SegmentMatches {
    pub segment: String,
    pub crs: CrsId,
    pub matches: Vec<FrameMatch>,
}

/// Everything the preview stage needs to show one frame's defects.
#[derive(Debug, Clone, PartialEq)]
pub struct FileEntry<'a> {
    pub frame_id: &'a str,
    pub origin: &'a str,
    pub extent: GeoExtent,
    pub defects: Vec<(&'a str, &'a Polygon<f64>)>,
}

/// The consolidated defect database with its provenance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DefectDatabase {
    pub shapefile_root: PathBuf,
    pub image_root: PathBuf,
    pub crs: CrsId,
    #[serde(rename = "defect_db")]
    pub occurrences: Vec<DefectOccurrence>,
}

impl DefectDatabase {
    /// Merge per-segment match results into one record set.
    ///
    /// Fails with [`OrthodefectError::CrsMismatch`] when any two segments
    /// declare different reference systems.
    pub fn consolidate(
        shapefile_root: PathBuf,
        image_root: PathBuf,
        segments: Vec<SegmentMatches>,
        origin_key: &dyn OriginKey,
    ) -> Result<Self> {
        let mut crs: Option<CrsId> = None;
        let mut occurrences = Vec::new();

        for segment in segments {
            match &crs {
                None => crs = Some(segment.crs.clone()),
                Some(expected) if *expected != segment.crs => {
                    return Err(OrthodefectError::CrsMismatch {
                        expected: expected.clone(),
                        found: segment.crs,
                        context: segment.segment,
                    });
                }
                Some(_) => {}
            }

            for m in segment.matches {
                let origin = origin_key.origin_of(&m.frame_id);
                occurrences.push(DefectOccurrence {
                    frame_id: m.frame_id,
                    origin,
                    defect_type: m.defect_type,
                    extent: m.extent,
                    geometry: m.geometry,
                });
            }
        }

        info!(count = occurrences.len(), "consolidated defect database");
        Ok(DefectDatabase {
            shapefile_root,
            image_root,
            crs: crs.unwrap_or_else(CrsId::unknown),
            occurrences,
        })
    }

    pub fn len(&self) -> usize {
        self.occurrences.len()
    }

    pub fn is_empty(&self) -> bool {
        self.occurrences.is_empty()
    }

    /// All defects recorded for one frame, or `None` when the frame has no
    /// occurrences.
    pub fn get_file_entry(&self, filename: &str) -> Option<FileEntry<'_>> {
        let mut defects = Vec::new();
        let mut head: Option<&DefectOccurrence> = None;

        for occ in &self.occurrences {
            if occ.frame_id == filename {
                head.get_or_insert(occ);
                defects.push((occ.defect_type.as_str(), &occ.geometry));
            }
        }

        head.map(|first| FileEntry {
            frame_id: &first.frame_id,
            origin: &first.origin,
            extent: first.extent,
            defects,
        })
    }

    /// Defect frequency by category, folded over the final record set.
    pub fn category_counts(&self) -> BTreeMap<&str, usize> {
        let mut counts = BTreeMap::new();
        for occ in &self.occurrences {
            *counts.entry(occ.defect_type.as_str()).or_insert(0) += 1;
        }
        counts
    }

    /// Distinct origin groups, in record order.
    pub fn origins(&self) -> Vec<&str> {
        let mut origins: Vec<&str> = Vec::new();
        for occ in &self.occurrences {
            if !origins.contains(&occ.origin.as_str()) {
                origins.push(&occ.origin);
            }
        }
        origins
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo_types::LineString;

    fn unit_poly() -> Polygon<f64> {
        Polygon::new(
            LineString::from(vec![(0.0, 0.0), (1.0, 0.0), (1.0, 1.0), (0.0, 1.0), (0.0, 0.0)]),
            vec![],
        )
    }

    fn seg(name: &str, crs: &str, frame_ids: &[(&str, &str)]) -> SegmentMatches {
        SegmentMatches {
            segment: name.to_string(),
            crs: CrsId::from_srs_text(crs),
            matches: frame_ids
                .iter()
                .map(|(fid, cat)| FrameMatch {
                    frame_id: fid.to_string(),
                    defect_type: cat.to_string(),
                    extent: GeoExtent::new(0.0, 10.0, 0.0, 10.0).unwrap(),
                    geometry: unit_poly(),
                })
                .collect(),
        }
    }

    fn consolidate(segments: Vec<SegmentMatches>) -> Result<DefectDatabase> {
        DefectDatabase::consolidate(
            PathBuf::from("/data/shapes"),
            PathBuf::from("/data/images"),
            segments,
            &DelimiterOriginKey::default(),
        )
    }

    #[test]
    fn origin_is_derived_from_the_frame_id() {
        assert_eq!(
            DelimiterOriginKey::default().origin_of("20190417_075700_LD5-003"),
            "20190417_075700_LD5"
        );
        assert_eq!(DelimiterOriginKey::default().origin_of("plain"), "plain");
        assert_eq!(
            DelimiterOriginKey { delimiter: '_' }.origin_of("a_b_c"),
            "a"
        );
    }

    #[test]
    fn consolidation_concatenates_in_segment_order() {
        let db = consolidate(vec![
            seg("segA", "EPSG:3301", &[("segA-000", "crack"), ("segA-001", "crack")]),
            seg("segB", "EPSG:3301", &[("segB-000", "pothole")]),
        ])
        .unwrap();

        assert_eq!(db.len(), 3);
        assert_eq!(db.occurrences[0].origin, "segA");
        assert_eq!(db.occurrences[2].origin, "segB");
        assert_eq!(db.origins(), ["segA", "segB"]);
        assert_eq!(db.crs, CrsId::from_srs_text("EPSG:3301"));
    }

    #[test]
    fn crs_disagreement_is_fatal() {
        let err = consolidate(vec![
            seg("segA", "EPSG:3301", &[("segA-000", "crack")]),
            seg("segB", "EPSG:3857", &[("segB-000", "crack")]),
        ])
        .unwrap_err();

        assert!(matches!(err, OrthodefectError::CrsMismatch { .. }));
    }

    #[test]
    fn file_entry_collects_all_defects_of_one_frame() {
        let db = consolidate(vec![seg(
            "segA",
            "EPSG:3301",
            &[
                ("segA-000", "crack"),
                ("segA-001", "pothole"),
                ("segA-000", "undefined"),
            ],
        )])
        .unwrap();

        let entry = db.get_file_entry("segA-000").unwrap();
        assert_eq!(entry.frame_id, "segA-000");
        assert_eq!(entry.origin, "segA");
        assert_eq!(entry.defects.len(), 2);
        assert_eq!(entry.defects[0].0, "crack");
        assert_eq!(entry.defects[1].0, "undefined");

        assert!(db.get_file_entry("segA-999").is_none());
    }

    #[test]
    fn category_counts_fold_over_the_record_set() {
        let db = consolidate(vec![seg(
            "segA",
            "EPSG:3301",
            &[
                ("segA-000", "crack"),
                ("segA-001", "crack"),
                ("segA-002", "pothole"),
            ],
        )])
        .unwrap();

        let counts = db.category_counts();
        assert_eq!(counts.get("crack"), Some(&2));
        assert_eq!(counts.get("pothole"), Some(&1));
        assert_eq!(counts.get("patch"), None);
    }
}
