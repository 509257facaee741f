//! Whole-batch database construction.
//!
//! The shapefile tree holds one directory per road segment, each with one
//! defect layer; the image tree holds a same-named directory of orthoframe
//! descriptors and masks. Every shapefile directory must have its image
//! counterpart before processing starts. Per-frame problems skip that
//! frame; CRS disagreements and degenerate extents abort the batch.

use std::path::{Path, PathBuf};

use tracing::info;

use crate::boundary::BoundaryExtractor;
use crate::catalog;
use crate::db::{DefectDatabase, DelimiterOriginKey, OriginKey, SegmentMatches};
use crate::error::{OrthodefectError, Result};
use crate::io::shapefile::{self, DEFAULT_CATEGORY_FIELD};
use crate::matcher::{MatchStrategy, StrategyKind};

/// Shapefile naming convention inside each segment directory.
pub const DEFAULT_SHAPEFILE_NAME: &str = "defects_categorized.shp";

/// Knobs for one database build run.
pub struct BuildOptions {
    pub strategy: StrategyKind,
    pub boundary: BoundaryExtractor,
    pub shapefile_name: String,
    pub category_field: String,
    pub origin_key: Box<dyn OriginKey>,
}

impl Default for BuildOptions {
    fn default() -> Self {
        BuildOptions {
            strategy: StrategyKind::default(),
            boundary: BoundaryExtractor::default(),
            shapefile_name: DEFAULT_SHAPEFILE_NAME.to_string(),
            category_field: DEFAULT_CATEGORY_FIELD.to_string(),
            origin_key: Box::new(DelimiterOriginKey::default()),
        }
    }
}

/// Build the consolidated defect database for a shapefile tree and its
/// image tree. Nothing is persisted here; the caller writes the artifact
/// once the whole batch has matched.
pub fn build_database(
    shapefile_root: &Path,
    image_root: &Path,
    options: &BuildOptions,
) -> Result<DefectDatabase> {
    let segments = segment_dirs(shapefile_root)?;

    // Every shapefile dir needs its image counterpart before any work
    // starts; a hole in the pairing is a systemic input problem.
    for segment in &segments {
        if !image_root.join(segment).is_dir() {
            return Err(OrthodefectError::MissingImageDirectory {
                segment: segment.clone(),
            });
        }
    }

    let mut matched = Vec::with_capacity(segments.len());

    for segment in &segments {
        info!(segment = %segment, strategy = %options.strategy, "processing segment");

        let catalog = catalog::build_catalog(&image_root.join(segment), &options.boundary)?;
        let layer = shapefile::read_defect_layer(
            &shapefile_root.join(segment).join(&options.shapefile_name),
            &options.category_field,
        )?;

        if catalog.crs != layer.crs {
            return Err(OrthodefectError::CrsMismatch {
                expected: layer.crs,
                found: catalog.crs,
                context: segment.clone(),
            });
        }

        let matches = options.strategy.run(&catalog, &layer.defects);
        info!(
            segment = %segment,
            frames = catalog.frames.len(),
            defects = layer.defects.len(),
            matches = matches.len(),
            "segment matched"
        );

        matched.push(SegmentMatches {
            segment: segment.clone(),
            crs: catalog.crs,
            matches,
        });
    }

    DefectDatabase::consolidate(
        PathBuf::from(shapefile_root),
        PathBuf::from(image_root),
        matched,
        options.origin_key.as_ref(),
    )
}

/// Immediate subdirectories of the shapefile tree, sorted by name.
fn segment_dirs(root: &Path) -> Result<Vec<String>> {
    let mut dirs = Vec::new();
    for entry in std::fs::read_dir(root)? {
        let entry = entry?;
        if entry.file_type()?.is_dir() {
            dirs.push(entry.file_name().to_string_lossy().into_owned());
        }
    }
    dirs.sort();
    Ok(dirs)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn unpaired_segment_directory_aborts_the_batch() {
        let shapes = tempfile::tempdir().unwrap();
        let images = tempfile::tempdir().unwrap();
        fs::create_dir(shapes.path().join("20190417_075700_LD5")).unwrap();

        let err = build_database(shapes.path(), images.path(), &BuildOptions::default())
            .unwrap_err();
        assert!(matches!(
            err,
            OrthodefectError::MissingImageDirectory { ref segment } if segment == "20190417_075700_LD5"
        ));
    }

    #[test]
    fn empty_shapefile_tree_builds_an_empty_database() {
        let shapes = tempfile::tempdir().unwrap();
        let images = tempfile::tempdir().unwrap();

        let db = build_database(shapes.path(), images.path(), &BuildOptions::default()).unwrap();
        assert!(db.is_empty());
        assert_eq!(db.shapefile_root, shapes.path());
        assert_eq!(db.image_root, images.path());
    }

    #[test]
    fn unreadable_root_is_an_io_error() {
        let err = build_database(
            Path::new("/nonexistent/shapes"),
            Path::new("/nonexistent/images"),
            &BuildOptions::default(),
        )
        .unwrap_err();
        assert!(matches!(err, OrthodefectError::Io(_)));
    }
}
