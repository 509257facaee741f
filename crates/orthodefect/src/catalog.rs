//! Frame catalog construction for one road-segment directory.
//!
//! A segment directory holds one `.vrt` bound descriptor and one
//! `<frame_id>.mask.png` segmentation mask per orthoframe. Each pair
//! becomes a [`Frame`] with its geographic extent and mask-derived boundary
//! polygon. Frames with missing or unusable masks are skipped with a
//! warning; a CRS disagreement inside one directory aborts the batch.

use std::path::Path;

use geo_types::Polygon;
use tracing::{debug, warn};

use crate::boundary::BoundaryExtractor;
use crate::crs::CrsId;
use crate::error::{OrthodefectError, Result};
use crate::io::vrt;
use crate::mapper::{GeoExtent, PixelShape};

/// Mask file naming convention, co-located with the descriptor.
pub const ORTHOFRAME_MASK_EXT: &str = ".mask.png";

/// One cataloged orthoframe. Immutable once built.
#[derive(Debug, Clone, PartialEq)]
pub struct Frame {
    pub id: String,
    pub extent: GeoExtent,
    pub shape: PixelShape,
    pub boundary: Polygon<f64>,
}

/// All frames of one source directory ("one road segment"), sorted by id.
#[derive(Debug, Clone, PartialEq)]
pub struct FrameCatalog {
    pub segment: String,
    pub crs: CrsId,
    pub frames: Vec<Frame>,
}

/// Build the frame catalog for one segment directory.
pub fn build_catalog(dir: &Path, extractor: &BoundaryExtractor) -> Result<FrameCatalog> {
    let segment = dir
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();

    let mut vrt_paths = Vec::new();
    for entry in std::fs::read_dir(dir)? {
        let path = entry?.path();
        if path.extension().is_some_and(|ext| ext == "vrt") {
            vrt_paths.push(path);
        }
    }
    vrt_paths.sort();

    if vrt_paths.is_empty() {
        warn!(dir = %dir.display(), "no raster descriptors in segment directory");
    }

    let mut crs: Option<CrsId> = None;
    let mut frames = Vec::new();

    for path in vrt_paths {
        let id = match path.file_stem() {
            Some(stem) => stem.to_string_lossy().into_owned(),
            None => continue,
        };

        let descriptor = match vrt::read_vrt(&path) {
            Ok(d) => d,
            // A degenerate extent means the whole input set is suspect.
            Err(e @ OrthodefectError::InvalidExtent { .. }) => return Err(e),
            Err(e) => {
                warn!(frame = %id, error = %e, "skipping frame with unreadable descriptor");
                continue;
            }
        };

        match &crs {
            None => crs = Some(descriptor.crs.clone()),
            Some(expected) if *expected != descriptor.crs => {
                return Err(OrthodefectError::CrsMismatch {
                    expected: expected.clone(),
                    found: descriptor.crs,
                    context: id,
                });
            }
            Some(_) => {}
        }

        let mask_path = dir.join(format!("{id}{ORTHOFRAME_MASK_EXT}"));
        if !mask_path.exists() {
            let e = OrthodefectError::MissingMask { path: mask_path };
            warn!(frame = %id, error = %e, "skipping frame");
            continue;
        }

        let mask = match image::open(&mask_path) {
            Ok(img) => img.to_luma8(),
            Err(e) => {
                warn!(frame = %id, error = %e, "skipping frame with unreadable mask");
                continue;
            }
        };

        let boundary = match extractor.extract(&mask, &descriptor.extent) {
            Ok(polygon) => polygon,
            Err(e) => {
                warn!(frame = %id, error = %e, "skipping frame without usable boundary");
                continue;
            }
        };

        debug!(frame = %id, "cataloged frame");
        frames.push(Frame {
            id,
            extent: descriptor.extent,
            shape: descriptor.shape,
            boundary,
        });
    }

    // Collection order already follows the sorted descriptor listing;
    // re-sort on id so output is reproducible regardless of how the
    // frames were gathered.
    frames.sort_by(|a, b| a.id.cmp(&b.id));

    Ok(FrameCatalog {
        segment,
        crs: crs.unwrap_or_else(CrsId::unknown),
        frames,
    })
}
