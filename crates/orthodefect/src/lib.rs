//! # Orthoframe Defect Geo-Matching Library
//!
//! Locates pavement-defect annotations (vector polygons from a GIS
//! shapefile) onto the orthorectified image tile that geographically
//! contains them, producing a consolidated defect database keyed by image
//! file, plus the pixel<->geo transforms used to crop defect patches from
//! the source imagery.
//!
//! ## Core Features
//!
//! - **Coordinate Mapping**: exact pixel<->geographic round trips per
//!   frame, with the raster row-0-at-top flip
//! - **Mask Boundaries**: simplified usable-area polygons from
//!   segmentation masks, with optional inward narrowing
//! - **Spatial Matching**: containment and overlay strategies behind one
//!   trait, with multi-part explode
//! - **Consolidation**: one uniform record set with origin grouping,
//!   provenance and CRS-identity checking
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::path::Path;
//! use orthodefect::{build_database, BuildOptions};
//!
//! let db = build_database(
//!     Path::new("/data/defect_types"),
//!     Path::new("/data/origs"),
//!     &BuildOptions::default(),
//! )?;
//! db.save_json(Path::new("/data/defect_types/defect_db.json"))?;
//! # Ok::<(), orthodefect::OrthodefectError>(())
//! ```

// Core modules
pub mod boundary;
pub mod catalog;
pub mod crs;
pub mod db;
pub mod error;
pub mod io;
pub mod mapper;
pub mod matcher;
pub mod patch;
pub mod pipeline;

// Re-exports for convenience
pub use boundary::{
    BoundaryExtractor, NarrowMode, StructuringElement, DEFAULT_SIMPLIFY_TOLERANCE,
};
pub use catalog::{build_catalog, Frame, FrameCatalog};
pub use crs::CrsId;
pub use db::{
    DefectDatabase, DefectOccurrence, DelimiterOriginKey, FileEntry, OriginKey, SegmentMatches,
};
pub use error::{OrthodefectError, Result};
pub use io::shapefile::{read_defect_layer, DefectLayer, DefectPolygon};
pub use io::vrt::{read_vrt, VrtDescriptor};
pub use mapper::{crop_rect, to_geo, to_pixel, GeoExtent, PixelRect, PixelShape};
pub use matcher::{
    ContainmentStrategy, FrameMatch, MatchStrategy, OverlayStrategy, StrategyKind,
    UNDEFINED_CATEGORY,
};
pub use patch::Orthoframe;
pub use pipeline::{build_database, BuildOptions};

#[cfg(test)]
mod tests {
    use super::*;
    use geo_types::{LineString, MultiPolygon, Polygon};
    use image::{GrayImage, Luma};
    use std::fs;
    use std::path::Path;

    const VRT: &str = r#"<VRTDataset rasterXSize="100" rasterYSize="100">
  <SRS>EPSG:3301</SRS>
  <GeoTransform>0, 1, 0, 100, 0, -1</GeoTransform>
</VRTDataset>
"#;

    fn write_frame(dir: &Path, id: &str) {
        fs::write(dir.join(format!("{id}.vrt")), VRT).unwrap();
        let mask = GrayImage::from_pixel(100, 100, Luma([255u8]));
        mask.save(dir.join(format!("{id}.mask.png"))).unwrap();
    }

    #[test]
    fn catalog_and_matcher_compose_end_to_end() {
        let dir = tempfile::tempdir().unwrap();
        write_frame(dir.path(), "20190417_075700_LD5-000");

        let catalog = build_catalog(dir.path(), &BoundaryExtractor::default()).unwrap();
        assert_eq!(catalog.frames.len(), 1);

        let defect = DefectPolygon {
            category: Some("crack".to_string()),
            geometry: MultiPolygon::new(vec![Polygon::new(
                LineString::from(vec![
                    (40.0, 40.0),
                    (60.0, 40.0),
                    (60.0, 60.0),
                    (40.0, 60.0),
                    (40.0, 40.0),
                ]),
                vec![],
            )]),
        };

        let matches = OverlayStrategy.run(&catalog, &[defect]);
        assert_eq!(matches.len(), 1);
        assert_eq!(matches[0].frame_id, "20190417_075700_LD5-000");

        let db = DefectDatabase::consolidate(
            dir.path().into(),
            dir.path().into(),
            vec![SegmentMatches {
                segment: catalog.segment.clone(),
                crs: catalog.crs.clone(),
                matches,
            }],
            &DelimiterOriginKey::default(),
        )
        .unwrap();

        let entry = db.get_file_entry("20190417_075700_LD5-000").unwrap();
        assert_eq!(entry.origin, "20190417_075700_LD5");
        assert_eq!(entry.defects.len(), 1);
        assert_eq!(entry.defects[0].0, "crack");
    }
}
