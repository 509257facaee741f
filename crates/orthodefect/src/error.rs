use std::path::PathBuf;

use thiserror::Error;

use crate::crs::CrsId;

#[derive(Error, Debug)]
pub enum OrthodefectError {
    #[error("degenerate geographic extent [{xmin}, {xmax}] x [{ymin}, {ymax}]")]
    InvalidExtent {
        xmin: f64,
        xmax: f64,
        ymin: f64,
        ymax: f64,
    },

    #[error("mask has no foreground region, no boundary contour found")]
    NoContourFound,

    #[error("mask image not found: {path}")]
    MissingMask { path: PathBuf },

    #[error("orthoframe raster not found: {path}")]
    MissingRaster { path: PathBuf },

    #[error("CRS mismatch for {context}: expected {expected}, found {found}")]
    CrsMismatch {
        expected: CrsId,
        found: CrsId,
        context: String,
    },

    #[error("crop region for frame {frame} is empty")]
    EmptyCrop { frame: String },

    #[error("no image directory found for segment {segment}")]
    MissingImageDirectory { segment: String },

    #[error("malformed raster descriptor {path}: {reason}")]
    MalformedDescriptor { path: PathBuf, reason: String },

    #[error("failed to load image: {0}")]
    ImageLoad(#[from] image::ImageError),

    #[error("failed to read defect layer: {0}")]
    Shapefile(#[from] shapefile::Error),

    #[error("failed to parse raster descriptor: {0}")]
    DescriptorXml(#[from] roxmltree::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, OrthodefectError>;
