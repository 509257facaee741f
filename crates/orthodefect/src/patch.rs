//! Pixel patch extraction from loaded orthoframe rasters.
//!
//! The preview stage loads the full raster once per frame and crops the
//! pixel region under a defect's geographic bounding box for display.

use std::path::Path;

use image::RgbImage;

use crate::error::{OrthodefectError, Result};
use crate::mapper::{self, GeoExtent, PixelShape};

/// Raster file naming convention, co-located with the frame descriptor.
pub const ORTHOFRAME_RASTER_EXT: &str = ".jpg";

/// One orthoframe with its raster content loaded.
#[derive(Debug, Clone, PartialEq)]
pub struct Orthoframe {
    pub id: String,
    pub extent: GeoExtent,
    pub shape: PixelShape,
    content: RgbImage,
}

impl Orthoframe {
    /// Load `<id>.jpg` from `dir`.
    pub fn load(dir: &Path, id: &str, extent: GeoExtent) -> Result<Self> {
        let path = dir.join(format!("{id}{ORTHOFRAME_RASTER_EXT}"));
        if !path.exists() {
            return Err(OrthodefectError::MissingRaster { path });
        }
        let content = image::open(&path)?.to_rgb8();
        Ok(Self::from_image(id.to_string(), content, extent))
    }

    /// Wrap an already-decoded raster.
    pub fn from_image(id: String, content: RgbImage, extent: GeoExtent) -> Self {
        let shape = PixelShape {
            height: content.height(),
            width: content.width(),
        };
        Orthoframe {
            id,
            extent,
            shape,
            content,
        }
    }

    pub fn content(&self) -> &RgbImage {
        &self.content
    }

    /// Crop the pixel region under a geographic bounding box.
    ///
    /// Fails with [`OrthodefectError::EmptyCrop`] when the mapped rectangle
    /// has zero width or height; callers show a placeholder instead.
    pub fn crop(&self, bbox: &GeoExtent) -> Result<RgbImage> {
        let rect = mapper::crop_rect(&self.extent, self.shape, bbox);
        if rect.width == 0 || rect.height == 0 {
            return Err(OrthodefectError::EmptyCrop {
                frame: self.id.clone(),
            });
        }

        let view = image::imageops::crop_imm(&self.content, rect.x, rect.y, rect.width, rect.height);
        Ok(view.to_image())
    }
}
