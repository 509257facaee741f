//! Orthoframe boundary extraction from segmentation masks.
//!
//! The usable area of an orthoframe is not its rectangular extent: the
//! camera footprint leaves black borders that the segmentation mask traces.
//! This module turns the mask into a simplified boundary polygon in
//! geographic coordinates. Narrow mode first shrinks the mask inward so
//! that defects merely clipping a neighboring frame's border do not match.

use geo::{Area, Simplify};
use geo_types::{Coord, LineString, Polygon};
use image::GrayImage;
use imageproc::contours::BorderType;
use imageproc::distance_transform::Norm;

use crate::error::{OrthodefectError, Result};
use crate::mapper::{self, GeoExtent, PixelShape};

/// Douglas-Peucker tolerance in pixel units.
pub const DEFAULT_SIMPLIFY_TOLERANCE: f64 = 5.0;

/// Structuring element used by narrow mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StructuringElement {
    /// Square kernel (L-infinity ball).
    #[default]
    Square,
    /// Diamond kernel (L1 ball), the rounder of the two.
    Diamond,
}

impl StructuringElement {
    fn norm(self) -> Norm {
        match self {
            StructuringElement::Square => Norm::LInf,
            StructuringElement::Diamond => Norm::L1,
        }
    }
}

/// Inward mask erosion applied before contour extraction.
///
/// `radius` is deliberately a free parameter; when `None` it defaults to
/// 1/64 of the smaller mask dimension (64 px on a conventional 4096 mask),
/// capped at the erosion limit of 255.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct NarrowMode {
    pub element: StructuringElement,
    pub radius: Option<u8>,
}

impl NarrowMode {
    fn effective_radius(&self, mask: &GrayImage) -> u8 {
        match self.radius {
            Some(r) => r,
            None => {
                let min_dim = mask.width().min(mask.height());
                (min_dim / 64).clamp(1, 255) as u8
            }
        }
    }
}

/// Extracts the simplified geo-space boundary polygon of a mask.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundaryExtractor {
    /// Foreground threshold: pixels strictly above it count as usable area.
    pub threshold: u8,
    /// Polygon simplification tolerance in pixel units.
    pub tolerance: f64,
    pub narrow: Option<NarrowMode>,
}

impl Default for BoundaryExtractor {
    fn default() -> Self {
        BoundaryExtractor {
            threshold: 0,
            tolerance: DEFAULT_SIMPLIFY_TOLERANCE,
            narrow: None,
        }
    }
}

impl BoundaryExtractor {
    pub fn with_narrow(mut self, narrow: NarrowMode) -> Self {
        self.narrow = Some(narrow);
        self
    }

    /// Extract the boundary polygon of `mask` as a closed ring in the
    /// geographic coordinates of `extent`.
    ///
    /// Returns [`OrthodefectError::NoContourFound`] when the (possibly
    /// narrowed) mask has no usable foreground region.
    pub fn extract(&self, mask: &GrayImage, extent: &GeoExtent) -> Result<Polygon<f64>> {
        let mut binary = imageproc::contrast::threshold(mask, self.threshold);

        if let Some(narrow) = &self.narrow {
            let radius = narrow.effective_radius(mask);
            binary = imageproc::morphology::erode(&binary, narrow.element.norm(), radius);
        }

        let outline = largest_outer_contour(&binary).ok_or(OrthodefectError::NoContourFound)?;
        let simplified = outline.simplify(&self.tolerance);
        if simplified.0.len() < 3 {
            return Err(OrthodefectError::NoContourFound);
        }

        let shape = PixelShape {
            height: mask.height(),
            width: mask.width(),
        };

        let ring: Vec<Coord<f64>> = simplified
            .coords()
            .map(|c| {
                let (gx, gy) = mapper::to_geo(extent, shape, (c.x, c.y));
                Coord { x: gx, y: gy }
            })
            .collect();

        // Polygon::new closes the ring.
        Ok(Polygon::new(LineString::new(ring), vec![]))
    }
}

/// Pick the largest outer contour of a binary image, as a pixel-space ring.
fn largest_outer_contour(binary: &GrayImage) -> Option<LineString<f64>> {
    let contours = imageproc::contours::find_contours::<i32>(binary);

    contours
        .into_iter()
        .filter(|c| c.border_type == BorderType::Outer && c.points.len() >= 3)
        .map(|c| {
            let ring: Vec<Coord<f64>> = c
                .points
                .iter()
                .map(|p| Coord {
                    x: f64::from(p.x),
                    y: f64::from(p.y),
                })
                .collect();
            LineString::new(ring)
        })
        .max_by(|a, b| {
            let area_a = Polygon::new(a.clone(), vec![]).unsigned_area();
            let area_b = Polygon::new(b.clone(), vec![]).unsigned_area();
            area_a.total_cmp(&area_b)
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo::BoundingRect;
    use image::Luma;

    fn white_mask(width: u32, height: u32) -> GrayImage {
        GrayImage::from_pixel(width, height, Luma([255u8]))
    }

    fn inset_mask(size: u32, inset: u32) -> GrayImage {
        let mut img = GrayImage::new(size, size);
        for y in inset..size - inset {
            for x in inset..size - inset {
                img.put_pixel(x, y, Luma([255u8]));
            }
        }
        img
    }

    #[test]
    fn white_mask_boundary_spans_the_extent() {
        let extent = GeoExtent::new(0.0, 100.0, 0.0, 100.0).unwrap();
        let mask = white_mask(100, 100);

        let polygon = BoundaryExtractor::default()
            .extract(&mask, &extent)
            .unwrap();
        let bbox = polygon.bounding_rect().unwrap();

        // One geo unit per pixel here, so the simplification tolerance
        // plus the contour sitting on pixel centers bounds the error.
        let slop = DEFAULT_SIMPLIFY_TOLERANCE + 2.0;
        assert!((bbox.min().x - extent.xmin).abs() <= slop);
        assert!((bbox.max().x - extent.xmax).abs() <= slop);
        assert!((bbox.min().y - extent.ymin).abs() <= slop);
        assert!((bbox.max().y - extent.ymax).abs() <= slop);
    }

    #[test]
    fn empty_mask_yields_no_contour() {
        let extent = GeoExtent::new(0.0, 100.0, 0.0, 100.0).unwrap();
        let mask = GrayImage::new(100, 100);

        let err = BoundaryExtractor::default()
            .extract(&mask, &extent)
            .unwrap_err();
        assert!(matches!(err, OrthodefectError::NoContourFound));
    }

    #[test]
    fn narrow_mode_shrinks_the_boundary() {
        let extent = GeoExtent::new(0.0, 100.0, 0.0, 100.0).unwrap();
        let mask = inset_mask(100, 20);

        let full = BoundaryExtractor::default()
            .extract(&mask, &extent)
            .unwrap();
        let narrowed = BoundaryExtractor::default()
            .with_narrow(NarrowMode {
                element: StructuringElement::Square,
                radius: Some(10),
            })
            .extract(&mask, &extent)
            .unwrap();

        assert!(narrowed.unsigned_area() < full.unsigned_area());
    }

    #[test]
    fn largest_region_wins() {
        let extent = GeoExtent::new(0.0, 100.0, 0.0, 100.0).unwrap();

        // A large region plus a small speck far away from it.
        let mut mask = inset_mask(100, 30);
        mask.put_pixel(5, 5, Luma([255u8]));
        mask.put_pixel(5, 6, Luma([255u8]));
        mask.put_pixel(6, 5, Luma([255u8]));
        mask.put_pixel(6, 6, Luma([255u8]));

        let polygon = BoundaryExtractor {
            tolerance: 1.0,
            ..BoundaryExtractor::default()
        }
        .extract(&mask, &extent)
        .unwrap();

        let bbox = polygon.bounding_rect().unwrap();
        // The speck sits near geo (5, 95); the kept boundary must not.
        assert!(bbox.max().y < 80.0);
        assert!(bbox.min().x > 20.0);
    }
}
