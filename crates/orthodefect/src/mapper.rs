//! Pixel <-> geographic coordinate mapping for a single orthoframe.
//!
//! An orthoframe covers a rectangular geographic extent with a square pixel
//! grid whose row 0 sits at the geographic top (maximum y). The forward
//! mapping normalizes, flips the y axis and floors to integer pixel indices;
//! the inverse is the exact continuous algebraic inverse without the floor.

use geo::BoundingRect;
use geo_types::Polygon;
use serde::{Deserialize, Serialize};

use crate::error::{OrthodefectError, Result};

/// Geographic bounding rectangle of one orthoframe.
///
/// Invariant: all values finite, `xmin < xmax` and `ymin < ymax`. Enforced
/// by [`GeoExtent::new`]; the mapping functions rely on it.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoExtent {
    pub xmin: f64,
    pub xmax: f64,
    pub ymin: f64,
    pub ymax: f64,
}

impl GeoExtent {
    pub fn new(xmin: f64, xmax: f64, ymin: f64, ymax: f64) -> Result<Self> {
        let finite =
            xmin.is_finite() && xmax.is_finite() && ymin.is_finite() && ymax.is_finite();
        if !finite || xmin >= xmax || ymin >= ymax {
            return Err(OrthodefectError::InvalidExtent {
                xmin,
                xmax,
                ymin,
                ymax,
            });
        }
        Ok(GeoExtent {
            xmin,
            xmax,
            ymin,
            ymax,
        })
    }

    /// Build from `(left, bottom, right, top)` raster bounds.
    pub fn from_bounds(left: f64, bottom: f64, right: f64, top: f64) -> Result<Self> {
        Self::new(left, right, bottom, top)
    }

    /// Axis-aligned bounding extent of a polygon.
    pub fn of_polygon(polygon: &Polygon<f64>) -> Result<Self> {
        let rect = polygon
            .bounding_rect()
            .ok_or(OrthodefectError::InvalidExtent {
                xmin: f64::NAN,
                xmax: f64::NAN,
                ymin: f64::NAN,
                ymax: f64::NAN,
            })?;
        Self::new(rect.min().x, rect.max().x, rect.min().y, rect.max().y)
    }

    pub fn width(&self) -> f64 {
        self.xmax - self.xmin
    }

    pub fn height(&self) -> f64 {
        self.ymax - self.ymin
    }
}

/// Pixel dimensions of an orthoframe raster.
///
/// Frames are square by convention; when the raster itself is never opened
/// (the matching phase reads only descriptors) the conventional 4096x4096
/// grid applies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PixelShape {
    pub height: u32,
    pub width: u32,
}

impl Default for PixelShape {
    fn default() -> Self {
        PixelShape {
            height: 4096,
            width: 4096,
        }
    }
}

/// Non-negative pixel crop rectangle, clamped to the image.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PixelRect {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

/// Map a geographic point onto integer pixel indices.
///
/// Indices may fall outside `[0, width) x [0, height)` when the point lies
/// outside the extent; callers clamp where that matters.
pub fn to_pixel(extent: &GeoExtent, shape: PixelShape, geo_xy: (f64, f64)) -> (i64, i64) {
    let (x, y) = geo_xy;

    let bx = (x - extent.xmin) / extent.width();
    let by = 1.0 - (y - extent.ymin) / extent.height();

    let px = (f64::from(shape.width) * bx).floor() as i64;
    let py = (f64::from(shape.height) * by).floor() as i64;

    (px, py)
}

/// Continuous inverse of [`to_pixel`]: pixel coordinates back to geographic.
pub fn to_geo(extent: &GeoExtent, shape: PixelShape, pixel_xy: (f64, f64)) -> (f64, f64) {
    let (px, py) = pixel_xy;

    let gx = extent.xmin + extent.width() * (px / f64::from(shape.width));
    let gy = extent.ymin + extent.height() * (1.0 - py / f64::from(shape.height));

    (gx, gy)
}

/// Map a geographic bounding box onto a pixel crop rectangle.
///
/// The y flip inverts corner ordering, so the two mapped corners are
/// re-sorted before the rectangle is formed; the result is clamped to the
/// image and never has negative size.
pub fn crop_rect(extent: &GeoExtent, shape: PixelShape, bbox: &GeoExtent) -> PixelRect {
    let (x1, y1) = to_pixel(extent, shape, (bbox.xmin, bbox.ymin));
    let (x2, y2) = to_pixel(extent, shape, (bbox.xmax, bbox.ymax));

    let (x1, x2) = if x1 > x2 { (x2, x1) } else { (x1, x2) };
    let (y1, y2) = if y1 > y2 { (y2, y1) } else { (y1, y2) };

    let x1 = x1.clamp(0, i64::from(shape.width));
    let x2 = x2.clamp(0, i64::from(shape.width));
    let y1 = y1.clamp(0, i64::from(shape.height));
    let y2 = y2.clamp(0, i64::from(shape.height));

    PixelRect {
        x: x1 as u32,
        y: y1 as u32,
        width: (x2 - x1) as u32,
        height: (y2 - y1) as u32,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn extent_100() -> GeoExtent {
        GeoExtent::new(0.0, 100.0, 0.0, 100.0).unwrap()
    }

    fn shape_100() -> PixelShape {
        PixelShape {
            height: 100,
            width: 100,
        }
    }

    #[test]
    fn bottom_left_geo_maps_to_bottom_pixel_row() {
        let (px, py) = to_pixel(&extent_100(), shape_100(), (0.0, 0.0));
        assert_eq!(px, 0);
        assert_eq!(py, 100);
    }

    #[test]
    fn top_geo_maps_to_pixel_row_zero() {
        let (px, py) = to_pixel(&extent_100(), shape_100(), (50.0, 100.0));
        assert_eq!(px, 50);
        assert_eq!(py, 0);
    }

    #[test]
    fn round_trip_within_one_pixel() {
        let extent = GeoExtent::new(658_400.0, 658_604.8, 6_473_795.2, 6_474_000.0).unwrap();
        let shape = PixelShape::default();

        for &(px, py) in &[(0i64, 0i64), (1, 1), (17, 4095), (2048, 2048), (4095, 0)] {
            let geo = to_geo(&extent, shape, (px as f64, py as f64));
            let (rx, ry) = to_pixel(&extent, shape, geo);
            assert!((rx - px).abs() <= 1, "x: {rx} vs {px}");
            assert!((ry - py).abs() <= 1, "y: {ry} vs {py}");
        }
    }

    #[test]
    fn degenerate_extent_is_rejected() {
        let err = GeoExtent::new(5.0, 5.0, 0.0, 10.0).unwrap_err();
        assert!(matches!(err, OrthodefectError::InvalidExtent { .. }));

        let err = GeoExtent::new(0.0, 10.0, 7.0, 7.0).unwrap_err();
        assert!(matches!(err, OrthodefectError::InvalidExtent { .. }));

        assert!(GeoExtent::new(0.0, f64::NAN, 0.0, 1.0).is_err());
        assert!(GeoExtent::new(0.0, f64::INFINITY, 0.0, 1.0).is_err());
    }

    #[test]
    fn crop_rect_never_negative() {
        let extent = extent_100();
        let shape = shape_100();

        // The y flip inverts corner order; the rect must still be well formed.
        let bbox = GeoExtent::new(10.0, 20.0, 30.0, 40.0).unwrap();
        let rect = crop_rect(&extent, shape, &bbox);
        assert_eq!(rect, PixelRect {
            x: 10,
            y: 60,
            width: 10,
            height: 10,
        });
    }

    #[test]
    fn crop_rect_clamps_to_image() {
        let extent = extent_100();
        let shape = shape_100();

        let bbox = GeoExtent::new(-50.0, 50.0, -50.0, 50.0).unwrap();
        let rect = crop_rect(&extent, shape, &bbox);
        assert_eq!(rect.x, 0);
        assert_eq!(rect.width, 50);
        assert_eq!(rect.y, 50);
        assert_eq!(rect.height, 50);
    }
}
