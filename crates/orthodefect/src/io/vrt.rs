//! Minimal GDAL virtual-raster (`.vrt`) descriptor reader.
//!
//! The matching phase never opens the pixel raster; it only needs the
//! frame's geographic bounds, pixel dimensions and declared CRS, all of
//! which live in the VRT sidecar: the `rasterXSize`/`rasterYSize` root
//! attributes, the six-coefficient `<GeoTransform>` affine and the `<SRS>`
//! well-known text.

use std::fs;
use std::path::{Path, PathBuf};

use crate::crs::CrsId;
use crate::error::{OrthodefectError, Result};
use crate::mapper::{GeoExtent, PixelShape};

/// Per-frame raster bound metadata read from a `.vrt` sidecar.
#[derive(Debug, Clone, PartialEq)]
pub struct VrtDescriptor {
    pub shape: PixelShape,
    pub extent: GeoExtent,
    pub crs: CrsId,
}

pub fn read_vrt(path: &Path) -> Result<VrtDescriptor> {
    let text = fs::read_to_string(path)?;
    parse_vrt(&text, path)
}

fn malformed(path: &Path, reason: impl Into<String>) -> OrthodefectError {
    OrthodefectError::MalformedDescriptor {
        path: PathBuf::from(path),
        reason: reason.into(),
    }
}

fn parse_vrt(text: &str, path: &Path) -> Result<VrtDescriptor> {
    let doc = roxmltree::Document::parse(text)?;
    let root = doc.root_element();

    if root.tag_name().name() != "VRTDataset" {
        return Err(malformed(path, "root element is not VRTDataset"));
    }

    let shape = match (root.attribute("rasterXSize"), root.attribute("rasterYSize")) {
        (Some(xs), Some(ys)) => {
            let width: u32 = xs
                .trim()
                .parse()
                .map_err(|_| malformed(path, "unparseable rasterXSize"))?;
            let height: u32 = ys
                .trim()
                .parse()
                .map_err(|_| malformed(path, "unparseable rasterYSize"))?;
            PixelShape { height, width }
        }
        // Conventional square frame when the descriptor omits its size.
        _ => PixelShape::default(),
    };

    let transform_text = root
        .descendants()
        .find(|n| n.has_tag_name("GeoTransform"))
        .and_then(|n| n.text())
        .ok_or_else(|| malformed(path, "missing GeoTransform"))?;

    let coeffs: Vec<f64> = transform_text
        .split(',')
        .map(|part| part.trim().parse::<f64>())
        .collect::<std::result::Result<_, _>>()
        .map_err(|_| malformed(path, "unparseable GeoTransform coefficient"))?;
    let coeffs: [f64; 6] = coeffs
        .try_into()
        .map_err(|_| malformed(path, "GeoTransform must have 6 coefficients"))?;

    let extent = extent_from_geotransform(&coeffs, shape)?;

    let crs = root
        .descendants()
        .find(|n| n.has_tag_name("SRS"))
        .and_then(|n| n.text())
        .map(CrsId::from_srs_text)
        .unwrap_or_else(CrsId::unknown);

    Ok(VrtDescriptor { shape, extent, crs })
}

/// Bounds of the full raster under the GDAL affine geotransform. Handles
/// south-up or rotated transforms by sorting the projected corners.
fn extent_from_geotransform(gt: &[f64; 6], shape: PixelShape) -> Result<GeoExtent> {
    let w = f64::from(shape.width);
    let h = f64::from(shape.height);

    let x0 = gt[0];
    let y0 = gt[3];
    let x1 = gt[0] + gt[1] * w + gt[2] * h;
    let y1 = gt[3] + gt[4] * w + gt[5] * h;

    GeoExtent::new(x0.min(x1), x0.max(x1), y0.min(y1), y0.max(y1))
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"<VRTDataset rasterXSize="4096" rasterYSize="4096">
  <SRS>PROJCS["Estonian Coordinate System of 1997",UNIT["metre",1],AUTHORITY["EPSG","3301"]]</SRS>
  <GeoTransform>  6.5840000000000000e+05,  5.0000000000000000e-02,  0.0000000000000000e+00,  6.4740000000000000e+06,  0.0000000000000000e+00, -5.0000000000000000e-02</GeoTransform>
  <VRTRasterBand dataType="Byte" band="1">
    <SimpleSource>
      <SourceFilename relativeToVRT="1">frame.jpg</SourceFilename>
    </SimpleSource>
  </VRTRasterBand>
</VRTDataset>
"#;

    #[test]
    fn parses_shape_extent_and_crs() {
        let desc = parse_vrt(SAMPLE, Path::new("frame.vrt")).unwrap();

        assert_eq!(desc.shape, PixelShape {
            height: 4096,
            width: 4096,
        });
        assert_eq!(desc.crs, CrsId::from_srs_text("EPSG:3301"));

        let e = desc.extent;
        assert!((e.xmin - 658_400.0).abs() < 1e-6);
        assert!((e.xmax - 658_604.8).abs() < 1e-6);
        assert!((e.ymax - 6_474_000.0).abs() < 1e-6);
        assert!((e.ymin - 6_473_795.2).abs() < 1e-6);
    }

    #[test]
    fn missing_geotransform_is_malformed() {
        let xml = r#"<VRTDataset rasterXSize="16" rasterYSize="16"></VRTDataset>"#;
        let err = parse_vrt(xml, Path::new("bad.vrt")).unwrap_err();
        assert!(matches!(err, OrthodefectError::MalformedDescriptor { .. }));
    }

    #[test]
    fn zero_resolution_is_an_invalid_extent() {
        let xml = r#"<VRTDataset rasterXSize="16" rasterYSize="16">
  <GeoTransform>0, 0, 0, 0, 0, 0</GeoTransform>
</VRTDataset>"#;
        let err = parse_vrt(xml, Path::new("flat.vrt")).unwrap_err();
        assert!(matches!(err, OrthodefectError::InvalidExtent { .. }));
    }

    #[test]
    fn missing_srs_reads_as_unknown_crs() {
        let xml = r#"<VRTDataset rasterXSize="16" rasterYSize="16">
  <GeoTransform>0, 1, 0, 16, 0, -1</GeoTransform>
</VRTDataset>"#;
        let desc = parse_vrt(xml, Path::new("nosrs.vrt")).unwrap();
        assert!(desc.crs.is_unknown());
    }

    #[test]
    fn reads_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("frame.vrt");
        fs::write(&path, SAMPLE).unwrap();

        let desc = read_vrt(&path).unwrap();
        assert_eq!(desc.crs, CrsId::from_srs_text("EPSG:3301"));
    }
}
