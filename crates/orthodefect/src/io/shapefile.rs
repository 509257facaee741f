//! Defect vector layer input.
//!
//! One ESRI shapefile per road segment, polygon geometry plus a single
//! categorical attribute column holding the defect type. The layer's CRS
//! is declared in the `.prj` sidecar; a missing sidecar reads as unknown.

use std::fs;
use std::path::Path;

use geo_types::MultiPolygon;
use tracing::warn;

use crate::crs::CrsId;
use crate::error::Result;

/// Attribute column carrying the defect category.
pub const DEFAULT_CATEGORY_FIELD: &str = "type";

/// One annotated defect polygon as read from the vector layer.
///
/// `category` is `None` when the attribute is null or blank; normalization
/// to the sentinel label happens after spatial matching, not here.
#[derive(Debug, Clone, PartialEq)]
pub struct DefectPolygon {
    pub category: Option<String>,
    pub geometry: MultiPolygon<f64>,
}

/// A whole defect layer: its CRS and its polygons, in file order.
#[derive(Debug, Clone, PartialEq)]
pub struct DefectLayer {
    pub crs: CrsId,
    pub defects: Vec<DefectPolygon>,
}

pub fn read_defect_layer(path: &Path, category_field: &str) -> Result<DefectLayer> {
    let crs = read_prj_sidecar(path);

    let mut reader = shapefile::Reader::from_path(path)?;
    let mut defects = Vec::new();

    for pair in reader.iter_shapes_and_records() {
        let (shape, record) = pair?;

        let geometry = match shape {
            shapefile::Shape::Polygon(polygon) => MultiPolygon::<f64>::from(polygon),
            shapefile::Shape::NullShape => continue,
            other => {
                warn!(
                    shape_type = %other.shapetype(),
                    "skipping non-polygon defect geometry"
                );
                continue;
            }
        };

        let category = match record.get(category_field) {
            Some(shapefile::dbase::FieldValue::Character(value)) => value
                .as_ref()
                .map(|s| s.trim())
                .filter(|s| !s.is_empty())
                .map(str::to_string),
            _ => None,
        };

        defects.push(DefectPolygon { category, geometry });
    }

    Ok(DefectLayer { crs, defects })
}

fn read_prj_sidecar(shp_path: &Path) -> CrsId {
    let prj = shp_path.with_extension("prj");
    match fs::read_to_string(&prj) {
        Ok(text) => CrsId::from_srs_text(&text),
        Err(_) => {
            warn!(path = %prj.display(), "no .prj sidecar, defect layer CRS is unknown");
            CrsId::unknown()
        }
    }
}
