//! GeoJSON export of the consolidated defect database.
//!
//! One feature per defect occurrence with its frame, origin group and
//! category as properties, so the matched records can be inspected in
//! standard GIS tooling alongside the source shapefiles.

use std::fs;
use std::path::Path;

use geojson::{Feature, FeatureCollection, Geometry, Value};

use crate::db::{DefectDatabase, DefectOccurrence};
use crate::error::Result;

fn occurrence_geometry(occ: &DefectOccurrence) -> Geometry {
    let exterior: Vec<Vec<f64>> = occ
        .geometry
        .exterior()
        .coords()
        .map(|c| vec![c.x, c.y])
        .collect();

    let mut rings = vec![exterior];
    for hole in occ.geometry.interiors() {
        rings.push(hole.coords().map(|c| vec![c.x, c.y]).collect());
    }

    Geometry::new(Value::Polygon(rings))
}

impl DefectDatabase {
    pub fn to_geojson(&self) -> FeatureCollection {
        let mut features = Vec::with_capacity(self.occurrences.len());

        for (i, occ) in self.occurrences.iter().enumerate() {
            let mut properties = serde_json::Map::new();
            properties.insert("fn".to_string(), occ.frame_id.clone().into());
            properties.insert("origin".to_string(), occ.origin.clone().into());
            properties.insert("defect_type".to_string(), occ.defect_type.clone().into());

            features.push(Feature {
                bbox: None,
                geometry: Some(occurrence_geometry(occ)),
                id: Some(geojson::feature::Id::Number(serde_json::Number::from(i))),
                properties: Some(properties),
                foreign_members: None,
            });
        }

        let mut foreign_members = serde_json::Map::new();
        foreign_members.insert("crs".to_string(), self.crs.to_string().into());
        foreign_members.insert(
            "occurrence_count".to_string(),
            serde_json::Value::Number(serde_json::Number::from(self.occurrences.len())),
        );

        FeatureCollection {
            bbox: None,
            features,
            foreign_members: Some(foreign_members),
        }
    }

    pub fn to_geojson_string(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(&self.to_geojson())?)
    }

    pub fn save_geojson(&self, path: &Path) -> Result<()> {
        let geojson = self.to_geojson_string()?;
        fs::write(path, geojson)?;
        Ok(())
    }
}
