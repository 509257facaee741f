//! Persisted defect database artifact.
//!
//! One JSON document holding the occurrence collection together with the
//! provenance the preview stage needs (shapefile and image tree roots).
//! The artifact is written exactly once, after all matching completes, so
//! a reader never observes a half-built database.

use std::fs;
use std::path::Path;

use crate::db::DefectDatabase;
use crate::error::Result;

impl DefectDatabase {
    pub fn to_json_string(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn save_json(&self, path: &Path) -> Result<()> {
        let json = self.to_json_string()?;
        fs::write(path, json)?;
        Ok(())
    }

    pub fn from_json_string(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn load_json(path: &Path) -> Result<Self> {
        let json = fs::read_to_string(path)?;
        Self::from_json_string(&json)
    }
}
