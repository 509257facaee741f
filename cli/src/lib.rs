use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum DefectCliError {
    #[error(transparent)]
    SerdeError(#[from] serde_json::Error),
    #[error(transparent)]
    TomlDeError(#[from] toml::de::Error),
    #[error(transparent)]
    IoError(#[from] std::io::Error),
    #[error("Unsupported file format. Please use .toml or .json files")]
    UnsupportedFileFormat,
}

/// Database build run description, loadable from a config file.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BuildConfig {
    /// Root directory containing per-segment shapefile folders.
    pub shapefile_root: PathBuf,
    /// Root directory containing per-segment image folders.
    pub image_root: PathBuf,
    /// Where the consolidated database artifact is written.
    pub output: PathBuf,
    /// Matching strategy name; defaults to "overlay".
    #[serde(default)]
    pub strategy: Option<String>,
    /// Narrow the mask boundary inward before matching.
    #[serde(default)]
    pub narrow: bool,
    /// Boundary simplification tolerance in pixel units.
    #[serde(default)]
    pub tolerance: Option<f64>,
    /// Shapefile name inside each segment directory.
    #[serde(default)]
    pub shapefile_name: Option<String>,
    /// Attribute column carrying the defect category.
    #[serde(default)]
    pub category_field: Option<String>,
    /// Optional GeoJSON export path for GIS inspection.
    #[serde(default)]
    pub geojson_output: Option<PathBuf>,
}

impl BuildConfig {
    /// Load a build configuration from a TOML file
    pub fn from_toml_file<P: AsRef<Path>>(path: P) -> Result<Self, DefectCliError> {
        let content = fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    /// Load a build configuration from a TOML string
    pub fn from_toml(content: &str) -> Result<Self, DefectCliError> {
        let config: BuildConfig = toml::from_str(content)?;
        Ok(config)
    }

    /// Load a build configuration from a JSON file
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self, DefectCliError> {
        let content = fs::read_to_string(path)?;
        Self::from_json(&content)
    }

    /// Load a build configuration from a JSON string
    pub fn from_json(content: &str) -> Result<Self, DefectCliError> {
        let config: BuildConfig = serde_json::from_str(content)?;
        Ok(config)
    }

    /// Auto-detect file format and load configuration
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, DefectCliError> {
        let path_ref = path.as_ref();
        match path_ref.extension().and_then(|ext| ext.to_str()) {
            Some("toml") => Self::from_toml_file(path),
            Some("json") => Self::from_json_file(path),
            _ => Err(DefectCliError::UnsupportedFileFormat),
        }
    }
}
