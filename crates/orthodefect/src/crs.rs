use std::fmt;

use serde::{Deserialize, Serialize};

/// Normalized coordinate reference system identifier.
///
/// Raster descriptors carry a WKT `<SRS>` block while shapefiles declare
/// their CRS in a `.prj` sidecar; both reduce to the EPSG authority code
/// when one is present, otherwise to the raw SRS text. No reprojection is
/// ever performed, so identity comparison is all the pipeline needs. An
/// unknown CRS only matches other unknowns.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CrsId(Option<String>);

impl CrsId {
    pub fn unknown() -> Self {
        CrsId(None)
    }

    pub fn is_unknown(&self) -> bool {
        self.0.is_none()
    }

    /// Normalize a raw SRS declaration (WKT or `EPSG:nnnn`).
    pub fn from_srs_text(raw: &str) -> Self {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return CrsId(None);
        }
        match extract_epsg(trimmed) {
            Some(code) => CrsId(Some(format!("EPSG:{code}"))),
            None => CrsId(Some(trimmed.to_string())),
        }
    }
}

impl fmt::Display for CrsId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.0 {
            Some(id) => f.write_str(id),
            None => f.write_str("<unknown>"),
        }
    }
}

/// Pull the EPSG code out of a WKT authority clause or an `EPSG:nnnn`
/// shorthand. WKT nests authorities per sub-component; the last clause
/// belongs to the whole CRS.
fn extract_epsg(text: &str) -> Option<u32> {
    const NEEDLE: &str = "AUTHORITY[\"EPSG\",\"";
    if let Some(pos) = text.rfind(NEEDLE) {
        let rest = &text[pos + NEEDLE.len()..];
        let digits: String = rest.chars().take_while(|c| c.is_ascii_digit()).collect();
        return digits.parse().ok();
    }

    let upper = text.to_ascii_uppercase();
    if let Some(rest) = upper.strip_prefix("EPSG:") {
        return rest.trim().parse().ok();
    }

    None
}
