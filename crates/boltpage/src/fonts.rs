use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use fontdb::{Database, Family, Query, Weight};
use morph::GlyphRasterizer;

/// Loads `font`, or the system's bold sans-serif when no path is given.
///
/// Returns `Ok(None)` when no path is given and the system has no usable face.
pub fn load_rasterizer(font: Option<&Path>) -> Result<Option<GlyphRasterizer>> {
    if let Some(path) = font {
        let bytes =
            fs::read(path).with_context(|| format!("failed to read font {}", path.display()))?;
        let rasterizer = GlyphRasterizer::from_bytes(&bytes, 0)
            .with_context(|| format!("failed to parse font {}", path.display()))?;
        return Ok(Some(rasterizer));
    }

    let mut db = Database::new();
    db.load_system_fonts();
    tracing::debug!(faces = db.len(), "loaded system fonts");
    let query = Query {
        families: &[Family::SansSerif],
        weight: Weight::BOLD,
        ..Default::default()
    };
    let Some(id) = db.query(&query) else {
        return Ok(None);
    };
    match db.with_face_data(id, GlyphRasterizer::from_bytes) {
        Some(Ok(rasterizer)) => Ok(Some(rasterizer)),
        Some(Err(err)) => {
            tracing::warn!(error = %err, "system font could not be parsed");
            Ok(None)
        }
        None => Ok(None),
    }
}
