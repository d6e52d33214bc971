//! Output formatting and persistence for ZCTA layers.
//!
//! Supports GeoJSON layer files, a flat CSV attribute export, and JSON
//! summaries.

use anyhow::{Context, Result};
use geojson::{GeoJson, JsonValue};
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::Path;
use tracing::{debug, info};

use crate::layer::ZctaLayer;
use crate::stats::LayerSummary;

fn ensure_parent_dir(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .with_context(|| format!("creating output directory {}", parent.display()))?;
    }
    Ok(())
}

/// Writes the layer as a GeoJSON FeatureCollection, creating the parent
/// directory if needed.
#[tracing::instrument(skip_all, fields(path = %path.display(), records = layer.len()))]
pub fn write_layer(path: &Path, layer: &ZctaLayer) -> Result<()> {
    ensure_parent_dir(path)?;

    let file = File::create(path).with_context(|| format!("creating {}", path.display()))?;
    let mut writer = BufWriter::new(file);
    let geojson = GeoJson::from(layer.to_feature_collection());
    serde_json::to_writer(&mut writer, &geojson)
        .with_context(|| format!("writing {}", path.display()))?;
    writer.flush()?;

    info!("Layer written");
    Ok(())
}

/// Writes every attribute column (no geometry) as CSV. Missing values are
/// empty cells.
#[tracing::instrument(skip_all, fields(path = %path.display(), records = layer.len()))]
pub fn export_csv(path: &Path, layer: &ZctaLayer) -> Result<()> {
    ensure_parent_dir(path)?;

    let columns = layer.column_names();
    debug!(columns = columns.len(), "Exporting attribute table");

    let mut writer = csv::Writer::from_path(path)
        .with_context(|| format!("creating {}", path.display()))?;
    writer.write_record(&columns)?;

    for record in &layer.records {
        let row = columns
            .iter()
            .map(|c| cell(record.properties.get(c.as_str())));
        writer.write_record(row)?;
    }
    writer.flush()?;

    info!("Attribute table exported");
    Ok(())
}

fn cell(value: Option<&JsonValue>) -> String {
    match value {
        None | Some(JsonValue::Null) => String::new(),
        Some(JsonValue::String(s)) => s.clone(),
        Some(other) => other.to_string(),
    }
}

/// Prints a summary as pretty JSON on stdout.
pub fn print_json(summary: &LayerSummary) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(summary)?);
    Ok(())
}
