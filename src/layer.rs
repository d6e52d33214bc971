//! The working ZCTA table: one GeoJSON feature per ZCTA with an ordered
//! attribute map.

use anyhow::{Context, Result, bail};
use geo::Geometry;
use geojson::{Feature, FeatureCollection, GeoJson, JsonObject, JsonValue};
use std::fs;
use std::path::Path;
use tracing::{debug, info};

/// Attribute holding the normalised ZCTA key.
pub const ZCTA_COLUMN: &str = "ZCTA";

/// Key property of the NYC modified-ZCTA polygon layer.
pub const MODZCTA_COLUMN: &str = "modzcta";

/// A single ZCTA feature.
#[derive(Debug, Clone, PartialEq)]
pub struct ZctaRecord {
    pub zcta: Option<String>,
    pub geometry: Option<Geometry<f64>>,
    pub properties: JsonObject,
}

impl ZctaRecord {
    pub fn new(zcta: Option<&str>, geometry: Option<Geometry<f64>>) -> Self {
        let mut record = Self {
            zcta: None,
            geometry,
            properties: JsonObject::new(),
        };
        record.set_zcta(zcta.map(str::to_string));
        record
    }

    /// Sets the key and mirrors it into the `ZCTA` attribute.
    pub fn set_zcta(&mut self, zcta: Option<String>) {
        let value = zcta.clone().map(JsonValue::String).unwrap_or(JsonValue::Null);
        self.properties.insert(ZCTA_COLUMN.to_string(), value);
        self.zcta = zcta;
    }

    /// Numeric attribute, or `None` when absent, null, or not a number.
    pub fn number(&self, column: &str) -> Option<f64> {
        self.properties.get(column).and_then(JsonValue::as_f64)
    }

    /// Stores a number; missing and non-finite values are written as null.
    pub fn set_number(&mut self, column: &str, value: Option<f64>) {
        let json = value
            .and_then(serde_json::Number::from_f64)
            .map(JsonValue::Number)
            .unwrap_or(JsonValue::Null);
        self.properties.insert(column.to_string(), json);
    }

    pub fn set_count(&mut self, column: &str, count: usize) {
        self.properties
            .insert(column.to_string(), JsonValue::from(count as u64));
    }
}

/// Ordered collection of ZCTA records.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ZctaLayer {
    pub records: Vec<ZctaRecord>,
}

impl ZctaLayer {
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Values of a numeric column, in record order.
    pub fn column(&self, column: &str) -> Vec<Option<f64>> {
        self.records.iter().map(|r| r.number(column)).collect()
    }

    /// Writes one value per record into `column`.
    pub fn set_column(&mut self, column: &str, values: &[Option<f64>]) -> Result<()> {
        if values.len() != self.records.len() {
            bail!(
                "column {column} has {} values for {} records",
                values.len(),
                self.records.len()
            );
        }
        for (record, value) in self.records.iter_mut().zip(values) {
            record.set_number(column, *value);
        }
        Ok(())
    }

    pub fn set_counts(&mut self, column: &str, counts: &[usize]) -> Result<()> {
        if counts.len() != self.records.len() {
            bail!(
                "column {column} has {} values for {} records",
                counts.len(),
                self.records.len()
            );
        }
        for (record, count) in self.records.iter_mut().zip(counts) {
            record.set_count(column, *count);
        }
        Ok(())
    }

    /// Attribute names in first-seen order across all records.
    pub fn column_names(&self) -> Vec<String> {
        let mut names: Vec<String> = Vec::new();
        for record in &self.records {
            for key in record.properties.keys() {
                if !names.iter().any(|n| n == key) {
                    names.push(key.clone());
                }
            }
        }
        names
    }

    /// Builds a layer from a GeoJSON document, reading each record's key
    /// from `key_column`.
    pub fn from_geojson(geojson: GeoJson, key_column: &str) -> Result<Self> {
        let collection = match geojson {
            GeoJson::FeatureCollection(fc) => fc,
            GeoJson::Feature(f) => FeatureCollection {
                bbox: None,
                features: vec![f],
                foreign_members: None,
            },
            GeoJson::Geometry(_) => bail!("expected a FeatureCollection, found a bare geometry"),
        };

        let records = collection
            .features
            .into_iter()
            .enumerate()
            .map(|(i, feature)| {
                record_from_feature(feature, key_column)
                    .with_context(|| format!("feature {i} has an unsupported geometry"))
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Self { records })
    }

    pub fn to_feature_collection(&self) -> FeatureCollection {
        let features = self
            .records
            .iter()
            .map(|record| Feature {
                bbox: None,
                geometry: record
                    .geometry
                    .as_ref()
                    .map(|g| geojson::Geometry::new(geojson::Value::from(g))),
                id: None,
                properties: Some(record.properties.clone()),
                foreign_members: None,
            })
            .collect();

        FeatureCollection {
            bbox: None,
            features,
            foreign_members: None,
        }
    }
}

fn record_from_feature(feature: Feature, key_column: &str) -> Result<ZctaRecord> {
    let geometry = feature
        .geometry
        .map(Geometry::<f64>::try_from)
        .transpose()?;

    let properties = feature.properties.unwrap_or_default();
    let zcta = properties.get(key_column).and_then(normalize_key);

    let mut record = ZctaRecord {
        zcta: None,
        geometry,
        properties,
    };
    record.set_zcta(zcta);
    Ok(record)
}

/// Stringifies a key property. Only bare digit strings (or non-negative
/// integers) are valid ZCTA codes.
pub fn normalize_key(value: &JsonValue) -> Option<String> {
    let key = match value {
        JsonValue::String(s) => s.trim().to_string(),
        JsonValue::Number(n) => n.as_u64()?.to_string(),
        _ => return None,
    };
    if !key.is_empty() && key.chars().all(|c| c.is_ascii_digit()) {
        Some(key)
    } else {
        None
    }
}

/// Reads a GeoJSON layer from disk.
#[tracing::instrument(skip_all, fields(path = %path.display(), key_column = %key_column))]
pub fn read_layer(path: &Path, key_column: &str) -> Result<ZctaLayer> {
    let text =
        fs::read_to_string(path).with_context(|| format!("reading layer {}", path.display()))?;
    let geojson: GeoJson = text
        .parse()
        .with_context(|| format!("parsing GeoJSON {}", path.display()))?;
    let layer = ZctaLayer::from_geojson(geojson, key_column)
        .with_context(|| format!("loading layer {}", path.display()))?;

    let keyed = layer.records.iter().filter(|r| r.zcta.is_some()).count();
    debug!(keyed, unkeyed = layer.len() - keyed, "Layer keys normalised");
    info!(records = layer.len(), "Layer loaded");

    Ok(layer)
}
