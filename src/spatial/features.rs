//! Auxiliary feature layers: GeoJSON point files and CSV tables with a WKT
//! geometry column. Loaded geometries are always WGS84 longitude/latitude;
//! GeoJSON declaring a NYC state-plane CRS is reprojected on load.

use anyhow::{Context, Result, anyhow, bail};
use geo::Geometry;

use crate::spatial::projection::LambertConformal;
use geojson::{FeatureCollection, GeoJson, JsonObject};
use std::fs::{self, File};
use std::path::Path;
use tracing::{info, warn};
use wkt::TryFromWkt;

/// WKT geometry column in NYC Open Data CSV exports.
pub const WKT_COLUMN: &str = "the_geom";

/// A named set of feature geometries.
#[derive(Debug, Clone, Default)]
pub struct FeatureLayer {
    pub name: String,
    pub geometries: Vec<Geometry<f64>>,
}

impl FeatureLayer {
    pub fn new(name: &str, geometries: Vec<Geometry<f64>>) -> Self {
        Self {
            name: name.to_string(),
            geometries,
        }
    }

    pub fn len(&self) -> usize {
        self.geometries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.geometries.is_empty()
    }
}

/// Reads a GeoJSON feature file, dropping features without geometry.
#[tracing::instrument(skip_all, fields(layer = name, path = %path.display()))]
pub fn read_geojson_features(path: &Path, name: &str) -> Result<FeatureLayer> {
    let text =
        fs::read_to_string(path).with_context(|| format!("reading {name} layer {}", path.display()))?;
    let geojson: GeoJson = text
        .parse()
        .with_context(|| format!("parsing {name} layer {}", path.display()))?;
    features_from_geojson(geojson, name)
        .with_context(|| format!("loading {name} layer {}", path.display()))
}

pub fn features_from_geojson(geojson: GeoJson, name: &str) -> Result<FeatureLayer> {
    let collection: FeatureCollection = match geojson {
        GeoJson::FeatureCollection(fc) => fc,
        GeoJson::Feature(f) => FeatureCollection {
            bbox: None,
            features: vec![f],
            foreign_members: None,
        },
        GeoJson::Geometry(_) => bail!("expected a FeatureCollection, found a bare geometry"),
    };

    let source = source_projection(collection.foreign_members.as_ref())?;

    let total = collection.features.len();
    let mut geometries = collection
        .features
        .into_iter()
        .filter_map(|f| f.geometry)
        .map(Geometry::<f64>::try_from)
        .collect::<Result<Vec<_>, _>>()?;

    if let Some(proj) = source {
        geometries = geometries
            .iter()
            .map(|g| proj.unproject_geometry(g))
            .collect();
        info!(layer = name, features = geometries.len(), "Reprojected to WGS84");
    }

    let dropped = total - geometries.len();
    if dropped > 0 {
        warn!(layer = name, dropped, "Features without geometry dropped");
    }
    info!(layer = name, features = geometries.len(), "Feature layer loaded");

    Ok(FeatureLayer::new(name, geometries))
}

const WGS84_NAMES: &[&str] = &["OGC:1.3:CRS84", "OGC::CRS84", "EPSG:4326", "EPSG::4326"];
const LONG_ISLAND_METRES: &[&str] = &["EPSG:32118", "EPSG::32118"];
const LONG_ISLAND_FEET: &[&str] = &["EPSG:2263", "EPSG::2263"];

/// Resolves a legacy `crs` member. `None` means the layer is already WGS84;
/// a state-plane CRS yields the projection to invert. Any other CRS is an
/// error.
fn source_projection(foreign_members: Option<&JsonObject>) -> Result<Option<LambertConformal>> {
    let Some(crs) = foreign_members.and_then(|m| m.get("crs")) else {
        return Ok(None);
    };
    let crs_name = crs
        .pointer("/properties/name")
        .and_then(|v| v.as_str())
        .ok_or_else(|| anyhow!("unsupported crs member {crs}"))?;
    let named = |names: &[&str]| names.iter().any(|known| crs_name.ends_with(known));

    if named(WGS84_NAMES) {
        Ok(None)
    } else if named(LONG_ISLAND_METRES) {
        Ok(Some(LambertConformal::new_york_long_island()))
    } else if named(LONG_ISLAND_FEET) {
        Ok(Some(LambertConformal::new_york_long_island_ftus()))
    } else {
        bail!("layer CRS {crs_name} is not supported and cannot be reprojected")
    }
}

/// Reads a CSV whose `the_geom` column holds WKT geometries.
#[tracing::instrument(skip_all, fields(layer = name, path = %path.display()))]
pub fn read_wkt_features(path: &Path, name: &str) -> Result<FeatureLayer> {
    let file =
        File::open(path).with_context(|| format!("opening {name} table {}", path.display()))?;
    wkt_features_from_reader(file, name)
        .with_context(|| format!("loading {name} table {}", path.display()))
}

pub fn wkt_features_from_reader<R: std::io::Read>(reader: R, name: &str) -> Result<FeatureLayer> {
    let mut rdr = csv::ReaderBuilder::new().flexible(true).from_reader(reader);

    let geom_idx = rdr
        .headers()?
        .iter()
        .position(|h| h.trim_start_matches('\u{feff}') == WKT_COLUMN)
        .with_context(|| format!("required column {WKT_COLUMN} missing from header"))?;

    let mut geometries = Vec::new();
    for (i, record) in rdr.records().enumerate() {
        let record = record?;
        let raw = record.get(geom_idx).unwrap_or_default();
        let geometry = Geometry::<f64>::try_from_wkt_str(raw)
            .map_err(|e| anyhow!("row {}: invalid WKT geometry: {e}", i + 1))?;
        geometries.push(geometry);
    }

    info!(layer = name, features = geometries.len(), "Feature layer loaded");
    Ok(FeatureLayer::new(name, geometries))
}
