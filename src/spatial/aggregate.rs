//! Per-ZCTA spatial aggregation.
//!
//! Every metric is a brute-force pass over all features for every zone:
//! O(zones x features) per layer.

use anyhow::{Result, bail};
use geo::{
    Area, Centroid, EuclideanDistance, Geometry, Intersects, LineString, MultiLineString,
    MultiPolygon, Point,
};
use tracing::debug;

use crate::layer::ZctaLayer;
use crate::spatial::features::FeatureLayer;
use crate::spatial::projection::LambertConformal;

/// A ZCTA polygon in geographic coordinates plus its projected copy.
#[derive(Debug, Clone)]
pub struct Zone {
    pub zcta: Option<String>,
    pub geographic: Option<MultiPolygon<f64>>,
    pub projected: Option<MultiPolygon<f64>>,
}

impl Zone {
    pub fn new(
        zcta: Option<String>,
        geographic: Option<MultiPolygon<f64>>,
        proj: &LambertConformal,
    ) -> Self {
        let projected = geographic.as_ref().map(|g| proj.project_geometry(g));
        Self {
            zcta,
            geographic,
            projected,
        }
    }

    /// Planar area of the projected polygon in square kilometres.
    pub fn area_sqkm(&self) -> Option<f64> {
        self.projected
            .as_ref()
            .map(|p| p.unsigned_area() / 1_000_000.0)
    }

    /// Centroid of the geographic polygon, in longitude/latitude.
    pub fn geographic_centroid(&self) -> Option<Point<f64>> {
        self.geographic.as_ref().and_then(|p| p.centroid())
    }
}

/// Builds zones from the layer. Records without geometry become empty
/// zones; non-polygonal geometry is an error.
pub fn zones_from_layer(layer: &ZctaLayer, proj: &LambertConformal) -> Result<Vec<Zone>> {
    layer
        .records
        .iter()
        .enumerate()
        .map(|(i, record)| {
            let polygon = match &record.geometry {
                None => None,
                Some(Geometry::Polygon(p)) => Some(MultiPolygon::new(vec![p.clone()])),
                Some(Geometry::MultiPolygon(mp)) => Some(mp.clone()),
                Some(_) => bail!(
                    "record {i} (ZCTA {}) is not a polygon",
                    record.zcta.as_deref().unwrap_or("?")
                ),
            };
            Ok(Zone::new(record.zcta.clone(), polygon, proj))
        })
        .collect()
}

pub fn areas(zones: &[Zone]) -> Vec<Option<f64>> {
    zones.iter().map(Zone::area_sqkm).collect()
}

/// Number of features intersecting each zone. A feature with several
/// parts counts once per zone.
#[tracing::instrument(skip_all, fields(layer = %features.name, zones = zones.len(), features = features.len()))]
pub fn count_intersecting(zones: &[Zone], features: &FeatureLayer) -> Vec<usize> {
    zones
        .iter()
        .map(|zone| match &zone.geographic {
            Some(polygon) => features
                .geometries
                .iter()
                .filter(|f| f.intersects(polygon))
                .count(),
            None => 0,
        })
        .collect()
}

/// Flattens route geometries into line strings.
pub fn route_lines(routes: &FeatureLayer) -> Result<Vec<LineString<f64>>> {
    let mut lines = Vec::new();
    for (i, geometry) in routes.geometries.iter().enumerate() {
        match geometry {
            Geometry::LineString(ls) => lines.push(ls.clone()),
            Geometry::MultiLineString(MultiLineString(parts)) => lines.extend(parts.iter().cloned()),
            Geometry::Line(l) => lines.push(LineString::from(*l)),
            _ => bail!("{} feature {i} is not a line", routes.name),
        }
    }
    Ok(lines)
}

/// Minimum distance from `point` to any of `lines`; `None` without lines.
pub fn nearest_distance(point: &Point<f64>, lines: &[LineString<f64>]) -> Option<f64> {
    lines
        .iter()
        .map(|line| point.euclidean_distance(line))
        .reduce(f64::min)
}

/// Distance in degrees from each zone's geographic centroid to the nearest
/// route, both in WGS84 longitude/latitude.
#[tracing::instrument(skip_all, fields(zones = zones.len(), routes = routes.len()))]
pub fn distance_to_nearest(zones: &[Zone], routes: &[LineString<f64>]) -> Vec<Option<f64>> {
    let total = zones.len();
    zones
        .iter()
        .enumerate()
        .map(|(idx, zone)| {
            if idx % 10 == 0 {
                debug!(processed = idx, total, "Route distance progress");
            }
            zone.geographic_centroid()
                .and_then(|c| nearest_distance(&c, routes))
        })
        .collect()
}
