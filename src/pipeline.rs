//! The two pipeline stages.
//!
//! Stage A merges the ACS tables onto the ZCTA polygon layer. Stage B reads
//! the merged layer back and adds the spatial metrics.

use anyhow::Result;
use std::path::{Path, PathBuf};
use tracing::info;

use crate::census::{left_join, sources};
use crate::config::PipelineConfig;
use crate::layer::{MODZCTA_COLUMN, ZCTA_COLUMN, ZctaLayer, read_layer};
use crate::metrics::{density, inverse, min_max_normalize};
use crate::output::{export_csv, write_layer};
use crate::spatial::aggregate::{areas, route_lines};
use crate::spatial::features::{read_geojson_features, read_wkt_features};
use crate::spatial::{LambertConformal, count_intersecting, distance_to_nearest, zones_from_layer};
use crate::stats::LayerSummary;

/// Columns rescaled to `[0, 1]` when normalisation is requested.
pub const NORMALIZED_COLUMNS: &[&str] = &[
    "subway_density",
    "parking_density",
    "crime_density_inverse",
    "distance_to_truck_route_inverse",
    "rent_inverse",
    "home_value_inverse",
];

/// Options for Stage B beyond the input paths.
#[derive(Debug, Clone, Default)]
pub struct AggregateOptions {
    pub normalize: bool,
    pub csv_export: Option<PathBuf>,
}

/// Stage A: polygon layer plus the four ACS tables, written to
/// `merged_output`.
#[tracing::instrument(skip_all, fields(output = %config.merged_output.display()))]
pub fn merge_features(config: &PipelineConfig) -> Result<ZctaLayer> {
    let mut layer = read_layer(&config.zcta_polygons, MODZCTA_COLUMN)?;

    left_join(&mut layer, &sources::load_income(&config.income)?);
    left_join(&mut layer, &sources::load_education(&config.education)?);
    left_join(&mut layer, &sources::load_demographics(&config.demographics)?);
    left_join(&mut layer, &sources::load_housing(&config.housing)?);

    write_layer(&config.merged_output, &layer)?;
    info!(records = layer.len(), "Feature merge complete");
    Ok(layer)
}

/// Stage B: reads `merged_output`, adds area, counts, densities, route
/// distance and inverse scores, and writes `final_output`.
#[tracing::instrument(skip_all, fields(input = %config.merged_output.display(), output = %config.final_output.display()))]
pub fn aggregate_features(config: &PipelineConfig, options: &AggregateOptions) -> Result<ZctaLayer> {
    let mut layer = read_layer(&config.merged_output, ZCTA_COLUMN)?;
    add_spatial_metrics(&mut layer, config, options)?;

    write_layer(&config.final_output, &layer)?;
    if let Some(csv_path) = &options.csv_export {
        export_csv(csv_path, &layer)?;
    }
    info!(records = layer.len(), "Spatial aggregation complete");
    Ok(layer)
}

/// Adds every Stage B column to `layer` in place.
pub fn add_spatial_metrics(
    layer: &mut ZctaLayer,
    config: &PipelineConfig,
    options: &AggregateOptions,
) -> Result<()> {
    let proj = LambertConformal::new_york_long_island();
    let zones = zones_from_layer(layer, &proj)?;

    let area = areas(&zones);
    layer.set_column("area_sqkm", &area)?;

    let subway = read_geojson_features(&config.subway, "subway")?;
    add_count_and_density(
        layer,
        &area,
        &count_intersecting(&zones, &subway),
        "subway_count",
        "subway_density",
    )?;

    let parking = read_wkt_features(&config.parking, "parking")?;
    add_count_and_density(
        layer,
        &area,
        &count_intersecting(&zones, &parking),
        "parking_lot_count",
        "parking_density",
    )?;

    let routes = read_wkt_features(&config.truck_routes, "truck_routes")?;
    info!(routes = routes.len(), "Truck routes loaded");
    let distance = distance_to_nearest(&zones, &route_lines(&routes)?);
    layer.set_column("distance_to_truck_route", &distance)?;

    let crime = read_geojson_features(&config.crime, "crime")?;
    let crime_density = add_count_and_density(
        layer,
        &area,
        &count_intersecting(&zones, &crime),
        "crime_count",
        "crime_density",
    )?;

    // lower is better for all four
    let rent = layer.column("Median_Gross_Rent");
    let home_value = layer.column("Median_Home_Value");
    layer.set_column("crime_density_inverse", &inverse(&crime_density))?;
    layer.set_column("distance_to_truck_route_inverse", &inverse(&distance))?;
    layer.set_column("rent_inverse", &inverse(&rent))?;
    layer.set_column("home_value_inverse", &inverse(&home_value))?;

    if options.normalize {
        for column in NORMALIZED_COLUMNS {
            let normalized = min_max_normalize(&layer.column(column));
            layer.set_column(&format!("{column}_normalized"), &normalized)?;
        }
    }

    Ok(())
}

fn add_count_and_density(
    layer: &mut ZctaLayer,
    area: &[Option<f64>],
    counts: &[usize],
    count_column: &str,
    density_column: &str,
) -> Result<Vec<Option<f64>>> {
    let densities: Vec<Option<f64>> = counts
        .iter()
        .zip(area)
        .map(|(&count, &a)| density(count, a))
        .collect();

    layer.set_counts(count_column, counts)?;
    layer.set_column(density_column, &densities)?;

    info!(
        column = count_column,
        total = counts.iter().sum::<usize>(),
        "Features counted"
    );
    Ok(densities)
}

/// Runs Stage A then Stage B.
pub fn run_all(config: &PipelineConfig, options: &AggregateOptions) -> Result<ZctaLayer> {
    merge_features(config)?;
    aggregate_features(config, options)
}

/// Loads any pipeline output and summarises its numeric columns.
pub fn summarize(path: &Path) -> Result<LayerSummary> {
    let layer = read_layer(path, ZCTA_COLUMN)?;
    Ok(LayerSummary::from_layer(&path.display().to_string(), &layer))
}
