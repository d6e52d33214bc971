use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Input and output locations for both stages.
///
/// Defaults reproduce the fixed `data/` and `cleaned_data/` layout. A JSON
/// file may override any subset of the fields:
/// ```json
/// {
///   "subway": "/data/nyc/subway-stations.geojson",
///   "final_output": "out/nyc_zcta.geojson"
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PipelineConfig {
    pub zcta_polygons: PathBuf,
    pub income: PathBuf,
    pub demographics: PathBuf,
    pub housing: PathBuf,
    pub education: PathBuf,
    pub merged_output: PathBuf,
    pub subway: PathBuf,
    pub parking: PathBuf,
    pub truck_routes: PathBuf,
    pub crime: PathBuf,
    pub final_output: PathBuf,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            zcta_polygons: "data/MODZCTA_20250409.geojson".into(),
            income: "data/ACSST5Y2023.S1903_2025-04-09T104535/ACSST5Y2023.S1903-Data.csv".into(),
            demographics: "data/ACSDP5Y2023.DP05_2025-04-09T124250/ACSDP5Y2023.DP05-Data.csv"
                .into(),
            housing: "data/ACSDP5Y2023.DP04_2025-04-09T161430/ACSDP5Y2023.DP04-Data.csv".into(),
            education: "data/ACSDP5Y2023.DP02_2025-04-09T124018/ACSDP5Y2023.DP02-Data.csv".into(),
            merged_output: "cleaned_data/merged_nyc_raw_features.geojson".into(),
            subway: "data/subway-stations.geojson".into(),
            parking: "data/DPR_ParkingLots_001_20250410.csv".into(),
            truck_routes: "data/New_York_City_Truck_Routes_20250410.csv".into(),
            crime: "data/grandlarceny.geojson".into(),
            final_output: "cleaned_data/nyc_ZCTA_raw_features.geojson".into(),
        }
    }
}

impl PipelineConfig {
    /// Loads the config from a JSON file at `path`.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("reading config {}", path.display()))?;
        let config = serde_json::from_str(&content)
            .with_context(|| format!("parsing config {}", path.display()))?;
        Ok(config)
    }

    /// Defaults, or the file at `path` when one is given.
    pub fn load_or_default(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(p) => Self::load(p),
            None => Ok(Self::default()),
        }
    }
}
