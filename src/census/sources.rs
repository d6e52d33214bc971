//! The four ACS tables joined onto the ZCTA layer.

use anyhow::Result;
use std::path::Path;

use crate::census::table::{CensusTable, ColumnSpec, Coercion, TableSpec, load_census_table};
use crate::metrics::{percent_of, round1};

/// S1903: median income in the past 12 months.
pub const INCOME: TableSpec = TableSpec {
    dataset: "income",
    columns: &[ColumnSpec {
        source: "S1903_C03_015E",
        name: "Median_Household_Income",
        coercion: Coercion::Income,
    }],
};

/// DP02: selected social characteristics.
pub const EDUCATION: TableSpec = TableSpec {
    dataset: "education",
    columns: &[ColumnSpec::numeric(
        "DP02_0068E",
        "Bachelors_Degree_or_Higher",
    )],
};

/// DP05: demographic and housing estimates.
pub const DEMOGRAPHICS: TableSpec = TableSpec {
    dataset: "demographics",
    columns: &[
        ColumnSpec::numeric("DP05_0001E", "Total_Population"),
        ColumnSpec::numeric("DP05_0010E", "Population_25_to_34"),
        ColumnSpec::numeric("DP05_0011E", "Population_35_to_44"),
        ColumnSpec::numeric("DP05_0037E", "White_Population"),
        ColumnSpec::numeric("DP05_0047E", "Asian_Population"),
    ],
};

/// DP04: selected housing characteristics.
pub const HOUSING: TableSpec = TableSpec {
    dataset: "housing",
    columns: &[
        ColumnSpec::numeric("DP04_0089E", "Median_Home_Value"),
        ColumnSpec::numeric("DP04_0134E", "Median_Gross_Rent"),
    ],
};

/// Demographic columns carried onto the layer. The two age bands are
/// only inputs to `Population_25_to_44`.
pub const DEMOGRAPHIC_OUTPUT: &[&str] = &[
    "Total_Population",
    "Population_25_to_44",
    "Percent_25_to_44",
    "White_Population",
    "Asian_Population",
    "Percent_White",
    "Percent_Asian",
];

pub fn load_income(path: &Path) -> Result<CensusTable> {
    load_census_table(path, &INCOME)
}

pub fn load_education(path: &Path) -> Result<CensusTable> {
    load_census_table(path, &EDUCATION)
}

pub fn load_housing(path: &Path) -> Result<CensusTable> {
    load_census_table(path, &HOUSING)
}

/// Loads DP05 and adds the combined 25-44 band plus the share columns.
pub fn load_demographics(path: &Path) -> Result<CensusTable> {
    let table = load_census_table(path, &DEMOGRAPHICS)?;
    derive_demographics(table)
}

pub fn derive_demographics(mut table: CensusTable) -> Result<CensusTable> {
    table.derive("Population_25_to_44", |row| {
        Some(row.get("Population_25_to_34")? + row.get("Population_35_to_44")?)
    })?;

    for (name, part) in [
        ("Percent_25_to_44", "Population_25_to_44"),
        ("Percent_White", "White_Population"),
        ("Percent_Asian", "Asian_Population"),
    ] {
        table.derive(name, |row| {
            percent_of(row.get(part)?, row.get("Total_Population")?).map(round1)
        })?;
    }

    table.select(DEMOGRAPHIC_OUTPUT)
}
