//! Loading of ACS "Data.csv" exports into keyed numeric tables.

use anyhow::{Context, Result, bail};
use std::collections::HashMap;
use std::fs::File;
use std::path::Path;
use tracing::{debug, info, warn};

use crate::census::label::{coerce_income, coerce_numeric, extract_zcta};

/// Label column every ACS export carries.
pub const LABEL_COLUMN: &str = "NAME";

/// How a raw cell is turned into a number.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Coercion {
    Numeric,
    Income,
}

impl Coercion {
    fn apply(self, raw: &str) -> Option<f64> {
        match self {
            Coercion::Numeric => coerce_numeric(raw),
            Coercion::Income => coerce_income(raw),
        }
    }
}

/// One raw ACS column and the name it is published under.
#[derive(Debug, Clone, Copy)]
pub struct ColumnSpec {
    pub source: &'static str,
    pub name: &'static str,
    pub coercion: Coercion,
}

impl ColumnSpec {
    pub const fn numeric(source: &'static str, name: &'static str) -> Self {
        Self {
            source,
            name,
            coercion: Coercion::Numeric,
        }
    }
}

/// Which columns to pull out of an ACS table.
#[derive(Debug, Clone, Copy)]
pub struct TableSpec {
    pub dataset: &'static str,
    pub columns: &'static [ColumnSpec],
}

/// A Census table narrowed to its renamed numeric columns, keyed by ZCTA.
#[derive(Debug, Clone, Default)]
pub struct CensusTable {
    pub dataset: String,
    columns: Vec<String>,
    rows: HashMap<String, Vec<Option<f64>>>,
}

impl CensusTable {
    pub fn new(dataset: &str, columns: Vec<String>) -> Self {
        Self {
            dataset: dataset.to_string(),
            columns,
            rows: HashMap::new(),
        }
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Inserts a row unless the key is already present. Returns whether the
    /// row was kept.
    pub fn insert(&mut self, zcta: String, values: Vec<Option<f64>>) -> bool {
        debug_assert_eq!(values.len(), self.columns.len());
        if self.rows.contains_key(&zcta) {
            return false;
        }
        self.rows.insert(zcta, values);
        true
    }

    pub fn row(&self, zcta: &str) -> Option<&[Option<f64>]> {
        self.rows.get(zcta).map(Vec::as_slice)
    }

    pub fn value(&self, zcta: &str, column: &str) -> Option<f64> {
        let idx = self.column_index(column)?;
        self.rows.get(zcta).and_then(|row| row[idx])
    }

    fn column_index(&self, column: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == column)
    }

    /// Appends a column computed from each row's existing values.
    pub fn derive<F>(&mut self, name: &str, f: F) -> Result<()>
    where
        F: Fn(&RowView<'_>) -> Option<f64>,
    {
        if self.column_index(name).is_some() {
            bail!("column {name} already exists in {}", self.dataset);
        }
        let columns = self.columns.clone();
        for values in self.rows.values_mut() {
            let derived = f(&RowView {
                columns: &columns,
                values: values.as_slice(),
            });
            values.push(derived);
        }
        self.columns.push(name.to_string());
        Ok(())
    }

    /// Keeps only `names`, in that order.
    pub fn select(&self, names: &[&str]) -> Result<CensusTable> {
        let indices = names
            .iter()
            .map(|name| {
                self.column_index(name)
                    .with_context(|| format!("column {name} not found in {}", self.dataset))
            })
            .collect::<Result<Vec<_>>>()?;

        let rows = self
            .rows
            .iter()
            .map(|(zcta, values)| (zcta.clone(), indices.iter().map(|&i| values[i]).collect()))
            .collect();

        Ok(CensusTable {
            dataset: self.dataset.clone(),
            columns: names.iter().map(|n| n.to_string()).collect(),
            rows,
        })
    }
}

/// Read access to a single row by column name, used by [`CensusTable::derive`].
pub struct RowView<'a> {
    columns: &'a [String],
    values: &'a [Option<f64>],
}

impl RowView<'_> {
    pub fn get(&self, column: &str) -> Option<f64> {
        self.columns
            .iter()
            .position(|c| c == column)
            .and_then(|i| self.values[i])
    }
}

/// Loads an ACS export, skipping the description row that follows the
/// header. Rows whose label carries no ZCTA code are dropped; for repeated
/// codes the first row wins.
#[tracing::instrument(skip_all, fields(dataset = spec.dataset, path = %path.display()))]
pub fn load_census_table(path: &Path, spec: &TableSpec) -> Result<CensusTable> {
    let file = File::open(path)
        .with_context(|| format!("opening {} table {}", spec.dataset, path.display()))?;
    read_census_table(file, spec)
        .with_context(|| format!("reading {} table {}", spec.dataset, path.display()))
}

/// Same as [`load_census_table`] over any reader.
pub fn read_census_table<R: std::io::Read>(reader: R, spec: &TableSpec) -> Result<CensusTable> {
    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(reader);

    let headers: Vec<String> = rdr
        .headers()?
        .iter()
        .map(|h| h.trim_start_matches('\u{feff}').to_string())
        .collect();

    let find = |name: &str| -> Result<usize> {
        headers
            .iter()
            .position(|h| h == name)
            .with_context(|| format!("required column {name} missing from header"))
    };

    let label_idx = find(LABEL_COLUMN)?;
    let value_idx = spec
        .columns
        .iter()
        .map(|c| find(c.source))
        .collect::<Result<Vec<_>>>()?;

    let mut table = CensusTable::new(
        spec.dataset,
        spec.columns.iter().map(|c| c.name.to_string()).collect(),
    );

    let mut unlabeled = 0usize;
    let mut duplicates = 0usize;

    // first data row holds the column descriptions
    for (line, record) in rdr.records().enumerate().skip(1) {
        let record = record?;

        let Some(zcta) = record.get(label_idx).and_then(extract_zcta) else {
            unlabeled += 1;
            continue;
        };

        let values = spec
            .columns
            .iter()
            .zip(&value_idx)
            .map(|(col, &idx)| record.get(idx).and_then(|raw| col.coercion.apply(raw)))
            .collect();

        if !table.insert(zcta.clone(), values) {
            duplicates += 1;
            warn!(zcta = %zcta, line = line + 2, "Duplicate ZCTA row ignored");
        }
    }

    if unlabeled > 0 {
        debug!(unlabeled, "Rows without a ZCTA label dropped");
    }

    info!(
        rows = table.len(),
        unlabeled, duplicates, "Census table loaded"
    );

    Ok(table)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SPEC: TableSpec = TableSpec {
        dataset: "test",
        columns: &[
            ColumnSpec {
                source: "S1903_C03_015E",
                name: "Median_Household_Income",
                coercion: Coercion::Income,
            },
            ColumnSpec::numeric("S1903_C01_001E", "Households"),
        ],
    };

    const CSV: &str = "\
GEO_ID,NAME,S1903_C01_001E,S1903_C03_015E
Geography,Geographic Area Name,Estimate!!Number!!HOUSEHOLD INCOME,Estimate!!Median income (dollars)
860Z200US10001,ZCTA5 10001,12000,96787
860Z200US10002,ZCTA5 10002,33000,250,000+
860Z200US10003,ZCTA5 10003,-,(X)
0100000US,United States,1000,75000
";

    fn quoted(csv: &str) -> String {
        // the top-coded cell contains a comma and is quoted in real exports
        csv.replace("250,000+", "\"250,000+\"")
    }

    #[test]
    fn test_read_skips_description_row_and_unlabeled_rows() {
        let table = read_census_table(quoted(CSV).as_bytes(), &SPEC).unwrap();

        assert_eq!(table.len(), 3);
        assert!(table.row("Geographic Area Name").is_none());
        assert_eq!(
            table.columns(),
            &["Median_Household_Income".to_string(), "Households".to_string()]
        );
    }

    #[test]
    fn test_read_coerces_values() {
        let table = read_census_table(quoted(CSV).as_bytes(), &SPEC).unwrap();

        assert_eq!(table.value("10001", "Median_Household_Income"), Some(96787.0));
        assert_eq!(table.value("10002", "Median_Household_Income"), Some(250000.0));
        assert_eq!(table.value("10003", "Median_Household_Income"), None);
        assert_eq!(table.value("10003", "Households"), None);
        assert_eq!(table.value("10001", "Households"), Some(12000.0));
    }

    #[test]
    fn test_read_missing_column_is_an_error() {
        let csv = "GEO_ID,NAME\nGeography,Geographic Area Name\nx,ZCTA5 10001\n";
        let err = read_census_table(csv.as_bytes(), &SPEC).unwrap_err();
        assert!(err.to_string().contains("S1903_C03_015E"));
    }

    #[test]
    fn test_read_keeps_first_duplicate() {
        let csv = "\
NAME,S1903_C03_015E,S1903_C01_001E
desc,desc,desc
ZCTA5 10001,100,1
ZCTA5 10001,200,2
";
        let table = read_census_table(csv.as_bytes(), &SPEC).unwrap();
        assert_eq!(table.len(), 1);
        assert_eq!(table.value("10001", "Median_Household_Income"), Some(100.0));
    }

    #[test]
    fn test_derive_and_select() {
        let mut table = read_census_table(quoted(CSV).as_bytes(), &SPEC).unwrap();
        table
            .derive("Income_per_Household", |row| {
                Some(row.get("Median_Household_Income")? / row.get("Households")?)
            })
            .unwrap();

        let narrowed = table.select(&["Income_per_Household"]).unwrap();
        assert_eq!(narrowed.columns(), &["Income_per_Household".to_string()]);
        assert_eq!(
            narrowed.value("10002", "Income_per_Household"),
            Some(250000.0 / 33000.0)
        );
        assert_eq!(narrowed.value("10003", "Income_per_Household"), None);

        assert!(table.select(&["nope"]).is_err());
    }

    #[test]
    fn test_load_census_table_missing_file() {
        let err = load_census_table(Path::new("does/not/exist.csv"), &SPEC).unwrap_err();
        assert!(err.to_string().contains("opening test table"));
    }
}
