use tracing::info;

use crate::census::table::CensusTable;
use crate::layer::ZctaLayer;

/// Outcome of a left join, for logging.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct JoinReport {
    pub matched: usize,
    pub unmatched: usize,
    pub dropped: usize,
}

/// Left-joins `table` onto the layer by ZCTA key.
///
/// Every record receives every table column: matched records get the
/// table's values, unmatched or unkeyed records get nulls. Table rows
/// with no matching record are dropped. Record order and count never
/// change.
pub fn left_join(layer: &mut ZctaLayer, table: &CensusTable) -> JoinReport {
    let mut report = JoinReport::default();
    let mut used = std::collections::HashSet::new();

    for record in &mut layer.records {
        let row = record.zcta.as_deref().and_then(|z| table.row(z));

        match row {
            Some(values) => {
                report.matched += 1;
                if let Some(z) = &record.zcta {
                    used.insert(z.clone());
                }
                for (column, value) in table.columns().iter().zip(values) {
                    record.set_number(column, *value);
                }
            }
            None => {
                report.unmatched += 1;
                for column in table.columns() {
                    record.set_number(column, None);
                }
            }
        }
    }

    report.dropped = table.len().saturating_sub(used.len());

    info!(
        dataset = %table.dataset,
        matched = report.matched,
        unmatched = report.unmatched,
        dropped = report.dropped,
        "Census table joined"
    );

    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layer::ZctaRecord;
    use geojson::JsonValue;

    fn table() -> CensusTable {
        let mut t = CensusTable::new("income", vec!["Median_Household_Income".to_string()]);
        t.insert("10001".to_string(), vec![Some(96787.0)]);
        t.insert("10002".to_string(), vec![None]);
        t.insert("11111".to_string(), vec![Some(1.0)]);
        t
    }

    fn layer() -> ZctaLayer {
        ZctaLayer {
            records: vec![
                ZctaRecord::new(Some("10001"), None),
                ZctaRecord::new(Some("10002"), None),
                ZctaRecord::new(Some("10003"), None),
                ZctaRecord::new(None, None),
            ],
        }
    }

    #[test]
    fn test_left_join_keeps_every_record_once() {
        let mut layer = layer();
        let report = left_join(&mut layer, &table());

        assert_eq!(layer.len(), 4);
        assert_eq!(
            report,
            JoinReport {
                matched: 2,
                unmatched: 2,
                dropped: 1
            }
        );
        let keys: Vec<_> = layer.records.iter().map(|r| r.zcta.clone()).collect();
        assert_eq!(
            keys,
            vec![
                Some("10001".to_string()),
                Some("10002".to_string()),
                Some("10003".to_string()),
                None
            ]
        );
    }

    #[test]
    fn test_left_join_values_and_nulls() {
        let mut layer = layer();
        left_join(&mut layer, &table());

        assert_eq!(
            layer.column("Median_Household_Income"),
            vec![Some(96787.0), None, None, None]
        );
        for record in &layer.records[1..] {
            assert_eq!(
                record.properties["Median_Household_Income"],
                JsonValue::Null
            );
        }
    }

    #[test]
    fn test_unkeyed_record_never_matches() {
        let mut t = table();
        // a table can never hold an empty key, but make sure a record
        // without one is not matched by accident
        t.insert(String::new(), vec![Some(5.0)]);
        let mut layer = ZctaLayer {
            records: vec![ZctaRecord::new(None, None)],
        };
        let report = left_join(&mut layer, &t);

        assert_eq!(report.matched, 0);
        assert_eq!(layer.records[0].number("Median_Household_Income"), None);
    }
}
