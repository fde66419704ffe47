use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Column definition from the result set metadata.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AthenaColumn {
    pub name: String,
    /// Athena data type (e.g. "varchar", "bigint", "double").
    pub data_type: String,
}

/// Execution metadata for a completed query.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryMetadata {
    pub query_id: String,
    pub bytes_scanned: u64,
    /// Engine execution time in milliseconds.
    pub execution_time_ms: u64,
    /// Final execution state ("SUCCEEDED", "FAILED", "CANCELLED").
    pub state: String,
    /// Where Athena wrote the CSV result, if reported.
    pub output_location: Option<String>,
}

/// Structured result set.
///
/// `None` cells are SQL NULL. Every row has one cell per column.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AthenaQueryResult {
    pub columns: Vec<AthenaColumn>,
    pub rows: Vec<Vec<Option<String>>>,
    pub metadata: QueryMetadata,
}

/// Athena pricing: $5 per TB scanned.
const DOLLARS_PER_BYTE: f64 = 5.0 / (1024.0 * 1024.0 * 1024.0 * 1024.0);

impl AthenaQueryResult {
    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Zero-based index of a column by name (case-sensitive).
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c.name == name)
    }

    /// Cell at `row` / `col`; `None` when out of range or NULL.
    pub fn get_value(&self, row: usize, col: &str) -> Option<&str> {
        let col_idx = self.column_index(col)?;
        self.rows.get(row)?.get(col_idx)?.as_deref()
    }

    /// Rows as JSON objects keyed by column name. Values stay strings,
    /// NULL becomes `null`.
    pub fn to_json_rows(&self) -> Vec<Value> {
        self.rows
            .iter()
            .map(|row| {
                let obj: Map<String, Value> = self
                    .columns
                    .iter()
                    .zip(row)
                    .map(|(col, cell)| {
                        let v = cell.clone().map(Value::String).unwrap_or(Value::Null);
                        (col.name.clone(), v)
                    })
                    .collect();
                Value::Object(obj)
            })
            .collect()
    }

    /// Estimated cost in USD at $5/TB scanned.
    pub fn cost_estimate_usd(&self) -> f64 {
        self.metadata.bytes_scanned as f64 * DOLLARS_PER_BYTE
    }
}

impl fmt::Display for AthenaQueryResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.columns.is_empty() {
            return write!(f, "(no columns)");
        }

        let cell = |c: &Option<String>| c.as_deref().unwrap_or("NULL").chars().count();
        let mut widths: Vec<usize> = self.columns.iter().map(|c| c.name.chars().count()).collect();
        for row in &self.rows {
            for (w, c) in widths.iter_mut().zip(row) {
                *w = (*w).max(cell(c));
            }
        }

        let names: Vec<&str> = self.columns.iter().map(|c| c.name.as_str()).collect();
        write_line(f, names.iter().copied(), &widths)?;

        let rule: Vec<String> = widths.iter().map(|w| "-".repeat(*w)).collect();
        writeln!(f, "{}", rule.join("-+-"))?;

        for row in &self.rows {
            write_line(f, row.iter().map(|c| c.as_deref().unwrap_or("NULL")), &widths)?;
        }

        writeln!(f)?;
        write!(
            f,
            "{} row(s) | query {} | {:.3} MB scanned | {}ms | ~${:.6}",
            self.rows.len(),
            self.metadata.query_id,
            self.metadata.bytes_scanned as f64 / (1024.0 * 1024.0),
            self.metadata.execution_time_ms,
            self.cost_estimate_usd(),
        )
    }
}

fn write_line<'a>(
    f: &mut fmt::Formatter<'_>,
    cells: impl Iterator<Item = &'a str>,
    widths: &[usize],
) -> fmt::Result {
    let padded: Vec<String> = cells
        .zip(widths)
        .map(|(c, w)| format!("{c:<w$}"))
        .collect();
    writeln!(f, "{}", padded.join(" | ").trim_end())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn people() -> AthenaQueryResult {
        AthenaQueryResult {
            columns: vec![
                AthenaColumn {
                    name: "id".into(),
                    data_type: "bigint".into(),
                },
                AthenaColumn {
                    name: "name".into(),
                    data_type: "varchar".into(),
                },
            ],
            rows: vec![
                vec![Some("1".into()), Some("ada".into())],
                vec![Some("2".into()), None],
            ],
            metadata: QueryMetadata {
                query_id: "abc-123".into(),
                bytes_scanned: 1_073_741_824, // 1 GB
                execution_time_ms: 4200,
                state: "SUCCEEDED".into(),
                output_location: Some("s3://lake/athena-results/abc-123.csv".into()),
            },
        }
    }

    #[test]
    fn accessors() {
        let r = people();
        assert_eq!(r.row_count(), 2);
        assert_eq!(r.column_count(), 2);
        assert_eq!(r.column_index("name"), Some(1));
        assert_eq!(r.column_index("missing"), None);
        assert_eq!(r.get_value(0, "name"), Some("ada"));
        assert_eq!(r.get_value(1, "name"), None);
        assert_eq!(r.get_value(9, "id"), None);
    }

    #[test]
    fn cost_is_five_dollars_per_tb() {
        let cost = people().cost_estimate_usd();
        assert!((cost - 5.0 / 1024.0).abs() < 1e-9, "got {cost}");
    }

    #[test]
    fn json_rows_keep_nulls() {
        let rows = people().to_json_rows();
        assert_eq!(rows[0], serde_json::json!({"id": "1", "name": "ada"}));
        assert_eq!(rows[1], serde_json::json!({"id": "2", "name": null}));
    }

    #[test]
    fn display_aligns_columns() {
        let out = people().to_string();
        let lines: Vec<&str> = out.lines().collect();
        assert_eq!(lines[0], "id | name");
        assert_eq!(lines[1], "---+-----");
        assert_eq!(lines[2], "1  | ada");
        assert_eq!(lines[3], "2  | NULL");
        assert!(out.contains("2 row(s)"));
        assert!(out.contains("abc-123"));
        assert!(out.contains("4200ms"));
    }

    #[test]
    fn display_without_columns() {
        let mut r = people();
        r.columns.clear();
        r.rows.clear();
        assert_eq!(r.to_string(), "(no columns)");
    }
}
