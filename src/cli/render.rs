//! Rendering pipeline results as tables.

use serde_json::Value;

use crate::cli::table::Table;
use crate::tiers::FallbackOutcome;

/// Render a cell. Strings print bare, null prints as `-`, everything else as JSON.
pub fn cell(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => "-".to_string(),
        other => other.to_string(),
    }
}

/// Tabulate an arbitrary JSON payload.
///
/// An array of objects becomes one row per element with the first element's
/// keys as columns. An object becomes KEY/VALUE rows. Anything else is a
/// single VALUE row.
pub fn value_table(value: &Value) -> Table {
    match value {
        Value::Array(items) if !items.is_empty() && items.iter().all(Value::is_object) => {
            let columns: Vec<String> = items[0]
                .as_object()
                .map(|first| first.keys().cloned().collect())
                .unwrap_or_default();

            let mut table = Table::new(columns.iter().map(|c| c.to_uppercase()));
            for item in items {
                table.row(columns.iter().map(|c| cell(item.get(c).unwrap_or(&Value::Null))));
            }
            table
        }
        Value::Object(map) => {
            let mut table = Table::new(["KEY", "VALUE"]);
            for (key, value) in map {
                table.row([key.clone(), cell(value)]);
            }
            table
        }
        other => {
            let mut table = Table::new(["VALUE"]);
            table.row([cell(other)]);
            table
        }
    }
}

/// Per-tier trail of a failed pipeline call.
pub fn outcome_table(outcomes: &[FallbackOutcome]) -> Table {
    let mut table = Table::new(["TIER", "STATUS", "LATENCY", "ERROR"]);
    for outcome in outcomes {
        table.row([
            outcome.tier.clone(),
            outcome.status.as_str().to_string(),
            format!("{}ms", outcome.latency_ms),
            outcome.error.clone().unwrap_or_else(|| "-".to_string()),
        ]);
    }
    table
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tiers::TierStatus;
    use serde_json::json;
    use std::time::Duration;

    #[test]
    fn test_object_renders_key_value_rows() {
        let table = value_table(&json!({"theme": "dark", "density": 2, "beta": null}));
        let rendered = table.to_string();
        assert!(rendered.starts_with("KEY"));
        assert!(rendered.contains("theme    dark"));
        assert!(rendered.contains("density  2"));
        assert!(rendered.contains("beta     -"));
    }

    #[test]
    fn test_array_of_objects_renders_columns() {
        let table = value_table(&json!([
            {"name": "control", "configured": true},
            {"name": "store", "configured": false},
        ]));
        assert_eq!(table.len(), 2);
        let rendered = table.to_string();
        // serde_json maps are ordered by key.
        assert!(rendered.starts_with("CONFIGURED  NAME"));
        assert!(rendered.contains("false       store"));
    }

    #[test]
    fn test_scalar_renders_single_value() {
        assert_eq!(value_table(&json!("ok")).to_string().lines().nth(2), Some("ok"));
    }

    #[test]
    fn test_outcome_trail() {
        let outcomes = vec![
            FallbackOutcome::new("control", TierStatus::TimedOut, Duration::from_millis(5000), Some("timed out".into())),
            FallbackOutcome::skipped("workflow"),
        ];
        let rendered = outcome_table(&outcomes).to_string();
        let lines: Vec<&str> = rendered.lines().collect();
        assert_eq!(lines.len(), 4);
        assert!(lines[2].starts_with("control   timed_out  5000ms"));
        assert!(lines[3].ends_with("0ms      -"));
    }
}
