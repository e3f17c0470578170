use std::collections::BTreeSet;

use chrono::{DateTime, Local};
use serde_json::Value;

use crate::error::Result;
use crate::merico::AnalysisKind;
use crate::models::{ClassifiedDataset, FunctionRecord};
use crate::report::ReportRenderer;

const BOM: &str = "\u{feff}";
const FIXED_COLUMNS: [&str; 4] = ["repo_id", "severity", "type", "rule"];

pub struct CsvReport;

impl ReportRenderer for CsvReport {
    fn name(&self) -> &str {
        "csv"
    }

    fn file_name(&self, kind: AnalysisKind) -> String {
        format!("{}_export.csv", kind.file_prefix())
    }

    fn render(
        &self,
        _kind: AnalysisKind,
        dataset: &ClassifiedDataset,
        _generated_at: DateTime<Local>,
    ) -> Result<String> {
        let records = dataset.all_records();
        // Typed columns first, then every extra key seen in the batch, sorted
        let extra_columns: BTreeSet<&str> = records
            .iter()
            .flat_map(|record| record.extra.keys().map(String::as_str))
            .filter(|key| !FIXED_COLUMNS.contains(key))
            .collect();

        // BOM so spreadsheet tools pick UTF-8
        let mut output = String::from(BOM);
        let header: Vec<&str> = FIXED_COLUMNS.iter().copied().chain(extra_columns.iter().copied()).collect();
        push_row(&mut output, header.iter().map(|h| h.to_string()));

        for record in records {
            push_row(&mut output, row(record, &extra_columns));
        }

        Ok(output)
    }
}

fn row<'a>(record: &'a FunctionRecord, extra_columns: &'a BTreeSet<&'a str>) -> impl Iterator<Item = String> + 'a {
    // Untyped values under a fixed column name (e.g. a numeric `type`) sit in
    // extra; show them in that column rather than dropping them
    let typed = |value: Option<String>, key: &str| {
        value
            .or_else(|| record.extra.get(key).map(cell_text))
            .unwrap_or_default()
    };
    let fixed = [
        record.repo_id.clone(),
        typed(record.severity.as_ref().map(|s| s.to_string()), "severity"),
        typed(record.kind.clone(), "type"),
        typed(record.rule.clone(), "rule"),
    ];
    // Records without the key get an empty cell
    let extra = extra_columns
        .iter()
        .map(move |key| record.extra.get(*key).map(cell_text).unwrap_or_default());

    fixed.into_iter().chain(extra)
}

fn cell_text(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn push_row(output: &mut String, cells: impl Iterator<Item = String>) {
    let line: Vec<String> = cells.map(|cell| quote(&cell)).collect();
    output.push_str(&line.join(","));
    output.push_str("\r\n");
}

fn quote(cell: &str) -> String {
    if cell.contains([',', '"', '\r', '\n']) {
        format!("\"{}\"", cell.replace('"', "\"\""))
    } else {
        cell.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::classify;
    use crate::models::FetchOutcome;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn record(repo_id: &str, value: Value) -> FunctionRecord {
        FunctionRecord::from_api_object(repo_id, value.as_object().cloned().unwrap())
    }

    #[test]
    fn test_columns_are_union_of_extra_keys() {
        let dataset = classify(&[FetchOutcome::Success {
            repo_id: "A".to_string(),
            records: vec![
                record("A", json!({ "severity": "high", "name": "parse, fast", "line": 7 })),
                record("A", json!({ "type": "method", "file": "say \"hi\".rs" })),
            ],
            page_count: 1,
        }]);

        let output = CsvReport
            .render(AnalysisKind::Uncommented, &dataset, Local::now())
            .unwrap();

        assert!(output.starts_with(BOM));
        let lines: Vec<&str> = output[BOM.len()..].split("\r\n").collect();
        assert_eq!(
            lines,
            vec![
                "repo_id,severity,type,rule,file,line,name",
                "A,high,,,,7,\"parse, fast\"",
                "A,,method,,\"say \"\"hi\"\".rs\",,",
                "",
            ]
        );
    }

    #[test]
    fn test_untyped_attribute_values_land_in_their_column() {
        let dataset = classify(&[FetchOutcome::Success {
            repo_id: "A".to_string(),
            records: vec![record("A", json!({ "severity": "Major", "type": 7 }))],
            page_count: 1,
        }]);

        let output = CsvReport
            .render(AnalysisKind::Uncommented, &dataset, Local::now())
            .unwrap();

        assert_eq!(
            output,
            format!("{}repo_id,severity,type,rule\r\nA,Major,7,\r\n", BOM)
        );
    }

    #[test]
    fn test_empty_dataset_has_header_only() {
        let output = CsvReport
            .render(AnalysisKind::Duplicate, &classify(&[]), Local::now())
            .unwrap();
        assert_eq!(output, format!("{}repo_id,severity,type,rule\r\n", BOM));
    }
}
