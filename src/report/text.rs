use chrono::{DateTime, Local};

use crate::error::Result;
use crate::merico::AnalysisKind;
use crate::models::{ranked, ClassifiedDataset};
use crate::report::ReportRenderer;

const RULE_WIDTH: usize = 80;
const TOP_TYPES: usize = 10;

/// Plain-text run summary, also printed at the end of `analyze`.
pub struct TextReport;

impl ReportRenderer for TextReport {
    fn name(&self) -> &str {
        "text"
    }

    fn file_name(&self, kind: AnalysisKind) -> String {
        format!("{}_report.txt", kind.file_prefix())
    }

    fn render(
        &self,
        kind: AnalysisKind,
        dataset: &ClassifiedDataset,
        generated_at: DateTime<Local>,
    ) -> Result<String> {
        let rule = "=".repeat(RULE_WIDTH);
        let summary = dataset.summary();
        let mut report = Vec::new();

        report.push(rule.clone());
        report.push(format!("Merico {} Analysis Report", kind.title()));
        report.push(rule.clone());
        report.push(format!("Generated: {}", generated_at.format("%Y-%m-%d %H:%M:%S")));
        report.push(String::new());

        report.push("## Overview".to_string());
        report.push(format!("- Total projects: {}", summary.total_projects));
        report.push(format!("- Successful projects: {}", summary.successful_projects));
        report.push(format!("- Failed projects: {}", summary.failed_projects));
        report.push(format!("- Total functions: {}", summary.total_function_count));
        report.push(String::new());

        report.push("## By severity".to_string());
        for (severity, count) in ranked(dataset.by_severity()) {
            report.push(format!("- {}: {}", severity, count));
        }
        report.push(String::new());

        report.push(format!("## By type (top {})", TOP_TYPES));
        for (name, count) in ranked(dataset.by_type()).into_iter().take(TOP_TYPES) {
            report.push(format!("- {}: {}", name, count));
        }
        report.push(String::new());

        if !dataset.errors().is_empty() {
            report.push("## Failed projects".to_string());
            for error in dataset.errors() {
                report.push(format!("- {}: [{}] {}", error.repo_id, error.error_kind, error.message));
            }
            report.push(String::new());
        }

        report.push(rule);
        Ok(report.join("\n"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::classify;
    use crate::models::{ErrorKind, FetchOutcome};

    #[test]
    fn test_failed_projects_listed_with_reason() {
        let dataset = classify(&[FetchOutcome::Failure {
            repo_id: "B".to_string(),
            error_kind: ErrorKind::Http(500),
            message: "HTTP 500 Internal Server Error".to_string(),
            attempts_made: 3,
        }]);

        let report = TextReport
            .render(AnalysisKind::Duplicate, &dataset, Local::now())
            .unwrap();

        assert!(report.contains("Merico Duplicated Functions Analysis Report"));
        assert!(report.contains("- Failed projects: 1"));
        assert!(report.contains("- B: [Http500] HTTP 500 Internal Server Error"));
    }
}
