use chrono::{DateTime, Local};

use crate::error::Result;
use crate::merico::AnalysisKind;
use crate::models::{ranked, Breakdown, ClassifiedDataset};
use crate::report::{ReportRenderer, TOP_N};

pub struct MarkdownReport;

impl ReportRenderer for MarkdownReport {
    fn name(&self) -> &str {
        "markdown"
    }

    fn file_name(&self, kind: AnalysisKind) -> String {
        format!("{}_report.md", kind.file_prefix())
    }

    fn render(
        &self,
        kind: AnalysisKind,
        dataset: &ClassifiedDataset,
        generated_at: DateTime<Local>,
    ) -> Result<String> {
        let summary = dataset.summary();
        let mut output = String::new();

        output.push_str(&format!("# Merico {} Report\n\n", kind.title()));

        output.push_str("## Summary\n\n");
        output.push_str("| Metric | Value |\n|--------|-------|\n");
        output.push_str(&format!("| Total Projects | {} |\n", summary.total_projects));
        output.push_str(&format!("| Successful Projects | {} |\n", summary.successful_projects));
        output.push_str(&format!("| Failed Projects | {} |\n", summary.failed_projects));
        output.push_str(&format!("| Total Functions | {} |\n", summary.total_function_count));
        if let Some(rate) = summary.success_rate() {
            output.push_str(&format!("| Success Rate | {:.1}% |\n", rate));
        }
        if summary.successful_projects > 0 {
            output.push_str(&format!(
                "| Functions per Project | {:.1} |\n",
                summary.total_function_count as f64 / summary.successful_projects as f64
            ));
        }

        push_breakdown(&mut output, "By Severity", "Severity", dataset.by_severity(), None);
        push_breakdown(&mut output, "By Type", "Type", dataset.by_type(), Some(TOP_N));
        push_breakdown(&mut output, "By Rule", "Rule", dataset.by_rule(), Some(TOP_N));

        if !dataset.by_project().is_empty() {
            output.push_str(&format!("\n## Top {} Projects\n\n", TOP_N));
            output.push_str("| Rank | Project | Functions |\n|------|---------|-----------|\n");
            for (i, (repo_id, count)) in ranked(dataset.by_project()).into_iter().take(TOP_N).enumerate() {
                output.push_str(&format!("| {} | {} | {} |\n", i + 1, escape(repo_id), count));
            }
        }

        if !dataset.errors().is_empty() {
            output.push_str(&format!("\n## Failed Projects ({})\n\n", dataset.errors().len()));
            for error in dataset.errors() {
                output.push_str(&format!(
                    "- **{}**: {} ({}, {} attempts)\n",
                    error.repo_id, error.message, error.error_kind, error.attempts_made
                ));
            }
        }

        output.push_str(&format!(
            "\n---\n*Generated on {}*\n",
            generated_at.format("%Y-%m-%d %H:%M:%S")
        ));

        Ok(output)
    }
}

fn push_breakdown(output: &mut String, title: &str, column: &str, breakdown: &Breakdown, limit: Option<usize>) {
    if breakdown.is_empty() {
        return;
    }

    let total: u64 = breakdown.values().sum();
    output.push_str(&format!("\n## {}\n\n", title));
    output.push_str(&format!("| {} | Count | Share |\n|---|---|---|\n", column));
    for (key, count) in ranked(breakdown).into_iter().take(limit.unwrap_or(usize::MAX)) {
        output.push_str(&format!(
            "| {} | {} | {:.1}% |\n",
            escape(key),
            count,
            count as f64 / total as f64 * 100.0
        ));
    }
}

fn escape(cell: &str) -> String {
    cell.replace('|', "\\|")
}
