use std::collections::{BTreeMap, HashSet};

use crate::models::{ClassifiedDataset, ErrorEntry, FetchOutcome};

/// Fold outcomes, in the order given, into one dataset.
pub fn classify(outcomes: &[FetchOutcome]) -> ClassifiedDataset {
    let mut dataset = ClassifiedDataset::default();
    let mut seen = HashSet::new();

    for outcome in outcomes {
        // First outcome per repo id wins
        if !seen.insert(outcome.repo_id()) {
            tracing::warn!("Ignoring repeated outcome for repo {}", outcome.repo_id());
            continue;
        }

        match outcome {
            FetchOutcome::Success { repo_id, records, .. } => {
                dataset.summary.successful_projects += 1;
                dataset.by_project.insert(repo_id.clone(), records.len() as u64);

                for record in records {
                    if let Some(severity) = &record.severity {
                        bump(&mut dataset.by_severity, severity.as_str());
                    }
                    if let Some(kind) = &record.kind {
                        bump(&mut dataset.by_type, kind);
                    }
                    if let Some(rule) = &record.rule {
                        bump(&mut dataset.by_rule, rule);
                    }
                }
                dataset.all_records.extend(records.iter().cloned());
            }
            FetchOutcome::Failure {
                repo_id,
                error_kind,
                message,
                attempts_made,
            } => {
                dataset.summary.failed_projects += 1;
                dataset.errors.push(ErrorEntry {
                    repo_id: repo_id.clone(),
                    error_kind: *error_kind,
                    message: message.clone(),
                    attempts_made: *attempts_made,
                });
            }
        }
    }

    dataset.summary.total_projects =
        dataset.summary.successful_projects + dataset.summary.failed_projects;
    dataset.summary.total_function_count = dataset.all_records.len() as u64;

    dataset
}

fn bump(breakdown: &mut BTreeMap<String, u64>, key: &str) {
    *breakdown.entry(key.to_string()).or_insert(0) += 1;
}
