use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::models::outcome::ErrorKind;
use crate::models::record::{FunctionRecord, RepoId};

// Category key -> record count. BTreeMap keeps the serialized dataset byte-stable
pub type Breakdown = BTreeMap<String, u64>;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Summary {
    pub total_projects: u64,
    pub successful_projects: u64,
    pub failed_projects: u64,
    pub total_function_count: u64,
}

impl Summary {
    pub fn success_rate(&self) -> Option<f64> {
        (self.total_projects > 0)
            .then(|| self.successful_projects as f64 / self.total_projects as f64 * 100.0)
    }

    /// Repositories were requested but none could be fetched.
    pub fn is_degraded(&self) -> bool {
        self.total_projects > 0 && self.successful_projects == 0
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorEntry {
    pub repo_id: RepoId,
    pub error_kind: ErrorKind,
    pub message: String,
    pub attempts_made: u32,
}

// Only the classifier builds one; everything downstream reads through getters
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ClassifiedDataset {
    pub(crate) summary: Summary,
    pub(crate) by_severity: Breakdown,
    pub(crate) by_type: Breakdown,
    pub(crate) by_rule: Breakdown,
    pub(crate) by_project: BTreeMap<RepoId, u64>,
    pub(crate) all_records: Vec<FunctionRecord>,
    pub(crate) errors: Vec<ErrorEntry>,
}

impl ClassifiedDataset {
    pub fn summary(&self) -> &Summary {
        &self.summary
    }

    pub fn by_severity(&self) -> &Breakdown {
        &self.by_severity
    }

    pub fn by_type(&self) -> &Breakdown {
        &self.by_type
    }

    pub fn by_rule(&self) -> &Breakdown {
        &self.by_rule
    }

    pub fn by_project(&self) -> &BTreeMap<RepoId, u64> {
        &self.by_project
    }

    pub fn all_records(&self) -> &[FunctionRecord] {
        &self.all_records
    }

    pub fn errors(&self) -> &[ErrorEntry] {
        &self.errors
    }
}

/// Breakdown entries sorted by count descending, ties broken by key.
pub fn ranked(breakdown: &BTreeMap<String, u64>) -> Vec<(&str, u64)> {
    let mut entries: Vec<_> = breakdown.iter().map(|(k, v)| (k.as_str(), *v)).collect();
    entries.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(b.0)));
    entries
}
