use serde::{Deserialize, Serialize};

use crate::models::RepoId;

/// Which Merico function report a run collects. Both share one request
/// shape and one pipeline; they differ in endpoint, sort and file naming.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnalysisKind {
    Uncommented,
    Duplicate,
}

impl AnalysisKind {
    pub const ALL: [AnalysisKind; 2] = [AnalysisKind::Uncommented, AnalysisKind::Duplicate];

    pub fn sort_field(&self) -> &'static str {
        match self {
            AnalysisKind::Uncommented => "cyclomatic",
            AnalysisKind::Duplicate => "numFunctions",
        }
    }

    pub fn file_prefix(&self) -> &'static str {
        match self {
            AnalysisKind::Uncommented => "classified_uncommented",
            AnalysisKind::Duplicate => "classified_duplicate",
        }
    }

    pub fn title(&self) -> &'static str {
        match self {
            AnalysisKind::Uncommented => "Uncommented Functions",
            AnalysisKind::Duplicate => "Duplicated Functions",
        }
    }
}

impl std::fmt::Display for AnalysisKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AnalysisKind::Uncommented => write!(f, "uncommented"),
            AnalysisKind::Duplicate => write!(f, "duplicate"),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Filter {
    pub search: String,
    pub emails: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    Asc,
    Desc,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Sort {
    pub field: String,
    pub direction: SortDirection,
}

// Built fresh for every page
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestPayload {
    id: RepoId,
    page: u32,
    page_size: u32,
    filter: Filter,
    sort: Sort,
}

impl RequestPayload {
    pub fn new(kind: AnalysisKind, repo_id: &str, page: u32, page_size: u32, filter: &Filter) -> Self {
        Self {
            id: repo_id.to_string(),
            page,
            page_size,
            filter: filter.clone(),
            sort: Sort {
                field: kind.sort_field().to_string(),
                direction: SortDirection::Desc,
            },
        }
    }

    pub fn repo_id(&self) -> &str {
        &self.id
    }

    pub fn page(&self) -> u32 {
        self.page
    }

    pub fn page_size(&self) -> u32 {
        self.page_size
    }
}
