use crate::jobs::JobId;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A monument create suggestion built from one CSV row.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Suggestion {
    pub id: u64,
    /// 1-based data row (the header is row 0).
    pub row: usize,
    pub fields: BTreeMap<String, String>,
    #[serde(default)]
    pub approved: bool,
}

/// Why a CSV row was rejected.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RowIssue {
    pub row: usize,
    pub column: String,
    pub message: String,
}

/// Result of a bulk create job.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BulkCreateResult {
    pub id: JobId,
    pub create_suggestions: Vec<Suggestion>,
    #[serde(default)]
    pub rejected_rows: Vec<RowIssue>,
}

/// Result of a bulk validate job. Nothing is stored.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BulkValidationResult {
    pub id: JobId,
    pub valid_rows: usize,
    #[serde(default)]
    pub issues: Vec<RowIssue>,
}

/// Result of a bulk approve job: ids of the suggestions now approved.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BulkApprovalResult {
    pub id: JobId,
    pub approved: Vec<u64>,
}
