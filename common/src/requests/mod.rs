use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Type check applied to every cell of a mapped CSV column.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldKind {
    #[default]
    Text,
    Number,
    Latitude,
    Longitude,
    Url,
}

/// Where one CSV column lands in a monument suggestion.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ColumnMapping {
    /// Monument field written from this column.
    pub field: String,
    #[serde(default)]
    pub kind: FieldKind,
    /// Rows with an empty cell in this column are rejected.
    #[serde(default)]
    pub required: bool,
}

/// JSON mapping document sent next to the CSV file of a bulk upload
/// (multipart field `mapping`).
///
/// Keys are CSV header titles.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct BulkMapping {
    pub columns: BTreeMap<String, ColumnMapping>,
}

impl BulkMapping {
    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }
}
