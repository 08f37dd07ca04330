use super::rows::{first_line, header_cells};
use actix_multipart::{Field, Multipart};
use actix_web::HttpResponse;
use common::requests::BulkMapping;
use futures_util::StreamExt;
use regex::Regex;
use serde_json::from_slice;

/// A bulk CSV upload: the file bytes plus the column mapping sent with them.
#[derive(Debug)]
pub struct BulkUpload {
    pub filename: String,
    pub bytes: Vec<u8>,
    pub mapping: BulkMapping,
}

/// Why an upload was refused before any job was started.
#[derive(Debug, PartialEq)]
pub enum UploadError {
    /// File and mapping together exceed `limit` bytes.
    TooLarge { limit: usize },
    Invalid(String),
}

impl From<String> for UploadError {
    fn from(message: String) -> Self {
        UploadError::Invalid(message)
    }
}

impl From<&str> for UploadError {
    fn from(message: &str) -> Self {
        UploadError::Invalid(message.to_string())
    }
}

impl UploadError {
    pub fn to_response(&self) -> HttpResponse {
        match self {
            UploadError::TooLarge { limit } => HttpResponse::PayloadTooLarge()
                .body(format!("Error: upload exceeds {} bytes", limit)),
            UploadError::Invalid(message) => {
                HttpResponse::BadRequest().body(format!("Error: {}", message))
            }
        }
    }
}

/// Drains one multipart field, charging its bytes to the upload budget.
async fn read_field(
    field: &mut Field,
    remaining: &mut usize,
    limit: usize,
) -> Result<Vec<u8>, UploadError> {
    let mut bytes = Vec::new();
    while let Some(chunk) = field.next().await {
        let chunk = chunk.map_err(|e| e.to_string())?;
        *remaining = remaining
            .checked_sub(chunk.len())
            .ok_or(UploadError::TooLarge { limit })?;
        bytes.extend_from_slice(&chunk);
    }
    Ok(bytes)
}

/// Validate each CSV header cell.
/// - `header_line` is the raw first line (without trailing CR/LF).
/// - `header_re` is the precompiled regex used to validate each cell.
fn validate_header_cells(header_line: &str, header_re: &Regex) -> Result<(), String> {
    for cell in header_cells(header_line) {
        if cell.is_empty() {
            return Err("CSV header cells must not be empty".into());
        }
        if !header_re.is_match(&cell) {
            return Err(format!(
                "CSV header cell '{}' must contain only letters, digits, spaces, '-' or '_'",
                cell
            ));
        }
    }
    Ok(())
}

/// Reads the `mapping` (JSON) and `file` (CSV) fields of a bulk upload.
///
/// Fields may come in any order. The header line is checked here so a bad file
/// is refused before a job is started. Reading stops as soon as more than
/// `limit` bytes have arrived.
pub async fn read_bulk_upload(
    mut payload: Multipart,
    limit: usize,
) -> Result<BulkUpload, UploadError> {
    let mut remaining = limit;
    let mut mapping: Option<BulkMapping> = None;
    let mut file: Option<(String, Vec<u8>)> = None;

    while let Some(item) = payload.next().await {
        let mut field = item.map_err(|e| e.to_string())?;
        let name = field
            .content_disposition()
            .and_then(|cd| cd.get_name().map(|n| n.to_string()));

        match name.as_deref() {
            Some("file") => {
                let filename = field
                    .content_disposition()
                    .and_then(|cd| cd.get_filename().map(|f| f.to_string()))
                    .unwrap_or_default();
                if !filename.to_lowercase().ends_with(".csv") {
                    return Err("The file must end with .csv".into());
                }
                let bytes = read_field(&mut field, &mut remaining, limit).await?;
                file = Some((filename, bytes));
            }
            Some("mapping") => {
                let bytes = read_field(&mut field, &mut remaining, limit).await?;
                let parsed: BulkMapping =
                    from_slice(&bytes).map_err(|e| format!("Invalid mapping: {}", e))?;
                mapping = Some(parsed);
            }
            _ => {}
        }
    }

    let mapping = mapping.ok_or("Missing mapping")?;
    let (filename, bytes) = file.ok_or("Missing file")?;
    if mapping.is_empty() {
        return Err("Mapping has no columns".into());
    }

    // Letters, marks, digits, spaces, hyphen, underscore.
    let header_re =
        Regex::new(r"^[\p{L}\p{M}\p{N}\s\-_]+$").map_err(|e| format!("Regex error: {}", e))?;
    validate_header_cells(&first_line(&bytes)?, &header_re)?;

    Ok(BulkUpload {
        filename,
        bytes,
        mapping,
    })
}
