// Submission validation (runs before any state is created)

use super::{SubmissionPolicy, SubmitRequest};
use crate::application::StrategyRegistry;
use crate::domain::StrategyKey;
use crate::error::{AppError, Result};

/// Leading bytes of every PDF file
pub const PDF_SIGNATURE: &[u8] = b"%PDF-";

/// Validate a submission and resolve its strategy key
///
/// # Errors
/// - AppError::Validation describing the first failed check
pub fn validate_request(
    req: &SubmitRequest,
    registry: &StrategyRegistry,
    policy: &SubmissionPolicy,
) -> Result<StrategyKey> {
    if req.document.is_empty() {
        return Err(AppError::Validation("Document is empty".to_string()));
    }

    if req.document.len() > policy.max_document_bytes {
        return Err(AppError::Validation(format!(
            "Document too large: {} bytes (limit {} bytes)",
            req.document.len(),
            policy.max_document_bytes
        )));
    }

    if !req.document.starts_with(PDF_SIGNATURE) {
        return Err(AppError::Validation(
            "Document signature mismatch: only PDF files are allowed".to_string(),
        ));
    }

    if let Some(filename) = &req.filename {
        if !filename.to_ascii_lowercase().ends_with(".pdf") {
            return Err(AppError::Validation(format!(
                "Invalid file type '{}': only PDF files are allowed",
                filename
            )));
        }
    }

    registry.resolve(&req.strategy)
}
