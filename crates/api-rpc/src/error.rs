//! RPC Error Types
//!
//! Maps application errors to JSON-RPC error codes.

use docpipe_core::error::AppError;
use jsonrpsee::types::ErrorObjectOwned;

/// RPC Error Codes
pub mod code {
    pub const VALIDATION_ERROR: i32 = 4000;
    pub const NOT_FOUND: i32 = 4001;
    pub const CONFLICT: i32 = 4002;
    pub const THROTTLED: i32 = 4003;
    pub const INTERNAL_ERROR: i32 = 5000;
    pub const STORE_ERROR: i32 = 5001;
    pub const EXTRACTION_ERROR: i32 = 5002;
}

/// Convert AppError to JSON-RPC ErrorObject
pub fn to_rpc_error(err: AppError) -> ErrorObjectOwned {
    let code = match &err {
        AppError::Validation(_) => code::VALIDATION_ERROR,
        AppError::NotFound(_) => code::NOT_FOUND,
        AppError::DuplicateId(_) | AppError::AlreadyTerminal(_) | AppError::Domain(_) => {
            code::CONFLICT
        }
        AppError::Store(_) => code::STORE_ERROR,
        AppError::Extraction(_) | AppError::Timeout(_) => code::EXTRACTION_ERROR,
        AppError::Io(_)
        | AppError::Serialization(_)
        | AppError::Config(_)
        | AppError::Internal(_) => code::INTERNAL_ERROR,
    };

    // Validation and lookup messages are caller-facing as-is
    let message = match err {
        AppError::Validation(msg) | AppError::NotFound(msg) => msg,
        other => other.to_string(),
    };
    ErrorObjectOwned::owned(code, message, None::<()>)
}

pub fn throttled() -> ErrorObjectOwned {
    ErrorObjectOwned::owned(
        code::THROTTLED,
        "Rate limit exceeded. Please slow down.",
        None::<()>,
    )
}
