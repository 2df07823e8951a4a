use serde::{Deserialize, Serialize};

use crate::types::order::OrderError;
use crate::types::product::ProductError;

/// Error envelope returned by every JSON endpoint:
/// `{"status":"error","code":"...","message":"..."}`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub status: String,
    pub code: String,
    pub message: String,
}

impl ErrorResponse {
    pub fn new(code: &str, message: &str) -> Self {
        Self {
            status: "error".to_string(),
            code: code.to_string(),
            message: message.to_string(),
        }
    }
}

impl From<&ProductError> for ErrorResponse {
    fn from(err: &ProductError) -> Self {
        Self::new(err.to_code(), &err.to_message())
    }
}

impl From<&OrderError> for ErrorResponse {
    fn from(err: &OrderError) -> Self {
        Self::new(err.to_code(), &err.to_message())
    }
}
