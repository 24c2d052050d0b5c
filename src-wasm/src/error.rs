//! Boundary errors
//!
//! The timeline core never fails: bad numbers are coerced and rejected edits
//! are reported as outcomes. These errors only come from the JS-facing edge
//! (record decoding, unknown ids, calls before `initialize`).

use wasm_bindgen::JsValue;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum EngineError {
    #[error("engine not initialized")]
    NotInitialized,

    #[error("task not found: {0}")]
    TaskNotFound(String),

    #[error("sub-task not found: {0}")]
    SubTaskNotFound(String),

    #[error("link not found: {0}")]
    LinkNotFound(String),

    #[error("invalid {what} record: {reason}")]
    InvalidRecord { what: &'static str, reason: String },

    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("failed to deserialize {what}: {message}")]
    Deserialize { what: &'static str, message: String },

    #[error("failed to serialize {what}: {message}")]
    Serialize { what: &'static str, message: String },
}

impl EngineError {
    pub fn code(&self) -> &'static str {
        match self {
            Self::NotInitialized => "not_initialized",
            Self::TaskNotFound(_) => "task_not_found",
            Self::SubTaskNotFound(_) => "subtask_not_found",
            Self::LinkNotFound(_) => "link_not_found",
            Self::InvalidRecord { .. } => "invalid_record",
            Self::InvalidArgument(_) => "invalid_argument",
            Self::Deserialize { .. } => "deserialize_failed",
            Self::Serialize { .. } => "serialize_failed",
        }
    }
}

impl From<EngineError> for JsValue {
    fn from(err: EngineError) -> Self {
        JsValue::from_str(&format!("{}: {}", err.code(), err))
    }
}
