//! Error type for registration and JS-boundary failures
//!
//! Rendering never fails: missing records degrade to blank fields. Errors only
//! arise when the host hands us a bad pattern or a value we cannot decode.

use wasm_bindgen::JsValue;

#[derive(Debug, Clone, PartialEq)]
pub enum TipError {
    /// A linker, classer or tag `keep` pattern failed to compile
    InvalidPattern { pattern: String, message: String },
    /// A host value did not have the expected shape
    InvalidInput(String),
    SerializationError(String),
}

impl std::fmt::Display for TipError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TipError::InvalidPattern { pattern, message } => {
                write!(f, "Invalid pattern '{}': {}", pattern, message)
            }
            TipError::InvalidInput(msg) => write!(f, "Invalid input: {}", msg),
            TipError::SerializationError(msg) => write!(f, "Serialization error: {}", msg),
        }
    }
}

impl std::error::Error for TipError {}

impl From<serde_json::Error> for TipError {
    fn from(e: serde_json::Error) -> Self {
        TipError::SerializationError(e.to_string())
    }
}

impl From<TipError> for JsValue {
    fn from(e: TipError) -> Self {
        JsValue::from_str(&e.to_string())
    }
}

/// Compile a pattern, naming it in the error
pub fn compile_pattern(pattern: &str, case_insensitive: bool) -> Result<regex::Regex, TipError> {
    regex::RegexBuilder::new(pattern)
        .case_insensitive(case_insensitive)
        .build()
        .map_err(|e| TipError::InvalidPattern {
            pattern: pattern.to_string(),
            message: e.to_string(),
        })
}
