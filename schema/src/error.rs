use std::fmt;

/// The schema itself is unusable.
#[derive(Debug, thiserror::Error)]
pub enum SchemaError {
    #[error("cannot read schema: {0}")]
    Io(#[from] std::io::Error),
    #[error("schema is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("schema at {path}: unknown type `{name}`")]
    UnknownType { path: String, name: String },
    #[error("schema at {path}: unsupported keyword `{keyword}`")]
    UnsupportedKeyword { path: String, keyword: String },
    #[error("schema at {path}: cannot resolve $ref `{reference}`")]
    UnresolvedRef { path: String, reference: String },
    #[error("schema at {path}: invalid pattern `{pattern}`: {source}")]
    BadPattern {
        path: String,
        pattern: String,
        source: regex::Error,
    },
    #[error("schema at {path}: {message}")]
    Malformed { path: String, message: String },
}

/// The first place an instance failed to meet the schema.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Violation {
    /// JSON pointer into the instance; empty for the instance root.
    pub path: String,
    /// What the schema required there.
    pub expected: String,
}

impl Violation {
    pub fn new(path: impl Into<String>, expected: impl Into<String>) -> Self {
        Violation {
            path: path.into(),
            expected: expected.into(),
        }
    }
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let path = if self.path.is_empty() { "/" } else { self.path.as_str() };
        write!(f, "at {}: expected {}", path, self.expected)
    }
}

impl std::error::Error for Violation {}
