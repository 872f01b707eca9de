use crate::manifest::FieldPath;
use serde::Serialize;
use serde_json::Value;
use std::fmt;

/// Category of a validation failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum ErrorKind {
    MissingRequired,
    TypeMismatch,
    EnumViolation,
    PatternViolation,
    RangeViolation,
    UnknownField,
    StructureTooDeep,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::MissingRequired => "missing-required",
            ErrorKind::TypeMismatch => "type-mismatch",
            ErrorKind::EnumViolation => "enum-violation",
            ErrorKind::PatternViolation => "pattern-violation",
            ErrorKind::RangeViolation => "range-violation",
            ErrorKind::UnknownField => "unknown-field",
            ErrorKind::StructureTooDeep => "structure-too-deep",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One schema violation at one location of a manifest.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ValidationError {
    pub path: FieldPath,
    pub kind: ErrorKind,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub suggestion: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub actual: Option<Value>,
}

impl ValidationError {
    pub fn new(path: FieldPath, kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            path,
            kind,
            message: message.into(),
            suggestion: None,
            actual: None,
        }
    }

    pub fn with_suggestion(mut self, suggestion: Option<String>) -> Self {
        self.suggestion = suggestion;
        self
    }

    pub fn with_actual(mut self, actual: &Value) -> Self {
        self.actual = Some(actual.clone());
        self
    }

    /// Path as displayed to users; the document root renders as `<root>`.
    pub fn location(&self) -> String {
        if self.path.is_root() {
            "<root>".to_string()
        } else {
            self.path.to_string()
        }
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {} [{}]", self.location(), self.message, self.kind)?;
        if let Some(suggestion) = &self.suggestion {
            write!(f, " (did you mean '{}'?)", suggestion)?;
        }
        Ok(())
    }
}
