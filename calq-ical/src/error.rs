use thiserror::Error;

/// A text-match referenced a collation that is not in the registry.
///
/// RFC 4791 §7.5.1: the server answers with a CALDAV:supported-collation
/// precondition error, so this is reported as a malformed filter.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Unknown collation {0}")]
pub struct UnknownCollation(pub String);

/// Errors raised while evaluating a filter against a calendar object.
/// A non-matching object is never an error.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum QueryError {
    #[error(transparent)]
    Collation(#[from] UnknownCollation),
}

/// Errors raised while building a calendar object from raw bytes.
#[derive(Error, Debug)]
pub enum ObjectError {
    #[error("Calendar object is not valid UTF-8")]
    InvalidUtf8(#[from] std::str::Utf8Error),
    #[error("Unable to parse calendar object: {0}")]
    Parse(String),
    #[error("Content type {0} is not a calendar content type")]
    UnsupportedContentType(String),
    #[error("Expected a VCALENDAR root, found {0}")]
    UnexpectedRoot(String),
}

/// Strict validation failed, the storage layer should reject the write.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Invalid {content_type} contents: {}", .issues.join(", "))]
pub struct InvalidFileContents {
    pub content_type: String,
    pub issues: Vec<String>,
}

/// The primary component has no UID property.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("Missing UID")]
pub struct MissingUid;
