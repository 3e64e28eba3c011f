//! Error types for docstore operations.

use std::fmt;

/// The primary error type for all docstore operations.
#[derive(Debug)]
pub enum Error {
    /// Compiled-query planning errors
    Plan(PlanError),
    /// Query execution errors
    Query(QueryError),
    /// Type conversion errors
    Type(TypeError),
    /// I/O errors
    Io(std::io::Error),
    /// Operation was cancelled via asupersync
    Cancelled,
    /// Serialization/deserialization errors
    Serde(String),
    /// Custom error with message
    Custom(String),
}

/// An error raised while building a compiled query plan.
///
/// Planning errors are deterministic: retrying the same query type repeats
/// the same failure, so callers should treat them as programming errors.
#[derive(Debug)]
pub struct PlanError {
    pub kind: PlanErrorKind,
    /// Name of the query type whose plan could not be built
    pub query_type: &'static str,
    pub message: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlanErrorKind {
    /// One or more members cannot serve as parameters after classification
    InvalidQueryShape,
    /// Members of some type could not be made mutually unique
    UniqueTemplate,
}

#[derive(Debug)]
pub struct QueryError {
    pub sql: Option<String>,
    pub message: String,
    pub source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

#[derive(Debug)]
pub struct TypeError {
    pub expected: &'static str,
    pub actual: String,
    /// Member name, when the conversion failed against a query member
    pub member: Option<String>,
}

impl Error {
    /// Is this a deterministic planning failure?
    ///
    /// Planning failures are permanent for the offending query type and are
    /// never worth retrying automatically.
    pub fn is_plan_error(&self) -> bool {
        matches!(self, Error::Plan(_))
    }

    /// Get the SQL that caused this error, if available.
    pub fn sql(&self) -> Option<&str> {
        match self {
            Error::Query(q) => q.sql.as_deref(),
            _ => None,
        }
    }
}

impl PlanError {
    /// An invalid-query-shape error listing the offending members.
    pub fn invalid_shape(query_type: &'static str, members: &[&str]) -> Self {
        Self {
            kind: PlanErrorKind::InvalidQueryShape,
            query_type,
            message: format!(
                "members cannot serve as query parameters: {}",
                members.join(", ")
            ),
        }
    }

    /// A unique-template error naming the type that could not be made unique.
    pub fn unique_template(query_type: &'static str, offending: &str) -> Self {
        Self {
            kind: PlanErrorKind::UniqueTemplate,
            query_type,
            message: format!("unable to assign mutually unique values of type {offending}"),
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Plan(e) => write!(f, "Compiled query error: {}", e),
            Error::Query(e) => write!(f, "Query error: {}", e.message),
            Error::Type(e) => {
                if let Some(member) = &e.member {
                    write!(
                        f,
                        "Type error on member '{}': expected {}, found {}",
                        member, e.expected, e.actual
                    )
                } else {
                    write!(f, "Type error: expected {}, found {}", e.expected, e.actual)
                }
            }
            Error::Io(e) => write!(f, "I/O error: {}", e),
            Error::Cancelled => write!(f, "Operation cancelled"),
            Error::Serde(msg) => write!(f, "Serialization error: {}", msg),
            Error::Custom(msg) => write!(f, "{}", msg),
        }
    }
}

impl fmt::Display for PlanError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kind = match self.kind {
            PlanErrorKind::InvalidQueryShape => "invalid query shape",
            PlanErrorKind::UniqueTemplate => "unable to build unique template",
        };
        write!(f, "{} for '{}': {}", kind, self.query_type, self.message)
    }
}

impl fmt::Display for QueryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl fmt::Display for TypeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "expected {}, found {}", self.expected, self.actual)
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Query(e) => e
                .source
                .as_deref()
                .map(|err| err as &(dyn std::error::Error + 'static)),
            Error::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error::Io(err)
    }
}

impl From<PlanError> for Error {
    fn from(err: PlanError) -> Self {
        Error::Plan(err)
    }
}

impl From<QueryError> for Error {
    fn from(err: QueryError) -> Self {
        Error::Query(err)
    }
}

impl From<TypeError> for Error {
    fn from(err: TypeError) -> Self {
        Error::Type(err)
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Serde(err.to_string())
    }
}

/// Result type alias for docstore operations.
pub type Result<T> = std::result::Result<T, Error>;
