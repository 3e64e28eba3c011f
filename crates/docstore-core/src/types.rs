//! Backend type tags for driver-level parameters.

/// The backend storage type attached to a generated parameter.
///
/// The translator tags every parameter it appends so the driver can bind
/// values without re-inspecting them. Tags survive in the cached plan and
/// are replayed verbatim at execution time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BackendType {
    Boolean,
    Integer,
    BigInt,
    Real,
    Double,
    Decimal,
    Text,
    Bytes,
    Timestamp,
    TimestampTz,
    Uuid,
    Json,
}

impl BackendType {
    /// Get the SQL type name for this tag.
    pub const fn sql_name(&self) -> &'static str {
        match self {
            BackendType::Boolean => "BOOLEAN",
            BackendType::Integer => "INTEGER",
            BackendType::BigInt => "BIGINT",
            BackendType::Real => "REAL",
            BackendType::Double => "DOUBLE PRECISION",
            BackendType::Decimal => "DECIMAL",
            BackendType::Text => "TEXT",
            BackendType::Bytes => "BYTEA",
            BackendType::Timestamp => "TIMESTAMP",
            BackendType::TimestampTz => "TIMESTAMPTZ",
            BackendType::Uuid => "UUID",
            BackendType::Json => "JSONB",
        }
    }
}
