//! Core types and traits for docstore.
//!
//! This crate provides the foundational abstractions the compiled-query
//! engine is built on:
//!
//! - `Value` dynamic SQL values and the typed newtypes query fields use
//! - `BackendType` driver-level parameter type tags
//! - `Row` result rows
//! - `Connection` trait for backend access
//! - `TenantId` tenant identity
//! - `Outcome`/`Cx` re-exports from asupersync for cancel-correct operations

// Re-export asupersync primitives for structured concurrency
pub use asupersync::{Cx, Outcome};

pub mod connection;
pub mod error;
pub mod row;
pub mod tenancy;
pub mod types;
pub mod value;

pub use connection::Connection;
pub use error::{Error, PlanError, PlanErrorKind, QueryError, Result, TypeError};
pub use row::{ColumnInfo, Row};
pub use tenancy::{DEFAULT_TENANT, TenantId};
pub use types::BackendType;
pub use value::{Decimal, Timestamp, TimestampTz, Value};
