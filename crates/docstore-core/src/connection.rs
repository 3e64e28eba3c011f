//! Backend connection trait.
//!
//! The planning engine never talks to a database directly; it assembles
//! command text and parameter lists and hands them to a [`Connection`].
//! All operations are async and take a `Cx` context for cancellation and
//! timeout handling via asupersync's structured concurrency.

use crate::error::Error;
use crate::row::Row;
use crate::value::Value;
use asupersync::{Cx, Outcome};
use std::future::Future;

/// A backend connection capable of executing commands.
///
/// Implementations must be `Send + Sync` for use across async boundaries.
/// Cancellation aborts the in-flight call; it never needs to roll back any
/// planning state because plans are read-only once built.
pub trait Connection: Send + Sync {
    /// Execute a query and return all rows.
    fn query(
        &self,
        cx: &Cx,
        sql: &str,
        params: &[Value],
    ) -> impl Future<Output = Outcome<Vec<Row>, Error>> + Send;

    /// Execute a query and return the first row, if any.
    fn query_one(
        &self,
        cx: &Cx,
        sql: &str,
        params: &[Value],
    ) -> impl Future<Output = Outcome<Option<Row>, Error>> + Send {
        async move {
            match self.query(cx, sql, params).await {
                Outcome::Ok(rows) => Outcome::Ok(rows.into_iter().next()),
                Outcome::Err(e) => Outcome::Err(e),
                Outcome::Cancelled(c) => Outcome::Cancelled(c),
                Outcome::Panicked(p) => Outcome::Panicked(p),
            }
        }
    }

    /// Execute a statement and return rows affected.
    fn execute(
        &self,
        cx: &Cx,
        sql: &str,
        params: &[Value],
    ) -> impl Future<Output = Outcome<u64, Error>> + Send;

    /// Execute multiple statements sequentially, returning each result set.
    ///
    /// Used for multi-statement compiled query plans; statements run in
    /// order and the results keep that order.
    fn batch(
        &self,
        cx: &Cx,
        statements: &[(String, Vec<Value>)],
    ) -> impl Future<Output = Outcome<Vec<Vec<Row>>, Error>> + Send {
        async move {
            let mut results = Vec::with_capacity(statements.len());
            for (sql, params) in statements {
                match self.query(cx, sql, params).await {
                    Outcome::Ok(rows) => results.push(rows),
                    Outcome::Err(e) => return Outcome::Err(e),
                    Outcome::Cancelled(c) => return Outcome::Cancelled(c),
                    Outcome::Panicked(p) => return Outcome::Panicked(p),
                }
            }
            Outcome::Ok(results)
        }
    }
}
