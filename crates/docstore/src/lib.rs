//! docstore - a document database client for SQL backends with compiled
//! query planning.
//!
//! Documents are stored as JSON in a relational engine; queries against
//! them are plain Rust structs. The first execution of a query type
//! analyzes it once and caches an execution plan; every later execution
//! replays the captured SQL with live parameter values and never touches
//! the translator again.
//!
//! # Quick Start
//!
//! ```ignore
//! use docstore::prelude::*;
//!
//! #[derive(Default, CompiledQuery)]
//! struct UsersByName {
//!     name: String,
//!     stats: QueryStatistics,
//! }
//!
//! async fn example(cx: &Cx, session: &Session<impl Connection>, translator: &impl QueryTranslator<UsersByName>) {
//!     let mut query = UsersByName {
//!         name: "Alice".to_string(),
//!         ..Default::default()
//!     };
//!     match session.execute_compiled(cx, &mut query, translator).await {
//!         Outcome::Ok(users) => println!("{} of {} users", users.len(), query.stats.total_results()),
//!         Outcome::Err(e) => eprintln!("error: {e}"),
//!         _ => {}
//!     }
//! }
//! ```
//!
//! # Features
//!
//! - **Plan once, run forever**: one-time query analysis, cached per
//!   `(type, tracking mode)`
//! - **Value-based parameter matching**: robust against translator
//!   parameter reordering
//! - **No runtime reflection**: `#[derive(CompiledQuery)]` generates all
//!   member metadata at compile time
//! - **Structured concurrency**: built on asupersync for cancel-correct
//!   operations

// Re-export all public types from sub-crates
pub use docstore_core::{
    // asupersync re-exports
    Connection,
    Cx,
    Error,
    Outcome,
    PlanError,
    PlanErrorKind,
    QueryError,
    Result,
    Row,
    TenantId,
    TypeError,
    Value,
};

pub use docstore_macros::{CompiledQuery, QueryEnum};

// The `CompiledQuery`/`QueryEnum` traits share their names with the
// derive macros above; the namespaces keep them apart.
pub use docstore_query::{
    CommandBuilder, CommandPlan, CompiledQuery, CompiledQueryPlan, EnumStorage, FinderRegistry,
    IncludeCallback, MemberInfo, ParamKind, ParameterBinding, ParameterFilter, ParameterFinder,
    PlanBuilder, PlanCache, QueryEnum, QueryHandler, QueryParameter, QueryPlanning,
    QueryStatistics, QueryTranslator, RowHandler, RowHandlerKind, SessionContext, TrackingMode,
    TranslationOutput, UniqueValueSource, WildcardTransform,
};

// Session management
pub mod session;
pub use session::Session;

/// Prelude module for convenient imports.
///
/// ```ignore
/// use docstore::prelude::*;
/// ```
pub mod prelude {
    pub use crate::{
        CommandBuilder,
        // Trait and derive under one name
        CompiledQuery,
        // Core traits and types
        Connection,
        Cx,
        EnumStorage,
        Error,
        IncludeCallback,
        Outcome,
        QueryEnum,
        QueryParameter,
        QueryStatistics,
        QueryTranslator,
        Result,
        Row,
        RowHandler,
        RowHandlerKind,
        // Session
        Session,
        SessionContext,
        TenantId,
        TrackingMode,
        TranslationOutput,
        Value,
    };
}
