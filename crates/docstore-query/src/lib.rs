//! Compiled query planning and parameter matching.
//!
//! A compiled query is a plain struct whose type doubles as the cache
//! key for a reusable execution plan. The first execution analyzes the
//! type once: synthetic, recognizable values are assigned to its
//! members, the opaque translator generates SQL from that template, and
//! every generated parameter is classified by recognizing those values.
//! Subsequent executions replay the captured commands with live values
//! and never touch the translator again.
//!
//! The moving parts:
//!
//! - [`CompiledQuery`] the contract a query type implements (normally
//!   via `#[derive(CompiledQuery)]` from `docstore-macros`)
//! - [`FinderRegistry`] / [`UniqueValueSource`] synthetic template values
//! - [`PlanBuilder`] one-time analysis producing a [`CompiledQueryPlan`]
//! - [`QueryHandler`] plan execution with live parameter re-binding
//! - [`PlanCache`] plan sharing keyed by `(type, tracking mode)`

pub mod cache;
pub mod command;
pub mod handler;
pub mod member;
pub mod plan;
pub mod query;
pub mod translator;
pub mod unique;

pub use cache::PlanCache;
pub use command::{
    CommandBuilder, CommandPlan, ParameterBinding, ParameterUsage, WildcardTransform,
};
pub use handler::QueryHandler;
pub use member::{Classification, IncludeKind, MemberInfo, MemberShape, ParamKind, QueryMember, classify};
pub use plan::{CompiledQueryPlan, PlanBuilder};
pub use query::{
    CompiledQuery, EnumStorage, IncludeCallback, QueryEnum, QueryParameter, QueryPlanning,
    QueryStatistics, SessionContext, TrackingMode,
};
pub use translator::{
    ParameterFilter, QueryTranslator, RowHandler, RowHandlerKind, TranslationOutput,
};
pub use unique::{FinderRegistry, ParameterFinder, UniqueValueSource};

// re-exported so the derive macro and the enum helper expand against a
// single crate path
pub use docstore_core::Value;
pub use serde_json;
