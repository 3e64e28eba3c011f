//! The translation seam between query objects and backend SQL.
//!
//! The engine treats translation as opaque: a [`QueryTranslator`] walks
//! the template instance once, emits command text and parameters into a
//! [`CommandBuilder`](crate::command::CommandBuilder), and hands back
//! the row handler that materializes results. The engine never inspects
//! how the translator ordered its parameters; matching is done by value
//! afterwards.

use crate::command::CommandBuilder;
use crate::query::{CompiledQuery, SessionContext};
use docstore_core::{Result, Row, Value};
use std::sync::Arc;

/// What the translator produced alongside the accumulated commands.
pub struct TranslationOutput<T> {
    /// Materializes one primary-result row.
    pub row_handler: Arc<dyn RowHandler<T>>,
    /// Filters that transform member values before binding, consulted
    /// during parameter matching.
    pub filters: Vec<Arc<dyn ParameterFilter>>,
}

/// Translates one query type into backend commands.
///
/// Called exactly once per plan; every subsequent execution replays the
/// captured commands without consulting the translator again.
pub trait QueryTranslator<Q: CompiledQuery>: Send + Sync {
    /// Walk `template` and emit commands into `builder`.
    fn translate(
        &self,
        template: &Q,
        session: &SessionContext,
        builder: &mut CommandBuilder,
    ) -> Result<TranslationOutput<Q::Output>>;
}

/// A value transformation the translator applied to one member before
/// parameterizing it.
///
/// During matching, a generated parameter that equals no member value
/// directly is offered to each filter; a filter that recognizes it
/// claims the parameter and is re-applied to live values at execution.
pub trait ParameterFilter: Send + Sync {
    /// The member this filter transforms.
    fn member(&self) -> &str;

    /// Does `parameter_value` look like this filter applied to the
    /// member's `template_value`?
    fn matches_template(&self, template_value: &Value, parameter_value: &Value) -> bool;

    /// Transform a live member value for binding.
    fn bind(&self, live_value: &Value) -> Value;
}

/// How a row handler interacts with session state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RowHandlerKind {
    /// No session state; the cached handler is shared across calls.
    Stateless,
    /// Consults the session identity map; a per-call clone is taken so
    /// concurrent executions never share mutable state.
    SessionScoped,
    /// Wraps a base handler and additionally routes include columns.
    Composite,
}

/// Materializes typed results from raw rows.
pub trait RowHandler<T>: Send + Sync {
    /// The handler's session-interaction kind.
    fn kind(&self) -> RowHandlerKind;

    /// Materialize one primary-result row.
    fn handle(&self, row: &Row) -> Result<T>;

    /// A handler bound to the given session, for [`RowHandlerKind::SessionScoped`]
    /// handlers. Stateless handlers return themselves.
    fn for_session(&self, session: &SessionContext) -> Arc<dyn RowHandler<T>>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use docstore_core::ColumnInfo;

    struct TitleHandler;

    impl RowHandler<String> for TitleHandler {
        fn kind(&self) -> RowHandlerKind {
            RowHandlerKind::Stateless
        }

        fn handle(&self, row: &Row) -> Result<String> {
            match row.get_by_name("title") {
                Some(Value::Text(s)) => Ok(s.clone()),
                _ => Ok(String::new()),
            }
        }

        fn for_session(&self, _session: &SessionContext) -> Arc<dyn RowHandler<String>> {
            Arc::new(TitleHandler)
        }
    }

    #[test]
    fn stateless_handler_materializes_rows() {
        let columns = Arc::new(ColumnInfo::new(vec!["title".to_string()]));
        let row = Row::with_columns(columns, vec![Value::Text("dune".into())]);

        let handler = TitleHandler;
        assert_eq!(handler.kind(), RowHandlerKind::Stateless);
        assert_eq!(handler.handle(&row).unwrap(), "dune");
    }
}
