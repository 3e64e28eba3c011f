//! Plan execution: live parameter binding and result materialization.
//!
//! A handler replays a cached plan against a live query instance. Every
//! parameter is re-bound through its recorded rule; the command text is
//! never touched again.

use crate::command::ParameterBinding;
use crate::member::ParamKind;
use crate::plan::CompiledQueryPlan;
use crate::query::{CompiledQuery, EnumStorage, SessionContext};
use crate::translator::RowHandlerKind;
use docstore_core::{Connection, Cx, Error, Outcome, Result, Row, Value};
use std::sync::Arc;

/// Column name prefix the translator uses for related-document payloads.
const INCLUDE_COLUMN_PREFIX: &str = "__include:";

/// Column name carrying the total matching row count when statistics are
/// requested.
const TOTAL_ROWS_COLUMN: &str = "total_rows";

/// Executes a cached plan against live query instances.
pub struct QueryHandler<Q: CompiledQuery> {
    plan: Arc<CompiledQueryPlan<Q>>,
}

impl<Q: CompiledQuery> QueryHandler<Q> {
    /// A handler over the given plan.
    pub fn new(plan: Arc<CompiledQueryPlan<Q>>) -> Self {
        Self { plan }
    }

    /// The plan this handler executes.
    pub fn plan(&self) -> &Arc<CompiledQueryPlan<Q>> {
        &self.plan
    }

    /// Produce the statements for one execution: the captured command
    /// text plus live parameter values bound through each parameter's
    /// recorded rule.
    pub fn configure(&self, query: &Q, session: &SessionContext) -> Result<Vec<(String, Vec<Value>)>> {
        let mut statements = Vec::with_capacity(self.plan.commands().len());
        for command in self.plan.commands() {
            let mut params = Vec::with_capacity(command.parameters.len());
            for parameter in &command.parameters {
                let value = match &parameter.binding {
                    ParameterBinding::Tenant => {
                        Value::Text(session.tenant.as_str().to_string())
                    }
                    ParameterBinding::Member { member, transform } => {
                        let live = self.live_member_value(query, session, *member);
                        match transform {
                            Some(transform) => match &live {
                                Value::Text(text) => Value::Text(transform.apply(text)),
                                other => other.clone(),
                            },
                            None => live,
                        }
                    }
                    ParameterBinding::Filtered { filter, member } => {
                        let live = self.live_member_value(query, session, *member);
                        self.plan.filters()[*filter].bind(&live)
                    }
                    ParameterBinding::HardCoded => parameter.value.clone(),
                };
                params.push(value);
            }
            statements.push((command.text.clone(), params));
        }
        Ok(statements)
    }

    /// Execute the plan: bind, run every statement, route include
    /// columns and statistics, and materialize the primary rows.
    pub async fn execute<C: Connection>(
        &self,
        cx: &Cx,
        connection: &C,
        query: &mut Q,
        session: &SessionContext,
    ) -> Outcome<Vec<Q::Output>, Error> {
        let statements = match self.configure(query, session) {
            Ok(statements) => statements,
            Err(e) => return Outcome::Err(e),
        };

        tracing::debug!(
            query = self.plan.query_name(),
            statements = statements.len(),
            "executing compiled query"
        );

        let batches = match connection.batch(cx, &statements).await {
            Outcome::Ok(batches) => batches,
            Outcome::Err(e) => return Outcome::Err(e),
            Outcome::Cancelled(c) => return Outcome::Cancelled(c),
            Outcome::Panicked(p) => return Outcome::Panicked(p),
        };

        match self.materialize(query, session, batches) {
            Ok(outputs) => Outcome::Ok(outputs),
            Err(e) => Outcome::Err(e),
        }
    }

    /// The effective session-interaction kind for this plan.
    ///
    /// Include sinks upgrade any handler to composite row routing.
    pub fn effective_kind(&self) -> RowHandlerKind {
        if self.plan.includes().is_empty() {
            self.plan.row_handler().kind()
        } else {
            RowHandlerKind::Composite
        }
    }

    fn live_member_value(&self, query: &Q, session: &SessionContext, member: usize) -> Value {
        let member = &self.plan.members()[member];
        let value = query.member_value(member.name()).unwrap_or(Value::Null);
        let value = match (value, member.kind()) {
            (Value::Null, ParamKind::Text) => Value::Text(String::new()),
            (value, _) => value,
        };
        // string-storage schemas compare against variant names
        if let (ParamKind::Enum { variants }, EnumStorage::AsString, Value::Int(ordinal)) =
            (member.kind(), session.enum_storage, &value)
        {
            if let Some(name) = usize::try_from(*ordinal).ok().and_then(|i| variants.get(i)) {
                return Value::Text((*name).to_string());
            }
        }
        value
    }

    fn materialize(
        &self,
        query: &mut Q,
        session: &SessionContext,
        batches: Vec<Vec<Row>>,
    ) -> Result<Vec<Q::Output>> {
        let handler = match self.plan.row_handler().kind() {
            RowHandlerKind::SessionScoped => self.plan.row_handler().for_session(session),
            _ => Arc::clone(self.plan.row_handler()),
        };

        let Some(primary) = batches.into_iter().next_back() else {
            return Ok(Vec::new());
        };

        if self.plan.statistics().is_some() {
            let total = primary
                .first()
                .and_then(|row| row.get_by_name(TOTAL_ROWS_COLUMN))
                .and_then(Value::as_i64)
                .and_then(|total| u64::try_from(total).ok())
                .unwrap_or(primary.len() as u64);
            if let Some(stats) = query.statistics_mut() {
                stats.set_total_results(total);
            }
        }

        let route_includes = !self.plan.includes().is_empty();
        let mut outputs = Vec::with_capacity(primary.len());
        for row in &primary {
            if route_includes {
                self.route_includes(query, row)?;
            }
            outputs.push(handler.handle(row)?);
        }
        Ok(outputs)
    }

    /// Deliver `__include:<member>` column payloads to the query's sinks.
    fn route_includes(&self, query: &mut Q, row: &Row) -> Result<()> {
        for name in row.column_names().filter(|n| n.starts_with(INCLUDE_COLUMN_PREFIX)) {
            let member = &name[INCLUDE_COLUMN_PREFIX.len()..];
            if !self.plan.includes().iter().any(|info| info.name == member) {
                continue;
            }
            let document = match row.get_by_name(name) {
                Some(Value::Json(doc)) => doc.clone(),
                Some(Value::Text(raw)) => serde_json::from_str(raw)?,
                Some(Value::Null) | None => continue,
                Some(other) => {
                    tracing::warn!(
                        query = self.plan.query_name(),
                        member,
                        kind = other.type_name(),
                        "include column carries a non-document value; skipping"
                    );
                    continue;
                }
            };
            query.accept_include(member, document);
        }
        Ok(())
    }
}
