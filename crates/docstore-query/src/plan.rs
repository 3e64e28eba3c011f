//! Plan construction: template building, translation, and value-based
//! parameter matching.
//!
//! A plan is built once per query type and reused for every execution.
//! The builder assigns recognizable synthetic values to the template's
//! members, hands the template to the opaque translator, then walks the
//! generated parameters and classifies each one by recognizing those
//! values. Position never matters; only values do.

use crate::command::{CommandBuilder, CommandPlan, ParameterBinding, WildcardTransform};
use crate::member::{MemberInfo, ParamKind, QueryMember, classify};
use crate::query::{CompiledQuery, SessionContext, TrackingMode};
use crate::translator::{ParameterFilter, QueryTranslator, RowHandler};
use crate::unique::{FinderRegistry, UniqueValueSource};
use docstore_core::{PlanError, Result, Value};
use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;

/// The immutable execution plan for one query type.
///
/// Everything needed to execute is captured here: the command text, the
/// re-binding rule for every parameter, the row handler, and the member
/// metadata. Plans are shared behind `Arc` from the cache.
pub struct CompiledQueryPlan<Q: CompiledQuery> {
    query_name: &'static str,
    tracking: TrackingMode,
    statistics: Option<&'static MemberInfo>,
    includes: Vec<&'static MemberInfo>,
    members: Vec<QueryMember>,
    commands: Vec<CommandPlan>,
    row_handler: Arc<dyn RowHandler<Q::Output>>,
    filters: Vec<Arc<dyn ParameterFilter>>,
    _query: PhantomData<fn() -> Q>,
}

impl<Q: CompiledQuery> CompiledQueryPlan<Q> {
    /// The query type's stable name.
    pub fn query_name(&self) -> &'static str {
        self.query_name
    }

    /// The tracking mode this plan was built for.
    pub fn tracking(&self) -> TrackingMode {
        self.tracking
    }

    /// The candidate parameter members, in declaration order.
    pub fn members(&self) -> &[QueryMember] {
        &self.members
    }

    /// The captured commands, in execution order.
    pub fn commands(&self) -> &[CommandPlan] {
        &self.commands
    }

    /// The statistics member, when the query type declares one.
    pub fn statistics(&self) -> Option<&'static MemberInfo> {
        self.statistics
    }

    /// The include sink members, in declaration order.
    pub fn includes(&self) -> &[&'static MemberInfo] {
        &self.includes
    }

    /// The row handler the translator produced.
    pub fn row_handler(&self) -> &Arc<dyn RowHandler<Q::Output>> {
        &self.row_handler
    }

    /// The parameter filters the translator produced.
    pub fn filters(&self) -> &[Arc<dyn ParameterFilter>] {
        &self.filters
    }
}

impl<Q: CompiledQuery> fmt::Debug for CompiledQueryPlan<Q> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CompiledQueryPlan")
            .field("query_name", &self.query_name)
            .field("tracking", &self.tracking)
            .field("members", &self.members)
            .field("commands", &self.commands)
            .finish_non_exhaustive()
    }
}

/// Builds a [`CompiledQueryPlan`] from a query instance.
pub struct PlanBuilder<'a> {
    registry: &'a FinderRegistry,
}

impl<'a> PlanBuilder<'a> {
    /// A builder drawing synthetic values from the given registry.
    pub fn new(registry: &'a FinderRegistry) -> Self {
        Self { registry }
    }

    /// Build the plan for `query`'s type.
    ///
    /// The caller's instance only contributes member values when they
    /// are already mutually unique and the type does not request
    /// explicit planning; otherwise a fresh template is constructed and
    /// filled with synthetic values. Failure is deterministic for the
    /// type, so nothing is retried.
    pub fn build<Q: CompiledQuery>(
        &self,
        query: &Q,
        session: &SessionContext,
        translator: &dyn QueryTranslator<Q>,
    ) -> Result<Arc<CompiledQueryPlan<Q>>> {
        tracing::debug!(query = Q::QUERY_NAME, "building compiled query plan");

        let classification = classify(Q::members(), self.registry);
        if !classification.invalid.is_empty() {
            let names: Vec<&str> = classification.invalid.iter().map(|m| m.name).collect();
            return Err(PlanError::invalid_shape(Q::QUERY_NAME, &names).into());
        }
        let mut members = classification.members;

        let caller_values = observed_values(query, &members);
        let use_caller_values = !Q::USES_EXPLICIT_PLANNING
            && !collides_with_tenant(&caller_values, session)
            && self.registry.values_unique(&members, &caller_values);

        let mut template = Q::template();
        if use_caller_values {
            for (member, value) in members.iter().zip(&caller_values) {
                template.set_member_value(member.name(), value.clone());
            }
        } else {
            let mut source = UniqueValueSource::new(self.registry);
            for member in &members {
                if !member.writable() {
                    continue;
                }
                let kind = member.kind();
                let Some(value) = source.next(&kind) else {
                    return Err(
                        PlanError::unique_template(Q::QUERY_NAME, kind.describe()).into()
                    );
                };
                template.set_member_value(member.name(), value);
            }
            template.customize_template(&mut source);
        }

        let template_values = observed_values(&template, &members);
        if !self.registry.values_unique(&members, &template_values) {
            let offending = self
                .registry
                .first_colliding_kind(&members, &template_values)
                .map_or("unknown", |kind| kind.describe());
            return Err(PlanError::unique_template(Q::QUERY_NAME, offending).into());
        }
        for (member, value) in members.iter_mut().zip(template_values) {
            member.stash_template_value(value);
        }

        let mut builder = CommandBuilder::new();
        let output = translator.translate(&template, session, &mut builder)?;
        let mut commands = builder.finish();

        for command in &mut commands {
            for parameter in &mut command.parameters {
                parameter.binding =
                    match_parameter(&parameter.value, session, &members, &output.filters);
                if parameter.binding == ParameterBinding::HardCoded {
                    tracing::debug!(
                        query = Q::QUERY_NAME,
                        parameter = %parameter.name,
                        "parameter matches no member; treating as hard-coded literal"
                    );
                }
            }
        }

        Ok(Arc::new(CompiledQueryPlan {
            query_name: Q::QUERY_NAME,
            tracking: session.tracking,
            statistics: classification.statistics,
            includes: classification.includes,
            members,
            commands,
            row_handler: output.row_handler,
            filters: output.filters,
            _query: PhantomData,
        }))
    }
}

/// Read the current values of the candidate members, coercing null
/// strings to empty so `Option<String>` fields plan cleanly.
fn observed_values<Q: CompiledQuery>(query: &Q, members: &[QueryMember]) -> Vec<Value> {
    members
        .iter()
        .map(|member| {
            let value = query.member_value(member.name()).unwrap_or(Value::Null);
            match (value, member.kind()) {
                (Value::Null, ParamKind::Text) => Value::Text(String::new()),
                (value, _) => value,
            }
        })
        .collect()
}

/// Does any observed value equal the active tenant id? Matching checks
/// the tenant before members, so such a value would bind as the tenant
/// and the caller's instance cannot serve as the template.
fn collides_with_tenant(values: &[Value], session: &SessionContext) -> bool {
    values
        .iter()
        .any(|value| matches!(value, Value::Text(text) if text == session.tenant.as_str()))
}

/// Classify one generated parameter by recognizing its value.
///
/// Precedence: tenant id, then direct member match in declaration
/// order, then wildcard-wrapped string match, then translator filters.
/// Anything unrecognized is a hard-coded literal replayed verbatim.
fn match_parameter(
    value: &Value,
    session: &SessionContext,
    members: &[QueryMember],
    filters: &[Arc<dyn ParameterFilter>],
) -> ParameterBinding {
    if let Value::Text(text) = value {
        if text == session.tenant.as_str() {
            return ParameterBinding::Tenant;
        }
    }

    for (index, member) in members.iter().enumerate() {
        if member_matches(member, value) {
            return ParameterBinding::Member {
                member: index,
                transform: None,
            };
        }
    }

    if let Value::Text(text) = value {
        for (index, member) in members.iter().enumerate() {
            let Value::Text(template) = member.template_value() else {
                continue;
            };
            if let Some(transform) = WildcardTransform::detect(template, text) {
                return ParameterBinding::Member {
                    member: index,
                    transform: Some(transform),
                };
            }
        }
    }

    for (filter_index, filter) in filters.iter().enumerate() {
        let Some(member_index) = members.iter().position(|m| m.name() == filter.member()) else {
            continue;
        };
        if filter.matches_template(members[member_index].template_value(), value) {
            return ParameterBinding::Filtered {
                filter: filter_index,
                member: member_index,
            };
        }
    }

    ParameterBinding::HardCoded
}

/// Does this parameter value directly denote the member's template value?
///
/// Enum members match both their ordinal form and their variant-name
/// form, since the translator emits whichever the schema stores.
fn member_matches(member: &QueryMember, value: &Value) -> bool {
    let template = member.template_value();
    if template == value {
        return true;
    }
    if let (ParamKind::Enum { variants }, Value::Int(ordinal), Value::Text(name)) =
        (member.kind(), template, value)
    {
        return usize::try_from(*ordinal)
            .ok()
            .and_then(|i| variants.get(i))
            .is_some_and(|variant| *variant == name.as_str());
    }
    false
}
