//! Session: the execution surface tying a connection, ambient context,
//! finder registry, and plan cache together.

use std::sync::Arc;

use docstore_core::{Connection, Cx, Error, Outcome, Result, TenantId};
use docstore_query::{
    CompiledQuery, CompiledQueryPlan, EnumStorage, FinderRegistry, PlanBuilder, PlanCache,
    QueryHandler, QueryTranslator, SessionContext, TrackingMode,
};

/// A unit of work against one backend connection.
///
/// Sessions are cheap to create; the plan cache and finder registry are
/// shared behind `Arc`, so every session of one client reuses the same
/// plans. Compiled query execution goes through [`Session::execute_compiled`]:
/// plan on first use, replay afterwards.
pub struct Session<C: Connection> {
    connection: C,
    context: SessionContext,
    registry: Arc<FinderRegistry>,
    cache: Arc<PlanCache>,
}

impl<C: Connection> Session<C> {
    /// A session over `connection` with default context, a standard
    /// finder registry, and a private plan cache.
    pub fn new(connection: C) -> Self {
        Self {
            connection,
            context: SessionContext::default(),
            registry: Arc::new(FinderRegistry::default()),
            cache: Arc::new(PlanCache::new()),
        }
    }

    /// Bind the session to a tenant.
    pub fn with_tenant(mut self, tenant: impl Into<TenantId>) -> Self {
        self.context.tenant = tenant.into();
        self
    }

    /// Replace the tracking mode.
    pub fn with_tracking(mut self, tracking: TrackingMode) -> Self {
        self.context.tracking = tracking;
        self
    }

    /// Replace the enum storage convention.
    pub fn with_enum_storage(mut self, enum_storage: EnumStorage) -> Self {
        self.context.enum_storage = enum_storage;
        self
    }

    /// Share a finder registry across sessions.
    pub fn with_registry(mut self, registry: Arc<FinderRegistry>) -> Self {
        self.registry = registry;
        self
    }

    /// Share a plan cache across sessions.
    pub fn with_cache(mut self, cache: Arc<PlanCache>) -> Self {
        self.cache = cache;
        self
    }

    /// The ambient context plans are built and executed against.
    pub fn context(&self) -> &SessionContext {
        &self.context
    }

    /// The shared plan cache.
    pub fn cache(&self) -> &Arc<PlanCache> {
        &self.cache
    }

    /// The underlying connection.
    pub fn connection(&self) -> &C {
        &self.connection
    }

    /// The cached plan for `Q` under this session's tracking mode,
    /// building it with `translator` on first use.
    pub fn plan_for<Q: CompiledQuery>(
        &self,
        query: &Q,
        translator: &dyn QueryTranslator<Q>,
    ) -> Result<Arc<CompiledQueryPlan<Q>>> {
        self.cache.get_or_build::<Q, _>(self.context.tracking, || {
            PlanBuilder::new(&self.registry).build(query, &self.context, translator)
        })
    }

    /// Execute a compiled query: reuse (or build) the plan for `Q`, bind
    /// the live member values, run the commands, and materialize results.
    ///
    /// `query` is mutable so statistics and include sinks can be written
    /// back onto it.
    pub async fn execute_compiled<Q: CompiledQuery>(
        &self,
        cx: &Cx,
        query: &mut Q,
        translator: &dyn QueryTranslator<Q>,
    ) -> Outcome<Vec<Q::Output>, Error> {
        let plan = match self.plan_for(query, translator) {
            Ok(plan) => plan,
            Err(e) => return Outcome::Err(e),
        };
        QueryHandler::new(plan)
            .execute(cx, &self.connection, query, &self.context)
            .await
    }
}
