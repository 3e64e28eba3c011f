//! End-to-end planning behavior through the derive macro: member
//! metadata generation, template construction, and value-based
//! parameter matching.

use std::sync::Arc;

use docstore::prelude::*;
use docstore::{
    CompiledQueryPlan, FinderRegistry, ParameterBinding, PlanBuilder, PlanError, PlanErrorKind,
    QueryPlanning, UniqueValueSource, WildcardTransform,
};
use docstore_core::BackendType;

struct JsonHandler;

impl RowHandler<serde_json::Value> for JsonHandler {
    fn kind(&self) -> RowHandlerKind {
        RowHandlerKind::Stateless
    }

    fn handle(&self, row: &Row) -> Result<serde_json::Value> {
        match row.get_by_name("data") {
            Some(Value::Json(doc)) => Ok(doc.clone()),
            _ => Ok(serde_json::Value::Null),
        }
    }

    fn for_session(&self, _session: &SessionContext) -> Arc<dyn RowHandler<serde_json::Value>> {
        Arc::new(JsonHandler)
    }
}

fn stateless() -> TranslationOutput<serde_json::Value> {
    TranslationOutput {
        row_handler: Arc::new(JsonHandler),
        filters: Vec::new(),
    }
}

#[derive(Default, CompiledQuery)]
struct ByTitle {
    title: String,
}

struct ByTitleTranslator;

impl QueryTranslator<ByTitle> for ByTitleTranslator {
    fn translate(
        &self,
        template: &ByTitle,
        session: &SessionContext,
        builder: &mut CommandBuilder,
    ) -> Result<TranslationOutput<serde_json::Value>> {
        builder.append("select data from mt_doc_book where tenant_id = ");
        builder.append_parameter(
            Value::Text(session.tenant.as_str().to_string()),
            BackendType::Text,
        );
        builder.append(" and title = ");
        builder.append_parameter(
            Value::Text(template.title.clone()),
            BackendType::Text,
        );
        Ok(stateless())
    }
}

#[test]
fn derived_string_member_binds_to_its_placeholder() {
    let registry = FinderRegistry::default();
    let session = SessionContext::default();
    let plan = PlanBuilder::new(&registry)
        .build(&ByTitle::default(), &session, &ByTitleTranslator)
        .unwrap();

    assert_eq!(plan.query_name(), "ByTitle");
    let command = &plan.commands()[0];
    assert!(command.text.ends_with("title = $2"));
    assert_eq!(command.parameters[0].binding, ParameterBinding::Tenant);
    assert_eq!(
        command.parameters[1].binding,
        ParameterBinding::Member {
            member: 0,
            transform: None
        }
    );
}

#[derive(Default, CompiledQuery)]
#[query(name = "orders.in-window")]
struct OrdersInWindow {
    opened_after: i64,
    closed_before: i64,
    minimum_total: i64,
}

struct WindowTranslator;

impl QueryTranslator<OrdersInWindow> for WindowTranslator {
    fn translate(
        &self,
        template: &OrdersInWindow,
        _session: &SessionContext,
        builder: &mut CommandBuilder,
    ) -> Result<TranslationOutput<serde_json::Value>> {
        // traversal order deliberately differs from declaration order
        builder.append("select data from mt_doc_order where total >= ");
        builder.append_parameter(
            Value::BigInt(template.minimum_total),
            BackendType::BigInt,
        );
        builder.append(" and opened > ");
        builder.append_parameter(
            Value::BigInt(template.opened_after),
            BackendType::BigInt,
        );
        builder.append(" and closed < ");
        builder.append_parameter(
            Value::BigInt(template.closed_before),
            BackendType::BigInt,
        );
        Ok(stateless())
    }
}

#[test]
fn three_members_of_one_type_survive_translator_reordering() {
    let registry = FinderRegistry::default();
    let session = SessionContext::default();
    let plan = PlanBuilder::new(&registry)
        .build(&OrdersInWindow::default(), &session, &WindowTranslator)
        .unwrap();

    assert_eq!(plan.query_name(), "orders.in-window");
    let members: Vec<_> = plan.commands()[0]
        .parameters
        .iter()
        .map(|p| match &p.binding {
            ParameterBinding::Member { member, .. } => plan.members()[*member].name(),
            other => panic!("unexpected binding {other:?}"),
        })
        .collect();
    assert_eq!(members, vec!["minimum_total", "opened_after", "closed_before"]);
}

#[test]
fn replanning_from_fresh_state_yields_identical_commands() {
    let session = SessionContext::default();

    let first_registry = FinderRegistry::default();
    let first = PlanBuilder::new(&first_registry)
        .build(&OrdersInWindow::default(), &session, &WindowTranslator)
        .unwrap();
    let second_registry = FinderRegistry::default();
    let second = PlanBuilder::new(&second_registry)
        .build(&OrdersInWindow::default(), &session, &WindowTranslator)
        .unwrap();

    assert_eq!(first.commands()[0].text, second.commands()[0].text);
    let bindings = |plan: &CompiledQueryPlan<OrdersInWindow>| {
        plan.commands()[0]
            .parameters
            .iter()
            .map(|p| p.binding.clone())
            .collect::<Vec<_>>()
    };
    assert_eq!(bindings(first.as_ref()), bindings(second.as_ref()));
}

#[derive(Default, CompiledQuery)]
struct ByNeedle {
    needle: String,
}

struct SuffixTranslator;

impl QueryTranslator<ByNeedle> for SuffixTranslator {
    fn translate(
        &self,
        template: &ByNeedle,
        _session: &SessionContext,
        builder: &mut CommandBuilder,
    ) -> Result<TranslationOutput<serde_json::Value>> {
        builder.append("select data from mt_doc_file where name like ");
        builder.append_parameter(
            Value::Text(format!("%{}", template.needle)),
            BackendType::Text,
        );
        builder.append(" and kind = ");
        builder.append_parameter(
            Value::Text("attachment".to_string()),
            BackendType::Text,
        );
        Ok(stateless())
    }
}

#[test]
fn wildcard_and_hard_coded_parameters_are_told_apart() {
    let registry = FinderRegistry::default();
    let session = SessionContext::default();
    let query = ByNeedle {
        needle: "report".to_string(),
    };
    let plan = PlanBuilder::new(&registry)
        .build(&query, &session, &SuffixTranslator)
        .unwrap();

    let params = &plan.commands()[0].parameters;
    assert_eq!(
        params[0].binding,
        ParameterBinding::Member {
            member: 0,
            transform: Some(WildcardTransform::Suffix)
        }
    );
    assert_eq!(params[1].binding, ParameterBinding::HardCoded);
    assert_eq!(params[1].value, Value::Text("attachment".to_string()));
}

#[derive(Default, CompiledQuery)]
struct WithBlob {
    title: String,
    payload: Vec<u8>,
}

struct NoopBlobTranslator;

impl QueryTranslator<WithBlob> for NoopBlobTranslator {
    fn translate(
        &self,
        _template: &WithBlob,
        _session: &SessionContext,
        builder: &mut CommandBuilder,
    ) -> Result<TranslationOutput<serde_json::Value>> {
        builder.append("select 1");
        Ok(stateless())
    }
}

#[test]
fn unbindable_member_fails_with_invalid_query_shape() {
    let registry = FinderRegistry::default();
    let session = SessionContext::default();
    let err = PlanBuilder::new(&registry)
        .build(&WithBlob::default(), &session, &NoopBlobTranslator)
        .unwrap_err();

    let Error::Plan(PlanError { kind, message, .. }) = err else {
        panic!("expected plan error");
    };
    assert_eq!(kind, PlanErrorKind::InvalidQueryShape);
    assert!(message.contains("payload"));
}

#[derive(Default, CompiledQuery)]
struct ThreeFlags {
    active: bool,
    archived: bool,
    starred: bool,
}

struct NoopFlagTranslator;

impl QueryTranslator<ThreeFlags> for NoopFlagTranslator {
    fn translate(
        &self,
        _template: &ThreeFlags,
        _session: &SessionContext,
        builder: &mut CommandBuilder,
    ) -> Result<TranslationOutput<serde_json::Value>> {
        builder.append("select 1");
        Ok(stateless())
    }
}

#[test]
fn bool_domain_exhaustion_is_a_hard_stop() {
    let registry = FinderRegistry::default();
    let session = SessionContext::default();
    let err = PlanBuilder::new(&registry)
        .build(&ThreeFlags::default(), &session, &NoopFlagTranslator)
        .unwrap_err();

    let Error::Plan(PlanError { kind, .. }) = err else {
        panic!("expected plan error");
    };
    assert_eq!(kind, PlanErrorKind::UniqueTemplate);
}

#[derive(Default, CompiledQuery)]
#[query(planning)]
struct PagedTitles {
    title: String,
    #[query(ignore)]
    page_size: usize,
}

impl QueryPlanning for PagedTitles {
    fn configure_template(&mut self, _source: &mut UniqueValueSource<'_>) {
        self.page_size = 25;
    }
}

struct PagedTranslator;

impl QueryTranslator<PagedTitles> for PagedTranslator {
    fn translate(
        &self,
        template: &PagedTitles,
        _session: &SessionContext,
        builder: &mut CommandBuilder,
    ) -> Result<TranslationOutput<serde_json::Value>> {
        builder.append("select data from mt_doc_book where title = ");
        builder.append_parameter(
            Value::Text(template.title.clone()),
            BackendType::Text,
        );
        builder.append(&format!(" limit {}", template.page_size));
        Ok(stateless())
    }
}

#[test]
fn explicit_planning_hook_steers_the_template() {
    let registry = FinderRegistry::default();
    let session = SessionContext::default();

    // caller's instance never becomes the template under explicit planning
    let caller = PagedTitles {
        title: "unique already".to_string(),
        page_size: 3,
    };
    let plan = PlanBuilder::new(&registry)
        .build(&caller, &session, &PagedTranslator)
        .unwrap();

    assert!(plan.commands()[0].text.ends_with("limit 25"));
    assert_ne!(
        plan.members()[0].template_value(),
        &Value::Text("unique already".to_string())
    );
}

#[derive(Default, CompiledQuery)]
struct WithReadonly {
    title: String,
    #[query(readonly)]
    revision: i32,
}

struct ReadonlyTranslator;

impl QueryTranslator<WithReadonly> for ReadonlyTranslator {
    fn translate(
        &self,
        template: &WithReadonly,
        _session: &SessionContext,
        builder: &mut CommandBuilder,
    ) -> Result<TranslationOutput<serde_json::Value>> {
        builder.append("select data from mt_doc_page where title = ");
        builder.append_parameter(
            Value::Text(template.title.clone()),
            BackendType::Text,
        );
        builder.append(" and revision = ");
        builder.append_parameter(
            Value::Int(template.revision),
            BackendType::Integer,
        );
        Ok(stateless())
    }
}

#[test]
fn readonly_members_keep_their_default_template_value() {
    let registry = FinderRegistry::default();
    let session = SessionContext::default();
    let plan = PlanBuilder::new(&registry)
        .build(&WithReadonly::default(), &session, &ReadonlyTranslator)
        .unwrap();

    // revision never receives a synthetic value; it still matches by value
    let revision_member = plan
        .members()
        .iter()
        .position(|m| m.name() == "revision")
        .unwrap();
    assert!(!plan.members()[revision_member].writable());
    assert_eq!(
        plan.members()[revision_member].template_value(),
        &Value::Int(0)
    );
    assert_eq!(
        plan.commands()[0].parameters[1].binding,
        ParameterBinding::Member {
            member: revision_member,
            transform: None
        }
    );
}
