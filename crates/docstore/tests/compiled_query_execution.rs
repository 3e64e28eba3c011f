//! Session-level execution of compiled queries against a stub
//! connection: plan reuse, live re-binding, statistics, includes, and
//! enum storage conventions.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use asupersync::runtime::RuntimeBuilder;
use docstore::prelude::*;
use docstore::PlanCache;
use docstore_core::{BackendType, ColumnInfo};

struct JsonHandler;

impl RowHandler<serde_json::Value> for JsonHandler {
    fn kind(&self) -> RowHandlerKind {
        RowHandlerKind::Stateless
    }

    fn handle(&self, row: &Row) -> Result<serde_json::Value> {
        match row.get_by_name("data") {
            Some(Value::Json(doc)) => Ok(doc.clone()),
            Some(Value::Text(raw)) => Ok(serde_json::from_str(raw)?),
            _ => Ok(serde_json::Value::Null),
        }
    }

    fn for_session(&self, _session: &SessionContext) -> Arc<dyn RowHandler<serde_json::Value>> {
        Arc::new(JsonHandler)
    }
}

/// Records what was executed and replays canned result sets.
struct RecordingConnection {
    executed: Mutex<Vec<(String, Vec<Value>)>>,
    results: Mutex<Vec<Vec<Row>>>,
}

impl RecordingConnection {
    fn empty() -> Self {
        Self::returning(Vec::new())
    }

    fn returning(results: Vec<Vec<Row>>) -> Self {
        Self {
            executed: Mutex::new(Vec::new()),
            results: Mutex::new(results),
        }
    }

    fn executed(&self) -> Vec<(String, Vec<Value>)> {
        self.executed.lock().unwrap().clone()
    }
}

impl Connection for RecordingConnection {
    async fn query(&self, _cx: &Cx, sql: &str, params: &[Value]) -> Outcome<Vec<Row>, Error> {
        self.executed
            .lock()
            .unwrap()
            .push((sql.to_string(), params.to_vec()));
        let mut results = self.results.lock().unwrap();
        if results.is_empty() {
            Outcome::Ok(Vec::new())
        } else {
            Outcome::Ok(results.remove(0))
        }
    }

    async fn execute(&self, _cx: &Cx, _sql: &str, _params: &[Value]) -> Outcome<u64, Error> {
        Outcome::Ok(0)
    }
}

fn run<F: std::future::Future>(f: F) -> F::Output {
    let rt = RuntimeBuilder::current_thread()
        .build()
        .expect("create asupersync runtime");
    rt.block_on(f)
}

#[derive(Default, CompiledQuery)]
struct BooksByTitle {
    title: String,
    stats: QueryStatistics,
}

/// Counts translations so plan reuse is observable.
#[derive(Default)]
struct TitleTranslator {
    calls: AtomicUsize,
}

impl QueryTranslator<BooksByTitle> for TitleTranslator {
    fn translate(
        &self,
        template: &BooksByTitle,
        session: &SessionContext,
        builder: &mut CommandBuilder,
    ) -> Result<TranslationOutput<serde_json::Value>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        builder.append(
            "select data, count(*) over () as total_rows from mt_doc_book where tenant_id = ",
        );
        builder.append_parameter(
            Value::Text(session.tenant.as_str().to_string()),
            BackendType::Text,
        );
        builder.append(" and title like ");
        builder.append_parameter(
            Value::Text(format!("{}%", template.title)),
            BackendType::Text,
        );
        builder.append(" and deleted = ");
        builder.append_parameter(Value::Bool(false), BackendType::Boolean);
        Ok(TranslationOutput {
            row_handler: Arc::new(JsonHandler),
            filters: Vec::new(),
        })
    }
}

fn book_rows(total: i64) -> Vec<Row> {
    let columns = Arc::new(ColumnInfo::new(vec![
        "data".to_string(),
        "total_rows".to_string(),
    ]));
    vec![
        Row::with_columns(
            Arc::clone(&columns),
            vec![
                Value::Json(serde_json::json!({"title": "Dune"})),
                Value::BigInt(total),
            ],
        ),
        Row::with_columns(
            columns,
            vec![
                Value::Json(serde_json::json!({"title": "Dune Messiah"})),
                Value::BigInt(total),
            ],
        ),
    ]
}

#[test]
fn live_values_bind_through_a_cached_plan() {
    let session = Session::new(RecordingConnection::returning(vec![book_rows(250)]))
        .with_tenant("blue");
    let translator = TitleTranslator::default();

    run(async {
        let cx = Cx::for_testing();
        let mut query = BooksByTitle {
            title: "Dun".to_string(),
            stats: QueryStatistics::default(),
        };
        let outcome = session.execute_compiled(&cx, &mut query, &translator).await;
        let Outcome::Ok(books) = outcome else {
            panic!("expected Ok outcome");
        };
        assert_eq!(books.len(), 2);
        assert_eq!(books[0]["title"], "Dune");
        assert_eq!(query.stats.total_results(), 250);
    });

    let executed = session.connection().executed();
    assert_eq!(executed.len(), 1);
    let (sql, params) = &executed[0];
    assert!(sql.contains("tenant_id = $1"));
    assert!(sql.contains("title like $2"));
    // live tenant, wildcard re-applied to the live value, literal replayed
    assert_eq!(params[0], Value::Text("blue".to_string()));
    assert_eq!(params[1], Value::Text("Dun%".to_string()));
    assert_eq!(params[2], Value::Bool(false));
}

#[test]
fn second_execution_reuses_the_plan() {
    let session = Session::new(RecordingConnection::empty());
    let translator = TitleTranslator::default();

    run(async {
        let cx = Cx::for_testing();
        for title in ["Dune", "Hyperion"] {
            let mut query = BooksByTitle {
                title: title.to_string(),
                stats: QueryStatistics::default(),
            };
            let outcome = session.execute_compiled(&cx, &mut query, &translator).await;
            assert!(matches!(outcome, Outcome::Ok(_)));
        }
    });

    assert_eq!(translator.calls.load(Ordering::SeqCst), 1);
    assert_eq!(session.cache().len(), 1);
    let executed = session.connection().executed();
    assert_eq!(executed[0].1[1], Value::Text("Dune%".to_string()));
    assert_eq!(executed[1].1[1], Value::Text("Hyperion%".to_string()));
}

#[test]
fn sessions_sharing_a_cache_bind_their_own_tenant() {
    let cache = Arc::new(PlanCache::new());
    let translator = TitleTranslator::default();

    let first = Session::new(RecordingConnection::empty())
        .with_tenant("tenant-a")
        .with_cache(Arc::clone(&cache));
    let second = Session::new(RecordingConnection::empty())
        .with_tenant("tenant-b")
        .with_cache(Arc::clone(&cache));

    run(async {
        let cx = Cx::for_testing();
        let mut query = BooksByTitle::default();
        assert!(matches!(
            first.execute_compiled(&cx, &mut query, &translator).await,
            Outcome::Ok(_)
        ));
        let mut query = BooksByTitle::default();
        assert!(matches!(
            second.execute_compiled(&cx, &mut query, &translator).await,
            Outcome::Ok(_)
        ));
    });

    // one plan served both tenants; each execution bound its own id
    assert_eq!(translator.calls.load(Ordering::SeqCst), 1);
    assert_eq!(cache.len(), 1);
    assert_eq!(
        first.connection().executed()[0].1[0],
        Value::Text("tenant-a".to_string())
    );
    assert_eq!(
        second.connection().executed()[0].1[0],
        Value::Text("tenant-b".to_string())
    );
}

/// Slow translator for racing concurrent plan requests.
#[derive(Default)]
struct SlowTranslator {
    calls: AtomicUsize,
}

impl QueryTranslator<BooksByTitle> for SlowTranslator {
    fn translate(
        &self,
        template: &BooksByTitle,
        _session: &SessionContext,
        builder: &mut CommandBuilder,
    ) -> Result<TranslationOutput<serde_json::Value>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        std::thread::sleep(Duration::from_millis(10));
        builder.append("select data from mt_doc_book where title = ");
        builder.append_parameter(Value::Text(template.title.clone()), BackendType::Text);
        Ok(TranslationOutput {
            row_handler: Arc::new(JsonHandler),
            filters: Vec::new(),
        })
    }
}

#[test]
fn concurrent_plan_requests_build_once() {
    let session = Session::new(RecordingConnection::empty());
    let translator = SlowTranslator::default();

    std::thread::scope(|scope| {
        for _ in 0..8 {
            scope.spawn(|| {
                let plan = session
                    .plan_for(&BooksByTitle::default(), &translator)
                    .unwrap();
                assert_eq!(plan.query_name(), "BooksByTitle");
            });
        }
    });

    assert_eq!(translator.calls.load(Ordering::SeqCst), 1);
    assert_eq!(session.cache().len(), 1);
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, QueryEnum)]
enum Status {
    #[default]
    Draft,
    Published,
    Retired,
}

#[derive(Default, CompiledQuery)]
struct BooksByStatus {
    status: Status,
}

/// Emits the variant name, the way a string-storage schema would.
struct StatusTranslator;

impl QueryTranslator<BooksByStatus> for StatusTranslator {
    fn translate(
        &self,
        template: &BooksByStatus,
        _session: &SessionContext,
        builder: &mut CommandBuilder,
    ) -> Result<TranslationOutput<serde_json::Value>> {
        let name = Status::VARIANTS[template.status.ordinal() as usize];
        builder.append("select data from mt_doc_book where status = ");
        builder.append_parameter(Value::Text(name.to_string()), BackendType::Text);
        Ok(TranslationOutput {
            row_handler: Arc::new(JsonHandler),
            filters: Vec::new(),
        })
    }
}

#[test]
fn enum_members_follow_the_session_storage_convention() {
    let session =
        Session::new(RecordingConnection::empty()).with_enum_storage(EnumStorage::AsString);

    run(async {
        let cx = Cx::for_testing();
        let mut query = BooksByStatus {
            status: Status::Published,
        };
        assert!(matches!(
            session
                .execute_compiled(&cx, &mut query, &StatusTranslator)
                .await,
            Outcome::Ok(_)
        ));
    });

    // ordinal converted to its variant name at bind time
    assert_eq!(
        session.connection().executed()[0].1[0],
        Value::Text("Published".to_string())
    );
}

#[derive(Default, CompiledQuery)]
struct AuthorLibrary {
    author_id: i64,
    #[query(include)]
    books: Vec<serde_json::Value>,
    #[query(include = "map")]
    books_by_id: HashMap<String, serde_json::Value>,
    on_review: IncludeCallback,
}

struct LibraryTranslator;

impl QueryTranslator<AuthorLibrary> for LibraryTranslator {
    fn translate(
        &self,
        template: &AuthorLibrary,
        _session: &SessionContext,
        builder: &mut CommandBuilder,
    ) -> Result<TranslationOutput<serde_json::Value>> {
        builder.append(
            "select a.data, b.data as \"__include:books\", b.data as \"__include:books_by_id\", \
             r.data as \"__include:on_review\" from mt_doc_author a where a.id = ",
        );
        builder.append_parameter(Value::BigInt(template.author_id), BackendType::BigInt);
        Ok(TranslationOutput {
            row_handler: Arc::new(JsonHandler),
            filters: Vec::new(),
        })
    }
}

#[test]
fn include_columns_feed_list_map_and_callback_sinks() {
    let columns = Arc::new(ColumnInfo::new(vec![
        "data".to_string(),
        "__include:books".to_string(),
        "__include:books_by_id".to_string(),
        "__include:on_review".to_string(),
    ]));
    let rows = vec![Row::with_columns(
        columns,
        vec![
            Value::Json(serde_json::json!({"name": "Herbert"})),
            Value::Json(serde_json::json!({"id": "b1", "title": "Dune"})),
            Value::Json(serde_json::json!({"id": "b1", "title": "Dune"})),
            Value::Json(serde_json::json!({"id": "r1", "verdict": "classic"})),
        ],
    )];
    let session = Session::new(RecordingConnection::returning(vec![rows]));

    let reviews = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&reviews);

    run(async {
        let cx = Cx::for_testing();
        let mut query = AuthorLibrary {
            author_id: 7,
            on_review: IncludeCallback::new(move |doc| sink.lock().unwrap().push(doc)),
            ..Default::default()
        };
        let outcome = session
            .execute_compiled(&cx, &mut query, &LibraryTranslator)
            .await;
        let Outcome::Ok(authors) = outcome else {
            panic!("expected Ok outcome");
        };
        assert_eq!(authors.len(), 1);
        assert_eq!(query.books.len(), 1);
        assert_eq!(query.books[0]["title"], "Dune");
        assert_eq!(query.books_by_id["b1"]["title"], "Dune");
    });

    let reviews = reviews.lock().unwrap();
    assert_eq!(reviews.len(), 1);
    assert_eq!(reviews[0]["verdict"], "classic");
}
