//! The compiled query contract and its supporting traits.
//!
//! A compiled query is a plain struct whose fields are the query's
//! parameters plus optional statistics and include sinks. The
//! `#[derive(CompiledQuery)]` macro emits the member metadata and the
//! name-based accessors; planning then only ever talks to the trait.

use crate::member::{MemberInfo, ParamKind};
use crate::unique::UniqueValueSource;
use docstore_core::{Decimal, TenantId, Timestamp, TimestampTz, Value};
use std::fmt;

/// A query object type the engine can plan once and execute many times.
///
/// Implementations are normally derived. The engine requires `Default`
/// so a fresh template instance can be constructed during planning.
pub trait CompiledQuery: Default + Send + Sync + 'static {
    /// The per-row result type.
    type Output: Send + 'static;

    /// Stable name used in logging and error messages.
    const QUERY_NAME: &'static str;

    /// When true, the caller's instance is never used as the template;
    /// a fresh instance is built and `customize_template` is invoked.
    const USES_EXPLICIT_PLANNING: bool = false;

    /// Static member metadata, in declaration order.
    fn members() -> &'static [MemberInfo];

    /// Read a member's current value by name.
    fn member_value(&self, name: &str) -> Option<Value>;

    /// Overwrite a member's value by name. Returns false when the name
    /// is unknown or the value does not convert to the member's type.
    fn set_member_value(&mut self, name: &str, value: Value) -> bool;

    /// A fresh template instance for planning.
    fn template() -> Self {
        Self::default()
    }

    /// Hook for explicit planning; the derive overrides this to call
    /// [`QueryPlanning::configure_template`] when requested.
    fn customize_template(&mut self, _source: &mut UniqueValueSource<'_>) {}

    /// The statistics accumulator, when the type declares one.
    fn statistics_mut(&mut self) -> Option<&mut QueryStatistics> {
        None
    }

    /// Deliver one related document to the named include sink.
    fn accept_include(&mut self, _member: &str, _document: serde_json::Value) {}
}

/// Opt-in hook invoked on the fresh template after synthetic values are
/// assigned, for query types that need to steer template construction.
/// Values the hook writes are subject to the same uniqueness check.
pub trait QueryPlanning {
    /// Configure the template instance, drawing any needed values from
    /// the synthetic source.
    fn configure_template(&mut self, source: &mut UniqueValueSource<'_>);
}

/// A field type usable as a compiled query parameter.
pub trait QueryParameter: Sized {
    /// The parameter kind this type maps to.
    const KIND: ParamKind;

    /// Whether the type represents an absent-able value.
    const NULLABLE: bool = false;

    /// Convert to the dynamic value representation.
    fn to_value(&self) -> Value;

    /// Convert back from the dynamic representation.
    fn from_value(value: &Value) -> Option<Self>;
}

macro_rules! query_parameter {
    ($ty:ty, $kind:expr, $variant:ident) => {
        impl QueryParameter for $ty {
            const KIND: ParamKind = $kind;

            fn to_value(&self) -> Value {
                Value::$variant(self.clone().into())
            }

            fn from_value(value: &Value) -> Option<Self> {
                match value {
                    Value::$variant(v) => Some(v.clone().into()),
                    _ => None,
                }
            }
        }
    };
}

query_parameter!(bool, ParamKind::Bool, Bool);
query_parameter!(i32, ParamKind::Int, Int);
query_parameter!(i64, ParamKind::BigInt, BigInt);
query_parameter!(f32, ParamKind::Float, Float);
query_parameter!(f64, ParamKind::Double, Double);
query_parameter!(String, ParamKind::Text, Text);

impl QueryParameter for Decimal {
    const KIND: ParamKind = ParamKind::Decimal;

    fn to_value(&self) -> Value {
        Value::Decimal(self.0.clone())
    }

    fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::Decimal(v) => Some(Decimal(v.clone())),
            _ => None,
        }
    }
}

impl QueryParameter for Timestamp {
    const KIND: ParamKind = ParamKind::Timestamp;

    fn to_value(&self) -> Value {
        Value::Timestamp(self.0)
    }

    fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::Timestamp(v) => Some(Timestamp(*v)),
            _ => None,
        }
    }
}

impl QueryParameter for TimestampTz {
    const KIND: ParamKind = ParamKind::TimestampTz;

    fn to_value(&self) -> Value {
        Value::TimestampTz(self.0)
    }

    fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::TimestampTz(v) => Some(TimestampTz(*v)),
            _ => None,
        }
    }
}

impl QueryParameter for uuid::Uuid {
    const KIND: ParamKind = ParamKind::Uuid;

    fn to_value(&self) -> Value {
        Value::Uuid(self.into_bytes())
    }

    fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::Uuid(bytes) => Some(uuid::Uuid::from_bytes(*bytes)),
            _ => None,
        }
    }
}

impl<T: QueryParameter> QueryParameter for Option<T> {
    const KIND: ParamKind = T::KIND;
    const NULLABLE: bool = true;

    fn to_value(&self) -> Value {
        match self {
            Some(inner) => inner.to_value(),
            None => Value::Null,
        }
    }

    fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::Null => Some(None),
            other => T::from_value(other).map(Some),
        }
    }
}

/// An enumeration usable as a query parameter.
///
/// Implemented by `#[derive(QueryEnum)]`; variants are identified by
/// declaration-order ordinal and by name.
pub trait QueryEnum: Sized + Copy {
    /// Variant names, in declaration order.
    const VARIANTS: &'static [&'static str];

    /// Declaration-order ordinal of this variant.
    fn ordinal(&self) -> i32;

    /// Resolve a variant from its ordinal.
    fn from_ordinal(ordinal: i32) -> Option<Self>;
}

/// Implement [`QueryParameter`] for a [`QueryEnum`] type.
///
/// A blanket impl would collide with the primitive impls under
/// coherence, so enum types opt in explicitly (the derive emits this
/// for you).
#[macro_export]
macro_rules! impl_query_parameter_for_enum {
    ($ty:ty) => {
        impl $crate::QueryParameter for $ty {
            const KIND: $crate::ParamKind = $crate::ParamKind::Enum {
                variants: <$ty as $crate::QueryEnum>::VARIANTS,
            };

            fn to_value(&self) -> $crate::Value {
                $crate::Value::Int($crate::QueryEnum::ordinal(self))
            }

            fn from_value(value: &$crate::Value) -> Option<Self> {
                match value {
                    $crate::Value::Int(ordinal) => {
                        <$ty as $crate::QueryEnum>::from_ordinal(*ordinal)
                    }
                    $crate::Value::Text(name) => <$ty as $crate::QueryEnum>::VARIANTS
                        .iter()
                        .position(|v| *v == name.as_str())
                        .and_then(|i| <$ty as $crate::QueryEnum>::from_ordinal(i as i32)),
                    _ => None,
                }
            }
        }
    };
}

/// Result-count accumulator a query type can embed as a member.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct QueryStatistics {
    total_results: u64,
}

impl QueryStatistics {
    /// The total matching row count recorded by the last execution.
    pub fn total_results(&self) -> u64 {
        self.total_results
    }

    /// Record the total for this execution.
    pub fn set_total_results(&mut self, total: u64) {
        self.total_results = total;
    }
}

/// Per-document callback sink for include members.
///
/// Defaults to a no-op so derived `Default` works on query types that
/// embed one.
#[derive(Default)]
pub struct IncludeCallback {
    callback: Option<Box<dyn FnMut(serde_json::Value) + Send + Sync>>,
}

impl IncludeCallback {
    /// A sink that invokes `f` once per related document.
    pub fn new(f: impl FnMut(serde_json::Value) + Send + Sync + 'static) -> Self {
        Self {
            callback: Some(Box::new(f)),
        }
    }

    /// Deliver one document to the callback, if one is set.
    pub fn deliver(&mut self, document: serde_json::Value) {
        if let Some(callback) = self.callback.as_mut() {
            callback(document);
        }
    }
}

impl fmt::Debug for IncludeCallback {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IncludeCallback")
            .field("set", &self.callback.is_some())
            .finish()
    }
}

/// How the session tracks documents materialized by query execution.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum TrackingMode {
    /// No tracking; rows are handed back as-is.
    None,
    /// Documents are registered in the session identity map.
    #[default]
    IdentityOnly,
    /// Identity map plus original-state snapshots for dirty checking.
    DirtyChecking,
}

/// How enum parameters are stored by the backend schema.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum EnumStorage {
    /// Ordinal integers.
    #[default]
    AsInteger,
    /// Variant names as text.
    AsString,
}

/// Ambient execution settings a plan is built against.
///
/// Tracking mode participates in the plan cache key; tenant id is bound
/// live on every execution.
#[derive(Debug, Clone, Default)]
pub struct SessionContext {
    /// The active tenant.
    pub tenant: TenantId,
    /// Document tracking behavior.
    pub tracking: TrackingMode,
    /// Enum storage convention of the backend schema.
    pub enum_storage: EnumStorage,
}

impl SessionContext {
    /// A context for the given tenant with default tracking.
    pub fn for_tenant(tenant: impl Into<TenantId>) -> Self {
        Self {
            tenant: tenant.into(),
            ..Self::default()
        }
    }

    /// Replace the tracking mode.
    pub fn with_tracking(mut self, tracking: TrackingMode) -> Self {
        self.tracking = tracking;
        self
    }

    /// Replace the enum storage convention.
    pub fn with_enum_storage(mut self, enum_storage: EnumStorage) -> Self {
        self.enum_storage = enum_storage;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn primitive_parameters_round_trip_through_values() {
        assert_eq!(i32::from_value(&42i32.to_value()), Some(42));
        assert_eq!(
            String::from_value(&"hi".to_string().to_value()),
            Some("hi".to_string())
        );
        assert_eq!(bool::from_value(&true.to_value()), Some(true));
        assert_eq!(i64::from_value(&Value::Text("nope".into())), None);
    }

    #[test]
    fn option_parameters_are_nullable_with_the_inner_kind() {
        assert_eq!(<Option<i32>>::KIND, ParamKind::Int);
        assert!(<Option<i32>>::NULLABLE);
        assert!(!i32::NULLABLE);

        assert_eq!(None::<i32>.to_value(), Value::Null);
        assert_eq!(<Option<i32>>::from_value(&Value::Null), Some(None));
        assert_eq!(<Option<i32>>::from_value(&Value::Int(7)), Some(Some(7)));
    }

    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    enum Color {
        Red,
        Green,
        Blue,
    }

    impl QueryEnum for Color {
        const VARIANTS: &'static [&'static str] = &["Red", "Green", "Blue"];

        fn ordinal(&self) -> i32 {
            *self as i32
        }

        fn from_ordinal(ordinal: i32) -> Option<Self> {
            match ordinal {
                0 => Some(Color::Red),
                1 => Some(Color::Green),
                2 => Some(Color::Blue),
                _ => None,
            }
        }
    }

    crate::impl_query_parameter_for_enum!(Color);

    #[test]
    fn enum_parameters_carry_variant_names_in_their_kind() {
        let ParamKind::Enum { variants } = Color::KIND else {
            panic!("expected enum kind");
        };
        assert_eq!(variants, Color::VARIANTS);

        assert_eq!(Color::Green.to_value(), Value::Int(1));
        assert_eq!(Color::from_value(&Value::Int(2)), Some(Color::Blue));
        assert_eq!(
            Color::from_value(&Value::Text("Red".into())),
            Some(Color::Red)
        );
        assert_eq!(Color::from_value(&Value::Int(9)), None);
    }

    #[test]
    fn statistics_record_totals() {
        let mut stats = QueryStatistics::default();
        assert_eq!(stats.total_results(), 0);
        stats.set_total_results(117);
        assert_eq!(stats.total_results(), 117);
    }

    #[test]
    fn include_callback_delivers_documents() {
        // the default sink swallows documents without panicking
        let mut sink = IncludeCallback::default();
        sink.deliver(serde_json::json!({"id": 1}));

        let seen = std::sync::Arc::new(std::sync::Mutex::new(Vec::new()));
        let captured = std::sync::Arc::clone(&seen);
        let mut sink = IncludeCallback::new(move |doc| captured.lock().unwrap().push(doc));
        sink.deliver(serde_json::json!({"id": 2}));

        let seen = seen.lock().unwrap();
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0]["id"], 2);
    }

    #[test]
    fn session_context_builders_compose() {
        let ctx = SessionContext::for_tenant("green")
            .with_tracking(TrackingMode::DirtyChecking)
            .with_enum_storage(EnumStorage::AsString);
        assert_eq!(ctx.tenant.as_str(), "green");
        assert_eq!(ctx.tracking, TrackingMode::DirtyChecking);
        assert_eq!(ctx.enum_storage, EnumStorage::AsString);
    }
}
