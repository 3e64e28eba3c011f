//! Synthetic unique values and the parameter finder registry.
//!
//! Matching recognizes a generated parameter by its *value*, not its
//! position: the translator orders parameters by its own traversal, so
//! every template member value must be distinguishable from realistic
//! data and from every other member of the same type. Finders dispense
//! those values and decide when a set of observed values is already
//! mutually unique.

use crate::member::{ParamKind, QueryMember};
use docstore_core::{BackendType, Value};
use std::collections::{HashMap, VecDeque};

/// How many values a queue refill requests at a time.
const REFILL_BATCH: usize = 8;

/// Microseconds for 1800-01-01T00:00:00Z, safely before any business date.
const TIMESTAMP_BASE: i64 = -5_364_662_400_000_000;

/// Microseconds for 1753-01-01T00:00:00Z.
const TIMESTAMPTZ_BASE: i64 = -6_847_804_800_000_000;

const MICROS_PER_DAY: i64 = 86_400_000_000;

/// A strategy for one parameter kind: generates synthetic unique values
/// and checks observed values for mutual uniqueness.
pub trait ParameterFinder: Send + Sync {
    /// Does this finder handle the given kind?
    fn matches(&self, kind: &ParamKind) -> bool;

    /// Produce up to `count` distinct values for `kind`, starting at the
    /// given dispense offset. Returning fewer than `count` (possibly
    /// zero) signals the kind's value domain is exhausted.
    fn unique_values(&self, kind: &ParamKind, offset: usize, count: usize) -> Vec<Value>;

    /// The driver-level type tag for parameters of this kind.
    fn backend_type(&self, kind: &ParamKind) -> BackendType;

    /// Are the observed values of this finder's members mutually unique?
    fn values_are_unique(&self, values: &[&Value]) -> bool {
        for i in 0..values.len() {
            for j in (i + 1)..values.len() {
                if values[i] == values[j] {
                    return false;
                }
            }
        }
        true
    }
}

macro_rules! counting_finder {
    ($name:ident, $kind:pat, $backend:expr, |$offset:ident| $make:expr) => {
        struct $name;

        impl ParameterFinder for $name {
            fn matches(&self, kind: &ParamKind) -> bool {
                matches!(kind, $kind)
            }

            fn unique_values(&self, _kind: &ParamKind, offset: usize, count: usize) -> Vec<Value> {
                (offset..offset + count)
                    .map(|$offset| $make)
                    .collect()
            }

            fn backend_type(&self, _kind: &ParamKind) -> BackendType {
                $backend
            }
        }
    };
}

counting_finder!(IntFinder, ParamKind::Int, BackendType::Integer, |n| {
    Value::Int(-2_000_000_000 - n as i32)
});
counting_finder!(BigIntFinder, ParamKind::BigInt, BackendType::BigInt, |n| {
    Value::BigInt(-9_000_000_000_000_000_000 - n as i64)
});
counting_finder!(FloatFinder, ParamKind::Float, BackendType::Real, |n| {
    Value::Float(-1.0e30 * (n + 1) as f32)
});
counting_finder!(DoubleFinder, ParamKind::Double, BackendType::Double, |n| {
    Value::Double(-1.0e200 * (n + 1) as f64)
});
counting_finder!(DecimalFinder, ParamKind::Decimal, BackendType::Decimal, |n| {
    Value::Decimal(format!("-{}", 9_000_000_000_000_000_u64 - n as u64))
});
counting_finder!(
    TimestampFinder,
    ParamKind::Timestamp,
    BackendType::Timestamp,
    |n| Value::Timestamp(TIMESTAMP_BASE - n as i64 * MICROS_PER_DAY)
);
counting_finder!(
    TimestampTzFinder,
    ParamKind::TimestampTz,
    BackendType::TimestampTz,
    |n| Value::TimestampTz(TIMESTAMPTZ_BASE - n as i64 * MICROS_PER_DAY)
);

/// Fresh random identifiers; collision with realistic data is as likely
/// as any other v4 collision.
struct UuidFinder;

impl ParameterFinder for UuidFinder {
    fn matches(&self, kind: &ParamKind) -> bool {
        matches!(kind, ParamKind::Uuid)
    }

    fn unique_values(&self, _kind: &ParamKind, _offset: usize, count: usize) -> Vec<Value> {
        (0..count)
            .map(|_| Value::Uuid(uuid::Uuid::new_v4().into_bytes()))
            .collect()
    }

    fn backend_type(&self, _kind: &ParamKind) -> BackendType {
        BackendType::Uuid
    }
}

/// Synthetic strings are hyphenated v4 uuids - no realistic title,
/// name, or code looks like one.
struct TextFinder;

impl ParameterFinder for TextFinder {
    fn matches(&self, kind: &ParamKind) -> bool {
        matches!(kind, ParamKind::Text)
    }

    fn unique_values(&self, _kind: &ParamKind, _offset: usize, count: usize) -> Vec<Value> {
        (0..count)
            .map(|_| Value::Text(uuid::Uuid::new_v4().to_string()))
            .collect()
    }

    fn backend_type(&self, _kind: &ParamKind) -> BackendType {
        BackendType::Text
    }
}

/// Two-value domain; a third bool member can never be made unique.
struct BoolFinder;

impl ParameterFinder for BoolFinder {
    fn matches(&self, kind: &ParamKind) -> bool {
        matches!(kind, ParamKind::Bool)
    }

    fn unique_values(&self, _kind: &ParamKind, offset: usize, count: usize) -> Vec<Value> {
        (offset..(offset + count).min(2))
            .map(|n| Value::Bool(n == 0))
            .collect()
    }

    fn backend_type(&self, _kind: &ParamKind) -> BackendType {
        BackendType::Boolean
    }
}

/// Enumerations dispense variant ordinals; the domain is exactly the
/// variant count, so two members of a one-variant enum fail planning.
struct EnumFinder;

impl ParameterFinder for EnumFinder {
    fn matches(&self, kind: &ParamKind) -> bool {
        matches!(kind, ParamKind::Enum { .. })
    }

    fn unique_values(&self, kind: &ParamKind, offset: usize, count: usize) -> Vec<Value> {
        let ParamKind::Enum { variants } = kind else {
            return Vec::new();
        };
        (offset..(offset + count).min(variants.len()))
            .map(|n| Value::Int(n as i32))
            .collect()
    }

    fn backend_type(&self, _kind: &ParamKind) -> BackendType {
        BackendType::Integer
    }
}

/// Per-planning-attempt source of not-yet-consumed synthetic values.
///
/// Values already dispensed within one attempt are never repeated; the
/// source is discarded once the plan is built.
pub struct UniqueValueSource<'a> {
    registry: &'a FinderRegistry,
    queues: HashMap<ParamKind, VecDeque<Value>>,
    dispensed: HashMap<ParamKind, usize>,
    enum_ordinals: usize,
}

impl<'a> UniqueValueSource<'a> {
    /// Create a fresh source backed by the given registry.
    pub fn new(registry: &'a FinderRegistry) -> Self {
        Self {
            registry,
            queues: HashMap::new(),
            dispensed: HashMap::new(),
            enum_ordinals: 0,
        }
    }

    /// Draw the next unique value of the given kind.
    ///
    /// Returns `None` when the kind has no finder or its value domain is
    /// exhausted - the caller turns that into a planning error.
    pub fn next(&mut self, kind: &ParamKind) -> Option<Value> {
        // ordinals come from one pool shared across all enum kinds:
        // matching compares dynamic values, so members of two different
        // enum types must not both receive ordinal zero
        if let ParamKind::Enum { variants } = kind {
            if self.enum_ordinals >= variants.len() {
                return None;
            }
            let ordinal = self.enum_ordinals;
            self.enum_ordinals += 1;
            return Some(Value::Int(ordinal as i32));
        }

        let queue = self.queues.entry(*kind).or_default();
        if queue.is_empty() {
            let finder = self.registry.finder_for(kind)?;
            let offset = self.dispensed.get(kind).copied().unwrap_or(0);
            let batch = finder.unique_values(kind, offset, REFILL_BATCH);
            if batch.is_empty() {
                return None;
            }
            *self.dispensed.entry(*kind).or_default() += batch.len();
            queue.extend(batch);
        }
        queue.pop_front()
    }
}

/// The set of parameter finders available to a plan builder.
///
/// An explicitly constructed value owned by the client instance; custom
/// value-object adapters are registered by type name.
pub struct FinderRegistry {
    finders: Vec<Box<dyn ParameterFinder>>,
    adapters: HashMap<&'static str, Box<dyn ParameterFinder>>,
}

impl Default for FinderRegistry {
    fn default() -> Self {
        Self {
            finders: vec![
                Box::new(UuidFinder),
                Box::new(TextFinder),
                Box::new(IntFinder),
                Box::new(BigIntFinder),
                Box::new(FloatFinder),
                Box::new(DoubleFinder),
                Box::new(DecimalFinder),
                Box::new(TimestampFinder),
                Box::new(TimestampTzFinder),
                Box::new(BoolFinder),
                Box::new(EnumFinder),
            ],
            adapters: HashMap::new(),
        }
    }
}

impl FinderRegistry {
    /// A registry with the standard finder set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a custom value-object adapter for `ParamKind::Custom(name)`
    /// members.
    pub fn register_adapter(&mut self, name: &'static str, finder: Box<dyn ParameterFinder>) {
        self.adapters.insert(name, finder);
    }

    /// Is an adapter registered under this name?
    pub fn has_adapter(&self, name: &str) -> bool {
        self.adapters.contains_key(name)
    }

    /// Resolve the finder for a kind, consulting adapters for custom kinds.
    pub fn finder_for(&self, kind: &ParamKind) -> Option<&dyn ParameterFinder> {
        if let ParamKind::Custom(name) = kind {
            return self.adapters.get(name).map(Box::as_ref);
        }
        self.finders
            .iter()
            .find(|f| f.matches(kind))
            .map(Box::as_ref)
    }

    /// Check that the members' observed values are mutually
    /// distinguishable. `values[i]` is the current value of `members[i]`.
    ///
    /// Matching compares dynamic values, so two equal values collide
    /// even when the members' kinds differ (two enum types both at
    /// ordinal zero). Custom adapters may additionally declare
    /// collisions that plain value equality misses.
    pub fn values_unique(&self, members: &[QueryMember], values: &[Value]) -> bool {
        self.first_colliding_kind(members, values).is_none()
    }

    /// The kind of the first member whose observed value collides, if any.
    pub fn first_colliding_kind(
        &self,
        members: &[QueryMember],
        values: &[Value],
    ) -> Option<ParamKind> {
        debug_assert_eq!(members.len(), values.len());
        for i in 0..values.len() {
            for j in (i + 1)..values.len() {
                if values[i] == values[j] {
                    return Some(members[i].kind());
                }
            }
        }

        let mut groups: HashMap<ParamKind, Vec<&Value>> = HashMap::new();
        for (member, value) in members.iter().zip(values) {
            groups.entry(member.kind()).or_default().push(value);
        }
        for member in members {
            let kind = member.kind();
            if let (Some(finder), Some(group)) = (self.finder_for(&kind), groups.get(&kind)) {
                if !finder.values_are_unique(group) {
                    return Some(kind);
                }
            }
        }
        None
    }
}
