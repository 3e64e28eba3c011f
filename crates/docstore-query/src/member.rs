//! Query member metadata and classification.
//!
//! A query type describes its data members through a static
//! [`MemberInfo`] slice, normally emitted by `#[derive(CompiledQuery)]`.
//! Classification partitions those members into the buckets the plan
//! builder works with: one optional statistics accumulator, include
//! sinks, members that cannot serve as parameters, and the candidate
//! parameter members.

use crate::unique::FinderRegistry;
use docstore_core::Value;

/// The shape of an include sink member.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IncludeKind {
    /// Appends related documents to a list.
    List,
    /// Inserts related documents into a map keyed by document id.
    Map,
    /// Invokes a callback per related document.
    Callback,
}

/// The parameter kind of a candidate member.
///
/// One parameter finder exists per kind; enums carry their variant names
/// so ordinals can be converted to storage form at bind time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ParamKind {
    Bool,
    Int,
    BigInt,
    Float,
    Double,
    Decimal,
    Text,
    Timestamp,
    TimestampTz,
    Uuid,
    Enum { variants: &'static [&'static str] },
    /// Custom value-object kind, resolved through a registered adapter.
    Custom(&'static str),
}

impl ParamKind {
    /// Short description used in error messages.
    pub fn describe(&self) -> &'static str {
        match self {
            ParamKind::Bool => "bool",
            ParamKind::Int => "i32",
            ParamKind::BigInt => "i64",
            ParamKind::Float => "f32",
            ParamKind::Double => "f64",
            ParamKind::Decimal => "decimal",
            ParamKind::Text => "string",
            ParamKind::Timestamp => "timestamp",
            ParamKind::TimestampTz => "timestamptz",
            ParamKind::Uuid => "uuid",
            ParamKind::Enum { .. } => "enum",
            ParamKind::Custom(name) => name,
        }
    }

    /// Is this a value kind (as opposed to text)?
    ///
    /// Nullable value kinds are rejected unless a custom adapter covers
    /// them; nullable text is tolerated because the builder coerces null
    /// strings to empty before planning.
    pub const fn is_value_kind(&self) -> bool {
        !matches!(self, ParamKind::Text)
    }
}

/// What a member is, structurally.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MemberShape {
    /// Result-count accumulator (`QueryStatistics`).
    Statistics,
    /// Related-document sink.
    Include(IncludeKind),
    /// Candidate bind parameter.
    Parameter(ParamKind),
    /// A type the engine cannot bind; the payload names it for errors.
    Unsupported(&'static str),
}

/// Static metadata about one query member.
#[derive(Debug, Clone, Copy)]
pub struct MemberInfo {
    /// Member (field) name
    pub name: &'static str,
    /// Structural shape
    pub shape: MemberShape,
    /// Whether the member is an `Option` over a value kind
    pub nullable: bool,
    /// False for read-only accessors; such members never receive
    /// synthetic values during template construction
    pub writable: bool,
    /// Explicitly excluded from planning
    pub ignored: bool,
}

impl MemberInfo {
    /// A candidate parameter member.
    pub const fn parameter(name: &'static str, kind: ParamKind, nullable: bool) -> Self {
        Self {
            name,
            shape: MemberShape::Parameter(kind),
            nullable,
            writable: true,
            ignored: false,
        }
    }

    /// A statistics accumulator member.
    pub const fn statistics(name: &'static str) -> Self {
        Self {
            name,
            shape: MemberShape::Statistics,
            nullable: false,
            writable: true,
            ignored: false,
        }
    }

    /// An include sink member.
    pub const fn include(name: &'static str, kind: IncludeKind) -> Self {
        Self {
            name,
            shape: MemberShape::Include(kind),
            nullable: false,
            writable: true,
            ignored: false,
        }
    }

    /// A member of a type the engine cannot bind.
    pub const fn unsupported(name: &'static str, type_name: &'static str) -> Self {
        Self {
            name,
            shape: MemberShape::Unsupported(type_name),
            nullable: false,
            writable: false,
            ignored: false,
        }
    }

    /// Mark the member read-only.
    pub const fn readonly(mut self) -> Self {
        self.writable = false;
        self
    }

    /// Mark the member ignored.
    pub const fn ignore(mut self) -> Self {
        self.ignored = true;
        self
    }

    /// The parameter kind, when this member is a parameter.
    pub const fn param_kind(&self) -> Option<ParamKind> {
        match self.shape {
            MemberShape::Parameter(kind) => Some(kind),
            _ => None,
        }
    }
}

/// A classified parameter member plus the template-value snapshot used
/// during matching.
///
/// Created once during classification; the snapshot is stashed after the
/// template is finalized and read many times while matching generated
/// parameters back to members.
#[derive(Debug, Clone)]
pub struct QueryMember {
    info: &'static MemberInfo,
    template_value: Value,
}

impl QueryMember {
    pub(crate) fn new(info: &'static MemberInfo) -> Self {
        Self {
            info,
            template_value: Value::Null,
        }
    }

    /// Member name.
    pub fn name(&self) -> &'static str {
        self.info.name
    }

    /// Member metadata.
    pub fn info(&self) -> &'static MemberInfo {
        self.info
    }

    /// The member's parameter kind.
    pub fn kind(&self) -> ParamKind {
        match self.info.shape {
            MemberShape::Parameter(kind) => kind,
            // classification only wraps parameter members
            _ => unreachable!("QueryMember wraps parameter members only"),
        }
    }

    /// Can this member receive synthesized values?
    pub fn writable(&self) -> bool {
        self.info.writable
    }

    /// The stashed template-value snapshot.
    pub fn template_value(&self) -> &Value {
        &self.template_value
    }

    pub(crate) fn stash_template_value(&mut self, value: Value) {
        self.template_value = value;
    }
}

/// The result of classifying a query type's members.
#[derive(Debug, Default)]
pub struct Classification {
    /// Optional statistics accumulator (last one wins when duplicated)
    pub statistics: Option<&'static MemberInfo>,
    /// Include sinks, in declaration order
    pub includes: Vec<&'static MemberInfo>,
    /// Members that cannot serve as parameters
    pub invalid: Vec<&'static MemberInfo>,
    /// Candidate parameter members, in declaration order
    pub members: Vec<QueryMember>,
}

/// Partition a query type's members into planning buckets.
///
/// Pure classification; invalid members are collected rather than raised
/// here so the plan builder can report them all at once.
pub fn classify(members: &'static [MemberInfo], registry: &FinderRegistry) -> Classification {
    let mut out = Classification::default();

    for info in members {
        if info.ignored {
            continue;
        }
        match info.shape {
            MemberShape::Statistics => {
                if let Some(previous) = out.statistics {
                    tracing::warn!(
                        previous = previous.name,
                        replacement = info.name,
                        "query type declares more than one statistics member; last wins"
                    );
                }
                out.statistics = Some(info);
            }
            MemberShape::Include(_) => out.includes.push(info),
            MemberShape::Parameter(kind) => {
                let covered_by_adapter = matches!(kind, ParamKind::Custom(name) if registry.has_adapter(name));
                if info.nullable && kind.is_value_kind() && !covered_by_adapter {
                    out.invalid.push(info);
                } else if registry.finder_for(&kind).is_none() {
                    out.invalid.push(info);
                } else {
                    out.members.push(QueryMember::new(info));
                }
            }
            MemberShape::Unsupported(_) => out.invalid.push(info),
        }
    }

    out
}
