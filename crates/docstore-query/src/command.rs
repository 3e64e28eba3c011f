//! Command accumulation: text fragments and parameter placeholders.
//!
//! The translator emits command text and parameters through a
//! [`CommandBuilder`]; the captured [`CommandPlan`]s are replayed
//! verbatim at execution time, so placeholder tokens must tokenize
//! identically on replay.

use docstore_core::{BackendType, Value};

/// How a string member's value is wrapped before binding.
///
/// Recorded at plan time from the wildcard-wrapped form the translator
/// generated; re-applied to live values on every execution.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WildcardTransform {
    /// `value%` - starts-with predicates
    Prefix,
    /// `%value%` - contains predicates
    Contains,
    /// `%value` - ends-with predicates
    Suffix,
}

impl WildcardTransform {
    /// Wrap a live string value the way the plan recorded.
    pub fn apply(&self, value: &str) -> String {
        match self {
            WildcardTransform::Prefix => format!("{value}%"),
            WildcardTransform::Contains => format!("%{value}%"),
            WildcardTransform::Suffix => format!("%{value}"),
        }
    }

    /// Detect which transform maps `template` onto `observed`, if any.
    pub fn detect(template: &str, observed: &str) -> Option<Self> {
        for transform in [
            WildcardTransform::Prefix,
            WildcardTransform::Contains,
            WildcardTransform::Suffix,
        ] {
            if transform.apply(template) == observed {
                return Some(transform);
            }
        }
        None
    }
}

/// How a captured parameter is re-bound on execution.
///
/// Every parameter is classified exactly once: tenant-bound,
/// member-bound (directly or through a filter), or hard-coded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParameterBinding {
    /// Bound to the active tenant id at execution time.
    Tenant,
    /// Bound to a query member's live value.
    Member {
        /// Index into the plan's member list
        member: usize,
        /// Wildcard wrapping recorded at plan time, for string members
        transform: Option<WildcardTransform>,
    },
    /// Bound through a translator-supplied filter.
    Filtered {
        /// Index into the plan's filter list
        filter: usize,
        /// Index into the plan's member list
        member: usize,
    },
    /// A literal baked into the query expression; the captured value is
    /// replayed as-is.
    HardCoded,
}

/// One captured parameter of a command plan.
#[derive(Debug, Clone)]
pub struct ParameterUsage {
    /// Zero-based position within the owning statement
    pub index: usize,
    /// Parameter name (`p0`, `p1`, ...)
    pub name: String,
    /// Value observed at plan time
    pub value: Value,
    /// Driver-level type tag
    pub backend_type: BackendType,
    /// Re-binding rule, filled in by the matcher
    pub binding: ParameterBinding,
}

/// Accumulated text and parameters for one statement.
#[derive(Debug, Clone, Default)]
pub struct CommandPlan {
    /// SQL fragment for this statement
    pub text: String,
    /// Parameters in placeholder order
    pub parameters: Vec<ParameterUsage>,
}

impl CommandPlan {
    fn is_blank(&self) -> bool {
        self.text.is_empty() && self.parameters.is_empty()
    }
}

/// Accumulator the translator writes command text and parameters into.
///
/// Each parameter append bumps a monotonic per-statement index and
/// writes a `$n` positional token into the text. Translator-authored
/// fragments must not contain `$` immediately followed by a digit, so
/// the replayed text tokenizes exactly as captured.
#[derive(Debug)]
pub struct CommandBuilder {
    commands: Vec<CommandPlan>,
}

impl CommandBuilder {
    /// Create a builder with one empty statement started.
    pub fn new() -> Self {
        Self {
            commands: vec![CommandPlan::default()],
        }
    }

    fn current(&mut self) -> &mut CommandPlan {
        if self.commands.is_empty() {
            self.commands.push(CommandPlan::default());
        }
        let last = self.commands.len() - 1;
        &mut self.commands[last]
    }

    /// Append literal text to the current statement.
    pub fn append(&mut self, text: &str) {
        self.current().text.push_str(text);
    }

    /// Start a new statement. A no-op when the current statement is
    /// still blank.
    pub fn start_new_command(&mut self) {
        if !self.current().is_blank() {
            self.commands.push(CommandPlan::default());
        }
    }

    /// Append a parameter, writing its positional placeholder into the
    /// text. Returns the parameter's index within the current statement
    /// so the translator can customize the captured entry further.
    pub fn append_parameter(&mut self, value: Value, backend_type: BackendType) -> usize {
        let command = self.current();
        let index = command.parameters.len();
        command.text.push_str(&format!("${}", index + 1));
        command.parameters.push(ParameterUsage {
            index,
            name: format!("p{index}"),
            value,
            backend_type,
            binding: ParameterBinding::HardCoded,
        });
        index
    }

    /// Append templated text where each `?` is replaced by the next
    /// parameter from `params`, in order.
    pub fn append_with_parameters(&mut self, template: &str, params: Vec<(Value, BackendType)>) {
        let mut params = params.into_iter();
        let mut pieces = template.split('?');
        if let Some(first) = pieces.next() {
            self.append(first);
        }
        for piece in pieces {
            if let Some((value, backend_type)) = params.next() {
                self.append_parameter(value, backend_type);
            }
            self.append(piece);
        }
    }

    /// Finish accumulation, dropping a trailing blank statement.
    pub fn finish(mut self) -> Vec<CommandPlan> {
        if self.commands.len() > 1 && self.commands.last().is_some_and(CommandPlan::is_blank) {
            self.commands.pop();
        }
        self.commands
    }
}

impl Default for CommandBuilder {
    fn default() -> Self {
        Self::new()
    }
}
