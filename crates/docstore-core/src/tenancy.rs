//! Tenant identity.

use serde::{Deserialize, Serialize};
use std::fmt;

/// The sentinel tenant used when no tenant was configured.
pub const DEFAULT_TENANT: &str = "*DEFAULT*";

/// Identifier of the tenant a session operates under.
///
/// The tenant id in effect while a plan is built is recorded on the plan so
/// the matcher can tell tenant-bound parameters apart from member-bound
/// ones, even when a member happens to hold an equal string at run time.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TenantId(String);

impl TenantId {
    /// Create a tenant id.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// The sentinel tenant.
    pub fn default_tenant() -> Self {
        Self(DEFAULT_TENANT.to_string())
    }

    /// Get the raw tenant string.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Is this the sentinel tenant?
    pub fn is_default(&self) -> bool {
        self.0 == DEFAULT_TENANT
    }
}

impl Default for TenantId {
    fn default() -> Self {
        Self::default_tenant()
    }
}

impl fmt::Display for TenantId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for TenantId {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}
