//! Tenant/namespace scope shared by every permission operation

use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// Allowed characters for tenant and namespace names
static NAME_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[-=:.\w]+$").expect("scope name pattern is valid"));

/// The `(tenant, namespace)` pair a permission set belongs to.
///
/// Nothing in the reconciler crosses a scope boundary, so every call takes one
/// of these explicitly.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Scope {
    tenant: String,
    namespace: String,
}

impl Scope {
    /// Build a validated scope.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidScope`] if either name is empty or contains
    /// characters outside `[-=:.\w]`.
    pub fn new(tenant: impl Into<String>, namespace: impl Into<String>) -> Result<Self> {
        let tenant = tenant.into();
        let namespace = namespace.into();
        validate_name("tenant", &tenant)?;
        validate_name("namespace", &namespace)?;
        Ok(Self { tenant, namespace })
    }

    pub fn tenant(&self) -> &str {
        &self.tenant
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    /// The `tenant/namespace` key used by stores and log output
    pub fn key(&self) -> String {
        format!("{}/{}", self.tenant, self.namespace)
    }
}

fn validate_name(field: &'static str, value: &str) -> Result<()> {
    if value.is_empty() {
        return Err(Error::InvalidScope {
            field,
            value: value.to_string(),
            reason: "must not be empty".to_string(),
        });
    }
    if !NAME_PATTERN.is_match(value) {
        return Err(Error::InvalidScope {
            field,
            value: value.to_string(),
            reason: "allowed characters are letters, digits and -=:._".to_string(),
        });
    }
    Ok(())
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.tenant, self.namespace)
    }
}

impl FromStr for Scope {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.split_once('/') {
            Some((tenant, namespace)) => Scope::new(tenant, namespace),
            None => Err(Error::InvalidScope {
                field: "namespace",
                value: s.to_string(),
                reason: "expected 'tenant/namespace'".to_string(),
            }),
        }
    }
}
