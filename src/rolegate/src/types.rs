//! Core role resolution types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{BTreeMap, HashMap};
use std::fmt;

use crate::error::{Result, RoleResolutionError};

/// Permission key to grant flag
pub type PermissionMap = BTreeMap<String, bool>;

/// Stable identifier of the principal being resolved
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PrincipalId(pub u64);

impl PrincipalId {
    /// Identifier used for errors raised before any principal is known
    pub const UNSET: PrincipalId = PrincipalId(0);
}

impl From<u64> for PrincipalId {
    fn from(id: u64) -> Self {
        Self(id)
    }
}

impl fmt::Display for PrincipalId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Role definition loaded from the catalog
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Role {
    /// Canonical (uppercase) role name
    pub name: String,

    #[serde(default)]
    pub description: String,

    /// Every declared permission, granted or not
    pub permissions: PermissionMap,
}

impl Role {
    /// Permission keys whose flag is `true`
    pub fn granted(&self) -> impl Iterator<Item = &str> {
        self.permissions
            .iter()
            .filter(|(_, granted)| **granted)
            .map(|(key, _)| key.as_str())
    }
}

/// Raw `memberOf` value as delivered by the directory
///
/// Directories hand back `null`, a single DN, or a list that may contain
/// junk entries; all three shapes are accepted here and sorted out by the
/// validator.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Membership {
    #[default]
    Absent,
    Single(String),
    Many(Vec<Value>),
}

impl Membership {
    /// Membership from a list of group DNs
    pub fn groups<I, S>(groups: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::Many(groups.into_iter().map(|g| Value::String(g.into())).collect())
    }

    /// Coerce to a list of raw entries
    pub fn entries(&self) -> Vec<Value> {
        match self {
            Self::Absent => Vec::new(),
            Self::Single(dn) => vec![Value::String(dn.clone())],
            Self::Many(entries) => entries.clone(),
        }
    }

    pub fn is_empty(&self) -> bool {
        match self {
            Self::Absent => true,
            Self::Single(_) => false,
            Self::Many(entries) => entries.is_empty(),
        }
    }
}

/// Directory identity record ("LDAP user")
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IdentityRecord {
    #[serde(default)]
    pub distinguished_name: String,

    #[serde(default)]
    pub common_name: String,

    #[serde(default)]
    pub member_of: Membership,

    #[serde(default)]
    pub attributes: HashMap<String, String>,
}

impl IdentityRecord {
    pub fn new(distinguished_name: impl Into<String>, common_name: impl Into<String>) -> Self {
        Self {
            distinguished_name: distinguished_name.into(),
            common_name: common_name.into(),
            member_of: Membership::Absent,
            attributes: HashMap::new(),
        }
    }

    /// Add a group DN to the membership list
    pub fn with_group(mut self, group_dn: impl Into<String>) -> Self {
        let mut entries = self.member_of.entries();
        entries.push(Value::String(group_dn.into()));
        self.member_of = Membership::Many(entries);
        self
    }

    /// Replace the membership list
    pub fn with_membership(mut self, member_of: Membership) -> Self {
        self.member_of = member_of;
        self
    }

    /// Add a directory attribute
    pub fn with_attribute(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.insert(name.into(), value.into());
        self
    }

    /// Parse an identity record from an untrusted JSON value
    ///
    /// Fails with `InvalidIdentity` when the value is absent, not an object,
    /// or has the wrong shape.
    pub fn from_value(value: &Value) -> Result<Self> {
        match value {
            Value::Null => Err(RoleResolutionError::invalid_identity(
                "Identity record is absent",
            )),
            Value::Object(_) => serde_json::from_value(value.clone()).map_err(|e| {
                RoleResolutionError::invalid_identity(format!("Identity record has wrong shape: {}", e))
            }),
            _ => Err(RoleResolutionError::invalid_identity(
                "Identity record is not an object",
            )),
        }
    }
}

/// How a role came to be assigned
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum RoleSource {
    Group,
    Attribute,
    Override,
    Default,
}

/// One contributing mapping for a resolved role
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolvedRoleAssignment {
    pub role: String,
    pub source: RoleSource,
    /// Group DN, `attribute=value`, or override/default marker
    pub evidence: String,
}

impl ResolvedRoleAssignment {
    pub fn new(role: impl Into<String>, source: RoleSource, evidence: impl Into<String>) -> Self {
        Self {
            role: role.into(),
            source,
            evidence: evidence.into(),
        }
    }
}

/// Administrative adjustment to a principal's directory-derived roles
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Override {
    pub principal_id: PrincipalId,

    #[serde(default)]
    pub roles_to_add: Vec<String>,

    #[serde(default)]
    pub roles_to_remove: Vec<String>,

    /// When non-empty, replaces the derived roles outright
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub complete_replacement: Option<Vec<String>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<DateTime<Utc>>,
}

impl Override {
    pub fn new(principal_id: impl Into<PrincipalId>) -> Self {
        Self {
            principal_id: principal_id.into(),
            roles_to_add: Vec::new(),
            roles_to_remove: Vec::new(),
            complete_replacement: None,
            expires_at: None,
        }
    }

    pub fn add_role(mut self, role: impl Into<String>) -> Self {
        self.roles_to_add.push(role.into());
        self
    }

    pub fn remove_role(mut self, role: impl Into<String>) -> Self {
        self.roles_to_remove.push(role.into());
        self
    }

    pub fn replace_with<I, S>(mut self, roles: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.complete_replacement = Some(roles.into_iter().map(Into::into).collect());
        self
    }

    pub fn expires_at(mut self, at: DateTime<Utc>) -> Self {
        self.expires_at = Some(at);
        self
    }

    /// Whether the override has expired as of `now`
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.map(|at| at < now).unwrap_or(false)
    }
}

/// Whether a result was computed or served from cache
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Origin {
    Fresh,
    Cached,
}

/// Per-call resolution options
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ResolveOptions {
    /// Bypass the cache lookup (the fresh result is still cached)
    pub skip_cache: bool,

    /// Attach the identity record to the result
    pub include_raw_identity: bool,
}

impl ResolveOptions {
    pub fn skip_cache() -> Self {
        Self {
            skip_cache: true,
            ..Self::default()
        }
    }
}

/// Outcome of a resolution
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolutionResult {
    pub principal_id: PrincipalId,

    /// Deduplicated canonical role names, never empty
    pub roles: Vec<String>,

    pub assignments: Vec<ResolvedRoleAssignment>,

    pub permissions: PermissionMap,

    pub resolved_at: DateTime<Utc>,

    pub expires_at: DateTime<Utc>,

    pub origin: Origin,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub raw_identity: Option<IdentityRecord>,
}

impl ResolutionResult {
    pub fn has_role(&self, role: &str) -> bool {
        let role = crate::validator::canonical_role_name(role);
        self.roles.iter().any(|r| *r == role)
    }

    pub fn has_permission(&self, key: &str) -> bool {
        crate::permissions::has_permission(&self.permissions, key)
    }
}
