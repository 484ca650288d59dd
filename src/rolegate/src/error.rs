//! Error types for role resolution

use crate::types::PrincipalId;
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;
use thiserror::Error;

/// Error taxonomy shared by hard failures and absorbed diagnostics
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorKind {
    /// A distinguished name failed the structural check
    MalformedDn,

    /// A non-empty membership list had no usable entries
    MissingMembershipData,

    /// A group DN has no role mapping
    UnmappedGroup,

    /// An attribute value has no role mapping
    UnmappedAttribute,

    /// The identity record itself is unusable
    InvalidIdentity,

    /// Reserved for a persistence collaborator
    DatabaseError,

    /// Construction-time configuration problem
    ConfigError,

    /// Cache state problem
    CacheError,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::MalformedDn => "MALFORMED_DN",
            Self::MissingMembershipData => "MISSING_MEMBERSHIP_DATA",
            Self::UnmappedGroup => "UNMAPPED_GROUP",
            Self::UnmappedAttribute => "UNMAPPED_ATTRIBUTE",
            Self::InvalidIdentity => "INVALID_IDENTITY",
            Self::DatabaseError => "DATABASE_ERROR",
            Self::ConfigError => "CONFIG_ERROR",
            Self::CacheError => "CACHE_ERROR",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Role resolution error
///
/// Carries the offending principal (`0` for construction-time errors) and a
/// structured detail map for diagnostics.
#[derive(Debug, Clone, Error)]
#[error("{kind}: {message} (principal {principal_id})")]
pub struct RoleResolutionError {
    pub kind: ErrorKind,
    pub message: String,
    pub principal_id: PrincipalId,
    pub details: BTreeMap<String, String>,
}

impl RoleResolutionError {
    /// Create an error of the given kind with no principal attached
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            principal_id: PrincipalId::UNSET,
            details: BTreeMap::new(),
        }
    }

    pub fn malformed_dn(dn: &str) -> Self {
        Self::new(ErrorKind::MalformedDn, "Malformed distinguished name").with_detail("dn", dn)
    }

    pub fn missing_membership_data(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::MissingMembershipData, message)
    }

    pub fn invalid_identity(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::InvalidIdentity, message)
    }

    pub fn config(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::ConfigError, message)
    }

    /// Attach the principal this error concerns
    pub fn with_principal(mut self, principal_id: PrincipalId) -> Self {
        self.principal_id = principal_id;
        self
    }

    /// Add a diagnostic detail
    pub fn with_detail(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.details.insert(key.into(), value.into());
        self
    }

    pub fn kind(&self) -> ErrorKind {
        self.kind
    }
}

impl From<serde_json::Error> for RoleResolutionError {
    fn from(err: serde_json::Error) -> Self {
        Self::config(format!("JSON parse error: {}", err))
    }
}

impl From<toml::de::Error> for RoleResolutionError {
    fn from(err: toml::de::Error) -> Self {
        Self::config(format!("TOML parse error: {}", err))
    }
}

impl From<std::io::Error> for RoleResolutionError {
    fn from(err: std::io::Error) -> Self {
        Self::config(format!("I/O error: {}", err))
    }
}

/// Result type for role resolution operations
pub type Result<T> = std::result::Result<T, RoleResolutionError>;
