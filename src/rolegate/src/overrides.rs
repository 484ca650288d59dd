//! Administrative override table and merge rules

use chrono::{DateTime, Utc};
use serde_json::Value;
use std::collections::{HashMap, HashSet};
use std::path::Path;
use tracing::{debug, info};

use crate::error::{ErrorKind, Result, RoleResolutionError};
use crate::types::{Override, PrincipalId, ResolvedRoleAssignment, RoleSource};
use crate::validator::{canonical_role_names, validate_role_set};

/// In-memory overrides keyed by principal
///
/// Not synchronized on its own; the resolver guards it with a mutex.
#[derive(Debug, Clone, Default)]
pub struct OverrideTable {
    entries: HashMap<PrincipalId, Override>,
}

impl OverrideTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace; returns the previous override
    pub fn set(&mut self, ov: Override) -> Option<Override> {
        self.entries.insert(ov.principal_id, ov)
    }

    pub fn remove(&mut self, principal_id: PrincipalId) -> Option<Override> {
        self.entries.remove(&principal_id)
    }

    pub fn get(&self, principal_id: PrincipalId) -> Option<&Override> {
        self.entries.get(&principal_id)
    }

    /// The principal's override if it is still live
    ///
    /// An expired override is swept from the table and not returned.
    pub fn active(&mut self, principal_id: PrincipalId, now: DateTime<Utc>) -> Option<Override> {
        let expired = self.entries.get(&principal_id)?.is_expired_at(now);
        if expired {
            self.entries.remove(&principal_id);
            info!("Override for principal {} expired; removed", principal_id);
            return None;
        }
        self.entries.get(&principal_id).cloned()
    }

    /// All overrides ordered by principal
    pub fn snapshot(&self) -> Vec<Override> {
        let mut overrides: Vec<Override> = self.entries.values().cloned().collect();
        overrides.sort_by_key(|ov| ov.principal_id);
        overrides
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Merge an override into directory-derived assignments
///
/// A non-empty replacement list discards `base` entirely. Otherwise
/// `roles_to_add` is unioned in first, then `roles_to_remove` is taken out.
pub fn apply_override(ov: &Override, base: Vec<ResolvedRoleAssignment>) -> Vec<ResolvedRoleAssignment> {
    if let Some(replacement) = ov.complete_replacement.as_deref() {
        let roles = canonical_role_names(replacement);
        if !roles.is_empty() {
            debug!("Override replaces roles for principal {}: {:?}", ov.principal_id, roles);
            return dedup(roles.into_iter().map(|role| {
                ResolvedRoleAssignment::new(role, RoleSource::Override, "override:replace")
            }));
        }
    }

    let mut assignments = base;
    let mut present: HashSet<String> = assignments.iter().map(|a| a.role.clone()).collect();

    for role in canonical_role_names(&ov.roles_to_add) {
        if present.insert(role.clone()) {
            assignments.push(ResolvedRoleAssignment::new(role, RoleSource::Override, "override:add"));
        }
    }

    let removals: HashSet<String> = canonical_role_names(&ov.roles_to_remove).into_iter().collect();
    assignments.retain(|a| !removals.contains(&a.role));

    assignments
}

/// Parse one override from untrusted JSON
///
/// Role lists go through [`validate_role_set`], so junk entries are dropped
/// with a warning while a non-array list is rejected.
pub fn parse_override(value: &Value) -> Result<Override> {
    let principal_id = value
        .get("principalId")
        .and_then(Value::as_u64)
        .ok_or_else(|| RoleResolutionError::invalid_identity("Override needs a numeric principalId"))?;

    let role_list = |field: &str| -> Result<Vec<String>> {
        match value.get(field) {
            None | Some(Value::Null) => Ok(Vec::new()),
            Some(list) => validate_role_set(list)
                .map_err(|e| e.with_principal(PrincipalId(principal_id)).with_detail("field", field)),
        }
    };

    let mut ov = Override::new(principal_id);
    ov.roles_to_add = role_list("rolesToAdd")?;
    ov.roles_to_remove = role_list("rolesToRemove")?;
    if value.get("completeReplacement").is_some_and(|v| !v.is_null()) {
        ov.complete_replacement = Some(role_list("completeReplacement")?);
    }

    if let Some(raw) = value.get("expiresAt").and_then(Value::as_str) {
        let at = DateTime::parse_from_rfc3339(raw).map_err(|e| {
            RoleResolutionError::invalid_identity(format!("Invalid override expiry: {}", e))
                .with_principal(PrincipalId(principal_id))
        })?;
        ov.expires_at = Some(at.with_timezone(&Utc));
    }

    Ok(ov)
}

/// Load a JSON array of overrides, e.g. to re-apply them after a restart
pub fn load_overrides<P: AsRef<Path>>(path: P) -> Result<Vec<Override>> {
    let path = path.as_ref();
    let contents = std::fs::read_to_string(path).map_err(|e| {
        RoleResolutionError::config(format!("Failed to read overrides file: {}", e))
            .with_detail("path", path.display().to_string())
    })?;

    let document: Value = serde_json::from_str(&contents)?;
    let Value::Array(entries) = document else {
        return Err(RoleResolutionError::config("Overrides file must contain a JSON array"));
    };

    entries
        .iter()
        .map(|entry| {
            parse_override(entry).map_err(|e| RoleResolutionError {
                kind: ErrorKind::ConfigError,
                ..e
            })
        })
        .collect()
}

fn dedup(assignments: impl Iterator<Item = ResolvedRoleAssignment>) -> Vec<ResolvedRoleAssignment> {
    let mut seen = HashSet::new();
    assignments.filter(|a| seen.insert(a.role.clone())).collect()
}
