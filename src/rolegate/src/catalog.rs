//! Static role catalog
//!
//! The catalog is loaded once from a role-definition document and is
//! read-only afterwards, so it can be shared between threads without
//! synchronization.
//!
//! ```json
//! {
//!   "roles": {
//!     "AUDITOR": {
//!       "description": "Read-only access to every request",
//!       "permissions": { "request:read_all": true, "request:approve": false }
//!     }
//!   }
//! }
//! ```

use serde_json::Value;
use std::collections::BTreeMap;
use std::path::Path;
use tracing::{debug, info, warn};

use crate::error::{Result, RoleResolutionError};
use crate::types::{PermissionMap, Role};
use crate::validator::canonical_role_name;

/// Role name to role definition
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    roles: BTreeMap<String, Role>,
}

impl Catalog {
    /// Build a catalog from an already-parsed document
    ///
    /// Individual malformed roles are skipped with a warning; only a missing
    /// `roles` container is fatal.
    pub fn from_value(document: &Value) -> Result<Self> {
        let Some(container) = document.get("roles") else {
            return Err(RoleResolutionError::config(
                "Role catalog is missing the top-level 'roles' container",
            ));
        };

        let Some(entries) = container.as_object() else {
            return Err(RoleResolutionError::config(
                "Role catalog 'roles' container must be an object",
            ));
        };

        let mut roles = BTreeMap::new();
        for (raw_name, definition) in entries {
            let name = canonical_role_name(raw_name);
            if name.is_empty() {
                warn!("Skipping catalog role with empty name");
                continue;
            }

            let Some(role) = Self::parse_role(&name, definition) else {
                continue;
            };

            if roles.contains_key(&name) {
                warn!("Duplicate catalog role {} (from {:?}); keeping the first definition", name, raw_name);
                continue;
            }

            debug!("Loaded role {} with {} permissions", name, role.permissions.len());
            roles.insert(name, role);
        }

        info!("Role catalog loaded with {} roles", roles.len());
        Ok(Self { roles })
    }

    /// Parse a JSON role-definition document
    pub fn from_json_str(document: &str) -> Result<Self> {
        let value: Value = serde_json::from_str(document)?;
        Self::from_value(&value)
    }

    /// Load a role-definition document from disk (`.toml` or JSON)
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).map_err(|e| {
            RoleResolutionError::config(format!("Failed to read role catalog: {}", e))
                .with_detail("path", path.display().to_string())
        })?;

        let value: Value = match path.extension().and_then(|ext| ext.to_str()) {
            Some("toml") => toml::from_str(&contents)?,
            _ => serde_json::from_str(&contents)?,
        };

        Self::from_value(&value)
    }

    fn parse_role(name: &str, definition: &Value) -> Option<Role> {
        let Some(flags) = definition.get("permissions").and_then(Value::as_object) else {
            warn!("Skipping role {}: missing or invalid permissions object", name);
            return None;
        };

        let mut permissions = PermissionMap::new();
        for (key, flag) in flags {
            match flag.as_bool() {
                Some(granted) => {
                    permissions.insert(key.clone(), granted);
                }
                None => warn!("Role {}: ignoring non-boolean permission flag {}", name, key),
            }
        }

        let description = definition
            .get("description")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();

        Some(Role {
            name: name.to_string(),
            description,
            permissions,
        })
    }

    /// Look up a role by name (any casing)
    pub fn get(&self, name: &str) -> Option<&Role> {
        self.roles.get(&canonical_role_name(name))
    }

    /// Whether a canonical role name is known
    pub fn contains(&self, name: &str) -> bool {
        self.roles.contains_key(name)
    }

    /// All known role names, sorted
    pub fn all_role_names(&self) -> Vec<String> {
        self.roles.keys().cloned().collect()
    }

    /// Every permission key the role declares
    pub fn permission_keys(&self, name: &str) -> Vec<String> {
        self.get(name)
            .map(|role| role.permissions.keys().cloned().collect())
            .unwrap_or_default()
    }

    /// Permission keys the role grants
    pub fn granted_permissions(&self, name: &str) -> Vec<String> {
        self.get(name)
            .map(|role| role.granted().map(str::to_string).collect())
            .unwrap_or_default()
    }

    /// Role definitions in name order
    pub fn roles(&self) -> impl Iterator<Item = &Role> {
        self.roles.values()
    }

    pub fn len(&self) -> usize {
        self.roles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.roles.is_empty()
    }
}
