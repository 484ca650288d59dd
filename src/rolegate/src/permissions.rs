//! Permission aggregation and lookups over resolved permission maps

use crate::types::{PermissionMap, Role};

/// Union of the roles' permission maps
///
/// Every key declared by any role appears in the result; its value is `true`
/// iff at least one role grants it.
pub fn aggregate_permissions<'a, I>(roles: I) -> PermissionMap
where
    I: IntoIterator<Item = &'a Role>,
{
    let mut aggregated = PermissionMap::new();
    for role in roles {
        for (key, granted) in &role.permissions {
            let entry = aggregated.entry(key.clone()).or_insert(false);
            *entry |= *granted;
        }
    }
    aggregated
}

/// Whether the key is present and granted
pub fn has_permission(permissions: &PermissionMap, key: &str) -> bool {
    permissions.get(key).copied().unwrap_or(false)
}

/// Whether every key is granted (vacuously true for no keys)
pub fn has_all_permissions<S: AsRef<str>>(permissions: &PermissionMap, keys: &[S]) -> bool {
    keys.iter().all(|key| has_permission(permissions, key.as_ref()))
}

/// Whether at least one key is granted
pub fn has_any_permission<S: AsRef<str>>(permissions: &PermissionMap, keys: &[S]) -> bool {
    keys.iter().any(|key| has_permission(permissions, key.as_ref()))
}
