//! Role resolver: orchestrates mapping, overrides, fallback, aggregation and caching
//!
//! # Pipeline
//!
//! ```text
//! resolve → [cache] → validate → GroupMapper → overrides → default fallback → aggregate → [cache]
//! ```
//!
//! # Thread Safety
//!
//! The resolver is `Send + Sync` and meant to be constructed once and shared
//! through an `Arc`. The catalog and mapper are immutable. The override table
//! is locked for the whole compute-and-store step of a fresh resolution, and
//! override mutations invalidate the cache while holding the same lock, so a
//! resolution computed from a stale override can never be written back after
//! the invalidation.

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::cache::{CacheStats, ResolutionCache};
use crate::catalog::Catalog;
use crate::config::{EngineConfig, MappingConfig, ResolverConfig};
use crate::error::{Result, RoleResolutionError};
use crate::mapper::{GroupMapper, MappingOutcome};
use crate::overrides::{apply_override, load_overrides, OverrideTable};
use crate::permissions;
use crate::types::{
    IdentityRecord, Origin, Override, PermissionMap, PrincipalId, ResolutionResult,
    ResolveOptions, ResolvedRoleAssignment, Role, RoleSource,
};
use crate::validator::{canonical_role_name, canonical_role_names, validate_identity_record};

/// Role names split by whether the catalog knows them
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RoleNameValidation {
    /// Canonical names of known roles
    pub valid: Vec<String>,
    /// Inputs as given that are blank or unknown
    pub invalid: Vec<String>,
}

impl RoleNameValidation {
    pub fn is_valid(&self) -> bool {
        self.invalid.is_empty()
    }
}

/// Directory identity to roles and permissions
pub struct RoleResolver {
    catalog: Catalog,
    mapper: GroupMapper,
    cache: ResolutionCache,
    overrides: Mutex<OverrideTable>,
    config: ResolverConfig,
    /// Canonical default role, known to the catalog
    default_role: String,
    ttl: chrono::Duration,
}

impl RoleResolver {
    /// Create a resolver from a loaded catalog and mapping tables
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if:
    /// - the default role is blank or not in the catalog
    /// - the cache TTL is out of range
    /// - a mapping table entry is malformed
    pub fn new(catalog: Catalog, mappings: MappingConfig, config: ResolverConfig) -> Result<Self> {
        config.validate()?;

        let default_role = canonical_role_name(&config.default_role);
        if !catalog.contains(&default_role) {
            return Err(RoleResolutionError::config("Default role is not defined in the catalog")
                .with_detail("default_role", default_role));
        }

        let ttl = chrono::Duration::from_std(config.cache_ttl()).map_err(|_| {
            RoleResolutionError::config("Cache TTL is out of range")
                .with_detail("cache_ttl_millis", config.cache_ttl_millis.to_string())
        })?;

        let mapper = GroupMapper::new(mappings, &catalog)?;
        let cache = ResolutionCache::new();

        info!(
            "RoleResolver initialized with roles={}, group_mappings={}, ttl_ms={}, default_role={}, overrides={}",
            catalog.len(),
            mapper.group_mapping_count(),
            config.cache_ttl_millis,
            default_role,
            config.enable_overrides
        );

        Ok(Self {
            catalog,
            mapper,
            cache,
            overrides: Mutex::new(OverrideTable::new()),
            config,
            default_role,
            ttl,
        })
    }

    /// Create a resolver from an engine configuration file's contents
    ///
    /// Loads the catalog from `catalog_path` and re-applies any overrides
    /// listed in `overrides_path`.
    pub fn from_config(config: &EngineConfig) -> Result<Self> {
        let catalog = Catalog::from_path(&config.catalog_path)?;
        let resolver = Self::new(catalog, config.mappings.clone(), config.resolver.clone())?;

        if let Some(path) = &config.overrides_path {
            for ov in load_overrides(path)? {
                resolver.set_override(ov);
            }
        }

        Ok(resolver)
    }

    /// Resolve a principal's roles and permissions
    ///
    /// Only an unusable identity record fails; every data problem below that
    /// level degrades to fewer roles and, at worst, the default role.
    pub fn resolve(
        &self,
        principal_id: PrincipalId,
        identity: &IdentityRecord,
        options: ResolveOptions,
    ) -> Result<ResolutionResult> {
        let now = Utc::now();

        if !options.skip_cache {
            if let Some(mut cached) = self.cache.get(principal_id, now) {
                debug!("Cache hit for principal {}", principal_id);
                cached.origin = Origin::Cached;
                return Ok(Self::attach_identity(cached, identity, options));
            }
        }

        validate_identity_record(identity).map_err(|e| e.with_principal(principal_id))?;

        let mut overrides = self.overrides.lock();

        let mapping = self.mapper.resolve_all(identity);
        if !mapping.diagnostics.is_empty() {
            debug!(
                "Principal {}: {} directory entries skipped during mapping",
                principal_id,
                mapping.diagnostics.len()
            );
        }

        let mut assignments = mapping.assignments;
        let mut expires_at = self.expiry_from(now);

        if self.config.enable_overrides {
            if let Some(ov) = overrides.active(principal_id, now) {
                debug!("Applying override for principal {}", principal_id);
                assignments = apply_override(&ov, assignments);
                // A cached result must not outlive the override it reflects
                if let Some(override_expiry) = ov.expires_at {
                    expires_at = expires_at.min(override_expiry);
                }
            }
        }

        assignments.retain(|a| {
            let known = self.catalog.contains(&a.role);
            if !known {
                warn!("Principal {}: dropping unknown role {} from {:?}", principal_id, a.role, a.source);
            }
            known
        });

        if assignments.is_empty() {
            warn!(
                "Principal {} resolved no roles; falling back to {}",
                principal_id, self.default_role
            );
            assignments.push(ResolvedRoleAssignment::new(
                self.default_role.clone(),
                RoleSource::Default,
                "default",
            ));
        }

        let roles: Vec<String> = assignments.iter().map(|a| a.role.clone()).collect();
        let permissions =
            permissions::aggregate_permissions(roles.iter().filter_map(|r| self.catalog.get(r)));

        let result = ResolutionResult {
            principal_id,
            roles,
            assignments,
            permissions,
            resolved_at: now,
            expires_at,
            origin: Origin::Fresh,
            raw_identity: None,
        };

        self.cache.insert(result.clone());
        drop(overrides);

        debug!("Resolved principal {} to roles {:?}", principal_id, result.roles);
        Ok(Self::attach_identity(result, identity, options))
    }

    /// Run only the mapping passes, for diagnostics
    pub fn explain(&self, identity: &IdentityRecord) -> MappingOutcome {
        self.mapper.resolve_all(identity)
    }

    fn expiry_from(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        now.checked_add_signed(self.ttl).unwrap_or(DateTime::<Utc>::MAX_UTC)
    }

    fn attach_identity(
        mut result: ResolutionResult,
        identity: &IdentityRecord,
        options: ResolveOptions,
    ) -> ResolutionResult {
        if options.include_raw_identity {
            result.raw_identity = Some(identity.clone());
        }
        result
    }

    // Administrative operations

    /// Install or replace an override; the principal's cache entry is dropped
    pub fn set_override(&self, mut ov: Override) -> Option<Override> {
        ov.roles_to_add = canonical_role_names(&ov.roles_to_add);
        ov.roles_to_remove = canonical_role_names(&ov.roles_to_remove);
        ov.complete_replacement = ov.complete_replacement.map(|roles| canonical_role_names(&roles));

        let principal_id = ov.principal_id;
        if !self.config.enable_overrides {
            warn!("Overrides are disabled; override for principal {} stored but not applied", principal_id);
        }

        let mut overrides = self.overrides.lock();
        let previous = overrides.set(ov);
        self.cache.invalidate(principal_id);
        drop(overrides);

        info!("Override set for principal {}", principal_id);
        previous
    }

    /// Remove an override; the principal's cache entry is dropped
    pub fn remove_override(&self, principal_id: PrincipalId) -> Option<Override> {
        let mut overrides = self.overrides.lock();
        let removed = overrides.remove(principal_id);
        self.cache.invalidate(principal_id);
        drop(overrides);

        if removed.is_some() {
            info!("Override removed for principal {}", principal_id);
        }
        removed
    }

    pub fn get_override(&self, principal_id: PrincipalId) -> Option<Override> {
        self.overrides.lock().get(principal_id).cloned()
    }

    /// All stored overrides ordered by principal
    pub fn overrides(&self) -> Vec<Override> {
        self.overrides.lock().snapshot()
    }

    /// Drop one principal's cached result
    pub fn invalidate(&self, principal_id: PrincipalId) -> bool {
        let removed = self.cache.invalidate(principal_id);
        if removed {
            debug!("Cache invalidated for principal {}", principal_id);
        }
        removed
    }

    pub fn clear_cache(&self) -> usize {
        let removed = self.cache.clear();
        info!("Resolution cache cleared ({} entries)", removed);
        removed
    }

    pub fn cache_stats(&self) -> CacheStats {
        self.cache.stats()
    }

    // Query operations

    pub fn get_role(&self, name: &str) -> Option<&Role> {
        self.catalog.get(name)
    }

    pub fn all_role_names(&self) -> Vec<String> {
        self.catalog.all_role_names()
    }

    pub fn role_permission_keys(&self, name: &str) -> Vec<String> {
        self.catalog.permission_keys(name)
    }

    pub fn granted_permission_keys(&self, name: &str) -> Vec<String> {
        self.catalog.granted_permissions(name)
    }

    /// Partition role names into known and unknown
    pub fn validate_role_names<S: AsRef<str>>(&self, names: &[S]) -> RoleNameValidation {
        let mut validation = RoleNameValidation::default();
        for name in names {
            let canonical = canonical_role_name(name.as_ref());
            if !canonical.is_empty() && self.catalog.contains(&canonical) {
                validation.valid.push(canonical);
            } else {
                validation.invalid.push(name.as_ref().to_string());
            }
        }
        validation
    }

    pub fn has_permission(&self, permissions: &PermissionMap, key: &str) -> bool {
        permissions::has_permission(permissions, key)
    }

    pub fn has_all_permissions<S: AsRef<str>>(&self, permissions: &PermissionMap, keys: &[S]) -> bool {
        permissions::has_all_permissions(permissions, keys)
    }

    pub fn has_any_permission<S: AsRef<str>>(&self, permissions: &PermissionMap, keys: &[S]) -> bool {
        permissions::has_any_permission(permissions, keys)
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub fn config(&self) -> &ResolverConfig {
        &self.config
    }

    pub fn default_role(&self) -> &str {
        &self.default_role
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use serde_json::json;

    fn catalog() -> Catalog {
        Catalog::from_value(&json!({
            "roles": {
                "REQUESTER": { "permissions": { "request:create": true } },
                "AUDITOR": { "permissions": { "audit:read": true } }
            }
        }))
        .unwrap()
    }

    #[test]
    fn test_resolver_creation() {
        let resolver = RoleResolver::new(catalog(), MappingConfig::new(), ResolverConfig::default()).unwrap();

        assert_eq!(resolver.default_role(), "REQUESTER");
        assert_eq!(resolver.all_role_names(), vec!["AUDITOR", "REQUESTER"]);
        assert_eq!(resolver.cache_stats().size, 0);
    }

    #[test]
    fn test_unknown_default_role_rejected() {
        let config = ResolverConfig::default().with_default_role("GUEST");
        let err = RoleResolver::new(catalog(), MappingConfig::new(), config).err().unwrap();

        assert_eq!(err.kind, ErrorKind::ConfigError);
        assert_eq!(err.principal_id, PrincipalId::UNSET);
    }

    #[test]
    fn test_out_of_range_ttl_rejected() {
        let config = ResolverConfig::default().with_cache_ttl(std::time::Duration::MAX);
        let err = RoleResolver::new(catalog(), MappingConfig::new(), config).err().unwrap();

        assert_eq!(err.kind, ErrorKind::ConfigError);
        assert_eq!(err.details.get("cache_ttl_millis"), Some(&u64::MAX.to_string()));
    }

    #[test]
    fn test_default_role_is_canonicalized() {
        let config = ResolverConfig::default().with_default_role(" auditor ");
        let resolver = RoleResolver::new(catalog(), MappingConfig::new(), config).unwrap();
        assert_eq!(resolver.default_role(), "AUDITOR");
    }

    #[test]
    fn test_invalid_identity_carries_principal() {
        let resolver = RoleResolver::new(catalog(), MappingConfig::new(), ResolverConfig::default()).unwrap();
        let err = resolver
            .resolve(PrincipalId(42), &IdentityRecord::default(), ResolveOptions::default())
            .unwrap_err();

        assert_eq!(err.kind, ErrorKind::InvalidIdentity);
        assert_eq!(err.principal_id, PrincipalId(42));
        assert_eq!(resolver.cache_stats().size, 0);
    }

    #[test]
    fn test_validate_role_names() {
        let resolver = RoleResolver::new(catalog(), MappingConfig::new(), ResolverConfig::default()).unwrap();
        let validation = resolver.validate_role_names(&["auditor", "ghost", " ", "REQUESTER"]);

        assert_eq!(validation.valid, vec!["AUDITOR", "REQUESTER"]);
        assert_eq!(validation.invalid, vec!["ghost", " "]);
        assert!(!validation.is_valid());
    }
}
