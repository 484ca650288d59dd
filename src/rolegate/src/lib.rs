//! # rolegate
//!
//! Role and permission resolution for directory-backed identities.
//!
//! ## Features
//!
//! - **Group and attribute mapping** from directory data to catalog roles
//! - **Administrative overrides** (add, remove, or replace roles per principal)
//! - **Default-role fallback** so every principal resolves to at least one role
//! - **OR-aggregated permissions** across all resolved roles
//! - **TTL caching** per principal with synchronous invalidation on override changes
//! - **Graceful degradation** on malformed directory data
//!
//! ## Example
//!
//! ```rust
//! use rolegate::{
//!     Catalog, IdentityRecord, MappingConfig, PrincipalId, ResolveOptions,
//!     ResolverConfig, RoleResolver,
//! };
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let catalog = Catalog::from_json_str(r#"{
//!     "roles": {
//!         "REQUESTER": { "permissions": { "request:create": true } },
//!         "PROCUREMENT_OFFICER": { "permissions": { "request:read_all": true } }
//!     }
//! }"#)?;
//!
//! let mappings = MappingConfig::new()
//!     .map_group("cn=procurement-officers,ou=groups,dc=example,dc=com", "PROCUREMENT_OFFICER");
//!
//! let resolver = RoleResolver::new(catalog, mappings, ResolverConfig::default())?;
//!
//! let identity = IdentityRecord::new("uid=jdoe,ou=people,dc=example,dc=com", "Jane Doe")
//!     .with_group("cn=procurement-officers,ou=groups,dc=example,dc=com");
//!
//! let result = resolver.resolve(PrincipalId(1), &identity, ResolveOptions::default())?;
//!
//! assert_eq!(result.roles, vec!["PROCUREMENT_OFFICER"]);
//! assert!(result.has_permission("request:read_all"));
//! # Ok(())
//! # }
//! ```

pub mod cache;
pub mod catalog;
pub mod config;
pub mod error;
pub mod mapper;
pub mod overrides;
pub mod permissions;
pub mod resolver;
pub mod types;
pub mod validator;

// Re-export commonly used types
pub use cache::{CacheEntry, CacheStats, ResolutionCache};
pub use catalog::Catalog;
pub use config::{EngineConfig, MappingConfig, ResolverConfig};
pub use error::{ErrorKind, Result, RoleResolutionError};
pub use mapper::{Diagnostic, GroupMapper, MappingOutcome};
pub use overrides::{apply_override, load_overrides, parse_override, OverrideTable};
pub use permissions::{aggregate_permissions, has_all_permissions, has_any_permission, has_permission};
pub use resolver::{RoleNameValidation, RoleResolver};
pub use types::{
    IdentityRecord, Membership, Origin, Override, PermissionMap, PrincipalId, ResolutionResult,
    ResolveOptions, ResolvedRoleAssignment, Role, RoleSource,
};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
