//! Shared fixtures for integration tests

#![allow(dead_code)]

use rolegate::{Catalog, IdentityRecord, MappingConfig, ResolverConfig, RoleResolver};
use serde_json::{json, Value};
use std::time::Duration;

pub const OFFICERS: &str = "cn=procurement-officers,ou=groups,dc=example,dc=com";
pub const ALL_STAFF: &str = "cn=all-staff,ou=groups,dc=example,dc=com";
pub const AUDITORS: &str = "cn=auditors,ou=groups,dc=example,dc=com";
pub const ADMINS: &str = "cn=admins,ou=groups,dc=example,dc=com";
pub const LEGACY: &str = "cn=legacy,ou=groups,dc=example,dc=com";

pub fn catalog_document() -> Value {
    json!({
        "roles": {
            "REQUESTER": {
                "description": "Default role for every employee",
                "permissions": {
                    "request:create": true,
                    "request:read_own": true,
                    "request:read_all": false
                }
            },
            "PROCUREMENT_OFFICER": {
                "description": "Processes purchase requests",
                "permissions": {
                    "request:read_all": true,
                    "request:approve": true,
                    "request:create": false
                }
            },
            "AUDITOR": {
                "description": "Read-only oversight",
                "permissions": {
                    "audit:read": true,
                    "request:read_all": true,
                    "request:approve": false
                }
            },
            "ADMIN": {
                "description": "System administration",
                "permissions": { "admin:manage": true }
            }
        }
    })
}

pub fn catalog() -> Catalog {
    Catalog::from_value(&catalog_document()).unwrap()
}

pub fn mappings() -> MappingConfig {
    MappingConfig::new()
        .map_group(OFFICERS, "PROCUREMENT_OFFICER")
        .map_group(AUDITORS, "AUDITOR")
        .map_group(ADMINS, "ADMIN")
        .map_group(LEGACY, "RETIRED_ROLE")
        .map_attribute("title", "Procurement Officer", "PROCUREMENT_OFFICER")
        .map_attribute("title", "Internal Auditor", "AUDITOR")
}

pub fn resolver() -> RoleResolver {
    resolver_with(ResolverConfig::default())
}

pub fn resolver_with(config: ResolverConfig) -> RoleResolver {
    RoleResolver::new(catalog(), mappings(), config).unwrap()
}

pub fn resolver_with_ttl(ttl: Duration) -> RoleResolver {
    resolver_with(ResolverConfig::default().with_cache_ttl(ttl))
}

pub fn identity(uid: &str) -> IdentityRecord {
    IdentityRecord::new(format!("uid={},ou=people,dc=example,dc=com", uid), uid)
}
