//! Resolver configuration loading and validation

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::{Result, RoleResolutionError};

/// Resolver behaviour settings
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolverConfig {
    /// How long a resolved result stays cached
    #[serde(default = "default_cache_ttl_millis", rename = "cacheTTLMillis", alias = "cache_ttl_millis")]
    pub cache_ttl_millis: u64,

    /// Role assigned when nothing else resolves
    #[serde(default = "default_role", alias = "default_role")]
    pub default_role: String,

    #[serde(default = "default_true", alias = "enable_overrides")]
    pub enable_overrides: bool,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            cache_ttl_millis: default_cache_ttl_millis(),
            default_role: default_role(),
            enable_overrides: true,
        }
    }
}

impl ResolverConfig {
    pub fn cache_ttl(&self) -> Duration {
        Duration::from_millis(self.cache_ttl_millis)
    }

    /// Set the TTL; durations beyond `u64::MAX` milliseconds saturate
    pub fn with_cache_ttl(mut self, ttl: Duration) -> Self {
        self.cache_ttl_millis = u64::try_from(ttl.as_millis()).unwrap_or(u64::MAX);
        self
    }

    pub fn with_default_role(mut self, role: impl Into<String>) -> Self {
        self.default_role = role.into();
        self
    }

    pub fn with_overrides(mut self, enabled: bool) -> Self {
        self.enable_overrides = enabled;
        self
    }

    /// Validate settings that serde cannot express
    pub fn validate(&self) -> Result<()> {
        if self.default_role.trim().is_empty() {
            return Err(RoleResolutionError::config("Default role must not be empty"));
        }
        Ok(())
    }
}

/// Static directory-to-role mapping tables
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct MappingConfig {
    /// Group DN to role name
    #[serde(default)]
    pub groups: HashMap<String, String>,

    /// Attribute name to (attribute value to role name)
    #[serde(default)]
    pub attributes: HashMap<String, HashMap<String, String>>,
}

impl MappingConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn map_group(mut self, group_dn: impl Into<String>, role: impl Into<String>) -> Self {
        self.groups.insert(group_dn.into(), role.into());
        self
    }

    pub fn map_attribute(
        mut self,
        attribute: impl Into<String>,
        value: impl Into<String>,
        role: impl Into<String>,
    ) -> Self {
        self.attributes
            .entry(attribute.into())
            .or_default()
            .insert(value.into(), role.into());
        self
    }
}

/// Complete engine configuration file
///
/// ```toml
/// catalog_path = "roles.json"
///
/// [resolver]
/// cacheTTLMillis = 60000
/// defaultRole = "REQUESTER"
///
/// [mappings.groups]
/// "cn=auditors,ou=groups,dc=example,dc=com" = "AUDITOR"
///
/// [mappings.attributes.title]
/// "Procurement Officer" = "PROCUREMENT_OFFICER"
/// ```
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct EngineConfig {
    #[serde(default)]
    pub resolver: ResolverConfig,

    #[serde(default)]
    pub mappings: MappingConfig,

    /// Role-definition document (JSON or TOML)
    pub catalog_path: PathBuf,

    /// Overrides to re-apply at start-up (JSON array)
    #[serde(default)]
    pub overrides_path: Option<PathBuf>,
}

impl EngineConfig {
    /// Load configuration from a TOML file
    ///
    /// Relative paths inside the file are resolved against the file's
    /// directory.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).map_err(|e| {
            RoleResolutionError::config(format!("Failed to read configuration file: {}", e))
                .with_detail("path", path.display().to_string())
        })?;

        let mut config: EngineConfig = toml::from_str(&contents)?;

        if let Some(base) = path.parent() {
            config.catalog_path = resolve_relative(base, &config.catalog_path);
            config.overrides_path = config
                .overrides_path
                .as_deref()
                .map(|p| resolve_relative(base, p));
        }

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        self.resolver.validate()
    }
}

fn resolve_relative(base: &Path, path: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        base.join(path)
    }
}

// Default value functions
fn default_true() -> bool { true }
fn default_cache_ttl_millis() -> u64 { 60 * 60 * 1000 }
fn default_role() -> String { "REQUESTER".to_string() }
