//! Directory group and attribute to role mapping
//!
//! Directory data is untrusted and partially malformed records are normal
//! in production, so nothing in this module fails a resolution. Problems are
//! recorded as [`Diagnostic`] values and logged; the affected entry simply
//! contributes no role.

use serde::Serialize;
use std::collections::{BTreeMap, HashMap, HashSet};
use tracing::{debug, warn};

use crate::catalog::Catalog;
use crate::config::MappingConfig;
use crate::error::{ErrorKind, Result, RoleResolutionError};
use crate::types::{IdentityRecord, ResolvedRoleAssignment, RoleSource};
use crate::validator::{
    canonical_group_dn, canonical_role_name, validate_attribute_value,
    validate_distinguished_name, validate_membership,
};

/// An absorbed data problem
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Diagnostic {
    pub kind: ErrorKind,
    /// The group DN, attribute, or membership list concerned
    pub subject: String,
    pub detail: String,
}

impl Diagnostic {
    fn new(kind: ErrorKind, subject: impl Into<String>, detail: impl Into<String>) -> Self {
        Self {
            kind,
            subject: subject.into(),
            detail: detail.into(),
        }
    }
}

/// Roles produced by a mapping pass, plus whatever was skipped
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MappingOutcome {
    pub assignments: Vec<ResolvedRoleAssignment>,
    pub diagnostics: Vec<Diagnostic>,
}

impl MappingOutcome {
    /// Role names in assignment order
    pub fn role_names(&self) -> Vec<String> {
        self.assignments.iter().map(|a| a.role.clone()).collect()
    }

    fn extend(&mut self, other: MappingOutcome) {
        self.assignments.extend(other.assignments);
        self.diagnostics.extend(other.diagnostics);
    }
}

/// Maps directory groups and attributes to catalog roles
#[derive(Debug, Clone)]
pub struct GroupMapper {
    /// Canonical group DN -> canonical role
    groups: HashMap<String, String>,

    /// Attribute name -> (trimmed value -> canonical role), in name order
    attributes: BTreeMap<String, HashMap<String, String>>,

    known_roles: HashSet<String>,
}

impl GroupMapper {
    /// Build a mapper, canonicalizing every DN and role name
    ///
    /// Mappings to roles missing from the catalog are kept and discarded at
    /// resolution time with a warning, so a stale mapping never blocks start-up.
    pub fn new(mappings: MappingConfig, catalog: &Catalog) -> Result<Self> {
        let mut groups = HashMap::with_capacity(mappings.groups.len());
        for (dn, role) in mappings.groups {
            validate_distinguished_name(&dn).map_err(|e| {
                RoleResolutionError::config(format!("Invalid group DN in mapping table: {}", e.message))
                    .with_detail("dn", dn.clone())
            })?;

            let role = canonical_role_name(&role);
            if role.is_empty() {
                return Err(RoleResolutionError::config("Group mapping has an empty role name")
                    .with_detail("dn", dn));
            }
            groups.insert(canonical_group_dn(&dn), role);
        }

        let mut attributes = BTreeMap::new();
        for (name, values) in mappings.attributes {
            let name = name.trim().to_string();
            if name.is_empty() {
                return Err(RoleResolutionError::config("Attribute mapping has an empty attribute name"));
            }

            let mut table = HashMap::with_capacity(values.len());
            for (value, role) in values {
                let role = canonical_role_name(&role);
                if role.is_empty() {
                    return Err(RoleResolutionError::config("Attribute mapping has an empty role name")
                        .with_detail("attribute", name.clone())
                        .with_detail("value", value));
                }
                table.insert(value.trim().to_string(), role);
            }
            attributes.insert(name, table);
        }

        let known_roles: HashSet<String> = catalog.all_role_names().into_iter().collect();

        for role in groups.values().chain(attributes.values().flat_map(|t| t.values())) {
            if !known_roles.contains(role) {
                warn!("Mapping targets role {} which is not in the catalog", role);
            }
        }

        debug!(
            "GroupMapper initialized with {} group mappings and {} attribute tables",
            groups.len(),
            attributes.len()
        );

        Ok(Self {
            groups,
            attributes,
            known_roles,
        })
    }

    /// Map the identity's group memberships to roles
    pub fn resolve_from_groups(&self, identity: &IdentityRecord) -> MappingOutcome {
        let mut outcome = MappingOutcome::default();

        let groups = match validate_membership(&identity.member_of) {
            Ok(groups) => groups,
            Err(e) => {
                warn!(
                    "Membership data for {} unusable, continuing without groups: {}",
                    identity.distinguished_name, e.message
                );
                outcome.diagnostics.push(Diagnostic::new(
                    e.kind,
                    "memberOf",
                    e.message,
                ));
                return outcome;
            }
        };

        for dn in groups {
            let Some(role) = self.groups.get(&dn) else {
                debug!("No role mapping for group {}", dn);
                outcome.diagnostics.push(Diagnostic::new(
                    ErrorKind::UnmappedGroup,
                    dn,
                    "no mapping for group",
                ));
                continue;
            };

            if !self.known_roles.contains(role) {
                warn!("Group {} maps to unknown role {}; discarding", dn, role);
                outcome.diagnostics.push(Diagnostic::new(
                    ErrorKind::UnmappedGroup,
                    dn,
                    format!("mapped role {} is not in the catalog", role),
                ));
                continue;
            }

            outcome
                .assignments
                .push(ResolvedRoleAssignment::new(role.clone(), RoleSource::Group, dn));
        }

        outcome
    }

    /// Map the identity's configured attributes to roles
    pub fn resolve_from_attributes(&self, identity: &IdentityRecord) -> MappingOutcome {
        let mut outcome = MappingOutcome::default();

        for (name, table) in &self.attributes {
            let raw = lookup_attribute(identity, name);
            let Some(value) = validate_attribute_value(raw) else {
                continue;
            };

            let evidence = format!("{}={}", name, value);
            let Some(role) = table.get(&value) else {
                debug!("No role mapping for attribute {}", evidence);
                outcome.diagnostics.push(Diagnostic::new(
                    ErrorKind::UnmappedAttribute,
                    evidence,
                    "no mapping for attribute value",
                ));
                continue;
            };

            if !self.known_roles.contains(role) {
                warn!("Attribute {} maps to unknown role {}; discarding", evidence, role);
                outcome.diagnostics.push(Diagnostic::new(
                    ErrorKind::UnmappedAttribute,
                    evidence,
                    format!("mapped role {} is not in the catalog", role),
                ));
                continue;
            }

            outcome
                .assignments
                .push(ResolvedRoleAssignment::new(role.clone(), RoleSource::Attribute, evidence));
        }

        outcome
    }

    /// Groups then attributes, deduplicated by role (first seen wins)
    pub fn resolve_all(&self, identity: &IdentityRecord) -> MappingOutcome {
        let mut combined = self.resolve_from_groups(identity);
        combined.extend(self.resolve_from_attributes(identity));

        let mut seen = HashSet::new();
        combined
            .assignments
            .retain(|assignment| seen.insert(assignment.role.clone()));

        combined
    }

    pub fn group_mapping_count(&self) -> usize {
        self.groups.len()
    }
}

/// Exact attribute name first, then a case-insensitive match
///
/// Among several case-insensitive matches the lexicographically smallest
/// key wins.
fn lookup_attribute<'a>(identity: &'a IdentityRecord, name: &str) -> Option<&'a str> {
    identity
        .attributes
        .get(name)
        .or_else(|| {
            identity
                .attributes
                .iter()
                .filter(|(key, _)| key.eq_ignore_ascii_case(name))
                .min_by(|(a, _), (b, _)| a.cmp(b))
                .map(|(_, value)| value)
        })
        .map(String::as_str)
}
