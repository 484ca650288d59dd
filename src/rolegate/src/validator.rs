//! Validation and normalization of untrusted directory data
//!
//! Every function here is pure apart from advisory logging. Canonical
//! casing is applied at this boundary so the rest of the crate can compare
//! role names and group DNs directly:
//!
//! - role names: trimmed, uppercase
//! - group DNs: segments trimmed, lowercase, comma separated

use regex::Regex;
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::OnceLock;
use tracing::warn;

use crate::error::{Result, RoleResolutionError};
use crate::types::{IdentityRecord, Membership};

/// Loose structural DN check: `k=v` segments with 1-3 letter keys
const DN_PATTERN: &str = r"^[A-Za-z]{1,3}=[^,;=]+(\s*[,;]\s*[A-Za-z]{1,3}=[^,;=]+)*$";

fn dn_regex() -> &'static Regex {
    static DN_REGEX: OnceLock<Regex> = OnceLock::new();
    DN_REGEX.get_or_init(|| Regex::new(DN_PATTERN).expect("DN pattern is a valid regex"))
}

/// Canonical form of a role name
pub fn canonical_role_name(name: &str) -> String {
    name.trim().to_uppercase()
}

/// Canonical form of a group DN
pub fn canonical_group_dn(dn: &str) -> String {
    dn.split([',', ';'])
        .map(|segment| segment.trim().to_lowercase())
        .collect::<Vec<_>>()
        .join(",")
}

/// Check that an identity record carries a usable DN and common name
pub fn validate_identity_record(identity: &IdentityRecord) -> Result<()> {
    if identity.distinguished_name.trim().is_empty() {
        return Err(RoleResolutionError::invalid_identity(
            "Identity record is missing a distinguished name",
        ));
    }

    if identity.common_name.trim().is_empty() {
        return Err(RoleResolutionError::invalid_identity(
            "Identity record is missing a common name",
        )
        .with_detail("dn", identity.distinguished_name.clone()));
    }

    Ok(())
}

/// Structural check of a distinguished name
///
/// This is deliberately loose and does not implement the full DN grammar.
pub fn validate_distinguished_name(dn: &str) -> Result<()> {
    let dn = dn.trim();
    if !dn.contains('=') || !dn_regex().is_match(dn) {
        return Err(RoleResolutionError::malformed_dn(dn));
    }
    Ok(())
}

/// Split a DN into a lowercase-keyed map
///
/// Diagnostic helper only; later segments overwrite earlier ones with the
/// same key.
pub fn parse_distinguished_name(dn: &str) -> BTreeMap<String, String> {
    dn.split(',')
        .filter_map(|segment| segment.split_once('='))
        .map(|(key, value)| (key.trim().to_lowercase(), value.trim().to_string()))
        .filter(|(key, _)| !key.is_empty())
        .collect()
}

/// Coerce a membership value into a list of canonical group DNs
///
/// Non-string and malformed entries are skipped with a warning. An empty
/// input is valid and yields an empty list; a non-empty input whose every
/// entry was skipped fails with `MissingMembershipData`.
pub fn validate_membership(member_of: &Membership) -> Result<Vec<String>> {
    let entries = member_of.entries();
    let mut groups = Vec::with_capacity(entries.len());

    for entry in &entries {
        let Value::String(dn) = entry else {
            warn!("Skipping non-string membership entry: {}", entry);
            continue;
        };

        if let Err(e) = validate_distinguished_name(dn) {
            warn!("Skipping malformed group DN {:?}: {}", dn, e.message);
            continue;
        }

        groups.push(canonical_group_dn(dn));
    }

    if !entries.is_empty() && groups.is_empty() {
        return Err(RoleResolutionError::missing_membership_data(format!(
            "All {} membership entries were invalid",
            entries.len()
        ))
        .with_detail("entries", entries.len().to_string()));
    }

    Ok(groups)
}

/// Trim an optional attribute value, treating blanks as absent
pub fn validate_attribute_value(value: Option<&str>) -> Option<String> {
    let trimmed = value?.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

/// Validate an untyped role list (e.g. an imported replacement list)
pub fn validate_role_set(value: &Value) -> Result<Vec<String>> {
    let Value::Array(entries) = value else {
        return Err(RoleResolutionError::invalid_identity("Role set must be an array")
            .with_detail("found", json_type_name(value)));
    };

    let mut roles = Vec::with_capacity(entries.len());
    for entry in entries {
        match entry.as_str().map(canonical_role_name) {
            Some(role) if !role.is_empty() => roles.push(role),
            _ => warn!("Skipping invalid role entry: {}", entry),
        }
    }

    Ok(roles)
}

/// Canonicalize typed role names, dropping blanks
pub fn canonical_role_names<S: AsRef<str>>(names: &[S]) -> Vec<String> {
    names
        .iter()
        .filter_map(|name| {
            let role = canonical_role_name(name.as_ref());
            if role.is_empty() {
                warn!("Skipping empty role name");
                None
            } else {
                Some(role)
            }
        })
        .collect()
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use serde_json::json;

    #[test]
    fn test_valid_distinguished_names() {
        assert!(validate_distinguished_name("cn=procurement-officers,ou=groups,dc=example,dc=com").is_ok());
        assert!(validate_distinguished_name("CN=All Staff, OU=Groups, DC=example").is_ok());
        assert!(validate_distinguished_name("cn=a;ou=b").is_ok());
        assert!(validate_distinguished_name("uid=jdoe").is_ok());
    }

    #[test]
    fn test_malformed_distinguished_names() {
        for dn in ["invalid-dn", "", "=value", "longkey=value", "cn=", "cn=a,,ou=b"] {
            let err = validate_distinguished_name(dn).unwrap_err();
            assert_eq!(err.kind, ErrorKind::MalformedDn, "dn {:?}", dn);
        }
    }

    #[test]
    fn test_parse_distinguished_name() {
        let parsed = parse_distinguished_name("CN=Jane, OU=People, DC=example, DC=com");

        assert_eq!(parsed.get("cn"), Some(&"Jane".to_string()));
        assert_eq!(parsed.get("ou"), Some(&"People".to_string()));
        // Last write wins
        assert_eq!(parsed.get("dc"), Some(&"com".to_string()));
    }

    #[test]
    fn test_canonical_group_dn() {
        assert_eq!(
            canonical_group_dn(" CN=Auditors, OU=Groups;DC=Example "),
            "cn=auditors,ou=groups,dc=example"
        );
    }

    #[test]
    fn test_validate_identity_record() {
        let ok = IdentityRecord::new("uid=jdoe,dc=example,dc=com", "Jane Doe");
        assert!(validate_identity_record(&ok).is_ok());

        let no_dn = IdentityRecord::new("  ", "Jane Doe");
        assert_eq!(
            validate_identity_record(&no_dn).unwrap_err().kind,
            ErrorKind::InvalidIdentity
        );

        let no_cn = IdentityRecord::new("uid=jdoe", "");
        assert_eq!(
            validate_identity_record(&no_cn).unwrap_err().kind,
            ErrorKind::InvalidIdentity
        );
    }

    #[test]
    fn test_membership_empty_is_valid() {
        assert!(validate_membership(&Membership::Absent).unwrap().is_empty());
        assert!(validate_membership(&Membership::Many(vec![])).unwrap().is_empty());
    }

    #[test]
    fn test_membership_single_string() {
        let groups = validate_membership(&Membership::Single("CN=Staff,DC=example".into())).unwrap();
        assert_eq!(groups, vec!["cn=staff,dc=example".to_string()]);
    }

    #[test]
    fn test_membership_filters_junk() {
        let member_of = Membership::Many(vec![
            json!("cn=staff,dc=example"),
            json!(17),
            json!("invalid-dn"),
            json!(null),
            json!("cn=auditors,dc=example"),
        ]);

        let groups = validate_membership(&member_of).unwrap();
        assert_eq!(groups, vec!["cn=staff,dc=example", "cn=auditors,dc=example"]);
    }

    #[test]
    fn test_membership_all_invalid_fails() {
        let err = validate_membership(&Membership::Single("invalid-dn".into())).unwrap_err();
        assert_eq!(err.kind, ErrorKind::MissingMembershipData);

        let err = validate_membership(&Membership::Many(vec![json!(1), json!(false)])).unwrap_err();
        assert_eq!(err.kind, ErrorKind::MissingMembershipData);
    }

    #[test]
    fn test_validate_attribute_value() {
        assert_eq!(validate_attribute_value(None), None);
        assert_eq!(validate_attribute_value(Some("   ")), None);
        assert_eq!(
            validate_attribute_value(Some("  Procurement Officer ")),
            Some("Procurement Officer".to_string())
        );
    }

    #[test]
    fn test_validate_role_set() {
        let roles = validate_role_set(&json!([" auditor", "", 5, "Requester"])).unwrap();
        assert_eq!(roles, vec!["AUDITOR", "REQUESTER"]);

        let err = validate_role_set(&json!("AUDITOR")).unwrap_err();
        assert_eq!(err.kind, ErrorKind::InvalidIdentity);
        assert_eq!(err.details.get("found"), Some(&"string".to_string()));
    }

    #[test]
    fn test_canonical_role_names() {
        assert_eq!(
            canonical_role_names(&["approver ", " ", "admin"]),
            vec!["APPROVER", "ADMIN"]
        );
    }
}
