//! Property tests for aggregation, deduplication and normalization

mod common;

use common::*;
use proptest::prelude::*;
use rolegate::validator::{canonical_group_dn, canonical_role_name};
use rolegate::{aggregate_permissions, Override, PrincipalId, ResolveOptions, Role};
use std::collections::{BTreeMap, HashSet};

const GROUPS: [&str; 5] = [OFFICERS, ALL_STAFF, AUDITORS, ADMINS, LEGACY];

fn role_strategy() -> impl Strategy<Value = Role> {
    prop::collection::btree_map("(request|audit|admin):[a-z]{1,4}", any::<bool>(), 0..6).prop_map(
        |permissions| Role {
            name: "GENERATED".to_string(),
            description: String::new(),
            permissions,
        },
    )
}

proptest! {
    #[test]
    fn test_aggregation_is_or_over_declared_keys(roles in prop::collection::vec(role_strategy(), 0..5)) {
        let aggregated = aggregate_permissions(&roles);

        let mut expected: BTreeMap<String, bool> = BTreeMap::new();
        for role in &roles {
            for (key, granted) in &role.permissions {
                *expected.entry(key.clone()).or_insert(false) |= *granted;
            }
        }

        prop_assert_eq!(aggregated, expected);
    }

    #[test]
    fn test_resolved_roles_unique_known_and_non_empty(
        picks in prop::collection::vec(0usize..GROUPS.len(), 0..8),
        title in "(Procurement Officer|Internal Auditor|Clerk)",
        principal in 1u64..10_000,
    ) {
        let resolver = resolver();
        let mut id = identity("prop").with_attribute("title", title);
        for pick in picks {
            id = id.with_group(GROUPS[pick]);
        }

        let result = resolver
            .resolve(PrincipalId(principal), &id, ResolveOptions::default())
            .unwrap();

        prop_assert!(!result.roles.is_empty());
        let unique: HashSet<&String> = result.roles.iter().collect();
        prop_assert_eq!(unique.len(), result.roles.len());
        for role in &result.roles {
            prop_assert!(resolver.get_role(role).is_some());
        }
    }

    #[test]
    fn test_override_add_and_remove_respected(
        add in prop::collection::vec("(auditor|ADMIN|Requester)", 0..3),
        remove in prop::collection::vec("(AUDITOR|admin|procurement_officer)", 0..3),
    ) {
        let resolver = resolver();
        let principal = PrincipalId(7);

        let mut ov = Override::new(principal);
        ov.roles_to_add = add.clone();
        ov.roles_to_remove = remove.clone();
        resolver.set_override(ov);

        let result = resolver
            .resolve(principal, &identity("p7").with_group(OFFICERS), ResolveOptions::default())
            .unwrap();

        let removed: HashSet<String> = remove.iter().map(|r| canonical_role_name(r)).collect();
        let survivors: Vec<&String> = result
            .roles
            .iter()
            .filter(|r| r.as_str() != resolver.default_role())
            .collect();
        for role in survivors {
            prop_assert!(!removed.contains(role));
        }
        for role in add.iter().map(|r| canonical_role_name(r)) {
            if !removed.contains(&role) {
                prop_assert!(result.has_role(&role));
            }
        }
    }

    #[test]
    fn test_normalization_idempotent(name in "[ a-zA-Z_]{0,16}", dn in "[a-zA-Z]{2}=[a-zA-Z ]{1,8}(;|,)[a-zA-Z]{2}=[a-z]{1,8}") {
        let role = canonical_role_name(&name);
        prop_assert_eq!(canonical_role_name(&role), role.clone());

        let group = canonical_group_dn(&dn);
        prop_assert_eq!(canonical_group_dn(&group), group.clone());
        prop_assert!(!group.contains(';'));
    }
}
