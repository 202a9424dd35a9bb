//! Property-based tests for model types.

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use crate::model::{Entity, Grant, Permission};

    fn entity_strategy() -> impl Strategy<Value = Entity> {
        prop::sample::select(Entity::ALL.to_vec())
    }

    /// Resource/action segments: identifiers or the wildcard.
    fn segment_strategy() -> impl Strategy<Value = String> {
        prop_oneof![
            "[a-z][a-z_-]{0,15}",
            Just("*".to_string()),
        ]
    }

    proptest! {
        #[test]
        fn test_permission_encode_decode_roundtrip(
            entity in entity_strategy(),
            resource in segment_strategy(),
            action in segment_strategy(),
        ) {
            let p = Permission::new(entity, resource, action);
            let encoded = p.encode();
            let decoded = Permission::decode(&encoded);
            prop_assert_eq!(decoded.as_ref().ok(), Some(&p));
            prop_assert_eq!(decoded.unwrap().encode(), encoded);
        }

        #[test]
        fn test_strings_without_two_colons_are_rejected(s in "[a-z*]{0,20}(:[a-z*]{0,20})?") {
            prop_assert!(Permission::decode(&s).is_err(), "should reject: {}", s);
        }

        #[test]
        fn test_grant_record_roundtrip(
            org in "[a-z0-9-]{1,12}",
            id in "[a-z0-9-]{1,12}",
            entity in entity_strategy(),
            resource in segment_strategy(),
            action in segment_strategy(),
        ) {
            let grant = match entity {
                Entity::Organization => Grant::organization(&org, resource, action),
                Entity::Environment => Grant::environment(&org, &id, resource, action),
                Entity::Project => Grant::project(&org, &id, resource, action),
                Entity::Branch => Grant::branch(&org, &id, resource, action),
            };
            let back = Grant::try_from(grant.to_record());
            prop_assert_eq!(back.ok(), Some(grant));
        }
    }
}
