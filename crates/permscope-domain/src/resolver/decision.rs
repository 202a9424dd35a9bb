//! The allow/deny decision over a set of candidate grants.
//!
//! Pure and order-independent: the same `(required, grants)` pair always
//! yields the same answer.

use crate::model::{Grant, Permission, WILDCARD};

/// Returns `true` if `grant` satisfies `required` field by field.
///
/// The entity must match exactly; only resource and action accept `"*"`.
pub fn grant_matches(required: &Permission, grant: &Grant) -> bool {
    let held = &grant.permission;
    held.entity == required.entity
        && (held.resource == WILDCARD || held.resource == required.resource)
        && (held.action == WILDCARD || held.action == required.action)
}

/// Decides whether `grants` authorize `required` within `organization_id`.
///
/// A superuser grant for the organization authorizes everything, regardless
/// of the required entity, resource or action. Grants bound to any other
/// organization never match.
pub fn has_permission<'a, I>(required: &Permission, organization_id: &str, grants: I) -> bool
where
    I: IntoIterator<Item = &'a Grant>,
    I::IntoIter: Clone,
{
    let grants = grants.into_iter();

    if grants
        .clone()
        .any(|g| g.is_owner() && g.organization_id == organization_id)
    {
        return true;
    }

    grants
        .into_iter()
        .any(|g| g.organization_id == organization_id && grant_matches(required, g))
}
