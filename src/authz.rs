use crate::record::UserFunction;

/// How a caller-declared set of required functions is matched against the
/// session's granted functions.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum AuthzPolicy {
    /// Every required function must be granted.
    #[default]
    RequireAll,

    /// At least one required function must be granted.
    RequireAny,
}

/// Decides whether the granted functions satisfy the required ones.
///
/// An empty `required` set means no function gating is configured and the
/// caller is trivially authorized. Matching is by function identifier.
pub fn authorize(granted: &[UserFunction], required: &[String], policy: AuthzPolicy) -> bool {
    if required.is_empty() {
        return true;
    }

    let has = |id: &String| granted.iter().any(|f| f.id == *id);

    match policy {
        AuthzPolicy::RequireAll => required.iter().all(has),
        AuthzPolicy::RequireAny => required.iter().any(has),
    }
}
