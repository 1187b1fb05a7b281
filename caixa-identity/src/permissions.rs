use caixa_core::{Role, Session};

/// Capability check against a composed session.
///
/// Owners are allowed unconditionally. Members are allowed iff the
/// capability (or the `"all"` wildcard) is in their permission set. A
/// session with no grant, or an inactive grant, denies everything; unknown
/// capability strings deny by default.
pub fn can(session: &Session, capability: &str) -> bool {
    let Some(grant) = &session.grant else {
        return false;
    };
    if !grant.is_active() {
        return false;
    }
    match grant.role {
        Role::Owner => true,
        Role::Member => grant.permissions.grants(capability),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use caixa_core::{
        AccessGrant, GrantStatus, NewUserProfile, PermissionSet, Provenance, Session, TenantId,
        User, UserId,
    };

    fn session_with(grant: Option<AccessGrant>) -> Session {
        let user = User::new(UserId::from("u1"), "a@x.com", NewUserProfile::new("Ana"));
        Session::compose(user, None, grant, Provenance::Resolved)
    }

    #[test]
    fn owner_is_allowed_regardless_of_permission_set() {
        let mut grant = AccessGrant::owner(TenantId::from("t1"), UserId::from("u1"));
        // even with a hollowed-out set, the role wins
        grant.permissions = PermissionSet::from_capabilities(Vec::<String>::new());
        let session = session_with(Some(grant));

        assert!(can(&session, "entries.write"));
        assert!(can(&session, "anything-unknown"));
    }

    #[test]
    fn member_is_limited_to_listed_capabilities() {
        let grant = AccessGrant::member(
            TenantId::from("t1"),
            UserId::from("u1"),
            PermissionSet::from_capabilities(["entries.read"]),
        );
        let session = session_with(Some(grant));

        assert!(can(&session, "entries.read"));
        assert!(!can(&session, "entries.write"));
    }

    #[test]
    fn member_wildcard_grants_everything() {
        let grant = AccessGrant::member(
            TenantId::from("t1"),
            UserId::from("u1"),
            PermissionSet::all(),
        );
        let session = session_with(Some(grant));

        assert!(can(&session, "staff.manage"));
    }

    #[test]
    fn inactive_grant_denies() {
        let mut grant = AccessGrant::owner(TenantId::from("t1"), UserId::from("u1"));
        grant.status = GrantStatus::Inactive;
        let session = session_with(Some(grant));

        assert!(!can(&session, "entries.read"));
    }

    #[test]
    fn tenantless_session_denies() {
        let session = session_with(None);
        assert!(!can(&session, "entries.read"));
    }
}
