//! Principal Authorization
//!
//! Derives a principal set from a validated user and gates operations
//! on membership. Principals are derived at check time, never stored.

use std::collections::HashSet;

use crate::domain::entity::user::PublicUser;
use crate::error::{IamError, IamResult};

/// Principal set for a public user. The anonymous user derives an
/// empty set and therefore fails every non-trivial gate.
pub fn derive_principals(user: &PublicUser) -> HashSet<String> {
    let Some(user_id) = user.user_id else {
        return HashSet::new();
    };

    let mut principals: HashSet<String> = user.groups.iter().cloned().collect();
    principals.insert(format!("user:{user_id}"));
    if user.is_staff {
        principals.insert("staff".to_string());
    }
    if user.is_admin {
        principals.insert("admin".to_string());
    }
    principals
}

/// Gate requiring one principal.
#[derive(Debug, Clone)]
pub struct RequirePrincipal {
    principal: String,
}

impl RequirePrincipal {
    pub fn new(principal: impl Into<String>) -> Self {
        Self {
            principal: principal.into(),
        }
    }

    pub fn check(&self, user: &PublicUser) -> IamResult<()> {
        if derive_principals(user).contains(&self.principal) {
            Ok(())
        } else {
            Err(IamError::PermissionDenied)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn staff_user() -> PublicUser {
        PublicUser {
            user_id: Some(7),
            email: "s@test.com".to_string(),
            username: "s".to_string(),
            is_staff: true,
            is_active: true,
            is_admin: false,
            date_joined: None,
            last_login: None,
            groups: vec!["ops".to_string()],
        }
    }

    #[test]
    fn test_derived_set() {
        let principals = derive_principals(&staff_user());
        assert!(principals.contains("user:7"));
        assert!(principals.contains("staff"));
        assert!(principals.contains("ops"));
        assert!(!principals.contains("admin"));
    }

    #[test]
    fn test_anonymous_set_is_empty() {
        assert!(derive_principals(&PublicUser::anonymous()).is_empty());
    }

    #[test]
    fn test_gate() {
        let user = staff_user();
        assert!(RequirePrincipal::new("staff").check(&user).is_ok());
        assert!(RequirePrincipal::new("user:7").check(&user).is_ok());
        assert!(matches!(
            RequirePrincipal::new("admin").check(&user),
            Err(IamError::PermissionDenied)
        ));
    }

    #[test]
    fn test_anonymous_fails_every_gate() {
        let anon = PublicUser::anonymous();
        assert!(matches!(
            RequirePrincipal::new("staff").check(&anon),
            Err(IamError::PermissionDenied)
        ));
    }
}
