//! User Entity
//!
//! The identity record owned by the user directory, plus the public
//! projection that is the only representation ever returned to callers.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::Serialize;

/// Full user record. Holds the stored password hash and therefore never
/// leaves the policy layer; callers get a [`PublicUser`].
#[derive(Clone)]
pub struct User {
    pub user_id: i64,
    pub email: String,
    pub username: String,
    /// Algorithm-tagged password hash (`"argon2:<salt>:<digest>"`)
    pub password: String,
    pub is_staff: bool,
    pub is_active: bool,
    pub is_admin: bool,
    pub date_joined: Option<DateTime<Utc>>,
    pub last_login: Option<DateTime<Utc>>,
    pub groups: Vec<String>,
    /// The access token this user authenticated with, attached at
    /// validation time. Never persisted.
    pub token: Option<String>,
}

impl User {
    /// Principal set derived at validation time, never stored.
    pub fn principals(&self) -> Vec<String> {
        let mut principals = self.groups.clone();
        principals.push(format!("user:{}", self.user_id));
        if self.is_staff {
            principals.push("staff".to_string());
        }
        if self.is_admin {
            principals.push("admin".to_string());
        }
        principals
    }

    /// Strip the password hash.
    pub fn to_public(&self) -> PublicUser {
        PublicUser {
            user_id: Some(self.user_id),
            email: self.email.clone(),
            username: self.username.clone(),
            is_staff: self.is_staff,
            is_active: self.is_active,
            is_admin: self.is_admin,
            date_joined: self.date_joined,
            last_login: self.last_login,
            groups: self.groups.clone(),
        }
    }
}

impl fmt::Debug for User {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("User")
            .field("user_id", &self.user_id)
            .field("email", &self.email)
            .field("username", &self.username)
            .field("password", &"[HASH]")
            .field("is_staff", &self.is_staff)
            .field("is_active", &self.is_active)
            .field("is_admin", &self.is_admin)
            .field("groups", &self.groups)
            .finish_non_exhaustive()
    }
}

/// User minus the password hash.
///
/// `user_id` is `None` only for the anonymous user.
#[derive(Debug, Clone, Serialize)]
pub struct PublicUser {
    pub user_id: Option<i64>,
    pub email: String,
    pub username: String,
    pub is_staff: bool,
    pub is_active: bool,
    pub is_admin: bool,
    pub date_joined: Option<DateTime<Utc>>,
    pub last_login: Option<DateTime<Utc>>,
    pub groups: Vec<String>,
}

impl PublicUser {
    /// The unauthenticated caller. Derives an empty principal set.
    pub fn anonymous() -> Self {
        Self {
            user_id: None,
            email: "anonymous".to_string(),
            username: "anonymous".to_string(),
            is_staff: false,
            is_active: true,
            is_admin: false,
            date_joined: None,
            last_login: None,
            groups: Vec::new(),
        }
    }

    pub fn is_anonymous(&self) -> bool {
        self.user_id.is_none()
    }
}

/// Input for directory `create`. The password is already hashed by the
/// time it reaches the directory.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub email: String,
    pub username: String,
    pub password: String,
    pub is_staff: bool,
    pub is_active: bool,
    pub is_admin: bool,
}

/// Partial update applied through `update_user`. `None` fields are
/// left untouched.
#[derive(Debug, Clone, Default)]
pub struct UserPatch {
    pub email: Option<String>,
    pub username: Option<String>,
    pub password: Option<String>,
    pub is_staff: Option<bool>,
    pub is_active: Option<bool>,
    pub is_admin: Option<bool>,
    pub last_login: Option<DateTime<Utc>>,
}

impl UserPatch {
    pub fn is_empty(&self) -> bool {
        self.email.is_none()
            && self.username.is_none()
            && self.password.is_none()
            && self.is_staff.is_none()
            && self.is_active.is_none()
            && self.is_admin.is_none()
            && self.last_login.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_user() -> User {
        User {
            user_id: 42,
            email: "u@test.com".to_string(),
            username: "noname".to_string(),
            password: "argon2:salt:digest".to_string(),
            is_staff: true,
            is_active: true,
            is_admin: false,
            date_joined: None,
            last_login: None,
            groups: vec!["ops".to_string()],
            token: None,
        }
    }

    #[test]
    fn test_principals_derivation() {
        let user = sample_user();
        let principals = user.principals();
        assert!(principals.contains(&"ops".to_string()));
        assert!(principals.contains(&"user:42".to_string()));
        assert!(principals.contains(&"staff".to_string()));
        assert!(!principals.contains(&"admin".to_string()));
    }

    #[test]
    fn test_admin_principal() {
        let mut user = sample_user();
        user.is_admin = true;
        assert!(user.principals().contains(&"admin".to_string()));
    }

    #[test]
    fn test_public_projection_drops_hash() {
        let user = sample_user();
        let public = user.to_public();
        assert_eq!(public.user_id, Some(42));
        let json = serde_json::to_string(&public).unwrap();
        assert!(!json.contains("argon2"));
        assert!(!json.contains("password"));
    }

    #[test]
    fn test_debug_redacts_hash() {
        let rendered = format!("{:?}", sample_user());
        assert!(rendered.contains("[HASH]"));
        assert!(!rendered.contains("digest"));
    }

    #[test]
    fn test_anonymous_user() {
        let anon = PublicUser::anonymous();
        assert!(anon.is_anonymous());
        assert!(anon.groups.is_empty());
    }
}
