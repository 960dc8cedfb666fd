//! In-Memory Test Doubles
//!
//! Trait implementations backed by plain `Mutex<Vec<_>>`, for tests and
//! for downstream crates that want to exercise the policy without a
//! database. The directory holds a handle to the session store so
//! token-based lookups can consult session rows the way the SQL joins
//! do.

use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};

use crate::domain::entity::session::UserSession;
use crate::domain::entity::user::{NewUser, User, UserPatch};
use crate::domain::repository::{Rotation, SessionStore, UserDirectory};
use crate::error::{IamError, IamResult};

/// Session store over a vector of rows.
#[derive(Default)]
pub struct MemorySessionStore {
    rows: Mutex<Vec<UserSession>>,
}

impl MemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn rows(&self) -> Vec<UserSession> {
        self.rows.lock().unwrap().clone()
    }

    fn owner_of_token(&self, token: &str) -> Option<i64> {
        let now = Utc::now();
        self.rows
            .lock()
            .unwrap()
            .iter()
            .find(|row| row.token == token && row.expires > now)
            .map(|row| row.user_id)
    }

    fn owner_of_refresh(&self, refresh_token: &str) -> Option<i64> {
        let now = Utc::now();
        self.rows
            .lock()
            .unwrap()
            .iter()
            .find(|row| {
                row.refresh_token.as_deref() == Some(refresh_token)
                    && row.refresh_token_expires.is_some_and(|e| e > now)
            })
            .map(|row| row.user_id)
    }
}

impl SessionStore for MemorySessionStore {
    async fn create(&self, session: &UserSession) -> IamResult<()> {
        self.rows.lock().unwrap().push(session.clone());
        Ok(())
    }

    async fn find_by_refresh(&self, refresh_token: &str) -> IamResult<Option<UserSession>> {
        Ok(self
            .rows
            .lock()
            .unwrap()
            .iter()
            .find(|row| row.refresh_token.as_deref() == Some(refresh_token))
            .cloned())
    }

    async fn is_expired(&self, refresh_token: &str) -> IamResult<bool> {
        let rows = self.rows.lock().unwrap();
        let row = rows
            .iter()
            .find(|row| row.refresh_token.as_deref() == Some(refresh_token));
        Ok(match row.and_then(|row| row.refresh_token_expires) {
            Some(expires) => expires < Utc::now(),
            None => false,
        })
    }

    async fn update_token(
        &self,
        refresh_token: &str,
        token: &str,
        expires: DateTime<Utc>,
        rotation: Option<Rotation<'_>>,
    ) -> IamResult<()> {
        let mut rows = self.rows.lock().unwrap();
        if let Some(row) = rows
            .iter_mut()
            .find(|row| row.refresh_token.as_deref() == Some(refresh_token))
        {
            row.token = token.to_string();
            row.expires = expires;
            if let Some(rotation) = rotation {
                row.refresh_token = Some(rotation.refresh_token.to_string());
                row.refresh_token_expires = Some(rotation.refresh_token_expires);
            }
        }
        Ok(())
    }

    async fn delete(&self, token: &str) -> IamResult<()> {
        self.rows.lock().unwrap().retain(|row| row.token != token);
        Ok(())
    }
}

/// User directory over a vector of users.
pub struct MemoryUserDirectory {
    users: Mutex<Vec<User>>,
    sessions: Arc<MemorySessionStore>,
}

impl MemoryUserDirectory {
    pub fn new(sessions: Arc<MemorySessionStore>) -> Self {
        Self {
            users: Mutex::new(Vec::new()),
            sessions,
        }
    }

    /// Seed a user directly, bypassing `create`.
    pub fn insert(&self, user: User) {
        self.users.lock().unwrap().push(user);
    }

    fn find(&self, predicate: impl Fn(&User) -> bool) -> Option<User> {
        self.users.lock().unwrap().iter().find(|u| predicate(u)).cloned()
    }
}

impl UserDirectory for MemoryUserDirectory {
    async fn create(&self, user: &NewUser) -> IamResult<User> {
        let mut users = self.users.lock().unwrap();
        let user_id = users.iter().map(|u| u.user_id).max().unwrap_or(0) + 1;
        let created = User {
            user_id,
            email: user.email.clone(),
            username: user.username.clone(),
            password: user.password.clone(),
            is_staff: user.is_staff,
            is_active: user.is_active,
            is_admin: user.is_admin,
            date_joined: Some(Utc::now()),
            last_login: None,
            groups: Vec::new(),
            token: None,
        };
        users.push(created.clone());
        Ok(created)
    }

    async fn by_email(&self, email: &str) -> IamResult<Option<User>> {
        Ok(self.find(|u| u.email == email))
    }

    async fn by_id(&self, user_id: i64) -> IamResult<Option<User>> {
        Ok(self.find(|u| u.user_id == user_id))
    }

    async fn by_token(&self, token: &str) -> IamResult<Option<User>> {
        Ok(self
            .sessions
            .owner_of_token(token)
            .and_then(|user_id| self.find(|u| u.user_id == user_id)))
    }

    async fn by_refresh_token(&self, refresh_token: &str) -> IamResult<Option<User>> {
        Ok(self
            .sessions
            .owner_of_refresh(refresh_token)
            .and_then(|user_id| self.find(|u| u.user_id == user_id)))
    }

    async fn update_user(&self, user_id: i64, patch: &UserPatch) -> IamResult<()> {
        let mut users = self.users.lock().unwrap();
        let user = users
            .iter_mut()
            .find(|u| u.user_id == user_id)
            .ok_or(IamError::InvalidUser)?;

        if let Some(email) = &patch.email {
            user.email = email.clone();
        }
        if let Some(username) = &patch.username {
            user.username = username.clone();
        }
        if let Some(password) = &patch.password {
            user.password = password.clone();
        }
        if let Some(is_staff) = patch.is_staff {
            user.is_staff = is_staff;
        }
        if let Some(is_active) = patch.is_active {
            user.is_active = is_active;
        }
        if let Some(is_admin) = patch.is_admin {
            user.is_admin = is_admin;
        }
        if let Some(last_login) = patch.last_login {
            user.last_login = Some(last_login);
        }
        Ok(())
    }

    async fn update_groups(&self, user_id: i64, groups: &[String]) -> IamResult<()> {
        let mut users = self.users.lock().unwrap();
        let user = users
            .iter_mut()
            .find(|u| u.user_id == user_id)
            .ok_or(IamError::InvalidUser)?;
        user.groups = groups.to_vec();
        Ok(())
    }
}
