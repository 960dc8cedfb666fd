//! Repository Traits
//!
//! Interfaces for the external collaborators: the user directory and
//! the session store. Implementations live in the infrastructure layer
//! (or in `testing` for the in-memory pair).

use chrono::{DateTime, Utc};

use crate::domain::entity::session::UserSession;
use crate::domain::entity::user::{NewUser, User, UserPatch};
use crate::error::IamResult;

/// Persistent storage for users.
///
/// Token-based lookups only return users whose matching session half is
/// still unexpired; an expired row is the same as no row.
#[trait_variant::make(UserDirectory: Send)]
pub trait LocalUserDirectory {
    /// Create a user. The password field of `user` is already hashed.
    async fn create(&self, user: &NewUser) -> IamResult<User>;

    /// Find user by email
    async fn by_email(&self, email: &str) -> IamResult<Option<User>>;

    /// Find user by id
    async fn by_id(&self, user_id: i64) -> IamResult<Option<User>>;

    /// Find the owner of an unexpired access token
    async fn by_token(&self, token: &str) -> IamResult<Option<User>>;

    /// Find the owner of an unexpired refresh token
    async fn by_refresh_token(&self, refresh_token: &str) -> IamResult<Option<User>>;

    /// Apply a partial update
    async fn update_user(&self, user_id: i64, patch: &UserPatch) -> IamResult<()>;

    /// Replace the user's group memberships
    async fn update_groups(&self, user_id: i64, groups: &[String]) -> IamResult<()>;
}

/// Refresh-token rotation input for [`SessionStore::update_token`].
#[derive(Debug, Clone, Copy)]
pub struct Rotation<'a> {
    pub refresh_token: &'a str,
    pub refresh_token_expires: DateTime<Utc>,
}

/// Persistent storage for revocable session rows.
#[trait_variant::make(SessionStore: Send)]
pub trait LocalSessionStore {
    /// Persist a new session row
    async fn create(&self, session: &UserSession) -> IamResult<()>;

    /// Look up a session by its refresh token
    async fn find_by_refresh(&self, refresh_token: &str) -> IamResult<Option<UserSession>>;

    /// Whether the stored refresh record is past its expiry.
    ///
    /// A missing row reports `false`; the caller's user lookup is what
    /// turns an unknown token into `InvalidUser`.
    async fn is_expired(&self, refresh_token: &str) -> IamResult<bool>;

    /// Replace the access token of the row keyed by `refresh_token`,
    /// and the refresh token too when `rotation` is given. Must be
    /// atomic: under rotation either both halves change or neither.
    async fn update_token(
        &self,
        refresh_token: &str,
        token: &str,
        expires: DateTime<Utc>,
        rotation: Option<Rotation<'_>>,
    ) -> IamResult<()>;

    /// Delete the session row holding this access token
    async fn delete(&self, token: &str) -> IamResult<()>;
}
