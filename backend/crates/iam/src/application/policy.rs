//! Security Policy
//!
//! The login/validate/refresh/remember/forget state machine. One
//! instance is constructed at startup with its collaborators injected
//! and shared read-only; the session mode is a tagged variant chosen at
//! construction, never switched per request.

use std::sync::Arc;

use axum::http::{HeaderMap, header};
use chrono::Utc;
use platform::cookie;
use platform::password::PasswordHasher;
use rand::Rng;

use crate::application::config::IamConfig;
use crate::application::extract::Credential;
use crate::application::token::{
    AccessTokenEncoder, RefreshTokenEncoder, new_opaque_refresh_token,
};
use crate::domain::entity::session::UserSession;
use crate::domain::entity::user::{PublicUser, User, UserPatch};
use crate::domain::repository::{Rotation, SessionStore, UserDirectory};
use crate::error::{IamError, IamResult};

/// How sessions are materialized.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionKind {
    /// Session rows live in the store; access tokens are revocable by
    /// deleting the row, refresh tokens are opaque random values.
    Persistent,
    /// Nothing is stored; the refresh token is a self-describing signed
    /// envelope and access tokens live until natural expiry.
    Stateless,
}

/// The security policy. Generic over the two collaborator interfaces
/// so deployments can wire any directory/store pair.
pub struct SecurityPolicy<U, S>
where
    U: UserDirectory + Send + Sync,
    S: SessionStore + Send + Sync,
{
    kind: SessionKind,
    users: Arc<U>,
    sessions: Arc<S>,
    hasher: PasswordHasher,
    access_tokens: AccessTokenEncoder,
    refresh_tokens: RefreshTokenEncoder,
    config: Arc<IamConfig>,
}

impl<U, S> SecurityPolicy<U, S>
where
    U: UserDirectory + Send + Sync,
    S: SessionStore + Send + Sync,
{
    pub fn new(kind: SessionKind, users: Arc<U>, sessions: Arc<S>, config: Arc<IamConfig>) -> Self {
        Self {
            kind,
            users,
            sessions,
            hasher: PasswordHasher::new(config.hashing_pool_size),
            access_tokens: AccessTokenEncoder::new(&config.jwt_secret, config.jwt_expiration_secs),
            refresh_tokens: RefreshTokenEncoder::new(
                &config.refresh_token_secret,
                config.session_expiration_secs,
            ),
            config,
        }
    }

    pub fn kind(&self) -> SessionKind {
        self.kind
    }

    pub fn config(&self) -> &IamConfig {
        &self.config
    }

    pub fn hasher(&self) -> &PasswordHasher {
        &self.hasher
    }

    /// The uniform failure path for bad credentials. Sleeping a random
    /// 10-200ms blurs the timing difference between "no such user" and
    /// "wrong password" and throttles brute-force attempts.
    async fn invalid_credentials(&self) -> IamError {
        let delay_ms: u64 = rand::rng().random_range(10..=200);
        tokio::time::sleep(std::time::Duration::from_millis(delay_ms)).await;
        IamError::InvalidCredentials
    }

    /// Authenticate by email and password.
    pub async fn login(&self, email: &str, password: &str) -> IamResult<(PublicUser, UserSession)> {
        let Some(user) = self.users.by_email(email).await? else {
            return Err(self.invalid_credentials().await);
        };

        if !user.is_active {
            return Err(IamError::InactiveUser);
        }

        if !self.hasher.check(&user.password, password).await? {
            return Err(self.invalid_credentials().await);
        }

        let session = self.create_session(&user).await?;

        let patch = UserPatch {
            last_login: Some(Utc::now()),
            ..UserPatch::default()
        };
        self.users.update_user(user.user_id, &patch).await?;

        tracing::info!(user_id = user.user_id, mode = ?self.kind, "user logged in");

        Ok((user.to_public(), session))
    }

    /// Create a session for an already-authenticated user.
    pub async fn create_session(&self, user: &User) -> IamResult<UserSession> {
        let (token, expires) = self.access_tokens.create(user)?;

        let (refresh_token, refresh_token_expires) = match self.kind {
            SessionKind::Persistent => new_opaque_refresh_token(self.config.session_expiration_secs),
            SessionKind::Stateless => self.refresh_tokens.create(user.user_id)?,
        };

        let session = UserSession {
            user_id: user.user_id,
            token,
            expires,
            refresh_token: Some(refresh_token),
            refresh_token_expires: Some(refresh_token_expires),
        };

        if self.kind == SessionKind::Persistent {
            self.sessions.create(&session).await?;
        }

        Ok(session)
    }

    /// Resolve a credential to its user.
    ///
    /// Every failure surfaces as `InvalidUser`; the caller learns
    /// nothing about which check rejected the token.
    pub async fn validate(&self, credential: &Credential) -> IamResult<User> {
        let Credential::Bearer { token } = credential else {
            return Err(IamError::InvalidUser);
        };

        let claims = self
            .access_tokens
            .validate(token)
            .map_err(|_| IamError::InvalidUser)?;

        let user = match self.kind {
            // The token must also still be present, unexpired, in the
            // store. Deleting the row revokes the token immediately.
            SessionKind::Persistent => self.users.by_token(token).await?,
            SessionKind::Stateless => self.users.by_id(claims.sub).await?,
        };

        let mut user = user.ok_or(IamError::InvalidUser)?;
        user.token = Some(token.clone());
        Ok(user)
    }

    /// Mint a new access token from a refresh token, rotating the
    /// refresh token when configured to.
    ///
    /// Not idempotent under rotation: once the store write commits, the
    /// presented token is consumed and must not be retried.
    pub async fn refresh(&self, refresh_token: &str) -> IamResult<UserSession> {
        match self.kind {
            SessionKind::Persistent => self.refresh_persistent(refresh_token).await,
            SessionKind::Stateless => self.refresh_stateless(refresh_token).await,
        }
    }

    async fn refresh_persistent(&self, refresh_token: &str) -> IamResult<UserSession> {
        let user = self.users.by_refresh_token(refresh_token).await?;

        if self.sessions.is_expired(refresh_token).await? {
            return Err(IamError::ExpiredToken);
        }

        let user = user.ok_or(IamError::InvalidUser)?;

        let rotated = if self.config.rotate_refresh_tokens {
            Some(new_opaque_refresh_token(self.config.session_expiration_secs))
        } else {
            None
        };

        let (new_token, new_expires) = self.access_tokens.create(&user)?;

        let rotation = rotated.as_ref().map(|(rt, rte)| Rotation {
            refresh_token: rt,
            refresh_token_expires: *rte,
        });
        self.sessions
            .update_token(refresh_token, &new_token, new_expires, rotation)
            .await?;

        tracing::info!(
            user_id = user.user_id,
            rotated = rotated.is_some(),
            "access token refreshed"
        );

        let (refresh_token, refresh_token_expires) = match rotated {
            Some((rt, rte)) => (Some(rt), Some(rte)),
            None => (None, None),
        };

        Ok(UserSession {
            user_id: user.user_id,
            token: new_token,
            expires: new_expires,
            refresh_token,
            refresh_token_expires,
        })
    }

    async fn refresh_stateless(&self, refresh_token: &str) -> IamResult<UserSession> {
        // Envelope failures are normalized before they reach the caller.
        let user_id = self.refresh_tokens.validate(refresh_token).map_err(|e| {
            match e {
                IamError::InvalidRefreshToken => IamError::InvalidUser,
                other => other,
            }
        })?;

        let user = self
            .users
            .by_id(user_id)
            .await?
            .ok_or(IamError::InvalidUser)?;

        let (token, expires) = self.access_tokens.create(&user)?;

        let (refresh_token, refresh_token_expires) = if self.config.rotate_refresh_tokens {
            let (rt, rte) = self.refresh_tokens.create(user.user_id)?;
            (Some(rt), Some(rte))
        } else {
            (None, None)
        };

        tracing::info!(user_id = user.user_id, "access token refreshed (stateless)");

        Ok(UserSession {
            user_id: user.user_id,
            token,
            expires,
            refresh_token,
            refresh_token_expires,
        })
    }

    /// Persist the refresh token on the client via the cookie.
    pub fn remember(
        &self,
        session: &UserSession,
        headers: &mut HeaderMap,
        request_host: Option<&str>,
    ) {
        let Some(refresh_token) = &session.refresh_token else {
            return;
        };
        let cookie_config = self.config.cookie_config(request_host);
        headers.append(
            header::SET_COOKIE,
            cookie::set_cookie_header(&cookie_config, refresh_token),
        );
    }

    /// Log the user out: drop the session row (persistent mode) and
    /// clear the cookie either way.
    pub async fn forget(&self, user: &User, headers: &mut HeaderMap) -> IamResult<()> {
        if self.kind == SessionKind::Persistent {
            if let Some(token) = &user.token {
                self.sessions.delete(token).await?;
            }
        }

        let cookie_config = self.config.cookie_config(None);
        headers.append(
            header::SET_COOKIE,
            cookie::delete_cookie_header(&cookie_config),
        );

        tracing::info!(user_id = user.user_id, "user logged out");
        Ok(())
    }
}
