//! PostgreSQL Repository Implementations
//!
//! `users` / `users_group` / `groups` hold identities and memberships,
//! `users_session` holds the revocable session rows. An optional schema
//! prefix supports multi-tenant deployments that isolate tenants by
//! Postgres schema.

use chrono::{DateTime, Utc};
use sqlx::{PgPool, Row};

use crate::domain::entity::session::UserSession;
use crate::domain::entity::user::{NewUser, User, UserPatch};
use crate::domain::repository::{Rotation, SessionStore, UserDirectory};
use crate::error::{IamError, IamResult};

fn schema_prefix(schema: &str) -> String {
    if schema.is_empty() {
        String::new()
    } else {
        format!("{schema}.")
    }
}

/// User directory backed by PostgreSQL
#[derive(Clone)]
pub struct PgUserDirectory {
    pool: PgPool,
    prefix: String,
}

impl PgUserDirectory {
    pub fn new(pool: PgPool, schema: &str) -> Self {
        Self {
            pool,
            prefix: schema_prefix(schema),
        }
    }

    fn base_query(&self) -> String {
        let p = &self.prefix;
        format!(
            "SELECT u.user_id, u.email, u.username, u.password, \
                    u.is_staff, u.is_active, u.is_admin, \
                    u.date_joined, u.last_login, \
                    coalesce(array_remove(array_agg(g.name), NULL), '{{}}') AS groups \
             FROM {p}users u \
             LEFT JOIN {p}users_group ug ON ug.user_id = u.user_id \
             LEFT JOIN {p}groups g ON g.group_id = ug.group_id"
        )
    }

    fn to_user(row: &sqlx::postgres::PgRow) -> Result<User, sqlx::Error> {
        Ok(User {
            user_id: row.try_get("user_id")?,
            email: row.try_get("email")?,
            username: row.try_get("username")?,
            password: row.try_get("password")?,
            is_staff: row.try_get("is_staff")?,
            is_active: row.try_get("is_active")?,
            is_admin: row.try_get("is_admin")?,
            date_joined: row.try_get("date_joined")?,
            last_login: row.try_get("last_login")?,
            groups: row.try_get("groups")?,
            token: None,
        })
    }

    async fn fetch_one_user(&self, query: String, param: &str) -> IamResult<Option<User>> {
        let row = sqlx::query(&query)
            .bind(param)
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(Self::to_user).transpose().map_err(IamError::from)
    }
}

impl UserDirectory for PgUserDirectory {
    async fn create(&self, user: &NewUser) -> IamResult<User> {
        let p = &self.prefix;
        let row = sqlx::query(&format!(
            "INSERT INTO {p}users \
                (email, username, password, is_staff, is_active, is_admin, date_joined) \
             VALUES ($1, $2, $3, $4, $5, $6, now()) \
             RETURNING user_id"
        ))
        .bind(&user.email)
        .bind(&user.username)
        .bind(&user.password)
        .bind(user.is_staff)
        .bind(user.is_active)
        .bind(user.is_admin)
        .fetch_one(&self.pool)
        .await?;

        let user_id: i64 = row.try_get("user_id")?;
        self.by_id(user_id)
            .await?
            .ok_or_else(|| IamError::Internal("created user not found".to_string()))
    }

    async fn by_email(&self, email: &str) -> IamResult<Option<User>> {
        let query = format!("{} WHERE u.email = $1 GROUP BY u.user_id", self.base_query());
        self.fetch_one_user(query, email).await
    }

    async fn by_id(&self, user_id: i64) -> IamResult<Option<User>> {
        let query = format!("{} WHERE u.user_id = $1 GROUP BY u.user_id", self.base_query());
        let row = sqlx::query(&query)
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(Self::to_user).transpose().map_err(IamError::from)
    }

    async fn by_token(&self, token: &str) -> IamResult<Option<User>> {
        let p = &self.prefix;
        let query = format!(
            "{} JOIN {p}users_session t ON t.user_id = u.user_id \
             WHERE t.token = $1 AND t.expires > now() \
             GROUP BY u.user_id",
            self.base_query()
        );
        self.fetch_one_user(query, token).await
    }

    async fn by_refresh_token(&self, refresh_token: &str) -> IamResult<Option<User>> {
        let p = &self.prefix;
        let query = format!(
            "{} JOIN {p}users_session t ON t.user_id = u.user_id \
             WHERE t.refresh_token = $1 AND t.refresh_token_expires > now() \
             GROUP BY u.user_id",
            self.base_query()
        );
        self.fetch_one_user(query, refresh_token).await
    }

    async fn update_user(&self, user_id: i64, patch: &UserPatch) -> IamResult<()> {
        if patch.is_empty() {
            return Ok(());
        }

        let p = &self.prefix;
        let mut builder = sqlx::QueryBuilder::new(format!("UPDATE {p}users SET "));
        let mut fields = builder.separated(", ");

        if let Some(email) = &patch.email {
            fields.push("email = ").push_bind_unseparated(email);
        }
        if let Some(username) = &patch.username {
            fields.push("username = ").push_bind_unseparated(username);
        }
        if let Some(password) = &patch.password {
            fields.push("password = ").push_bind_unseparated(password);
        }
        if let Some(is_staff) = patch.is_staff {
            fields.push("is_staff = ").push_bind_unseparated(is_staff);
        }
        if let Some(is_active) = patch.is_active {
            fields.push("is_active = ").push_bind_unseparated(is_active);
        }
        if let Some(is_admin) = patch.is_admin {
            fields.push("is_admin = ").push_bind_unseparated(is_admin);
        }
        if let Some(last_login) = patch.last_login {
            fields.push("last_login = ").push_bind_unseparated(last_login);
        }

        builder.push(" WHERE user_id = ").push_bind(user_id);
        builder.build().execute(&self.pool).await?;
        Ok(())
    }

    async fn update_groups(&self, user_id: i64, groups: &[String]) -> IamResult<()> {
        let p = &self.prefix;
        let mut tx = self.pool.begin().await?;

        sqlx::query(&format!("DELETE FROM {p}users_group WHERE user_id = $1"))
            .bind(user_id)
            .execute(&mut *tx)
            .await?;

        sqlx::query(&format!(
            "INSERT INTO {p}users_group (user_id, group_id) \
             SELECT $1, group_id FROM {p}groups WHERE name = ANY($2)"
        ))
        .bind(user_id)
        .bind(groups)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(())
    }
}

/// Session store backed by PostgreSQL
#[derive(Clone)]
pub struct PgSessionStore {
    pool: PgPool,
    prefix: String,
}

impl PgSessionStore {
    pub fn new(pool: PgPool, schema: &str) -> Self {
        Self {
            pool,
            prefix: schema_prefix(schema),
        }
    }
}

impl SessionStore for PgSessionStore {
    async fn create(&self, session: &UserSession) -> IamResult<()> {
        let p = &self.prefix;
        sqlx::query(&format!(
            "INSERT INTO {p}users_session \
                (user_id, token, expires, refresh_token, refresh_token_expires) \
             VALUES ($1, $2, $3, $4, $5)"
        ))
        .bind(session.user_id)
        .bind(&session.token)
        .bind(session.expires)
        .bind(&session.refresh_token)
        .bind(session.refresh_token_expires)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn find_by_refresh(&self, refresh_token: &str) -> IamResult<Option<UserSession>> {
        let p = &self.prefix;
        let row = sqlx::query(&format!(
            "SELECT user_id, token, expires, refresh_token, refresh_token_expires \
             FROM {p}users_session WHERE refresh_token = $1"
        ))
        .bind(refresh_token)
        .fetch_optional(&self.pool)
        .await?;

        row.map(|row| {
            Ok::<_, sqlx::Error>(UserSession {
                user_id: row.try_get("user_id")?,
                token: row.try_get("token")?,
                expires: row.try_get("expires")?,
                refresh_token: row.try_get("refresh_token")?,
                refresh_token_expires: row.try_get("refresh_token_expires")?,
            })
        })
        .transpose()
        .map_err(IamError::from)
    }

    async fn is_expired(&self, refresh_token: &str) -> IamResult<bool> {
        let p = &self.prefix;
        let expires: Option<Option<DateTime<Utc>>> = sqlx::query_scalar(&format!(
            "SELECT refresh_token_expires FROM {p}users_session WHERE refresh_token = $1"
        ))
        .bind(refresh_token)
        .fetch_optional(&self.pool)
        .await?;

        // Missing row is "not expired": the user lookup decides whether
        // an unknown token is invalid.
        Ok(match expires.flatten() {
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
        let p = &self.prefix;
        // Single UPDATE: rotation replaces both halves or nothing.
        match rotation {
            Some(rotation) => {
                sqlx::query(&format!(
                    "UPDATE {p}users_session \
                     SET token = $1, expires = $2, \
                         refresh_token = $4, refresh_token_expires = $5 \
                     WHERE refresh_token = $3"
                ))
                .bind(token)
                .bind(expires)
                .bind(refresh_token)
                .bind(rotation.refresh_token)
                .bind(rotation.refresh_token_expires)
                .execute(&self.pool)
                .await?;
            }
            None => {
                sqlx::query(&format!(
                    "UPDATE {p}users_session SET token = $1, expires = $2 \
                     WHERE refresh_token = $3"
                ))
                .bind(token)
                .bind(expires)
                .bind(refresh_token)
                .execute(&self.pool)
                .await?;
            }
        }
        Ok(())
    }

    async fn delete(&self, token: &str) -> IamResult<()> {
        let p = &self.prefix;
        sqlx::query(&format!("DELETE FROM {p}users_session WHERE token = $1"))
            .bind(token)
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_schema_prefix() {
        assert_eq!(schema_prefix(""), "");
        assert_eq!(schema_prefix("tenant_a"), "tenant_a.");
    }
}
