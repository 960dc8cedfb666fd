//! IAM Router

use std::sync::Arc;

use axum::{
    Router,
    routing::{get, post},
};

use crate::application::policy::SecurityPolicy;
use crate::domain::repository::{SessionStore, UserDirectory};
use crate::infra::postgres::{PgSessionStore, PgUserDirectory};
use crate::presentation::handlers::{self, IamState};

/// Create the IAM router with PostgreSQL repositories
pub fn iam_router(policy: SecurityPolicy<PgUserDirectory, PgSessionStore>) -> Router {
    iam_router_generic(policy)
}

/// Create an IAM router for any directory/store pair
pub fn iam_router_generic<U, S>(policy: SecurityPolicy<U, S>) -> Router
where
    U: UserDirectory + Send + Sync + 'static,
    S: SessionStore + Send + Sync + 'static,
{
    let state = IamState {
        policy: Arc::new(policy),
    };

    Router::new()
        .route("/login", post(handlers::login::<U, S>))
        .route(
            "/logout",
            get(handlers::logout::<U, S>).post(handlers::logout::<U, S>),
        )
        .route("/renew", post(handlers::renew::<U, S>))
        .route("/whoami", get(handlers::whoami::<U, S>))
        .route("/status", get(handlers::status))
        .with_state(state)
}
