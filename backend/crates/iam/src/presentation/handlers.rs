//! HTTP Handlers

use std::sync::Arc;

use axum::Json;
use axum::extract::{Form, State};
use axum::http::{HeaderMap, HeaderValue, StatusCode, header};
use axum::response::IntoResponse;

use platform::cookie;

use crate::application::extract::{default_extractors, extract_credential};
use crate::application::policy::SecurityPolicy;
use crate::domain::entity::user::PublicUser;
use crate::domain::repository::{SessionStore, UserDirectory};
use crate::error::{IamError, IamResult};
use crate::presentation::dto::{AccessTokenResponse, LoginForm, StatusResponse};

/// Shared state for IAM handlers
pub struct IamState<U, S>
where
    U: UserDirectory + Send + Sync + 'static,
    S: SessionStore + Send + Sync + 'static,
{
    pub policy: Arc<SecurityPolicy<U, S>>,
}

impl<U, S> Clone for IamState<U, S>
where
    U: UserDirectory + Send + Sync + 'static,
    S: SessionStore + Send + Sync + 'static,
{
    fn clone(&self) -> Self {
        Self {
            policy: self.policy.clone(),
        }
    }
}

/// POST /login
///
/// Token responses are never cacheable.
pub async fn login<U, S>(
    State(state): State<IamState<U, S>>,
    headers: HeaderMap,
    Form(form): Form<LoginForm>,
) -> IamResult<impl IntoResponse>
where
    U: UserDirectory + Send + Sync + 'static,
    S: SessionStore + Send + Sync + 'static,
{
    let (_, session) = state.policy.login(&form.username, &form.password).await?;

    let mut out = no_store_headers();
    state
        .policy
        .remember(&session, &mut out, request_host(&headers));

    let body = AccessTokenResponse::bearer(session.token, session.expires);
    Ok((StatusCode::OK, out, Json(body)))
}

/// GET|POST /logout
///
/// Anonymous callers get their cookie cleared and nothing else; a
/// bad credential is still an error.
pub async fn logout<U, S>(
    State(state): State<IamState<U, S>>,
    headers: HeaderMap,
) -> IamResult<impl IntoResponse>
where
    U: UserDirectory + Send + Sync + 'static,
    S: SessionStore + Send + Sync + 'static,
{
    let mut out = HeaderMap::new();

    match extract_credential(&default_extractors(), &headers) {
        Some(credential) => {
            let user = state.policy.validate(&credential).await?;
            state.policy.forget(&user, &mut out).await?;
        }
        None => {
            let cookie_config = state.policy.config().cookie_config(None);
            out.append(
                header::SET_COOKIE,
                cookie::delete_cookie_header(&cookie_config),
            );
        }
    }

    Ok((StatusCode::OK, out, Json(StatusResponse::ok())))
}

/// POST /renew
///
/// Reads the refresh token from the cookie, answers with a fresh access
/// token and, when rotation is on, a replacement cookie.
pub async fn renew<U, S>(
    State(state): State<IamState<U, S>>,
    headers: HeaderMap,
) -> IamResult<impl IntoResponse>
where
    U: UserDirectory + Send + Sync + 'static,
    S: SessionStore + Send + Sync + 'static,
{
    // An absent cookie gets the same generic answer as a bad token;
    // InvalidRefreshToken never reaches HTTP callers.
    let cookie_name = state.policy.config().cookie_name.clone();
    let refresh_token =
        cookie::extract_cookie(&headers, &cookie_name).ok_or(IamError::InvalidUser)?;

    let session = state.policy.refresh(&refresh_token).await?;

    let mut out = no_store_headers();
    state
        .policy
        .remember(&session, &mut out, request_host(&headers));

    let body = AccessTokenResponse::bearer(session.token, session.expires);
    Ok((StatusCode::OK, out, Json(body)))
}

/// GET /whoami
///
/// The authenticated user's public view; the anonymous user when no
/// credential is presented.
pub async fn whoami<U, S>(
    State(state): State<IamState<U, S>>,
    headers: HeaderMap,
) -> IamResult<Json<PublicUser>>
where
    U: UserDirectory + Send + Sync + 'static,
    S: SessionStore + Send + Sync + 'static,
{
    match extract_credential(&default_extractors(), &headers) {
        Some(credential) => {
            let user = state.policy.validate(&credential).await?;
            Ok(Json(user.to_public()))
        }
        None => Ok(Json(PublicUser::anonymous())),
    }
}

/// GET /status
pub async fn status() -> Json<StatusResponse> {
    Json(StatusResponse::ok())
}

fn request_host(headers: &HeaderMap) -> Option<&str> {
    headers.get(header::HOST).and_then(|v| v.to_str().ok())
}

fn no_store_headers() -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(header::CACHE_CONTROL, HeaderValue::from_static("no-store"));
    headers.insert(header::PRAGMA, HeaderValue::from_static("no-cache"));
    headers
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_store_headers() {
        let headers = no_store_headers();
        assert_eq!(headers.get(header::CACHE_CONTROL).unwrap(), "no-store");
        assert_eq!(headers.get(header::PRAGMA).unwrap(), "no-cache");
    }

    #[test]
    fn test_request_host() {
        let mut headers = HeaderMap::new();
        headers.insert(header::HOST, HeaderValue::from_static("api.test.com:8443"));
        assert_eq!(request_host(&headers), Some("api.test.com:8443"));
        assert_eq!(request_host(&HeaderMap::new()), None);
    }
}
