use axum::{
    extract::{FromRef, FromRequestParts, OptionalFromRequestParts, OriginalUri},
    http::{header, request::Parts},
};
use jsonwebtoken::{DecodingKey, Validation, decode, errors::ErrorKind};
use serde::{Deserialize, Serialize};

use crate::{
    config::{AppConfig, Env},
    error::AppError,
    repository::RepositoryState,
    urls,
};

/// Claims
///
/// The payload of a session JWT issued by the identity provider.
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    /// Subject (sub): the `users.id` of the session owner.
    pub sub: i64,
    /// Expiration Time (exp): the token is rejected after this timestamp.
    pub exp: usize,
    /// Issued At (iat)
    pub iat: usize,
}

/// AuthUser
///
/// The resolved identity of a request. Use `AuthUser` as an extractor on login-only
/// handlers and `Option<AuthUser>` on handlers that anonymous visitors may reach.
#[derive(Debug, Clone, PartialEq)]
pub struct AuthUser {
    pub id: i64,
    pub username: String,
    // Grants access to the `/admin` routes.
    pub is_staff: bool,
}

/// AuthUser Extractor Implementation
///
/// Rejects with [`AppError::Unauthenticated`], which redirects to the login page
/// carrying the requested path as `next`.
impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
    RepositoryState: FromRef<S>,
    AppConfig: FromRef<S>,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        match resolve(parts, state).await? {
            Some(user) => Ok(user),
            None => {
                let config = AppConfig::from_ref(state);
                // Nested routers strip their prefix from `parts.uri`.
                let path = parts
                    .extensions
                    .get::<OriginalUri>()
                    .map(|OriginalUri(uri)| uri.path().to_string())
                    .unwrap_or_else(|| parts.uri.path().to_string());

                Err(AppError::Unauthenticated {
                    redirect_to: urls::login(&config.login_url, &path),
                })
            }
        }
    }
}

/// Optional AuthUser
///
/// Anonymous visitors, bad tokens and unknown users all resolve to `None`.
impl<S> OptionalFromRequestParts<S> for AuthUser
where
    S: Send + Sync,
    RepositoryState: FromRef<S>,
    AppConfig: FromRef<S>,
{
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &S,
    ) -> Result<Option<Self>, Self::Rejection> {
        resolve(parts, state).await
    }
}

/// resolve
///
/// 1. Local bypass: in `Env::Local`, an `x-user-id` header naming an existing user
///    authenticates as that user.
/// 2. Otherwise a `Bearer` JWT signed with the configured secret is required.
/// 3. The subject must still exist in `users`.
///
/// Only a repository failure is an error; every authentication failure is `Ok(None)`.
async fn resolve<S>(parts: &Parts, state: &S) -> Result<Option<AuthUser>, AppError>
where
    S: Send + Sync,
    RepositoryState: FromRef<S>,
    AppConfig: FromRef<S>,
{
    let repo = RepositoryState::from_ref(state);
    let config = AppConfig::from_ref(state);

    if config.env == Env::Local {
        let bypass_id = parts
            .headers
            .get("x-user-id")
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.parse::<i64>().ok());

        if let Some(user_id) = bypass_id {
            if let Some(user) = repo.get_user(user_id).await? {
                return Ok(Some(user.into()));
            }
        }
    }

    let Some(token) = parts
        .headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
    else {
        return Ok(None);
    };

    let decoding_key = DecodingKey::from_secret(config.jwt_secret.as_bytes());
    let mut validation = Validation::default();
    validation.validate_exp = true;

    let claims = match decode::<Claims>(token, &decoding_key, &validation) {
        Ok(data) => data.claims,
        Err(e) => {
            match e.kind() {
                ErrorKind::ExpiredSignature => tracing::debug!("Rejected expired session token"),
                _ => tracing::debug!(error = %e, "Rejected invalid session token"),
            }
            return Ok(None);
        }
    };

    // The user may have been removed after the token was issued.
    Ok(repo.get_user(claims.sub).await?.map(AuthUser::from))
}

impl From<crate::models::User> for AuthUser {
    fn from(user: crate::models::User) -> Self {
        Self {
            id: user.id,
            username: user.username,
            is_staff: user.is_staff,
        }
    }
}
