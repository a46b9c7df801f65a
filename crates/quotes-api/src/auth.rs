use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use axum::http::{header, HeaderMap};
use quotes_core::auth::{AuthSession, AuthUser, TokenVerifier};
use quotes_core::session::SessionStore;
use quotes_core::store::Actor;

use crate::error::AppError;

/// Cookie carrying the access token for browser requests.
pub const ACCESS_TOKEN_COOKIE: &str = "quotes_access_token";

/// The user behind a request's access token.
#[derive(Clone)]
pub struct AuthenticatedUser {
    pub user_id: String,
    pub email: Option<String>,
    pub access_token: String,
}

impl AuthenticatedUser {
    pub fn actor(&self) -> Actor {
        Actor::new(self.user_id.clone(), self.access_token.clone())
    }

    /// Signed-in session store scoped to one request.
    pub fn session(&self) -> SessionStore {
        let store = SessionStore::new();
        store.set_signed_in(AuthSession {
            access_token: self.access_token.clone(),
            refresh_token: String::new(),
            expires_at: i64::MAX,
            user: AuthUser {
                id: self.user_id.clone(),
                email: self.email.clone(),
            },
        });
        store
    }
}

/// Session store for an optional request user; signed out when anonymous.
pub fn request_session(user: Option<&AuthenticatedUser>) -> SessionStore {
    user.map_or_else(
        || {
            let store = SessionStore::new();
            store.sign_out();
            store
        },
        AuthenticatedUser::session,
    )
}

impl fmt::Debug for AuthenticatedUser {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("AuthenticatedUser")
            .field("user", &user_fingerprint(&self.user_id))
            .field("access_token", &"[REDACTED]")
            .finish_non_exhaustive()
    }
}

/// Resolves request credentials through the auth provider, when one is configured.
#[derive(Clone)]
pub struct IdentityResolver {
    verifier: Option<Arc<dyn TokenVerifier>>,
}

impl IdentityResolver {
    pub fn new(verifier: Option<Arc<dyn TokenVerifier>>) -> Self {
        Self { verifier }
    }

    /// The signed-in user; missing or rejected credentials are an error.
    pub async fn require(&self, headers: &HeaderMap) -> Result<AuthenticatedUser, AppError> {
        let token = extract_access_token(headers)?
            .ok_or_else(|| AppError::unauthorized("Missing access token"))?;
        let verifier = self
            .verifier
            .as_ref()
            .ok_or_else(|| AppError::unauthorized("Sign-in is not configured on this server"))?;

        let user = verifier.verify_token(token).await?;
        if user.id.trim().is_empty() {
            return Err(AppError::unauthorized("Token subject is missing"));
        }
        Ok(AuthenticatedUser {
            user_id: user.id,
            email: user.email,
            access_token: token.to_string(),
        })
    }

    /// The signed-in user for pages that also render anonymously.
    pub async fn optional(&self, headers: &HeaderMap) -> Option<AuthenticatedUser> {
        match self.require(headers).await {
            Ok(user) => Some(user),
            Err(AppError::Unauthorized(reason)) => {
                tracing::debug!("Rendering anonymously: {}", reason);
                None
            }
            Err(error) => {
                tracing::warn!("Could not resolve request user: {}", error);
                None
            }
        }
    }
}

/// Access token from `Authorization: Bearer` or the session cookie.
pub fn extract_access_token(headers: &HeaderMap) -> Result<Option<&str>, AppError> {
    if let Some(value) = headers.get(header::AUTHORIZATION) {
        return extract_bearer_token(
            value
                .to_str()
                .map_err(|_| AppError::unauthorized("Authorization header is not valid UTF-8"))?,
        )
        .map(Some);
    }

    Ok(headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, _)| *name == ACCESS_TOKEN_COOKIE)
        .map(|(_, token)| token.trim())
        .filter(|token| !token.is_empty()))
}

fn extract_bearer_token(header: &str) -> Result<&str, AppError> {
    let (scheme, token) = header
        .split_once(' ')
        .ok_or_else(|| AppError::unauthorized("Authorization header must be `Bearer <token>`"))?;

    if !scheme.eq_ignore_ascii_case("bearer") {
        return Err(AppError::unauthorized(
            "Authorization scheme must be `Bearer`",
        ));
    }
    let token = token.trim();
    if token.is_empty() {
        return Err(AppError::unauthorized("Bearer token is empty"));
    }

    Ok(token)
}

/// `Set-Cookie` value storing an access token for `max_age_secs`.
pub fn session_cookie(access_token: &str, max_age_secs: i64, secure: bool) -> String {
    cookie_value(access_token, max_age_secs.max(0), secure)
}

/// `Set-Cookie` value that removes the access token cookie.
pub fn cleared_session_cookie(secure: bool) -> String {
    cookie_value("", 0, secure)
}

fn cookie_value(value: &str, max_age_secs: i64, secure: bool) -> String {
    let mut cookie = format!(
        "{ACCESS_TOKEN_COOKIE}={value}; Path=/; HttpOnly; SameSite=Lax; Max-Age={max_age_secs}"
    );
    if secure {
        cookie.push_str("; Secure");
    }
    cookie
}

/// Stable, non-reversible user tag for logs.
pub fn user_fingerprint(user_id: &str) -> u64 {
    let mut hasher = std::collections::hash_map::DefaultHasher::new();
    user_id.hash(&mut hasher);
    hasher.finish()
}

#[cfg(test)]
mod tests {
    use axum::http::HeaderValue;

    use super::*;

    #[test]
    fn bearer_token_extractor_accepts_standard_header() {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::AUTHORIZATION,
            HeaderValue::from_static("Bearer abc.def.ghi"),
        );

        assert_eq!(
            extract_access_token(&headers).unwrap(),
            Some("abc.def.ghi")
        );
    }

    #[test]
    fn bearer_token_extractor_rejects_wrong_scheme() {
        let mut headers = HeaderMap::new();
        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Basic abc"));
        assert!(extract_access_token(&headers).is_err());
    }

    #[test]
    fn cookie_token_is_used_without_header() {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::COOKIE,
            HeaderValue::from_static("theme=dark; quotes_access_token=cookie-token; other=1"),
        );
        assert_eq!(
            extract_access_token(&headers).unwrap(),
            Some("cookie-token")
        );
    }

    #[test]
    fn no_credentials_is_none() {
        let headers = HeaderMap::new();
        assert_eq!(extract_access_token(&headers).unwrap(), None);
    }

    #[tokio::test]
    async fn resolver_without_provider_rejects() {
        let resolver = IdentityResolver::new(None);
        let mut headers = HeaderMap::new();
        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Bearer t"));
        assert!(matches!(
            resolver.require(&headers).await,
            Err(AppError::Unauthorized(_))
        ));
        assert!(resolver.optional(&headers).await.is_none());
    }

    #[test]
    fn session_cookie_is_http_only() {
        assert_eq!(
            session_cookie("abc", 3600, true),
            "quotes_access_token=abc; Path=/; HttpOnly; SameSite=Lax; Max-Age=3600; Secure"
        );
        assert_eq!(
            session_cookie("abc", -5, false),
            "quotes_access_token=abc; Path=/; HttpOnly; SameSite=Lax; Max-Age=0"
        );
        assert!(cleared_session_cookie(false).starts_with("quotes_access_token=; "));
        assert!(cleared_session_cookie(false).ends_with("Max-Age=0"));
    }

    #[test]
    fn debug_redacts_token() {
        let user = AuthenticatedUser {
            user_id: "user-1".to_string(),
            email: None,
            access_token: "secret-token".to_string(),
        };
        assert!(!format!("{user:?}").contains("secret-token"));
        assert_eq!(user.actor().user_id, "user-1");
    }

    #[test]
    fn request_session_reflects_user() {
        let user = AuthenticatedUser {
            user_id: "user-1".to_string(),
            email: Some("a@example.com".to_string()),
            access_token: "token".to_string(),
        };
        let signed_in = request_session(Some(&user));
        assert_eq!(signed_in.actor().unwrap().access_token, "token");

        let anonymous = request_session(None);
        assert!(anonymous.actor().is_none());
        assert!(!anonymous.current().is_loading());
    }
}
