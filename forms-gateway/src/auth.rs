//! Identity resolution for incoming requests.
//!
//! Credentials arrive either as `Authorization: Bearer <token>` or as the
//! `access-token` / `uid` header pair used by token-auth clients. The bearer
//! scheme name is matched case-insensitively. Tokens are kept only as SHA-256
//! digests.

use std::{collections::HashMap, sync::RwLock};

use async_trait::async_trait;
use axum::{
    extract::FromRequestParts,
    http::{header::AUTHORIZATION, request::Parts, HeaderMap},
};
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use forms_core::{Principal, PrincipalId};
use sha2::{Digest, Sha256};
use uuid::Uuid;

use crate::{error::GatewayError, routes::AppState};

/// Header carrying the raw token in the token-auth header scheme.
pub const ACCESS_TOKEN_HEADER: &str = "access-token";

/// Header naming the principal the token is claimed for.
pub const UID_HEADER: &str = "uid";

/// Principal that receives a generated token when none are configured.
pub const DEV_PRINCIPAL: &str = "dev";

const BEARER_SCHEME: &str = "bearer";

/// Credentials extracted from request headers, not yet verified.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    /// The presented token.
    pub token: String,
    /// Principal the caller claims to be, if sent.
    pub uid: Option<String>,
}

impl Credentials {
    /// Extract credentials from `headers`. A bearer token wins over an
    /// `access-token` header. Returns `None` if neither is present.
    #[must_use]
    pub fn from_headers(headers: &HeaderMap) -> Option<Self> {
        let uid = header_value(headers, UID_HEADER).map(str::to_owned);
        let token = header_value(headers, AUTHORIZATION.as_str())
            .and_then(|v| v.split_once(' '))
            .filter(|(scheme, _)| scheme.eq_ignore_ascii_case(BEARER_SCHEME))
            .map(|(_, token)| token.trim())
            .filter(|t| !t.is_empty())
            .or_else(|| header_value(headers, ACCESS_TOKEN_HEADER))?;
        Some(Self { token: token.to_owned(), uid })
    }
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("token", &"<redacted>")
            .field("uid", &self.uid)
            .finish()
    }
}

fn header_value<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
}

/// Why a request could not be authenticated.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[non_exhaustive]
pub enum AuthError {
    /// No credential headers were sent.
    #[error("missing credentials")]
    Missing,

    /// The token is not registered.
    #[error("invalid token")]
    InvalidToken,

    /// The `uid` header names a different principal than the token.
    #[error("uid does not match token")]
    UidMismatch,
}

/// Turns credentials into an authenticated principal.
#[async_trait]
pub trait IdentityResolver: Send + Sync {
    /// Verify `credentials`.
    ///
    /// # Errors
    /// Returns [`AuthError::InvalidToken`] or [`AuthError::UidMismatch`] if
    /// the credentials do not verify.
    async fn resolve(&self, credentials: &Credentials) -> Result<Principal, AuthError>;
}

type TokenDigest = [u8; 32];

/// In-process token store mapping token digests to principals.
#[derive(Debug, Default)]
pub struct TokenRegistry {
    tokens: RwLock<HashMap<TokenDigest, PrincipalId>>,
}

impl TokenRegistry {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Generate and register a new random token for `principal`.
    ///
    /// # Panics
    /// Panics if the internal `RwLock` is poisoned.
    pub fn issue(&self, principal: &PrincipalId) -> String {
        let mut raw = [0u8; 32];
        raw[..16].copy_from_slice(Uuid::new_v4().as_bytes());
        raw[16..].copy_from_slice(Uuid::new_v4().as_bytes());
        let token = URL_SAFE_NO_PAD.encode(raw);
        self.register(principal.clone(), &token);
        token
    }

    /// Register an externally supplied token for `principal`.
    ///
    /// # Panics
    /// Panics if the internal `RwLock` is poisoned.
    pub fn register(&self, principal: PrincipalId, token: &str) {
        #[expect(clippy::expect_used, reason = "lock poisoning is unrecoverable")]
        self.tokens
            .write()
            .expect("token registry write lock poisoned")
            .insert(digest(token), principal);
    }

    /// Issue a token for [`DEV_PRINCIPAL`] when nothing is registered yet,
    /// returning the principal and the plaintext token. Returns `None` if the
    /// registry already holds tokens.
    ///
    /// # Panics
    /// Panics if the internal `RwLock` is poisoned.
    pub fn issue_if_empty(&self) -> Option<(PrincipalId, String)> {
        if !self.is_empty() {
            return None;
        }
        let principal = PrincipalId::new(DEV_PRINCIPAL);
        let token = self.issue(&principal);
        Some((principal, token))
    }

    /// Principal registered for `token`, if any.
    ///
    /// # Panics
    /// Panics if the internal `RwLock` is poisoned.
    #[must_use]
    pub fn lookup(&self, token: &str) -> Option<PrincipalId> {
        #[expect(clippy::expect_used, reason = "lock poisoning is unrecoverable")]
        let tokens = self.tokens.read().expect("token registry read lock poisoned");
        tokens.get(&digest(token)).cloned()
    }

    /// Number of registered tokens.
    ///
    /// # Panics
    /// Panics if the internal `RwLock` is poisoned.
    #[must_use]
    pub fn len(&self) -> usize {
        #[expect(clippy::expect_used, reason = "lock poisoning is unrecoverable")]
        let tokens = self.tokens.read().expect("token registry read lock poisoned");
        tokens.len()
    }

    /// Returns `true` if no tokens are registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl IdentityResolver for TokenRegistry {
    async fn resolve(&self, credentials: &Credentials) -> Result<Principal, AuthError> {
        let id = self.lookup(&credentials.token).ok_or(AuthError::InvalidToken)?;
        if let Some(uid) = &credentials.uid {
            if uid != id.as_str() {
                return Err(AuthError::UidMismatch);
            }
        }
        Ok(Principal::new(id))
    }
}

fn digest(token: &str) -> TokenDigest {
    Sha256::digest(token.as_bytes()).into()
}

/// Extractor yielding the authenticated principal, or rejecting with 401.
#[derive(Debug, Clone)]
pub struct Authenticated(pub Principal);

impl FromRequestParts<AppState> for Authenticated {
    type Rejection = GatewayError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let Some(credentials) = Credentials::from_headers(&parts.headers) else {
            tracing::warn!(method = %parts.method, path = %parts.uri.path(), "request without credentials");
            return Err(AuthError::Missing.into());
        };
        match state.identity.resolve(&credentials).await {
            Ok(principal) => Ok(Self(principal)),
            Err(e) => {
                tracing::warn!(
                    method = %parts.method,
                    path = %parts.uri.path(),
                    error = %e,
                    "authentication failed"
                );
                Err(e.into())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use axum::http::HeaderValue;

    use super::*;

    fn headers(pairs: &[(&'static str, &str)]) -> HeaderMap {
        let mut map = HeaderMap::new();
        for (name, value) in pairs {
            match HeaderValue::from_str(value) {
                Ok(v) => {
                    map.insert(*name, v);
                }
                Err(e) => panic!("bad header value: {e}"),
            }
        }
        map
    }

    #[test]
    fn credentials_from_bearer_header() {
        let creds = Credentials::from_headers(&headers(&[("authorization", "Bearer abc")]));
        assert_eq!(creds, Some(Credentials { token: "abc".to_owned(), uid: None }));
    }

    #[test]
    fn bearer_scheme_is_case_insensitive() {
        for value in ["bearer abc", "BEARER abc", "BeArEr   abc "] {
            let creds = Credentials::from_headers(&headers(&[("authorization", value)]));
            assert_eq!(
                creds,
                Some(Credentials { token: "abc".to_owned(), uid: None }),
                "scheme in {value:?}"
            );
        }
        assert_eq!(Credentials::from_headers(&headers(&[("authorization", "Bearerabc")])), None);
    }

    #[test]
    fn credentials_from_token_auth_pair() {
        let creds =
            Credentials::from_headers(&headers(&[("access-token", "abc"), ("uid", "alice")]));
        assert_eq!(
            creds,
            Some(Credentials { token: "abc".to_owned(), uid: Some("alice".to_owned()) })
        );
    }

    #[test]
    fn credentials_missing_or_blank_yield_none() {
        assert_eq!(Credentials::from_headers(&HeaderMap::new()), None);
        assert_eq!(Credentials::from_headers(&headers(&[("authorization", "Bearer   ")])), None);
        assert_eq!(Credentials::from_headers(&headers(&[("authorization", "Basic abc")])), None);
        assert_eq!(Credentials::from_headers(&headers(&[("uid", "alice")])), None);
    }

    #[test]
    fn credentials_debug_redacts_token() {
        let creds = Credentials { token: "s3cret".to_owned(), uid: None };
        assert!(!format!("{creds:?}").contains("s3cret"));
    }

    #[test]
    fn registry_issue_then_lookup() {
        let registry = TokenRegistry::new();
        let alice = PrincipalId::new("alice");
        let token = registry.issue(&alice);
        assert_eq!(token.len(), 43, "32 bytes encode to 43 URL-safe chars");
        assert_eq!(registry.lookup(&token), Some(alice));
        assert_eq!(registry.lookup("not-issued"), None);
    }

    #[test]
    fn development_token_only_issued_into_empty_registry() {
        let registry = TokenRegistry::new();
        let Some((principal, token)) = registry.issue_if_empty() else {
            panic!("empty registry must yield a development token")
        };
        assert_eq!(principal.as_str(), DEV_PRINCIPAL);
        assert_eq!(registry.lookup(&token), Some(principal));
        assert_eq!(registry.issue_if_empty(), None);
        assert_eq!(registry.len(), 1);

        let configured = TokenRegistry::new();
        configured.register(PrincipalId::new("alice"), "tok");
        assert_eq!(configured.issue_if_empty(), None);
    }

    #[test]
    fn registry_issues_distinct_tokens() {
        let registry = TokenRegistry::new();
        let alice = PrincipalId::new("alice");
        assert_ne!(registry.issue(&alice), registry.issue(&alice));
        assert_eq!(registry.len(), 2);
    }

    #[tokio::test]
    async fn resolve_accepts_registered_token() {
        let registry = TokenRegistry::new();
        registry.register(PrincipalId::new("alice"), "tok");
        let creds = Credentials { token: "tok".to_owned(), uid: Some("alice".to_owned()) };
        let principal = registry.resolve(&creds).await;
        assert_eq!(principal, Ok(Principal::new(PrincipalId::new("alice"))));
    }

    #[tokio::test]
    async fn resolve_rejects_unknown_token_and_wrong_uid() {
        let registry = TokenRegistry::new();
        registry.register(PrincipalId::new("alice"), "tok");

        let unknown = Credentials { token: "nope".to_owned(), uid: None };
        assert_eq!(registry.resolve(&unknown).await, Err(AuthError::InvalidToken));

        let spoofed = Credentials { token: "tok".to_owned(), uid: Some("bob".to_owned()) };
        assert_eq!(registry.resolve(&spoofed).await, Err(AuthError::UidMismatch));
    }
}
