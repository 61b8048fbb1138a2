//! Gateway configuration loaded from the environment.

use std::{fmt, net::SocketAddr};

use forms_core::{ListScope, PrincipalId};

use crate::auth::TokenRegistry;

/// Address the server binds to when `FORMS_LISTEN_ADDR` is unset.
pub const DEFAULT_LISTEN_ADDR: &str = "127.0.0.1:3456";

/// Listen address variable.
pub const LISTEN_ADDR_VAR: &str = "FORMS_LISTEN_ADDR";
/// List scope variable: `owned` or `owned-enabled`.
pub const LIST_SCOPE_VAR: &str = "FORMS_LIST_SCOPE";
/// Seed tokens variable: comma-separated `uid:token` pairs.
pub const API_TOKENS_VAR: &str = "FORMS_API_TOKENS";

/// A configuration value that could not be parsed.
#[derive(Debug, thiserror::Error)]
#[error("invalid {var}: {reason}")]
pub struct ConfigError {
    /// The offending environment variable.
    pub var: &'static str,
    /// What was wrong with it.
    pub reason: String,
}

/// Runtime settings for the gateway.
#[derive(Clone, PartialEq, Eq)]
#[non_exhaustive]
pub struct GatewayConfig {
    /// Socket address to listen on.
    pub listen_addr: SocketAddr,
    /// Which owned forms `GET /forms` returns.
    pub list_scope: ListScope,
    /// Tokens registered at startup.
    pub api_tokens: Vec<(PrincipalId, String)>,
}

impl GatewayConfig {
    /// Load from process environment variables.
    ///
    /// # Errors
    /// Returns [`ConfigError`] if any variable is set to an invalid value.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// Load using `lookup` to resolve variable names.
    ///
    /// # Errors
    /// Returns [`ConfigError`] if any variable is set to an invalid value.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let addr = lookup(LISTEN_ADDR_VAR).unwrap_or_else(|| DEFAULT_LISTEN_ADDR.to_owned());
        let listen_addr = addr
            .parse::<SocketAddr>()
            .map_err(|e| ConfigError { var: LISTEN_ADDR_VAR, reason: format!("'{addr}': {e}") })?;

        let list_scope = match lookup(LIST_SCOPE_VAR) {
            Some(raw) => raw
                .trim()
                .parse::<ListScope>()
                .map_err(|e| ConfigError { var: LIST_SCOPE_VAR, reason: e.to_string() })?,
            None => ListScope::default(),
        };

        let api_tokens = match lookup(API_TOKENS_VAR) {
            Some(raw) => parse_tokens(&raw)?,
            None => Vec::new(),
        };

        Ok(Self { listen_addr, list_scope, api_tokens })
    }

    /// Build a token registry seeded with the configured tokens.
    #[must_use]
    pub fn token_registry(&self) -> TokenRegistry {
        let registry = TokenRegistry::new();
        for (principal, token) in &self.api_tokens {
            registry.register(principal.clone(), token);
        }
        registry
    }
}

impl fmt::Debug for GatewayConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GatewayConfig")
            .field("listen_addr", &self.listen_addr)
            .field("list_scope", &self.list_scope)
            .field("api_tokens", &self.api_tokens.len())
            .finish()
    }
}

fn parse_tokens(raw: &str) -> Result<Vec<(PrincipalId, String)>, ConfigError> {
    raw.split(',')
        .map(str::trim)
        .filter(|entry| !entry.is_empty())
        .map(|entry| match entry.split_once(':') {
            Some((uid, token)) if !uid.trim().is_empty() && !token.trim().is_empty() => {
                Ok((PrincipalId::new(uid.trim()), token.trim().to_owned()))
            }
            _ => Err(ConfigError {
                var: API_TOKENS_VAR,
                reason: "entries must look like 'uid:token'".to_owned(),
            }),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn load(vars: &[(&str, &str)]) -> Result<GatewayConfig, ConfigError> {
        let vars: HashMap<String, String> =
            vars.iter().map(|(k, v)| ((*k).to_owned(), (*v).to_owned())).collect();
        GatewayConfig::from_lookup(|k| vars.get(k).cloned())
    }

    #[test]
    fn defaults_apply_when_unset() {
        let config = match load(&[]) {
            Ok(c) => c,
            Err(e) => panic!("unexpected error: {e}"),
        };
        assert_eq!(config.listen_addr.to_string(), DEFAULT_LISTEN_ADDR);
        assert_eq!(config.list_scope, ListScope::Owned);
        assert!(config.api_tokens.is_empty());
    }

    #[test]
    fn parses_all_variables() {
        let config = match load(&[
            (LISTEN_ADDR_VAR, "0.0.0.0:8080"),
            (LIST_SCOPE_VAR, "owned-enabled"),
            (API_TOKENS_VAR, "alice:t1, bob:t2,"),
        ]) {
            Ok(c) => c,
            Err(e) => panic!("unexpected error: {e}"),
        };
        assert_eq!(config.listen_addr.port(), 8080);
        assert_eq!(config.list_scope, ListScope::OwnedEnabled);
        assert_eq!(
            config.api_tokens,
            vec![
                (PrincipalId::new("alice"), "t1".to_owned()),
                (PrincipalId::new("bob"), "t2".to_owned()),
            ]
        );
        let registry = config.token_registry();
        assert_eq!(registry.lookup("t2"), Some(PrincipalId::new("bob")));
    }

    #[test]
    fn rejects_bad_values() {
        let bad_addr = load(&[(LISTEN_ADDR_VAR, "not-an-addr")]);
        assert!(matches!(bad_addr, Err(ConfigError { var: LISTEN_ADDR_VAR, .. })));

        let bad_scope = load(&[(LIST_SCOPE_VAR, "everyone")]);
        assert!(matches!(bad_scope, Err(ConfigError { var: LIST_SCOPE_VAR, .. })));

        let bad_tokens = load(&[(API_TOKENS_VAR, "alice")]);
        assert!(matches!(bad_tokens, Err(ConfigError { var: API_TOKENS_VAR, .. })));
    }

    #[test]
    fn debug_output_omits_tokens() {
        let config = match load(&[(API_TOKENS_VAR, "alice:s3cret")]) {
            Ok(c) => c,
            Err(e) => panic!("unexpected error: {e}"),
        };
        assert!(!format!("{config:?}").contains("s3cret"));
    }
}
