//! Bearer token authentication.

use std::collections::HashMap;

use async_trait::async_trait;
use axum::http::HeaderMap;
use axum::http::header::AUTHORIZATION;
use common::CustomerId;

use crate::error::ApiError;

/// Resolves a bearer token to the customer it was issued to.
///
/// Token issuance and verification belong to the identity provider; the API
/// only asks it who the caller is.
#[async_trait]
pub trait IdentityResolver: Send + Sync {
    /// Returns the customer for `token`, or `None` if the token is not valid.
    async fn resolve(&self, token: &str) -> Option<CustomerId>;
}

/// A fixed token table, loaded from configuration.
#[derive(Debug, Clone, Default)]
pub struct StaticIdentityResolver {
    tokens: HashMap<String, CustomerId>,
}

impl StaticIdentityResolver {
    pub fn new(tokens: impl IntoIterator<Item = (String, CustomerId)>) -> Self {
        Self {
            tokens: tokens.into_iter().collect(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }
}

#[async_trait]
impl IdentityResolver for StaticIdentityResolver {
    async fn resolve(&self, token: &str) -> Option<CustomerId> {
        self.tokens.get(token).copied()
    }
}

/// Extracts the bearer token from `headers` and resolves it.
pub async fn authenticate(
    resolver: &dyn IdentityResolver,
    headers: &HeaderMap,
) -> Result<CustomerId, ApiError> {
    let token = bearer_token(headers)
        .ok_or_else(|| ApiError::Unauthorized("Missing bearer token".to_string()))?;

    resolver
        .resolve(token)
        .await
        .ok_or_else(|| ApiError::Unauthorized("Invalid or expired token".to_string()))
}

fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    let value = headers.get(AUTHORIZATION)?.to_str().ok()?;
    let (scheme, token) = value.split_once(' ')?;
    let token = token.trim();
    (scheme.eq_ignore_ascii_case("bearer") && !token.is_empty()).then_some(token)
}
