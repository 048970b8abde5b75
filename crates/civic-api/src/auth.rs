//! Admin API key guard.
//!
//! Mutating endpoints take an [`AdminKey`] argument. Axum runs the
//! extractor before the request body is read, so a rejected request never
//! reaches the stores.

use std::sync::Arc;

use axum::extract::FromRequestParts;
use axum::http::request::Parts;

use crate::error::ApiError;
use crate::state::AppState;

/// Header carrying the admin key.
pub const API_KEY_HEADER: &str = "x-api-key";

/// Proof that the request presented the configured admin key.
#[derive(Debug, Clone, Copy)]
pub struct AdminKey;

impl FromRequestParts<Arc<AppState>> for AdminKey {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let Some(expected) = state.admin_api_key.as_deref() else {
            tracing::warn!(uri = %parts.uri, "Admin request rejected: no admin API key configured");
            return Err(ApiError::Unauthorized);
        };

        let presented = parts
            .headers
            .get(API_KEY_HEADER)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default();

        if constant_time_eq(presented.as_bytes(), expected.as_bytes()) {
            Ok(Self)
        } else {
            tracing::debug!(method = %parts.method, uri = %parts.uri, "Admin request rejected: bad API key");
            Err(ApiError::Unauthorized)
        }
    }
}

/// Compare two byte strings without short-circuiting on the first
/// mismatch.
pub fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.iter().zip(b).fold(0_u8, |acc, (x, y)| acc | (x ^ y)) == 0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn equal_keys_match() {
        assert!(constant_time_eq(b"s3cret", b"s3cret"));
    }

    #[test]
    fn different_keys_do_not_match() {
        assert!(!constant_time_eq(b"s3cret", b"s3creT"));
        assert!(!constant_time_eq(b"s3cret", b"s3cret!"));
        assert!(!constant_time_eq(b"", b"s3cret"));
    }
}
