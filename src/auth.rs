use axum::{
    extract::{Request, State},
    http::{HeaderMap, header},
    middleware::Next,
    response::Response,
};
use jsonwebtoken::{Algorithm, DecodingKey, Validation, decode};
use serde_json::{Map, Value};

use crate::{config::AppConfig, error::ApiError};

/// Claims
///
/// Whatever the token carries, kept as raw JSON. The gate only cares that the
/// signature verifies and that `exp`, when present, is in the future, so no
/// claim shape is imposed and nothing is handed to the handlers.
pub type Claims = Map<String, Value>;

/// Only symmetric HMAC signatures are accepted.
const ACCEPTED_ALGORITHMS: [Algorithm; 3] = [Algorithm::HS256, Algorithm::HS384, Algorithm::HS512];

/// validate_token
///
/// Verifies the token signature against the shared secret and checks `exp`
/// if the token has one. Tokens signed with any non-HMAC algorithm fail with
/// `InvalidAlgorithm`.
pub fn validate_token(token: &str, secret: &str) -> Result<Claims, jsonwebtoken::errors::Error> {
    let decoding_key = DecodingKey::from_secret(secret.as_bytes());

    let mut validation = Validation::new(Algorithm::HS256);
    validation.algorithms = ACCEPTED_ALGORITHMS.to_vec();
    validation.required_spec_claims.clear();
    validation.validate_exp = true;
    validation.validate_aud = false;

    decode::<Claims>(token, &decoding_key, &validation).map(|data| data.claims)
}

/// Extracts the token from an `Authorization: Bearer <token>` header.
///
/// The value must be exactly two space-separated parts and the scheme is
/// compared case-insensitively.
fn bearer_token(headers: &HeaderMap) -> Result<&str, &'static str> {
    let value = headers
        .get(header::AUTHORIZATION)
        .ok_or("missing authorization header")?
        .to_str()
        .map_err(|_| "authorization header is not valid ASCII")?;

    let mut parts = value.split(' ');
    match (parts.next(), parts.next(), parts.next()) {
        (Some(scheme), Some(token), None) if scheme.eq_ignore_ascii_case("bearer") => Ok(token),
        _ => Err("authorization header could not be parsed"),
    }
}

/// require_bearer
///
/// Middleware gate for protected routes. On any failure the request is
/// answered with 401 and the wrapped handler never runs. On success the
/// request continues unchanged.
pub async fn require_bearer(
    State(config): State<AppConfig>,
    request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let token = bearer_token(request.headers()).map_err(|reason| {
        tracing::warn!(reason, "unauthorized request");
        ApiError::Unauthorized
    })?;

    if let Err(e) = validate_token(token, &config.jwt_secret) {
        tracing::warn!(error = %e, "could not validate token");
        return Err(ApiError::Unauthorized);
    }

    Ok(next.run(request).await)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn headers_with(value: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(header::AUTHORIZATION, HeaderValue::from_str(value).unwrap());
        headers
    }

    #[test]
    fn bearer_scheme_is_case_insensitive() {
        assert_eq!(bearer_token(&headers_with("bearer abc")), Ok("abc"));
        assert_eq!(bearer_token(&headers_with("BEARER abc")), Ok("abc"));
    }

    #[test]
    fn bearer_requires_exactly_two_parts() {
        assert!(bearer_token(&HeaderMap::new()).is_err());
        assert!(bearer_token(&headers_with("Bearer")).is_err());
        assert!(bearer_token(&headers_with("Bearer a b")).is_err());
        assert!(bearer_token(&headers_with("Bearer  abc")).is_err());
        assert!(bearer_token(&headers_with("Basic abc")).is_err());
    }
}
