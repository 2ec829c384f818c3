//! Authentication middleware.
//!
//! Token issuance belongs to the external identity provider; this
//! middleware only validates the HS256 signature and extracts the caller
//! id and role, injecting a [`Caller`] into request extensions for
//! downstream handlers.

use axum::{
    extract::{Request, State},
    http::{StatusCode, header::AUTHORIZATION},
    middleware::Next,
    response::Response,
};
use jsonwebtoken::{Algorithm, DecodingKey, Validation, decode};
use rentfleet::booking::{Caller, Role};
use serde::Deserialize;
use uuid::Uuid;

use super::AppState;

/// Claims the identity provider puts in its tokens.
#[derive(Debug, Deserialize)]
pub struct Claims {
    /// Caller id (UUID).
    pub sub: String,
    /// Caller role; absent means a regular user.
    #[serde(default)]
    pub role: Option<String>,
    pub exp: usize,
}

impl Claims {
    pub fn caller(&self) -> Option<Caller> {
        let id: Uuid = self.sub.parse().ok()?;
        let role = match &self.role {
            Some(raw) => raw.parse::<Role>().ok()?,
            None => Role::User,
        };
        Some(Caller { id, role })
    }
}

/// Validate the bearer token and inject the authenticated [`Caller`].
pub async fn auth_middleware(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, StatusCode> {
    let token = request
        .headers()
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .ok_or(StatusCode::UNAUTHORIZED)?;

    let caller = decode_caller(token, state.jwt_secret.as_bytes())
        .ok_or(StatusCode::UNAUTHORIZED)?;

    request.extensions_mut().insert(caller);
    Ok(next.run(request).await)
}

fn decode_caller(token: &str, secret: &[u8]) -> Option<Caller> {
    let data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret),
        &Validation::new(Algorithm::HS256),
    )
    .ok()?;
    data.claims.caller()
}

#[cfg(test)]
mod tests {
    use super::*;
    use jsonwebtoken::{EncodingKey, Header, encode};

    fn token(sub: &str, role: Option<&str>, secret: &[u8]) -> String {
        let claims = serde_json::json!({
            "sub": sub,
            "role": role,
            "exp": chrono::Utc::now().timestamp() + 3600,
        });
        encode(&Header::default(), &claims, &EncodingKey::from_secret(secret)).unwrap()
    }

    #[test]
    fn valid_tokens_yield_a_caller() {
        let id = Uuid::new_v4();
        let caller =
            decode_caller(&token(&id.to_string(), Some("STAFF"), b"secret"), b"secret").unwrap();
        assert_eq!(caller.id, id);
        assert!(caller.is_staff());
    }

    #[test]
    fn missing_role_defaults_to_user() {
        let id = Uuid::new_v4();
        let caller = decode_caller(&token(&id.to_string(), None, b"secret"), b"secret").unwrap();
        assert_eq!(caller.role, Role::User);
    }

    #[test]
    fn wrong_secret_or_garbage_is_rejected() {
        let id = Uuid::new_v4();
        assert!(decode_caller(&token(&id.to_string(), None, b"secret"), b"other").is_none());
        assert!(decode_caller("not-a-token", b"secret").is_none());
        assert!(decode_caller(&token("not-a-uuid", None, b"secret"), b"secret").is_none());
    }
}
