use axum::{
    async_trait,
    extract::{FromRef, FromRequestParts},
    http::{request::Parts, StatusCode},
};
use jsonwebtoken::{decode, DecodingKey, Validation};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};
use uuid::Uuid;

use crate::{config::JwtConfig, state::AppState};

/// Claims of an access token issued by the hosted auth service.
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: Uuid,
    pub exp: usize,
    #[serde(default)]
    pub iat: Option<usize>,
    #[serde(default)]
    pub iss: Option<String>,
    pub aud: String,
    #[serde(default)]
    pub role: Option<String>,
}

#[derive(Clone)]
pub struct JwtKeys {
    pub decoding: DecodingKey,
    pub issuer: Option<String>,
    pub audience: String,
}

impl FromRef<AppState> for JwtKeys {
    fn from_ref(state: &AppState) -> Self {
        let JwtConfig {
            secret,
            issuer,
            audience,
        } = state.config.jwt.clone();
        Self {
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            issuer,
            audience,
        }
    }
}

impl JwtKeys {
    pub fn verify(&self, token: &str) -> anyhow::Result<Claims> {
        let mut validation = Validation::default();
        validation.set_audience(std::slice::from_ref(&self.audience));
        if let Some(issuer) = &self.issuer {
            validation.set_issuer(std::slice::from_ref(issuer));
        }
        let data = decode::<Claims>(token, &self.decoding, &validation)?;
        debug!(user_id = %data.claims.sub, "jwt verified");
        Ok(data.claims)
    }
}

/// Authenticated user id taken from the bearer token.
#[derive(Debug, Clone, Copy)]
pub struct AuthUser(pub Uuid);

#[async_trait]
impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
    JwtKeys: FromRef<S>,
{
    type Rejection = (StatusCode, String);

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let keys = JwtKeys::from_ref(state);
        let auth_header = parts
            .headers
            .get(axum::http::header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .ok_or((
                StatusCode::UNAUTHORIZED,
                "Missing Authorization header".to_string(),
            ))?;

        let token = auth_header
            .strip_prefix("Bearer ")
            .or_else(|| auth_header.strip_prefix("bearer "))
            .ok_or((
                StatusCode::UNAUTHORIZED,
                "Invalid Authorization header".to_string(),
            ))?;

        match keys.verify(token) {
            Ok(claims) => Ok(AuthUser(claims.sub)),
            Err(e) => {
                warn!(error = %e, "invalid or expired token");
                Err((
                    StatusCode::UNAUTHORIZED,
                    "Invalid or expired token".to_string(),
                ))
            }
        }
    }
}

#[cfg(test)]
pub(crate) fn sign_for_tests(secret: &str, audience: &str, issuer: Option<&str>, user_id: Uuid) -> String {
    use jsonwebtoken::{encode, EncodingKey, Header};
    use time::OffsetDateTime;

    let now = OffsetDateTime::now_utc().unix_timestamp() as usize;
    let claims = Claims {
        sub: user_id,
        exp: now + 300,
        iat: Some(now),
        iss: issuer.map(Into::into),
        aud: audience.into(),
        role: Some("authenticated".into()),
    };
    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .expect("sign test token")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn keys(secret: &str, issuer: Option<&str>, audience: &str) -> JwtKeys {
        JwtKeys {
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            issuer: issuer.map(Into::into),
            audience: audience.into(),
        }
    }

    #[test]
    fn verifies_token_and_returns_subject() {
        let user_id = Uuid::new_v4();
        let token = sign_for_tests("dev-secret", "authenticated", None, user_id);
        let claims = keys("dev-secret", None, "authenticated").verify(&token).unwrap();
        assert_eq!(claims.sub, user_id);
        assert_eq!(claims.role.as_deref(), Some("authenticated"));
    }

    #[test]
    fn rejects_wrong_secret_or_audience() {
        let token = sign_for_tests("dev-secret", "authenticated", None, Uuid::new_v4());
        assert!(keys("other-secret", None, "authenticated").verify(&token).is_err());
        assert!(keys("dev-secret", None, "anon").verify(&token).is_err());
    }

    #[test]
    fn issuer_checked_only_when_configured() {
        let token = sign_for_tests("s", "authenticated", Some("good-iss"), Uuid::new_v4());
        assert!(keys("s", Some("good-iss"), "authenticated").verify(&token).is_ok());
        assert!(keys("s", Some("bad-iss"), "authenticated").verify(&token).is_err());
        assert!(keys("s", None, "authenticated").verify(&token).is_ok());
    }
}
