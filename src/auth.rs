use async_trait::async_trait;
use axum::{
    extract::FromRequestParts,
    http::{HeaderMap, header, request::Parts},
};
use cookie::Cookie;
use jsonwebtoken::{Algorithm, DecodingKey, Validation, decode, errors::Error as JwtError};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::{
    errors::AuthError,
    models::{Role, SessionClaims, VerificationStatus},
};

/// Claims
///
/// The payload the marketplace's token issuer signs into the `token` cookie.
/// Issuers have shipped both `verification_status` and `verificationStatus`, so both
/// spellings are accepted here and folded into one field by `into_session`.
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    /// Subject (sub): the user id, when present.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sub: Option<String>,
    /// Expiration Time (exp): always validated.
    pub exp: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub iat: Option<usize>,
    pub role: Role,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub verification_status: Option<VerificationStatus>,
    #[serde(
        default,
        rename = "verificationStatus",
        skip_serializing_if = "Option::is_none"
    )]
    pub verification_status_camel: Option<VerificationStatus>,
}

impl Claims {
    /// Normalizes the wire claims into the single shape the gateway reasons about.
    /// The snake_case spelling wins when an issuer sends both.
    pub fn into_session(self) -> SessionClaims {
        SessionClaims {
            subject: self.sub,
            role: self.role,
            verification_status: self.verification_status.or(self.verification_status_camel),
        }
    }
}

/// TokenVerifier
///
/// The contract for turning an opaque session token into verified claims.
/// Async so a verifier backed by I/O (revocation lists, introspection endpoints)
/// suspends instead of stalling other requests on the runtime.
#[async_trait]
pub trait TokenVerifier: Send + Sync {
    async fn verify(&self, token: &str) -> Result<SessionClaims, JwtError>;
}

/// Shared handle stored in the application state.
pub type VerifierState = Arc<dyn TokenVerifier>;

/// JwtVerifier
///
/// HS256 verification with mandatory expiry, keyed by the configured secret.
#[derive(Clone)]
pub struct JwtVerifier {
    decoding_key: DecodingKey,
    validation: Validation,
}

impl JwtVerifier {
    pub fn new(secret: &str) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = true;
        // The issuer's audience claim is not part of the session contract.
        validation.validate_aud = false;

        Self {
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            validation,
        }
    }
}

#[async_trait]
impl TokenVerifier for JwtVerifier {
    async fn verify(&self, token: &str) -> Result<SessionClaims, JwtError> {
        let token_data = decode::<Claims>(token, &self.decoding_key, &self.validation)?;
        Ok(token_data.claims.into_session())
    }
}

/// SessionClaims Extractor Implementation
///
/// Handlers behind the gateway take `SessionClaims` as an argument. The gateway
/// middleware has already verified the token and stored the claims in the request
/// extensions; a handler reached without them (public path) is rejected with 401.
impl<S> FromRequestParts<S> for SessionClaims
where
    S: Send + Sync,
{
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<SessionClaims>()
            .cloned()
            .ok_or(AuthError::Unauthenticated)
    }
}

/// session_token
///
/// Reads the named cookie out of every `Cookie` header on the request.
/// Empty values are skipped, so a blank cookie never shadows a real one.
pub fn session_token(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|raw| raw.split(';'))
        .filter_map(|piece| Cookie::parse(piece.trim()).ok())
        .find(|cookie| cookie.name() == name && !cookie.value().is_empty())
        .map(|cookie| cookie.value().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn headers(cookies: &[&str]) -> HeaderMap {
        let mut headers = HeaderMap::new();
        for cookie in cookies {
            headers.append(header::COOKIE, HeaderValue::from_str(cookie).unwrap());
        }
        headers
    }

    #[test]
    fn finds_token_among_other_cookies() {
        let headers = headers(&["theme=dark; token=abc.def.ghi; lang=en"]);
        assert_eq!(session_token(&headers, "token").as_deref(), Some("abc.def.ghi"));
    }

    #[test]
    fn searches_every_cookie_header() {
        let headers = headers(&["theme=dark", "token=second"]);
        assert_eq!(session_token(&headers, "token").as_deref(), Some("second"));
    }

    #[test]
    fn empty_or_missing_token_is_absent() {
        assert!(session_token(&headers(&["token="]), "token").is_none());
        assert!(session_token(&headers(&["tokens=abc"]), "token").is_none());
        assert!(session_token(&HeaderMap::new(), "token").is_none());
    }

    #[test]
    fn blank_cookie_does_not_shadow_a_later_token() {
        let split = headers(&["token=", "theme=dark; token=abc.def.ghi"]);
        assert_eq!(session_token(&split, "token").as_deref(), Some("abc.def.ghi"));

        let joined = headers(&["token=; token=second"]);
        assert_eq!(session_token(&joined, "token").as_deref(), Some("second"));
    }

    #[test]
    fn snake_case_status_wins_over_camel_case() {
        let claims: Claims = serde_json::from_value(serde_json::json!({
            "exp": 1,
            "role": "CANDIDATE",
            "verification_status": "VERIFIED",
            "verificationStatus": "PENDING",
        }))
        .unwrap();
        let session = claims.into_session();
        assert_eq!(session.verification_status, Some(VerificationStatus::Verified));
    }

    #[test]
    fn camel_case_status_alone_is_honoured() {
        let claims: Claims = serde_json::from_value(serde_json::json!({
            "exp": 1,
            "role": "TAS",
            "verificationStatus": "PENDING",
        }))
        .unwrap();
        assert_eq!(
            claims.into_session().verification_status,
            Some(VerificationStatus::Pending)
        );
    }
}
