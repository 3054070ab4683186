use axum::{
    extract::FromRequestParts,
    http::{Method, Request, StatusCode, Uri, request::Parts},
    response::IntoResponse,
};
use jsonwebtoken::{EncodingKey, Header, encode};
use recruit_gateway::{
    AuthError, JwtVerifier, TokenVerifier,
    auth::Claims,
    models::{Role, SessionClaims, VerificationStatus},
};
use std::time::SystemTime;

// --- Helper Functions ---

const TEST_JWT_SECRET: &str = "test-secret-value-1234567890";

fn now() -> usize {
    SystemTime::now()
        .duration_since(SystemTime::UNIX_EPOCH)
        .unwrap()
        .as_secs() as usize
}

fn create_token(claims: &Claims) -> String {
    let key = EncodingKey::from_secret(TEST_JWT_SECRET.as_bytes());
    encode(&Header::default(), claims, &key).unwrap()
}

fn claims(role: Role, exp: usize) -> Claims {
    Claims {
        sub: Some("user-42".to_string()),
        exp,
        iat: Some(now()),
        role,
        verification_status: Some(VerificationStatus::Verified),
        verification_status_camel: None,
    }
}

/// Helper to get the mutable Parts struct from a generated Request
fn get_request_parts(method: Method, uri: Uri) -> Parts {
    let request = Request::builder()
        .method(method)
        .uri(uri)
        .body(axum::body::Body::empty())
        .unwrap();
    let (parts, _) = request.into_parts();
    parts
}

async fn error_body(error: AuthError) -> (StatusCode, serde_json::Value) {
    let response = error.into_response();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    (status, serde_json::from_slice(&bytes).unwrap())
}

// --- Verifier Tests ---

#[tokio::test]
async fn test_verify_success_with_valid_jwt() {
    let verifier = JwtVerifier::new(TEST_JWT_SECRET);
    let token = create_token(&claims(Role::FinancialController, now() + 3600));

    let session = verifier.verify(&token).await.unwrap();

    assert_eq!(session.subject.as_deref(), Some("user-42"));
    assert_eq!(session.role, Role::FinancialController);
    assert_eq!(session.verification_status, Some(VerificationStatus::Verified));
}

#[tokio::test]
async fn test_verify_failure_with_expired_jwt() {
    let verifier = JwtVerifier::new(TEST_JWT_SECRET);
    // Well past the default leeway.
    let token = create_token(&claims(Role::Admin, now() - 3600));

    assert!(verifier.verify(&token).await.is_err());
}

#[tokio::test]
async fn test_verify_failure_with_wrong_secret() {
    let verifier = JwtVerifier::new("a-different-secret");
    let token = create_token(&claims(Role::Admin, now() + 3600));

    assert!(verifier.verify(&token).await.is_err());
}

#[tokio::test]
async fn test_verify_failure_without_role_claim() {
    let verifier = JwtVerifier::new(TEST_JWT_SECRET);
    let key = EncodingKey::from_secret(TEST_JWT_SECRET.as_bytes());
    let token = encode(
        &Header::default(),
        &serde_json::json!({ "sub": "x", "exp": now() + 3600 }),
        &key,
    )
    .unwrap();

    assert!(verifier.verify(&token).await.is_err());
}

#[tokio::test]
async fn test_verify_tolerates_audience_claim() {
    let verifier = JwtVerifier::new(TEST_JWT_SECRET);
    let key = EncodingKey::from_secret(TEST_JWT_SECRET.as_bytes());
    let token = encode(
        &Header::default(),
        &serde_json::json!({ "aud": "authenticated", "role": "OPERATOR", "exp": now() + 3600 }),
        &key,
    )
    .unwrap();

    let session = verifier.verify(&token).await.unwrap();
    assert_eq!(session.role, Role::Operator);
    assert_eq!(session.verification_status, None);
}

#[tokio::test]
async fn test_verify_rejects_malformed_token() {
    let verifier = JwtVerifier::new(TEST_JWT_SECRET);
    assert!(verifier.verify("definitely-not-a-jwt").await.is_err());
}

// --- Error Contract ---

#[tokio::test]
async fn test_error_responses_match_json_contract() {
    let (status, body) = error_body(AuthError::Unauthenticated).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body, serde_json::json!({ "error": "Unauthorized" }));

    let invalid = JwtVerifier::new(TEST_JWT_SECRET)
        .verify("bad")
        .await
        .unwrap_err();
    let (status, body) = error_body(AuthError::InvalidToken(invalid)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body, serde_json::json!({ "error": "Invalid Token" }));

    let (status, body) = error_body(AuthError::Forbidden).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body, serde_json::json!({ "error": "Forbidden" }));
}

// --- Extractor Tests ---

#[tokio::test]
async fn test_session_extractor_reads_gateway_extension() {
    let mut parts = get_request_parts(Method::GET, "/api/session".parse().unwrap());
    let expected = SessionClaims {
        subject: None,
        role: Role::Interviewer,
        verification_status: Some(VerificationStatus::Pending),
    };
    parts.extensions.insert(expected.clone());

    let session = SessionClaims::from_request_parts(&mut parts, &()).await.unwrap();
    assert_eq!(session, expected);
}

#[tokio::test]
async fn test_session_extractor_rejects_without_extension() {
    let mut parts = get_request_parts(Method::GET, "/api/session".parse().unwrap());

    let result = SessionClaims::from_request_parts(&mut parts, &()).await;

    assert!(matches!(result, Err(AuthError::Unauthenticated)));
}
