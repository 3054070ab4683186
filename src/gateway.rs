use axum::{
    extract::{Request, State},
    http::{StatusCode, Uri},
    middleware::Next,
    response::{IntoResponse, Redirect, Response},
};
use std::sync::Arc;

use crate::{
    auth::{self, VerifierState},
    errors::AuthError,
    models::{SessionClaims, VerificationStatus},
    policy::{self, AccessPolicy, Unmatched},
};

pub const LOGIN_PATH: &str = "/login";
pub const UNAUTHORIZED_PATH: &str = "/unauthorized";
pub const VERIFICATION_PENDING_PATH: &str = "/verification-pending";

/// Decision
///
/// The single outcome of running a request through the gateway.
#[derive(Debug)]
pub enum Decision {
    /// Forward to the downstream handler. Carries the verified claims unless the
    /// path was public and no verification took place.
    Allow(Option<SessionClaims>),
    /// Send a UI caller elsewhere.
    Redirect(String),
    /// Reject an API caller with a JSON error.
    Reject(AuthError),
}

impl Decision {
    /// Outcome label used in tracing fields.
    fn label(&self) -> &'static str {
        match self {
            Decision::Allow(_) => "allow",
            Decision::Redirect(_) => "redirect",
            Decision::Reject(_) => "reject",
        }
    }
}

/// `/api` and everything beneath it.
pub fn is_api_path(path: &str) -> bool {
    policy::is_under(path, "/api")
}

/// canonical_path
///
/// The form of a request path that both the gateway and the upstream see.
/// `.` and `..` segments are resolved, including their `%2e` spellings, backslashes
/// count as separators and repeated slashes collapse. A trailing slash survives.
///
/// `/login/../admin/users` becomes `/admin/users`.
pub fn canonical_path(raw: &str) -> String {
    let mut segments: Vec<&str> = Vec::new();
    let mut trailing_slash = false;

    for segment in raw.split(['/', '\\']) {
        let dots = segment.replace("%2e", ".").replace("%2E", ".");
        trailing_slash = matches!(dots.as_str(), "" | "." | "..");
        match dots.as_str() {
            "" | "." => {}
            ".." => {
                segments.pop();
            }
            _ => segments.push(segment),
        }
    }

    let mut path = format!("/{}", segments.join("/"));
    if trailing_slash && !segments.is_empty() {
        path.push('/');
    }
    path
}

/// Same URI, path replaced, query kept.
fn with_path(uri: &Uri, path: &str) -> Result<Uri, axum::http::Error> {
    let path_and_query = match uri.query() {
        Some(query) => format!("{path}?{query}"),
        None => path.to_string(),
    };
    let mut parts = uri.clone().into_parts();
    parts.path_and_query = Some(path_and_query.parse()?);
    Ok(Uri::from_parts(parts)?)
}

fn login_with_return(path: &str) -> String {
    format!("{LOGIN_PATH}?redirect={}", urlencoding::encode(path))
}

/// Gateway
///
/// The request authorization gateway: public bypass, authentication, role
/// authorization and the verification gate, evaluated in that order.
/// Holds only immutable configuration so one instance serves every request.
pub struct Gateway {
    policy: AccessPolicy,
    verifier: VerifierState,
    cookie_name: String,
}

/// Shared handle stored in the application state.
pub type GatewayState = Arc<Gateway>;

impl Gateway {
    pub fn new(policy: AccessPolicy, verifier: VerifierState, cookie_name: impl Into<String>) -> Self {
        Self {
            policy,
            verifier,
            cookie_name: cookie_name.into(),
        }
    }

    pub fn cookie_name(&self) -> &str {
        &self.cookie_name
    }

    pub fn policy(&self) -> &AccessPolicy {
        &self.policy
    }

    /// decide
    ///
    /// Evaluates one request. `token` is the raw session cookie value, if any.
    /// The first rule that applies determines the outcome:
    ///
    /// 1. Public routes, assets and static files pass without authentication.
    /// 2. A missing or unverifiable token is rejected (API) or sent to login (UI).
    /// 3. The longest matching access rule must admit the caller's role. The
    ///    verification-pending page is never denied for want of a rule.
    /// 4. Pending accounts are confined to the verification-pending page on the UI;
    ///    verified accounts on that page are sent to their dashboard.
    pub async fn decide(&self, path: &str, token: Option<&str>) -> Decision {
        if self.policy.is_public(path) {
            return Decision::Allow(None);
        }

        let api = is_api_path(path);

        let Some(token) = token else {
            return if api {
                Decision::Reject(AuthError::Unauthenticated)
            } else {
                Decision::Redirect(login_with_return(path))
            };
        };

        let claims = match self.verifier.verify(token).await {
            Ok(claims) => claims,
            Err(e) => {
                tracing::debug!(path, error = ?e, "Session token failed verification");
                return if api {
                    Decision::Reject(AuthError::InvalidToken(e))
                } else {
                    Decision::Redirect(LOGIN_PATH.to_string())
                };
            }
        };

        let permitted = match self.policy.match_route(path) {
            Some(rule) => rule.permits(claims.role),
            None => {
                self.policy.unmatched() == Unmatched::Allow || path == VERIFICATION_PENDING_PATH
            }
        };
        if !permitted {
            return if api {
                Decision::Reject(AuthError::Forbidden)
            } else {
                Decision::Redirect(UNAUTHORIZED_PATH.to_string())
            };
        }

        let on_pending_page = path == VERIFICATION_PENDING_PATH;
        match claims.verification_status {
            // API calls stay open so onboarding documents can still be uploaded.
            Some(VerificationStatus::Pending) if !on_pending_page && !api => {
                Decision::Redirect(VERIFICATION_PENDING_PATH.to_string())
            }
            Some(VerificationStatus::Verified) if on_pending_page => {
                Decision::Redirect(claims.role.home_path().to_string())
            }
            _ => Decision::Allow(Some(claims)),
        }
    }
}

/// authorize
///
/// Axum middleware wrapping the whole router. Rewrites the request to its
/// canonical path, runs `Gateway::decide` on that path and either forwards the
/// request (with `SessionClaims` in its extensions) or answers directly.
pub async fn authorize(
    State(gateway): State<GatewayState>,
    mut request: Request,
    next: Next,
) -> Response {
    let path = canonical_path(request.uri().path());
    if path != request.uri().path() {
        match with_path(request.uri(), &path) {
            Ok(uri) => *request.uri_mut() = uri,
            Err(e) => {
                tracing::debug!(path = %path, error = ?e, "Canonical path is not a valid URI");
                return StatusCode::BAD_REQUEST.into_response();
            }
        }
    }

    let token = auth::session_token(request.headers(), gateway.cookie_name());

    let decision = gateway.decide(&path, token.as_deref()).await;
    tracing::debug!(path = %path, decision = decision.label(), "Gateway decision");

    match decision {
        Decision::Allow(claims) => {
            if let Some(claims) = claims {
                request.extensions_mut().insert(claims);
            }
            next.run(request).await
        }
        Decision::Redirect(location) => Redirect::temporary(&location).into_response(),
        Decision::Reject(error) => error.into_response(),
    }
}
