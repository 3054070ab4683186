use std::{env, path::PathBuf};

use crate::{errors::ConfigError, policy::AccessPolicy};

const LOCAL_JWT_SECRET: &str = "super-secure-test-secret-value-local";

/// AppConfig
///
/// The gateway's runtime configuration, read once from the environment at startup
/// and immutable afterwards. Pulled into handlers via `FromRef`.
#[derive(Clone, Debug)]
pub struct AppConfig {
    // Runtime environment marker. Controls log format and secret strictness.
    pub env: Env,
    // HS256 secret shared with the marketplace's token issuer.
    pub jwt_secret: String,
    // Socket address the HTTP listener binds to.
    pub bind_addr: String,
    // Base URL of the marketplace application that allowed requests are forwarded to.
    pub upstream_url: Option<String>,
    // Optional TOML route-access policy. The built-in table is used when unset.
    pub policy_path: Option<PathBuf>,
    // Name of the cookie carrying the session token.
    pub session_cookie: String,
}

/// Env
///
/// Local development versus hardened production deployment.
#[derive(Clone, PartialEq, Debug)]
pub enum Env {
    Local,
    Production,
}

impl Default for AppConfig {
    /// Non-panicking configuration for tests and local scaffolding.
    fn default() -> Self {
        Self {
            env: Env::Local,
            jwt_secret: LOCAL_JWT_SECRET.to_string(),
            bind_addr: "0.0.0.0:3000".to_string(),
            upstream_url: None,
            policy_path: None,
            session_cookie: "token".to_string(),
        }
    }
}

fn non_empty_var(key: &str) -> Option<String> {
    env::var(key).ok().filter(|value| !value.trim().is_empty())
}

impl AppConfig {
    /// load
    ///
    /// Reads every setting from environment variables.
    ///
    /// # Errors
    /// Fails when `APP_ENV=production` and `JWT_SECRET` is not set: production must
    /// never fall back to the well-known local secret.
    pub fn load() -> Result<Self, ConfigError> {
        let env = match env::var("APP_ENV").as_deref() {
            Ok("production") => Env::Production,
            _ => Env::Local,
        };

        let jwt_secret = match (non_empty_var("JWT_SECRET"), &env) {
            (Some(secret), _) => secret,
            (None, Env::Production) => return Err(ConfigError::MissingVar("JWT_SECRET")),
            (None, Env::Local) => LOCAL_JWT_SECRET.to_string(),
        };

        let defaults = Self::default();

        Ok(Self {
            env,
            jwt_secret,
            bind_addr: non_empty_var("BIND_ADDR").unwrap_or(defaults.bind_addr),
            upstream_url: non_empty_var("UPSTREAM_URL")
                .map(|url| url.trim_end_matches('/').to_string()),
            policy_path: non_empty_var("ACCESS_POLICY_PATH").map(PathBuf::from),
            session_cookie: non_empty_var("SESSION_COOKIE").unwrap_or(defaults.session_cookie),
        })
    }

    /// Resolves the route-access policy: the configured file, or the built-in table.
    pub fn access_policy(&self) -> Result<AccessPolicy, ConfigError> {
        match &self.policy_path {
            Some(path) => AccessPolicy::load(path),
            None => Ok(AccessPolicy::default()),
        }
    }
}
