//! Router Module Index
//!
//! The gateway's own endpoints. Access control is not applied here: every route,
//! including the forwarding fallback, sits behind the `gateway::authorize` layer
//! which decides per path whether authentication is required.

/// Internal endpoints under always-public prefixes (probes).
pub mod public;

/// Endpoints that rely on the gateway having verified a session.
pub mod authenticated;
