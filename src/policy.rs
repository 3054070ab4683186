use serde::Deserialize;
use std::{collections::BTreeMap, path::Path};

use crate::{errors::ConfigError, models::Role};

/// Prefixes owned by the gateway itself. Always public, whatever the policy says.
const GATEWAY_PREFIXES: [&str; 3] = ["/health", "/swagger-ui", "/api-docs"];

/// Posture for authenticated requests whose path matches no access rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Unmatched {
    #[default]
    Allow,
    Deny,
}

/// RouteRule
///
/// One entry of the route-access table: the prefix it governs and the roles it admits.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteRule {
    pub prefix: String,
    pub allowed: Vec<Role>,
}

impl RouteRule {
    pub fn permits(&self, role: Role) -> bool {
        self.allowed.contains(&role)
    }
}

/// AccessPolicy
///
/// The static route-access configuration consumed by the gateway. Built once at
/// startup and shared read-only across every request.
///
/// Rules are kept sorted by descending prefix length so the first structural match
/// is also the most specific one.
#[derive(Debug, Clone)]
pub struct AccessPolicy {
    rules: Vec<RouteRule>,
    public_ui_routes: Vec<String>,
    public_api_routes: Vec<String>,
    asset_prefixes: Vec<String>,
    unmatched: Unmatched,
}

/// On-disk TOML shape of a policy document.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct PolicyFile {
    #[serde(default)]
    public_ui_routes: Vec<String>,
    #[serde(default)]
    public_api_routes: Vec<String>,
    #[serde(default = "default_asset_prefixes")]
    asset_prefixes: Vec<String>,
    #[serde(default)]
    unmatched: Unmatched,
    #[serde(default)]
    routes: BTreeMap<String, Vec<String>>,
}

fn default_asset_prefixes() -> Vec<String> {
    vec!["/_next".to_string()]
}

/// True when `path` equals `prefix` or continues with a `/` right after it.
///
/// `/admin` covers `/admin` and `/admin/users` but not `/administrator`.
pub fn is_under(path: &str, prefix: &str) -> bool {
    match path.strip_prefix(prefix) {
        Some(rest) => rest.is_empty() || rest.starts_with('/'),
        None => false,
    }
}

/// Any path whose final segment carries an extension (`/logo.png`, `/robots.txt`).
fn has_file_extension(path: &str) -> bool {
    let last = path.rsplit('/').next().unwrap_or_default();
    match last.rfind('.') {
        Some(idx) => idx + 1 < last.len(),
        None => false,
    }
}

fn most_specific_first(mut rules: Vec<RouteRule>) -> Vec<RouteRule> {
    rules.sort_by(|a, b| b.prefix.len().cmp(&a.prefix.len()));
    rules
}

fn validate_prefix(prefix: &str) -> Result<(), ConfigError> {
    if prefix.starts_with('/') {
        Ok(())
    } else {
        Err(ConfigError::InvalidPrefix(prefix.to_string()))
    }
}

impl AccessPolicy {
    /// new
    ///
    /// Assembles a policy from already-typed parts. Rule order is irrelevant on input;
    /// the list is sorted here, once.
    pub fn new(
        rules: Vec<RouteRule>,
        public_ui_routes: Vec<String>,
        public_api_routes: Vec<String>,
        asset_prefixes: Vec<String>,
        unmatched: Unmatched,
    ) -> Result<Self, ConfigError> {
        for prefix in rules
            .iter()
            .map(|rule| rule.prefix.as_str())
            .chain(public_ui_routes.iter().map(String::as_str))
            .chain(public_api_routes.iter().map(String::as_str))
            .chain(asset_prefixes.iter().map(String::as_str))
        {
            validate_prefix(prefix)?;
        }

        Ok(Self {
            rules: most_specific_first(rules),
            public_ui_routes,
            public_api_routes,
            asset_prefixes,
            unmatched,
        })
    }

    /// from_toml_str
    ///
    /// Parses a policy document. Role names must be known roles; prefixes must be
    /// absolute paths.
    pub fn from_toml_str(source: &str) -> Result<Self, ConfigError> {
        let file: PolicyFile = toml::from_str(source)?;

        let rules = file
            .routes
            .into_iter()
            .map(|(prefix, names)| {
                let allowed = names
                    .iter()
                    .map(|name| name.parse::<Role>())
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(RouteRule { prefix, allowed })
            })
            .collect::<Result<Vec<_>, ConfigError>>()?;

        Self::new(
            rules,
            file.public_ui_routes,
            file.public_api_routes,
            file.asset_prefixes,
            file.unmatched,
        )
    }

    /// Reads and parses a policy file from disk.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let source = std::fs::read_to_string(path).map_err(|source| ConfigError::PolicyRead {
            path: path.to_path_buf(),
            source,
        })?;
        let policy = Self::from_toml_str(&source)?;
        tracing::info!(
            path = %path.display(),
            rules = policy.rules.len(),
            "Loaded access policy"
        );
        Ok(policy)
    }

    /// is_public
    ///
    /// Step one of the gateway: public UI/API routes, framework assets, the
    /// gateway's own endpoints and anything that looks like a static file.
    pub fn is_public(&self, path: &str) -> bool {
        has_file_extension(path)
            || GATEWAY_PREFIXES.iter().any(|prefix| is_under(path, prefix))
            || self
                .asset_prefixes
                .iter()
                .chain(&self.public_ui_routes)
                .chain(&self.public_api_routes)
                .any(|prefix| is_under(path, prefix))
    }

    /// Longest structural-prefix match against the route table.
    pub fn match_route(&self, path: &str) -> Option<&RouteRule> {
        self.rules.iter().find(|rule| is_under(path, &rule.prefix))
    }

    pub fn unmatched(&self) -> Unmatched {
        self.unmatched
    }

    pub fn rules(&self) -> &[RouteRule] {
        &self.rules
    }
}

fn rule(prefix: &str, allowed: &[Role]) -> RouteRule {
    RouteRule {
        prefix: prefix.to_string(),
        allowed: allowed.to_vec(),
    }
}

fn owned(routes: &[&str]) -> Vec<String> {
    routes.iter().map(|route| route.to_string()).collect()
}

impl Default for AccessPolicy {
    /// default
    ///
    /// The built-in marketplace table used when `ACCESS_POLICY_PATH` is not set.
    fn default() -> Self {
        use Role::*;

        let rules = vec![
            // Back-office
            rule("/admin", &[Admin]),
            rule("/api/admin", &[Admin]),
            rule("/api/admin/escrow", &[Admin, FinancialController]),
            rule("/api/admin/payouts", &[Admin, FinancialController]),
            rule("/api/admin/candidates", &[Admin, Tas, ComplianceOfficer]),
            rule("/api/admin/invitations", &[Admin, Tas]),
            // Talent acquisition
            rule("/tas", &[Tas, Admin]),
            rule("/api/tas", &[Tas, Admin]),
            // Company workspace
            rule("/dashboard/company", &[CompanyAdmin, CompanyMember]),
            rule("/dashboard/company/settings", &[CompanyAdmin]),
            rule("/api/company", &[CompanyAdmin, CompanyMember]),
            rule("/api/company/members", &[CompanyAdmin]),
            rule("/dashboard/finance", &[FinancialController, CompanyAdmin]),
            rule("/dashboard/compliance", &[ComplianceOfficer, CompanyAdmin]),
            rule("/dashboard/decision-maker", &[DecisionMaker, CompanyAdmin]),
            rule("/dashboard/interviewer", &[Interviewer, CompanyAdmin]),
            // Candidates
            rule("/candidate", &[Candidate]),
            rule("/api/candidate", &[Candidate]),
            // Operations and support
            rule("/operator", &[Operator, Admin]),
            rule("/api/operator", &[Operator, Admin]),
            rule("/support", &[Support, SupportAgent, Admin]),
            rule("/api/support", &[Support, SupportAgent, Admin]),
        ];

        let public_ui_routes = owned(&[
            "/",
            "/login",
            "/signup",
            "/forgot-password",
            "/reset-password",
            "/unauthorized",
            "/about",
            "/contact",
        ]);
        let public_api_routes = owned(&[
            "/api/auth/login",
            "/api/auth/signup",
            "/api/auth/logout",
            "/api/auth/forgot-password",
            "/api/auth/reset-password",
            "/api/public",
        ]);

        Self {
            rules: most_specific_first(rules),
            public_ui_routes,
            public_api_routes,
            asset_prefixes: default_asset_prefixes(),
            unmatched: Unmatched::Allow,
        }
    }
}
