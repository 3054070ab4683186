use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};
use utoipa::ToSchema;

use crate::errors::ConfigError;

// --- Identity Schemas ---

/// Role
///
/// The closed set of marketplace roles carried in the session token.
/// Any role string outside this set deserializes to `Unrecognized`, which stays
/// authenticated but is never a member of an allowed-role set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Role {
    Admin,
    Tas,
    CompanyAdmin,
    CompanyMember,
    Candidate,
    FinancialController,
    ComplianceOfficer,
    DecisionMaker,
    Interviewer,
    Operator,
    Support,
    SupportAgent,
    #[serde(other)]
    Unrecognized,
}

impl Role {
    /// Every role an access rule may name.
    pub const KNOWN: [Role; 12] = [
        Role::Admin,
        Role::Tas,
        Role::CompanyAdmin,
        Role::CompanyMember,
        Role::Candidate,
        Role::FinancialController,
        Role::ComplianceOfficer,
        Role::DecisionMaker,
        Role::Interviewer,
        Role::Operator,
        Role::Support,
        Role::SupportAgent,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "ADMIN",
            Role::Tas => "TAS",
            Role::CompanyAdmin => "COMPANY_ADMIN",
            Role::CompanyMember => "COMPANY_MEMBER",
            Role::Candidate => "CANDIDATE",
            Role::FinancialController => "FINANCIAL_CONTROLLER",
            Role::ComplianceOfficer => "COMPLIANCE_OFFICER",
            Role::DecisionMaker => "DECISION_MAKER",
            Role::Interviewer => "INTERVIEWER",
            Role::Operator => "OPERATOR",
            Role::Support => "SUPPORT",
            Role::SupportAgent => "SUPPORT_AGENT",
            Role::Unrecognized => "UNRECOGNIZED",
        }
    }

    /// home_path
    ///
    /// The dashboard a verified user lands on when they revisit the
    /// verification-pending page. Roles without a dashboard go back to login.
    pub fn home_path(&self) -> &'static str {
        match self {
            Role::Admin => "/admin",
            Role::Tas => "/tas",
            Role::CompanyAdmin | Role::CompanyMember => "/dashboard/company",
            Role::Candidate => "/candidate",
            Role::FinancialController => "/dashboard/finance",
            Role::ComplianceOfficer => "/dashboard/compliance",
            Role::DecisionMaker => "/dashboard/decision-maker",
            Role::Interviewer => "/dashboard/interviewer",
            Role::Operator => "/operator",
            Role::Support => "/support",
            Role::SupportAgent | Role::Unrecognized => "/login",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Strict parsing used for policy files: unknown names are a configuration error,
/// unlike token claims where they fall back to `Unrecognized`.
impl FromStr for Role {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Role::KNOWN
            .iter()
            .copied()
            .find(|role| role.as_str() == s)
            .ok_or_else(|| ConfigError::UnknownRole(s.to_string()))
    }
}

/// VerificationStatus
///
/// Account onboarding state. Gates UI access independently of role permissions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum VerificationStatus {
    Pending,
    Verified,
    Rejected,
    #[serde(other)]
    Unrecognized,
}

/// SessionClaims
///
/// The canonical, already-verified view of a session token. The gateway builds this
/// once per request and hands it to downstream handlers as a request extension.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct SessionClaims {
    /// Token subject (user id), when the issuer sets one.
    pub subject: Option<String>,
    pub role: Role,
    /// `None` when the issuer omitted the status entirely.
    pub verification_status: Option<VerificationStatus>,
}
