//! Wire shapes served and accepted by the mock.

use serde::{Deserialize, Serialize};

/// Account as served by `/enzi/v0/accounts`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Account {
    /// Server id.
    pub id: String,
    /// Account name.
    pub name: String,
    /// Display name.
    pub full_name: String,
    /// Can log in.
    pub is_active: bool,
    /// System administrator.
    pub is_admin: bool,
    /// Organization.
    pub is_org: bool,
    /// Imported from LDAP.
    pub is_imported: bool,
    /// Created on first LDAP login.
    pub on_demand: bool,
    /// Two-factor enabled.
    pub otp_enabled: bool,
    /// Members across the organization's teams.
    pub members_count: u32,
    /// Teams of the organization.
    pub teams_count: u32,
}

/// Body of `POST /enzi/v0/accounts`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct NewAccount {
    /// Account name.
    pub name: String,
    /// Password.
    pub password: String,
    /// Display name.
    pub full_name: String,
    /// Can log in.
    pub is_active: bool,
    /// System administrator.
    pub is_admin: bool,
    /// Organization.
    pub is_org: bool,
    /// Look up in LDAP.
    #[serde(rename = "searchLDAP")]
    pub search_ldap: bool,
}

/// Body of `PATCH /enzi/v0/accounts/:account`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct AccountPatch {
    /// New display name.
    pub full_name: Option<String>,
    /// New active flag.
    pub is_active: Option<bool>,
    /// New admin flag.
    pub is_admin: Option<bool>,
}

/// Body of `GET /enzi/v0/accounts`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountPage {
    /// Users in the page.
    pub users_count: u32,
    /// Organizations in the page.
    pub orgs_count: u32,
    /// Accounts in the page.
    pub resource_count: u32,
    /// Start of the next page; always empty, the mock serves one page.
    pub next_page_start: String,
    /// The accounts.
    pub accounts: Vec<Account>,
}

/// Team as served by the identity API.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Team {
    /// Server id.
    pub id: String,
    /// Team name.
    pub name: String,
    /// Description.
    pub description: String,
    /// Owning organization id.
    #[serde(rename = "orgID")]
    pub org_id: String,
    /// Member count.
    pub members_count: u32,
}

/// Body of team create and update requests.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct TeamPatch {
    /// Name.
    pub name: Option<String>,
    /// Description.
    pub description: Option<String>,
}

/// Entry of a member listing.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Member {
    /// Team admin.
    pub is_admin: bool,
    /// The account.
    pub member: Account,
}

/// Body of `GET .../members`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MemberPage {
    /// Members in insertion order.
    pub members: Vec<Member>,
}

/// Body of `PUT .../members/:member`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct MembershipOptions {
    /// Team admin.
    pub is_admin: bool,
}

/// Repository as served by the registry API.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Repository {
    /// Server id.
    pub id: String,
    /// Repository name.
    pub name: String,
    /// Owning account name.
    pub namespace: String,
    /// `organization` or `user`.
    pub namespace_type: String,
    /// One-line description.
    pub short_description: String,
    /// Markdown description.
    pub long_description: String,
    /// Tags cannot be overwritten.
    pub immutable_tags: bool,
    /// Scan on push.
    pub scan_on_push: bool,
    /// Tag limit.
    pub tag_limit: u32,
    /// `public` or `private`.
    pub visibility: String,
    /// Pull count.
    pub pulls: u64,
    /// Push count.
    pub pushes: u64,
}

/// Body of repository create and update requests.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct RepositoryPatch {
    /// Name; required on create, ignored on update.
    pub name: Option<String>,
    /// One-line description.
    pub short_description: Option<String>,
    /// Markdown description.
    pub long_description: Option<String>,
    /// Tags cannot be overwritten.
    pub immutable_tags: Option<bool>,
    /// Scan on push.
    pub scan_on_push: Option<bool>,
    /// Tag limit.
    pub tag_limit: Option<u32>,
    /// `public` or `private`.
    pub visibility: Option<String>,
}

/// Pruning rule.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Rule {
    /// Field.
    pub field: String,
    /// Operator.
    pub operator: String,
    /// Values.
    pub values: Vec<String>,
}

/// Pruning policy.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PruningPolicy {
    /// Server id.
    pub id: String,
    /// Enabled.
    pub enabled: bool,
    /// Rules.
    pub rules: Vec<Rule>,
}

/// Body of pruning policy create and replace requests.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct PolicyBody {
    /// Enabled.
    pub enabled: bool,
    /// Rules.
    pub rules: Vec<Rule>,
}

/// Body of `GET /health`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Health {
    /// Error text.
    pub error: String,
    /// Ready.
    pub healthy: bool,
}

/// Body of `GET /api/v0/admin/version`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Version {
    /// Version string.
    pub version: String,
}
