//! Accounts: users and organizations.
//!
//! An organization is an account with `isOrg` set. Account endpoints accept
//! either the server-assigned id or the account name as the key.

use std::fmt;

use reqwest::Method;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::client::{ensure_not_empty, null_as_empty, Api, MsrClient};
use crate::context::CallContext;
use crate::error::{Result, ResultExt};

/// An MSR account as returned by the identity API.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Account {
    /// Server-assigned id.
    pub id: String,
    /// Account name.
    pub name: String,
    /// Display name.
    pub full_name: String,
    /// Whether the account can log in.
    pub is_active: bool,
    /// Whether the account is a system administrator.
    pub is_admin: bool,
    /// Whether the account is an organization.
    pub is_org: bool,
    /// Whether the account was imported from LDAP.
    pub is_imported: bool,
    /// Whether the account was created on first LDAP login.
    pub on_demand: bool,
    /// Whether two-factor authentication is enabled.
    pub otp_enabled: bool,
    /// Number of members (organizations only).
    pub members_count: u32,
    /// Number of teams (organizations only).
    pub teams_count: u32,
}

/// Payload for creating an account.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateAccount {
    /// Account name.
    pub name: String,
    /// Initial password (users only).
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub password: String,
    /// Display name.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub full_name: String,
    /// Whether the account can log in.
    #[serde(default, skip_serializing_if = "is_false")]
    pub is_active: bool,
    /// Whether the account is a system administrator.
    #[serde(default, skip_serializing_if = "is_false")]
    pub is_admin: bool,
    /// Whether the account is an organization.
    #[serde(default, skip_serializing_if = "is_false")]
    pub is_org: bool,
    /// Whether to look the user up in LDAP instead of creating it locally.
    #[serde(default, rename = "searchLDAP", skip_serializing_if = "is_false")]
    pub search_ldap: bool,
}

impl CreateAccount {
    /// An active user with the given password.
    ///
    /// # Examples
    ///
    /// ```
    /// use msr_client::CreateAccount;
    ///
    /// let user = CreateAccount::user("alice", "s3cret!");
    /// assert!(user.is_active);
    /// assert!(!user.is_org);
    /// ```
    #[must_use]
    pub fn user(name: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            password: password.into(),
            is_active: true,
            ..Self::default()
        }
    }

    /// An organization.
    #[must_use]
    pub fn organization(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            is_org: true,
            ..Self::default()
        }
    }
}

/// Payload for updating an account. Only the fields that are set are sent.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateAccount {
    /// New display name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub full_name: Option<String>,
    /// New active flag.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_active: Option<bool>,
    /// New administrator flag.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_admin: Option<bool>,
}

/// Which accounts a bulk read returns.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum AccountFilter {
    /// Users only.
    Users,
    /// Organizations only.
    Orgs,
    /// Administrators only.
    Admins,
    /// Non-administrator users only.
    NonAdmins,
    /// Active users only.
    ActiveUsers,
    /// Every account.
    #[default]
    All,
}

impl AccountFilter {
    /// Normalizes a filter name.
    ///
    /// Names outside the supported set fall back to [`AccountFilter::All`]
    /// instead of failing.
    ///
    /// # Examples
    ///
    /// ```
    /// use msr_client::AccountFilter;
    ///
    /// assert_eq!(AccountFilter::parse("orgs"), AccountFilter::Orgs);
    /// assert_eq!(AccountFilter::parse("inactive-users"), AccountFilter::All);
    /// ```
    #[must_use]
    pub fn parse(raw: &str) -> Self {
        match raw {
            "users" => Self::Users,
            "orgs" => Self::Orgs,
            "admins" => Self::Admins,
            "non-admins" => Self::NonAdmins,
            "active-users" => Self::ActiveUsers,
            _ => Self::All,
        }
    }

    /// The value sent as the `filter` query parameter.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Users => "users",
            Self::Orgs => "orgs",
            Self::Admins => "admins",
            Self::NonAdmins => "non-admins",
            Self::ActiveUsers => "active-users",
            Self::All => "all",
        }
    }
}

impl fmt::Display for AccountFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<&str> for AccountFilter {
    fn from(raw: &str) -> Self {
        Self::parse(raw)
    }
}

/// One page of a bulk account read.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct AccountPage {
    #[serde(deserialize_with = "null_as_empty")]
    accounts: Vec<Account>,
}

#[allow(clippy::trivially_copy_pass_by_ref)]
const fn is_false(value: &bool) -> bool {
    !*value
}

impl MsrClient {
    /// Creates an account.
    ///
    /// # Errors
    ///
    /// Returns [`MsrError::EmptyInput`](crate::MsrError::EmptyInput) without
    /// sending anything if `account` is the zero value, otherwise any
    /// transport or API error.
    pub async fn create_account(&self, ctx: &CallContext, account: &CreateAccount) -> Result<Account> {
        ensure_not_empty(account, "CreateAccount").context_with(|| "creating account")?;

        let url = self.endpoint(Api::Identity, &["accounts"]);
        let request = self
            .json_request(Method::POST, url, account)
            .context_with(|| format!("creating account {}", account.name))?;
        let created: Account = self
            .send_json(ctx, request)
            .await
            .context_with(|| format!("creating account {}", account.name))?;

        info!(name = %created.name, id = %created.id, is_org = created.is_org, "Created account");
        Ok(created)
    }

    /// Creates an organization.
    ///
    /// # Errors
    ///
    /// Same as [`MsrClient::create_account`].
    pub async fn create_organization(&self, ctx: &CallContext, name: &str) -> Result<Account> {
        self.create_account(ctx, &CreateAccount::organization(name)).await
    }

    /// Reads an account by id or name.
    ///
    /// # Errors
    ///
    /// Returns any transport, API or decode error. A missing account is an
    /// [`MsrError::Api`](crate::MsrError::Api) with status 404.
    pub async fn read_account(&self, ctx: &CallContext, id: &str) -> Result<Account> {
        let url = self.endpoint(Api::Identity, &["accounts", id]);
        self.send_json(ctx, self.request(Method::GET, url))
            .await
            .context_with(|| format!("reading account {id}"))
    }

    /// Updates an account by id or name.
    ///
    /// # Errors
    ///
    /// Returns [`MsrError::EmptyInput`](crate::MsrError::EmptyInput) if no
    /// field is set, otherwise any transport, API or decode error.
    pub async fn update_account(
        &self,
        ctx: &CallContext,
        id: &str,
        update: &UpdateAccount,
    ) -> Result<Account> {
        ensure_not_empty(update, "UpdateAccount").context_with(|| format!("updating account {id}"))?;

        let url = self.endpoint(Api::Identity, &["accounts", id]);
        let request = self
            .json_request(Method::PATCH, url, update)
            .context_with(|| format!("updating account {id}"))?;
        self.send_json(ctx, request)
            .await
            .context_with(|| format!("updating account {id}"))
    }

    /// Deletes an account by id or name.
    ///
    /// # Errors
    ///
    /// Returns any transport or API error.
    pub async fn delete_account(&self, ctx: &CallContext, id: &str) -> Result<()> {
        let url = self.endpoint(Api::Identity, &["accounts", id]);
        self.send(ctx, self.request(Method::DELETE, url))
            .await
            .context_with(|| format!("deleting account {id}"))?;

        info!(id, "Deleted account");
        Ok(())
    }

    /// Reads the first page of accounts matching `filter`.
    ///
    /// # Errors
    ///
    /// Returns any transport, API or decode error.
    pub async fn read_accounts(&self, ctx: &CallContext, filter: AccountFilter) -> Result<Vec<Account>> {
        let mut url = self.endpoint(Api::Identity, &["accounts"]);
        url.query_pairs_mut().append_pair("filter", filter.as_str());

        let page: AccountPage = self
            .send_json(ctx, self.request(Method::GET, url))
            .await
            .context_with(|| format!("reading accounts in bulk '{filter}'"))?;
        Ok(page.accounts)
    }
}
