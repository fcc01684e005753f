//! Tag pruning policies of a repository.
//!
//! Creating or updating a policy asks the server to evaluate it right away
//! (`initialEvaluation=true`), which is why the default client timeout is
//! long.

use reqwest::Method;
use serde::{Deserialize, Serialize};
use tracing::info;
use url::Url;

use crate::client::{ensure_not_empty, null_as_empty, Api, MsrClient};
use crate::context::CallContext;
use crate::error::{Result, ResultExt};

/// One rule of a pruning policy, e.g. `tag matches ["^dev-"]`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(default)]
pub struct PruningPolicyRule {
    /// Field the rule inspects, e.g. `tag` or `vulnerability_all`.
    pub field: String,
    /// Comparison operator, e.g. `matches` or `gte`.
    pub operator: String,
    /// Values compared against.
    #[serde(deserialize_with = "null_as_empty")]
    pub values: Vec<String>,
}

impl PruningPolicyRule {
    /// Creates a rule.
    #[must_use]
    pub fn new<I, S>(field: impl Into<String>, operator: impl Into<String>, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            field: field.into(),
            operator: operator.into(),
            values: values.into_iter().map(Into::into).collect(),
        }
    }
}

/// A pruning policy as returned by the registry API.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PruningPolicy {
    /// Server-assigned id.
    pub id: String,
    /// Whether the policy runs.
    pub enabled: bool,
    /// Rules; a tag is pruned when it matches all of them.
    #[serde(deserialize_with = "null_as_empty")]
    pub rules: Vec<PruningPolicyRule>,
}

/// Payload for creating or replacing a pruning policy.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CreatePruningPolicy {
    /// Whether the policy runs.
    pub enabled: bool,
    /// Rules.
    pub rules: Vec<PruningPolicyRule>,
}

impl MsrClient {
    fn pruning_url(&self, org: &str, repo: &str, policy: Option<&str>, evaluate: bool) -> Url {
        let mut segments = vec!["repositories", org, repo, "pruningPolicies"];
        segments.extend(policy);
        let mut url = self.endpoint(Api::Registry, &segments);
        if evaluate {
            url.query_pairs_mut().append_pair("initialEvaluation", "true");
        }
        url
    }

    /// Creates a pruning policy without checking for duplicates.
    ///
    /// See [`MsrClient::ensure_pruning_policy`] for the create-if-absent form.
    ///
    /// # Errors
    ///
    /// Returns [`MsrError::EmptyInput`](crate::MsrError::EmptyInput) for a
    /// zero-value payload, otherwise any transport, API or decode error.
    pub async fn create_pruning_policy(
        &self,
        ctx: &CallContext,
        org: &str,
        repo: &str,
        policy: &CreatePruningPolicy,
    ) -> Result<PruningPolicy> {
        ensure_not_empty(policy, "CreatePruningPolicy")
            .context_with(|| format!("creating pruning policy for {org}/{repo}"))?;

        let url = self.pruning_url(org, repo, None, true);
        let request = self
            .json_request(Method::POST, url, policy)
            .context_with(|| format!("creating pruning policy for {org}/{repo}"))?;
        let created: PruningPolicy = self
            .send_json(ctx, request)
            .await
            .context_with(|| format!("creating pruning policy for {org}/{repo}"))?;

        info!(org, repo, id = %created.id, rules = created.rules.len(), "Created pruning policy");
        Ok(created)
    }

    /// Reads one pruning policy.
    ///
    /// # Errors
    ///
    /// Returns any transport, API or decode error.
    pub async fn read_pruning_policy(
        &self,
        ctx: &CallContext,
        org: &str,
        repo: &str,
        id: &str,
    ) -> Result<PruningPolicy> {
        let url = self.pruning_url(org, repo, Some(id), false);
        self.send_json(ctx, self.request(Method::GET, url))
            .await
            .context_with(|| format!("reading pruning policy {id} for {org}/{repo}"))
    }

    /// Lists the pruning policies of a repository.
    ///
    /// # Errors
    ///
    /// Returns any transport, API or decode error.
    pub async fn list_pruning_policies(
        &self,
        ctx: &CallContext,
        org: &str,
        repo: &str,
    ) -> Result<Vec<PruningPolicy>> {
        let url = self.pruning_url(org, repo, None, false);
        let policies: Option<Vec<PruningPolicy>> = self
            .send_json(ctx, self.request(Method::GET, url))
            .await
            .context_with(|| format!("listing pruning policies for {org}/{repo}"))?;
        Ok(policies.unwrap_or_default())
    }

    /// Replaces a pruning policy.
    ///
    /// # Errors
    ///
    /// Returns [`MsrError::EmptyInput`](crate::MsrError::EmptyInput) for a
    /// zero-value payload, otherwise any transport, API or decode error.
    pub async fn update_pruning_policy(
        &self,
        ctx: &CallContext,
        org: &str,
        repo: &str,
        id: &str,
        policy: &CreatePruningPolicy,
    ) -> Result<PruningPolicy> {
        ensure_not_empty(policy, "CreatePruningPolicy")
            .context_with(|| format!("updating pruning policy {id} for {org}/{repo}"))?;

        let url = self.pruning_url(org, repo, Some(id), true);
        let request = self
            .json_request(Method::PUT, url, policy)
            .context_with(|| format!("updating pruning policy {id} for {org}/{repo}"))?;
        self.send_json(ctx, request)
            .await
            .context_with(|| format!("updating pruning policy {id} for {org}/{repo}"))
    }

    /// Deletes a pruning policy.
    ///
    /// # Errors
    ///
    /// Returns any transport or API error.
    pub async fn delete_pruning_policy(
        &self,
        ctx: &CallContext,
        org: &str,
        repo: &str,
        id: &str,
    ) -> Result<()> {
        let url = self.pruning_url(org, repo, Some(id), false);
        self.send(ctx, self.request(Method::DELETE, url))
            .await
            .context_with(|| format!("deleting pruning policy {id} for {org}/{repo}"))?;

        info!(org, repo, id, "Deleted pruning policy");
        Ok(())
    }
}
