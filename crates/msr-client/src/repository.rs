//! Repositories under an organization namespace.

use std::fmt;

use reqwest::Method;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::client::{ensure_not_empty, Api, MsrClient};
use crate::context::CallContext;
use crate::error::{Result, ResultExt};
use crate::ids::{decode_resource_id, encode_resource_id};

/// Who can pull from a repository.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Visibility {
    /// Anyone with access to the registry.
    #[default]
    Public,
    /// Organization members only.
    Private,
}

impl fmt::Display for Visibility {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Public => "public",
            Self::Private => "private",
        })
    }
}

/// A repository as returned by the registry API.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Repository {
    /// Server-assigned id.
    pub id: String,
    /// Repository name.
    pub name: String,
    /// Owning organization or user name.
    pub namespace: String,
    /// `organization` or `user`.
    pub namespace_type: String,
    /// One-line description.
    pub short_description: String,
    /// Markdown description.
    pub long_description: String,
    /// Whether tags can be overwritten.
    pub immutable_tags: bool,
    /// Whether images are scanned on push.
    pub scan_on_push: bool,
    /// Maximum number of tags, 0 for unlimited.
    pub tag_limit: u32,
    /// Visibility.
    pub visibility: Visibility,
    /// Pull count.
    pub pulls: u64,
    /// Push count.
    pub pushes: u64,
}

impl Repository {
    /// Composite id of this repository (`namespace/name`).
    #[must_use]
    pub fn resource_id(&self) -> String {
        encode_resource_id(&self.namespace, &self.name)
    }
}

/// Payload for creating a repository.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct CreateRepository {
    /// Repository name.
    pub name: String,
    /// One-line description.
    pub short_description: String,
    /// Markdown description.
    pub long_description: String,
    /// Whether tags can be overwritten.
    pub immutable_tags: bool,
    /// Whether images are scanned on push.
    pub scan_on_push: bool,
    /// Maximum number of tags, 0 for unlimited.
    pub tag_limit: u32,
    /// Visibility.
    pub visibility: Visibility,
}

impl CreateRepository {
    /// A public repository with default settings.
    #[must_use]
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }
}

/// Payload for updating a repository. Only the fields that are set are sent.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateRepository {
    /// New one-line description.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub short_description: Option<String>,
    /// New Markdown description.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub long_description: Option<String>,
    /// New immutable-tags flag.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub immutable_tags: Option<bool>,
    /// New scan-on-push flag.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scan_on_push: Option<bool>,
    /// New tag limit.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tag_limit: Option<u32>,
    /// New visibility.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub visibility: Option<Visibility>,
}

impl MsrClient {
    /// Creates a repository in `org`.
    ///
    /// # Errors
    ///
    /// Returns [`MsrError::EmptyInput`](crate::MsrError::EmptyInput) for a
    /// zero-value payload, otherwise any transport, API or decode error.
    pub async fn create_repository(
        &self,
        ctx: &CallContext,
        org: &str,
        repo: &CreateRepository,
    ) -> Result<Repository> {
        ensure_not_empty(repo, "CreateRepository")
            .context_with(|| format!("creating repository in {org}"))?;

        let url = self.endpoint(Api::Registry, &["repositories", org]);
        let request = self
            .json_request(Method::POST, url, repo)
            .context_with(|| format!("creating repository {org}/{}", repo.name))?;
        let created: Repository = self
            .send_json(ctx, request)
            .await
            .context_with(|| format!("creating repository {org}/{}", repo.name))?;

        info!(repository = %created.resource_id(), "Created repository");
        Ok(created)
    }

    /// Reads a repository.
    ///
    /// # Errors
    ///
    /// Returns any transport, API or decode error.
    pub async fn read_repository(&self, ctx: &CallContext, org: &str, repo: &str) -> Result<Repository> {
        let url = self.endpoint(Api::Registry, &["repositories", org, repo]);
        self.send_json(ctx, self.request(Method::GET, url))
            .await
            .context_with(|| format!("reading repository {org}/{repo}"))
    }

    /// Reads a repository by composite id (`org/repo`).
    ///
    /// # Errors
    ///
    /// Returns [`MsrError::InvalidResourceId`](crate::MsrError::InvalidResourceId)
    /// for a malformed id, otherwise as [`MsrClient::read_repository`].
    pub async fn read_repository_by_id(&self, ctx: &CallContext, id: &str) -> Result<Repository> {
        let (org, repo) =
            decode_resource_id(id).context_with(|| format!("reading repository {id}"))?;
        self.read_repository(ctx, org, repo).await
    }

    /// Updates a repository.
    ///
    /// # Errors
    ///
    /// Returns [`MsrError::EmptyInput`](crate::MsrError::EmptyInput) if no
    /// field is set, otherwise any transport, API or decode error.
    pub async fn update_repository(
        &self,
        ctx: &CallContext,
        org: &str,
        repo: &str,
        update: &UpdateRepository,
    ) -> Result<Repository> {
        ensure_not_empty(update, "UpdateRepository")
            .context_with(|| format!("updating repository {org}/{repo}"))?;

        let url = self.endpoint(Api::Registry, &["repositories", org, repo]);
        let request = self
            .json_request(Method::PATCH, url, update)
            .context_with(|| format!("updating repository {org}/{repo}"))?;
        self.send_json(ctx, request)
            .await
            .context_with(|| format!("updating repository {org}/{repo}"))
    }

    /// Deletes a repository.
    ///
    /// # Errors
    ///
    /// Returns any transport or API error.
    pub async fn delete_repository(&self, ctx: &CallContext, org: &str, repo: &str) -> Result<()> {
        let url = self.endpoint(Api::Registry, &["repositories", org, repo]);
        self.send(ctx, self.request(Method::DELETE, url))
            .await
            .context_with(|| format!("deleting repository {org}/{repo}"))?;

        info!(repository = %encode_resource_id(org, repo), "Deleted repository");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_repository_resource_id() {
        let repo = Repository {
            name: "web".to_string(),
            namespace: "acme".to_string(),
            ..Repository::default()
        };
        assert_eq!(repo.resource_id(), "acme/web");
        assert_eq!(decode_resource_id(&repo.resource_id()).unwrap(), ("acme", "web"));
    }

    #[test]
    fn test_visibility_wire_format() {
        assert_eq!(serde_json::to_value(Visibility::Private).unwrap(), "private");
        let v: Visibility = serde_json::from_str("\"public\"").unwrap();
        assert_eq!(v, Visibility::Public);
        assert!(serde_json::from_str::<Visibility>("\"secret\"").is_err());
    }

    #[test]
    fn test_create_repository_body() {
        let repo = CreateRepository {
            visibility: Visibility::Private,
            tag_limit: 10,
            ..CreateRepository::named("web")
        };
        let json = serde_json::to_value(&repo).unwrap();
        assert_eq!(json["name"], "web");
        assert_eq!(json["visibility"], "private");
        assert_eq!(json["tagLimit"], 10);
        assert_eq!(json["scanOnPush"], false);
    }

    #[test]
    fn test_update_repository_sends_only_set_fields() {
        let update = UpdateRepository {
            scan_on_push: Some(true),
            ..UpdateRepository::default()
        };
        assert_eq!(
            serde_json::to_value(&update).unwrap(),
            serde_json::json!({"scanOnPush": true})
        );
    }

    #[tokio::test]
    async fn test_read_by_malformed_id_fails_before_network() {
        let client = MsrClient::new("http://127.0.0.1:9", "admin", "pw").unwrap();
        let err = client
            .read_repository_by_id(&CallContext::background(), "acme")
            .await
            .unwrap_err();
        assert_eq!(err.kind(), crate::ErrorKind::InvalidResourceId);
        assert!(err.to_string().starts_with("reading repository acme"));
    }
}
