//! Teams and team membership.
//!
//! Teams belong to an organization and are addressed by `(org, team)`, where
//! either part may be a name or a server id.

use reqwest::Method;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::account::Account;
use crate::client::{ensure_not_empty, null_as_empty, Api, MsrClient};
use crate::context::CallContext;
use crate::error::{Result, ResultExt};
use crate::ids::encode_resource_id;

/// A team as returned by the identity API.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Team {
    /// Server-assigned id.
    pub id: String,
    /// Team name.
    pub name: String,
    /// Description.
    pub description: String,
    /// Id of the owning organization.
    #[serde(rename = "orgID")]
    pub org_id: String,
    /// Number of members.
    pub members_count: u32,
}

impl Team {
    /// Composite id of this team (`orgID/id`).
    #[must_use]
    pub fn resource_id(&self) -> String {
        encode_resource_id(&self.org_id, &self.id)
    }
}

/// Payload for creating a team.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CreateTeam {
    /// Team name.
    pub name: String,
    /// Description.
    #[serde(skip_serializing_if = "String::is_empty")]
    pub description: String,
}

/// Payload for updating a team. Only the fields that are set are sent.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdateTeam {
    /// New name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// New description.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// One member of a team.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct TeamMember {
    /// Whether the member administers the team.
    pub is_admin: bool,
    /// The member account.
    pub member: Account,
}

impl TeamMember {
    /// Id of the member account.
    #[must_use]
    pub fn account_id(&self) -> &str {
        &self.member.id
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct MemberList {
    #[serde(deserialize_with = "null_as_empty")]
    members: Vec<TeamMember>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct MembershipBody {
    is_admin: bool,
}

impl MsrClient {
    /// Creates a team in `org`.
    ///
    /// # Errors
    ///
    /// Returns [`MsrError::EmptyInput`](crate::MsrError::EmptyInput) for a
    /// zero-value payload, otherwise any transport, API or decode error.
    pub async fn create_team(&self, ctx: &CallContext, org: &str, team: &CreateTeam) -> Result<Team> {
        ensure_not_empty(team, "CreateTeam").context_with(|| format!("creating team in {org}"))?;

        let url = self.endpoint(Api::Identity, &["accounts", org, "teams"]);
        let request = self
            .json_request(Method::POST, url, team)
            .context_with(|| format!("creating team {org}/{}", team.name))?;
        let created: Team = self
            .send_json(ctx, request)
            .await
            .context_with(|| format!("creating team {org}/{}", team.name))?;

        info!(team = %created.resource_id(), name = %created.name, "Created team");
        Ok(created)
    }

    /// Reads a team.
    ///
    /// # Errors
    ///
    /// Returns any transport, API or decode error.
    pub async fn read_team(&self, ctx: &CallContext, org: &str, team: &str) -> Result<Team> {
        let url = self.endpoint(Api::Identity, &["accounts", org, "teams", team]);
        self.send_json(ctx, self.request(Method::GET, url))
            .await
            .context_with(|| format!("reading team {org}/{team}"))
    }

    /// Updates a team.
    ///
    /// # Errors
    ///
    /// Returns [`MsrError::EmptyInput`](crate::MsrError::EmptyInput) if no
    /// field is set, otherwise any transport, API or decode error.
    pub async fn update_team(
        &self,
        ctx: &CallContext,
        org: &str,
        team: &str,
        update: &UpdateTeam,
    ) -> Result<Team> {
        ensure_not_empty(update, "UpdateTeam").context_with(|| format!("updating team {org}/{team}"))?;

        let url = self.endpoint(Api::Identity, &["accounts", org, "teams", team]);
        let request = self
            .json_request(Method::PATCH, url, update)
            .context_with(|| format!("updating team {org}/{team}"))?;
        self.send_json(ctx, request)
            .await
            .context_with(|| format!("updating team {org}/{team}"))
    }

    /// Deletes a team.
    ///
    /// # Errors
    ///
    /// Returns any transport or API error.
    pub async fn delete_team(&self, ctx: &CallContext, org: &str, team: &str) -> Result<()> {
        let url = self.endpoint(Api::Identity, &["accounts", org, "teams", team]);
        self.send(ctx, self.request(Method::DELETE, url))
            .await
            .context_with(|| format!("deleting team {org}/{team}"))?;

        info!(team = %encode_resource_id(org, team), "Deleted team");
        Ok(())
    }

    /// Lists the members of a team. An empty team gives an empty list.
    ///
    /// # Errors
    ///
    /// Returns any transport, API or decode error.
    pub async fn list_team_members(
        &self,
        ctx: &CallContext,
        org: &str,
        team: &str,
    ) -> Result<Vec<TeamMember>> {
        let url = self.endpoint(Api::Identity, &["accounts", org, "teams", team, "members"]);
        let list: MemberList = self
            .send_json(ctx, self.request(Method::GET, url))
            .await
            .context_with(|| format!("listing members of team {org}/{team}"))?;
        Ok(list.members)
    }

    /// Adds an account to a team, or changes its admin flag if it is
    /// already a member.
    ///
    /// # Errors
    ///
    /// Returns any transport or API error.
    pub async fn add_team_member(
        &self,
        ctx: &CallContext,
        org: &str,
        team: &str,
        account_id: &str,
        is_admin: bool,
    ) -> Result<()> {
        let url = self.endpoint(
            Api::Identity,
            &["accounts", org, "teams", team, "members", account_id],
        );
        let request = self
            .json_request(Method::PUT, url, &MembershipBody { is_admin })
            .context_with(|| format!("adding {account_id} to team {org}/{team}"))?;
        self.send(ctx, request)
            .await
            .context_with(|| format!("adding {account_id} to team {org}/{team}"))?;

        debug!(org, team, account_id, is_admin, "Added team member");
        Ok(())
    }

    /// Removes an account from a team.
    ///
    /// # Errors
    ///
    /// Returns any transport or API error.
    pub async fn remove_team_member(
        &self,
        ctx: &CallContext,
        org: &str,
        team: &str,
        account_id: &str,
    ) -> Result<()> {
        let url = self.endpoint(
            Api::Identity,
            &["accounts", org, "teams", team, "members", account_id],
        );
        self.send(ctx, self.request(Method::DELETE, url))
            .await
            .context_with(|| format!("removing {account_id} from team {org}/{team}"))?;

        debug!(org, team, account_id, "Removed team member");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_team_decodes_org_id() {
        let team: Team = serde_json::from_str(
            r#"{"id":"t1","name":"devs","orgID":"o1","membersCount":3,"description":""}"#,
        )
        .unwrap();
        assert_eq!(team.org_id, "o1");
        assert_eq!(team.members_count, 3);
        assert_eq!(team.resource_id(), "o1/t1");
    }

    #[test]
    fn test_member_list_decoding() {
        let list: MemberList = serde_json::from_str(
            r#"{"members":[{"isAdmin":true,"member":{"id":"a1","name":"alice"}}]}"#,
        )
        .unwrap();
        assert_eq!(list.members.len(), 1);
        assert_eq!(list.members[0].account_id(), "a1");
        assert!(list.members[0].is_admin);

        let empty: MemberList = serde_json::from_str("{}").unwrap();
        assert!(empty.members.is_empty());

        let null: MemberList = serde_json::from_str(r#"{"members":null}"#).unwrap();
        assert!(null.members.is_empty());
    }

    #[test]
    fn test_membership_body() {
        let json = serde_json::to_string(&MembershipBody { is_admin: false }).unwrap();
        assert_eq!(json, r#"{"isAdmin":false}"#);
    }

    #[tokio::test]
    async fn test_create_team_rejects_zero_value() {
        let client = MsrClient::new("http://127.0.0.1:9", "admin", "pw").unwrap();
        let err = client
            .create_team(&CallContext::background(), "acme", &CreateTeam::default())
            .await
            .unwrap_err();
        assert_eq!(err.kind(), crate::ErrorKind::EmptyInput);
    }
}
