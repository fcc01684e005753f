//! In-memory registry contents and the mock's shared state.

use std::sync::Arc;
use std::time::Duration;

use base64::Engine as _;
use parking_lot::{Mutex, MutexGuard};
use uuid::Uuid;

use crate::error::MockError;
use crate::model::{
    Account, AccountPage, AccountPatch, Health, Member, MemberPage, NewAccount, PolicyBody,
    PruningPolicy, Repository, RepositoryPatch, Team, TeamPatch,
};

/// Result type for registry operations.
pub type Result<T> = std::result::Result<T, MockError>;

/// Mock server settings.
#[derive(Debug, Clone)]
pub struct MockConfig {
    /// Accepted username.
    pub username: String,
    /// Accepted password.
    pub password: String,
    /// Version reported by `/api/v0/admin/version`.
    pub version: String,
}

impl Default for MockConfig {
    fn default() -> Self {
        Self {
            username: "admin".to_string(),
            password: "password".to_string(),
            version: "3.1.0".to_string(),
        }
    }
}

/// A request as the mock received it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedRequest {
    /// HTTP method, upper case.
    pub method: String,
    /// Path without query.
    pub path: String,
    /// Raw query string, if any.
    pub query: Option<String>,
    /// Body as text.
    pub body: String,
}

/// A canned response served once instead of the real handler.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fault {
    /// Method to intercept.
    pub method: String,
    /// Exact path to intercept.
    pub path: String,
    /// Status to answer with.
    pub status: u16,
    /// Raw body to answer with.
    pub body: String,
    /// How long to hold the response back.
    pub delay: Option<Duration>,
}

impl Fault {
    /// Creates a fault for `method path`.
    pub fn new(method: &str, path: impl Into<String>, status: u16, body: impl Into<String>) -> Self {
        Self {
            method: method.to_uppercase(),
            path: path.into(),
            status,
            body: body.into(),
            delay: None,
        }
    }

    /// Holds the response back for `delay` before answering.
    #[must_use]
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }
}

#[derive(Debug, Clone)]
struct StoredAccount {
    account: Account,
}

#[derive(Debug, Clone)]
struct StoredTeam {
    team: Team,
    members: Vec<(String, bool)>,
}

#[derive(Debug, Clone)]
struct StoredRepository {
    repository: Repository,
    policies: Vec<PruningPolicy>,
}

/// Registry contents.
#[derive(Debug)]
pub struct Registry {
    accounts: Vec<StoredAccount>,
    teams: Vec<StoredTeam>,
    repositories: Vec<StoredRepository>,
    health: Health,
    version: String,
}

fn new_id() -> String {
    Uuid::new_v4().to_string()
}

impl Registry {
    /// Creates an empty, healthy registry.
    pub fn new(version: impl Into<String>) -> Self {
        Self {
            accounts: Vec::new(),
            teams: Vec::new(),
            repositories: Vec::new(),
            health: Health {
                error: String::new(),
                healthy: true,
            },
            version: version.into(),
        }
    }

    /// Health probe answer.
    pub fn health(&self) -> Health {
        self.health.clone()
    }

    /// Changes the health probe answer.
    pub fn set_health(&mut self, healthy: bool, error: impl Into<String>) {
        self.health = Health {
            error: error.into(),
            healthy,
        };
    }

    /// Reported version.
    pub fn version(&self) -> &str {
        &self.version
    }

    // Accounts

    fn account_index(&self, key: &str) -> Result<usize> {
        self.accounts
            .iter()
            .position(|a| a.account.id == key || a.account.name == key)
            .ok_or_else(|| MockError::not_found("account", key))
    }

    fn org_index(&self, key: &str) -> Result<usize> {
        let idx = self.account_index(key)?;
        if self.accounts[idx].account.is_org {
            Ok(idx)
        } else {
            Err(MockError::not_found("organization", key))
        }
    }

    fn render_account(&self, stored: &StoredAccount) -> Account {
        let mut account = stored.account.clone();
        if account.is_org {
            let teams: Vec<&StoredTeam> = self
                .teams
                .iter()
                .filter(|t| t.team.org_id == account.id)
                .collect();
            let mut members: Vec<&str> = teams
                .iter()
                .flat_map(|t| t.members.iter().map(|(id, _)| id.as_str()))
                .collect();
            members.sort_unstable();
            members.dedup();
            account.teams_count = u32::try_from(teams.len()).unwrap_or(u32::MAX);
            account.members_count = u32::try_from(members.len()).unwrap_or(u32::MAX);
        }
        account
    }

    /// Creates a user or organization.
    pub fn create_account(&mut self, input: NewAccount) -> Result<Account> {
        if input.name.is_empty() {
            return Err(MockError::BadRequest("account name is required".to_string()));
        }
        if self.accounts.iter().any(|a| a.account.name == input.name) {
            return Err(MockError::conflict("account", input.name));
        }

        let account = Account {
            id: new_id(),
            name: input.name,
            full_name: input.full_name,
            is_active: input.is_active && !input.is_org,
            is_admin: input.is_admin && !input.is_org,
            is_org: input.is_org,
            is_imported: input.search_ldap,
            ..Account::default()
        };
        self.accounts.push(StoredAccount {
            account: account.clone(),
        });
        Ok(account)
    }

    /// Creates an active user.
    pub fn add_user(&mut self, name: &str) -> Result<Account> {
        self.create_account(NewAccount {
            name: name.to_string(),
            password: "password".to_string(),
            is_active: true,
            ..NewAccount::default()
        })
    }

    /// Creates an organization.
    pub fn add_organization(&mut self, name: &str) -> Result<Account> {
        self.create_account(NewAccount {
            name: name.to_string(),
            is_org: true,
            ..NewAccount::default()
        })
    }

    /// Reads an account by id or name.
    pub fn account(&self, key: &str) -> Result<Account> {
        let idx = self.account_index(key)?;
        Ok(self.render_account(&self.accounts[idx]))
    }

    /// Updates an account.
    pub fn update_account(&mut self, key: &str, patch: AccountPatch) -> Result<Account> {
        let idx = self.account_index(key)?;
        let account = &mut self.accounts[idx].account;
        if let Some(full_name) = patch.full_name {
            account.full_name = full_name;
        }
        if let Some(is_active) = patch.is_active {
            account.is_active = is_active;
        }
        if let Some(is_admin) = patch.is_admin {
            account.is_admin = is_admin;
        }
        Ok(self.render_account(&self.accounts[idx]))
    }

    /// Deletes an account with its teams, repositories and memberships.
    pub fn delete_account(&mut self, key: &str) -> Result<()> {
        let idx = self.account_index(key)?;
        let removed = self.accounts.remove(idx).account;
        self.teams.retain(|t| t.team.org_id != removed.id);
        for team in &mut self.teams {
            team.members.retain(|(id, _)| *id != removed.id);
        }
        self.repositories
            .retain(|r| r.repository.namespace != removed.name);
        Ok(())
    }

    /// Lists accounts matching `filter`; unknown filters list everything.
    pub fn accounts(&self, filter: &str) -> AccountPage {
        let keep = |a: &Account| match filter {
            "users" => !a.is_org,
            "orgs" => a.is_org,
            "admins" => a.is_admin,
            "non-admins" => !a.is_org && !a.is_admin,
            "active-users" => !a.is_org && a.is_active,
            _ => true,
        };
        let accounts: Vec<Account> = self
            .accounts
            .iter()
            .filter(|s| keep(&s.account))
            .map(|s| self.render_account(s))
            .collect();

        let count = |pred: fn(&Account) -> bool| {
            u32::try_from(accounts.iter().filter(|a| pred(a)).count()).unwrap_or(u32::MAX)
        };
        AccountPage {
            users_count: count(|a| !a.is_org),
            orgs_count: count(|a| a.is_org),
            resource_count: count(|_| true),
            next_page_start: String::new(),
            accounts,
        }
    }

    // Teams

    fn team_index(&self, org: &str, team: &str) -> Result<usize> {
        let org_id = self.accounts[self.org_index(org)?].account.id.clone();
        self.teams
            .iter()
            .position(|t| t.team.org_id == org_id && (t.team.id == team || t.team.name == team))
            .ok_or_else(|| MockError::not_found("team", team))
    }

    fn render_team(stored: &StoredTeam) -> Team {
        let mut team = stored.team.clone();
        team.members_count = u32::try_from(stored.members.len()).unwrap_or(u32::MAX);
        team
    }

    /// Creates a team in an organization.
    pub fn create_team(&mut self, org: &str, input: TeamPatch) -> Result<Team> {
        let org_id = self.accounts[self.org_index(org)?].account.id.clone();
        let name = input
            .name
            .filter(|n| !n.is_empty())
            .ok_or_else(|| MockError::BadRequest("team name is required".to_string()))?;
        if self
            .teams
            .iter()
            .any(|t| t.team.org_id == org_id && t.team.name == name)
        {
            return Err(MockError::conflict("team", name));
        }

        let stored = StoredTeam {
            team: Team {
                id: new_id(),
                name,
                description: input.description.unwrap_or_default(),
                org_id,
                members_count: 0,
            },
            members: Vec::new(),
        };
        let team = Self::render_team(&stored);
        self.teams.push(stored);
        Ok(team)
    }

    /// Reads a team.
    pub fn team(&self, org: &str, team: &str) -> Result<Team> {
        let idx = self.team_index(org, team)?;
        Ok(Self::render_team(&self.teams[idx]))
    }

    /// Updates a team.
    pub fn update_team(&mut self, org: &str, team: &str, patch: TeamPatch) -> Result<Team> {
        let idx = self.team_index(org, team)?;
        let stored = &mut self.teams[idx];
        if let Some(name) = patch.name {
            stored.team.name = name;
        }
        if let Some(description) = patch.description {
            stored.team.description = description;
        }
        Ok(Self::render_team(stored))
    }

    /// Deletes a team.
    pub fn delete_team(&mut self, org: &str, team: &str) -> Result<()> {
        let idx = self.team_index(org, team)?;
        self.teams.remove(idx);
        Ok(())
    }

    /// Lists team members in the order they were added.
    pub fn members(&self, org: &str, team: &str) -> Result<MemberPage> {
        let idx = self.team_index(org, team)?;
        let members = self.teams[idx]
            .members
            .iter()
            .filter_map(|(id, is_admin)| {
                self.account(id).ok().map(|member| Member {
                    is_admin: *is_admin,
                    member,
                })
            })
            .collect();
        Ok(MemberPage { members })
    }

    /// Adds a user to a team or updates its admin flag.
    pub fn put_member(&mut self, org: &str, team: &str, account: &str, is_admin: bool) -> Result<()> {
        let idx = self.team_index(org, team)?;
        let account_idx = self.account_index(account)?;
        let user = &self.accounts[account_idx].account;
        if user.is_org {
            return Err(MockError::BadRequest(format!(
                "{} is an organization and cannot join a team",
                user.name
            )));
        }
        let account_id = user.id.clone();

        let members = &mut self.teams[idx].members;
        match members.iter_mut().find(|entry| entry.0 == account_id) {
            Some(entry) => entry.1 = is_admin,
            None => members.push((account_id, is_admin)),
        }
        Ok(())
    }

    /// Removes a user from a team.
    pub fn remove_member(&mut self, org: &str, team: &str, account: &str) -> Result<()> {
        let idx = self.team_index(org, team)?;
        let account_id = self.accounts[self.account_index(account)?].account.id.clone();
        let members = &mut self.teams[idx].members;
        let position = members
            .iter()
            .position(|(id, _)| *id == account_id)
            .ok_or_else(|| MockError::not_found("member", account))?;
        members.remove(position);
        Ok(())
    }

    // Repositories

    fn repository_index(&self, namespace: &str, name: &str) -> Result<usize> {
        let owner = &self.accounts[self.account_index(namespace)?].account.name;
        self.repositories
            .iter()
            .position(|r| r.repository.namespace == *owner && r.repository.name == name)
            .ok_or_else(|| MockError::not_found("repository", format!("{namespace}/{name}")))
    }

    fn apply_repository_patch(repository: &mut Repository, patch: RepositoryPatch) -> Result<()> {
        if let Some(visibility) = patch.visibility {
            if visibility != "public" && visibility != "private" {
                return Err(MockError::BadRequest(format!(
                    "invalid visibility '{visibility}'"
                )));
            }
            repository.visibility = visibility;
        }
        if let Some(value) = patch.short_description {
            repository.short_description = value;
        }
        if let Some(value) = patch.long_description {
            repository.long_description = value;
        }
        if let Some(value) = patch.immutable_tags {
            repository.immutable_tags = value;
        }
        if let Some(value) = patch.scan_on_push {
            repository.scan_on_push = value;
        }
        if let Some(value) = patch.tag_limit {
            repository.tag_limit = value;
        }
        Ok(())
    }

    /// Creates a repository under an account.
    pub fn create_repository(&mut self, namespace: &str, mut input: RepositoryPatch) -> Result<Repository> {
        let owner = self.accounts[self.account_index(namespace)?].account.clone();
        let name = input
            .name
            .take()
            .filter(|n| !n.is_empty())
            .ok_or_else(|| MockError::BadRequest("repository name is required".to_string()))?;
        if self
            .repositories
            .iter()
            .any(|r| r.repository.namespace == owner.name && r.repository.name == name)
        {
            return Err(MockError::conflict("repository", format!("{}/{name}", owner.name)));
        }

        let mut repository = Repository {
            id: new_id(),
            name,
            namespace: owner.name,
            namespace_type: if owner.is_org { "organization" } else { "user" }.to_string(),
            visibility: "public".to_string(),
            ..Repository::default()
        };
        Self::apply_repository_patch(&mut repository, input)?;
        self.repositories.push(StoredRepository {
            repository: repository.clone(),
            policies: Vec::new(),
        });
        Ok(repository)
    }

    /// Reads a repository.
    pub fn repository(&self, namespace: &str, name: &str) -> Result<Repository> {
        let idx = self.repository_index(namespace, name)?;
        Ok(self.repositories[idx].repository.clone())
    }

    /// Updates a repository.
    pub fn update_repository(
        &mut self,
        namespace: &str,
        name: &str,
        patch: RepositoryPatch,
    ) -> Result<Repository> {
        let idx = self.repository_index(namespace, name)?;
        let repository = &mut self.repositories[idx].repository;
        Self::apply_repository_patch(repository, patch)?;
        Ok(repository.clone())
    }

    /// Deletes a repository and its policies.
    pub fn delete_repository(&mut self, namespace: &str, name: &str) -> Result<()> {
        let idx = self.repository_index(namespace, name)?;
        self.repositories.remove(idx);
        Ok(())
    }

    // Pruning policies

    /// Lists the pruning policies of a repository.
    pub fn policies(&self, namespace: &str, name: &str) -> Result<Vec<PruningPolicy>> {
        let idx = self.repository_index(namespace, name)?;
        Ok(self.repositories[idx].policies.clone())
    }

    /// Adds a pruning policy. Duplicates are accepted, as MSR does.
    pub fn create_policy(&mut self, namespace: &str, name: &str, body: PolicyBody) -> Result<PruningPolicy> {
        let idx = self.repository_index(namespace, name)?;
        let policy = PruningPolicy {
            id: new_id(),
            enabled: body.enabled,
            rules: body.rules,
        };
        self.repositories[idx].policies.push(policy.clone());
        Ok(policy)
    }

    fn policy_mut(&mut self, namespace: &str, name: &str, id: &str) -> Result<&mut PruningPolicy> {
        let idx = self.repository_index(namespace, name)?;
        self.repositories[idx]
            .policies
            .iter_mut()
            .find(|p| p.id == id)
            .ok_or_else(|| MockError::not_found("pruning policy", id))
    }

    /// Reads a pruning policy.
    pub fn policy(&mut self, namespace: &str, name: &str, id: &str) -> Result<PruningPolicy> {
        self.policy_mut(namespace, name, id).map(|p| p.clone())
    }

    /// Replaces a pruning policy.
    pub fn replace_policy(
        &mut self,
        namespace: &str,
        name: &str,
        id: &str,
        body: PolicyBody,
    ) -> Result<PruningPolicy> {
        let policy = self.policy_mut(namespace, name, id)?;
        policy.enabled = body.enabled;
        policy.rules = body.rules;
        Ok(policy.clone())
    }

    /// Deletes a pruning policy.
    pub fn delete_policy(&mut self, namespace: &str, name: &str, id: &str) -> Result<()> {
        let idx = self.repository_index(namespace, name)?;
        let policies = &mut self.repositories[idx].policies;
        let position = policies
            .iter()
            .position(|p| p.id == id)
            .ok_or_else(|| MockError::not_found("pruning policy", id))?;
        policies.remove(position);
        Ok(())
    }
}

struct Shared {
    authorization: String,
    registry: Mutex<Registry>,
    journal: Mutex<Vec<RecordedRequest>>,
    faults: Mutex<Vec<Fault>>,
}

/// State shared by every handler.
#[derive(Clone)]
pub struct MockState {
    inner: Arc<Shared>,
}

impl MockState {
    /// Creates state for `config`.
    pub fn new(config: &MockConfig) -> Self {
        let encoded = base64::engine::general_purpose::STANDARD
            .encode(format!("{}:{}", config.username, config.password));
        Self {
            inner: Arc::new(Shared {
                authorization: format!("Basic {encoded}"),
                registry: Mutex::new(Registry::new(config.version.clone())),
                journal: Mutex::new(Vec::new()),
                faults: Mutex::new(Vec::new()),
            }),
        }
    }

    /// Locks the registry contents.
    pub fn registry(&self) -> MutexGuard<'_, Registry> {
        self.inner.registry.lock()
    }

    /// Returns true when `header` carries the accepted credentials.
    pub fn authorized(&self, header: Option<&str>) -> bool {
        header == Some(self.inner.authorization.as_str())
    }

    /// Appends a request to the journal.
    pub fn record(&self, request: RecordedRequest) {
        self.inner.journal.lock().push(request);
    }

    /// Requests received so far.
    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.inner.journal.lock().clone()
    }

    /// Empties the journal.
    pub fn clear_requests(&self) {
        self.inner.journal.lock().clear();
    }

    /// Queues a fault.
    pub fn inject_fault(&self, fault: Fault) {
        self.inner.faults.lock().push(fault);
    }

    /// Removes and returns the first fault matching the request.
    pub fn take_fault(&self, method: &str, path: &str) -> Option<Fault> {
        let mut faults = self.inner.faults.lock();
        let position = faults
            .iter()
            .position(|f| f.method == method && f.path == path)?;
        Some(faults.remove(position))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registry() -> Registry {
        Registry::new("3.1.0")
    }

    #[test]
    fn test_account_lookup_by_id_or_name() {
        let mut reg = registry();
        let alice = reg.add_user("alice").unwrap();
        assert_eq!(reg.account("alice").unwrap().id, alice.id);
        assert_eq!(reg.account(&alice.id).unwrap().name, "alice");
        assert!(matches!(reg.account("bob"), Err(MockError::NotFound { .. })));
    }

    #[test]
    fn test_duplicate_account_conflicts() {
        let mut reg = registry();
        reg.add_user("alice").unwrap();
        assert!(matches!(reg.add_user("alice"), Err(MockError::Conflict { .. })));
    }

    #[test]
    fn test_account_filters() {
        let mut reg = registry();
        reg.add_user("alice").unwrap();
        reg.add_organization("acme").unwrap();
        reg.create_account(NewAccount {
            name: "root".to_string(),
            is_admin: true,
            is_active: true,
            ..NewAccount::default()
        })
        .unwrap();

        assert_eq!(reg.accounts("users").accounts.len(), 2);
        assert_eq!(reg.accounts("orgs").accounts.len(), 1);
        assert_eq!(reg.accounts("admins").accounts.len(), 1);
        assert_eq!(reg.accounts("non-admins").accounts.len(), 1);
        assert_eq!(reg.accounts("all").accounts.len(), 3);
        let page = reg.accounts("all");
        assert_eq!((page.users_count, page.orgs_count, page.resource_count), (2, 1, 3));
    }

    #[test]
    fn test_membership_keeps_insertion_order() {
        let mut reg = registry();
        reg.add_organization("acme").unwrap();
        let b = reg.add_user("b").unwrap();
        let a = reg.add_user("a").unwrap();
        reg.create_team(
            "acme",
            TeamPatch {
                name: Some("devs".to_string()),
                description: None,
            },
        )
        .unwrap();
        reg.put_member("acme", "devs", "b", false).unwrap();
        reg.put_member("acme", "devs", &a.id, true).unwrap();
        reg.put_member("acme", "devs", "b", true).unwrap();

        let ids: Vec<String> = reg
            .members("acme", "devs")
            .unwrap()
            .members
            .into_iter()
            .map(|m| m.member.id)
            .collect();
        assert_eq!(ids, [b.id.clone(), a.id]);
        assert_eq!(reg.team("acme", "devs").unwrap().members_count, 2);
        assert_eq!(reg.account("acme").unwrap().members_count, 2);

        reg.remove_member("acme", "devs", &b.id).unwrap();
        assert!(reg.remove_member("acme", "devs", &b.id).is_err());
    }

    #[test]
    fn test_teams_require_an_organization() {
        let mut reg = registry();
        reg.add_user("alice").unwrap();
        let err = reg
            .create_team(
                "alice",
                TeamPatch {
                    name: Some("devs".to_string()),
                    description: None,
                },
            )
            .unwrap_err();
        assert!(matches!(err, MockError::NotFound { entity: "organization", .. }));
    }

    #[test]
    fn test_deleting_org_cascades() {
        let mut reg = registry();
        reg.add_organization("acme").unwrap();
        reg.create_repository(
            "acme",
            RepositoryPatch {
                name: Some("web".to_string()),
                ..RepositoryPatch::default()
            },
        )
        .unwrap();
        reg.delete_account("acme").unwrap();
        reg.add_organization("acme").unwrap();
        assert!(reg.repository("acme", "web").is_err());
    }

    #[test]
    fn test_fault_consumed_once() {
        let state = MockState::new(&MockConfig::default());
        state.inject_fault(Fault::new("get", "/health", 500, "{}"));
        assert!(state.take_fault("POST", "/health").is_none());
        assert_eq!(state.take_fault("GET", "/health").unwrap().status, 500);
        assert!(state.take_fault("GET", "/health").is_none());
    }

    #[test]
    fn test_authorization() {
        let state = MockState::new(&MockConfig::default());
        assert!(state.authorized(Some("Basic YWRtaW46cGFzc3dvcmQ=")));
        assert!(!state.authorized(Some("Basic eDp5")));
        assert!(!state.authorized(None));
    }
}
