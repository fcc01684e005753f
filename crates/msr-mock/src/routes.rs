//! HTTP surface of the mock.

use axum::{
    body::{Body, Bytes},
    extract::{Path, Query, Request, State},
    http::{header::AUTHORIZATION, StatusCode},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::{get, post, put},
    Json, Router,
};
use serde::{de::DeserializeOwned, Deserialize};
use tracing::debug;

use crate::error::MockError;
use crate::model::{
    Account, AccountPage, AccountPatch, Health, MemberPage, MembershipOptions, NewAccount,
    PolicyBody, PruningPolicy, Repository, RepositoryPatch, Team, TeamPatch, Version,
};
use crate::state::{MockState, RecordedRequest};

type Handled<T> = Result<T, MockError>;

/// Builds the router.
///
/// Every request is journaled, then matched against the queued faults, then
/// checked for credentials. `/health` needs no credentials.
pub fn app(state: MockState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/api/v0/admin/version", get(version))
        .route("/enzi/v0/accounts", get(list_accounts).post(create_account))
        .route(
            "/enzi/v0/accounts/:account",
            get(read_account).patch(update_account).delete(delete_account),
        )
        .route("/enzi/v0/accounts/:account/teams", post(create_team))
        .route(
            "/enzi/v0/accounts/:account/teams/:team",
            get(read_team).patch(update_team).delete(delete_team),
        )
        .route(
            "/enzi/v0/accounts/:account/teams/:team/members",
            get(list_members),
        )
        .route(
            "/enzi/v0/accounts/:account/teams/:team/members/:member",
            put(put_member).delete(remove_member),
        )
        .route("/api/v0/repositories/:namespace", post(create_repository))
        .route(
            "/api/v0/repositories/:namespace/:repo",
            get(read_repository)
                .patch(update_repository)
                .delete(delete_repository),
        )
        .route(
            "/api/v0/repositories/:namespace/:repo/pruningPolicies",
            get(list_policies).post(create_policy),
        )
        .route(
            "/api/v0/repositories/:namespace/:repo/pruningPolicies/:policy",
            get(read_policy).put(replace_policy).delete(delete_policy),
        )
        .layer(middleware::from_fn_with_state(state.clone(), gate))
        .with_state(state)
}

async fn gate(State(state): State<MockState>, request: Request, next: Next) -> Response {
    let (parts, body) = request.into_parts();
    let Ok(bytes) = axum::body::to_bytes(body, usize::MAX).await else {
        return MockError::BadRequest("unreadable request body".to_string()).into_response();
    };

    let method = parts.method.as_str().to_string();
    let path = parts.uri.path().to_string();
    debug!(%method, %path, "mock request");
    state.record(RecordedRequest {
        method: method.clone(),
        path: path.clone(),
        query: parts.uri.query().map(str::to_string),
        body: String::from_utf8_lossy(&bytes).into_owned(),
    });

    if let Some(fault) = state.take_fault(&method, &path) {
        if let Some(delay) = fault.delay {
            tokio::time::sleep(delay).await;
        }
        let status =
            StatusCode::from_u16(fault.status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        return (status, fault.body).into_response();
    }

    if path != "/health" {
        let header = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|value| value.to_str().ok());
        if !state.authorized(header) {
            return MockError::Unauthorized.into_response();
        }
    }

    next.run(Request::from_parts(parts, Body::from(bytes))).await
}

fn parse<T: DeserializeOwned>(body: &Bytes) -> Handled<T> {
    serde_json::from_slice(body)
        .map_err(|e| MockError::BadRequest(format!("invalid JSON body: {e}")))
}

async fn health(State(state): State<MockState>) -> Json<Health> {
    Json(state.registry().health())
}

async fn version(State(state): State<MockState>) -> Json<Version> {
    Json(Version {
        version: state.registry().version().to_string(),
    })
}

// Accounts

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct AccountQuery {
    filter: String,
}

async fn list_accounts(
    State(state): State<MockState>,
    Query(query): Query<AccountQuery>,
) -> Json<AccountPage> {
    Json(state.registry().accounts(&query.filter))
}

async fn create_account(
    State(state): State<MockState>,
    body: Bytes,
) -> Handled<(StatusCode, Json<Account>)> {
    let input: NewAccount = parse(&body)?;
    let account = state.registry().create_account(input)?;
    Ok((StatusCode::CREATED, Json(account)))
}

async fn read_account(
    State(state): State<MockState>,
    Path(account): Path<String>,
) -> Handled<Json<Account>> {
    state.registry().account(&account).map(Json)
}

async fn update_account(
    State(state): State<MockState>,
    Path(account): Path<String>,
    body: Bytes,
) -> Handled<Json<Account>> {
    let patch: AccountPatch = parse(&body)?;
    state.registry().update_account(&account, patch).map(Json)
}

async fn delete_account(
    State(state): State<MockState>,
    Path(account): Path<String>,
) -> Handled<StatusCode> {
    state.registry().delete_account(&account)?;
    Ok(StatusCode::NO_CONTENT)
}

// Teams

async fn create_team(
    State(state): State<MockState>,
    Path(org): Path<String>,
    body: Bytes,
) -> Handled<(StatusCode, Json<Team>)> {
    let input: TeamPatch = parse(&body)?;
    let team = state.registry().create_team(&org, input)?;
    Ok((StatusCode::CREATED, Json(team)))
}

async fn read_team(
    State(state): State<MockState>,
    Path((org, team)): Path<(String, String)>,
) -> Handled<Json<Team>> {
    state.registry().team(&org, &team).map(Json)
}

async fn update_team(
    State(state): State<MockState>,
    Path((org, team)): Path<(String, String)>,
    body: Bytes,
) -> Handled<Json<Team>> {
    let patch: TeamPatch = parse(&body)?;
    state.registry().update_team(&org, &team, patch).map(Json)
}

async fn delete_team(
    State(state): State<MockState>,
    Path((org, team)): Path<(String, String)>,
) -> Handled<StatusCode> {
    state.registry().delete_team(&org, &team)?;
    Ok(StatusCode::NO_CONTENT)
}

async fn list_members(
    State(state): State<MockState>,
    Path((org, team)): Path<(String, String)>,
) -> Handled<Json<MemberPage>> {
    state.registry().members(&org, &team).map(Json)
}

async fn put_member(
    State(state): State<MockState>,
    Path((org, team, member)): Path<(String, String, String)>,
    body: Bytes,
) -> Handled<StatusCode> {
    let options: MembershipOptions = if body.is_empty() {
        MembershipOptions::default()
    } else {
        parse(&body)?
    };
    state
        .registry()
        .put_member(&org, &team, &member, options.is_admin)?;
    Ok(StatusCode::NO_CONTENT)
}

async fn remove_member(
    State(state): State<MockState>,
    Path((org, team, member)): Path<(String, String, String)>,
) -> Handled<StatusCode> {
    state.registry().remove_member(&org, &team, &member)?;
    Ok(StatusCode::NO_CONTENT)
}

// Repositories

async fn create_repository(
    State(state): State<MockState>,
    Path(namespace): Path<String>,
    body: Bytes,
) -> Handled<(StatusCode, Json<Repository>)> {
    let input: RepositoryPatch = parse(&body)?;
    let repository = state.registry().create_repository(&namespace, input)?;
    Ok((StatusCode::CREATED, Json(repository)))
}

async fn read_repository(
    State(state): State<MockState>,
    Path((namespace, repo)): Path<(String, String)>,
) -> Handled<Json<Repository>> {
    state.registry().repository(&namespace, &repo).map(Json)
}

async fn update_repository(
    State(state): State<MockState>,
    Path((namespace, repo)): Path<(String, String)>,
    body: Bytes,
) -> Handled<Json<Repository>> {
    let patch: RepositoryPatch = parse(&body)?;
    state
        .registry()
        .update_repository(&namespace, &repo, patch)
        .map(Json)
}

async fn delete_repository(
    State(state): State<MockState>,
    Path((namespace, repo)): Path<(String, String)>,
) -> Handled<StatusCode> {
    state.registry().delete_repository(&namespace, &repo)?;
    Ok(StatusCode::NO_CONTENT)
}

// Pruning policies

async fn list_policies(
    State(state): State<MockState>,
    Path((namespace, repo)): Path<(String, String)>,
) -> Handled<Json<Vec<PruningPolicy>>> {
    state.registry().policies(&namespace, &repo).map(Json)
}

async fn create_policy(
    State(state): State<MockState>,
    Path((namespace, repo)): Path<(String, String)>,
    body: Bytes,
) -> Handled<(StatusCode, Json<PruningPolicy>)> {
    let input: PolicyBody = parse(&body)?;
    let policy = state.registry().create_policy(&namespace, &repo, input)?;
    Ok((StatusCode::CREATED, Json(policy)))
}

async fn read_policy(
    State(state): State<MockState>,
    Path((namespace, repo, policy)): Path<(String, String, String)>,
) -> Handled<Json<PruningPolicy>> {
    state.registry().policy(&namespace, &repo, &policy).map(Json)
}

async fn replace_policy(
    State(state): State<MockState>,
    Path((namespace, repo, policy)): Path<(String, String, String)>,
    body: Bytes,
) -> Handled<Json<PruningPolicy>> {
    let input: PolicyBody = parse(&body)?;
    state
        .registry()
        .replace_policy(&namespace, &repo, &policy, input)
        .map(Json)
}

async fn delete_policy(
    State(state): State<MockState>,
    Path((namespace, repo, policy)): Path<(String, String, String)>,
) -> Handled<StatusCode> {
    state.registry().delete_policy(&namespace, &repo, &policy)?;
    Ok(StatusCode::NO_CONTENT)
}
