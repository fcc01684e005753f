//! Integration tests against the in-memory MSR mock.
//!
//! Each test starts `msr-mock` on an ephemeral port and drives the real
//! client over HTTP. The mock's request journal is used to check which calls
//! were made and in what order.

use std::time::Duration;

use msr_client::{
    AccountFilter, CallContext, ConvergenceStrategy, CreateAccount, CreatePruningPolicy,
    CreateRepository, CreateTeam, ErrorKind, MsrClient, MsrError, MultisetEquality,
    PruningPolicyRule, UpdateAccount, UpdateRepository, UpdateTeam, Visibility,
};
use msr_mock::{Fault, MockHandle};

async fn setup() -> (MockHandle, MsrClient) {
    let mock = MockHandle::start().await.expect("mock starts");
    let client = MsrClient::new(&mock.url(), "admin", "password").expect("client builds");
    (mock, client)
}

fn ctx() -> CallContext {
    CallContext::background()
}

/// Seeds org `acme`, team `devs`, and users; returns the user ids in order.
fn seed_team(mock: &MockHandle, users: &[&str], members: &[&str]) -> Vec<String> {
    let mut registry = mock.registry();
    registry.add_organization("acme").unwrap();
    registry
        .create_team(
            "acme",
            msr_mock::model::TeamPatch {
                name: Some("devs".to_string()),
                description: None,
            },
        )
        .unwrap();
    let ids = users
        .iter()
        .map(|name| registry.add_user(name).unwrap().id)
        .collect();
    for name in members {
        registry.put_member("acme", "devs", name, false).unwrap();
    }
    ids
}

fn member_names(mock: &MockHandle) -> Vec<String> {
    mock.registry()
        .members("acme", "devs")
        .unwrap()
        .members
        .into_iter()
        .map(|m| m.member.name)
        .collect()
}

// --- transport ---

#[tokio::test]
async fn test_health_ok() {
    let (mock, client) = setup().await;
    assert!(client.is_healthy(&ctx()).await.unwrap());

    let info = client.verify(&ctx()).await.unwrap();
    assert_eq!(info.version, "3.1.0");
    assert_eq!(
        mock.request_lines(),
        ["GET /health", "GET /health", "GET /api/v0/admin/version"]
    );
}

#[tokio::test]
async fn test_verify_unhealthy() {
    let (mock, client) = setup().await;
    mock.registry().set_health(false, "database unreachable");

    let err = client.verify(&ctx()).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Unhealthy);
    assert!(err.to_string().contains("database unreachable"));
    assert_eq!(mock.request_lines(), ["GET /health"]);
}

#[tokio::test]
async fn test_wrong_credentials_unauthorized() {
    let (mock, _) = setup().await;
    let client = MsrClient::new(&mock.url(), "admin", "wrong").unwrap();

    let err = client.read_account(&ctx(), "alice").await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Unauthorized);
    assert_eq!(err.status(), Some(401));
}

#[tokio::test]
async fn test_unauthorized_ignores_malformed_body() {
    let (mock, client) = setup().await;
    mock.inject_fault(Fault::new("GET", "/api/v0/admin/version", 401, "<html>denied"));

    let err = client.version(&ctx()).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Unauthorized);
}

#[tokio::test]
async fn test_api_error_first_message() {
    let (mock, client) = setup().await;
    mock.inject_fault(Fault::new(
        "GET",
        "/api/v0/admin/version",
        400,
        r#"{"errors":[{"code":"400","message":"Bad request"}]}"#,
    ));

    let err = client.version(&ctx()).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Api);
    assert_eq!(err.status(), Some(400));
    assert!(matches!(err.root(), MsrError::Api { message, .. } if message == "Bad request"));
}

#[tokio::test]
async fn test_unparsable_error_body() {
    let (mock, client) = setup().await;
    mock.inject_fault(Fault::new("GET", "/health", 400, "not json at all"));

    let err = client.is_healthy(&ctx()).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Decode);
    assert_eq!(err.status(), Some(400));
}

#[tokio::test]
async fn test_unparsable_success_body() {
    let (mock, client) = setup().await;
    mock.inject_fault(Fault::new("GET", "/health", 200, "{"));

    let err = client.is_healthy(&ctx()).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Decode);
    assert_eq!(err.status(), Some(200));
}

#[tokio::test]
async fn test_empty_error_envelope() {
    let (mock, client) = setup().await;
    mock.inject_fault(Fault::new("GET", "/health", 503, r#"{"errors":[]}"#));

    let err = client.health(&ctx()).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::EmptyErrorEnvelope);
    assert_eq!(err.status(), Some(503));
}

#[tokio::test]
async fn test_connection_refused_is_transport() {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let client = MsrClient::new(&format!("http://{addr}"), "admin", "password").unwrap();
    let err = client.health(&ctx()).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Transport);
    assert!(!err.is_interruption());
    assert_eq!(err.status(), None);
}

// --- cancellation ---

#[tokio::test]
async fn test_cancelled_context_sends_nothing() {
    let (mock, client) = setup().await;
    let (ctx, handle) = CallContext::cancellable();
    handle.cancel();

    let err = client.health(&ctx).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Transport);
    assert!(err.is_interruption());
    assert!(mock.requests().is_empty());
}

#[tokio::test]
async fn test_deadline_aborts_stalled_exchange() {
    // Accepted by the kernel backlog but never answered.
    let stalled = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = stalled.local_addr().unwrap();
    let client = MsrClient::new(&format!("http://{addr}"), "admin", "password").unwrap();

    let ctx = CallContext::background().with_timeout(Duration::from_millis(100));
    let started = tokio::time::Instant::now();
    let err = client.health(&ctx).await.unwrap_err();

    assert!(err.is_interruption());
    assert!(started.elapsed() < Duration::from_secs(5));
    drop(stalled);
}

#[tokio::test]
async fn test_cancel_while_in_flight() {
    let stalled = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = stalled.local_addr().unwrap();
    let client = MsrClient::new(&format!("http://{addr}"), "admin", "password").unwrap();

    let (ctx, handle) = CallContext::cancellable();
    let canceller = tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(50)).await;
        handle.cancel();
    });

    let err = client.health(&ctx).await.unwrap_err();
    assert!(err.is_interruption());
    canceller.await.unwrap();
    drop(stalled);
}

// --- accounts ---

#[tokio::test]
async fn test_create_account_zero_value_sends_nothing() {
    let (mock, client) = setup().await;
    let err = client
        .create_account(&ctx(), &CreateAccount::default())
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::EmptyInput);
    assert!(mock.requests().is_empty());
}

#[tokio::test]
async fn test_account_lifecycle() {
    let (mock, client) = setup().await;

    let org = client.create_organization(&ctx(), "acme").await.unwrap();
    assert!(org.is_org);
    assert!(!org.id.is_empty());

    let password = msr_client::generate_password(16);
    let user = client
        .create_account(&ctx(), &CreateAccount::user("alice", password))
        .await
        .unwrap();
    assert!(user.is_active);

    let updated = client
        .update_account(
            &ctx(),
            &user.id,
            &UpdateAccount {
                full_name: Some("Alice Liddell".to_string()),
                ..UpdateAccount::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(updated.full_name, "Alice Liddell");

    let orgs = client.read_accounts(&ctx(), AccountFilter::Orgs).await.unwrap();
    assert_eq!(orgs.len(), 1);
    let everyone = client
        .read_accounts(&ctx(), AccountFilter::parse("inactive-users"))
        .await
        .unwrap();
    assert_eq!(everyone.len(), 2);
    let last = mock.requests().pop().unwrap();
    assert_eq!(last.query.as_deref(), Some("filter=all"));

    client.delete_account(&ctx(), "alice").await.unwrap();
    let err = client.read_account(&ctx(), "alice").await.unwrap_err();
    assert!(err.is_not_found());
    assert!(err.to_string().contains("reading account alice"));
}

#[tokio::test]
async fn test_duplicate_account_is_api_error() {
    let (mock, client) = setup().await;
    mock.registry().add_user("alice").unwrap();

    let err = client
        .create_account(&ctx(), &CreateAccount::user("alice", "pw"))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Api);
    assert_eq!(err.status(), Some(409));
}

// --- repositories and teams ---

#[tokio::test]
async fn test_repository_lifecycle() {
    let (mock, client) = setup().await;
    mock.registry().add_organization("acme").unwrap();

    let repo = client
        .create_repository(
            &ctx(),
            "acme",
            &CreateRepository {
                visibility: Visibility::Private,
                ..CreateRepository::named("web")
            },
        )
        .await
        .unwrap();
    assert_eq!(repo.resource_id(), "acme/web");
    assert_eq!(repo.namespace_type, "organization");

    let by_id = client.read_repository_by_id(&ctx(), "acme/web").await.unwrap();
    assert_eq!(by_id, repo);

    let updated = client
        .update_repository(
            &ctx(),
            "acme",
            "web",
            &UpdateRepository {
                scan_on_push: Some(true),
                ..UpdateRepository::default()
            },
        )
        .await
        .unwrap();
    assert!(updated.scan_on_push);
    assert_eq!(updated.visibility, Visibility::Private);

    client.delete_repository(&ctx(), "acme", "web").await.unwrap();
    let err = client.read_repository(&ctx(), "acme", "web").await.unwrap_err();
    assert!(err.is_not_found());
}

#[tokio::test]
async fn test_team_lifecycle() {
    let (mock, client) = setup().await;
    let org = mock.registry().add_organization("acme").unwrap();

    let team = client
        .create_team(
            &ctx(),
            "acme",
            &CreateTeam {
                name: "devs".to_string(),
                description: "Developers".to_string(),
            },
        )
        .await
        .unwrap();
    assert_eq!(team.org_id, org.id);
    assert_eq!(team.resource_id(), format!("{}/{}", org.id, team.id));

    let renamed = client
        .update_team(
            &ctx(),
            "acme",
            &team.id,
            &UpdateTeam {
                name: Some("developers".to_string()),
                ..UpdateTeam::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(renamed.name, "developers");

    assert!(client
        .list_team_members(&ctx(), "acme", "developers")
        .await
        .unwrap()
        .is_empty());

    client.delete_team(&ctx(), "acme", &team.id).await.unwrap();
    assert!(client.read_team(&ctx(), "acme", &team.id).await.unwrap_err().is_not_found());
}

// --- membership convergence ---

#[tokio::test]
async fn test_replace_all_churns_every_member() {
    let (mock, client) = setup().await;
    let ids = seed_team(&mock, &["a", "b", "c"], &["a", "b"]);
    let (a, b, c) = (&ids[0], &ids[1], &ids[2]);
    let members = "/enzi/v0/accounts/acme/teams/devs/members";

    let report = client
        .converge_team_members(&ctx(), "acme", "devs", &[b, c], ConvergenceStrategy::ReplaceAll)
        .await
        .unwrap();

    assert_eq!(
        mock.request_lines(),
        [
            format!("GET {members}"),
            format!("DELETE {members}/{a}"),
            format!("DELETE {members}/{b}"),
            format!("PUT {members}/{b}"),
            format!("PUT {members}/{c}"),
        ]
    );
    assert_eq!(report.removed, [a.as_str(), b.as_str()]);
    assert_eq!(report.added, [b.as_str(), c.as_str()]);
    assert!(report.is_complete());
    assert_eq!(member_names(&mock), ["b", "c"]);

    let put = &mock.requests()[3];
    assert_eq!(put.body, r#"{"isAdmin":false}"#);
}

#[tokio::test]
async fn test_diff_makes_minimal_calls() {
    let (mock, client) = setup().await;
    let ids = seed_team(&mock, &["a", "b", "c"], &["a", "b"]);
    let (a, b, c) = (&ids[0], &ids[1], &ids[2]);
    let members = "/enzi/v0/accounts/acme/teams/devs/members";

    let report = client
        .converge_team_members(&ctx(), "acme", "devs", &[b, c], ConvergenceStrategy::Diff)
        .await
        .unwrap();

    assert_eq!(
        mock.request_lines(),
        [
            format!("GET {members}"),
            format!("DELETE {members}/{a}"),
            format!("PUT {members}/{c}"),
        ]
    );
    assert_eq!(report.removed, [a.as_str()]);
    assert_eq!(report.added, [c.as_str()]);
    assert_eq!(member_names(&mock), ["b", "c"]);
}

#[tokio::test]
async fn test_failed_add_is_reported() {
    let (mock, client) = setup().await;
    let ids = seed_team(&mock, &["a"], &[]);

    let desired = [ids[0].as_str(), "ghost"];
    let report = client
        .converge_team_members(&ctx(), "acme", "devs", &desired, ConvergenceStrategy::default())
        .await
        .unwrap();

    assert_eq!(report.added, [ids[0].as_str()]);
    assert_eq!(report.failed.len(), 1);
    assert_eq!(report.failed[0].account_id, "ghost");
    assert!(report.failed[0].error.is_not_found());
    assert!(!report.is_complete());
}

#[tokio::test]
async fn test_failed_remove_aborts() {
    let (mock, client) = setup().await;
    let ids = seed_team(&mock, &["a", "b"], &["a", "b"]);
    let path = format!("/enzi/v0/accounts/acme/teams/devs/members/{}", ids[0]);
    mock.inject_fault(Fault::new(
        "DELETE",
        path,
        500,
        r#"{"errors":[{"code":"INTERNAL","message":"boom"}]}"#,
    ));

    let err = client
        .converge_team_members(&ctx(), "acme", "devs", &[&ids[1]], ConvergenceStrategy::ReplaceAll)
        .await
        .unwrap_err();
    assert_eq!(err.status(), Some(500));
    assert_eq!(mock.requests().len(), 2);
}

#[tokio::test]
async fn test_convergence_stops_when_cancelled() {
    let (mock, client) = setup().await;
    let ids = seed_team(&mock, &["a"], &["a"]);
    let (ctx, handle) = CallContext::cancellable();
    handle.cancel();

    let err = client
        .converge_team_members(&ctx, "acme", "devs", &ids, ConvergenceStrategy::ReplaceAll)
        .await
        .unwrap_err();
    assert!(err.is_interruption());
    assert!(mock.requests().is_empty());
}

#[tokio::test]
async fn test_convergence_stops_when_cancelled_between_adds() {
    let (mock, client) = setup().await;
    let ids = seed_team(&mock, &["a", "b", "c"], &[]);
    let (a, b) = (&ids[0], &ids[1]);
    let members = "/enzi/v0/accounts/acme/teams/devs/members";
    mock.inject_fault(
        Fault::new("PUT", format!("{members}/{b}"), 200, "").with_delay(Duration::from_secs(10)),
    );
    let ctx = CallContext::background().with_timeout(Duration::from_millis(500));

    let err = client
        .converge_team_members(&ctx, "acme", "devs", &ids, ConvergenceStrategy::Diff)
        .await
        .unwrap_err();

    assert!(err.is_interruption());
    assert_eq!(
        mock.request_lines(),
        [
            format!("GET {members}"),
            format!("PUT {members}/{a}"),
            format!("PUT {members}/{b}"),
        ]
    );
    assert_eq!(member_names(&mock), ["a"]);
}

#[tokio::test]
async fn test_convergence_on_null_member_list() {
    let (mock, client) = setup().await;
    let ids = seed_team(&mock, &["a"], &[]);
    let members = "/enzi/v0/accounts/acme/teams/devs/members";
    mock.inject_fault(Fault::new("GET", members, 200, r#"{"members":null}"#));

    let report = client
        .converge_team_members(&ctx(), "acme", "devs", &ids, ConvergenceStrategy::Diff)
        .await
        .unwrap();

    assert!(report.removed.is_empty());
    assert_eq!(report.added, [ids[0].as_str()]);
    assert!(report.is_complete());
}

// --- pruning policies ---

fn dev_tag_policy() -> CreatePruningPolicy {
    CreatePruningPolicy {
        enabled: true,
        rules: vec![
            PruningPolicyRule::new("tag", "matches", ["^dev-"]),
            PruningPolicyRule::new("vulnerability_critical", "gte", ["1"]),
        ],
    }
}

#[tokio::test]
async fn test_ensure_pruning_policy_conflicts_on_repeat() {
    let (mock, client) = setup().await;
    mock.registry().add_organization("acme").unwrap();
    client
        .create_repository(&ctx(), "acme", &CreateRepository::named("web"))
        .await
        .unwrap();

    let created = client
        .ensure_pruning_policy(&ctx(), "acme", "web", &dev_tag_policy())
        .await
        .unwrap();
    let create = mock
        .requests()
        .into_iter()
        .find(|r| r.method == "POST" && r.path.ends_with("/pruningPolicies"))
        .unwrap();
    assert_eq!(create.query.as_deref(), Some("initialEvaluation=true"));

    let mut reordered = dev_tag_policy();
    reordered.rules.reverse();
    let err = client
        .ensure_pruning_policy(&ctx(), "acme", "web", &reordered)
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::PolicyConflict);
    assert!(matches!(
        err,
        MsrError::PolicyConflict { ref existing_id, .. } if *existing_id == created.id
    ));

    let policies = client.list_pruning_policies(&ctx(), "acme", "web").await.unwrap();
    assert_eq!(policies.len(), 1);
}

#[tokio::test]
async fn test_ensure_on_null_policy_list_creates() {
    let (mock, client) = setup().await;
    mock.registry().add_organization("acme").unwrap();
    client
        .create_repository(&ctx(), "acme", &CreateRepository::named("web"))
        .await
        .unwrap();
    let policies = "/api/v0/repositories/acme/web/pruningPolicies";
    mock.inject_fault(Fault::new("GET", policies, 200, "null"));
    assert!(client
        .list_pruning_policies(&ctx(), "acme", "web")
        .await
        .unwrap()
        .is_empty());

    mock.inject_fault(Fault::new("GET", policies, 200, "null"));
    let created = client
        .ensure_pruning_policy(&ctx(), "acme", "web", &dev_tag_policy())
        .await
        .unwrap();
    assert_eq!(created.rules.len(), 2);
    assert_eq!(mock.registry().policies("acme", "web").unwrap().len(), 1);
}

#[tokio::test]
async fn test_ensure_with_strict_matcher() {
    let (mock, client) = setup().await;
    mock.registry().add_organization("acme").unwrap();
    client
        .create_repository(&ctx(), "acme", &CreateRepository::named("web"))
        .await
        .unwrap();

    let multi_value = CreatePruningPolicy {
        enabled: true,
        rules: vec![PruningPolicyRule::new("tag", "matches", ["^dev-", "^tmp-"])],
    };
    client
        .ensure_pruning_policy_with(&ctx(), "acme", "web", &multi_value, &MultisetEquality)
        .await
        .unwrap();
    let err = client
        .ensure_pruning_policy_with(&ctx(), "acme", "web", &multi_value, &MultisetEquality)
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::PolicyConflict);
}

#[tokio::test]
async fn test_pruning_policy_update_and_delete() {
    let (mock, client) = setup().await;
    mock.registry().add_organization("acme").unwrap();
    client
        .create_repository(&ctx(), "acme", &CreateRepository::named("web"))
        .await
        .unwrap();
    let policy = client
        .create_pruning_policy(&ctx(), "acme", "web", &dev_tag_policy())
        .await
        .unwrap();

    let replacement = CreatePruningPolicy {
        enabled: false,
        rules: vec![PruningPolicyRule::new("tag", "matches", ["^old-"])],
    };
    let updated = client
        .update_pruning_policy(&ctx(), "acme", "web", &policy.id, &replacement)
        .await
        .unwrap();
    assert!(!updated.enabled);
    assert_eq!(updated.rules, replacement.rules);
    assert_eq!(
        client
            .read_pruning_policy(&ctx(), "acme", "web", &policy.id)
            .await
            .unwrap(),
        updated
    );

    client
        .delete_pruning_policy(&ctx(), "acme", "web", &policy.id)
        .await
        .unwrap();
    assert!(client
        .list_pruning_policies(&ctx(), "acme", "web")
        .await
        .unwrap()
        .is_empty());
}
