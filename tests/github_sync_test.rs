//! End-to-end sync through the REST client against a mock GitHub server.

use std::sync::Arc;

use mockito::{Matcher, Server};
use serde_json::{json, Value};
use teamboard::adapters::github::GitHubClient;
use teamboard::adapters::sqlite::{create_test_pool, SqliteIssueStore};
use teamboard::domain::models::GitHubConfig;
use teamboard::{
    BoardService, Credential, IssueStore, SyncEngine, SyncOutcome, SyncSettings, TrackerTarget,
    WorkflowState,
};

fn issue(base: &str, number: u64, labels: &[&str], updated_at: &str) -> Value {
    json!({
        "id": number * 10,
        "number": number,
        "title": format!("Issue {number}"),
        "url": format!("{base}/repos/acme/board/issues/{number}"),
        "html_url": format!("https://github.com/acme/board/issues/{number}"),
        "updated_at": updated_at,
        "labels": labels.iter().map(|l| json!({ "name": l, "color": "ededed" })).collect::<Vec<_>>(),
    })
}

#[tokio::test]
async fn test_full_sync_over_paginated_rest_api() {
    let mut server = Server::new_async().await;
    let base = server.url();

    let mut pr = issue(&base, 3, &["Todo"], "2024-04-03T00:00:00Z");
    pr["pull_request"] = json!({ "url": format!("{base}/repos/acme/board/pulls/3") });

    let page_one = server
        .mock("GET", "/repos/acme/board/issues")
        .match_header("authorization", "Bearer ghp_admin")
        .match_query(Matcher::AllOf(vec![
            Matcher::UrlEncoded("sort".into(), "updated".into()),
            Matcher::UrlEncoded("per_page".into(), "2".into()),
            Matcher::UrlEncoded("page".into(), "1".into()),
        ]))
        .with_header(
            "link",
            &format!(
                "<{base}/repos/acme/board/issues?per_page=2&page=2>; rel=\"next\", \
                 <{base}/repos/acme/board/issues?per_page=2&page=2>; rel=\"last\""
            ),
        )
        .with_body(
            json!([
                issue(&base, 1, &["Epic", "Doing"], "2024-04-01T00:00:00Z"),
                issue(&base, 2, &["Todo"], "2024-04-02T00:00:00Z"),
            ])
            .to_string(),
        )
        .expect(1)
        .create_async()
        .await;
    let page_two = server
        .mock("GET", "/repos/acme/board/issues")
        .match_query(Matcher::UrlEncoded("page".into(), "2".into()))
        .with_body(json!([pr]).to_string())
        .expect(1)
        .create_async()
        .await;

    let epic_comments = server
        .mock("GET", "/repos/acme/board/issues/1/comments")
        .match_query(Matcher::Any)
        .with_body(
            json!([
                { "id": 901, "body": "Needs TB-REQUIRE(#2) first", "updated_at": "2024-04-01T00:00:00Z" },
                { "id": 902, "body": "See also tb-relate(acme/docs#4)", "updated_at": "2024-04-01T00:00:00Z" },
            ])
            .to_string(),
        )
        .expect(1)
        .create_async()
        .await;
    let task_comments = server
        .mock("GET", "/repos/acme/board/issues/2/comments")
        .match_query(Matcher::Any)
        .with_body("[]")
        .expect(1)
        .create_async()
        .await;
    let pr_comments = server
        .mock("GET", "/repos/acme/board/issues/3/comments")
        .match_query(Matcher::Any)
        .expect(0)
        .create_async()
        .await;

    let client = GitHubClient::with_config(&GitHubConfig {
        api_base: base.clone(),
        per_page: 2,
        ..GitHubConfig::default()
    })
    .unwrap();
    let store = Arc::new(SqliteIssueStore::new(create_test_pool().await.unwrap()));
    let settings = SyncSettings {
        api_base: base.clone(),
        targets: vec![TrackerTarget::new("acme", "board")],
        states: vec![
            WorkflowState::new("Todo", "ededed"),
            WorkflowState::new("Doing", "fbca04"),
        ],
        project_label: Some("Epic".to_string()),
        include_pull_requests: false,
    };
    let engine = Arc::new(
        SyncEngine::new(Arc::clone(&store), Arc::new(client), settings)
            .with_admin_credential(Credential::new("ghp_admin").unwrap()),
    );

    let SyncOutcome::Completed(report) = engine.start_sync().await.unwrap() else {
        panic!("expected a completed run");
    };
    assert_eq!(report.since, None);
    assert_eq!(report.issue_pages, 2);
    assert_eq!(report.issues, 2);
    assert_eq!(report.skipped_pull_requests, 1);
    assert_eq!(report.comments, 2);
    assert_eq!(report.task_links, 2);

    for mock in [&page_one, &page_two, &epic_comments, &task_comments, &pr_comments] {
        mock.assert_async().await;
    }

    let target = TrackerTarget::new("acme", "board");
    let epic_id = target.issue_id(&base, 1);
    let links = store.task_links_by_issue(&epic_id).await.unwrap();
    assert_eq!(links.len(), 2);
    let required: Vec<_> = links.iter().filter(|l| l.required).collect();
    assert_eq!(required.len(), 1);
    assert_eq!(required[0].task, target.issue_id(&base, 2));
    assert!(links
        .iter()
        .any(|l| !l.required && l.task == TrackerTarget::new("acme", "docs").issue_id(&base, 4)));

    let board = BoardService::new(Arc::clone(&engine), None).board().await.unwrap();
    let columns: Vec<_> = board
        .columns
        .iter()
        .map(|c| (c.state.as_str(), c.cards.iter().map(|card| card.number).collect::<Vec<_>>()))
        .collect();
    assert_eq!(columns, vec![("Todo", vec![Some(2)]), ("Doing", vec![Some(1)])]);
    assert!(board.columns[1].cards[0].is_project);
}

#[tokio::test]
async fn test_unauthorized_sync_leaves_engine_idle() {
    let mut server = Server::new_async().await;
    let _denied = server
        .mock("GET", "/repos/acme/board/issues")
        .match_query(Matcher::Any)
        .with_status(401)
        .with_body(r#"{"message":"Bad credentials"}"#)
        .create_async()
        .await;

    let client = GitHubClient::with_config(&GitHubConfig {
        api_base: server.url(),
        ..GitHubConfig::default()
    })
    .unwrap();
    let store = Arc::new(SqliteIssueStore::new(create_test_pool().await.unwrap()));
    let settings = SyncSettings {
        api_base: server.url(),
        targets: vec![TrackerTarget::new("acme", "board")],
        states: vec![WorkflowState::new("Todo", "ededed")],
        project_label: None,
        include_pull_requests: false,
    };
    let engine = SyncEngine::new(store, Arc::new(client), settings)
        .with_admin_credential(Credential::new("ghp_revoked").unwrap());

    let err = engine.start_sync().await.unwrap_err();
    assert!(matches!(err, teamboard::DomainError::Auth(_)));
    assert!(!err.is_retryable());
    assert_eq!(engine.state(), teamboard::SyncState::Idle);
}
