use std::{path::Path, sync::Mutex};

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use reflect::{
    Config, ConfirmOverwrite, Contribution, ContributionKind, Forge, LlmClient, OutputDir,
    QueryKind, ReflectError, fetch_contributions, github::format_reset_time, parse_args_at, run,
};
use serde_json::{Value, json};

fn now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 6, 15, 12, 0, 0).unwrap()
}

fn config(extra: &[&str]) -> Config {
    let argv = [
        "reflect",
        "--username",
        "octocat",
        "--start-date",
        "2025-01-01",
        "--end-date",
        "2025-06-01",
    ]
    .into_iter()
    .chain(extra.iter().copied());
    parse_args_at(argv, now()).unwrap()
}

/// Which search a request belongs to, judged by its search string.
fn kind_of(body: &Value) -> QueryKind {
    let search = body["variables"]["query"].as_str().unwrap();
    if search.starts_with("reviewed-by:") {
        QueryKind::ReviewedPullRequests
    } else if search.contains("is:issue") {
        QueryKind::ClosedIssues
    } else {
        QueryKind::MergedPullRequests
    }
}

fn page(nodes: Vec<Value>, next_cursor: Option<&str>) -> Value {
    json!({
        "data": {
            "search": {
                "nodes": nodes,
                "pageInfo": {
                    "hasNextPage": next_cursor.is_some(),
                    "endCursor": next_cursor,
                }
            }
        }
    })
}

fn contribution_node(title: &str, repo: &str, closed_at: &str) -> Value {
    json!({
        "title": title,
        "body": format!("{title} description"),
        "closedAt": closed_at,
        "url": format!("https://github.com/{repo}/pull/1"),
        "repository": { "nameWithOwner": repo },
    })
}

fn numbered_nodes(prefix: &str, range: std::ops::Range<usize>) -> Vec<Value> {
    range
        .map(|n| contribution_node(&format!("{prefix} {n}"), "acme/api", "2025-03-01T10:00:00Z"))
        .collect()
}

/// Fake GitHub that serves canned pages per search, keyed by cursor, and
/// records every request body.
#[derive(Default)]
struct MockHub {
    merged: Vec<Value>,
    issues: Vec<Value>,
    reviewed: Vec<Value>,
    requests: Mutex<Vec<Value>>,
}

impl MockHub {
    /// Pages are chained with cursors `c1`, `c2`, ...
    fn pages_for(&self, kind: QueryKind) -> &[Value] {
        match kind {
            QueryKind::MergedPullRequests => &self.merged,
            QueryKind::ClosedIssues => &self.issues,
            QueryKind::ReviewedPullRequests => &self.reviewed,
        }
    }

    fn requests_for(&self, kind: QueryKind) -> Vec<Value> {
        self.requests
            .lock()
            .unwrap()
            .iter()
            .filter(|body| kind_of(body) == kind)
            .cloned()
            .collect()
    }
}

#[async_trait]
impl Forge for MockHub {
    async fn graphql(&self, body: &Value) -> reflect::Result<Value> {
        self.requests.lock().unwrap().push(body.clone());

        let pages = self.pages_for(kind_of(body));
        let index = match body["variables"]["after"].as_str() {
            None => 0,
            Some(cursor) => cursor.trim_start_matches('c').parse::<usize>().unwrap(),
        };

        Ok(pages
            .get(index)
            .cloned()
            .unwrap_or_else(|| page(vec![], None)))
    }
}

fn paged(batches: Vec<Vec<Value>>) -> Vec<Value> {
    let count = batches.len();
    batches
        .into_iter()
        .enumerate()
        .map(|(i, nodes)| {
            let cursor = (i + 1 < count).then(|| format!("c{}", i + 1));
            page(nodes, cursor.as_deref())
        })
        .collect()
}

#[tokio::test]
async fn test_pagination_collects_every_page_in_order() {
    let hub = MockHub {
        merged: paged(vec![
            numbered_nodes("PR", 0..100),
            numbered_nodes("PR", 100..200),
            numbered_nodes("PR", 200..237),
        ]),
        ..Default::default()
    };

    let result = fetch_contributions(&config(&[]).fetch_request(), &hub)
        .await
        .unwrap();

    assert_eq!(result.prs.len(), 237);
    let titles: Vec<String> = result.prs.iter().map(|pr| pr.title.clone()).collect();
    let expected: Vec<String> = (0..237).map(|n| format!("PR {n}")).collect();
    assert_eq!(titles, expected);
    assert!(result.issues.is_empty());
    assert!(result.reviews.is_empty());

    let requests = hub.requests_for(QueryKind::MergedPullRequests);
    let cursors: Vec<Value> = requests
        .iter()
        .map(|body| body["variables"]["after"].clone())
        .collect();
    assert_eq!(cursors, vec![Value::Null, json!("c1"), json!("c2")]);
}

#[tokio::test]
async fn test_search_strings_for_each_query() {
    let hub = MockHub::default();
    let config = config(&["--exclude-orgs", "globex", "--include-repos", "acme/api"]);

    fetch_contributions(&config.fetch_request(), &hub)
        .await
        .unwrap();

    let search_of = |kind| {
        hub.requests_for(kind)[0]["variables"]["query"]
            .as_str()
            .unwrap()
            .to_string()
    };

    assert_eq!(
        search_of(QueryKind::MergedPullRequests),
        "author:octocat is:pr is:merged merged:2025-01-01..2025-06-01 -org:globex repo:acme/api"
    );
    assert_eq!(
        search_of(QueryKind::ClosedIssues),
        "author:octocat is:issue is:closed closed:2025-01-01..2025-06-01 -org:globex repo:acme/api"
    );
    assert_eq!(
        search_of(QueryKind::ReviewedPullRequests),
        "reviewed-by:octocat is:pr is:merged merged:2025-01-01..2025-06-01 -org:globex repo:acme/api -author:octocat"
    );
}

#[tokio::test]
async fn test_kinds_are_assigned_per_search() {
    let hub = MockHub {
        merged: paged(vec![vec![contribution_node(
            "Add caching",
            "acme/api",
            "2025-02-01T00:00:00Z",
        )]]),
        issues: paged(vec![vec![json!({
            "title": "Crash on start",
            "body": null,
            "closedAt": "2025-02-03T00:00:00Z",
            "url": "https://github.com/acme/web/issues/7",
            "repository": { "nameWithOwner": "acme/web" },
        })]]),
        ..Default::default()
    };

    let result = fetch_contributions(&config(&[]).fetch_request(), &hub)
        .await
        .unwrap();

    assert_eq!(result.prs[0].kind, ContributionKind::PullRequest);
    assert_eq!(result.prs[0].permalink, None);
    assert_eq!(
        result.issues[0],
        Contribution {
            title: "Crash on start".to_string(),
            body: String::new(),
            url: "https://github.com/acme/web/issues/7".to_string(),
            permalink: None,
            closed_at: Utc.with_ymd_and_hms(2025, 2, 3, 0, 0, 0).unwrap(),
            repository: "acme/web".to_string(),
            kind: ContributionKind::Issue,
            comments: vec![],
            reviews: vec![],
        }
    );
}

fn reviewed_node() -> Value {
    json!({
        "permalink": "https://github.com/acme/api/pull/42",
        "title": "Refactor auth",
        "body": "Moves auth into middleware",
        "closedAt": "2025-04-10T08:30:00Z",
        "url": "https://github.com/acme/api/pull/42",
        "repository": { "nameWithOwner": "acme/api" },
        "comments": { "nodes": [
            { "author": { "login": "octocat" }, "body": "Nice cleanup" },
            { "author": { "login": "octocat" }, "body": "### Merge activity\n* merged" },
            { "author": { "login": "octocat" }, "body": "/retest" },
            { "author": { "login": "alice" }, "body": "Thanks!" },
            { "author": null, "body": "ghost comment" }
        ]},
        "reviews": { "nodes": [
            {
                "author": { "login": "octocat" },
                "body": "Looks good",
                "state": "APPROVED",
                "comments": { "nodes": [
                    { "author": { "login": "octocat" }, "body": "nit: naming" },
                    { "author": { "login": "alice" }, "body": "fixed" }
                ]}
            },
            {
                "author": { "login": "bob" },
                "body": "Also fine",
                "state": "APPROVED",
                "comments": { "nodes": [] }
            }
        ]}
    })
}

#[tokio::test]
async fn test_reviewed_pull_requests_keep_only_own_comments() {
    let hub = MockHub {
        reviewed: paged(vec![vec![reviewed_node()]]),
        ..Default::default()
    };

    let result = fetch_contributions(
        &config(&["--skip-comment-prefix", "/retest"]).fetch_request(),
        &hub,
    )
    .await
    .unwrap();

    let pr = &result.reviews[0];
    assert_eq!(
        pr.permalink.as_deref(),
        Some("https://github.com/acme/api/pull/42")
    );
    assert_eq!(pr.kind, ContributionKind::PullRequest);

    let comments: Vec<&str> = pr.comments.iter().map(|c| c.body.as_str()).collect();
    assert_eq!(comments, vec!["Nice cleanup"]);

    assert_eq!(pr.reviews.len(), 1);
    assert_eq!(pr.reviews[0].state, "APPROVED");
    let review_comments: Vec<&str> = pr.reviews[0]
        .comments
        .iter()
        .map(|c| c.body.as_str())
        .collect();
    assert_eq!(review_comments, vec!["nit: naming"]);
}

#[tokio::test]
async fn test_merge_marker_skipped_by_default() {
    let hub = MockHub {
        reviewed: paged(vec![vec![reviewed_node()]]),
        ..Default::default()
    };

    let result = fetch_contributions(&config(&[]).fetch_request(), &hub)
        .await
        .unwrap();

    let comments: Vec<&str> = result.reviews[0]
        .comments
        .iter()
        .map(|c| c.body.as_str())
        .collect();
    assert_eq!(comments, vec!["Nice cleanup", "/retest"]);
}

const RESET_EPOCH: i64 = 1_767_225_600;

fn rate_limited() -> Value {
    json!({
        "data": null,
        "errors": [{
            "type": "RATE_LIMITED",
            "message": "API rate limit exceeded for user ID 1.",
            "extensions": { "rateLimit": { "reset": RESET_EPOCH } }
        }]
    })
}

#[tokio::test]
async fn test_rate_limit_in_one_search_aborts_the_fetch() {
    let hub = MockHub {
        merged: paged(vec![numbered_nodes("PR", 0..100), numbered_nodes("PR", 100..150)]),
        issues: vec![rate_limited()],
        reviewed: paged(vec![vec![reviewed_node()]]),
        ..Default::default()
    };

    let err = fetch_contributions(&config(&[]).fetch_request(), &hub)
        .await
        .unwrap_err();

    assert_eq!(
        err,
        ReflectError::RateLimitExceeded {
            resets_at: format_reset_time(RESET_EPOCH)
        }
    );
    assert!(!err.is_configuration());
    assert!(
        err.to_string()
            .starts_with("GitHub API rate limit exceeded. Resets at ")
    );
}

#[tokio::test]
async fn test_rate_limit_on_later_page() {
    let mut merged = paged(vec![numbered_nodes("PR", 0..100), vec![]]);
    merged[1] = rate_limited();
    let hub = MockHub {
        merged,
        ..Default::default()
    };

    let err = fetch_contributions(&config(&[]).fetch_request(), &hub)
        .await
        .unwrap_err();

    assert!(matches!(err, ReflectError::RateLimitExceeded { .. }));
}

#[tokio::test]
async fn test_other_graphql_errors_are_upstream() {
    let hub = MockHub {
        reviewed: vec![json!({
            "data": null,
            "errors": [{ "message": "Something went wrong while executing your query." }]
        })],
        ..Default::default()
    };

    let err = fetch_contributions(&config(&[]).fetch_request(), &hub)
        .await
        .unwrap_err();

    assert_eq!(
        err,
        ReflectError::Upstream("Something went wrong while executing your query.".to_string())
    );
}

#[tokio::test]
async fn test_next_page_without_cursor_is_an_error() {
    let hub = MockHub {
        merged: vec![json!({
            "data": { "search": {
                "nodes": numbered_nodes("PR", 0..3),
                "pageInfo": { "hasNextPage": true, "endCursor": null }
            }}
        })],
        ..Default::default()
    };

    let err = fetch_contributions(&config(&[]).fetch_request(), &hub)
        .await
        .unwrap_err();

    assert_eq!(
        err,
        ReflectError::Upstream("GitHub reported another page without a cursor".to_string())
    );
    assert_eq!(hub.requests_for(QueryKind::MergedPullRequests).len(), 1);
}

/// LLM stand-in that echoes a fixed reply and records its inputs.
#[derive(Default)]
struct FakeLlm {
    inputs: Mutex<Vec<String>>,
}

#[async_trait]
impl LlmClient for FakeLlm {
    async fn complete(&self, _instructions: &str, input: &str) -> reflect::Result<String> {
        let mut inputs = self.inputs.lock().unwrap();
        inputs.push(input.to_string());
        Ok(format!("generated #{}", inputs.len()))
    }
}

struct Decline;

impl ConfirmOverwrite for Decline {
    fn confirm_overwrite(&self, _path: &Path) -> std::io::Result<bool> {
        Ok(false)
    }
}

#[tokio::test]
async fn test_run_writes_reports_and_brag_document() {
    let dir = tempfile::tempdir().unwrap();
    let output = OutputDir::new(dir.path().join("output"));
    let hub = MockHub {
        merged: paged(vec![numbered_nodes("PR", 0..2)]),
        reviewed: paged(vec![vec![reviewed_node()]]),
        ..Default::default()
    };
    let llm = FakeLlm::default();
    let config = config(&["--brag"]);

    let outcome = run(&config, &hub, Some(&llm as &(dyn LlmClient + Send + Sync)), &output, &Decline)
        .await
        .unwrap();

    let names: Vec<String> = outcome
        .written
        .iter()
        .map(|path| path.file_name().unwrap().to_string_lossy().into_owned())
        .collect();
    assert_eq!(
        names,
        vec![
            "review_contributions.md",
            "contributions.md",
            "summarized_contributions.md",
            "brag_document.md"
        ]
    );

    let contributions =
        std::fs::read_to_string(dir.path().join("output/contributions.md")).unwrap();
    assert!(contributions.contains("- Total Pull Requests: 2"));

    let inputs = llm.inputs.lock().unwrap();
    assert_eq!(inputs[0], contributions);
    assert_eq!(
        inputs[1],
        "Time Period: From January 1, 2025 to June 1, 2025\n\ngenerated #1"
    );
    assert_eq!(
        std::fs::read_to_string(dir.path().join("output/brag_document.md")).unwrap(),
        "generated #2"
    );
}

#[tokio::test]
async fn test_run_reuses_declined_summary() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("summarized_contributions.md"), "kept summary").unwrap();
    let output = OutputDir::new(dir.path());
    let llm = FakeLlm::default();
    let config = config(&["--brag"]);

    run(
        &config,
        &MockHub::default(),
        Some(&llm as &(dyn LlmClient + Send + Sync)),
        &output,
        &Decline,
    )
    .await
    .unwrap();

    let inputs = llm.inputs.lock().unwrap();
    assert!(inputs[1].ends_with("\n\nkept summary"));
}

#[tokio::test]
async fn test_run_writes_nothing_when_fetch_fails() {
    let dir = tempfile::tempdir().unwrap();
    let output = OutputDir::new(dir.path().join("output"));
    let hub = MockHub {
        issues: vec![rate_limited()],
        ..Default::default()
    };

    let err = run(&config(&[]), &hub, None, &output, &Decline)
        .await
        .unwrap_err();

    assert!(matches!(
        err.downcast_ref::<ReflectError>(),
        Some(ReflectError::RateLimitExceeded { .. })
    ));
    assert!(!dir.path().join("output").exists());
}
