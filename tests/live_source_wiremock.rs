//! Live adapter behaviour against a mock GitHub API.

use std::time::Duration;

use magpie::comment::AggregationError;
use magpie::pipeline::Checkpoint;
use magpie::source::{AccessToken, BackoffPolicy, CommentSource, LiveSource, RepositoryTarget};
use rstest::{fixture, rstest};
use tokio::runtime::Runtime;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

type FixtureResult<T> = Result<T, Box<dyn std::error::Error>>;

const COMMENTS_PATH: &str = "/api/v3/repos/owner/repo/pulls/comments";

struct LiveSourceFixture {
    runtime: Runtime,
    server: MockServer,
    source: LiveSource,
}

impl LiveSourceFixture {
    fn block_on<F: std::future::Future>(&self, future: F) -> F::Output {
        self.runtime.block_on(future)
    }
}

fn comment_json(id: u64, body: &str) -> serde_json::Value {
    serde_json::json!({
        "id": id,
        "body": body,
        "user": { "login": "reviewer" },
        "pull_request_url": "https://api.github.com/repos/owner/repo/pulls/42",
        "created_at": "2019-05-03T14:03:00Z",
        "updated_at": "2019-05-03T14:03:00Z"
    })
}

#[fixture]
fn live_fixture() -> FixtureResult<LiveSourceFixture> {
    let runtime = Runtime::new()?;
    let server = runtime.block_on(MockServer::start());
    let token = AccessToken::new("valid-token")?;
    let target = RepositoryTarget::new("owner", "repo")?;
    let _guard = runtime.enter();
    let source = LiveSource::new(
        &token,
        &format!("{}/api/v3", server.uri()),
        target,
        100,
        BackoffPolicy::new(Duration::from_millis(1), Duration::from_millis(2), 2),
    )?;
    Ok(LiveSourceFixture {
        runtime,
        server,
        source,
    })
}

#[rstest]
fn first_page_with_next_link_is_not_exhausted(live_fixture: FixtureResult<LiveSourceFixture>) {
    let fixture = live_fixture.expect("fixture should build");

    let next_url = format!(
        "{}{COMMENTS_PATH}?page=2&per_page=100",
        fixture.server.uri()
    );
    let first_page = ResponseTemplate::new(200)
        .insert_header("Link", format!(r#"<{next_url}>; rel="next""#).as_str())
        .set_body_json(serde_json::json!([
            comment_json(1, "First comment"),
            comment_json(2, "Second comment"),
        ]));
    fixture.block_on(
        Mock::given(method("GET"))
            .and(path(COMMENTS_PATH))
            .and(query_param("page", "1"))
            .respond_with(first_page)
            .mount(&fixture.server),
    );

    let page = fixture
        .block_on(fixture.source.fetch_page(&Checkpoint::Start))
        .expect("page should fetch");

    assert_eq!(page.records.len(), 2);
    assert!(!page.exhausted);
    assert_eq!(page.next, Checkpoint::Page { next_page: 2 });

    let first_body = page
        .records
        .first()
        .and_then(|record| record.str_field("body"));
    assert_eq!(first_body, Some("First comment"));
}

#[rstest]
fn final_page_without_next_link_is_exhausted(live_fixture: FixtureResult<LiveSourceFixture>) {
    let fixture = live_fixture.expect("fixture should build");

    let last_page = ResponseTemplate::new(200)
        .set_body_json(serde_json::json!([comment_json(3, "Last comment")]));
    fixture.block_on(
        Mock::given(method("GET"))
            .and(path(COMMENTS_PATH))
            .and(query_param("page", "2"))
            .respond_with(last_page)
            .mount(&fixture.server),
    );

    let page = fixture
        .block_on(fixture.source.fetch_page(&Checkpoint::Page { next_page: 2 }))
        .expect("page should fetch");

    assert_eq!(page.records.len(), 1);
    assert!(page.exhausted);
    // The partial final page is re-fetched next run to pick up late arrivals.
    assert_eq!(page.next, Checkpoint::Page { next_page: 2 });
}

#[rstest]
fn persistent_rate_limiting_exhausts_the_retry_budget(
    live_fixture: FixtureResult<LiveSourceFixture>,
) {
    let fixture = live_fixture.expect("fixture should build");

    let rate_limited = ResponseTemplate::new(403).set_body_json(serde_json::json!({
        "message": "API rate limit exceeded for user",
        "documentation_url": "https://docs.github.com/rest/rate-limit"
    }));
    fixture.block_on(
        Mock::given(method("GET"))
            .and(path(COMMENTS_PATH))
            .respond_with(rate_limited)
            .mount(&fixture.server),
    );

    let error = fixture
        .block_on(fixture.source.fetch_page(&Checkpoint::Start))
        .expect_err("retry budget should be exhausted");

    assert!(matches!(
        error,
        AggregationError::RateLimitExhausted { attempts: 2, .. }
    ));
}

#[rstest]
fn rejected_token_maps_to_authentication_error(live_fixture: FixtureResult<LiveSourceFixture>) {
    let fixture = live_fixture.expect("fixture should build");

    let unauthorised = ResponseTemplate::new(401).set_body_json(serde_json::json!({
        "message": "Bad credentials"
    }));
    fixture.block_on(
        Mock::given(method("GET"))
            .and(path(COMMENTS_PATH))
            .respond_with(unauthorised)
            .mount(&fixture.server),
    );

    let error = fixture
        .block_on(fixture.source.fetch_page(&Checkpoint::Start))
        .expect_err("bad credentials should fail");

    assert!(matches!(error, AggregationError::Authentication { .. }));
}
