//! The contract made by the API: status codes, headers, and body shapes.
use super::{ManualClock, START, TestContext};
use crate::routes;
use crate::state::VotingAppState;
use axum::http::{HeaderName, HeaderValue, StatusCode};
use axum_test::{TestResponse, TestServer};
use error_stack::Report;
use repositories::SheetEngine;
use repositories::sheet::{GatewayError, GatewayResult, Row, SheetGateway, Table};
use rstest::{fixture, rstest};
use serde_json::{Value, json};

const OWNER: &str = "owner@x.com";
const VOTER: &str = "voter@x.com";

fn user(email: &'static str) -> (HeaderName, HeaderValue) {
    (
        HeaderName::from_static(crate::user::USER_HEADER),
        HeaderValue::from_static(email),
    )
}

struct Api {
    context: TestContext,
    server: TestServer,
}

#[fixture]
fn api() -> Api {
    let context = TestContext::new();
    let app = routes::build(VotingAppState::new_without_metrics(context.engine.clone()));
    Api {
        server: TestServer::new(app).unwrap(),
        context,
    }
}

fn lunch() -> Value {
    json!({
        "title": "Lunch?",
        "author": "Hanako",
        "options": ["Pizza", "Sushi"],
        "deadline": "2025-01-11 12:00",
    })
}

impl Api {
    async fn post_as(&self, email: &'static str, path: &str, body: &Value) -> TestResponse {
        let (name, value) = user(email);
        self.server.post(path).add_header(name, value).json(body).await
    }

    async fn get_as(&self, email: &'static str, path: &str) -> TestResponse {
        let (name, value) = user(email);
        self.server.get(path).add_header(name, value).await
    }

    async fn delete_as(&self, email: &'static str, path: &str) -> TestResponse {
        let (name, value) = user(email);
        self.server.delete(path).add_header(name, value).await
    }

    async fn create_lunch(&self) -> String {
        let response = self.post_as(OWNER, "/topics", &lunch()).await;
        response.assert_status(StatusCode::CREATED);
        response.json::<Value>()["id"]
            .as_str()
            .expect("created topics carry an id")
            .to_string()
    }

    async fn vote(&self, email: &'static str, id: &str, answer: &str) -> TestResponse {
        self.post_as(email, &format!("/topics/{id}/votes"), &json!({ "answer": answer }))
            .await
    }
}

#[rstest]
#[tokio::test]
async fn list_without_topics_returns_no_content(api: Api) {
    api.server
        .get("/topics")
        .await
        .assert_status(StatusCode::NO_CONTENT);
}

#[rstest]
#[tokio::test]
async fn created_topic_is_listed_and_retrievable(api: Api) {
    let response = api.post_as(OWNER, "/topics", &lunch()).await;

    response.assert_status(StatusCode::CREATED);
    let created = response.json::<Value>();
    assert_eq!("Lunch?", created["title"]);
    assert_eq!(OWNER, created["owner_email"]);
    assert_eq!("choice_set", created["answer_kind"]);
    assert_eq!(json!(["Pizza", "Sushi"]), created["options"]);
    assert_eq!("2025-01-11T12:00:00+09:00", created["deadline"]);
    assert_eq!(START, created["created_at"]);
    assert_eq!("active", created["status"]);
    assert_eq!("active", created["state"]);

    let id = created["id"].as_str().unwrap();
    let listed = api.server.get("/topics").await;
    listed.assert_status_ok();
    assert_eq!(json!([created.clone()]), listed.json::<Value>());

    let found = api.server.get(&format!("/topics/{id}")).await;
    found.assert_status_ok();
    assert_eq!(created, found.json::<Value>());
}

#[rstest]
#[tokio::test]
async fn creating_without_a_user_is_unauthorized(api: Api) {
    api.server
        .post("/topics")
        .json(&lunch())
        .await
        .assert_status(StatusCode::UNAUTHORIZED);
}

#[rstest]
#[case::past_deadline(json!({"title": "Lunch?", "author": "H", "options": ["A", "B"], "deadline": "2025-01-01 00:00"}))]
#[case::malformed_deadline(json!({"title": "Lunch?", "author": "H", "options": ["A", "B"], "deadline": "soon"}))]
#[case::blank_title(json!({"title": "  ", "author": "H", "options": ["A", "B"]}))]
#[case::single_option(json!({"title": "Lunch?", "author": "H", "options": ["A"]}))]
#[case::separator_in_option(json!({"title": "Lunch?", "author": "H", "options": ["A/B", "C"]}))]
#[tokio::test]
async fn invalid_topics_are_unprocessable(api: Api, #[case] body: Value) {
    let response = api.post_as(OWNER, "/topics", &body).await;

    response.assert_status(StatusCode::UNPROCESSABLE_ENTITY);
    assert!(response.json::<Value>()["message"].is_string());
    assert!(api.context.sheet.snapshot(Table::Topics).await.is_empty());
}

#[rstest]
#[tokio::test]
async fn unknown_topics_are_not_found(api: Api) {
    let id = voting_core::model::TopicId::new();

    api.server
        .get(&format!("/topics/{id}"))
        .await
        .assert_status_not_found();
    api.server
        .get(&format!("/topics/{id}/tally"))
        .await
        .assert_status_not_found();
    api.vote(VOTER, &id.to_string(), "Pizza")
        .await
        .assert_status_not_found();
}

#[rstest]
#[tokio::test]
async fn malformed_ids_are_bad_requests(api: Api) {
    api.server
        .get("/topics/lunch")
        .await
        .assert_status_bad_request();
}

#[rstest]
#[tokio::test]
async fn voting_round_trip(api: Api) {
    let id = api.create_lunch().await;

    let vote = api.vote(VOTER, &id, "Pizza").await;
    vote.assert_status(StatusCode::CREATED);
    assert_eq!("Pizza", vote.json::<Value>()["answer"]);
    assert_eq!(VOTER, vote.json::<Value>()["voter_email"]);

    api.vote(VOTER, &id, "Sushi")
        .await
        .assert_status(StatusCode::CONFLICT);

    let tally = api.server.get(&format!("/topics/{id}/tally")).await;
    tally.assert_status_ok();
    assert_eq!(
        json!({
            "topic_id": id,
            "title": "Lunch?",
            "state": "active",
            "total": 1,
            "entries": [
                {"answer": "Pizza", "count": 1},
                {"answer": "Sushi", "count": 0},
            ],
        }),
        tally.json::<Value>()
    );

    let me = api.get_as(VOTER, &format!("/topics/{id}/votes/me")).await;
    assert_eq!(json!({"voted": true}), me.json::<Value>());
    let other = api.get_as("other@x.com", &format!("/topics/{id}/votes/me")).await;
    assert_eq!(json!({"voted": false}), other.json::<Value>());
}

#[rstest]
#[tokio::test]
async fn answers_must_be_declared_options(api: Api) {
    let id = api.create_lunch().await;

    let response = api.vote(VOTER, &id, "Ramen").await;

    response.assert_status(StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(
        "the answer is not valid for this topic",
        response.json::<Value>()["message"]
    );
}

#[rstest]
#[tokio::test]
async fn votes_after_the_deadline_conflict(api: Api) {
    let id = api.create_lunch().await;
    api.context.clock.advance(chrono::TimeDelta::days(2));

    api.vote(VOTER, &id, "Pizza")
        .await
        .assert_status(StatusCode::CONFLICT);

    let topic = api.server.get(&format!("/topics/{id}")).await;
    assert_eq!("expired", topic.json::<Value>()["state"]);
}

#[rstest]
#[tokio::test]
async fn close_is_reserved_to_the_owner(api: Api) {
    let id = api.create_lunch().await;
    let path = format!("/topics/{id}/close");

    api.post_as(VOTER, &path, &json!({}))
        .await
        .assert_status(StatusCode::FORBIDDEN);

    let closed = api.post_as(OWNER, &path, &json!({})).await;
    closed.assert_status_ok();
    assert_eq!("closed", closed.json::<Value>()["state"]);

    api.post_as(OWNER, &path, &json!({}))
        .await
        .assert_status(StatusCode::CONFLICT);
    api.vote(VOTER, &id, "Pizza")
        .await
        .assert_status(StatusCode::CONFLICT);
}

#[rstest]
#[tokio::test]
async fn logical_delete_keeps_the_topic_readable(api: Api) {
    let id = api.create_lunch().await;
    let path = format!("/topics/{id}");

    api.delete_as(VOTER, &path)
        .await
        .assert_status(StatusCode::FORBIDDEN);
    api.delete_as(OWNER, &path)
        .await
        .assert_status(StatusCode::NO_CONTENT);

    api.server
        .get("/topics")
        .await
        .assert_status(StatusCode::NO_CONTENT);
    let topic = api.server.get(&path).await;
    topic.assert_status_ok();
    assert_eq!("deleted", topic.json::<Value>()["status"]);

    api.server
        .get(&format!("{path}/tally"))
        .await
        .assert_status_not_found();
    api.delete_as(OWNER, &path).await.assert_status_not_found();
}

#[rstest]
#[tokio::test]
async fn physical_delete_removes_the_topic(api: Api) {
    let id = api.create_lunch().await;
    let path = format!("/topics/{id}");

    api.delete_as(OWNER, &format!("{path}?physical=true"))
        .await
        .assert_status(StatusCode::NO_CONTENT);

    api.server.get(&path).await.assert_status_not_found();
    assert!(api.context.sheet.snapshot(Table::Topics).await.is_empty());
}

#[rstest]
#[tokio::test]
async fn finished_lists_the_requesters_closed_topics(api: Api) {
    let closed = api.create_lunch().await;
    api.create_lunch().await;
    api.post_as(OWNER, &format!("/topics/{closed}/close"), &json!({}))
        .await
        .assert_status_ok();

    let mine = api.get_as(OWNER, "/topics/finished").await;
    mine.assert_status_ok();
    let ids = mine
        .json::<Vec<Value>>()
        .into_iter()
        .map(|topic| topic["id"].as_str().unwrap().to_string())
        .collect::<Vec<_>>();
    assert_eq!(vec![closed], ids);

    let theirs = api.get_as(VOTER, "/topics/finished").await;
    assert_eq!(json!([]), theirs.json::<Value>());

    api.server
        .get("/topics/finished")
        .await
        .assert_status(StatusCode::UNAUTHORIZED);
}

#[rstest]
#[tokio::test]
async fn disabled_metrics_are_unavailable(api: Api) {
    api.server
        .get("/topics/metrics")
        .await
        .assert_status(StatusCode::SERVICE_UNAVAILABLE);
}

#[rstest]
#[tokio::test]
async fn openapi_document_is_served(api: Api) {
    let response = api.server.get("/topics/api-docs/openapi.json").await;

    response.assert_status_ok();
    let paths = &response.json::<Value>()["paths"];
    assert!(paths["/topics/{topic_id}/votes"].is_object());
    assert!(paths["/topics/{topic_id}/tally"].is_object());
}

/// A sheet whose service never answers successfully.
#[derive(Debug, Clone)]
struct DownSheet;

impl SheetGateway for DownSheet {
    async fn read_rows(&self, _: Table) -> GatewayResult<Vec<Row>> {
        Err(Report::new(GatewayError::Unavailable))
    }

    async fn append_row(&self, _: Table, _: Row) -> GatewayResult<()> {
        Err(Report::new(GatewayError::Unavailable))
    }

    async fn update_cell(&self, _: Table, _: usize, _: usize, _: String) -> GatewayResult<()> {
        Err(Report::new(GatewayError::Unavailable))
    }

    async fn delete_row(&self, _: Table, _: usize) -> GatewayResult<()> {
        Err(Report::new(GatewayError::Unavailable))
    }
}

#[tokio::test]
async fn storage_outages_are_service_unavailable() {
    let engine = SheetEngine::with_clock(DownSheet, ManualClock::starting_at(START));
    let server = TestServer::new(routes::build(VotingAppState::new_without_metrics(engine))).unwrap();
    let (name, value) = user(OWNER);

    let list = server.get("/topics").await;
    list.assert_status(StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(
        "topic storage is unavailable, try again later",
        list.json::<Value>()["message"]
    );

    server
        .post("/topics")
        .add_header(name, value)
        .json(&lunch())
        .await
        .assert_status(StatusCode::SERVICE_UNAVAILABLE);
}
