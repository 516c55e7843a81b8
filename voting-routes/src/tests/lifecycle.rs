use super::{TestContext, TestEngine, at, email};
use crate::error::LifecycleError;
use crate::locks::TopicLocks;
use crate::service::{DeleteMode, TopicService};
use chrono::TimeDelta;
use engine::Pagination;
use repositories::rows::encode_topic;
use repositories::sheet::Table;
use rstest::{fixture, rstest};
use voting_core::TopicRepository;
use voting_core::VotingEngine;
use voting_core::model::{AnswerKind, TopicId, TopicState, TopicStatus, TopicView, UserEmail};
use voting_core::validation::{TopicDraft, ValidationRule};

struct Lifecycle {
    context: TestContext,
    service: TopicService<TestEngine>,
}

#[fixture]
fn lifecycle() -> Lifecycle {
    let context = TestContext::new();
    Lifecycle {
        service: TopicService::new(context.engine.clone(), TopicLocks::new()),
        context,
    }
}

#[fixture]
fn draft() -> TopicDraft {
    TopicDraft {
        title: "Lunch?".to_string(),
        author: "Hanako".to_string(),
        owner_email: email("owner@x.com"),
        answer_kind: AnswerKind::ChoiceSet,
        options: vec!["Pizza".to_string(), "Sushi".to_string()],
        deadline: Some(at("2025-01-11T12:00:00+09:00")),
    }
}

fn owner() -> UserEmail {
    email("owner@x.com")
}

impl Lifecycle {
    async fn create(&self, title: &str) -> TopicView {
        let mut topic = draft();
        topic.title = title.to_string();
        self.service
            .create_topic(topic, self.context.now())
            .await
            .unwrap()
    }

    async fn status_of(&self, id: TopicId) -> Option<TopicStatus> {
        self.context
            .engine
            .topics()
            .find_by_id(id)
            .await
            .unwrap()
            .map(|topic| topic.status)
    }
}

fn rejected<T: std::fmt::Debug>(result: crate::LifecycleResult<T>) -> LifecycleError {
    result.unwrap_err().current_context().clone()
}

#[rstest]
#[tokio::test]
async fn created_topics_are_active_with_a_future_deadline(lifecycle: Lifecycle, draft: TopicDraft) {
    let created = lifecycle
        .service
        .create_topic(draft, lifecycle.context.now())
        .await
        .unwrap();

    assert_eq!(TopicStatus::Active, created.topic.status);
    assert_eq!(TopicState::Active, created.state);
    assert!(created.topic.deadline.unwrap() > created.topic.created_at);
    let stored = lifecycle
        .context
        .engine
        .topics()
        .find_by_id(created.topic.id)
        .await
        .unwrap();
    assert_eq!(Some(created.topic), stored);
}

#[rstest]
#[tokio::test]
async fn past_deadlines_are_rejected(lifecycle: Lifecycle, mut draft: TopicDraft) {
    draft.deadline = Some(at("2025-01-09T12:00:00+09:00"));

    let error = rejected(lifecycle.service.create_topic(draft, lifecycle.context.now()).await);

    assert_eq!(LifecycleError::Validation(ValidationRule::DeadlineNotInFuture), error);
    assert!(lifecycle.context.sheet.snapshot(Table::Topics).await.is_empty());
}

#[rstest]
#[case::blank_title(|d: &mut TopicDraft| d.title = " ".to_string(), ValidationRule::EmptyTitle)]
#[case::one_option(|d: &mut TopicDraft| d.options.truncate(1), ValidationRule::TooFewOptions)]
#[case::marker_option(
    |d: &mut TopicDraft| d.options.push("FREE_INPUT".to_string()),
    ValidationRule::ReservedOption("FREE_INPUT".to_string())
)]
#[tokio::test]
async fn invalid_drafts_name_the_broken_rule(
    lifecycle: Lifecycle,
    mut draft: TopicDraft,
    #[case] change: fn(&mut TopicDraft),
    #[case] rule: ValidationRule,
) {
    change(&mut draft);

    let error = rejected(lifecycle.service.create_topic(draft, lifecycle.context.now()).await);

    assert_eq!(LifecycleError::Validation(rule), error);
}

#[rstest]
#[tokio::test]
async fn only_the_owner_can_close(lifecycle: Lifecycle) {
    let id = lifecycle.create("Lunch?").await.topic.id;

    let error = rejected(
        lifecycle
            .service
            .close_topic(id, &email("other@x.com"), lifecycle.context.now())
            .await,
    );

    assert_eq!(LifecycleError::Forbidden, error);
    assert_eq!(Some(TopicStatus::Active), lifecycle.status_of(id).await);
}

#[rstest]
#[tokio::test]
async fn closing_twice_fails(lifecycle: Lifecycle) {
    let id = lifecycle.create("Lunch?").await.topic.id;
    let now = lifecycle.context.now();

    let closed = lifecycle.service.close_topic(id, &owner(), now).await.unwrap();
    assert_eq!(TopicState::Closed, closed.state);

    let error = rejected(lifecycle.service.close_topic(id, &owner(), now).await);
    assert_eq!(LifecycleError::AlreadyClosed, error);
}

#[rstest]
#[tokio::test]
async fn closing_unknown_topics_is_not_found(lifecycle: Lifecycle) {
    let error = rejected(
        lifecycle
            .service
            .close_topic(TopicId::new(), &owner(), lifecycle.context.now())
            .await,
    );

    assert_eq!(LifecycleError::NotFound, error);
}

#[rstest]
#[tokio::test]
async fn logical_delete_hides_from_list_but_keeps_the_row(lifecycle: Lifecycle) {
    let keep = lifecycle.create("Keep").await.topic.id;
    let drop = lifecycle.create("Drop").await.topic.id;

    let deleted = lifecycle
        .service
        .delete_topic(drop, &owner(), DeleteMode::Logical)
        .await
        .unwrap();

    assert!(deleted);
    let listed = lifecycle
        .service
        .list_topics(Pagination::default(), lifecycle.context.now())
        .await
        .unwrap()
        .into_iter()
        .map(|view| view.topic.id)
        .collect::<Vec<_>>();
    assert_eq!(vec![keep], listed);

    let found = lifecycle
        .service
        .get_topic(drop, lifecycle.context.now())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(TopicStatus::Deleted, found.topic.status);
    assert_eq!(TopicState::Deleted, found.state);
}

#[rstest]
#[tokio::test]
async fn physical_delete_removes_the_row(lifecycle: Lifecycle) {
    let id = lifecycle.create("Lunch?").await.topic.id;

    lifecycle
        .service
        .delete_topic(id, &owner(), DeleteMode::Physical)
        .await
        .unwrap();

    assert_eq!(None, lifecycle.status_of(id).await);
    assert!(lifecycle.context.sheet.snapshot(Table::Topics).await.is_empty());
}

#[rstest]
#[case::logical(DeleteMode::Logical)]
#[case::physical(DeleteMode::Physical)]
#[tokio::test]
async fn deleting_twice_is_not_found(lifecycle: Lifecycle, #[case] mode: DeleteMode) {
    let id = lifecycle.create("Lunch?").await.topic.id;
    lifecycle
        .service
        .delete_topic(id, &owner(), mode)
        .await
        .unwrap();

    let error = rejected(lifecycle.service.delete_topic(id, &owner(), mode).await);

    assert_eq!(LifecycleError::NotFound, error);
}

#[rstest]
#[tokio::test]
async fn only_the_owner_can_delete(lifecycle: Lifecycle) {
    let id = lifecycle.create("Lunch?").await.topic.id;

    let error = rejected(
        lifecycle
            .service
            .delete_topic(id, &email("other@x.com"), DeleteMode::Physical)
            .await,
    );

    assert_eq!(LifecycleError::Forbidden, error);
    assert_eq!(Some(TopicStatus::Active), lifecycle.status_of(id).await);
}

#[rstest]
#[case::logical(DeleteMode::Logical)]
#[case::physical(DeleteMode::Physical)]
#[tokio::test]
async fn duplicated_ids_are_never_deleted(lifecycle: Lifecycle, #[case] mode: DeleteMode) {
    let created = lifecycle.create("Lunch?").await.topic;
    lifecycle
        .context
        .sheet
        .seed(Table::Topics, [encode_topic(&created)])
        .await;
    let before = lifecycle.context.sheet.snapshot(Table::Topics).await;

    let error = rejected(lifecycle.service.delete_topic(created.id, &owner(), mode).await);

    assert_eq!(LifecycleError::AmbiguousRecords, error);
    assert_eq!(before, lifecycle.context.sheet.snapshot(Table::Topics).await);
}

#[rstest]
#[tokio::test]
async fn list_is_paginated(lifecycle: Lifecycle) {
    for title in ["One", "Two", "Three"] {
        lifecycle.create(title).await;
    }

    let page = lifecycle
        .service
        .list_topics(Pagination::with_page_size(2, 2), lifecycle.context.now())
        .await
        .unwrap();

    assert_eq!(
        vec!["Three"],
        page.iter()
            .map(|view| view.topic.title.as_str())
            .collect::<Vec<_>>()
    );
}

#[rstest]
#[tokio::test]
async fn finished_topics_are_the_owners_closed_or_expired_ones(lifecycle: Lifecycle) {
    let closed = lifecycle.create("Closed").await.topic.id;
    let expiring = lifecycle.create("Expiring").await.topic.id;
    let deleted = lifecycle.create("Deleted").await.topic.id;

    let mut open = draft();
    open.title = "Open".to_string();
    open.deadline = None;
    lifecycle
        .service
        .create_topic(open, lifecycle.context.now())
        .await
        .unwrap();

    let mut foreign = draft();
    foreign.title = "Foreign".to_string();
    foreign.owner_email = email("other@x.com");
    lifecycle
        .service
        .create_topic(foreign, lifecycle.context.now())
        .await
        .unwrap();

    let now = lifecycle.context.now();
    lifecycle.service.close_topic(closed, &owner(), now).await.unwrap();
    lifecycle.service.close_topic(deleted, &owner(), now).await.unwrap();
    lifecycle
        .service
        .delete_topic(deleted, &owner(), DeleteMode::Logical)
        .await
        .unwrap();
    lifecycle.context.clock.advance(TimeDelta::days(2));

    let finished = lifecycle
        .service
        .list_finished_for_owner(&owner(), lifecycle.context.now())
        .await
        .unwrap()
        .into_iter()
        .map(|view| (view.topic.id, view.state))
        .collect::<Vec<_>>();

    assert_eq!(
        vec![(closed, TopicState::Closed), (expiring, TopicState::Expired)],
        finished
    );
}
