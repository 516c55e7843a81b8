use crate::error::{LifecycleError, VoteError};
use crate::metrics;
use crate::service::{TopicService, VoteService};
use crate::state::VotingAppState;
use crate::user::ActingUser;
use axum::middleware;
use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response, Result},
    routing::{get, post},
};
use engine::Pagination;
use engine::error::{EndpointError, ErrorBody};
use engine::stream::StreamingResponse;
use error_stack::Report;
use requests::{CastVoteRequest, CreateTopicRequest, DeleteParams};
use responses::{TallyResponse, TopicError, TopicResponse, VoteResponse, VoteStatusResponse};
use tracing::{info, instrument};
use utoipa::OpenApi;
use utoipa_axum::router::OpenApiRouter;
use utoipa_swagger_ui::SwaggerUi;
use voting_core::VotingEngine;
use voting_core::model::{TopicId, TopicView};

mod requests;
mod responses;

const TOPIC_ROOT_PATH: &str = "/topics";

#[derive(OpenApi)]
#[openapi(
    nest(
        (path = TOPIC_ROOT_PATH, api = TopicDocs),
    )
)]
struct ApiDoc;

#[derive(OpenApi)]
#[openapi(paths(
    list_topics,
    list_finished_topics,
    get_topic,
    create_topic,
    close_topic,
    delete_topic,
    cast_vote,
    my_vote_status,
    tally,
))]
struct TopicDocs;

const TOPIC_LIST_PATH: &str = "/";
const TOPIC_FINISHED_PATH: &str = "/finished";
const TOPIC_GET_PATH: &str = "/{topic_id}";
const TOPIC_CREATE_PATH: &str = "/";
const TOPIC_CLOSE_PATH: &str = "/{topic_id}/close";
const TOPIC_DELETE_PATH: &str = "/{topic_id}";
const VOTE_CAST_PATH: &str = "/{topic_id}/votes";
const VOTE_STATUS_PATH: &str = "/{topic_id}/votes/me";
const TALLY_PATH: &str = "/{topic_id}/tally";

pub fn build<E: VotingEngine>(app_state: VotingAppState<E>) -> Router {
    let (router, api) = OpenApiRouter::with_openapi(ApiDoc::openapi())
        .merge(routes(app_state))
        .split_for_parts();

    router.merge(SwaggerUi::new("/topics/swagger-ui").url("/topics/api-docs/openapi.json", api))
}

fn routes<S, E: VotingEngine>(app_state: VotingAppState<E>) -> OpenApiRouter<S> {
    let main_router = OpenApiRouter::new()
        .route(TOPIC_LIST_PATH, get(list_topics::<E>).post(create_topic::<E>))
        .route(TOPIC_FINISHED_PATH, get(list_finished_topics::<E>))
        .route(TOPIC_GET_PATH, get(get_topic::<E>).delete(delete_topic::<E>))
        .route(TOPIC_CLOSE_PATH, post(close_topic::<E>))
        .route(VOTE_CAST_PATH, post(cast_vote::<E>))
        .route(VOTE_STATUS_PATH, get(my_vote_status::<E>))
        .route(TALLY_PATH, get(tally::<E>));

    let router = match app_state.metrics.clone() {
        Some(metrics_recorder) => {
            info!("metrics enabled, setting up metrics handler");
            main_router
                .route("/metrics", get(|| async move { metrics_recorder.render() }))
                .route_layer(middleware::from_fn(metrics::track_http))
        }
        None => {
            info!("metrics not enabled, setting up service unavailable metrics handler");
            main_router.route(
                "/metrics",
                get(|| async {
                    (
                        StatusCode::SERVICE_UNAVAILABLE,
                        "Metrics endpoint is disabled. Metrics must be enabled and the service restarted",
                    )
                }),
            )
        }
    };

    OpenApiRouter::new()
        .nest(TOPIC_ROOT_PATH, router)
        .with_state(app_state)
}

/// List the topics that have not been deleted, in the order they were created.
#[utoipa::path(
    get,
    path = TOPIC_LIST_PATH,
    responses(
        (status = OK, description = "Topics were found on the given page", body = Vec<TopicView>),
        (status = NO_CONTENT, description = "No topics exist on the given page"),
        (status = SERVICE_UNAVAILABLE, description = "Topic storage could not be reached", body = ErrorBody),
    ),
    params(
        ("page" = u32, Query, description = "The page to return, starting at 1"),
        ("page_size" = u32, Query, description = "The max number of topics to return"),
    )
)]
#[instrument(skip(service), err(Debug), fields(req.page = pagination.page, req.page_size = pagination.page_size))]
pub async fn list_topics<E: VotingEngine>(
    State(service): State<TopicService<E>>,
    Query(pagination): Query<Pagination>,
) -> Result<Response, EndpointError<LifecycleError>> {
    let topics = service.list_topics(pagination, service.now()).await?;

    let res = if topics.is_empty() {
        StatusCode::NO_CONTENT.into_response()
    } else {
        StreamingResponse::ok(topics).into_response()
    };
    Ok(res)
}

/// List the acting user's own topics that are closed or past their deadline.
#[utoipa::path(
    get,
    path = TOPIC_FINISHED_PATH,
    responses(
        (status = OK, description = "The finished topics owned by the acting user", body = Vec<TopicView>),
        (status = UNAUTHORIZED, description = "No acting user was given", body = ErrorBody),
    ),
    params(
        ("x-user-email" = String, Header, description = "Email of the acting user"),
    )
)]
#[instrument(skip(service), err(Debug))]
pub async fn list_finished_topics<E: VotingEngine>(
    State(service): State<TopicService<E>>,
    ActingUser(user): ActingUser,
) -> Result<Response, EndpointError<LifecycleError>> {
    let topics = service
        .list_finished_for_owner(&user, service.now())
        .await?;
    Ok(StreamingResponse::ok(topics).into_response())
}

/// Get the topic associated with the given id. Deleted topics are returned too.
#[utoipa::path(
    get,
    path = TOPIC_GET_PATH,
    responses(
        (status = OK, description = "A topic was found that matched the given id", body = TopicView),
        (status = NOT_FOUND, description = "No topic with the given id exists", body = ErrorBody),
    ),
    params(
        ("topic_id" = TopicId, Path, description = "The id of the topic to find"),
    )
)]
#[instrument(skip(service), err(Debug))]
pub async fn get_topic<E: VotingEngine>(
    State(service): State<TopicService<E>>,
    Path(topic_id): Path<TopicId>,
) -> Result<Response, EndpointError<LifecycleError>> {
    let topic = service.get_topic(topic_id, service.now()).await?;

    Ok(topic
        .map(|t| TopicResponse::ok(t).into_response())
        .unwrap_or_else(|| TopicError::not_found().into_response()))
}

/// Create a new topic owned by the acting user.
#[utoipa::path(
    post,
    path = TOPIC_CREATE_PATH,
    responses(
        (status = CREATED, description = "The topic was created", body = TopicView),
        (status = UNPROCESSABLE_ENTITY, description = "The topic breaks one of the creation rules", body = ErrorBody),
        (status = UNAUTHORIZED, description = "No acting user was given", body = ErrorBody),
    ),
    params(
        ("x-user-email" = String, Header, description = "Email of the acting user"),
    ),
    request_body = CreateTopicRequest
)]
#[instrument(skip_all, err(Debug), fields(req.title = %topic.title, req.owner = %user))]
async fn create_topic<E: VotingEngine>(
    State(service): State<TopicService<E>>,
    ActingUser(user): ActingUser,
    Json(topic): Json<CreateTopicRequest>,
) -> Result<Response, EndpointError<LifecycleError>> {
    let draft = topic
        .into_draft(user)
        .map_err(|rule| Report::new(LifecycleError::Validation(rule)))?;

    let created = service.create_topic(draft, service.now()).await?;
    Ok(TopicResponse::created(created).into_response())
}

/// Stop accepting votes on a topic. Only its owner may do this.
#[utoipa::path(
    post,
    path = TOPIC_CLOSE_PATH,
    responses(
        (status = OK, description = "The topic is now closed", body = TopicView),
        (status = FORBIDDEN, description = "The acting user does not own the topic", body = ErrorBody),
        (status = NOT_FOUND, description = "No topic with the given id exists", body = ErrorBody),
        (status = CONFLICT, description = "The topic is already closed or deleted", body = ErrorBody),
    ),
    params(
        ("topic_id" = TopicId, Path, description = "The id of the topic to close"),
        ("x-user-email" = String, Header, description = "Email of the acting user"),
    )
)]
#[instrument(skip(service), err(Debug))]
pub async fn close_topic<E: VotingEngine>(
    State(service): State<TopicService<E>>,
    Path(topic_id): Path<TopicId>,
    ActingUser(user): ActingUser,
) -> Result<Response, EndpointError<LifecycleError>> {
    let closed = service.close_topic(topic_id, &user, service.now()).await?;
    Ok(TopicResponse::ok(closed).into_response())
}

/// Delete a topic. Only its owner may do this.
#[utoipa::path(
    delete,
    path = TOPIC_DELETE_PATH,
    responses(
        (status = NO_CONTENT, description = "The topic was deleted"),
        (status = FORBIDDEN, description = "The acting user does not own the topic", body = ErrorBody),
        (status = NOT_FOUND, description = "No topic with the given id exists, or it was already deleted", body = ErrorBody),
        (status = CONFLICT, description = "More than one stored topic carries the id, nothing was deleted", body = ErrorBody),
    ),
    params(
        ("topic_id" = TopicId, Path, description = "The id of the topic to delete"),
        ("x-user-email" = String, Header, description = "Email of the acting user"),
        DeleteParams,
    )
)]
#[instrument(skip(service, params), err(Debug), fields(req.physical = params.physical))]
pub async fn delete_topic<E: VotingEngine>(
    State(service): State<TopicService<E>>,
    Path(topic_id): Path<TopicId>,
    ActingUser(user): ActingUser,
    Query(params): Query<DeleteParams>,
) -> Result<Response, EndpointError<LifecycleError>> {
    service.delete_topic(topic_id, &user, params.mode()).await?;
    Ok(StatusCode::NO_CONTENT.into_response())
}

/// Cast the acting user's vote on a topic.
#[utoipa::path(
    post,
    path = VOTE_CAST_PATH,
    responses(
        (status = CREATED, description = "The vote was recorded", body = voting_core::model::Vote),
        (status = NOT_FOUND, description = "No topic with the given id exists", body = ErrorBody),
        (status = CONFLICT, description = "The topic is not accepting votes, or the user already voted", body = ErrorBody),
        (status = UNPROCESSABLE_ENTITY, description = "The answer does not fit the topic", body = ErrorBody),
    ),
    params(
        ("topic_id" = TopicId, Path, description = "The id of the topic to vote on"),
        ("x-user-email" = String, Header, description = "Email of the acting user"),
    ),
    request_body = CastVoteRequest
)]
#[instrument(skip(service, vote), err(Debug))]
pub async fn cast_vote<E: VotingEngine>(
    State(service): State<VoteService<E>>,
    Path(topic_id): Path<TopicId>,
    ActingUser(user): ActingUser,
    Json(vote): Json<CastVoteRequest>,
) -> Result<Response, EndpointError<VoteError>> {
    let vote = service
        .cast_vote(topic_id, user, &vote.answer, service.now())
        .await?;
    Ok(VoteResponse::new(vote).into_response())
}

/// Whether the acting user has already voted on a topic.
#[utoipa::path(
    get,
    path = VOTE_STATUS_PATH,
    responses(
        (status = OK, description = "Whether a vote exists", body = VoteStatusResponse),
        (status = NOT_FOUND, description = "No topic with the given id exists", body = ErrorBody),
    ),
    params(
        ("topic_id" = TopicId, Path, description = "The id of the topic"),
        ("x-user-email" = String, Header, description = "Email of the acting user"),
    )
)]
#[instrument(skip(service), err(Debug))]
pub async fn my_vote_status<E: VotingEngine>(
    State(service): State<VoteService<E>>,
    Path(topic_id): Path<TopicId>,
    ActingUser(user): ActingUser,
) -> Result<Response, EndpointError<VoteError>> {
    let voted = service.has_voted(topic_id, &user).await?;
    Ok(Json(VoteStatusResponse { voted }).into_response())
}

/// Count the votes cast on a topic.
#[utoipa::path(
    get,
    path = TALLY_PATH,
    responses(
        (status = OK, description = "Vote counts per answer", body = TallyResponse),
        (status = NOT_FOUND, description = "No topic with the given id exists", body = ErrorBody),
    ),
    params(
        ("topic_id" = TopicId, Path, description = "The id of the topic"),
    )
)]
#[instrument(skip(service), err(Debug))]
pub async fn tally<E: VotingEngine>(
    State(service): State<VoteService<E>>,
    Path(topic_id): Path<TopicId>,
) -> Result<Response, EndpointError<VoteError>> {
    let now = service.now();
    let (topic, tally) = service.tally(topic_id).await?;
    let state = topic.state(now);
    Ok(TallyResponse::new(topic, state, tally).into_response())
}
