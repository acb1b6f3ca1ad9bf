use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{delete, get, post, put},
    Router,
};
use serde::Deserialize;
use serde_json::json;

use super::catalog::{CatalogError, CatalogService, CatalogStore, NewAchievement, NewBadge};
use super::domain::UserId;
use super::identity::{IdentityError, IdentityProvider, AUTH_HEADER};
use super::repository::{RepositoryError, ReviewRepository, UserRepository};
use super::service::{ReviewService, ReviewServiceError};

/// Shared handler state: review workflow, catalog administration and identity lookup.
pub struct ReviewApi<U, R, C> {
    pub reviews: Arc<ReviewService<U, R, C>>,
    pub catalog: Arc<CatalogService<C>>,
    pub identity: Arc<dyn IdentityProvider>,
}

impl<U, R, C> Clone for ReviewApi<U, R, C> {
    fn clone(&self) -> Self {
        Self {
            reviews: self.reviews.clone(),
            catalog: self.catalog.clone(),
            identity: self.identity.clone(),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitReviewRequest {
    #[serde(default)]
    pub review_text: String,
}

#[derive(Debug, Deserialize)]
pub struct CommentRequest {
    #[serde(default)]
    pub text: String,
}

/// Router builder exposing review, leaderboard and catalog endpoints.
pub fn review_router<U, R, C>(api: ReviewApi<U, R, C>) -> Router
where
    U: UserRepository + 'static,
    R: ReviewRepository + 'static,
    C: CatalogStore + 'static,
{
    Router::new()
        .route("/api/reviews", get(list_reviews_handler::<U, R, C>))
        .route("/api/reviews/add/:user_id", post(submit_handler::<U, R, C>))
        .route("/api/reviews/received", get(received_handler::<U, R, C>))
        .route("/api/reviews/added", get(added_handler::<U, R, C>))
        .route("/api/reviews/:review_id", get(review_handler::<U, R, C>))
        .route("/api/reviews/like/:review_id", put(like_handler::<U, R, C>))
        .route("/api/reviews/unlike/:review_id", put(unlike_handler::<U, R, C>))
        .route("/api/reviews/comment/:review_id", post(comment_handler::<U, R, C>))
        .route(
            "/api/reviews/comment/:review_id/:comment_id",
            delete(delete_comment_handler::<U, R, C>),
        )
        .route("/api/leaderboard", get(leaderboard_handler::<U, R, C>))
        .route("/api/users/:user_id/achievements", get(user_achievements_handler::<U, R, C>))
        .route("/api/users/:user_id/badges", get(user_badges_handler::<U, R, C>))
        .route(
            "/api/achievements",
            get(list_achievements_handler::<U, R, C>).post(create_achievement_handler::<U, R, C>),
        )
        .route(
            "/api/badges",
            get(list_badges_handler::<U, R, C>).post(create_badge_handler::<U, R, C>),
        )
        .with_state(api)
}

fn authenticate<U, R, C>(
    api: &ReviewApi<U, R, C>,
    headers: &HeaderMap,
) -> Result<UserId, Response> {
    let credential = headers
        .get(AUTH_HEADER)
        .and_then(|value| value.to_str().ok())
        .unwrap_or_default();

    api.identity.identify(credential).map_err(|error| {
        let status = match error {
            IdentityError::Unavailable(_) => {
                tracing::error!(error = %error, "session lookup failed");
                StatusCode::INTERNAL_SERVER_ERROR
            }
            IdentityError::MissingCredential | IdentityError::InvalidCredential => {
                StatusCode::UNAUTHORIZED
            }
        };
        let payload = json!({ "error": error.to_string() });
        (status, axum::Json(payload)).into_response()
    })
}

pub(crate) fn service_error_response(error: ReviewServiceError) -> Response {
    let status = match &error {
        ReviewServiceError::Validation(_) => StatusCode::BAD_REQUEST,
        ReviewServiceError::NotFound(_) => StatusCode::NOT_FOUND,
        ReviewServiceError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
        ReviewServiceError::Persistence(RepositoryError::Conflict(_)) => StatusCode::CONFLICT,
        ReviewServiceError::Persistence(RepositoryError::NotFound) => StatusCode::NOT_FOUND,
        ReviewServiceError::Persistence(_)
        | ReviewServiceError::Award(_)
        | ReviewServiceError::Catalog(_)
        | ReviewServiceError::PartiallyApplied { .. } => StatusCode::INTERNAL_SERVER_ERROR,
    };

    if status.is_server_error() {
        tracing::error!(error = %error, "review request failed");
    }

    let payload = match &error {
        ReviewServiceError::PartiallyApplied {
            review_id, stage, ..
        } => json!({
            "error": error.to_string(),
            "review_id": review_id,
            "stage": stage,
        }),
        _ => json!({ "error": error.to_string() }),
    };
    (status, axum::Json(payload)).into_response()
}

pub(crate) fn catalog_error_response(error: CatalogError) -> Response {
    let status = match &error {
        CatalogError::Invalid(_) | CatalogError::UnknownBadge(_) => StatusCode::BAD_REQUEST,
        CatalogError::DuplicateName { .. } => StatusCode::CONFLICT,
        CatalogError::Unavailable(_) => StatusCode::INTERNAL_SERVER_ERROR,
    };
    let payload = json!({ "error": error.to_string() });
    (status, axum::Json(payload)).into_response()
}

fn respond<T, E>(result: Result<T, E>, on_error: fn(E) -> Response) -> Response
where
    T: serde::Serialize,
{
    match result {
        Ok(body) => (StatusCode::OK, axum::Json(body)).into_response(),
        Err(error) => on_error(error),
    }
}

pub(crate) async fn submit_handler<U, R, C>(
    State(api): State<ReviewApi<U, R, C>>,
    Path(user_id): Path<String>,
    headers: HeaderMap,
    axum::Json(request): axum::Json<SubmitReviewRequest>,
) -> Response
where
    U: UserRepository + 'static,
    R: ReviewRepository + 'static,
    C: CatalogStore + 'static,
{
    let reviewer = match authenticate(&api, &headers) {
        Ok(user) => user,
        Err(response) => return response,
    };
    respond(
        api.reviews
            .submit_review(&reviewer, &user_id, &request.review_text),
        service_error_response,
    )
}

pub(crate) async fn list_reviews_handler<U, R, C>(
    State(api): State<ReviewApi<U, R, C>>,
    headers: HeaderMap,
) -> Response
where
    U: UserRepository + 'static,
    R: ReviewRepository + 'static,
    C: CatalogStore + 'static,
{
    if let Err(response) = authenticate(&api, &headers) {
        return response;
    }
    respond(api.reviews.list_reviews(), service_error_response)
}

pub(crate) async fn received_handler<U, R, C>(
    State(api): State<ReviewApi<U, R, C>>,
    headers: HeaderMap,
) -> Response
where
    U: UserRepository + 'static,
    R: ReviewRepository + 'static,
    C: CatalogStore + 'static,
{
    match authenticate(&api, &headers) {
        Ok(user) => respond(api.reviews.reviews_received(&user), service_error_response),
        Err(response) => response,
    }
}

pub(crate) async fn added_handler<U, R, C>(
    State(api): State<ReviewApi<U, R, C>>,
    headers: HeaderMap,
) -> Response
where
    U: UserRepository + 'static,
    R: ReviewRepository + 'static,
    C: CatalogStore + 'static,
{
    match authenticate(&api, &headers) {
        Ok(user) => respond(api.reviews.reviews_added(&user), service_error_response),
        Err(response) => response,
    }
}

pub(crate) async fn review_handler<U, R, C>(
    State(api): State<ReviewApi<U, R, C>>,
    Path(review_id): Path<String>,
    headers: HeaderMap,
) -> Response
where
    U: UserRepository + 'static,
    R: ReviewRepository + 'static,
    C: CatalogStore + 'static,
{
    if let Err(response) = authenticate(&api, &headers) {
        return response;
    }
    respond(api.reviews.get_review(&review_id), service_error_response)
}

pub(crate) async fn like_handler<U, R, C>(
    State(api): State<ReviewApi<U, R, C>>,
    Path(review_id): Path<String>,
    headers: HeaderMap,
) -> Response
where
    U: UserRepository + 'static,
    R: ReviewRepository + 'static,
    C: CatalogStore + 'static,
{
    match authenticate(&api, &headers) {
        Ok(user) => respond(api.reviews.like(&review_id, &user), service_error_response),
        Err(response) => response,
    }
}

pub(crate) async fn unlike_handler<U, R, C>(
    State(api): State<ReviewApi<U, R, C>>,
    Path(review_id): Path<String>,
    headers: HeaderMap,
) -> Response
where
    U: UserRepository + 'static,
    R: ReviewRepository + 'static,
    C: CatalogStore + 'static,
{
    match authenticate(&api, &headers) {
        Ok(user) => respond(api.reviews.unlike(&review_id, &user), service_error_response),
        Err(response) => response,
    }
}

pub(crate) async fn comment_handler<U, R, C>(
    State(api): State<ReviewApi<U, R, C>>,
    Path(review_id): Path<String>,
    headers: HeaderMap,
    axum::Json(request): axum::Json<CommentRequest>,
) -> Response
where
    U: UserRepository + 'static,
    R: ReviewRepository + 'static,
    C: CatalogStore + 'static,
{
    match authenticate(&api, &headers) {
        Ok(user) => respond(
            api.reviews.add_comment(&review_id, &user, &request.text),
            service_error_response,
        ),
        Err(response) => response,
    }
}

pub(crate) async fn delete_comment_handler<U, R, C>(
    State(api): State<ReviewApi<U, R, C>>,
    Path((review_id, comment_id)): Path<(String, String)>,
    headers: HeaderMap,
) -> Response
where
    U: UserRepository + 'static,
    R: ReviewRepository + 'static,
    C: CatalogStore + 'static,
{
    match authenticate(&api, &headers) {
        Ok(user) => respond(
            api.reviews.delete_comment(&review_id, &comment_id, &user),
            service_error_response,
        ),
        Err(response) => response,
    }
}

pub(crate) async fn leaderboard_handler<U, R, C>(
    State(api): State<ReviewApi<U, R, C>>,
    headers: HeaderMap,
) -> Response
where
    U: UserRepository + 'static,
    R: ReviewRepository + 'static,
    C: CatalogStore + 'static,
{
    if let Err(response) = authenticate(&api, &headers) {
        return response;
    }
    respond(api.reviews.leaderboard(), service_error_response)
}

pub(crate) async fn user_achievements_handler<U, R, C>(
    State(api): State<ReviewApi<U, R, C>>,
    Path(user_id): Path<String>,
    headers: HeaderMap,
) -> Response
where
    U: UserRepository + 'static,
    R: ReviewRepository + 'static,
    C: CatalogStore + 'static,
{
    if let Err(response) = authenticate(&api, &headers) {
        return response;
    }
    respond(api.reviews.user_achievements(&user_id), service_error_response)
}

pub(crate) async fn user_badges_handler<U, R, C>(
    State(api): State<ReviewApi<U, R, C>>,
    Path(user_id): Path<String>,
    headers: HeaderMap,
) -> Response
where
    U: UserRepository + 'static,
    R: ReviewRepository + 'static,
    C: CatalogStore + 'static,
{
    if let Err(response) = authenticate(&api, &headers) {
        return response;
    }
    respond(api.reviews.user_badges(&user_id), service_error_response)
}

pub(crate) async fn list_achievements_handler<U, R, C>(
    State(api): State<ReviewApi<U, R, C>>,
    headers: HeaderMap,
) -> Response
where
    U: UserRepository + 'static,
    R: ReviewRepository + 'static,
    C: CatalogStore + 'static,
{
    if let Err(response) = authenticate(&api, &headers) {
        return response;
    }
    respond(api.catalog.list_achievements(), catalog_error_response)
}

pub(crate) async fn create_achievement_handler<U, R, C>(
    State(api): State<ReviewApi<U, R, C>>,
    headers: HeaderMap,
    axum::Json(payload): axum::Json<NewAchievement>,
) -> Response
where
    U: UserRepository + 'static,
    R: ReviewRepository + 'static,
    C: CatalogStore + 'static,
{
    if let Err(response) = authenticate(&api, &headers) {
        return response;
    }
    match api.catalog.create_achievement(payload) {
        Ok(achievement) => (StatusCode::CREATED, axum::Json(achievement)).into_response(),
        Err(error) => catalog_error_response(error),
    }
}

pub(crate) async fn list_badges_handler<U, R, C>(
    State(api): State<ReviewApi<U, R, C>>,
    headers: HeaderMap,
) -> Response
where
    U: UserRepository + 'static,
    R: ReviewRepository + 'static,
    C: CatalogStore + 'static,
{
    if let Err(response) = authenticate(&api, &headers) {
        return response;
    }
    respond(api.catalog.list_badges(), catalog_error_response)
}

pub(crate) async fn create_badge_handler<U, R, C>(
    State(api): State<ReviewApi<U, R, C>>,
    headers: HeaderMap,
    axum::Json(payload): axum::Json<NewBadge>,
) -> Response
where
    U: UserRepository + 'static,
    R: ReviewRepository + 'static,
    C: CatalogStore + 'static,
{
    if let Err(response) = authenticate(&api, &headers) {
        return response;
    }
    match api.catalog.create_badge(payload) {
        Ok(badge) => (StatusCode::CREATED, axum::Json(badge)).into_response(),
        Err(error) => catalog_error_response(error),
    }
}
