//! HTTP handlers for the events API

use crate::error::EventError;
use crate::models::{
    AddComment, Comment, CommentPage, DeleteAck, DeleteCommentQuery, Event, EventFilter,
    InsertAck, JoinRequest, JoinResponse, JoinedEventsQuery, UpdateAck,
};
use crate::repository::EventRepository;
use crate::service::EventService;
use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{delete, get, patch};
use axum::{Json, Router};
use axum_helpers::{AppError, ErrorResponse, ObjectIdPath, ValidatedJson, ValidatedQuery};
use serde_json::{Map, Value};
use std::sync::Arc;
use tracing::instrument;

/// Events router state
pub type EventsState<R> = Arc<EventService<R>>;

/// Routes for events, membership and comments
pub fn events_router<R: EventRepository + 'static>() -> Router<EventsState<R>> {
    Router::new()
        .route("/events", get(list_events::<R>).post(create_event::<R>))
        .route(
            "/events/{id}",
            get(get_event::<R>)
                .put(update_event::<R>)
                .delete(delete_event::<R>),
        )
        .route(
            "/events/{id}/comments",
            get(list_comments::<R>).post(add_comment::<R>),
        )
        .route("/comments/{commentId}", delete(delete_comment::<R>))
        .route("/join-event", patch(toggle_join::<R>))
        .route("/joined-events", get(joined_events::<R>))
}

/// Create an event
#[utoipa::path(
    post,
    path = "/events",
    request_body(content = Event, description = "Event attributes; `_id` and `joinedUsers` are ignored"),
    responses(
        (status = 200, description = "Event stored with no members", body = InsertAck),
        (status = 400, description = "Malformed JSON", body = ErrorResponse),
        (status = 500, description = "Store failure", body = ErrorResponse)
    ),
    tag = "events"
)]
#[instrument(skip(state, payload))]
pub async fn create_event<R: EventRepository>(
    State(state): State<EventsState<R>>,
    payload: Result<Json<Map<String, Value>>, JsonRejection>,
) -> Result<Json<InsertAck>, AppError> {
    let Json(body) = payload?;
    let ack = state.create_event(body).await?;
    Ok(Json(ack))
}

/// List events, optionally by author email
#[utoipa::path(
    get,
    path = "/events",
    params(EventFilter),
    responses(
        (status = 200, description = "Matching events", body = Vec<Event>),
        (status = 500, description = "Store failure", body = ErrorResponse)
    ),
    tag = "events"
)]
#[instrument(skip(state))]
pub async fn list_events<R: EventRepository>(
    State(state): State<EventsState<R>>,
    query: Result<Query<EventFilter>, QueryRejection>,
) -> Result<Json<Vec<Event>>, AppError> {
    let Query(filter) = query?;
    let events = state.list_events(&filter).await?;
    Ok(Json(events))
}

/// Get event by ID
#[utoipa::path(
    get,
    path = "/events/{id}",
    params(("id" = String, Path, description = "Event ObjectId")),
    responses(
        (status = 200, description = "Event found", body = Event),
        (status = 400, description = "Invalid ID format", body = ErrorResponse),
        (status = 404, description = "Event not found", body = ErrorResponse)
    ),
    tag = "events"
)]
#[instrument(skip(state, id), fields(event_id = %id.0))]
pub async fn get_event<R: EventRepository>(
    State(state): State<EventsState<R>>,
    id: ObjectIdPath,
) -> Result<Json<Event>, EventError> {
    let event = state.get_event(id.0).await?;
    Ok(Json(event))
}

/// Update event fields
#[utoipa::path(
    put,
    path = "/events/{id}",
    params(("id" = String, Path, description = "Event ObjectId")),
    request_body(content = Event, description = "Fields to set; `_id` and `joinedUsers` are ignored"),
    responses(
        (status = 200, description = "Update result", body = UpdateAck),
        (status = 400, description = "Invalid ID or empty update", body = ErrorResponse),
        (status = 500, description = "Store failure", body = ErrorResponse)
    ),
    tag = "events"
)]
#[instrument(skip(state, id, payload), fields(event_id = %id.0))]
pub async fn update_event<R: EventRepository>(
    State(state): State<EventsState<R>>,
    id: ObjectIdPath,
    payload: Result<Json<Map<String, Value>>, JsonRejection>,
) -> Result<Json<UpdateAck>, AppError> {
    let Json(body) = payload?;
    let ack = state.update_event(id.0, body).await?;
    Ok(Json(ack))
}

/// Delete event by ID
#[utoipa::path(
    delete,
    path = "/events/{id}",
    params(("id" = String, Path, description = "Event ObjectId")),
    responses(
        (status = 200, description = "Delete result, deletedCount may be 0", body = DeleteAck),
        (status = 400, description = "Invalid ID format", body = ErrorResponse)
    ),
    tag = "events"
)]
#[instrument(skip(state, id), fields(event_id = %id.0))]
pub async fn delete_event<R: EventRepository>(
    State(state): State<EventsState<R>>,
    id: ObjectIdPath,
) -> Result<Json<DeleteAck>, EventError> {
    let ack = state.delete_event(id.0).await?;
    Ok(Json(ack))
}

/// Join the event, or leave it if already joined
#[utoipa::path(
    patch,
    path = "/join-event",
    request_body = JoinRequest,
    responses(
        (status = 200, description = "Membership toggled", body = JoinResponse),
        (status = 400, description = "Missing field or invalid eventId", body = ErrorResponse),
        (status = 404, description = "Event not found", body = JoinResponse)
    ),
    tag = "events"
)]
#[instrument(skip(state, request))]
pub async fn toggle_join<R: EventRepository>(
    State(state): State<EventsState<R>>,
    ValidatedJson(request): ValidatedJson<JoinRequest>,
) -> Response {
    match state.toggle_join(request).await {
        Ok(response) => Json(response).into_response(),
        Err(EventError::EventNotFound) => {
            (StatusCode::NOT_FOUND, Json(JoinResponse::event_not_found())).into_response()
        }
        Err(e) => e.into_response(),
    }
}

/// Events a user has joined
#[utoipa::path(
    get,
    path = "/joined-events",
    params(JoinedEventsQuery),
    responses(
        (status = 200, description = "Joined events", body = Vec<Event>),
        (status = 400, description = "email is required", body = ErrorResponse)
    ),
    tag = "events"
)]
#[instrument(skip(state, query))]
pub async fn joined_events<R: EventRepository>(
    State(state): State<EventsState<R>>,
    query: Result<Query<JoinedEventsQuery>, QueryRejection>,
) -> Result<Json<Vec<Event>>, AppError> {
    let Query(query) = query?;
    let events = state.list_joined(query.email.as_deref()).await?;
    Ok(Json(events))
}

/// Add a comment to an event
#[utoipa::path(
    post,
    path = "/events/{id}/comments",
    params(("id" = String, Path, description = "Event ObjectId")),
    request_body = AddComment,
    responses(
        (status = 200, description = "Comment stored", body = InsertAck),
        (status = 400, description = "Invalid ID or missing field", body = ErrorResponse)
    ),
    tag = "comments"
)]
#[instrument(skip(state, id, input), fields(event_id = %id.0))]
pub async fn add_comment<R: EventRepository>(
    State(state): State<EventsState<R>>,
    id: ObjectIdPath,
    ValidatedJson(input): ValidatedJson<AddComment>,
) -> Result<Json<InsertAck>, EventError> {
    let ack = state.add_comment(id.0, input).await?;
    Ok(Json(ack))
}

/// List an event's comments, newest first
#[utoipa::path(
    get,
    path = "/events/{id}/comments",
    params(("id" = String, Path, description = "Event ObjectId"), CommentPage),
    responses(
        (status = 200, description = "One page of comments", body = Vec<Comment>),
        (status = 400, description = "Invalid ID or paging", body = ErrorResponse)
    ),
    tag = "comments"
)]
#[instrument(skip(state, id), fields(event_id = %id.0))]
pub async fn list_comments<R: EventRepository>(
    State(state): State<EventsState<R>>,
    id: ObjectIdPath,
    ValidatedQuery(page): ValidatedQuery<CommentPage>,
) -> Result<Json<Vec<Comment>>, EventError> {
    let comments = state.list_comments(id.0, page).await?;
    Ok(Json(comments))
}

/// Delete a comment as its author
#[utoipa::path(
    delete,
    path = "/comments/{commentId}",
    params(("commentId" = String, Path, description = "Comment ObjectId"), DeleteCommentQuery),
    responses(
        (status = 200, description = "Comment deleted", body = DeleteAck),
        (status = 400, description = "Invalid ID format", body = ErrorResponse),
        (status = 403, description = "Requester is not the author", body = ErrorResponse),
        (status = 404, description = "Comment not found", body = ErrorResponse)
    ),
    tag = "comments"
)]
#[instrument(skip(state, id, query), fields(comment_id = %id.0))]
pub async fn delete_comment<R: EventRepository>(
    State(state): State<EventsState<R>>,
    id: ObjectIdPath,
    query: Result<Query<DeleteCommentQuery>, QueryRejection>,
) -> Result<Json<DeleteAck>, AppError> {
    let Query(query) = query?;
    let ack = state.delete_comment(id.0, query.email.as_deref()).await?;
    Ok(Json(ack))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::CommentAuthor;
    use crate::repository::MockEventRepository;
    use axum::body::Body;
    use axum::http::{Method, Request};
    use chrono::{TimeZone, Utc};
    use http_body_util::BodyExt;
    use mongodb::bson::oid::ObjectId;
    use serde_json::json;
    use std::collections::BTreeMap;
    use tower::ServiceExt;

    const EVENT_ID: &str = "65f1a2b3c4d5e6f708192a3b";

    fn app(mock: MockEventRepository) -> Router {
        events_router().with_state(Arc::new(EventService::new(mock)))
    }

    async fn send(app: Router, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        let builder = Request::builder().method(method).uri(uri);
        let request = match body {
            Some(json) => builder
                .header("content-type", "application/json")
                .body(Body::from(json.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let response = app.oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let json = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, json)
    }

    fn event(id: &str, title: &str) -> Event {
        let mut fields = BTreeMap::new();
        fields.insert("title".to_string(), json!(title));
        fields.insert("author".to_string(), json!({ "email": "a@x.com" }));
        Event {
            id: id.to_string(),
            joined_users: vec![],
            fields,
        }
    }

    fn db_error() -> EventError {
        EventError::Database(std::io::Error::other("no primary").into())
    }

    #[tokio::test]
    async fn test_create_event_returns_insert_ack() {
        let mut mock = MockEventRepository::new();
        mock.expect_insert_event().returning(|_| {
            Ok(InsertAck {
                acknowledged: true,
                inserted_id: EVENT_ID.to_string(),
            })
        });

        let (status, body) = send(
            app(mock),
            Method::POST,
            "/events",
            Some(json!({ "title": "X", "author": { "email": "a@x.com" } })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({ "acknowledged": true, "insertedId": EVENT_ID }));
    }

    #[tokio::test]
    async fn test_create_event_store_failure() {
        let mut mock = MockEventRepository::new();
        mock.expect_insert_event().returning(|_| Err(db_error()));

        let (status, body) = send(app(mock), Method::POST, "/events", Some(json!({ "title": "X" }))).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body, json!({ "error": "Failed to create event" }));
    }

    #[tokio::test]
    async fn test_create_event_rejects_non_object_body() {
        let mut mock = MockEventRepository::new();
        mock.expect_insert_event().never();

        let (status, body) = send(app(mock), Method::POST, "/events", Some(json!([1, 2]))).await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert!(body["error"].is_string());
    }

    #[tokio::test]
    async fn test_list_events_passes_author_filter() {
        let mut mock = MockEventRepository::new();
        mock.expect_list_events()
            .withf(|filter| filter.author.as_deref() == Some("a@x.com"))
            .returning(|_| Ok(vec![event(EVENT_ID, "X")]));

        let (status, body) = send(app(mock), Method::GET, "/events?author=a%40x.com", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body[0]["_id"], EVENT_ID);
        assert_eq!(body[0]["joinedUsers"], json!([]));
        assert_eq!(body[0]["title"], "X");
    }

    #[tokio::test]
    async fn test_list_events_failure_message() {
        let mut mock = MockEventRepository::new();
        mock.expect_list_events().returning(|_| Err(db_error()));

        let (status, body) = send(app(mock), Method::GET, "/events", None).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body, json!({ "error": "Failed to fetch events" }));
    }

    #[tokio::test]
    async fn test_malformed_ids_never_reach_the_store() {
        let routes = [
            (Method::GET, "/events/123"),
            (Method::PUT, "/events/123"),
            (Method::DELETE, "/events/123"),
            (Method::GET, "/events/123/comments"),
            (Method::POST, "/events/123/comments"),
            (Method::DELETE, "/comments/123?email=a%40x.com"),
        ];

        for (method, uri) in routes {
            // A mock with no expectations panics if any repository method is called.
            let (status, body) = send(
                app(MockEventRepository::new()),
                method.clone(),
                uri,
                Some(json!({ "title": "X", "author": { "email": "a@x.com" }, "text": "hi" })),
            )
            .await;
            assert_eq!(status, StatusCode::BAD_REQUEST, "{method} {uri}");
            assert_eq!(body, json!({ "error": "Invalid ID format" }), "{method} {uri}");
        }
    }

    #[tokio::test]
    async fn test_get_event_not_found() {
        let mut mock = MockEventRepository::new();
        mock.expect_find_event().returning(|_| Ok(None));

        let (status, body) = send(app(mock), Method::GET, &format!("/events/{EVENT_ID}"), None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body, json!({ "error": "Event not found" }));
    }

    #[tokio::test]
    async fn test_delete_missing_event_is_not_an_error() {
        let mut mock = MockEventRepository::new();
        mock.expect_delete_event().returning(|_| {
            Ok(DeleteAck {
                acknowledged: true,
                deleted_count: 0,
            })
        });

        let (status, body) =
            send(app(mock), Method::DELETE, &format!("/events/{EVENT_ID}"), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({ "acknowledged": true, "deletedCount": 0 }));
    }

    #[tokio::test]
    async fn test_update_event_sets_fields() {
        let mut mock = MockEventRepository::new();
        mock.expect_update_event()
            .withf(|id, changes| {
                id.to_hex() == EVENT_ID
                    && changes.get_str("title").ok() == Some("Renamed")
                    && !changes.contains_key("joinedUsers")
            })
            .returning(|_, _| {
                Ok(UpdateAck {
                    acknowledged: true,
                    matched_count: 1,
                    modified_count: 1,
                    upserted_count: 0,
                    upserted_id: None,
                })
            });

        let (status, body) = send(
            app(mock),
            Method::PUT,
            &format!("/events/{EVENT_ID}"),
            Some(json!({ "title": "Renamed", "joinedUsers": ["x@x.com"] })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["matchedCount"], 1);
        assert_eq!(body["upsertedId"], Value::Null);
    }

    #[tokio::test]
    async fn test_update_event_empty_body() {
        let mut mock = MockEventRepository::new();
        mock.expect_update_event().never();

        let (status, body) =
            send(app(mock), Method::PUT, &format!("/events/{EVENT_ID}"), Some(json!({ "_id": "x" }))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body, json!({ "error": "Update must contain at least one field" }));
    }

    #[tokio::test]
    async fn test_toggle_join_responses() {
        let mut mock = MockEventRepository::new();
        mock.expect_toggle_member().returning(|_, _| Ok(Some(true)));

        let (status, body) = send(
            app(mock),
            Method::PATCH,
            "/join-event",
            Some(json!({ "eventId": EVENT_ID, "userEmail": "b@y.com" })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(
            body,
            json!({ "success": true, "joined": true, "message": "Joined the event" })
        );
    }

    #[tokio::test]
    async fn test_toggle_join_missing_event() {
        let mut mock = MockEventRepository::new();
        mock.expect_toggle_member().returning(|_, _| Ok(None));

        let (status, body) = send(
            app(mock),
            Method::PATCH,
            "/join-event",
            Some(json!({ "eventId": EVENT_ID, "userEmail": "b@y.com" })),
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body, json!({ "success": false, "message": "Event not found" }));
    }

    #[tokio::test]
    async fn test_toggle_join_validation() {
        let (status, body) = send(
            app(MockEventRepository::new()),
            Method::PATCH,
            "/join-event",
            Some(json!({ "eventId": EVENT_ID })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body, json!({ "error": "userEmail is required" }));

        let (status, body) = send(
            app(MockEventRepository::new()),
            Method::PATCH,
            "/join-event",
            Some(json!({ "eventId": "nope", "userEmail": "b@y.com" })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body, json!({ "error": "Invalid ID format" }));
    }

    #[tokio::test]
    async fn test_joined_events_requires_email() {
        let (status, body) =
            send(app(MockEventRepository::new()), Method::GET, "/joined-events", None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body, json!({ "error": "email is required" }));
    }

    #[tokio::test]
    async fn test_malformed_query_strings_render_json_errors() {
        let uris = [
            "/events?author=a%40x.com&author=b%40y.com".to_string(),
            "/joined-events?email=a&email=b".to_string(),
            format!("/comments/{EVENT_ID}?email=a&email=b"),
        ];

        for uri in uris {
            let method = if uri.starts_with("/comments") {
                Method::DELETE
            } else {
                Method::GET
            };
            let (status, body) = send(app(MockEventRepository::new()), method, &uri, None).await;
            assert_eq!(status, StatusCode::BAD_REQUEST, "{uri}");
            let message = body["error"].as_str().unwrap_or_default();
            assert!(message.contains("duplicate field"), "{uri}: {body}");
        }
    }

    #[tokio::test]
    async fn test_joined_events_lists_matches() {
        let mut mock = MockEventRepository::new();
        mock.expect_list_joined()
            .withf(|email| email == "b@y.com")
            .returning(|_| {
                let mut joined = event(EVENT_ID, "X");
                joined.joined_users = vec!["b@y.com".to_string()];
                Ok(vec![joined])
            });

        let (status, body) =
            send(app(mock), Method::GET, "/joined-events?email=b%40y.com", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body[0]["joinedUsers"], json!(["b@y.com"]));
    }

    #[tokio::test]
    async fn test_add_comment_requires_author_email() {
        let (status, body) = send(
            app(MockEventRepository::new()),
            Method::POST,
            &format!("/events/{EVENT_ID}/comments"),
            Some(json!({ "author": { "name": "Ana" }, "text": "hi" })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body, json!({ "error": "author.email is required" }));

        let (status, body) = send(
            app(MockEventRepository::new()),
            Method::POST,
            &format!("/events/{EVENT_ID}/comments"),
            Some(json!({ "author": { "email": "a@x.com" }, "text": "" })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body, json!({ "error": "text is required" }));
    }

    #[tokio::test]
    async fn test_add_comment_stores_it() {
        let mut mock = MockEventRepository::new();
        mock.expect_insert_comment()
            .withf(|id, comment, _| id.to_hex() == EVENT_ID && comment.text == "hi")
            .returning(|_, _, _| {
                Ok(InsertAck {
                    acknowledged: true,
                    inserted_id: "65f1a2b3c4d5e6f708192a3c".to_string(),
                })
            });

        let (status, body) = send(
            app(mock),
            Method::POST,
            &format!("/events/{EVENT_ID}/comments"),
            Some(json!({ "author": { "email": "a@x.com" }, "text": "hi" })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["insertedId"], "65f1a2b3c4d5e6f708192a3c");
    }

    #[tokio::test]
    async fn test_list_comments_paging() {
        let mut mock = MockEventRepository::new();
        mock.expect_list_comments()
            .withf(|_, page| *page == CommentPage { page: 2, limit: 5 })
            .returning(|event_id, _| {
                Ok(vec![Comment {
                    id: ObjectId::new().to_hex(),
                    event_id: event_id.to_hex(),
                    author: CommentAuthor {
                        email: "a@x.com".into(),
                        name: None,
                        photo: None,
                    },
                    text: "sixth".into(),
                    created_at: Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap(),
                }])
            });

        let (status, body) = send(
            app(mock),
            Method::GET,
            &format!("/events/{EVENT_ID}/comments?page=2&limit=5"),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body[0]["eventId"], EVENT_ID);
        assert_eq!(body[0]["createdAt"], "2024-05-01T12:00:00Z");
    }

    #[tokio::test]
    async fn test_list_comments_rejects_out_of_range_limit() {
        let (status, body) = send(
            app(MockEventRepository::new()),
            Method::GET,
            &format!("/events/{EVENT_ID}/comments?limit=500"),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body, json!({ "error": "limit must be between 1 and 100" }));
    }

    #[tokio::test]
    async fn test_delete_comment_by_someone_else_is_forbidden() {
        let mut mock = MockEventRepository::new();
        mock.expect_find_comment().returning(|id| {
            Ok(Some(Comment {
                id: id.to_hex(),
                event_id: EVENT_ID.to_string(),
                author: CommentAuthor {
                    email: "a@x.com".into(),
                    name: None,
                    photo: None,
                },
                text: "mine".into(),
                created_at: Utc::now(),
            }))
        });
        mock.expect_delete_comment().never();

        let uri = format!("/comments/{EVENT_ID}?email=b%40y.com");
        let (status, body) = send(app(mock), Method::DELETE, &uri, None).await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        assert_eq!(body, json!({ "error": "not allowed" }));
    }

    #[tokio::test]
    async fn test_delete_missing_comment() {
        let mut mock = MockEventRepository::new();
        mock.expect_find_comment().returning(|_| Ok(None));

        let uri = format!("/comments/{EVENT_ID}?email=a%40x.com");
        let (status, body) = send(app(mock), Method::DELETE, &uri, None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body, json!({ "error": "Comment not found" }));
    }
}
