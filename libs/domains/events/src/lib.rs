//! Events Domain
//!
//! Community events with free-form attributes, a join/unjoin toggle per user
//! and paginated comments, persisted in two MongoDB collections.
//!
//! # Architecture
//!
//! ```text
//! handlers (axum) ──► EventService ──► EventRepository ──► MongoDB
//!                                             │
//!                                             ├── events    { _id, joinedUsers, ... }
//!                                             └── comments  { _id, eventId, author, text, createdAt }
//! ```

use utoipa::OpenApi;

mod error;
mod handlers;
mod models;
mod mongodb;
mod repository;
mod service;

pub use crate::mongodb::{
    COMMENTS_COLLECTION, EVENTS_COLLECTION, MongoEventRepository, bson_to_json,
    json_object_to_document, json_to_bson,
};
pub use error::{EventError, Result};
pub use handlers::{EventsState, events_router};
pub use models::{
    AddComment, Comment, CommentAuthor, CommentAuthorInput, CommentPage, DEFAULT_COMMENT_LIMIT,
    DeleteAck, DeleteCommentQuery, Event, EventFilter, InsertAck, JoinRequest, JoinResponse,
    JoinedEventsQuery, MAX_COMMENT_LIMIT, NewComment, UpdateAck,
};
pub use repository::EventRepository;
pub use service::EventService;

/// OpenAPI documentation for Events API
#[derive(OpenApi)]
#[openapi(
    paths(
        handlers::create_event,
        handlers::list_events,
        handlers::get_event,
        handlers::update_event,
        handlers::delete_event,
        handlers::toggle_join,
        handlers::joined_events,
        handlers::add_comment,
        handlers::list_comments,
        handlers::delete_comment,
    ),
    components(schemas(
        Event,
        InsertAck,
        UpdateAck,
        DeleteAck,
        JoinRequest,
        JoinResponse,
        Comment,
        CommentAuthor,
        CommentAuthorInput,
        AddComment,
        axum_helpers::ErrorResponse,
    )),
    tags(
        (name = "events", description = "Events and memberships"),
        (name = "comments", description = "Comments on events")
    )
)]
pub struct ApiDoc;
