//! Event service layer

use crate::error::{EventError, Result};
use crate::models::{
    AddComment, Comment, CommentPage, DeleteAck, Event, EventFilter, InsertAck, JoinRequest,
    JoinResponse, MAX_COMMENT_LIMIT, UpdateAck,
};
use crate::mongodb::json_object_to_document;
use crate::repository::EventRepository;
use chrono::Utc;
use mongodb::bson::oid::ObjectId;
use mongodb::bson::{Bson, Document};
use serde_json::{Map, Value};
use tracing::{info, instrument};

/// Keys a create or update body may not set
const PROTECTED_FIELDS: [&str; 2] = ["_id", "joinedUsers"];

fn parse_object_id(raw: &str) -> Result<ObjectId> {
    ObjectId::parse_str(raw).map_err(|_| EventError::InvalidId(raw.to_string()))
}

/// Document for a new event: caller attributes without `_id`, with an empty
/// `joinedUsers`.
fn new_event_document(mut body: Map<String, Value>) -> Document {
    body.remove("_id");
    body.remove("joinedUsers");
    let mut document = json_object_to_document(body);
    document.insert("joinedUsers", Bson::Array(Vec::new()));
    document
}

/// `$set` payload for an update, or `None` when nothing updatable remains.
fn update_document(mut body: Map<String, Value>) -> Option<Document> {
    for key in PROTECTED_FIELDS {
        body.remove(key);
    }
    (!body.is_empty()).then(|| json_object_to_document(body))
}

fn required<'a>(value: Option<&'a str>, message: &str) -> Result<&'a str> {
    match value {
        Some(v) if !v.is_empty() => Ok(v),
        _ => Err(EventError::Validation(message.to_string())),
    }
}

/// Event service over an injected repository
pub struct EventService<R: EventRepository> {
    repository: R,
}

impl<R: EventRepository> EventService<R> {
    pub fn new(repository: R) -> Self {
        Self { repository }
    }

    /// Store a new event with no members
    #[instrument(skip(self, body), fields(field_count = body.len()))]
    pub async fn create_event(&self, body: Map<String, Value>) -> Result<InsertAck> {
        let ack = self
            .repository
            .insert_event(new_event_document(body))
            .await
            .map_err(EventError::store("Failed to create event"))?;
        info!(event_id = %ack.inserted_id, "Event created");
        Ok(ack)
    }

    #[instrument(skip(self))]
    pub async fn list_events(&self, filter: &EventFilter) -> Result<Vec<Event>> {
        self.repository
            .list_events(filter)
            .await
            .map_err(EventError::store("Failed to fetch events"))
    }

    #[instrument(skip(self), fields(event_id = %id))]
    pub async fn get_event(&self, id: ObjectId) -> Result<Event> {
        self.repository
            .find_event(id)
            .await
            .map_err(EventError::store("Failed to fetch event"))?
            .ok_or(EventError::EventNotFound)
    }

    /// Apply `body` as a field-level merge. `_id` and `joinedUsers` are ignored.
    #[instrument(skip(self, body), fields(event_id = %id))]
    pub async fn update_event(&self, id: ObjectId, body: Map<String, Value>) -> Result<UpdateAck> {
        let changes = update_document(body).ok_or_else(|| {
            EventError::Validation("Update must contain at least one field".to_string())
        })?;

        self.repository
            .update_event(id, changes)
            .await
            .map_err(EventError::store("Failed to update event"))
    }

    /// Delete at most one event. Its comments are kept.
    #[instrument(skip(self), fields(event_id = %id))]
    pub async fn delete_event(&self, id: ObjectId) -> Result<DeleteAck> {
        let ack = self
            .repository
            .delete_event(id)
            .await
            .map_err(EventError::store("Failed to delete event"))?;
        info!(deleted = ack.deleted_count, "Event delete processed");
        Ok(ack)
    }

    /// Join the event if the user is not a member, leave it otherwise.
    #[instrument(skip(self, request))]
    pub async fn toggle_join(&self, request: JoinRequest) -> Result<JoinResponse> {
        let event_id = required(request.event_id.as_deref(), "eventId is required")?;
        let email = required(request.user_email.as_deref(), "userEmail is required")?;
        let id = parse_object_id(event_id)?;

        let joined = self
            .repository
            .toggle_member(id, email)
            .await
            .map_err(EventError::store("Failed to update event"))?
            .ok_or(EventError::EventNotFound)?;

        info!(event_id = %id, joined, "Membership toggled");
        Ok(JoinResponse::toggled(joined))
    }

    #[instrument(skip(self, email))]
    pub async fn list_joined(&self, email: Option<&str>) -> Result<Vec<Event>> {
        let email = required(email, "email is required")?;
        self.repository
            .list_joined(email)
            .await
            .map_err(EventError::store("Failed to fetch events"))
    }

    /// Stamp and store a comment. The event is not looked up.
    #[instrument(skip(self, input), fields(event_id = %event_id))]
    pub async fn add_comment(&self, event_id: ObjectId, input: AddComment) -> Result<InsertAck> {
        let comment = input.into_new_comment().ok_or_else(|| {
            EventError::Validation("author.email and text are required".to_string())
        })?;
        if comment.author.email.is_empty() {
            return Err(EventError::Validation("author.email is required".to_string()));
        }
        if comment.text.is_empty() {
            return Err(EventError::Validation("text is required".to_string()));
        }

        self.repository
            .insert_comment(event_id, comment, Utc::now())
            .await
            .map_err(EventError::store("Failed to add comment"))
    }

    #[instrument(skip(self), fields(event_id = %event_id))]
    pub async fn list_comments(&self, event_id: ObjectId, page: CommentPage) -> Result<Vec<Comment>> {
        if page.page < 1 {
            return Err(EventError::Validation("page must be at least 1".to_string()));
        }
        if page.limit < 1 || page.limit > MAX_COMMENT_LIMIT {
            return Err(EventError::Validation(
                "limit must be between 1 and 100".to_string(),
            ));
        }

        self.repository
            .list_comments(event_id, page)
            .await
            .map_err(EventError::store("Failed to fetch comments"))
    }

    /// Delete a comment on behalf of `requester`, who must be its author.
    #[instrument(skip(self, requester), fields(comment_id = %id))]
    pub async fn delete_comment(&self, id: ObjectId, requester: Option<&str>) -> Result<DeleteAck> {
        let comment = self
            .repository
            .find_comment(id)
            .await
            .map_err(EventError::store("Failed to delete comment"))?
            .ok_or(EventError::CommentNotFound)?;

        if requester != Some(comment.author.email.as_str()) {
            return Err(EventError::NotAllowed);
        }

        self.repository
            .delete_comment(id)
            .await
            .map_err(EventError::store("Failed to delete comment"))
    }
}
