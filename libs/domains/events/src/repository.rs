//! Event repository trait

use crate::error::Result;
use crate::models::{Comment, CommentPage, DeleteAck, Event, EventFilter, InsertAck, NewComment, UpdateAck};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use mongodb::bson::Document;
use mongodb::bson::oid::ObjectId;

/// Storage operations for events and their comments.
///
/// Every method maps to a single store operation.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait EventRepository: Send + Sync {
    /// Insert a prepared event document
    async fn insert_event(&self, event: Document) -> Result<InsertAck>;

    async fn list_events(&self, filter: &EventFilter) -> Result<Vec<Event>>;

    async fn find_event(&self, id: ObjectId) -> Result<Option<Event>>;

    /// `$set` the given fields on one event
    async fn update_event(&self, id: ObjectId, changes: Document) -> Result<UpdateAck>;

    async fn delete_event(&self, id: ObjectId) -> Result<DeleteAck>;

    /// Atomically add `email` to `joinedUsers` or remove it if present.
    ///
    /// Returns `Some(true)` when the user is now a member, `Some(false)` when
    /// they were removed and `None` when no event has that id.
    async fn toggle_member(&self, id: ObjectId, email: &str) -> Result<Option<bool>>;

    /// Events whose `joinedUsers` contains `email`
    async fn list_joined(&self, email: &str) -> Result<Vec<Event>>;

    async fn insert_comment(
        &self,
        event_id: ObjectId,
        comment: NewComment,
        created_at: DateTime<Utc>,
    ) -> Result<InsertAck>;

    /// Newest first, one page
    async fn list_comments(&self, event_id: ObjectId, page: CommentPage) -> Result<Vec<Comment>>;

    async fn find_comment(&self, id: ObjectId) -> Result<Option<Comment>>;

    async fn delete_comment(&self, id: ObjectId) -> Result<DeleteAck>;
}
