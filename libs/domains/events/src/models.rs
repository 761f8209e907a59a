//! Event domain models

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use utoipa::{IntoParams, ToSchema};
use validator::Validate;

/// Default page size for comment listings
pub const DEFAULT_COMMENT_LIMIT: u64 = 10;

/// Largest page size accepted for comment listings
pub const MAX_COMMENT_LIMIT: u64 = 100;

/// An event document.
///
/// Apart from `_id` and `joinedUsers` the attributes are whatever the author
/// supplied; `author.email` is used for filtering.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Event {
    /// ObjectId as 24 hex characters
    #[serde(rename = "_id")]
    pub id: String,

    /// Emails of users who joined, each at most once
    #[serde(rename = "joinedUsers", default)]
    pub joined_users: Vec<String>,

    /// Author-supplied attributes
    #[serde(flatten)]
    pub fields: BTreeMap<String, Value>,
}

/// Query parameters for listing events
#[derive(Debug, Clone, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct EventFilter {
    /// Exact match on `author.email`
    pub author: Option<String>,
}

/// Query parameters for listing a user's joined events
#[derive(Debug, Clone, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct JoinedEventsQuery {
    pub email: Option<String>,
}

/// Body of the join/unjoin toggle
#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct JoinRequest {
    #[serde(rename = "eventId")]
    #[validate(required(message = "eventId is required"))]
    pub event_id: Option<String>,

    #[serde(rename = "userEmail")]
    #[validate(
        required(message = "userEmail is required"),
        length(min = 1, message = "userEmail is required")
    )]
    pub user_email: Option<String>,
}

/// Result of the join/unjoin toggle
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct JoinResponse {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub joined: Option<bool>,
    pub message: String,
}

impl JoinResponse {
    pub fn toggled(joined: bool) -> Self {
        let message = if joined {
            "Joined the event"
        } else {
            "Unjoined the event"
        };
        Self {
            success: true,
            joined: Some(joined),
            message: message.to_string(),
        }
    }

    pub fn event_not_found() -> Self {
        Self {
            success: false,
            joined: None,
            message: "Event not found".to_string(),
        }
    }
}

/// Comment author as stored and returned
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct CommentAuthor {
    pub email: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub photo: Option<String>,
}

/// A comment on an event
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Comment {
    #[serde(rename = "_id")]
    pub id: String,
    #[serde(rename = "eventId")]
    pub event_id: String,
    pub author: CommentAuthor,
    pub text: String,
    #[serde(rename = "createdAt")]
    pub created_at: DateTime<Utc>,
}

/// Author block of [`AddComment`]
#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
pub struct CommentAuthorInput {
    #[validate(
        required(message = "author.email is required"),
        length(min = 1, message = "author.email is required")
    )]
    pub email: Option<String>,
    pub name: Option<String>,
    pub photo: Option<String>,
}

/// Body for adding a comment
#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct AddComment {
    #[validate(required(message = "author.email is required"), nested)]
    pub author: Option<CommentAuthorInput>,

    #[validate(
        required(message = "text is required"),
        length(min = 1, message = "text is required")
    )]
    pub text: Option<String>,
}

/// A comment ready to be stored
#[derive(Debug, Clone, PartialEq)]
pub struct NewComment {
    pub author: CommentAuthor,
    pub text: String,
}

impl AddComment {
    /// The author and text once validation has passed.
    pub fn into_new_comment(self) -> Option<NewComment> {
        let author = self.author?;
        Some(NewComment {
            author: CommentAuthor {
                email: author.email?,
                name: author.name,
                photo: author.photo,
            },
            text: self.text?,
        })
    }
}

fn default_page() -> u64 {
    1
}

fn default_limit() -> u64 {
    DEFAULT_COMMENT_LIMIT
}

/// Paging for comment listings
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Validate, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct CommentPage {
    /// 1-based page number
    #[serde(default = "default_page")]
    #[validate(range(min = 1, message = "page must be at least 1"))]
    pub page: u64,

    /// Page size
    #[serde(default = "default_limit")]
    #[validate(range(min = 1, max = 100, message = "limit must be between 1 and 100"))]
    pub limit: u64,
}

impl CommentPage {
    /// Documents to skip before this page.
    pub fn skip(&self) -> u64 {
        (self.page.saturating_sub(1)).saturating_mul(self.limit)
    }
}

impl Default for CommentPage {
    fn default() -> Self {
        Self {
            page: default_page(),
            limit: default_limit(),
        }
    }
}

/// Query parameters for deleting a comment
#[derive(Debug, Clone, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct DeleteCommentQuery {
    /// Email of the requester, compared with the comment's `author.email`
    pub email: Option<String>,
}

/// Insert acknowledgment
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct InsertAck {
    pub acknowledged: bool,
    pub inserted_id: String,
}

/// Update acknowledgment
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateAck {
    pub acknowledged: bool,
    pub matched_count: u64,
    pub modified_count: u64,
    pub upserted_count: u64,
    pub upserted_id: Option<String>,
}

/// Delete acknowledgment
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct DeleteAck {
    pub acknowledged: bool,
    pub deleted_count: u64,
}
