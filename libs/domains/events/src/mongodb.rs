//! MongoDB implementation of EventRepository

use crate::error::Result;
use crate::models::{
    Comment, CommentAuthor, CommentPage, DeleteAck, Event, EventFilter, InsertAck, NewComment,
    UpdateAck,
};
use crate::repository::EventRepository;
use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use futures_util::TryStreamExt;
use mongodb::bson::oid::ObjectId;
use mongodb::bson::{Bson, Document, doc};
use mongodb::options::{FindOneAndUpdateOptions, FindOptions, ReturnDocument};
use mongodb::{Collection, Database, IndexModel};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Number, Value};
use tracing::instrument;

pub const EVENTS_COLLECTION: &str = "events";
pub const COMMENTS_COLLECTION: &str = "comments";

/// Comment as stored in the `comments` collection
#[derive(Debug, Clone, Serialize, Deserialize)]
struct CommentRecord {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    id: Option<ObjectId>,
    #[serde(rename = "eventId")]
    event_id: ObjectId,
    author: CommentAuthor,
    text: String,
    #[serde(rename = "createdAt")]
    created_at: mongodb::bson::DateTime,
}

impl From<CommentRecord> for Comment {
    fn from(record: CommentRecord) -> Self {
        Self {
            id: record.id.map(|id| id.to_hex()).unwrap_or_default(),
            event_id: record.event_id.to_hex(),
            author: record.author,
            text: record.text,
            created_at: DateTime::from_timestamp_millis(record.created_at.timestamp_millis())
                .unwrap_or_default(),
        }
    }
}

/// MongoDB-based event repository
#[derive(Clone)]
pub struct MongoEventRepository {
    events: Collection<Document>,
    comments: Collection<CommentRecord>,
}

impl MongoEventRepository {
    pub fn new(database: &Database) -> Self {
        Self {
            events: database.collection(EVENTS_COLLECTION),
            comments: database.collection(COMMENTS_COLLECTION),
        }
    }

    /// Create the indexes backing the author filter, the joined-events
    /// lookup and the comment listing.
    pub async fn create_indexes(&self) -> Result<()> {
        let event_indexes = vec![
            IndexModel::builder().keys(doc! { "author.email": 1 }).build(),
            IndexModel::builder().keys(doc! { "joinedUsers": 1 }).build(),
        ];
        self.events.create_indexes(event_indexes).await?;

        let comment_index = IndexModel::builder()
            .keys(doc! { "eventId": 1, "createdAt": -1 })
            .build();
        self.comments.create_index(comment_index).await?;

        Ok(())
    }
}

/// Filter for the event listing. An empty author matches everything.
fn author_filter(filter: &EventFilter) -> Document {
    match filter.author.as_deref() {
        Some(author) if !author.is_empty() => doc! { "author.email": author },
        _ => doc! {},
    }
}

/// Pipeline update that removes `email` from `joinedUsers` when present and
/// appends it otherwise. A missing `joinedUsers` is treated as empty.
///
/// `email` is wrapped in `$literal` so a value such as `$title` is never read
/// as a field path.
fn toggle_pipeline(email: &str) -> Vec<Document> {
    let members = doc! { "$ifNull": ["$joinedUsers", []] };
    let email = doc! { "$literal": email };
    vec![doc! {
        "$set": {
            "joinedUsers": {
                "$cond": [
                    { "$in": [email.clone(), members.clone()] },
                    { "$filter": { "input": members.clone(), "cond": { "$ne": ["$$this", email.clone()] } } },
                    { "$concatArrays": [members, [email]] },
                ]
            }
        }
    }]
}

fn has_member(event: &Document, email: &str) -> bool {
    event
        .get_array("joinedUsers")
        .map(|users| users.iter().any(|u| u.as_str() == Some(email)))
        .unwrap_or(false)
}

/// Render a stored value as the JSON a client sees.
///
/// ObjectIds become hex strings and dates RFC 3339 with milliseconds. Types
/// with no plain JSON form fall back to relaxed extended JSON.
pub fn bson_to_json(value: Bson) -> Value {
    match value {
        Bson::Null | Bson::Undefined => Value::Null,
        Bson::Boolean(b) => Value::Bool(b),
        Bson::Int32(n) => Value::from(n),
        Bson::Int64(n) => Value::from(n),
        Bson::Double(n) => Number::from_f64(n).map(Value::Number).unwrap_or(Value::Null),
        Bson::String(s) => Value::String(s),
        Bson::ObjectId(id) => Value::String(id.to_hex()),
        Bson::DateTime(dt) => DateTime::<Utc>::from_timestamp_millis(dt.timestamp_millis())
            .map(|dt| Value::String(dt.to_rfc3339_opts(SecondsFormat::Millis, true)))
            .unwrap_or_else(|| Bson::DateTime(dt).into_relaxed_extjson()),
        Bson::Array(items) => Value::Array(items.into_iter().map(bson_to_json).collect()),
        Bson::Document(doc) => Value::Object(
            doc.into_iter()
                .map(|(key, value)| (key, bson_to_json(value)))
                .collect(),
        ),
        other => other.into_relaxed_extjson(),
    }
}

/// Convert client JSON to BSON without interpreting `$`-prefixed extended
/// JSON keys. Integers that fit in 32 bits are stored as Int32.
pub fn json_to_bson(value: Value) -> Bson {
    match value {
        Value::Null => Bson::Null,
        Value::Bool(b) => Bson::Boolean(b),
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                i32::try_from(i).map(Bson::Int32).unwrap_or(Bson::Int64(i))
            } else {
                Bson::Double(n.as_f64().unwrap_or(f64::NAN))
            }
        }
        Value::String(s) => Bson::String(s),
        Value::Array(items) => Bson::Array(items.into_iter().map(json_to_bson).collect()),
        Value::Object(map) => Bson::Document(json_object_to_document(map)),
    }
}

pub fn json_object_to_document(map: Map<String, Value>) -> Document {
    map.into_iter()
        .map(|(key, value)| (key, json_to_bson(value)))
        .collect()
}

fn id_to_string(id: Bson) -> String {
    match id {
        Bson::ObjectId(oid) => oid.to_hex(),
        other => match bson_to_json(other) {
            Value::String(s) => s,
            value => value.to_string(),
        },
    }
}

/// Split a stored event into its id, members and remaining attributes.
fn event_from_document(mut doc: Document) -> Event {
    let id = doc.remove("_id").map(id_to_string).unwrap_or_default();

    let joined_users = match doc.remove("joinedUsers") {
        Some(Bson::Array(users)) => users
            .into_iter()
            .filter_map(|u| match u {
                Bson::String(s) => Some(s),
                _ => None,
            })
            .collect(),
        _ => Vec::new(),
    };

    let fields = doc
        .into_iter()
        .map(|(key, value)| (key, bson_to_json(value)))
        .collect();

    Event {
        id,
        joined_users,
        fields,
    }
}

impl MongoEventRepository {
    async fn find_events(&self, filter: Document) -> Result<Vec<Event>> {
        let cursor = self.events.find(filter).await?;
        let docs: Vec<Document> = cursor.try_collect().await?;
        Ok(docs.into_iter().map(event_from_document).collect())
    }
}

#[async_trait]
impl EventRepository for MongoEventRepository {
    #[instrument(skip(self, event))]
    async fn insert_event(&self, event: Document) -> Result<InsertAck> {
        let result = self.events.insert_one(event).await?;
        Ok(InsertAck {
            acknowledged: true,
            inserted_id: id_to_string(result.inserted_id),
        })
    }

    #[instrument(skip(self))]
    async fn list_events(&self, filter: &EventFilter) -> Result<Vec<Event>> {
        self.find_events(author_filter(filter)).await
    }

    #[instrument(skip(self), fields(event_id = %id))]
    async fn find_event(&self, id: ObjectId) -> Result<Option<Event>> {
        let doc = self.events.find_one(doc! { "_id": id }).await?;
        Ok(doc.map(event_from_document))
    }

    #[instrument(skip(self, changes), fields(event_id = %id, fields = changes.len()))]
    async fn update_event(&self, id: ObjectId, changes: Document) -> Result<UpdateAck> {
        let result = self
            .events
            .update_one(doc! { "_id": id }, doc! { "$set": changes })
            .await?;
        Ok(UpdateAck {
            acknowledged: true,
            matched_count: result.matched_count,
            modified_count: result.modified_count,
            upserted_count: u64::from(result.upserted_id.is_some()),
            upserted_id: result.upserted_id.map(id_to_string),
        })
    }

    #[instrument(skip(self), fields(event_id = %id))]
    async fn delete_event(&self, id: ObjectId) -> Result<DeleteAck> {
        let result = self.events.delete_one(doc! { "_id": id }).await?;
        Ok(DeleteAck {
            acknowledged: true,
            deleted_count: result.deleted_count,
        })
    }

    #[instrument(skip(self, email), fields(event_id = %id))]
    async fn toggle_member(&self, id: ObjectId, email: &str) -> Result<Option<bool>> {
        let options = FindOneAndUpdateOptions::builder()
            .return_document(ReturnDocument::After)
            .build();

        let updated = self
            .events
            .find_one_and_update(doc! { "_id": id }, toggle_pipeline(email))
            .with_options(options)
            .await?;

        Ok(updated.map(|event| has_member(&event, email)))
    }

    #[instrument(skip(self, email))]
    async fn list_joined(&self, email: &str) -> Result<Vec<Event>> {
        self.find_events(doc! { "joinedUsers": email }).await
    }

    #[instrument(skip(self, comment), fields(event_id = %event_id))]
    async fn insert_comment(
        &self,
        event_id: ObjectId,
        comment: NewComment,
        created_at: DateTime<Utc>,
    ) -> Result<InsertAck> {
        let record = CommentRecord {
            id: None,
            event_id,
            author: comment.author,
            text: comment.text,
            created_at: mongodb::bson::DateTime::from_millis(created_at.timestamp_millis()),
        };
        let result = self.comments.insert_one(&record).await?;
        Ok(InsertAck {
            acknowledged: true,
            inserted_id: id_to_string(result.inserted_id),
        })
    }

    #[instrument(skip(self), fields(event_id = %event_id))]
    async fn list_comments(&self, event_id: ObjectId, page: CommentPage) -> Result<Vec<Comment>> {
        let options = FindOptions::builder()
            .sort(doc! { "createdAt": -1, "_id": -1 })
            .skip(page.skip())
            .limit(i64::try_from(page.limit).unwrap_or(i64::MAX))
            .build();

        let cursor = self
            .comments
            .find(doc! { "eventId": event_id })
            .with_options(options)
            .await?;
        let records: Vec<CommentRecord> = cursor.try_collect().await?;
        Ok(records.into_iter().map(Comment::from).collect())
    }

    #[instrument(skip(self), fields(comment_id = %id))]
    async fn find_comment(&self, id: ObjectId) -> Result<Option<Comment>> {
        let record = self.comments.find_one(doc! { "_id": id }).await?;
        Ok(record.map(Comment::from))
    }

    #[instrument(skip(self), fields(comment_id = %id))]
    async fn delete_comment(&self, id: ObjectId) -> Result<DeleteAck> {
        let result = self.comments.delete_one(doc! { "_id": id }).await?;
        Ok(DeleteAck {
            acknowledged: true,
            deleted_count: result.deleted_count,
        })
    }
}
