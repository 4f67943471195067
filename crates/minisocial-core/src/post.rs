//! Posts and identities as the rest of the app sees them.

use chrono::{DateTime, Local, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::messages::UNKNOWN_AUTHOR;
use crate::services::store::{Document, server_timestamp};
use crate::services::{ServiceError, ServiceErrorKind};

/// A signed-in account as reported by the identity service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    pub uid: String,
    pub email: Option<String>,
}

impl Identity {
    pub fn new(uid: impl Into<String>, email: Option<String>) -> Self {
        Self {
            uid: uid.into(),
            email,
        }
    }

    /// Name stored on posts written by this identity.
    pub fn display_name(&self) -> &str {
        self.email.as_deref().unwrap_or(UNKNOWN_AUTHOR)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Post {
    pub id: String,
    pub title: String,
    pub content: String,
    pub author: String,
    pub author_id: String,
    pub created_at: DateTime<Utc>,
}

/// Stored shape of a post document.
#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct PostRecord {
    title: String,
    content: String,
    author: Option<String>,
    author_id: String,
    created_at: Option<i64>,
}

impl Post {
    /// Field names as stored in the document store.
    pub const TITLE: &str = "title";
    pub const CONTENT: &str = "content";
    pub const AUTHOR: &str = "author";
    pub const AUTHOR_ID: &str = "authorId";
    pub const CREATED_AT: &str = "createdAt";

    /// Builds a post from a stored document.
    ///
    /// # Errors
    /// Returns a parse error when the fields are not a post record.
    pub fn from_document(doc: Document) -> Result<Self, ServiceError> {
        let record: PostRecord =
            serde_json::from_value(Value::Object(doc.fields)).map_err(|e| {
                ServiceError::new(
                    ServiceErrorKind::Parse,
                    format!("Malformed post {}: {e}", doc.id),
                )
            })?;

        let created_at = record
            .created_at
            .and_then(DateTime::from_timestamp_millis)
            .unwrap_or(DateTime::UNIX_EPOCH);

        Ok(Self {
            id: doc.id,
            title: record.title,
            content: record.content,
            author: record
                .author
                .filter(|a| !a.is_empty())
                .unwrap_or_else(|| UNKNOWN_AUTHOR.to_string()),
            author_id: record.author_id,
            created_at,
        })
    }

    /// Advisory ownership check used to show or hide edit/delete controls.
    ///
    /// Not a security boundary: the document store's access rules decide
    /// whether a write is allowed.
    pub fn is_owned_by(&self, identity: Option<&Identity>) -> bool {
        identity.is_some_and(|identity| identity.uid == self.author_id)
    }

    /// Formats the creation time in local time.
    pub fn formatted_date(&self, format: &str) -> String {
        self.created_at.with_timezone(&Local).format(format).to_string()
    }
}

/// Fields for a new post document; the store fills in `createdAt`.
pub(crate) fn new_post_fields(title: &str, content: &str, author: &Identity) -> Map<String, Value> {
    let mut fields = Map::new();
    fields.insert(Post::TITLE.to_string(), Value::from(title));
    fields.insert(Post::CONTENT.to_string(), Value::from(content));
    fields.insert(Post::AUTHOR.to_string(), Value::from(author.display_name()));
    fields.insert(Post::AUTHOR_ID.to_string(), Value::from(author.uid.as_str()));
    fields.insert(Post::CREATED_AT.to_string(), server_timestamp());
    fields
}

/// The only fields an edit may touch.
pub(crate) fn edit_fields(title: &str, content: &str) -> Map<String, Value> {
    let mut fields = Map::new();
    fields.insert(Post::TITLE.to_string(), Value::from(title));
    fields.insert(Post::CONTENT.to_string(), Value::from(content));
    fields
}
