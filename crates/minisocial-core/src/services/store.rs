//! Document store abstraction.

use std::cmp::Ordering;

use futures_util::future::BoxFuture;
use serde_json::{Map, Value, json};

use super::{ServiceError, ServiceResult};
use crate::subscription::Subscription;

/// A stored document: store-assigned id plus its fields.
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    pub id: String,
    pub fields: Map<String, Value>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Ascending,
    Descending,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderBy {
    pub field: String,
    pub direction: Direction,
}

impl OrderBy {
    pub fn descending(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            direction: Direction::Descending,
        }
    }

    pub fn ascending(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            direction: Direction::Ascending,
        }
    }
}

/// What a live query pushes to its callback.
#[derive(Debug, Clone, PartialEq)]
pub enum LiveQueryEvent {
    /// Full ordered result set after a change.
    Snapshot(Vec<Document>),
    /// The query stopped; no further events follow.
    Failed(ServiceError),
}

pub type LiveQueryCallback = Box<dyn Fn(LiveQueryEvent) + Send + Sync>;

/// Placeholder the store replaces with its own clock on write.
pub fn server_timestamp() -> Value {
    json!({ ".sv": "timestamp" })
}

pub fn is_server_timestamp(value: &Value) -> bool {
    value
        .as_object()
        .and_then(|obj| obj.get(".sv"))
        .and_then(Value::as_str)
        == Some("timestamp")
}

pub trait DocumentStore: Send + Sync {
    /// Inserts a document and returns its generated id.
    fn insert<'a>(
        &'a self,
        collection: &'a str,
        fields: Map<String, Value>,
    ) -> BoxFuture<'a, ServiceResult<String>>;

    /// One-shot ordered query over a collection.
    fn query_ordered<'a>(
        &'a self,
        collection: &'a str,
        order: &'a OrderBy,
    ) -> BoxFuture<'a, ServiceResult<Vec<Document>>>;

    /// Standing ordered query. `callback` receives the full ordered set on
    /// every change until the returned subscription is disposed.
    fn live_query_ordered(
        &self,
        collection: &str,
        order: OrderBy,
        callback: LiveQueryCallback,
    ) -> Subscription;

    /// Merges `fields` into an existing document.
    fn update_fields<'a>(
        &'a self,
        collection: &'a str,
        id: &'a str,
        fields: Map<String, Value>,
    ) -> BoxFuture<'a, ServiceResult<()>>;

    fn delete<'a>(&'a self, collection: &'a str, id: &'a str) -> BoxFuture<'a, ServiceResult<()>>;
}

/// Type rank for mixed-type ordering: missing/null, booleans, numbers,
/// strings, then objects and arrays.
fn rank(value: Option<&Value>) -> u8 {
    match value {
        None | Some(Value::Null) => 0,
        Some(Value::Bool(_)) => 1,
        Some(Value::Number(_)) => 2,
        Some(Value::String(_)) => 3,
        Some(Value::Array(_) | Value::Object(_)) => 4,
    }
}

fn compare_values(a: Option<&Value>, b: Option<&Value>) -> Ordering {
    match (a, b) {
        (Some(Value::Bool(x)), Some(Value::Bool(y))) => x.cmp(y),
        (Some(Value::Number(x)), Some(Value::Number(y))) => {
            match (x.as_i64(), y.as_i64()) {
                (Some(x), Some(y)) => x.cmp(&y),
                _ => x
                    .as_f64()
                    .unwrap_or(0.0)
                    .total_cmp(&y.as_f64().unwrap_or(0.0)),
            }
        }
        (Some(Value::String(x)), Some(Value::String(y))) => x.cmp(y),
        _ => rank(a).cmp(&rank(b)),
    }
}

/// Sorts documents by `order`. Equal keys fall back to the document id.
pub fn sort_documents(docs: &mut [Document], order: &OrderBy) {
    docs.sort_by(|a, b| {
        let ordering = compare_values(a.fields.get(&order.field), b.fields.get(&order.field))
            .then_with(|| a.id.cmp(&b.id));
        match order.direction {
            Direction::Ascending => ordering,
            Direction::Descending => ordering.reverse(),
        }
    });
}
