//! Realtime Database event stream parser.
//!
//! The database streams changes as Server-Sent Events: `put` and `patch`
//! carry `{"path": .., "data": ..}` relative to the watched location, and
//! `keep-alive`, `cancel` and `auth_revoked` are control events.

use std::pin::Pin;

use eventsource_stream::{EventStream, Eventsource};
use futures_util::Stream;
use serde::Deserialize;
use serde_json::{Map, Value};

use super::store::Document;
use super::{ServiceError, ServiceErrorKind, ServiceResult};

#[derive(Debug, Clone, PartialEq)]
pub enum DatabaseEvent {
    /// Replaces the value at `path`.
    Put { path: String, data: Value },
    /// Merges the children of `data` into the value at `path`.
    Patch { path: String, data: Value },
    KeepAlive,
    /// The server stopped the stream, usually because access rules no
    /// longer allow reading the location.
    Cancel(String),
    /// The auth token expired or was revoked.
    AuthRevoked,
}

#[derive(Debug, Deserialize)]
struct PathData {
    path: String,
    #[serde(default)]
    data: Value,
}

/// SSE parser that converts a byte stream into `DatabaseEvent`s.
pub struct SseParser<S> {
    inner: EventStream<S>,
}

impl<S> SseParser<S> {
    pub fn new(stream: S) -> Self
    where
        S: Eventsource,
    {
        Self {
            inner: stream.eventsource(),
        }
    }
}

impl<S, E> Stream for SseParser<S>
where
    S: Stream<Item = std::result::Result<bytes::Bytes, E>> + Unpin,
    E: std::error::Error + Send + Sync + 'static,
{
    type Item = ServiceResult<DatabaseEvent>;

    fn poll_next(
        mut self: Pin<&mut Self>,
        cx: &mut std::task::Context<'_>,
    ) -> std::task::Poll<Option<Self::Item>> {
        use std::task::Poll;

        match Pin::new(&mut self.inner).poll_next(cx) {
            Poll::Ready(Some(Ok(event))) => {
                Poll::Ready(Some(parse_event_fields(&event.event, &event.data)))
            }
            Poll::Ready(Some(Err(e))) => Poll::Ready(Some(Err(ServiceError::new(
                ServiceErrorKind::Network,
                format!("Event stream error: {e}"),
            )))),
            Poll::Ready(None) => Poll::Ready(None),
            Poll::Pending => Poll::Pending,
        }
    }
}

fn parse_event_fields(event_type: &str, data: &str) -> ServiceResult<DatabaseEvent> {
    match event_type {
        "put" | "patch" => {
            let parsed: PathData = serde_json::from_str(data).map_err(|err| {
                ServiceError::new(
                    ServiceErrorKind::Parse,
                    format!("Failed to parse {event_type} event: {err}"),
                )
            })?;
            Ok(if event_type == "put" {
                DatabaseEvent::Put {
                    path: parsed.path,
                    data: parsed.data,
                }
            } else {
                DatabaseEvent::Patch {
                    path: parsed.path,
                    data: parsed.data,
                }
            })
        }
        "keep-alive" => Ok(DatabaseEvent::KeepAlive),
        "cancel" => {
            let reason = serde_json::from_str::<Value>(data)
                .ok()
                .and_then(|v| v.as_str().map(str::to_string))
                .unwrap_or_else(|| data.trim().to_string());
            Ok(DatabaseEvent::Cancel(reason))
        }
        "auth_revoked" => Ok(DatabaseEvent::AuthRevoked),
        other => Err(ServiceError::new(
            ServiceErrorKind::Parse,
            format!("Unknown event type: {other}"),
        )),
    }
}

/// Local copy of a watched collection, kept in sync from stream events.
#[derive(Debug, Clone, Default)]
pub struct CollectionMirror {
    root: Value,
}

impl CollectionMirror {
    pub fn apply(&mut self, event: &DatabaseEvent) {
        match event {
            DatabaseEvent::Put { path, data } => {
                set_at(&mut self.root, &segments(path), data.clone());
            }
            DatabaseEvent::Patch { path, data } => {
                let base = segments(path);
                if let Value::Object(children) = data {
                    for (key, value) in children {
                        let mut child_path = base.clone();
                        child_path.extend(segments(key));
                        set_at(&mut self.root, &child_path, value.clone());
                    }
                }
            }
            DatabaseEvent::KeepAlive | DatabaseEvent::Cancel(_) | DatabaseEvent::AuthRevoked => {}
        }
    }

    /// Current documents, unordered. Non-object children are skipped.
    pub fn documents(&self) -> Vec<Document> {
        documents_from_value(&self.root)
    }
}

/// Converts a collection value (`{id: {fields..}}` or `null`) to documents.
pub(crate) fn documents_from_value(value: &Value) -> Vec<Document> {
    let Value::Object(children) = value else {
        return Vec::new();
    };
    children
        .iter()
        .filter_map(|(id, fields)| {
            fields.as_object().map(|fields| Document {
                id: id.clone(),
                fields: fields.clone(),
            })
        })
        .collect()
}

fn segments(path: &str) -> Vec<&str> {
    path.split('/').filter(|s| !s.is_empty()).collect()
}

/// Writes `value` at `path` below `root`. `null` removes the entry and
/// prunes parents left empty.
fn set_at(root: &mut Value, path: &[&str], value: Value) {
    let Some((first, rest)) = path.split_first() else {
        *root = value;
        return;
    };

    if value.is_null() {
        if let Value::Object(children) = root {
            if rest.is_empty() {
                children.remove(*first);
            } else if let Some(child) = children.get_mut(*first) {
                set_at(child, rest, Value::Null);
                if child.as_object().is_some_and(Map::is_empty) {
                    children.remove(*first);
                }
            }
        }
        return;
    }

    if !root.is_object() {
        *root = Value::Object(Map::new());
    }
    if let Value::Object(children) = root {
        let child = children.entry((*first).to_string()).or_insert(Value::Null);
        set_at(child, rest, value);
    }
}

#[cfg(test)]
mod tests {
    use futures_util::StreamExt;
    use serde_json::json;

    use super::*;

    const SSE_FEED_STREAM: &str = r#"event: put
data: {"path":"/","data":{"p1":{"title":"First","createdAt":1}}}

event: keep-alive
data: null

event: put
data: {"path":"/p2","data":{"title":"Second","createdAt":2}}

event: patch
data: {"path":"/p1","data":{"title":"First (edited)"}}

event: put
data: {"path":"/p2","data":null}

"#;

    fn mock_byte_stream(
        data: &str,
    ) -> impl Stream<Item = std::result::Result<bytes::Bytes, std::io::Error>> {
        let chunks: Vec<_> = data
            .as_bytes()
            .chunks(50)
            .map(|c| Ok(bytes::Bytes::copy_from_slice(c)))
            .collect();
        futures_util::stream::iter(chunks)
    }

    #[tokio::test]
    async fn test_parser_reads_feed_stream() {
        let mut parser = SseParser::new(mock_byte_stream(SSE_FEED_STREAM));

        let mut events = Vec::new();
        while let Some(result) = parser.next().await {
            events.push(result.expect("Expected valid event"));
        }

        assert_eq!(events.len(), 5);
        assert!(matches!(&events[0], DatabaseEvent::Put { path, .. } if path == "/"));
        assert_eq!(events[1], DatabaseEvent::KeepAlive);
        assert!(matches!(&events[3], DatabaseEvent::Patch { path, .. } if path == "/p1"));
    }

    #[tokio::test]
    async fn test_mirror_tracks_stream() {
        let mut parser = SseParser::new(mock_byte_stream(SSE_FEED_STREAM));
        let mut mirror = CollectionMirror::default();
        while let Some(result) = parser.next().await {
            mirror.apply(&result.unwrap());
        }

        let docs = mirror.documents();
        assert_eq!(docs.len(), 1);
        assert_eq!(docs[0].id, "p1");
        assert_eq!(docs[0].fields["title"], json!("First (edited)"));
        assert_eq!(docs[0].fields["createdAt"], json!(1));
    }

    #[tokio::test]
    async fn test_control_events() {
        let stream = concat!(
            "event: cancel\ndata: \"Permission denied\"\n\n",
            "event: auth_revoked\ndata: \"credential is no longer valid\"\n\n",
        );
        let mut parser = SseParser::new(mock_byte_stream(stream));

        assert_eq!(
            parser.next().await.unwrap().unwrap(),
            DatabaseEvent::Cancel("Permission denied".to_string())
        );
        assert_eq!(
            parser.next().await.unwrap().unwrap(),
            DatabaseEvent::AuthRevoked
        );
        assert!(parser.next().await.is_none());
    }

    #[tokio::test]
    async fn test_malformed_put_is_parse_error() {
        let mut parser = SseParser::new(mock_byte_stream("event: put\ndata: {oops\n\n"));
        let err = parser.next().await.unwrap().unwrap_err();
        assert_eq!(err.kind, ServiceErrorKind::Parse);
    }

    #[test]
    fn test_put_null_at_root_clears_collection() {
        let mut mirror = CollectionMirror::default();
        mirror.apply(&DatabaseEvent::Put {
            path: "/".to_string(),
            data: json!({"a": {"title": "x"}}),
        });
        mirror.apply(&DatabaseEvent::Put {
            path: "/".to_string(),
            data: Value::Null,
        });
        assert!(mirror.documents().is_empty());
    }

    #[test]
    fn test_patch_at_root_adds_documents() {
        let mut mirror = CollectionMirror::default();
        mirror.apply(&DatabaseEvent::Patch {
            path: "/".to_string(),
            data: json!({"a": {"title": "x"}, "b": {"title": "y"}}),
        });
        let mut ids: Vec<_> = mirror.documents().into_iter().map(|d| d.id).collect();
        ids.sort();
        assert_eq!(ids, ["a", "b"]);
    }
}
