//! Shaping of untrusted listing records into [`NormalizedPost`].
//!
//! Normalization is total: any field that is missing, `null` or of the wrong
//! JSON type falls back to its default, so a record of any shape produces a
//! post.

use crate::types::{NormalizedPost, PostData, DEFAULT_KIND, DELETED_AUTHOR};
use serde_json::{Map, Value};

/// Normalize a raw listing child (`{"kind": .., "data": {..}}`) or an
/// already-persisted post.
pub fn normalize(raw: &Value) -> NormalizedPost {
    let kind = string_or(raw.get("kind"), DEFAULT_KIND);

    let empty = Map::new();
    let data = raw
        .get("data")
        .and_then(Value::as_object)
        .unwrap_or(&empty);

    NormalizedPost {
        kind,
        data: PostData {
            id: string_or(data.get("id"), ""),
            title: string_or(data.get("title"), ""),
            url: string_or(data.get("url"), ""),
            gallery_data: blob(data.get("gallery_data")),
            media_metadata: blob(data.get("media_metadata")),
            selftext: string_or(data.get("selftext"), ""),
            permalink: string_or(data.get("permalink"), ""),
            author: string_or(data.get("author"), DELETED_AUTHOR),
            subreddit: string_or(data.get("subreddit"), ""),
            num_comments: integer(data.get("num_comments")),
            subreddit_name_prefixed: string_or(data.get("subreddit_name_prefixed"), ""),
            media: blob(data.get("media")),
            link_flair_text: data
                .get("link_flair_text")
                .and_then(Value::as_str)
                .map(str::to_string),
            created_utc: data
                .get("created_utc")
                .and_then(Value::as_f64)
                .unwrap_or(0.0),
        },
    }
}

/// Normalize every record of a batch, preserving order.
pub fn normalize_all(raw: &[Value]) -> Vec<NormalizedPost> {
    raw.iter().map(normalize).collect()
}

fn string_or(value: Option<&Value>, default: &str) -> String {
    value
        .and_then(Value::as_str)
        .unwrap_or(default)
        .to_string()
}

fn integer(value: Option<&Value>) -> i64 {
    match value {
        Some(Value::Number(n)) => n
            .as_i64()
            .or_else(|| n.as_f64().map(|f| f as i64))
            .unwrap_or(0),
        _ => 0,
    }
}

fn blob(value: Option<&Value>) -> Option<Value> {
    match value {
        None | Some(Value::Null) => None,
        Some(v) => Some(v.clone()),
    }
}
