use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Kind tag Reddit uses for link and text posts.
pub const DEFAULT_KIND: &str = "t3";

/// Author shown for posts whose author is missing.
pub const DELETED_AUTHOR: &str = "[deleted]";

/// A post in the fixed shape the store persists: a Reddit "thing" envelope
/// around [`PostData`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NormalizedPost {
    pub kind: String,
    pub data: PostData,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PostData {
    pub id: String,
    pub title: String,
    pub url: String,
    pub gallery_data: Option<Value>,
    pub media_metadata: Option<Value>,
    pub selftext: String,
    pub permalink: String,
    pub author: String,
    pub subreddit: String,
    pub num_comments: i64,
    pub subreddit_name_prefixed: String,
    pub media: Option<Value>,
    pub link_flair_text: Option<String>,
    #[serde(default)]
    pub created_utc: f64,
}

impl NormalizedPost {
    pub fn id(&self) -> &str {
        &self.data.id
    }

    /// Only posts with a non-empty id take part in deduplication.
    pub fn has_id(&self) -> bool {
        !self.data.id.is_empty()
    }
}

impl Default for PostData {
    fn default() -> Self {
        Self {
            id: String::new(),
            title: String::new(),
            url: String::new(),
            gallery_data: None,
            media_metadata: None,
            selftext: String::new(),
            permalink: String::new(),
            author: DELETED_AUTHOR.to_string(),
            subreddit: String::new(),
            num_comments: 0,
            subreddit_name_prefixed: String::new(),
            media: None,
            link_flair_text: None,
            created_utc: 0.0,
        }
    }
}

impl Default for NormalizedPost {
    fn default() -> Self {
        Self {
            kind: DEFAULT_KIND.to_string(),
            data: PostData::default(),
        }
    }
}

/// Result of merging a batch into the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MergeOutcome {
    pub added: usize,
    pub total: usize,
}
