//! Filtering and pagination over an in-memory post collection.

use crate::types::NormalizedPost;
use serde::{Deserialize, Serialize};

pub const PAGE_SIZE: usize = 10;

/// Optional filters; blank values apply no constraint.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PostFilters {
    pub author: Option<String>,
    pub subreddit: Option<String>,
    pub flair: Option<String>,
    pub keyword: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryPage {
    pub items: Vec<NormalizedPost>,
    pub current_page: usize,
    pub total_pages: usize,
    pub total_results: usize,
}

impl PostFilters {
    pub fn matches(&self, post: &NormalizedPost) -> bool {
        let data = &post.data;

        if let Some(author) = active(&self.author) {
            if !contains_ci(&data.author, author) {
                return false;
            }
        }

        if let Some(subreddit) = active(&self.subreddit) {
            if !subreddit.eq_ignore_ascii_case("all")
                && data.subreddit.to_lowercase() != subreddit.to_lowercase()
            {
                return false;
            }
        }

        if let Some(flair) = active(&self.flair) {
            match &data.link_flair_text {
                Some(text) if contains_ci(text, flair) => {}
                _ => return false,
            }
        }

        if let Some(keyword) = active(&self.keyword) {
            if !contains_ci(&data.title, keyword) && !contains_ci(&data.selftext, keyword) {
                return false;
            }
        }

        true
    }
}

/// Filter `posts` and cut out the requested page.
///
/// Pages past the end come back empty but still report the real totals.
pub fn query(posts: &[NormalizedPost], filters: &PostFilters, page: usize) -> QueryPage {
    let current_page = page.max(1);
    let matching: Vec<&NormalizedPost> = posts.iter().filter(|p| filters.matches(p)).collect();

    let total_results = matching.len();
    let total_pages = total_results.div_ceil(PAGE_SIZE);

    let start = (current_page - 1).saturating_mul(PAGE_SIZE);
    let items = matching
        .into_iter()
        .skip(start)
        .take(PAGE_SIZE)
        .cloned()
        .collect();

    QueryPage {
        items,
        current_page,
        total_pages,
        total_results,
    }
}

/// Parse a `page` query parameter: leading integer digits are honoured
/// (`"3abc"` is page 3), anything non-numeric or below 1 becomes page 1.
pub fn parse_page(raw: Option<&str>) -> usize {
    let Some(raw) = raw else {
        return 1;
    };
    let trimmed = raw.trim_start();
    let (negative, digits) = match trimmed.as_bytes().first() {
        Some(b'-') => (true, &trimmed[1..]),
        Some(b'+') => (false, &trimmed[1..]),
        _ => (false, trimmed),
    };
    let end = digits
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(digits.len());

    if negative || end == 0 {
        return 1;
    }

    digits[..end].parse::<usize>().unwrap_or(usize::MAX).max(1)
}

fn active(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|v| !v.is_empty())
}

fn contains_ci(haystack: &str, needle: &str) -> bool {
    haystack.to_lowercase().contains(&needle.to_lowercase())
}
