//! Post domain model
//!
//! Posts are the content units of the system. A post is either an article
//! (`post`) or a standalone page (`page`); its slug is unique per type.
//! Status transitions are caller-driven and never inferred.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Words-per-minute used for reading time estimates.
const READING_WPM: usize = 250;

#[derive(Debug, Error, PartialEq)]
#[error("Unknown {what}: '{value}'")]
pub struct ParseEnumError {
    pub what: &'static str,
    pub value: String,
}

/// Content type of a post
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum PostType {
    #[default]
    Post,
    Page,
}

impl PostType {
    pub fn as_str(&self) -> &'static str {
        match self {
            PostType::Post => "post",
            PostType::Page => "page",
        }
    }
}

impl fmt::Display for PostType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PostType {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "post" => Ok(PostType::Post),
            "page" => Ok(PostType::Page),
            other => Err(ParseEnumError {
                what: "post type",
                value: other.to_string(),
            }),
        }
    }
}

/// Publication status of a post
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum PostStatus {
    #[default]
    Draft,
    Publish,
    Trash,
}

impl PostStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PostStatus::Draft => "draft",
            PostStatus::Publish => "publish",
            PostStatus::Trash => "trash",
        }
    }

    /// Returns true if the post is publicly visible
    pub fn is_public(&self) -> bool {
        matches!(self, PostStatus::Publish)
    }
}

impl fmt::Display for PostStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PostStatus {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "draft" => Ok(PostStatus::Draft),
            "publish" => Ok(PostStatus::Publish),
            "trash" => Ok(PostStatus::Trash),
            other => Err(ParseEnumError {
                what: "post status",
                value: other.to_string(),
            }),
        }
    }
}

/// A stored post record, exactly as the persistence layer holds it.
///
/// This is the *raw* shape. Caller-facing output goes through
/// [`crate::normalize::normalize_post`], which produces a distinct view type;
/// raw records are never handed to callers directly.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Post {
    pub id: i64,

    #[serde(rename = "type")]
    pub post_type: PostType,

    pub status: PostStatus,

    pub title: String,

    /// Unique per post type
    pub slug: String,

    /// Source markup
    pub md: String,

    /// Unpublished draft revision of the source markup, if any
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub md_draft: Option<String>,

    /// Rendered form of `md`
    pub html: String,

    pub excerpt: String,

    /// Stored as a plain path or absolute URL; reshaping into a nested
    /// object happens at normalization time.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cover_image: Option<String>,

    #[serde(default)]
    pub cover_image_width: u32,

    #[serde(default)]
    pub cover_image_height: u32,

    #[serde(default)]
    pub featured: bool,

    /// Precomputed estimate, e.g. "3 min read"
    pub reading_time: String,

    pub author_id: i64,

    pub created_at: DateTime<Utc>,

    pub updated_at: DateTime<Utc>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub published_at: Option<DateTime<Utc>>,
}

impl Post {
    /// Returns true if this post has ever been published
    pub fn has_publish_date(&self) -> bool {
        self.published_at.is_some()
    }
}

/// Derives a URL slug from a title.
///
/// Lowercases, maps whitespace and punctuation runs to single dashes and
/// trims leading/trailing dashes. An empty or all-punctuation title yields
/// an empty slug, which the create/update stages reject.
pub fn slugify(title: &str) -> String {
    let mut slug = String::with_capacity(title.len());
    let mut pending_dash = false;

    for c in title.chars() {
        if c.is_alphanumeric() {
            if pending_dash && !slug.is_empty() {
                slug.push('-');
            }
            pending_dash = false;
            for lc in c.to_lowercase() {
                slug.push(lc);
            }
        } else {
            pending_dash = true;
        }
    }

    slug
}

/// Estimates reading time from a word count at a fixed reading speed.
///
/// Always at least one minute so short posts don't render "0 min read".
pub fn reading_time(word_count: usize) -> String {
    let minutes = word_count.div_ceil(READING_WPM).max(1);
    format!("{} min read", minutes)
}
