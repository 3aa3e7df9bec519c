//! Operation input arguments
//!
//! Raw caller input for each pipeline. Inputs are read-only once a
//! context is created; the criteria and mutation builder stages translate
//! them into typed fragments.

use serde::{Deserialize, Serialize};

use crate::domain::{PostStatus, PostType, TaxonomyInput};
use crate::storage::{SortDir, SortField};

/// Filters accepted by the `posts` listing
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PostFilters {
    pub post_type: Option<PostType>,
    pub status: Option<PostStatus>,
    pub featured: Option<bool>,
    /// Taxonomy slug
    pub tag: Option<String>,
    pub author_id: Option<i64>,
    /// Navigation menu entry to resolve into a post restriction
    pub menu: Option<String>,
    /// Substring search on the title
    pub search: Option<String>,
    pub sort_by: Option<SortField>,
    pub sort_order: Option<SortDir>,
    pub offset: Option<u32>,
    pub limit: Option<u32>,
}

/// Arguments for the single-post read
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GetPostArgs {
    pub id: Option<i64>,
    pub slug: Option<String>,
    pub post_type: Option<PostType>,
    pub status: Option<PostStatus>,
    /// Render the draft revision instead of the published body
    pub preview: bool,
}

/// Payload for `createPost`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CreatePostInput {
    pub title: String,
    pub post_type: PostType,
    pub status: PostStatus,
    pub md: String,
    pub excerpt: String,
    /// Explicit slug; derived from the title when absent
    pub slug: Option<String>,
    pub cover_image: Option<String>,
    pub cover_image_width: Option<u32>,
    pub cover_image_height: Option<u32>,
    pub featured: bool,
    pub taxonomies: Vec<TaxonomyInput>,
}

impl Default for CreatePostInput {
    fn default() -> Self {
        Self {
            title: String::new(),
            post_type: PostType::Post,
            status: PostStatus::Draft,
            md: String::new(),
            excerpt: String::new(),
            slug: None,
            cover_image: None,
            cover_image_width: None,
            cover_image_height: None,
            featured: false,
            taxonomies: Vec::new(),
        }
    }
}

/// Payload for `updatePost`; unset fields leave the record untouched
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct UpdatePostInput {
    pub id: i64,
    pub title: Option<String>,
    pub slug: Option<String>,
    pub featured: Option<bool>,
    pub status: Option<PostStatus>,
    pub cover_image: Option<String>,
    pub cover_image_width: Option<u32>,
    pub cover_image_height: Option<u32>,
    pub md: Option<String>,
    /// Save a draft revision without touching the published body
    pub md_draft: Option<String>,
    pub excerpt: Option<String>,
    /// Full requested taxonomy set; associations are diffed against it
    pub taxonomies: Option<Vec<TaxonomyInput>>,
}
