//! Persistence collaborator interface
//!
//! The pipeline talks to storage through [`PostStore`]. Builder stages may
//! *read* (slug collision checks, taxonomy diffs, menu lookups); every
//! *write* happens inside an executor stage, after all builder stages have
//! succeeded. A uniqueness violation is a stage failure, never retried.

use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::domain::{
    Author, Menu, Post, PostStatus, PostType, Role, Taxonomy, TaxonomyInput, TaxonomyKind,
};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("record not found")]
    NotFound,

    #[error("unique constraint violated on {field}")]
    Constraint { field: &'static str },

    #[error("corrupt stored record: {0}")]
    Corrupt(String),

    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("corrupt stored document: {0}")]
    Document(#[from] serde_json::Error),
}

/// Field a post listing can be ordered by
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortField {
    Id,
    CreatedAt,
    UpdatedAt,
    PublishedAt,
}

impl SortField {
    pub fn column(&self) -> &'static str {
        match self {
            SortField::Id => "id",
            SortField::CreatedAt => "created_at",
            SortField::UpdatedAt => "updated_at",
            SortField::PublishedAt => "published_at",
        }
    }
}

/// Sort direction
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortDir {
    Asc,
    Desc,
}

impl SortDir {
    pub fn keyword(&self) -> &'static str {
        match self {
            SortDir::Asc => "ASC",
            SortDir::Desc => "DESC",
        }
    }
}

/// Accumulated filter criteria for post reads.
///
/// Each field is one named fragment, written by exactly one criteria
/// builder stage. An unset field means "no constraint on that dimension",
/// never "empty result".
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PostCriteria {
    pub id: Option<i64>,
    pub slug: Option<String>,
    pub status: Option<PostStatus>,
    pub post_type: Option<PostType>,
    pub featured: Option<bool>,
    pub author_id: Option<i64>,
    /// Restrict to posts linked to the taxonomy with this slug
    pub tag_slug: Option<String>,
    /// Substring match on the title
    pub search_term: Option<String>,
    /// Strictly-less-than id bound (adjacency)
    pub id_before: Option<i64>,
    /// Strictly-greater-than id bound (adjacency)
    pub id_after: Option<i64>,
    pub order: Option<(SortField, SortDir)>,
    pub limit: Option<u32>,
    pub offset: Option<u32>,
}

impl PostCriteria {
    /// Criteria matching a single id
    pub fn by_id(id: i64) -> Self {
        Self {
            id: Some(id),
            ..Self::default()
        }
    }
}

/// Insert payload assembled by the create pipeline
#[derive(Debug, Clone, PartialEq)]
pub struct NewPost {
    pub post_type: PostType,
    pub status: PostStatus,
    pub title: String,
    pub slug: String,
    pub md: String,
    pub html: String,
    pub excerpt: String,
    pub cover_image: Option<String>,
    pub cover_image_width: u32,
    pub cover_image_height: u32,
    pub featured: bool,
    pub reading_time: String,
    pub author_id: i64,
    pub published_at: Option<DateTime<Utc>>,
}

/// Update payload assembled by the mutation builder stages.
///
/// Every field is one named fragment; unset fields leave the stored value
/// untouched. `md_draft` distinguishes "leave alone" (`None`) from
/// "clear" (`Some(None)`) because publishing discards the draft revision.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PostPatch {
    pub title: Option<String>,
    pub slug: Option<String>,
    pub featured: Option<bool>,
    pub status: Option<PostStatus>,
    pub published_at: Option<DateTime<Utc>>,
    pub cover_image: Option<String>,
    pub cover_image_width: Option<u32>,
    pub cover_image_height: Option<u32>,
    pub reading_time: Option<String>,
    pub md: Option<String>,
    pub md_draft: Option<Option<String>>,
    pub html: Option<String>,
    pub excerpt: Option<String>,
}

impl PostPatch {
    pub fn is_empty(&self) -> bool {
        self == &Self::default()
    }
}

/// Planned taxonomy association changes for one post.
///
/// Computed by the taxonomy builder stage, applied by the executor.
/// Taxonomy records are created when missing and never deleted.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TaxonomyPlan {
    /// Records to create, then attach
    pub create: Vec<TaxonomyInput>,
    /// Existing records to attach
    pub attach: Vec<i64>,
    /// Associations to remove
    pub detach: Vec<i64>,
}

impl TaxonomyPlan {
    pub fn is_empty(&self) -> bool {
        self.create.is_empty() && self.attach.is_empty() && self.detach.is_empty()
    }
}

/// Per-status post counts for one content type
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Serialize)]
pub struct StatusCounts {
    pub draft: u64,
    pub publish: u64,
    pub trash: u64,
}

/// The persistence collaborator.
///
/// `find_all` honors pagination; `count` reports the total matching rows
/// regardless of limit/offset so listings can report both a page and the
/// overall count.
pub trait PostStore: Send + Sync {
    fn find_one(&self, criteria: &PostCriteria) -> Result<Option<Post>, StoreError>;
    fn find_all(&self, criteria: &PostCriteria) -> Result<Vec<Post>, StoreError>;
    fn count(&self, criteria: &PostCriteria) -> Result<u64, StoreError>;
    fn create(&self, post: &NewPost) -> Result<Post, StoreError>;
    fn update(&self, id: i64, patch: &PostPatch) -> Result<Post, StoreError>;
    fn delete(&self, id: i64) -> Result<(), StoreError>;

    fn taxonomies_for_post(&self, post_id: i64) -> Result<Vec<Taxonomy>, StoreError>;
    fn find_taxonomy(&self, kind: TaxonomyKind, name: &str)
        -> Result<Option<Taxonomy>, StoreError>;
    fn create_taxonomy(&self, input: &TaxonomyInput) -> Result<Taxonomy, StoreError>;
    fn attach_taxonomy(&self, post_id: i64, taxonomy_id: i64) -> Result<(), StoreError>;
    fn detach_taxonomy(&self, post_id: i64, taxonomy_id: i64) -> Result<(), StoreError>;

    fn menu(&self) -> Result<Menu, StoreError>;
    fn save_menu(&self, menu: &Menu) -> Result<(), StoreError>;

    fn author(&self, id: i64) -> Result<Option<Author>, StoreError>;
    fn create_author(&self, name: &str, role: Role) -> Result<Author, StoreError>;

    fn status_counts(&self, post_type: PostType) -> Result<StatusCounts, StoreError>;
}
