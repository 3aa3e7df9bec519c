//! Per-invocation pipeline contexts
//!
//! One context type per operation family, each with named, strongly typed
//! fragment slots. A context is created at pipeline entry, threaded through
//! the stages, and discarded at exit; it is never persisted and never
//! shared between invocations. Input arguments are read-only after entry;
//! the caller identity is set once and never mutated.

use crate::domain::{Caller, Menu, Post};
use crate::error::FieldError;
use crate::normalize::PostView;
use crate::resolver::input::{CreatePostInput, GetPostArgs, PostFilters, UpdatePostInput};
use crate::storage::{NewPost, PostCriteria, PostPatch, TaxonomyPlan};

/// A page of normalized posts
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct PostPage {
    pub rows: Vec<PostView>,
    pub count: u64,
}

impl PostPage {
    pub fn empty() -> Self {
        Self {
            rows: Vec::new(),
            count: 0,
        }
    }
}

/// Context for the `posts` listing pipeline
pub struct ListContext {
    pub args: PostFilters,
    pub caller: Caller,

    /// Accumulated filter criteria; each builder stage writes exactly one
    /// fragment and never overwrites another's.
    pub criteria: PostCriteria,

    /// Raw rows produced by the query executor
    pub rows: Vec<Post>,
    pub total: u64,

    pub result: Option<PostPage>,
}

impl ListContext {
    pub fn new(args: PostFilters, caller: Caller) -> Self {
        Self {
            args,
            caller,
            criteria: PostCriteria::default(),
            rows: Vec::new(),
            total: 0,
            result: None,
        }
    }
}

/// Context for the single-post read pipeline
pub struct GetContext {
    pub args: GetPostArgs,
    pub caller: Caller,
    pub criteria: PostCriteria,
    pub record: Option<Post>,
    pub result: Option<PostView>,
}

impl GetContext {
    pub fn new(args: GetPostArgs, caller: Caller) -> Self {
        Self {
            args,
            caller,
            criteria: PostCriteria::default(),
            record: None,
            result: None,
        }
    }
}

/// Context for the create pipeline
pub struct CreateContext {
    pub args: CreatePostInput,
    pub caller: Caller,

    /// The assembled insert payload
    pub draft: Option<NewPost>,

    /// Non-fatal validation failures collected before the executor
    pub validation: Vec<FieldError>,

    pub record: Option<Post>,
    pub result: Option<PostView>,
}

impl CreateContext {
    pub fn new(args: CreatePostInput, caller: Caller) -> Self {
        Self {
            args,
            caller,
            draft: None,
            validation: Vec::new(),
            record: None,
            result: None,
        }
    }
}

/// Context for the update pipeline
pub struct UpdateContext {
    pub args: UpdatePostInput,
    pub caller: Caller,

    /// The record being updated, loaded before any builder stage runs
    pub current: Option<Post>,

    /// Accumulated update payload; one fragment per stage.
    pub patch: PostPatch,

    /// Planned taxonomy association changes
    pub taxonomy: Option<TaxonomyPlan>,

    /// Replacement menu document when a title change has to propagate
    pub menu: Option<Menu>,

    /// Non-fatal validation failures collected before the executor
    pub validation: Vec<FieldError>,

    pub record: Option<Post>,
    pub result: Option<PostView>,
}

impl UpdateContext {
    pub fn new(args: UpdatePostInput, caller: Caller) -> Self {
        Self {
            args,
            caller,
            current: None,
            patch: PostPatch::default(),
            taxonomy: None,
            menu: None,
            validation: Vec::new(),
            record: None,
            result: None,
        }
    }

    /// The loaded current record.
    ///
    /// Only meaningful after the load stage has run; stages after it may
    /// rely on the record being present because a missing record is a hard
    /// failure there.
    pub fn current(&self) -> &Post {
        self.current
            .as_ref()
            .expect("update stages run after the load stage")
    }

    /// Returns true if this run changes the post's title
    pub fn title_changed(&self) -> bool {
        match (&self.args.title, &self.current) {
            (Some(title), Some(current)) => title != &current.title,
            _ => false,
        }
    }

    /// Returns true if this run changes the source markup
    pub fn content_changed(&self) -> bool {
        match (&self.args.md, &self.current) {
            (Some(md), Some(current)) => md != &current.md,
            _ => false,
        }
    }
}

/// Outcome of the delete pipeline
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct DeleteResult {
    pub id: i64,
    /// False when the post was only moved to trash
    pub removed: bool,
}

/// Context for the delete pipeline
pub struct DeleteContext {
    pub id: i64,
    pub caller: Caller,
    pub current: Option<Post>,
    pub result: Option<DeleteResult>,
}

impl DeleteContext {
    pub fn new(id: i64, caller: Caller) -> Self {
        Self {
            id,
            caller,
            current: None,
            result: None,
        }
    }
}
