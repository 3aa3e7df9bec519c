//! Author and caller identity
//!
//! Authors are referenced by posts and are read-only from the pipeline's
//! perspective. A `Caller` is the per-request identity threaded through
//! pipeline contexts; it is set once at pipeline entry and never mutated.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Role of an author account
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Admin,
    Author,
    #[default]
    Reader,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::Author => "author",
            Role::Reader => "reader",
        }
    }

    /// Returns true if this role may create and edit content
    pub fn can_write(&self) -> bool {
        matches!(self, Role::Admin | Role::Author)
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A stored author record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Author {
    pub id: i64,
    pub name: String,
    /// Path or absolute URL; normalized the same way as cover images
    #[serde(default)]
    pub avatar: String,
    pub role: Role,
}

/// The identity a pipeline runs on behalf of
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Caller {
    /// Author id when authenticated
    pub id: Option<i64>,
    pub role: Role,
}

impl Caller {
    /// An unauthenticated caller; sees only published content
    pub fn anonymous() -> Self {
        Self {
            id: None,
            role: Role::Reader,
        }
    }

    pub fn authenticated(id: i64, role: Role) -> Self {
        Self { id: Some(id), role }
    }

    pub fn is_authenticated(&self) -> bool {
        self.id.is_some()
    }
}
