//! Domain models for Quillpress
//!
//! Contains the core content records without any I/O concerns.

mod author;
mod menu;
mod post;
mod taxonomy;

pub use author::{Author, Caller, Role};
pub use menu::{Menu, MenuItem};
pub use post::{reading_time, slugify, ParseEnumError, Post, PostStatus, PostType};
pub use taxonomy::{Taxonomy, TaxonomyInput, TaxonomyKind};
