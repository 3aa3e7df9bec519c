//! Quillpress - a pipeline-based content management backend for blogs
//!
//! Read and write operations on posts are expressed as ordered chains of
//! independent stages sharing a per-request context: permission gate,
//! criteria or mutation builders, one storage executor, one normalizer.
//! The [`resolver::PostResolver`] is the caller-facing surface; storage,
//! rendering, authorization and image probing are trait collaborators
//! wired through [`resolver::Environment`].

pub mod cli;
pub mod domain;
pub mod error;
pub mod images;
pub mod normalize;
pub mod pipeline;
pub mod render;
pub mod resolver;
pub mod storage;

pub use domain::{Caller, Post, PostStatus, PostType, Role};
pub use error::{FieldError, ResolverError};
pub use normalize::PostView;
pub use resolver::{Environment, PostResolver};
