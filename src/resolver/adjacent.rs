//! Adjacency resolver
//!
//! Given a published post's slug, finds the nearest neighbours by id
//! within the published-articles filter set: previous is the greatest id
//! strictly below the anchor, next the smallest id strictly above. Either
//! side may be absent; a missing anchor is a hard failure, because
//! adjacency is meaningless without one.

use serde::Serialize;

use crate::domain::{PostStatus, PostType};
use crate::error::ResolverError;
use crate::normalize::{normalize_post, PostView};
use crate::storage::{PostCriteria, SortDir, SortField};

use super::Environment;

/// Neighbours of an anchor post
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AdjacentPosts {
    pub previous: Option<PostView>,
    pub next: Option<PostView>,
}

/// Runs the adjacency read path for a published article slug.
pub fn adjacent_posts(env: &Environment, slug: &str) -> Result<AdjacentPosts, ResolverError> {
    log::debug!("reached resolver: adjacentPosts");

    let filters = PostCriteria {
        status: Some(PostStatus::Publish),
        post_type: Some(PostType::Post),
        ..PostCriteria::default()
    };

    let anchor = env
        .store
        .find_one(&PostCriteria {
            slug: Some(slug.to_string()),
            ..filters.clone()
        })?
        .ok_or_else(|| ResolverError::not_found(format!("post '{}'", slug)))?;

    // the anchor's own slug drops out of the filter set for both lookups
    let previous = env.store.find_one(&PostCriteria {
        id_before: Some(anchor.id),
        order: Some((SortField::Id, SortDir::Desc)),
        ..filters.clone()
    })?;

    let next = env.store.find_one(&PostCriteria {
        id_after: Some(anchor.id),
        order: Some((SortField::Id, SortDir::Asc)),
        ..filters
    })?;

    Ok(AdjacentPosts {
        previous: previous.map(|post| normalize_post(post, &env.site)),
        next: next.map(|post| normalize_post(post, &env.site)),
    })
}
