//! # Resolver Layer
//!
//! The caller-facing operation surface. Each operation runs exactly one
//! statically composed pipeline end-to-end: permission gate first, then
//! criteria or mutation builder stages, the storage executor, and the
//! normalizer. Pipelines are built once in [`PostResolver::new`] and
//! shared across concurrent requests; only per-invocation contexts
//! mutate.
//!
//! Collaborators reach the stages through [`Environment`]: the
//! persistence store, the authorizer, the markup renderer, the image
//! probe and the site config the normalizer needs.

mod adjacent;
mod create;
mod criteria;
mod delete;
pub mod input;
mod permission;
mod search;
mod update;

pub use adjacent::AdjacentPosts;
pub use permission::{Authorizer, Operation, RolePolicy};
pub use search::{SearchHit, SearchPage};

use std::sync::Arc;

use serde::Serialize;

use crate::domain::Caller;
use crate::error::ResolverError;
use crate::images::{ImageProbe, NoProbe};
use crate::normalize::PostView;
use crate::pipeline::{
    CreateContext, DeleteContext, DeleteResult, GetContext, ListContext, Pipeline,
    PipelineConfigError, PostPage, UpdateContext,
};
use crate::render::{CommonMark, MarkupRenderer};
use crate::storage::{PostCriteria, PostStore, SiteConfig, StatusCounts};

use input::{CreatePostInput, GetPostArgs, PostFilters, UpdatePostInput};

/// Collaborators shared by every stage of every pipeline
pub struct Environment {
    pub store: Arc<dyn PostStore>,
    pub auth: Arc<dyn Authorizer>,
    pub renderer: Arc<dyn MarkupRenderer>,
    pub images: Arc<dyn ImageProbe>,
    pub site: SiteConfig,
}

impl Environment {
    /// Environment with the default collaborators: role policy,
    /// CommonMark renderer, no image probe.
    pub fn new(store: Arc<dyn PostStore>, site: SiteConfig) -> Self {
        Self {
            store,
            auth: Arc::new(RolePolicy),
            renderer: Arc::new(CommonMark),
            images: Arc::new(NoProbe),
            site,
        }
    }

    pub fn with_auth(mut self, auth: Arc<dyn Authorizer>) -> Self {
        self.auth = auth;
        self
    }

    pub fn with_renderer(mut self, renderer: Arc<dyn MarkupRenderer>) -> Self {
        self.renderer = renderer;
        self
    }

    pub fn with_images(mut self, images: Arc<dyn ImageProbe>) -> Self {
        self.images = images;
        self
    }
}

/// Counts for the admin dashboard
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct StatsSummary {
    pub posts: StatusCounts,
    pub pages: StatusCounts,
    /// Published featured articles
    pub featured: u64,
}

/// The operation surface over posts.
///
/// Owns the statically declared pipelines; construction fails on a
/// misdeclared pipeline (empty stage list, colliding fragment claims)
/// rather than at request time.
pub struct PostResolver {
    env: Environment,
    list: Pipeline<ListContext>,
    get: Pipeline<GetContext>,
    create: Pipeline<CreateContext>,
    update: Pipeline<UpdateContext>,
    delete: Pipeline<DeleteContext>,
}

impl PostResolver {
    pub fn new(env: Environment) -> Result<Self, PipelineConfigError> {
        Ok(Self {
            list: criteria::list_pipeline()?,
            get: criteria::get_pipeline()?,
            create: create::create_pipeline()?,
            update: update::update_pipeline()?,
            delete: delete::delete_pipeline()?,
            env,
        })
    }

    pub fn environment(&self) -> &Environment {
        &self.env
    }

    /// Lists posts matching the given filters.
    pub fn list_posts(
        &self,
        filters: PostFilters,
        caller: Caller,
    ) -> Result<PostPage, ResolverError> {
        let mut ctx = ListContext::new(filters, caller);
        self.list.run(&mut ctx, &self.env)?;
        Ok(ctx.result.unwrap_or_else(PostPage::empty))
    }

    /// Fetches a single post; `Ok(None)` when nothing matches.
    pub fn get_post(
        &self,
        args: GetPostArgs,
        caller: Caller,
    ) -> Result<Option<PostView>, ResolverError> {
        let mut ctx = GetContext::new(args, caller);
        self.get.run(&mut ctx, &self.env)?;
        Ok(ctx.result)
    }

    /// Fuzzy search over published posts.
    pub fn search_posts(&self, query: &str) -> Result<SearchPage, ResolverError> {
        search::search_posts(&self.env, query)
    }

    /// Previous/next published articles around an anchor slug.
    pub fn adjacent_posts(&self, slug: &str) -> Result<AdjacentPosts, ResolverError> {
        adjacent::adjacent_posts(&self.env, slug)
    }

    /// Creates a post on behalf of the caller.
    pub fn create_post(
        &self,
        input: CreatePostInput,
        caller: Caller,
    ) -> Result<PostView, ResolverError> {
        let mut ctx = CreateContext::new(input, caller);
        self.create.run(&mut ctx, &self.env)?;
        Ok(ctx.result.expect("create pipeline ends with a normalizer"))
    }

    /// Applies an update payload through the mutation pipeline.
    pub fn update_post(
        &self,
        input: UpdatePostInput,
        caller: Caller,
    ) -> Result<PostView, ResolverError> {
        let mut ctx = UpdateContext::new(input, caller);
        self.update.run(&mut ctx, &self.env)?;
        Ok(ctx.result.expect("update pipeline ends with a normalizer"))
    }

    /// Moves a post to trash, or removes an already-trashed post.
    pub fn delete_post(&self, id: i64, caller: Caller) -> Result<DeleteResult, ResolverError> {
        let mut ctx = DeleteContext::new(id, caller);
        self.delete.run(&mut ctx, &self.env)?;
        Ok(ctx.result.expect("delete pipeline ends with its executor"))
    }

    /// Dashboard counts.
    pub fn stats(&self, caller: Caller) -> Result<StatsSummary, ResolverError> {
        log::debug!("reached resolver: stats");

        if !self.env.auth.authorize(&caller, Operation::Stats) {
            return Err(ResolverError::Unauthorized {
                operation: Operation::Stats.name(),
            });
        }

        let posts = self.env.store.status_counts(crate::domain::PostType::Post)?;
        let pages = self.env.store.status_counts(crate::domain::PostType::Page)?;
        let featured = self.env.store.count(&PostCriteria {
            post_type: Some(crate::domain::PostType::Post),
            status: Some(crate::domain::PostStatus::Publish),
            featured: Some(true),
            ..PostCriteria::default()
        })?;

        Ok(StatsSummary {
            posts,
            pages,
            featured,
        })
    }
}


#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Role;
    use super::test_support::test_env;

    #[test]
    fn every_pipeline_constructs() {
        assert!(PostResolver::new(test_env()).is_ok());
    }

    #[test]
    fn stats_requires_authentication() {
        let resolver = PostResolver::new(test_env()).unwrap();

        let err = resolver.stats(Caller::anonymous()).unwrap_err();
        assert_eq!(err.kind(), "authorization");

        let summary = resolver
            .stats(Caller::authenticated(1, Role::Reader))
            .unwrap();
        assert_eq!(summary.posts, StatusCounts::default());
    }
}
