//! Create pipeline
//!
//! Assembles a full insert payload from the caller's input: derived slug
//! with create-time de-duplication (unlike update, a colliding slug is
//! suffixed rather than rejected, so drafts with a reused title don't
//! bounce), rendered body, reading time and the publish timestamp when
//! the post is born published.

use chrono::Utc;

use crate::domain::{reading_time, slugify, PostStatus};
use crate::error::{FieldError, ResolverError};
use crate::normalize::normalize_post;
use crate::pipeline::{CreateContext, Flow, Pipeline, PipelineConfigError, Stage, StageResult};
use crate::render::word_count;
use crate::storage::{NewPost, PostCriteria};

use super::permission::{check, Operation};
use super::Environment;

fn gate(ctx: &mut CreateContext, env: &Environment) -> StageResult {
    check(&ctx.caller, Operation::CreatePost, env)
}

/// Finds the first free slug for a type, suffixing `-1`, `-2`, ... while
/// the candidate is taken.
fn dedupe_slug(base: &str, ctx: &CreateContext, env: &Environment) -> Result<String, ResolverError> {
    let mut candidate = base.to_string();
    let mut suffix = 0u32;

    loop {
        let taken = env.store.find_one(&PostCriteria {
            slug: Some(candidate.clone()),
            post_type: Some(ctx.args.post_type),
            ..PostCriteria::default()
        })?;

        if taken.is_none() {
            return Ok(candidate);
        }

        suffix += 1;
        candidate = format!("{}-{}", base, suffix);
    }
}

/// Assembles the insert payload fragment
fn assemble_draft(ctx: &mut CreateContext, env: &Environment) -> StageResult {
    if ctx.args.title.trim().is_empty() {
        ctx.validation
            .push(FieldError::new("title", "must not be empty"));
    }

    let base_slug = match &ctx.args.slug {
        Some(explicit) => slugify(explicit),
        None => slugify(&ctx.args.title),
    };
    if base_slug.is_empty() && !ctx.args.title.trim().is_empty() {
        ctx.validation
            .push(FieldError::new("slug", "derives to an empty slug"));
    }

    if !ctx.validation.is_empty() {
        return Ok(Flow::Continue);
    }

    let Some(author_id) = ctx.caller.id else {
        return Err(ResolverError::Unauthorized {
            operation: Operation::CreatePost.name(),
        });
    };

    let slug = dedupe_slug(&base_slug, ctx, env)?;
    let html = env.renderer.render(&ctx.args.md);
    let reading = reading_time(word_count(&html));

    let (width, height) = match (&ctx.args.cover_image, ctx.args.cover_image_width, ctx.args.cover_image_height) {
        (Some(_), Some(w), Some(h)) => (w, h),
        (Some(src), _, _) => env.images.dimensions(src).unwrap_or((0, 0)),
        (None, _, _) => (0, 0),
    };

    ctx.draft = Some(NewPost {
        post_type: ctx.args.post_type,
        status: ctx.args.status,
        title: ctx.args.title.clone(),
        slug,
        md: ctx.args.md.clone(),
        html,
        excerpt: ctx.args.excerpt.clone(),
        cover_image: ctx.args.cover_image.clone(),
        cover_image_width: width,
        cover_image_height: height,
        featured: ctx.args.featured,
        reading_time: reading,
        author_id,
        published_at: (ctx.args.status == PostStatus::Publish).then(Utc::now),
    });

    Ok(Flow::Continue)
}

/// Terminal storage stage: one insert plus requested taxonomy links
fn execute_create(ctx: &mut CreateContext, env: &Environment) -> StageResult {
    if !ctx.validation.is_empty() {
        return Err(ResolverError::Validation {
            errors: std::mem::take(&mut ctx.validation),
        });
    }

    let Some(draft) = ctx.draft.take() else {
        return Err(ResolverError::validation(
            "payload",
            "no insert payload was assembled",
        ));
    };

    let record = env.store.create(&draft)?;

    let mut seen: Vec<(crate::domain::TaxonomyKind, String)> = Vec::new();
    for input in &ctx.args.taxonomies {
        let key = (input.kind, input.name.clone());
        if seen.contains(&key) {
            continue;
        }
        seen.push(key);

        let taxonomy = match env.store.find_taxonomy(input.kind, &input.name)? {
            Some(existing) => existing,
            None => env.store.create_taxonomy(input)?,
        };
        env.store.attach_taxonomy(record.id, taxonomy.id)?;
    }

    ctx.record = Some(record);
    Ok(Flow::Continue)
}

fn normalize_record(ctx: &mut CreateContext, env: &Environment) -> StageResult {
    if let Some(record) = ctx.record.take() {
        ctx.result = Some(normalize_post(record, &env.site));
    }
    Ok(Flow::Continue)
}

/// The `createPost` pipeline
pub fn create_pipeline() -> Result<Pipeline<CreateContext>, PipelineConfigError> {
    Pipeline::new(
        "createPost",
        vec![
            Stage::new("createPostsPerm", gate),
            Stage::with_fragment("assembleDraft", "draft", assemble_draft),
            Stage::new("executeCreatePost", execute_create),
            Stage::new("normalizePost", normalize_record),
        ],
    )
}
