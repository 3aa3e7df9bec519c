//! Mutation builder stages for the update pipeline
//!
//! The declared order encodes real dependencies: slug derivation needs the
//! loaded record, reading time needs the *new* rendered body and must be
//! written before the content fragment, taxonomy and menu plans are built
//! from reads only. Nothing is persisted until the executor runs, and the
//! executor refuses to run while collected validation errors exist — so a
//! failed run leaves no partial mutation behind.

use chrono::Utc;

use crate::domain::{reading_time, slugify, PostStatus};
use crate::error::{FieldError, ResolverError};
use crate::normalize::normalize_post;
use crate::pipeline::{Flow, Pipeline, PipelineConfigError, Stage, StageResult, UpdateContext};
use crate::render::word_count;
use crate::storage::{PostCriteria, TaxonomyPlan};

use super::permission::{check, Operation};
use super::Environment;

fn gate(ctx: &mut UpdateContext, env: &Environment) -> StageResult {
    check(&ctx.caller, Operation::UpdatePost, env)
}

/// Loads the record being updated; a missing record is a hard failure
/// before any fragment is built.
fn load_current(ctx: &mut UpdateContext, env: &Environment) -> StageResult {
    let criteria = PostCriteria::by_id(ctx.args.id);
    match env.store.find_one(&criteria)? {
        Some(record) => {
            ctx.current = Some(record);
            Ok(Flow::Continue)
        }
        None => Err(ResolverError::not_found(format!("post {}", ctx.args.id))),
    }
}

/// title / slug / featured fragment.
///
/// A changed title re-derives the slug unless one was given explicitly.
/// A derived or explicit slug colliding with a *different* post of the
/// same type is a caller-visible validation failure, never a silent
/// rename.
fn title_slug_featured(ctx: &mut UpdateContext, env: &Environment) -> StageResult {
    let current = ctx.current().clone();

    if let Some(title) = &ctx.args.title {
        if title.trim().is_empty() {
            ctx.validation
                .push(FieldError::new("title", "must not be empty"));
        } else if title != &current.title {
            ctx.patch.title = Some(title.clone());
        }
    }

    let explicit = ctx.args.slug.as_deref().map(slugify);
    let derived = match (&explicit, ctx.title_changed(), &ctx.args.title) {
        (None, true, Some(title)) => Some(slugify(title)),
        _ => None,
    };

    if let Some(candidate) = explicit.or(derived) {
        if candidate.is_empty() {
            ctx.validation
                .push(FieldError::new("slug", "derives to an empty slug"));
        } else if candidate != current.slug {
            let taken = env.store.find_one(&PostCriteria {
                slug: Some(candidate.clone()),
                post_type: Some(current.post_type),
                ..PostCriteria::default()
            })?;

            match taken {
                Some(other) if other.id != current.id => {
                    ctx.validation.push(FieldError::new(
                        "slug",
                        format!(
                            "'{}' is already used by another {}",
                            candidate, current.post_type
                        ),
                    ));
                }
                _ => ctx.patch.slug = Some(candidate),
            }
        }
    }

    if let Some(featured) = ctx.args.featured {
        ctx.patch.featured = Some(featured);
    }

    Ok(Flow::Continue)
}

/// dates / status fragment.
///
/// The publish timestamp is set the first time a post transitions into
/// `publish` and never overwritten on later edits.
fn dates_and_status(ctx: &mut UpdateContext, _env: &Environment) -> StageResult {
    let already_published = ctx.current().published_at.is_some();

    if let Some(status) = ctx.args.status {
        ctx.patch.status = Some(status);
        if status == PostStatus::Publish && !already_published {
            ctx.patch.published_at = Some(Utc::now());
        }
    }

    Ok(Flow::Continue)
}

/// cover image fragment; nothing is touched unless a new image arrived
fn cover_image(ctx: &mut UpdateContext, env: &Environment) -> StageResult {
    let Some(src) = ctx.args.cover_image.clone() else {
        return Ok(Flow::Continue);
    };

    match (ctx.args.cover_image_width, ctx.args.cover_image_height) {
        (Some(width), Some(height)) => {
            ctx.patch.cover_image_width = Some(width);
            ctx.patch.cover_image_height = Some(height);
        }
        _ => {
            if let Some((width, height)) = env.images.dimensions(&src) {
                ctx.patch.cover_image_width = Some(width);
                ctx.patch.cover_image_height = Some(height);
            }
        }
    }

    ctx.patch.cover_image = Some(src);
    Ok(Flow::Continue)
}

/// reading time fragment, recomputed from the rendered form of the *new*
/// markup whenever content changed in this run
fn update_reading_time(ctx: &mut UpdateContext, env: &Environment) -> StageResult {
    if !ctx.content_changed() {
        return Ok(Flow::Continue);
    }

    if let Some(md) = &ctx.args.md {
        let rendered = env.renderer.render(md);
        ctx.patch.reading_time = Some(reading_time(word_count(&rendered)));
    }

    Ok(Flow::Continue)
}

/// content fragment: source markup, its rendered form, the draft
/// revision and the excerpt
fn update_content(ctx: &mut UpdateContext, env: &Environment) -> StageResult {
    if let Some(md) = &ctx.args.md {
        ctx.patch.md = Some(md.clone());
        ctx.patch.html = Some(env.renderer.render(md));
    }

    if let Some(draft) = &ctx.args.md_draft {
        ctx.patch.md_draft = Some(Some(draft.clone()));
    } else if ctx.args.md.is_some() {
        // a saved body supersedes any stored draft revision
        ctx.patch.md_draft = Some(None);
    }

    if let Some(excerpt) = &ctx.args.excerpt {
        ctx.patch.excerpt = Some(excerpt.clone());
    }

    Ok(Flow::Continue)
}

/// taxonomy fragment: diff the requested set against current
/// associations. Missing records are planned for creation, stale
/// associations for removal; taxonomy records themselves are never
/// deleted.
fn update_taxonomies(ctx: &mut UpdateContext, env: &Environment) -> StageResult {
    let Some(wanted) = ctx.args.taxonomies.clone() else {
        return Ok(Flow::Continue);
    };

    let linked = env.store.taxonomies_for_post(ctx.args.id)?;
    let mut plan = TaxonomyPlan::default();
    let mut seen: Vec<(crate::domain::TaxonomyKind, String)> = Vec::new();

    for input in &wanted {
        let key = (input.kind, input.name.clone());
        if seen.contains(&key) {
            continue;
        }
        seen.push(key);

        if linked
            .iter()
            .any(|t| t.kind == input.kind && t.name == input.name)
        {
            continue;
        }

        match env.store.find_taxonomy(input.kind, &input.name)? {
            Some(existing) => plan.attach.push(existing.id),
            None => plan.create.push(input.clone()),
        }
    }

    for taxonomy in &linked {
        let still_wanted = wanted
            .iter()
            .any(|i| i.kind == taxonomy.kind && i.name == taxonomy.name);
        if !still_wanted {
            plan.detach.push(taxonomy.id);
        }
    }

    if !plan.is_empty() {
        ctx.taxonomy = Some(plan);
    }

    Ok(Flow::Continue)
}

/// menu fragment: when the title changed and a navigation entry
/// references this post, plan the relabeled document
fn menu_on_title_change(ctx: &mut UpdateContext, env: &Environment) -> StageResult {
    if !ctx.title_changed() {
        return Ok(Flow::Continue);
    }

    let Some(title) = ctx.args.title.clone() else {
        return Ok(Flow::Continue);
    };

    let mut menu = env.store.menu()?;
    if menu.relabel_post(ctx.args.id, &title) {
        ctx.menu = Some(menu);
    }

    Ok(Flow::Continue)
}

/// Terminal storage stage.
///
/// Refuses to run while collected validation errors exist, reporting all
/// of them; otherwise persists the assembled patch, the taxonomy plan
/// and the menu plan.
fn execute_update(ctx: &mut UpdateContext, env: &Environment) -> StageResult {
    if !ctx.validation.is_empty() {
        return Err(ResolverError::Validation {
            errors: std::mem::take(&mut ctx.validation),
        });
    }

    let record = env.store.update(ctx.args.id, &ctx.patch)?;

    if let Some(plan) = ctx.taxonomy.take() {
        for input in &plan.create {
            let taxonomy = env.store.create_taxonomy(input)?;
            env.store.attach_taxonomy(record.id, taxonomy.id)?;
        }
        for taxonomy_id in plan.attach {
            env.store.attach_taxonomy(record.id, taxonomy_id)?;
        }
        for taxonomy_id in plan.detach {
            env.store.detach_taxonomy(record.id, taxonomy_id)?;
        }
    }

    if let Some(menu) = ctx.menu.take() {
        env.store.save_menu(&menu)?;
    }

    ctx.record = Some(record);
    Ok(Flow::Continue)
}

fn normalize_record(ctx: &mut UpdateContext, env: &Environment) -> StageResult {
    if let Some(record) = ctx.record.take() {
        ctx.result = Some(normalize_post(record, &env.site));
    }
    Ok(Flow::Continue)
}

/// The `updatePost` pipeline. Builder order is a dependency chain and
/// must be preserved exactly; the executor stays second to last.
pub fn update_pipeline() -> Result<Pipeline<UpdateContext>, PipelineConfigError> {
    Pipeline::new(
        "updatePost",
        vec![
            Stage::new("editPostPerm", gate),
            Stage::new("loadCurrentPost", load_current),
            Stage::with_fragment("updateTitleAndSlugAndFeatured", "title", title_slug_featured),
            Stage::with_fragment("updateDatesAndStatus", "status", dates_and_status),
            Stage::with_fragment("updateCoverImage", "cover_image", cover_image),
            Stage::with_fragment("updateReadingTime", "reading_time", update_reading_time),
            Stage::with_fragment("updateContent", "content", update_content),
            Stage::with_fragment("updateTaxonomies", "taxonomies", update_taxonomies),
            Stage::with_fragment("updateMenuOnTitleChange", "menu", menu_on_title_change),
            Stage::new("executeUpdatePost", execute_update),
            Stage::new("normalizePost", normalize_record),
        ],
    )
}
