//! Criteria builder stages for the read pipelines
//!
//! Each stage reads the initial arguments and writes exactly one named
//! fragment of [`PostCriteria`](crate::storage::PostCriteria); fragment
//! claims are checked at pipeline construction, so two stages can never
//! fight over a key. The query executor is declared last and is the only
//! stage that touches storage.

use crate::normalize::normalize_post;
use crate::pipeline::{Flow, GetContext, ListContext, Pipeline, PipelineConfigError, PostPage,
    Stage, StageResult};
use crate::storage::{SortDir, SortField};

use super::permission::{check, Operation};
use super::Environment;

/// Listing page size when the caller doesn't ask for one
const DEFAULT_LIMIT: u32 = 20;
const MAX_LIMIT: u32 = 100;

/// Body placeholder in list payloads; full bodies only travel on
/// single-post reads.
const TRUNCATED: &str = "...[truncated]";

fn gate(ctx: &mut ListContext, env: &Environment) -> StageResult {
    check(&ctx.caller, Operation::ListPosts, env)
}

/// status + type + featured in one fragment; anonymous callers are
/// clamped to published content no matter what they asked for.
fn status_type_featured(ctx: &mut ListContext, _env: &Environment) -> StageResult {
    ctx.criteria.status = ctx.args.status;
    ctx.criteria.post_type = ctx.args.post_type;
    ctx.criteria.featured = ctx.args.featured;

    if !ctx.caller.is_authenticated() {
        ctx.criteria.status = Some(crate::domain::PostStatus::Publish);
    }

    Ok(Flow::Continue)
}

/// Resolves a menu entry into a post-id restriction.
///
/// A menu argument naming no known entry (or an entry that doesn't point
/// at a post) matches nothing; post ids start at 1, so 0 is the empty
/// restriction.
fn menu_filter(ctx: &mut ListContext, env: &Environment) -> StageResult {
    let Some(wanted) = &ctx.args.menu else {
        return Ok(Flow::Continue);
    };

    let menu = env.store.menu()?;
    let target = menu
        .items
        .iter()
        .find(|item| {
            item.slug.as_deref() == Some(wanted.as_str())
                || crate::domain::slugify(&item.label) == *wanted
        })
        .and_then(|item| item.post_id);

    ctx.criteria.id = Some(target.unwrap_or(0));
    Ok(Flow::Continue)
}

fn tag_filter(ctx: &mut ListContext, _env: &Environment) -> StageResult {
    ctx.criteria.tag_slug = ctx.args.tag.clone();
    Ok(Flow::Continue)
}

fn author_filter(ctx: &mut ListContext, _env: &Environment) -> StageResult {
    ctx.criteria.author_id = ctx.args.author_id;
    Ok(Flow::Continue)
}

fn pagination(ctx: &mut ListContext, _env: &Environment) -> StageResult {
    ctx.criteria.offset = ctx.args.offset;
    ctx.criteria.limit = Some(ctx.args.limit.unwrap_or(DEFAULT_LIMIT).min(MAX_LIMIT));
    Ok(Flow::Continue)
}

fn order_and_sort(ctx: &mut ListContext, _env: &Environment) -> StageResult {
    let field = ctx.args.sort_by.unwrap_or(SortField::CreatedAt);
    let dir = ctx.args.sort_order.unwrap_or(SortDir::Desc);
    ctx.criteria.order = Some((field, dir));
    Ok(Flow::Continue)
}

fn search_term(ctx: &mut ListContext, _env: &Environment) -> StageResult {
    if let Some(term) = &ctx.args.search {
        if !term.trim().is_empty() {
            ctx.criteria.search_term = Some(term.clone());
        }
    }
    Ok(Flow::Continue)
}

/// Terminal storage stage for the listing
fn execute_post_query(ctx: &mut ListContext, env: &Environment) -> StageResult {
    ctx.rows = env.store.find_all(&ctx.criteria)?;
    ctx.total = env.store.count(&ctx.criteria)?;
    Ok(Flow::Continue)
}

fn normalize_rows(ctx: &mut ListContext, env: &Environment) -> StageResult {
    let rows = std::mem::take(&mut ctx.rows)
        .into_iter()
        .map(|post| {
            let mut view = normalize_post(post, &env.site);
            view.md = TRUNCATED.to_string();
            view.html = TRUNCATED.to_string();
            view
        })
        .collect();

    ctx.result = Some(PostPage {
        rows,
        count: ctx.total,
    });
    Ok(Flow::Continue)
}

/// The `posts` pipeline: gate, one stage per criteria fragment, executor,
/// normalizer. The builder order between the gate and the executor is
/// immaterial because fragments are disjoint; the executor must stay last.
pub fn list_pipeline() -> Result<Pipeline<ListContext>, PipelineConfigError> {
    Pipeline::new(
        "posts",
        vec![
            Stage::new("checkDisplayAccess", gate),
            Stage::with_fragment("statusTypeFeatured", "visibility", status_type_featured),
            Stage::with_fragment("menuFilter", "menu", menu_filter),
            Stage::with_fragment("tagFilter", "tag", tag_filter),
            Stage::with_fragment("authorFilter", "author", author_filter),
            Stage::with_fragment("pagination", "pagination", pagination),
            Stage::with_fragment("orderAndSort", "order", order_and_sort),
            Stage::with_fragment("searchTerm", "search", search_term),
            Stage::new("executePostQuery", execute_post_query),
            Stage::new("normalizeRows", normalize_rows),
        ],
    )
}

fn get_gate(ctx: &mut GetContext, env: &Environment) -> StageResult {
    check(&ctx.caller, Operation::GetPost, env)
}

fn get_conditions(ctx: &mut GetContext, _env: &Environment) -> StageResult {
    ctx.criteria.id = ctx.args.id;
    ctx.criteria.slug = ctx.args.slug.clone();
    ctx.criteria.post_type = ctx.args.post_type;
    ctx.criteria.status = ctx.args.status;

    if !ctx.caller.is_authenticated() {
        ctx.criteria.status = Some(crate::domain::PostStatus::Publish);
    }

    Ok(Flow::Continue)
}

/// Terminal storage stage for the single-post read.
///
/// A missing record short-circuits with a null result rather than
/// failing; that asymmetry with the adjacency resolver is deliberate.
fn fetch_post(ctx: &mut GetContext, env: &Environment) -> StageResult {
    match env.store.find_one(&ctx.criteria)? {
        Some(record) => {
            ctx.record = Some(record);
            Ok(Flow::Continue)
        }
        None => Ok(Flow::Halt),
    }
}

/// Swaps in the rendered draft revision for authenticated previews
fn preview_draft(ctx: &mut GetContext, env: &Environment) -> StageResult {
    if !ctx.args.preview || !ctx.caller.is_authenticated() {
        return Ok(Flow::Continue);
    }

    if let Some(record) = &mut ctx.record {
        if let Some(draft) = &record.md_draft {
            record.html = env.renderer.render(draft);
        }
    }

    Ok(Flow::Continue)
}

fn normalize_record(ctx: &mut GetContext, env: &Environment) -> StageResult {
    if let Some(record) = ctx.record.take() {
        ctx.result = Some(normalize_post(record, &env.site));
    }
    Ok(Flow::Continue)
}

/// The `post` pipeline
pub fn get_pipeline() -> Result<Pipeline<GetContext>, PipelineConfigError> {
    Pipeline::new(
        "post",
        vec![
            Stage::new("checkDisplayAccess", get_gate),
            Stage::with_fragment("conditions", "conditions", get_conditions),
            Stage::new("fetchPost", fetch_post),
            Stage::new("previewDraft", preview_draft),
            Stage::new("normalizePost", normalize_record),
        ],
    )
}
