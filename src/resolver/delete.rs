//! Delete pipeline
//!
//! Deleting is two-step: the first delete moves a post to `trash`; a
//! second delete of an already-trashed post removes the row for good.

use crate::domain::PostStatus;
use crate::error::ResolverError;
use crate::pipeline::{DeleteContext, DeleteResult, Flow, Pipeline, PipelineConfigError, Stage,
    StageResult};
use crate::storage::{PostCriteria, PostPatch};

use super::permission::{check, Operation};
use super::Environment;

fn gate(ctx: &mut DeleteContext, env: &Environment) -> StageResult {
    check(&ctx.caller, Operation::DeletePost, env)
}

fn load_current(ctx: &mut DeleteContext, env: &Environment) -> StageResult {
    match env.store.find_one(&PostCriteria::by_id(ctx.id))? {
        Some(record) => {
            ctx.current = Some(record);
            Ok(Flow::Continue)
        }
        None => Err(ResolverError::not_found(format!("post {}", ctx.id))),
    }
}

fn execute_delete(ctx: &mut DeleteContext, env: &Environment) -> StageResult {
    let trashed_already = ctx
        .current
        .as_ref()
        .is_some_and(|post| post.status == PostStatus::Trash);

    if trashed_already {
        env.store.delete(ctx.id)?;
        ctx.result = Some(DeleteResult {
            id: ctx.id,
            removed: true,
        });
    } else {
        let patch = PostPatch {
            status: Some(PostStatus::Trash),
            ..PostPatch::default()
        };
        env.store.update(ctx.id, &patch)?;
        ctx.result = Some(DeleteResult {
            id: ctx.id,
            removed: false,
        });
    }

    Ok(Flow::Continue)
}

/// The `deletePost` pipeline
pub fn delete_pipeline() -> Result<Pipeline<DeleteContext>, PipelineConfigError> {
    Pipeline::new(
        "deletePost",
        vec![
            Stage::new("editPostPerm", gate),
            Stage::new("loadCurrentPost", load_current),
            Stage::new("executeDeletePost", execute_delete),
        ],
    )
}
