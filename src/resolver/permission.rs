//! Authorization collaborator and permission gate
//!
//! Every pipeline opens with a gate stage that consults the
//! [`Authorizer`] and nothing else; denial fails the pipeline before any
//! criteria are built or any mutation is attempted. The gate is a declared
//! stage rather than a wrapper, so the authorization boundary is visible
//! in each pipeline's static shape.

use crate::domain::Caller;
use crate::error::ResolverError;
use crate::pipeline::{Flow, StageResult};

use super::Environment;

/// A caller-facing operation name
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    ListPosts,
    GetPost,
    SearchPosts,
    AdjacentPosts,
    CreatePost,
    UpdatePost,
    DeletePost,
    Stats,
}

impl Operation {
    pub fn name(&self) -> &'static str {
        match self {
            Operation::ListPosts => "posts",
            Operation::GetPost => "post",
            Operation::SearchPosts => "search",
            Operation::AdjacentPosts => "adjacentPosts",
            Operation::CreatePost => "createPost",
            Operation::UpdatePost => "updatePost",
            Operation::DeletePost => "deletePost",
            Operation::Stats => "stats",
        }
    }
}

/// The authorization collaborator
pub trait Authorizer: Send + Sync {
    fn authorize(&self, caller: &Caller, operation: Operation) -> bool;
}

/// Role-based default policy.
///
/// Reads are open to everyone (what an anonymous caller *sees* is clamped
/// by the criteria stages, not denied here); writes require an
/// authenticated account with a writing role; stats require any
/// authenticated account.
#[derive(Debug, Default, Clone, Copy)]
pub struct RolePolicy;

impl Authorizer for RolePolicy {
    fn authorize(&self, caller: &Caller, operation: Operation) -> bool {
        match operation {
            Operation::ListPosts
            | Operation::GetPost
            | Operation::SearchPosts
            | Operation::AdjacentPosts => true,
            Operation::CreatePost | Operation::UpdatePost | Operation::DeletePost => {
                caller.is_authenticated() && caller.role.can_write()
            }
            Operation::Stats => caller.is_authenticated(),
        }
    }
}

/// Shared gate body used by every pipeline's first stage
pub(crate) fn check(caller: &Caller, operation: Operation, env: &Environment) -> StageResult {
    if env.auth.authorize(caller, operation) {
        Ok(Flow::Continue)
    } else {
        Err(ResolverError::Unauthorized {
            operation: operation.name(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Role;

    #[test]
    fn anonymous_callers_may_read_but_not_write() {
        let policy = RolePolicy;
        let anon = Caller::anonymous();

        assert!(policy.authorize(&anon, Operation::ListPosts));
        assert!(policy.authorize(&anon, Operation::SearchPosts));
        assert!(!policy.authorize(&anon, Operation::CreatePost));
        assert!(!policy.authorize(&anon, Operation::Stats));
    }

    #[test]
    fn readers_cannot_write_even_when_authenticated() {
        let policy = RolePolicy;
        let reader = Caller::authenticated(3, Role::Reader);

        assert!(!policy.authorize(&reader, Operation::UpdatePost));
        assert!(policy.authorize(&reader, Operation::Stats));
    }

    #[test]
    fn authors_and_admins_may_write() {
        let policy = RolePolicy;
        for role in [Role::Author, Role::Admin] {
            let caller = Caller::authenticated(1, role);
            assert!(policy.authorize(&caller, Operation::CreatePost));
            assert!(policy.authorize(&caller, Operation::DeletePost));
        }
    }
}
