//! Resolver pipeline engine
//!
//! An operation is an ordered chain of [`Stage`]s sharing a mutable,
//! per-invocation context. Stages are statically declared values (plain
//! function pointers, no captured state), so one [`Pipeline`] is built per
//! operation at startup and shared across concurrent invocations; only the
//! context is mutated.
//!
//! Execution is strictly in declared order. A stage either continues,
//! halts the pipeline with the result it placed in the context, or fails —
//! in which case no later stage runs, including the executor.

mod context;

pub use context::{
    CreateContext, DeleteContext, DeleteResult, GetContext, ListContext, PostPage, UpdateContext,
};

use thiserror::Error;

use crate::error::ResolverError;
use crate::resolver::Environment;

/// What a stage asks the engine to do next
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    /// Hand the context to the next stage
    Continue,
    /// Stop here; the context's result slot holds the outcome
    Halt,
}

/// Outcome of a single stage
pub type StageResult = Result<Flow, ResolverError>;

/// One unit of pipeline work.
///
/// A stage that contributes a named criteria or payload fragment declares
/// the fragment key; [`Pipeline::new`] rejects two stages claiming the same
/// key, which is what keeps fragment merging collision-free.
pub struct Stage<C> {
    name: &'static str,
    fragment: Option<&'static str>,
    run: fn(&mut C, &Environment) -> StageResult,
}

impl<C> Stage<C> {
    pub const fn new(name: &'static str, run: fn(&mut C, &Environment) -> StageResult) -> Self {
        Self {
            name,
            fragment: None,
            run,
        }
    }

    pub const fn with_fragment(
        name: &'static str,
        fragment: &'static str,
        run: fn(&mut C, &Environment) -> StageResult,
    ) -> Self {
        Self {
            name,
            fragment: Some(fragment),
            run,
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn fragment(&self) -> Option<&'static str> {
        self.fragment
    }
}

#[derive(Debug, Error, PartialEq)]
pub enum PipelineConfigError {
    #[error("pipeline '{0}' declares no stages")]
    Empty(&'static str),

    #[error(
        "pipeline '{pipeline}': stages '{first}' and '{second}' both claim fragment '{fragment}'"
    )]
    DuplicateFragment {
        pipeline: &'static str,
        first: &'static str,
        second: &'static str,
        fragment: &'static str,
    },
}

/// An ordered, statically composed sequence of stages bound to one
/// named operation.
pub struct Pipeline<C> {
    name: &'static str,
    stages: Vec<Stage<C>>,
}

impl<C> Pipeline<C> {
    /// Builds a pipeline, validating the stage list.
    ///
    /// An empty list and duplicate fragment claims are configuration
    /// errors caught here, before any request runs.
    pub fn new(name: &'static str, stages: Vec<Stage<C>>) -> Result<Self, PipelineConfigError> {
        if stages.is_empty() {
            return Err(PipelineConfigError::Empty(name));
        }

        for (i, stage) in stages.iter().enumerate() {
            let Some(fragment) = stage.fragment else {
                continue;
            };
            if let Some(prior) = stages[..i].iter().find(|s| s.fragment == Some(fragment)) {
                return Err(PipelineConfigError::DuplicateFragment {
                    pipeline: name,
                    first: prior.name,
                    second: stage.name,
                    fragment,
                });
            }
        }

        Ok(Self { name, stages })
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Runs every stage in declared order against the given context.
    ///
    /// The first `Err` aborts the run and propagates unchanged; a `Halt`
    /// stops without running later stages. Either way, whatever the stages
    /// merged into the context so far is discarded with it unless an
    /// executor stage already persisted the assembled payload.
    pub fn run(&self, ctx: &mut C, env: &Environment) -> Result<(), ResolverError> {
        log::debug!("reached resolver: {}", self.name);

        for stage in &self.stages {
            match (stage.run)(ctx, env)? {
                Flow::Continue => {}
                Flow::Halt => {
                    log::debug!("pipeline {} halted at stage {}", self.name, stage.name);
                    return Ok(());
                }
            }
        }

        Ok(())
    }
}
