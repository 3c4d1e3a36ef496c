//! Executes the representative-creation step for one process: load the
//! metadata file, resolve, persist the marker, report back to the workflow.

use serde::Serialize;

use crate::error::RepresentativeError;
use crate::resolve::{Outcome, RepresentativeResolver};
use crate::store::DocumentStore;
use crate::workflow::Step;

/// Title the step is registered under in workflow templates.
pub const STEP_TITLE: &str = "RepresentativeCreation";

/// How the workflow should continue after the step ran.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StepReturn {
    /// Close the step and advance.
    Finished,
    /// Leave the step unfinished; an earlier step was reopened.
    Aborted,
    /// The step could not do its work.
    Failed,
}

impl From<&Outcome> for StepReturn {
    fn from(outcome: &Outcome) -> Self {
        match outcome {
            Outcome::FallbackFailed { .. } => StepReturn::Failed,
            Outcome::FallbackApplied { .. } => StepReturn::Aborted,
            _ => StepReturn::Finished,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    /// Resolve but never write the document back.
    pub dry_run: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StepReport {
    #[serde(flatten)]
    pub outcome: Outcome,
    pub result: StepReturn,
    /// The document was written back with a new marker.
    pub saved: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub audit_failure: Option<String>,
}

pub fn run_step(
    store: &dyn DocumentStore,
    resolver: &RepresentativeResolver<'_>,
    current: &Step,
    opts: &RunOptions,
) -> Result<StepReport, RepresentativeError> {
    let mut doc = store.load()?;
    let resolution = resolver.resolve(&doc, current)?;

    let mut saved = false;
    if let Outcome::Assigned(assignment) = &resolution.outcome {
        assignment.apply(&mut doc);
        if opts.dry_run {
            tracing::info!("Dry run: not saving representative page {}", assignment.page_number());
        } else {
            tracing::debug!("Save file with representative image.");
            store.save(&doc)?;
            saved = true;
        }
    }

    Ok(StepReport {
        result: StepReturn::from(&resolution.outcome),
        outcome: resolution.outcome,
        saved,
        audit_failure: resolution.audit_failure,
    })
}
