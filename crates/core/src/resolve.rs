//! Representative page resolution.
//!
//! The resolver decides which page of a document should serve as its
//! representative image. It never mutates the document it inspects: a
//! successful lookup yields an [`Assignment`] the caller applies and persists.
//!
//! Resolution order:
//!
//! 1. An existing `_representative` marker with an integer value ends the run.
//! 2. An anchor root is replaced by its first child.
//! 3. The first direct child whose type equals the configured structural
//!    element is selected.
//! 4. The first page that element references provides the page number.
//!
//! When the element is missing the resolver can record an audit entry and
//! reopen an earlier workflow step, depending on configuration.

use serde::Serialize;
use tracing::{debug, info, trace, warn};

use crate::audit::{AuditEntry, AuditLog};
use crate::config::ResolverConfig;
use crate::document::{DocumentModel, MetadataEntry, StructuralNode};
use crate::error::{RepresentativeError, StructureError, WorkflowError};
use crate::schema::{MetadataSchema, PAGE_NUMBER_TYPE, REPRESENTATIVE_TYPE};
use crate::workflow::{Step, StepStatus, StepStore};

/// What a resolution run decided.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum Outcome {
    /// The document already has a representative page.
    AlreadyAssigned { page: i32 },
    /// No structural element to take the page from; nothing to do.
    NoStructure,
    /// The element is missing and the fallback step does not precede the current one.
    FallbackFailed { step: String },
    /// The element is missing and the workflow was rolled back to `step`.
    FallbackApplied { step: String },
    /// The element references no pages.
    NoLinkedPages,
    /// The first referenced page carries no page number.
    NoPageNumber,
    /// A marker must be added to the physical sequence.
    Assigned(Assignment),
}

impl Outcome {
    /// Failure from the caller's point of view.
    pub fn is_failure(&self) -> bool {
        matches!(self, Outcome::FallbackFailed { .. })
    }

    /// Whether the workflow may advance past the current step.
    pub fn completes_step(&self) -> bool {
        !matches!(self, Outcome::FallbackFailed { .. } | Outcome::FallbackApplied { .. })
    }
}

/// The one mutation resolution can produce: append a representative marker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Assignment {
    pub entry: MetadataEntry,
}

impl Assignment {
    pub fn page_number(&self) -> &str {
        &self.entry.value
    }

    pub fn apply(&self, doc: &mut DocumentModel) {
        doc.physical.metadata.push(self.entry.clone());
    }
}

/// Outcome plus side-channel information from best-effort collaborators.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolution {
    pub outcome: Outcome,
    /// Set when writing the configured error message to the audit log failed.
    pub audit_failure: Option<String>,
}

impl From<Outcome> for Resolution {
    fn from(outcome: Outcome) -> Self {
        Self {
            outcome,
            audit_failure: None,
        }
    }
}

pub struct RepresentativeResolver<'a> {
    config: &'a ResolverConfig,
    schema: &'a dyn MetadataSchema,
    audit: &'a dyn AuditLog,
    steps: &'a dyn StepStore,
}

impl<'a> RepresentativeResolver<'a> {
    pub fn new(
        config: &'a ResolverConfig,
        schema: &'a dyn MetadataSchema,
        audit: &'a dyn AuditLog,
        steps: &'a dyn StepStore,
    ) -> Self {
        Self {
            config,
            schema,
            audit,
            steps,
        }
    }

    /// Decide the representative page of `doc` on behalf of `current`, the
    /// workflow step being executed.
    pub fn resolve(&self, doc: &DocumentModel, current: &Step) -> Result<Resolution, RepresentativeError> {
        if let Some(page) = doc.physical.representative() {
            trace!("Found representative image with order {}", page);
            return Ok(Outcome::AlreadyAssigned { page }.into());
        }

        let root = self.effective_root(&doc.logical)?;
        if root.children.is_empty() {
            debug!("Logical root '{}' has no children", root.type_name);
            return Ok(Outcome::NoStructure.into());
        }

        let wanted = self.config.structural_element.as_str();
        let Some(element) = root.children.iter().find(|c| c.type_name == wanted) else {
            debug!("Found no {} in process {}", wanted, current.process_id);
            return self.handle_missing(current);
        };

        let Some(page_id) = element.page_refs.first() else {
            debug!("{} references no pages", wanted);
            return Ok(Outcome::NoLinkedPages.into());
        };
        let page = doc
            .physical
            .page(page_id)
            .ok_or_else(|| StructureError::DanglingReference {
                type_name: element.type_name.clone(),
                page_id: page_id.clone(),
            })?;

        let number_type = self.schema.metadata_type(PAGE_NUMBER_TYPE)?;
        let Some(number) = page.metadata_of(&number_type).next() else {
            debug!("Page {} has no {}", page.id, PAGE_NUMBER_TYPE);
            return Ok(Outcome::NoPageNumber.into());
        };
        if number.value.parse::<i32>().is_err() {
            debug!("Page {} has non-numeric {} {:?}", page.id, PAGE_NUMBER_TYPE, number.value);
            return Ok(Outcome::NoPageNumber.into());
        }
        debug!("First image of {} has order number {}", wanted, number.value);

        let marker_type = self.schema.metadata_type(REPRESENTATIVE_TYPE)?;
        Ok(Outcome::Assigned(Assignment {
            entry: MetadataEntry::new(&marker_type, number.value.clone()),
        })
        .into())
    }

    fn effective_root<'d>(&self, root: &'d StructuralNode) -> Result<&'d StructuralNode, StructureError> {
        if !(root.anchor || self.schema.is_anchor(&root.type_name)) {
            return Ok(root);
        }
        root.children.first().ok_or_else(|| StructureError::EmptyAnchor {
            type_name: root.type_name.clone(),
        })
    }

    fn handle_missing(&self, current: &Step) -> Result<Resolution, RepresentativeError> {
        let mut audit_failure = None;
        if let Some(message) = &self.config.error_message {
            if let Err(e) = self.audit.record(AuditEntry::error(current.process_id, message.as_str())) {
                warn!("Could not write audit entry for process {}: {}", current.process_id, e);
                audit_failure = Some(e.to_string());
            }
        }

        let outcome = match &self.config.fallback_step {
            Some(target) => self.escalate(current, target)?,
            None => Outcome::NoStructure,
        };
        Ok(Resolution { outcome, audit_failure })
    }

    /// Lock every step from the current one back to `target` for correction
    /// and reopen `target`.
    fn escalate(&self, current: &Step, target: &str) -> Result<Outcome, WorkflowError> {
        let previous = self.steps.preceding_steps(current.process_id, current.order)?;
        let Some(pos) = previous.iter().position(|s| s.title == target) else {
            warn!(
                "Fallback step '{}' does not precede '{}' in process {}",
                target, current.title, current.process_id
            );
            return Ok(Outcome::FallbackFailed {
                step: target.to_string(),
            });
        };

        let mut step = current.clone();
        step.mark_for_correction();
        self.steps.save_step(&step)?;

        for (i, mut step) in previous.into_iter().take(pos + 1).enumerate() {
            step.mark_for_correction();
            self.steps.save_step(&step)?;
            if i == pos {
                step.status = StepStatus::Open;
                self.steps.save_step(&step)?;
            }
        }

        info!(
            "Reopened step '{}' of process {} for correction",
            target, current.process_id
        );
        Ok(Outcome::FallbackApplied {
            step: target.to_string(),
        })
    }
}
