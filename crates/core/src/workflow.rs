//! Workflow steps of a process and the store they are persisted in.
//!
//! The resolver only needs two operations from the workflow engine: list the
//! steps that precede the current one and persist a changed step. Anything
//! that can do both (a database, a JSON file, an in-memory list for tests)
//! implements [`StepStore`].

use std::path::PathBuf;
use std::sync::Mutex;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::WorkflowError;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Step {
    pub id: u64,
    pub process_id: u64,
    pub title: String,
    /// Position of the step within its process; lower runs earlier.
    pub order: i32,
    pub status: StepStatus,
    #[serde(default)]
    pub edit_type: StepEditType,
    /// Set when the step was reopened to correct a later failure.
    #[serde(default)]
    pub correction: bool,
    #[serde(default)]
    pub end_date: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepStatus {
    Locked,
    Open,
    InWork,
    Done,
    Error,
    Deactivated,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepEditType {
    #[default]
    Unknown,
    Manual,
    ManualSingle,
    Automatic,
    Admin,
}

impl Step {
    pub fn new(id: u64, process_id: u64, title: impl Into<String>, order: i32) -> Self {
        Self {
            id,
            process_id,
            title: title.into(),
            order,
            status: StepStatus::Locked,
            edit_type: StepEditType::Unknown,
            correction: false,
            end_date: None,
        }
    }

    pub fn with_status(mut self, status: StepStatus) -> Self {
        self.status = status;
        self
    }

    /// Flag the step for manual correction: locked, not finished.
    pub fn mark_for_correction(&mut self) {
        self.edit_type = StepEditType::ManualSingle;
        self.status = StepStatus::Locked;
        self.correction = true;
        self.end_date = None;
    }
}

/// Persistence of a process's workflow steps.
pub trait StepStore: Send + Sync {
    /// Steps of `process_id` whose order is below `before_order`, highest order first.
    fn preceding_steps(&self, process_id: u64, before_order: i32) -> Result<Vec<Step>, WorkflowError>;

    /// Write the step's status fields.
    fn save_step(&self, step: &Step) -> Result<(), WorkflowError>;
}

fn preceding(steps: &[Step], process_id: u64, before_order: i32) -> Vec<Step> {
    let mut out: Vec<Step> = steps
        .iter()
        .filter(|s| s.process_id == process_id && s.order < before_order)
        .cloned()
        .collect();
    out.sort_by(|a, b| b.order.cmp(&a.order));
    out
}

fn replace(steps: &mut Vec<Step>, step: &Step) {
    match steps.iter_mut().find(|s| s.id == step.id) {
        Some(existing) => *existing = step.clone(),
        None => steps.push(step.clone()),
    }
}

// ---------------------------------------------------------------------------
// In-memory store
// ---------------------------------------------------------------------------

/// Keeps steps in memory and journals every save, in order.
#[derive(Debug, Default)]
pub struct MemoryStepStore {
    steps: Mutex<Vec<Step>>,
    journal: Mutex<Vec<Step>>,
}

impl MemoryStepStore {
    pub fn new(steps: Vec<Step>) -> Self {
        Self {
            steps: Mutex::new(steps),
            journal: Mutex::new(Vec::new()),
        }
    }

    pub fn steps(&self) -> Vec<Step> {
        self.steps.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    /// Every step passed to `save_step`, in call order.
    pub fn saved(&self) -> Vec<Step> {
        self.journal.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }
}

impl StepStore for MemoryStepStore {
    fn preceding_steps(&self, process_id: u64, before_order: i32) -> Result<Vec<Step>, WorkflowError> {
        let steps = self.steps.lock().unwrap_or_else(|e| e.into_inner());
        Ok(preceding(&steps, process_id, before_order))
    }

    fn save_step(&self, step: &Step) -> Result<(), WorkflowError> {
        replace(&mut self.steps.lock().unwrap_or_else(|e| e.into_inner()), step);
        self.journal.lock().unwrap_or_else(|e| e.into_inner()).push(step.clone());
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// JSON file store
// ---------------------------------------------------------------------------

/// A JSON array of steps on disk. Every save rewrites the whole file.
#[derive(Debug)]
pub struct JsonStepStore {
    path: PathBuf,
    steps: Mutex<Vec<Step>>,
}

impl JsonStepStore {
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, WorkflowError> {
        let path = path.into();
        let data = std::fs::read(&path)?;
        let steps: Vec<Step> = serde_json::from_slice(&data).map_err(|source| WorkflowError::Malformed {
            path: path.clone(),
            source,
        })?;
        Ok(Self {
            path,
            steps: Mutex::new(steps),
        })
    }

    pub fn steps(&self) -> Vec<Step> {
        self.steps.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    /// The step of `process_id` titled `title`.
    pub fn find(&self, process_id: u64, title: &str) -> Result<Step, WorkflowError> {
        self.steps
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .iter()
            .find(|s| s.process_id == process_id && s.title == title)
            .cloned()
            .ok_or_else(|| WorkflowError::UnknownStep {
                process_id,
                title: title.to_string(),
            })
    }
}

impl StepStore for JsonStepStore {
    fn preceding_steps(&self, process_id: u64, before_order: i32) -> Result<Vec<Step>, WorkflowError> {
        let steps = self.steps.lock().unwrap_or_else(|e| e.into_inner());
        Ok(preceding(&steps, process_id, before_order))
    }

    /// Writes a sibling temp file first and renames it over the target; the
    /// in-memory list only changes once the file is in place.
    fn save_step(&self, step: &Step) -> Result<(), WorkflowError> {
        let mut steps = self.steps.lock().unwrap_or_else(|e| e.into_inner());
        let mut updated = steps.clone();
        replace(&mut updated, step);
        let json = serde_json::to_vec_pretty(&updated)?;

        let mut tmp = self.path.clone().into_os_string();
        tmp.push(".tmp");
        let tmp = PathBuf::from(tmp);
        std::fs::write(&tmp, json)?;
        std::fs::rename(&tmp, &self.path)?;

        *steps = updated;
        Ok(())
    }
}
