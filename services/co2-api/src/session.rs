//! Per-client interactive sessions.
//!
//! A session remembers the selected date and point. Every change to either
//! input, once both are set, starts a new attempt; results of an older
//! attempt that finish late are discarded.

use chrono::{DateTime, Utc};
use era5_common::{GeoPoint, RequestDate};
use serde::Serialize;
use uuid::Uuid;

use crate::error::ErrorBody;
use crate::pipeline::{PipelineRun, PredictionTable};

/// Where a session is in its current attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Idle,
    DateSelected,
    LocationSelected,
    Fetching,
    Extracting,
    Assembling,
    Predicting,
    SkippedIncompleteFeatures,
    Done,
    Error,
}

impl Stage {
    /// An attempt has started and not yet finished.
    pub fn is_running(self) -> bool {
        matches!(
            self,
            Stage::Fetching | Stage::Extracting | Stage::Assembling | Stage::Predicting
        )
    }
}

/// Inputs of an attempt that is ready to run.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Attempt {
    pub number: u64,
    pub date: RequestDate,
    pub point: GeoPoint,
}

#[derive(Debug, Clone, Serialize)]
pub struct Session {
    pub id: Uuid,
    pub date: Option<RequestDate>,
    pub location: Option<GeoPoint>,
    pub stage: Stage,
    /// Stages of the last finished attempt.
    pub history: Vec<Stage>,
    pub attempt: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<PredictionTable>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorBody>,
    pub updated_at: DateTime<Utc>,
}

impl Session {
    pub fn new() -> Self {
        Self {
            id: Uuid::new_v4(),
            date: None,
            location: None,
            stage: Stage::Idle,
            history: Vec::new(),
            attempt: 0,
            result: None,
            error: None,
            updated_at: Utc::now(),
        }
    }

    /// Set the date. Returns the attempt to run if both inputs are now set
    /// and something changed.
    pub fn select_date(&mut self, date: RequestDate) -> Option<Attempt> {
        let changed = self.date != Some(date);
        self.date = Some(date);
        self.on_input(changed)
    }

    /// Set the point. Same contract as [`select_date`](Self::select_date).
    pub fn select_location(&mut self, point: GeoPoint) -> Option<Attempt> {
        let changed = self.location != Some(point);
        self.location = Some(point);
        self.on_input(changed)
    }

    fn on_input(&mut self, changed: bool) -> Option<Attempt> {
        self.updated_at = Utc::now();
        let (Some(date), Some(point)) = (self.date, self.location) else {
            self.stage = if self.location.is_some() {
                Stage::LocationSelected
            } else {
                Stage::DateSelected
            };
            return None;
        };
        // Re-selecting the same value does not start another attempt.
        if !changed && self.attempt > 0 {
            return None;
        }

        self.attempt += 1;
        self.stage = Stage::Fetching;
        self.result = None;
        self.error = None;
        self.history.clear();
        Some(Attempt {
            number: self.attempt,
            date,
            point,
        })
    }

    /// Record the outcome of `attempt`. Returns false if a newer attempt
    /// has started since.
    pub fn finish(&mut self, attempt: u64, run: PipelineRun) -> bool {
        if attempt != self.attempt {
            return false;
        }
        self.stage = run.final_stage();
        match &run.result {
            Ok(table) => self.result = Some(table.clone()),
            Err(e) => self.error = Some(ErrorBody::from(e)),
        }
        self.history = run.stages;
        self.updated_at = Utc::now();
        true
    }
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}
