#![warn(missing_docs)]
//! # crossway-ui
//!
//! ## Purpose
//! Defines the UI-facing workflow state and the projection of analysis results
//! into display rows.
//!
//! ## Responsibilities
//! - Represent the upload workflow as one [`WorkflowState`] value.
//! - Render an [`AnalysisResult`] into priority-ordered [`LaneView`] rows.
//! - Project the state into what the result panel shows ([`ResultPanel`]).
//!
//! ## Data flow
//! The workflow controller mutates its owned [`WorkflowState`]; the shell reads
//! it through [`project_panel`], which calls [`render_lanes`] for successful
//! results.
//!
//! ## Ownership and lifetimes
//! Rendering borrows the result and returns owned rows, so the display never
//! aliases controller state.
//!
//! ## Error model
//! Rendering is total. Missing traffic records degrade to "no emergency"
//! instead of failing.

use crossway_analysis_contract::AnalysisResult;
use crossway_core::{Lane, LaneVideoSet, VideoSelection};

/// Text shown before any result exists.
pub const PLACEHOLDER_TEXT: &str = "Optimization results will appear here.";

/// Upload workflow state.
#[derive(Debug, Clone, PartialEq)]
pub enum WorkflowState {
    /// Nothing picked yet.
    Idle,
    /// Operator has picked files; not yet submitted.
    Selecting {
        /// Current pick, any count.
        selection: VideoSelection,
    },
    /// Upload in flight.
    Submitting {
        /// Validated videos being uploaded.
        videos: LaneVideoSet,
    },
    /// Last submission produced a recommendation.
    Succeeded(AnalysisResult),
    /// Last submission failed; holds the operator-facing reason.
    Failed(String),
}

impl WorkflowState {
    /// Returns `true` while a submission is in flight.
    pub fn is_busy(&self) -> bool {
        matches!(self, WorkflowState::Submitting { .. })
    }

    /// Short state name for status lines and logs.
    pub fn name(&self) -> &'static str {
        match self {
            WorkflowState::Idle => "idle",
            WorkflowState::Selecting { .. } => "selecting",
            WorkflowState::Submitting { .. } => "submitting",
            WorkflowState::Succeeded(_) => "succeeded",
            WorkflowState::Failed(_) => "failed",
        }
    }
}

/// One rendered lane row.
#[derive(Debug, Clone, PartialEq)]
pub struct LaneView {
    /// Lane identity.
    pub lane: Lane,
    /// Display label, e.g. `Lane2`.
    pub label: &'static str,
    /// Recommended green time in seconds.
    pub optimized_seconds: u64,
    /// Service order; lower is sooner.
    pub priority_rank: i64,
    /// Whether an emergency vehicle was reported for the lane.
    pub emergency_detected: bool,
    /// Reported vehicle count, if any.
    pub vehicle_count: Option<f64>,
}

impl LaneView {
    /// One-line summary, e.g. `Lane2: 45s | Priority: 1 | Emergency: Detected`.
    pub fn summary_line(&self) -> String {
        let emergency = if self.emergency_detected {
            "Detected"
        } else {
            "None"
        };
        let mut line = format!(
            "{}: {}s | Priority: {} | Emergency: {}",
            self.label, self.optimized_seconds, self.priority_rank, emergency
        );
        if let Some(count) = self.vehicle_count {
            line.push_str(&format!(" | Vehicles: {count:.1}"));
        }
        line
    }
}

/// Renders a result into rows sorted by ascending priority rank.
///
/// Equal ranks keep canonical lane order. Traffic records are matched by lane
/// identity; the first match wins.
pub fn render_lanes(result: &AnalysisResult) -> Vec<LaneView> {
    let mut views: Vec<LaneView> = Lane::ALL
        .into_iter()
        .map(|lane| {
            let record = result.record_for(lane);
            LaneView {
                lane,
                label: lane.label(),
                optimized_seconds: result.optimized_times[lane],
                priority_rank: result.priority[lane],
                emergency_detected: record.is_some_and(|record| record.ambulance_detected),
                vehicle_count: record.and_then(|record| record.vehicle_count),
            }
        })
        .collect();

    // `sort_by_key` is stable.
    views.sort_by_key(|view| view.priority_rank);
    views
}

/// What the result panel currently shows.
#[derive(Debug, Clone, PartialEq)]
pub enum ResultPanel {
    /// No outcome yet.
    Placeholder,
    /// Submission in flight.
    Busy,
    /// Rendered recommendation.
    Results(Vec<LaneView>),
    /// Failure reason.
    Error(String),
}

/// Projects workflow state into the result panel.
pub fn project_panel(state: &WorkflowState) -> ResultPanel {
    match state {
        WorkflowState::Idle | WorkflowState::Selecting { .. } => ResultPanel::Placeholder,
        WorkflowState::Submitting { .. } => ResultPanel::Busy,
        WorkflowState::Succeeded(result) => ResultPanel::Results(render_lanes(result)),
        WorkflowState::Failed(message) => ResultPanel::Error(message.clone()),
    }
}

impl ResultPanel {
    /// Text lines for a plain-text surface.
    pub fn lines(&self) -> Vec<String> {
        match self {
            ResultPanel::Placeholder => vec![PLACEHOLDER_TEXT.to_string()],
            ResultPanel::Busy => vec!["Running model...".to_string()],
            ResultPanel::Results(views) => std::iter::once("Optimization Results".to_string())
                .chain(views.iter().map(LaneView::summary_line))
                .collect(),
            ResultPanel::Error(message) => vec![format!("Error: {message}")],
        }
    }
}
