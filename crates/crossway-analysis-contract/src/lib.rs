#![warn(missing_docs)]
//! # crossway-analysis-contract
//!
//! ## Purpose
//! Defines the analysis service's upload response schema and its decoding into
//! client-side types.
//!
//! ## Responsibilities
//! - Decode success payloads into [`AnalysisResult`] with total lane mappings.
//! - Recognise `{ "error": ... }` payloads as a domain rejection.
//! - Look up per-lane traffic records by lane identity, never by position.
//!
//! ## Data flow
//! Raw response bytes -> [`parse_analysis_response`] -> [`AnalysisReply`] ->
//! workflow state -> result rendering.
//!
//! ## Ownership and lifetimes
//! Decoded values are owned so a result can outlive the transient network
//! buffer it came from.
//!
//! ## Error model
//! Invalid JSON or a success payload missing a lane entry returns
//! [`AnalysisContractError`]. A well-formed `error` payload is not an error at
//! this layer; it is [`AnalysisReply::Rejected`].

use crossway_core::{Lane, LaneMap};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

/// Structured signal-timing recommendation returned by the service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisResult {
    /// Service order per lane; lower rank is serviced sooner.
    pub priority: LaneMap<i64>,
    /// Recommended green time per lane, in seconds.
    pub optimized_times: LaneMap<u64>,
    /// Per-lane detection records in service order.
    #[serde(default)]
    pub traffic_data: Vec<TrafficRecord>,
}

impl AnalysisResult {
    /// First traffic record whose `direction` names `lane`.
    pub fn record_for(&self, lane: Lane) -> Option<&TrafficRecord> {
        self.traffic_data
            .iter()
            .find(|record| record.lane() == Some(lane))
    }
}

/// One lane's detection summary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrafficRecord {
    /// Lane identifier as sent by the service (`lane1`..`lane4`).
    pub direction: String,
    /// Whether an emergency vehicle was seen in the lane's clip.
    #[serde(default)]
    pub ambulance_detected: bool,
    /// Mean peak vehicle count, when the service reports it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vehicle_count: Option<f64>,
}

impl TrafficRecord {
    /// Parsed lane identity; `None` for directions outside `lane1..lane4`.
    pub fn lane(&self) -> Option<Lane> {
        self.direction.parse().ok()
    }
}

/// Decoded upload response.
#[derive(Debug, Clone, PartialEq)]
pub enum AnalysisReply {
    /// Service produced a recommendation.
    Completed(AnalysisResult),
    /// Service answered with an `error` message.
    Rejected(String),
}

/// Parses a raw upload response body.
///
/// An `error` field takes precedence: when present and non-null, every other
/// field is ignored.
///
/// # Errors
/// Returns [`AnalysisContractError::Decode`] for invalid JSON or a success
/// payload that does not match the schema.
/// Returns [`AnalysisContractError::InvalidContract`] when the body is not a
/// JSON object or `error` is not a string.
pub fn parse_analysis_response(raw: &[u8]) -> Result<AnalysisReply, AnalysisContractError> {
    let value: Value = serde_json::from_slice(raw)?;
    let Value::Object(fields) = &value else {
        return Err(AnalysisContractError::InvalidContract(
            "response is not a JSON object".to_string(),
        ));
    };

    match fields.get("error") {
        None | Some(Value::Null) => {}
        Some(Value::String(message)) => return Ok(AnalysisReply::Rejected(message.clone())),
        Some(_) => {
            return Err(AnalysisContractError::InvalidContract(
                "error field is not a string".to_string(),
            ));
        }
    }

    let result: AnalysisResult = serde_json::from_value(value)?;
    Ok(AnalysisReply::Completed(result))
}

/// Analysis contract errors.
#[derive(Debug, Error)]
pub enum AnalysisContractError {
    /// JSON decode failure.
    #[error("analysis decode failure: {0}")]
    Decode(#[from] serde_json::Error),
    /// Parsed payload violates contract invariants.
    #[error("analysis contract violation: {0}")]
    InvalidContract(String),
}
