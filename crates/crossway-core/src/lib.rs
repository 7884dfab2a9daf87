#![warn(missing_docs)]
//! # crossway-core
//!
//! ## Purpose
//! Defines the pure data model shared across the `crossway` workspace.
//!
//! ## Responsibilities
//! - Represent the four intersection lanes as a closed enumeration.
//! - Provide [`LaneMap`], a total lane -> value mapping that always holds four
//!   entries.
//! - Model the operator's video selection and gate it into a [`LaneVideoSet`]
//!   through [`validate_selection`].
//!
//! ## Data flow
//! The shell reads files into [`LaneVideo`] values and groups them into a
//! [`VideoSelection`]. [`validate_selection`] turns a selection of exactly four
//! videos into a [`LaneVideoSet`], the only shape the upload layer accepts.
//!
//! ## Ownership and lifetimes
//! Video payloads are held as `Arc<[u8]>` so a selection can be kept in the
//! workflow state and handed to an in-flight submission without copying the
//! bytes.
//!
//! ## Error model
//! A wrong file count is a [`SelectionRejection`], a local advisory outcome.
//! Lane identifier parsing failures return [`CoreError`].
//!
//! ## Example
//! ```rust
//! use crossway_core::{validate_selection, Lane, LaneVideo, VideoSelection};
//!
//! let selection = VideoSelection::new(
//!     (1..=4)
//!         .map(|index| LaneVideo::new(format!("lane{index}.mp4"), vec![index as u8]))
//!         .collect(),
//! );
//! let videos = validate_selection(&selection).unwrap();
//! assert_eq!(videos.get(Lane::Lane3).file_name(), "lane3.mp4");
//! ```

use std::collections::BTreeMap;
use std::fmt;
use std::ops::Index;
use std::str::FromStr;
use std::sync::Arc;

use serde::de::Error as _;
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use thiserror::Error;

/// Number of lanes at a monitored intersection.
pub const LANE_COUNT: usize = 4;

/// One of the four fixed traffic directions at the intersection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Lane {
    /// First lane, wire id `lane1`.
    Lane1,
    /// Second lane, wire id `lane2`.
    Lane2,
    /// Third lane, wire id `lane3`.
    Lane3,
    /// Fourth lane, wire id `lane4`.
    Lane4,
}

impl Lane {
    /// All lanes in canonical order. Submission order and tie-breaking both
    /// follow this order.
    pub const ALL: [Lane; LANE_COUNT] = [Lane::Lane1, Lane::Lane2, Lane::Lane3, Lane::Lane4];

    /// Zero-based position in [`Lane::ALL`].
    pub fn index(self) -> usize {
        match self {
            Lane::Lane1 => 0,
            Lane::Lane2 => 1,
            Lane::Lane3 => 2,
            Lane::Lane4 => 3,
        }
    }

    /// Wire identifier used by the analysis service.
    pub fn id(self) -> &'static str {
        match self {
            Lane::Lane1 => "lane1",
            Lane::Lane2 => "lane2",
            Lane::Lane3 => "lane3",
            Lane::Lane4 => "lane4",
        }
    }

    /// Display label shown to the operator.
    pub fn label(self) -> &'static str {
        match self {
            Lane::Lane1 => "Lane1",
            Lane::Lane2 => "Lane2",
            Lane::Lane3 => "Lane3",
            Lane::Lane4 => "Lane4",
        }
    }
}

impl fmt::Display for Lane {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id())
    }
}

impl FromStr for Lane {
    type Err = CoreError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        Lane::ALL
            .into_iter()
            .find(|lane| lane.id() == raw)
            .ok_or_else(|| CoreError::UnknownLane(raw.to_string()))
    }
}

/// Total mapping from every [`Lane`] to a value.
///
/// Backed by a fixed array, so a `LaneMap` can never be missing a lane.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LaneMap<T> {
    values: [T; LANE_COUNT],
}

impl<T> LaneMap<T> {
    /// Creates a map from values in [`Lane::ALL`] order.
    pub fn new(values: [T; LANE_COUNT]) -> Self {
        Self { values }
    }

    /// Builds a map by evaluating `f` for every lane.
    pub fn from_fn(mut f: impl FnMut(Lane) -> T) -> Self {
        Self::new([
            f(Lane::Lane1),
            f(Lane::Lane2),
            f(Lane::Lane3),
            f(Lane::Lane4),
        ])
    }

    /// Fallible variant of [`LaneMap::from_fn`]; stops at the first error.
    pub fn try_from_fn<E>(mut f: impl FnMut(Lane) -> Result<T, E>) -> Result<Self, E> {
        Ok(Self::new([
            f(Lane::Lane1)?,
            f(Lane::Lane2)?,
            f(Lane::Lane3)?,
            f(Lane::Lane4)?,
        ]))
    }

    /// Returns the value for `lane`.
    pub fn get(&self, lane: Lane) -> &T {
        &self.values[lane.index()]
    }

    /// Iterates `(lane, value)` pairs in lane order.
    pub fn iter(&self) -> impl Iterator<Item = (Lane, &T)> {
        Lane::ALL.into_iter().zip(self.values.iter())
    }
}

impl<T> Index<Lane> for LaneMap<T> {
    type Output = T;

    fn index(&self, lane: Lane) -> &Self::Output {
        self.get(lane)
    }
}

impl<T: Serialize> Serialize for LaneMap<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(LANE_COUNT))?;
        for (lane, value) in self.iter() {
            map.serialize_entry(lane.id(), value)?;
        }
        map.end()
    }
}

impl<'de, T: Deserialize<'de>> Deserialize<'de> for LaneMap<T> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        // Unknown keys are dropped; every lane key is mandatory.
        let mut entries = BTreeMap::<String, T>::deserialize(deserializer)?;
        LaneMap::try_from_fn(|lane| {
            entries
                .remove(lane.id())
                .ok_or_else(|| D::Error::custom(format!("missing entry for {lane}")))
        })
    }
}

/// One operator-selected video payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LaneVideo {
    file_name: String,
    bytes: Arc<[u8]>,
}

impl LaneVideo {
    /// Wraps an opaque video payload. Content is never inspected.
    pub fn new(file_name: impl Into<String>, bytes: impl Into<Arc<[u8]>>) -> Self {
        Self {
            file_name: file_name.into(),
            bytes: bytes.into(),
        }
    }

    /// Original file name, forwarded in the multipart part.
    pub fn file_name(&self) -> &str {
        &self.file_name
    }

    /// Raw payload bytes.
    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Shared handle to the payload, without copying it.
    pub fn shared_bytes(&self) -> Arc<[u8]> {
        Arc::clone(&self.bytes)
    }

    /// Payload size in bytes.
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    /// Returns `true` for a zero-byte payload.
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

/// Videos as picked by the operator, in pick order. May hold any count.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VideoSelection {
    videos: Vec<LaneVideo>,
}

impl VideoSelection {
    /// Creates a selection from picked videos.
    pub fn new(videos: Vec<LaneVideo>) -> Self {
        Self { videos }
    }

    /// Number of picked videos.
    pub fn len(&self) -> usize {
        self.videos.len()
    }

    /// Returns `true` when nothing is picked.
    pub fn is_empty(&self) -> bool {
        self.videos.is_empty()
    }

    /// Picked videos in pick order.
    pub fn videos(&self) -> &[LaneVideo] {
        &self.videos
    }
}

/// Exactly four videos, one per lane, produced by [`validate_selection`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LaneVideoSet {
    videos: LaneMap<LaneVideo>,
}

impl LaneVideoSet {
    /// Video assigned to `lane`.
    pub fn get(&self, lane: Lane) -> &LaneVideo {
        self.videos.get(lane)
    }

    /// Iterates videos in lane order (`lane1` first).
    pub fn iter(&self) -> impl Iterator<Item = (Lane, &LaneVideo)> {
        self.videos.iter()
    }

    /// Combined payload size of all four videos.
    pub fn total_bytes(&self) -> usize {
        self.videos.iter().map(|(_, video)| video.len()).sum()
    }
}

/// Local, non-fatal refusal to submit a selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("exactly {} videos required, {selected} selected", LANE_COUNT)]
pub struct SelectionRejection {
    /// How many videos the operator picked.
    pub selected: usize,
}

/// Checks that exactly one video per lane was picked.
///
/// Pick order maps to lanes: the first video becomes `lane1`, and so on.
///
/// # Errors
/// Returns [`SelectionRejection`] when the count is not [`LANE_COUNT`].
pub fn validate_selection(selection: &VideoSelection) -> Result<LaneVideoSet, SelectionRejection> {
    let videos = selection.videos();
    if videos.len() != LANE_COUNT {
        return Err(SelectionRejection {
            selected: videos.len(),
        });
    }

    Ok(LaneVideoSet {
        videos: LaneMap::from_fn(|lane| videos[lane.index()].clone()),
    })
}

/// Error type for core domain parsing.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CoreError {
    /// Identifier is not one of `lane1..lane4`.
    #[error("unknown lane identifier: {0}")]
    UnknownLane(String),
}

#[cfg(test)]
mod tests {
    //! Unit tests for lane identity and selection gating.

    use super::*;

    fn video(name: &str) -> LaneVideo {
        LaneVideo::new(name, name.as_bytes().to_vec())
    }

    #[test]
    fn lane_ids_round_trip_through_from_str() {
        for lane in Lane::ALL {
            assert_eq!(lane.id().parse::<Lane>().expect("known lane"), lane);
        }
        assert_eq!(
            "lane5".parse::<Lane>(),
            Err(CoreError::UnknownLane("lane5".to_string()))
        );
    }

    #[test]
    fn rejects_selection_with_wrong_count() {
        let selection = VideoSelection::new(vec![video("a.mp4"), video("b.mp4")]);
        let rejection = validate_selection(&selection).expect_err("two videos must be rejected");
        assert_eq!(rejection.selected, 2);
        assert_eq!(rejection.to_string(), "exactly 4 videos required, 2 selected");

        let empty = VideoSelection::default();
        assert!(validate_selection(&empty).is_err());
    }

    #[test]
    fn assigns_lanes_in_pick_order() {
        let selection = VideoSelection::new(vec![
            video("north.mp4"),
            video("east.mp4"),
            video("south.mp4"),
            video("west.mp4"),
        ]);
        let videos = validate_selection(&selection).expect("four videos are valid");

        let names: Vec<_> = videos.iter().map(|(_, video)| video.file_name()).collect();
        assert_eq!(names, vec!["north.mp4", "east.mp4", "south.mp4", "west.mp4"]);
        assert_eq!(videos.get(Lane::Lane4).file_name(), "west.mp4");
        assert_eq!(videos.total_bytes(), 9 + 8 + 9 + 8);
    }

    #[test]
    fn lane_map_deserialization_requires_every_lane() {
        let map: LaneMap<u64> =
            serde_json::from_str(r#"{"lane1":30,"lane2":45,"lane3":20,"lane4":25,"lane9":1}"#)
                .expect("complete map should decode");
        assert_eq!(map[Lane::Lane2], 45);

        let missing = serde_json::from_str::<LaneMap<u64>>(r#"{"lane1":30,"lane2":45}"#);
        let error = missing.expect_err("incomplete map must fail");
        assert!(error.to_string().contains("missing entry for lane3"));
    }
}
