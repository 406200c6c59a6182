use std::fmt;

use serde::{Deserialize, Serialize};

/// One breakpoint position range from the clustering pipeline.
/// `median` is the coordinate that gets called.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BreakpointRange {
    pub min: i64,
    pub median: i64,
    pub max: i64,
}

impl BreakpointRange {
    pub fn point(pos: i64) -> Self {
        BreakpointRange {
            min: pos,
            median: pos,
            max: pos,
        }
    }
}

/// A breakpoint cluster record as produced upstream.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawCluster {
    pub cluster_id: String,
    pub alt_reads: u64,
    pub ref_reads: u64,
    /// Fraction in `[0, 1]`.
    pub heteroplasmy: f64,
    pub start: BreakpointRange,
    pub end: BreakpointRange,
    pub dloop: bool,
}

/// 1-based closed interval, possibly wrapped (`start > end`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BedInterval {
    pub start: i64,
    pub end: i64,
    pub name: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EventKind {
    Deletion,
    Duplication,
}

impl EventKind {
    /// VCF `SVTYPE` value.
    pub fn svtype(&self) -> &'static str {
        match self {
            EventKind::Deletion => "DEL",
            EventKind::Duplication => "DUP",
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EventKind::Deletion => write!(f, "del"),
            EventKind::Duplication => write!(f, "dup"),
        }
    }
}

/// Sequence context around the two breakpoints of an event.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlankContext {
    pub seq1: String,
    pub seq2: String,
    pub microhomology: Option<String>,
}

/// One classified structural variant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TypedEvent {
    pub sample: String,
    pub cluster_id: String,
    pub alt_reads: u64,
    pub ref_reads: u64,
    /// Percentage in `[0, 100]`.
    pub heteroplasmy: f64,
    pub raw_start: i64,
    pub raw_end: i64,
    pub size: i64,
    pub kind: EventKind,
    pub final_start: i64,
    pub final_end: i64,
    pub dloop: bool,
    pub blacklist_crossing: Option<bool>,
    pub flanks: Option<FlankContext>,
}

impl TypedEvent {
    pub fn crosses_blacklist(&self) -> bool {
        self.blacklist_crossing.unwrap_or(false)
    }
}

/// A set of events sharing one group identifier.
/// `members` index into the event slice the groups were built from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpatialGroup {
    pub id: String,
    pub members: Vec<usize>,
    pub heteroplasmy_sum: f64,
    pub event_count: usize,
}

/// A grouping anchor: one position per event, used by the sweep.
#[derive(Debug, Clone, Copy)]
pub struct Anchor {
    pub pos: i64,
    pub idx: usize,
}
