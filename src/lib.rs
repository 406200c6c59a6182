pub mod caller;
pub mod circular;
pub mod classify;
pub mod config;
pub mod error;
pub mod grouping;
pub mod io;
pub mod microhomology;
pub mod numpy_bindings;
pub mod reference;
pub mod rusalt_structs;
pub mod sorts;

use crate::caller::{CallOutcome, EventCaller};
use crate::classify::{ClassificationVerdict, PatternClassifier};
use crate::error::Result;
use crate::grouping::{SpatialGrouper, SpatialGrouping};
use crate::rusalt_structs::{RawCluster, TypedEvent};

/// Everything the pipeline produced for one sample.
#[derive(Debug)]
pub struct SampleAnalysis {
    /// One outcome per input cluster, in input order.
    pub calls: Vec<CallOutcome>,
    /// The emitted events, in input order.
    pub events: Vec<TypedEvent>,
    pub grouping: SpatialGrouping,
    pub verdict: ClassificationVerdict,
}

/// Runs calling, grouping and classification for one sample.
///
/// Holds no state between calls, so samples can be analysed in parallel
/// with shared stage objects.
pub fn analyze_sample(
    sample: &str,
    clusters: &[RawCluster],
    caller: &EventCaller<'_>,
    grouper: &SpatialGrouper,
    classifier: &PatternClassifier,
) -> Result<SampleAnalysis> {
    let calls = caller.call_all(sample, clusters);
    let events: Vec<TypedEvent> = calls.iter().filter_map(|c| c.event().cloned()).collect();
    let grouping = grouper.group(&events);
    let verdict = classifier.classify(sample, &events, &grouping)?;

    Ok(SampleAnalysis {
        calls,
        events,
        grouping,
        verdict,
    })
}
