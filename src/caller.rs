//! Event typing: raw breakpoint clusters in, deletions/duplications out.

use log::{debug, info, warn};

use crate::circular::{intervals_overlap, span};
use crate::config::GenomeContext;
use crate::error::{CallError, Error, Result};
use crate::microhomology::{breakpoint_window, find_microhomology};
use crate::reference::ReferenceSequence;
use crate::rusalt_structs::{BedInterval, EventKind, FlankContext, RawCluster, TypedEvent};

/// What happened to one input cluster.
#[derive(Debug)]
pub enum CallOutcome {
    Called(TypedEvent),
    /// Below `het_limit`; not emitted.
    Filtered { cluster_id: String, heteroplasmy: f64 },
    Rejected(CallError),
}

impl CallOutcome {
    pub fn event(&self) -> Option<&TypedEvent> {
        match self {
            CallOutcome::Called(event) => Some(event),
            _ => None,
        }
    }

    pub fn into_event(self) -> Option<TypedEvent> {
        match self {
            CallOutcome::Called(event) => Some(event),
            _ => None,
        }
    }
}

pub struct EventCaller<'a> {
    context: GenomeContext,
    blacklist: Option<&'a [BedInterval]>,
    reference: Option<&'a dyn ReferenceSequence>,
}

impl<'a> EventCaller<'a> {
    pub fn new(context: GenomeContext) -> Result<Self> {
        context.validate()?;
        Ok(EventCaller {
            context,
            blacklist: None,
            reference: None,
        })
    }

    pub fn with_blacklist(mut self, blacklist: &'a [BedInterval]) -> Self {
        self.blacklist = Some(blacklist);
        self
    }

    pub fn with_reference(mut self, reference: &'a dyn ReferenceSequence) -> Self {
        self.reference = Some(reference);
        self
    }

    pub fn context(&self) -> &GenomeContext {
        &self.context
    }

    /// Types every cluster independently; one outcome per input, in order.
    pub fn call_all(&self, sample: &str, clusters: &[RawCluster]) -> Vec<CallOutcome> {
        let outcomes: Vec<CallOutcome> = clusters.iter().map(|c| self.call(sample, c)).collect();

        let called = outcomes.iter().filter(|o| o.event().is_some()).count();
        let rejected = outcomes
            .iter()
            .filter(|o| matches!(o, CallOutcome::Rejected(_)))
            .count();
        info!(
            "{sample}: {} clusters -> {called} events, {} below het limit, {rejected} rejected",
            clusters.len(),
            outcomes.len() - called - rejected,
        );
        outcomes
    }

    pub fn call(&self, sample: &str, cluster: &RawCluster) -> CallOutcome {
        match self.type_cluster(sample, cluster) {
            Ok(Some(event)) => {
                debug!(
                    "{}: {} {}-{} ({} bp, {:.2}%)",
                    event.cluster_id,
                    event.kind,
                    event.final_start,
                    event.final_end,
                    event.size,
                    event.heteroplasmy
                );
                CallOutcome::Called(event)
            }
            Ok(None) => CallOutcome::Filtered {
                cluster_id: cluster.cluster_id.clone(),
                heteroplasmy: cluster.heteroplasmy,
            },
            Err(source) => {
                warn!("Rejected cluster {}: {source}", cluster.cluster_id);
                CallOutcome::Rejected(CallError {
                    cluster_id: cluster.cluster_id.clone(),
                    source,
                })
            }
        }
    }

    fn type_cluster(&self, sample: &str, cluster: &RawCluster) -> Result<Option<TypedEvent>> {
        let ctx = &self.context;
        let len = ctx.genome_length;
        let raw_start = cluster.start.median;
        let raw_end = cluster.end.median;

        // validates both raw coordinates
        let raw_span = span(raw_start, raw_end, len)?;

        let raw = (raw_start, raw_end);
        let kind = if intervals_overlap(raw, ctx.ori_h, len) || intervals_overlap(raw, ctx.ori_l, len)
        {
            EventKind::Duplication
        } else {
            EventKind::Deletion
        };

        // final coordinates never wrap: an arc through position 1 is reported
        // by its complement, flagged or not
        let wrapped = raw_start > raw_end;
        let (final_start, final_end) = if wrapped {
            (raw_end, raw_start)
        } else {
            (raw_start, raw_end)
        };
        if wrapped != cluster.dloop {
            debug!(
                "{}: D-loop flag {} disagrees with raw orientation {raw_start}-{raw_end}",
                cluster.cluster_id, cluster.dloop
            );
        }

        let size = span(final_start, final_end, len)?;
        if size == 0 || size > len {
            return Err(Error::InvalidEvent {
                size,
                genome_length: len,
            });
        }

        if cluster.heteroplasmy < ctx.het_limit {
            debug!(
                "{}: heteroplasmy {} below limit {}",
                cluster.cluster_id, cluster.heteroplasmy, ctx.het_limit
            );
            return Ok(None);
        }

        let blacklist_crossing = self.blacklist.map(|intervals| {
            intervals
                .iter()
                .any(|b| intervals_overlap((final_start, final_end), (b.start, b.end), len))
        });

        let flanks = self
            .reference
            .map(|reference| self.flanks(reference, &cluster.cluster_id, final_start, final_end));

        if wrapped {
            debug!(
                "{}: wraps position 1 {raw_start}-{raw_end} ({raw_span} bp) -> {final_start}-{final_end} ({size} bp)",
                cluster.cluster_id
            );
        }

        Ok(Some(TypedEvent {
            sample: sample.to_string(),
            cluster_id: cluster.cluster_id.clone(),
            alt_reads: cluster.alt_reads,
            ref_reads: cluster.ref_reads,
            heteroplasmy: cluster.heteroplasmy * 100.0,
            raw_start,
            raw_end,
            size,
            kind,
            final_start,
            final_end,
            dloop: cluster.dloop,
            blacklist_crossing,
            flanks,
        }))
    }

    fn flanks(
        &self,
        reference: &dyn ReferenceSequence,
        cluster_id: &str,
        start: i64,
        end: i64,
    ) -> FlankContext {
        let flank = self.context.flank_size;
        let windows = breakpoint_window(reference, start, flank)
            .and_then(|seq1| breakpoint_window(reference, end, flank).map(|seq2| (seq1, seq2)));

        match windows {
            Ok((seq1, seq2)) => {
                let microhomology = find_microhomology(&seq1, &seq2);
                FlankContext {
                    seq1,
                    seq2,
                    microhomology,
                }
            }
            Err(e) => {
                warn!("{cluster_id}: no flanking sequence ({e})");
                FlankContext::default()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reference::InMemoryReference;
    use crate::rusalt_structs::BreakpointRange;

    fn cluster(id: &str, start: i64, end: i64, het: f64, dloop: bool) -> RawCluster {
        RawCluster {
            cluster_id: id.to_string(),
            alt_reads: 40,
            ref_reads: 160,
            heteroplasmy: het,
            start: BreakpointRange::point(start),
            end: BreakpointRange::point(end),
            dloop,
        }
    }

    fn caller<'a>() -> EventCaller<'a> {
        EventCaller::new(GenomeContext::default()).unwrap()
    }

    #[test]
    fn origin_overlap_calls_duplication() {
        let event = caller()
            .call("s1", &cluster("c1", 16000, 500, 0.2, false))
            .into_event()
            .unwrap();
        assert_eq!(event.kind, EventKind::Duplication);
        assert!((event.heteroplasmy - 20.0).abs() < 1e-9);
    }

    #[test]
    fn unflagged_wrapped_arc_is_reported_unwrapped() {
        let event = caller()
            .call("s1", &cluster("c1", 16000, 500, 0.2, false))
            .into_event()
            .unwrap();
        assert_eq!((event.raw_start, event.raw_end), (16000, 500));
        assert_eq!((event.final_start, event.final_end), (500, 16000));
        assert!(event.final_start <= event.final_end);
        assert_eq!(event.size, 15500);
        assert!(!event.dloop);
    }

    #[test]
    fn dloop_flag_on_unwrapped_arc_keeps_order() {
        let event = caller()
            .call("s1", &cluster("c1", 300, 16110, 0.2, true))
            .into_event()
            .unwrap();
        assert_eq!((event.final_start, event.final_end), (300, 16110));
        assert_eq!(event.size, 15810);
        assert!(event.dloop);
    }

    #[test]
    fn light_strand_origin_also_counts() {
        let event = caller()
            .call("s1", &cluster("c1", 5000, 6000, 0.2, false))
            .into_event()
            .unwrap();
        assert_eq!(event.kind, EventKind::Duplication);
    }

    #[test]
    fn no_overlap_calls_deletion() {
        let event = caller()
            .call("s1", &cluster("c2", 8000, 9000, 0.2, false))
            .into_event()
            .unwrap();
        assert_eq!(event.kind, EventKind::Deletion);
        assert_eq!(event.size, 1000);
        assert_eq!((event.final_start, event.final_end), (8000, 9000));
        assert_eq!(event.blacklist_crossing, None);
        assert_eq!(event.flanks, None);
    }

    #[test]
    fn dloop_crossing_swaps_coordinates() {
        let event = caller()
            .call("s1", &cluster("c3", 16000, 500, 0.2, true))
            .into_event()
            .unwrap();
        assert_eq!((event.raw_start, event.raw_end), (16000, 500));
        assert_eq!((event.final_start, event.final_end), (500, 16000));
        assert_eq!(event.size, 15500);
        assert!(event.dloop);
    }

    #[test]
    fn low_heteroplasmy_is_filtered() {
        let outcome = caller().call("s1", &cluster("c4", 8000, 9000, 0.005, false));
        assert!(matches!(
            outcome,
            CallOutcome::Filtered { ref cluster_id, .. } if cluster_id == "c4"
        ));
    }

    #[test]
    fn zero_size_is_invalid_event() {
        let outcome = caller().call("s1", &cluster("c5", 8000, 8000, 0.2, false));
        match outcome {
            CallOutcome::Rejected(err) => {
                assert_eq!(err.cluster_id, "c5");
                assert!(matches!(err.source, Error::InvalidEvent { size: 0, .. }));
            }
            other => panic!("expected rejection, got {other:?}"),
        }
    }

    #[test]
    fn out_of_bounds_is_invalid_coordinate_and_batch_continues() {
        let clusters = vec![
            cluster("bad", 0, 9000, 0.2, false),
            cluster("good", 8000, 9000, 0.2, false),
            cluster("huge", 100, 17000, 0.2, false),
        ];
        let outcomes = caller().call_all("s1", &clusters);
        assert_eq!(outcomes.len(), 3);
        assert!(matches!(
            &outcomes[0],
            CallOutcome::Rejected(CallError { source: Error::InvalidCoordinate { position: 0, .. }, .. })
        ));
        assert!(outcomes[1].event().is_some());
        assert!(matches!(&outcomes[2], CallOutcome::Rejected(e) if e.cluster_id == "huge"));
    }

    #[test]
    fn blacklist_only_flags() {
        let blacklist = vec![BedInterval {
            start: 8500,
            end: 8600,
            name: "artefact".to_string(),
        }];
        let caller = caller().with_blacklist(&blacklist);
        let hit = caller
            .call("s1", &cluster("c6", 8000, 9000, 0.2, false))
            .into_event()
            .unwrap();
        let miss = caller
            .call("s1", &cluster("c7", 10000, 11000, 0.2, false))
            .into_event()
            .unwrap();
        assert_eq!(hit.blacklist_crossing, Some(true));
        assert_eq!(miss.blacklist_crossing, Some(false));
    }

    #[test]
    fn flanks_and_microhomology_from_reference() {
        let mut seq = vec![b'A'; 200];
        seq[48..52].copy_from_slice(b"GCTC");
        seq[148..152].copy_from_slice(b"GCTC");
        let reference = InMemoryReference::new("chrM", seq);
        let ctx = GenomeContext {
            genome_length: 200,
            ori_h: (195, 5),
            ori_l: (180, 182),
            flank_size: 5,
            ..GenomeContext::default()
        };
        let caller = EventCaller::new(ctx).unwrap().with_reference(&reference);
        let event = caller
            .call("s1", &cluster("c8", 50, 150, 0.2, false))
            .into_event()
            .unwrap();
        let flanks = event.flanks.unwrap();
        assert_eq!(flanks.seq1, "AAAGCTCAAA");
        assert_eq!(flanks.seq2, "AAAGCTCAAA");
        assert_eq!(flanks.microhomology.as_deref(), Some("AAAGCTCAAA"));
    }

    #[test]
    fn flank_failure_is_not_fatal() {
        let reference = InMemoryReference::new("chrM", vec![b'C'; 16569]);
        let caller = caller().with_reference(&reference);
        let event = caller
            .call("s1", &cluster("c9", 3, 9000, 0.2, false))
            .into_event()
            .unwrap();
        assert_eq!(event.flanks, Some(FlankContext::default()));
    }

    #[test]
    fn calling_twice_is_identical() {
        let c = cluster("c10", 16300, 200, 0.37, true);
        let caller = caller();
        let first = caller.call("s1", &c).into_event().unwrap();
        let second = caller.call("s1", &c).into_event().unwrap();
        assert_eq!(first, second);
    }
}
