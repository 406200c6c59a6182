use radsort::sort_by_key;

use crate::circular::midpoint;
use crate::rusalt_structs::{Anchor, BedInterval, TypedEvent};

/// Representative position of an event: the middle of its final arc.
pub fn event_anchor(event: &TypedEvent, genome_length: i64) -> i64 {
    // TypedEvent coordinates were validated when the event was called
    midpoint(event.final_start, event.final_end, genome_length).unwrap_or(event.final_start)
}

pub fn build_anchors(events: &[TypedEvent], idxs: &[usize], genome_length: i64) -> Vec<Anchor> {
    let mut anchors: Vec<Anchor> = Vec::with_capacity(idxs.len());
    for &idx in idxs {
        anchors.push(Anchor {
            pos: event_anchor(&events[idx], genome_length),
            idx,
        });
    }

    anchors
}

/// Anchors ordered by position; equal positions keep input order.
pub fn build_sorted_anchors(
    events: &[TypedEvent],
    idxs: &[usize],
    genome_length: i64,
) -> Vec<Anchor> {
    let mut anchors = build_anchors(events, idxs, genome_length);

    sort_by_key(&mut anchors, |a| a.pos);

    anchors
}

pub fn sort_intervals(intervals: &mut [BedInterval]) {
    sort_by_key(intervals, |i| i.end);
    sort_by_key(intervals, |i| i.start);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rusalt_structs::EventKind;

    fn event(start: i64, end: i64) -> TypedEvent {
        TypedEvent {
            sample: "s".to_string(),
            cluster_id: format!("{start}-{end}"),
            alt_reads: 1,
            ref_reads: 1,
            heteroplasmy: 5.0,
            raw_start: start,
            raw_end: end,
            size: 0,
            kind: EventKind::Deletion,
            final_start: start,
            final_end: end,
            dloop: false,
            blacklist_crossing: None,
            flanks: None,
        }
    }

    #[test]
    fn anchors_sorted_by_midpoint_stable_on_ties() {
        let events = vec![event(9000, 11000), event(16500, 100), event(9900, 10100), event(1000, 2000)];
        let anchors = build_sorted_anchors(&events, &[0, 1, 2, 3], 16569);
        let order: Vec<usize> = anchors.iter().map(|a| a.idx).collect();
        assert_eq!(order, vec![1, 3, 0, 2]);
        assert_eq!(anchors[0].pos, 15);
    }

    #[test]
    fn intervals_sorted_by_start_then_end() {
        let mut intervals = vec![
            BedInterval { start: 300, end: 400, name: "c".into() },
            BedInterval { start: 100, end: 500, name: "b".into() },
            BedInterval { start: 100, end: 200, name: "a".into() },
        ];
        sort_intervals(&mut intervals);
        let names: Vec<&str> = intervals.iter().map(|i| i.name.as_str()).collect();
        assert_eq!(names, vec!["a", "b", "c"]);
    }
}
