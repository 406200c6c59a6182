use log::debug;
use rustc_hash::FxHashMap;

use crate::circular::distance;
use crate::config::GroupingConfig;
use crate::error::{Error, Result};
use crate::rusalt_structs::{SpatialGroup, TypedEvent};
use crate::sorts;

/// Group identifier prefix for ordinary events.
pub const GROUP_PREFIX: &str = "G";
/// Group identifier prefix for blacklist-crossing events.
pub const BLACKLIST_GROUP_PREFIX: &str = "BL";

/// Union-find over event indices.
struct DisjointSet {
    parent: Vec<usize>,
    rank: Vec<u8>,
}

impl DisjointSet {
    fn new(n: usize) -> Self {
        DisjointSet {
            parent: (0..n).collect(),
            rank: vec![0; n],
        }
    }

    fn find(&mut self, mut x: usize) -> usize {
        while self.parent[x] != x {
            self.parent[x] = self.parent[self.parent[x]];
            x = self.parent[x];
        }
        x
    }

    fn union(&mut self, a: usize, b: usize) {
        let (ra, rb) = (self.find(a), self.find(b));
        if ra == rb {
            return;
        }
        if self.rank[ra] < self.rank[rb] {
            self.parent[ra] = rb;
        } else if self.rank[ra] > self.rank[rb] {
            self.parent[rb] = ra;
        } else {
            self.parent[rb] = ra;
            self.rank[ra] += 1;
        }
    }
}

/// The partition of one sample's events.
#[derive(Debug, Clone, PartialEq)]
pub struct SpatialGrouping {
    pub groups: Vec<SpatialGroup>,
    /// `assignment[i]` is the index in `groups` of event `i`.
    pub assignment: Vec<usize>,
}

impl SpatialGrouping {
    pub fn group_of(&self, event_idx: usize) -> Option<&SpatialGroup> {
        self.assignment
            .get(event_idx)
            .and_then(|&group_idx| self.groups.get(group_idx))
    }

    /// Fails unless this grouping was built from exactly `n_events` events.
    pub fn check_covers(&self, n_events: usize) -> Result<()> {
        if self.assignment.len() != n_events {
            return Err(Error::GroupingMismatch {
                events: n_events,
                assigned: self.assignment.len(),
            });
        }
        Ok(())
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }
}

pub struct SpatialGrouper {
    radius: i64,
    genome_length: i64,
}

impl SpatialGrouper {
    pub fn new(config: &GroupingConfig, genome_length: i64) -> Self {
        SpatialGrouper {
            radius: config.radius,
            genome_length,
        }
    }

    /// Partitions events into connected components of the graph linking
    /// events whose anchors are within `radius` bp around the ring.
    /// Blacklist-crossing events only link to each other.
    ///
    /// Groups are numbered in order of their first event in `events`.
    pub fn group(&self, events: &[TypedEvent]) -> SpatialGrouping {
        let mut sets = DisjointSet::new(events.len());

        let (flagged, plain): (Vec<usize>, Vec<usize>) =
            (0..events.len()).partition(|&i| events[i].crosses_blacklist());

        for idxs in [&plain, &flagged] {
            self.link_neighbours(events, idxs, &mut sets);
        }

        let mut group_of_root: FxHashMap<usize, usize> = FxHashMap::default();
        let mut groups: Vec<SpatialGroup> = Vec::new();
        let mut assignment = Vec::with_capacity(events.len());
        let mut plain_count = 0;
        let mut flagged_count = 0;

        for (idx, event) in events.iter().enumerate() {
            let root = sets.find(idx);
            let group_idx = *group_of_root.entry(root).or_insert_with(|| {
                let id = if event.crosses_blacklist() {
                    flagged_count += 1;
                    format!("{BLACKLIST_GROUP_PREFIX}{flagged_count}")
                } else {
                    plain_count += 1;
                    format!("{GROUP_PREFIX}{plain_count}")
                };
                groups.push(SpatialGroup {
                    id,
                    members: Vec::new(),
                    heteroplasmy_sum: 0.0,
                    event_count: 0,
                });
                groups.len() - 1
            });

            let group = &mut groups[group_idx];
            group.members.push(idx);
            group.heteroplasmy_sum += event.heteroplasmy;
            group.event_count += 1;
            assignment.push(group_idx);
        }

        debug!(
            "Grouped {} events into {} groups (radius {} bp)",
            events.len(),
            groups.len(),
            self.radius
        );

        SpatialGrouping { groups, assignment }
    }

    /// On a ring, two anchors are connected iff every gap along the shorter
    /// arc between them is within the radius, so checking neighbours in
    /// sorted order (plus the last/first pair) finds every component.
    fn link_neighbours(&self, events: &[TypedEvent], idxs: &[usize], sets: &mut DisjointSet) {
        if idxs.len() < 2 {
            return;
        }
        let anchors = sorts::build_sorted_anchors(events, idxs, self.genome_length);
        let within = |a: i64, b: i64| {
            distance(a, b, self.genome_length)
                .map(|d| d <= self.radius)
                .unwrap_or(false)
        };

        for pair in anchors.windows(2) {
            if within(pair[0].pos, pair[1].pos) {
                sets.union(pair[0].idx, pair[1].idx);
            }
        }

        let (first, last) = (anchors[0], anchors[anchors.len() - 1]);
        if anchors.len() > 2 && within(last.pos, first.pos) {
            sets.union(last.idx, first.idx);
        }
    }
}
