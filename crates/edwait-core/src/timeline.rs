//! Presentation timeline reconstruction.
//!
//! For every distinct arrival instant `t` the timeline holds one
//! [`SnapshotGroup`]: the visits present at `t`, i.e. those with
//! `arrival <= t < departure`. Visits are addressed by their position in the
//! slice passed to [`Timeline::build`].
//!
//! The groups are produced by an interval sweep: visits are visited in
//! arrival order, an active set holds the visits currently present and a
//! min-heap keyed by departure evicts those that left before the next
//! arrival instant.

use std::{
    cmp::Reverse,
    collections::{BTreeSet, BinaryHeap},
};

use chrono::NaiveDateTime;

use crate::{config::OpenDeparturePolicy, visit::Visit};

/// Visits present at one arrival instant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SnapshotGroup {
    pub event_time: NaiveDateTime,
    /// Visits arriving exactly at `event_time`.
    pub triggers: Vec<usize>,
    /// Present visits in encounter order: by arrival, then by input position.
    pub members: Vec<usize>,
    /// Triggers with an empty presence interval, in input order.
    ///
    /// They are not present at `event_time` and take no part in the
    /// occupancy or ranking of `members`; each only gets its own row.
    pub transient: Vec<usize>,
}

impl SnapshotGroup {
    /// Number of timeline rows: present members plus transient triggers.
    #[must_use]
    pub fn len(&self) -> usize {
        self.members.len() + self.transient.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.members.is_empty() && self.transient.is_empty()
    }
}

#[derive(Debug, Clone, Default)]
pub struct Timeline {
    groups: Vec<SnapshotGroup>,
}

impl Timeline {
    /// Builds one snapshot group per distinct arrival instant, in time order.
    ///
    /// A visit whose departure is not after its arrival has an empty presence
    /// interval; it is listed as transient in the group of its own arrival so
    /// that every visit gets a timeline row. Under
    /// [`OpenDeparturePolicy::Excluded`] a visit without a departure is
    /// treated the same way.
    #[must_use]
    pub fn build(visits: &[Visit], open_departure: OpenDeparturePolicy) -> Self {
        let mut order = (0..visits.len()).collect::<Vec<_>>();
        order.sort_by_key(|&i| visits[i].arrival);

        let mut active = BTreeSet::<(NaiveDateTime, usize)>::new();
        let mut departures = BinaryHeap::<Reverse<(NaiveDateTime, usize)>>::new();
        let mut groups = vec![];

        for same_time in order.chunk_by(|&a, &b| visits[a].arrival == visits[b].arrival) {
            let event_time = visits[same_time[0]].arrival;

            while let Some(&Reverse((departure, i))) = departures.peek() {
                if departure > event_time {
                    break;
                }
                departures.pop();
                active.remove(&(visits[i].arrival, i));
            }

            let mut transient = vec![];
            for &i in same_time {
                match presence_end(&visits[i], open_departure) {
                    Presence::Until(departure) if departure > event_time => {
                        active.insert((event_time, i));
                        departures.push(Reverse((departure, i)));
                    }
                    Presence::Forever => {
                        active.insert((event_time, i));
                    }
                    Presence::Until(_) | Presence::OwnArrivalOnly => transient.push(i),
                }
            }

            groups.push(SnapshotGroup {
                event_time,
                triggers: same_time.to_vec(),
                members: active.iter().map(|&(_, i)| i).collect(),
                transient,
            });
        }

        tracing::debug!(
            groups = groups.len(),
            rows = groups.iter().map(SnapshotGroup::len).sum::<usize>(),
            "built presentation timeline"
        );
        Self { groups }
    }

    #[must_use]
    pub fn groups(&self) -> &[SnapshotGroup] {
        &self.groups
    }

    /// The group triggered at `t`, if any visit arrived then.
    #[must_use]
    pub fn group_at(&self, t: NaiveDateTime) -> Option<&SnapshotGroup> {
        self.groups
            .binary_search_by_key(&t, |group| group.event_time)
            .ok()
            .map(|i| &self.groups[i])
    }

    /// Total number of (arrival event, present visit) pairs.
    #[must_use]
    pub fn num_rows(&self) -> usize {
        self.groups.iter().map(SnapshotGroup::len).sum()
    }
}

enum Presence {
    Until(NaiveDateTime),
    Forever,
    OwnArrivalOnly,
}

fn presence_end(visit: &Visit, open_departure: OpenDeparturePolicy) -> Presence {
    match (visit.departure, open_departure) {
        (Some(departure), _) => Presence::Until(departure),
        (None, OpenDeparturePolicy::StaysPresent) => Presence::Forever,
        (None, OpenDeparturePolicy::Excluded) => Presence::OwnArrivalOnly,
    }
}
