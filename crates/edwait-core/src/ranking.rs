//! Ordering-violation detection.
//!
//! Within each snapshot group the seen members are ranked twice: by the time
//! they were actually seen and by their expected-seen deadline. A member whose
//! actual rank is worse than its expected rank was treated later than the
//! deadline ordering implies.

use std::collections::BTreeSet;

use crate::{
    timeline::{SnapshotGroup, Timeline},
    visit::Visit,
};

/// Ranks of one member in one snapshot group.
///
/// Ranks are 1-based and only assigned to members with a seen time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MemberRanking {
    pub visit: usize,
    pub actual_rank: Option<usize>,
    pub expected_rank: Option<usize>,
}

impl MemberRanking {
    /// `Some(true)` if the member was seen later than its deadline order.
    #[must_use]
    pub fn is_violation(&self) -> Option<bool> {
        Some(self.actual_rank? > self.expected_rank?)
    }
}

/// Ranks the members of `group`, returning one entry per member in member
/// order, followed by one entry per transient visit.
///
/// Both orderings are stable sorts over the encounter order, so members with
/// equal seen times or equal deadlines keep their relative order. A transient
/// visit is ranked on its own, as a group of one.
#[must_use]
pub fn rank_group(visits: &[Visit], group: &SnapshotGroup) -> Vec<MemberRanking> {
    let seen = group
        .members
        .iter()
        .enumerate()
        .filter(|&(_, &m)| visits[m].seen.is_some())
        .map(|(pos, _)| pos)
        .collect::<Vec<_>>();

    let mut by_actual = seen.clone();
    by_actual.sort_by_key(|&pos| visits[group.members[pos]].seen);
    let mut by_expected = seen;
    by_expected.sort_by_key(|&pos| visits[group.members[pos]].expected_seen);

    let mut rankings = group
        .members
        .iter()
        .map(|&visit| MemberRanking {
            visit,
            actual_rank: None,
            expected_rank: None,
        })
        .collect::<Vec<_>>();
    for (rank, pos) in by_actual.into_iter().enumerate() {
        rankings[pos].actual_rank = Some(rank + 1);
    }
    for (rank, pos) in by_expected.into_iter().enumerate() {
        rankings[pos].expected_rank = Some(rank + 1);
    }
    rankings.extend(group.transient.iter().map(|&visit| {
        let rank = visits[visit].seen.map(|_| 1);
        MemberRanking {
            visit,
            actual_rank: rank,
            expected_rank: rank,
        }
    }));
    rankings
}

/// `(bumped, bumper)` pairs in `group`: the bumper was seen strictly earlier
/// despite a strictly later deadline.
fn group_bumps<'a>(
    visits: &'a [Visit],
    group: &'a SnapshotGroup,
) -> impl Iterator<Item = (usize, usize)> + 'a {
    group.members.iter().flat_map(move |&x| {
        group.members.iter().filter_map(move |&y| {
            let (vx, vy) = (&visits[x], &visits[y]);
            let bumped = vy.expected_seen > vx.expected_seen && vy.seen? < vx.seen?;
            bumped.then_some((x, y))
        })
    })
}

/// Per-visit result of the ordering analysis over a whole timeline.
#[derive(Debug, Clone)]
pub struct OrderingAnalysis {
    /// Rankings per snapshot group, parallel to [`Timeline::groups`].
    pub rankings: Vec<Vec<MemberRanking>>,
    /// `true` if any group flags the visit; `None` for visits never ranked.
    pub flags: Vec<Option<bool>>,
    /// Distinct visits that bumped each visit in any shared group.
    pub bumpers: Vec<BTreeSet<usize>>,
}

impl OrderingAnalysis {
    #[must_use]
    pub fn analyze(visits: &[Visit], timeline: &Timeline) -> Self {
        let rankings = timeline
            .groups()
            .iter()
            .map(|group| rank_group(visits, group))
            .collect::<Vec<_>>();

        let flags = rankings.iter().flatten().fold(
            vec![None; visits.len()],
            |mut flags: Vec<Option<bool>>, ranking| {
                if let Some(violation) = ranking.is_violation() {
                    let flag = &mut flags[ranking.visit];
                    *flag = Some(flag.unwrap_or(false) || violation);
                }
                flags
            },
        );

        let bumpers = timeline
            .groups()
            .iter()
            .flat_map(|group| group_bumps(visits, group))
            .fold(
                vec![BTreeSet::new(); visits.len()],
                |mut bumpers, (bumped, bumper)| {
                    bumpers[bumped].insert(bumper);
                    bumpers
                },
            );

        let flagged = flags.iter().filter(|f| **f == Some(true)).count();
        tracing::debug!(flagged, "detected ordering violations");

        Self {
            rankings,
            flags,
            bumpers,
        }
    }
}

#[cfg(test)]
mod tests {
    use rand::SeedableRng;
    use rand_pcg::Pcg64Mcg;

    use super::*;
    use crate::{
        allowance::AllowanceTable,
        config::OpenDeparturePolicy,
        timeline::tests::random_records,
        visit::{
            VisitLog, VisitRecord,
            tests::{at, record},
        },
    };

    fn analyze(records: Vec<VisitRecord>) -> (Vec<Visit>, Timeline, OrderingAnalysis) {
        let visits = VisitLog::new(records, &AllowanceTable::default())
            .unwrap()
            .visits()
            .to_vec();
        let timeline = Timeline::build(&visits, OpenDeparturePolicy::StaysPresent);
        let analysis = OrderingAnalysis::analyze(&visits, &timeline);
        (visits, timeline, analysis)
    }

    #[test]
    fn test_deadline_order_respected() {
        let (_, timeline, analysis) = analyze(vec![
            record("A", 1, at(9, 0), Some(at(9, 5)), Some(at(10, 0))),
            record("B", 5, at(8, 55), Some(at(9, 10)), Some(at(11, 0))),
        ]);
        let group = timeline.group_at(at(9, 0)).unwrap();
        assert_eq!(group.members, vec![1, 0]);
        let ranks = &analysis.rankings[1];
        // B: seen second, expected second
        assert_eq!((ranks[0].actual_rank, ranks[0].expected_rank), (Some(2), Some(2)));
        // A: seen first, expected first
        assert_eq!((ranks[1].actual_rank, ranks[1].expected_rank), (Some(1), Some(1)));
        assert_eq!(analysis.flags, vec![Some(false), Some(false)]);
        assert!(analysis.bumpers.iter().all(BTreeSet::is_empty));
    }

    #[test]
    fn test_less_urgent_seen_first_flags_the_urgent_visit() {
        // B (priority 5) is seen at 09:01, before A (priority 1) at 09:05
        let (_, _, analysis) = analyze(vec![
            record("A", 1, at(9, 0), Some(at(9, 5)), Some(at(10, 0))),
            record("B", 5, at(8, 55), Some(at(9, 1)), Some(at(11, 0))),
        ]);
        let ranks = &analysis.rankings[1];
        assert_eq!((ranks[0].actual_rank, ranks[0].expected_rank), (Some(1), Some(2)));
        assert_eq!((ranks[1].actual_rank, ranks[1].expected_rank), (Some(2), Some(1)));
        // only falling behind is a violation: A is flagged, B jumped ahead
        assert_eq!(analysis.flags, vec![Some(true), Some(false)]);
        assert_eq!(analysis.bumpers[0], BTreeSet::from([1]));
        assert!(analysis.bumpers[1].is_empty());
    }

    #[test]
    fn test_ties_keep_encounter_order() {
        let (_, _, analysis) = analyze(vec![
            record("A", 3, at(9, 0), Some(at(9, 20)), Some(at(10, 0))),
            record("B", 3, at(9, 0), Some(at(9, 20)), Some(at(10, 0))),
        ]);
        let ranks = &analysis.rankings[0];
        assert_eq!(ranks[0].actual_rank, Some(1));
        assert_eq!(ranks[1].actual_rank, Some(2));
        assert_eq!(ranks[0].expected_rank, Some(1));
        assert_eq!(ranks[1].expected_rank, Some(2));
        assert_eq!(analysis.flags, vec![Some(false), Some(false)]);
    }

    #[test]
    fn test_unseen_members_are_not_ranked() {
        let (_, _, analysis) = analyze(vec![
            record("A", 1, at(9, 0), None, Some(at(10, 0))),
            record("B", 2, at(9, 5), Some(at(9, 10)), Some(at(10, 0))),
        ]);
        let ranks = &analysis.rankings[1];
        assert_eq!(ranks[0].actual_rank, None);
        assert_eq!(ranks[0].is_violation(), None);
        assert_eq!(ranks[1].actual_rank, Some(1));
        assert_eq!(analysis.flags, vec![None, Some(false)]);
    }

    #[test]
    fn test_flag_is_or_across_groups() {
        // C is flagged only once D arrives and is seen ahead of it
        let (_, timeline, analysis) = analyze(vec![
            record("C", 2, at(9, 0), Some(at(9, 30)), Some(at(10, 0))),
            record("D", 5, at(9, 10), Some(at(9, 15)), Some(at(10, 0))),
        ]);
        assert_eq!(timeline.groups()[0].members, vec![0]);
        assert_eq!(analysis.rankings[0][0].is_violation(), Some(false));
        assert_eq!(analysis.rankings[1][0].is_violation(), Some(true));
        assert_eq!(analysis.flags[0], Some(true));
    }

    #[test]
    fn test_rankings_are_permutations() {
        let mut rng = Pcg64Mcg::seed_from_u64(2024);
        for _ in 0..20 {
            let (visits, timeline, analysis) = analyze(random_records(&mut rng, 50));
            for (group, ranks) in timeline.groups().iter().zip(&analysis.rankings) {
                assert_eq!(group.len(), ranks.len());
                let (ranks, transient) = ranks.split_at(group.members.len());
                assert!(transient.iter().all(|r| r.is_violation() != Some(true)));
                let seen = group
                    .members
                    .iter()
                    .filter(|&&m| visits[m].seen.is_some())
                    .count();
                let mut actual = ranks.iter().filter_map(|r| r.actual_rank).collect::<Vec<_>>();
                let mut expected = ranks.iter().filter_map(|r| r.expected_rank).collect::<Vec<_>>();
                actual.sort_unstable();
                expected.sort_unstable();
                assert_eq!(actual, (1..=seen).collect::<Vec<_>>());
                assert_eq!(expected, (1..=seen).collect::<Vec<_>>());
                if ranks.len() == 1 {
                    assert_ne!(ranks[0].is_violation(), Some(true));
                }
            }
        }
    }

    #[test]
    fn test_zero_length_stay_is_ranked_alone() {
        // B arrives and leaves at 09:00; A must not rank against it
        let (_, timeline, analysis) = analyze(vec![
            record("A", 3, at(9, 0), Some(at(9, 20)), Some(at(9, 30))),
            record("B", 1, at(9, 0), Some(at(9, 0)), Some(at(9, 0))),
        ]);
        let group = &timeline.groups()[0];
        assert_eq!(group.members, vec![0]);
        let ranks = &analysis.rankings[0];
        assert_eq!(ranks.len(), 2);
        assert_eq!((ranks[0].visit, ranks[0].actual_rank), (0, Some(1)));
        assert_eq!((ranks[1].visit, ranks[1].expected_rank), (1, Some(1)));
        assert_eq!(analysis.flags, vec![Some(false), Some(false)]);
        assert!(analysis.bumpers.iter().all(BTreeSet::is_empty));
    }

    #[test]
    fn test_seen_time_tie_follows_encounter_order() {
        // both seen at 09:10; B arrived first so it takes actual rank 1
        let (_, _, analysis) = analyze(vec![
            record("A", 1, at(9, 0), Some(at(9, 10)), Some(at(10, 0))),
            record("B", 5, at(8, 50), Some(at(9, 10)), Some(at(10, 0))),
        ]);
        let ranks = &analysis.rankings[1];
        assert_eq!(ranks[1].visit, 0);
        assert_eq!((ranks[1].actual_rank, ranks[1].expected_rank), (Some(2), Some(1)));
        assert_eq!(analysis.flags[0], Some(true));
        // not seen strictly earlier, so B is not a bumper
        assert!(analysis.bumpers[0].is_empty());
    }
}
