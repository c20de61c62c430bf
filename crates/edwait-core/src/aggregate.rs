//! Per-visit metric aggregation.
//!
//! Produces exactly one [`AnnotatedVisit`] per input row, in input order.

use chrono::{Datelike, NaiveDateTime, Timelike};
use serde::{Deserialize, Serialize};

use crate::{
    allowance::AllowanceTable,
    config::OccupancyPolicy,
    ranking::OrderingAnalysis,
    timeline::Timeline,
    timestamp,
    visit::{ExclusionReason, VisitLog},
};

/// One input visit with its derived metrics.
///
/// Durations are in minutes. Derived columns are `None` when the inputs they
/// depend on are missing or the row was excluded from the timeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnnotatedVisit {
    pub mrn: String,
    pub visit_number: u32,
    #[serde(with = "timestamp::optional")]
    pub arrival: Option<NaiveDateTime>,
    pub triage_priority: Option<i64>,
    #[serde(with = "timestamp::optional")]
    pub seen: Option<NaiveDateTime>,
    #[serde(with = "timestamp::optional")]
    pub departure: Option<NaiveDateTime>,
    pub arrival_hour: Option<u32>,
    /// Days since Monday (0 = Monday).
    pub arrival_weekday: Option<u32>,
    pub arrival_month: Option<u32>,
    pub excluded: Option<ExclusionReason>,
    #[serde(with = "timestamp::optional")]
    pub expected_seen: Option<NaiveDateTime>,
    pub occupancy_at_arrival: Option<u32>,
    /// Present visits at arrival per priority (index 0 = priority 1).
    pub occupancy_by_priority: Vec<u32>,
    pub wait_minutes: Option<f64>,
    /// Wait minus the visit's own allowance; positive means the guideline was exceeded.
    pub lateness_minutes: Option<f64>,
    pub treatment_minutes: Option<f64>,
    pub length_of_stay_minutes: Option<f64>,
    pub treated_later_than_ordering: Option<bool>,
    /// Distinct visits of each priority that bumped this one.
    pub bumped_by_priority: Vec<u32>,
    pub bumped_by_more_urgent: Option<u32>,
    pub bumped_by_less_urgent: Option<u32>,
}

impl AnnotatedVisit {
    /// Triage priority, only for rows that took part in the timeline.
    #[must_use]
    pub fn included_priority(&self) -> Option<i64> {
        self.excluded.is_none().then_some(self.triage_priority).flatten()
    }
}

/// Annotates every row of `log`.
#[must_use]
pub fn annotate(
    log: &VisitLog,
    timeline: &Timeline,
    ordering: &OrderingAnalysis,
    allowance: &AllowanceTable,
    occupancy: OccupancyPolicy,
) -> Vec<AnnotatedVisit> {
    let visits = log.visits();
    let mut positions = vec![None; log.records().len()];
    for (pos, visit) in visits.iter().enumerate() {
        positions[visit.index] = Some(pos);
    }
    let mut excluded = vec![None; log.records().len()];
    for exclusion in log.exclusions() {
        excluded[exclusion.row - 1] = Some(exclusion.reason);
    }

    let num_priorities = allowance.num_priorities();
    log.records()
        .iter()
        .zip(positions.iter().zip(excluded))
        .map(|(record, (&pos, excluded))| {
            let mut annotated = AnnotatedVisit {
                mrn: record.mrn.clone(),
                visit_number: record.visit_number,
                arrival: record.arrival,
                triage_priority: record.triage_priority,
                seen: record.seen,
                departure: record.departure,
                arrival_hour: record.arrival.map(|t| t.hour()),
                arrival_weekday: record.arrival.map(|t| t.weekday().num_days_from_monday()),
                arrival_month: record.arrival.map(|t| t.month()),
                excluded,
                expected_seen: None,
                occupancy_at_arrival: None,
                occupancy_by_priority: vec![],
                wait_minutes: None,
                lateness_minutes: None,
                treatment_minutes: None,
                length_of_stay_minutes: None,
                treated_later_than_ordering: None,
                bumped_by_priority: vec![],
                bumped_by_more_urgent: None,
                bumped_by_less_urgent: None,
            };
            let Some(pos) = pos else {
                return annotated;
            };
            let visit = &visits[pos];

            let mut by_priority = vec![0; num_priorities];
            if let Some(group) = timeline.group_at(visit.arrival) {
                for &member in group.members.iter().filter(|&&m| m != pos) {
                    by_priority[visits[member].priority.index()] += 1;
                }
            }
            if occupancy == OccupancyPolicy::IncludeSelf {
                by_priority[visit.priority.index()] += 1;
            }
            annotated.occupancy_at_arrival = Some(by_priority.iter().sum());
            annotated.occupancy_by_priority = by_priority;

            if visit.seen.is_some() {
                let mut bumped_by = vec![0; num_priorities];
                for &bumper in &ordering.bumpers[pos] {
                    bumped_by[visits[bumper].priority.index()] += 1;
                }
                let own = visit.priority.index();
                annotated.bumped_by_more_urgent = Some(bumped_by[..own].iter().sum());
                annotated.bumped_by_less_urgent = Some(bumped_by[own + 1..].iter().sum());
                annotated.bumped_by_priority = bumped_by;
            }

            let allowance_minutes = f64::from(allowance.allowance_minutes(visit.priority));
            annotated.expected_seen = Some(visit.expected_seen);
            annotated.wait_minutes = visit.seen.map(|seen| minutes_between(visit.arrival, seen));
            annotated.lateness_minutes = annotated.wait_minutes.map(|wait| wait - allowance_minutes);
            annotated.treatment_minutes = visit
                .seen
                .zip(visit.departure)
                .map(|(seen, departure)| minutes_between(seen, departure));
            annotated.length_of_stay_minutes = visit
                .departure
                .map(|departure| minutes_between(visit.arrival, departure));
            annotated.treated_later_than_ordering = ordering.flags[pos];
            annotated
        })
        .collect()
}

#[expect(clippy::cast_precision_loss)]
fn minutes_between(from: NaiveDateTime, to: NaiveDateTime) -> f64 {
    (to - from).num_seconds() as f64 / 60.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        config::OpenDeparturePolicy,
        visit::{
            VisitRecord,
            tests::{at, record},
        },
    };

    fn run(records: Vec<VisitRecord>, occupancy: OccupancyPolicy) -> Vec<AnnotatedVisit> {
        let allowance = AllowanceTable::default();
        let log = VisitLog::new(records, &allowance).unwrap();
        let timeline = Timeline::build(log.visits(), OpenDeparturePolicy::StaysPresent);
        let ordering = OrderingAnalysis::analyze(log.visits(), &timeline);
        annotate(&log, &timeline, &ordering, &allowance, occupancy)
    }

    #[test]
    fn test_reference_scenario_metrics() {
        let visits = run(
            vec![
                record("A", 1, at(9, 0), Some(at(9, 5)), Some(at(10, 0))),
                record("B", 5, at(8, 55), Some(at(9, 1)), Some(at(9, 30))),
            ],
            OccupancyPolicy::ExcludeSelf,
        );
        let a = &visits[0];
        assert_eq!(a.occupancy_at_arrival, Some(1));
        assert_eq!(a.occupancy_by_priority, vec![0, 0, 0, 0, 1]);
        assert_eq!(a.wait_minutes, Some(5.0));
        assert_eq!(a.lateness_minutes, Some(3.0));
        assert_eq!(a.treatment_minutes, Some(55.0));
        assert_eq!(a.length_of_stay_minutes, Some(60.0));
        assert_eq!(a.treated_later_than_ordering, Some(true));
        assert_eq!(a.bumped_by_priority, vec![0, 0, 0, 0, 1]);
        assert_eq!(a.bumped_by_less_urgent, Some(1));
        assert_eq!(a.bumped_by_more_urgent, Some(0));
        assert_eq!(a.expected_seen, Some(at(9, 2)));
        assert_eq!(a.arrival_hour, Some(9));
        assert_eq!(a.arrival_weekday, Some(5));
        assert_eq!(a.arrival_month, Some(3));

        let b = &visits[1];
        assert_eq!(b.occupancy_at_arrival, Some(0));
        assert_eq!(b.lateness_minutes, Some(6.0 - 120.0));
        assert_eq!(b.treated_later_than_ordering, Some(false));
    }

    #[test]
    fn test_occupancy_policy_include_self() {
        let records = vec![
            record("A", 1, at(9, 0), Some(at(9, 5)), Some(at(10, 0))),
            record("B", 5, at(8, 55), Some(at(9, 1)), Some(at(9, 30))),
        ];
        let visits = run(records, OccupancyPolicy::IncludeSelf);
        assert_eq!(visits[0].occupancy_at_arrival, Some(2));
        assert_eq!(visits[0].occupancy_by_priority, vec![1, 0, 0, 0, 1]);
        assert_eq!(visits[1].occupancy_at_arrival, Some(1));
    }

    #[test]
    fn test_rows_are_never_dropped() {
        let mut missing = record("M", 2, at(9, 0), None, None);
        missing.arrival = None;
        let records = vec![
            record("A", 3, at(9, 0), None, Some(at(9, 40))),
            missing,
            record("C", 9, at(9, 10), Some(at(9, 15)), None),
            record("D", 2, at(9, 20), Some(at(9, 50)), Some(at(10, 30))),
        ];
        let visits = run(records, OccupancyPolicy::ExcludeSelf);
        assert_eq!(visits.len(), 4);
        assert_eq!(
            visits.iter().map(|v| v.mrn.as_str()).collect::<Vec<_>>(),
            vec!["A", "M", "C", "D"]
        );

        // unseen: occupancy but no wait or flag
        assert_eq!(visits[0].occupancy_at_arrival, Some(0));
        assert_eq!(visits[0].wait_minutes, None);
        assert_eq!(visits[0].treated_later_than_ordering, None);
        assert_eq!(visits[0].bumped_by_more_urgent, None);
        assert_eq!(visits[0].bumped_by_less_urgent, None);
        assert!(visits[0].bumped_by_priority.is_empty());

        assert_eq!(visits[1].excluded, Some(ExclusionReason::MissingArrival));
        assert_eq!(visits[1].arrival_hour, None);
        assert_eq!(visits[2].excluded, Some(ExclusionReason::PriorityOutOfRange));
        assert_eq!(visits[2].arrival_hour, Some(9));
        assert_eq!(visits[2].occupancy_at_arrival, None);
        assert_eq!(visits[2].included_priority(), None);

        assert_eq!(visits[3].occupancy_at_arrival, Some(1));
        assert_eq!(visits[3].lateness_minutes, Some(20.0));
    }

    #[test]
    fn test_open_departure_grows_occupancy() {
        let records = (0..5)
            .map(|i| {
                let mut r = record("P", 3, at(9, i * 10), None, None);
                r.visit_number = i;
                r
            })
            .collect();
        let visits = run(records, OccupancyPolicy::ExcludeSelf);
        let occupancy = visits
            .iter()
            .map(|v| v.occupancy_at_arrival.unwrap())
            .collect::<Vec<_>>();
        assert_eq!(occupancy, vec![0, 1, 2, 3, 4]);
    }

    #[test]
    fn test_zero_length_stay_is_not_occupancy() {
        let records = vec![
            record("A", 3, at(9, 0), Some(at(9, 20)), Some(at(9, 30))),
            record("B", 1, at(9, 0), Some(at(9, 0)), Some(at(9, 0))),
        ];
        let visits = run(records.clone(), OccupancyPolicy::ExcludeSelf);
        assert_eq!(visits[0].occupancy_at_arrival, Some(0));
        assert_eq!(visits[0].occupancy_by_priority, vec![0; 5]);
        assert_eq!(visits[1].occupancy_at_arrival, Some(1));
        assert_eq!(visits[1].occupancy_by_priority, vec![0, 0, 1, 0, 0]);

        let visits = run(records, OccupancyPolicy::IncludeSelf);
        assert_eq!(visits[0].occupancy_at_arrival, Some(1));
        assert_eq!(visits[1].occupancy_by_priority, vec![1, 0, 1, 0, 0]);
    }
}
