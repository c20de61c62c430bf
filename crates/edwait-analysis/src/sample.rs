//! Observations extracted from the annotated visit table.
//!
//! Analysis only looks at rows that took part in the timeline. A
//! [`RankedSample`] additionally requires a seen time, so that wait, lateness
//! and the treated-out-of-order flag are all known.

use edwait_core::aggregate::AnnotatedVisit;

/// A visit that was seen and ranked.
#[derive(Debug, Clone, PartialEq)]
pub struct RankedSample {
    pub priority: i64,
    pub treated_later: bool,
    pub wait_minutes: f64,
    pub lateness_minutes: f64,
    pub arrival_hour: u32,
    pub arrival_weekday: u32,
    pub arrival_month: u32,
    pub occupancy_at_arrival: u32,
    pub bumped_by_priority: Vec<u32>,
}

impl RankedSample {
    /// Extracts the ranked samples from `visits`, skipping the rest.
    #[must_use]
    pub fn from_visits(visits: &[AnnotatedVisit]) -> Vec<Self> {
        visits.iter().filter_map(Self::from_visit).collect()
    }

    fn from_visit(visit: &AnnotatedVisit) -> Option<Self> {
        Some(Self {
            priority: visit.included_priority()?,
            treated_later: visit.treated_later_than_ordering?,
            wait_minutes: visit.wait_minutes?,
            lateness_minutes: visit.lateness_minutes?,
            arrival_hour: visit.arrival_hour?,
            arrival_weekday: visit.arrival_weekday?,
            arrival_month: visit.arrival_month?,
            occupancy_at_arrival: visit.occupancy_at_arrival?,
            bumped_by_priority: visit.bumped_by_priority.clone(),
        })
    }
}

/// Splits lateness values by the treated-out-of-order flag.
///
/// Returns `(treated_later, not_treated_later)`.
#[must_use]
pub fn lateness_by_flag<'a, I>(samples: I) -> (Vec<f64>, Vec<f64>)
where
    I: IntoIterator<Item = &'a RankedSample>,
{
    samples.into_iter().fold((vec![], vec![]), |(mut later, mut not_later), s| {
        if s.treated_later {
            later.push(s.lateness_minutes);
        } else {
            not_later.push(s.lateness_minutes);
        }
        (later, not_later)
    })
}

/// Wait observation of an included visit, possibly right-censored.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WaitObservation {
    pub priority: i64,
    /// Wait until seen, or time until leaving unseen.
    pub minutes: f64,
    /// The visit left without being seen.
    pub censored: bool,
    pub allowance_minutes: f64,
}

impl WaitObservation {
    /// Seen visits contribute their wait; visits that departed unseen are
    /// censored at their length of stay. Unseen visits without a departure
    /// carry no information and are skipped.
    #[must_use]
    pub fn from_visits(visits: &[AnnotatedVisit]) -> Vec<Self> {
        visits
            .iter()
            .filter_map(|visit| {
                let priority = visit.included_priority()?;
                let allowance_minutes = allowance_minutes(visit)?;
                let (minutes, censored) = match (visit.wait_minutes, visit.length_of_stay_minutes) {
                    (Some(wait), _) => (wait, false),
                    (None, Some(stay)) => (stay, true),
                    (None, None) => return None,
                };
                Some(Self {
                    priority,
                    minutes,
                    censored,
                    allowance_minutes,
                })
            })
            .collect()
    }
}

#[expect(clippy::cast_precision_loss)]
fn allowance_minutes(visit: &AnnotatedVisit) -> Option<f64> {
    let delta = visit.expected_seen? - visit.arrival?;
    Some(delta.num_seconds() as f64 / 60.0)
}

#[cfg(test)]
pub(crate) mod tests {
    use chrono::{NaiveDate, NaiveDateTime, TimeDelta};
    use edwait_core::visit::ExclusionReason;

    use super::*;

    fn at(h: u32, m: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2009, 3, 14)
            .unwrap()
            .and_hms_opt(h, m, 0)
            .unwrap()
    }

    /// An annotated visit as the transform stage would produce it.
    pub(crate) fn annotated(
        priority: i64,
        allowance: i64,
        wait: Option<f64>,
        treated_later: bool,
    ) -> AnnotatedVisit {
        let arrival = at(9, 0);
        let seen = wait.map(|w| arrival + TimeDelta::seconds((w * 60.0).round() as i64));
        AnnotatedVisit {
            mrn: "P".to_owned(),
            visit_number: 1,
            arrival: Some(arrival),
            triage_priority: Some(priority),
            seen,
            departure: None,
            arrival_hour: Some(9),
            arrival_weekday: Some(5),
            arrival_month: Some(3),
            excluded: None,
            expected_seen: Some(arrival + TimeDelta::minutes(allowance)),
            occupancy_at_arrival: Some(0),
            occupancy_by_priority: vec![0; 5],
            wait_minutes: wait,
            lateness_minutes: wait.map(|w| w - allowance as f64),
            treatment_minutes: None,
            length_of_stay_minutes: None,
            treated_later_than_ordering: wait.map(|_| treated_later),
            bumped_by_priority: vec![0; 5],
            bumped_by_more_urgent: Some(0),
            bumped_by_less_urgent: Some(0),
        }
    }

    #[test]
    fn test_ranked_samples_skip_unusable_rows() {
        let mut excluded = annotated(3, 30, Some(40.0), true);
        excluded.excluded = Some(ExclusionReason::SeenAfterDeparture);
        let visits = vec![
            annotated(3, 30, Some(40.0), true),
            annotated(4, 60, None, false),
            excluded,
        ];
        let samples = RankedSample::from_visits(&visits);
        assert_eq!(samples.len(), 1);
        assert_eq!(samples[0].lateness_minutes, 10.0);
        assert!(samples[0].treated_later);

        let (later, not_later) = lateness_by_flag(&samples);
        assert_eq!(later, vec![10.0]);
        assert!(not_later.is_empty());
    }

    #[test]
    fn test_unseen_departures_are_censored() {
        let mut left = annotated(2, 10, None, false);
        left.length_of_stay_minutes = Some(25.0);
        let visits = vec![annotated(2, 10, Some(4.0), false), left, annotated(2, 10, None, false)];
        let observations = WaitObservation::from_visits(&visits);
        assert_eq!(observations.len(), 2);
        assert!(!observations[0].censored);
        assert_eq!(observations[1].minutes, 25.0);
        assert!(observations[1].censored);
        assert_eq!(observations[1].allowance_minutes, 10.0);
    }
}
