//! Wait-to-clinician survival per triage priority.
//!
//! Visits that left without being seen never reach the "seen" event; treating
//! their length of stay as a wait would bias the waits downwards, so they
//! enter the Kaplan–Meier estimate as right-censored observations instead.

use std::collections::BTreeMap;

use edwait_stats::{percentiles::Percentiles, survival::KaplanMeierCurve};
use serde::Serialize;

use crate::sample::WaitObservation;

#[derive(Debug, Clone, Serialize)]
pub struct PriorityWaitSurvival {
    pub priority: i64,
    pub observations: usize,
    /// Visits that departed unseen.
    pub censored: usize,
    /// Kaplan–Meier median wait in minutes.
    pub median_wait: Option<f64>,
    /// Estimated probability of being seen within the priority's allowance.
    pub seen_within_allowance: Option<f64>,
    /// Nearest-rank percentiles of the observed waits of seen visits, keyed by
    /// [`WAIT_PERCENTILES`].
    pub seen_wait_percentiles: Option<Percentiles>,
    #[serde(skip)]
    pub curve: KaplanMeierCurve,
}

/// Percentile points reported for observed waits.
pub const WAIT_PERCENTILES: [f64; 2] = [50.0, 90.0];

impl PriorityWaitSurvival {
    /// One entry per priority, most urgent first.
    #[must_use]
    pub fn by_priority(observations: &[WaitObservation]) -> Vec<Self> {
        let mut groups = BTreeMap::<i64, Vec<&WaitObservation>>::new();
        for observation in observations {
            groups.entry(observation.priority).or_default().push(observation);
        }

        groups
            .into_iter()
            .map(|(priority, group)| {
                let curve = KaplanMeierCurve::from_data(
                    group
                        .iter()
                        .map(|o| (whole_minutes(o.minutes), o.censored))
                        .collect(),
                );
                let allowance = group.first().map(|o| whole_minutes(o.allowance_minutes));
                let seen_waits = group
                    .iter()
                    .filter(|o| !o.censored)
                    .map(|o| o.minutes)
                    .collect::<Vec<_>>();
                Self {
                    priority,
                    observations: group.len(),
                    censored: group.iter().filter(|o| o.censored).count(),
                    median_wait: curve.median(),
                    seen_within_allowance: allowance.map(|a| 1.0 - curve.survival_at(a)),
                    seen_wait_percentiles: (!seen_waits.is_empty())
                        .then(|| Percentiles::new(&seen_waits, &WAIT_PERCENTILES)),
                    curve,
                }
            })
            .collect()
    }
}

#[expect(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn whole_minutes(minutes: f64) -> u32 {
    minutes.max(0.0).floor() as u32
}
