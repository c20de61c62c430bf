//! Effects of arrival time and department occupancy on wait to clinician.

use std::collections::BTreeMap;

use edwait_core::aggregate::AnnotatedVisit;
use edwait_stats::{
    anova::{self, AnovaTable},
    descriptive::DescriptiveStats,
    regression::{DesignMatrix, OlsFit, RegressionError},
};
use serde::Serialize;

use crate::sample::RankedSample;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, derive_more::Display)]
#[serde(rename_all = "kebab-case")]
pub enum ArrivalFactor {
    #[display("hour")]
    Hour,
    #[display("day of week")]
    Weekday,
    #[display("month")]
    Month,
}

impl ArrivalFactor {
    pub const ALL: [Self; 3] = [Self::Hour, Self::Weekday, Self::Month];

    #[must_use]
    pub fn level(self, sample: &RankedSample) -> u32 {
        match self {
            Self::Hour => sample.arrival_hour,
            Self::Weekday => sample.arrival_weekday,
            Self::Month => sample.arrival_month,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct LevelStats {
    pub level: u32,
    pub wait: DescriptiveStats,
}

/// Wait to clinician grouped by one arrival-time factor, with a one-way ANOVA
/// across its levels.
#[derive(Debug, Clone, Serialize)]
pub struct ArrivalEffect {
    pub factor: ArrivalFactor,
    pub levels: Vec<LevelStats>,
    /// `None` when fewer than two levels are populated.
    pub anova: Option<AnovaTable>,
}

impl ArrivalEffect {
    #[must_use]
    pub fn compute(samples: &[RankedSample], factor: ArrivalFactor) -> Self {
        let groups = group_waits(samples, |s| factor.level(s));
        let levels = groups
            .iter()
            .filter_map(|(level, waits)| {
                Some(LevelStats {
                    level: *level,
                    wait: DescriptiveStats::new(waits.iter().copied())?,
                })
            })
            .collect();
        Self {
            factor,
            levels,
            anova: anova::one_way(&groups),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize)]
pub struct OccupancyLevel {
    pub occupancy: u32,
    pub count: usize,
    pub mean_wait: f64,
}

/// Mean wait per occupancy-at-arrival and the OLS fit `wait ~ occupancy`.
#[derive(Debug, Clone, Serialize)]
pub struct OccupancyEffect {
    pub levels: Vec<OccupancyLevel>,
    pub fit: OlsFit,
}

impl OccupancyEffect {
    pub fn compute(samples: &[RankedSample]) -> Result<Self, RegressionError> {
        #[expect(clippy::cast_precision_loss)]
        let levels = group_waits(samples, |s| s.occupancy_at_arrival)
            .into_iter()
            .map(|(occupancy, waits)| OccupancyLevel {
                occupancy,
                count: waits.len(),
                mean_wait: waits.iter().sum::<f64>() / waits.len() as f64,
            })
            .collect();

        let mut design = DesignMatrix::with_intercept(samples.len());
        design.push_column(
            "occupancy_at_arrival",
            samples
                .iter()
                .map(|s| f64::from(s.occupancy_at_arrival))
                .collect(),
        )?;
        let waits = samples.iter().map(|s| s.wait_minutes).collect::<Vec<_>>();
        Ok(Self {
            levels,
            fit: OlsFit::fit(&design, &waits)?,
        })
    }
}

/// Number of arrivals per (hour, triage priority).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct HourTriageCount {
    pub hour: u32,
    pub priority: i64,
    pub count: usize,
}

impl HourTriageCount {
    /// Counts every included visit, seen or not, in (hour, priority) order.
    #[must_use]
    pub fn tabulate(visits: &[AnnotatedVisit]) -> Vec<Self> {
        visits
            .iter()
            .filter_map(|v| Some((v.arrival_hour?, v.included_priority()?)))
            .fold(BTreeMap::<(u32, i64), usize>::new(), |mut counts, key| {
                *counts.entry(key).or_default() += 1;
                counts
            })
            .into_iter()
            .map(|((hour, priority), count)| Self {
                hour,
                priority,
                count,
            })
            .collect()
    }
}

fn group_waits<F>(samples: &[RankedSample], mut key: F) -> Vec<(u32, Vec<f64>)>
where
    F: FnMut(&RankedSample) -> u32,
{
    samples
        .iter()
        .fold(BTreeMap::<u32, Vec<f64>>::new(), |mut groups, s| {
            groups.entry(key(s)).or_default().push(s.wait_minutes);
            groups
        })
        .into_iter()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sample::tests::annotated;

    fn sample(hour: u32, occupancy: u32, wait: f64) -> RankedSample {
        RankedSample {
            priority: 3,
            treated_later: false,
            wait_minutes: wait,
            lateness_minutes: wait - 30.0,
            arrival_hour: hour,
            arrival_weekday: hour % 7,
            arrival_month: 1,
            occupancy_at_arrival: occupancy,
            bumped_by_priority: vec![0; 5],
        }
    }

    #[test]
    fn test_hour_effect() {
        let samples = [
            sample(2, 1, 10.0),
            sample(2, 1, 12.0),
            sample(2, 1, 11.0),
            sample(14, 1, 60.0),
            sample(14, 1, 62.0),
            sample(14, 1, 61.0),
        ];
        let effect = ArrivalEffect::compute(&samples, ArrivalFactor::Hour);
        assert_eq!(effect.levels.len(), 2);
        assert_eq!(effect.levels[0].level, 2);
        assert_eq!(effect.levels[1].wait.mean, 61.0);
        assert!(effect.anova.unwrap().term("group").unwrap().p_value.unwrap() < 0.001);

        let month = ArrivalEffect::compute(&samples, ArrivalFactor::Month);
        assert!(month.anova.is_none());
    }

    #[test]
    fn test_occupancy_effect() {
        let samples = (0..10)
            .map(|i| sample(9, i, 5.0 + 3.0 * f64::from(i)))
            .collect::<Vec<_>>();
        let effect = OccupancyEffect::compute(&samples).unwrap();
        assert_eq!(effect.levels.len(), 10);
        assert_eq!(effect.levels[2].mean_wait, 11.0);
        let slope = effect.fit.coefficient("occupancy_at_arrival").unwrap();
        assert!((slope.estimate.unwrap() - 3.0).abs() < 1e-9);
    }

    #[test]
    fn test_triage_mix_counts_unseen_visits() {
        let visits = [
            annotated(3, 30, Some(10.0), false),
            annotated(3, 30, None, false),
            annotated(1, 2, Some(1.0), false),
        ];
        let counts = HourTriageCount::tabulate(&visits);
        assert_eq!(
            counts,
            vec![
                HourTriageCount {
                    hour: 9,
                    priority: 1,
                    count: 1
                },
                HourTriageCount {
                    hour: 9,
                    priority: 3,
                    count: 2
                },
            ]
        );
    }
}
