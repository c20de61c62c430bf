use std::collections::BTreeMap;

use serde::Serialize;

use crate::sample::RankedSample;

/// How often visits of one triage priority were treated out of order, and by
/// which competing priorities.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PriorityPrevalence {
    pub priority: i64,
    pub ranked: usize,
    pub treated_later: usize,
    pub rate: f64,
    /// Distinct bumping visits summed over this priority's visits, per
    /// competing priority (index 0 = priority 1).
    pub bumped_by: Vec<u32>,
    pub bumped_by_more_urgent: u32,
    pub bumped_by_less_urgent: u32,
}

impl PriorityPrevalence {
    /// One entry per priority present in `samples`, most urgent first.
    #[expect(clippy::cast_precision_loss)]
    #[must_use]
    pub fn by_priority(samples: &[RankedSample]) -> Vec<Self> {
        let num_priorities = samples
            .iter()
            .map(|s| s.bumped_by_priority.len())
            .max()
            .unwrap_or(0);

        let mut groups = BTreeMap::<i64, Vec<&RankedSample>>::new();
        for sample in samples {
            groups.entry(sample.priority).or_default().push(sample);
        }

        groups
            .into_iter()
            .map(|(priority, group)| {
                let treated_later = group.iter().filter(|s| s.treated_later).count();
                let bumped_by = group.iter().fold(vec![0; num_priorities], |mut acc, s| {
                    for (total, count) in acc.iter_mut().zip(&s.bumped_by_priority) {
                        *total += count;
                    }
                    acc
                });
                let own = usize::try_from(priority - 1).unwrap_or(0).min(num_priorities);
                Self {
                    priority,
                    ranked: group.len(),
                    treated_later,
                    rate: treated_later as f64 / group.len() as f64,
                    bumped_by_more_urgent: bumped_by[..own].iter().sum(),
                    bumped_by_less_urgent: bumped_by.get(own + 1..).map_or(0, |r| r.iter().sum()),
                    bumped_by,
                }
            })
            .collect()
    }
}
