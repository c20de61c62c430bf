//! Models of lateness against the treated-out-of-order flag.
//!
//! All models run on the samples inside the [`OutlierWindow`].

use std::collections::BTreeMap;

use edwait_stats::{
    anova::{self, AnovaTable},
    descriptive::DescriptiveStats,
    posthoc::{self, PairwiseComparison, PairwiseSummary},
    regression::{DesignMatrix, OlsFit, RegressionError},
};
use serde::Serialize;

use crate::sample::RankedSample;

pub const FLAG_FACTOR: &str = "treated_later";
pub const PRIORITY_FACTOR: &str = "priority";

/// Lateness range `mean ± k·std` outside of which samples are dropped.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct OutlierWindow {
    pub lower: f64,
    pub upper: f64,
    pub kept: usize,
    pub removed: usize,
}

impl OutlierWindow {
    /// Computes the window and returns it with the samples inside it.
    #[must_use]
    pub fn apply(samples: &[RankedSample], k: f64) -> Option<(Self, Vec<&RankedSample>)> {
        let stats = DescriptiveStats::new(samples.iter().map(|s| s.lateness_minutes))?;
        let (lower, upper) = stats.window(k);
        let kept = samples
            .iter()
            .filter(|s| (lower..=upper).contains(&s.lateness_minutes))
            .collect::<Vec<_>>();
        let window = Self {
            lower,
            upper,
            kept: kept.len(),
            removed: samples.len() - kept.len(),
        };
        tracing::debug!(
            lower,
            upper,
            removed = window.removed,
            "applied lateness outlier window"
        );
        Some((window, kept))
    }
}

/// OLS of lateness on the flag: `lateness ~ C(treated_later)`.
pub fn regress_on_flag(samples: &[&RankedSample]) -> Result<OlsFit, RegressionError> {
    let (lateness, flags, _) = columns(samples);
    let mut design = DesignMatrix::with_intercept(samples.len());
    design.push_categorical(FLAG_FACTOR, &flags)?;
    OlsFit::fit(&design, &lateness)
}

/// Two-factor ANOVA `lateness ~ C(treated_later) * C(priority)`.
pub fn factorial_anova(samples: &[&RankedSample]) -> Result<AnovaTable, RegressionError> {
    let (lateness, flags, priorities) = columns(samples);
    anova::two_factor(
        &lateness,
        (FLAG_FACTOR, &flags),
        (PRIORITY_FACTOR, &priorities),
    )
}

/// Pairwise comparisons between `flag/priority` cells.
#[derive(Debug, Clone, Serialize)]
pub struct CellComparisons {
    pub comparisons: Vec<PairwiseComparison>,
    pub summary: Vec<PairwiseSummary>,
}

impl CellComparisons {
    /// Cells are labelled `"{flag}/{priority}"` with the flag as `0` or `1`.
    #[must_use]
    pub fn compare(samples: &[&RankedSample], alpha: f64) -> Self {
        let cells = samples
            .iter()
            .fold(BTreeMap::<(u8, i64), Vec<f64>>::new(), |mut cells, s| {
                cells
                    .entry((u8::from(s.treated_later), s.priority))
                    .or_default()
                    .push(s.lateness_minutes);
                cells
            })
            .into_iter()
            .map(|((flag, priority), values)| (format!("{flag}/{priority}"), values))
            .collect::<Vec<_>>();
        let comparisons = posthoc::pairwise(&cells, alpha);
        let summary = posthoc::summarize(&comparisons);
        Self {
            comparisons,
            summary,
        }
    }
}

fn columns(samples: &[&RankedSample]) -> (Vec<f64>, Vec<u8>, Vec<i64>) {
    let lateness = samples.iter().map(|s| s.lateness_minutes).collect();
    let flags = samples.iter().map(|s| u8::from(s.treated_later)).collect();
    let priorities = samples.iter().map(|s| s.priority).collect();
    (lateness, flags, priorities)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(priority: i64, treated_later: bool, lateness: f64) -> RankedSample {
        RankedSample {
            priority,
            treated_later,
            wait_minutes: lateness,
            lateness_minutes: lateness,
            arrival_hour: 0,
            arrival_weekday: 0,
            arrival_month: 1,
            occupancy_at_arrival: 0,
            bumped_by_priority: vec![],
        }
    }

    fn samples() -> Vec<RankedSample> {
        let mut samples = vec![];
        for (i, offset) in [-1.0, 0.0, 1.0, 0.5, -0.5].into_iter().enumerate() {
            let priority = if i % 2 == 0 { 3 } else { 4 };
            samples.push(sample(priority, false, 5.0 + offset));
            samples.push(sample(priority, true, 25.0 + offset));
        }
        samples
    }

    #[test]
    fn test_outlier_window_drops_extremes() {
        let mut samples = (0..30)
            .map(|i| sample(3, false, f64::from(i % 5)))
            .collect::<Vec<_>>();
        samples.push(sample(3, true, 500.0));
        let (window, kept) = OutlierWindow::apply(&samples, 3.0).unwrap();
        assert_eq!(window.removed, 1);
        assert_eq!(kept.len(), 30);
        assert!(window.upper < 500.0);
    }

    #[test]
    fn test_regression_recovers_flag_effect() {
        let samples = samples();
        let refs = samples.iter().collect::<Vec<_>>();
        let fit = regress_on_flag(&refs).unwrap();
        let effect = fit.coefficient("C(treated_later)[T.1]").unwrap();
        assert!((effect.estimate.unwrap() - 20.0).abs() < 1e-9);
        assert!(effect.p_value.unwrap() < 0.001);
        assert!(fit.r_squared.unwrap() > 0.9);
    }

    #[test]
    fn test_factorial_anova_terms() {
        let samples = samples();
        let refs = samples.iter().collect::<Vec<_>>();
        let table = factorial_anova(&refs).unwrap();
        assert!(table.term("C(treated_later)").unwrap().p_value.unwrap() < 0.001);
        assert!(table.term("C(priority)").is_some());
        assert!(table.term("C(treated_later):C(priority)").is_some());
    }

    #[test]
    fn test_cell_comparisons_flag_later_cells_worse() {
        let samples = samples();
        let refs = samples.iter().collect::<Vec<_>>();
        let cells = CellComparisons::compare(&refs, 0.05);
        let groups = cells
            .summary
            .iter()
            .map(|s| s.group.as_str())
            .collect::<Vec<_>>();
        assert_eq!(groups, vec!["0/3", "0/4", "1/3", "1/4"]);
        let later = cells.summary.iter().find(|s| s.group == "1/3").unwrap();
        assert!(later.worse > 0);
        assert_eq!(later.better, 0);
    }
}
