//! Pairwise post-hoc comparisons between labelled groups.
//!
//! Every pair of groups is compared with Welch's t-test and the p-values are
//! Bonferroni-adjusted for the number of comparisons actually performed.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::location::WelchTTest;

#[derive(Debug, Clone, Serialize)]
pub struct PairwiseComparison {
    pub group1: String,
    pub group2: String,
    /// `mean(group2) - mean(group1)`.
    pub mean_diff: f64,
    pub p_value: f64,
    pub p_adjusted: f64,
    pub reject: bool,
}

/// Per-group tally of significant pairwise differences.
///
/// `worse` counts significant comparisons where this group had the larger
/// mean, `better` those where it had the smaller one.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PairwiseSummary {
    pub group: String,
    pub significant: usize,
    pub better: usize,
    pub worse: usize,
}

/// Compares every pair of groups.
///
/// Pairs where either side has fewer than two observations or both sides are
/// constant are skipped and do not count towards the adjustment.
///
/// ```
/// # use edwait_stats::posthoc::pairwise;
/// let groups = [
///     ("0/3".to_owned(), vec![5.0, 6.0, 7.0, 5.5]),
///     ("1/3".to_owned(), vec![25.0, 27.0, 24.0, 26.0]),
///     ("1/4".to_owned(), vec![26.0, 24.5, 25.5, 27.0]),
/// ];
/// let comparisons = pairwise(&groups, 0.05);
/// assert_eq!(comparisons.len(), 3);
/// assert!(comparisons[0].reject);
/// assert!(!comparisons[2].reject);
/// ```
#[must_use]
#[expect(clippy::cast_precision_loss)]
pub fn pairwise(groups: &[(String, Vec<f64>)], alpha: f64) -> Vec<PairwiseComparison> {
    let raw = groups
        .iter()
        .enumerate()
        .flat_map(|(i, a)| groups[i + 1..].iter().map(move |b| (a, b)))
        .filter_map(|((name_a, a), (name_b, b))| {
            let test = WelchTTest::new(a, b).ok()?;
            Some((name_a, name_b, test))
        })
        .collect::<Vec<_>>();

    let m = raw.len() as f64;
    raw.into_iter()
        .map(|(group1, group2, test)| {
            let p_adjusted = (test.p_value * m).min(1.0);
            PairwiseComparison {
                group1: group1.clone(),
                group2: group2.clone(),
                mean_diff: test.mean_b - test.mean_a,
                p_value: test.p_value,
                p_adjusted,
                reject: p_adjusted < alpha,
            }
        })
        .collect()
}

/// Tallies significant comparisons per group, in group-name order.
///
/// ```
/// # use edwait_stats::posthoc::{pairwise, summarize};
/// let groups = [
///     ("a".to_owned(), vec![1.0, 2.0, 1.5, 1.2]),
///     ("b".to_owned(), vec![10.0, 11.0, 10.5, 9.8]),
/// ];
/// let summary = summarize(&pairwise(&groups, 0.05));
/// assert_eq!(summary[0].group, "a");
/// assert_eq!((summary[0].better, summary[0].worse), (1, 0));
/// assert_eq!((summary[1].better, summary[1].worse), (0, 1));
/// ```
#[must_use]
pub fn summarize(comparisons: &[PairwiseComparison]) -> Vec<PairwiseSummary> {
    let mut summaries = BTreeMap::<&str, PairwiseSummary>::new();
    for comparison in comparisons {
        for group in [&comparison.group1, &comparison.group2] {
            summaries
                .entry(group.as_str())
                .or_insert_with(|| PairwiseSummary {
                    group: group.clone(),
                    ..PairwiseSummary::default()
                });
        }
        if !comparison.reject {
            continue;
        }
        let (larger, smaller) = if comparison.mean_diff < 0.0 {
            (&comparison.group1, &comparison.group2)
        } else {
            (&comparison.group2, &comparison.group1)
        };
        if let Some(summary) = summaries.get_mut(larger.as_str()) {
            summary.significant += 1;
            summary.worse += 1;
        }
        if let Some(summary) = summaries.get_mut(smaller.as_str()) {
            summary.significant += 1;
            summary.better += 1;
        }
    }
    summaries.into_values().collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bonferroni_adjustment_counts_comparisons() {
        let groups = [
            ("a".to_owned(), vec![1.0, 2.0, 3.0]),
            ("b".to_owned(), vec![1.5, 2.5, 3.5]),
            ("c".to_owned(), vec![2.0, 3.0, 4.0]),
        ];
        let comparisons = pairwise(&groups, 0.05);
        assert_eq!(comparisons.len(), 3);
        for c in &comparisons {
            assert!((c.p_adjusted - (c.p_value * 3.0).min(1.0)).abs() < 1e-12);
            assert!(!c.reject);
        }
    }

    #[test]
    fn test_undersized_groups_are_skipped() {
        let groups = [
            ("a".to_owned(), vec![1.0]),
            ("b".to_owned(), vec![1.5, 2.5, 3.5]),
            ("c".to_owned(), vec![2.0, 3.0, 4.0]),
        ];
        let comparisons = pairwise(&groups, 0.05);
        assert_eq!(comparisons.len(), 1);
        assert_eq!(comparisons[0].group1, "b");
    }

    #[test]
    fn test_summary_lists_groups_without_significant_results() {
        let groups = [
            ("x".to_owned(), vec![1.0, 2.0, 3.0]),
            ("y".to_owned(), vec![1.0, 2.0, 3.5]),
        ];
        let summary = summarize(&pairwise(&groups, 0.05));
        assert_eq!(summary.len(), 2);
        assert!(summary.iter().all(|s| s.significant == 0));
    }
}
