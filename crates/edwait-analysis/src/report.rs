use edwait_core::aggregate::AnnotatedVisit;
use edwait_stats::{anova::AnovaTable, regression::OlsFit};
use serde::{Deserialize, Serialize};

use crate::{
    arrival::{ArrivalEffect, ArrivalFactor, HourTriageCount, OccupancyEffect},
    lateness::{self, CellComparisons, OutlierWindow},
    population::{PopulationComparison, PriorityComparison},
    prevalence::PriorityPrevalence,
    sample::{RankedSample, WaitObservation},
    waiting::PriorityWaitSurvival,
};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ReportConfig {
    /// Significance level for every test in the report.
    pub alpha: f64,
    /// Half-width of the lateness outlier window, in standard deviations.
    pub outlier_std: f64,
    /// Priorities that get their own population comparison.
    pub priorities: Vec<i64>,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            alpha: 0.05,
            outlier_std: 3.0,
            priorities: vec![3, 4, 5],
        }
    }
}

#[derive(Debug, Clone, PartialEq, derive_more::Display, derive_more::Error)]
pub enum ReportError {
    #[display("significance level must be in (0, 1), got {alpha}")]
    InvalidAlpha { alpha: f64 },
    #[display("outlier window must be a positive number of standard deviations, got {outlier_std}")]
    InvalidOutlierWindow { outlier_std: f64 },
    #[display("no visit in the table was both seen and ranked")]
    NoRankedVisits,
}

#[derive(Debug, Clone, Copy, Serialize)]
pub struct SampleCounts {
    pub visits: usize,
    pub excluded: usize,
    pub ranked: usize,
    pub treated_later: usize,
}

/// Names of the tests behind the report's p-values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TestMethods {
    /// Normality check deciding between Welch's t-test and Mann–Whitney U.
    pub normality: &'static str,
    /// Pairwise comparison of flag/priority cells.
    pub pairwise: &'static str,
    /// Note for readers comparing against Shapiro–Wilk / Tukey HSD results.
    pub note: &'static str,
}

impl TestMethods {
    pub const CURRENT: Self = Self {
        normality: "Jarque-Bera",
        pairwise: "pairwise Welch t-test, Bonferroni-adjusted",
        note: "normality is tested with Jarque-Bera instead of Shapiro-Wilk (weaker on small \
               samples) and cells are compared with Bonferroni-adjusted Welch tests instead of \
               Tukey HSD; p-values are not directly comparable to those tests",
    };
}

/// Statistical report over an annotated visit table.
///
/// Sections whose inputs are too small for the underlying test are `None` or
/// empty rather than failing the whole report.
#[derive(Debug, Clone, Serialize)]
pub struct AnalysisReport {
    pub methods: TestMethods,
    pub counts: SampleCounts,
    pub population: Option<PopulationComparison>,
    pub outlier_window: Option<OutlierWindow>,
    pub lateness_regression: Option<OlsFit>,
    pub factorial_anova: Option<AnovaTable>,
    pub cell_comparisons: Option<CellComparisons>,
    pub per_priority: Vec<PriorityComparison>,
    pub prevalence: Vec<PriorityPrevalence>,
    pub arrival_effects: Vec<ArrivalEffect>,
    pub occupancy: Option<OccupancyEffect>,
    pub triage_mix: Vec<HourTriageCount>,
    pub wait_survival: Vec<PriorityWaitSurvival>,
}

impl AnalysisReport {
    pub fn build(visits: &[AnnotatedVisit], config: &ReportConfig) -> Result<Self, ReportError> {
        if config.alpha.is_nan() || config.alpha <= 0.0 || config.alpha >= 1.0 {
            return Err(ReportError::InvalidAlpha {
                alpha: config.alpha,
            });
        }
        if config.outlier_std.is_nan() || config.outlier_std <= 0.0 {
            return Err(ReportError::InvalidOutlierWindow {
                outlier_std: config.outlier_std,
            });
        }

        let samples = RankedSample::from_visits(visits);
        if samples.is_empty() {
            return Err(ReportError::NoRankedVisits);
        }
        let counts = SampleCounts {
            visits: visits.len(),
            excluded: visits.iter().filter(|v| v.excluded.is_some()).count(),
            ranked: samples.len(),
            treated_later: samples.iter().filter(|s| s.treated_later).count(),
        };
        tracing::info!(
            visits = counts.visits,
            ranked = counts.ranked,
            treated_later = counts.treated_later,
            "building analysis report"
        );

        let alpha = config.alpha;
        let population = PopulationComparison::from_samples(&samples, alpha)
            .inspect_err(|err| tracing::warn!("skipping population comparison: {err}"))
            .ok();

        let windowed = OutlierWindow::apply(&samples, config.outlier_std);
        let (outlier_window, lateness_regression, factorial_anova, cell_comparisons) =
            match windowed {
                Some((window, kept)) => (
                    Some(window),
                    lateness::regress_on_flag(&kept)
                        .inspect_err(|err| tracing::warn!("skipping lateness regression: {err}"))
                        .ok(),
                    lateness::factorial_anova(&kept)
                        .inspect_err(|err| tracing::warn!("skipping factorial ANOVA: {err}"))
                        .ok(),
                    Some(CellComparisons::compare(&kept, alpha)),
                ),
                None => (None, None, None, None),
            };

        let per_priority = config
            .priorities
            .iter()
            .map(|&priority| PriorityComparison::compare(&samples, priority, alpha))
            .collect();

        let occupancy = OccupancyEffect::compute(&samples)
            .inspect_err(|err| tracing::warn!("skipping occupancy regression: {err}"))
            .ok();

        Ok(Self {
            methods: TestMethods::CURRENT,
            counts,
            population,
            outlier_window,
            lateness_regression,
            factorial_anova,
            cell_comparisons,
            per_priority,
            prevalence: PriorityPrevalence::by_priority(&samples),
            arrival_effects: ArrivalFactor::ALL
                .into_iter()
                .map(|factor| ArrivalEffect::compute(&samples, factor))
                .collect(),
            occupancy,
            triage_mix: HourTriageCount::tabulate(visits),
            wait_survival: PriorityWaitSurvival::by_priority(&WaitObservation::from_visits(visits)),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sample::tests::annotated;

    fn visits() -> Vec<AnnotatedVisit> {
        let mut visits = vec![];
        for (i, offset) in [0.0, 1.0, 2.0, 3.0, 1.5, 0.5, 2.5, 1.0].into_iter().enumerate() {
            let priority = [3, 4][i % 2];
            let allowance = [30, 60][i % 2];
            visits.push(annotated(priority, allowance, Some(20.0 + offset), false));
            visits.push(annotated(priority, allowance, Some(70.0 + offset), true));
        }
        visits.push(annotated(5, 120, None, false));
        visits
    }

    #[test]
    fn test_full_report() {
        let visits = visits();
        let report = AnalysisReport::build(&visits, &ReportConfig::default()).unwrap();
        assert_eq!(report.counts.visits, 17);
        assert_eq!(report.counts.ranked, 16);
        assert_eq!(report.counts.treated_later, 8);

        let population = report.population.as_ref().unwrap();
        assert!(population.significant);
        assert!(population.treated_later.mean > population.not_treated_later.mean);

        assert_eq!(report.outlier_window.as_ref().unwrap().removed, 0);
        assert!(report.lateness_regression.is_some());
        assert!(report.factorial_anova.is_some());
        assert_eq!(report.per_priority.len(), 3);
        assert!(report.per_priority[2].test.is_none());
        assert_eq!(report.prevalence.len(), 2);
        assert_eq!(report.arrival_effects.len(), 3);
        assert_eq!(report.triage_mix.iter().map(|c| c.count).sum::<usize>(), 17);
        assert_eq!(report.wait_survival.len(), 2);

        let json = serde_json::to_value(&report).unwrap();
        assert!(json["population"]["test"]["test"].is_string());
        assert_eq!(json["methods"]["normality"], "Jarque-Bera");
        assert!(json["methods"]["note"].as_str().unwrap().contains("Tukey HSD"));
    }

    #[test]
    fn test_invalid_config() {
        let visits = visits();
        let config = ReportConfig {
            alpha: 1.5,
            ..ReportConfig::default()
        };
        assert_eq!(
            AnalysisReport::build(&visits, &config).unwrap_err(),
            ReportError::InvalidAlpha { alpha: 1.5 }
        );
    }

    #[test]
    fn test_empty_table() {
        let err = AnalysisReport::build(&[], &ReportConfig::default()).unwrap_err();
        assert_eq!(err, ReportError::NoRankedVisits);
    }
}
