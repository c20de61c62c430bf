//! Treated-later vs not-treated-later population comparison.
//!
//! Lateness of the two populations is tested for normality first. If both
//! look normal the means are compared with Welch's t-test, otherwise the
//! distributions are compared with the Mann–Whitney U test, whose mean ranks
//! and medians are reported alongside.

use edwait_stats::{
    descriptive::DescriptiveStats,
    location::{LocationTestError, MannWhitneyU, WelchTTest},
    normality::JarqueBera,
};
use serde::Serialize;

use crate::sample::{RankedSample, lateness_by_flag};

#[derive(Debug, Clone, Copy, Serialize)]
#[serde(tag = "test", rename_all = "kebab-case")]
pub enum LocationTest {
    Welch(WelchTTest),
    MannWhitney(MannWhitneyU),
}

impl LocationTest {
    #[must_use]
    pub fn p_value(&self) -> f64 {
        match self {
            Self::Welch(test) => test.p_value,
            Self::MannWhitney(test) => test.p_value,
        }
    }

    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Self::Welch(_) => "Welch t-test",
            Self::MannWhitney(_) => "Mann-Whitney U",
        }
    }
}

/// Comparison of lateness between the two populations.
///
/// Sample `a` of the location test is the treated-later population.
#[derive(Debug, Clone, Serialize)]
pub struct PopulationComparison {
    pub treated_later: DescriptiveStats,
    pub not_treated_later: DescriptiveStats,
    pub normality_treated_later: Option<JarqueBera>,
    pub normality_not_treated_later: Option<JarqueBera>,
    pub test: LocationTest,
    pub significant: bool,
}

impl PopulationComparison {
    pub fn compare(
        treated_later: &[f64],
        not_treated_later: &[f64],
        alpha: f64,
    ) -> Result<Self, LocationTestError> {
        let normality_treated_later = JarqueBera::new(treated_later);
        let normality_not_treated_later = JarqueBera::new(not_treated_later);
        let both_normal = [normality_treated_later, normality_not_treated_later]
            .iter()
            .all(|test| test.is_some_and(|t| t.is_normal(alpha)));

        let test = if both_normal {
            LocationTest::Welch(WelchTTest::new(treated_later, not_treated_later)?)
        } else {
            LocationTest::MannWhitney(MannWhitneyU::new(treated_later, not_treated_later)?)
        };
        let too_few = |sample, len| LocationTestError::TooFewSamples { sample, len, min: 1 };
        Ok(Self {
            treated_later: DescriptiveStats::new(treated_later.iter().copied())
                .ok_or(too_few('a', treated_later.len()))?,
            not_treated_later: DescriptiveStats::new(not_treated_later.iter().copied())
                .ok_or(too_few('b', not_treated_later.len()))?,
            normality_treated_later,
            normality_not_treated_later,
            significant: test.p_value() < alpha,
            test,
        })
    }

    pub fn from_samples<'a, I>(samples: I, alpha: f64) -> Result<Self, LocationTestError>
    where
        I: IntoIterator<Item = &'a RankedSample>,
    {
        let (later, not_later) = lateness_by_flag(samples);
        Self::compare(&later, &not_later, alpha)
    }
}

/// Mann–Whitney comparison of the two populations within one triage priority.
#[derive(Debug, Clone, Serialize)]
pub struct PriorityComparison {
    pub priority: i64,
    pub treated_later_count: usize,
    pub not_treated_later_count: usize,
    /// `None` when either population is empty.
    pub test: Option<MannWhitneyU>,
    pub significant: bool,
}

impl PriorityComparison {
    #[must_use]
    pub fn compare(samples: &[RankedSample], priority: i64, alpha: f64) -> Self {
        let (later, not_later) =
            lateness_by_flag(samples.iter().filter(|s| s.priority == priority));
        let test = MannWhitneyU::new(&later, &not_later).ok();
        Self {
            priority,
            treated_later_count: later.len(),
            not_treated_later_count: not_later.len(),
            significant: test.is_some_and(|t| t.p_value < alpha),
            test,
        }
    }
}
