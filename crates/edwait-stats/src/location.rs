//! Two-sample location tests.
//!
//! Both tests compare a sample `a` against a sample `b` and report two-sided
//! p-values.

use serde::Serialize;

use crate::{descriptive::DescriptiveStats, distribution};

#[derive(Debug, Clone, Copy, PartialEq, Eq, derive_more::Display, derive_more::Error)]
pub enum LocationTestError {
    #[display("sample {sample} has {len} observations, at least {min} are required")]
    TooFewSamples {
        sample: char,
        len: usize,
        min: usize,
    },
    #[display("both samples have zero variance")]
    ZeroVariance,
}

/// Welch's unequal-variance t-test.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct WelchTTest {
    pub mean_a: f64,
    pub mean_b: f64,
    pub t_statistic: f64,
    /// Welch–Satterthwaite degrees of freedom.
    pub df: f64,
    pub p_value: f64,
}

impl WelchTTest {
    /// ```
    /// # use edwait_stats::location::WelchTTest;
    /// let a = [10.0, 12.0, 11.0, 13.0];
    /// let b = [10.0, 12.0, 11.0, 13.0];
    /// let test = WelchTTest::new(&a, &b).unwrap();
    /// assert_eq!(test.t_statistic, 0.0);
    /// assert!((test.p_value - 1.0).abs() < 1e-12);
    /// ```
    #[expect(clippy::cast_precision_loss)]
    pub fn new(a: &[f64], b: &[f64]) -> Result<Self, LocationTestError> {
        let sa = sample_stats('a', a, 2)?;
        let sb = sample_stats('b', b, 2)?;
        let va = sa.variance / sa.count as f64;
        let vb = sb.variance / sb.count as f64;
        let se2 = va + vb;
        if se2 <= 0.0 {
            return Err(LocationTestError::ZeroVariance);
        }
        let t_statistic = (sa.mean - sb.mean) / se2.sqrt();
        let df = se2.powi(2)
            / (va.powi(2) / (sa.count as f64 - 1.0) + vb.powi(2) / (sb.count as f64 - 1.0));
        Ok(Self {
            mean_a: sa.mean,
            mean_b: sb.mean,
            t_statistic,
            df,
            p_value: distribution::student_t_two_sided(t_statistic, df),
        })
    }
}

/// Mann–Whitney U (Wilcoxon rank-sum) test with tie correction and the
/// normal approximation with continuity correction.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct MannWhitneyU {
    /// U statistic of sample `a`.
    pub u_statistic: f64,
    pub z_score: f64,
    pub p_value: f64,
    /// Mean of the pooled average ranks of sample `a`.
    pub mean_rank_a: f64,
    /// Mean of the pooled average ranks of sample `b`.
    pub mean_rank_b: f64,
    pub median_a: f64,
    pub median_b: f64,
}

impl MannWhitneyU {
    #[expect(clippy::cast_precision_loss)]
    pub fn new(a: &[f64], b: &[f64]) -> Result<Self, LocationTestError> {
        let sa = sample_stats('a', a, 1)?;
        let sb = sample_stats('b', b, 1)?;
        let (n1, n2) = (a.len() as f64, b.len() as f64);
        let n = n1 + n2;

        let pooled = a.iter().chain(b).copied().collect::<Vec<_>>();
        let ranks = average_ranks(&pooled);
        let rank_sum_a = ranks[..a.len()].iter().sum::<f64>();
        let rank_sum_b = ranks[a.len()..].iter().sum::<f64>();
        let u_statistic = rank_sum_a - n1 * (n1 + 1.0) / 2.0;

        let tie_term = tie_counts(&pooled)
            .into_iter()
            .map(|t| {
                let t = t as f64;
                t * t * t - t
            })
            .sum::<f64>();
        let mu = n1 * n2 / 2.0;
        let sigma = (n1 * n2 / 12.0 * ((n + 1.0) - tie_term / (n * (n - 1.0)))).sqrt();
        let (z_score, p_value) = if sigma > 0.0 {
            let z = ((u_statistic - mu).abs() - 0.5).max(0.0) / sigma;
            let z = z.copysign(u_statistic - mu);
            (z, (2.0 * distribution::normal_sf(z.abs())).min(1.0))
        } else {
            (0.0, 1.0)
        };

        Ok(Self {
            u_statistic,
            z_score,
            p_value,
            mean_rank_a: rank_sum_a / n1,
            mean_rank_b: rank_sum_b / n2,
            median_a: sa.median,
            median_b: sb.median,
        })
    }
}

/// Ranks `values` from 1, assigning tied values the average of their ranks.
///
/// ```
/// # use edwait_stats::location::average_ranks;
/// assert_eq!(average_ranks(&[30.0, 10.0, 20.0, 10.0]), vec![4.0, 1.5, 3.0, 1.5]);
/// ```
#[expect(clippy::cast_precision_loss)]
#[must_use]
pub fn average_ranks(values: &[f64]) -> Vec<f64> {
    let mut order = (0..values.len()).collect::<Vec<_>>();
    order.sort_by(|&i, &j| values[i].total_cmp(&values[j]));

    let mut ranks = vec![0.0; values.len()];
    let mut start = 0;
    while start < order.len() {
        let mut end = start + 1;
        while end < order.len() && values[order[end]] == values[order[start]] {
            end += 1;
        }
        // positions start..end share ranks start+1..=end
        let rank = (start + end + 1) as f64 / 2.0;
        for &i in &order[start..end] {
            ranks[i] = rank;
        }
        start = end;
    }
    ranks
}

fn tie_counts(values: &[f64]) -> Vec<usize> {
    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);
    sorted
        .chunk_by(|a, b| a == b)
        .map(<[f64]>::len)
        .filter(|&len| len > 1)
        .collect()
}

fn sample_stats(
    sample: char,
    values: &[f64],
    min: usize,
) -> Result<DescriptiveStats, LocationTestError> {
    if values.len() < min {
        return Err(LocationTestError::TooFewSamples {
            sample,
            len: values.len(),
            min,
        });
    }
    DescriptiveStats::new(values.iter().copied()).ok_or(LocationTestError::TooFewSamples {
        sample,
        len: 0,
        min,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_welch_detects_shifted_means() {
        let a = [20.0, 22.0, 19.0, 24.0, 21.0, 23.0];
        let b = [30.0, 33.0, 29.0, 35.0, 31.0, 32.0];
        let test = WelchTTest::new(&a, &b).unwrap();
        assert!(test.t_statistic < 0.0);
        assert!(test.p_value < 0.001);
    }

    #[test]
    fn test_welch_equal_sizes_and_variances_df() {
        // Equal n and variance gives df = 2n - 2
        let a = [1.0, 2.0, 3.0];
        let b = [4.0, 5.0, 6.0];
        let test = WelchTTest::new(&a, &b).unwrap();
        assert!((test.df - 4.0).abs() < 1e-12);
        assert!((test.t_statistic + 3.674_234_614_174_767).abs() < 1e-9);
    }

    #[test]
    fn test_welch_rejects_single_observation() {
        assert_eq!(
            WelchTTest::new(&[1.0], &[2.0, 3.0]).unwrap_err(),
            LocationTestError::TooFewSamples {
                sample: 'a',
                len: 1,
                min: 2
            }
        );
    }

    #[test]
    fn test_welch_zero_variance() {
        assert_eq!(
            WelchTTest::new(&[5.0, 5.0], &[5.0, 5.0]).unwrap_err(),
            LocationTestError::ZeroVariance
        );
    }

    #[test]
    fn test_mann_whitney_separated_samples() {
        let a = [1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0];
        let b = [9.0, 10.0, 11.0, 12.0, 13.0, 14.0, 15.0, 16.0];
        let test = MannWhitneyU::new(&a, &b).unwrap();
        assert_eq!(test.u_statistic, 0.0);
        assert_eq!(test.mean_rank_a, 4.5);
        assert_eq!(test.mean_rank_b, 12.5);
        assert!(test.z_score < 0.0);
        assert!(test.p_value < 0.001);
    }

    #[test]
    fn test_mann_whitney_identical_samples() {
        let a = [3.0, 3.0, 4.0, 5.0];
        let test = MannWhitneyU::new(&a, &a).unwrap();
        assert_eq!(test.u_statistic, 8.0);
        assert!((test.p_value - 1.0).abs() < 1e-12);
        assert_eq!(test.median_a, test.median_b);
    }

    #[test]
    fn test_tie_counts() {
        assert_eq!(tie_counts(&[1.0, 2.0, 2.0, 3.0, 3.0, 3.0]), vec![2, 3]);
    }
}
