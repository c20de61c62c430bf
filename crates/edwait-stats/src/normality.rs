use serde::Serialize;

use crate::distribution;

/// Jarque–Bera normality test.
///
/// The statistic combines sample skewness `S` and kurtosis `K` as
/// `n / 6 · (S² + (K − 3)² / 4)` and is compared against a chi-squared
/// distribution with two degrees of freedom.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct JarqueBera {
    pub n: usize,
    pub skewness: f64,
    pub kurtosis: f64,
    pub statistic: f64,
    pub p_value: f64,
}

impl JarqueBera {
    /// Minimum sample size the test is computed for.
    pub const MIN_SAMPLES: usize = 3;

    /// Runs the test on `values`.
    ///
    /// Returns `None` when the sample is too small or has zero variance.
    ///
    /// ```
    /// # use edwait_stats::normality::JarqueBera;
    /// let symmetric = [-2.0, -1.0, -1.0, 0.0, 0.0, 0.0, 1.0, 1.0, 2.0];
    /// let test = JarqueBera::new(&symmetric).unwrap();
    /// assert!(test.skewness.abs() < 1e-12);
    /// assert!(test.is_normal(0.05));
    /// ```
    #[expect(clippy::cast_precision_loss)]
    #[must_use]
    pub fn new(values: &[f64]) -> Option<Self> {
        let n = values.len();
        if n < Self::MIN_SAMPLES {
            return None;
        }
        let nf = n as f64;
        let mean = values.iter().sum::<f64>() / nf;
        let (m2, m3, m4) = values.iter().fold((0.0, 0.0, 0.0), |(m2, m3, m4), v| {
            let d = v - mean;
            let d2 = d * d;
            (m2 + d2, m3 + d2 * d, m4 + d2 * d2)
        });
        let (m2, m3, m4) = (m2 / nf, m3 / nf, m4 / nf);
        if m2 <= f64::EPSILON * mean.abs().max(1.0) {
            return None;
        }

        let skewness = m3 / m2.powf(1.5);
        let kurtosis = m4 / (m2 * m2);
        let statistic = nf / 6.0 * (skewness.powi(2) + (kurtosis - 3.0).powi(2) / 4.0);
        Some(Self {
            n,
            skewness,
            kurtosis,
            statistic,
            p_value: distribution::chi_squared_2_sf(statistic),
        })
    }

    /// Whether normality is retained at significance level `alpha`.
    #[must_use]
    pub fn is_normal(&self, alpha: f64) -> bool {
        self.p_value >= alpha
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_too_few_samples() {
        assert!(JarqueBera::new(&[1.0, 2.0]).is_none());
    }

    #[test]
    fn test_constant_sample_is_rejected() {
        assert!(JarqueBera::new(&[4.0; 10]).is_none());
    }

    #[test]
    fn test_heavily_skewed_sample_is_not_normal() {
        let mut values = vec![1.0; 60];
        values.extend([50.0, 80.0, 120.0, 300.0]);
        let test = JarqueBera::new(&values).unwrap();
        assert!(test.skewness > 2.0);
        assert!(!test.is_normal(0.05));
    }
}
