use serde::Serialize;

/// Kaplan–Meier estimate of a waiting-time distribution.
///
/// Observations are `(minutes, is_censored)`. A censored observation is one
/// where the event was not observed: the patient left after `minutes`
/// without being seen, so only "waited at least this long" is known.
///
/// The curve stores parallel vectors, one entry per distinct event time.
#[derive(Debug, Clone, Default, Serialize)]
pub struct KaplanMeierCurve {
    /// Times (in whole minutes) at which at least one event occurred.
    pub times: Vec<u32>,
    /// Probability of still waiting just after each time.
    pub survival_prob: Vec<f64>,
    /// Number of subjects still waiting just before each time.
    pub at_risk: Vec<usize>,
    /// Number of events at each time.
    pub events: Vec<usize>,
}

impl KaplanMeierCurve {
    /// Computes the curve from `(minutes, is_censored)` observations.
    ///
    /// ```
    /// # use edwait_stats::survival::KaplanMeierCurve;
    /// let data = vec![(10, false), (20, true), (30, false)];
    /// let curve = KaplanMeierCurve::from_data(data);
    /// assert_eq!(curve.times, vec![10, 30]);
    /// assert_eq!(curve.at_risk, vec![3, 1]);
    /// ```
    #[expect(clippy::cast_precision_loss)]
    #[must_use]
    pub fn from_data(mut data: Vec<(u32, bool)>) -> Self {
        data.sort_by_key(|(time, _)| *time);

        let mut curve = Self::default();
        let mut survival = 1.0;
        let total = data.len();

        for (offset, same_time) in data
            .chunk_by(|a, b| a.0 == b.0)
            .scan(0, |seen, chunk| {
                let offset = *seen;
                *seen += chunk.len();
                Some((offset, chunk))
            })
        {
            let events = same_time.iter().filter(|(_, censored)| !censored).count();
            if events == 0 {
                continue;
            }
            let at_risk = total - offset;
            survival *= 1.0 - events as f64 / at_risk as f64;

            curve.times.push(same_time[0].0);
            curve.survival_prob.push(survival);
            curve.at_risk.push(at_risk);
            curve.events.push(events);
        }
        curve
    }

    /// Median waiting time, linearly interpolated between event times.
    ///
    /// Returns `None` if the survival probability never drops to 50%.
    ///
    /// ```
    /// # use edwait_stats::survival::KaplanMeierCurve;
    /// let curve = KaplanMeierCurve::from_data(vec![(10, false), (20, false), (30, false), (40, false)]);
    /// assert_eq!(curve.median(), Some(20.0));
    /// ```
    #[must_use]
    pub fn median(&self) -> Option<f64> {
        let i = self.survival_prob.iter().position(|&s| s <= 0.5)?;
        if i == 0 {
            return Some(f64::from(self.times[0]));
        }
        let (t0, t1) = (f64::from(self.times[i - 1]), f64::from(self.times[i]));
        let (s0, s1) = (self.survival_prob[i - 1], self.survival_prob[i]);
        Some(t0 + (0.5 - s0) / (s1 - s0) * (t1 - t0))
    }

    /// Probability of still waiting after `minutes` (step function).
    #[must_use]
    pub fn survival_at(&self, minutes: u32) -> f64 {
        self.times
            .iter()
            .rposition(|&t| t <= minutes)
            .map_or(1.0, |i| self.survival_prob[i])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_curve() {
        let curve = KaplanMeierCurve::from_data(vec![]);
        assert!(curve.times.is_empty());
        assert_eq!(curve.median(), None);
        assert_eq!(curve.survival_at(100), 1.0);
    }

    #[test]
    fn test_censoring_keeps_survival_higher_than_naive() {
        // Two patients left unseen after 60 minutes
        let data = vec![(10, false), (20, false), (60, true), (60, true), (90, false)];
        let curve = KaplanMeierCurve::from_data(data);
        assert_eq!(curve.times, vec![10, 20, 90]);
        assert!((curve.survival_at(30) - 0.6).abs() < 1e-12);
        assert_eq!(curve.survival_at(90), 0.0);
        assert_eq!(curve.at_risk, vec![5, 4, 1]);
    }

    #[test]
    fn test_ties_at_same_minute() {
        let curve = KaplanMeierCurve::from_data(vec![(5, false), (5, false), (5, true), (8, false)]);
        assert_eq!(curve.events, vec![2, 1]);
        assert!((curve.survival_prob[0] - 0.5).abs() < 1e-12);
        assert_eq!(curve.median(), Some(5.0));
    }
}
