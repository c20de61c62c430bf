use std::{collections::HashMap, path::PathBuf};

use anyhow::Context;
use chrono::{NaiveDate, NaiveDateTime, TimeDelta};
use edwait_core::{allowance::AllowanceTable, table, visit::VisitRecord};
use rand::{
    Rng, SeedableRng,
    distr::{Distribution, weighted::WeightedIndex},
};
use rand_distr::{Exp, LogNormal};
use rand_pcg::Pcg64Mcg;

use crate::util::{Output, TableFormat};

/// Relative arrival rate per hour of day, midnight first.
const HOURLY_PROFILE: [f64; 24] = [
    0.6, 0.5, 0.4, 0.35, 0.3, 0.3, 0.4, 0.6, 0.9, 1.2, 1.4, 1.5, 1.5, 1.45, 1.4, 1.35, 1.3, 1.3,
    1.3, 1.25, 1.15, 1.0, 0.85, 0.7,
];
/// Relative share of triage priorities 1 to 5.
const PRIORITY_WEIGHTS: [u32; 5] = [1, 10, 30, 40, 19];
/// Probability of leaving without being seen, per priority.
const UNSEEN_RATE: [f64; 5] = [0.0, 0.005, 0.02, 0.05, 0.08];
/// Median wait as a share of the priority's allowance.
const WAIT_MEDIAN_SHARE: [f64; 5] = [1.5, 1.2, 0.9, 0.8, 0.6];
const WAIT_SIGMA: f64 = 0.8;
const TREATMENT_MEDIAN_MINUTES: f64 = 150.0;
const TREATMENT_SIGMA: f64 = 0.7;
const MISSING_DEPARTURE_RATE: f64 = 0.01;
const MISSING_PRIORITY_RATE: f64 = 0.002;
/// Share of visits made by returning patients.
const REPEAT_VISIT_RATE: f64 = 0.2;

#[derive(Debug, Clone, clap::Args)]
pub(crate) struct GenerateVisitsArg {
    /// Number of visits to generate
    #[arg(long, default_value_t = 5000)]
    num_visits: usize,
    /// Mean arrivals per hour at the average hourly rate
    #[arg(long, default_value_t = 6.0)]
    arrivals_per_hour: f64,
    /// Random seed (picked at random if omitted)
    #[arg(long)]
    seed: Option<u64>,
    /// Date of the first arrival
    #[arg(long, default_value = "2009-01-01")]
    start_date: NaiveDate,
    /// Output file path
    #[arg(long)]
    output: Option<PathBuf>,
    /// Output format
    #[arg(long, value_enum, default_value_t)]
    format: TableFormat,
}

pub(crate) fn run(arg: &GenerateVisitsArg) -> anyhow::Result<()> {
    if arg.arrivals_per_hour.is_nan() || arg.arrivals_per_hour <= 0.0 {
        anyhow::bail!(
            "--arrivals-per-hour must be positive, got {}",
            arg.arrivals_per_hour
        );
    }
    let seed = arg.seed.unwrap_or_else(|| rand::rng().random());
    tracing::info!(seed, num_visits = arg.num_visits, "generating visit log");

    let mut rng = Pcg64Mcg::seed_from_u64(seed);
    let generator = VisitGenerator::new(arg.arrivals_per_hour, &AllowanceTable::default())?;
    let records = generator.generate(&mut rng, arg.num_visits, arg.start_date.into());

    let mut output = Output::from_output_path(arg.output.clone())?;
    output.write_table(arg.format, &records, |w| {
        table::write_visits_csv(&records, w)
    })?;
    tracing::info!(path = %output.display_path(), "wrote visit log");
    Ok(())
}

#[derive(Debug, Clone)]
struct VisitGenerator {
    /// Gaps of a homogeneous arrival process at the peak hourly rate.
    gap: Exp<f64>,
    peak_profile: f64,
    priorities: Vec<i64>,
    priority: WeightedIndex<u32>,
    waits: Vec<LogNormal<f64>>,
    treatment: LogNormal<f64>,
}

impl VisitGenerator {
    fn new(arrivals_per_hour: f64, allowance: &AllowanceTable) -> anyhow::Result<Self> {
        let peak_profile = HOURLY_PROFILE.iter().copied().fold(0.0, f64::max);
        let mean_profile = HOURLY_PROFILE.iter().sum::<f64>() / 24.0;
        let peak_rate = arrivals_per_hour / 60.0 * peak_profile / mean_profile;

        let waits = allowance
            .priorities()
            .zip(WAIT_MEDIAN_SHARE)
            .map(|(priority, share)| {
                let median = f64::from(allowance.allowance_minutes(priority)) * share;
                LogNormal::new(median.ln(), WAIT_SIGMA)
                    .with_context(|| format!("Invalid wait distribution for priority {priority}"))
            })
            .collect::<anyhow::Result<Vec<_>>>()?;
        Ok(Self {
            gap: Exp::new(peak_rate).context("Invalid arrival rate")?,
            peak_profile,
            priorities: allowance.priorities().map(|p| i64::from(p.get())).collect(),
            priority: WeightedIndex::new(PRIORITY_WEIGHTS)
                .context("Invalid triage priority weights")?,
            waits,
            treatment: LogNormal::new(TREATMENT_MEDIAN_MINUTES.ln(), TREATMENT_SIGMA)
                .context("Invalid treatment distribution")?,
        })
    }

    fn generate<R>(&self, rng: &mut R, num_visits: usize, start: NaiveDateTime) -> Vec<VisitRecord>
    where
        R: Rng + ?Sized,
    {
        let mut patients = 0_usize;
        let mut visit_counts = HashMap::<usize, u32>::new();
        let mut now = start;

        (0..num_visits)
            .map(|_| {
                now = self.next_arrival(rng, now);

                let patient = if patients > 0 && rng.random_bool(REPEAT_VISIT_RATE) {
                    rng.random_range(0..patients)
                } else {
                    patients += 1;
                    patients - 1
                };
                let visit_number = visit_counts.entry(patient).or_default();
                *visit_number += 1;

                let mut record = self.visit(rng, now);
                record.mrn = format!("{patient:08}");
                record.visit_number = *visit_number;
                record
            })
            .collect()
    }

    /// Draws the next arrival time, thinning the peak-rate process down to the
    /// hour-of-day profile.
    fn next_arrival<R>(&self, rng: &mut R, mut now: NaiveDateTime) -> NaiveDateTime
    where
        R: Rng + ?Sized,
    {
        loop {
            now += seconds(self.gap.sample(rng) * 60.0);
            let profile = HOURLY_PROFILE[hour_of(now)];
            if rng.random_bool((profile / self.peak_profile).clamp(0.0, 1.0)) {
                return now;
            }
        }
    }

    fn visit<R>(&self, rng: &mut R, arrival: NaiveDateTime) -> VisitRecord
    where
        R: Rng + ?Sized,
    {
        let index = self.priority.sample(rng);
        let priority = self.priorities[index];
        let wait = minutes(self.waits[index].sample(rng));
        let treatment = minutes(self.treatment.sample(rng));

        let (seen, departure) = if rng.random_bool(UNSEEN_RATE[index]) {
            (None, arrival + wait)
        } else {
            let seen = arrival + wait;
            (Some(seen), seen + treatment)
        };

        VisitRecord {
            mrn: String::new(),
            visit_number: 0,
            arrival: Some(arrival),
            triage_priority: (!rng.random_bool(MISSING_PRIORITY_RATE)).then_some(priority),
            seen,
            departure: (!rng.random_bool(MISSING_DEPARTURE_RATE)).then_some(departure),
        }
    }
}

fn hour_of(t: NaiveDateTime) -> usize {
    usize::try_from(chrono::Timelike::hour(&t)).unwrap_or(0)
}

/// Whole minutes, at least one.
#[expect(clippy::cast_possible_truncation)]
fn minutes(value: f64) -> TimeDelta {
    TimeDelta::minutes((value.round() as i64).max(1))
}

#[expect(clippy::cast_possible_truncation)]
fn seconds(value: f64) -> TimeDelta {
    TimeDelta::seconds(value.round() as i64)
}

#[cfg(test)]
mod tests {
    use edwait_core::{config::AnalysisConfig, pipeline};

    use super::*;

    fn generate(seed: u64, n: usize) -> Vec<VisitRecord> {
        let generator = VisitGenerator::new(6.0, &AllowanceTable::default()).unwrap();
        let mut rng = Pcg64Mcg::seed_from_u64(seed);
        let start = NaiveDate::from_ymd_opt(2009, 1, 1).unwrap().into();
        generator.generate(&mut rng, n, start)
    }

    #[test]
    fn test_same_seed_same_log() {
        assert_eq!(generate(3, 200), generate(3, 200));
    }

    #[test]
    fn test_generated_log_is_consistent() {
        let records = generate(7, 1000);
        assert_eq!(records.len(), 1000);
        assert!(records.windows(2).all(|w| w[0].arrival <= w[1].arrival));
        for record in &records {
            let arrival = record.arrival.unwrap();
            if let Some(seen) = record.seen {
                assert!(seen > arrival);
                if let Some(departure) = record.departure {
                    assert!(departure > seen);
                }
            }
        }

        let output = pipeline::transform(records, &AnalysisConfig::default()).unwrap();
        assert_eq!(output.visits.len(), 1000);
        assert!(output.summary.included_rows > 950);
        assert!(output.summary.flagged_visits > 0);
    }

    #[test]
    fn test_visit_numbers_count_per_patient() {
        let records = generate(11, 500);
        let mut last = HashMap::<&str, u32>::new();
        for record in &records {
            let previous = last.insert(&record.mrn, record.visit_number).unwrap_or(0);
            assert_eq!(record.visit_number, previous + 1);
        }
    }
}
