//! Report table display

use edwait_analysis::{
    arrival::{ArrivalEffect, HourTriageCount, OccupancyEffect},
    lateness::{CellComparisons, OutlierWindow},
    population::{LocationTest, PopulationComparison, PriorityComparison},
    prevalence::PriorityPrevalence,
    report::{SampleCounts, TestMethods},
    waiting::PriorityWaitSurvival,
};
use edwait_stats::{anova::AnovaTable, descriptive::DescriptiveStats, regression::OlsFit};

fn separator(width: usize) {
    println!("  {}", "-".repeat(width));
}

fn opt(value: Option<f64>, precision: usize) -> String {
    value.map_or("N/A".to_string(), |v| format!("{v:.precision$}"))
}

fn p_value(p: f64) -> String {
    if p < 1e-4 {
        format!("{p:.2e}")
    } else {
        format!("{p:.4}")
    }
}

fn yes_no(significant: bool) -> &'static str {
    if significant { "yes" } else { "no" }
}

pub(super) fn print_counts(counts: &SampleCounts) {
    println!("Visits:");
    println!("  {:<24} {:>8}", "annotated rows", counts.visits);
    println!("  {:<24} {:>8}", "excluded", counts.excluded);
    println!("  {:<24} {:>8}", "ranked (seen)", counts.ranked);
    println!("  {:<24} {:>8}", "treated later", counts.treated_later);
}

fn print_stats_header(label_col: &str) {
    println!(
        "  {:<20} {:>8} {:>10} {:>10} {:>10} {:>10} {:>10}",
        label_col, "Count", "Mean", "Median", "StdDev", "Min", "Max"
    );
    separator(84);
}

fn print_stats_row(label: &str, stats: &DescriptiveStats) {
    println!(
        "  {:<20} {:>8} {:>10.1} {:>10.1} {:>10.1} {:>10.1} {:>10.1}",
        label, stats.count, stats.mean, stats.median, stats.std_dev, stats.min, stats.max
    );
}

pub(super) fn print_methods(methods: &TestMethods) {
    println!("Methods:");
    println!("  {:<24} {}", "normality", methods.normality);
    println!("  {:<24} {}", "cell comparisons", methods.pairwise);
    println!("  note: {}", methods.note);
}

pub(super) fn print_population(population: &PopulationComparison, methods: &TestMethods) {
    println!("Lateness (minutes past the deadline) by treated-later flag:");
    print_stats_header("Population");
    print_stats_row("treated later", &population.treated_later);
    print_stats_row("not treated later", &population.not_treated_later);
    println!();

    println!(
        "  Normality ({}, in place of Shapiro-Wilk):",
        methods.normality
    );
    for (label, test) in [
        ("treated later", population.normality_treated_later),
        ("not treated later", population.normality_not_treated_later),
    ] {
        match test {
            Some(test) => println!(
                "    {:<20} JB={:>10.3} p={:>10}",
                label,
                test.statistic,
                p_value(test.p_value)
            ),
            None => println!("    {label:<20} too few samples"),
        }
    }

    match &population.test {
        LocationTest::Welch(test) => println!(
            "  {}: t={:.3} df={:.1} p={} significant={}",
            population.test.name(),
            test.t_statistic,
            test.df,
            p_value(test.p_value),
            yes_no(population.significant),
        ),
        LocationTest::MannWhitney(test) => {
            println!(
                "  {}: U={:.1} z={:.3} p={} significant={}",
                population.test.name(),
                test.u_statistic,
                test.z_score,
                p_value(test.p_value),
                yes_no(population.significant),
            );
            println!(
                "    {:<20} {:>12} {:>10}",
                "Population", "Mean rank", "Median"
            );
            println!(
                "    {:<20} {:>12.1} {:>10.1}",
                "treated later", test.mean_rank_a, test.median_a
            );
            println!(
                "    {:<20} {:>12.1} {:>10.1}",
                "not treated later", test.mean_rank_b, test.median_b
            );
        }
    }
}

pub(super) fn print_outlier_window(window: &OutlierWindow, outlier_std: f64) {
    println!(
        "Outlier window (mean ± {outlier_std} SD): [{:.1}, {:.1}], kept {}, removed {}",
        window.lower, window.upper, window.kept, window.removed
    );
}

pub(super) fn print_coefficients(fit: &OlsFit) {
    println!(
        "  R²={}  adj. R²={}  n={}",
        opt(fit.r_squared, 4),
        opt(fit.adj_r_squared, 4),
        fit.n_obs
    );
    println!(
        "  {:<28} {:>12} {:>10} {:>10} {:>10}",
        "Term", "Estimate", "StdErr", "t", "p"
    );
    separator(74);
    for coef in &fit.coefficients {
        println!(
            "  {:<28} {:>12} {:>10} {:>10} {:>10}",
            coef.name,
            opt(coef.estimate, 3),
            opt(coef.std_error, 3),
            opt(coef.t_value, 3),
            coef.p_value.map_or("N/A".to_string(), p_value),
        );
    }
}

pub(super) fn print_anova(anova: &AnovaTable) {
    println!(
        "  {:<28} {:>6} {:>14} {:>14} {:>10} {:>10}",
        "Term", "df", "Sum Sq", "Mean Sq", "F", "p"
    );
    separator(87);
    for row in &anova.rows {
        println!(
            "  {:<28} {:>6} {:>14.2} {:>14.2} {:>10} {:>10}",
            row.term,
            row.df,
            row.sum_sq,
            row.mean_sq,
            opt(row.f_value, 3),
            row.p_value.map_or(String::new(), p_value),
        );
    }
}

pub(super) fn print_cell_summary(cells: &CellComparisons, methods: &TestMethods) {
    println!(
        "Lateness comparisons between flag/priority cells ({}, in place of Tukey HSD):",
        methods.pairwise
    );
    println!(
        "  {:<12} {:>12} {:>8} {:>8}",
        "Cell", "Significant", "Better", "Worse"
    );
    separator(43);
    for row in &cells.summary {
        println!(
            "  {:<12} {:>12} {:>8} {:>8}",
            row.group, row.significant, row.better, row.worse
        );
    }
}

pub(super) fn print_per_priority(comparisons: &[PriorityComparison]) {
    println!("Lateness by flag within each priority (Mann-Whitney U):");
    println!(
        "  {:<10} {:>8} {:>8} {:>12} {:>12} {:>10} {:>6}",
        "Priority", "Later", "Others", "Median(L)", "Median(O)", "p", "Sig"
    );
    separator(72);
    for comparison in comparisons {
        match &comparison.test {
            Some(test) => println!(
                "  {:<10} {:>8} {:>8} {:>12.1} {:>12.1} {:>10} {:>6}",
                comparison.priority,
                comparison.treated_later_count,
                comparison.not_treated_later_count,
                test.median_a,
                test.median_b,
                p_value(test.p_value),
                yes_no(comparison.significant),
            ),
            None => println!(
                "  {:<10} {:>8} {:>8} {:>12} {:>12} {:>10} {:>6}",
                comparison.priority,
                comparison.treated_later_count,
                comparison.not_treated_later_count,
                "N/A",
                "N/A",
                "N/A",
                "-",
            ),
        }
    }
}

pub(super) fn print_prevalence(prevalence: &[PriorityPrevalence]) {
    println!("Treated-later prevalence and bumping priorities:");
    let num_priorities = prevalence
        .iter()
        .map(|p| p.bumped_by.len())
        .max()
        .unwrap_or(0);
    let by_columns = (1..=num_priorities)
        .map(|p| format!("{:>7}", format!("by P{p}")))
        .collect::<String>();
    println!(
        "  {:<10} {:>8} {:>8} {:>8} {:>10} {:>10}{}",
        "Priority", "Ranked", "Later", "Rate%", "By more", "By less", by_columns
    );
    separator(59 + 7 * num_priorities);
    for row in prevalence {
        let by_values = (0..num_priorities)
            .map(|i| format!("{:>7}", row.bumped_by.get(i).copied().unwrap_or(0)))
            .collect::<String>();
        println!(
            "  {:<10} {:>8} {:>8} {:>7.1}% {:>10} {:>10}{}",
            row.priority,
            row.ranked,
            row.treated_later,
            row.rate * 100.0,
            row.bumped_by_more_urgent,
            row.bumped_by_less_urgent,
            by_values
        );
    }
}

pub(super) fn print_arrival_effect(effect: &ArrivalEffect) {
    println!("Wait to clinician by arrival {}:", effect.factor);
    print_stats_header("Level");
    for level in &effect.levels {
        print_stats_row(&level.level.to_string(), &level.wait);
    }
    match effect.anova.as_ref().and_then(|t| t.term("group")) {
        Some(row) => println!(
            "  one-way ANOVA: F={} p={}",
            opt(row.f_value, 3),
            row.p_value.map_or("N/A".to_string(), p_value)
        ),
        None => println!("  one-way ANOVA: N/A"),
    }
}

pub(super) fn print_occupancy(occupancy: &OccupancyEffect) {
    println!("Wait to clinician by occupancy at arrival:");
    println!("  {:<10} {:>8} {:>12}", "Occupancy", "Count", "Mean wait");
    separator(32);
    for level in &occupancy.levels {
        println!(
            "  {:<10} {:>8} {:>12.1}",
            level.occupancy, level.count, level.mean_wait
        );
    }
    println!("  Wait ~ occupancy_at_arrival:");
    print_coefficients(&occupancy.fit);
}

pub(super) fn print_triage_mix(counts: &[HourTriageCount]) {
    let mut priorities = counts.iter().map(|c| c.priority).collect::<Vec<_>>();
    priorities.sort_unstable();
    priorities.dedup();

    println!("Arrivals by hour and triage priority:");
    let header = priorities
        .iter()
        .map(|p| format!("{:>7}", format!("P{p}")))
        .collect::<String>();
    println!("  {:<6}{}", "Hour", header);
    separator(6 + 7 * priorities.len());
    for hour in 0..24 {
        let row = priorities
            .iter()
            .map(|&priority| {
                let count = counts
                    .iter()
                    .find(|c| c.hour == hour && c.priority == priority)
                    .map_or(0, |c| c.count);
                format!("{count:>7}")
            })
            .collect::<String>();
        println!("  {hour:<6}{row}");
    }
}

pub(super) fn print_wait_survival(survival: &[PriorityWaitSurvival]) {
    println!("Wait to clinician, Kaplan-Meier (unseen departures censored):");
    println!(
        "  {:<10} {:>8} {:>10} {:>12} {:>16} {:>10} {:>10}",
        "Priority", "Visits", "Censored", "Median(KM)", "Within allow.%", "P50(seen)", "P90(seen)"
    );
    separator(82);
    for row in survival {
        let percentile = |p| {
            row.seen_wait_percentiles
                .as_ref()
                .and_then(|percentiles| percentiles.get(p))
        };
        println!(
            "  {:<10} {:>8} {:>10} {:>12} {:>16} {:>10} {:>10}",
            row.priority,
            row.observations,
            row.censored,
            opt(row.median_wait, 1),
            opt(row.seen_within_allowance.map(|p| p * 100.0), 1),
            opt(percentile(50.0), 1),
            opt(percentile(90.0), 1),
        );
    }
}
