//! Statistical report over an annotated visit table
//!
//! Reads the JSON table written by `edwait transform --format json`, prints
//! each report section as a table and optionally saves the full report.

mod table;

use std::path::PathBuf;

use anyhow::Context;
use clap::Args;
use edwait_analysis::report::{AnalysisReport, ReportConfig};
use edwait_core::aggregate::AnnotatedVisit;

use crate::util::{self, Output};

#[derive(Debug, Clone, Args)]
pub(crate) struct AnalyzeArg {
    /// Path to the annotated visit table JSON file
    pub visits: PathBuf,

    /// Report configuration JSON file
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Significance level for every test
    #[arg(long)]
    pub alpha: Option<f64>,

    /// Half-width of the lateness outlier window, in standard deviations
    #[arg(long)]
    pub outlier_std: Option<f64>,

    /// Priorities that get their own population comparison (comma-separated)
    #[arg(long, value_delimiter = ',')]
    pub priorities: Option<Vec<i64>>,

    /// Save the full report as JSON to this path
    #[arg(long)]
    pub output: Option<PathBuf>,
}

impl AnalyzeArg {
    fn load_config(&self) -> anyhow::Result<ReportConfig> {
        let mut config: ReportConfig = match &self.config {
            Some(path) => util::read_json_file("report configuration", path)?,
            None => ReportConfig::default(),
        };
        if let Some(alpha) = self.alpha {
            config.alpha = alpha;
        }
        if let Some(outlier_std) = self.outlier_std {
            config.outlier_std = outlier_std;
        }
        if let Some(priorities) = &self.priorities {
            config.priorities.clone_from(priorities);
        }
        Ok(config)
    }
}

pub(crate) fn run(arg: &AnalyzeArg) -> anyhow::Result<()> {
    let config = arg.load_config()?;
    let visits: Vec<AnnotatedVisit> = util::read_json_file("annotated visits", &arg.visits)?;
    let report = AnalysisReport::build(&visits, &config)
        .with_context(|| format!("Failed to analyze {}", arg.visits.display()))?;

    println!("Out-of-Order Treatment Report (alpha={})", config.alpha);
    println!("==========================================\n");

    table::print_methods(&report.methods);
    println!();
    table::print_counts(&report.counts);
    println!();

    if let Some(population) = &report.population {
        table::print_population(population, &report.methods);
        println!();
    }

    if let Some(window) = &report.outlier_window {
        table::print_outlier_window(window, config.outlier_std);
        println!();
    }

    if let Some(fit) = &report.lateness_regression {
        println!("Lateness ~ C(treated_later):");
        table::print_coefficients(fit);
        println!();
    }

    if let Some(anova) = &report.factorial_anova {
        println!("Lateness ~ C(treated_later) * C(priority):");
        table::print_anova(anova);
        println!();
    }

    if let Some(cells) = &report.cell_comparisons {
        table::print_cell_summary(cells, &report.methods);
        println!();
    }

    table::print_per_priority(&report.per_priority);
    println!();

    table::print_prevalence(&report.prevalence);
    println!();

    for effect in &report.arrival_effects {
        table::print_arrival_effect(effect);
        println!();
    }

    if let Some(occupancy) = &report.occupancy {
        table::print_occupancy(occupancy);
        println!();
    }

    table::print_triage_mix(&report.triage_mix);
    println!();

    table::print_wait_survival(&report.wait_survival);

    if let Some(path) = &arg.output {
        Output::save_json(&report, Some(path.clone()))?;
        tracing::info!(path = %path.display(), "saved report");
    }

    Ok(())
}
