use std::path::PathBuf;

use anyhow::Context;
use edwait_core::{
    config::{AnalysisConfig, OccupancyPolicy, OpenDeparturePolicy},
    pipeline::{self, TransformOutput},
    table,
};

use crate::util::{self, Output, TableFormat};

#[derive(Debug, Clone, clap::Args)]
pub(crate) struct TransformArg {
    /// Path to the visit log (CSV, or JSON with a `.json` extension)
    visits: PathBuf,
    /// Pipeline configuration JSON file
    #[arg(long)]
    config: Option<PathBuf>,
    /// Output file for the presentation timeline (not written if omitted)
    #[arg(long)]
    timeline_output: Option<PathBuf>,
    /// Output file for the annotated visit table (stdout if omitted)
    #[arg(long)]
    visits_output: Option<PathBuf>,
    /// Output file for the run summary JSON
    #[arg(long)]
    summary_output: Option<PathBuf>,
    /// Table output format
    #[arg(long, value_enum, default_value_t)]
    format: TableFormat,
    /// Count each visit in its own occupancy at arrival
    #[arg(long)]
    include_self: bool,
    /// Keep visits without a recorded departure out of later snapshots
    #[arg(long)]
    exclude_open_departures: bool,
}

impl TransformArg {
    fn load_config(&self) -> anyhow::Result<AnalysisConfig> {
        let mut config = match &self.config {
            Some(path) => util::read_json_file("configuration", path)?,
            None => AnalysisConfig::default(),
        };
        if self.include_self {
            config.occupancy = OccupancyPolicy::IncludeSelf;
        }
        if self.exclude_open_departures {
            config.open_departure = OpenDeparturePolicy::Excluded;
        }
        Ok(config)
    }
}

pub(crate) fn run(arg: &TransformArg) -> anyhow::Result<()> {
    let config = arg.load_config()?;
    let records = util::read_visit_log(&arg.visits)?;

    let TransformOutput {
        timeline,
        visits,
        summary,
    } = pipeline::transform(records, &config)
        .with_context(|| format!("Failed to transform {}", arg.visits.display()))?;

    if let Some(path) = &arg.timeline_output {
        let mut output = Output::open(path.clone())?;
        output.write_table(arg.format, &timeline, |w| {
            table::write_timeline_csv(&timeline, w)
        })?;
        tracing::info!(rows = timeline.len(), path = %output.display_path(), "wrote timeline");
    }

    let num_priorities = config.allowance_minutes.num_priorities();
    let mut output = Output::from_output_path(arg.visits_output.clone())?;
    output.write_table(arg.format, &visits, |w| {
        table::write_annotated_csv(&visits, num_priorities, w)
    })?;
    tracing::info!(rows = visits.len(), path = %output.display_path(), "wrote annotated visits");

    if let Some(path) = &arg.summary_output {
        Output::save_json(&summary, Some(path.clone()))?;
    }

    Ok(())
}
