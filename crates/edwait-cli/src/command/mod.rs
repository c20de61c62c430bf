use clap::{Parser, Subcommand};

use self::{
    analyze::AnalyzeArg, generate_visits::GenerateVisitsArg, transform::TransformArg,
};

mod analyze;
mod generate_visits;
mod transform;

#[derive(Debug, Clone, Parser)]
#[command(author, version, about, long_about = None)]
pub struct CommandArgs {
    /// What mode to run the program in
    #[command(subcommand)]
    mode: Mode,
}

#[derive(Debug, Clone, Subcommand)]
enum Mode {
    /// Build the presentation timeline and the annotated visit table from a visit log
    Transform(#[clap(flatten)] TransformArg),
    /// Run the statistical report over an annotated visit table
    Analyze(#[clap(flatten)] AnalyzeArg),
    /// Generate a synthetic visit log
    GenerateVisits(#[clap(flatten)] GenerateVisitsArg),
}

pub fn run() -> anyhow::Result<()> {
    let args = CommandArgs::parse();
    match args.mode {
        Mode::Transform(arg) => transform::run(&arg)?,
        Mode::Analyze(arg) => analyze::run(&arg)?,
        Mode::GenerateVisits(arg) => generate_visits::run(&arg)?,
    }
    Ok(())
}
