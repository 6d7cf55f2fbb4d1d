use std::path::PathBuf;

use clap::{Args as ClapArgs, Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(name = "specflow", version, about = "Drive a coding agent through spec-driven stages")]
pub struct Args {
    #[command(subcommand)]
    pub command: Commands,

    /// Config file to load instead of the default locations.
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Override `workflow.max_retries` for this invocation.
    #[arg(long, global = true)]
    pub max_retries: Option<u32>,
}

#[derive(ClapArgs, Debug, Clone)]
pub struct SpecArg {
    /// Spec name (directory under the specs dir).
    #[arg(long)]
    pub spec: String,
}

#[derive(ClapArgs, Debug, Clone)]
pub struct RunArgs {
    #[command(flatten)]
    pub spec: SpecArg,

    /// Comma-separated stages, e.g. `specify,plan,tasks`.
    #[arg(long, conflicts_with = "all")]
    pub stages: Option<String>,

    /// Run every stage including constitution, clarify, checklist and analyze.
    #[arg(long, default_value_t = false)]
    pub all: bool,

    /// Feature description handed to the specify stage.
    #[arg(trailing_var_arg = true)]
    pub args: Vec<String>,
}

#[derive(ClapArgs, Debug, Clone)]
pub struct StageArgs {
    /// Stage name, e.g. `plan`.
    pub stage: String,

    #[command(flatten)]
    pub spec: SpecArg,

    /// Extra arguments appended to the stage command.
    #[arg(trailing_var_arg = true)]
    pub args: Vec<String>,
}

#[derive(ClapArgs, Debug, Clone)]
pub struct ImplementArgs {
    #[command(flatten)]
    pub spec: SpecArg,

    /// Run tasks from tasks.yaml in dependency waves.
    #[arg(long, default_value_t = false)]
    pub parallel: bool,

    /// Tasks in flight per wave (defaults to `parallel.max_parallel`).
    #[arg(long)]
    pub max_parallel: Option<usize>,

    /// Print the wave plan without running anything.
    #[arg(long, default_value_t = false)]
    pub dry_run: bool,

    /// How to continue an interrupted run: retry, skip-wave, reset or abort.
    #[arg(long)]
    pub resume: Option<String>,

    /// Hide progress bars.
    #[arg(long, default_value_t = false)]
    pub no_progress: bool,
}

#[derive(ClapArgs, Debug, Clone)]
pub struct ResetArgs {
    #[command(flatten)]
    pub spec: SpecArg,

    /// Only clear the retry counter of this stage.
    #[arg(long)]
    pub stage: Option<String>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run several stages in canonical order.
    Run(RunArgs),
    /// Run a single stage.
    Stage(StageArgs),
    /// Implement tasks, optionally in parallel waves.
    Implement(ImplementArgs),
    /// Show retry counters and parallel progress.
    Status(SpecArg),
    /// Clear retry counters and saved parallel progress.
    Reset(ResetArgs),
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;
    use pretty_assertions::assert_eq;

    #[test]
    fn command_definition_is_consistent() {
        Args::command().debug_assert();
    }

    #[test]
    fn parses_run_with_description() {
        let args = Args::parse_from([
            "specflow",
            "run",
            "--spec",
            "auth",
            "--stages",
            "specify,plan",
            "add",
            "login",
        ]);
        match args.command {
            Commands::Run(run) => {
                assert_eq!(run.spec.spec, "auth");
                assert_eq!(run.stages.as_deref(), Some("specify,plan"));
                assert_eq!(run.args, vec!["add", "login"]);
            }
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn parses_implement_flags() {
        let args = Args::parse_from([
            "specflow",
            "--max-retries",
            "2",
            "implement",
            "--spec",
            "auth",
            "--parallel",
            "--max-parallel",
            "3",
            "--resume",
            "skip-wave",
        ]);
        assert_eq!(args.max_retries, Some(2));
        match args.command {
            Commands::Implement(imp) => {
                assert!(imp.parallel);
                assert_eq!(imp.max_parallel, Some(3));
                assert_eq!(imp.resume.as_deref(), Some("skip-wave"));
                assert!(!imp.dry_run);
            }
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn stages_and_all_conflict() {
        let res = Args::try_parse_from([
            "specflow", "run", "--spec", "a", "--stages", "plan", "--all",
        ]);
        assert!(res.is_err());
    }
}
