use std::sync::Arc;

use specflow_core::error::{CliError, ExecutorError};
use specflow_core::executor::{
    render_report, render_wave_plan, ExecutionOpts, ResumePlan, ResumePrompter, ResumeStrategy,
};
use specflow_core::tasks::{load_tasks, TASKS_FILE};
use specflow_core::workflow::Stage;
use specflow_plugins::factory;

use super::cli::ImplementArgs;
use super::prompt::StdinPrompter;
use super::run::print_stage_result;
use super::{cancellable, CommandContext};

pub async fn implement_cmd(ctx: &CommandContext, args: ImplementArgs) -> Result<i32, CliError> {
    let spec = args.spec.spec.as_str();

    if !args.parallel && !args.dry_run {
        let agent = factory::build_agent(&ctx.cfg);
        let orchestrator = factory::build_orchestrator(&ctx.cfg, agent, &ctx.state_dir);
        let result = cancellable(&ctx.cancel, orchestrator.run_stage(spec, Stage::Implement, "")).await?;
        print_stage_result(&result);
        return Ok(0);
    }

    let mut opts = ExecutionOpts::from_config(&ctx.cfg.parallel);
    if let Some(n) = args.max_parallel {
        if n == 0 {
            return Err(CliError::Usage("--max-parallel must be at least 1".to_string()));
        }
        opts = opts.with_max_parallel(n);
    }
    if args.no_progress || args.dry_run {
        opts.progress_bar = false;
    }

    let tasks_path = ctx.cfg.workflow.spec_dir(spec).join(TASKS_FILE);
    let tasks = load_tasks(&tasks_path)?;

    let agent = factory::build_agent(&ctx.cfg);
    let runner = factory::build_task_runner(agent);
    let executor = factory::build_parallel_executor(opts, runner, &ctx.state_dir);

    let plan = executor.plan(&tasks)?;
    if args.dry_run {
        print!("{}", render_wave_plan(&plan));
        return Ok(0);
    }

    let prompter: Arc<dyn ResumePrompter> = match args.resume.as_deref() {
        Some(raw) => Arc::new(raw.parse::<ResumeStrategy>().map_err(CliError::Usage)?),
        None => Arc::new(StdinPrompter),
    };
    let controller = factory::build_resume_controller(&ctx.state_dir);

    let result = match controller.resolve(spec, &plan.waves, prompter.as_ref())? {
        ResumePlan::Abort => {
            println!("Aborted; saved progress for {spec} left untouched.");
            return Ok(0);
        }
        ResumePlan::Fresh => {
            executor
                .execute(&ctx.cancel, spec, &tasks_path, &tasks)
                .await
        }
        ResumePlan::Resume(state) => {
            tracing::info!(spec, wave = state.current_wave, "resuming saved progress");
            executor.resume(&ctx.cancel, &tasks_path, &tasks, state).await
        }
    };

    let report = match result {
        Ok(report) => report,
        Err(ExecutorError::Cancelled) => {
            eprintln!("Interrupted; run `specflow implement --spec {spec} --parallel` to resume.");
            return Err(ExecutorError::Cancelled.into());
        }
        Err(e) => return Err(e.into()),
    };

    print!("{}", render_report(&report));
    Ok(if report.failed == 0 && report.skipped == 0 { 0 } else { 1 })
}
