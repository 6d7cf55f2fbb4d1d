use specflow_core::error::CliError;
use specflow_core::workflow::{Stage, StageResult};
use specflow_plugins::factory;

use super::cli::{RunArgs, StageArgs};
use super::{cancellable, parse_stage, parse_stages, CommandContext};

pub async fn run_cmd(ctx: &CommandContext, args: RunArgs) -> Result<i32, CliError> {
    let stages = if args.all {
        Stage::all().to_vec()
    } else if let Some(raw) = args.stages.as_deref() {
        parse_stages(raw)?
    } else {
        Stage::core_pipeline().to_vec()
    };
    let description = args.args.join(" ");
    let spec = &args.spec.spec;

    let agent = factory::build_agent(&ctx.cfg);
    let orchestrator = factory::build_orchestrator(&ctx.cfg, agent, &ctx.state_dir);

    let report = cancellable(
        &ctx.cancel,
        orchestrator.run_stages(spec, &stages, &description),
    )
    .await?;

    for result in &report.results {
        print_stage_result(result);
    }
    println!(
        "✅ {} stages completed for {} ({} agent runs)",
        report.results.len(),
        report.spec_name,
        report.total_attempts()
    );
    Ok(0)
}

pub async fn stage_cmd(ctx: &CommandContext, args: StageArgs) -> Result<i32, CliError> {
    let stage = parse_stage(&args.stage)?;
    let agent = factory::build_agent(&ctx.cfg);
    let orchestrator = factory::build_orchestrator(&ctx.cfg, agent, &ctx.state_dir);

    let result = cancellable(
        &ctx.cancel,
        orchestrator.run_stage(&args.spec.spec, stage, &args.args.join(" ")),
    )
    .await?;

    print_stage_result(&result);
    Ok(0)
}

pub(crate) fn print_stage_result(result: &StageResult) {
    if result.retry_count > 0 || result.attempts > 1 {
        println!(
            "✅ {} (attempts: {}, retries used: {})",
            result.stage, result.attempts, result.retry_count
        );
    } else {
        println!("✅ {}", result.stage);
    }
}
