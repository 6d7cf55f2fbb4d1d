use specflow_core::error::CliError;
use specflow_core::executor::ParallelStateStore;
use specflow_core::retry::RetryStore;

use super::cli::ResetArgs;
use super::{parse_stage, CommandContext};

pub fn reset_cmd(ctx: &CommandContext, args: ResetArgs) -> Result<i32, CliError> {
    let spec = args.spec.spec.as_str();
    let retries = RetryStore::new(&ctx.state_dir);

    match args.stage.as_deref() {
        Some(raw) => {
            let stage = parse_stage(raw)?;
            let removed = retries.clear(spec, stage)?;
            tracing::info!(spec, %stage, removed, "retry counter cleared");
            println!(
                "{} retry counter for {spec}/{stage}",
                if removed { "Cleared" } else { "No" }
            );
        }
        None => {
            let removed = retries.clear_spec(spec)?;
            let parallel = ParallelStateStore::new(&ctx.state_dir).delete(spec)?;
            tracing::info!(spec, removed, parallel, "spec state cleared");
            println!("Cleared {removed} retry counter(s) for {spec}");
            if parallel {
                println!("Removed saved parallel progress for {spec}");
            }
        }
    }

    Ok(0)
}
