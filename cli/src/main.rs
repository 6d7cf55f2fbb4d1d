use clap::Parser;
mod commands;
use commands::{cli, CommandContext};
use specflow_core::config::{AppConfig, LoggingConfig, MAX_RETRIES_LIMIT};
use specflow_core::error::{CliError, ErrorCode};
use tokio_util::sync::CancellationToken;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

static LOG_GUARD: std::sync::OnceLock<tracing_appender::non_blocking::WorkerGuard> =
    std::sync::OnceLock::new();

#[tokio::main]
async fn main() {
    let exit = match real_main().await {
        Ok(code) => code,
        Err(e) => {
            eprintln!("❌ {e}");
            exit_code_for_error(&e)
        }
    };

    std::process::exit(exit);
}

async fn real_main() -> Result<i32, CliError> {
    let args = cli::Args::parse();
    let cfg = load_config(&args)?;
    init_tracing(&cfg.logging).map_err(CliError::Usage)?;

    let cancel = CancellationToken::new();
    {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                tracing::warn!("interrupt received, cancelling");
                cancel.cancel();
            }
        });
    }

    let ctx = CommandContext::new(cfg, cancel);
    dispatch(args.command, &ctx).await
}

fn load_config(args: &cli::Args) -> Result<AppConfig, CliError> {
    let mut cfg = specflow_core::config::load(args.config.as_deref())?;
    if let Some(n) = args.max_retries {
        if n > MAX_RETRIES_LIMIT {
            return Err(CliError::Usage(format!(
                "--max-retries must be at most {MAX_RETRIES_LIMIT}"
            )));
        }
        cfg.workflow.max_retries = n;
    }
    Ok(cfg)
}

async fn dispatch(cmd: cli::Commands, ctx: &CommandContext) -> Result<i32, CliError> {
    match cmd {
        cli::Commands::Run(args) => commands::run_cmd(ctx, args).await,
        cli::Commands::Stage(args) => commands::stage_cmd(ctx, args).await,
        cli::Commands::Implement(args) => commands::implement_cmd(ctx, args).await,
        cli::Commands::Status(args) => commands::status_cmd(ctx, args),
        cli::Commands::Reset(args) => commands::reset_cmd(ctx, args),
    }
}

fn exit_code_for_error(e: &CliError) -> i32 {
    // 0: success
    // 1: stage or task failure
    // 2: retries exhausted
    // 3: invalid arguments / config / task graph
    // 4: missing prerequisites
    // 5: agent timeout
    // 130: cancelled
    let code = match e {
        CliError::Stage(se) => se.error_code(),
        CliError::Executor(ee) => ee.error_code(),
        CliError::State(_) => ErrorCode::StateError,
        CliError::Config(_) => ErrorCode::ConfigError,
        CliError::Usage(_) => ErrorCode::ValidationError,
        CliError::Io(_) | CliError::Anyhow(_) => ErrorCode::GeneralError,
    };
    match code {
        ErrorCode::Success => 0,
        ErrorCode::RetryExhausted => 2,
        ErrorCode::ValidationError
        | ErrorCode::ConfigError
        | ErrorCode::TaskNotFound
        | ErrorCode::DependencyError
        | ErrorCode::CircularDependency
        | ErrorCode::SchedulerConfig => 3,
        ErrorCode::MissingPrerequisites => 4,
        ErrorCode::Timeout => 5,
        ErrorCode::Cancelled => 130,
        ErrorCode::GeneralError | ErrorCode::AgentError | ErrorCode::StateError => 1,
    }
}

fn init_tracing(logging: &LoggingConfig) -> Result<(), String> {
    if !logging.enabled {
        return Ok(());
    }

    let filter = match std::env::var("RUST_LOG") {
        Ok(v) if !v.trim().is_empty() => EnvFilter::from_default_env(),
        _ => EnvFilter::try_new(logging.level.clone()).map_err(|e| e.to_string())?,
    };

    let mut maybe_writer = None;

    if logging.file {
        let dir = match logging
            .directory
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
        {
            Some(d) => std::path::PathBuf::from(d),
            None => std::env::temp_dir().join("specflow"),
        };

        std::fs::create_dir_all(&dir).map_err(|e| format!("create log dir failed: {e}"))?;
        let file_name = format!("specflow.{}.log", std::process::id());
        let appender = tracing_appender::rolling::never(dir, file_name);
        let (non_blocking, guard) = tracing_appender::non_blocking(appender);
        let _ = LOG_GUARD.set(guard);
        maybe_writer = Some(non_blocking);
    }

    if !logging.console && maybe_writer.is_none() {
        return Ok(());
    }

    let console_layer = logging.console.then(|| {
        tracing_subscriber::fmt::layer()
            .with_writer(std::io::stderr)
            .with_ansi(atty::is(atty::Stream::Stderr))
    });

    let file_layer = maybe_writer.map(|w| {
        tracing_subscriber::fmt::layer()
            .with_writer(w)
            .with_ansi(false)
    });

    tracing_subscriber::registry()
        .with(filter)
        .with(console_layer)
        .with(file_layer)
        .init();

    Ok(())
}
