use clap::Parser;
use snippet_eval::{exit_code, render, Args};
use snippet_exec::{EvalService, ExecutionRequest};
use std::process::ExitCode;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let args = Args::parse();

    let config = args.sandbox_config()?;
    let source = args.load_source()?;
    let request = ExecutionRequest::with_default_timeout(source, &config)?;

    let service = EvalService::new(config)?;
    let result = service.execute(request).await?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&result)?);
    } else {
        print!("{}", render(&result));
    }

    Ok(ExitCode::from(exit_code(&result)))
}
