//! # Flowchart CLI
//!
//! `flowchart validate | inspect | render <file>`

use std::process::ExitCode;

use anyhow::Context;
use clap::Parser;
use flowchart_cli::{
    inspect_document, load_document, render_document, validate_file, CliArgs, Command,
    RenderSettings,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,flowchart=debug"));

    let fmt_layer = tracing_subscriber::fmt::layer()
        .with_target(true)
        .with_writer(std::io::stderr);

    // Use JSON format for machine consumption (RUST_LOG_FORMAT=json)
    if std::env::var("RUST_LOG_FORMAT").as_deref() == Ok("json") {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt_layer.json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt_layer)
            .init();
    }
}

fn main() -> anyhow::Result<ExitCode> {
    init_tracing();
    let args = CliArgs::parse();

    match args.command {
        Command::Validate { file } => {
            let report = validate_file(&file)?;
            println!("{}", serde_json::to_string_pretty(&report)?);
            if report.valid {
                Ok(ExitCode::SUCCESS)
            } else {
                tracing::warn!(issues = report.errors.len(), "document is invalid");
                Ok(ExitCode::FAILURE)
            }
        }
        Command::Inspect { file } => {
            let doc = load_document(&file)?;
            let summary = inspect_document(&doc);
            println!("{}", serde_json::to_string_pretty(&summary)?);
            Ok(ExitCode::SUCCESS)
        }
        Command::Render(render) => {
            let doc = load_document(&render.file)?;
            let settings = RenderSettings::from(&render);
            tracing::debug!(?settings, "rendering");
            let (summary, ctx) = render_document(&doc, &settings)?;
            if let Some(path) = &render.draw_log {
                std::fs::write(path, ctx.to_json()?)
                    .with_context(|| format!("Failed to write {}", path.display()))?;
                tracing::info!(path = %path.display(), "draw log written");
            }
            println!("{}", serde_json::to_string_pretty(&summary)?);
            if summary.failures.is_empty() {
                Ok(ExitCode::SUCCESS)
            } else {
                Ok(ExitCode::FAILURE)
            }
        }
    }
}
