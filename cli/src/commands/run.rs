use std::io::Write;

use serde::Serialize;
use serde_json::Value;

use dongol_core::config::{AppConfig, OutputFormat};
use dongol_core::engine::Engine;
use dongol_core::error::CliError;
use dongol_core::executor::types::ChunkResult;
use dongol_core::state::{Task, TaskOptions, TaskStatus};
use dongol_plugins::factory::build_renderer_from_config;

use super::cli::RunArgs;
use super::handlers::register_builtin;
use super::input::{apply_chunking_flags, open_output, read_input};

#[derive(Debug, Serialize)]
struct RunSummary<'a> {
    task_id: &'a str,
    status: TaskStatus,
    duration_ms: Option<i64>,
    results: Vec<ResultLine<'a>>,
}

#[derive(Debug, Serialize)]
struct ResultLine<'a> {
    chunk_id: &'a str,
    #[serde(flatten)]
    result: &'a ChunkResult,
}

/// Results in chunk order; chunks skipped by cancellation are left out.
fn summarize(task: &Task) -> RunSummary<'_> {
    let results = task
        .chunks
        .iter()
        .filter_map(|c| {
            task.results.get(&c.id).map(|result| ResultLine {
                chunk_id: &c.id,
                result,
            })
        })
        .collect();

    RunSummary {
        task_id: &task.id,
        status: task.status,
        duration_ms: task.duration_ms(),
        results,
    }
}

/// Exit code for a finished task: 0 when every chunk succeeded, 1 when some
/// failed, 130 when the run was cancelled.
fn exit_code(task: &Task) -> i32 {
    match task.status {
        TaskStatus::Cancelled => 130,
        _ if task.failed_chunks().next().is_some() => 1,
        _ => 0,
    }
}

pub async fn run_cmd(args: RunArgs, mut cfg: AppConfig) -> Result<i32, CliError> {
    apply_chunking_flags(&args.input, &mut cfg)?;
    let content = read_input(&args.input)?;

    if let Some(format) = args.format {
        cfg.output.format = format.into();
    }
    let format = cfg.output.format;
    let pretty = cfg.output.pretty_print;
    let renderer = build_renderer_from_config(&cfg);

    let engine = Engine::builder(cfg).renderer(renderer).build()?;
    register_builtin(&engine).await;
    engine.start().await;

    let options = TaskOptions {
        priority: args.priority,
        parallel: !args.sequential,
        max_workers: args.workers,
        chunk_size: args.input.chunk_size,
        pool: args.pool.map(Into::into),
        ..TaskOptions::default()
    };
    let task = engine.create_task("cli", content, options).await?;

    let interrupt = {
        let engine = engine.clone();
        let task_id = task.id.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                tracing::warn!(task_id = %task_id, "interrupted; cancelling task");
                if let Err(e) = engine.cancel_task(&task_id).await {
                    tracing::warn!(task_id = %task_id, "cancel request failed: {}", e);
                }
            }
        })
    };

    let res = engine.execute_task(&task.id, &args.handler).await;
    interrupt.abort();
    let done = res?;

    let mut out = open_output(args.input.output.as_deref())?;
    print_summary(&mut out, &done, format, pretty)?;

    if args.stats {
        let stats = engine.get_stats().await;
        writeln!(out, "{}", to_string(&stats, pretty)?)?;
    }
    out.flush()?;

    engine.stop().await;
    Ok(exit_code(&done))
}

fn print_summary(
    out: &mut dyn Write,
    task: &Task,
    format: OutputFormat,
    pretty: bool,
) -> Result<(), CliError> {
    let summary = summarize(task);

    match format {
        OutputFormat::Jsonl => writeln!(out, "{}", to_string(&summary, pretty)?)?,
        OutputFormat::Text => {
            writeln!(out)?;
            for line in &summary.results {
                match line.result {
                    ChunkResult::Completed { value } => {
                        writeln!(out, "{}  ok  {}", line.chunk_id, compact(value))?;
                    }
                    ChunkResult::Failed { kind, message } => {
                        writeln!(out, "{}  FAILED {}: {}", line.chunk_id, kind, message)?;
                    }
                }
            }
            writeln!(
                out,
                "task {} {} in {}ms",
                summary.task_id,
                summary.status,
                summary.duration_ms.unwrap_or_default()
            )?;
        }
    }

    Ok(())
}

fn compact(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn to_string<T: Serialize>(value: &T, pretty: bool) -> Result<String, CliError> {
    let out = if pretty {
        serde_json::to_string_pretty(value)
    } else {
        serde_json::to_string(value)
    };
    out.map_err(|e| CliError::Command(e.to_string()))
}
