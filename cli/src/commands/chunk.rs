use std::io::Write;

use dongol_core::chunking::ChunkingEngine;
use dongol_core::config::AppConfig;
use dongol_core::error::CliError;
use dongol_core::executor::graph::{analyze_dependencies, plan_levels};
use dongol_core::executor::types::Chunk;
use dongol_core::util::content_preview;

use super::cli::ChunkArgs;
use super::input::{apply_chunking_flags, open_output, read_input};

const PREVIEW_CHARS: usize = 48;

pub fn chunk_cmd(args: ChunkArgs, mut cfg: AppConfig) -> Result<i32, CliError> {
    apply_chunking_flags(&args.input, &mut cfg)?;
    let content = read_input(&args.input)?;

    let engine = ChunkingEngine::new(cfg.chunking.clone());
    let mut chunks = engine.chunk_content(&content, args.input.chunk_size);
    let analysis = analyze_dependencies(&mut chunks);

    let mut out = open_output(args.input.output.as_deref())?;

    if args.json {
        let list: Vec<_> = chunks.iter().map(Chunk::to_json).collect();
        let rendered = if cfg.output.pretty_print {
            serde_json::to_string_pretty(&list)
        } else {
            serde_json::to_string(&list)
        }
        .map_err(|e| CliError::Command(e.to_string()))?;
        writeln!(out, "{rendered}")?;
        out.flush()?;
        return Ok(0);
    }

    for chunk in &chunks {
        let deps: Vec<&str> = chunk.dependencies.iter().map(String::as_str).collect();
        let tags: Vec<&str> = chunk.tags.iter().map(String::as_str).collect();
        writeln!(
            out,
            "{}  deps=[{}]  tags=[{}]  {}",
            chunk.id,
            deps.join(","),
            tags.join(","),
            content_preview(&chunk.content, PREVIEW_CHARS).unwrap_or_default()
        )?;
    }

    writeln!(out)?;
    for (n, level) in plan_levels(&chunks).iter().enumerate() {
        let ids: Vec<&str> = level.chunks.iter().map(|&i| chunks[i].id.as_str()).collect();
        writeln!(out, "level {}: {}", n + 1, ids.join(", "))?;
    }

    for repair in &analysis.repairs {
        writeln!(
            out,
            "repaired: {} no longer depends on {} ({:?})",
            repair.chunk_id, repair.removed, repair.reason
        )?;
    }

    out.flush()?;
    Ok(0)
}
