use std::sync::Arc;

use dongol_core::config::{AppConfig, OutputFormat};
use dongol_core::executor::traits::OutputRendererPlugin;

use crate::executor::{JsonlRendererPlugin, TextRendererPlugin};

pub fn build_renderer(format: OutputFormat, pretty_print: bool) -> Arc<dyn OutputRendererPlugin> {
    tracing::debug!(?format, pretty_print, "building output renderer");
    match format {
        OutputFormat::Jsonl => Arc::new(JsonlRendererPlugin::new(pretty_print)),
        OutputFormat::Text => Arc::new(TextRendererPlugin::new(ascii_only())),
    }
}

pub fn build_renderer_from_config(cfg: &AppConfig) -> Arc<dyn OutputRendererPlugin> {
    build_renderer(cfg.output.format, cfg.output.pretty_print)
}

/// Plain ASCII status words unless the terminal advertises UTF-8.
fn ascii_only() -> bool {
    let lang = std::env::var("LC_ALL")
        .or_else(|_| std::env::var("LANG"))
        .unwrap_or_default()
        .to_ascii_lowercase();
    !(lang.contains("utf-8") || lang.contains("utf8"))
}
