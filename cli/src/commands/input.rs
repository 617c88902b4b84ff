use std::io::{Read, Write};
use std::path::Path;

use anyhow::Context;
use serde_json::Value;

use super::cli::InputArgs;
use dongol_core::config::AppConfig;
use dongol_core::error::CliError;

/// Resolve the input to a JSON value: text stays a string, `.json` files are
/// parsed.
pub fn read_input(input: &InputArgs) -> Result<Value, CliError> {
    if let Some(text) = &input.text {
        return Ok(Value::String(text.clone()));
    }

    if input.stdin {
        let mut buf = String::new();
        std::io::stdin().read_to_string(&mut buf)?;
        return Ok(Value::String(buf));
    }

    match &input.file {
        Some(path) => read_file(path),
        None => Err(CliError::Command(
            "no input: pass a file, --text or --stdin".to_string(),
        )),
    }
}

fn read_file(path: &Path) -> Result<Value, CliError> {
    let raw = std::fs::read_to_string(path)?;

    let is_json = path
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("json"));

    if is_json {
        let value = serde_json::from_str(&raw)
            .with_context(|| format!("failed to parse {} as JSON", path.display()))?;
        Ok(value)
    } else {
        Ok(Value::String(raw))
    }
}

/// Fold chunking flags into the loaded config.
pub fn apply_chunking_flags(input: &InputArgs, cfg: &mut AppConfig) -> Result<(), CliError> {
    if let Some(ratio) = input.overlap {
        cfg.chunking.overlap_ratio = ratio;
    }
    cfg.chunking
        .validate()
        .map_err(|e| CliError::Config(e.to_string()))
}

/// Result sink: the `--output` file, or stdout.
pub fn open_output(path: Option<&Path>) -> Result<Box<dyn Write>, CliError> {
    match path {
        Some(path) => {
            let file = std::fs::File::create(path)
                .with_context(|| format!("failed to create {}", path.display()))?;
            Ok(Box::new(std::io::BufWriter::new(file)))
        }
        None => Ok(Box::new(std::io::stdout().lock())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn input() -> InputArgs {
        InputArgs {
            file: None,
            text: None,
            stdin: false,
            chunk_size: None,
            overlap: None,
            output: None,
        }
    }

    #[test]
    fn test_overlap_flag_is_validated() {
        let mut cfg = AppConfig::default();
        let mut args = input();

        args.overlap = Some(0.3);
        apply_chunking_flags(&args, &mut cfg).unwrap();
        assert_eq!(cfg.chunking.overlap_ratio, 0.3);

        args.overlap = Some(1.0);
        let err = apply_chunking_flags(&args, &mut cfg).unwrap_err();
        assert!(matches!(err, CliError::Config(_)));
    }

    #[test]
    fn test_json_file_is_structured_and_output_file_written() {
        let dir = tempfile::tempdir().unwrap();
        let src = dir.path().join("data.json");
        std::fs::write(&src, r#"{"a": [1, 2]}"#).unwrap();

        let mut args = input();
        args.file = Some(src);
        assert_eq!(read_input(&args).unwrap(), serde_json::json!({"a": [1, 2]}));

        let dst: PathBuf = dir.path().join("out.txt");
        {
            let mut out = open_output(Some(&dst)).unwrap();
            writeln!(out, "done").unwrap();
        }
        assert_eq!(std::fs::read_to_string(&dst).unwrap(), "done\n");
    }
}
