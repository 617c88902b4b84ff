mod load;
mod types;

pub use load::{
    apply_env_overrides, get_dongol_data_dir, load_default, load_from_path, ENV_LOG_LEVEL,
    ENV_MAX_WORKERS, ENV_POOL,
};
pub use types::{
    AppConfig, ChunkingConfig, ExecutorConfig, LoggingConfig, OutputConfig, OutputFormat,
};
