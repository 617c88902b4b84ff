//! dongol-cli library - exposes the command modules for unit tests

pub mod commands;
