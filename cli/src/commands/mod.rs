pub mod chunk;
pub mod cli;
pub mod handlers;
pub mod input;
pub mod run;
