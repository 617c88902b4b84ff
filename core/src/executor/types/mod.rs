pub mod chunk;
pub mod config;
pub mod error;
pub mod result;

pub use chunk::*;
pub use config::*;
pub use error::*;
pub use result::*;
