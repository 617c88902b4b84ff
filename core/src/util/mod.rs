pub mod time;

mod batch_id;
mod preview;
pub use batch_id::{batch_id, chunk_id};
pub use preview::content_preview;
