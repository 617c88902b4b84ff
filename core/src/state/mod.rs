//! # 任务状态
//!
//! 任务、任务状态机以及引擎事件的类型定义。任务注册表本身由
//! [`crate::engine::Engine`] 独占持有。

pub mod task;
pub mod transitions;

pub use task::{EngineEvent, Task, TaskOptions, TaskStatus};
pub use transitions::{StateTransition, TransitionError};
