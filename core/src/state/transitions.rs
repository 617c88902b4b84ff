//! 任务状态转换规则和验证

use thiserror::Error;

use super::task::TaskStatus;

/// 状态转换错误
#[derive(Debug, Error)]
pub enum TransitionError {
    #[error("Invalid transition from {from} to {to}")]
    InvalidTransition { from: TaskStatus, to: TaskStatus },
    #[error("Cannot transition from terminal state {state}")]
    FromTerminalState { state: TaskStatus },
}

/// 状态转换
pub struct StateTransition;

impl StateTransition {
    /// 验证状态转换是否合法
    pub fn validate(from: TaskStatus, to: TaskStatus) -> Result<(), TransitionError> {
        // 终态不能转换
        if Self::is_terminal(from) {
            return Err(TransitionError::FromTerminalState { state: from });
        }

        let is_valid = matches!(
            (from, to),
            (TaskStatus::Pending, TaskStatus::Running)
                | (TaskStatus::Running, TaskStatus::Completed)
                | (TaskStatus::Running, TaskStatus::Failed)
                | (TaskStatus::Running, TaskStatus::Paused)
                | (TaskStatus::Paused, TaskStatus::Running)
                | (TaskStatus::Pending | TaskStatus::Running | TaskStatus::Paused, TaskStatus::Cancelled)
        );

        if is_valid {
            Ok(())
        } else {
            Err(TransitionError::InvalidTransition { from, to })
        }
    }

    /// 判断是否为终态
    pub fn is_terminal(status: TaskStatus) -> bool {
        matches!(
            status,
            TaskStatus::Completed | TaskStatus::Failed | TaskStatus::Cancelled
        )
    }
}
