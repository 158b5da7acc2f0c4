use std::io;
use std::time::Duration;

use thiserror::Error;

/// 单次解析失败的原因，均为终态，不做重试
#[derive(Debug, Error)]
pub enum ResolveError {
    #[error("compiler not found: {compiler}")]
    ToolchainNotFound { compiler: String },

    #[error("invoking {compiler} failed: {reason}")]
    ToolchainInvocationFailed {
        compiler: String,
        #[source]
        reason: InvocationFailure,
    },

    #[error("{compiler} printed no recognizable -march= expansion")]
    UnrecognizedOutput { compiler: String },
}

impl ResolveError {
    /// 命令行使用的退出码
    pub fn exit_code(&self) -> u8 {
        match self {
            ResolveError::ToolchainNotFound { .. } => 1,
            ResolveError::ToolchainInvocationFailed { .. } => 2,
            ResolveError::UnrecognizedOutput { .. } => 3,
        }
    }

    pub fn is_timeout(&self) -> bool {
        matches!(
            self,
            ResolveError::ToolchainInvocationFailed {
                reason: InvocationFailure::TimedOut(_),
                ..
            }
        )
    }
}

/// 子进程启动后出现的问题
#[derive(Debug, Error)]
pub enum InvocationFailure {
    #[error("failed to start process: {0}")]
    Spawn(#[source] io::Error),

    #[error("exited with status {}: {stderr}", code.map_or_else(|| "?".to_string(), |c| c.to_string()))]
    Exit { code: Option<i32>, stderr: String },

    #[error("terminated by signal {0}")]
    Signal(i32),

    #[error("timed out after {0:?}")]
    TimedOut(Duration),

    #[error("cancelled by caller")]
    Cancelled,

    #[error("I/O error while waiting for process: {0}")]
    Io(#[source] io::Error),
}
