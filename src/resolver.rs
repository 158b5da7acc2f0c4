use std::sync::Arc;
use std::sync::atomic::AtomicBool;
use std::time::Duration;

use log::{debug, info};

use crate::config::{DEFAULT_TIMEOUT, ToolchainConfig};
use crate::error::{InvocationFailure, ResolveError};
use crate::models::{ResolveRequest, ResolvedFlags};
use crate::parser::parse_probe_output;
use crate::probe::run_probe;

/// 放在透传参数之前
const NATIVE_FLAGS: [&str; 2] = ["-march=native", "-mtune=native"];

/// 对空输入做预处理并打印子命令，驱动会输出 cc1 的完整命令行
const DUMP_FLAGS: [&str; 3] = ["-E", "-v", "-"];

/// 通过本机编译器展开 `-march=native`；每次调用只启动一个进程，互不共享状态
#[derive(Debug, Clone)]
pub struct NativeFlagResolver {
    config: ToolchainConfig,
    timeout: Duration,
    cancel: Option<Arc<AtomicBool>>,
}

impl NativeFlagResolver {
    pub fn new(config: ToolchainConfig) -> Self {
        NativeFlagResolver {
            config,
            timeout: DEFAULT_TIMEOUT,
            cancel: None,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// 其他线程置位后，正在进行的探测会被中止
    pub fn with_cancel_flag(mut self, cancel: Arc<AtomicBool>) -> Self {
        self.cancel = Some(cancel);
        self
    }

    pub fn config(&self) -> &ToolchainConfig {
        &self.config
    }

    /// 传给编译器的完整参数
    pub fn probe_args(request: &ResolveRequest) -> Vec<String> {
        NATIVE_FLAGS
            .iter()
            .map(|f| f.to_string())
            .chain(request.extra_args().iter().cloned())
            .chain(DUMP_FLAGS.iter().map(|f| f.to_string()))
            .collect()
    }

    pub fn resolve(&self, request: &ResolveRequest) -> Result<ResolvedFlags, ResolveError> {
        let compiler = request.compiler().to_string();
        let program = self
            .config
            .locate(&compiler)
            .ok_or_else(|| ResolveError::ToolchainNotFound {
                compiler: compiler.clone(),
            })?;
        info!("resolving native flags with {}", program.display());

        let args = Self::probe_args(request);
        let output = match run_probe(&program, &args, self.timeout, self.cancel.as_ref()) {
            Ok(output) => output,
            Err(InvocationFailure::Spawn(err)) if err.kind() == std::io::ErrorKind::NotFound => {
                // 查找与启动之间被删除，或脚本解释器不存在
                return Err(ResolveError::ToolchainNotFound { compiler });
            }
            Err(reason) => {
                return Err(ResolveError::ToolchainInvocationFailed { compiler, reason });
            }
        };

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
            return Err(ResolveError::ToolchainInvocationFailed {
                compiler,
                reason: exit_failure(output.status, stderr),
            });
        }

        let text = output.combined();
        debug!("captured {} bytes of toolchain output", text.len());
        let mut flags =
            parse_probe_output(&text).map_err(|_| ResolveError::UnrecognizedOutput { compiler })?;
        // 透传参数会原样出现在 cc1 行上，不属于展开结果
        flags
            .other_flags
            .retain(|f| !request.extra_args().contains(f));
        Ok(flags)
    }
}

#[cfg(unix)]
fn exit_failure(status: std::process::ExitStatus, stderr: String) -> InvocationFailure {
    use std::os::unix::process::ExitStatusExt;

    match status.signal() {
        Some(signal) => InvocationFailure::Signal(signal),
        None => InvocationFailure::Exit {
            code: status.code(),
            stderr,
        },
    }
}

#[cfg(not(unix))]
fn exit_failure(status: std::process::ExitStatus, stderr: String) -> InvocationFailure {
    InvocationFailure::Exit {
        code: status.code(),
        stderr,
    }
}

/// 使用进程环境与默认超时解析
pub fn resolve(request: &ResolveRequest) -> Result<ResolvedFlags, ResolveError> {
    NativeFlagResolver::new(ToolchainConfig::from_env()).resolve(request)
}
