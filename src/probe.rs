use std::io::{self, Read};
use std::path::Path;
use std::process::{Child, Command, ExitStatus, Stdio};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError};
use std::thread;
use std::time::{Duration, Instant};

use log::{debug, warn};

use crate::error::InvocationFailure;

const POLL_INTERVAL: Duration = Duration::from_millis(10);

// 驱动恰好在截止时刻退出时，给读线程留的最短收尾时间
const DRAIN_GRACE: Duration = Duration::from_millis(100);

/// 一次探测结束后捕获的输出
#[derive(Debug)]
pub struct ProbeOutput {
    pub status: ExitStatus,
    pub stdout: Vec<u8>,
    pub stderr: Vec<u8>,
}

impl ProbeOutput {
    /// 先 stdout 后 stderr，按 UTF-8 宽松解码
    pub fn combined(&self) -> String {
        let mut text = String::from_utf8_lossy(&self.stdout).into_owned();
        if !text.is_empty() && !text.ends_with('\n') {
            text.push('\n');
        }
        text.push_str(&String::from_utf8_lossy(&self.stderr));
        text
    }
}

/// 持有子进程直到被回收；任何提前返回或 panic 都会杀掉整个进程组
struct ChildGuard {
    child: Child,
    reaped: bool,
}

impl ChildGuard {
    fn new(child: Child) -> Self {
        ChildGuard { child, reaped: false }
    }

    fn id(&self) -> u32 {
        self.child.id()
    }

    fn try_wait(&mut self) -> io::Result<Option<ExitStatus>> {
        let status = self.child.try_wait()?;
        if status.is_some() {
            self.reaped = true;
        }
        Ok(status)
    }

    /// 杀掉子进程（Unix 上连同进程组），再回收
    fn terminate(&mut self) {
        if self.reaped {
            return;
        }
        debug!("terminating probe process {}", self.id());
        kill_process_group(self.id());
        if let Err(err) = self.child.kill() {
            // InvalidInput 表示已经退出，下面的 wait 仍会回收
            if err.kind() != io::ErrorKind::InvalidInput {
                warn!("failed to kill probe process {}: {}", self.id(), err);
            }
        }
        match self.child.wait() {
            Ok(_) => self.reaped = true,
            Err(err) => warn!("failed to reap probe process {}: {}", self.id(), err),
        }
    }
}

impl Drop for ChildGuard {
    fn drop(&mut self) {
        self.terminate();
    }
}

#[cfg(unix)]
fn kill_process_group(pid: u32) {
    let Ok(pid) = libc::pid_t::try_from(pid) else {
        return;
    };
    // 子进程是自己进程组的组长，-pid 能覆盖它启动的 cc1 等；组已空时返回 ESRCH
    unsafe {
        libc::kill(-pid, libc::SIGKILL);
    }
}

#[cfg(not(unix))]
fn kill_process_group(_pid: u32) {}

#[cfg(unix)]
fn isolate_process_group(command: &mut Command) {
    use std::os::unix::process::CommandExt;
    command.process_group(0);
}

#[cfg(not(unix))]
fn isolate_process_group(_command: &mut Command) {}

type Drained = Receiver<io::Result<Vec<u8>>>;

/// 在后台线程读完管道，结果通过 channel 交回
fn drain<R: Read + Send + 'static>(mut pipe: R) -> Drained {
    let (tx, rx) = mpsc::channel();
    thread::spawn(move || {
        let mut buf = Vec::new();
        let result = pipe.read_to_end(&mut buf).map(|_| buf);
        let _ = tx.send(result);
    });
    rx
}

/// 在截止时间前取回管道内容；有进程脱离进程组仍占着管道时按超时处理
fn collect(
    rx: Option<Drained>,
    deadline: Instant,
    timeout: Duration,
) -> Result<Vec<u8>, InvocationFailure> {
    let Some(rx) = rx else {
        return Ok(Vec::new());
    };
    let remaining = deadline
        .saturating_duration_since(Instant::now())
        .max(DRAIN_GRACE);
    match rx.recv_timeout(remaining) {
        Ok(result) => result.map_err(InvocationFailure::Io),
        Err(RecvTimeoutError::Timeout) => {
            warn!("output pipes still open after {:?}", timeout);
            Err(InvocationFailure::TimedOut(timeout))
        }
        Err(RecvTimeoutError::Disconnected) => Err(InvocationFailure::Io(io::Error::other(
            "output reader panicked",
        ))),
    }
}

/// 运行 `program args...`，总共最多等待 `timeout`（含读完输出）
///
/// `cancel` 被置位时中止等待并结束子进程。退出状态原样返回，由调用方判断。
pub fn run_probe(
    program: &Path,
    args: &[String],
    timeout: Duration,
    cancel: Option<&Arc<AtomicBool>>,
) -> Result<ProbeOutput, InvocationFailure> {
    let mut command = Command::new(program);
    command
        .args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped());
    isolate_process_group(&mut command);

    debug!("spawning {} {}", program.display(), args.join(" "));
    let mut child = command.spawn().map_err(InvocationFailure::Spawn)?;
    let stdout = child.stdout.take().map(drain);
    let stderr = child.stderr.take().map(drain);
    let mut guard = ChildGuard::new(child);

    let deadline = Instant::now() + timeout;
    let status = loop {
        if let Some(status) = guard.try_wait().map_err(InvocationFailure::Io)? {
            break status;
        }
        if cancel.is_some_and(|flag| flag.load(Ordering::SeqCst)) {
            guard.terminate();
            return Err(InvocationFailure::Cancelled);
        }
        if Instant::now() >= deadline {
            warn!(
                "{} did not exit within {:?}, killing it",
                program.display(),
                timeout
            );
            guard.terminate();
            return Err(InvocationFailure::TimedOut(timeout));
        }
        thread::sleep(POLL_INTERVAL);
    };
    debug!("probe process {} exited: {}", guard.id(), status);

    // 驱动已退出，清掉留在进程组里的后台进程，否则它们会一直占着管道
    kill_process_group(guard.id());

    Ok(ProbeOutput {
        status,
        stdout: collect(stdout, deadline, timeout)?,
        stderr: collect(stderr, deadline, timeout)?,
    })
}
