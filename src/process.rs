//! Process interface (§6.3): an opaque launcher that spawns argv vectors and yields a handle
//! exposing `pid`, `wait`, and `terminate`. The scheduling core depends only on
//! [`ProcessLauncher`]/[`ProcessHandle`]; [`TokioProcessLauncher`] is the concrete
//! implementation backing the rest of the crate.

use async_trait::async_trait;
use std::io;
use std::process::Stdio;
use tokio::process::Command;

#[cfg(unix)]
use nix::sys::signal::{self, Signal};
#[cfg(unix)]
use nix::unistd::Pid;

/// A spawned child process. No I/O capture is specified (§6.3) — stdio is redirected to
/// null by the concrete launcher.
#[async_trait]
pub trait ProcessHandle: Send + Sync {
    /// OS process id, recorded in the `tasks.pid` column.
    fn pid(&self) -> u32;

    /// Awaits process exit. Low-level wait failures are swallowed by the implementation and
    /// reported as `None` rather than propagated (§7 `WaitFailure`); the caller still
    /// finalizes task state with an absent exit code.
    async fn wait(&mut self) -> Option<i32>;

    /// Sends the platform's terminate signal (`SIGTERM` on Unix) rather than killing the
    /// process outright, mirroring the original Python scheduler's
    /// `asyncio.subprocess.Process.terminate()`. A process that has already exited is a no-op.
    async fn terminate(&mut self);
}

/// Spawns child processes from argv vectors.
#[async_trait]
pub trait ProcessLauncher: Send + Sync {
    /// Attempts to spawn `argv[0]` with `argv[1..]` as arguments. `argv` is assumed non-empty;
    /// the caller (the Task Launcher, §4.4) is responsible for resolving the schedule's
    /// `process_name` into a non-empty argv before calling this.
    async fn spawn(&self, argv: &[String]) -> io::Result<Box<dyn ProcessHandle>>;
}

/// Default [`ProcessLauncher`], backed by [`tokio::process::Command`].
#[derive(Debug, Default)]
pub struct TokioProcessLauncher;

#[async_trait]
impl ProcessLauncher for TokioProcessLauncher {
    async fn spawn(&self, argv: &[String]) -> io::Result<Box<dyn ProcessHandle>> {
        let Some((program, args)) = argv.split_first() else {
            return Err(io::Error::new(io::ErrorKind::InvalidInput, "argv is empty"));
        };

        let mut child = Command::new(program)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()?;

        let pid = child.id().ok_or_else(|| {
            io::Error::new(io::ErrorKind::Other, "child exited before its pid could be read")
        })?;

        Ok(Box::new(TokioChildHandle { child, pid }))
    }
}

struct TokioChildHandle {
    child: tokio::process::Child,
    pid: u32,
}

#[async_trait]
impl ProcessHandle for TokioChildHandle {
    fn pid(&self) -> u32 {
        self.pid
    }

    async fn wait(&mut self) -> Option<i32> {
        self.child.wait().await.ok().and_then(|status| status.code())
    }

    async fn terminate(&mut self) {
        #[cfg(unix)]
        {
            let _ = signal::kill(Pid::from_raw(self.pid as i32), Signal::SIGTERM);
        }
        #[cfg(not(unix))]
        {
            let _ = self.child.start_kill();
        }
    }
}
