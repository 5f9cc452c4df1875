//! The capture session: one local viewer reading N FIFOs, one remote
//! capture stream per target writing into its own FIFO.
//!
//! Ordering is load-bearing: every FIFO exists before the viewer starts,
//! and the viewer starts before any writer opens its pipe, because opening
//! a FIFO for writing blocks until a reader holds the other end. The
//! coordinator then blocks on nothing but the viewer's exit — closing the
//! viewer is the one and only way a session ends.

use std::io;
use std::path::{Path, PathBuf};
use std::process::{ExitStatus, Stdio};

use anyhow::{Context, Result};

use crate::capture::error::CaptureError;
use crate::output::OutputContext;
use crate::ssh::SshRunner;

/// A spawned session process (viewer or capture stream).
#[allow(async_fn_in_trait)]
pub trait CaptureChild {
    /// Wait for the process to exit.
    async fn wait(&mut self) -> io::Result<ExitStatus>;
    /// Send a termination signal. Best effort, idempotent.
    fn terminate(&mut self);
}

/// Everything the session manager needs from the outside world. The
/// production implementation is [`ProcessBackend`]; tests substitute a
/// recorder that spawns nothing.
pub trait CaptureBackend {
    type Child: CaptureChild;

    /// Create a FIFO at `path`, replacing any stale one.
    fn create_pipe(&self, path: &Path) -> io::Result<()>;

    /// Remove the FIFO at `path`.
    fn remove_pipe(&self, path: &Path) -> io::Result<()>;

    /// Start the local viewer reading from every pipe, without waiting.
    ///
    /// # Errors
    ///
    /// Returns an error if the viewer process cannot be started.
    fn spawn_viewer(&self, pipes: &[PathBuf]) -> Result<Self::Child>;

    /// Start one remote capture stream writing into `pipe`.
    ///
    /// # Errors
    ///
    /// Returns an error if the pipe cannot be opened for writing or the
    /// remote process cannot be started.
    fn spawn_stream(
        &self,
        target: &str,
        filter: &str,
        agent_sock: Option<&str>,
        pipe: &Path,
    ) -> Result<Self::Child>;
}

/// Owns every pipe and stream process for the life of the session, and
/// tears all of them down exactly once on whichever exit path is taken.
struct SessionGuard<'a, B: CaptureBackend> {
    backend: &'a B,
    ctx: &'a OutputContext,
    pipes: Vec<PathBuf>,
    streams: Vec<B::Child>,
    done: bool,
}

impl<'a, B: CaptureBackend> SessionGuard<'a, B> {
    fn new(backend: &'a B, ctx: &'a OutputContext) -> Self {
        Self {
            backend,
            ctx,
            pipes: Vec::new(),
            streams: Vec::new(),
            done: false,
        }
    }

    /// Signal every started stream and remove every created pipe. Secondary
    /// failures are logged, never raised.
    fn teardown(&mut self) {
        if self.done {
            return;
        }
        self.done = true;
        for stream in &mut self.streams {
            stream.terminate();
        }
        for pipe in &self.pipes {
            if let Err(err) = self.backend.remove_pipe(pipe) {
                self.ctx
                    .warn(&format!("could not remove pipe {}: {err}", pipe.display()));
            }
        }
    }
}

impl<B: CaptureBackend> Drop for SessionGuard<'_, B> {
    fn drop(&mut self) {
        self.teardown();
    }
}

/// FIFO path for one target; index-tagged so repeated hostnames still get
/// unique pipes.
#[must_use]
pub fn pipe_path(target: &str, index: usize) -> PathBuf {
    std::env::temp_dir().join(format!("wssh_cap_{target}_{index}.pcap"))
}

/// Run one capture session to completion.
///
/// Creates all pipes, starts the viewer, attaches one stream per target
/// (per-target failures are warnings; partial-fleet capture beats no
/// capture), then blocks until the viewer exits. Every exit path — normal,
/// pipe-creation failure, viewer-start failure — releases every resource
/// the session created.
///
/// # Errors
///
/// [`CaptureError::PipeCreation`] or [`CaptureError::ViewerStart`] during
/// setup; waiting on the viewer can also fail.
pub async fn run_session<B: CaptureBackend>(
    backend: &B,
    targets: &[String],
    filter: &str,
    agent_sock: Option<&str>,
    ctx: &OutputContext,
) -> Result<()> {
    let mut guard = SessionGuard::new(backend, ctx);

    for (index, target) in targets.iter().enumerate() {
        let pipe = pipe_path(target, index);
        backend
            .create_pipe(&pipe)
            .map_err(|source| CaptureError::PipeCreation {
                path: pipe.clone(),
                source,
            })?;
        guard.pipes.push(pipe);
    }

    ctx.info(&format!("launching viewer for {} host(s)", targets.len()));
    let mut viewer = backend
        .spawn_viewer(&guard.pipes)
        .map_err(|err| CaptureError::ViewerStart(format!("{err:#}")))?;

    for (target, pipe) in targets.iter().zip(&guard.pipes) {
        match backend.spawn_stream(target, filter, agent_sock, pipe) {
            Ok(stream) => guard.streams.push(stream),
            Err(err) => ctx.warn(&format!("skipping {target}: {err:#}")),
        }
    }

    // The viewer closing is the session's sole terminal trigger; there is
    // no timeout and no cancellation command.
    let status = viewer.wait().await;
    ctx.info("viewer closed, cleaning up streams and pipes");
    guard.teardown();
    status.context("failed waiting for the capture viewer")?;
    Ok(())
}

// ── Production backend ────────────────────────────────────────────────────────

/// Real backend: `libc::mkfifo`, wireshark as the viewer, and
/// `ssh ... sudo tcpdump` streams through [`SshRunner`].
pub struct ProcessBackend<'a> {
    ssh: &'a SshRunner,
}

impl<'a> ProcessBackend<'a> {
    #[must_use]
    pub fn new(ssh: &'a SshRunner) -> Self {
        Self { ssh }
    }
}

/// Newtype over a tokio child so the session traits stay object-free.
pub struct ProcessChild(tokio::process::Child);

impl CaptureChild for ProcessChild {
    async fn wait(&mut self) -> io::Result<ExitStatus> {
        self.0.wait().await
    }

    fn terminate(&mut self) {
        let _ = self.0.start_kill();
    }
}

impl CaptureBackend for ProcessBackend<'_> {
    type Child = ProcessChild;

    fn create_pipe(&self, path: &Path) -> io::Result<()> {
        // Clear any pipe a crashed session left behind.
        match std::fs::remove_file(path) {
            Ok(()) => {}
            Err(err) if err.kind() == io::ErrorKind::NotFound => {}
            Err(err) => return Err(err),
        }
        mkfifo(path, 0o600)
    }

    fn remove_pipe(&self, path: &Path) -> io::Result<()> {
        match std::fs::remove_file(path) {
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(()),
            other => other,
        }
    }

    fn spawn_viewer(&self, pipes: &[PathBuf]) -> Result<ProcessChild> {
        let mut cmd = tokio::process::Command::new("wireshark");
        // -k starts capturing immediately.
        cmd.arg("-k");
        for pipe in pipes {
            cmd.arg("-i").arg(pipe);
        }
        cmd.kill_on_drop(true)
            .spawn()
            .map(ProcessChild)
            .context("failed to start wireshark")
    }

    fn spawn_stream(
        &self,
        target: &str,
        filter: &str,
        agent_sock: Option<&str>,
        pipe: &Path,
    ) -> Result<ProcessChild> {
        // Blocks until the viewer has opened the read end of this FIFO;
        // that handshake is why the viewer must already be running.
        let write_end = std::fs::OpenOptions::new()
            .write(true)
            .open(pipe)
            .with_context(|| format!("failed to open pipe for {target}"))?;

        let remote = if filter.is_empty() {
            "sudo tcpdump -U -w -".to_string()
        } else {
            format!("sudo tcpdump -U -w - {filter}")
        };
        self.ssh
            .spawn_streaming(target, &remote, agent_sock, Stdio::from(write_end))
            .map(ProcessChild)
    }
}

#[cfg(unix)]
#[allow(unsafe_code)] // raw mkfifo; no std equivalent
fn mkfifo(path: &Path, mode: u32) -> io::Result<()> {
    use std::os::unix::ffi::OsStrExt;

    let c_path = std::ffi::CString::new(path.as_os_str().as_bytes())
        .map_err(|_| io::Error::new(io::ErrorKind::InvalidInput, "pipe path contains NUL"))?;
    if unsafe { libc::mkfifo(c_path.as_ptr(), mode) } == 0 {
        Ok(())
    } else {
        Err(io::Error::last_os_error())
    }
}

#[cfg(not(unix))]
fn mkfifo(_path: &Path, _mode: u32) -> io::Result<()> {
    Err(io::Error::new(
        io::ErrorKind::Unsupported,
        "named pipes require a unix platform",
    ))
}
