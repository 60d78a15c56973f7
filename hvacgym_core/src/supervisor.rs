//! Engine process supervision.
//!
//! One external engine process per episode, started in the episode's own
//! working directory. The engine's stdout is drained by a reader thread
//! into a channel so that waits can be bounded; a dead process shows up as
//! a disconnected channel instead of a hung read.

use crate::config::EngineConfig;
use crossbeam::channel::{self, Receiver, RecvTimeoutError};
use hvacgym_env::EnvError;
use std::collections::BTreeMap;
use std::fs::File;
use std::io::{self, BufRead, BufReader, Write};
use std::path::{Path, PathBuf};
use std::process::{Child, ChildStdin, Command, Stdio};
use std::thread;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

/// File (inside the working directory) receiving the engine's stderr
pub const ENGINE_STDERR_FILE: &str = "engine.err";

/// Poll interval while waiting for the process to exit
const EXIT_POLL_INTERVAL: Duration = Duration::from_millis(10);

/// Launches and stops engine processes.
#[derive(Debug, Clone)]
pub struct ProcessSupervisor {
    engine: EngineConfig,

    /// Variables describing the episode, passed to every process
    episode_env: BTreeMap<String, String>,

    terminate_timeout: Duration,
}

impl ProcessSupervisor {
    /// Creates a supervisor for the given engine.
    pub fn new(
        engine: EngineConfig,
        episode_env: BTreeMap<String, String>,
        terminate_timeout: Duration,
    ) -> Self {
        Self {
            engine,
            episode_env,
            terminate_timeout,
        }
    }

    /// Starts an engine process inside `working_dir`.
    ///
    /// The directory must exist. stdin/stdout are piped for the frame
    /// protocol; stderr goes to [`ENGINE_STDERR_FILE`].
    pub fn start(&self, working_dir: &Path) -> Result<EngineHandle, EnvError> {
        let program = resolve_program(&self.engine.program)?;
        let stderr = File::create(working_dir.join(ENGINE_STDERR_FILE))?;

        let mut child = Command::new(&program)
            .args(&self.engine.args)
            .current_dir(working_dir)
            .envs(&self.episode_env)
            .env("HVACGYM_WORKING_DIR", working_dir)
            .envs(&self.engine.env)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::from(stderr))
            .spawn()
            .map_err(|e| {
                EnvError::crashed(format!(
                    "failed to start engine '{}': {}",
                    program.display(),
                    e
                ))
            })?;

        let pid = child.id();
        let stdin = child.stdin.take();
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| EnvError::crashed("engine stdout was not captured"))?;

        let (tx, rx) = channel::unbounded::<io::Result<String>>();
        thread::Builder::new()
            .name(format!("engine-{}-stdout", pid))
            .spawn(move || {
                for line in BufReader::new(stdout).lines() {
                    if tx.send(line).is_err() {
                        break;
                    }
                }
            })?;

        debug!("Started engine pid={} in {}", pid, working_dir.display());

        Ok(EngineHandle {
            child,
            stdin,
            lines: rx,
            pid,
            terminated: false,
            terminate_timeout: self.terminate_timeout,
        })
    }

    /// Returns true while the process has not exited.
    pub fn is_alive(&self, handle: &mut EngineHandle) -> bool {
        handle.is_alive()
    }

    /// Stops the process (bounded wait, then kill). Idempotent.
    pub fn terminate(&self, handle: &mut EngineHandle) -> Result<(), EnvError> {
        handle.terminate()
    }
}

fn resolve_program(program: &Path) -> Result<PathBuf, EnvError> {
    // Paths with a directory part are resolved against our cwd, not the
    // engine's working directory.
    if program.is_relative() && program.components().count() > 1 {
        Ok(std::env::current_dir()?.join(program))
    } else {
        Ok(program.to_path_buf())
    }
}

/// A running (or stopped) engine process and its frame channel.
#[derive(Debug)]
pub struct EngineHandle {
    child: Child,
    stdin: Option<ChildStdin>,
    lines: Receiver<io::Result<String>>,
    pid: u32,
    terminated: bool,
    terminate_timeout: Duration,
}

impl EngineHandle {
    /// OS process id.
    pub fn pid(&self) -> u32 {
        self.pid
    }

    /// Returns true while the process has not exited.
    pub fn is_alive(&mut self) -> bool {
        !self.terminated && matches!(self.child.try_wait(), Ok(None))
    }

    /// Writes one frame to the engine.
    pub fn send(&mut self, frame: &[u8]) -> Result<(), EnvError> {
        let stdin = self
            .stdin
            .as_mut()
            .ok_or_else(|| EnvError::invalid_state("engine connection is closed"))?;

        let written = stdin.write_all(frame).and_then(|_| stdin.flush());
        match written {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::BrokenPipe => Err(self.crash_error("stdin closed")),
            Err(e) => Err(EnvError::crashed(format!("writing to engine failed: {}", e))),
        }
    }

    /// Reads the next frame line.
    ///
    /// With `timeout = None` this waits until the engine answers or exits.
    pub fn recv(&mut self, timeout: Option<Duration>) -> Result<String, EnvError> {
        if self.terminated {
            return Err(EnvError::invalid_state("engine connection is closed"));
        }

        let received = match timeout {
            Some(limit) => match self.lines.recv_timeout(limit) {
                Ok(line) => line,
                Err(RecvTimeoutError::Timeout) => {
                    return Err(EnvError::Timeout(limit.as_millis() as u64))
                }
                Err(RecvTimeoutError::Disconnected) => {
                    return Err(self.crash_error("stdout closed"))
                }
            },
            None => match self.lines.recv() {
                Ok(line) => line,
                Err(_) => return Err(self.crash_error("stdout closed")),
            },
        };

        received.map_err(|e| EnvError::crashed(format!("reading engine output failed: {}", e)))
    }

    /// Stops the process: close stdin, wait up to the terminate timeout,
    /// then force-kill. Safe to call repeatedly.
    pub fn terminate(&mut self) -> Result<(), EnvError> {
        if self.terminated {
            return Ok(());
        }
        self.terminated = true;

        // EOF on stdin asks the engine to shut down on its own
        drop(self.stdin.take());

        let deadline = Instant::now() + self.terminate_timeout;
        loop {
            if let Some(status) = self.child.try_wait()? {
                debug!("Engine pid={} exited with {}", self.pid, status);
                return Ok(());
            }
            if Instant::now() >= deadline {
                break;
            }
            thread::sleep(EXIT_POLL_INTERVAL);
        }

        warn!(
            "Engine pid={} did not exit within {}ms, killing it",
            self.pid,
            self.terminate_timeout.as_millis()
        );
        match self.child.kill() {
            Ok(()) => {}
            // Already exited between the last poll and the kill
            Err(e) if e.kind() == io::ErrorKind::InvalidInput => {}
            Err(e) => return Err(e.into()),
        }
        self.child.wait()?;
        Ok(())
    }

    fn crash_error(&mut self, what: &str) -> EnvError {
        let status = match self.child.try_wait() {
            Ok(Some(status)) => status.to_string(),
            Ok(None) => "still running".to_string(),
            Err(e) => format!("unknown ({})", e),
        };
        warn!("Engine pid={} {}: {}", self.pid, what, status);
        EnvError::crashed(format!("engine pid={} {} (status: {})", self.pid, what, status))
    }
}

impl Drop for EngineHandle {
    fn drop(&mut self) {
        if let Err(e) = self.terminate() {
            warn!("Failed to terminate engine pid={}: {}", self.pid, e);
        }
    }
}
